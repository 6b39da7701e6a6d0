//! Model identifiers and the closed set of model families they dispatch to.
//!
//! A model identifier has the form `<vendor>.<name>[:<version>]`. The vendor
//! prefix selects the parameter profile and the response shape; a handful of
//! specific identifiers select dedicated invocation shapes on top of that.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RequestError;

/// The one Titan model served through the image generation shape.
pub const TITAN_IMAGE_MODEL_ID: &str = "amazon.titan-image-generator-v1";

/// An opaque model identifier such as `anthropic.claude-3-haiku-20240307-v1:0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Parse a model identifier. Only blank input is rejected; anything else
    /// is passed through to the remote call verbatim.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RequestError::InvalidModelId {
                model_id: raw.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `.`, or the whole identifier if there is none.
    pub fn vendor_prefix(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Text after the first `.`, empty when the identifier has no separator.
    pub fn name(&self) -> &str {
        self.0.split_once('.').map(|(_, name)| name).unwrap_or("")
    }

    pub fn vendor(&self) -> Vendor {
        Vendor::from_prefix(self.vendor_prefix())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ModelId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Model vendors with a known parameter profile and reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Anthropic,
    Ai21,
    Cohere,
    Meta,
    Mistral,
    Stability,
    Amazon,
    /// Any prefix outside the enumerated set.
    Other,
}

impl Vendor {
    /// Every vendor with a dedicated profile, in a stable order.
    pub const KNOWN: [Vendor; 7] = [
        Vendor::Anthropic,
        Vendor::Ai21,
        Vendor::Cohere,
        Vendor::Meta,
        Vendor::Mistral,
        Vendor::Stability,
        Vendor::Amazon,
    ];

    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "anthropic" => Vendor::Anthropic,
            "ai21" => Vendor::Ai21,
            "cohere" => Vendor::Cohere,
            "meta" => Vendor::Meta,
            "mistral" => Vendor::Mistral,
            "stability" => Vendor::Stability,
            "amazon" => Vendor::Amazon,
            _ => Vendor::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Anthropic => "anthropic",
            Vendor::Ai21 => "ai21",
            Vendor::Cohere => "cohere",
            Vendor::Meta => "meta",
            Vendor::Mistral => "mistral",
            Vendor::Stability => "stability",
            Vendor::Amazon => "amazon",
            Vendor::Other => "other",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The invocation shape a model identifier dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Claude 3 models on the Messages API; multimodal when a conditioning
    /// image is available.
    ClaudeMessages,
    /// Stable Diffusion text-to-image.
    StableDiffusion,
    /// Titan Image Generator text-to-image.
    TitanImage,
    /// Single-prompt text completion using the vendor's parameter profile.
    TextCompletion(Vendor),
}

impl ModelFamily {
    pub fn of(model_id: &ModelId) -> Self {
        match model_id.vendor() {
            Vendor::Anthropic if model_id.name().starts_with("claude-3") => {
                ModelFamily::ClaudeMessages
            }
            Vendor::Stability => ModelFamily::StableDiffusion,
            Vendor::Amazon if model_id.as_str() == TITAN_IMAGE_MODEL_ID => {
                ModelFamily::TitanImage
            }
            vendor => ModelFamily::TextCompletion(vendor),
        }
    }

    /// Whether replies from this family are images destined for the store.
    pub fn produces_image(&self) -> bool {
        matches!(self, ModelFamily::StableDiffusion | ModelFamily::TitanImage)
    }
}
