//! Response decoders, one per reply shape.
//!
//! Decoders turn the raw reply bytes of the remote call into either text, a
//! Messages content list, or an image buffer. They return typed errors; the
//! dispatcher decides how those surface to the caller.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{DecodeError, ImageError, ImageGenerationError};
use crate::model::Vendor;

/// Token usage reported by a Messages reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Decoded Messages reply: usage plus the untouched content list.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagesOutput {
    pub usage: TokenUsage,
    pub content: Vec<Value>,
}

/// JSON pointer to the generated text in a vendor's completion reply.
pub fn text_pointer(vendor: Vendor) -> &'static str {
    match vendor {
        Vendor::Anthropic => "/completion",
        Vendor::Ai21 => "/completions/0/data/text",
        Vendor::Cohere => "/generations/0/text",
        Vendor::Meta => "/generation",
        Vendor::Mistral => "/outputs/0/text",
        Vendor::Stability | Vendor::Amazon | Vendor::Other => "/results/0/outputText",
    }
}

fn parse_json(bytes: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson {
        message: e.to_string(),
    })
}

/// Extract the generated text from a single-prompt completion reply.
pub fn decode_text(vendor: Vendor, bytes: &[u8]) -> Result<String, DecodeError> {
    let body = parse_json(bytes)?;
    let pointer = text_pointer(vendor);
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DecodeError::MissingField {
            field: pointer.trim_start_matches('/').replace('/', "."),
        })
}

/// Decode a Messages reply, logging its token usage.
pub fn decode_messages(bytes: &[u8]) -> Result<MessagesOutput, DecodeError> {
    let body = parse_json(bytes)?;
    let usage_field = |name: &str| {
        body["usage"][name]
            .as_u64()
            .ok_or_else(|| DecodeError::MissingField {
                field: format!("usage.{name}"),
            })
    };
    let usage = TokenUsage {
        input_tokens: usage_field("input_tokens")?,
        output_tokens: usage_field("output_tokens")?,
    };
    let content = body["content"].as_array().cloned().unwrap_or_default();

    info!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        blocks = content.len(),
        "Invocation details"
    );

    Ok(MessagesOutput { usage, content })
}

/// Decode the first artifact of a diffusion reply into a seekable buffer.
pub fn decode_artifacts(bytes: &[u8]) -> Result<Cursor<Vec<u8>>, DecodeError> {
    let body = parse_json(bytes)?;
    let encoded = body["artifacts"]
        .as_array()
        .and_then(|artifacts| artifacts.first())
        .and_then(|artifact| artifact["base64"].as_str());

    let Some(encoded) = encoded else {
        error!("No images found or 'base64' key is missing");
        return Err(DecodeError::NoImageData);
    };

    decode_base64(encoded).map(Cursor::new)
}

/// Decode a Titan Image Generator reply.
///
/// A non-null `error` field is reported as an [`ImageGenerationError`] even
/// when images are present.
pub fn decode_titan_images(bytes: &[u8]) -> Result<Cursor<Vec<u8>>, ImageError> {
    let body = parse_json(bytes)?;

    match &body["error"] {
        Value::Null => {}
        Value::String(reason) => {
            return Err(ImageGenerationError {
                reason: reason.clone(),
            }
            .into());
        }
        other => {
            return Err(ImageGenerationError {
                reason: other.to_string(),
            }
            .into());
        }
    }

    let encoded = body["images"]
        .as_array()
        .and_then(|images| images.first())
        .and_then(Value::as_str)
        .ok_or(DecodeError::NoImageData)?;

    Ok(Cursor::new(decode_base64(encoded)?))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| DecodeError::InvalidBase64 {
            message: e.to_string(),
        })
}

/// Re-encode any decodable image as PNG.
pub fn normalize_png(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let image = image::load_from_memory(bytes).map_err(|e| DecodeError::InvalidImage {
        message: e.to_string(),
    })?;
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .map_err(|e| DecodeError::InvalidImage {
            message: e.to_string(),
        })?;
    Ok(out)
}
