//! Model dispatch: choose the invocation shape for a model, call it, and
//! normalize the reply.
//!
//! The dispatcher never fails outward. Transport, store, decode, and
//! image-generation failures are logged and turned into a descriptive
//! [`DispatchOutcome::Failed`] message that travels back inside the normal
//! reply envelope.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{CallModelConfig, StoreConfig};
use crate::decode::{self, MessagesOutput};
use crate::error::{CallModelError, DecodeError, StoreError};
use crate::model::{ModelFamily, ModelId, Vendor};
use crate::request;
use crate::runtime::{HttpRuntime, InferenceRuntime};
use crate::store::{BlobStore, FsBlobStore};

/// The normalized result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Generated text from a single-prompt completion.
    Text(String),
    /// The content list of a Messages reply, unmodified.
    Content(Vec<Value>),
    /// An image was generated and written to the store.
    Stored {
        bucket: String,
        key: String,
        message: String,
    },
    /// The call failed; the message is meant for the end user.
    Failed(String),
}

impl DispatchOutcome {
    /// Render the outcome as the string placed in the reply body.
    ///
    /// Content lists are serialized as JSON text so callers can render them
    /// as tables.
    pub fn into_body(self) -> String {
        match self {
            DispatchOutcome::Text(text) => text,
            DispatchOutcome::Content(content) => {
                serde_json::to_string(&content).unwrap_or_else(|_| "[]".to_string())
            }
            DispatchOutcome::Stored { message, .. } => message,
            DispatchOutcome::Failed(message) => message,
        }
    }
}

/// Routes prompts to the right invocation shape.
pub struct Dispatcher {
    runtime: Arc<dyn InferenceRuntime>,
    store: Arc<dyn BlobStore>,
    store_config: StoreConfig,
}

impl Dispatcher {
    pub fn new(
        runtime: Arc<dyn InferenceRuntime>,
        store: Arc<dyn BlobStore>,
        store_config: StoreConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            store_config,
        }
    }

    /// Build a dispatcher backed by the HTTP runtime and the filesystem store.
    pub fn from_config(config: &CallModelConfig) -> Self {
        Self::new(
            Arc::new(HttpRuntime::new(&config.runtime)),
            Arc::new(FsBlobStore::new(config.store.root.clone())),
            config.store.clone(),
        )
    }

    /// Build a dispatcher with a custom runtime and the configured filesystem store.
    pub fn with_runtime(config: &CallModelConfig, runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self::new(
            runtime,
            Arc::new(FsBlobStore::new(config.store.root.clone())),
            config.store.clone(),
        )
    }

    pub fn store_config(&self) -> &StoreConfig {
        &self.store_config
    }

    /// Answer a prompt with the given model.
    pub async fn respond(&self, model_id: &ModelId, prompt: &str) -> DispatchOutcome {
        let family = ModelFamily::of(model_id);
        info!(model_id = %model_id, family = ?family, "Dispatching prompt");

        let result = match family {
            ModelFamily::ClaudeMessages => self.respond_messages(model_id, prompt).await,
            ModelFamily::StableDiffusion => self.respond_stable_diffusion(model_id, prompt).await,
            ModelFamily::TitanImage => self.respond_titan_image(model_id, prompt).await,
            ModelFamily::TextCompletion(vendor) => {
                self.respond_text(model_id, vendor, prompt).await
            }
        };

        result.unwrap_or_else(|err| {
            error!(model_id = %model_id, error = %err, "Dispatch failed");
            DispatchOutcome::Failed(describe_failure(family, &err))
        })
    }

    async fn respond_messages(
        &self,
        model_id: &ModelId,
        prompt: &str,
    ) -> Result<DispatchOutcome, CallModelError> {
        let body = match self.conditioning_image().await? {
            Some(encoded) => {
                info!(model_id = %model_id, "Conditioning image found, using multimodal request");
                request::claude_multimodal(prompt, &encoded)
            }
            None => request::claude_text(prompt),
        };
        let reply = self.runtime.invoke(model_id, &body).await?;
        let MessagesOutput { content, .. } = decode::decode_messages(&reply)?;
        Ok(DispatchOutcome::Content(content))
    }

    async fn respond_stable_diffusion(
        &self,
        model_id: &ModelId,
        prompt: &str,
    ) -> Result<DispatchOutcome, CallModelError> {
        let body = request::stable_diffusion(prompt);
        let reply = self.runtime.invoke(model_id, &body).await?;
        let image = decode::decode_artifacts(&reply)?;
        self.store_image(image.into_inner(), "Stability").await
    }

    async fn respond_titan_image(
        &self,
        model_id: &ModelId,
        prompt: &str,
    ) -> Result<DispatchOutcome, CallModelError> {
        info!(model_id = %model_id, "Generating image with Titan Image Generator");
        let body = request::titan_image(model_id, prompt);
        let reply = self.runtime.invoke(model_id, &body).await?;
        let image = decode::decode_titan_images(&reply)?;
        info!(model_id = %model_id, "Successfully generated image");
        self.store_image(image.into_inner(), "Amazon").await
    }

    async fn respond_text(
        &self,
        model_id: &ModelId,
        vendor: Vendor,
        prompt: &str,
    ) -> Result<DispatchOutcome, CallModelError> {
        let body = request::text_completion(model_id, prompt);
        let reply = self.runtime.invoke(model_id, &body).await?;
        Ok(DispatchOutcome::Text(decode::decode_text(vendor, &reply)?))
    }

    /// Read the conditioning image as base64, if one is stored.
    async fn conditioning_image(&self) -> Result<Option<String>, StoreError> {
        let bucket = &self.store_config.bucket;
        let key = &self.store_config.conditioning_key;
        if !self.store.exists(bucket, key).await? {
            info!(bucket = bucket.as_str(), key = key.as_str(), "No conditioning image in store");
            return Ok(None);
        }
        let bytes = self.store.get(bucket, key).await?;
        Ok(Some(STANDARD.encode(bytes)))
    }

    /// Re-encode an image as PNG and write it under a fresh time-stamped key.
    async fn store_image(
        &self,
        image: Vec<u8>,
        label: &str,
    ) -> Result<DispatchOutcome, CallModelError> {
        let png = decode::normalize_png(&image)?;
        let bucket = self.store_config.bucket.clone();
        let key = generated_key(&self.store_config.generated_prefix);
        self.store.put(&bucket, &key, png).await?;

        let location = self.store.location(&bucket, &key);
        info!(location = location.as_str(), "Image successfully saved");
        Ok(DispatchOutcome::Stored {
            message: format!("{label} image created and saved to {location}"),
            bucket,
            key,
        })
    }
}

/// `<prefix>/image_<unix-millis>_<uuid>.png`. Unique per call, so a put never
/// replaces an earlier image.
pub fn generated_key(prefix: &str) -> String {
    let file = format!(
        "image_{}_{}.png",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    );
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file
    } else {
        format!("{prefix}/{file}")
    }
}

fn describe_failure(family: ModelFamily, err: &CallModelError) -> String {
    match err {
        CallModelError::Decode(DecodeError::NoImageData) => {
            "No image data found in the response.".to_string()
        }
        CallModelError::ImageGeneration(e) => e.to_string(),
        other if family.produces_image() => {
            format!("An error occurred processing the image response: {other}")
        }
        other => format!("An error occurred processing the text response: {other}"),
    }
}
