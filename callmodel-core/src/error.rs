//! Error types for the callmodel core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the inference runtime, response decoding, image generation,
//! blob storage, configuration, and inbound request domains.

use std::path::PathBuf;

/// Top-level error type for the callmodel core library.
#[derive(Debug, thiserror::Error)]
pub enum CallModelError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Image generation error: {0}")]
    ImageGeneration(#[from] ImageGenerationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

}

/// Errors from the remote inference call.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Authentication failed for model {model_id}")]
    AuthFailed { model_id: String },

    #[error("Model not found: {model_id}")]
    ModelNotFound { model_id: String },

    #[error("Request throttled for model {model_id}")]
    Throttled { model_id: String },

    #[error("HTTP {status} from inference endpoint: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to encode request body: {message}")]
    Encode { message: String },
}

/// Errors raised while interpreting a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON in response: {message}")]
    InvalidJson { message: String },

    #[error("Missing field '{field}' in response")]
    MissingField { field: String },

    #[error("No image data found in the response")]
    NoImageData,

    #[error("Invalid base64 image payload: {message}")]
    InvalidBase64 { message: String },

    #[error("Unreadable image bytes: {message}")]
    InvalidImage { message: String },
}

/// An image model reported a failure inside an otherwise well-formed reply.
#[derive(Debug, thiserror::Error)]
#[error("Image generation error. Error is {reason}")]
pub struct ImageGenerationError {
    pub reason: String,
}

/// Failures on the image generation path: either the payload could not be
/// decoded or the model itself reported an error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Generation(#[from] ImageGenerationError),
}

impl From<ImageError> for CallModelError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Decode(e) => CallModelError::Decode(e),
            ImageError::Generation(e) => CallModelError::ImageGeneration(e),
        }
    }
}

/// Errors from the blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("Store IO failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors caused by a malformed inbound action request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid model identifier: {model_id}")]
    InvalidModelId { model_id: String },
}
