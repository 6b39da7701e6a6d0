//! # Callmodel Core
//!
//! Core library for callmodel: routes a (model identifier, prompt) pair to
//! the invocation shape its model family expects, calls the remote inference
//! endpoint, normalizes the reply into text, a content list, or a stored
//! image, and wraps the result in an action reply envelope.

pub mod config;
pub mod decode;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod model;
pub mod profiles;
pub mod request;
pub mod runtime;
pub mod store;

// Re-export commonly used types at the crate root.
pub use config::{CallModelConfig, RuntimeConfig, StoreConfig, load_config};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use envelope::{
    ActionEvent, ActionParameter, ActionResponse, CALL_MODEL_PATH, handle_event,
};
pub use error::CallModelError;
pub use gateway::{GatewayConfig, SharedDispatcher, gateway_router, run_gateway};
pub use model::{ModelFamily, ModelId, Vendor};
pub use profiles::{ParameterSet, profile_for};
pub use runtime::{HttpRuntime, InferenceRuntime, MockRuntime};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore};
