//! Default inference parameters per model vendor.
//!
//! Field names differ between vendors (`max_tokens`, `maxTokens`,
//! `max_gen_len`, ...), so each profile is a free-form JSON object that is
//! merged into the request body verbatim. Values are never validated.

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::model::{ModelId, TITAN_IMAGE_MODEL_ID, Vendor};

/// A vendor-specific mapping of parameter names to values.
pub type ParameterSet = Map<String, Value>;

/// Return the default parameter set for a model identifier.
///
/// Unknown vendors fall back to the generic text profile. The fallback is
/// logged but never an error.
pub fn profile_for(model_id: &ModelId) -> ParameterSet {
    if model_id.as_str() == TITAN_IMAGE_MODEL_ID {
        return titan_image_profile();
    }
    let vendor = model_id.vendor();
    if vendor == Vendor::Other {
        warn!(
            model_id = %model_id,
            prefix = model_id.vendor_prefix(),
            "Unrecognized model vendor, using default text profile"
        );
    }
    vendor_profile(vendor)
}

/// Return the default parameter set for a vendor.
pub fn vendor_profile(vendor: Vendor) -> ParameterSet {
    let value = match vendor {
        Vendor::Mistral => json!({
            "max_tokens": 200,
            "temperature": 0.5,
            "top_k": 50,
            "top_p": 0.9,
        }),
        Vendor::Ai21 => json!({
            "maxTokens": 512,
            "temperature": 0,
            "topP": 0.5,
            "stopSequences": [],
            "countPenalty": { "scale": 0 },
            "presencePenalty": { "scale": 0 },
            "frequencyPenalty": { "scale": 0 },
        }),
        Vendor::Cohere => json!({
            "max_tokens": 512,
            "temperature": 0,
            "p": 0.01,
            "k": 0,
            "stop_sequences": [],
            "return_likelihoods": "NONE",
        }),
        Vendor::Meta => json!({
            "temperature": 0,
            "top_p": 0.9,
            "max_gen_len": 512,
        }),
        Vendor::Stability => json!({
            "weight": 1,
            "cfg_scale": 10,
            "seed": 0,
            "steps": 50,
            "width": 512,
            "height": 512,
        }),
        Vendor::Anthropic => json!({
            "max_tokens_to_sample": 300,
            "temperature": 0.5,
            "top_k": 250,
            "top_p": 1,
            "stop_sequences": ["\n\nHuman:"],
            "anthropic_version": "bedrock-2023-05-31",
        }),
        Vendor::Amazon | Vendor::Other => default_profile_value(),
    };
    into_map(value)
}

/// The generic text profile used for Titan text models and unknown vendors.
pub fn default_profile() -> ParameterSet {
    into_map(default_profile_value())
}

fn default_profile_value() -> Value {
    json!({
        "maxTokenCount": 512,
        "stopSequences": [],
        "temperature": 0,
        "topP": 0.9,
    })
}

fn titan_image_profile() -> ParameterSet {
    into_map(json!({
        "taskType": "TEXT_IMAGE",
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "height": 1024,
            "width": 1024,
            "cfgScale": 8.0,
            "seed": 0,
        },
    }))
}

fn into_map(value: Value) -> ParameterSet {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
