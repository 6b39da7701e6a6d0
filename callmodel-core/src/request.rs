//! Request bodies for each invocation shape.

use serde_json::{Value, json};

use crate::model::{ModelId, Vendor};
use crate::profiles::{ParameterSet, profile_for};

/// The `anthropic_version` value the Messages shape requires.
pub const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

/// Media type attached to the conditioning image.
pub const CONDITIONING_MEDIA_TYPE: &str = "image/png";

const CLAUDE_TEXT_MAX_TOKENS: u32 = 1024;
const CLAUDE_MULTIMODAL_MAX_TOKENS: u32 = 2048;

const SDXL_CFG_SCALE: u32 = 9;
const SDXL_STEPS: u32 = 50;

/// Claude Messages request with a single text block.
pub fn claude_text(prompt: &str) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
        "max_tokens": CLAUDE_TEXT_MAX_TOKENS,
        "messages": [
            {
                "role": "user",
                "content": [{ "type": "text", "text": prompt }],
            }
        ],
    })
}

/// Claude Messages request carrying the prompt and a base64 PNG.
pub fn claude_multimodal(prompt: &str, base64_image: &str) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
        "max_tokens": CLAUDE_MULTIMODAL_MAX_TOKENS,
        "messages": [
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": CONDITIONING_MEDIA_TYPE,
                            "data": base64_image,
                        },
                    },
                ],
            }
        ],
    })
}

/// Stable Diffusion text-to-image request.
pub fn stable_diffusion(prompt: &str) -> Value {
    json!({
        "text_prompts": [{ "text": prompt }],
        "cfg_scale": SDXL_CFG_SCALE,
        "steps": SDXL_STEPS,
    })
}

/// Titan Image Generator text-to-image request.
pub fn titan_image(model_id: &ModelId, prompt: &str) -> Value {
    let mut body = Value::Object(profile_for(model_id));
    body["textToImageParams"] = json!({ "text": prompt });
    body
}

/// Text completion request for a vendor, merging the vendor's profile.
pub fn text_completion(model_id: &ModelId, prompt: &str) -> Value {
    let params = profile_for(model_id);
    match model_id.vendor() {
        Vendor::Anthropic => with_prompt(params, format!("\n\nHuman: {prompt}\n\nAssistant:")),
        Vendor::Ai21 | Vendor::Cohere | Vendor::Meta | Vendor::Mistral | Vendor::Stability => {
            with_prompt(params, prompt.to_string())
        }
        Vendor::Amazon | Vendor::Other => json!({
            "inputText": prompt,
            "textGenerationConfig": params,
        }),
    }
}

fn with_prompt(mut params: ParameterSet, prompt: String) -> Value {
    params.insert("prompt".to_string(), Value::String(prompt));
    Value::Object(params)
}
