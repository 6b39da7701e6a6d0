//! End-to-end dispatch scenarios through the action handler, using the mock
//! runtime and in-memory or filesystem stores.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use callmodel_core::error::RequestError;
use callmodel_core::{
    ActionEvent, Dispatcher, FsBlobStore, MemoryBlobStore, MockRuntime, StoreConfig, handle_event,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";
const SDXL: &str = "stability.stable-diffusion-xl-v0";
const TITAN_IMAGE: &str = "amazon.titan-image-generator-v1";

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([220, 60, 20]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .unwrap();
    out
}

fn messages_reply(text: &str) -> Value {
    json!({
        "id": "msg_bdrk_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 10, "output_tokens": 25 }
    })
}

fn setup(reply: Value) -> (Arc<MockRuntime>, Arc<MemoryBlobStore>, Dispatcher) {
    let runtime = Arc::new(MockRuntime::with_reply(reply));
    let store = Arc::new(MemoryBlobStore::new());
    let dispatcher = Dispatcher::new(runtime.clone(), store.clone(), StoreConfig::default());
    (runtime, store, dispatcher)
}

#[tokio::test]
async fn claude_without_stored_image_returns_content_list() {
    let (runtime, _store, dispatcher) = setup(messages_reply("Hi! How can I help?"));
    let event = ActionEvent::call_model("call-model", HAIKU, "Hello");

    let reply = handle_event(&dispatcher, &event).await.unwrap();

    assert_eq!(reply.status(), 200);
    let body: Value = serde_json::from_str(reply.body()).unwrap();
    assert_eq!(body, json!([{ "type": "text", "text": "Hi! How can I help?" }]));

    let calls = runtime.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model_id, HAIKU);
    assert_eq!(calls[0].body["max_tokens"], 1024);
    let content = calls[0].body["messages"][0]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["text"], "Hello");
}

#[tokio::test]
async fn claude_with_stored_image_goes_multimodal() {
    let (runtime, store, dispatcher) = setup(messages_reply("A red square."));
    let picture = png_bytes(4, 4);
    store.insert("bedrock-agent-images", "mypic.png", picture.clone());

    let event = ActionEvent::call_model("call-model", HAIKU, "describe the image");
    let reply = handle_event(&dispatcher, &event).await.unwrap();
    assert_eq!(reply.status(), 200);

    let calls = runtime.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body["max_tokens"], 2048);
    let image_block = &calls[0].body["messages"][0]["content"][1];
    assert_eq!(image_block["type"], "image");
    assert_eq!(image_block["source"]["data"], STANDARD.encode(&picture));
    assert!(store.puts().is_empty());
}

#[tokio::test]
async fn stable_diffusion_stores_exactly_one_png() {
    let generated = png_bytes(8, 6);
    let (runtime, store, dispatcher) = setup(json!({
        "result": "success",
        "artifacts": [{ "seed": 42, "base64": STANDARD.encode(&generated), "finishReason": "SUCCESS" }]
    }));

    let event = ActionEvent::call_model("call-model", SDXL, "a red fox");
    let reply = handle_event(&dispatcher, &event).await.unwrap();

    let puts = store.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].bucket, "bedrock-agent-images");
    assert!(puts[0].key.starts_with("generated_images/image_"));
    assert!(puts[0].key.ends_with(".png"));
    assert_eq!(&puts[0].bytes[..8], b"\x89PNG\r\n\x1a\n");

    let stored = image::load_from_memory(&puts[0].bytes).unwrap().to_rgb8();
    assert_eq!(stored.dimensions(), (8, 6));

    assert_eq!(reply.status(), 200);
    assert!(reply.body().starts_with("Stability image created and saved to"));
    assert!(reply.body().contains("bedrock-agent-images"));
    assert!(reply.body().contains(&puts[0].key));

    let calls = runtime.invocations();
    assert_eq!(calls[0].body["text_prompts"][0]["text"], "a red fox");
    assert_eq!(calls[0].body["cfg_scale"], 9);
}

#[tokio::test]
async fn titan_image_stores_first_image() {
    let generated = png_bytes(2, 2);
    let (_runtime, store, dispatcher) = setup(json!({
        "images": [STANDARD.encode(&generated)],
        "error": null
    }));

    let event = ActionEvent::call_model("call-model", TITAN_IMAGE, "a lighthouse at dusk");
    let reply = handle_event(&dispatcher, &event).await.unwrap();

    assert_eq!(store.puts().len(), 1);
    assert!(reply.body().starts_with("Amazon image created and saved to"));
}

#[tokio::test]
async fn text_vendor_returns_raw_text() {
    let (runtime, _store, dispatcher) = setup(json!({
        "results": [{ "tokenCount": 5, "outputText": "Action items: ...", "completionReason": "FINISH" }]
    }));

    let event = ActionEvent::call_model("call-model", "amazon.titan-text-express-v1", "summarize");
    let reply = handle_event(&dispatcher, &event).await.unwrap();

    assert_eq!(reply.body(), "Action items: ...");
    let calls = runtime.invocations();
    assert_eq!(calls[0].body["inputText"], "summarize");
    assert_eq!(calls[0].body["textGenerationConfig"]["topP"], 0.9);
}

#[tokio::test]
async fn unknown_api_path_is_404_without_invoking() {
    let (runtime, _store, dispatcher) = setup(messages_reply("unused"));
    let mut event = ActionEvent::call_model("call-model", HAIKU, "Hello");
    event.api_path = "/describeModel".to_string();

    let reply = handle_event(&dispatcher, &event).await.unwrap();

    assert_eq!(reply.status(), 404);
    assert_eq!(reply.body(), "Unrecognized api path: call-model::/describeModel");
    assert_eq!(reply.response.api_path, "/describeModel");
    assert!(runtime.invocations().is_empty());
}

#[tokio::test]
async fn missing_prompt_fails_fast() {
    let (runtime, _store, dispatcher) = setup(messages_reply("unused"));
    let mut event = ActionEvent::call_model("call-model", HAIKU, "Hello");
    event.parameters.retain(|p| p.name != "prompt");

    match handle_event(&dispatcher, &event).await {
        Err(RequestError::MissingParameter { name }) => assert_eq!(name, "prompt"),
        other => panic!("Expected MissingParameter, got {other:?}"),
    }
    assert!(runtime.invocations().is_empty());
}

#[tokio::test]
async fn blank_model_id_is_rejected_before_dispatch() {
    let (runtime, store, dispatcher) = setup(messages_reply("unused"));
    let event = ActionEvent::call_model("call-model", "   ", "Hello");

    match handle_event(&dispatcher, &event).await {
        Err(RequestError::InvalidModelId { model_id }) => assert_eq!(model_id, "   "),
        other => panic!("Expected InvalidModelId, got {other:?}"),
    }
    assert!(runtime.invocations().is_empty());
    assert!(store.puts().is_empty());
}

#[tokio::test]
async fn filesystem_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        root: dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    let store = Arc::new(FsBlobStore::new(dir.path()));
    let runtime = Arc::new(MockRuntime::new());
    let dispatcher = Dispatcher::new(runtime.clone(), store, config);

    // Empty queue: the mock answers with a one-pixel image.
    let event = ActionEvent::call_model("call-model", "stability.stable-diffusion-xl-v1", "cowboy");
    let reply = handle_event(&dispatcher, &event).await.unwrap();
    assert!(reply.body().starts_with("Stability image created and saved to"));

    let generated_dir = dir.path().join("bedrock-agent-images").join("generated_images");
    let files: Vec<_> = std::fs::read_dir(&generated_dir).unwrap().collect();
    assert_eq!(files.len(), 1);
}
