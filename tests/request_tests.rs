use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use zhijian::model::{
  prompt::{DEFAULT_SYSTEM_PROMPT, REFERENCE_DISCLAIMER},
  request::{InferenceConfig, InspectionRequest, SCHEMA_VERSION},
};

mod common;

#[test]
fn default_inference_parameters() {
  let config = InferenceConfig::default();
  assert_eq!(config.max_new_tokens, 2500);
  assert_eq!(config.top_k, 20);
  assert_eq!(config.temperature, 0.1);
  assert_eq!(config.top_p, 0.1);
}

#[test]
fn request_without_reference_has_single_user_message() {
  let subject = Arc::new(common::asset(32, 16));
  let request = InspectionRequest::builder(subject.clone())
    .instruction("find scratches")
    .build();

  let body = request.to_json().unwrap();

  assert_eq!(request.instruction(), "find scratches");
  assert!(request.reference().is_none());
  assert_eq!(body["schemaVersion"], SCHEMA_VERSION);
  assert_eq!(body["system"], json!([{ "text": DEFAULT_SYSTEM_PROMPT }]));
  assert_eq!(
    body["messages"],
    json!([{
      "role": "user",
      "content": [
        { "image": { "format": "png", "source": { "bytes": subject.base64 } } },
        { "text": "find scratches" }
      ]
    }])
  );
  assert_eq!(body["inferenceConfig"]["max_new_tokens"], 2500);
  assert_eq!(body["inferenceConfig"]["top_k"], 20);
}

#[test]
fn reference_adds_second_message_with_disclaimer() {
  let subject = Arc::new(common::asset(32, 16));
  let reference = Arc::new(common::asset(8, 8));
  let request = InspectionRequest::builder(subject)
    .system_prompt("you inspect welds")
    .reference(Some(reference.clone()))
    .build();

  let body = request.to_json().unwrap();
  let messages = body["messages"].as_array().unwrap();

  assert!(request.reference().is_some());
  assert_eq!(request.system_prompt(), "you inspect welds");
  assert_eq!(request.subject().width, 32);
  assert_eq!(*request.inference(), InferenceConfig::default());
  assert_eq!(messages.len(), 2);
  assert_eq!(body["system"][0]["text"], "you inspect welds");
  assert_eq!(messages[1]["role"], "user");
  assert_eq!(messages[1]["content"][0]["text"], REFERENCE_DISCLAIMER);
  assert_eq!(
    messages[1]["content"][1]["image"]["source"]["bytes"],
    reference.base64.as_str()
  );
}

#[test]
fn custom_inference_parameters_are_serialized() {
  let request = InspectionRequest::builder(Arc::new(common::asset(4, 4)))
    .inference(InferenceConfig {
      max_new_tokens: 512,
      top_p: 0.9,
      top_k: 5,
      temperature: 0.0,
    })
    .build();

  let body: serde_json::Value = serde_json::from_slice(&request.to_body().unwrap()).unwrap();
  assert_eq!(body["inferenceConfig"]["max_new_tokens"], 512);
  assert_eq!(body["inferenceConfig"]["top_k"], 5);
  assert_eq!(body["inferenceConfig"]["temperature"], 0.0);
}
