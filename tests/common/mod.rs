#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use serde_json::{Value, json};
use zhijian::{
  input::ImageAsset,
  model::{
    VerdictPolicy,
    nova::{NovaError, NovaProBuilder, Transport},
  },
  output::{Renderer, draw::Draw},
  task::{InspectionSession, SessionConfig},
};

pub const BACKGROUND: [u8; 3] = [128, 128, 128];

/// 按顺序返回预设响应的离线传输层
pub struct MockTransport {
  replies: RefCell<VecDeque<Result<Vec<u8>, String>>>,
  pub calls: RefCell<Vec<(String, Value)>>,
}

impl MockTransport {
  pub fn new(replies: Vec<Result<Vec<u8>, String>>) -> Self {
    MockTransport {
      replies: RefCell::new(replies.into()),
      calls: RefCell::new(Vec::new()),
    }
  }

  pub fn answering(text: &str) -> Self {
    Self::new(vec![Ok(nova_response(text))])
  }

  pub fn failing(message: &str) -> Self {
    Self::new(vec![Err(message.to_string())])
  }
}

impl Transport for MockTransport {
  fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, NovaError> {
    let request: Value = serde_json::from_slice(&body)?;
    self.calls.borrow_mut().push((model_id.to_string(), request));
    self
      .replies
      .borrow_mut()
      .pop_front()
      .unwrap_or_else(|| Err("no reply configured".to_string()))
      .map_err(NovaError::RemoteError)
  }
}

/// 构造 Nova `InvokeModel` 响应体，模型文本放在 output.message.content[0].text
pub fn nova_response(text: &str) -> Vec<u8> {
  serde_json::to_vec(&json!({
    "output": {
      "message": {
        "role": "assistant",
        "content": [{ "text": text }]
      }
    },
    "stopReason": "end_turn",
    "usage": { "inputTokens": 1800, "outputTokens": 120 }
  }))
  .unwrap()
}

pub fn nova_response_value(text: &str) -> Value {
  serde_json::from_slice(&nova_response(text)).unwrap()
}

pub const TWO_DEFECTS: &str = r#"```json
{
  "text": "Metal bracket with a scratch near the mounting hole",
  "objects": [
    {"name": "mounting hole", "color": "silver", "qc": "OK", "reason": "hole is round and clean",
     "bbox": {"x_min": 100, "y_min": 100, "x_max": 400, "y_max": 500}},
    {"name": "scratch", "color": "dark grey", "qc": "NOK", "reason": "deep scratch across the surface",
     "bbox": {"x_min": 500, "y_min": 200, "x_max": 900, "y_max": 900}}
  ]
}
```"#;

pub const NO_DEFECTS: &str =
  r#"{"text": "Bracket surface is clean and all holes are present", "objects": []}"#;

pub fn gray_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, Rgb(BACKGROUND))
}

pub fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
  let path = dir.join(name);
  gray_image(width, height).save(&path).unwrap();
  path
}

pub fn asset(width: u32, height: u32) -> ImageAsset {
  ImageAsset::from_dynamic(image::DynamicImage::ImageRgb8(gray_image(width, height))).unwrap()
}

pub fn renderer(policy: VerdictPolicy) -> Renderer {
  Renderer::new(Draw::with_font(None), policy)
}

pub fn session(transport: MockTransport, policy: VerdictPolicy) -> InspectionSession<MockTransport> {
  let model = NovaProBuilder::default().build_with(transport);
  InspectionSession::new(model, renderer(policy), SessionConfig::default())
}
