// 该文件是 Zhijian （质检） 项目的一部分。
// src/model/request.rs - Nova 推理请求构建
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::input::ImageAsset;
use crate::model::prompt::{DEFAULT_INSTRUCTION, DEFAULT_SYSTEM_PROMPT, REFERENCE_DISCLAIMER};

pub const SCHEMA_VERSION: &str = "messages-v1";

/// 推理超参数，默认值偏向确定性的 JSON 输出
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
  pub max_new_tokens: u32,
  pub top_p: f32,
  pub top_k: u32,
  pub temperature: f32,
}

impl Default for InferenceConfig {
  fn default() -> Self {
    Self {
      max_new_tokens: 2500,
      top_p: 0.1,
      top_k: 20,
      temperature: 0.1,
    }
  }
}

/// 一次质检请求，构建后不可修改
#[derive(Debug, Clone)]
pub struct InspectionRequest {
  system_prompt: String,
  instruction: String,
  subject: Arc<ImageAsset>,
  reference: Option<Arc<ImageAsset>>,
  inference: InferenceConfig,
}

pub struct InspectionRequestBuilder {
  system_prompt: String,
  instruction: String,
  subject: Arc<ImageAsset>,
  reference: Option<Arc<ImageAsset>>,
  inference: InferenceConfig,
}

impl InspectionRequestBuilder {
  pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
    self.system_prompt = prompt.into();
    self
  }

  pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
    self.instruction = instruction.into();
    self
  }

  pub fn reference(mut self, reference: Option<Arc<ImageAsset>>) -> Self {
    self.reference = reference;
    self
  }

  pub fn inference(mut self, inference: InferenceConfig) -> Self {
    self.inference = inference;
    self
  }

  pub fn build(self) -> InspectionRequest {
    InspectionRequest {
      system_prompt: self.system_prompt,
      instruction: self.instruction,
      subject: self.subject,
      reference: self.reference,
      inference: self.inference,
    }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
  schema_version: &'a str,
  messages: Vec<WireMessage<'a>>,
  system: Vec<WireText<'a>>,
  inference_config: &'a InferenceConfig,
}

#[derive(Serialize)]
struct WireMessage<'a> {
  role: &'a str,
  content: Vec<WireContent<'a>>,
}

#[derive(Serialize)]
struct WireText<'a> {
  text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum WireContent<'a> {
  Text(&'a str),
  Image(WireImage<'a>),
}

#[derive(Serialize)]
struct WireImage<'a> {
  format: &'a str,
  source: WireSource<'a>,
}

#[derive(Serialize)]
struct WireSource<'a> {
  bytes: &'a str,
}

impl<'a> WireContent<'a> {
  fn png(asset: &'a ImageAsset) -> Self {
    WireContent::Image(WireImage {
      format: "png",
      source: WireSource {
        bytes: &asset.base64,
      },
    })
  }
}

impl InspectionRequest {
  pub fn builder(subject: Arc<ImageAsset>) -> InspectionRequestBuilder {
    InspectionRequestBuilder {
      system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
      instruction: DEFAULT_INSTRUCTION.to_string(),
      subject,
      reference: None,
      inference: InferenceConfig::default(),
    }
  }

  pub fn system_prompt(&self) -> &str {
    &self.system_prompt
  }

  pub fn instruction(&self) -> &str {
    &self.instruction
  }

  pub fn subject(&self) -> &Arc<ImageAsset> {
    &self.subject
  }

  pub fn reference(&self) -> Option<&Arc<ImageAsset>> {
    self.reference.as_ref()
  }

  pub fn inference(&self) -> &InferenceConfig {
    &self.inference
  }

  fn to_wire(&self) -> WireRequest<'_> {
    let mut messages = vec![WireMessage {
      role: "user",
      content: vec![
        WireContent::png(&self.subject),
        WireContent::Text(&self.instruction),
      ],
    }];

    if let Some(reference) = &self.reference {
      messages.push(WireMessage {
        role: "user",
        content: vec![
          WireContent::Text(REFERENCE_DISCLAIMER),
          WireContent::png(reference),
        ],
      });
    }

    WireRequest {
      schema_version: SCHEMA_VERSION,
      messages,
      system: vec![WireText {
        text: &self.system_prompt,
      }],
      inference_config: &self.inference,
    }
  }

  /// 请求体的 JSON 文档
  pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(self.to_wire())
  }

  /// 序列化为 InvokeModel 请求体
  pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&self.to_wire())
  }
}
