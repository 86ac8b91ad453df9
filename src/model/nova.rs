// 该文件是 Zhijian （质检） 项目的一部分。
// src/model/nova.rs - Amazon Nova Pro 推理客户端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::{Duration, Instant};

use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::{
  Client, config::Region, error::DisplayErrorContext, primitives::Blob,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, query_param,
  model::{Model, request::InspectionRequest},
};

pub const DEFAULT_MODEL_ID: &str = "amazon.nova-pro-v1:0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const ACCESS_DENIED_HINT: &str = "模型访问被拒绝：该模型尚未在当前账号/区域中激活 \
(model access not activated)。请在 Amazon Bedrock 控制台的 Model access 页面中启用该模型，\
并确认当前凭证拥有 bedrock:InvokeModel 权限。";
pub const VALIDATION_HINT: &str =
  "请求被 Bedrock 拒绝：请检查模型 ID、图像大小以及推理参数是否符合模型要求。";
pub const NOT_FOUND_HINT: &str = "找不到指定的模型：请确认模型 ID 与所选区域是否匹配。";
pub const GENERIC_FAILURE_HINT: &str = "调用模型失败：请检查网络连接与 AWS 凭证配置。";

#[derive(Error, Debug)]
pub enum NovaError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数 '{0}' 无效: {1}")]
  InvalidParameter(String, String),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("运行时创建失败: {0}")]
  RuntimeError(#[from] std::io::Error),
  #[error("Bedrock 调用失败: {0}")]
  RemoteError(String),
  #[error("Bedrock 调用超时 ({0:?})")]
  Timeout(Duration),
}

/// 根据错误信息给出可读的处理建议
pub fn failure_hint(message: &str) -> &'static str {
  if message.contains("AccessDeniedException") {
    ACCESS_DENIED_HINT
  } else if message.contains("ValidationException") {
    VALIDATION_HINT
  } else if message.contains("ResourceNotFoundException") {
    NOT_FOUND_HINT
  } else {
    GENERIC_FAILURE_HINT
  }
}

/// InvokeModel 调用的抽象，便于替换为离线实现
pub trait Transport {
  fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, NovaError>;
}

/// 基于 aws-sdk-bedrockruntime 的同步传输层
pub struct BedrockTransport {
  runtime: tokio::runtime::Runtime,
  client: Client,
  timeout: Duration,
}

impl BedrockTransport {
  /// 使用环境中的 AWS 凭证创建客户端
  pub fn connect(region: Option<&str>, timeout: Duration) -> Result<Self, NovaError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
      loader = loader.region(Region::new(region.to_string()));
    }
    let sdk_config = runtime.block_on(loader.load());
    debug!("Bedrock 区域: {:?}", sdk_config.region());

    Ok(BedrockTransport {
      runtime,
      client: Client::new(&sdk_config),
      timeout,
    })
  }
}

impl Transport for BedrockTransport {
  fn invoke_model(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, NovaError> {
    let call = self
      .client
      .invoke_model()
      .model_id(model_id)
      .content_type("application/json")
      .accept("application/json")
      .body(Blob::new(body))
      .send();

    let output = self
      .runtime
      .block_on(tokio::time::timeout(self.timeout, call))
      .map_err(|_| NovaError::Timeout(self.timeout))?
      .map_err(|e| NovaError::RemoteError(DisplayErrorContext(&e).to_string()))?;

    Ok(output.body().as_ref().to_vec())
  }
}

pub struct NovaPro<T = BedrockTransport> {
  model_id: String,
  transport: T,
}

impl<T: Transport> NovaPro<T> {
  pub fn with_transport(model_id: impl Into<String>, transport: T) -> Self {
    NovaPro {
      model_id: model_id.into(),
      transport,
    }
  }

  pub fn model_id(&self) -> &str {
    &self.model_id
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// 推理失败时记录错误，并返回记录下的处理建议
  pub fn infer_or_hint(&self, request: &InspectionRequest) -> Result<Value, &'static str> {
    self.infer(request).map_err(|e| {
      let hint = failure_hint(&e.to_string());
      error!("{}", hint);
      error!("错误详情: {}", e);
      hint
    })
  }

  /// 推理失败时记录错误与建议，并返回 `None`
  pub fn infer_or_none(&self, request: &InspectionRequest) -> Option<Value> {
    self.infer_or_hint(request).ok()
  }
}

fn log_usage(response: &Value) {
  if let Some(usage) = response.get("usage") {
    let input = usage.get("inputTokens").and_then(Value::as_u64).unwrap_or(0);
    let output = usage.get("outputTokens").and_then(Value::as_u64).unwrap_or(0);
    info!("Token 用量: 输入 {}, 输出 {}", input, output);
  }
  let stop_reason = response.get("stopReason").and_then(Value::as_str);
  if stop_reason == Some("max_tokens") {
    warn!("模型输出达到 token 上限，结果可能被截断");
  }
}

impl<T: Transport> Model for NovaPro<T> {
  type Input = InspectionRequest;
  type Output = Value;
  type Error = NovaError;

  fn infer(&self, request: &InspectionRequest) -> Result<Value, NovaError> {
    let body = request.to_body()?;
    debug!("请求体大小: {:.2} KB", body.len() as f64 / 1024.0);

    info!("调用模型 {} ...", self.model_id);
    let now = Instant::now();
    let raw = self.transport.invoke_model(&self.model_id, body)?;
    info!("模型响应完成，耗时: {:.2?}", now.elapsed());

    let response: Value = serde_json::from_slice(&raw)?;
    log_usage(&response);
    Ok(response)
  }
}

/// 由 `bedrock:///<model-id>?region=..&timeout=..` 描述的模型
#[derive(Debug, Clone)]
pub struct NovaProBuilder {
  model_id: String,
  region: Option<String>,
  timeout: Duration,
}

impl FromUrlWithScheme for NovaProBuilder {
  const SCHEME: &'static str = "bedrock";
}

impl FromUrl for NovaProBuilder {
  type Error = NovaError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(NovaError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let model_id = match url.path().trim_matches('/') {
      "" => DEFAULT_MODEL_ID.to_string(),
      id => id.to_string(),
    };

    let timeout = match query_param(url, "timeout") {
      Some(value) => match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => return Err(NovaError::InvalidParameter("timeout".to_string(), value)),
      },
      None => DEFAULT_TIMEOUT,
    };

    Ok(NovaProBuilder {
      model_id,
      region: query_param(url, "region"),
      timeout,
    })
  }
}

impl Default for NovaProBuilder {
  fn default() -> Self {
    NovaProBuilder {
      model_id: DEFAULT_MODEL_ID.to_string(),
      region: None,
      timeout: DEFAULT_TIMEOUT,
    }
  }
}

impl NovaProBuilder {
  pub fn model_id(&self) -> &str {
    &self.model_id
  }

  pub fn region(&self) -> Option<&str> {
    self.region.as_deref()
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  pub fn build(self) -> Result<NovaPro<BedrockTransport>, NovaError> {
    info!("连接 Bedrock，模型: {}", self.model_id);
    let transport = BedrockTransport::connect(self.region.as_deref(), self.timeout)?;
    Ok(NovaPro::with_transport(self.model_id, transport))
  }

  pub fn build_with<T: Transport>(self, transport: T) -> NovaPro<T> {
    NovaPro::with_transport(self.model_id, transport)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn access_denied_gets_activation_hint() {
    let message = "service error: AccessDeniedException: You don't have access to the model";
    assert_eq!(failure_hint(message), ACCESS_DENIED_HINT);
  }

  #[test]
  fn other_errors_get_generic_hint() {
    assert_eq!(failure_hint("dispatch failure: connection reset"), GENERIC_FAILURE_HINT);
    assert_eq!(failure_hint("ValidationException: bad image"), VALIDATION_HINT);
  }

  #[test]
  fn usage_with_missing_counts_is_logged() {
    log_usage(&serde_json::json!({"usage": {"inputTokens": 1200}, "stopReason": "max_tokens"}));
    log_usage(&serde_json::json!({"output": {}}));
  }

  #[test]
  fn builder_from_url() {
    let url = Url::parse("bedrock:///us.amazon.nova-pro-v1:0?region=us-east-1&timeout=30").unwrap();
    let builder = NovaProBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_id(), "us.amazon.nova-pro-v1:0");
    assert_eq!(builder.region(), Some("us-east-1"));
    assert_eq!(builder.timeout(), Duration::from_secs(30));
  }

  #[test]
  fn builder_defaults_model_id() {
    let url = Url::parse("bedrock:///").unwrap();
    let builder = NovaProBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_id(), DEFAULT_MODEL_ID);
    assert_eq!(builder.timeout(), DEFAULT_TIMEOUT);
    assert_eq!(builder.region(), None);
  }

  #[test]
  fn builder_rejects_zero_timeout() {
    let url = Url::parse("bedrock:///amazon.nova-pro-v1:0?timeout=0").unwrap();
    assert!(matches!(
      NovaProBuilder::from_url(&url),
      Err(NovaError::InvalidParameter(key, value)) if key == "timeout" && value == "0"
    ));
  }

  #[test]
  fn timeout_gets_generic_hint() {
    let e = NovaError::Timeout(DEFAULT_TIMEOUT);
    assert_eq!(failure_hint(&e.to_string()), GENERIC_FAILURE_HINT);
  }

  #[test]
  fn builder_rejects_bad_timeout() {
    let url = Url::parse("bedrock:///amazon.nova-pro-v1:0?timeout=soon").unwrap();
    assert!(matches!(
      NovaProBuilder::from_url(&url),
      Err(NovaError::InvalidParameter(..))
    ));
  }
}
