// 该文件是 Zhijian （质检） 项目的一部分。
// src/config.rs - 命令行公共参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use url::Url;

use crate::{
  FromUrl,
  input::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, ImageFileInput},
  model::{
    VerdictPolicy,
    nova::{NovaPro, NovaProBuilder, Transport},
    prompt::{DEFAULT_INSTRUCTION, DEFAULT_SYSTEM_PROMPT, load_or_default},
    request::InferenceConfig,
  },
  output::{Renderer, draw::Draw},
  task::{InspectionSession, SessionConfig},
};

/// 各个质检程序共用的参数
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
  /// 模型地址，例如 bedrock:///amazon.nova-pro-v1:0?region=us-east-1&timeout=120
  #[arg(long, value_name = "MODEL", default_value = "bedrock:///amazon.nova-pro-v1:0")]
  pub model: Url,

  /// 参考图像（良品），例如 image:///data/golden.png
  #[arg(long, value_name = "REFERENCE")]
  pub reference: Option<Url>,

  /// 图像缩放宽度上限（URL 中的 max_width 优先）
  #[arg(long, default_value_t = DEFAULT_MAX_WIDTH, value_name = "PIXELS")]
  pub max_width: u32,

  /// 图像缩放高度上限（URL 中的 max_height 优先）
  #[arg(long, default_value_t = DEFAULT_MAX_HEIGHT, value_name = "PIXELS")]
  pub max_height: u32,

  /// 最大生成 token 数
  #[arg(long, default_value_t = 2500, value_name = "COUNT")]
  pub max_tokens: u32,

  /// 采样温度
  #[arg(long, default_value_t = 0.1, value_name = "VALUE")]
  pub temperature: f32,

  /// top-p 采样阈值
  #[arg(long, default_value_t = 0.1, value_name = "VALUE")]
  pub top_p: f32,

  /// top-k 采样数量
  #[arg(long, default_value_t = 20, value_name = "COUNT")]
  pub top_k: u32,

  /// 系统提示词文件
  #[arg(long, value_name = "FILE")]
  pub system_prompt_file: Option<PathBuf>,

  /// 任务指令文件
  #[arg(long, value_name = "FILE")]
  pub instruction_file: Option<PathBuf>,

  /// 整图结论的汇总方式
  #[arg(long, value_enum, default_value_t = VerdictPolicy::AnyNok)]
  pub verdict_policy: VerdictPolicy,

  /// 标签字体文件（TTF/OTF），未指定时搜索系统字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

impl InspectArgs {
  pub fn inference_config(&self) -> InferenceConfig {
    InferenceConfig {
      max_new_tokens: self.max_tokens,
      top_p: self.top_p,
      top_k: self.top_k,
      temperature: self.temperature,
    }
  }

  pub fn session_config(&self) -> Result<SessionConfig> {
    let system_prompt = load_or_default(self.system_prompt_file.as_deref(), DEFAULT_SYSTEM_PROMPT)
      .context("无法读取系统提示词文件")?;
    let instruction = load_or_default(self.instruction_file.as_deref(), DEFAULT_INSTRUCTION)
      .context("无法读取任务指令文件")?;

    Ok(SessionConfig {
      system_prompt,
      instruction,
      inference: self.inference_config(),
    })
  }

  pub fn image_input(&self, url: &Url) -> Result<ImageFileInput> {
    ImageFileInput::from_url_with_defaults(url, self.max_width, self.max_height)
      .with_context(|| format!("无效的图像地址: {}", url))
  }

  pub fn reference_input(&self) -> Result<Option<ImageFileInput>> {
    self
      .reference
      .as_ref()
      .map(|url| self.image_input(url))
      .transpose()
  }

  pub fn renderer(&self) -> Result<Renderer> {
    let draw = match &self.font {
      Some(path) => Draw::with_font_file(path)
        .with_context(|| format!("无法加载字体: {}", path.display()))?,
      None => Draw::default(),
    };
    Ok(Renderer::new(draw, self.verdict_policy))
  }

  pub fn model_builder(&self) -> Result<NovaProBuilder> {
    NovaProBuilder::from_url(&self.model).with_context(|| format!("无效的模型地址: {}", self.model))
  }

  /// 使用指定传输层创建会话
  pub fn session_with<T: Transport>(&self, transport: T) -> Result<InspectionSession<T>> {
    let model: NovaPro<T> = self.model_builder()?.build_with(transport);
    Ok(InspectionSession::new(model, self.renderer()?, self.session_config()?))
  }

  /// 连接 Bedrock 并创建会话
  pub fn session(&self) -> Result<InspectionSession> {
    let builder = self.model_builder()?;
    info!(
      "模型: {}, 区域: {}, 超时: {:?}",
      builder.model_id(),
      builder.region().unwrap_or("<默认>"),
      builder.timeout()
    );
    let model = builder.build()?;
    Ok(InspectionSession::new(model, self.renderer()?, self.session_config()?))
  }
}
