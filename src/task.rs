// 该文件是 Zhijian （质检） 项目的一部分。
// src/task.rs - 质检会话与任务
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

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
  input::{ImageAsset, ImageFileInput},
  model::{
    QcVerdict,
    nova::{BedrockTransport, NovaPro, Transport},
    prompt::{DEFAULT_INSTRUCTION, DEFAULT_SYSTEM_PROMPT},
    request::{InferenceConfig, InspectionRequest},
  },
  output::{OutputWrapper, Render, Renderer, Rendering, ReportFileOutput, SaveImageFileOutput},
};

/// 会话内每次请求共用的提示词与推理参数
#[derive(Debug, Clone)]
pub struct SessionConfig {
  pub system_prompt: String,
  pub instruction: String,
  pub inference: InferenceConfig,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
      instruction: DEFAULT_INSTRUCTION.to_string(),
      inference: InferenceConfig::default(),
    }
  }
}

/// 在多次质检之间显式传递的上下文，保存最近一次的图像、请求与结果
pub struct InspectionSession<T = BedrockTransport> {
  model: NovaPro<T>,
  renderer: Renderer,
  config: SessionConfig,
  reference_cache: Option<(PathBuf, Arc<ImageAsset>)>,
  last_subject: Option<Arc<ImageAsset>>,
  last_request: Option<InspectionRequest>,
  last_response: Option<Value>,
  last_rendering: Option<Rendering>,
  last_failure_hint: Option<&'static str>,
}

impl<T: Transport> InspectionSession<T> {
  pub fn new(model: NovaPro<T>, renderer: Renderer, config: SessionConfig) -> Self {
    debug!(
      "创建质检会话: 模型 {}, 结论汇总方式 {:?}, 推理参数 {:?}",
      model.model_id(),
      renderer.policy(),
      config.inference
    );
    InspectionSession {
      model,
      renderer,
      config,
      reference_cache: None,
      last_subject: None,
      last_request: None,
      last_response: None,
      last_rendering: None,
      last_failure_hint: None,
    }
  }

  pub fn model(&self) -> &NovaPro<T> {
    &self.model
  }

  pub fn last_subject(&self) -> Option<&Arc<ImageAsset>> {
    self.last_subject.as_ref()
  }

  pub fn last_reference(&self) -> Option<&Arc<ImageAsset>> {
    self.reference_cache.as_ref().map(|(_, asset)| asset)
  }

  pub fn last_request(&self) -> Option<&InspectionRequest> {
    self.last_request.as_ref()
  }

  pub fn last_response(&self) -> Option<&Value> {
    self.last_response.as_ref()
  }

  pub fn last_rendering(&self) -> Option<&Rendering> {
    self.last_rendering.as_ref()
  }

  /// 最近一次模型调用失败时给出的处理建议
  pub fn last_failure_hint(&self) -> Option<&'static str> {
    self.last_failure_hint
  }

  /// 参考图像按路径缓存，批量质检时只读取一次
  fn load_reference(&mut self, reference: &ImageFileInput) -> Result<Arc<ImageAsset>> {
    if let Some((path, asset)) = &self.reference_cache
      && path == reference.path()
    {
      return Ok(asset.clone());
    }

    let asset = Arc::new(
      reference
        .load()
        .with_context(|| format!("无法读取参考图像: {}", reference.path().display()))?,
    );
    self.reference_cache = Some((reference.path().to_path_buf(), asset.clone()));
    Ok(asset)
  }

  /// 完整执行一次 读取 → 构建请求 → 推理 → 渲染 → 输出
  ///
  /// 读取图像或写出结果失败时返回 `Err`；模型调用或响应解析失败时已记录日志，返回 `Ok(None)`。
  pub fn run(
    &mut self,
    subject: &ImageFileInput,
    reference: Option<&ImageFileInput>,
    outputs: &[OutputWrapper],
  ) -> Result<Option<&Rendering>> {
    self.last_request = None;
    self.last_response = None;
    self.last_rendering = None;
    self.last_failure_hint = None;

    info!("读取待检图像: {}", subject.path().display());
    let subject_asset = Arc::new(
      subject
        .load()
        .with_context(|| format!("无法读取待检图像: {}", subject.path().display()))?,
    );
    info!("待检图像尺寸: {}x{}", subject_asset.width, subject_asset.height);
    self.last_subject = Some(subject_asset.clone());

    let reference_asset = match reference {
      Some(reference) => Some(self.load_reference(reference)?),
      None => None,
    };

    let request = InspectionRequest::builder(subject_asset.clone())
      .system_prompt(self.config.system_prompt.clone())
      .instruction(self.config.instruction.clone())
      .reference(reference_asset)
      .inference(self.config.inference)
      .build();

    let now = Instant::now();
    let response = self.model.infer_or_hint(&request);
    self.last_request = Some(request);
    let response = match response {
      Ok(response) => response,
      Err(hint) => {
        self.last_failure_hint = Some(hint);
        warn!("模型调用失败，本次质检中止");
        return Ok(None);
      }
    };

    let rendering = self
      .renderer
      .render(&subject_asset, &response)
      .map(|rendering| rendering.with_model_id(self.model.model_id()));
    self.last_response = Some(response);
    let Some(rendering) = rendering else {
      warn!("响应解析失败，本次质检中止");
      return Ok(None);
    };
    info!("质检完成，结论: {}，耗时: {:.2?}", rendering.verdict, now.elapsed());

    for output in outputs {
      output.render_result(&rendering)?;
    }

    self.last_rendering = Some(rendering);
    Ok(self.last_rendering.as_ref())
  }
}

pub trait Task<T: Transport>: Sized {
  type Output;
  fn run_task(self, session: &mut InspectionSession<T>) -> Result<Self::Output>;
}

/// 检查一组（待检图像，可选参考图像）
pub struct OneShotTask {
  pub subject: ImageFileInput,
  pub reference: Option<ImageFileInput>,
  pub outputs: Vec<OutputWrapper>,
}

impl<T: Transport> Task<T> for OneShotTask {
  type Output = Option<QcVerdict>;

  fn run_task(self, session: &mut InspectionSession<T>) -> Result<Self::Output> {
    info!("开始任务...");
    let rendering = session.run(&self.subject, self.reference.as_ref(), &self.outputs)?;
    Ok(rendering.map(|rendering| {
      println!("{}", rendering.text);
      rendering.verdict
    }))
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
  pub ok: usize,
  pub nok: usize,
  pub failed: usize,
}

/// 多张待检图像共用一张参考图像，结果写入输出目录
pub struct BatchTask {
  pub subjects: Vec<ImageFileInput>,
  pub reference: Option<ImageFileInput>,
  pub output_dir: Option<PathBuf>,
}

/// 为待检图像生成 `<dir>/<stem>.annotated.png` 与 `<dir>/<stem>.json` 输出
pub fn outputs_for(subject: &Path, output_dir: &Path) -> Vec<OutputWrapper> {
  let stem = subject
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "subject".to_string());

  vec![
    OutputWrapper::SaveImageFileOutput(SaveImageFileOutput::new(
      output_dir.join(format!("{}.annotated.png", stem)),
    )),
    OutputWrapper::ReportFileOutput(ReportFileOutput::new(
      output_dir.join(format!("{}.json", stem)),
    )),
  ]
}

impl<T: Transport> Task<T> for BatchTask {
  type Output = BatchSummary;

  fn run_task(self, session: &mut InspectionSession<T>) -> Result<Self::Output> {
    info!("开始批量任务，共 {} 张图像...", self.subjects.len());
    let mut summary = BatchSummary::default();

    for (i, subject) in self.subjects.iter().enumerate() {
      let outputs = match &self.output_dir {
        Some(dir) => outputs_for(subject.path(), dir),
        None => Vec::new(),
      };

      info!("({}/{}) {}", i + 1, self.subjects.len(), subject.path().display());
      match session.run(subject, self.reference.as_ref(), &outputs)? {
        Some(rendering) => {
          println!("== {}", subject.path().display());
          println!("{}", rendering.text);
          match rendering.verdict {
            QcVerdict::Ok => summary.ok += 1,
            QcVerdict::Nok => summary.nok += 1,
          }
        }
        None => summary.failed += 1,
      }
    }

    warn!(
      "批量任务完成: OK {} / NOK {} / 失败 {}",
      summary.ok, summary.nok, summary.failed
    );
    Ok(summary)
  }
}
