// 该文件是 Zhijian （质检） 项目的一部分。
// src/output/report.rs - 文本与 JSON 质检报告
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

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decode_url_path,
  model::{DefectReport, QcVerdict},
  output::{DrawnBox, Render, Rendering},
};

/// 生成文本报告；无缺陷时只包含结论与描述
pub fn format_report(report: &DefectReport, verdict: QcVerdict, boxes: &[DrawnBox]) -> String {
  let mut text = String::new();

  if !report.has_defects() {
    let _ = writeln!(text, "质检结论: OK（未发现缺陷）");
    let _ = write!(text, "描述: {}", report.text);
    return text;
  }

  let _ = writeln!(text, "质检结论: {}", verdict);
  let _ = writeln!(text, "描述: {}", report.text);
  let _ = write!(text, "缺陷列表 ({}):", report.objects.len());

  for defect in &report.objects {
    let raw = defect.bbox;
    let _ = write!(
      text,
      "\n  - [{}] {} (颜色: {}): {} | 原始坐标 ({:.0}, {:.0}, {:.0}, {:.0})",
      defect.qc, defect.name, defect.color, defect.reason, raw.x_min, raw.y_min, raw.x_max, raw.y_max
    );
    if let Some(drawn) = boxes.iter().find(|b| b.name == defect.name) {
      let s = drawn.scaled;
      let _ = write!(
        text,
        " -> 像素坐标 ({:.1}, {:.1}, {:.1}, {:.1})",
        s.x_min, s.y_min, s.x_max, s.y_max
      );
    }
  }

  text
}

#[derive(Error, Debug)]
pub enum ReportFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

#[derive(Serialize)]
struct ReportRecord<'a> {
  inspected_at: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  model_id: Option<&'a str>,
  verdict: QcVerdict,
  width: u32,
  height: u32,
  description: &'a str,
  defects: &'a [DrawnBox],
}

/// 将质检结果写入 JSON 文件（`json:///path/report.json`）
pub struct ReportFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for ReportFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for ReportFileOutput {
  type Error = ReportFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ReportFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(ReportFileOutput::new(decode_url_path(uri)))
  }
}

impl ReportFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    ReportFileOutput { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<Rendering> for ReportFileOutput {
  type Error = ReportFileError;

  fn render_result(&self, result: &Rendering) -> Result<(), Self::Error> {
    let record = ReportRecord {
      inspected_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
      model_id: result.model_id.as_deref(),
      verdict: result.verdict,
      width: result.image.width(),
      height: result.image.height(),
      description: &result.report.text,
      defects: &result.boxes,
    };

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
    info!("保存质检报告到文件: {}", self.path.display());

    Ok(())
  }
}
