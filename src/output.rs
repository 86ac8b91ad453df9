// 该文件是 Zhijian （质检） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::FromUrl;
use crate::FromUrlWithScheme;
use crate::input::ImageAsset;
use crate::model::{
  BoundingBox, DefectReport, PixelBox, QcVerdict, VerdictPolicy, parse::parse_report,
};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;
pub mod report;

mod save_image_file;
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};
pub use self::report::{ReportFileError, ReportFileOutput, format_report};

use self::draw::{Draw, verdict_color};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("保存报告文件错误: {0}")]
  ReportFileError(#[from] ReportFileError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  SaveImageFileOutput(SaveImageFileOutput),
  ReportFileOutput(ReportFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      ReportFileOutput::SCHEME => {
        let output = ReportFileOutput::from_url(url)?;
        Ok(OutputWrapper::ReportFileOutput(output))
      }
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<Rendering> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &Rendering) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
      OutputWrapper::ReportFileOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
    }
  }
}

/// 绘制到图像上的一个缺陷框
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnBox {
  pub name: String,
  pub qc: QcVerdict,
  pub reason: String,
  /// 模型给出的颜色描述
  pub color: String,
  /// 实际绘制使用的 RGB 颜色
  pub rgb: [u8; 3],
  pub raw: BoundingBox,
  pub scaled: PixelBox,
  /// 框退化或完全在图像外时为 false
  pub drawn: bool,
}

/// 一次渲染的全部产物
#[derive(Debug, Clone)]
pub struct Rendering {
  pub image: RgbImage,
  pub report: DefectReport,
  pub verdict: QcVerdict,
  pub boxes: Vec<DrawnBox>,
  pub text: String,
  /// 产生该结果的模型，由会话填写
  pub model_id: Option<String>,
}

impl Rendering {
  pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
    self.model_id = Some(model_id.into());
    self
  }
}

pub struct Renderer {
  draw: Draw,
  policy: VerdictPolicy,
}

impl Default for Renderer {
  fn default() -> Self {
    Self::new(Draw::default(), VerdictPolicy::default())
  }
}

impl Renderer {
  pub fn new(draw: Draw, policy: VerdictPolicy) -> Self {
    Renderer { draw, policy }
  }

  pub fn policy(&self) -> VerdictPolicy {
    self.policy
  }

  /// 解析模型响应并渲染；解析失败时记录错误并返回 `None`
  pub fn render(&self, subject: &ImageAsset, response: &Value) -> Option<Rendering> {
    match parse_report(response) {
      Ok(report) => Some(self.render_report(subject, report)),
      Err(e) => {
        error!("解析缺陷报告失败: {}", e);
        None
      }
    }
  }

  pub fn render_report(&self, subject: &ImageAsset, report: DefectReport) -> Rendering {
    let mut image = subject.image.clone();
    let (width, height) = (subject.width, subject.height);

    let boxes: Vec<DrawnBox> = report
      .objects
      .iter()
      .map(|defect| {
        let scaled = defect.bbox.scale(width, height);
        let rgb = verdict_color(defect.qc);
        let drawn = self
          .draw
          .draw_bbox_with_label(&mut image, &scaled, &defect.name, rgb);
        if !drawn {
          warn!("缺陷 '{}' 的边界框无效，已跳过绘制", defect.name);
        }
        DrawnBox {
          name: defect.name.clone(),
          qc: defect.qc,
          reason: defect.reason.clone(),
          color: defect.color.clone(),
          rgb,
          raw: defect.bbox,
          scaled,
          drawn,
        }
      })
      .collect();

    let verdict = report.verdict(self.policy);
    let text = format_report(&report, verdict, &boxes);
    debug!("渲染完成: {} 个缺陷, 结论 {}", boxes.len(), verdict);

    Rendering {
      image,
      report,
      verdict,
      boxes,
      text,
      model_id: None,
    }
  }
}
