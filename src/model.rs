// 该文件是 Zhijian （质检） 项目的一部分。
// src/model.rs - 模型与缺陷报告
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 模型返回坐标所在的归一化空间边长
pub const NORMALIZED_EXTENT: f32 = 1000.0;

/// 质检结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QcVerdict {
  Ok,
  Nok,
}

impl QcVerdict {
  pub fn as_str(&self) -> &'static str {
    match self {
      QcVerdict::Ok => "OK",
      QcVerdict::Nok => "NOK",
    }
  }
}

impl fmt::Display for QcVerdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for QcVerdict {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "OK" => Ok(QcVerdict::Ok),
      "NOK" | "NG" | "NOT OK" => Ok(QcVerdict::Nok),
      other => Err(format!("未知的质检结论: {}", other)),
    }
  }
}

impl Serialize for QcVerdict {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for QcVerdict {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// 1000x1000 归一化空间中的边界框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

/// 像素空间中的边界框
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

impl BoundingBox {
  /// 按 (width/1000, height/1000) 缩放到像素空间
  pub fn scale(&self, width: u32, height: u32) -> PixelBox {
    let sx = width as f32 / NORMALIZED_EXTENT;
    let sy = height as f32 / NORMALIZED_EXTENT;
    PixelBox {
      x_min: self.x_min * sx,
      y_min: self.y_min * sy,
      x_max: self.x_max * sx,
      y_max: self.y_max * sy,
    }
  }
}

impl PixelBox {
  /// `BoundingBox::scale` 的逆变换
  pub fn normalize(&self, width: u32, height: u32) -> BoundingBox {
    let sx = NORMALIZED_EXTENT / width as f32;
    let sy = NORMALIZED_EXTENT / height as f32;
    BoundingBox {
      x_min: self.x_min * sx,
      y_min: self.y_min * sy,
      x_max: self.x_max * sx,
      y_max: self.y_max * sy,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
  pub name: String,
  #[serde(default)]
  pub color: String,
  pub qc: QcVerdict,
  #[serde(default)]
  pub reason: String,
  pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
  pub text: String,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub objects: Vec<Defect>,
}

// 模型有时以 `"objects": null` 表示没有缺陷
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Defect>, D::Error> {
  Ok(Option::<Vec<Defect>>::deserialize(deserializer)?.unwrap_or_default())
}

/// 整图结论的汇总方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VerdictPolicy {
  /// 取第一个缺陷的结论
  FirstDefect,
  /// 任一缺陷为 NOK 即为 NOK
  #[default]
  AnyNok,
}

impl DefectReport {
  pub fn has_defects(&self) -> bool {
    !self.objects.is_empty()
  }

  /// 没有缺陷时为 OK
  pub fn verdict(&self, policy: VerdictPolicy) -> QcVerdict {
    match policy {
      VerdictPolicy::FirstDefect => self
        .objects
        .first()
        .map(|defect| defect.qc)
        .unwrap_or(QcVerdict::Ok),
      VerdictPolicy::AnyNok => {
        if self.objects.iter().any(|defect| defect.qc == QcVerdict::Nok) {
          QcVerdict::Nok
        } else {
          QcVerdict::Ok
        }
      }
    }
  }
}

pub mod nova;
pub mod parse;
pub mod prompt;
pub mod request;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verdict_parses_loosely() {
    assert_eq!("ok".parse::<QcVerdict>(), Ok(QcVerdict::Ok));
    assert_eq!(" NOK ".parse::<QcVerdict>(), Ok(QcVerdict::Nok));
    assert!("maybe".parse::<QcVerdict>().is_err());
  }

  #[test]
  fn scale_then_normalize_recovers_box() {
    let bbox = BoundingBox {
      x_min: 120.0,
      y_min: 35.5,
      x_max: 980.0,
      y_max: 777.0,
    };
    let back = bbox.scale(1333, 719).normalize(1333, 719);
    assert!((back.x_min - bbox.x_min).abs() < 1e-3);
    assert!((back.y_min - bbox.y_min).abs() < 1e-3);
    assert!((back.x_max - bbox.x_max).abs() < 1e-3);
    assert!((back.y_max - bbox.y_max).abs() < 1e-3);
  }

  #[test]
  fn scale_is_linear_in_image_size() {
    let bbox = BoundingBox {
      x_min: 500.0,
      y_min: 250.0,
      x_max: 1000.0,
      y_max: 1000.0,
    };
    let scaled = bbox.scale(800, 400);
    assert_eq!(
      scaled,
      PixelBox {
        x_min: 400.0,
        y_min: 100.0,
        x_max: 800.0,
        y_max: 400.0,
      }
    );
  }

  fn defect(name: &str, qc: QcVerdict) -> Defect {
    Defect {
      name: name.to_string(),
      color: "grey".to_string(),
      qc,
      reason: String::new(),
      bbox: BoundingBox {
        x_min: 0.0,
        y_min: 0.0,
        x_max: 10.0,
        y_max: 10.0,
      },
    }
  }

  #[test]
  fn verdict_policies_disagree_when_first_is_ok() {
    let report = DefectReport {
      text: "two regions".to_string(),
      objects: vec![defect("a", QcVerdict::Ok), defect("b", QcVerdict::Nok)],
    };
    assert_eq!(report.verdict(VerdictPolicy::FirstDefect), QcVerdict::Ok);
    assert_eq!(report.verdict(VerdictPolicy::AnyNok), QcVerdict::Nok);
  }

  #[test]
  fn empty_report_is_ok() {
    let report = DefectReport {
      text: "clean".to_string(),
      objects: Vec::new(),
    };
    assert_eq!(report.verdict(VerdictPolicy::FirstDefect), QcVerdict::Ok);
    assert_eq!(report.verdict(VerdictPolicy::AnyNok), QcVerdict::Ok);
  }

  #[test]
  fn report_without_objects_field_is_empty() {
    let report: DefectReport = serde_json::from_str(r#"{"text": "clean part"}"#).unwrap();
    assert!(!report.has_defects());
  }
}
