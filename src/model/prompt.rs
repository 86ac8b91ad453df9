// 该文件是 Zhijian （质检） 项目的一部分。
// src/model/prompt.rs - 默认提示词
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

use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced quality control inspector \
on a manufacturing line. You inspect product images for visible defects such as scratches, \
dents, cracks, missing parts, misalignment, contamination and discoloration. You answer \
precisely and only report what is visible in the image.";

pub const DEFAULT_INSTRUCTION: &str = r#"Inspect the product in this image for defects.
Respond with a single JSON object and nothing else, using exactly this schema:
{
  "text": "<short description of the product and the overall inspection result>",
  "objects": [
    {
      "name": "<unique name of the defect or inspected region>",
      "color": "<dominant color of the region>",
      "qc": "OK" or "NOK",
      "reason": "<why the region is OK or NOK>",
      "bbox": {"x_min": <int>, "y_min": <int>, "x_max": <int>, "y_max": <int>}
    }
  ]
}
Bounding box coordinates are in a normalized 1000x1000 space where (0, 0) is the top-left
corner of the image. If the product has no defects, return an empty "objects" list.
Do not wrap the JSON in markdown."#;

/// 参考图像前附加的说明，避免模型为参考图输出边界框
pub const REFERENCE_DISCLAIMER: &str = "The following image is a reference image of a \
good product for comparison only. Ignore bounding boxes for this image and do not report \
defects on it.";

/// 从文件读取提示词，未指定文件时使用默认值
pub fn load_or_default(path: Option<&Path>, default: &str) -> std::io::Result<String> {
  match path {
    Some(path) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
    None => Ok(default.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn default_when_no_file() {
    let prompt = load_or_default(None, DEFAULT_SYSTEM_PROMPT).unwrap();
    assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
  }

  #[test]
  fn file_overrides_default() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "  inspect the weld seam  ").unwrap();
    let prompt = load_or_default(Some(file.path()), DEFAULT_INSTRUCTION).unwrap();
    assert_eq!(prompt, "inspect the weld seam");
  }

  #[test]
  fn instruction_names_every_field() {
    for field in ["text", "objects", "name", "color", "qc", "reason", "x_min", "y_max"] {
      assert!(DEFAULT_INSTRUCTION.contains(field), "missing {}", field);
    }
  }
}
