// 该文件是 Zhijian （质检） 项目的一部分。
// src/model/parse.rs - 模型响应解析
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

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::DefectReport;

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("响应中没有文本内容 (output.message.content[].text)")]
  MissingText,
  #[error("模型输出中没有完整的 JSON 对象")]
  NoJsonBlock,
  #[error("缺陷报告 JSON 解析失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("缺陷名称重复: {0}")]
  DuplicateDefect(String),
}

/// 取出响应中第一个文本块
pub fn response_text(response: &Value) -> Option<&str> {
  response
    .pointer("/output/message/content")?
    .as_array()?
    .iter()
    .find_map(|block| block.get("text").and_then(Value::as_str))
}

/// 返回文本中第一个括号配平的 `{...}` 片段，字符串字面量中的括号与转义不参与计数
pub fn extract_json_block(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, c) in text[start..].char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }

    match c {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..start + offset + 1]);
        }
      }
      _ => {}
    }
  }

  None
}

pub fn parse_report_text(text: &str) -> Result<DefectReport, ReportError> {
  let block = extract_json_block(text).ok_or(ReportError::NoJsonBlock)?;
  debug!("提取到 JSON 片段，长度 {}", block.len());
  let report: DefectReport = serde_json::from_str(block)?;

  let mut seen = HashSet::new();
  for defect in &report.objects {
    if !seen.insert(defect.name.as_str()) {
      return Err(ReportError::DuplicateDefect(defect.name.clone()));
    }
  }

  Ok(report)
}

pub fn parse_report(response: &Value) -> Result<DefectReport, ReportError> {
  let text = response_text(response).ok_or(ReportError::MissingText)?;
  parse_report_text(text)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn block_inside_markdown_fence() {
    let text = "```json\n{\"text\": \"ok\", \"objects\": []}\n```";
    assert_eq!(
      extract_json_block(text),
      Some("{\"text\": \"ok\", \"objects\": []}")
    );
  }

  #[test]
  fn braces_and_fences_inside_strings_survive() {
    let text = r#"{"text": "label reads \"{```json}\" }", "objects": []} trailing"#;
    let block = extract_json_block(text).unwrap();
    let report = parse_report_text(block).unwrap();
    assert_eq!(report.text, "label reads \"{```json}\" }");
  }

  #[test]
  fn null_objects_mean_no_defects() {
    let report = parse_report_text(r#"{"text": "clean part", "objects": null}"#).unwrap();
    assert!(!report.has_defects());
    assert_eq!(report.verdict(crate::model::VerdictPolicy::FirstDefect), crate::model::QcVerdict::Ok);
  }

  #[test]
  fn unbalanced_block_is_none() {
    assert_eq!(extract_json_block(r#"{"text": "x", "objects": ["#), None);
    assert_eq!(extract_json_block("no json here"), None);
  }

  #[test]
  fn first_text_block_is_used() {
    let response = json!({
      "output": {"message": {"content": [
        {"image": {}},
        {"text": "{\"text\": \"first\"}"},
        {"text": "{\"text\": \"second\"}"}
      ]}}
    });
    assert_eq!(parse_report(&response).unwrap().text, "first");
  }

  #[test]
  fn missing_content_is_reported() {
    assert!(matches!(
      parse_report(&json!({"output": {}})),
      Err(ReportError::MissingText)
    ));
  }

  #[test]
  fn duplicate_names_are_rejected() {
    let text = r#"{"text": "t", "objects": [
      {"name": "scratch", "color": "grey", "qc": "NOK", "reason": "r",
       "bbox": {"x_min": 1, "y_min": 1, "x_max": 2, "y_max": 2}},
      {"name": "scratch", "color": "grey", "qc": "NOK", "reason": "r",
       "bbox": {"x_min": 3, "y_min": 3, "x_max": 4, "y_max": 4}}
    ]}"#;
    assert!(matches!(
      parse_report_text(text),
      Err(ReportError::DuplicateDefect(name)) if name == "scratch"
    ));
  }
}
