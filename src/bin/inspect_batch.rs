// 该文件是 Zhijian （质检） 项目的一部分。
// src/bin/inspect_batch.rs - 批量质检
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use tracing::info;
use zhijian::{
  config::InspectArgs,
  task::{BatchTask, Task},
};

/// Zhijian 批量质检参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待检图像列表
  #[arg(long, value_name = "SUBJECT", num_args = 1.., required = true)]
  pub subjects: Vec<Url>,
  /// 输出目录，每张图像生成标注图与 JSON 报告
  #[arg(long, value_name = "DIR")]
  pub output_dir: Option<PathBuf>,

  #[command(flatten)]
  pub inspect: InspectArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.inspect.model);
  info!("待检图像数量: {}", args.subjects.len());

  let subjects = args
    .subjects
    .iter()
    .map(|url| args.inspect.image_input(url))
    .collect::<Result<Vec<_>>>()?;
  let reference = args.inspect.reference_input()?;

  let mut session = args.inspect.session()?;
  let summary = BatchTask {
    subjects,
    reference,
    output_dir: args.output_dir,
  }
  .run_task(&mut session)?;

  println!(
    "OK: {}, NOK: {}, 失败: {}",
    summary.ok, summary.nok, summary.failed
  );

  if summary.failed > 0 {
    std::process::exit(2);
  }
  Ok(())
}
