// 该文件是 Zhijian （质检） 项目的一部分。
// src/bin/inspect_oneshot.rs - 单次质检
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use tracing::{error, info};
use zhijian::{
  FromUrl,
  config::InspectArgs,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// Zhijian 单次质检参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待检图像，例如 image:///data/part.jpg
  #[arg(long, value_name = "SUBJECT")]
  pub subject: Url,
  /// 输出路径，可重复：image:///out/part.png 或 json:///out/part.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,

  #[command(flatten)]
  pub inspect: InspectArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.inspect.model);
  info!("待检图像: {}", args.subject);
  if let Some(reference) = &args.inspect.reference {
    info!("参考图像: {}", reference);
  }

  let subject = args.inspect.image_input(&args.subject)?;
  let reference = args.inspect.reference_input()?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let mut session = args.inspect.session()?;
  let verdict = OneShotTask {
    subject,
    reference,
    outputs,
  }
  .run_task(&mut session)?;

  match verdict {
    Some(verdict) => {
      info!("质检结论: {}", verdict);
      Ok(())
    }
    None => {
      error!("本次质检没有结果，请根据上面的提示处理后重新运行");
      std::process::exit(2);
    }
  }
}
