// 该文件是 Zhijian （质检） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod config;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 解码 URL 路径中的百分号编码（例如空格、中文文件名）
pub fn decode_url_path(url: &url::Url) -> String {
  let path = url.path();
  urlencoding::decode(path)
    .map(|p| p.into_owned())
    .unwrap_or_else(|_| path.to_string())
}

/// 读取 URL 查询参数
pub fn query_param(url: &url::Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn decode_path_with_spaces() {
    let url = Url::parse("image:///tmp/my%20part.png").unwrap();
    assert_eq!(decode_url_path(&url), "/tmp/my part.png");
  }

  #[test]
  fn query_param_lookup() {
    let url = Url::parse("bedrock:///amazon.nova-pro-v1:0?region=us-west-2&timeout=30").unwrap();
    assert_eq!(query_param(&url, "region").as_deref(), Some("us-west-2"));
    assert_eq!(query_param(&url, "timeout").as_deref(), Some("30"));
    assert_eq!(query_param(&url, "missing"), None);
  }
}
