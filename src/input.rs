// 该文件是 Zhijian （质检） 项目的一部分。
// src/input.rs - 图像输入定义
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

use image::RgbImage;

mod read_image_file;
pub use self::read_image_file::{
  DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, ImageFileInput, ImageFileInputError, fit_within,
};

/// 一次质检中使用的图像：PNG 字节、base64 文本与解码后的像素
#[derive(Debug, Clone)]
pub struct ImageAsset {
  /// PNG 编码后的原始字节
  pub bytes: Vec<u8>,
  /// `bytes` 的 base64 文本
  pub base64: String,
  /// 缩放后的 RGB 图像
  pub image: RgbImage,
  pub width: u32,
  pub height: u32,
}
