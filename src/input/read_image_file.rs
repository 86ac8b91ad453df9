// 该文件是 Zhijian （质检） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode_url_path, input::ImageAsset, query_param};

pub const DEFAULT_MAX_WIDTH: u32 = 1024;
pub const DEFAULT_MAX_HEIGHT: u32 = 1024;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Invalid size bound: {0}x{1}")]
  InvalidBounds(u32, u32),
  #[error("Invalid query parameter '{0}': {1}")]
  InvalidParameter(String, String),
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 计算在 `max_width x max_height` 范围内保持宽高比的目标尺寸，不放大
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
  if width == 0 || height == 0 {
    return (width, height);
  }

  let scale = (max_width as f64 / width as f64)
    .min(max_height as f64 / height as f64)
    .min(1.0);

  let w = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
  let h = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
  (w, h)
}

impl ImageAsset {
  /// 读取图像文件，缩放到给定范围内并重新编码为 PNG
  pub fn load(
    path: impl AsRef<Path>,
    max_width: u32,
    max_height: u32,
  ) -> Result<Self, ImageFileInputError> {
    if max_width == 0 || max_height == 0 {
      return Err(ImageFileInputError::InvalidBounds(max_width, max_height));
    }

    let path = path.as_ref();
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let (orig_w, orig_h) = (image.width(), image.height());
    let (w, h) = fit_within(orig_w, orig_h, max_width, max_height);

    let image = if (w, h) != (orig_w, orig_h) {
      debug!("缩放图像 {}: {}x{} -> {}x{}", path.display(), orig_w, orig_h, w, h);
      image.resize_exact(w, h, FilterType::Lanczos3)
    } else {
      image
    };

    Self::from_dynamic(image)
  }

  /// 从内存中的图像构建，统一转为 RGB 后编码
  pub fn from_dynamic(image: DynamicImage) -> Result<Self, ImageFileInputError> {
    let rgb = image.into_rgb8();
    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    let base64 = STANDARD.encode(&bytes);

    Ok(ImageAsset {
      width: rgb.width(),
      height: rgb.height(),
      bytes,
      base64,
      image: rgb,
    })
  }
}

/// 由 `image:///path?max_width=..&max_height=..` 描述的图像文件
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
  max_width: u32,
  max_height: u32,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

fn parse_dimension(url: &Url, key: &str, default: u32) -> Result<u32, ImageFileInputError> {
  match query_param(url, key) {
    Some(value) => value
      .parse()
      .map_err(|_| ImageFileInputError::InvalidParameter(key.to_string(), value)),
    None => Ok(default),
  }
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::from_url_with_defaults(url, DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT)
  }
}

impl ImageFileInput {
  /// 查询参数中未给出尺寸上限时使用 `max_width x max_height`
  pub fn from_url_with_defaults(
    url: &Url,
    max_width: u32,
    max_height: u32,
  ) -> Result<Self, ImageFileInputError> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Ok(ImageFileInput {
      path: PathBuf::from(decode_url_path(url)),
      max_width: parse_dimension(url, "max_width", max_width)?,
      max_height: parse_dimension(url, "max_height", max_height)?,
    })
  }

  pub fn new(path: impl Into<PathBuf>) -> Self {
    ImageFileInput {
      path: path.into(),
      max_width: DEFAULT_MAX_WIDTH,
      max_height: DEFAULT_MAX_HEIGHT,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn max_size(&self) -> (u32, u32) {
    (self.max_width, self.max_height)
  }

  pub fn load(&self) -> Result<ImageAsset, ImageFileInputError> {
    ImageAsset::load(&self.path, self.max_width, self.max_height)
  }
}
