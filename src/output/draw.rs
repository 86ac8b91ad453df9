// 该文件是 Zhijian （质检） 项目的一部分。
// src/output/draw.rs - 缺陷检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{PixelBox, QcVerdict};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BORDER_THICKNESS: i32 = 2;

pub const NOK_COLOR: [u8; 3] = [255, 0, 0]; // 红色
pub const OK_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

/// 未指定字体时依次尝试的系统字体
pub const DEFAULT_FONT_PATHS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
}

pub fn verdict_color(qc: QcVerdict) -> [u8; 3] {
  match qc {
    QcVerdict::Ok => OK_COLOR,
    QcVerdict::Nok => NOK_COLOR,
  }
}

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    let font = DEFAULT_FONT_PATHS
      .iter()
      .map(|path| Path::new(*path))
      .filter(|path| path.exists())
      .find_map(|path| load_font(path).ok());

    if font.is_none() {
      warn!("未找到可用字体，仅绘制边框，不绘制标签文本");
    }

    Self::with_font(font)
  }
}

fn load_font(path: &Path) -> Result<FontArc, DrawError> {
  let data = std::fs::read(path)?;
  let font = FontArc::try_from_vec(data)?;
  debug!("加载字体: {}", path.display());
  Ok(font)
}

impl Draw {
  pub fn with_font(font: Option<FontArc>) -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font,
    }
  }

  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    Ok(Self::with_font(Some(load_font(path.as_ref())?)))
  }

  /// 在图像上绘制像素坐标的矩形边框及标签；框在图像外或退化时返回 false
  pub fn draw_bbox_with_label(
    &self,
    image: &mut RgbImage,
    bbox: &PixelBox,
    label: &str,
    color: [u8; 3],
  ) -> bool {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return false;
    }

    let x_min = (bbox.x_min.floor() as i32).clamp(0, w - 1);
    let y_min = (bbox.y_min.floor() as i32).clamp(0, h - 1);
    let x_max = (bbox.x_max.ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox.y_max.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return false;
    }

    // 绘制边框（加粗）
    for thickness in 0..BORDER_THICKNESS {
      let x_min_t = (x_min + thickness).min(x_max);
      let y_min_t = (y_min + thickness).min(y_max);
      let x_max_t = (x_max - thickness).max(x_min);
      let y_max_t = (y_max - thickness).max(y_min);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, Rgb(color));
        image.put_pixel(x as u32, y_max_t as u32, Rgb(color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, Rgb(color));
        image.put_pixel(x_max_t as u32, y as u32, Rgb(color));
      }
    }

    if let Some(font) = &self.font {
      self.draw_label(image, font, x_min, y_min, label, color);
    }

    true
  }

  fn draw_label(
    &self,
    image: &mut RgbImage,
    font: &FontArc,
    x_min: i32,
    y_min: i32,
    label: &str,
    color: [u8; 3],
  ) {
    let w = image.width() as i32;
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    // 估算文本大小（粗略估计）
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签背景放在边框上方，空间不足时贴着图像上沿
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(color));

      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        label,
      );
    }
  }
}
