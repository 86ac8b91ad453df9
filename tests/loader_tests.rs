use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use pretty_assertions::assert_eq;
use rstest::rstest;
use zhijian::input::{ImageAsset, ImageFileInput, ImageFileInputError};

mod common;

#[rstest]
#[case(1600, 1200, 1024, 1024)]
#[case(640, 480, 1024, 1024)]
#[case(300, 900, 200, 200)]
#[case(1920, 1080, 800, 600)]
#[case(7, 500, 64, 64)]
fn loaded_image_fits_and_keeps_aspect(
  #[case] width: u32,
  #[case] height: u32,
  #[case] max_width: u32,
  #[case] max_height: u32,
) {
  let dir = tempfile::tempdir().unwrap();
  let path = common::write_image(dir.path(), "part.png", width, height);

  let asset = ImageAsset::load(&path, max_width, max_height).unwrap();

  assert!(asset.width <= max_width && asset.height <= max_height);
  assert!(asset.width <= width && asset.height <= height);
  assert_eq!((asset.image.width(), asset.image.height()), (asset.width, asset.height));

  // 宽高比误差不超过一个像素的取整
  let expected_h = asset.width as f64 * height as f64 / width as f64;
  assert!((asset.height as f64 - expected_h).abs() <= 1.0 + height as f64 / width as f64);
}

#[test]
fn small_image_is_not_upscaled() {
  let dir = tempfile::tempdir().unwrap();
  let path = common::write_image(dir.path(), "small.png", 120, 80);
  let asset = ImageAsset::load(&path, 1024, 1024).unwrap();
  assert_eq!((asset.width, asset.height), (120, 80));
}

#[test]
fn jpeg_is_reencoded_as_png_with_matching_base64() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("part.jpg");
  common::gray_image(64, 48).save(&path).unwrap();

  let asset = ImageAsset::load(&path, 1024, 1024).unwrap();

  assert_eq!(image::guess_format(&asset.bytes).unwrap(), ImageFormat::Png);
  assert_eq!(STANDARD.decode(&asset.base64).unwrap(), asset.bytes);
}

#[test]
fn missing_file_is_an_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let input = ImageFileInput::new(dir.path().join("missing.png"));
  assert!(matches!(input.load(), Err(ImageFileInputError::IoError(_))));
}

#[test]
fn corrupt_file_is_a_decode_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("broken.png");
  std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();
  assert!(matches!(
    ImageAsset::load(&path, 100, 100),
    Err(ImageFileInputError::ImageLoadError(_))
  ));
}

#[test]
fn zero_bounds_are_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let path = common::write_image(dir.path(), "part.png", 10, 10);
  assert!(matches!(
    ImageAsset::load(&path, 0, 100),
    Err(ImageFileInputError::InvalidBounds(0, 100))
  ));
}
