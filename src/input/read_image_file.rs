// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::PathBuf;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, query_flag};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 从文件读取图像；repeat 模式下每次拉取都重新读取，
/// 便于外部拍照程序不断覆盖同一快照文件
pub struct ImageFileInput {
  path: PathBuf,
  repeat: bool,
  consumed: bool,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Ok(ImageFileInput {
      path: PathBuf::from(url.path()),
      repeat: query_flag(url, "repeat"),
      consumed: false,
    })
  }
}

impl ImageFileInput {
  pub fn new(path: impl Into<PathBuf>, repeat: bool) -> Self {
    Self {
      path: path.into(),
      repeat,
      consumed: false,
    }
  }

  fn read(&self) -> Result<RgbImage, ImageFileInputError> {
    let image = ImageReader::open(&self.path)?.decode()?.to_rgb8();
    debug!(
      "读取图像 {}: {}x{}",
      self.path.display(),
      image.width(),
      image.height()
    );
    Ok(image)
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<RgbImage, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.consumed && !self.repeat {
      return None;
    }
    self.consumed = true;
    Some(self.read())
  }
}
