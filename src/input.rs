// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/input.rs - 图像输入与拍照触发
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
use thiserror::Error;
use tracing::info;

use crate::FromUrl;

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError};

pub mod trigger;
pub use self::trigger::{Trigger, TriggerError, TriggerWrapper};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L input error: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[error("Trigger error: {0}")]
  TriggerError(#[from] TriggerError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

/// 每次拉取得到一张任意分辨率的 RGB 静态图像
pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    if url.scheme() == ImageFileInput::SCHEME {
      return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
    }
    #[cfg(feature = "v4l_input")]
    {
      if url.scheme() == V4lInput::SCHEME {
        return Ok(InputWrapper::V4l(V4lInput::from_url(url)?));
      }
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Iterator for InputWrapper {
  type Item = Result<RgbImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next().map(|r| r.map_err(InputError::from)),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.next().map(|r| r.map_err(InputError::from)),
    }
  }
}

/// 等待触发后再从内部来源拉取图像
pub struct TriggeredInput<I, T> {
  inner: I,
  trigger: T,
}

impl<I, T> TriggeredInput<I, T> {
  pub fn new(inner: I, trigger: T) -> Self {
    Self { inner, trigger }
  }
}

impl<I, T> Iterator for TriggeredInput<I, T>
where
  I: Iterator<Item = Result<RgbImage, InputError>>,
  T: Trigger,
{
  type Item = Result<RgbImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.trigger.wait() {
      Ok(true) => {
        info!("触发拍照");
        self.inner.next()
      }
      Ok(false) => {
        info!("触发源已结束");
        None
      }
      Err(e) => Some(Err(e.into())),
    }
  }
}
