// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/input/v4l_input.rs - V4L2 摄像头静态图像输入
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
use tracing::{debug, error, info};
use url::Url;
use v4l::{
  FourCC,
  buffer::Type,
  io::{mmap::Stream, traits::CaptureStream},
  prelude::*,
  video::Capture,
};

use crate::{FromUrl, FromUrlWithScheme, query_value};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
// 自动曝光需要几帧才能稳定
const WARMUP_FRAMES: usize = 3;

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Invalid query parameter: {0}")]
  InvalidParameter(String),
  #[error("V4L error: {0}")]
  V4lError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
  #[error("Captured buffer size mismatch: {0} bytes")]
  BufferSizeMismatch(usize),
}

/// 每次拉取时打开一次捕获流，抓取一张静态图像
pub struct V4lInput {
  device_path: String,
  width: u32,
  height: u32,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l2";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let device_path = if url.path().is_empty() || url.path() == "/" {
      "/dev/video0".to_string()
    } else {
      url.path().to_string()
    };

    let dimension = |key: &str, default: u32| -> Result<u32, V4lInputError> {
      query_value::<u32>(url, key)
        .transpose()
        .map_err(|e| V4lInputError::InvalidParameter(format!("{}: {}", key, e)))
        .map(|v| v.unwrap_or(default))
    };

    let input = V4lInput {
      device_path,
      width: dimension("width", DEFAULT_WIDTH)?,
      height: dimension("height", DEFAULT_HEIGHT)?,
    };

    // 提前打开一次设备，尽早暴露配置错误
    let device = Device::with_path(&input.device_path)?;
    let caps = device.query_caps()?;
    info!("摄像头: {} ({})", caps.card, input.device_path);

    Ok(input)
  }
}

impl V4lInput {
  fn capture(&self) -> Result<RgbImage, V4lInputError> {
    let device = Device::with_path(&self.device_path)?;

    let mut format = device.format()?;
    format.width = self.width;
    format.height = self.height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(V4lInputError::UnsupportedPixelFormat(format.fourcc.to_string()));
    }

    let mut stream = Stream::with_buffers(&device, Type::VideoCapture, 4)?;
    for _ in 0..WARMUP_FRAMES {
      stream.next()?;
    }
    let (buffer, meta) = stream.next()?;
    debug!("捕获图像: {}x{}, 序号 {}", format.width, format.height, meta.sequence);

    let rgb = yuyv_to_rgb(buffer, format.width, format.height);
    let len = rgb.len();
    RgbImage::from_raw(format.width, format.height, rgb)
      .ok_or(V4lInputError::BufferSizeMismatch(len))
  }
}

impl Iterator for V4lInput {
  type Item = Result<RgbImage, V4lInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    Some(self.capture())
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for chunk in yuyv.chunks_exact(4).take((width * height / 2) as usize) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}
