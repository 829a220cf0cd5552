// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/frame.rs - 归一化 NHWC 张量帧
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

use image::{RgbImage, imageops::FilterType};

const RGB_CHANNELS: usize = 3;
const BATCH_SIZE: usize = 1;

/// 模型默认输入尺寸
pub const MODEL_INPUT_SIZE: u32 = 224;

pub trait AsNhwcTensor<const W: u32, const H: u32> {
  fn as_nhwc(&self) -> &[f32];
}

/// 批大小为 1、像素值归一化到 [0, 1] 的 NHWC 浮点张量
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNhwcFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> Default for NormalizedNhwcFrame<W, H> {
  fn default() -> Self {
    let size = BATCH_SIZE * RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0f32; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> NormalizedNhwcFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 张量形状 [N, H, W, C]
  pub fn shape(&self) -> [usize; 4] {
    [BATCH_SIZE, H as usize, W as usize, RGB_CHANNELS]
  }

  /// 缩放到模型尺寸并归一化，同一输入总是得到同一张量
  pub fn preprocess(image: &RgbImage) -> Self {
    let resized = if image.dimensions() == (W, H) {
      image.clone()
    } else {
      image::imageops::resize(image, W, H, FilterType::CatmullRom)
    };

    let data = resized
      .as_raw()
      .iter()
      .map(|&v| f32::from(v) / 255.0)
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self { data }
  }
}

impl<const W: u32, const H: u32> From<&RgbImage> for NormalizedNhwcFrame<W, H> {
  fn from(image: &RgbImage) -> Self {
    Self::preprocess(image)
  }
}

impl<const W: u32, const H: u32> AsNhwcTensor<W, H> for NormalizedNhwcFrame<W, H> {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

/// 模型默认输入帧
pub type ModelInputFrame = NormalizedNhwcFrame<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>;

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn preprocess_resizes_and_adds_batch_dimension() {
    let image = RgbImage::from_pixel(640, 480, Rgb([255, 0, 128]));
    let frame = ModelInputFrame::preprocess(&image);

    assert_eq!(frame.shape(), [1, 224, 224, 3]);
    assert_eq!(frame.as_nhwc().len(), 224 * 224 * 3);
  }

  #[test]
  fn preprocess_scales_into_unit_range() {
    let image = RgbImage::from_fn(50, 30, |x, y| Rgb([(x * 5) as u8, (y * 8) as u8, 255]));
    let frame = NormalizedNhwcFrame::<16, 16>::preprocess(&image);

    assert!(frame.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn preprocess_keeps_channel_order() {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
    let frame = NormalizedNhwcFrame::<4, 4>::preprocess(&image);
    let pixel = &frame.as_nhwc()[..3];

    assert_eq!(pixel, &[1.0, 0.0, 0.2]);
  }

  #[test]
  fn preprocess_is_deterministic() {
    let image = RgbImage::from_fn(97, 61, |x, y| Rgb([(x * 3) as u8, (x + y) as u8, (y * 2) as u8]));
    assert_eq!(
      ModelInputFrame::preprocess(&image),
      ModelInputFrame::preprocess(&image)
    );
  }
}
