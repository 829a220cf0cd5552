// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/output/gpio_indicator.rs - GPIO 指示灯输出
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, category::BinCategory, decision::ClassificationResult,
  output::Render,
};

const DEFAULT_GPIO_BASE: &str = "/sys/class/gpio";

/// 每个垃圾桶一条 LED 灯带的默认引脚
const DEFAULT_PINS: [(BinCategory, u32); 4] = [
  (BinCategory::Paper, 17),
  (BinCategory::Plastic, 27),
  (BinCategory::Food, 22),
  (BinCategory::Mixed, 23),
];

#[derive(Error, Debug)]
pub enum GpioIndicatorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("引脚参数错误: {0}")]
  InvalidPin(String),
  #[error("GPIO {0} 操作失败: {1}")]
  IoError(u32, std::io::Error),
}

#[derive(Debug)]
struct Led {
  bin: BinCategory,
  pin: u32,
  value_path: PathBuf,
}

impl Led {
  fn set(&self, on: bool) -> Result<(), GpioIndicatorError> {
    std::fs::write(&self.value_path, if on { "1" } else { "0" })
      .map_err(|e| GpioIndicatorError::IoError(self.pin, e))
  }
}

/// 通过 sysfs GPIO 点亮对应垃圾桶的 LED，同时熄灭其他 LED
pub struct GpioIndicatorOutput {
  leds: Vec<Led>,
}

impl FromUrlWithScheme for GpioIndicatorOutput {
  const SCHEME: &'static str = "gpio";
}

impl FromUrl for GpioIndicatorOutput {
  type Error = GpioIndicatorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GpioIndicatorError::SchemeMismatch);
    }

    let base = if url.path().is_empty() || url.path() == "/" {
      PathBuf::from(DEFAULT_GPIO_BASE)
    } else {
      PathBuf::from(url.path())
    };

    let mut pins: Vec<(BinCategory, u32)> = DEFAULT_PINS.to_vec();
    for (key, value) in url.query_pairs() {
      let bin = BinCategory::from_wire(&key)
        .ok_or_else(|| GpioIndicatorError::InvalidPin(format!("未知的垃圾桶类别: {}", key)))?;
      let pin = value
        .parse::<u32>()
        .map_err(|e| GpioIndicatorError::InvalidPin(format!("{}={}: {}", key, value, e)))?;
      pins.retain(|(b, _)| *b != bin);
      pins.push((bin, pin));
    }

    Self::setup(&base, &pins)
  }
}

impl GpioIndicatorOutput {
  /// 导出引脚并设为输出，初始全部熄灭
  pub fn setup(base: &Path, pins: &[(BinCategory, u32)]) -> Result<Self, GpioIndicatorError> {
    let mut leds = Vec::with_capacity(pins.len());
    for &(bin, pin) in pins {
      let pin_dir = base.join(format!("gpio{}", pin));
      if !pin_dir.exists() {
        debug!("导出 GPIO {}", pin);
        std::fs::write(base.join("export"), pin.to_string())
          .map_err(|e| GpioIndicatorError::IoError(pin, e))?;
      }
      std::fs::write(pin_dir.join("direction"), "out")
        .map_err(|e| GpioIndicatorError::IoError(pin, e))?;

      let led = Led {
        bin,
        pin,
        value_path: pin_dir.join("value"),
      };
      led.set(false)?;
      leds.push(led);
    }

    info!("GPIO 指示灯就绪: {:?}", pins);
    Ok(Self { leds })
  }

  fn light(&self, bin: BinCategory) -> Result<(), GpioIndicatorError> {
    for led in &self.leds {
      led.set(false)?;
    }
    match self.leds.iter().find(|led| led.bin == bin) {
      Some(led) => {
        debug!("LED: {} (GPIO {})", bin, led.pin);
        led.set(true)
      }
      None => {
        debug!("{} 没有对应的指示灯", bin);
        Ok(())
      }
    }
  }
}

impl Render<RgbImage, ClassificationResult> for GpioIndicatorOutput {
  type Error = GpioIndicatorError;

  fn render_result(&self, _frame: &RgbImage, result: &ClassificationResult) -> Result<(), Self::Error> {
    self.light(result.bin)
  }

  fn clear(&self) -> Result<(), Self::Error> {
    self.leds.iter().try_for_each(|led| led.set(false))
  }
}
