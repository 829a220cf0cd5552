// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/output.rs - 输出定义
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
use tracing::{error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decision::ClassificationResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;

  /// 保持时间结束后复位（例如熄灭指示灯）
  fn clear(&self) -> Result<(), Self::Error> {
    Ok(())
  }
}

mod log_output;
pub use self::log_output::LogOutput;

mod gpio_indicator;
pub use self::gpio_indicator::{GpioIndicatorError, GpioIndicatorOutput};

mod speech;
pub use self::speech::{SpeechOutput, SpeechOutputError};

mod directory_record;
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("GPIO 指示灯错误: {0}")]
  GpioIndicatorError(#[from] GpioIndicatorError),
  #[error("语音播报错误: {0}")]
  SpeechOutputError(#[from] SpeechOutputError),
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("{0} 个输出失败")]
  PartialFailure(usize),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Log(LogOutput),
  GpioIndicator(GpioIndicatorOutput),
  Speech(SpeechOutput),
  DirectoryRecord(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput)),
      GpioIndicatorOutput::SCHEME => Ok(OutputWrapper::GpioIndicator(
        GpioIndicatorOutput::from_url(url)?,
      )),
      SpeechOutput::SCHEME => Ok(OutputWrapper::Speech(SpeechOutput::from_url(url)?)),
      DirectoryRecordOutput::SCHEME => Ok(OutputWrapper::DirectoryRecord(
        DirectoryRecordOutput::from_url(url)?,
      )),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<RgbImage, ClassificationResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(
    &self,
    frame: &RgbImage,
    result: &ClassificationResult,
  ) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output
        .render_result(frame, result)
        .map_err(|never| match never {}),
      OutputWrapper::GpioIndicator(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::Speech(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::DirectoryRecord(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }

  fn clear(&self) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::GpioIndicator(output) => output.clear().map_err(OutputError::from),
      _ => Ok(()),
    }
  }
}

/// 同时渲染到多个输出；单个输出失败不影响其他输出
pub struct Outputs<O = OutputWrapper> {
  sinks: Vec<O>,
}

impl<O> Outputs<O> {
  pub fn new(sinks: Vec<O>) -> Self {
    Self { sinks }
  }

  pub fn len(&self) -> usize {
    self.sinks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sinks.is_empty()
  }
}

impl Outputs<OutputWrapper> {
  /// 逐个创建输出，创建失败的输出被跳过；全部失败时退化为日志输出
  pub fn from_urls(urls: &[Url]) -> Self {
    let mut sinks = Vec::with_capacity(urls.len());
    for url in urls {
      match OutputWrapper::from_url(url) {
        Ok(sink) => sinks.push(sink),
        Err(e) => error!("输出 {} 不可用: {}", url, e),
      }
    }
    if sinks.is_empty() {
      warn!("没有可用的输出，使用日志输出");
      sinks.push(OutputWrapper::Log(LogOutput));
    }
    Self { sinks }
  }
}

impl<Frame, Output, O> Render<Frame, Output> for Outputs<O>
where
  O: Render<Frame, Output>,
  O::Error: std::fmt::Display,
{
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error> {
    let failed = self
      .sinks
      .iter()
      .filter_map(|sink| sink.render_result(frame, result).err())
      .inspect(|e| warn!("输出失败: {}", e))
      .count();
    if failed > 0 {
      return Err(OutputError::PartialFailure(failed));
    }
    Ok(())
  }

  fn clear(&self) -> Result<(), Self::Error> {
    let failed = self
      .sinks
      .iter()
      .filter_map(|sink| sink.clear().err())
      .inspect(|e| warn!("输出复位失败: {}", e))
      .count();
    if failed > 0 {
      return Err(OutputError::PartialFailure(failed));
    }
    Ok(())
  }
}
