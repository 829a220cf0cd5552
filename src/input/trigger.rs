// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/input/trigger.rs - 拍照触发（PIR 传感器、回车键）
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

use std::{
  io::{BufRead, BufReader, Stdin},
  path::PathBuf,
  thread,
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, query_value};

const DEFAULT_POLL_MS: u64 = 50;

#[derive(Error, Debug)]
pub enum TriggerError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("参数错误: {0}")]
  InvalidParameter(String),
}

pub trait Trigger {
  /// 阻塞直到下一次触发；返回 false 表示不会再有触发
  fn wait(&mut self) -> Result<bool, TriggerError>;
}

/// 等待标准输入的一行（没有运动传感器时使用）
pub struct EnterTrigger<R> {
  reader: R,
}

impl EnterTrigger<BufReader<Stdin>> {
  pub fn stdin() -> Self {
    Self {
      reader: BufReader::new(std::io::stdin()),
    }
  }
}

impl<R: BufRead> EnterTrigger<R> {
  pub fn with_reader(reader: R) -> Self {
    Self { reader }
  }
}

/// 读取进程标准输入的回车触发
pub type StdinEnterTrigger = EnterTrigger<BufReader<Stdin>>;

impl FromUrlWithScheme for StdinEnterTrigger {
  const SCHEME: &'static str = "enter";
}

impl FromUrl for StdinEnterTrigger {
  type Error = TriggerError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TriggerError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::stdin())
  }
}

impl<R: BufRead> Trigger for EnterTrigger<R> {
  fn wait(&mut self) -> Result<bool, TriggerError> {
    info!("按回车键拍照...");
    let mut line = String::new();
    let read = self.reader.read_line(&mut line)?;
    Ok(read > 0)
  }
}

/// 轮询 sysfs GPIO 值文件，等待 PIR 传感器输出高电平
pub struct GpioMotionTrigger {
  value_path: PathBuf,
  poll: Duration,
}

impl FromUrlWithScheme for GpioMotionTrigger {
  const SCHEME: &'static str = "gpio";
}

impl FromUrl for GpioMotionTrigger {
  type Error = TriggerError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TriggerError::SchemeMismatch(url.scheme().to_string()));
    }

    let poll_ms = query_value::<u64>(url, "poll_ms")
      .transpose()
      .map_err(|e| TriggerError::InvalidParameter(format!("poll_ms: {}", e)))?
      .unwrap_or(DEFAULT_POLL_MS);

    let trigger = Self::new(url.path(), Duration::from_millis(poll_ms));
    // 启动时读一次，确认引脚已导出
    trigger.is_active()?;
    Ok(trigger)
  }
}

impl GpioMotionTrigger {
  /// path 可以是引脚目录（如 /sys/class/gpio/gpio4）或其 value 文件
  pub fn new(path: impl Into<PathBuf>, poll: Duration) -> Self {
    let path = path.into();
    let value_path = if path.is_dir() { path.join("value") } else { path };
    Self { value_path, poll }
  }

  fn is_active(&self) -> Result<bool, TriggerError> {
    let value = std::fs::read_to_string(&self.value_path)?;
    Ok(value.trim() == "1")
  }
}

impl Trigger for GpioMotionTrigger {
  fn wait(&mut self) -> Result<bool, TriggerError> {
    debug!("等待运动传感器: {}", self.value_path.display());
    while !self.is_active()? {
      thread::sleep(self.poll);
    }
    info!("检测到运动");
    Ok(true)
  }
}

/// 立即触发，用于单次或批量运行
pub struct ImmediateTrigger;

impl Trigger for ImmediateTrigger {
  fn wait(&mut self) -> Result<bool, TriggerError> {
    Ok(true)
  }
}

pub enum TriggerWrapper {
  Enter(StdinEnterTrigger),
  GpioMotion(GpioMotionTrigger),
  Immediate(ImmediateTrigger),
}

impl FromUrl for TriggerWrapper {
  type Error = TriggerError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      StdinEnterTrigger::SCHEME => Ok(TriggerWrapper::Enter(StdinEnterTrigger::from_url(url)?)),
      GpioMotionTrigger::SCHEME => Ok(TriggerWrapper::GpioMotion(GpioMotionTrigger::from_url(url)?)),
      "none" => Ok(TriggerWrapper::Immediate(ImmediateTrigger)),
      other => Err(TriggerError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Trigger for TriggerWrapper {
  fn wait(&mut self) -> Result<bool, TriggerError> {
    match self {
      TriggerWrapper::Enter(trigger) => trigger.wait(),
      TriggerWrapper::GpioMotion(trigger) => trigger.wait(),
      TriggerWrapper::Immediate(trigger) => trigger.wait(),
    }
  }
}
