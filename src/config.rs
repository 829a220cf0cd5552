// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/config.rs - 项目参数配置
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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::remote::RemoteConfig;

/// TrashPi 参数配置，命令行优先，其次环境变量（可来自 .env 文件）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 本地模型 URL，例如 rknn:///opt/trashpi/models/trashnet.rknn；
  /// 不提供时所有分类都请求远程服务
  #[arg(long, env = "MODEL_URL", value_name = "MODEL")]
  pub model: Option<Url>,

  /// 图像来源
  /// - 图片文件: image:///path/to/snapshot.jpg[?repeat]
  /// - V4L2 摄像头: v4l2:///dev/video0[?width=640&height=480]
  #[arg(long, env = "INPUT_URL", value_name = "SOURCE", default_value = "v4l2:///dev/video0")]
  pub input: Url,

  /// 拍照触发方式
  /// - PIR 传感器: gpio:///sys/class/gpio/gpio4[?poll_ms=50]
  /// - 回车键: enter://
  /// - 立即触发: none://
  #[arg(long, env = "TRIGGER_URL", value_name = "TRIGGER", default_value = "gpio:///sys/class/gpio/gpio4")]
  pub trigger: Url,

  /// 结果输出，可重复
  /// - 日志: log://
  /// - LED: gpio:///sys/class/gpio?paper=17&plastic=27&food=22&mixed=23
  /// - 语音: speech://espeak?voice=is&rate=150
  /// - 记录目录: folder:///var/lib/trashpi[?image]
  #[arg(
    long,
    value_name = "OUTPUT",
    default_values = ["log://", "gpio:///sys/class/gpio", "speech://espeak?voice=is&rate=150"]
  )]
  pub output: Vec<Url>,

  /// 远程分类服务地址
  #[arg(long, env = "API_URL", value_name = "URL", default_value = "https://trash.myx.is/api")]
  pub api_url: Url,

  /// 设备标识
  #[arg(long, env = "DEVICE_ID", default_value = "trashpi-001")]
  pub device_id: String,

  /// 地区（市镇）标识
  #[arg(long, env = "SVEITARFELAG", default_value = "reykjavik")]
  pub region: String,

  /// 本地置信度阈值 (0.0 - 1.0)，低于该值时请求远程服务
  #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value = "0.8", value_name = "THRESHOLD")]
  pub confidence_threshold: f32,

  /// 远程请求超时（秒）
  #[arg(long, default_value = "10", value_name = "SECONDS")]
  pub remote_timeout_secs: u64,

  /// 结果保持时间（秒），之后熄灭指示灯
  #[arg(long, default_value = "8", value_name = "SECONDS")]
  pub hold_secs: u64,

  /// 最大分类次数，0 表示无限制
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_cycles: usize,

  /// 输出调试日志
  #[arg(
    long,
    env = "DEBUG",
    action = clap::ArgAction::SetTrue,
    value_parser = clap::builder::FalseyValueParser::new()
  )]
  pub debug: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须在 0.0 到 1.0 之间: {0}")]
  InvalidThreshold(f32),
  #[error("远程超时必须大于 0 秒")]
  InvalidTimeout,
  #[error("远程服务地址必须是 http 或 https: {0}")]
  InvalidApiUrl(String),
}

/// 启动时读取一次的运行配置
#[derive(Debug, Clone)]
pub struct Settings {
  pub model: Option<Url>,
  pub input: Url,
  pub trigger: Url,
  pub outputs: Vec<Url>,
  pub remote: RemoteConfig,
  pub confidence_threshold: f32,
  pub hold: Duration,
  pub max_cycles: Option<usize>,
  pub debug: bool,
}

/// 校验决策相关配置；所有入口在构建决策器前调用
pub fn validate_decision_config(
  confidence_threshold: f32,
  remote_timeout_secs: u64,
  api_url: &Url,
) -> Result<(), ConfigError> {
  if !(0.0..=1.0).contains(&confidence_threshold) {
    return Err(ConfigError::InvalidThreshold(confidence_threshold));
  }
  if remote_timeout_secs == 0 {
    return Err(ConfigError::InvalidTimeout);
  }
  if !matches!(api_url.scheme(), "http" | "https") {
    return Err(ConfigError::InvalidApiUrl(api_url.to_string()));
  }
  Ok(())
}

impl TryFrom<Args> for Settings {
  type Error = ConfigError;

  fn try_from(args: Args) -> Result<Self, Self::Error> {
    validate_decision_config(
      args.confidence_threshold,
      args.remote_timeout_secs,
      &args.api_url,
    )?;

    Ok(Settings {
      model: args.model,
      input: args.input,
      trigger: args.trigger,
      outputs: args.output,
      remote: RemoteConfig {
        api_url: args.api_url,
        device_id: args.device_id,
        region: args.region,
        timeout: Duration::from_secs(args.remote_timeout_secs),
      },
      confidence_threshold: args.confidence_threshold,
      hold: Duration::from_secs(args.hold_secs),
      max_cycles: (args.max_cycles > 0).then_some(args.max_cycles),
      debug: args.debug,
    })
  }
}

/// 加载 .env 文件；文件不存在不算错误
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
  match dotenvy::dotenv() {
    Ok(path) => Ok(Some(path)),
    Err(e) if e.not_found() => Ok(None),
    Err(e) => Err(e),
  }
}

/// 初始化日志；RUST_LOG 优先于 debug 开关
pub fn init_tracing(debug: bool) {
  let default_level = if debug { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}
