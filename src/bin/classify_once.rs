// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/bin/classify_once.rs - 对单张图片分类并输出 JSON
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

use anyhow::Result;
use clap::Parser;
use image::RgbImage;
use url::Url;

use trashpi::{
  classifier::load_local_classifier,
  config::{init_tracing, load_dotenv, validate_decision_config},
  decision::{ClassificationResult, DEFAULT_CONFIDENCE_THRESHOLD, DecisionOrchestrator},
  input::ImageFileInput,
  output::Render,
  remote::{HttpRemoteClassifier, RemoteConfig},
  task::{OneShotTask, Task},
};

/// 对一张图片运行完整的分类决策，结果以 JSON 打印到标准输出
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 图片文件路径
  #[arg(value_name = "IMAGE")]
  image: PathBuf,

  /// 本地模型 URL
  #[arg(long, env = "MODEL_URL", value_name = "MODEL")]
  model: Option<Url>,

  /// 远程分类服务地址
  #[arg(long, env = "API_URL", default_value = "https://trash.myx.is/api")]
  api_url: Url,

  #[arg(long, env = "DEVICE_ID", default_value = "trashpi-001")]
  device_id: String,

  #[arg(long, env = "SVEITARFELAG", default_value = "reykjavik")]
  region: String,

  #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
  confidence_threshold: f32,

  /// 远程请求超时（秒）
  #[arg(long, default_value_t = 10)]
  remote_timeout_secs: u64,

  /// 不请求远程服务
  #[arg(long)]
  offline: bool,

  #[arg(long, env = "DEBUG", action = clap::ArgAction::SetTrue, value_parser = clap::builder::FalseyValueParser::new())]
  debug: bool,
}

struct PrintJson;

impl Render<RgbImage, ClassificationResult> for PrintJson {
  type Error = serde_json::Error;

  fn render_result(&self, _frame: &RgbImage, result: &ClassificationResult) -> Result<(), Self::Error> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
  }
}

fn main() -> Result<()> {
  load_dotenv()?;
  let args = Args::parse();
  init_tracing(args.debug);
  validate_decision_config(
    args.confidence_threshold,
    args.remote_timeout_secs,
    &args.api_url,
  )?;

  let local = load_local_classifier(args.model.as_ref());
  let remote = if args.offline {
    None
  } else {
    Some(HttpRemoteClassifier::new(RemoteConfig {
      api_url: args.api_url,
      device_id: args.device_id,
      region: args.region,
      timeout: Duration::from_secs(args.remote_timeout_secs),
    })?)
  };
  let decider = DecisionOrchestrator::new(local, remote).with_threshold(args.confidence_threshold);

  OneShotTask.run_task(ImageFileInput::new(args.image, false), decider, PrintJson)
}
