// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/bin/trashpi.rs - 垃圾分类箱主程序
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

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use trashpi::{
  FromUrl,
  classifier::load_local_classifier,
  config::{Args, Settings, init_tracing, load_dotenv},
  decision::DecisionOrchestrator,
  input::{InputWrapper, TriggerWrapper, trigger::EnterTrigger, TriggeredInput},
  output::Outputs,
  remote::HttpRemoteClassifier,
  task::{ContinuousTask, Task, install_interrupt_handler},
};

fn main() -> Result<()> {
  let dotenv = load_dotenv();
  let settings = Settings::try_from(Args::parse())?;
  init_tracing(settings.debug);

  match dotenv {
    Ok(Some(path)) => info!("已加载环境文件: {}", path.display()),
    Ok(None) => {}
    Err(e) => warn!("环境文件读取失败: {}", e),
  }

  info!("TrashPi 垃圾分类箱");
  info!("模型: {:?}", settings.model.as_ref().map(|u| u.as_str()));
  info!("输入来源: {}", settings.input);
  info!("触发方式: {}", settings.trigger);
  info!("置信度阈值: {}", settings.confidence_threshold);

  let local = load_local_classifier(settings.model.as_ref());
  let remote = match HttpRemoteClassifier::new(settings.remote.clone()) {
    Ok(remote) => Some(remote),
    Err(e) => {
      error!("远程分类客户端创建失败，只使用本地结果: {}", e);
      None
    }
  };
  let decider =
    DecisionOrchestrator::new(local, remote).with_threshold(settings.confidence_threshold);

  let source = InputWrapper::from_url(&settings.input)?;
  let trigger = match TriggerWrapper::from_url(&settings.trigger) {
    Ok(trigger) => trigger,
    Err(e) => {
      warn!("触发器 {} 不可用 ({})，改用回车键触发", settings.trigger, e);
      TriggerWrapper::Enter(EnterTrigger::stdin())
    }
  };
  let outputs = Outputs::from_urls(&settings.outputs);
  info!("已启用 {} 个输出", outputs.len());

  let stop = install_interrupt_handler()?;
  ContinuousTask::default()
    .with_hold(settings.hold)
    .with_max_cycles(settings.max_cycles)
    .with_stop_flag(stop)
    .run_task(TriggeredInput::new(source, trigger), decider, outputs)
}
