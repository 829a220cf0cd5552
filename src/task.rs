// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/task.rs - 分类任务循环
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use image::RgbImage;
use tracing::{error, info, warn};

use crate::{
  classifier::LocalInference,
  decision::{ClassificationResult, DecisionOrchestrator},
  output::Render,
  remote::RemoteClassifier,
};

/// 默认结果保持时间
pub const DEFAULT_HOLD: Duration = Duration::from_secs(8);
// 收到中断后等待循环退出的最长时间
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);
const HOLD_SLICE: Duration = Duration::from_millis(100);

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, decider: D, output: O) -> Result<(), Self::Error>;
}

/// 安装 Ctrl-C 处理；返回的标志在收到信号后置位
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
  let stop = Arc::new(AtomicBool::new(false));
  let flag = stop.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    flag.store(true, Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(stop)
}

pub struct OneShotTask;

impl<E, I, L, R, O> Task<I, DecisionOrchestrator<L, R>, O> for OneShotTask
where
  E: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = Result<RgbImage, E>>,
  L: LocalInference,
  R: RemoteClassifier,
  O: Render<RgbImage, ClassificationResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    decider: DecisionOrchestrator<L, R>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))??;
    let now = Instant::now();
    let result = decider.decide(&image);
    info!("分类完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&image, &result)?;
    Ok(())
  }
}

#[derive(Debug)]
pub struct ContinuousTask {
  max_cycles: Option<usize>,
  hold: Duration,
  stop: Arc<AtomicBool>,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      max_cycles: None,
      hold: DEFAULT_HOLD,
      stop: Arc::new(AtomicBool::new(false)),
    }
  }
}

impl ContinuousTask {
  pub fn with_max_cycles(mut self, max_cycles: Option<usize>) -> Self {
    self.max_cycles = max_cycles;
    self
  }

  pub fn with_hold(mut self, hold: Duration) -> Self {
    self.hold = hold;
    self
  }

  pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
    self.stop = stop;
    self
  }

  fn stopped(&self) -> bool {
    self.stop.load(Ordering::SeqCst)
  }

  /// 保持结果，期间可被中断
  fn hold(&self) {
    let deadline = Instant::now() + self.hold;
    while !self.stopped() {
      let now = Instant::now();
      if now >= deadline {
        break;
      }
      thread::sleep(HOLD_SLICE.min(deadline - now));
    }
  }
}

impl<E, I, L, R, O> Task<I, DecisionOrchestrator<L, R>, O> for ContinuousTask
where
  E: std::fmt::Display,
  I: Iterator<Item = Result<RgbImage, E>>,
  L: LocalInference,
  R: RemoteClassifier,
  O: Render<RgbImage, ClassificationResult>,
  O::Error: std::fmt::Display,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    decider: DecisionOrchestrator<L, R>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!(
      "开始任务, 阈值 {:.2}, 保持 {:?}, 最大次数 {:?}",
      decider.threshold(),
      self.hold,
      self.max_cycles
    );

    let mut cycle = 0usize;
    for capture in input {
      if self.stopped() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      let image = match capture {
        Ok(image) => image,
        Err(e) => {
          error!("获取图像失败: {}", e);
          continue;
        }
      };

      cycle += 1;
      info!("第 {} 次分类, 图像 {}x{}", cycle, image.width(), image.height());
      let now = Instant::now();
      let result = decider.decide(&image);
      let elapsed = now.elapsed();
      if let Err(e) = output.render_result(&image, &result) {
        warn!("输出结果失败: {}", e);
      }
      info!("分类完成，耗时: {:.2?} / {:.2?}", elapsed, now.elapsed());

      self.hold();
      if let Err(e) = output.clear() {
        warn!("复位输出失败: {}", e);
      }

      if self.max_cycles.is_some_and(|n| cycle >= n) {
        info!("达到指定次数 {}, 退出任务循环", cycle);
        break;
      }
      if self.stopped() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共 {} 次分类，退出", cycle);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    category::BinCategory,
    classifier::LocalPrediction,
    remote::RemoteVerdict,
  };
  use std::cell::{Cell, RefCell};

  struct Fixed;

  impl LocalInference for Fixed {
    fn classify(&self, _image: &RgbImage) -> LocalPrediction {
      LocalPrediction {
        label: Some("paper".to_string()),
        confidence: 0.99,
      }
    }
  }

  struct Offline;

  impl RemoteClassifier for Offline {
    fn classify_remote(&self, _image: &RgbImage) -> Option<RemoteVerdict> {
      None
    }
  }

  #[derive(Default)]
  struct Recorder {
    bins: RefCell<Vec<BinCategory>>,
    clears: Cell<usize>,
  }

  impl Render<RgbImage, ClassificationResult> for &Recorder {
    type Error = std::io::Error;

    fn render_result(&self, _frame: &RgbImage, result: &ClassificationResult) -> Result<(), Self::Error> {
      self.bins.borrow_mut().push(result.bin);
      Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
      self.clears.set(self.clears.get() + 1);
      Ok(())
    }
  }

  fn images(n: usize) -> impl Iterator<Item = Result<RgbImage, std::io::Error>> {
    (0..n).map(|_| Ok(RgbImage::new(4, 4)))
  }

  fn decider() -> DecisionOrchestrator<Fixed, Offline> {
    DecisionOrchestrator::new(Fixed, Offline)
  }

  #[test]
  fn one_shot_renders_once() {
    let recorder = Recorder::default();
    OneShotTask.run_task(images(3), decider(), &recorder).unwrap();
    assert_eq!(*recorder.bins.borrow(), vec![BinCategory::Paper]);
  }

  #[test]
  fn one_shot_without_image_fails() {
    let recorder = Recorder::default();
    assert!(OneShotTask.run_task(images(0), decider(), &recorder).is_err());
  }

  #[test]
  fn continuous_stops_at_max_cycles_and_clears() {
    let recorder = Recorder::default();
    ContinuousTask::default()
      .with_hold(Duration::ZERO)
      .with_max_cycles(Some(2))
      .run_task(images(5), decider(), &recorder)
      .unwrap();
    assert_eq!(recorder.bins.borrow().len(), 2);
    assert_eq!(recorder.clears.get(), 2);
  }

  #[test]
  fn continuous_skips_capture_errors() {
    let recorder = Recorder::default();
    let input = vec![
      Ok(RgbImage::new(4, 4)),
      Err(std::io::Error::other("camera busy")),
      Ok(RgbImage::new(4, 4)),
    ];
    ContinuousTask::default()
      .with_hold(Duration::ZERO)
      .run_task(input.into_iter(), decider(), &recorder)
      .unwrap();
    assert_eq!(recorder.bins.borrow().len(), 2);
  }

  #[test]
  fn continuous_honours_stop_flag() {
    let recorder = Recorder::default();
    let stop = Arc::new(AtomicBool::new(true));
    ContinuousTask::default()
      .with_stop_flag(stop)
      .run_task(images(3), decider(), &recorder)
      .unwrap();
    assert!(recorder.bins.borrow().is_empty());
  }
}
