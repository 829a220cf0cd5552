// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/decision.rs - 分类决策：本地推理与远程回退
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
use serde::Serialize;
use tracing::{debug, info};

use crate::{
  category::{BinCategory, map_label},
  classifier::LocalInference,
  remote::{RemoteClassifier, RemoteVerdict},
};

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Local,
  Remote,
}

/// 一次分类周期的最终结果，产出后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
  pub item: Option<String>,
  pub bin: BinCategory,
  pub confidence: f32,
  pub source: Source,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  /// 远程服务给出的垃圾桶显示名称
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bin_name: Option<String>,
}

impl ClassificationResult {
  fn local(item: Option<String>, bin: BinCategory, confidence: f32) -> Self {
    Self {
      item,
      bin,
      confidence: clamp_confidence(confidence),
      source: Source::Local,
      reason: None,
      bin_name: None,
    }
  }

  fn remote(verdict: RemoteVerdict) -> Self {
    Self {
      item: verdict.item,
      bin: verdict.bin,
      confidence: clamp_confidence(verdict.confidence.unwrap_or(0.0)),
      source: Source::Remote,
      reason: verdict.reason,
      bin_name: verdict.bin_name,
    }
  }
}

fn clamp_confidence(confidence: f32) -> f32 {
  if confidence.is_nan() {
    0.0
  } else {
    confidence.clamp(0.0, 1.0)
  }
}

/// 决策器：先本地推理，置信度不足时请求一次远程服务
pub struct DecisionOrchestrator<L, R> {
  local: L,
  remote: R,
  threshold: f32,
}

impl<L: LocalInference, R: RemoteClassifier> DecisionOrchestrator<L, R> {
  pub fn new(local: L, remote: R) -> Self {
    Self {
      local,
      remote,
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }

  pub fn with_threshold(mut self, threshold: f32) -> Self {
    debug_assert!(
      (0.0..=1.0).contains(&threshold),
      "置信度阈值必须在 0.0 到 1.0 之间: {}",
      threshold
    );
    self.threshold = threshold;
    self
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 总是返回一个结果，协作方的失败在此吸收
  pub fn decide(&self, image: &RgbImage) -> ClassificationResult {
    let prediction = self.local.classify(image);
    // 先归一再比较阈值，NaN 视为 0
    let confidence = clamp_confidence(prediction.confidence);
    let bin = map_label(prediction.label.as_deref());
    debug!(
      "本地结果: {:?} ({:.1}%) -> {}",
      prediction.label,
      confidence * 100.0,
      bin
    );

    if confidence < self.threshold {
      info!(
        "本地置信度不足 ({:.1}% < {:.1}%)，请求远程分类",
        confidence * 100.0,
        self.threshold * 100.0
      );
      if let Some(verdict) = self.remote.classify_remote(image) {
        return ClassificationResult::remote(verdict);
      }
      info!("远程分类不可用，使用本地结果");
    }

    ClassificationResult::local(prediction.label, bin, confidence)
  }
}
