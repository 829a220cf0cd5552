// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_id(id: u32) -> Option<Self>;
  fn num_labels() -> usize;
}

/// TrashNet 词表，顺序与模型输出一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashNetLabel {
  Cardboard,
  Glass,
  Metal,
  Paper,
  Plastic,
  Trash,
}

impl TrashNetLabel {
  const VOCABULARY: [TrashNetLabel; 6] = [
    TrashNetLabel::Cardboard,
    TrashNetLabel::Glass,
    TrashNetLabel::Metal,
    TrashNetLabel::Paper,
    TrashNetLabel::Plastic,
    TrashNetLabel::Trash,
  ];
}

impl WithLabel for TrashNetLabel {
  fn to_label_str(&self) -> String {
    match self {
      TrashNetLabel::Cardboard => "cardboard",
      TrashNetLabel::Glass => "glass",
      TrashNetLabel::Metal => "metal",
      TrashNetLabel::Paper => "paper",
      TrashNetLabel::Plastic => "plastic",
      TrashNetLabel::Trash => "trash",
    }
    .to_string()
  }

  fn from_label_id(id: u32) -> Option<Self> {
    Self::VOCABULARY.get(id as usize).copied()
  }

  fn num_labels() -> usize {
    Self::VOCABULARY.len()
  }
}

/// 单次前向推理得到的类别分数向量
#[derive(Debug, Clone)]
pub struct ClassScores<T> {
  pub scores: Box<[f32]>,
  _phantom: std::marker::PhantomData<T>,
}

#[derive(Debug, Clone)]
pub struct ClassifyItem<T> {
  pub kind: T,
  pub score: f32,
}

impl<T: WithLabel> ClassScores<T> {
  pub fn new(scores: impl Into<Box<[f32]>>) -> Self {
    Self {
      scores: scores.into(),
      _phantom: std::marker::PhantomData,
    }
  }

  /// 取最高分类别；并列时取索引最小者，NaN 视为最低分
  pub fn top(&self) -> Option<ClassifyItem<T>> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in self.scores.iter().enumerate().take(T::num_labels()) {
      let score = if score.is_nan() { f32::MIN } else { score };
      if best.map(|(_, s)| score > s).unwrap_or(true) {
        best = Some((idx, score));
      }
    }

    best.and_then(|(idx, score)| {
      T::from_label_id(idx as u32).map(|kind| ClassifyItem {
        kind,
        score: score.clamp(0.0, 1.0),
      })
    })
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型输出无效: {0}")]
  InvalidOutput(String),
  #[cfg(feature = "model_rknpu")]
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[cfg(feature = "model_rknpu")]
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
}

#[cfg(feature = "model_rknpu")]
mod trashnet;
#[cfg(feature = "model_rknpu")]
pub use self::trashnet::{TrashNetRknn, TrashNetRknnBuilder};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn top_picks_highest_score() {
    let scores = ClassScores::<TrashNetLabel>::new(vec![0.05, 0.1, 0.02, 0.03, 0.75, 0.05]);
    let top = scores.top().unwrap();
    assert_eq!(top.kind, TrashNetLabel::Plastic);
    assert_eq!(top.score, 0.75);
  }

  #[test]
  fn top_prefers_first_index_on_tie() {
    let scores = ClassScores::<TrashNetLabel>::new(vec![0.4, 0.4, 0.2, 0.0, 0.0, 0.0]);
    assert_eq!(scores.top().unwrap().kind, TrashNetLabel::Cardboard);
  }

  #[test]
  fn top_of_empty_scores_is_none() {
    let scores = ClassScores::<TrashNetLabel>::new(Vec::new());
    assert!(scores.top().is_none());
  }

  #[test]
  fn top_ignores_nan_and_extra_outputs() {
    let scores = ClassScores::<TrashNetLabel>::new(vec![f32::NAN, 0.3, 0.1, 0.1, 0.1, 0.1, 0.99]);
    assert_eq!(scores.top().unwrap().kind, TrashNetLabel::Glass);
  }

  #[test]
  fn label_ids_follow_vocabulary_order() {
    let labels: Vec<String> = (0..6)
      .filter_map(TrashNetLabel::from_label_id)
      .map(|l| l.to_label_str())
      .collect();
    assert_eq!(
      labels,
      ["cardboard", "glass", "metal", "paper", "plastic", "trash"]
    );
    assert!(TrashNetLabel::from_label_id(6).is_none());
  }
}
