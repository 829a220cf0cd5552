// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/classifier.rs - 本地分类器
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
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  frame::{ModelInputFrame, NormalizedNhwcFrame},
  model::{ClassScores, Model, ModelError, TrashNetLabel, WithLabel},
};

/// 本地推理结果；label 为 None 且 confidence 为 0 表示本地不可用
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPrediction {
  pub label: Option<String>,
  pub confidence: f32,
}

impl LocalPrediction {
  pub fn unavailable() -> Self {
    Self {
      label: None,
      confidence: 0.0,
    }
  }
}

pub trait LocalInference {
  fn classify(&self, image: &RgbImage) -> LocalPrediction;
}

impl<L: LocalInference + ?Sized> LocalInference for Box<L> {
  fn classify(&self, image: &RgbImage) -> LocalPrediction {
    (**self).classify(image)
  }
}

/// 包装一个预加载的模型；模型缺失时退化为不可用
pub struct LocalClassifier<M> {
  model: Option<M>,
}

impl<M> LocalClassifier<M> {
  pub fn new(model: M) -> Self {
    Self { model: Some(model) }
  }

  pub fn unavailable() -> Self {
    Self { model: None }
  }

  pub fn is_available(&self) -> bool {
    self.model.is_some()
  }
}

impl<const W: u32, const H: u32, T, M> LocalInference for LocalClassifier<M>
where
  T: WithLabel,
  M: Model<Input = NormalizedNhwcFrame<W, H>, Output = ClassScores<T>>,
  M::Error: std::fmt::Display,
{
  fn classify(&self, image: &RgbImage) -> LocalPrediction {
    let Some(model) = &self.model else {
      debug!("本地模型未加载");
      return LocalPrediction::unavailable();
    };

    let input = NormalizedNhwcFrame::<W, H>::preprocess(image);
    let now = std::time::Instant::now();
    let scores = match model.infer(&input) {
      Ok(scores) => scores,
      Err(e) => {
        warn!("本地推理失败: {}", e);
        return LocalPrediction::unavailable();
      }
    };
    debug!("本地推理耗时: {:.2?}", now.elapsed());

    match scores.top() {
      Some(item) => LocalPrediction {
        label: Some(item.kind.to_label_str()),
        confidence: item.score,
      },
      None => {
        warn!("本地模型输出为空");
        LocalPrediction::unavailable()
      }
    }
  }
}

/// 未编译或未配置模型后端时的占位类型
pub struct NoModel;

impl Model for NoModel {
  type Input = ModelInputFrame;
  type Output = ClassScores<TrashNetLabel>;
  type Error = ModelError;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Err(ModelError::ModelPathError("未加载模型".to_string()))
  }
}

/// 启动阶段按 URL 加载本地分类器，任何失败都退化为不可用
pub fn load_local_classifier(model: Option<&Url>) -> Box<dyn LocalInference> {
  let Some(url) = model else {
    warn!("未配置本地模型，所有分类都将请求远程服务");
    return Box::new(LocalClassifier::<NoModel>::unavailable());
  };

  #[cfg(feature = "model_rknpu")]
  {
    use crate::{
      FromUrl,
      frame::MODEL_INPUT_SIZE,
      model::{TrashNetRknn, TrashNetRknnBuilder},
    };

    let loaded: Result<TrashNetRknn<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, TrashNetLabel>, _> =
      TrashNetRknnBuilder::from_url(url).and_then(|builder| builder.build());
    match loaded {
      Ok(model) => Box::new(LocalClassifier::new(model)),
      Err(e) => {
        error!("本地模型加载失败 ({}): {}", url, e);
        Box::new(LocalClassifier::<NoModel>::unavailable())
      }
    }
  }

  #[cfg(not(feature = "model_rknpu"))]
  {
    error!("未启用 model_rknpu 特性，无法加载模型: {}", url);
    Box::new(LocalClassifier::<NoModel>::unavailable())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;
  use std::cell::RefCell;

  struct FixedModel {
    scores: Vec<f32>,
    seen_shape: RefCell<Option<[usize; 4]>>,
  }

  impl Model for FixedModel {
    type Input = ModelInputFrame;
    type Output = ClassScores<TrashNetLabel>;
    type Error = ModelError;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      *self.seen_shape.borrow_mut() = Some(input.shape());
      Ok(ClassScores::new(self.scores.clone()))
    }
  }

  fn sample_image() -> RgbImage {
    RgbImage::from_pixel(320, 240, Rgb([10, 200, 30]))
  }

  #[test]
  fn classify_returns_argmax_label() {
    let model = FixedModel {
      scores: vec![0.01, 0.02, 0.02, 0.0, 0.95, 0.0],
      seen_shape: RefCell::new(None),
    };
    let classifier = LocalClassifier::new(model);
    let prediction = classifier.classify(&sample_image());

    assert_eq!(prediction.label.as_deref(), Some("plastic"));
    assert_eq!(prediction.confidence, 0.95);
    assert_eq!(
      *classifier.model.as_ref().unwrap().seen_shape.borrow(),
      Some([1, 224, 224, 3])
    );
  }

  #[test]
  fn classify_without_model_is_unavailable() {
    let classifier = LocalClassifier::<FixedModel>::unavailable();
    assert!(!classifier.is_available());
    assert_eq!(
      classifier.classify(&sample_image()),
      LocalPrediction::unavailable()
    );
  }

  #[test]
  fn failing_model_degrades_to_unavailable() {
    let classifier = LocalClassifier::new(NoModel);
    assert_eq!(
      classifier.classify(&sample_image()),
      LocalPrediction::unavailable()
    );
  }

  #[test]
  fn missing_model_url_gives_unavailable_classifier() {
    let classifier = load_local_classifier(None);
    assert_eq!(
      classifier.classify(&sample_image()),
      LocalPrediction::unavailable()
    );
  }
}
