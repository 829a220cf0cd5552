// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/model/trashnet.rs - TrashNet RKNN 分类模型
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcTensor, NormalizedNhwcFrame},
  model::{ClassScores, Model, ModelError, WithLabel},
};

const TRASHNET_NUM_INPUTS: u32 = 1;
const TRASHNET_NUM_OUTPUTS: u32 = 1;

pub struct TrashNetRknn<const W: u32, const H: u32, T> {
  context: Context,
  _phantom: std::marker::PhantomData<T>,
}

impl ModelError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    ModelError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct TrashNetRknnBuilder {
  model_path: String,
  flags: InitFlags,
}

impl FromUrlWithScheme for TrashNetRknnBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for TrashNetRknnBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(TrashNetRknnBuilder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
    })
  }
}

impl TrashNetRknnBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build<const W: u32, const H: u32, T>(self) -> Result<TrashNetRknn<W, H, T>, ModelError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let context = Context::new(&model_data, self.flags)?;

    let version = context
      .sdk_version()
      .map_err(|e| ModelError::invalid("无法查询 SDK 版本", e))?;
    debug!(
      "RKNN API {:?}, 驱动 {:?}",
      version.api_version().ok(),
      version.driver_version().ok()
    );

    let num_inputs = context
      .num_inputs()
      .map_err(|e| ModelError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| ModelError::invalid("无法获取输出数量", e))?;

    if num_inputs != TRASHNET_NUM_INPUTS || num_outputs != TRASHNET_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        TRASHNET_NUM_INPUTS, TRASHNET_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(ModelError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成");
    Ok(TrashNetRknn {
      context,
      _phantom: std::marker::PhantomData,
    })
  }
}

impl<const W: u32, const H: u32, T: WithLabel> Model for TrashNetRknn<W, H, T> {
  type Input = NormalizedNhwcFrame<W, H>;
  type Output = ClassScores<T>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let bytes: Vec<u8> = input
      .as_nhwc()
      .iter()
      .flat_map(|v| v.to_ne_bytes())
      .collect();

    debug!("设置模型输入: {:?}", input.shape());
    self
      .context
      .set_input(0, &bytes, TensorFormat::NHWC, TensorType::Float32)?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    let scores = output.get_f32(0)?;
    debug!("模型输出分数: {:?}", scores);

    if scores.len() < T::num_labels() {
      return Err(ModelError::InvalidOutput(format!(
        "输出长度 {} 小于类别数 {}",
        scores.len(),
        T::num_labels()
      )));
    }

    Ok(ClassScores::new(scores.to_vec()))
  }
}
