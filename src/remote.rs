// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/remote.rs - 远程分类回退客户端
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

use std::time::Duration;

use base64::Engine;
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::category::BinCategory;

/// 设备类型标签
pub const DEVICE_TYPE: &str = "trashpi";
/// 默认请求超时
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
const JPEG_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("图像编码错误: {0}")]
  EncodeError(#[from] image::ImageError),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("远程服务返回状态码 {0}")]
  StatusError(reqwest::StatusCode),
  #[error("响应格式错误: {0}")]
  MalformedResponse(String),
  #[error("URL 错误: {0}")]
  UrlError(#[from] url::ParseError),
}

#[derive(Debug, Serialize)]
pub struct RemoteRequest<'a> {
  pub image: String,
  pub device_id: &'a str,
  pub device_type: &'a str,
  pub region: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RemoteResponse {
  pub bin: Option<String>,
  pub item: Option<String>,
  pub confidence: Option<f32>,
  pub reason: Option<String>,
  pub bin_name: Option<String>,
}

/// 远程服务给出的有效结论
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVerdict {
  pub bin: BinCategory,
  pub item: Option<String>,
  pub confidence: Option<f32>,
  pub reason: Option<String>,
  pub bin_name: Option<String>,
}

impl TryFrom<RemoteResponse> for RemoteVerdict {
  type Error = RemoteError;

  fn try_from(response: RemoteResponse) -> Result<Self, Self::Error> {
    let bin_name = response
      .bin
      .ok_or_else(|| RemoteError::MalformedResponse("缺少 bin 字段".to_string()))?;
    let bin = BinCategory::from_wire(&bin_name)
      .ok_or_else(|| RemoteError::MalformedResponse(format!("未知的垃圾桶类别: {}", bin_name)))?;

    Ok(RemoteVerdict {
      bin,
      item: response.item,
      confidence: response.confidence,
      reason: response.reason,
      bin_name: response.bin_name,
    })
  }
}

pub trait RemoteClassifier {
  /// 任何失败都返回 None，调用方回退到本地结果
  fn classify_remote(&self, image: &RgbImage) -> Option<RemoteVerdict>;
}

impl<R: RemoteClassifier + ?Sized> RemoteClassifier for Box<R> {
  fn classify_remote(&self, image: &RgbImage) -> Option<RemoteVerdict> {
    (**self).classify_remote(image)
  }
}

/// 远程客户端未能创建时，所有回退请求都视为失败
impl<R: RemoteClassifier> RemoteClassifier for Option<R> {
  fn classify_remote(&self, image: &RgbImage) -> Option<RemoteVerdict> {
    self.as_ref().and_then(|remote| remote.classify_remote(image))
  }
}

/// 将图像编码为 JPEG 再转为 base64 文本
pub fn encode_image_base64(image: &RgbImage) -> Result<String, RemoteError> {
  let mut buffer = Vec::new();
  image.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?;
  Ok(base64::engine::general_purpose::STANDARD.encode(&buffer))
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub api_url: Url,
  pub device_id: String,
  pub region: String,
  pub timeout: Duration,
}

/// `{api_url}/classify`；基地址的查询串与片段不会带入请求地址
fn classify_endpoint(api_url: &Url) -> Result<Url, url::ParseError> {
  let mut base = api_url.clone();
  base.set_query(None);
  base.set_fragment(None);
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }
  base.join("classify")
}

pub struct HttpRemoteClassifier {
  client: Client,
  endpoint: Url,
  device_id: String,
  region: String,
}

impl HttpRemoteClassifier {
  pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
    let endpoint = classify_endpoint(&config.api_url)?;
    let client = Client::builder().timeout(config.timeout).build()?;

    info!(
      "远程分类服务: {} (设备 {}, 地区 {}, 超时 {:?})",
      endpoint, config.device_id, config.region, config.timeout
    );

    Ok(Self {
      client,
      endpoint,
      device_id: config.device_id,
      region: config.region,
    })
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  fn try_classify(&self, image: &RgbImage) -> Result<RemoteVerdict, RemoteError> {
    let request = RemoteRequest {
      image: encode_image_base64(image)?,
      device_id: &self.device_id,
      device_type: DEVICE_TYPE,
      region: &self.region,
    };
    debug!("发送远程分类请求, 图像大小 {} 字节", request.image.len());

    let response = self
      .client
      .post(self.endpoint.clone())
      .json(&request)
      .send()?;

    let status = response.status();
    if !status.is_success() {
      return Err(RemoteError::StatusError(status));
    }

    let body = response.text()?;
    let parsed: RemoteResponse =
      serde_json::from_str(&body).map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;
    RemoteVerdict::try_from(parsed)
  }
}

impl RemoteClassifier for HttpRemoteClassifier {
  fn classify_remote(&self, image: &RgbImage) -> Option<RemoteVerdict> {
    let now = std::time::Instant::now();
    match self.try_classify(image) {
      Ok(verdict) => {
        info!("远程分类完成: {} ({:.2?})", verdict.bin, now.elapsed());
        Some(verdict)
      }
      Err(e) => {
        warn!("远程分类失败 ({:.2?}): {}", now.elapsed(), e);
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn response(json: &str) -> RemoteResponse {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn verdict_requires_bin_field() {
    let result = RemoteVerdict::try_from(response(r#"{"item": "bottle", "confidence": 0.9}"#));
    assert!(matches!(result, Err(RemoteError::MalformedResponse(_))));
  }

  #[test]
  fn verdict_rejects_unknown_bin() {
    let result = RemoteVerdict::try_from(response(r#"{"bin": "hazmat"}"#));
    assert!(matches!(result, Err(RemoteError::MalformedResponse(_))));
  }

  #[test]
  fn verdict_accepts_deposit_bin() {
    let verdict = RemoteVerdict::try_from(response(
      r#"{"bin": "deposit", "item": "Coca-Cola can", "confidence": 0.97}"#,
    ))
    .unwrap();
    assert_eq!(verdict.bin, BinCategory::Deposit);
    assert_eq!(verdict.item.as_deref(), Some("Coca-Cola can"));
  }

  #[test]
  fn verdict_carries_optional_fields() {
    let verdict = RemoteVerdict::try_from(response(
      r#"{"success": true, "item": "PLA vase", "bin": "mixed", "bin_name": "Blandaður úrgangur",
          "reason": "3D print", "confidence": 0.87, "points": 10}"#,
    ))
    .unwrap();

    assert_eq!(verdict.bin, BinCategory::Mixed);
    assert_eq!(verdict.item.as_deref(), Some("PLA vase"));
    assert_eq!(verdict.confidence, Some(0.87));
    assert_eq!(verdict.reason.as_deref(), Some("3D print"));
  }

  #[test]
  fn encoded_image_is_base64_jpeg() {
    let image = RgbImage::from_pixel(8, 8, Rgb([120, 60, 30]));
    let encoded = encode_image_base64(&image).unwrap();
    let bytes = base64::engine::general_purpose::STANDARD
      .decode(encoded)
      .unwrap();

    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
  }

  #[test]
  fn endpoint_appends_classify_path() {
    let config = RemoteConfig {
      api_url: Url::parse("https://trash.myx.is/api/").unwrap(),
      device_id: "trashpi-001".to_string(),
      region: "reykjavik".to_string(),
      timeout: DEFAULT_REMOTE_TIMEOUT,
    };
    let client = HttpRemoteClassifier::new(config).unwrap();
    assert_eq!(client.endpoint().as_str(), "https://trash.myx.is/api/classify");
  }

  #[test]
  fn endpoint_drops_query_and_fragment() {
    let endpoint = |url: &str| classify_endpoint(&Url::parse(url).unwrap()).unwrap();

    assert_eq!(
      endpoint("https://trash.myx.is/api?key=abc#top").as_str(),
      "https://trash.myx.is/api/classify"
    );
    assert_eq!(
      endpoint("https://trash.myx.is/api").as_str(),
      "https://trash.myx.is/api/classify"
    );
    assert_eq!(
      endpoint("http://127.0.0.1:8080").as_str(),
      "http://127.0.0.1:8080/classify"
    );
  }
}
