// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/output/speech.rs - 语音播报输出
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

use std::process::{Command, ExitStatus, Stdio};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decision::ClassificationResult, output::Render, query_value};

const DEFAULT_PROGRAM: &str = "espeak";
const DEFAULT_VOICE: &str = "is";
const DEFAULT_RATE: u32 = 150;

#[derive(Error, Debug)]
pub enum SpeechOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("参数错误: {0}")]
  InvalidParameter(String),
  #[error("无法启动语音程序 {0}: {1}")]
  SpawnError(String, std::io::Error),
  #[error("语音程序异常退出: {0}")]
  ExitError(ExitStatus),
}

/// 调用外部 TTS 程序（默认 espeak）朗读垃圾桶名称
pub struct SpeechOutput {
  program: String,
  voice: String,
  rate: u32,
}

impl FromUrlWithScheme for SpeechOutput {
  const SCHEME: &'static str = "speech";
}

impl FromUrl for SpeechOutput {
  type Error = SpeechOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SpeechOutputError::SchemeMismatch);
    }

    let program = match url.host_str() {
      Some(host) if !host.is_empty() => host.to_string(),
      _ => DEFAULT_PROGRAM.to_string(),
    };
    let voice = url
      .query_pairs()
      .find(|(k, _)| k == "voice")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_VOICE.to_string());
    let rate = query_value::<u32>(url, "rate")
      .transpose()
      .map_err(|e| SpeechOutputError::InvalidParameter(format!("rate: {}", e)))?
      .unwrap_or(DEFAULT_RATE);

    let output = Self::new(program, voice, rate);
    output.probe()?;
    info!("语音播报: {} (声音 {}, 语速 {})", output.program, output.voice, output.rate);
    Ok(output)
  }
}

impl SpeechOutput {
  pub fn new(program: impl Into<String>, voice: impl Into<String>, rate: u32) -> Self {
    Self {
      program: program.into(),
      voice: voice.into(),
      rate,
    }
  }

  /// 确认程序可以启动
  fn probe(&self) -> Result<(), SpeechOutputError> {
    Command::new(&self.program)
      .arg("--version")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map(|_| ())
      .map_err(|e| SpeechOutputError::SpawnError(self.program.clone(), e))
  }

  pub fn say(&self, text: &str) -> Result<(), SpeechOutputError> {
    debug!("播报: {}", text);
    let status = Command::new(&self.program)
      .arg("-v")
      .arg(&self.voice)
      .arg("-s")
      .arg(self.rate.to_string())
      .arg(text)
      .stdout(Stdio::null())
      .status()
      .map_err(|e| SpeechOutputError::SpawnError(self.program.clone(), e))?;
    if !status.success() {
      return Err(SpeechOutputError::ExitError(status));
    }
    Ok(())
  }
}

impl Render<RgbImage, ClassificationResult> for SpeechOutput {
  type Error = SpeechOutputError;

  fn render_result(&self, _frame: &RgbImage, result: &ClassificationResult) -> Result<(), Self::Error> {
    self.say(result.bin.name_is())
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::{category::BinCategory, decision::Source};

  fn result() -> ClassificationResult {
    ClassificationResult {
      item: Some("newspaper".to_string()),
      bin: BinCategory::Paper,
      confidence: 0.9,
      source: Source::Local,
      reason: None,
      bin_name: None,
    }
  }

  #[test]
  fn url_selects_program_and_voice() {
    let url = Url::parse("speech://true?voice=en&rate=120").unwrap();
    let output = SpeechOutput::from_url(&url).unwrap();
    assert_eq!(output.program, "true");
    assert_eq!(output.voice, "en");
    assert_eq!(output.rate, 120);
    assert!(output.render_result(&RgbImage::new(1, 1), &result()).is_ok());
  }

  #[test]
  fn missing_program_fails_at_setup() {
    let url = Url::parse("speech://trashpi-no-such-tts").unwrap();
    assert!(matches!(
      SpeechOutput::from_url(&url),
      Err(SpeechOutputError::SpawnError(..))
    ));
  }

  #[test]
  fn nonzero_exit_is_an_error() {
    let output = SpeechOutput::new("false", "is", 150);
    assert!(matches!(
      output.render_result(&RgbImage::new(1, 1), &result()),
      Err(SpeechOutputError::ExitError(_))
    ));
  }

  #[test]
  fn bad_rate_is_rejected() {
    let url = Url::parse("speech://true?rate=fast").unwrap();
    assert!(matches!(
      SpeechOutput::from_url(&url),
      Err(SpeechOutputError::InvalidParameter(_))
    ));
  }
}
