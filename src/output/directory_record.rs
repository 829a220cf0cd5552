// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{DateTime, Datelike, Utc};
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{FromUrl, FromUrlWithScheme, decision::ClassificationResult, output::Render, query_flag};

const RESULTS_FILE: &str = "results.jsonl";

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  timestamp: String,
  sequence: u32,
  #[serde(flatten)]
  result: &'a ClassificationResult,
  #[serde(skip_serializing_if = "Option::is_none")]
  image: Option<String>,
}

/// 按日期分目录追加 JSON 行记录，可选保存拍到的图像
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  save_image: bool,
  sequence: Mutex<u32>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let output = Self::new(uri.path(), query_flag(uri, "image"));
    std::fs::create_dir_all(&output.directory)?;
    Ok(output)
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, save_image: bool) -> Self {
    Self {
      directory: directory.into(),
      save_image,
      sequence: Mutex::new(0),
    }
  }

  fn next_sequence(&self) -> u32 {
    let mut counter = self.sequence.lock().unwrap_or_else(|e| e.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn day_directory(&self, now: &DateTime<Utc>) -> PathBuf {
    self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()))
  }

  pub fn record_at(
    &self,
    now: DateTime<Utc>,
    frame: &RgbImage,
    result: &ClassificationResult,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self.day_directory(&now);
    std::fs::create_dir_all(&directory)?;
    let sequence = self.next_sequence();

    let image = if self.save_image {
      let filename = format!("{}-{:04X}.png", now.format("%H-%M-%S"), sequence);
      frame.save(directory.join(&filename))?;
      Some(filename)
    } else {
      None
    };

    let record = Record {
      timestamp: now.to_rfc3339(),
      sequence,
      result,
      image,
    };
    let line = serde_json::to_string(&record)?;

    let path = directory.join(RESULTS_FILE);
    append_line(&path, &line)?;
    debug!("记录结果 #{} -> {}", sequence, path.display());
    Ok(path)
  }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
  let mut file = OpenOptions::new().create(true).append(true).open(path)?;
  writeln!(file, "{}", line)
}

impl Render<RgbImage, ClassificationResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &ClassificationResult) -> Result<(), Self::Error> {
    self.record_at(Utc::now(), frame, result).map(|_| ())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{category::BinCategory, decision::Source};
  use chrono::TimeZone;

  fn result() -> ClassificationResult {
    ClassificationResult {
      item: Some("yogurt cup".to_string()),
      bin: BinCategory::Plastic,
      confidence: 0.7,
      source: Source::Remote,
      reason: Some("rinsed plastic".to_string()),
      bin_name: None,
    }
  }

  #[test]
  fn appends_json_lines_under_dated_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path(), false);
    let now = Utc.with_ymd_and_hms(2026, 3, 7, 12, 30, 0).unwrap();

    let path = output.record_at(now, &RgbImage::new(2, 2), &result()).unwrap();
    output.record_at(now, &RgbImage::new(2, 2), &result()).unwrap();

    assert_eq!(path, dir.path().join("2026/03/07/results.jsonl"));
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["sequence"], 1);
    assert_eq!(lines[1]["sequence"], 2);
    assert_eq!(lines[0]["bin"], "plastic");
    assert_eq!(lines[0]["source"], "remote");
    assert_eq!(lines[0]["reason"], "rinsed plastic");
    assert!(lines[0].get("image").is_none());
  }

  #[test]
  fn saves_image_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?image", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 7, 8, 5, 9).unwrap();

    let path = output.record_at(now, &RgbImage::new(3, 3), &result()).unwrap();

    let line: serde_json::Value =
      serde_json::from_str(std::fs::read_to_string(path).unwrap().trim()).unwrap();
    assert_eq!(line["image"], "08-05-09-0001.png");
    let saved = image::open(dir.path().join("2026/03/07/08-05-09-0001.png")).unwrap();
    assert_eq!(saved.width(), 3);
  }
}
