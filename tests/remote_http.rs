// 该文件是 TrashPi （垃圾分类箱） 项目的一部分。
// tests/remote_http.rs - 远程分类客户端 HTTP 测试
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
use image::{Rgb, RgbImage};
use serde_json::json;
use url::Url;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_partial_json, method, path},
};

use trashpi::{
  category::BinCategory,
  remote::{HttpRemoteClassifier, RemoteClassifier, RemoteConfig, RemoteVerdict},
};

// 阻塞客户端必须在 tokio 运行时之外创建和销毁
async fn classify(server: &MockServer, timeout: Duration) -> Option<RemoteVerdict> {
  let api_url = Url::parse(&format!("{}/api/", server.uri())).unwrap();
  tokio::task::spawn_blocking(move || {
    let client = HttpRemoteClassifier::new(RemoteConfig {
      api_url,
      device_id: "trashpi-007".to_string(),
      region: "akureyri".to_string(),
      timeout,
    })
    .unwrap();
    client.classify_remote(&RgbImage::from_pixel(40, 30, Rgb([200, 30, 30])))
  })
  .await
  .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn posts_image_with_device_metadata() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/classify"))
    .and(body_partial_json(json!({
      "device_id": "trashpi-007",
      "device_type": "trashpi",
      "region": "akureyri",
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "bin": "food",
      "item": "apple core",
      "confidence": 0.92,
      "reason": "organic",
      "bin_name": "Matarleifar",
    })))
    .expect(1)
    .mount(&server)
    .await;

  let verdict = classify(&server, Duration::from_secs(5)).await.unwrap();
  assert_eq!(verdict.bin, BinCategory::Food);
  assert_eq!(verdict.item.as_deref(), Some("apple core"));
  assert_eq!(verdict.confidence, Some(0.92));
  assert_eq!(verdict.reason.as_deref(), Some("organic"));
  assert_eq!(verdict.bin_name.as_deref(), Some("Matarleifar"));

  let requests = server.received_requests().await.unwrap();
  let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
  let jpeg = base64::engine::general_purpose::STANDARD
    .decode(body["image"].as_str().unwrap())
    .unwrap();
  let decoded = image::load_from_memory(&jpeg).unwrap();
  assert_eq!((decoded.width(), decoded.height()), (40, 30));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_means_no_result() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(503))
    .mount(&server)
    .await;

  assert_eq!(classify(&server, Duration::from_secs(5)).await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_bin_means_no_result() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "item": "cup" })))
    .mount(&server)
    .await;

  assert_eq!(classify(&server, Duration::from_secs(5)).await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_bin_means_no_result() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bin": "hazmat" })))
    .mount(&server)
    .await;

  assert_eq!(classify(&server, Duration::from_secs(5)).await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn deposit_answer_is_accepted() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "bin": "deposit",
      "item": "Coca-Cola can",
      "confidence": 0.97,
    })))
    .mount(&server)
    .await;

  let verdict = classify(&server, Duration::from_secs(5)).await.unwrap();
  assert_eq!(verdict.bin, BinCategory::Deposit);
  assert_eq!(verdict.item.as_deref(), Some("Coca-Cola can"));
  assert_eq!(verdict.confidence, Some(0.97));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_body_means_no_result() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
    .mount(&server)
    .await;

  assert_eq!(classify(&server, Duration::from_secs(5)).await, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_hits_timeout() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "bin": "paper" }))
        .set_delay(Duration::from_secs(3)),
    )
    .mount(&server)
    .await;

  let started = std::time::Instant::now();
  assert_eq!(classify(&server, Duration::from_secs(1)).await, None);
  assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn unreachable_server_means_no_result() {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();
  drop(listener);

  let client = HttpRemoteClassifier::new(RemoteConfig {
    api_url: Url::parse(&format!("http://127.0.0.1:{}/api", port)).unwrap(),
    device_id: "trashpi-007".to_string(),
    region: "akureyri".to_string(),
    timeout: Duration::from_secs(1),
  })
  .unwrap();
  assert_eq!(client.classify_remote(&RgbImage::new(8, 8)), None);
}
