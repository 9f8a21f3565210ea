//! HTTPクライアント
//!
//! フォームエンジンは `HttpClient` トレイト越しに通信する。
//! 実装は reqwest（Bearerトークン認証、タイムアウト付き）。

use crate::error::{ApiErrorBody, FormgenError, Result};
use async_trait::async_trait;
use formgen_common::{FileSource, Part, Payload, SelectedFile};
use reqwest::{multipart, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Value>;
    async fn post(&self, url: &str, body: Payload) -> Result<Value>;
    async fn put(&self, url: &str, body: Payload) -> Result<Value>;
    async fn delete(&self, url: &str) -> Result<Value>;
}

pub struct ReqwestClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl ReqwestClient {
    pub fn new(token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self { client, token })
    }

    async fn send(&self, method: Method, url: &str, body: Option<Payload>) -> Result<Value> {
        debug!(%method, url, "HTTPリクエスト");
        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request = match body {
            Some(Payload::Json(map)) => request.json(&map),
            Some(Payload::Multipart(parts)) => request.multipart(build_form(parts).await?),
            None => request,
        };

        let response = request.send().await?;
        handle_response(response, url).await
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Value> {
        self.send(Method::GET, url, None).await
    }

    async fn post(&self, url: &str, body: Payload) -> Result<Value> {
        self.send(Method::POST, url, Some(body)).await
    }

    async fn put(&self, url: &str, body: Payload) -> Result<Value> {
        self.send(Method::PUT, url, Some(body)).await
    }

    async fn delete(&self, url: &str) -> Result<Value> {
        self.send(Method::DELETE, url, None).await
    }
}

/// ファイル実体を読み込む
pub async fn read_file_bytes(file: &SelectedFile) -> Result<Vec<u8>> {
    match &file.source {
        FileSource::Memory(bytes) => Ok(bytes.as_ref().clone()),
        FileSource::Path(path) => Ok(tokio::fs::read(path).await?),
    }
}

async fn build_form(parts: Vec<(String, Part)>) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for (key, part) in parts {
        form = match part {
            Part::Text(text) => form.text(key, text),
            Part::File(file) => {
                let bytes = read_file_bytes(&file).await?;
                let part = multipart::Part::bytes(bytes)
                    .file_name(file.name.clone())
                    .mime_str(&file.mime)?;
                form.part(key, part)
            }
        };
    }
    Ok(form)
}

async fn handle_response(response: reqwest::Response, url: &str) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!(status = status.as_u16(), url, "HTTPエラー");
        let body = serde_json::from_str::<ApiErrorBody>(&text).ok();
        return Err(FormgenError::Http {
            status: status.as_u16(),
            body,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}
