//! ファイルアップロード
//!
//! フィールドごとに1リクエストを同時に発行し、全件成功したときだけ結果を返す。

use crate::error::{FormgenError, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use formgen_common::{Part, Payload, PendingUpload};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// アップロードAPIのレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub full_path: String,
}

/// フィールド単位のアップロード結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub key: String,
    pub response: UploadResponse,
}

#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, uploads: &BTreeMap<String, PendingUpload>) -> Result<Vec<UploadResult>>;
}

/// HttpClient でマルチパートPOSTするアップローダー
pub struct HttpUploader {
    http: Arc<dyn HttpClient>,
    /// ファイルパートのフィールド名
    part_name: String,
}

impl HttpUploader {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            part_name: "file".into(),
        }
    }

    async fn upload_one(&self, key: &str, pending: &PendingUpload) -> Result<UploadResult> {
        debug!(key, url = %pending.url, file = %pending.file.name, "アップロード開始");
        let payload = Payload::Multipart(vec![(self.part_name.clone(), Part::File(pending.file.clone()))]);
        let value = self.http.post(&pending.url, payload).await?;
        let response = parse_upload_response(value).map_err(|e| {
            error!(key, error = %e, "アップロードレスポンス不正");
            e
        })?;
        Ok(UploadResult {
            key: key.to_string(),
            response,
        })
    }
}

/// `{fullPath}` または `{data: {fullPath}}` を受け付ける
fn parse_upload_response(value: serde_json::Value) -> Result<UploadResponse> {
    let inner = value.get("data").cloned().unwrap_or(value);
    serde_json::from_value(inner).map_err(|e| FormgenError::Upload(format!("invalid upload response: {}", e)))
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(&self, uploads: &BTreeMap<String, PendingUpload>) -> Result<Vec<UploadResult>> {
        let requests = uploads
            .iter()
            .map(|(key, pending)| self.upload_one(key, pending));
        try_join_all(requests).await
    }
}
