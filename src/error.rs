use formgen_common::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// APIエラーレスポンスのボディ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message)?,
            None => write!(f, "request failed")?,
        }
        if let Some(errors) = &self.errors {
            for (field, messages) in errors {
                write!(f, "; {}: {}", field, messages.join(", "))?;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum FormgenError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("HTTP {status}: {}", describe_body(.body))]
    Http {
        status: u16,
        body: Option<ApiErrorBody>,
    },

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("入力エラー: {0}")]
    Validation(#[from] ValidationError),

    #[error("アップロード失敗: {0}")]
    Upload(String),

    #[error("データ読み込み失敗: {0}")]
    DataLoad(String),

    #[error("入力操作エラー: {0}")]
    Prompt(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] formgen_common::Error),
}

fn describe_body(body: &Option<ApiErrorBody>) -> String {
    body.as_ref().map(|b| b.to_string()).unwrap_or_default()
}

impl FormgenError {
    /// HTTPステータス（通信層以外のエラーは None）
    pub fn status(&self) -> Option<u16> {
        match self {
            FormgenError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FormgenError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FormgenError::Http {
                status: status.as_u16(),
                body: None,
            },
            None => FormgenError::Transport(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormgenError>;
