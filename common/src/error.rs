//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Record error: {0}")]
    Record(String),

    #[error("File '{name}' exceeds the {limit_mb} MB limit")]
    FileTooLarge { name: String, limit_mb: f64 },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
