use crate::error::{FormgenError, Result};
use formgen_common::DEFAULT_MAX_FILE_SIZE_MB;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const TOKEN_ENV: &str = "FORMGEN_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// APIのベースURL（相対URLの解決に使う）
    pub base_url: String,
    /// ファイルアップロードのベースURL（アセット種別が末尾に付く）
    pub upload_endpoint: String,
    pub api_token: Option<String>,
    pub max_file_size_mb: f64,
    pub send_as_json: bool,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            upload_endpoint: "http://localhost:8000/api/upload".into(),
            api_token: None,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            send_as_json: false,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FormgenError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("formgen").join("config.json"))
    }

    /// APIトークン（環境変数を優先）
    pub fn token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Some(token);
            }
        }
        self.api_token.clone()
    }

    /// 相対URLをベースURLに連結
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let config = Config {
            base_url: "https://pos.example.com/api/".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_url("/products/7"), "https://pos.example.com/api/products/7");
        assert_eq!(config.resolve_url("http://other/x"), "http://other/x");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"send_as_json": true}"#).unwrap();
        assert!(config.send_as_json);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_file_size_mb, DEFAULT_MAX_FILE_SIZE_MB);
    }
}
