//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use formgen::error::{ApiErrorBody, FormgenError};
use formgen::form::files;
use formgen::form::SubmissionFailure;
use formgen_common::ValidationError;
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないファイルを添付した場合
#[test]
fn test_attach_nonexistent_file() {
    let result = files::selected_file_from_path(Path::new("/nonexistent/path/12345.png"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, FormgenError::FileNotFound(_)));
}

/// ディレクトリを添付した場合
#[test]
fn test_attach_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = files::selected_file_from_path(dir.path());
    assert!(matches!(result, Err(FormgenError::FileNotFound(_))));
}

/// 実ファイルの添付（サイズ・MIMEの取得）
#[test]
fn test_attach_existing_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("manual.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let file = files::selected_file_from_path(&path).unwrap();
    assert_eq!(file.name, "manual.pdf");
    assert_eq!(file.mime, "application/pdf");
    assert_eq!(file.size, 8);
}

/// FormgenErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        FormgenError::Config("テスト設定エラー".to_string()),
        FormgenError::FileNotFound("test.png".to_string()),
        FormgenError::Http {
            status: 500,
            body: None,
        },
        FormgenError::Transport("接続失敗".to_string()),
        FormgenError::Upload("アップロード失敗".to_string()),
        FormgenError::DataLoad("読み込み失敗".to_string()),
        FormgenError::Prompt("入力中断".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// HTTPエラーのメッセージにエラーボディが含まれる
#[test]
fn test_http_error_message() {
    let err = FormgenError::Http {
        status: 422,
        body: Some(ApiErrorBody {
            message: Some("The given data was invalid.".into()),
            errors: Some(BTreeMap::from([(
                "email".to_string(),
                vec!["The email must be a valid email address.".to_string()],
            )])),
        }),
    };
    let display = format!("{}", err);

    assert!(display.starts_with("HTTP 422"));
    assert!(display.contains("email: The email must be a valid email address."));
    assert_eq!(err.status(), Some(422));
}

/// 送信失敗の内容への変換
#[test]
fn test_submission_failure_from_error() {
    let err = FormgenError::Transport("timed out".into());
    let failure = SubmissionFailure::from(&err);

    assert_eq!(failure.status, None);
    assert!(failure.message.contains("timed out"));
    assert!(failure.body.is_none());
}

/// エラーのDebug実装確認
#[test]
fn test_error_debug() {
    let err = FormgenError::Config("テスト".to_string());
    let debug = format!("{:?}", err);

    assert!(debug.contains("Config"));
    assert!(debug.contains("テスト"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: FormgenError = io_err.into();

    assert!(matches!(err, FormgenError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: FormgenError = json_err.into();

    assert!(matches!(err, FormgenError::JsonParse(_)));
}

/// 検証エラーからの変換
#[test]
fn test_validation_error_conversion() {
    let err: FormgenError = ValidationError::Required {
        label: "Title".into(),
    }
    .into();

    assert!(matches!(err, FormgenError::Validation(_)));
    assert!(format!("{}", err).contains("Field 'Title' is required"));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let common_err = formgen_common::Error::Schema("duplicate field name 'email'".to_string());
    let err: FormgenError = common_err.into();

    assert!(matches!(err, FormgenError::Common(_)));
    assert_eq!(format!("{}", err), "Schema error: duplicate field name 'email'");
}
