//! 入力検証
//!
//! 平坦化したフィールドを宣言順に検査し、最初の違反で打ち切る。
//! 各フィールドの検査順: 必須 → 最小長 → 最大長 → 他フィールドとの一致

use crate::schema::FieldDescriptor;
use thiserror::Error;

/// 検証エラー（メッセージはそのまま通知に使う）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{label}' is required")]
    Required { label: String },

    #[error("Field '{label}' must be at least {min} characters")]
    TooShort { label: String, min: usize },

    #[error("Field '{label}' must be at most {max} characters")]
    TooLong { label: String, max: usize },

    #[error("Fields '{label}' and '{other}' should match")]
    Mismatch { label: String, other: String },
}

impl ValidationError {
    /// 違反したフィールドのラベル
    pub fn label(&self) -> &str {
        match self {
            ValidationError::Required { label }
            | ValidationError::TooShort { label, .. }
            | ValidationError::TooLong { label, .. }
            | ValidationError::Mismatch { label, .. } => label,
        }
    }
}

/// フィールド一覧を検証
pub fn validate(fields: &[&FieldDescriptor]) -> Result<(), ValidationError> {
    for field in fields {
        validate_field(field, fields)?;
    }
    Ok(())
}

/// 検証結果を真偽値で返す
pub fn is_valid(fields: &[&FieldDescriptor]) -> bool {
    validate(fields).is_ok()
}

fn validate_field(
    field: &FieldDescriptor,
    all: &[&FieldDescriptor],
) -> Result<(), ValidationError> {
    let label = field.display_label().to_string();

    if field.required && !field.value.is_truthy() {
        return Err(ValidationError::Required { label });
    }

    if let Some(min) = field.min_length {
        if let Some(text) = field.value.as_str() {
            let trimmed = text.trim();
            if !trimmed.is_empty() && trimmed.chars().count() < min {
                return Err(ValidationError::TooShort { label, min });
            }
        }
    }

    if let Some(max) = field.max_length {
        if field.value.len().is_some_and(|len| len > max) {
            return Err(ValidationError::TooLong { label, max });
        }
    }

    if let Some(custom) = &field.custom_validation {
        for peer_name in &custom.fields_match {
            let peer = all.iter().find(|f| &f.name == peer_name);
            if let Some(peer) = peer {
                if !peer.value.loosely_equals(&field.value) {
                    return Err(ValidationError::Mismatch {
                        label,
                        other: peer.display_label().to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
