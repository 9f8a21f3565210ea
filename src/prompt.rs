//! 対話式フィールド入力
//!
//! 送信対象のフィールドを順に尋ね、入力された値をフォームへ設定する。
//! 空入力は現在値を維持する。

use crate::error::{FormgenError, Result};
use crate::form::FormController;
use dialoguer::{Confirm, Input, Password, Select};
use formgen_common::{FieldDescriptor, FieldKind, FieldValue};
use serde_json::Value;

/// 対話入力の対象か（送信対象・編集可・ファイル以外）
pub fn is_promptable(field: &FieldDescriptor) -> bool {
    field.is_submittable() && !field.disabled && !field.kind.is_file()
}

/// カンマ区切りを文字列配列に変換
pub fn parse_string_array(input: &str) -> FieldValue {
    let items = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect();
    FieldValue::List(items)
}

/// 全フィールドを対話入力（設定したフィールド数を返す）
pub fn fill_interactively(controller: &mut FormController) -> Result<usize> {
    let targets: Vec<FieldDescriptor> = controller
        .fields()
        .into_iter()
        .filter(|f| is_promptable(f))
        .cloned()
        .collect();

    println!("📝 {}項目を入力します（空入力で現在値を維持）\n", targets.len());

    let mut updated = 0;
    for field in &targets {
        if let Some(hint) = &field.hint {
            println!("  ヒント: {}", hint);
        }
        if let Some(value) = prompt_field(field)? {
            controller.set_value(&field.name, value)?;
            updated += 1;
        }
    }
    Ok(updated)
}

fn prompt_error(e: dialoguer::Error) -> FormgenError {
    FormgenError::Prompt(e.to_string())
}

fn prompt_field(field: &FieldDescriptor) -> Result<Option<FieldValue>> {
    let label = if field.required {
        format!("{} *", field.display_label())
    } else {
        field.display_label().to_string()
    };

    match field.kind {
        FieldKind::Checkbox => {
            let current = matches!(field.value, FieldValue::Bool(true));
            let answer = Confirm::new()
                .with_prompt(label)
                .default(current)
                .interact()
                .map_err(prompt_error)?;
            Ok(Some(FieldValue::Bool(answer)))
        }
        kind if kind.has_options() && !field.options.is_empty() => {
            let labels: Vec<&str> = field.options.iter().map(|o| o.label.as_str()).collect();
            let selected = Select::new()
                .with_prompt(label)
                .items(&labels)
                .default(0)
                .interact_opt()
                .map_err(prompt_error)?;
            Ok(selected.map(|i| FieldValue::from(field.options[i].key.clone())))
        }
        FieldKind::Password => {
            let input = Password::new()
                .with_prompt(label)
                .allow_empty_password(true)
                .interact()
                .map_err(prompt_error)?;
            Ok((!input.is_empty()).then(|| FieldValue::Text(input)))
        }
        kind => {
            let input: String = Input::new()
                .with_prompt(format!("{} [{}]", label, field.value.to_form_string()))
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_error)?;
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let value = match kind {
                FieldKind::StringArray => parse_string_array(trimmed),
                FieldKind::Json => serde_json::from_str::<Value>(trimmed)
                    .map(FieldValue::from)
                    .unwrap_or_else(|_| FieldValue::from(trimmed)),
                _ => FieldValue::from(trimmed),
            };
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_array() {
        assert_eq!(
            parse_string_array(" a, b ,,c "),
            FieldValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(parse_string_array(""), FieldValue::List(vec![]));
    }

    #[test]
    fn test_is_promptable() {
        let text = FieldDescriptor::new("name", "Name", FieldKind::Text);
        assert!(is_promptable(&text));

        let picture = FieldDescriptor::new("photo", "Photo", FieldKind::Picture);
        assert!(!is_promptable(&picture));

        let mut disabled = FieldDescriptor::new("code", "Code", FieldKind::Text);
        disabled.disabled = true;
        assert!(!is_promptable(&disabled));
    }
}
