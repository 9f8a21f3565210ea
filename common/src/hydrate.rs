//! 既存データの反映（ハイドレーション）
//!
//! 取得したレコードをフィールド値へ写像する。
//! スキーマ自動生成時はキー名からフィールド種別を推定する。

use crate::error::{Error, Result};
use crate::schema::{flatten_mut, ExtraData, FieldDescriptor, FieldKind, FormEntry};
use crate::value::FieldValue;
use regex::Regex;
use serde_json::{Map, Value};

/// デフォルトで送信に引き継ぐキー
pub const DEFAULT_RETAIN_KEYS: &[&str] = &["id", "uuid"];

/// レスポンスからレコードを取り出す
///
/// `data` メンバーから開始し（無ければボディ全体）、
/// `data_key` のドット区切りパスを順に辿る（`a.b.c` → `data.a.b.c`）。
pub fn extract_record<'a>(response: &'a Value, data_key: Option<&str>) -> Result<&'a Value> {
    let mut current = response.get("data").unwrap_or(response);
    if let Some(path) = data_key {
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current
                .get(segment)
                .ok_or_else(|| Error::Record(format!("key '{}' not found in '{}'", segment, path)))?;
        }
    }
    Ok(current)
}

/// キー名からフィールド種別を推定
///
/// 判定は上から順に評価し、最初に一致したものを採用する。
pub fn guess_field_kind(key: &str) -> FieldKind {
    lazy_static::lazy_static! {
        static ref RULES: Vec<(Regex, FieldKind)> = vec![
            (Regex::new(r"description").unwrap(), FieldKind::Textarea),
            (Regex::new(r"(^id$|_id$|^id_|registration|license_?number|licence_?number)").unwrap(), FieldKind::Text),
            (Regex::new(r"(picture|photo|image)").unwrap(), FieldKind::Picture),
            (Regex::new(r"(_at$|_on$|date)").unwrap(), FieldKind::Date),
            (Regex::new(r"(file|attachment|document)").unwrap(), FieldKind::File),
            (Regex::new(r"email").unwrap(), FieldKind::Email),
            (Regex::new(r"password").unwrap(), FieldKind::Password),
            (Regex::new(r"(phone|mobile)").unwrap(), FieldKind::Tel),
            (Regex::new(r"(url|website|link)").unwrap(), FieldKind::Url),
            (Regex::new(r"(number|amount|quantity)").unwrap(), FieldKind::Number),
        ];
    }

    let key = key.to_lowercase();
    RULES
        .iter()
        .find(|(re, _)| re.is_match(&key))
        .map(|(_, kind)| *kind)
        .unwrap_or(FieldKind::Text)
}

/// キー名を表示ラベルに変換（`created_at` → `Created At`）
pub fn humanize(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c == '.')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"null"` 文字列を null に正規化
fn normalize(value: &Value) -> FieldValue {
    match value {
        Value::String(s) if s == "null" => FieldValue::Null,
        other => FieldValue::from(other.clone()),
    }
}

/// レコードのキーからスキーマを生成
pub fn generate_fields(record: &Map<String, Value>, exclude_keys: &[String]) -> Vec<FormEntry> {
    record
        .iter()
        .filter(|(key, _)| !exclude_keys.iter().any(|e| e == *key))
        .map(|(key, value)| {
            let mut field = FieldDescriptor::new(key.clone(), humanize(key), guess_field_kind(key));
            field.set_value(normalize(value));
            FormEntry::Field(field)
        })
        .collect()
}

/// 既存スキーマにレコードの値を反映
///
/// レコードに無いキーは単一フィールド・行内フィールドとも空文字になる。
pub fn apply_record(entries: &mut [FormEntry], record: &Map<String, Value>) {
    for field in flatten_mut(entries) {
        let value = record
            .get(&field.name)
            .map(normalize)
            .unwrap_or_else(FieldValue::empty);
        field.set_value(value);
    }
}

/// 引き継ぎキーの値を ExtraData に登録
///
/// レコードに存在するキーだけを対象にする。
pub fn retain_keys(extra: &mut ExtraData, record: &Map<String, Value>, keys: &[String]) {
    for key in keys {
        if let Some(value) = record.get(key) {
            extra.upsert(key.clone(), value.clone());
        }
    }
}
