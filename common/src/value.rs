//! フィールド値の型定義
//!
//! フォーム値は型ごとに異なる形を取るため、閉じた列挙型で表現する。
//! 真偽判定と緩い等価比較はブラウザ側フォームの挙動に合わせている
//! （空文字・0・false・null は偽、配列・オブジェクト・日付・ファイルは真）。

use crate::staging::SelectedFile;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// 日付フィールドの送信フォーマット（yyyy-MM-dd）
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// フィールド値
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(Number),
    Bool(bool),
    Date(NaiveDate),
    List(Vec<Value>),
    Object(Map<String, Value>),
    /// アップロード待ちのファイル
    File(SelectedFile),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// リセット時の値（空文字）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 真偽判定
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
            FieldValue::Bool(b) => *b,
            FieldValue::Date(_)
            | FieldValue::List(_)
            | FieldValue::Object(_)
            | FieldValue::File(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 長さ（文字列は文字数、配列は要素数）
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldValue::Text(s) => Some(s.chars().count()),
            FieldValue::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// 日付として解釈できれば yyyy-MM-dd に整形する
    ///
    /// テキストは `yyyy-MM-dd` または RFC 3339 として解釈を試み、
    /// 解釈できない場合はそのまま返す。
    pub fn to_date_string(&self) -> String {
        match self {
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::Text(s) => parse_date(s)
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| s.clone()),
            other => other.to_form_string(),
        }
    }

    /// マルチパート送信・クエリ文字列用の文字列表現
    pub fn to_form_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::List(items) => {
                serde_json::to_string(items).unwrap_or_default()
            }
            FieldValue::Object(map) => serde_json::to_string(map).unwrap_or_default(),
            FieldValue::File(file) => file.name.clone(),
        }
    }

    /// JSON表現
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::List(items) => Value::Array(items.clone()),
            FieldValue::Object(map) => Value::Object(map.clone()),
            FieldValue::File(file) => Value::String(file.name.clone()),
        }
    }

    /// 緩い等価比較（数値と数値文字列、真偽値と数値を同一視する）
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Null, _) | (_, Null) => false,
            (Text(a), Text(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Number(_) | Text(_) | Bool(_), Number(_) | Text(_) | Bool(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a == b,
            (a, b) => a.to_form_string() == b.to_form_string(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }
}

/// `yyyy-MM-dd` または RFC 3339 の日付をパース
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DATE_ONLY_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        })
}

/// タイムゾーンなしの日時（バックエンドのタイムスタンプ）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_ONLY_FORMATS: &[&str] = &["%Y/%m/%d", "%Y.%m.%d"];

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => FieldValue::Number(n),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Array(items) => FieldValue::List(items),
            Value::Object(map) => FieldValue::Object(map),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}
