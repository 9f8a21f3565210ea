//! 送信ペイロード生成
//!
//! JSON またはマルチパート形式で、送信対象フィールドと ExtraData をまとめる。

use crate::schema::{ExtraData, FieldDescriptor, FieldKind};
use crate::staging::SelectedFile;
use crate::value::FieldValue;
use serde_json::{Map, Value};

/// ペイロード形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    Json,
    #[default]
    Multipart,
}

/// マルチパートの1パート
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    File(SelectedFile),
}

/// 送信ペイロード
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Map<String, Value>),
    Multipart(Vec<(String, Part)>),
}

impl Payload {
    /// キーで値を検索（マルチパートのファイルパートはファイル名）
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self {
            Payload::Json(map) => map.get(key).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Payload::Multipart(parts) => parts.iter().find(|(k, _)| k == key).map(|(_, p)| match p {
                Part::Text(s) => s.clone(),
                Part::File(f) => f.name.clone(),
            }),
        }
    }

    /// 値を設定（既存キーは置き換え）
    pub fn set(&mut self, key: &str, value: Value) {
        match self {
            Payload::Json(map) => {
                map.insert(key.to_string(), value);
            }
            Payload::Multipart(parts) => {
                let text = FieldValue::from(value).to_form_string();
                match parts.iter_mut().find(|(k, _)| k == key) {
                    Some((_, part)) => *part = Part::Text(text),
                    None => parts.push((key.to_string(), Part::Text(text))),
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Json(map) => map.len(),
            Payload::Multipart(parts) => parts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 送信対象フィールド（名前が空でなく、表示専用でない）
pub fn submittable<'a>(fields: &[&'a FieldDescriptor]) -> Vec<&'a FieldDescriptor> {
    fields.iter().copied().filter(|f| f.is_submittable()).collect()
}

/// ペイロードを組み立てる
///
/// 日付フィールドは yyyy-MM-dd、未設定は空文字。ExtraData は後ろに付加する。
pub fn build_payload(fields: &[&FieldDescriptor], extra: &ExtraData, encoding: Encoding) -> Payload {
    let fields = submittable(fields);
    match encoding {
        Encoding::Json => {
            let mut map = Map::new();
            for field in fields {
                map.insert(field.name.clone(), json_value(field));
            }
            for entry in extra.iter() {
                map.insert(entry.key.clone(), entry.value.clone());
            }
            Payload::Json(map)
        }
        Encoding::Multipart => {
            let mut parts: Vec<(String, Part)> = fields
                .into_iter()
                .map(|field| (field.name.clone(), multipart_value(field)))
                .collect();
            for entry in extra.iter() {
                let text = FieldValue::from(entry.value.clone()).to_form_string();
                parts.push((entry.key.clone(), Part::Text(text)));
            }
            Payload::Multipart(parts)
        }
    }
}

fn json_value(field: &FieldDescriptor) -> Value {
    match &field.value {
        FieldValue::Null => Value::String(String::new()),
        value if field.kind == FieldKind::Date && value.is_truthy() => {
            Value::String(value.to_date_string())
        }
        value => value.to_json(),
    }
}

fn multipart_value(field: &FieldDescriptor) -> Part {
    match &field.value {
        FieldValue::File(file) => Part::File(file.clone()),
        value if field.kind == FieldKind::Date && value.is_truthy() => Part::Text(value.to_date_string()),
        value => Part::Text(value.to_form_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_multipart_payload() {
        let title = FieldDescriptor::new("title", "Title", FieldKind::Text).with_value("Hi");
        let due = FieldDescriptor::new("due", "Due", FieldKind::Date)
            .with_value(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let payload = build_payload(&[&title, &due], &ExtraData::new(), Encoding::Multipart);

        assert_eq!(
            payload,
            Payload::Multipart(vec![
                ("title".into(), Part::Text("Hi".into())),
                ("due".into(), Part::Text("2024-03-05".into())),
            ])
        );
    }

    #[test]
    fn test_excluded_fields_and_defaults() {
        let mut heading = FieldDescriptor::new("", "Heading", FieldKind::Text);
        heading.value = "ignored".into();
        let mut total = FieldDescriptor::new("total", "Total", FieldKind::Number).with_value(3);
        total.show_only = true;
        let note = FieldDescriptor::new("note", "Note", FieldKind::Text).with_value(FieldValue::Null);

        let payload = build_payload(&[&heading, &total, &note], &ExtraData::new(), Encoding::Json);
        assert_eq!(payload, Payload::Json(json!({"note": ""}).as_object().unwrap().clone()));
    }

    #[test]
    fn test_extra_data_appended() {
        let name = FieldDescriptor::new("name", "Name", FieldKind::Text).with_value("x");
        let mut extra = ExtraData::new();
        extra.upsert("uuid", json!("u-1"));
        extra.upsert("id", json!(9));

        let payload = build_payload(&[&name], &extra, Encoding::Multipart);
        assert_eq!(payload.len(), 3);
        assert_eq!(payload.get_text("uuid").as_deref(), Some("u-1"));
        assert_eq!(payload.get_text("id").as_deref(), Some("9"));

        let payload = build_payload(&[&name], &extra, Encoding::Json);
        assert_eq!(payload.get_text("id").as_deref(), Some("9"));
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut payload = Payload::Multipart(vec![("id".into(), Part::Text("1".into()))]);
        payload.set("id", json!("42"));
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get_text("id").as_deref(), Some("42"));
    }

    #[test]
    fn test_json_keeps_value_types() {
        let qty = FieldDescriptor::new("qty", "Qty", FieldKind::Number).with_value(5);
        let tags = FieldDescriptor::new("tags", "Tags", FieldKind::StringArray)
            .with_value(FieldValue::List(vec![json!("a")]));
        let payload = build_payload(&[&qty, &tags], &ExtraData::new(), Encoding::Json);
        match payload {
            Payload::Json(map) => {
                assert_eq!(map["qty"], json!(5));
                assert_eq!(map["tags"], json!(["a"]));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
