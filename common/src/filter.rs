//! フィルタクエリ生成
//!
//! 値が入っているフィールドを `name=value` にして `&` で連結する。
//! 値のURLエンコードは行わない（呼び出し側でクエリに直接連結される前提）。

use crate::schema::{FieldDescriptor, FieldKind};
use crate::value::FieldValue;

/// フィルタクエリ文字列を生成
pub fn build_filter_query(fields: &[&FieldDescriptor]) -> String {
    fields
        .iter()
        .filter_map(|field| filter_pair(field))
        .collect::<Vec<_>>()
        .join("&")
}

fn filter_pair(field: &FieldDescriptor) -> Option<String> {
    if field.name.is_empty() || !field.value.is_truthy() {
        return None;
    }
    let value = match &field.value {
        FieldValue::List(items) if items.is_empty() => return None,
        _ if field.kind == FieldKind::Date => field.value.to_date_string(),
        other => other.to_form_string(),
    };
    Some(format!("{}={}", field.name, value))
}
