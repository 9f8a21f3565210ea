//! フォームスキーマの型定義
//!
//! - FieldKind: フィールド種別（閉じた列挙型）
//! - FieldDescriptor: 1フィールドの定義と現在値
//! - FormEntry: 単一フィールドまたは行（横並びのフィールド群）
//! - ExtraData: 表示フィールド外で毎回送信する値

use crate::error::{Error, Result};
use crate::value::{parse_date, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// フィールド種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Password,
    Textarea,
    Select,
    Checkbox,
    Date,
    DateRange,
    Picture,
    File,
    Json,
    /// 検索付きオブジェクト選択
    #[serde(rename = "searchable-object-select", alias = "object-select")]
    ObjectSelect,
    StringArray,
    Tel,
    Url,
    Number,
}

impl FieldKind {
    /// ファイル選択を伴う種別か
    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::Picture | FieldKind::File)
    }

    /// 選択肢を持つ種別か
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::ObjectSelect)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::DateRange => "date-range",
            FieldKind::Picture => "picture",
            FieldKind::File => "file",
            FieldKind::Json => "json",
            FieldKind::ObjectSelect => "searchable-object-select",
            FieldKind::StringArray => "string-array",
            FieldKind::Tel => "tel",
            FieldKind::Url => "url",
            FieldKind::Number => "number",
        };
        write!(f, "{}", name)
    }
}

/// 選択肢
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub key: Value,
    pub label: String,
}

/// フィールド横断の検証ルール
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomValidation {
    /// 値が一致すべき他フィールド名
    pub fields_match: Vec<String>,
}

/// 値がプログラムから設定されたときに呼ばれるフック
#[derive(Clone)]
pub struct OnChange(Arc<dyn Fn(&FieldValue) + Send + Sync>);

impl OnChange {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&FieldValue) + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    fn call(&self, value: &FieldValue) {
        (self.0)(value)
    }
}

impl fmt::Debug for OnChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnChange(..)")
    }
}

/// フィールド定義
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub value: FieldValue,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub disabled: bool,
    /// 表示のみ（送信対象外）
    pub show_only: bool,
    pub use_base64_for_files: bool,
    /// アップロード先カテゴリ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_validation: Option<CustomValidation>,
    #[serde(skip)]
    pub on_change: Option<OnChange>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn matching(mut self, peers: &[&str]) -> Self {
        self.custom_validation = Some(CustomValidation {
            fields_match: peers.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldValue) + Send + Sync + 'static,
    {
        self.on_change = Some(OnChange::new(hook));
        self
    }

    /// 値を設定し、onChangeフックを呼ぶ
    ///
    /// 日付・数値フィールドはテキスト入力を型に合わせて変換する。
    pub fn set_value(&mut self, value: impl Into<FieldValue>) {
        self.value = coerce(self.kind, value.into());
        if let Some(hook) = &self.on_change {
            hook.call(&self.value);
        }
    }

    /// 送信対象か（名前が空でなく、表示専用でない）
    pub fn is_submittable(&self) -> bool {
        !self.name.is_empty() && !self.show_only
    }

    /// 表示名（ラベルが空なら名前）
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

fn coerce(kind: FieldKind, value: FieldValue) -> FieldValue {
    match (kind, value) {
        (FieldKind::Date, FieldValue::Text(s)) => match parse_date(&s) {
            Some(date) => FieldValue::Date(date),
            None => FieldValue::Text(s),
        },
        (FieldKind::Number, FieldValue::Text(s)) => {
            match s.trim().parse::<i64>() {
                Ok(n) => FieldValue::Number(n.into()),
                Err(_) => match s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                    Some(n) => FieldValue::Number(n),
                    None => FieldValue::Text(s),
                },
            }
        }
        (FieldKind::Checkbox, FieldValue::Text(s)) if s == "true" || s == "false" => {
            FieldValue::Bool(s == "true")
        }
        (_, value) => value,
    }
}

/// フォームの1要素（単一フィールドまたは行）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormEntry {
    Row(Vec<FieldDescriptor>),
    Field(FieldDescriptor),
}

impl FormEntry {
    pub fn is_field(&self) -> bool {
        matches!(self, FormEntry::Field(_))
    }

    pub fn is_row(&self) -> bool {
        matches!(self, FormEntry::Row(_))
    }
}

impl From<FieldDescriptor> for FormEntry {
    fn from(field: FieldDescriptor) -> Self {
        FormEntry::Field(field)
    }
}

impl From<Vec<FieldDescriptor>> for FormEntry {
    fn from(row: Vec<FieldDescriptor>) -> Self {
        FormEntry::Row(row)
    }
}

/// 宣言順に平坦化したフィールド一覧
pub fn flatten(entries: &[FormEntry]) -> Vec<&FieldDescriptor> {
    entries
        .iter()
        .flat_map(|entry| match entry {
            FormEntry::Field(field) => std::slice::from_ref(field).iter(),
            FormEntry::Row(row) => row.iter(),
        })
        .collect()
}

/// 宣言順に平坦化したフィールド一覧（可変参照）
pub fn flatten_mut(entries: &mut [FormEntry]) -> Vec<&mut FieldDescriptor> {
    entries
        .iter_mut()
        .flat_map(|entry| match entry {
            FormEntry::Field(field) => std::slice::from_mut(field).iter_mut(),
            FormEntry::Row(row) => row.iter_mut(),
        })
        .collect()
}

/// 名前でフィールドを検索
pub fn find_field_mut<'a>(entries: &'a mut [FormEntry], name: &str) -> Option<&'a mut FieldDescriptor> {
    flatten_mut(entries).into_iter().find(|f| f.name == name)
}

/// フィールド名の重複・空名を検出
///
/// 空名のフィールドは送信対象外として扱われるため許容する。
pub fn check_unique_names(entries: &[FormEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in flatten(entries) {
        if field.name.is_empty() {
            continue;
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::Schema(format!("duplicate field name '{}'", field.name)));
        }
    }
    Ok(())
}

/// JSON文字列からスキーマを読み込む
pub fn parse_schema(json: &str) -> Result<Vec<FormEntry>> {
    let entries: Vec<FormEntry> = serde_json::from_str(json)?;
    check_unique_names(&entries)?;
    Ok(entries)
}

/// 表示フィールド外で送信に付加する値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraDataEntry {
    pub key: String,
    pub value: Value,
}

/// ExtraDataEntry の集合（挿入順を保持し、キーで上書き）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraData(Vec<ExtraDataEntry>);

impl ExtraData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加、または既存キーの値を更新
    pub fn upsert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.0.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.0.push(ExtraDataEntry { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtraDataEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
