//! formgen 共通ライブラリ
//!
//! 宣言的スキーマで動くフォームエンジンの同期ロジック:
//! スキーマ・値・検証・既存データ反映・フィルタクエリ・ペイロード・ファイルステージング

pub mod error;
pub mod value;
pub mod schema;
pub mod validate;
pub mod hydrate;
pub mod filter;
pub mod payload;
pub mod staging;

pub use error::{Error, Result};
pub use value::{FieldValue, DATE_FORMAT};
pub use schema::{
    check_unique_names, find_field_mut, flatten, flatten_mut, parse_schema, CustomValidation,
    ExtraData, ExtraDataEntry, FieldDescriptor, FieldKind, FieldOption, FormEntry, OnChange,
};
pub use validate::{is_valid, validate, ValidationError};
pub use hydrate::{apply_record, extract_record, generate_fields, guess_field_kind, retain_keys, DEFAULT_RETAIN_KEYS};
pub use filter::build_filter_query;
pub use payload::{build_payload, submittable, Encoding, Part, Payload};
pub use staging::{
    EncodedFile, FileIcon, FileSource, FileStage, PendingUpload, Preview, ProcessedFile,
    SelectedFile, StagedFile, DEFAULT_MAX_FILE_SIZE_MB,
};
