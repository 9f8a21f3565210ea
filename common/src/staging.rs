//! ファイルステージング
//!
//! 選択されたファイルをフィールドごとに保持し、送信時までアップロードを遅延する。
//! 読み込み（非同期I/O）は呼び出し側が行い、ここでは
//! サイズ制限・プレビュー・Base64化・アップロード待ちマップの管理だけを扱う。

use crate::error::{Error, Result};
use crate::schema::FieldDescriptor;
use crate::value::FieldValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// デフォルトのファイルサイズ上限（MB）
pub const DEFAULT_MAX_FILE_SIZE_MB: f64 = 5.0;

/// ファイルの実体
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Memory(Arc<Vec<u8>>),
    Path(PathBuf),
}

/// ユーザーが選択したファイル
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub source: FileSource,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(Arc::new(bytes)),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// MIMEタイプ別のアイコン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileIcon {
    Pdf,
    Word,
    Document,
}

impl FileIcon {
    pub fn for_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => FileIcon::Pdf,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileIcon::Word
            }
            _ => FileIcon::Document,
        }
    }

    /// アイコン画像のパス
    pub fn asset_path(&self) -> &'static str {
        match self {
            FileIcon::Pdf => "assets/icons/pdf.svg",
            FileIcon::Word => "assets/icons/word.svg",
            FileIcon::Document => "assets/icons/document.svg",
        }
    }
}

/// プレビュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preview {
    /// 画像の data URL
    DataUrl(String),
    Icon(FileIcon),
}

/// 読み込み済みファイルの処理結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFile {
    pub preview: Preview,
    /// data URL 形式（`data:<mime>;base64,<payload>`）
    pub base64: String,
}

impl ProcessedFile {
    pub fn from_bytes(file: &SelectedFile, bytes: &[u8]) -> Self {
        let base64 = to_data_url(&file.mime, bytes);
        let preview = if file.is_image() {
            Preview::DataUrl(base64.clone())
        } else {
            Preview::Icon(FileIcon::for_mime(&file.mime))
        };
        Self { preview, base64 }
    }
}

/// Base64化したファイル（集約イベントの要素）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedFile {
    pub file_name: String,
    pub mime: String,
    pub base64: String,
}

/// data URL を生成
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let mime = if mime.is_empty() { "application/octet-stream" } else { mime };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// アップロード先URL（ベースURL + アセット種別）
pub fn upload_url(base: &str, asset_type: Option<&str>) -> String {
    match asset_type {
        Some(asset) if !asset.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            asset.trim_start_matches('/')
        ),
        _ => base.to_string(),
    }
}

/// ステージ中のファイル
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub field: String,
    pub file: SelectedFile,
    pub upload_url: String,
    pub preview: Option<Preview>,
    pub base64: Option<String>,
}

/// 送信時にアップロードするファイル
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub file: SelectedFile,
    pub url: String,
}

/// フォーム1インスタンス分のステージング状態
#[derive(Debug, Clone)]
pub struct FileStage {
    max_size_mb: f64,
    upload_base_url: String,
    staged: Vec<StagedFile>,
    uploads: BTreeMap<String, PendingUpload>,
}

impl FileStage {
    pub fn new(max_size_mb: f64, upload_base_url: impl Into<String>) -> Self {
        Self {
            max_size_mb,
            upload_base_url: upload_base_url.into(),
            staged: Vec::new(),
            uploads: BTreeMap::new(),
        }
    }

    pub fn max_size_mb(&self) -> f64 {
        self.max_size_mb
    }

    /// サイズ上限チェック
    pub fn check_size(&self, file: &SelectedFile) -> Result<()> {
        if file.size as f64 / BYTES_PER_MB > self.max_size_mb {
            return Err(Error::FileTooLarge {
                name: file.name.clone(),
                limit_mb: self.max_size_mb,
            });
        }
        Ok(())
    }

    /// ファイルをステージに追加
    pub fn stage(&mut self, field: &FieldDescriptor, file: SelectedFile) -> Result<()> {
        self.check_size(&file)?;
        self.staged.push(StagedFile {
            field: field.name.clone(),
            upload_url: upload_url(&self.upload_base_url, field.asset_type.as_deref()),
            file,
            preview: None,
            base64: None,
        });
        Ok(())
    }

    /// ファイルをステージから削除（削除できたら true）
    pub fn remove(&mut self, field: &str, file: &SelectedFile) -> bool {
        match self
            .staged
            .iter()
            .position(|s| s.field == field && &s.file == file)
        {
            Some(index) => {
                self.staged.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    pub fn staged_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a StagedFile> + 'a {
        self.staged.iter().filter(move |s| s.field == field)
    }

    /// フィールドのファイル一覧（ステージ順）
    pub fn files_for(&self, field: &str) -> Vec<SelectedFile> {
        self.staged_for(field).map(|s| s.file.clone()).collect()
    }

    /// 再処理結果を反映し、集約用のBase64一覧を返す
    ///
    /// `results` は `files_for(field)` と同じ順序で、読み込み失敗は `None`。
    /// 失敗したファイルはプレビュー・Base64を持たず、一覧からも除外される。
    pub fn apply_processed(
        &mut self,
        field: &str,
        results: Vec<Option<ProcessedFile>>,
    ) -> Vec<EncodedFile> {
        let mut encoded = Vec::new();
        let targets = self.staged.iter_mut().filter(|s| s.field == field);
        for (staged, result) in targets.zip(results) {
            match result {
                Some(processed) => {
                    encoded.push(EncodedFile {
                        file_name: staged.file.name.clone(),
                        mime: staged.file.mime.clone(),
                        base64: processed.base64.clone(),
                    });
                    staged.preview = Some(processed.preview);
                    staged.base64 = Some(processed.base64);
                }
                None => {
                    staged.preview = None;
                    staged.base64 = None;
                }
            }
        }
        encoded
    }

    /// フィールド値とアップロード待ちマップを同期する
    ///
    /// - Base64モード: 先頭ファイルのBase64を値にする（遅延アップロードなし）
    /// - 通常モード: 先頭ファイルを値にし、アップロード待ちマップに登録
    /// - ファイルが無くなったら値を空にし、マップからも外す
    pub fn sync_field(&mut self, field: &mut FieldDescriptor, encoded: &[EncodedFile]) {
        let first = self.staged_for(&field.name).next().cloned();
        match first {
            None => {
                self.uploads.remove(&field.name);
                field.set_value(FieldValue::empty());
            }
            Some(_) if field.use_base64_for_files => {
                self.uploads.remove(&field.name);
                match encoded.first() {
                    Some(file) => field.set_value(file.base64.clone()),
                    None => field.set_value(FieldValue::empty()),
                }
            }
            Some(staged) => {
                self.uploads.insert(
                    field.name.clone(),
                    PendingUpload {
                        file: staged.file.clone(),
                        url: staged.upload_url.clone(),
                    },
                );
                field.set_value(FieldValue::File(staged.file));
            }
        }
    }

    pub fn uploads(&self) -> &BTreeMap<String, PendingUpload> {
        &self.uploads
    }

    pub fn has_pending_uploads(&self) -> bool {
        !self.uploads.is_empty()
    }

    /// アップロード完了後にステージとマップを空にする
    pub fn clear(&mut self) {
        self.staged.clear();
        self.uploads.clear();
    }
}

impl Default for FileStage {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE_MB, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn picture_field() -> FieldDescriptor {
        let mut field = FieldDescriptor::new("photo", "Photo", FieldKind::Picture);
        field.asset_type = Some("products".into());
        field
    }

    #[test]
    fn test_upload_url() {
        assert_eq!(upload_url("https://api/upload/", Some("/avatars")), "https://api/upload/avatars");
        assert_eq!(upload_url("https://api/upload", None), "https://api/upload");
    }

    #[test]
    fn test_icon_for_mime() {
        assert_eq!(FileIcon::for_mime("application/pdf"), FileIcon::Pdf);
        assert_eq!(FileIcon::for_mime("application/msword"), FileIcon::Word);
        assert_eq!(FileIcon::for_mime("text/csv"), FileIcon::Document);
    }

    #[test]
    fn test_size_limit() {
        let stage = FileStage::new(1.0, "https://api/upload");
        let big = SelectedFile::from_bytes("big.bin", "application/octet-stream", vec![0; 2 * 1024 * 1024]);
        assert!(matches!(stage.check_size(&big), Err(Error::FileTooLarge { .. })));
        let small = SelectedFile::from_bytes("small.bin", "application/octet-stream", vec![0; 10]);
        assert!(stage.check_size(&small).is_ok());
    }

    #[test]
    fn test_processed_image_has_data_url_preview() {
        let file = SelectedFile::from_bytes("a.png", "image/png", vec![1, 2, 3]);
        let processed = ProcessedFile::from_bytes(&file, &[1, 2, 3]);
        assert_eq!(processed.base64, "data:image/png;base64,AQID");
        assert_eq!(processed.preview, Preview::DataUrl(processed.base64.clone()));

        let doc = SelectedFile::from_bytes("a.pdf", "application/pdf", vec![1]);
        let processed = ProcessedFile::from_bytes(&doc, &[1]);
        assert_eq!(processed.preview, Preview::Icon(FileIcon::Pdf));
    }

    #[test]
    fn test_sync_field_defers_upload() {
        let mut stage = FileStage::new(5.0, "https://api/upload");
        let mut field = picture_field();
        let file = SelectedFile::from_bytes("a.png", "image/png", vec![1, 2, 3]);
        stage.stage(&field, file.clone()).unwrap();
        stage.sync_field(&mut field, &[]);

        assert_eq!(field.value, FieldValue::File(file));
        let pending = stage.uploads().get("photo").unwrap();
        assert_eq!(pending.url, "https://api/upload/products");
    }

    #[test]
    fn test_sync_field_base64_mode() {
        let mut stage = FileStage::default();
        let mut field = picture_field();
        field.use_base64_for_files = true;
        let file = SelectedFile::from_bytes("a.png", "image/png", vec![1, 2, 3]);
        stage.stage(&field, file.clone()).unwrap();
        let encoded = stage.apply_processed("photo", vec![Some(ProcessedFile::from_bytes(&file, &[1, 2, 3]))]);
        stage.sync_field(&mut field, &encoded);

        assert_eq!(field.value, FieldValue::from("data:image/png;base64,AQID"));
        assert!(!stage.has_pending_uploads());
    }

    #[test]
    fn test_stage_then_remove_restores_empty_state() {
        let mut stage = FileStage::default();
        let mut field = picture_field();
        let file = SelectedFile::from_bytes("a.png", "image/png", vec![9]);

        stage.stage(&field, file.clone()).unwrap();
        let encoded = stage.apply_processed("photo", vec![Some(ProcessedFile::from_bytes(&file, &[9]))]);
        stage.sync_field(&mut field, &encoded);
        assert_eq!(stage.staged().len(), 1);

        assert!(stage.remove("photo", &file));
        let encoded = stage.apply_processed("photo", vec![]);
        stage.sync_field(&mut field, &encoded);

        assert!(encoded.is_empty());
        assert!(stage.staged().is_empty());
        assert!(!stage.has_pending_uploads());
        assert_eq!(field.value, FieldValue::empty());
    }

    #[test]
    fn test_failed_read_excluded_from_encoded() {
        let mut stage = FileStage::default();
        let field = picture_field();
        let a = SelectedFile::from_bytes("a.png", "image/png", vec![1]);
        let b = SelectedFile::from_bytes("b.png", "image/png", vec![2]);
        stage.stage(&field, a.clone()).unwrap();
        stage.stage(&field, b).unwrap();

        let encoded = stage.apply_processed("photo", vec![Some(ProcessedFile::from_bytes(&a, &[1])), None]);
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].file_name, "a.png");
        assert!(stage.staged()[1].preview.is_none());
    }
}
