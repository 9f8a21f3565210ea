//! ファイル読み込み（非同期）
//!
//! ステージ中の全ファイルを同時に読み込み、全件の完了（成功・失敗とも）を
//! 待ってから結果をまとめて返す。失敗したファイルは `None` になる。

use crate::error::{FormgenError, Result};
use crate::http::read_file_bytes;
use formgen_common::{FileSource, ProcessedFile, SelectedFile};
use futures::future::join_all;
use image::ImageFormat;
use std::path::Path;
use tracing::warn;

/// 拡張子からMIMEタイプを推定
pub fn guess_mime(path: &Path) -> String {
    if let Ok(format) = ImageFormat::from_path(path) {
        return format.to_mime_type().to_string();
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// ディスク上のファイルから SelectedFile を作る
pub fn selected_file_from_path(path: &Path) -> Result<SelectedFile> {
    if !path.is_file() {
        return Err(FormgenError::FileNotFound(path.display().to_string()));
    }
    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(SelectedFile {
        name,
        mime: guess_mime(path),
        size,
        source: FileSource::Path(path.to_path_buf()),
    })
}

/// 全ファイルを読み込んでプレビューとBase64を作る
///
/// 戻り値は入力と同じ順序。
pub async fn process_files(files: &[SelectedFile]) -> Vec<Option<ProcessedFile>> {
    let reads = files.iter().map(|file| async move {
        match read_file_bytes(file).await {
            Ok(bytes) => Some(ProcessedFile::from_bytes(file, &bytes)),
            Err(e) => {
                warn!(file = %file.name, error = %e, "ファイル読み込み失敗");
                None
            }
        }
    });
    join_all(reads).await
}
