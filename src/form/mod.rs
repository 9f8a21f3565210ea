//! フォームコントローラ
//!
//! 1つのフォームインスタンスのスキーマを排他的に所有し、
//! 既存データ反映・ファイルステージング・検証・送信を調停する。
//!
//! 送信の状態遷移:
//! Idle → Validating → (不正: Idle) | (正常: Uploading?) → Submitting → Idle
//!
//! 呼び出し側への通知は `FormEvent` のブロードキャストで行う。

pub mod files;

use crate::error::{ApiErrorBody, FormgenError, Result};
use crate::http::HttpClient;
use crate::notify::Notifier;
use crate::upload::FileUploader;
use clap::ValueEnum;
use formgen_common::{
    apply_record, build_filter_query, build_payload, check_unique_names, extract_record,
    find_field_mut, flatten, flatten_mut, generate_fields, retain_keys, submittable, validate,
    EncodedFile, Encoding, ExtraData, FieldDescriptor, FieldValue, FileStage, FormEntry,
    PendingUpload, SelectedFile, StagedFile, ValidationError, DEFAULT_MAX_FILE_SIZE_MB,
    DEFAULT_RETAIN_KEYS,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// 送信モード
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FormType {
    /// POST（新規）/ PUT（更新）で保存
    #[default]
    Persist,
    /// フィルタクエリを生成して通知
    Filter,
    /// フィールド一覧を呼び出し側へ渡す（通信なし）
    Emit,
}

#[derive(Debug, Clone)]
pub struct FormOptions {
    /// 保存先URL
    pub url: String,
    /// 指定時は更新（PUT）
    pub id: Option<String>,
    pub form_type: FormType,
    pub send_as_json: bool,
    pub max_file_size_mb: f64,
    pub upload_base_url: String,
    /// 既存データから送信に引き継ぐキー
    pub retain_keys: Vec<String>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            id: None,
            form_type: FormType::default(),
            send_as_json: false,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            upload_base_url: String::new(),
            retain_keys: DEFAULT_RETAIN_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Validating,
    Uploading,
    Submitting,
}

/// 送信失敗の内容（エラー通知先へ渡す）
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionFailure {
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<ApiErrorBody>,
}

impl From<&FormgenError> for SubmissionFailure {
    fn from(e: &FormgenError) -> Self {
        let body = match e {
            FormgenError::Http { body, .. } => body.clone(),
            _ => None,
        };
        Self {
            status: e.status(),
            message: e.to_string(),
            body,
        }
    }
}

/// 呼び出し側へのイベント
#[derive(Debug, Clone)]
pub enum FormEvent {
    /// 既存データの読み込み完了（生のレコード）
    Loaded(Value),
    /// ステージ中ファイルのBase64化完了（再処理ごとに1回）
    FilesEncoded { field: String, files: Vec<EncodedFile> },
    /// 保存成功（生のレスポンス）
    Submitted(Value),
    SubmitFailed(SubmissionFailure),
    /// emitモードの送信対象フィールド
    Emitted(Vec<FieldDescriptor>),
    FilterQuery(String),
    FilterFields(Vec<FieldDescriptor>),
}

/// start_submit の結果
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// allow_submit が false
    Blocked,
    Invalid(ValidationError),
    UploadFailed(String),
    Submitted(Value),
    Failed(SubmissionFailure),
    /// emitモード（渡したフィールド数）
    Emitted(usize),
    Filtered(String),
}

pub struct FormController {
    entries: Vec<FormEntry>,
    extra: ExtraData,
    stage: FileStage,
    options: FormOptions,
    allow_submit: bool,
    state: SubmitState,
    http: Arc<dyn HttpClient>,
    uploader: Arc<dyn FileUploader>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<FormEvent>,
}

impl FormController {
    pub fn new(
        entries: Vec<FormEntry>,
        options: FormOptions,
        http: Arc<dyn HttpClient>,
        uploader: Arc<dyn FileUploader>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        check_unique_names(&entries)?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            entries,
            extra: ExtraData::new(),
            stage: FileStage::new(options.max_file_size_mb, options.upload_base_url.clone()),
            options,
            allow_submit: true,
            state: SubmitState::Idle,
            http,
            uploader,
            notifier,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FormEvent) {
        // 受信者がいなくてもよい
        let _ = self.events.send(event);
    }

    pub fn entries(&self) -> &[FormEntry] {
        &self.entries
    }

    pub fn fields(&self) -> Vec<&FieldDescriptor> {
        flatten(&self.entries)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn allow_submit(&self) -> bool {
        self.allow_submit
    }

    pub fn set_allow_submit(&mut self, allow: bool) {
        self.allow_submit = allow;
    }

    pub fn extra_data(&self) -> &ExtraData {
        &self.extra
    }

    pub fn add_extra_data(&mut self, key: impl Into<String>, value: Value) {
        self.extra.upsert(key, value);
    }

    pub fn staged_files(&self) -> &[StagedFile] {
        self.stage.staged()
    }

    pub fn pending_uploads(&self) -> &BTreeMap<String, PendingUpload> {
        self.stage.uploads()
    }

    /// 名前を指定して値を設定（onChangeフックが呼ばれる）
    pub fn set_value(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let field = find_field_mut(&mut self.entries, name)
            .ok_or_else(|| formgen_common::Error::Schema(format!("unknown field '{}'", name)))?;
        field.set_value(value);
        Ok(())
    }

    /// `{name: value}` をまとめて設定
    pub fn apply_values(&mut self, values: &Map<String, Value>) -> Result<()> {
        for (name, value) in values {
            self.set_value(name, FieldValue::from(value.clone()))?;
        }
        Ok(())
    }

    /// 現在の値を検証
    pub fn validate(&self) -> Result<()> {
        formgen_common::validate(&self.fields())?;
        Ok(())
    }

    /// 既存レコードを読み込んでフォームへ反映
    ///
    /// 失敗時は通知してエラーを返し、スキーマは変更しない。
    pub async fn load_existing(
        &mut self,
        url: &str,
        data_key: Option<&str>,
        auto_generate: bool,
        exclude_keys: &[String],
    ) -> Result<Value> {
        let response = match self.http.get(url).await {
            Ok(response) => response,
            Err(e) => return Err(self.data_load_failed(e.to_string())),
        };
        let record = match extract_record(&response, data_key) {
            Ok(record) => record.clone(),
            Err(e) => return Err(self.data_load_failed(e.to_string())),
        };
        let Some(object) = record.as_object() else {
            return Err(self.data_load_failed("record is not an object".into()));
        };

        if auto_generate {
            self.entries = generate_fields(object, exclude_keys);
            self.stage = FileStage::new(self.options.max_file_size_mb, self.options.upload_base_url.clone());
        } else {
            apply_record(&mut self.entries, object);
        }
        retain_keys(&mut self.extra, object, &self.options.retain_keys);
        info!(url, auto_generate, fields = self.fields().len(), "既存データを反映");

        self.emit(FormEvent::Loaded(record.clone()));
        Ok(record)
    }

    fn data_load_failed(&self, reason: String) -> FormgenError {
        warn!(%reason, "既存データの読み込み失敗");
        self.notifier.fail(&format!("Failed to load data: {}", reason));
        FormgenError::DataLoad(reason)
    }

    /// ファイルをステージし、フィールドのファイルを再処理する
    pub async fn stage_file(&mut self, field: &str, file: SelectedFile) -> Result<Vec<EncodedFile>> {
        let descriptor = self
            .field(field)
            .ok_or_else(|| formgen_common::Error::Schema(format!("unknown field '{}'", field)))?
            .clone();
        if let Err(e) = self.stage.stage(&descriptor, file) {
            self.notifier.fail(&e.to_string());
            return Err(e.into());
        }
        Ok(self.reprocess(field).await)
    }

    /// ステージからファイルを外し、残りを再処理する
    pub async fn remove_staged_file(&mut self, field: &str, file: &SelectedFile) -> Result<Vec<EncodedFile>> {
        if !self.stage.remove(field, file) {
            debug!(field, file = %file.name, "ステージに存在しないファイル");
        }
        Ok(self.reprocess(field).await)
    }

    async fn reprocess(&mut self, field: &str) -> Vec<EncodedFile> {
        let files = self.stage.files_for(field);
        let results = files::process_files(&files).await;
        let encoded = self.stage.apply_processed(field, results);

        if let Some(descriptor) = find_field_mut(&mut self.entries, field) {
            self.stage.sync_field(descriptor, &encoded);
        }
        debug!(field, staged = files.len(), encoded = encoded.len(), "ファイル再処理");

        self.emit(FormEvent::FilesEncoded {
            field: field.to_string(),
            files: encoded.clone(),
        });
        encoded
    }

    /// 送信を開始
    pub async fn start_submit(&mut self) -> SubmitOutcome {
        if !self.allow_submit {
            self.notifier.info("Submission is not allowed right now");
            return SubmitOutcome::Blocked;
        }

        self.notifier.show_loading();
        let outcome = self.run_submit().await;
        self.notifier.hide_loading();
        self.state = SubmitState::Idle;
        outcome
    }

    async fn run_submit(&mut self) -> SubmitOutcome {
        self.state = SubmitState::Validating;
        if let Err(e) = validate(&flatten(&self.entries)) {
            self.notifier.fail(&e.to_string());
            return SubmitOutcome::Invalid(e);
        }

        if self.stage.has_pending_uploads() {
            self.state = SubmitState::Uploading;
            if let Err(e) = self.run_uploads().await {
                error!(error = %e, "アップロード失敗のため送信を中止");
                self.notifier.fail(&e.to_string());
                self.allow_submit = true;
                return SubmitOutcome::UploadFailed(e.to_string());
            }
        }

        self.state = SubmitState::Submitting;
        match self.options.form_type {
            FormType::Emit => {
                let fields: Vec<FieldDescriptor> = submittable(&self.fields()).into_iter().cloned().collect();
                let count = fields.len();
                self.emit(FormEvent::Emitted(fields));
                SubmitOutcome::Emitted(count)
            }
            FormType::Filter => SubmitOutcome::Filtered(self.build_filter()),
            FormType::Persist => self.persist().await,
        }
    }

    /// 全アップロードの成功後にだけサーバーパスを書き戻す
    async fn run_uploads(&mut self) -> Result<()> {
        let results = self.uploader.upload(self.stage.uploads()).await?;
        for result in results {
            match find_field_mut(&mut self.entries, &result.key) {
                Some(field) => field.set_value(result.response.full_path),
                None => warn!(key = %result.key, "アップロード結果に対応するフィールドがありません"),
            }
        }
        self.stage.clear();
        Ok(())
    }

    async fn persist(&mut self) -> SubmitOutcome {
        let encoding = if self.options.send_as_json {
            Encoding::Json
        } else {
            Encoding::Multipart
        };
        let mut payload = build_payload(&flatten(&self.entries), &self.extra, encoding);

        self.allow_submit = false;
        let result = match self.options.id.clone() {
            Some(id) => {
                payload.set("id", Value::String(id));
                self.http.put(&self.options.url, payload).await
            }
            None => self.http.post(&self.options.url, payload).await,
        };
        self.allow_submit = true;

        match result {
            Ok(response) => {
                self.notifier.success("Saved successfully");
                self.emit(FormEvent::Submitted(response.clone()));
                SubmitOutcome::Submitted(response)
            }
            Err(e) => {
                let failure = SubmissionFailure::from(&e);
                self.notifier.fail(&failure.message);
                self.emit(FormEvent::SubmitFailed(failure.clone()));
                SubmitOutcome::Failed(failure)
            }
        }
    }

    /// 全フィールドを空にする（filterモードではクエリを再生成）
    ///
    /// ステージ中のファイルとアップロード待ちも破棄する。
    pub fn reset_form(&mut self) {
        for field in flatten_mut(&mut self.entries) {
            field.set_value(FieldValue::empty());
        }
        if !self.stage.staged().is_empty() {
            debug!(staged = self.stage.staged().len(), "リセットでステージを破棄");
        }
        self.stage.clear();
        if self.options.form_type == FormType::Filter {
            self.build_filter();
        }
    }

    /// フィルタクエリを生成し、クエリとフィールド状態を通知
    pub fn build_filter(&self) -> String {
        let fields = self.fields();
        let query = build_filter_query(&fields);
        let snapshot: Vec<FieldDescriptor> = fields.into_iter().cloned().collect();
        self.emit(FormEvent::FilterQuery(query.clone()));
        self.emit(FormEvent::FilterFields(snapshot));
        query
    }
}
