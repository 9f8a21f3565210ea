use anyhow::{Context, Result};
use clap::Parser;
use formgen::cli::{parse_file_arg, Cli, Commands};
use formgen::config::Config;
use formgen::form::{files, FormController, FormEvent, FormOptions, FormType, SubmitOutcome};
use formgen::http::{HttpClient, ReqwestClient};
use formgen::notify::ConsoleNotifier;
use formgen::prompt;
use formgen::upload::HttpUploader;
use formgen_common::{parse_schema, FormEntry};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_schema(path: &Path) -> Result<Vec<FormEntry>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_schema(&content).with_context(|| format!("parse {}", path.display()))
}

fn load_values(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

fn build_controller(config: &Config, entries: Vec<FormEntry>, options: FormOptions) -> Result<FormController> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(config.token(), config.timeout_seconds)?);
    let uploader = Arc::new(HttpUploader::new(Arc::clone(&http)));
    let notifier = Arc::new(ConsoleNotifier::new());
    Ok(FormController::new(entries, options, http, uploader, notifier)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Validate { schema, values } => {
            let mut controller = build_controller(&config, load_schema(&schema)?, FormOptions::default())?;
            if let Some(values) = values {
                controller.apply_values(&load_values(&values)?)?;
            }

            controller.validate()?;
            println!("✅ 入力は有効です（{}項目）", controller.fields().len());
        }

        Commands::Filter { schema, values, interactive } => {
            let options = FormOptions {
                form_type: FormType::Filter,
                ..Default::default()
            };
            let mut controller = build_controller(&config, load_schema(&schema)?, options)?;
            if let Some(values) = values {
                controller.apply_values(&load_values(&values)?)?;
            }
            if interactive {
                prompt::fill_interactively(&mut controller)?;
            }
            println!("{}", controller.build_filter());
        }

        Commands::Submit {
            schema,
            url,
            id,
            form_type,
            json,
            values,
            files: file_args,
            load,
            data_key,
            interactive,
        } => {
            println!("📨 formgen - 送信\n");

            let url = url.map(|u| config.resolve_url(&u)).unwrap_or_default();
            if form_type == FormType::Persist && url.is_empty() {
                anyhow::bail!("--url is required for persist mode");
            }
            let options = FormOptions {
                url,
                id,
                form_type,
                send_as_json: json || config.send_as_json,
                max_file_size_mb: config.max_file_size_mb,
                upload_base_url: config.upload_endpoint.clone(),
                ..Default::default()
            };
            let mut controller = build_controller(&config, load_schema(&schema)?, options)?;
            let mut events = controller.subscribe();

            if let Some(load_url) = load {
                println!("- 既存データを読み込み中...");
                controller
                    .load_existing(&config.resolve_url(&load_url), data_key.as_deref(), false, &[])
                    .await?;
            }
            if let Some(values) = values {
                controller.apply_values(&load_values(&values)?)?;
            }
            if interactive {
                prompt::fill_interactively(&mut controller)?;
            }

            for arg in &file_args {
                let (field, path) = parse_file_arg(arg).map_err(anyhow::Error::msg)?;
                let file = files::selected_file_from_path(&path)?;
                let encoded = controller.stage_file(&field, file).await?;
                println!("✔ {} → {} ({}件)", path.display(), field, encoded.len());
            }

            let outcome = controller.start_submit().await;
            while let Ok(event) = events.try_recv() {
                if let FormEvent::Emitted(fields) = event {
                    println!("{}", serde_json::to_string_pretty(&fields)?);
                }
            }

            match outcome {
                SubmitOutcome::Submitted(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    println!("\n✅ 送信完了");
                }
                SubmitOutcome::Filtered(query) => println!("{}", query),
                SubmitOutcome::Emitted(count) => println!("\n✅ {}項目を出力", count),
                SubmitOutcome::Blocked => anyhow::bail!("submission blocked"),
                SubmitOutcome::Invalid(e) => anyhow::bail!(e),
                SubmitOutcome::UploadFailed(reason) => anyhow::bail!("upload failed: {}", reason),
                SubmitOutcome::Failed(failure) => anyhow::bail!(failure.message),
            }
        }

        Commands::Load { url, schema, data_key, exclude, output } => {
            let entries = match &schema {
                Some(path) => load_schema(path)?,
                None => Vec::new(),
            };
            let mut controller = build_controller(&config, entries, FormOptions::default())?;
            controller
                .load_existing(&config.resolve_url(&url), data_key.as_deref(), schema.is_none(), &exclude)
                .await?;

            let json = serde_json::to_string_pretty(controller.entries())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
                    println!("✔ スキーマを保存: {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Config { set_token, set_base_url, set_upload_endpoint, set_max_file_size, show } => {
            let mut config = config;
            let changed = set_token.is_some()
                || set_base_url.is_some()
                || set_upload_endpoint.is_some()
                || set_max_file_size.is_some();

            if let Some(token) = set_token {
                config.api_token = Some(token);
            }
            if let Some(url) = set_base_url {
                config.base_url = url;
            }
            if let Some(url) = set_upload_endpoint {
                config.upload_endpoint = url;
            }
            if let Some(limit) = set_max_file_size {
                config.max_file_size_mb = limit;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  ベースURL: {}", config.base_url);
                println!("  アップロードURL: {}", config.upload_endpoint);
                println!("  ファイル上限: {}MB", config.max_file_size_mb);
                println!("  JSON送信: {}", config.send_as_json);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  APIトークン: {}", if config.token().is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}
