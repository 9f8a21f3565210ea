use crate::form::FormType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formgen")]
#[command(about = "宣言的スキーマで動くフォームエンジン", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// スキーマと値を検証
    Validate {
        /// スキーマJSONファイル
        #[arg(required = true)]
        schema: PathBuf,

        /// 値JSONファイル（{"name": value}）
        #[arg(long)]
        values: Option<PathBuf>,
    },

    /// フィルタクエリ文字列を生成
    Filter {
        /// スキーマJSONファイル
        #[arg(required = true)]
        schema: PathBuf,

        /// 値JSONファイル
        #[arg(long)]
        values: Option<PathBuf>,

        /// 対話的に値を入力
        #[arg(short, long)]
        interactive: bool,
    },

    /// フォームを送信
    Submit {
        /// スキーマJSONファイル
        #[arg(required = true)]
        schema: PathBuf,

        /// 送信先URL（相対URLは設定のbase_urlに連結）
        #[arg(short, long)]
        url: Option<String>,

        /// 更新対象のID（指定時はPUT）
        #[arg(long)]
        id: Option<String>,

        /// 送信モード
        #[arg(short = 't', long = "type", value_enum, default_value = "persist")]
        form_type: FormType,

        /// JSONで送信（省略時は設定値）
        #[arg(long)]
        json: bool,

        /// 値JSONファイル
        #[arg(long)]
        values: Option<PathBuf>,

        /// 添付ファイル（field=path、複数指定可）
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// 既存データの取得URL（送信前に反映）
        #[arg(long)]
        load: Option<String>,

        /// 既存データのキー（ドット区切り）
        #[arg(long)]
        data_key: Option<String>,

        /// 対話的に値を入力
        #[arg(short, long)]
        interactive: bool,
    },

    /// 既存レコードを取得してスキーマに反映
    Load {
        /// レコード取得URL
        #[arg(required = true)]
        url: String,

        /// 反映先スキーマ（省略時は自動生成）
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// レスポンス内のキー（ドット区切り）
        #[arg(long)]
        data_key: Option<String>,

        /// 自動生成時に除外するキー（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIトークンを設定
        #[arg(long)]
        set_token: Option<String>,

        /// APIのベースURLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// アップロードのベースURLを設定
        #[arg(long)]
        set_upload_endpoint: Option<String>,

        /// ファイルサイズ上限（MB）を設定
        #[arg(long)]
        set_max_file_size: Option<f64>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// `field=path` 形式の添付指定を分解
pub fn parse_file_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((field, path)) if !field.trim().is_empty() && !path.trim().is_empty() => {
            Ok((field.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("Invalid file argument: {}. Use field=path", arg)),
    }
}
