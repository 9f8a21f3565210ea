//! 通知
//!
//! ユーザー向け通知は投げっぱなし（戻り値なし）。
//! コンソール実装はメッセージを出力し、ローディング中はスピナーを表示する。

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn fail(&self, message: &str);
    fn info(&self, message: &str);
    fn show_loading(&self);
    fn hide_loading(&self);
}

#[derive(Default)]
pub struct ConsoleNotifier {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn println(&self, line: String) {
        match self.spinner.lock().ok().as_deref() {
            Some(Some(spinner)) => spinner.println(line),
            _ => println!("{}", line),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        info!(message, "success");
        self.println(format!("✔ {}", message));
    }

    fn fail(&self, message: &str) {
        error!(message, "fail");
        self.println(format!("✘ {}", message));
    }

    fn info(&self, message: &str) {
        info!(message, "info");
        self.println(format!("- {}", message));
    }

    fn show_loading(&self) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("送信中...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        *slot = Some(spinner);
    }

    fn hide_loading(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }
}
