pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod notify;
pub mod prompt;
pub mod upload;
