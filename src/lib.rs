#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod composer;
pub mod config;
pub mod content;
pub mod data;
pub mod directory;
pub mod feed;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod session;
pub mod status;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
