use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{self, Config};
use crate::content;
use crate::data::{MemoryStore, Services};
use crate::logging;
use crate::model::{LoreSection, PostDraft};
use crate::session::SessionOptions;
use crate::status::{self, Health};
use crate::ui;

/// Command-line choices that shape a console run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub channel: Option<String>,
    pub offline: bool,
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    let log_path = match logging::init(&cfg.log) {
        Ok(path) => path,
        Err(err) => {
            // The console still works without a log file.
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let (services, source_label) = build_services(&cfg, opts.offline)?;
    let initial_channel = opts
        .channel
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| Some(cfg.console.default_channel.clone()).filter(|id| !id.trim().is_empty()));
    info!(source = %source_label, channel = ?initial_channel, "starting console");

    let session = SessionOptions {
        initial_channel,
        draft: PostDraft::new(
            cfg.console.default_author.clone(),
            String::new(),
            cfg.console.default_tags.clone(),
        ),
        composer: cfg.console.composer_options(),
        badges: cfg.badges.policy(),
    };

    let config_path = opts.config_file.clone().or_else(config::default_path);
    let mut status_message = format!(
        "Content: {source_label} · config: {}",
        friendly_path(config_path.as_deref())
    );
    if let Some(path) = log_path {
        status_message.push_str(&format!(" · log: {}", friendly_path(Some(&path))));
    }

    let mut model = ui::Model::new(ui::Options {
        status_message,
        services,
        session,
        source_label,
    });
    model.run()
}

/// Runs the health probe once.
pub fn check_status(opts: &RunOptions) -> Result<Health> {
    let cfg = load_config(opts)?;
    let (services, _) = build_services(&cfg, opts.offline)?;
    Ok(status::probe(services.status.as_ref()))
}

/// Lore-only sections, straight from the store.
pub fn lore_sections(opts: &RunOptions) -> Result<Vec<LoreSection>> {
    let cfg = load_config(opts)?;
    let (services, source) = build_services(&cfg, opts.offline)?;
    services
        .directory
        .list_lore_sections()
        .with_context(|| format!("list lore sections from {source}"))
}

fn load_config(opts: &RunOptions) -> Result<Config> {
    config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")
}

fn build_services(cfg: &Config, offline: bool) -> Result<(Services, String)> {
    if offline {
        return Ok((
            Services::from_store(Arc::new(MemoryStore::seeded())),
            "offline store".to_string(),
        ));
    }

    let client = content::Client::new(content::ClientConfig {
        base_url: Some(cfg.content.base_url.clone()),
        user_agent: cfg.content.user_agent.clone(),
        http_client: None,
    })
    .context("create content client")?;
    let label = client.base_url().as_str().trim_end_matches('/').to_string();
    Ok((Services::from_store(Arc::new(client)), label))
}

fn friendly_path(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return "(none)".to_string();
    };
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
