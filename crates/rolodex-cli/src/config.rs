// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rolodex_app::{DEFAULT_NARROW_THRESHOLD, DEFAULT_PAGE_SIZE, ViewConfig};
use rolodex_tui::TuiOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_CELL_WIDTH: u32 = 10;
const DEFAULT_FRAME_INTERVAL: &str = "16ms";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub page_size: Option<i64>,
    pub narrow_threshold: Option<i64>,
    pub cell_width: Option<i64>,
    pub frame_interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ROLODEX_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ROLODEX_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(rolodex_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and keep values under [storage], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            rolodex_db::validate_db_path(db_path)?;
        }

        let positives = [
            ("ui.page_size", self.ui.page_size),
            ("ui.narrow_threshold", self.ui.narrow_threshold),
            ("ui.cell_width", self.ui.cell_width),
        ];
        for (key, value) in positives {
            if let Some(value) = value
                && value <= 0
            {
                bail!(
                    "{key} in {} must be positive, got {value}",
                    path.display()
                );
            }
        }
        if let Some(threshold) = self.ui.narrow_threshold
            && u32::try_from(threshold).is_err()
        {
            bail!(
                "ui.narrow_threshold in {} is too large, got {threshold}",
                path.display()
            );
        }

        if let Some(interval) = &self.ui.frame_interval {
            let parsed = parse_duration(interval)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "ui.frame_interval in {} must be positive, got {}",
                    path.display(),
                    interval
                );
            }
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => rolodex_db::default_db_path(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.ui
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn narrow_threshold(&self) -> u32 {
        self.ui
            .narrow_threshold
            .and_then(|threshold| u32::try_from(threshold).ok())
            .unwrap_or(DEFAULT_NARROW_THRESHOLD)
    }

    pub fn cell_width(&self) -> u32 {
        self.ui
            .cell_width
            .and_then(|width| u32::try_from(width).ok())
            .unwrap_or(DEFAULT_CELL_WIDTH)
    }

    pub fn frame_interval(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .frame_interval
                .as_deref()
                .unwrap_or(DEFAULT_FRAME_INTERVAL),
        )
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_ascii_lowercase()
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log.file.as_ref().map(PathBuf::from)
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            page_size: self.page_size(),
            narrow_threshold: self.narrow_threshold(),
        }
    }

    pub fn tui_options(&self) -> Result<TuiOptions> {
        Ok(TuiOptions {
            cell_width: self.cell_width(),
            frame_interval: self.frame_interval()?,
        })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# rolodex config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/rolodex/rolodex.db)\n# db_path = \"/absolute/path/to/rolodex.db\"\n\n[ui]\npage_size = {}\n# Layout switches to the narrow (single column) mode below this width.\nnarrow_threshold = {}\n# Width units per terminal column; 80 columns measure 800 units.\ncell_width = {}\nframe_interval = \"{}\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/rolodex.log\"\n",
            path.display(),
            DEFAULT_PAGE_SIZE,
            DEFAULT_NARROW_THRESHOLD,
            DEFAULT_CELL_WIDTH,
            DEFAULT_FRAME_INTERVAL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use <N>ms or <N>s (for example 16ms)")
}
