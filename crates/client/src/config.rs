use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Offset};
use clap::{Args, Parser, Subcommand};
use finishcam_core::{LiveConfig, PollConfig, ReconnectPolicy};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "finishcam", version, about = "Follow live finishcam sessions")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll a session and stream its live frames until it stops being live.
    Follow {
        /// Session directory, e.g. http://cam.local:5001/data/2026-10-19_heat1
        url: String,
    },
    /// List the sessions of a session directory.
    Sessions {
        url: String,
        /// Metadata embedded by a host page; its `session_name` is highlighted.
        #[arg(long)]
        embedded: Option<String>,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    #[arg(long, global = true)]
    pub live_window_ms: Option<u64>,
    #[arg(long, global = true)]
    pub fetch_again_delay_ms: Option<u64>,
    #[arg(long, global = true)]
    pub request_timeout_ms: Option<u64>,
    /// Fixed reconnect delay for the push channel, 0 disables reconnecting.
    #[arg(long, global = true)]
    pub reconnect_delay_ms: Option<u64>,
    /// Poll only; do not open the push channel.
    #[arg(long, global = true)]
    pub no_push: bool,
    /// Display offset east of UTC in minutes; defaults to the local offset.
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub poll: PollConfig,
    pub live: LiveConfig,
    pub push: bool,
    pub request_timeout_ms: u64,
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            live: LiveConfig::default(),
            push: true,
            request_timeout_ms: 10_000,
            utc_offset_minutes: None,
        }
    }
}

impl ClientConfig {
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(ms) = overrides.live_window_ms {
            self.poll.live_window_ms = ms;
        }
        if let Some(ms) = overrides.fetch_again_delay_ms {
            self.poll.fetch_again_delay_ms = ms;
        }
        if let Some(ms) = overrides.request_timeout_ms {
            self.request_timeout_ms = ms;
        }
        match overrides.reconnect_delay_ms {
            Some(0) => self.live.reconnect = ReconnectPolicy::Never,
            Some(delay_ms) => {
                self.live.reconnect = ReconnectPolicy::Fixed {
                    delay_ms,
                    max_attempts: None,
                }
            }
            None => {}
        }
        if overrides.no_push {
            self.push = false;
        }
        if overrides.utc_offset_minutes.is_some() {
            self.utc_offset_minutes = overrides.utc_offset_minutes;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Offset session times are shown in.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.checked_mul(60)?))
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}
