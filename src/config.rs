use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    analysis::DurationPolicy,
    session::{MAX_TICK, PausePolicy},
};

pub const HOME_ENV: &str = "POMO_HOME";
/// Debug knob: milliseconds per tick. The session length in ticks is fixed.
pub const TICK_ENV: &str = "POMO_TICK_MS";
const DEFAULT_HOME: &str = "pomo";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "pomo.log";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Defaults to `pomo.log` inside the home directory.
    pub log_file: Option<PathBuf>,
    pub sound_enabled: bool,
    pub desktop_notifications: bool,
    pub interactive_display: bool,
    pub pause_policy: PausePolicy,
    pub duration_policy: DurationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            sound_enabled: true,
            desktop_notifications: true,
            interactive_display: true,
            pause_policy: PausePolicy::default(),
            duration_policy: DurationPolicy::default(),
        }
    }
}

impl Config {
    /// Loads `config.json` from the home directory; missing or malformed
    /// files give the defaults.
    pub fn load() -> Self {
        Self::load_from(&home_dir().join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ignoring malformed config");
            Self::default()
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| home_dir().join(LOG_FILE))
    }
}

pub fn home_dir() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_HOME))
}

pub fn tick_override() -> Option<Duration> {
    parse_tick_ms(&std::env::var(TICK_ENV).ok()?)
}

/// Positive milliseconds, clamped to [`MAX_TICK`].
fn parse_tick_ms(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => {
            let tick = Duration::from_millis(ms);
            if tick > MAX_TICK {
                warn!(value = %raw, "{TICK_ENV} too large; using {}ms", MAX_TICK.as_millis());
            }
            Some(tick.min(MAX_TICK))
        }
        _ => {
            warn!(value = %raw, "ignoring invalid {TICK_ENV}");
            None
        }
    }
}
