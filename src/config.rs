use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::readiness::ReadinessConfig;

pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `base_url`.
pub const ENV_BASE_URL: &str = "DOCLENS_BASE_URL";
/// Environment variable overriding `log_filter`.
pub const ENV_LOG: &str = "DOCLENS_LOG";

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/doclens/`
/// - Linux: `~/.config/doclens/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/doclens/`
///
/// Falls back to `~/.doclens/` if platform dir is unavailable.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("doclens"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".doclens")
        })
}

/// Parse `path` as JSON. Absent file → defaults silently; unreadable or
/// malformed file → defaults with a note on stderr.
///
/// Runs before the tracing subscriber exists (the log filter lives in this
/// file), so problems go straight to stderr.
pub(crate) fn load_json_from<T: DeserializeOwned + Default>(path: &Path) -> T {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            eprintln!("[config] Ignoring unreadable {}: {e}", path.display());
            return T::default();
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("[config] Ignoring malformed {}: {e}", path.display());
        T::default()
    })
}

/// Write `value` as pretty JSON to `dir/filename`.
///
/// The bytes go to a sibling scratch file created owner-only (0600 on Unix),
/// are flushed to disk, and then renamed over the target.
pub(crate) fn save_json_to<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<(), String> {
    use std::io::Write;

    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| format!("Cannot encode {filename}: {e}"))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Cannot create {}: {e}", dir.display()))?;

    let scratch = dir.join(format!(".{filename}.{}", std::process::id()));
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let written = options
        .open(&scratch)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&scratch, dir.join(filename)));

    written.map_err(|e| {
        let _ = std::fs::remove_file(&scratch);
        format!("Cannot write {filename} in {}: {e}", dir.display())
    })
}

// ---------------------------------------------------------------------------
// ExplorerConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Backend API root; endpoint paths are appended to it.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub readiness_max_attempts: u32,
    pub readiness_retry_delay_ms: u64,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `doclens_lib=debug`.
    pub log_filter: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: crate::backend::http::DEFAULT_TIMEOUT_SECS,
            readiness_max_attempts: crate::readiness::DEFAULT_MAX_ATTEMPTS,
            readiness_retry_delay_ms: crate::readiness::DEFAULT_RETRY_DELAY.as_millis() as u64,
            log_filter: None,
        }
    }
}

impl ExplorerConfig {
    /// Config file plus environment overrides.
    pub fn load() -> Self {
        let mut config: Self = load_json_from(&config_dir().join(CONFIG_FILE));
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn save(&self) -> Result<(), String> {
        save_json_to(&config_dir(), CONFIG_FILE, self)
    }

    /// Apply `DOCLENS_*` overrides from `lookup`. Empty values are ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = set(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(filter) = set(ENV_LOG) {
            self.log_filter = Some(filter);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn readiness(&self) -> ReadinessConfig {
        ReadinessConfig {
            max_attempts: self.readiness_max_attempts.max(1),
            retry_delay: Duration::from_millis(self.readiness_retry_delay_ms),
        }
    }
}
