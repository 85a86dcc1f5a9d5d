//! Configuration loading: `ox-remap.toml` plus the startup rc file.
//!
//! `ox-remap.toml` carries the `[input]` tunables of the remap engine
//! (timeout, count ceiling, expansion depth backstop) and a `[startup]`
//! section naming an rc file and extra ex commands. Unknown fields are
//! ignored so the schema can grow without warnings. A file that fails to
//! parse yields defaults and a WARN at target `config`.
//!
//! The rc file is a plain list of ex commands, one per line, in the
//! `.vrapperrc` tradition: blank lines and lines starting with `"` are
//! comments, and a leading `:` is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "ox-remap.toml";
pub const RC_FILE_NAMES: [&str; 2] = [".vrapperrc", "_vrapperrc"];

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,      // original file string (optional)
    pub source: Option<PathBuf>,  // path the raw text came from
    pub file: ConfigFile,         // parsed (or default) data
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "InputConfig::default_timeout")] // Vim default: enabled
    pub timeout: bool,
    #[serde(default = "InputConfig::default_timeoutlen")] // Vim default usually 1000ms
    pub timeoutlen: u32,
    #[serde(default = "InputConfig::default_max_count")]
    pub max_count: u32,
    #[serde(default = "InputConfig::default_maxmapdepth")]
    pub maxmapdepth: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            timeoutlen: Self::default_timeoutlen(),
            max_count: Self::default_max_count(),
            maxmapdepth: Self::default_maxmapdepth(),
        }
    }
}

impl InputConfig {
    const fn default_timeout() -> bool {
        true
    }
    const fn default_timeoutlen() -> u32 {
        1000
    }
    const fn default_max_count() -> u32 {
        999_999
    }
    const fn default_maxmapdepth() -> usize {
        1000
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StartupConfig {
    /// Explicit rc file; when absent [`discover_rc`] is used.
    #[serde(default)]
    pub rc: Option<PathBuf>,
    /// Ex commands run after the rc file.
    #[serde(default)]
    pub commands: Vec<String>,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("ox-remap").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                source: Some(path),
                file,
            })
        }
        Err(e) => {
            warn!(
                target: "config",
                path = %path.display(),
                error = %e,
                "config_parse_failed_using_defaults"
            );
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Pending-prefix timeout, `None` when `timeout = false`.
    pub fn timeout(&self) -> Option<Duration> {
        let input = &self.file.input;
        input
            .timeout
            .then(|| Duration::from_millis(u64::from(input.timeoutlen)))
    }

    /// The rc file to run at startup: `[startup] rc` if set, else discovery.
    pub fn rc_path(&self) -> Option<PathBuf> {
        match &self.file.startup.rc {
            Some(path) => Some(path.clone()),
            None => discover_rc(),
        }
    }

    /// Rc file commands followed by `[startup] commands`. `rc_override`
    /// replaces the configured/discovered rc file.
    pub fn startup_commands(&self, rc_override: Option<&Path>) -> Result<Vec<String>> {
        let rc = rc_override.map(Path::to_path_buf).or_else(|| self.rc_path());
        let mut commands = match rc {
            Some(path) => load_rc(&path)?,
            None => Vec::new(),
        };
        commands.extend(self.file.startup.commands.iter().cloned());
        Ok(commands)
    }
}

/// `.vrapperrc` / `_vrapperrc` in the working directory, then `.vrapperrc`
/// in the home directory.
pub fn discover_rc() -> Option<PathBuf> {
    RC_FILE_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(RC_FILE_NAMES[0]))
                .filter(|p| p.is_file())
        })
}

pub fn load_rc(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading rc file {}", path.display()))?;
    let commands = parse_rc(&content);
    info!(
        target: "config",
        path = %path.display(),
        commands = commands.len(),
        "rc_loaded"
    );
    Ok(commands)
}

/// Ex command lines of an rc file, trimmed, comments and blanks dropped.
pub fn parse_rc(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('"'))
        .map(|line| line.strip_prefix(':').unwrap_or(line).trim_start().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
