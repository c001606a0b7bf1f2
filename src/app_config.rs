//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

/// TOML-backed file configuration for paper-fetch defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Mirror base URLs, in priority order.
    pub mirrors: Option<Vec<String>>,
    /// Rendering proxy prefix used for blocked requests.
    pub proxy: Option<String>,
    /// Contact address for the open-access lookup.
    pub email: Option<String>,
    /// DOIs processed at once (same range as CLI).
    pub concurrency: Option<u8>,
    /// Per-host rate limit in milliseconds.
    pub rate_limit: Option<u64>,
    /// Total per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Default archive path.
    pub output: Option<PathBuf>,
    /// Whether the open-access fallback runs.
    pub fallback: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=32).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=32");
        }

        if let Some(rate_limit) = self.rate_limit
            && rate_limit > 60_000
        {
            bail!("Invalid config value for `rate_limit`: {rate_limit}. Expected range: 0..=60000");
        }

        if let Some(timeout) = self.timeout_secs
            && !(1..=600).contains(&timeout)
        {
            bail!("Invalid config value for `timeout_secs`: {timeout}. Expected range: 1..=600");
        }

        if let Some(mirrors) = &self.mirrors {
            for mirror in mirrors {
                if !(mirror.starts_with("http://") || mirror.starts_with("https://")) {
                    bail!("Invalid config value in `mirrors`: '{mirror}'. Expected an http(s) URL");
                }
            }
        }

        if let Some(proxy) = &self.proxy
            && !(proxy.starts_with("http://") || proxy.starts_with("https://"))
        {
            bail!("Invalid config value for `proxy`: '{proxy}'. Expected an http(s) URL");
        }

        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/paper-fetch/config.toml`
/// 2. `$HOME/.config/paper-fetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("paper-fetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("paper-fetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        let context = || format!("Invalid `{key}` value on line {line_no}");
        match key {
            "mirrors" => cfg.mirrors = Some(parse_string_array(value).with_context(context)?),
            "proxy" => cfg.proxy = Some(parse_string_literal(value).with_context(context)?),
            "email" => cfg.email = Some(parse_string_literal(value).with_context(context)?),
            "concurrency" => cfg.concurrency = Some(parse_integer(value).with_context(context)?),
            "rate_limit" => cfg.rate_limit = Some(parse_integer(value).with_context(context)?),
            "timeout_secs" => cfg.timeout_secs = Some(parse_integer(value).with_context(context)?),
            "output" => {
                cfg.output = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "fallback" => cfg.fallback = Some(parse_boolean(value).with_context(context)?),
            unknown => bail!("Unknown configuration key: '{unknown}' on line {line_no}"),
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `#` comment that is not inside a quoted string.
fn strip_inline_comment(line: &str) -> &str {
    let mut quoted = false;
    let cut = line.char_indices().find_map(|(index, ch)| {
        if ch == '"' {
            quoted = !quoted;
        }
        (ch == '#' && !quoted).then_some(index)
    });
    cut.map_or(line, |index| &line[..index])
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    raw_value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .context("Expected double-quoted string")
}

/// Parses a single-line array of double-quoted strings: `["a", "b"]`.
fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected an array like [\"https://mirror.example/\"]");
    };

    let mut items = Vec::new();
    let mut rest = inner.trim();
    while !rest.is_empty() {
        let Some(after_quote) = rest.strip_prefix('"') else {
            bail!("Expected double-quoted string in array");
        };
        let Some(end) = after_quote.find('"') else {
            bail!("Unterminated string in array");
        };
        items.push(after_quote[..end].to_string());
        rest = after_quote[end + 1..].trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
        } else if !rest.is_empty() {
            bail!("Expected ',' between array items");
        }
    }
    Ok(items)
}

/// Parses a non-negative integer that must fit in `T`.
fn parse_integer<T: TryFrom<u64>>(raw_value: &str) -> Result<T> {
    let token = raw_value.trim();
    let value: u64 = token
        .parse()
        .with_context(|| format!("Expected non-negative integer, got '{token}'"))?;
    T::try_from(value).map_err(|_| anyhow!("Integer value {value} is out of range"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    raw_value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Expected 'true' or 'false'"))
}
