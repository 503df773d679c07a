use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

const CONFIG_FILE_NAME: &str = "config.toml";
const PROJECT_DIR_NAME: &str = ".vartree";

/// Seed for a global config file that does not exist yet. Every line is
/// commented out, so it loads as the defaults.
const DEFAULT_CONFIG_CONTENT: &str = r#"# vartree configuration
# Remove the leading '#' from a setting to change it.

# [tree]
# base_chunk_size = 100
# watch_not_available = "not available"
# hover_not_available = "not available"
# hover_no_session = "Please start a debug session to evaluate"

# [adapter]
# command = "lldb-dap"
# args = []
# adapter_id = "vartree"
# request_timeout_secs = 10

# [log]
# level = "info"
# file = "/tmp/vartree.log"
"#;

/// Return the default global configuration directory.
///
/// Uses `$XDG_CONFIG_HOME/vartree`, then `$HOME/.config/vartree`,
/// falling back to `./.vartree` when neither variable is set.
pub fn default_config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("vartree");
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config").join("vartree");
    }
    PathBuf::from(".vartree")
}

/// Resolve the effective configuration.
///
/// Layers, lowest first: built-in defaults, `config_dir/config.toml`
/// (written with commented defaults when absent), then the nearest
/// `.vartree/config.toml` at or above `project_dir`. The result is
/// validated; the first violation is returned and all are logged.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global = config_dir.join(CONFIG_FILE_NAME);
    ensure_global_file(config_dir, &global)?;

    let layers = std::iter::once(global).chain(project_dir.and_then(find_project_config));
    let mut config = Config::default();
    for path in layers {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        if !has_non_comment_content(&text) {
            continue;
        }
        tracing::debug!(path = %path.display(), "applying config layer");
        config = merge_configs(&config, &text).map_err(|e| match e {
            ConfigError::Parse(message) => ConfigError::Parse(format!("{}: {message}", path.display())),
            other => other,
        })?;
    }

    validate(&config).map_err(first_violation)?;
    Ok(config)
}

fn ensure_global_file(config_dir: &Path, global: &Path) -> Result<(), ConfigError> {
    if global.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(config_dir)?;
    std::fs::write(global, DEFAULT_CONFIG_CONTENT).map_err(|source| ConfigError::CreateDefault {
        path: global.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %global.display(), "wrote default config");
    Ok(())
}

/// Nearest `.vartree/config.toml` in `start` or one of its ancestors.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Whether any line carries a setting rather than a comment.
fn has_non_comment_content(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'))
}

fn first_violation(violations: Vec<ConfigError>) -> ConfigError {
    for violation in &violations {
        tracing::warn!("invalid config: {violation}");
    }
    violations.into_iter().next().unwrap_or_else(|| ConfigError::Validation {
        field: "config".into(),
        message: "rejected without a reason".into(),
    })
}

/// Parse `toml_str` over the defaults and validate it, without touching
/// the filesystem.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config = merge_configs(&Config::default(), toml_str)?;
    validate(&config).map_err(first_violation)?;
    Ok(config)
}
