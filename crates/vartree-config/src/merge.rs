//! Layering of TOML fragments over a resolved configuration.

use toml::{Table, Value};

use crate::config::Config;
use crate::error::ConfigError;

/// Layer a TOML fragment over `base`.
///
/// Keys the fragment names replace the ones in `base`; everything else
/// keeps its current value.
pub fn merge_configs(base: &Config, overlay_toml: &str) -> Result<Config, ConfigError> {
    let overlay: Table = overlay_toml.parse().map_err(parse_error)?;
    let mut merged = match Value::try_from(base).map_err(|e| ConfigError::Parse(e.to_string()))? {
        Value::Table(table) => table,
        other => {
            return Err(ConfigError::Parse(format!(
                "configuration serialized to a {} instead of a table",
                other.type_str()
            )))
        }
    };
    overlay_table(&mut merged, overlay);
    Value::Table(merged).try_into().map_err(parse_error)
}

fn parse_error(e: toml::de::Error) -> ConfigError {
    ConfigError::Parse(e.to_string())
}

/// Nested tables merge per key; any other value (arrays included)
/// replaces the existing one.
fn overlay_table(target: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (target.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(nested)) => overlay_table(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overlay_is_identity() {
        let mut base = Config::default();
        base.tree.base_chunk_size = 64;
        assert_eq!(merge_configs(&base, "").unwrap(), base);
    }

    #[test]
    fn overlay_touches_only_named_keys() {
        let base = Config::default();
        let merged = merge_configs(&base, "[tree]\nbase_chunk_size = 10\n").unwrap();
        assert_eq!(merged.tree.base_chunk_size, 10);
        assert_eq!(merged.tree.watch_not_available, base.tree.watch_not_available);
    }

    #[test]
    fn overlay_fills_optional_field() {
        let base = Config::default();
        assert!(base.adapter.command.is_none());
        let merged = merge_configs(&base, "[adapter]\ncommand = \"lldb-dap\"\n").unwrap();
        assert_eq!(merged.adapter.command.as_deref(), Some("lldb-dap"));
        assert_eq!(merged.adapter.adapter_id, "vartree");
    }

    #[test]
    fn arrays_are_replaced() {
        let mut base = Config::default();
        base.adapter.args = vec!["--a".into(), "--b".into()];
        let merged = merge_configs(&base, "[adapter]\nargs = [\"--c\"]\n").unwrap();
        assert_eq!(merged.adapter.args, vec!["--c".to_string()]);
    }

    #[test]
    fn malformed_overlay_is_parse_error() {
        let result = merge_configs(&Config::default(), "{{invalid}}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn other_sections_untouched() {
        let base = Config::default();
        let merged = merge_configs(&base, "[log]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(merged.tree, base.tree);
        assert_eq!(merged.adapter, base.adapter);
    }
}
