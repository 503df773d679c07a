use crate::config::Config;
use crate::error::ConfigError;

/// Check value ranges. Every violation is reported, not just the first.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let tree = &config.tree;
    let adapter = &config.adapter;
    let blank = |s: &str| s.trim().is_empty();

    let checks = [
        // A base of 1 never grows the chunk size.
        (
            tree.base_chunk_size < 2,
            "tree.base_chunk_size",
            format!("must be at least 2, got {}", tree.base_chunk_size),
        ),
        (
            adapter.request_timeout_secs == 0,
            "adapter.request_timeout_secs",
            "must be at least 1".to_string(),
        ),
        (
            blank(&adapter.adapter_id),
            "adapter.adapter_id",
            "must not be empty".to_string(),
        ),
        (
            adapter.command.as_deref().is_some_and(blank),
            "adapter.command",
            "must not be empty when set".to_string(),
        ),
    ];

    let violations: Vec<ConfigError> = checks
        .into_iter()
        .filter(|(failed, _, _)| *failed)
        .map(|(_, field, message)| ConfigError::Validation {
            field: field.to_string(),
            message,
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn base_chunk_size_below_two_rejected() {
        let mut cfg = Config::default();
        cfg.tree.base_chunk_size = 1;
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(format!("{}", errs[0]).contains("tree.base_chunk_size"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = Config::default();
        cfg.adapter.request_timeout_secs = 0;
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(format!("{}", errs[0]).contains("adapter.request_timeout_secs"));
    }

    #[test]
    fn blank_adapter_command_rejected() {
        let mut cfg = Config::default();
        cfg.adapter.command = Some("   ".into());
        let errs = validate(&cfg).unwrap_err();
        assert!(format!("{}", errs[0]).contains("adapter.command"));
    }

    #[test]
    fn multiple_errors_reported() {
        let mut cfg = Config::default();
        cfg.tree.base_chunk_size = 0;
        cfg.adapter.request_timeout_secs = 0;
        cfg.adapter.adapter_id = String::new();
        let errs = validate(&cfg).unwrap_err();
        assert_eq!(errs.len(), 3);
    }
}
