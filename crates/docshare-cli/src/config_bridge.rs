//! Bridge from `docshare_config::Config` to CLI-side types.

use docshare_config::Config;
use docshare_telemetry::{LogConfig, LogFormat};

/// Logging setup from the `[logging]` section.
///
/// Unknown formats fall back to compact; validation has already rejected
/// them for loaded configs.
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);

    LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_directives(&cfg.logging.directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.directives = vec!["docshare_gateway=trace".to_owned()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, ["docshare_gateway=trace"]);
    }

    #[test]
    fn test_unknown_format_falls_back() {
        let mut cfg = Config::default();
        cfg.logging.format = "xml".to_owned();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);
    }
}
