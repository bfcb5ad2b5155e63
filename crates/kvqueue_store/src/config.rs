//! Cursor configuration strings.

/// Options parsed from a cursor configuration string.
///
/// Configuration strings are comma-separated `key=value` entries, for example
/// `"overwrite=false"`. Unknown keys are ignored so callers can carry options
/// meant for other engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorConfig {
    /// Whether insert may replace an existing key.
    pub overwrite: bool,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl CursorConfig {
    /// Parses a configuration string.
    #[must_use]
    pub fn parse(config: &str) -> Self {
        let mut parsed = Self::default();
        for entry in config.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = match entry.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (entry, "true"),
            };
            if key == "overwrite" {
                parsed.overwrite = !matches!(value, "false" | "0");
            }
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_overwrites() {
        assert!(CursorConfig::parse("").overwrite);
    }

    #[test]
    fn overwrite_false() {
        assert!(!CursorConfig::parse("overwrite=false").overwrite);
        assert!(!CursorConfig::parse(" raw , overwrite = 0 ").overwrite);
    }

    #[test]
    fn bare_key_means_true() {
        assert!(CursorConfig::parse("overwrite").overwrite);
    }

    #[test]
    fn unknown_keys_ignored() {
        assert_eq!(
            CursorConfig::parse("append=true,dump=hex"),
            CursorConfig::default()
        );
    }
}
