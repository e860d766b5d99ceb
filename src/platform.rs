//! Platform-specific directories.

use std::path::PathBuf;

const APP_NAME: &str = "cvewatch";

/// Directory holding `config.toml`.
///
/// - Linux: `~/.config/cvewatch/`
/// - macOS: `~/Library/Application Support/cvewatch/`
/// - Windows: `%APPDATA%\cvewatch\`
///
/// Falls back to `./cvewatch` when the platform directory is unknown.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory for cached lookups.
///
/// - Linux: `~/.cache/cvewatch/`
/// - macOS: `~/Library/Caches/cvewatch/`
/// - Windows: `%LOCALAPPDATA%\cvewatch\`
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_end_with_app_name() {
        assert!(config_dir().ends_with(APP_NAME));
        assert!(cache_dir().ends_with(APP_NAME));
    }
}
