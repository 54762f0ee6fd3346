//! Cross-platform configuration path resolution
//!
//! - Linux: `$XDG_CONFIG_HOME/kube-checker` or `~/.config/kube-checker`
//! - macOS: `~/Library/Application Support/io.xenit.kube-checker`
//! - Windows: `%APPDATA%\xenit\kube-checker\config`

use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "KUBE_CHECKER_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("io", "xenit", "kube-checker")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config").join("kube-checker"))
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// The file named by `KUBE_CHECKER_CONFIG`, if set
pub fn explicit_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.to_string_lossy().contains("kube-checker"));
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with("config.yaml"));
    }
}
