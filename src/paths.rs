use std::path::PathBuf;
use std::sync::OnceLock;

/// XDG-compliant config location for singscore.
///
/// On Linux: $XDG_CONFIG_HOME/singscore (~/.config/singscore).
/// On macOS: ~/Library/Application Support/singscore.
///
/// The `dirs` crate handles platform detection; the resolved base path is
/// cached so lookup only happens once.
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root config directory: $XDG_CONFIG_HOME/singscore
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("singscore")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_ends_with_crate_name() {
        assert!(config_dir().ends_with("singscore"));
    }

    #[test]
    fn config_file_structure() {
        assert!(config_file().ends_with("singscore/config.toml"));
    }
}
