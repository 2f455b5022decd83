use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use kiln_core::{ConfigError, RuntimeConfig};
use serde::Deserialize;

/// Env var that overrides `[server] bind_addr`.
pub const BIND_ADDR_ENV: &str = "KILN_BIND_ADDR";

const CONFIG_FILE: &str = "kiln.toml";

/// Full server configuration: the `[server]` table plus the runtime tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7878))
}
fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            templates_dir: default_templates_dir(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.runtime.cache.validate()?;
        Ok(config)
    }

    /// Resolve configuration: an explicit path must exist; otherwise
    /// `./kiln.toml`, then `<config dir>/kiln/kiln.toml`, then defaults.
    /// `KILN_BIND_ADDR` is applied on top.
    ///
    /// Returns the file that was read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => search_paths().into_iter().find(|p| p.is_file()),
        };

        let mut config = match &source {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            config.override_bind_addr(&addr)?;
        }
        Ok((config, source))
    }

    /// Replace the bind address, rejecting anything that is not a socket address.
    pub fn override_bind_addr(&mut self, addr: &str) -> Result<(), ConfigError> {
        self.server.bind_addr = addr
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address '{addr}': {e}")))?;
        Ok(())
    }
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("kiln").join(CONFIG_FILE));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_tables() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind_addr, default_bind_addr());
        assert_eq!(config.server.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.runtime.cache.max_entries, 10_000);
    }

    #[test]
    fn server_and_cache_tables_share_one_file() {
        let config = ServerConfig::from_toml_str(
            r#"
[server]
bind_addr = "0.0.0.0:9000"
templates_dir = "/srv/kiln/templates"

[cache]
max_entries = 64
"#,
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(config.server.templates_dir, PathBuf::from("/srv/kiln/templates"));
        assert_eq!(config.runtime.cache.max_entries, 64);
        assert_eq!(config.runtime.cache.idle_ttl_secs, 3600);
    }

    #[test]
    fn invalid_cache_settings_are_rejected() {
        let err = ServerConfig::from_toml_str("[cache]\nidle_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\ntemplates_dir = \"views\"\n").unwrap();

        let (config, source) = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.templates_dir, PathBuf::from("views"));
        assert_eq!(source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bind_override() {
        let mut config = ServerConfig::default();
        config.override_bind_addr("127.0.0.1:4000").unwrap();
        assert_eq!(config.server.bind_addr.port(), 4000);

        assert!(config.override_bind_addr("not an address").is_err());
    }
}
