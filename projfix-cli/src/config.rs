//! Configuration file loading for projfix.
//!
//! Discovers and loads `projfix.toml` from the root directory being fixed.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "projfix.toml";

/// Where `initlookup` writes when neither the CLI nor the config names a file.
pub const DEFAULT_LOOKUP_OUT: &str = "refs_old.json";

/// Top-level configuration from projfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjfixConfig {
    pub logging: LoggingConfig,
    pub lookup: LookupConfig,
    pub dotnet: DotnetConfig,
    pub versionless: VersionlessConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log to this file instead of stderr.
    pub file: Option<Utf8PathBuf>,

    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Default lookup file for `pathfix` and `remaplookup`.
    pub map: Option<Utf8PathBuf>,

    /// Default output file for `initlookup`.
    pub out: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DotnetConfig {
    /// Default target framework version for `dotnetver`.
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VersionlessConfig {
    /// Also strip versions from references under an `External` folder.
    pub include_external: bool,
}

/// Discover the projfix.toml config file in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a projfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<ProjfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ProjfixConfig> {
    let config: ProjfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return the default if there is none.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<ProjfixConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(ProjfixConfig::default()),
    }
}

/// Values given on the command line, all optional.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_file: Option<Utf8PathBuf>,
    pub map: Option<Utf8PathBuf>,
    pub out: Option<Utf8PathBuf>,
    pub version: Option<String>,
    pub include_external: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    pub log_file: Option<Utf8PathBuf>,
    pub log_filter: Option<String>,
    pub map: Option<Utf8PathBuf>,
    pub lookup_out: Option<Utf8PathBuf>,
    pub dotnet_version: Option<String>,
    pub include_external: bool,
}

/// Builder for merging config file with CLI arguments.
///
/// Relative paths from the config file are resolved against the directory holding it;
/// paths from the CLI are used as given.
pub struct ConfigMerger {
    config: ProjfixConfig,
    base: Utf8PathBuf,
}

impl ConfigMerger {
    pub fn new(config: ProjfixConfig, root: &Utf8Path) -> Self {
        Self {
            config,
            base: root.to_path_buf(),
        }
    }

    pub fn merge(self, cli: &CliOverrides) -> MergedConfig {
        let resolve = |p: Utf8PathBuf| if p.is_relative() { self.base.join(p) } else { p };

        MergedConfig {
            log_file: cli
                .log_file
                .clone()
                .or_else(|| self.config.logging.file.clone().map(resolve)),
            log_filter: self.config.logging.filter.clone(),
            map: cli
                .map
                .clone()
                .or_else(|| self.config.lookup.map.clone().map(resolve)),
            lookup_out: cli
                .out
                .clone()
                .or_else(|| self.config.lookup.out.clone().map(resolve)),
            dotnet_version: cli
                .version
                .clone()
                .or_else(|| self.config.dotnet.version.clone()),
            // A set flag wins; an unset flag defers to the config file.
            include_external: cli.include_external || self.config.versionless.include_external,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
[logging]
file = "csprojfix.log"
filter = "debug"

[lookup]
map = "refs_remap.json"
out = "refs_old.json"

[dotnet]
version = "v4.5.2"

[versionless]
include_external = true
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.logging.file.as_deref(), Some(Utf8Path::new("csprojfix.log")));
        assert_eq!(config.logging.filter.as_deref(), Some("debug"));
        assert_eq!(config.lookup.map.as_deref(), Some(Utf8Path::new("refs_remap.json")));
        assert_eq!(config.dotnet.version.as_deref(), Some("v4.5.2"));
        assert!(config.versionless.include_external);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.logging.file.is_none());
        assert!(config.lookup.map.is_none());
        assert!(!config.versionless.include_external);
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(parse_config("[dotnet\nversion = ").is_err());
        assert!(parse_config("[versionless]\ninclude_external = \"yes\"").is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        let config = load_or_default(root).unwrap();
        assert!(config.dotnet.version.is_none());
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let temp = TempDir::new().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), "[dotnet]\nversion = \"v4.6\"\n").unwrap();
        let config = load_or_default(root).unwrap();
        assert_eq!(config.dotnet.version.as_deref(), Some("v4.6"));
    }

    #[test]
    fn test_cli_takes_precedence() {
        let config = parse_config(
            "[lookup]\nmap = \"cfg.json\"\nout = \"cfg_out.json\"\n[dotnet]\nversion = \"v4.0\"\n",
        )
        .unwrap();
        let cli = CliOverrides {
            map: Some("cli.json".into()),
            version: Some("v4.5".to_string()),
            ..CliOverrides::default()
        };

        let merged = ConfigMerger::new(config, Utf8Path::new("repo")).merge(&cli);
        assert_eq!(merged.map.as_deref(), Some(Utf8Path::new("cli.json")));
        assert_eq!(merged.dotnet_version.as_deref(), Some("v4.5"));
        assert_eq!(
            merged.lookup_out,
            Some(Utf8PathBuf::from("repo").join("cfg_out.json"))
        );
    }

    #[test]
    fn test_defaults_without_config_or_cli() {
        let merged = ConfigMerger::new(ProjfixConfig::default(), Utf8Path::new("."))
            .merge(&CliOverrides::default());
        assert!(merged.lookup_out.is_none());
        assert!(merged.map.is_none());
        assert!(merged.log_file.is_none());
        assert!(!merged.include_external);
    }

    #[test]
    fn test_absolute_config_paths_are_kept() {
        let temp = TempDir::new().unwrap();
        let abs = Utf8Path::from_path(temp.path()).unwrap().join("refs.json");
        let config = ProjfixConfig {
            lookup: LookupConfig {
                map: Some(abs.clone()),
                out: None,
            },
            ..ProjfixConfig::default()
        };
        let merged =
            ConfigMerger::new(config, Utf8Path::new("repo")).merge(&CliOverrides::default());
        assert_eq!(merged.map, Some(abs));
    }
}
