//! Discovery of the SASL client configuration file.
//!
//! The file uses the Cyrus `key: value` layout. Only `mech_list` matters to
//! the engine: it narrows what AUTO mode may choose.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "proton-client.conf";
pub const SEARCH_PATH_ENV: &str = "PN_SASL_CONFIG_PATH";

const DEFAULT_DIRS: [&str; 3] = ["/etc/sasl2", "/usr/lib/sasl2", "./sasl2"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslConfig {
    pub path: PathBuf,
    pub mech_list: Option<Vec<String>>,
}

impl SaslConfig {
    /// Searches `PN_SASL_CONFIG_PATH` and the default directories.
    pub fn discover() -> std::io::Result<Option<SaslConfig>> {
        let env = std::env::var(SEARCH_PATH_ENV).ok();
        Self::discover_in(&search_path(env.as_deref()))
    }

    /// First readable config file in `dirs`.
    pub fn discover_in(dirs: &[PathBuf]) -> std::io::Result<Option<SaslConfig>> {
        for dir in dirs {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> std::io::Result<SaslConfig> {
        let text = std::fs::read_to_string(path)?;
        Ok(SaslConfig {
            path: path.to_path_buf(),
            mech_list: parse_mech_list(&text),
        })
    }
}

/// Directories to search, in order.
pub fn search_path(env: Option<&str>) -> Vec<PathBuf> {
    env.into_iter()
        .flat_map(|value| value.split(':'))
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .chain(DEFAULT_DIRS.iter().map(PathBuf::from))
        .collect()
}

/// Mechanisms named on the last `mech_list:` line, upper-cased.
pub fn parse_mech_list(text: &str) -> Option<Vec<String>> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once(':')?;
            (key.trim() == "mech_list").then(|| {
                value
                    .split_whitespace()
                    .map(str::to_ascii_uppercase)
                    .collect::<Vec<_>>()
            })
        })
        .last()
}
