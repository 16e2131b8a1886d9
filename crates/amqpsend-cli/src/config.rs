//! Layered settings: command line over config file over profile defaults.

use crate::cli::Args;
use amqpsend_core::{AuthMode, BrokerProfile, CredentialPaths, PeerVerification};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Contents of the `--config` TOML file. Every key is optional.
///
/// ```toml
/// profile = "solace"
/// auth_mode = "EXTERNAL"
/// verify = "peer-name"
///
/// [credentials]
/// cert = "/etc/amqpsend/client.pem"
/// key = "/etc/amqpsend/client.key"
/// ca = "/etc/amqpsend/ca.pem"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub profile: Option<BrokerProfile>,
    pub auth_mode: Option<AuthMode>,
    pub verify: Option<PeerVerification>,
    pub passphrase: Option<String>,
    pub verbose: Option<bool>,
    pub credentials: FileCredentials,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileCredentials {
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything a run needs besides the positional arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: BrokerProfile,
    pub auth_mode: AuthMode,
    pub paths: CredentialPaths,
    pub passphrase: String,
    pub verification: PeerVerification,
    pub verbose: bool,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("profile", &self.profile)
            .field("auth_mode", &self.auth_mode)
            .field("paths", &self.paths)
            .field("passphrase", &"<redacted>")
            .field("verification", &self.verification)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Settings {
    /// Reads `--config` if given and merges it under the command line.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(args, file))
    }

    pub fn merge(args: &Args, file: FileConfig) -> Self {
        let profile = args.profile.or(file.profile).unwrap_or_default();
        let defaults = CredentialPaths::default();
        Self {
            profile,
            auth_mode: args
                .auth_mode
                .or(file.auth_mode)
                .unwrap_or_else(|| profile.default_auth_mode()),
            paths: CredentialPaths {
                certificate: pick(&args.cert, file.credentials.cert, defaults.certificate),
                private_key: pick(&args.key, file.credentials.key, defaults.private_key),
                trusted_ca: pick(&args.ca, file.credentials.ca, defaults.trusted_ca),
            },
            passphrase: args
                .passphrase
                .clone()
                .or(file.passphrase)
                .unwrap_or_default(),
            verification: args.verify.or(file.verify).unwrap_or_default(),
            verbose: args.verbose || file.verbose.unwrap_or(false) || profile.verbose(),
        }
    }
}

fn pick(cli: &Option<PathBuf>, file: Option<PathBuf>, default: PathBuf) -> PathBuf {
    cli.clone().or(file).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(
            ["amqpsend"]
                .into_iter()
                .chain(extra.iter().copied())
                .chain(["amqps://broker", "q", "body"]),
        )
        .unwrap()
    }

    #[test]
    fn profile_defaults_apply() {
        let settings = Settings::merge(&args(&[]), FileConfig::default());
        assert_eq!(settings.profile, BrokerProfile::Generic);
        assert_eq!(settings.auth_mode, AuthMode::Anonymous);
        assert_eq!(settings.paths, CredentialPaths::default());
        assert_eq!(settings.verification, PeerVerification::VerifyPeer);
        assert!(!settings.verbose);

        let solace = Settings::merge(&args(&["--profile", "solace"]), FileConfig::default());
        assert_eq!(solace.auth_mode, AuthMode::External);

        let debug = Settings::merge(&args(&["--profile", "debug"]), FileConfig::default());
        assert!(debug.verbose);
    }

    #[test]
    fn command_line_beats_file() {
        let file: FileConfig = toml::from_str(
            r#"
            profile = "solace"
            auth_mode = "PLAIN"
            verify = "peer-name"
            passphrase = "from-file"

            [credentials]
            key = "/file/key.pem"
            ca = "/file/ca.pem"
            "#,
        )
        .unwrap();

        let settings = Settings::merge(
            &args(&["--key", "/cli/key.pem", "--passphrase", "from-cli"]),
            file,
        );
        assert_eq!(settings.profile, BrokerProfile::Solace);
        assert_eq!(settings.auth_mode, AuthMode::Plain);
        assert_eq!(settings.verification, PeerVerification::VerifyPeerName);
        assert_eq!(settings.passphrase, "from-cli");
        assert_eq!(settings.paths.private_key, PathBuf::from("/cli/key.pem"));
        assert_eq!(settings.paths.trusted_ca, PathBuf::from("/file/ca.pem"));
        assert_eq!(settings.paths.certificate, PathBuf::from("./ssl/cert.pem"));
    }

    #[test]
    fn file_mode_beats_profile_default() {
        let file = FileConfig {
            profile: Some(BrokerProfile::Solace),
            auth_mode: Some(AuthMode::Auto),
            ..FileConfig::default()
        };
        assert_eq!(Settings::merge(&args(&[]), file).auth_mode, AuthMode::Auto);
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = FileConfig::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.toml"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "colour = \"blue\"\n").unwrap();
        assert!(matches!(
            FileConfig::load(&bad).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn passphrase_is_not_printed() {
        let settings = Settings::merge(&args(&["--passphrase", "hunter2"]), FileConfig::default());
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
