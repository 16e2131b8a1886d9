//! `--check-setup`: what this build supports and whether the host is ready.

use crate::config::Settings;
use amqpsend_client::engine::SUPPORTED_MECHANISMS;
use amqpsend_client::sasl_config::{self, SEARCH_PATH_ENV};
use amqpsend_client::{SaslConfig, tls};
use amqpsend_core::TlsIdentity;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStatus {
    pub role: &'static str,
    pub path: PathBuf,
    /// None when the file can be opened.
    pub problem: Option<String>,
}

#[derive(Debug)]
pub struct SetupReport {
    pub mechanisms: Vec<&'static str>,
    pub cipher_suites: Vec<String>,
    pub sasl_search_path: Vec<PathBuf>,
    pub sasl_config: Result<Option<SaslConfig>, String>,
    pub credentials: Vec<CredentialStatus>,
    /// Result of building the TLS configuration; only tried when every
    /// credential file is present.
    pub tls_config: Option<Result<(), String>>,
}

/// Checks the host using `PN_SASL_CONFIG_PATH` for SASL discovery.
pub fn check(settings: &Settings) -> SetupReport {
    let env = std::env::var(SEARCH_PATH_ENV).ok();
    check_with(settings, sasl_config::search_path(env.as_deref()))
}

pub fn check_with(settings: &Settings, sasl_search_path: Vec<PathBuf>) -> SetupReport {
    let credentials: Vec<CredentialStatus> = settings
        .paths
        .entries()
        .into_iter()
        .map(|(role, path)| CredentialStatus {
            role,
            path: path.to_path_buf(),
            problem: std::fs::File::open(path).err().map(|e| match e.kind() {
                std::io::ErrorKind::NotFound => "not found".to_string(),
                _ => e.to_string(),
            }),
        })
        .collect();

    let tls_config = credentials.iter().all(|c| c.problem.is_none()).then(|| {
        TlsIdentity::configure(
            settings.paths.clone(),
            settings.passphrase.clone(),
            settings.verification,
        )
        .map_err(|e| e.to_string())
        .and_then(|identity| {
            tls::client_config(&identity)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
    });

    SetupReport {
        mechanisms: SUPPORTED_MECHANISMS.to_vec(),
        cipher_suites: tls::provider()
            .cipher_suites
            .iter()
            .map(|suite| format!("{:?}", suite.suite()))
            .collect(),
        sasl_config: SaslConfig::discover_in(&sasl_search_path).map_err(|e| e.to_string()),
        sasl_search_path,
        credentials,
        tls_config,
    }
}

impl SetupReport {
    pub fn credentials_present(&self) -> bool {
        self.credentials.iter().all(|c| c.problem.is_none())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.credentials_present() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub fn log(&self) {
        tracing::info!("SASL mechanisms: {}", self.mechanisms.join(", "));
        tracing::info!(
            "TLS available (rustls, ring): {} cipher suites",
            self.cipher_suites.len()
        );
        tracing::debug!("Cipher suites: {}", self.cipher_suites.join(", "));

        let searched: Vec<String> = self
            .sasl_search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        match &self.sasl_config {
            Ok(Some(config)) => match &config.mech_list {
                Some(list) => tracing::info!(
                    "SASL config {} restricts AUTO to {}",
                    config.path.display(),
                    list.join(", ")
                ),
                None => tracing::info!("SASL config {} has no mech_list", config.path.display()),
            },
            Ok(None) => tracing::info!("No SASL config found in {}", searched.join(":")),
            Err(e) => tracing::warn!("SASL config unreadable: {}", e),
        }

        for credential in &self.credentials {
            match &credential.problem {
                None => tracing::info!("{}: {}", credential.role, credential.path.display()),
                Some(problem) => tracing::error!(
                    "{}: {} ({})",
                    credential.role,
                    credential.path.display(),
                    problem
                ),
            }
        }

        match &self.tls_config {
            Some(Ok(())) => tracing::info!("TLS configuration builds from the credentials"),
            Some(Err(e)) => tracing::warn!("TLS configuration failed: {}", e),
            None => {}
        }
    }
}
