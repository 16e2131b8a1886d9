//! The `amqpsend` command: argument parsing, layered configuration, the
//! setup check and a single send run.

pub mod cli;
pub mod config;
pub mod setup;

pub use cli::{Args, SendRequest};
pub use config::{ConfigError, FileConfig, Settings};

use amqpsend_client::{
    Controller, ControllerConfig, EngineSettings, Reactor, RunOutcome, SaslConfig, TcpTlsConnector,
};
use amqpsend_core::TlsIdentity;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Checks the credentials, then runs one connection to completion.
///
/// Errors are setup problems: nothing was sent and, for missing credential
/// files, nothing was connected. Everything that happens on the wire is in
/// the returned outcome.
pub async fn send(settings: &Settings, request: SendRequest) -> Result<RunOutcome> {
    let identity = TlsIdentity::configure(
        settings.paths.clone(),
        settings.passphrase.clone(),
        settings.verification,
    )
    .context("credential check failed")?;

    let sasl_mech_list = match SaslConfig::discover() {
        Ok(Some(config)) => {
            tracing::debug!("Using SASL config {}", config.path.display());
            config.mech_list
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable SASL config: {}", e);
            None
        }
    };
    let engine = EngineSettings {
        sasl_mech_list,
        ..EngineSettings::default()
    };

    let mut controller = Controller::new(ControllerConfig {
        profile: settings.profile,
        auth_mode: settings.auth_mode,
        tls_identity: Arc::new(identity),
        url: request.url,
        address: request.address,
        body: request.body,
    });
    Reactor::new(TcpTlsConnector, engine)
        .run(&mut controller)
        .await
        .context("connection setup failed")?;
    Ok(controller.outcome())
}
