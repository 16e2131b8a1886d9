//! AMQP 1.0 engine and the one-shot send lifecycle.
//!
//! The [`engine`] speaks the wire protocol (TLS, SASL, open/begin/attach,
//! transfer, teardown) and reports what happens as [`engine::Event`]s. The
//! [`controller::Controller`] reacts to those events: it owns the connection
//! and link state machines, sends the single message and classifies failures.
//!
//! ```no_run
//! # async fn demo(identity: std::sync::Arc<amqpsend_core::TlsIdentity>) -> Result<(), Box<dyn std::error::Error>> {
//! use amqpsend_client::{Controller, ControllerConfig, EngineSettings, Reactor, TcpTlsConnector};
//! use amqpsend_core::{AuthMode, BrokerProfile};
//!
//! let mut controller = Controller::new(ControllerConfig {
//!     profile: BrokerProfile::Generic,
//!     auth_mode: AuthMode::Anonymous,
//!     tls_identity: identity,
//!     url: "amqps://broker.example.com:5671".parse()?,
//!     address: "orders".into(),
//!     body: "hello".into(),
//! });
//! Reactor::new(TcpTlsConnector, EngineSettings::default())
//!     .run(&mut controller)
//!     .await?;
//! std::process::exit(controller.outcome().exit_code().into());
//! # }
//! ```

pub mod codec;
pub mod controller;
pub mod engine;
pub mod sasl_config;
pub mod sender;
pub mod tls;

pub use controller::{Controller, ControllerConfig, RunOutcome};
pub use engine::{
    Connected, Connector, EngineError, EngineSettings, Event, LifecycleHandler, Reactor,
    TcpTlsConnector,
};
pub use sasl_config::SaslConfig;

#[cfg(test)]
pub(crate) mod test_support {
    use amqpsend_core::{
        AuthMode, ConnectionParameters, CredentialPaths, PeerVerification, TlsIdentity, negotiate,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// An identity over placeholder files. Only for code that never reads
    /// the credentials.
    pub fn identity() -> Arc<TlsIdentity> {
        let dir = tempfile::tempdir().unwrap();
        let paths = CredentialPaths {
            certificate: dir.path().join("client.crt"),
            private_key: dir.path().join("client.key"),
            trusted_ca: dir.path().join("ca.pem"),
        };
        for (_, path) in paths.entries() {
            std::fs::write(path, "placeholder").unwrap();
        }
        Arc::new(TlsIdentity::configure(paths, "", PeerVerification::VerifyPeer).unwrap())
    }

    pub fn params(mode: AuthMode) -> ConnectionParameters {
        negotiate(
            mode,
            identity(),
            &"amqps://localhost:5671".parse().unwrap(),
            &BTreeMap::new(),
        )
    }
}
