//! Command-line arguments.

use amqpsend_core::{AuthMode, BrokerProfile, PeerVerification};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Send one message to an AMQP 1.0 broker over TLS.
#[derive(Parser, Debug)]
#[command(
    name = "amqpsend",
    version,
    after_help = "Exit status: 0 when the message was sent or the run was interrupted \
                  with Ctrl-C, 1 on any failure or when the connection ended unsent."
)]
pub struct Args {
    /// Broker URL, e.g. amqps://broker.example.com:5671
    #[arg(required_unless_present = "check_setup")]
    pub url: Option<String>,

    /// Queue or topic the message is sent to
    #[arg(required_unless_present = "check_setup")]
    pub address: Option<String>,

    /// Message body, sent as a string
    #[arg(required_unless_present = "check_setup")]
    pub body: Option<String>,

    /// EXTERNAL, PLAIN, ANONYMOUS or AUTO; defaults to the profile's mode
    pub auth_mode: Option<AuthMode>,

    /// Broker profile: generic, solace or debug
    #[arg(long, env = "AMQPSEND_PROFILE")]
    pub profile: Option<BrokerProfile>,

    /// Client certificate (PEM) [default: ./ssl/cert.pem]
    #[arg(long, env = "AMQPSEND_CERT")]
    pub cert: Option<PathBuf>,

    /// Client private key (PEM) [default: ./ssl/key.pem]
    #[arg(long, env = "AMQPSEND_KEY")]
    pub key: Option<PathBuf>,

    /// Trusted CA bundle (PEM) [default: ./ssl/ca.pem]
    #[arg(long, env = "AMQPSEND_CA")]
    pub ca: Option<PathBuf>,

    /// Passphrase for an encrypted PKCS#8 private key
    #[arg(long, env = "AMQPSEND_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Broker certificate check: peer (chain only) or peer-name (chain and host)
    #[arg(long, env = "AMQPSEND_VERIFY")]
    pub verify: Option<PeerVerification>,

    /// TOML file supplying defaults for the options above
    #[arg(long, env = "AMQPSEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, env = "AMQPSEND_VERBOSE")]
    pub verbose: bool,

    /// Report mechanisms, TLS support, SASL configuration and credential files, then exit
    #[arg(long)]
    pub check_setup: bool,
}

/// What to send, once the positional arguments are validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub url: Url,
    pub address: String,
    pub body: String,
}

impl Args {
    pub fn send_request(&self) -> Result<SendRequest> {
        let (Some(url), Some(address), Some(body)) = (&self.url, &self.address, &self.body) else {
            bail!("connection URL, target address and message body are required");
        };
        let url = parse_url(url)?;
        if address.is_empty() {
            bail!("target address must not be empty");
        }
        Ok(SendRequest {
            url,
            address: address.clone(),
            body: body.clone(),
        })
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid connection URL {raw:?}"))?;
    match url.scheme() {
        "amqps" | "amqp" => {}
        other => bail!("unsupported URL scheme {other:?}, expected amqps or amqp"),
    }
    if url.host_str().is_none_or(str::is_empty) {
        bail!("connection URL {raw:?} has no host");
    }
    Ok(url)
}
