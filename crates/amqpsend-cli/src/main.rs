//! amqpsend: send one message to an AMQP 1.0 broker over TLS.
//!
//!   amqpsend amqps://broker.example.com:5671 orders "hello" ANONYMOUS
//!   amqpsend --profile solace --ca ./ssl/ca.pem amqps://solace:5671 q "hi"
//!   amqpsend --check-setup

use amqpsend_cli::{Args, Settings, setup};
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let usage_error = e.use_stderr();
            e.print().context("failed to print usage")?;
            return Ok(if usage_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    let settings = Settings::load(&args)?;
    let level = if settings.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("amqpsend={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.check_setup {
        let report = setup::check(&settings);
        report.log();
        return Ok(report.exit_code());
    }

    let request = args.send_request()?;
    tracing::debug!("Settings: {:?}", settings);
    let outcome = amqpsend_cli::send(&settings, request).await?;
    match outcome.exit_code() {
        0 => tracing::info!("Done: {}", outcome),
        _ => tracing::error!("Failed: {}", outcome),
    }
    Ok(ExitCode::from(outcome.exit_code()))
}
