use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use auth_session::{
    init_tracing_logs_with_config_if_set, AuthError, ConfigToml, EventKind, SessionState,
};
use auth_session_testnet::{MockAuthProvider, SessionTestnet};
use clap::Parser;

/// Drive a session store backed by the mock provider and print what happens.
#[derive(Parser, Debug)]
struct Cli {
    /// Optional path to a config file. This overrides the default config.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of sign-up requests to fire.
    #[clap(long, default_value_t = 5)]
    requests: usize,

    /// Make every sign-up fail, so the rate limit kicks in.
    #[clap(long)]
    fail: bool,

    /// Email used for every request.
    #[clap(long, default_value = "alice@example.com")]
    email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => ConfigToml::from_file(path)?,
        None => ConfigToml::default(),
    };
    if config.logging.is_some() {
        init_tracing_logs_with_config_if_set(&config)?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("auth_session=debug,auth_session_testnet=debug")
            .init();
    }
    let cooldown = config.signup.cooldown();

    let provider = MockAuthProvider::new();
    if args.fail {
        provider.fail_sign_ups(args.requests, AuthError::Rejected("signups disabled".into()));
    }
    let testnet = SessionTestnet::start_with_provider(provider, config).await?;
    let recorder = testnet.recorder();
    let handle = testnet.handle();

    tracing::info!(requests = args.requests, fail = args.fail, "Firing sign-up requests");
    for _ in 0..args.requests {
        handle.sign_up(args.email.as_str(), "hunter2")?;
    }

    // Give every queued request, cooldowns included, a chance to be served.
    recorder
        .quiet_for(cooldown * 2 + Duration::from_millis(500))
        .await;

    for kind in recorder.kinds() {
        tracing::info!("{}", kind);
    }
    tracing::info!(
        timeouts = recorder.count(EventKind::SignUpLimitTimeout),
        limit_errors = recorder.count(EventKind::SignUpLimitError),
        "Rate limit feedback"
    );
    tracing::info!(
        calls = testnet.provider().sign_up_calls(),
        "Provider sign-up calls"
    );

    let state: SessionState = (*handle.state()).clone();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
