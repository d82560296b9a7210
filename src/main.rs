//! pong-sync - headless driver for the two-player pong sync client
//!
//! Starts a local, hosted, joined or watched session and runs frames
//! against a stand-in simulation, optionally replaying a key script.

mod headless;
mod key_script;

use anyhow::{Context, Result};
use headless::RunOptions;
use key_script::KeyScriptPlayer;
use pong_sync_client::{ClientConfig, StartRequest, SyncClient};
use std::{env, path::PathBuf};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting pong-sync v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1))?;
    let config = match cli.config.as_deref() {
        Some(path) => ClientConfig::load_from_path(path),
        None => ClientConfig::load(),
    };
    let key_script = cli
        .key_script
        .as_deref()
        .map(KeyScriptPlayer::from_path)
        .transpose()?;

    let mut client = SyncClient::from_config(config).context("invalid client configuration")?;
    let session = client
        .start(cli.request.clone())
        .await
        .with_context(|| format!("failed to start {:?} session", cli.request))?;
    info!(
        "Session {} started as {}",
        session.session_id(),
        session.role()
    );

    let frames = headless::run(
        &mut client,
        RunOptions {
            max_frames: cli.max_frames,
            key_script,
        },
    )
    .await;
    client.reset();

    let frames = frames?;
    info!("Stopped after {} frames", frames);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    request: StartRequest,
    config: Option<PathBuf>,
    key_script: Option<PathBuf>,
    max_frames: Option<u64>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Self> {
        let mut request = None;
        let mut opts = CliOptions {
            request: StartRequest::Local,
            config: None,
            key_script: None,
            max_frames: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "local" => request = Some(StartRequest::Local),
                "host" => request = Some(StartRequest::Host),
                "join" | "watch" => {
                    let Some(id) = args.next() else {
                        anyhow::bail!("{arg} requires a session id");
                    };
                    request = Some(if arg == "join" {
                        StartRequest::Join(id.into())
                    } else {
                        StartRequest::Watch(id.into())
                    });
                }
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--key-script" => {
                    if let Some(path) = args.next() {
                        opts.key_script = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--key-script requires a file path");
                    }
                }
                "--max-frames" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_frames = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--max-frames must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--max-frames requires an integer");
                    }
                }
                other => {
                    tracing::warn!(arg = %other, "Ignoring unknown argument");
                }
            }
        }

        if let Some(request) = request {
            opts.request = request;
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_local_play() {
        let opts = parse(&[]).unwrap();
        assert_eq!(opts.request, StartRequest::Local);
        assert_eq!(opts.max_frames, None);
    }

    #[test]
    fn join_takes_session_id_and_flags() {
        let opts = parse(&[
            "join",
            "abc",
            "--config",
            "c.toml",
            "--max-frames",
            "120",
            "--key-script",
            "keys.json",
        ])
        .unwrap();
        assert_eq!(opts.request, StartRequest::Join("abc".into()));
        assert_eq!(opts.config, Some(PathBuf::from("c.toml")));
        assert_eq!(opts.key_script, Some(PathBuf::from("keys.json")));
        assert_eq!(opts.max_frames, Some(120));
    }

    #[test]
    fn watch_without_id_is_an_error() {
        assert!(parse(&["watch"]).is_err());
    }

    #[test]
    fn bad_frame_limit_is_ignored() {
        let opts = parse(&["host", "--max-frames", "lots"]).unwrap();
        assert_eq!(opts.request, StartRequest::Host);
        assert_eq!(opts.max_frames, None);
    }
}
