// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outreach - multi-channel lead engagement engine.
//!
//! This is the binary entry point: the long-running server plus one-shot
//! operator commands.

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use outreach_config::OutreachConfig;

/// Outreach - campaign sequencing and live chat for inbound leads.
#[derive(Parser, Debug)]
#[command(name = "outreach", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway and the campaign sequencer.
    Serve,
    /// Run a single sequencer tick and exit.
    Tick,
    /// Enroll a lead in a campaign.
    Enroll {
        lead_id: String,
        campaign_id: String,
    },
    /// Print the effective configuration.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> OutreachConfig {
    let loaded = match path {
        Some(path) => outreach_config::load_and_validate_path(path),
        None => outreach_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            outreach_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.server.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Tick) => {
            init_tracing(&config.server.log_level);
            commands::run_tick(&config).await.map(|report| {
                println!(
                    "due={} advanced={} completed={} stale={} retrying={} failed={}",
                    report.due,
                    report.advanced,
                    report.completed,
                    report.stale,
                    report.retrying,
                    report.failed
                );
            })
        }
        Some(Commands::Enroll {
            lead_id,
            campaign_id,
        }) => {
            init_tracing(&config.server.log_level);
            commands::run_enroll(&config, &lead_id, &campaign_id)
                .await
                .map(|enrollment| {
                    let next = enrollment
                        .next_touch_at
                        .map(|at| outreach_core::types::format_timestamp(&at))
                        .unwrap_or_else(|| "-".to_string());
                    println!("enrolled {} (first touch at {next})", enrollment.key());
                })
        }
        Some(Commands::Config) => commands::render_config(&config).map(|rendered| {
            print!("{rendered}");
        }),
        None => {
            println!("outreach: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outreach={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enroll_arguments() {
        let cli = Cli::try_parse_from(["outreach", "enroll", "lead-1", "spring"]).unwrap();
        match cli.command {
            Some(Commands::Enroll {
                lead_id,
                campaign_id,
            }) => {
                assert_eq!(lead_id, "lead-1");
                assert_eq!(campaign_id, "spring");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["outreach", "tick", "--config", "/tmp/o.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Tick)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/o.toml")));
    }

    #[test]
    fn enroll_requires_both_ids() {
        assert!(Cli::try_parse_from(["outreach", "enroll", "lead-1"]).is_err());
    }
}
