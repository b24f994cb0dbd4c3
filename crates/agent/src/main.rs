// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! courierd: the email campaign agent daemon.

use clap::{Parser, ValueEnum};
use courier_agent::http::{HttpObjectStore, HttpTemplateService};
use courier_agent::{Agent, AgentConfig, AgentDeps, LettreSmtpGateway};
use courier_core::SystemClock;
use courier_store::{MemoryCredentialStore, MemoryPushChannel, MemoryQueue, MemoryStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    /// General progress messages (default)
    Progress,
    /// Step execution details
    Steps,
    /// Work order data and state changes
    Workorder,
    /// Debug information and detailed processing
    Debug,
    /// Push channel connection status
    Websocket,
}

#[derive(Debug, Parser)]
#[command(name = "courierd", about = "Email campaign agent")]
struct Args {
    /// Log levels to enable (defaults to progress)
    #[arg(long = "log-levels", value_enum, num_args = 0..)]
    log_levels: Vec<LogLevel>,

    /// Perform startup then exit cleanly (useful for deployment checks)
    #[arg(long = "terminate-after-initialization")]
    terminate_after_initialization: bool,
}

fn log_filter(levels: &[LogLevel]) -> String {
    let levels: &[LogLevel] =
        if levels.is_empty() { &[LogLevel::Progress] } else { levels };
    // Errors and warnings always pass.
    let mut directives = vec!["warn".to_string()];
    for level in levels {
        match level {
            LogLevel::Progress => directives.push("courier_agent=info".to_string()),
            LogLevel::Steps => {
                directives.push("courier_agent::steps=debug".to_string());
                directives.push("courier_agent::executor=debug".to_string());
            }
            LogLevel::Workorder => {
                directives.push("courier_agent::agent=debug".to_string());
                directives.push("courier_agent::lock=debug".to_string());
            }
            LogLevel::Debug => {
                directives.push("courier_agent=debug".to_string());
                directives.push("courier_store=debug".to_string());
                directives.push("courier_core=debug".to_string());
            }
            LogLevel::Websocket => directives.push("courier_agent::notify=debug".to_string()),
        }
    }
    directives.join(",")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::new(log_filter(&args.log_levels));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AgentConfig::from_env();

    // Local-mode wiring. Production deployments supply their own
    // implementations of the store, queue, push and credential traits.
    let store = Arc::new(MemoryStore::system());
    let deps = AgentDeps {
        work_orders: Arc::clone(&store) as _,
        directory: Arc::clone(&store) as _,
        recipients: Arc::clone(&store) as _,
        queue: Arc::new(MemoryQueue::new()),
        objects: Arc::new(HttpObjectStore::new(config.html_bucket.clone())),
        templates: Arc::new(HttpTemplateService::new(config.template_service_url.clone())),
        push: Arc::new(MemoryPushChannel::new()),
        smtp: Arc::new(LettreSmtpGateway::new(
            Arc::new(config.clone()),
            Arc::new(MemoryCredentialStore::new()),
        )),
    };

    let agent = Arc::new(Agent::new(deps, config, SystemClock));

    if let Err(e) = agent.startup().await {
        tracing::error!(error = %e, "startup failed");
        return ExitCode::FAILURE;
    }

    if args.terminate_after_initialization {
        tracing::info!("initialization complete, terminating as requested");
        return ExitCode::SUCCESS;
    }

    let shutdown = agent.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    match agent.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "agent terminated abnormally");
            ExitCode::FAILURE
        }
    }
}
