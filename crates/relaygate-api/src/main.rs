//! relaygate CLI and REST API entry point.
//!
//! Binary name: `rgate`
//!
//! Parses CLI arguments, loads configuration, opens storage and wires
//! services, then dispatches to the command handler or starts the server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, ClientCommand, Commands, SecretCommand, TokenCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,relaygate=debug",
        _ => "trace",
    };
    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    relaygate_observe::tracing_setup::init_tracing(filter, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "rgate", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.clone(), cli.in_memory).await?;

    let result = run(cli, state).await;
    relaygate_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host, .. } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} relaygate listening on {} ({} storage)",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan(),
                    state.backend_kind
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Authorize { token, resource } => {
            cli::authorize::authorize(&state, &token, &resource, cli.json).await?;
        }

        Commands::Rotate { secret_id } => {
            cli::rotate::rotate(&state, secret_id.as_deref(), cli.json).await?;
        }

        Commands::RotateStep {
            secret_id,
            token,
            step,
        } => {
            cli::rotate::rotate_step(&state, &secret_id, &token, &step, cli.json).await?;
        }

        Commands::Token { action } => match action {
            TokenCommand::Issue {
                sub,
                ttl,
                workflow_id,
                execution_id,
            } => {
                cli::token::issue(
                    &state,
                    &sub,
                    ttl,
                    workflow_id.as_deref(),
                    execution_id.as_deref(),
                    cli.json,
                )
                .await?;
            }
        },

        Commands::Secret { action } => match action {
            SecretCommand::Show { secret_id } => {
                cli::secret::show_secret(&state, secret_id.as_deref(), cli.json).await?;
            }
            SecretCommand::Seed { secret_id, value } => {
                cli::secret::seed_secret(&state, secret_id.as_deref(), value.as_deref(), cli.json)
                    .await?;
            }
        },

        Commands::Client { action } => match action {
            ClientCommand::Register {
                id,
                name,
                task,
                workflows,
            } => {
                cli::client::register_client(&state, &id, &name, &task, workflows, cli.json)
                    .await?;
            }
            ClientCommand::List => {
                cli::client::list_clients(&state, cli.json).await?;
            }
        },

        Commands::Admit { file } => {
            cli::admit::admit_file(&state, &file, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
