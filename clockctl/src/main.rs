//! This is a command-line tool to manage an attendance database via [libclock]
use crate::{
    cli::*,
    commands::database::open_database,
    config::{Config, config_file},
};
use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;
mod prompt;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Cli::parse();
    let config_file = config_file()?;
    let cfg = Config::load_or_default(&config_file).await?;

    match args.command {
        Commands::Configure { database, server } => {
            let mut cfg = cfg;
            if database.is_none() && server.is_none() {
                println!(
                    "Database: {}",
                    cfg.database(None)?.to_string_lossy()
                );
                println!("Server: {}", cfg.server(None));
                return Ok(());
            }
            if database.is_some() {
                cfg.database = database;
            }
            if server.is_some() {
                cfg.server = server;
            }
            cfg.save_to_file(&config_file).await?;
            println!("Saved configuration to '{}'", config_file.display());
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "clockctl",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Harness {
            server,
            qr_code,
            second_qr_code,
            position,
            pause,
        } => {
            let server = cfg.server(server);
            commands::harness::run_harness(&server, &qr_code, &second_qr_code, position, pause)
                .await
        }
        Commands::Simulate {
            server,
            qr_code,
            store_token,
            position,
            pings,
            interval,
        } => {
            let server = cfg.server(server);
            commands::harness::simulate_shift(
                &server,
                &qr_code,
                store_token,
                position,
                pings,
                interval,
            )
            .await
        }
        Commands::Database { command } => {
            let dbpath = cfg.database(args.database)?;
            commands::database::handle_command(dbpath, command).await
        }
        command => {
            let dbpath = cfg.database(args.database)?;
            debug!(?dbpath, "Using database");
            let db = open_database(&dbpath).await?;
            match command {
                Commands::Employees { command } => {
                    commands::employees::handle_command(command, &db).await
                }
                Commands::Stores { command } => commands::stores::handle_command(command, &db).await,
                Commands::Shifts { command } => commands::shifts::handle_command(command, &db).await,
                Commands::ClockIn {
                    qr_code,
                    position,
                    store_token,
                    no_geofence,
                } => commands::punch::clock_in(qr_code, position, store_token, no_geofence, &db).await,
                Commands::ClockOut {
                    qr_code,
                    position,
                    no_geofence,
                } => commands::punch::clock_out(qr_code, position, no_geofence, &db).await,
                // already handled above
                Commands::Configure { .. }
                | Commands::Completions { .. }
                | Commands::Harness { .. }
                | Commands::Simulate { .. }
                | Commands::Database { .. } => Ok(()),
            }
        }
    }
}
