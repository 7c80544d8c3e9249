//! sqlrelay - A SQL Relay over NUL-Framed TCP
//!
//! This is the main entry point for the relay server.
//! It sets up logging, the store, the TCP listener, and graceful shutdown.

use sqlrelay::commands::CommandHandler;
use sqlrelay::config::{CliAction, Config};
use sqlrelay::server::Server;
use sqlrelay::storage::{init_schema, Store};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
sqlrelay - A SQL Relay over NUL-Framed TCP

USAGE:
    sqlrelay [OPTIONS] [PORT]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>            Port to listen on (default: 7778)
    -d, --db <PATH>              SQLite database file (default: stomp_server.db)
        --busy-timeout-ms <MS>   Wait for a locked database (default: 5000)
        --write-ack <TEXT>       Reply for a successful write (default: done)
        --max-frame <BYTES>      Largest accepted message (default: 16777216)
        --shutdown-grace-ms <MS> Time open connections get at shutdown (default: 5000)
        --no-init-schema         Do not create the default tables at startup
    -v, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    sqlrelay                        # Start on 127.0.0.1:7778
    sqlrelay 7779                   # Start on port 7779
    sqlrelay --db /var/lib/app.db   # Use another database file

PROTOCOL:
    Send one SQL statement terminated by a NUL byte; the reply is one line
    terminated by a NUL byte:
    -> SELECT username FROM users\0
    <- SUCCESS|('alice',)\0
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
[{}] sqlrelay v{}
──────────────────────────────────────────────────────────────
Server started on {}
Database: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        sqlrelay::SERVER_NAME,
        sqlrelay::VERSION,
        config.bind_address(),
        config.db_path.display()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Parse command-line arguments
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("sqlrelay version {}", sqlrelay::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // The store is shared by every connection
    let store = Arc::new(Store::new(config.store_config()));
    if config.init_schema {
        init_schema(&store)?;
    }

    let command_handler = CommandHandler::new(Arc::clone(&store)).with_write_ack(&config.write_ack);

    // Bind the TCP listener
    let server = Server::bind(&config, command_handler).await?;
    print_banner(&config);
    info!(server = sqlrelay::SERVER_NAME, "Server started on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run(shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
