use std::sync::Arc;

use anyhow::Context;

use clap::Parser;

use tower_lsp::{LspService, Server};

use tracing::info;

use sable_language_server::engine::words::WordEngine;
use sable_language_server::engine::CompletionEngine;
use sable_language_server::logging::init_logger;
use sable_language_server::lsp::backend::SableBackend;
use sable_language_server::lsp::features::completion::AFTER_INSERT_METHOD;

/// Language server providing code completion over stdio.
#[derive(Debug, Parser)]
#[command(name = "sable-language-server", version, about)]
struct Args {
    /// Log level for stderr output (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Disable the debug-level session log file
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_log)
        .context("failed to initialize logging")?;

    let engine: Arc<dyn CompletionEngine> = Arc::new(WordEngine::new());
    info!("Starting {} with engine {}", env!("CARGO_PKG_NAME"), engine.name());

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(|client| SableBackend::new(client, engine))
        .custom_method(AFTER_INSERT_METHOD, SableBackend::completion_after_insert)
        .finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
