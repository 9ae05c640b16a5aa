//! Backend state management
//!
//! This module defines the SableBackend struct, which holds all state for
//! the LSP server: the open-document store, the workspace options, and the
//! completion coordinator wired to the pluggable analysis engine.

use std::sync::Arc;

use parking_lot::RwLock;
use tower_lsp::Client;

use crate::config::ServerOptions;
use crate::engine::CompletionEngine;
use crate::lsp::document::DocumentStore;
use crate::lsp::features::completion::CompletionCoordinator;

/// The Sable language server backend, managing state and handling LSP
/// requests.
pub struct SableBackend {
    pub(super) client: Client,
    pub(super) documents: Arc<DocumentStore>,
    pub(super) options: Arc<RwLock<ServerOptions>>,
    pub(super) completion: CompletionCoordinator,
    pub(super) engine_name: &'static str,
}

impl SableBackend {
    pub fn new(client: Client, engine: Arc<dyn CompletionEngine>) -> Self {
        let documents = Arc::new(DocumentStore::new());
        let options = Arc::new(RwLock::new(ServerOptions::default()));
        let engine_name = engine.name();
        let completion =
            CompletionCoordinator::new(engine, Arc::clone(&documents), Arc::clone(&options));
        SableBackend {
            client,
            documents,
            options,
            completion,
            engine_name,
        }
    }
}

// Manual Debug implementation since CompletionEngine doesn't implement Debug
impl std::fmt::Debug for SableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SableBackend")
            .field("engine", &self.engine_name)
            .field("documents_count", &self.documents.len())
            .finish()
    }
}
