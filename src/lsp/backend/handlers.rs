//! LSP request handlers
//!
//! Implements the LanguageServer trait for SableBackend:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_close)
//! - Completion (completion, completion_resolve) plus the custom
//!   `completionItem/afterInsert` request registered in `main`.

use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionOptionsCompletionItem, CompletionParams, CompletionResponse,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, InitializeParams, InitializeResult, InitializedParams, MessageType,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
};
use tower_lsp::LanguageServer;
use tracing::{debug, info, warn};

use crate::config::ServerOptions;
use crate::lsp::features::completion::{
    CompletionAfterInsertParams, CompletionAfterInsertResponse,
};

use super::state::SableBackend;

#[tower_lsp::async_trait]
impl LanguageServer for SableBackend {
    /// Handles the LSP initialize request, recording workspace options and
    /// advertising capabilities.
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize request");

        let options = ServerOptions::from_value(params.initialization_options.as_ref());
        info!(
            "Workspace options: importCompletion={}, asyncCompletion={}",
            options.enable_import_completion, options.enable_async_completion
        );
        *self.options.write() = options;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string(), " ".to_string()]),
                    all_commit_characters: None,
                    resolve_provider: Some(true),
                    completion_item: Some(CompletionOptionsCompletionItem {
                        label_details_support: Some(true),
                    }),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    /// Handles the LSP initialized notification.
    async fn initialized(&self, _params: InitializedParams) {
        info!("Initialized (engine: {})", self.engine_name);
        self.client
            .log_message(
                MessageType::INFO,
                format!("{} ready", env!("CARGO_PKG_NAME")),
            )
            .await;
    }

    /// Handles the LSP shutdown request.
    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        Ok(())
    }

    /// Handles opening a text document, adding it to the store.
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        info!("Opening document: URI={}, version={}", uri, version);
        self.documents.open(uri, &params.text_document.text, version);
    }

    /// Handles incremental document changes.
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        debug!("Changing document: URI={}, version={}", uri, version);
        if let Err(err) = self
            .documents
            .apply(&uri, params.content_changes, version)
            .await
        {
            warn!("Ignoring document change: {}", err);
        }
    }

    /// Handles closing a text document, dropping it from the store.
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Closing document: URI={}", uri);
        self.documents.close(&uri);
    }

    /// Handles configuration changes pushed by the client.
    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let options = ServerOptions::from_value(Some(&params.settings));
        info!(
            "Updated workspace options: importCompletion={}, asyncCompletion={}",
            options.enable_import_completion, options.enable_async_completion
        );
        *self.options.write() = options;
    }

    /// Provides code completion suggestions.
    async fn completion(
        &self,
        params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        let list = self.completion.completion(params).await;
        debug!(
            "Returning {} completion items (incomplete: {})",
            list.items.len(),
            list.is_incomplete
        );
        Ok(Some(CompletionResponse::List(list)))
    }

    /// Resolves documentation and import edits for a completion item.
    async fn completion_resolve(
        &self,
        item: tower_lsp::lsp_types::CompletionItem,
    ) -> jsonrpc::Result<tower_lsp::lsp_types::CompletionItem> {
        Ok(self.completion.resolve(item).await)
    }
}

impl SableBackend {
    /// Handles the custom `completionItem/afterInsert` request sent by
    /// clients that committed a deferred completion item.
    pub async fn completion_after_insert(
        &self,
        params: CompletionAfterInsertParams,
    ) -> jsonrpc::Result<CompletionAfterInsertResponse> {
        Ok(self.completion.after_insert(params).await)
    }
}
