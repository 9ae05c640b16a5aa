//! Code completion: list assembly and two-phase resolution
//!
//! This module adapts raw engine candidates into protocol completion
//! items. It provides:
//! - List assembly with engine-order preservation, filtering, and sort
//!   keys that keep in-scope symbols ahead of unimported ones
//! - Deferred ("async") insertion: cheap placeholder text up front, the
//!   real edit computed once the client actually picks an item
//! - Lazy resolution of documentation and import edits
//! - The non-standard `completionItem/afterInsert` follow-up request for
//!   deferred items whose primary text is already in the document

pub mod builder;
pub mod classify;
pub mod commit_characters;
pub mod materialize;
pub mod session;

pub use session::CompletionCoordinator;

use serde::{Deserialize, Serialize};

use tower_lsp::lsp_types::{CompletionItem, Position, TextDocumentIdentifier, TextEdit};

/// JSON-RPC method name for the after-insert follow-up request.
pub const AFTER_INSERT_METHOD: &str = "completionItem/afterInsert";

/// Parameters of `completionItem/afterInsert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAfterInsertParams {
    pub text_document: TextDocumentIdentifier,
    /// Caret position after the client applied the item's primary edit.
    pub position: Position,
    /// The completion item exactly as previously returned by the server.
    pub item: CompletionItem,
}

/// Response of `completionItem/afterInsert`. All fields null means there
/// is nothing further to apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAfterInsertResponse {
    /// Follow-up edit in the coordinates of the document as it was when
    /// the request arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<TextEdit>,
    /// Final caret line after applying `change`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Final caret column after applying `change`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl CompletionAfterInsertResponse {
    /// Explicit "no further action" response.
    pub fn none() -> Self {
        CompletionAfterInsertResponse::default()
    }
}
