//! Document store and text-position conversion
//!
//! Positions cross this boundary in two shapes: LSP line/character pairs
//! and char offsets into the document rope. All conversions clamp
//! out-of-range input to the nearest valid location instead of failing;
//! a stale client position must never take a request down.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use ropey::Rope;

use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Url};

use tracing::debug;

use crate::engine::{DocumentSnapshot, Span};
use crate::lsp::models::{LspDocument, LspDocumentState};

/// Converts an LSP position to a char offset in the rope, clamping to the
/// document bounds.
pub fn position_to_offset(text: &Rope, position: Position) -> usize {
    let last_line = text.len_lines().saturating_sub(1);
    let line = (position.line as usize).min(last_line);
    let line_start = text.line_to_char(line);
    let line_len = text.line(line).len_chars();
    line_start + (position.character as usize).min(line_len)
}

/// Converts a char offset back to an LSP position.
pub fn offset_to_position(text: &Rope, offset: usize) -> Position {
    let offset = offset.min(text.len_chars());
    let line = text.char_to_line(offset);
    Position {
        line: line as u32,
        character: (offset - text.line_to_char(line)) as u32,
    }
}

/// Converts a char-offset span into an LSP range.
pub fn span_to_range(text: &Rope, span: Span) -> Range {
    Range {
        start: offset_to_position(text, span.start),
        end: offset_to_position(text, span.end),
    }
}

impl LspDocumentState {
    /// Applies a list of content changes, updating the text in order.
    /// Returns an error if the version is not newer than the current one.
    pub fn apply(
        &mut self,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Result<(), String> {
        if version <= self.version {
            return Err(format!("Version {} not newer than {}", version, self.version));
        }
        for change in &changes {
            if let Some(range) = change.range {
                let start = position_to_offset(&self.text, range.start);
                let end = position_to_offset(&self.text, range.end).max(start);
                self.text.remove(start..end);
                self.text.insert(start, &change.text);
            } else {
                self.text = Rope::from_str(&change.text);
            }
        }
        self.version = version;
        Ok(())
    }
}

impl LspDocument {
    /// Returns the URI of the document.
    pub async fn uri(&self) -> Url {
        self.state.read().await.uri.clone()
    }

    /// Returns the current text of the document as a string.
    pub async fn text(&self) -> String {
        self.state.read().await.text.to_string()
    }

    /// Returns the current version of the document.
    pub async fn version(&self) -> i32 {
        self.state.read().await.version
    }

    /// Captures an immutable snapshot for handing to the engine.
    pub async fn snapshot(&self) -> DocumentSnapshot {
        let state = self.state.read().await;
        DocumentSnapshot {
            uri: state.uri.clone(),
            text: state.text.clone(),
            version: state.version,
        }
    }
}

/// Store mapping open file URIs to their documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<LspDocument>>,
    serial_document_id: AtomicU32,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore::default()
    }

    fn next_document_id(&self) -> u32 {
        self.serial_document_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Registers a newly opened document, replacing any previous entry for
    /// the same URI.
    pub fn open(&self, uri: Url, text: &str, version: i32) -> Arc<LspDocument> {
        let document = Arc::new(LspDocument {
            id: self.next_document_id(),
            state: tokio::sync::RwLock::new(LspDocumentState {
                uri: uri.clone(),
                text: Rope::from_str(text),
                version,
            }),
        });
        self.documents.insert(uri, Arc::clone(&document));
        document
    }

    /// Applies content changes to a tracked document. Unknown URIs and
    /// stale versions are reported, not panicked over.
    pub async fn apply(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Result<(), String> {
        let document = self
            .documents
            .get(uri)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| format!("Document not tracked: {}", uri))?;
        let mut state = document.state.write().await;
        state.apply(changes, version)
    }

    /// Removes a document from the store. Returns whether it was present.
    pub fn close(&self, uri: &Url) -> bool {
        let removed = self.documents.remove(uri).is_some();
        if !removed {
            debug!("Closed document was not tracked: {}", uri);
        }
        removed
    }

    /// Looks up a document by URI.
    pub fn get(&self, uri: &Url) -> Option<Arc<LspDocument>> {
        self.documents.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    /// Captures a snapshot of a tracked document, or `None` if the file is
    /// not open.
    pub async fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        let document = self.get(uri)?;
        Some(document.snapshot().await)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
