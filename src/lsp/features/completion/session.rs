//! Completion session coordination
//!
//! The per-session state machine behind the three completion requests:
//! the initial query, the deferred resolve (documentation + import
//! edits), and the after-insert follow-up for deferred items. It owns the
//! single most-recent-completion cache: one slot, overwritten by every
//! new query, guarded by a mutex because a resolve may race a new query
//! from the client. Last write wins; a resolve against a replaced list
//! fails soft.

use std::sync::Arc;

use parking_lot::RwLock;

use ropey::Rope;

use serde_json::Value;

use tokio::sync::Mutex;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionList, CompletionParams, CompletionTextEdit, CompletionTriggerKind,
    Documentation, MarkupContent, MarkupKind, Position, TextEdit, Url,
};

use tracing::{debug, warn};

use crate::config::ServerOptions;
use crate::engine::{CompletionEngine, CompletionTrigger, RawCompletionList, TextChange};
use crate::lsp::document::{offset_to_position, position_to_offset, span_to_range, DocumentStore};

use super::builder::build_completion_items;
use super::{CompletionAfterInsertParams, CompletionAfterInsertResponse};

/// The cached raw list of the most recent completion query. `Data`
/// indices on returned items are only meaningful against this slot.
struct SessionSlot {
    list: Arc<RawCompletionList>,
    uri: Url,
    #[allow(dead_code)]
    position: Position,
    /// Char offset of the originating cursor position; used to tell the
    /// import fragment apart from the primary fragment at resolve time.
    offset: usize,
}

/// Coordinates completion requests for one connected client session.
pub struct CompletionCoordinator {
    engine: Arc<dyn CompletionEngine>,
    documents: Arc<DocumentStore>,
    options: Arc<RwLock<ServerOptions>>,
    session: Mutex<Option<SessionSlot>>,
}

impl CompletionCoordinator {
    pub fn new(
        engine: Arc<dyn CompletionEngine>,
        documents: Arc<DocumentStore>,
        options: Arc<RwLock<ServerOptions>>,
    ) -> Self {
        CompletionCoordinator {
            engine,
            documents,
            options,
            session: Mutex::new(None),
        }
    }

    /// Handles `textDocument/completion`. Every failure path yields an
    /// empty, complete list; nothing here surfaces as a protocol error.
    pub async fn completion(&self, params: CompletionParams) -> CompletionList {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        // Invalidate the previous list before computing the new one so a
        // racing resolve cannot observe a half-replaced slot.
        self.session.lock().await.take();

        let empty = CompletionList::default();
        let Some(snapshot) = self.documents.snapshot(&uri).await else {
            debug!("Completion requested for untracked document {}", uri);
            return empty;
        };
        let offset = position_to_offset(&snapshot.text, position);

        let trigger = match params.context.as_ref() {
            Some(context) if context.trigger_kind == CompletionTriggerKind::TRIGGER_CHARACTER => {
                context
                    .trigger_character
                    .as_ref()
                    .and_then(|s| s.chars().next())
                    .map(CompletionTrigger::Character)
                    .unwrap_or(CompletionTrigger::Invoked)
            }
            _ => CompletionTrigger::Invoked,
        };

        // Trigger-character queries honor the engine's heuristic; explicit
        // invocation always proceeds.
        if let CompletionTrigger::Character(c) = trigger {
            if !self.engine.should_trigger(&snapshot, offset, c).await {
                debug!("Engine declined trigger character {:?} at offset {}", c, offset);
                return empty;
            }
        }

        let raw = match self.engine.completions(&snapshot, offset, trigger).await {
            Ok(Some(list)) if !list.items.is_empty() => list,
            Ok(_) => return empty,
            Err(err) => {
                warn!("Completion query failed for {}: {}", uri, err);
                return empty;
            }
        };

        let policy = self.engine.policy();
        if trigger == CompletionTrigger::Character(' ')
            && !raw.items.iter().any(|c| policy.is_space_trigger(c.provider))
        {
            // Space is typed constantly; only a few providers justify a
            // popup for it.
            debug!("Suppressing completion on space: no space-worthy candidates");
            return empty;
        }

        let options = self.options.read().clone();
        let expecting_unimported = raw.expanded_items_available && options.enable_import_completion;

        let built = match build_completion_items(
            self.engine.as_ref(),
            &snapshot,
            offset,
            &raw,
            expecting_unimported,
            options.enable_async_completion,
        )
        .await
        {
            Ok(built) => built,
            Err(err) => {
                warn!("Failed to build completion items for {}: {}", uri, err);
                return empty;
            }
        };

        *self.session.lock().await = Some(SessionSlot {
            list: Arc::new(raw),
            uri,
            position,
            offset,
        });

        CompletionList {
            // Ask the client to re-query until the unimported items the
            // engine promised actually show up.
            is_incomplete: expecting_unimported && !built.saw_unimported,
            items: built.items,
        }
    }

    /// Handles `completionItem/resolve`: attaches documentation and, for
    /// import provider families, the import-insertion edit. Any staleness
    /// or inconsistency returns the input item unchanged.
    pub async fn resolve(&self, item: CompletionItem) -> CompletionItem {
        let (list, uri, offset) = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(slot) => (Arc::clone(&slot.list), slot.uri.clone(), slot.offset),
                None => {
                    warn!("Resolve requested with no cached completion list");
                    return item;
                }
            }
        };

        let Some(index) = item.data.as_ref().and_then(Value::as_u64).map(|i| i as usize) else {
            warn!("Resolve item `{}` carries no usable data index", item.label);
            return item;
        };
        let Some(candidate) = list.items.get(index) else {
            warn!(
                "Resolve index {} out of range for cached list of {} items",
                index,
                list.items.len()
            );
            return item;
        };
        if candidate.label() != item.label {
            // An intervening completion query replaced the cache.
            warn!(
                "Stale resolve: cached candidate at index {} is `{}`, client sent `{}`",
                index,
                candidate.label(),
                item.label
            );
            return item;
        }
        let Some(snapshot) = self.documents.snapshot(&uri).await else {
            debug!("Document {} closed before resolve", uri);
            return item;
        };

        let mut item = item;
        match self.engine.describe(&snapshot, candidate).await {
            Ok(Some(description)) if !description.is_empty() => {
                item.documentation = Some(Documentation::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: description.to_markdown(),
                }));
            }
            Ok(_) => {}
            Err(err) => warn!("Description lookup failed for `{}`: {}", item.label, err),
        }

        if self.engine.policy().is_unimported(candidate.provider) {
            match self.engine.resolve_change(&snapshot, candidate, offset, None).await {
                Ok(change) => {
                    let edits: Vec<TextEdit> = change
                        .changes
                        .iter()
                        .filter(|fragment| !fragment.span.touches(offset))
                        .map(|fragment| TextEdit {
                            range: span_to_range(&snapshot.text, fragment.span),
                            new_text: fragment.new_text.clone(),
                        })
                        .collect();
                    if !edits.is_empty() {
                        item.additional_text_edits = Some(edits);
                    }
                }
                Err(err) => warn!("Import edit computation failed for `{}`: {}", item.label, err),
            }
        }

        item
    }

    /// Handles `completionItem/afterInsert`: computes the residual edit
    /// for a deferred item whose placeholder text the client has already
    /// inserted. Every failure path, and the nothing-left-to-do case,
    /// yields the explicit all-null response.
    pub async fn after_insert(
        &self,
        params: CompletionAfterInsertParams,
    ) -> CompletionAfterInsertResponse {
        let uri = params.text_document.uri;
        let Some(snapshot) = self.documents.snapshot(&uri).await else {
            debug!("After-insert requested for untracked document {}", uri);
            return CompletionAfterInsertResponse::none();
        };
        let offset = position_to_offset(&snapshot.text, params.position);
        let inserted = inserted_text(&params.item);

        // Re-query at the updated cursor: the placeholder text now sits in
        // the document, so the engine sees the real insertion context.
        let raw = match self
            .engine
            .completions(&snapshot, offset, CompletionTrigger::Invoked)
            .await
        {
            Ok(Some(list)) if !list.items.is_empty() => list,
            Ok(_) => {
                debug!("No candidates at the after-insert position in {}", uri);
                return CompletionAfterInsertResponse::none();
            }
            Err(err) => {
                warn!("After-insert re-query failed for {}: {}", uri, err);
                return CompletionAfterInsertResponse::none();
            }
        };

        let Some(candidate) = raw.items.iter().find(|c| c.filter_text == inserted) else {
            debug!("No candidate matches inserted text `{}`", inserted);
            return CompletionAfterInsertResponse::none();
        };
        if self.engine.policy().is_always_eager(candidate.provider) {
            // Fully materialized at list-build time; nothing was deferred.
            return CompletionAfterInsertResponse::none();
        }

        let change = match self
            .engine
            .resolve_change(&snapshot, candidate, offset, None)
            .await
        {
            Ok(change) => change,
            Err(err) => {
                warn!("After-insert change computation failed for `{}`: {}", inserted, err);
                return CompletionAfterInsertResponse::none();
            }
        };

        if change.change.new_text == inserted {
            // The document already holds the final text; replying with the
            // change again would double-apply it.
            return CompletionAfterInsertResponse::none();
        }

        let updated = apply_change(&snapshot.text, &change.change);
        let caret = change
            .new_position
            .map(|position| offset_to_position(&updated, position));

        CompletionAfterInsertResponse {
            change: Some(TextEdit {
                range: span_to_range(&snapshot.text, change.change.span),
                new_text: change.change.new_text.clone(),
            }),
            line: caret.map(|p| p.line),
            column: caret.map(|p| p.character),
        }
    }

    /// Whether a raw list is currently cached. Exposed for tests.
    pub async fn has_cached_list(&self) -> bool {
        self.session.lock().await.is_some()
    }
}

/// The text the client inserted when it committed the item: the primary
/// edit's text if present, else the plain insert text, else the label.
fn inserted_text(item: &CompletionItem) -> String {
    if let Some(CompletionTextEdit::Edit(edit)) = &item.text_edit {
        return edit.new_text.clone();
    }
    if let Some(text) = &item.insert_text {
        return text.clone();
    }
    item.label.clone()
}

/// Applies one text change to a copy of the document.
fn apply_change(text: &Rope, change: &TextChange) -> Rope {
    let mut updated = text.clone();
    let start = change.span.start.min(updated.len_chars());
    let end = change.span.end.min(updated.len_chars()).max(start);
    updated.remove(start..end);
    updated.insert(start, &change.new_text);
    updated
}
