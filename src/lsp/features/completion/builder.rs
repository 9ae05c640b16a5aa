//! Completion list assembly
//!
//! Turns a raw engine candidate list into protocol completion items.
//! Candidates are visited in engine order (the engine's ranking tie-break)
//! and that order is preserved in the output. Each retained candidate goes
//! through either the deferred-insertion path (cheap placeholder text,
//! full change computed later by the after-insert request) or the
//! immediate-materialization path in [`super::materialize`].

use std::collections::HashSet;

use tower_lsp::lsp_types::{CompletionItem, CompletionTextEdit, Range, TextEdit};

use tracing::debug;

use crate::engine::{
    CompletionEngine, DocumentSnapshot, EngineError, ProviderKind, ProviderPolicy,
    RawCandidate, RawCompletionList,
};
use crate::lsp::document::span_to_range;

use super::classify::classify;
use super::commit_characters::resolve_commit_characters;
use super::materialize;

/// Result of assembling one completion list.
pub struct BuiltItems {
    pub items: Vec<CompletionItem>,
    /// Whether any retained candidate came from an unimported-symbol
    /// provider family. The caller turns the absence of such items into
    /// the "incomplete list" signal while the engine's background index
    /// is still populating.
    pub saw_unimported: bool,
}

/// Assembles the protocol items for one raw candidate list.
///
/// `expecting_unimported` is set when the engine signaled that expanded
/// (unimported) items may still arrive and the workspace option allows
/// them; it switches sort text to the `"0"`/`"1"` prefix scheme that keeps
/// in-scope symbols ahead of not-yet-imported ones. `use_deferred` selects
/// the two-step insertion flow, except for providers the engine declares
/// always-eager.
pub async fn build_completion_items(
    engine: &dyn CompletionEngine,
    snapshot: &DocumentSnapshot,
    offset: usize,
    raw: &RawCompletionList,
    expecting_unimported: bool,
    use_deferred: bool,
) -> Result<BuiltItems, EngineError> {
    let policy = engine.policy();
    let word_span = engine.default_span(&snapshot.text, offset);
    let typed: String = snapshot
        .text
        .slice(word_span.start.min(snapshot.text.len_chars())..word_span.end.min(snapshot.text.len_chars()))
        .to_string();
    let word_range = span_to_range(&snapshot.text, word_span);

    // The engine's own filter decides which candidates match the typed
    // prefix well enough to deserve preselection.
    let top_matches: HashSet<usize> = engine
        .filter_items(snapshot, &raw.items, &typed)
        .await
        .into_iter()
        .collect();

    let mut items = Vec::with_capacity(raw.items.len());
    let mut saw_unimported = false;

    for (index, candidate) in raw.items.iter().enumerate() {
        // Assembly-name completion surfaces an internal bookkeeping
        // project; that candidate never reaches the client.
        if candidate.provider == ProviderKind::AssemblyReference
            && candidate.display_text == policy.hidden_project_name
        {
            debug!("Skipping hidden project candidate `{}`", candidate.display_text);
            continue;
        }

        let eager = !use_deferred || policy.is_always_eager(candidate.provider);
        let mut item = if eager {
            materialize::materialize_immediate(
                engine,
                snapshot,
                offset,
                word_span,
                word_range,
                candidate,
                expecting_unimported,
                &policy,
                &mut saw_unimported,
            )
            .await?
        } else {
            deferred_item(
                candidate,
                word_range,
                expecting_unimported,
                &policy,
                &mut saw_unimported,
            )
        };

        item.kind = Some(classify(&candidate.tags));
        if candidate.preselect || top_matches.contains(&index) {
            item.preselect = Some(true);
        }
        if !candidate.inline_description.is_empty() {
            item.detail = Some(candidate.inline_description.clone());
        }
        item.commit_characters = resolve_commit_characters(
            &raw.default_commit_characters,
            &candidate.commit_character_rules,
            raw.is_suggestion_mode,
        );
        // Index into the session-cached raw list; resolve and after-insert
        // requests reference the candidate through this.
        item.data = Some(serde_json::json!(index));

        items.push(item);
    }

    Ok(BuiltItems { items, saw_unimported })
}

/// The deferred-insertion path: show the candidate using cheap information
/// only. The primary text comes from the engine's pre-suggested insertion
/// text, falling back to the filter text (never the display text, which
/// may carry formatting unsuitable for literal insertion). Every item
/// shares the typed-word span; secondary edits are left to the
/// after-insert request.
fn deferred_item(
    candidate: &RawCandidate,
    word_range: Range,
    expecting_unimported: bool,
    policy: &ProviderPolicy,
    saw_unimported: &mut bool,
) -> CompletionItem {
    let label = candidate.label();
    let insert_text = candidate
        .insertion_text
        .clone()
        .unwrap_or_else(|| candidate.filter_text.clone());

    let sort_text = if expecting_unimported {
        if policy.is_unimported(candidate.provider) {
            *saw_unimported = true;
            Some(format!("1{}", candidate.sort_text))
        } else {
            Some(format!("0{}", candidate.sort_text))
        }
    } else if candidate.sort_text != label {
        Some(candidate.sort_text.clone())
    } else {
        // Redundant sort text is omitted; the client falls back to label
        // ordering.
        None
    };

    let filter_text = (candidate.filter_text != label).then(|| candidate.filter_text.clone());

    CompletionItem {
        label,
        sort_text,
        filter_text,
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: word_range,
            new_text: insert_text,
        })),
        ..CompletionItem::default()
    }
}
