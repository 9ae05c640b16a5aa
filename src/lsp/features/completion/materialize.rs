//! Immediate edit materialization
//!
//! Used when the client needs one fully-resolved item with no follow-up
//! query, and for always-eager providers whose recorded change cannot be
//! replayed later. The engine's full textual change is requested now and
//! split into the primary edit (the one fragment intersecting the cursor)
//! and secondary edits attached as `additionalTextEdits`.

use tower_lsp::lsp_types::{CompletionItem, CompletionTextEdit, InsertTextFormat, Range, TextEdit};

use tracing::warn;

use crate::engine::{
    CandidateChange, CompletionEngine, DocumentSnapshot, EngineError, ProviderPolicy,
    RawCandidate, Span, TextChange,
};
use crate::lsp::document::span_to_range;

/// Materializes one candidate eagerly, producing a fully-resolved item.
#[allow(clippy::too_many_arguments)]
pub(super) async fn materialize_immediate(
    engine: &dyn CompletionEngine,
    snapshot: &DocumentSnapshot,
    offset: usize,
    word_span: Span,
    word_range: Range,
    candidate: &RawCandidate,
    expecting_unimported: bool,
    policy: &ProviderPolicy,
    saw_unimported: &mut bool,
) -> Result<CompletionItem, EngineError> {
    let label = candidate.label();

    if policy.is_unimported(candidate.provider) {
        // Unimported symbols keep the cheap shape even on the eager path:
        // display text verbatim over the typed word, forced behind
        // in-scope symbols, the import edit computed at resolve time.
        *saw_unimported = true;
        return Ok(CompletionItem {
            label,
            sort_text: Some(format!("1{}", candidate.sort_text)),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: word_range,
                new_text: candidate.display_text.clone(),
            })),
            ..CompletionItem::default()
        });
    }

    let change = engine.resolve_change(snapshot, candidate, offset, None).await?;

    let (primary, secondary): (Vec<&TextChange>, Vec<&TextChange>) = change
        .changes
        .iter()
        .partition(|fragment| fragment.span.touches(offset));

    if primary.len() != 1 {
        // The engine promised exactly one fragment under the cursor.
        // Degrade to the unmodified display text rather than failing the
        // whole request.
        debug_assert!(
            primary.len() == 1,
            "expected exactly one change fragment intersecting the cursor, found {}",
            primary.len()
        );
        warn!(
            "Change for `{}` had {} fragments intersecting the cursor; falling back to display text",
            label,
            primary.len()
        );
        return Ok(CompletionItem {
            label,
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: word_range,
                new_text: candidate.display_text.clone(),
            })),
            ..CompletionItem::default()
        });
    }
    let primary = primary[0];

    let (new_text, insert_text_format) = render_primary_text(primary, &change);

    let mut additional_edits = Vec::with_capacity(secondary.len());
    for fragment in secondary {
        if fragment.span.overlaps(&primary.span) {
            debug_assert!(false, "secondary edit overlaps the primary span");
            warn!("Dropping secondary edit overlapping the primary span for `{}`", label);
            continue;
        }
        additional_edits.push(TextEdit {
            range: span_to_range(&snapshot.text, fragment.span),
            new_text: fragment.new_text.clone(),
        });
    }

    // When the replaced range starts left of the typed word (override
    // stubs replace `override ` plus the identifier, not just the
    // identifier), client-side filtering measures from the edit's start
    // column. Prepend the covered source text so the item keeps matching
    // as the user types.
    let filter_text = if primary.span.start < word_span.start {
        let lead: String = snapshot
            .text
            .slice(primary.span.start..word_span.start)
            .to_string();
        Some(format!("{}{}", lead, candidate.filter_text))
    } else if candidate.filter_text != label {
        Some(candidate.filter_text.clone())
    } else {
        None
    };

    let sort_text = if expecting_unimported {
        Some(format!("0{}", candidate.sort_text))
    } else if candidate.sort_text != label {
        Some(candidate.sort_text.clone())
    } else {
        None
    };

    Ok(CompletionItem {
        label,
        sort_text,
        filter_text,
        insert_text_format,
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: span_to_range(&snapshot.text, primary.span),
            new_text,
        })),
        additional_text_edits: (!additional_edits.is_empty()).then_some(additional_edits),
        ..CompletionItem::default()
    })
}

/// Renders the primary insertion text, switching to snippet format when
/// the engine reported a cursor position inside the inserted text.
fn render_primary_text(
    primary: &TextChange,
    change: &CandidateChange,
) -> (String, Option<InsertTextFormat>) {
    let Some(new_position) = change.new_position else {
        return (primary.new_text.clone(), None);
    };
    let start = updated_start(change, primary);
    let len = primary.new_text.chars().count();
    if new_position < start || new_position > start + len {
        return (primary.new_text.clone(), None);
    }
    let caret = new_position - start;
    if caret == len {
        // A caret at the end of the inserted text is where plain insertion
        // leaves it anyway.
        return (primary.new_text.clone(), None);
    }

    let mut text = String::with_capacity(primary.new_text.len() + 2);
    for (i, c) in primary.new_text.chars().enumerate() {
        if i == caret {
            text.push_str("$0");
        }
        match c {
            '\\' | '$' | '}' => {
                text.push('\\');
                text.push(c);
            }
            _ => text.push(c),
        }
    }
    (text, Some(InsertTextFormat::SNIPPET))
}

/// The primary fragment's start offset in the updated document: its
/// original start shifted by the length delta of every fragment applied
/// before it.
fn updated_start(change: &CandidateChange, primary: &TextChange) -> usize {
    let mut delta: isize = 0;
    for fragment in &change.changes {
        if fragment.span.start < primary.span.start {
            delta += fragment.new_text.chars().count() as isize - fragment.span.len() as isize;
        }
    }
    (primary.span.start as isize + delta).max(0) as usize
}
