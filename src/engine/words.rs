//! Built-in word engine
//!
//! A deliberately small [`CompletionEngine`] used when no semantic engine
//! is wired in: it recalls identifiers already present in the buffer and
//! offers them over the typed word. It carries no cross-file knowledge,
//! produces no secondary edits, and never reports unimported symbols, but
//! it keeps the server binary runnable end to end.

use std::collections::BTreeSet;

use ropey::Rope;

use super::{
    CandidateChange, CandidateTag, CompletionEngine, CompletionTrigger, DocumentSnapshot,
    EngineError, ProviderKind, RawCandidate, RawCompletionList, Span, SymbolDescription,
    TextChange,
};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The identifier span surrounding `offset`, scanning in both directions.
/// Returns the empty span at `offset` when the cursor is not inside a word.
pub fn word_span_at(text: &Rope, offset: usize) -> Span {
    let len = text.len_chars();
    let offset = offset.min(len);
    let mut start = offset;
    while start > 0 && is_word_char(text.char(start - 1)) {
        start -= 1;
    }
    let mut end = offset;
    while end < len && is_word_char(text.char(end)) {
        end += 1;
    }
    Span::new(start, end)
}

/// Identifier-recall completion engine backed by the document text itself.
#[derive(Debug, Default)]
pub struct WordEngine;

impl WordEngine {
    pub fn new() -> Self {
        WordEngine
    }

    /// Collects the distinct words of the document, skipping the word the
    /// cursor currently sits in so a half-typed identifier does not
    /// suggest itself.
    fn collect_words(&self, text: &Rope, skip: Span) -> BTreeSet<String> {
        let mut words = BTreeSet::new();
        let mut start: Option<usize> = None;
        for (i, c) in text.chars().enumerate() {
            if is_word_char(c) {
                if start.is_none() {
                    start = Some(i);
                }
            } else if let Some(s) = start.take() {
                if !(s == skip.start && i == skip.end) {
                    let word: String = text.slice(s..i).to_string();
                    if word.len() > 1 && !word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                        words.insert(word);
                    }
                }
            }
        }
        if let Some(s) = start {
            let end = text.len_chars();
            if !(s == skip.start && end == skip.end) {
                let word: String = text.slice(s..end).to_string();
                if word.len() > 1 && !word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    words.insert(word);
                }
            }
        }
        words
    }
}

#[async_trait::async_trait]
impl CompletionEngine for WordEngine {
    async fn should_trigger(
        &self,
        _document: &DocumentSnapshot,
        _offset: usize,
        trigger: char,
    ) -> bool {
        is_word_char(trigger)
    }

    async fn completions(
        &self,
        document: &DocumentSnapshot,
        offset: usize,
        _trigger: CompletionTrigger,
    ) -> Result<Option<RawCompletionList>, EngineError> {
        let span = word_span_at(&document.text, offset);
        let words = self.collect_words(&document.text, span);
        if words.is_empty() {
            return Ok(None);
        }
        let items = words
            .into_iter()
            .map(|word| RawCandidate {
                tags: vec![CandidateTag::Local],
                ..RawCandidate::named(word, ProviderKind::Symbol)
            })
            .collect();
        Ok(Some(RawCompletionList {
            items,
            ..RawCompletionList::default()
        }))
    }

    async fn filter_items(
        &self,
        _document: &DocumentSnapshot,
        items: &[RawCandidate],
        typed: &str,
    ) -> Vec<usize> {
        if typed.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.filter_text
                    .to_lowercase()
                    .starts_with(&typed.to_lowercase())
            })
            .map(|(i, _)| i)
            .collect();
        // Case-sensitive prefix matches first, shorter candidates before
        // longer ones within each group.
        matches.sort_by_key(|&i| {
            let c = &items[i];
            (!c.filter_text.starts_with(typed), c.filter_text.len())
        });
        matches
    }

    fn default_span(&self, text: &Rope, offset: usize) -> Span {
        word_span_at(text, offset)
    }

    async fn resolve_change(
        &self,
        document: &DocumentSnapshot,
        candidate: &RawCandidate,
        offset: usize,
        span: Option<Span>,
    ) -> Result<CandidateChange, EngineError> {
        let span = span.unwrap_or_else(|| word_span_at(&document.text, offset));
        let mut change = CandidateChange::single(TextChange::new(span, candidate.display_text.clone()));
        change.new_position = Some(span.start + candidate.display_text.chars().count());
        Ok(change)
    }

    async fn describe(
        &self,
        _document: &DocumentSnapshot,
        _candidate: &RawCandidate,
    ) -> Result<Option<SymbolDescription>, EngineError> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "words"
    }
}
