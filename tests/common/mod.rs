//! Shared test fixtures: a scriptable mock analysis engine and helpers for
//! constructing a completion coordinator over in-memory documents.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use ropey::Rope;
use tower_lsp::lsp_types::{
    CompletionContext, CompletionParams, CompletionTriggerKind, PartialResultParams, Position,
    TextDocumentIdentifier, TextDocumentPositionParams, Url, WorkDoneProgressParams,
};

use sable_language_server::config::ServerOptions;
use sable_language_server::engine::words::word_span_at;
use sable_language_server::engine::{
    CandidateChange, CompletionEngine, CompletionTrigger, DocumentSnapshot, EngineError,
    ProviderPolicy, RawCandidate, RawCompletionList, Span, SymbolDescription, TextChange,
};
use sable_language_server::lsp::document::DocumentStore;
use sable_language_server::lsp::features::completion::CompletionCoordinator;

/// Scriptable engine: queued candidate lists, canned changes and
/// descriptions keyed by display text.
pub struct MockEngine {
    /// Lists returned by successive `completions` calls. The last list is
    /// repeated once the queue runs dry; an empty queue means "no results".
    lists: Mutex<VecDeque<RawCompletionList>>,
    changes: HashMap<String, CandidateChange>,
    descriptions: HashMap<String, SymbolDescription>,
    policy: ProviderPolicy,
    trigger_response: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine {
            lists: Mutex::new(VecDeque::new()),
            changes: HashMap::new(),
            descriptions: HashMap::new(),
            policy: ProviderPolicy::default(),
            trigger_response: true,
        }
    }

    pub fn with_list(list: RawCompletionList) -> Self {
        let engine = MockEngine::new();
        engine.push_list(list);
        engine
    }

    pub fn push_list(&self, list: RawCompletionList) {
        self.lists.lock().push_back(list);
    }

    pub fn set_change(&mut self, display_text: &str, change: CandidateChange) {
        self.changes.insert(display_text.to_string(), change);
    }

    pub fn set_description(&mut self, display_text: &str, description: SymbolDescription) {
        self.descriptions.insert(display_text.to_string(), description);
    }

    pub fn set_trigger_response(&mut self, respond: bool) {
        self.trigger_response = respond;
    }
}

#[async_trait::async_trait]
impl CompletionEngine for MockEngine {
    async fn should_trigger(
        &self,
        _document: &DocumentSnapshot,
        _offset: usize,
        _trigger: char,
    ) -> bool {
        self.trigger_response
    }

    async fn completions(
        &self,
        _document: &DocumentSnapshot,
        _offset: usize,
        _trigger: CompletionTrigger,
    ) -> Result<Option<RawCompletionList>, EngineError> {
        let mut lists = self.lists.lock();
        if lists.len() > 1 {
            Ok(lists.pop_front())
        } else {
            Ok(lists.front().cloned())
        }
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
        let typed_lower = typed.to_lowercase();
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.filter_text.to_lowercase().starts_with(&typed_lower))
            .map(|(index, _)| index)
            .collect()
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
        if let Some(change) = self.changes.get(&candidate.display_text) {
            return Ok(change.clone());
        }
        let span = span.unwrap_or_else(|| word_span_at(&document.text, offset));
        Ok(CandidateChange::single(TextChange::new(
            span,
            candidate.filter_text.clone(),
        )))
    }

    async fn describe(
        &self,
        _document: &DocumentSnapshot,
        candidate: &RawCandidate,
    ) -> Result<Option<SymbolDescription>, EngineError> {
        Ok(self.descriptions.get(&candidate.display_text).cloned())
    }

    fn policy(&self) -> ProviderPolicy {
        self.policy.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Coordinator over a single open document, returning the handles the test
/// needs to drive it.
pub async fn setup(
    engine: MockEngine,
    text: &str,
    options: ServerOptions,
) -> (CompletionCoordinator, Url) {
    let documents = Arc::new(DocumentStore::new());
    let uri = Url::parse("file:///test/Program.sable").unwrap();
    documents.open(uri.clone(), text, 1);
    let coordinator = CompletionCoordinator::new(
        Arc::new(engine),
        documents,
        Arc::new(RwLock::new(options)),
    );
    (coordinator, uri)
}

pub fn completion_params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    }
}

pub fn triggered_params(uri: &Url, position: Position, trigger: char) -> CompletionParams {
    let mut params = completion_params(uri, position);
    params.context = Some(CompletionContext {
        trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
        trigger_character: Some(trigger.to_string()),
    });
    params
}

/// Workspace options with both completion features turned on.
pub fn all_options() -> ServerOptions {
    ServerOptions {
        enable_import_completion: true,
        enable_async_completion: true,
    }
}
