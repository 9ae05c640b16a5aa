//! Analysis engine abstraction for pluggable completion backends
//!
//! This module defines the core trait the completion front-end is built
//! against. The server itself is not a compiler or semantic analyzer; all
//! language knowledge lives behind [`CompletionEngine`], which allows the
//! LSP layer to work with different analysis implementations:
//! - the built-in word engine (identifier recall, no semantics)
//! - an out-of-process or linked-in semantic engine

pub mod candidate;
pub mod words;

pub use candidate::{
    CandidateChange, CandidateTag, CharacterSetRule, CharacterSetRuleKind, CompletionTrigger,
    DocumentSnapshot, ProviderKind, RawCandidate, RawCompletionList, Span, SymbolDescription,
    TaggedText, TextChange, TextTag,
};

use ropey::Rope;

use thiserror::Error;

/// Errors surfaced by an analysis engine.
///
/// None of these propagate to the client as protocol faults; the
/// completion layer logs them and degrades to an empty or unchanged
/// response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine does not track document `{0}`")]
    UnknownDocument(tower_lsp::lsp_types::Url),

    #[error("candidate `{0}` is not part of the current completion list")]
    UnknownCandidate(String),

    #[error("engine failure: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Provider-family sets the completion layer needs to consult.
///
/// These are configuration data supplied by the engine, not constants of
/// the front-end: a substituted engine declares which of its provider
/// families defer badly, which ones produce unimported symbols, and which
/// ones justify a completion popup on a space keystroke.
#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    /// Providers whose generated text depends on context that would be
    /// wrong if captured now and replayed later. Items from these
    /// providers are materialized eagerly even in deferred mode.
    pub always_eager: Vec<ProviderKind>,
    /// Provider families whose candidates need an import directive added
    /// when chosen.
    pub unimported: Vec<ProviderKind>,
    /// Providers worth showing a popup for when the query was triggered by
    /// typing a space.
    pub space_triggers: Vec<ProviderKind>,
    /// Assembly-name candidates with exactly this text are an artifact of
    /// internal multi-project bookkeeping and never reach the client.
    pub hidden_project_name: String,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        ProviderPolicy {
            always_eager: vec![ProviderKind::DocCommentText, ProviderKind::TagClose],
            unimported: vec![ProviderKind::TypeImport, ProviderKind::ExtensionMethodImport],
            space_triggers: vec![
                ProviderKind::ObjectCreation,
                ProviderKind::OverrideMember,
                ProviderKind::PartialMethod,
            ],
            hidden_project_name: "MiscellaneousFiles".to_string(),
        }
    }
}

impl ProviderPolicy {
    pub fn is_always_eager(&self, provider: ProviderKind) -> bool {
        self.always_eager.contains(&provider)
    }

    pub fn is_unimported(&self, provider: ProviderKind) -> bool {
        self.unimported.contains(&provider)
    }

    pub fn is_space_trigger(&self, provider: ProviderKind) -> bool {
        self.space_triggers.contains(&provider)
    }
}

/// Common interface for all completion analysis backends.
///
/// All methods take a [`DocumentSnapshot`] captured by the caller; the
/// engine never reaches back into the document store. Calls are awaited
/// and externally cancellable; the front-end imposes no timeout of its
/// own.
#[async_trait::async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Whether typing `trigger` at `offset` warrants showing completions.
    /// Only consulted for trigger-character queries; explicit invocation
    /// skips this heuristic.
    async fn should_trigger(
        &self,
        document: &DocumentSnapshot,
        offset: usize,
        trigger: char,
    ) -> bool;

    /// Computes raw candidates at `offset`. `Ok(None)` means the engine has
    /// nothing to offer here; that is not an error.
    async fn completions(
        &self,
        document: &DocumentSnapshot,
        offset: usize,
        trigger: CompletionTrigger,
    ) -> Result<Option<RawCompletionList>, EngineError>;

    /// Returns the indices of the candidates that match `typed` well enough
    /// to deserve preselection, best match first, using the engine's own
    /// filter function.
    async fn filter_items(
        &self,
        document: &DocumentSnapshot,
        items: &[RawCandidate],
        typed: &str,
    ) -> Vec<usize>;

    /// The "typed word" span at `offset`: the range of already-typed
    /// characters the engine considers the current word being completed.
    fn default_span(&self, text: &Rope, offset: usize) -> Span;

    /// Computes the full textual change for inserting `candidate` at the
    /// cursor `offset`, optionally constrained to replace `span`.
    async fn resolve_change(
        &self,
        document: &DocumentSnapshot,
        candidate: &RawCandidate,
        offset: usize,
        span: Option<Span>,
    ) -> Result<CandidateChange, EngineError>;

    /// Fetches structured documentation for `candidate`, if any exists.
    async fn describe(
        &self,
        document: &DocumentSnapshot,
        candidate: &RawCandidate,
    ) -> Result<Option<SymbolDescription>, EngineError>;

    /// Provider-family configuration for this engine.
    fn policy(&self) -> ProviderPolicy {
        ProviderPolicy::default()
    }

    /// Human-readable engine name for logging.
    fn name(&self) -> &'static str;
}
