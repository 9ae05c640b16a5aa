//! Raw completion data produced by an analysis engine
//!
//! These types form the read-only surface the server consumes: candidate
//! lists live for a single completion query/response cycle and are
//! re-requested on every new query. Spans are char offsets into the
//! document rope, half-open, and always expressed in the coordinate space
//! of the document the engine was queried against.

use ropey::Rope;

use tower_lsp::lsp_types::Url;

/// A half-open span of char offsets into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the cursor at `offset` touches this span. The end is treated
    /// as inclusive here: a cursor sitting directly after the typed word
    /// still belongs to it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Whether two spans share at least one char position.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// How a completion query was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTrigger {
    /// Explicit invocation (e.g. ctrl-space); trigger heuristics are skipped.
    Invoked,
    /// The user typed `char` and the client asked whether to show completions.
    Character(char),
}

/// The provider family a candidate came from.
///
/// Each family needs distinct materialization logic, so this is a closed
/// enum matched exhaustively rather than an open-ended name tag. Which
/// families are always-eager, unimported, or space-worthy is configuration
/// carried by [`super::ProviderPolicy`], supplied by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Ordinary in-scope symbol completion.
    #[default]
    Symbol,
    /// Type names offered after `new`-style object creation contexts.
    ObjectCreation,
    /// Overridable base members; the inserted text is a synthesized stub.
    OverrideMember,
    /// Declared-elsewhere partial method implementations.
    PartialMethod,
    /// Types not yet imported into the file; insertion adds the import.
    TypeImport,
    /// Extension methods whose namespace is not yet imported.
    ExtensionMethodImport,
    /// Assembly names offered inside reference directives.
    AssemblyReference,
    /// Text inside documentation comments; insertion text depends on
    /// escaping rules at the exact insertion context.
    DocCommentText,
    /// Auto-completion of a closing tag. Replaying the recorded change
    /// later would double-insert the tag.
    TagClose,
}

/// Engine-internal classification tags attached to a candidate.
///
/// Tags are ordered; the first one the classifier recognizes decides the
/// protocol-facing kind. Modifier tags carry no kind of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateTag {
    Class,
    Constant,
    Delegate,
    Enum,
    EnumMember,
    Event,
    ExtensionMethod,
    Field,
    File,
    Folder,
    Interface,
    Keyword,
    Label,
    Local,
    Method,
    Module,
    Namespace,
    Operator,
    Parameter,
    Property,
    RangeVariable,
    Snippet,
    Struct,
    TypeParameter,
    // Modifier tags: recognized but never mapped to a kind on their own.
    Public,
    Internal,
    Protected,
    Private,
    Static,
    Sealed,
}

/// How a [`CharacterSetRule`] combines with the characters accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSetRuleKind {
    /// Union the rule's characters into the set.
    Add,
    /// Subtract the rule's characters, preserving the order of the rest.
    Remove,
    /// Discard the accumulated set and start over from the rule's characters.
    Replace,
}

/// One per-candidate modification of the list-level commit character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSetRule {
    pub kind: CharacterSetRuleKind,
    pub characters: Vec<char>,
}

/// A single candidate as produced by the analysis engine.
#[derive(Debug, Clone, Default)]
pub struct RawCandidate {
    pub display_text: String,
    pub display_text_prefix: String,
    pub display_text_suffix: String,
    pub filter_text: String,
    pub sort_text: String,
    /// Cheap insertion text pre-suggested by the engine, if any. Used by the
    /// deferred path so the full change computation can wait until the item
    /// is actually chosen.
    pub insertion_text: Option<String>,
    pub provider: ProviderKind,
    pub tags: Vec<CandidateTag>,
    /// Engine marked this candidate as the preferred default selection.
    pub preselect: bool,
    pub commit_character_rules: Vec<CharacterSetRule>,
    /// Short one-line description shown next to the label, when available.
    pub inline_description: String,
}

impl RawCandidate {
    /// Convenience constructor for the common symbol-shaped candidate where
    /// display, filter, and sort text all coincide.
    pub fn named(text: impl Into<String>, provider: ProviderKind) -> Self {
        let text = text.into();
        RawCandidate {
            display_text: text.clone(),
            filter_text: text.clone(),
            sort_text: text,
            provider,
            ..RawCandidate::default()
        }
    }

    /// The protocol-facing label: prefix + body + suffix.
    pub fn label(&self) -> String {
        if self.display_text_prefix.is_empty() && self.display_text_suffix.is_empty() {
            self.display_text.clone()
        } else {
            format!(
                "{}{}{}",
                self.display_text_prefix, self.display_text, self.display_text_suffix
            )
        }
    }
}

/// An engine-produced completion list. Item order is the engine's ranking
/// tie-break and must be preserved through to the response.
#[derive(Debug, Clone, Default)]
pub struct RawCompletionList {
    pub items: Vec<RawCandidate>,
    /// List-level default commit characters, before per-item rules apply.
    pub default_commit_characters: Vec<char>,
    /// The list designates a suggestion-mode placeholder: typing a space
    /// must not commit the highlighted item.
    pub is_suggestion_mode: bool,
    /// More items (unimported symbols) may become available once the
    /// engine's background index finishes populating.
    pub expanded_items_available: bool,
}

/// A textual replacement in original-document coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub span: Span,
    pub new_text: String,
}

impl TextChange {
    pub fn new(span: Span, new_text: impl Into<String>) -> Self {
        TextChange {
            span,
            new_text: new_text.into(),
        }
    }
}

/// The full textual change the engine computes for inserting a candidate.
#[derive(Debug, Clone)]
pub struct CandidateChange {
    /// All fragments collapsed into one contiguous replacement.
    pub change: TextChange,
    /// The individual fragments, in engine order. Exactly one is expected
    /// to intersect the cursor; the rest are secondary edits.
    pub changes: Vec<TextChange>,
    /// Where the cursor should land after the change is applied, as a char
    /// offset into the *updated* document.
    pub new_position: Option<usize>,
}

impl CandidateChange {
    /// A change consisting of a single fragment.
    pub fn single(change: TextChange) -> Self {
        CandidateChange {
            changes: vec![change.clone()],
            change,
            new_position: None,
        }
    }
}

/// Kinds of text inside a structured symbol description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTag {
    /// The declaration signature, rendered as a code block.
    Signature,
    /// Prose, rendered verbatim.
    Text,
    /// An inline code reference.
    Code,
}

#[derive(Debug, Clone)]
pub struct TaggedText {
    pub tag: TextTag,
    pub text: String,
}

/// Structured documentation for a candidate, rendered lazily at resolve
/// time.
#[derive(Debug, Clone, Default)]
pub struct SymbolDescription {
    pub parts: Vec<TaggedText>,
}

impl SymbolDescription {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Renders the description as markdown for the client.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part.tag {
                TextTag::Signature => {
                    out.push_str("```\n");
                    out.push_str(&part.text);
                    out.push_str("\n```\n\n");
                }
                TextTag::Text => {
                    out.push_str(&part.text);
                    out.push_str("\n\n");
                }
                TextTag::Code => {
                    out.push('`');
                    out.push_str(&part.text);
                    out.push_str("`\n\n");
                }
            }
        }
        out.trim_end().to_string()
    }
}

/// An immutable view of one document handed to the engine for a single
/// query.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub text: Rope,
    pub version: i32,
}
