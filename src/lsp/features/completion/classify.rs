//! Mapping from engine classification tags to protocol item kinds

use std::collections::HashMap;

use once_cell::sync::Lazy;

use tower_lsp::lsp_types::CompletionItemKind;

use crate::engine::CandidateTag;

/// Fixed lookup table from recognized tags to protocol kinds. Modifier
/// tags (visibility, `static`, `sealed`) are deliberately absent: they
/// never decide an item's kind.
static KIND_TABLE: Lazy<HashMap<CandidateTag, CompletionItemKind>> = Lazy::new(|| {
    HashMap::from([
        (CandidateTag::Class, CompletionItemKind::CLASS),
        (CandidateTag::Constant, CompletionItemKind::CONSTANT),
        (CandidateTag::Delegate, CompletionItemKind::CLASS),
        (CandidateTag::Enum, CompletionItemKind::ENUM),
        (CandidateTag::EnumMember, CompletionItemKind::ENUM_MEMBER),
        (CandidateTag::Event, CompletionItemKind::EVENT),
        (CandidateTag::ExtensionMethod, CompletionItemKind::METHOD),
        (CandidateTag::Field, CompletionItemKind::FIELD),
        (CandidateTag::File, CompletionItemKind::FILE),
        (CandidateTag::Folder, CompletionItemKind::FOLDER),
        (CandidateTag::Interface, CompletionItemKind::INTERFACE),
        (CandidateTag::Keyword, CompletionItemKind::KEYWORD),
        (CandidateTag::Label, CompletionItemKind::TEXT),
        (CandidateTag::Local, CompletionItemKind::VARIABLE),
        (CandidateTag::Method, CompletionItemKind::METHOD),
        (CandidateTag::Module, CompletionItemKind::MODULE),
        (CandidateTag::Namespace, CompletionItemKind::MODULE),
        (CandidateTag::Operator, CompletionItemKind::OPERATOR),
        (CandidateTag::Parameter, CompletionItemKind::VARIABLE),
        (CandidateTag::Property, CompletionItemKind::PROPERTY),
        (CandidateTag::RangeVariable, CompletionItemKind::VARIABLE),
        (CandidateTag::Snippet, CompletionItemKind::SNIPPET),
        (CandidateTag::Struct, CompletionItemKind::STRUCT),
        (CandidateTag::TypeParameter, CompletionItemKind::TYPE_PARAMETER),
    ])
});

/// Returns the protocol kind for a candidate's tag list: the first
/// recognized tag wins. Total and deterministic; unrecognized tag lists
/// fall back to [`CompletionItemKind::TEXT`].
pub fn classify(tags: &[CandidateTag]) -> CompletionItemKind {
    tags.iter()
        .find_map(|tag| KIND_TABLE.get(tag).copied())
        .unwrap_or(CompletionItemKind::TEXT)
}
