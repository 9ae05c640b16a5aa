//! Integration tests for the completion flow
//!
//! Drives the coordinator directly with a scripted engine, covering list
//! assembly, the deferred and immediate insertion paths, resolve, and the
//! after-insert follow-up request.

mod common;

use indoc::indoc;
use tower_lsp::lsp_types::{
    CompletionTextEdit, InsertTextFormat, Position, Range, TextDocumentIdentifier,
};

use sable_language_server::config::ServerOptions;
use sable_language_server::engine::{
    CandidateChange, ProviderKind, RawCandidate, RawCompletionList, Span, SymbolDescription,
    TaggedText, TextChange, TextTag,
};
use sable_language_server::lsp::features::completion::CompletionAfterInsertParams;

use common::{all_options, completion_params, setup, triggered_params, MockEngine};

fn list_of(items: Vec<RawCandidate>) -> RawCompletionList {
    RawCompletionList {
        items,
        ..RawCompletionList::default()
    }
}

fn edit_of(item: &tower_lsp::lsp_types::CompletionItem) -> (Range, String) {
    match item.text_edit.as_ref().expect("item should carry a text edit") {
        CompletionTextEdit::Edit(edit) => (edit.range, edit.new_text.clone()),
        other => panic!("expected a plain text edit, got {:?}", other),
    }
}

#[tokio::test]
async fn engine_without_candidates_yields_empty_complete_list() {
    let (coordinator, uri) = setup(MockEngine::new(), "let x = 1;", ServerOptions::default()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 4)))
        .await;

    assert!(list.items.is_empty());
    assert!(!list.is_incomplete);
    assert!(!coordinator.has_cached_list().await, "empty responses are not cached");
}

#[tokio::test]
async fn untracked_document_yields_empty_list() {
    let (coordinator, _uri) = setup(MockEngine::new(), "", ServerOptions::default()).await;
    let other = tower_lsp::lsp_types::Url::parse("file:///elsewhere/Other.sable").unwrap();

    let list = coordinator
        .completion(completion_params(&other, Position::new(0, 0)))
        .await;

    assert!(list.items.is_empty());
}

#[tokio::test]
async fn deferred_items_replace_the_typed_word_with_plain_text() {
    let engine = MockEngine::with_list(list_of(vec![
        RawCandidate::named("Equals", ProviderKind::Symbol),
        RawCandidate {
            insertion_text: Some("Exit()".to_string()),
            ..RawCandidate::named("Exit", ProviderKind::Symbol)
        },
    ]));
    let options = ServerOptions {
        enable_import_completion: false,
        enable_async_completion: true,
    };
    let (coordinator, uri) = setup(engine, "obj.Eq", options).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 6)))
        .await;

    assert_eq!(list.items.len(), 2);
    let equals = &list.items[0];
    assert_eq!(equals.label, "Equals");
    assert_eq!(equals.insert_text_format, None, "deferred items are never snippets");
    assert_eq!(equals.sort_text, None, "sort text equal to the label is omitted");
    assert_eq!(equals.filter_text, None);
    assert_eq!(equals.data, Some(serde_json::json!(0)));
    let (range, new_text) = edit_of(equals);
    assert_eq!(range, Range::new(Position::new(0, 4), Position::new(0, 6)));
    assert_eq!(new_text, "Equals");

    let (_, exit_text) = edit_of(&list.items[1]);
    assert_eq!(exit_text, "Exit()", "pre-suggested insertion text wins over filter text");
}

#[tokio::test]
async fn list_stays_incomplete_until_unimported_items_arrive() {
    let engine = MockEngine::new();
    engine.push_list(RawCompletionList {
        items: vec![RawCandidate::named("guid", ProviderKind::Symbol)],
        expanded_items_available: true,
        ..RawCompletionList::default()
    });
    engine.push_list(RawCompletionList {
        items: vec![
            RawCandidate::named("guid", ProviderKind::Symbol),
            RawCandidate::named("Guid", ProviderKind::TypeImport),
        ],
        expanded_items_available: true,
        ..RawCompletionList::default()
    });
    let (coordinator, uri) = setup(engine, "gu", all_options()).await;

    let first = coordinator
        .completion(completion_params(&uri, Position::new(0, 2)))
        .await;
    assert!(first.is_incomplete, "promised unimported items have not arrived yet");
    assert_eq!(first.items[0].sort_text.as_deref(), Some("0guid"));

    let second = coordinator
        .completion(completion_params(&uri, Position::new(0, 2)))
        .await;
    assert!(!second.is_incomplete);
    assert_eq!(second.items[0].sort_text.as_deref(), Some("0guid"));
    assert_eq!(second.items[1].sort_text.as_deref(), Some("1Guid"));
    assert!(
        second.items[0].sort_text < second.items[1].sort_text,
        "in-scope symbols sort ahead of unimported ones"
    );
}

#[tokio::test]
async fn space_trigger_is_suppressed_without_space_worthy_candidates() {
    let engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "foo",
        ProviderKind::Symbol,
    )]));
    let (coordinator, uri) = setup(engine, "new ", all_options()).await;

    let list = coordinator
        .completion(triggered_params(&uri, Position::new(0, 4), ' '))
        .await;

    assert!(list.items.is_empty());
}

#[tokio::test]
async fn space_trigger_passes_with_override_candidates() {
    let engine = MockEngine::with_list(list_of(vec![
        RawCandidate::named("foo", ProviderKind::Symbol),
        RawCandidate::named("Equals", ProviderKind::OverrideMember),
    ]));
    let (coordinator, uri) = setup(engine, "override ", all_options()).await;

    let list = coordinator
        .completion(triggered_params(&uri, Position::new(0, 9), ' '))
        .await;

    assert_eq!(list.items.len(), 2);
}

#[tokio::test]
async fn declined_trigger_character_yields_empty_list() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "foo",
        ProviderKind::Symbol,
    )]));
    engine.set_trigger_response(false);
    let (coordinator, uri) = setup(engine, "obj.", all_options()).await;

    let list = coordinator
        .completion(triggered_params(&uri, Position::new(0, 4), '.'))
        .await;

    assert!(list.items.is_empty());
}

#[tokio::test]
async fn hidden_project_sentinel_is_dropped_but_indices_stay_stable() {
    let engine = MockEngine::with_list(list_of(vec![
        RawCandidate::named("MiscellaneousFiles", ProviderKind::AssemblyReference),
        RawCandidate::named("MyApp", ProviderKind::AssemblyReference),
    ]));
    let (coordinator, uri) = setup(engine, "#r \"", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 4)))
        .await;

    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].label, "MyApp");
    assert_eq!(
        list.items[0].data,
        Some(serde_json::json!(1)),
        "data must index into the engine's list, not the filtered one"
    );
}

#[tokio::test]
async fn resolve_attaches_markdown_documentation() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Equals",
        ProviderKind::Symbol,
    )]));
    engine.set_description(
        "Equals",
        SymbolDescription {
            parts: vec![
                TaggedText {
                    tag: TextTag::Signature,
                    text: "bool object.Equals(object obj)".to_string(),
                },
                TaggedText {
                    tag: TextTag::Text,
                    text: "Determines whether two instances are equal.".to_string(),
                },
            ],
        },
    );
    let (coordinator, uri) = setup(engine, "obj.Eq", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 6)))
        .await;
    let resolved = coordinator.resolve(list.items[0].clone()).await;

    let documentation = match resolved.documentation {
        Some(tower_lsp::lsp_types::Documentation::MarkupContent(content)) => content,
        other => panic!("expected markdown documentation, got {:?}", other),
    };
    assert!(documentation.value.starts_with("```\nbool object.Equals(object obj)\n```"));
    assert!(documentation.value.contains("Determines whether"));
}

#[tokio::test]
async fn resolve_adds_import_edit_for_unimported_candidates() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Guid",
        ProviderKind::TypeImport,
    )]));
    engine.set_change(
        "Guid",
        CandidateChange {
            change: TextChange::new(Span::new(0, 15), "using System;\nGuid"),
            changes: vec![
                TextChange::new(Span::new(0, 0), "using System;\n"),
                TextChange::new(Span::new(13, 15), "Guid"),
            ],
            new_position: None,
        },
    );
    let (coordinator, uri) = setup(engine, "namespace N;\nGu", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(1, 2)))
        .await;
    let resolved = coordinator.resolve(list.items[0].clone()).await;

    let edits = resolved
        .additional_text_edits
        .expect("unimported resolve should add the import edit");
    assert_eq!(edits.len(), 1, "the fragment under the cursor is not an additional edit");
    assert_eq!(edits[0].range, Range::new(Position::new(0, 0), Position::new(0, 0)));
    assert_eq!(edits[0].new_text, "using System;\n");
}

#[tokio::test]
async fn stale_resolve_returns_the_item_unchanged() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Equals",
        ProviderKind::Symbol,
    )]));
    engine.set_description("Equals", SymbolDescription::default());
    let (coordinator, uri) = setup(engine, "obj.Eq", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 6)))
        .await;

    let mut stale = list.items[0].clone();
    stale.label = "SomethingElse".to_string();
    let resolved = coordinator.resolve(stale.clone()).await;
    assert_eq!(resolved.label, stale.label);
    assert_eq!(resolved.documentation, None);
}

#[tokio::test]
async fn resolve_without_a_cached_list_returns_the_item_unchanged() {
    let (coordinator, _uri) = setup(MockEngine::new(), "", all_options()).await;

    let item = tower_lsp::lsp_types::CompletionItem {
        label: "orphan".to_string(),
        data: Some(serde_json::json!(0)),
        ..Default::default()
    };
    let resolved = coordinator.resolve(item.clone()).await;
    assert_eq!(resolved, item);
}

fn after_insert_params(
    uri: &tower_lsp::lsp_types::Url,
    position: Position,
    inserted: &str,
) -> CompletionAfterInsertParams {
    CompletionAfterInsertParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position,
        item: tower_lsp::lsp_types::CompletionItem {
            label: inserted.to_string(),
            insert_text: Some(inserted.to_string()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn after_insert_is_a_no_op_for_always_eager_providers() {
    let engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "</summary>",
        ProviderKind::TagClose,
    )]));
    let (coordinator, uri) = setup(engine, "/// <summary></summary>", all_options()).await;

    let response = coordinator
        .after_insert(after_insert_params(&uri, Position::new(0, 23), "</summary>"))
        .await;

    assert_eq!(response.change, None);
    assert_eq!(response.line, None);
    assert_eq!(response.column, None);
}

#[tokio::test]
async fn after_insert_is_a_no_op_when_the_change_matches_the_inserted_text() {
    // The mock's fallback change re-inserts the filter text verbatim, so
    // the computed change equals what the client already typed.
    let engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "ToString",
        ProviderKind::OverrideMember,
    )]));
    let (coordinator, uri) = setup(engine, "override ToString", all_options()).await;

    let response = coordinator
        .after_insert(after_insert_params(&uri, Position::new(0, 17), "ToString"))
        .await;

    assert_eq!(response.change, None);
}

#[tokio::test]
async fn after_insert_expands_an_override_stub_and_repositions_the_caret() {
    let stub = "public override bool Equals(object obj)\n    {\n        return base.Equals(obj);\n    }";
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Equals",
        ProviderKind::OverrideMember,
    )]));
    // Replaces "override Equals" and lands the caret after the base call.
    engine.set_change(
        "Equals",
        CandidateChange {
            change: TextChange::new(Span::new(14, 29), stub),
            changes: vec![TextChange::new(Span::new(14, 29), stub)],
            new_position: Some(92),
        },
    );
    let text = indoc! {"
        class C
        {
            override Equals
        }
    "};
    let (coordinator, uri) = setup(engine, text, all_options()).await;

    let response = coordinator
        .after_insert(after_insert_params(&uri, Position::new(2, 19), "Equals"))
        .await;

    let change = response.change.expect("the deferred stub expansion must be returned");
    assert_eq!(change.range, Range::new(Position::new(2, 4), Position::new(2, 19)));
    assert_eq!(change.new_text, stub);
    assert_eq!(response.line, Some(4));
    assert_eq!(response.column, Some(32));
}

#[tokio::test]
async fn immediate_items_become_snippets_when_the_caret_lands_inside() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "foo",
        ProviderKind::Symbol,
    )]));
    engine.set_change(
        "foo",
        CandidateChange {
            change: TextChange::new(Span::new(0, 2), "foo()"),
            changes: vec![TextChange::new(Span::new(0, 2), "foo()")],
            new_position: Some(4),
        },
    );
    let options = ServerOptions {
        enable_import_completion: false,
        enable_async_completion: false,
    };
    let (coordinator, uri) = setup(engine, "fo", options).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 2)))
        .await;

    let item = &list.items[0];
    assert_eq!(item.insert_text_format, Some(InsertTextFormat::SNIPPET));
    let (range, new_text) = edit_of(item);
    assert_eq!(range, Range::new(Position::new(0, 0), Position::new(0, 2)));
    assert_eq!(new_text, "foo($0)");
}

#[tokio::test]
async fn immediate_items_prepend_replaced_source_to_the_filter_text() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Equals",
        ProviderKind::OverrideMember,
    )]));
    engine.set_change(
        "Equals",
        CandidateChange::single(TextChange::new(
            Span::new(4, 15),
            "public override bool Equals(object obj)",
        )),
    );
    let options = ServerOptions {
        enable_import_completion: false,
        enable_async_completion: false,
    };
    let (coordinator, uri) = setup(engine, "    override Eq", options).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 15)))
        .await;

    let item = &list.items[0];
    assert_eq!(
        item.filter_text.as_deref(),
        Some("override Equals"),
        "filtering starts at the edit's start column, not the typed word"
    );
    let (range, _) = edit_of(item);
    assert_eq!(range, Range::new(Position::new(0, 4), Position::new(0, 15)));
}

#[tokio::test]
async fn immediate_items_carry_secondary_edits_separately() {
    let mut engine = MockEngine::with_list(list_of(vec![RawCandidate::named(
        "Guid",
        ProviderKind::Symbol,
    )]));
    engine.set_change(
        "Guid",
        CandidateChange {
            change: TextChange::new(Span::new(0, 15), "using System;\nnamespace N;\nGuid"),
            changes: vec![
                TextChange::new(Span::new(0, 0), "using System;\n"),
                TextChange::new(Span::new(13, 15), "Guid"),
            ],
            new_position: None,
        },
    );
    let options = ServerOptions {
        enable_import_completion: false,
        enable_async_completion: false,
    };
    let (coordinator, uri) = setup(engine, "namespace N;\nGu", options).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(1, 2)))
        .await;

    let item = &list.items[0];
    let (range, new_text) = edit_of(item);
    assert_eq!(range, Range::new(Position::new(1, 0), Position::new(1, 2)));
    assert_eq!(new_text, "Guid");
    let additional = item.additional_text_edits.as_ref().expect("import edit");
    assert_eq!(additional.len(), 1);
    assert_eq!(additional[0].new_text, "using System;\n");
}

#[tokio::test]
async fn suggestion_mode_lists_never_commit_on_space() {
    let engine = MockEngine::with_list(RawCompletionList {
        items: vec![RawCandidate::named("item", ProviderKind::Symbol)],
        default_commit_characters: vec![' ', '.'],
        is_suggestion_mode: true,
        ..RawCompletionList::default()
    });
    let (coordinator, uri) = setup(engine, "x => x.it", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 9)))
        .await;

    assert_eq!(
        list.items[0].commit_characters,
        Some(vec![".".to_string()])
    );
}

#[tokio::test]
async fn typed_prefix_matches_are_preselected() {
    let engine = MockEngine::with_list(list_of(vec![
        RawCandidate::named("Equals", ProviderKind::Symbol),
        RawCandidate::named("Exit", ProviderKind::Symbol),
    ]));
    let (coordinator, uri) = setup(engine, "Eq", all_options()).await;

    let list = coordinator
        .completion(completion_params(&uri, Position::new(0, 2)))
        .await;

    assert_eq!(list.items[0].preselect, Some(true));
    assert_eq!(list.items[1].preselect, None);
}
