//! Commit character resolution
//!
//! A commit character finalizes the highlighted candidate when typed. The
//! final per-item set starts from the list-level defaults and folds in the
//! candidate's modification rules in order. Suggestion-mode lists model
//! "do not commit on space" contexts (e.g. a half-typed lambda parameter),
//! so space is stripped unconditionally there.

use crate::engine::{CharacterSetRule, CharacterSetRuleKind};

/// Computes the final commit character set for one item. Returns `None`
/// when the set comes out empty so the field is omitted from the response.
pub fn resolve_commit_characters(
    defaults: &[char],
    rules: &[CharacterSetRule],
    suggestion_mode: bool,
) -> Option<Vec<String>> {
    let mut characters: Vec<char> = defaults.to_vec();
    for rule in rules {
        match rule.kind {
            CharacterSetRuleKind::Add => {
                for &c in &rule.characters {
                    if !characters.contains(&c) {
                        characters.push(c);
                    }
                }
            }
            CharacterSetRuleKind::Remove => {
                characters.retain(|c| !rule.characters.contains(c));
            }
            CharacterSetRuleKind::Replace => {
                characters.clear();
                characters.extend(rule.characters.iter().copied());
            }
        }
    }
    if suggestion_mode {
        characters.retain(|&c| c != ' ');
    }
    if characters.is_empty() {
        None
    } else {
        Some(characters.iter().map(|c| c.to_string()).collect())
    }
}
