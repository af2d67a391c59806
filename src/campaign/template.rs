//! `{{Placeholder}}` substitution against a row.
//!
//! Lookup tries the exact column name first, then a case-insensitive match on
//! trimmed names. Tokens that resolve to nothing render as the empty string so
//! a renamed column degrades the message instead of failing the send.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::table::Row;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").expect("token regex is valid"));

/// Render `template` against `row` in a single pass.
///
/// Substituted values are never re-scanned, so a cell containing `{{x}}` is
/// inserted literally.
pub fn render(template: &str, row: &Row) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(row, caps[1].trim()).unwrap_or("").to_string()
        })
        .into_owned()
}

/// Placeholder keys referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    TOKEN
        .captures_iter(template)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

fn lookup<'r>(row: &'r Row, key: &str) -> Option<&'r str> {
    if let Some(value) = row.get(key) {
        return Some(value);
    }
    let wanted = key.trim().to_lowercase();
    row.iter()
        .find(|(column, _)| column.trim().to_lowercase() == wanted)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_exact_key() {
        let row = Row::from_pairs([("Name", "Ana")]);
        assert_eq!(render("Hello {{Name}}!", &row), "Hello Ana!");
    }

    #[test]
    fn trims_whitespace_inside_braces() {
        let row = Row::from_pairs([("Name", "Ana")]);
        assert_eq!(render("Hello {{   Name  }}", &row), "Hello Ana");
    }

    #[test]
    fn falls_back_to_case_insensitive_match() {
        let row = Row::from_pairs([("First Name", "Ana")]);
        assert_eq!(render("Hi {{first name}}", &row), "Hi Ana");
    }

    #[test]
    fn exact_match_wins_over_case_insensitive() {
        let row = Row::from_pairs([("name", "lower"), ("Name", "Upper")]);
        assert_eq!(render("{{Name}}/{{name}}", &row), "Upper/lower");
    }

    #[test]
    fn unresolved_token_renders_empty() {
        let row = Row::from_pairs([("Other", "x")]);
        assert_eq!(render("{{Missing}}", &row), "");
        assert_eq!(render("a {{Missing}} b", &row), "a  b");
    }

    #[test]
    fn template_without_tokens_is_unchanged() {
        let row = Row::from_pairs([("Name", "Ana")]);
        let text = "No placeholders { here } or {single}";
        assert_eq!(render(text, &row), text);
    }

    #[test]
    fn rendering_is_idempotent() {
        let row = Row::from_pairs([("Name", "Ana"), ("Company", "Acme")]);
        let template = "{{Name}} at {{ company }}";
        let once = render(template, &row);
        assert_eq!(once, render(template, &row));
        assert_eq!(render(&once, &row), once);
    }

    #[test]
    fn values_are_not_expanded_recursively() {
        let row = Row::from_pairs([("A", "{{B}}"), ("B", "nope")]);
        assert_eq!(render("{{A}}", &row), "{{B}}");
    }

    #[test]
    fn dollar_signs_in_values_are_literal() {
        let row = Row::from_pairs([("Price", "$1 and $2")]);
        assert_eq!(render("Cost: {{Price}}", &row), "Cost: $1 and $2");
    }

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(
            placeholders("{{ Name }} from {{Company}} ({{Name}})"),
            vec!["Name", "Company", "Name"]
        );
    }
}
