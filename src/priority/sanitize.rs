use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::document::value_text;

static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.,]").unwrap());

/// Collapse a description (string or list of strings) into one line.
///
/// List entries are joined with a single space. Every `.` and `,` is then
/// removed, wherever it appears, and the result trimmed. Decimal points and
/// abbreviations are lost too; consumers of the exported sheets rely on
/// this exact form.
pub fn sanitize(value: &Value) -> String {
    let joined = match value {
        Value::Array(items) => items.iter().map(list_item_text).collect::<Vec<_>>().join(" "),
        other => value_text(other),
    };
    clean_text(&joined)
}

/// List entries keep the spelling downstream sheets already carry for
/// absent and boolean values.
fn list_item_text(item: &Value) -> String {
    match item {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => value_text(other),
    }
}

pub fn clean_text(text: &str) -> String {
    STRIP_RE.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_commas_and_periods() {
        assert_eq!(sanitize(&json!("Hello, World.")), "Hello World");
    }

    #[test]
    fn joins_lists_before_stripping() {
        assert_eq!(sanitize(&json!(["a.", "b"])), "a b");
        assert_eq!(sanitize(&json!(["a.", "b,c"])), "a bc");
    }

    #[test]
    fn strips_inside_numbers_and_abbreviations() {
        assert_eq!(sanitize(&json!("Revenue 1,234.5 by U.S. teams")), "Revenue 12345 by US teams");
    }

    #[test]
    fn leaves_other_punctuation() {
        assert_eq!(sanitize(&json!("  R&D: grow (fast)!  ")), "R&D: grow (fast)!");
    }

    #[test]
    fn non_string_values_render_as_text() {
        assert_eq!(sanitize(&json!(null)), "");
        assert_eq!(sanitize(&json!([1, "x", null])), "1 x None");
        assert_eq!(sanitize(&json!(2.5)), "25");
    }

    #[test]
    fn list_nulls_and_booleans_keep_their_names() {
        assert_eq!(sanitize(&json!([true, false, null, 1.5])), "True False None 15");
        assert_eq!(sanitize(&json!(["Hire.", null, "Train,"])), "Hire None Train");
    }
}
