use serde_json::{Map, Value};
use tracing::debug;

use crate::table::Cell;

/// Parsed contents of one priority cell: category key → initiatives.
///
/// Parsing is total. Anything that is not a JSON object (bad syntax,
/// numbers, nulls, arrays) becomes an empty document, so lookups simply
/// miss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityDocument {
    categories: Map<String, Value>,
}

impl PriorityDocument {
    pub fn parse(cell: &Cell) -> Self {
        let Some(raw) = cell.as_str() else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(categories)) => PriorityDocument { categories },
            Ok(other) => {
                debug!(kind = json_kind(&other), "priority cell is not an object");
                Self::default()
            }
            Err(e) => {
                debug!(error = %e, "priority cell is not valid JSON");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Initiatives listed under `key`, in document order.
    ///
    /// A category whose value is not a list, and list entries that are not
    /// objects, contribute nothing.
    pub fn initiatives<'a>(&'a self, key: &str) -> impl Iterator<Item = Initiative<'a>> + 'a {
        self.categories
            .get(key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|fields| Initiative { fields })
    }
}

/// One strategic item under a category. Only `priority` and `description`
/// are read; everything else is ignored.
#[derive(Debug, Clone, Copy)]
pub struct Initiative<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Initiative<'a> {
    pub fn name(&self) -> String {
        self.fields.get("priority").map(value_text).unwrap_or_default()
    }

    pub fn description(&self) -> Option<&'a Value> {
        self.fields.get("description")
    }
}

/// Text form of a scalar JSON value: strings verbatim, null as empty,
/// anything else as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
