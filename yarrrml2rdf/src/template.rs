use std::collections::HashMap;
use std::sync::OnceLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde_json::{Map, Value};

/// Per-record map from `$(name)` reference text to the field's raw value.
pub(crate) type ReferenceMap<'a> = HashMap<String, &'a Value>;

/// Namespace under which nested file objects get a default IRI.
const FILE_NAMESPACE: &str = "http://example.org/";

/// Escape set for values embedded inside a larger template: everything but
/// ASCII alphanumerics, the unreserved marks and `/`.
const TEMPLATE_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Matches one `$(...)` reference, non-greedily.
fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\(.*?\)").expect("valid regex"))
}

/// Outcome of resolving a template against one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    /// The template contains no references and is passed through verbatim,
    /// without any encoding or decoding.
    Constant(String),
    /// At least one reference was substituted.
    Substituted(String),
    /// Every reference was missing or empty; the containing term (and any
    /// triple depending on it) must be dropped.
    Absent,
}

pub(crate) fn reference_map(fields: &Map<String, Value>) -> ReferenceMap<'_> {
    fields
        .iter()
        .map(|(name, value)| (format!("$({name})"), value))
        .collect()
}

/// Substitutes record values into `template`.
///
/// A reference whose value is missing or empty stays in the output as literal
/// `$(...)` text; only a template where nothing at all substituted resolves
/// to [`Resolved::Absent`]. A template that is exactly one reference takes
/// the value verbatim, so field values that already are well-formed IRIs
/// survive unmangled; anywhere else the value is percent-encoded before being
/// spliced in.
pub(crate) fn resolve(template: &str, references: &ReferenceMap) -> Resolved {
    let matches: Vec<&str> = reference_pattern()
        .find_iter(template)
        .map(|m| m.as_str())
        .collect();
    if matches.is_empty() {
        return Resolved::Constant(template.to_string());
    }

    let lone_reference = matches.len() == 1 && matches[0] == template;
    let mut substituted = template.to_string();
    let mut replaced_any = false;
    for reference in &matches {
        let Some(value) = references.get(*reference) else {
            continue;
        };
        if is_empty_value(value) {
            continue;
        }
        let replacement = match value {
            // A nested file object stands in for its default IRI, spliced in
            // verbatim so the IRI stays intact.
            Value::Object(file) => match file.get("filename").and_then(Value::as_str) {
                Some(filename) => format!("{FILE_NAMESPACE}{filename}"),
                None => continue,
            },
            value if lone_reference => value_text(value),
            value => encode(&value_text(value)),
        };
        substituted = substituted.replace(reference, &replacement);
        replaced_any = true;
    }

    if replaced_any {
        Resolved::Substituted(substituted)
    } else {
        Resolved::Absent
    }
}

pub(crate) fn percent_decode(text: &str) -> String {
    percent_encoding::percent_decode_str(text)
        .decode_utf8_lossy()
        .into_owned()
}

fn encode(text: &str) -> String {
    utf8_percent_encode(text, TEMPLATE_ESCAPES).to_string()
}

/// Scalars keep their JSON text; sequences stringify to compact JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}
