use std::sync::OnceLock;

use oxiri::Iri;
use oxrdf::{Literal, NamedNode, Term};
use regex::Regex;
use tracing::debug;

use crate::compile::ObjectSpec;
use crate::template::{self, ReferenceMap, Resolved};

/// Broad syntactic shape of an acceptable IRI: http/ftp scheme, a domain,
/// `localhost` or a dotted quad, optional port and path.
fn iri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^(?:http|ftp)s?://",
            r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)",
            r"|localhost",
            r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
            r"(?::\d+)?",
            r"(?:/?|[/?]\S+)$",
        ))
        .expect("valid regex")
    })
}

/// The broad gate alone. Compile-time object classification uses this to
/// decide whether a value template is IRI-shaped at all.
pub(crate) fn is_iri_text(text: &str) -> bool {
    iri_pattern().is_match(text)
}

/// Both gates: the broad shape check plus the strict IRI grammar parse. Each
/// rejects strings the other accepts, and both are load-bearing for which
/// terms get dropped.
pub(crate) fn build_iri(text: String) -> Option<NamedNode> {
    if is_iri_text(&text) && Iri::parse(text.as_str()).is_ok() {
        Some(NamedNode::new_unchecked(text))
    } else {
        debug!(iri = %text, "not a valid IRI, dropping term");
        None
    }
}

/// Resolves an IRI-position template (subject, predicate, resource reference
/// or constant object) against one record.
pub(crate) fn resolve_iri(template: &str, references: &ReferenceMap) -> Option<NamedNode> {
    match template::resolve(template, references) {
        Resolved::Absent => None,
        Resolved::Constant(text) | Resolved::Substituted(text) => build_iri(text),
    }
}

pub(crate) fn resolve_object(spec: &ObjectSpec, references: &ReferenceMap) -> Option<Term> {
    match spec {
        ObjectSpec::Iri(template) | ObjectSpec::Reference(template) => {
            resolve_iri(template, references).map(Term::from)
        }
        ObjectSpec::Literal {
            value,
            language,
            datatype,
        } => resolve_literal(value, language.as_deref(), datatype.as_ref(), references)
            .map(Term::from),
    }
}

fn resolve_literal(
    template: &str,
    language: Option<&str>,
    datatype: Option<&NamedNode>,
    references: &ReferenceMap,
) -> Option<Literal> {
    let text = match template::resolve(template, references) {
        Resolved::Absent => return None,
        Resolved::Constant(text) => text,
        Resolved::Substituted(text) => template::percent_decode(&text),
    };
    // Language and datatype are mutually exclusive on a literal; language
    // takes precedence when a spec carries both.
    if let Some(language) = language {
        Literal::new_language_tagged_literal(text, language)
            .inspect_err(|error| debug!(%language, %error, "invalid language tag, dropping term"))
            .ok()
    } else if let Some(datatype) = datatype {
        Some(Literal::new_typed_literal(text, datatype.clone()))
    } else {
        Some(Literal::new_simple_literal(text))
    }
}
