use std::collections::HashMap;

use oxrdf::NamedNode;
use oxrdf::vocab::rdf;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::Error;
use crate::prefixes::PrefixTable;
use crate::term;

// Recognized key aliases, most explicit first.
const MAPPINGS_KEYS: &[&str] = &["mappings", "mapping"];
const PREDICATE_OBJECTS_KEYS: &[&str] = &["predicateobjects", "predicateobject", "po"];
const PREDICATES_KEYS: &[&str] = &["predicates", "predicate", "p"];
const OBJECTS_KEYS: &[&str] = &["objects", "object", "o"];
const VALUE_KEYS: &[&str] = &["value", "v", "mappings", "mapping"];

/// The compiled, immutable form of a mapping document: the resolved prefix
/// table plus every mapping entry that survived compilation.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) entries: Vec<MappingEntry>,
    prefixes: PrefixTable,
}

impl RuleSet {
    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// True when no entry compiled to at least one rule.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MappingEntry {
    pub(crate) name: String,
    /// Prefix-expanded subject IRI template, resolved per record.
    pub(crate) subject: String,
    pub(crate) rules: Vec<PredicateObjectRule>,
}

/// One rule: every predicate combines with every object.
#[derive(Debug, Clone)]
pub(crate) struct PredicateObjectRule {
    pub(crate) predicates: Vec<String>,
    pub(crate) objects: Vec<ObjectSpec>,
}

#[derive(Debug, Clone)]
pub(crate) enum ObjectSpec {
    /// IRI-shaped value template (constant or containing references).
    Iri(String),
    /// Back-reference to another entry: carries that entry's subject
    /// template. Which template is used never depends on the record; the
    /// template itself still resolves per record.
    Reference(String),
    Literal {
        value: String,
        language: Option<String>,
        datatype: Option<NamedNode>,
    },
}

/// Compiles a YARRRML document into a [`RuleSet`].
///
/// An unparsable document is fatal. A sparse one is not: entries without a
/// subject and rule groups without predicates or objects compile to nothing
/// and are dropped silently.
pub fn compile(document: &str) -> Result<RuleSet, Error> {
    let root: Value = serde_yaml::from_str(document)?;
    let mut prefixes = PrefixTable::default();
    let Value::Mapping(root) = root else {
        return Ok(RuleSet {
            entries: Vec::new(),
            prefixes,
        });
    };

    if let Some(Value::Mapping(declared)) = get_first(&root, &["prefixes"]) {
        for (prefix, namespace) in declared {
            if let (Some(prefix), Some(namespace)) = (prefix.as_str(), namespace.as_str()) {
                prefixes.insert(prefix, namespace);
            }
        }
    }

    let Some(Value::Mapping(mappings)) = get_first(&root, MAPPINGS_KEYS) else {
        return Ok(RuleSet {
            entries: Vec::new(),
            prefixes,
        });
    };

    // First pass: register the subject template of every entry that declares
    // one, so rules can back-reference entries defined later.
    let mut resources: HashMap<String, String> = HashMap::new();
    for (name, body) in mappings {
        let (Some(name), Value::Mapping(body)) = (name.as_str(), body) else {
            continue;
        };
        if let Some(subject) = get_first(body, &["subject"]).and_then(scalar_text) {
            resources
                .entry(name.to_string())
                .or_insert_with(|| iri_template(&subject, &prefixes));
        }
    }

    let mut entries = Vec::new();
    for (name, body) in mappings {
        let (Some(name), Value::Mapping(body)) = (name.as_str(), body) else {
            continue;
        };
        let Some(subject) = resources.get(name) else {
            debug!(entry = name, "entry declares no subject, skipping");
            continue;
        };
        let mut rules = Vec::new();
        if let Some(Value::Sequence(groups)) = get_first(body, PREDICATE_OBJECTS_KEYS) {
            rules.extend(
                groups
                    .iter()
                    .filter_map(|group| compile_rule(group, &prefixes, &resources)),
            );
        }
        if rules.is_empty() {
            continue;
        }
        entries.push(MappingEntry {
            name: name.to_string(),
            subject: subject.clone(),
            rules,
        });
    }

    Ok(RuleSet { entries, prefixes })
}

fn compile_rule(
    group: &Value,
    prefixes: &PrefixTable,
    resources: &HashMap<String, String>,
) -> Option<PredicateObjectRule> {
    let (predicates, objects) = uniformize(group)?;
    let predicates: Vec<String> = predicates
        .iter()
        .map(|predicate| iri_template(predicate, prefixes))
        .collect();
    let objects: Vec<ObjectSpec> = objects
        .iter()
        .filter_map(|spec| compile_object(spec, prefixes, resources))
        .collect();
    if predicates.is_empty() || objects.is_empty() {
        return None;
    }
    Some(PredicateObjectRule {
        predicates,
        objects,
    })
}

/// Reduces the DSL's equivalent rule-group shapes to one canonical form:
/// a predicate list and a list of `[value, ?lang-marker, ?datatype]` specs.
fn uniformize(group: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    match group {
        // Sequence shorthand: `[predicate(s), object(s)...]`.
        Value::Sequence(parts) if parts.len() > 1 => {
            let predicates = match &parts[0] {
                Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
                scalar => scalar_text(scalar).into_iter().collect(),
            };
            let objects = match &parts[1] {
                Value::Sequence(items) => match items.first() {
                    // `[..., [[value, ...], [value, ...]]]`: a list of specs.
                    Some(Value::Sequence(_)) => items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Sequence(spec) => {
                                Some(spec.iter().filter_map(scalar_text).collect())
                            }
                            _ => None,
                        })
                        .collect(),
                    // `[..., [value, ?lang, ?datatype]]`: a single spec.
                    Some(_) => vec![items.iter().filter_map(scalar_text).collect()],
                    None => Vec::new(),
                },
                // `[predicate, value, ?lang, ?datatype]`: flat form.
                _ => vec![parts[1..].iter().filter_map(scalar_text).collect()],
            };
            Some((predicates, objects))
        }
        Value::Sequence(_) => None,
        // Key-based form.
        Value::Mapping(map) => {
            let predicates = match get_first(map, PREDICATES_KEYS)? {
                Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
                scalar => scalar_text(scalar).into_iter().collect(),
            };
            let objects = match get_first(map, OBJECTS_KEYS)? {
                Value::Sequence(items) => {
                    let mut spec = Vec::new();
                    for item in items {
                        match item {
                            // A key-based object contributes its value plus
                            // marker tokens, same shape as the flat form.
                            Value::Mapping(object) => {
                                let Some(value) =
                                    get_first(object, VALUE_KEYS).and_then(scalar_text)
                                else {
                                    continue;
                                };
                                spec.push(value);
                                if let Some(language) =
                                    get_first(object, &["language"]).and_then(scalar_text)
                                {
                                    spec.push(format!("{language}~lang"));
                                }
                                if let Some(datatype) =
                                    get_first(object, &["datatype"]).and_then(scalar_text)
                                {
                                    spec.push(datatype);
                                }
                            }
                            scalar => spec.extend(scalar_text(scalar)),
                        }
                    }
                    vec![spec]
                }
                scalar => scalar_text(scalar).map(|value| vec![vec![value]])?,
            };
            Some((predicates, objects))
        }
        _ => None,
    }
}

/// Classifies one object spec: IRI, back-reference, or literal, in that
/// order. Classification looks at the prefix-expanded value; a literal keeps
/// the raw value template.
fn compile_object(
    parts: &[String],
    prefixes: &PrefixTable,
    resources: &HashMap<String, String>,
) -> Option<ObjectSpec> {
    let value = parts.first()?;
    let expanded = iri_template(value, prefixes);
    if term::is_iri_text(&expanded) {
        return Some(ObjectSpec::Iri(expanded));
    }
    if let Some(subject) = resources.get(value) {
        return Some(ObjectSpec::Reference(subject.clone()));
    }
    let mut language = None;
    let mut datatype = None;
    for tag in &parts[1..] {
        if tag.contains("~lang") {
            language = Some(tag.replace("~lang", ""));
        } else {
            // a trailing token that is not a language marker is a datatype,
            // kept only when it resolves to a valid IRI
            datatype = term::build_iri(iri_template(tag, prefixes)).or(datatype);
        }
    }
    Some(ObjectSpec::Literal {
        value: value.clone(),
        language,
        datatype,
    })
}

/// `a` is the fixed type-predicate shorthand; everything else goes through
/// the prefix table.
fn iri_template(token: &str, prefixes: &PrefixTable) -> String {
    if token == "a" {
        rdf::TYPE.as_str().to_string()
    } else {
        prefixes.expand(token)
    }
}

/// First value among `keys` present in `map`.
fn get_first<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        map.iter()
            .find(|(candidate, _)| candidate.as_str() == Some(*key))
            .map(|(_, value)| value)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unparsable_document_is_fatal() {
        assert!(matches!(
            compile("mappings: [a, b"),
            Err(Error::MappingSyntax(_))
        ));
    }

    #[test]
    fn subjectless_entries_compile_to_nothing() {
        let rules = compile(
            r#"
mappings:
  broken:
    predicateobjects:
      - [a, "http://ex.org/Thing"]
"#,
        )
        .unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn groups_without_objects_are_dropped() {
        let rules = compile(
            r#"
mappings:
  item:
    subject: http://ex.org/$(id)
    predicateobjects:
      - p: a
"#,
        )
        .unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn type_shorthand_bypasses_the_prefix_table() {
        let rules = compile(
            r#"
prefixes:
  a: http://hijack.invalid/
mappings:
  item:
    subject: http://ex.org/$(id)
    predicateobjects:
      - [a, "http://ex.org/Thing"]
"#,
        )
        .unwrap();
        assert_eq!(
            rules.entries[0].rules[0].predicates,
            vec!["http://www.w3.org/1999/02/22-rdf-syntax-ns#type".to_string()]
        );
    }

    #[test]
    fn object_values_are_classified_after_expansion() {
        let rules = compile(
            r#"
prefixes:
  ex: http://ex.org/
mappings:
  item:
    subject: ex:$(id)
    predicateobjects:
      - p: ex:kind
        o:
          - ex:Thing
"#,
        )
        .unwrap();
        let object = &rules.entries[0].rules[0].objects[0];
        assert!(matches!(
            object,
            ObjectSpec::Iri(iri) if iri == "http://ex.org/Thing"
        ));
    }

    #[test]
    fn back_references_use_the_target_subject_template() {
        let rules = compile(
            r#"
mappings:
  person:
    subject: http://ex.org/person/$(id)
    predicateobjects:
      - p: http://ex.org/knows
        o:
          - friend
  friend:
    subject: http://ex.org/friend/$(fid)
"#,
        )
        .unwrap();
        // `friend` has no rules of its own and is dropped from the entries,
        // but stays referenceable
        assert_eq!(rules.entries.len(), 1);
        let object = &rules.entries[0].rules[0].objects[0];
        assert!(matches!(
            object,
            ObjectSpec::Reference(subject) if subject == "http://ex.org/friend/$(fid)"
        ));
    }

    #[test]
    fn language_markers_and_datatypes_are_extracted() {
        let rules = compile(
            r#"
mappings:
  item:
    subject: http://ex.org/$(id)
    predicateobjects:
      - p: http://ex.org/name
        o:
          - value: $(name)
            language: en
            datatype: xsd:string
"#,
        )
        .unwrap();
        let object = &rules.entries[0].rules[0].objects[0];
        let ObjectSpec::Literal {
            value,
            language,
            datatype,
        } = object
        else {
            panic!("expected a literal spec");
        };
        assert_eq!(value, "$(name)");
        assert_eq!(language.as_deref(), Some("en"));
        assert_eq!(
            datatype.as_ref().map(|dt| dt.as_str()),
            Some("http://www.w3.org/2001/XMLSchema#string")
        );
    }
}
