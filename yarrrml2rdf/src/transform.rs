use itertools::iproduct;
use oxrdf::{Graph, TripleRef};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::Error;
use crate::compile::RuleSet;
use crate::template;
use crate::term;

/// One input record: an identifier plus a field map.
///
/// Extra keys in the input are ignored; a record without fields is usable
/// and simply fails to substitute anything.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    /// Stable identifier, used for diagnostics only.
    #[serde(default)]
    pub recordid: Option<Value>,
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

/// Parses record input: either a JSON array of records, or an object whose
/// `records` key holds that array. Anything else, and an empty sequence, is
/// a fatal input error.
pub fn parse_records(input: &str) -> Result<Vec<Record>, Error> {
    let document: Value = serde_json::from_str(input)?;
    let records = match document {
        Value::Array(_) => document,
        Value::Object(mut object) => object.remove("records").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    let records: Vec<Record> = match records {
        Value::Array(_) => serde_json::from_value(records)?,
        _ => {
            return Err(Error::RecordInput(
                "no record sequence found in input".to_string(),
            ));
        }
    };
    if records.is_empty() {
        return Err(Error::RecordInput("record sequence is empty".to_string()));
    }
    Ok(records)
}

impl RuleSet {
    /// Evaluates every rule against every record, inserting the resulting
    /// triples into `sink`. The sink's set semantics deduplicate triples
    /// derived more than once.
    pub fn transform(&self, records: &[Record], sink: &mut Graph) {
        for record in records {
            self.transform_record(record, sink);
        }
    }

    /// Evaluates every rule against one record. Failures are local: an
    /// unresolvable subject skips its entry, any other invalid term skips
    /// just that candidate triple.
    pub fn transform_record(&self, record: &Record, sink: &mut Graph) {
        if let Some(id) = &record.recordid {
            debug!(record = %id, "transforming record");
        }
        let references = template::reference_map(&record.fields);
        for entry in &self.entries {
            let Some(subject) = term::resolve_iri(&entry.subject, &references) else {
                debug!(entry = %entry.name, "subject did not resolve, skipping entry");
                continue;
            };
            for rule in &entry.rules {
                for (predicate, object) in iproduct!(&rule.predicates, &rule.objects) {
                    let Some(predicate) = term::resolve_iri(predicate, &references) else {
                        continue;
                    };
                    let Some(object) = term::resolve_object(object, &references) else {
                        continue;
                    };
                    sink.insert(TripleRef::new(
                        subject.as_ref(),
                        predicate.as_ref(),
                        object.as_ref(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_and_records_key_forms_parse() {
        let records = parse_records(r#"[{"recordid": 1, "fields": {"id": 1}}]"#).unwrap();
        assert_eq!(records.len(), 1);

        let records =
            parse_records(r#"{"records": [{"fields": {"id": 1}}, {"fields": {}}]}"#).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].recordid.is_none());
    }

    #[rstest::rstest]
    #[case("[]")]
    #[case("{}")]
    #[case(r#"{"records": null}"#)]
    #[case("42")]
    fn unusable_record_input_is_fatal(#[case] input: &str) {
        assert!(matches!(parse_records(input), Err(Error::RecordInput(_))));
    }

    #[test]
    fn unparsable_record_input_is_fatal() {
        assert!(matches!(
            parse_records("{not json"),
            Err(Error::RecordSyntax(_))
        ));
    }
}
