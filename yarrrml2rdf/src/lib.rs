//! A YARRRML mapping engine.
//!
//! [YARRRML](http://rml.io/yarrrml/spec/) is a YAML dialect for describing
//! how structured records become RDF triples. This crate compiles a mapping
//! document once into an immutable [`RuleSet`], then evaluates that rule set
//! against JSON records, emitting triples into a caller-owned
//! [`oxrdf::Graph`]:
//!
//! ```
//! let mapping = r#"
//! prefixes:
//!   ex: http://ex.org/
//! mappings:
//!   item:
//!     subject: ex:$(id)
//!     predicateobjects:
//!       - p: a
//!         o:
//!           - ex:Thing
//! "#;
//!
//! let mut graph = oxrdf::Graph::new();
//! yarrrml2rdf::process(mapping, r#"[{"recordid": 7, "fields": {"id": 7}}]"#, &mut graph)?;
//! assert_eq!(graph.len(), 1);
//! # Ok::<(), yarrrml2rdf::Error>(())
//! ```
//!
//! Records are independent of each other; a compiled [`RuleSet`] is read-only
//! and may be shared across threads if a caller wants to parallelize over
//! records.

mod compile;
mod prefixes;
mod template;
mod term;
mod transform;

pub use compile::{RuleSet, compile};
pub use prefixes::{PrefixTable, builtin_prefixes};
pub use transform::{Record, parse_records};

#[derive(derive_more::Error, derive_more::Display, derive_more::From, Debug)]
pub enum Error {
    /// The mapping document could not be parsed. Nothing is compiled.
    #[display("YARRRML mapping syntax error: {_0}")]
    MappingSyntax(serde_yaml::Error),

    /// The record input could not be parsed. Nothing is transformed.
    #[display("record input syntax error: {_0}")]
    RecordSyntax(serde_json::Error),

    /// The record input parsed but exposes no usable record sequence.
    #[display("record input error: {_0}")]
    RecordInput(#[error(not(source))] String),
}

/// Compiles `mapping` and transforms every record in `records` into `sink`.
///
/// Fatal errors (unparsable mapping or record input) abort before anything is
/// written to `sink`. Per-record failures are absorbed: a rule that cannot
/// produce a valid triple for a record is skipped, never fatal.
pub fn process(mapping: &str, records: &str, sink: &mut oxrdf::Graph) -> Result<(), Error> {
    let rules = compile(mapping)?;
    let records = parse_records(records)?;
    rules.transform(&records, sink);
    Ok(())
}
