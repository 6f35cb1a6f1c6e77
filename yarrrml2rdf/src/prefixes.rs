use std::collections::BTreeMap;
use std::sync::OnceLock;

/// The well-known prefixes every compile starts from.
///
/// User declarations never override these.
pub fn builtin_prefixes() -> &'static BTreeMap<String, String> {
    static BUILTINS: OnceLock<BTreeMap<String, String>> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        [
            ("rdf:", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("rdfs:", "http://www.w3.org/2000/01/rdf-schema#"),
            ("owl:", "http://www.w3.org/2002/07/owl#"),
            ("xsd:", "http://www.w3.org/2001/XMLSchema#"),
        ]
        .into_iter()
        .map(|(prefix, namespace)| (prefix.to_string(), namespace.to_string()))
        .collect()
    })
}

/// Short-prefix to namespace-IRI bindings, resolved once at compile time.
///
/// Each table is a fresh copy of the built-in set; it never aliases shared
/// mutable state, so one compilation cannot leak declarations into another.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    map: BTreeMap<String, String>,
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self {
            map: builtin_prefixes().clone(),
        }
    }
}

impl PrefixTable {
    /// Registers a declared prefix. First registration wins.
    pub(crate) fn insert(&mut self, prefix: &str, namespace: &str) {
        let key = if prefix.ends_with(':') {
            prefix.to_string()
        } else {
            format!("{prefix}:")
        };
        self.map
            .entry(key)
            .or_insert_with(|| namespace.to_string());
    }

    /// Rewrites a `prefix:rest` token to `namespace ++ rest`.
    ///
    /// Unknown prefixes (including IRI schemes like `http:`) pass through
    /// untouched; the IRI-validity gates downstream reject anything that was
    /// genuinely malformed.
    pub fn expand(&self, token: &str) -> String {
        let Some((prefix, rest)) = token.split_once(':') else {
            return token.to_string();
        };
        match self.map.get(&format!("{prefix}:")) {
            Some(namespace) => format!("{namespace}{rest}"),
            None => token.to_string(),
        }
    }

    /// The resolved bindings, e.g. for registering with a serializer.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.map
            .iter()
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn expands_declared_prefix() {
        let mut table = PrefixTable::default();
        table.insert("ex", "http://ex.org/");
        assert_eq!(table.expand("ex:thing"), "http://ex.org/thing");
    }

    #[test]
    fn builtins_win_over_declarations() {
        let mut table = PrefixTable::default();
        table.insert("rdf", "http://wrong.invalid/");
        assert_eq!(
            table.expand("rdf:type"),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#type"
        );
    }

    #[test]
    fn unknown_prefixes_pass_through() {
        let table = PrefixTable::default();
        assert_eq!(table.expand("nope:thing"), "nope:thing");
        assert_eq!(table.expand("http://ex.org/x"), "http://ex.org/x");
        assert_eq!(table.expand("plain"), "plain");
    }
}
