//! Static lookup tables consumed by the preprocessor and the conversion passes.
//!
//! The tables are plain data owned by a [`Tables`] value and passed into each
//! component, so a caller (or a test) can run the pipeline with a different
//! vocabulary. The defaults cover the Perseus/Scaife corpus; a JSON file can
//! overlay additional or replacement entries:
//!
//! ```json
//! {
//!   "entities": { "&schwa;": "ə" },
//!   "languages": { "ar": "ara" },
//!   "urn_substitutions": [["Aesch. Ag.", "urn:cts:greekLit:tlg0085.tlg005"]]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Custom named entities found in legacy TEI sources, and their literal expansions.
///
/// None of these are predefined XML entities, so the files are not well-formed
/// until they are substituted.
const DEFAULT_ENTITIES: &[(&str, &str)] = &[
    // Latin vowels with macron
    ("&amacr;", "\u{0101}"),
    ("&Amacr;", "\u{0100}"),
    ("&emacr;", "\u{0113}"),
    ("&Emacr;", "\u{0112}"),
    ("&imacr;", "\u{012B}"),
    ("&Imacr;", "\u{012A}"),
    ("&omacr;", "\u{014D}"),
    ("&Omacr;", "\u{014C}"),
    ("&umacr;", "\u{016B}"),
    ("&Umacr;", "\u{016A}"),
    ("&ymacr;", "\u{0233}"),
    ("&Ymacr;", "\u{0232}"),
    // Latin vowels with breve
    ("&abreve;", "\u{0103}"),
    ("&Abreve;", "\u{0102}"),
    ("&ebreve;", "\u{0115}"),
    ("&Ebreve;", "\u{0114}"),
    ("&ibreve;", "\u{012D}"),
    ("&Ibreve;", "\u{012C}"),
    ("&obreve;", "\u{014F}"),
    ("&Obreve;", "\u{014E}"),
    ("&ubreve;", "\u{016D}"),
    ("&Ubreve;", "\u{016C}"),
    ("&ybreve;", "y\u{0306}"),
    ("&Ybreve;", "Y\u{0306}"),
    // Acute
    ("&aacute;", "\u{00E1}"),
    ("&Aacute;", "\u{00C1}"),
    ("&eacute;", "\u{00E9}"),
    ("&Eacute;", "\u{00C9}"),
    ("&iacute;", "\u{00ED}"),
    ("&Iacute;", "\u{00CD}"),
    ("&oacute;", "\u{00F3}"),
    ("&Oacute;", "\u{00D3}"),
    ("&uacute;", "\u{00FA}"),
    ("&Uacute;", "\u{00DA}"),
    ("&yacute;", "\u{00FD}"),
    ("&Yacute;", "\u{00DD}"),
    // Grave
    ("&agrave;", "\u{00E0}"),
    ("&Agrave;", "\u{00C0}"),
    ("&egrave;", "\u{00E8}"),
    ("&Egrave;", "\u{00C8}"),
    ("&igrave;", "\u{00EC}"),
    ("&ograve;", "\u{00F2}"),
    ("&ugrave;", "\u{00F9}"),
    // Circumflex
    ("&acirc;", "\u{00E2}"),
    ("&ecirc;", "\u{00EA}"),
    ("&icirc;", "\u{00EE}"),
    ("&ocirc;", "\u{00F4}"),
    ("&ucirc;", "\u{00FB}"),
    // Diaeresis
    ("&auml;", "\u{00E4}"),
    ("&euml;", "\u{00EB}"),
    ("&Euml;", "\u{00CB}"),
    ("&iuml;", "\u{00EF}"),
    ("&Iuml;", "\u{00CF}"),
    ("&ouml;", "\u{00F6}"),
    ("&uuml;", "\u{00FC}"),
    // Other letters
    ("&ccedil;", "\u{00E7}"),
    ("&Ccedil;", "\u{00C7}"),
    ("&ntilde;", "\u{00F1}"),
    ("&aelig;", "\u{00E6}"),
    ("&AElig;", "\u{00C6}"),
    ("&oelig;", "\u{0153}"),
    ("&OElig;", "\u{0152}"),
    ("&szlig;", "\u{00DF}"),
    // Combining marks
    ("&breve;", "\u{0306}"),
    ("&macr;", "\u{0304}"),
    ("&uml;", "\u{0308}"),
    ("&circ;", "\u{0302}"),
    ("&tilde;", "\u{0303}"),
    ("&caron;", "\u{030C}"),
    ("&dot;", "\u{0307}"),
    ("&udot;", "\u{0323}"),
    // Punctuation
    ("&mdash;", "\u{2014}"),
    ("&ndash;", "\u{2013}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&laquo;", "\u{00AB}"),
    ("&raquo;", "\u{00BB}"),
    ("&hellip;", "\u{2026}"),
    ("&dagger;", "\u{2020}"),
    ("&Dagger;", "\u{2021}"),
    ("&sect;", "\u{00A7}"),
    ("&para;", "\u{00B6}"),
    ("&middot;", "\u{00B7}"),
    ("&nbsp;", "\u{00A0}"),
    ("&thinsp;", "\u{2009}"),
    // Legacy Perseus boilerplate that expands to markup
    (
        "&Perseus.publish;",
        "<publisher>Trustees of Tufts University</publisher><pubPlace>Medford, MA</pubPlace><authority>Perseus Project</authority>",
    ),
];

const DEFAULT_LANGUAGES: &[(&str, &str)] = &[
    ("de", "deu"),
    ("en", "eng"),
    ("fr", "fra"),
    ("gr", "grc"),
    ("greek", "grc"),
    ("it", "ita"),
    ("la", "lat"),
];

const DEFAULT_URN_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Soph. OC", "urn:cts:greekLit:tlg0011.tlg007"),
    ("Soph. OT", "urn:cts:greekLit:tlg0011.tlg004"),
];

/// Immutable lookup tables for one conversion run.
#[derive(Debug, Clone)]
pub struct Tables {
    entities: Vec<(String, String)>,
    languages: BTreeMap<String, String>,
    urn_substitutions: Vec<(String, String)>,
}

/// Shape of a JSON table overlay. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TableOverlay {
    entities: BTreeMap<String, String>,
    languages: BTreeMap<String, String>,
    urn_substitutions: Vec<(String, String)>,
}

impl Tables {
    /// Load the default tables overlaid with the JSON file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Default tables overlaid with JSON read from `reader`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let overlay: TableOverlay = serde_json::from_reader(reader)?;
        let mut tables = Self::default();
        tables.apply(overlay);
        Ok(tables)
    }

    fn apply(&mut self, overlay: TableOverlay) {
        for (token, replacement) in overlay.entities {
            upsert(&mut self.entities, token, replacement);
        }
        self.languages.extend(overlay.languages);
        for (citation, urn) in overlay.urn_substitutions {
            upsert(&mut self.urn_substitutions, citation, urn);
        }
    }

    /// Entity token -> replacement pairs.
    pub fn entities(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Map a language token to its standard 3-letter code.
    ///
    /// Tokens absent from the table pass through unchanged.
    pub fn normalize_lang<'a>(&'a self, code: &'a str) -> &'a str {
        self.languages.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Natural-language citation prefix -> work URN pairs, in priority order.
    pub fn urn_substitutions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.urn_substitutions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            entities: to_owned_pairs(DEFAULT_ENTITIES),
            languages: to_owned_pairs(DEFAULT_LANGUAGES).into_iter().collect(),
            urn_substitutions: to_owned_pairs(DEFAULT_URN_SUBSTITUTIONS),
        }
    }
}

fn to_owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn upsert(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => pairs.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lang() {
        let tables = Tables::default();
        assert_eq!(tables.normalize_lang("gr"), "grc");
        assert_eq!(tables.normalize_lang("greek"), "grc");
        assert_eq!(tables.normalize_lang("la"), "lat");
        assert_eq!(tables.normalize_lang("grc"), "grc");
        assert_eq!(tables.normalize_lang("xx"), "xx");
    }

    #[test]
    fn test_entity_tokens_are_distinct() {
        let tables = Tables::default();
        let tokens: Vec<_> = tables.entities().map(|(k, _)| k).collect();
        let mut sorted = tokens.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), tokens.len());
        assert!(tokens.len() >= 80);
    }

    #[test]
    fn test_no_replacement_reintroduces_a_token() {
        let tables = Tables::default();
        for (_, replacement) in tables.entities() {
            for (token, _) in tables.entities() {
                assert!(!replacement.contains(token));
            }
        }
    }

    #[test]
    fn test_json_overlay() {
        let json = r#"{
            "entities": {"&schwa;": "ə", "&amacr;": "a"},
            "languages": {"ar": "ara"},
            "urn_substitutions": [["Aesch. Ag.", "urn:cts:greekLit:tlg0085.tlg005"]]
        }"#;
        let tables = Tables::from_json_reader(json.as_bytes()).unwrap();

        assert_eq!(tables.normalize_lang("ar"), "ara");
        assert_eq!(tables.normalize_lang("gr"), "grc");
        assert!(tables.entities().any(|(k, v)| k == "&schwa;" && v == "\u{259}"));
        assert!(tables.entities().any(|(k, v)| k == "&amacr;" && v == "a"));
        let urns: Vec<_> = tables.urn_substitutions().map(|(k, _)| k).collect();
        assert_eq!(urns, vec!["Soph. OC", "Soph. OT", "Aesch. Ag."]);
    }

    #[test]
    fn test_json_overlay_rejects_unknown_sections() {
        let json = r#"{"langs": {}}"#;
        assert!(Tables::from_json_reader(json.as_bytes()).is_err());
    }
}
