//! Passes 1, 2 and 14: citation scheme, document language/URN, bibl refs.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{GREEK, has_attr};
use crate::tables::Tables;
use crate::tree::{Document, NodeId, QName};

/// Collect the `n` of every `cRefPattern` under `refsDecl[@n='CTS']`.
///
/// Returns `None` when the document has no such declaration.
pub fn refable_units(doc: &Document) -> Option<BTreeSet<String>> {
    let refs_decl = doc
        .find_all(|d, id| d.is_tei(id, "refsDecl") && has_attr(d, id, "n", "CTS"))
        .into_iter()
        .next()?;

    let units: BTreeSet<String> = doc
        .descendants(refs_decl)
        .filter(|&id| doc.is_tei(id, "cRefPattern"))
        .filter_map(|id| doc.get_attr(id, "n"))
        .map(str::to_string)
        .collect();
    debug!(?units, "referenceable units");
    Some(units)
}

/// `langUsage/language` elements in document order.
fn declared_languages(doc: &Document) -> Vec<NodeId> {
    doc.find_all(|d, id| d.is_tei(id, "language") && d.parent(id).is_some_and(|p| d.is_tei(p, "langUsage")))
}

/// Normalized `ident` of the first declared language.
fn derive_lang(doc: &Document, tables: &Tables) -> Option<String> {
    let first = declared_languages(doc).into_iter().next()?;
    let ident = doc.get_attr(first, "ident")?;
    Some(tables.normalize_lang(ident).to_string())
}

/// URN built from the file stem and the first declared Latin or Greek language.
fn derive_urn(doc: &Document, work: &str, tables: &Tables) -> Option<String> {
    declared_languages(doc).into_iter().find_map(|id| {
        let lang = tables.normalize_lang(doc.get_attr(id, "ident")?);
        match lang {
            "lat" => Some(format!("urn:cts:latinLit:{work}")),
            GREEK => Some(format!("urn:cts:greekLit:{work}")),
            _ => None,
        }
    })
}

/// Stamp the working language and URN onto `body` and its first `div`.
///
/// Both values come from `body` itself when present, otherwise from the
/// `langUsage` declarations and the file stem. Nothing is written unless
/// both resolve. Returns the resolved `(lang, urn)` pair.
pub fn annotate_body(doc: &mut Document, work: &str, tables: &Tables) -> Option<(String, String)> {
    let Some(body) = doc.find_tei("body").into_iter().next() else {
        warn!("no <body> element found");
        return None;
    };

    let lang = doc
        .xml_lang(body)
        .map(str::to_string)
        .or_else(|| derive_lang(doc, tables));
    let urn = doc
        .get_attr(body, "n")
        .map(str::to_string)
        .or_else(|| derive_urn(doc, work, tables));
    debug!(?lang, ?urn, "document language and URN");

    let (Some(lang), Some(urn)) = (lang, urn) else {
        warn!("could not resolve both language and URN; body left unannotated");
        return None;
    };
    let lang = tables.normalize_lang(&lang).to_string();

    let first_div = doc.children(body).find(|&id| doc.is_tei(id, "div"));
    let targets = std::iter::once(body).chain(first_div);
    for id in targets.collect::<Vec<_>>() {
        doc.set_attr(id, QName::plain("n"), urn.as_str());
        doc.set_attr(id, QName::xml("lang"), lang.as_str());
    }
    if first_div.is_none() {
        warn!("<body> has no <div> child to annotate");
    }

    Some((lang, urn))
}

/// Turn a natural-language citation such as `Soph. OC 437` into a CTS URN.
///
/// The first substitution whose key occurs in the citation wins; whatever is
/// left once the key is removed becomes the passage component. A citation
/// matching no key is returned unchanged.
pub fn convert_citation(citation: &str, tables: &Tables) -> String {
    for (name, urn) in tables.urn_substitutions() {
        if citation.contains(name) {
            let passage = citation.replace(name, "");
            let passage = passage.trim();
            return if passage.is_empty() {
                urn.to_string()
            } else {
                format!("{urn}:{passage}")
            };
        }
    }
    citation.to_string()
}

/// Record `convert_citation(@n)` as `@ref` on every `bibl`.
pub fn add_refs_to_bibls(doc: &mut Document, tables: &Tables) {
    for bibl in doc.find_tei("bibl") {
        let Some(n) = doc.get_attr(bibl, "n") else {
            warn!(text = doc.text(bibl).unwrap_or(""), "bibl has no @n; skipping");
            continue;
        };
        let reference = convert_citation(n, tables);
        doc.set_attr(bibl, QName::plain("ref"), reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_document;

    fn parse(source: &str) -> Document {
        parse_document(source).unwrap()
    }

    #[test]
    fn test_convert_citation() {
        let tables = Tables::default();
        assert_eq!(convert_citation("Soph. OC 437", &tables), "urn:cts:greekLit:tlg0011.tlg007:437");
        assert_eq!(convert_citation("Soph. OT  1-5 ", &tables), "urn:cts:greekLit:tlg0011.tlg004:1-5");
        assert_eq!(convert_citation("Soph. OC", &tables), "urn:cts:greekLit:tlg0011.tlg007");
        assert_eq!(convert_citation("Hom. Il. 1.1", &tables), "Hom. Il. 1.1");
    }

    #[test]
    fn test_refable_units() {
        let doc = parse(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader>
                <refsDecl n="other"><cRefPattern n="line"/></refsDecl>
                <refsDecl n="CTS"><cRefPattern n="book"/><cRefPattern n="chapter"/><cRefPattern/></refsDecl>
            </teiHeader></TEI>"#,
        );
        let units = refable_units(&doc).unwrap();
        assert_eq!(units.into_iter().collect::<Vec<_>>(), vec!["book", "chapter"]);
    }

    #[test]
    fn test_refable_units_absent() {
        let doc = parse(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader/></TEI>"#);
        assert!(refable_units(&doc).is_none());
    }

    #[test]
    fn test_annotate_from_body_attributes() {
        let mut doc = parse(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body xml:lang="gr" n="urn:cts:greekLit:tlg0011.tlg007"><head/><div/></body></text></TEI>"#,
        );
        let (lang, urn) = annotate_body(&mut doc, "ignored", &Tables::default()).unwrap();
        assert_eq!(lang, "grc");
        assert_eq!(urn, "urn:cts:greekLit:tlg0011.tlg007");

        let div = doc.find_tei("div")[0];
        assert_eq!(doc.get_attr(div, "n"), Some("urn:cts:greekLit:tlg0011.tlg007"));
        assert_eq!(doc.xml_lang(div), Some("grc"));
        let body = doc.find_tei("body")[0];
        assert_eq!(doc.xml_lang(body), Some("grc"));
    }

    #[test]
    fn test_annotate_derives_from_lang_usage_and_stem() {
        let mut doc = parse(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><langUsage>
                <language ident="en">English</language><language ident="greek">Greek</language>
            </langUsage></teiHeader><text><body><div/></body></text></TEI>"#,
        );
        let (lang, urn) = annotate_body(&mut doc, "tlg0011.tlg007.perseus-grc2", &Tables::default()).unwrap();
        // The first declared language is the working language, but the URN
        // comes from the first Latin or Greek one.
        assert_eq!(lang, "eng");
        assert_eq!(urn, "urn:cts:greekLit:tlg0011.tlg007.perseus-grc2");
    }

    #[test]
    fn test_annotate_needs_both_values() {
        let mut doc = parse(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body xml:lang="la"><div/></body></text></TEI>"#);
        assert!(annotate_body(&mut doc, "work", &Tables::default()).is_none());
        let div = doc.find_tei("div")[0];
        assert_eq!(doc.get_attr(div, "n"), None);
    }

    #[test]
    fn test_annotate_without_body() {
        let mut doc = parse(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader/></TEI>"#);
        assert!(annotate_body(&mut doc, "work", &Tables::default()).is_none());
    }

    #[test]
    fn test_bibl_refs() {
        let mut doc = parse(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><bibl n="Soph. OC 437"/><bibl>no n</bibl></TEI>"#,
        );
        add_refs_to_bibls(&mut doc, &Tables::default());
        let bibls = doc.find_tei("bibl");
        assert_eq!(doc.get_attr(bibls[0], "ref"), Some("urn:cts:greekLit:tlg0011.tlg007:437"));
        assert_eq!(doc.get_attr(bibls[1], "ref"), None);
    }
}
