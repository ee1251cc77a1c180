//! Structural conversion of a parsed TEI document.
//!
//! A [`Converter`] owns one parsed document and runs a fixed sequence of
//! rewrite passes over it. Passes mutate the tree in place and most of them
//! depend on the normalized output of earlier ones, so the order is part of
//! the contract.
//!
//! ## Pipeline Order
//!
//! 1. **Referenceable units** - read `refsDecl[@n='CTS']`
//! 2. **Language / URN** - stamp `body` and its first `div`
//! 3. **Lemma** - `lemma` becomes `app/lem`
//! 4. **Gloss note** - `note[@type='gloss']` becomes `app`
//! 5. **Collapse** - unwrap every `*[@subtype='pg_l']`
//! 6. **Renames** - `argument`, `byline`, `date`, `dateRange`
//! 7. **Languages** - `@lang` becomes `@xml:lang`, codes normalized
//! 8. **Betacode** - transliterate Greek-scoped text (needs 7)
//! 9. **Milestones** - referenceable milestones become textpart divisions
//! 10. **Pro lege Manilia** - subsection repair for one known work
//! 11. **Relabel** - speech, overview, summary, section
//! 12. **Promotion** - summary sections become siblings of the summary
//! 13. **targOrder** - drop the legacy attribute
//! 14. **Citations** - `bibl/@n` becomes `bibl/@ref`
//!
//! Promotion keys on the legacy `type` values, so it runs between the speech
//! relabel and the other three.
//!
//! Serialization (step 15) is left to the caller (see [`crate::convert_file`]).

mod apparatus;
mod flatten;
mod lang;
mod milestones;
mod promote;
mod refs;
mod rename;
mod special;
mod transliterate;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::tables::Tables;
use crate::tree::{Document, Element, NodeId, QName};
use crate::util::work_stem;

pub use refs::convert_citation;
pub use rename::fix_date;

/// Language code that activates Betacode transliteration.
pub const GREEK: &str = "grc";

/// Milestone unit that never becomes a division of its own.
pub(crate) const PAGE_LINE_UNIT: &str = "pg_l";

/// Knobs for a conversion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Fail with [`Error::MissingElement`] when the document has no
    /// `refsDecl[@n='CTS']`, instead of logging and skipping milestone
    /// conversion.
    pub strict: bool,
}

/// Runs the conversion pipeline over one document.
pub struct Converter<'a> {
    doc: Document,
    /// File stem the document was loaded from, used to derive a URN.
    work: String,
    tables: &'a Tables,
    options: ConvertOptions,
    refable_units: Option<BTreeSet<String>>,
    lang: Option<String>,
    urn: Option<String>,
}

impl<'a> Converter<'a> {
    /// Wrap an already-parsed document.
    ///
    /// `work` is the file stem (`tlg0011.tlg007.perseus-grc2`) used when the
    /// document doesn't name its own URN.
    pub fn new(doc: Document, work: impl Into<String>, tables: &'a Tables, options: ConvertOptions) -> Self {
        Self {
            doc,
            work: work.into(),
            tables,
            options,
            refable_units: None,
            lang: None,
            urn: None,
        }
    }

    /// Wrap a document parsed from `path`, taking the work stem from the file name.
    pub fn for_path(doc: Document, path: &Path, tables: &'a Tables, options: ConvertOptions) -> Self {
        Self::new(doc, work_stem(path), tables, options)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// Working language resolved by the language/URN pass.
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    /// Work URN resolved by the language/URN pass.
    pub fn urn(&self) -> Option<&str> {
        self.urn.as_deref()
    }

    /// Referenceable milestone units, if the document declares any.
    pub fn refable_units(&self) -> Option<&BTreeSet<String>> {
        self.refable_units.as_ref()
    }

    /// Run every pass in order.
    pub fn convert(&mut self) -> Result<()> {
        self.assign_refable_units()?;
        self.annotate_lang_and_urn();

        info!("rewriting lemmas and gloss notes as apparatus");
        apparatus::lemmas_to_app(&mut self.doc, self.tables);
        apparatus::gloss_notes_to_app(&mut self.doc);

        info!("collapsing pg_l wrappers");
        flatten::collapse_page_line_wrappers(&mut self.doc);

        info!("renaming arguments, bylines and dates");
        rename::convert_arguments(&mut self.doc);
        rename::convert_bylines(&mut self.doc);
        rename::convert_dates(&mut self.doc);

        info!("normalizing language attributes");
        lang::normalize_langs(&mut self.doc, self.tables);

        info!("transliterating betacode");
        transliterate::betacode_to_unicode(&mut self.doc);

        self.convert_milestones();

        if let Some(urn) = self.urn.as_deref()
            && special::is_pro_lege_manilia(urn)
        {
            info!(urn, "repairing pro lege Manilia subsections");
            special::pro_lege_manilia(&mut self.doc);
        }

        info!("relabeling divisions");
        rename::convert_speeches(&mut self.doc);
        promote::summary_children_to_siblings(&mut self.doc);
        rename::convert_overviews(&mut self.doc);
        rename::convert_summaries(&mut self.doc);
        rename::convert_sections(&mut self.doc);

        info!("removing targOrder attributes");
        rename::remove_targ_order(&mut self.doc);

        info!("adding citation refs to bibls");
        refs::add_refs_to_bibls(&mut self.doc, self.tables);

        Ok(())
    }

    fn assign_refable_units(&mut self) -> Result<()> {
        info!("collecting referenceable units");
        match refs::refable_units(&self.doc) {
            Some(units) => {
                self.refable_units = Some(units);
                Ok(())
            }
            None if self.options.strict => Err(Error::MissingElement("refsDecl[@n='CTS']".to_string())),
            None => {
                warn!("no refsDecl[@n='CTS'] found; milestones will not be converted");
                Ok(())
            }
        }
    }

    fn annotate_lang_and_urn(&mut self) {
        info!("adding language and URN to body");
        if let Some((lang, urn)) = refs::annotate_body(&mut self.doc, &self.work, self.tables) {
            self.lang = Some(lang);
            self.urn = Some(urn);
        }
    }

    fn convert_milestones(&mut self) {
        let Some(units) = self.refable_units.as_ref() else {
            return;
        };
        info!(?units, "converting milestones to textparts");
        milestones::milestones_to_textparts(&mut self.doc, units);
    }
}

/// A new element in the TEI namespace.
pub(crate) fn tei_element(local: &str) -> Element {
    Element::new(QName::tei(local))
}

/// `<div type="textpart" subtype=".." n=".."/>`
pub(crate) fn textpart(subtype: &str, n: &str) -> Element {
    tei_element("div")
        .with_attr(QName::plain("type"), "textpart")
        .with_attr(QName::plain("subtype"), subtype)
        .with_attr(QName::plain("n"), n)
}

/// Check if `id` carries the plain attribute `local="value"`.
pub(crate) fn has_attr(doc: &Document, id: NodeId, local: &str, value: &str) -> bool {
    doc.get_attr(id, local) == Some(value)
}

/// Check if `id` is a TEI `div` whose `type` is `value`.
pub(crate) fn is_div_of_type(doc: &Document, id: NodeId, value: &str) -> bool {
    doc.is_tei(id, "div") && has_attr(doc, id, "type", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{XML_NS, parse_document};

    const SAMPLE: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <encodingDesc>
      <refsDecl n="CTS">
        <cRefPattern n="section"/>
      </refsDecl>
    </encodingDesc>
    <profileDesc>
      <langUsage><language ident="la">Latin</language><language id="greek">Greek</language></langUsage>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <div type="edition">
        <milestone unit="section" n="1"/>
        <p lang="greek">lo/gos</p>
        <p>Cicero <lemma xml:lang="gr">mh=nin</lemma> tail</p>
        <milestone unit="section" n="2"/>
        <p><bibl n="Soph. OC 437">OC 437</bibl><date value="-5"/></p>
      </div>
    </body>
  </text>
</TEI>"#;

    fn run(source: &str, work: &str, options: ConvertOptions) -> Result<Document> {
        let tables = Tables::default();
        let doc = parse_document(source)?;
        let mut converter = Converter::new(doc, work, &tables, options);
        converter.convert()?;
        Ok(converter.into_document())
    }

    #[test]
    fn test_full_pipeline() {
        let doc = run(SAMPLE, "phi0474.phi013.perseus-lat1", ConvertOptions::default()).unwrap();

        let body = doc.find_tei("body")[0];
        assert_eq!(doc.get_attr(body, "n"), Some("urn:cts:latinLit:phi0474.phi013.perseus-lat1"));
        assert_eq!(doc.xml_lang(body), Some("lat"));
        let edition = doc.children(body).next().unwrap();
        assert_eq!(doc.xml_lang(edition), Some("lat"));

        let sections: Vec<_> = doc.find_all(|d, id| is_div_of_type(d, id, "textpart") && has_attr(d, id, "subtype", "section"));
        assert_eq!(sections.len(), 2);
        assert_eq!(doc.get_attr(sections[0], "n"), Some("1"));
        assert!(doc.find_tei("milestone").is_empty());

        let p = doc.find_tei("p")[0];
        assert_eq!(doc.xml_lang(p), Some("grc"));
        assert_eq!(doc.get_attr(p, "lang"), None);
        assert_eq!(doc.text(p), Some("λόγος"));

        let lem = doc.find_tei("lem")[0];
        assert_eq!(doc.xml_lang(lem), Some("grc"));
        assert_eq!(doc.text(lem), Some("μῆνιν"));
        let app = doc.parent(lem).unwrap();
        assert_eq!(doc.tail(app), Some(" tail"));

        let bibl = doc.find_tei("bibl")[0];
        assert_eq!(doc.get_attr(bibl, "ref"), Some("urn:cts:greekLit:tlg0011.tlg007:437"));

        let date = doc.find_tei("date")[0];
        assert_eq!(doc.get_attr(date, "when"), Some("-0005"));
        assert_eq!(doc.get_attr(date, "value"), None);

        let languages = doc.find_tei("language");
        assert_eq!(doc.get_attr(languages[0], "ident"), Some("lat"));
        assert_eq!(doc.get_attr(languages[1], "ident"), Some("grc"));
        assert_eq!(doc.get_attr(languages[1], "id"), None);
        assert_eq!(doc.attr_ns(languages[1], XML_NS, "lang"), None);
    }

    #[test]
    fn test_resolved_values_exposed() {
        let tables = Tables::default();
        let doc = parse_document(SAMPLE).unwrap();
        let mut converter = Converter::for_path(doc, Path::new("data/phi0474.phi013.perseus-lat1.xml"), &tables, ConvertOptions::default());
        assert_eq!(converter.urn(), None);

        converter.convert().unwrap();
        assert_eq!(converter.lang(), Some("lat"));
        assert_eq!(converter.urn(), Some("urn:cts:latinLit:phi0474.phi013.perseus-lat1"));
        let units: Vec<_> = converter.refable_units().into_iter().flatten().map(String::as_str).collect();
        assert_eq!(units, vec!["section"]);
    }

    #[test]
    fn test_missing_refs_decl_is_lenient_by_default() {
        let source = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><div><milestone unit="section" n="1"/><p/></div></body></text></TEI>"#;
        let doc = run(source, "x", ConvertOptions::default()).unwrap();
        assert_eq!(doc.find_tei("milestone").len(), 1);
    }

    #[test]
    fn test_missing_refs_decl_fails_in_strict_mode() {
        let source = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body/></text></TEI>"#;
        let err = run(source, "x", ConvertOptions { strict: true }).unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }

    #[test]
    fn test_summary_promotion_sees_legacy_types() {
        let source = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body>
            <div type="overv"><div type="summary"><div type="section" n="1"/><div type="section" n="2"/></div></div>
        </body></text></TEI>"#;
        let doc = run(source, "x", ConvertOptions::default()).unwrap();

        let chapter = doc.find_all(|d, id| has_attr(d, id, "subtype", "chapter"))[0];
        let ns: Vec<_> = doc
            .children(chapter)
            .map(|c| doc.get_attr(c, "n").unwrap_or(""))
            .collect();
        assert_eq!(ns, vec!["", "1", "2"]);
        for child in doc.children(chapter) {
            assert_eq!(doc.get_attr(child, "type"), Some("textpart"));
            assert_eq!(doc.get_attr(child, "subtype"), Some("section"));
        }
    }
}
