//! [`Document`] -> indented XML bytes.
//!
//! Output is UTF-8 with an XML declaration. Indentation uses a tab per
//! level: an element with children gets a newline and indent in its text
//! and in each child's tail, but only where that text or tail is empty or
//! whitespace-only. Character content is never altered.

use std::fs;
use std::path::Path;

use quick_xml::escape::partial_escape;

use super::{Document, Element, Misc, NodeData, NodeId, XML_NS};
use crate::error::{Error, Result};
use crate::util::is_blank;

/// Serialize a document to UTF-8 bytes.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>> {
    if doc.element(doc.root()).is_none() {
        return Err(Error::Malformed("document root is not an element".to_string()));
    }

    let mut out = String::with_capacity(doc.node_count() * 48);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    for misc in &doc.prolog {
        write_misc(&mut out, misc);
        out.push('\n');
    }

    let mut writer = TreeWriter {
        doc,
        out,
        scope: vec![(Some("xml".to_string()), XML_NS.to_string())],
        generated: 0,
    };
    writer.node(doc.root(), 0);
    let mut out = writer.out;

    for misc in &doc.epilog {
        out.push('\n');
        write_misc(&mut out, misc);
    }
    out.push('\n');

    Ok(out.into_bytes())
}

/// Serialize a document and write it to `path`, replacing any existing file.
pub fn write_file<P: AsRef<Path>>(doc: &Document, path: P) -> Result<()> {
    let bytes = to_bytes(doc)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_misc(out: &mut String, misc: &Misc) {
    match misc {
        Misc::Comment(text) => write_comment(out, text),
        Misc::ProcessingInstruction(content) => write_pi(out, content),
        Misc::DocType(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
    }
}

fn write_comment(out: &mut String, text: &str) {
    out.push_str("<!--");
    out.push_str(text);
    out.push_str("-->");
}

fn write_pi(out: &mut String, content: &str) {
    out.push_str("<?");
    out.push_str(content);
    out.push_str("?>");
}

/// Escape an attribute value for a double-quoted attribute.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_indent(out: &mut String, level: usize) {
    out.push('\n');
    for _ in 0..level {
        out.push('\t');
    }
}

struct TreeWriter<'a> {
    doc: &'a Document,
    out: String,
    /// In-scope (`prefix`, `uri`) bindings, innermost last.
    scope: Vec<(Option<String>, String)>,
    /// Counter for prefixes invented for namespaced attributes.
    generated: usize,
}

impl TreeWriter<'_> {
    fn node(&mut self, id: NodeId, level: usize) {
        let doc = self.doc;
        let Some(node) = doc.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Element(el) => self.element(id, el, level),
            NodeData::Comment(text) => write_comment(&mut self.out, text),
            NodeData::ProcessingInstruction(content) => write_pi(&mut self.out, content),
        }
    }

    fn element(&mut self, id: NodeId, el: &Element, level: usize) {
        let scope_len = self.scope.len();
        let mut declarations: Vec<(Option<String>, String)> = Vec::new();

        for (prefix, uri) in &el.namespaces {
            self.scope.push((prefix.clone(), uri.clone()));
            declarations.push((prefix.clone(), uri.clone()));
        }

        let tag = self.element_name(el, &mut declarations);

        let mut attrs = String::new();
        for attr in &el.attrs {
            let name = match attr.name.ns.as_deref() {
                None => attr.name.local.clone(),
                Some(XML_NS) => format!("xml:{}", attr.name.local),
                Some(uri) => {
                    let prefix = self.attr_prefix(uri, &mut declarations);
                    format!("{prefix}:{}", attr.name.local)
                }
            };
            attrs.push(' ');
            attrs.push_str(&name);
            attrs.push_str("=\"");
            attrs.push_str(&escape_attr(&attr.value));
            attrs.push('"');
        }

        self.out.push('<');
        self.out.push_str(&tag);
        for (prefix, uri) in &declarations {
            match prefix {
                Some(prefix) => {
                    self.out.push_str(" xmlns:");
                    self.out.push_str(prefix);
                }
                None => self.out.push_str(" xmlns"),
            }
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(uri));
            self.out.push('"');
        }
        self.out.push_str(&attrs);

        let children: Vec<NodeId> = self.doc.children(id).collect();
        if children.is_empty() {
            match el.text.as_deref() {
                None => self.out.push_str("/>"),
                Some(text) => {
                    self.out.push('>');
                    self.out.push_str(&partial_escape(text));
                    self.close(&tag);
                }
            }
            self.scope.truncate(scope_len);
            return;
        }

        self.out.push('>');
        match el.text.as_deref() {
            Some(text) if !is_blank(text) => self.out.push_str(&partial_escape(text)),
            _ => push_indent(&mut self.out, level + 1),
        }

        let last = children.len() - 1;
        for (i, child) in children.into_iter().enumerate() {
            self.node(child, level + 1);
            match self.doc.tail(child) {
                Some(tail) if !is_blank(tail) => self.out.push_str(&partial_escape(tail)),
                _ if i == last => push_indent(&mut self.out, level),
                _ => push_indent(&mut self.out, level + 1),
            }
        }

        self.close(&tag);
        self.scope.truncate(scope_len);
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    /// Innermost binding of `prefix`.
    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.scope
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// A prefix currently bound to `uri` (`Some(None)` for the default namespace).
    fn prefix_for(&self, uri: &str) -> Option<Option<String>> {
        self.scope
            .iter()
            .rev()
            .filter(|(_, u)| u == uri)
            .find(|(p, _)| self.lookup(p.as_deref()) == Some(uri))
            .map(|(p, _)| p.clone())
    }

    /// Qualified tag for an element, declaring its namespace if needed.
    fn element_name(&mut self, el: &Element, declarations: &mut Vec<(Option<String>, String)>) -> String {
        let local = &el.name.local;
        match el.name.ns.as_deref() {
            None => {
                if self.lookup(None).is_some_and(|uri| !uri.is_empty()) {
                    self.scope.push((None, String::new()));
                    declarations.push((None, String::new()));
                }
                local.clone()
            }
            Some(uri) => {
                if self.lookup(None) == Some(uri) {
                    return local.clone();
                }
                match self.prefix_for(uri) {
                    Some(Some(prefix)) => format!("{prefix}:{local}"),
                    _ => {
                        self.scope.push((None, uri.to_string()));
                        declarations.push((None, uri.to_string()));
                        local.clone()
                    }
                }
            }
        }
    }

    /// Prefix for a namespaced attribute; attributes cannot use the default namespace.
    fn attr_prefix(&mut self, uri: &str, declarations: &mut Vec<(Option<String>, String)>) -> String {
        if let Some(Some(prefix)) = self.prefix_for(uri) {
            return prefix;
        }
        let prefix = loop {
            let candidate = format!("ns{}", self.generated);
            self.generated += 1;
            if self.lookup(Some(candidate.as_str())).is_none() {
                break candidate;
            }
        };
        self.scope.push((Some(prefix.clone()), uri.to_string()));
        declarations.push((Some(prefix.clone()), uri.to_string()));
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{QName, TEI_NS, parse_document};

    fn serialize(doc: &Document) -> String {
        String::from_utf8(to_bytes(doc).unwrap()).unwrap()
    }

    #[test]
    fn test_declaration_and_default_namespace() {
        let doc = parse_document(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text/></TEI>"#).unwrap();
        let xml = serialize(&doc);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <TEI xmlns=\"http://www.tei-c.org/ns/1.0\">\n\t<text/>\n</TEI>\n"
        );
    }

    #[test]
    fn test_tab_indentation_nested() {
        let doc = parse_document("<a><b><c/></b><d/></a>").unwrap();
        let xml = serialize(&doc);
        assert!(xml.ends_with("<a>\n\t<b>\n\t\t<c/>\n\t</b>\n\t<d/>\n</a>\n"));
    }

    #[test]
    fn test_mixed_content_untouched() {
        let doc = parse_document("<p>one <hi>two</hi> three</p>").unwrap();
        let xml = serialize(&doc);
        assert!(xml.contains("<p>one <hi>two</hi> three</p>"));
    }

    #[test]
    fn test_escaping() {
        let doc = parse_document(r#"<p n="a &quot;b&quot; &amp; c">x &lt; y &amp; z</p>"#).unwrap();
        let xml = serialize(&doc);
        assert!(xml.contains(r#"<p n="a &quot;b&quot; &amp; c">x &lt; y &amp; z</p>"#));
    }

    #[test]
    fn test_xml_lang_never_declared() {
        let mut doc = Document::new(Element::new(QName::tei("TEI")));
        let root = doc.root();
        doc.set_attr(root, QName::xml("lang"), "grc");
        let xml = serialize(&doc);
        assert!(xml.contains(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0" xml:lang="grc"/>"#));
        assert!(!xml.contains("xmlns:xml"));
    }

    #[test]
    fn test_created_elements_inherit_scope() {
        let mut doc = parse_document(r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><body/></TEI>"#).unwrap();
        let body = doc.find_tei("body")[0];
        let div = doc.create_element(Element::new(QName::tei("div")).with_attr(QName::plain("type"), "textpart"));
        doc.append(body, div);

        let xml = serialize(&doc);
        assert_eq!(xml.matches(TEI_NS).count(), 1);
        assert!(xml.contains("<div type=\"textpart\"/>"));
    }

    #[test]
    fn test_prefixed_namespace_reused() {
        let doc = parse_document(r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:p/></tei:TEI>"#).unwrap();
        let xml = serialize(&doc);
        assert!(xml.contains("<tei:TEI xmlns:tei=\"http://www.tei-c.org/ns/1.0\">"));
        assert!(xml.contains("<tei:p/>"));
    }

    #[test]
    fn test_no_namespace_child_undeclares_default() {
        let mut doc = Document::new(Element::new(QName::tei("TEI")));
        let root = doc.root();
        let plain = doc.create_element(Element::new(QName::plain("extra")));
        doc.append(root, plain);
        let xml = serialize(&doc);
        assert!(xml.contains("<extra xmlns=\"\"/>"));
    }

    #[test]
    fn test_prolog_doctype_and_epilog_kept() {
        let doc = parse_document("<?xml-model href=\"tei.rng\"?>\n<!DOCTYPE TEI>\n<TEI><!--c--><p/></TEI>\n<!--end-->").unwrap();
        let xml = serialize(&doc);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?xml-model href=\"tei.rng\"?>\n<!DOCTYPE TEI>\n\
             <TEI>\n\t<!--c-->\n\t<p/>\n</TEI>\n<!--end-->\n"
        );
    }

    #[test]
    fn test_prolog_keeps_source_order() {
        let doc = parse_document("<!DOCTYPE TEI>\n<!--a-->\n<?pi b?>\n<TEI/>").unwrap();
        let xml = serialize(&doc);
        assert!(xml.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE TEI>\n<!--a-->\n<?pi b?>\n<TEI/>"
        ));
    }

    #[test]
    fn test_reparse_is_stable() {
        let source = "<TEI xmlns=\"http://www.tei-c.org/ns/1.0\"><body><p>a <hi rend=\"x\">b</hi></p></body></TEI>";
        let once = serialize(&parse_document(source).unwrap());
        let twice = serialize(&parse_document(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        let doc = parse_document("<a/>").unwrap();
        write_file(&doc, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a/>\n");
    }
}
