//! XML text -> [`Document`] using quick-xml's pull reader.

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use super::{Attribute, Document, Element, Misc, NodeId, QName};
use crate::error::{Error, Result};
use crate::util::{is_blank, split_qname};

/// Parse a complete XML document.
///
/// Predefined entities and character references are resolved; any other
/// entity reference is an error. Whitespace-only text between elements is
/// dropped where the enclosing element has no other character content, so
/// the serializer can re-indent freely without touching mixed content.
pub fn parse_document(text: &str) -> Result<Document> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => builder.start(&e, false)?,
            Event::Empty(e) => builder.start(&e, true)?,
            Event::End(_) => builder.end(),
            Event::Text(e) => {
                builder.text(&String::from_utf8_lossy(&e));
            }
            Event::CData(e) => {
                builder.text(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(&e);
                let resolved = resolve_entity(&entity).ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
                builder.text(&resolved);
            }
            Event::Comment(e) => {
                builder.misc(Misc::Comment(String::from_utf8_lossy(&e).into_owned()));
            }
            Event::PI(e) => {
                builder.misc(Misc::ProcessingInstruction(
                    String::from_utf8_lossy(&e).into_owned(),
                ));
            }
            Event::DocType(e) => {
                builder.misc(Misc::DocType(String::from_utf8_lossy(&e).trim().to_string()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}

/// Open element on the builder stack.
struct Frame {
    id: NodeId,
    /// Length of the namespace binding stack before this element's declarations.
    bindings_len: usize,
}

#[derive(Default)]
struct TreeBuilder {
    doc: Option<Document>,
    stack: Vec<Frame>,
    /// In-scope namespace bindings, innermost last.
    bindings: Vec<(Option<String>, String)>,
    /// Last node closed in the current element; text goes to its tail.
    last_closed: Option<NodeId>,
    prolog: Vec<Misc>,
    epilog: Vec<Misc>,
}

impl TreeBuilder {
    fn start(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        let bindings_len = self.bindings.len();

        let mut namespaces = Vec::new();
        let mut raw_attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
            let value = unescape(&raw)?.into_owned();

            if key == "xmlns" {
                namespaces.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespaces.push((Some(prefix.to_string()), value));
            } else {
                raw_attrs.push((key, value));
            }
        }
        self.bindings.extend(namespaces.iter().cloned());

        let raw_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name = self.resolve(&raw_name, true)?;

        let mut attrs = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            attrs.push(Attribute::new(self.resolve(&key, false)?, value));
        }

        let element = Element {
            name,
            attrs,
            namespaces,
            text: None,
        };

        let parent = self.stack.last().map(|f| f.id);
        let id = match (self.doc.as_mut(), parent) {
            (Some(doc), Some(parent)) => {
                let id = doc.create_element(element);
                doc.append(parent, id);
                id
            }
            (None, None) => {
                let doc = Document::new(element);
                let id = doc.root();
                self.doc = Some(doc);
                id
            }
            _ => return Err(Error::Malformed(format!("second root element <{raw_name}>"))),
        };

        if is_empty {
            self.bindings.truncate(bindings_len);
            self.last_closed = Some(id);
        } else {
            self.stack.push(Frame { id, bindings_len });
            self.last_closed = None;
        }
        Ok(())
    }

    fn end(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.bindings.truncate(frame.bindings_len);
            if let Some(doc) = self.doc.as_mut() {
                drop_blank_text(doc, frame.id);
            }
            self.last_closed = Some(frame.id);
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() || self.stack.is_empty() {
            // Outside the root only whitespace is legal; the reader rejects the rest.
            return;
        }
        let Some(doc) = self.doc.as_mut() else {
            return;
        };

        let slot = match self.last_closed {
            Some(prev) => doc.node_mut(prev).map(|n| &mut n.tail),
            None => {
                let current = self.stack.last().map(|f| f.id);
                current
                    .and_then(|id| doc.element_mut(id))
                    .map(|el| &mut el.text)
            }
        };
        if let Some(slot) = slot {
            slot.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn misc(&mut self, misc: Misc) {
        let parent = self.stack.last().map(|f| f.id);
        match (self.doc.as_mut(), parent) {
            (Some(doc), Some(parent)) => {
                let id = match misc {
                    Misc::Comment(text) => doc.create_comment(text),
                    Misc::ProcessingInstruction(content) => doc.create_processing_instruction(content),
                    // A doctype is only legal in the prolog.
                    Misc::DocType(_) => return,
                };
                doc.append(parent, id);
                self.last_closed = Some(id);
            }
            (None, _) => self.prolog.push(misc),
            (Some(_), None) => self.epilog.push(misc),
        }
    }

    /// Resolve a raw `prefix:local` name against the in-scope bindings.
    ///
    /// Unprefixed attributes are never in a namespace; unprefixed elements
    /// take the default namespace.
    fn resolve(&self, raw: &str, is_element: bool) -> Result<QName> {
        let (prefix, local) = split_qname(raw);
        match prefix {
            Some("xml") => Ok(QName::xml(local)),
            Some(prefix) => {
                let uri = self
                    .lookup(Some(prefix))
                    .ok_or_else(|| Error::Malformed(format!("unbound namespace prefix `{prefix}`")))?;
                Ok(QName::new(Some(uri), local))
            }
            None if is_element => Ok(QName::new(self.lookup(None), local)),
            None => Ok(QName::plain(local)),
        }
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn finish(self) -> Result<Document> {
        if !self.stack.is_empty() {
            return Err(Error::Malformed("unclosed elements at end of input".to_string()));
        }
        let mut doc = self
            .doc
            .ok_or_else(|| Error::Malformed("no root element".to_string()))?;
        doc.prolog = self.prolog;
        doc.epilog = self.epilog;
        Ok(doc)
    }
}

/// Remove whitespace-only text from element-only content.
///
/// If the element has children and none of its text segments carry
/// characters, all of them are formatting noise. Mixed content and
/// childless elements are left alone.
fn drop_blank_text(doc: &mut Document, id: NodeId) {
    let children: Vec<NodeId> = doc.children(id).collect();
    if children.is_empty() {
        return;
    }

    let text_blank = doc.text(id).is_none_or(is_blank);
    let tails_blank = children.iter().all(|&c| doc.tail(c).is_none_or(is_blank));
    if !(text_blank && tails_blank) {
        return;
    }

    doc.set_text(id, None);
    for child in children {
        doc.set_tail(child, None);
    }
}

/// Resolve predefined entities and character references.
fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(predefined) = resolve_predefined_entity(entity) {
        return Some(predefined.to_string());
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
