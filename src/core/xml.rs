//! core::xml
//!
//! Reading and writing object documents.
//!
//! # Format
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <objects serializationModel="Studio.02.02.00">
//!     <object class="EventFolder" id="{...}">
//!         <property name="name">
//!             <value>Characters</value>
//!         </property>
//!         <relationship name="folder">
//!             <destination>{...}</destination>
//!         </relationship>
//!     </object>
//! </objects>
//! ```
//!
//! A document holds one or more objects. Unknown elements inside an object
//! are skipped; unknown classes are preserved. Text is whitespace-trimmed.
//! Output is tab-indented, but byte-for-byte fidelity with the host
//! application's formatting is not a goal.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use super::object::GraphObject;
use super::types::{ObjectClass, ObjectId, SerializationModel, TypeError};

/// Errors from document parsing and writing.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The XML itself is not well formed.
    #[error("xml syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// The XML is well formed but is not an object document.
    #[error("malformed object document at byte {position}: {message}")]
    Malformed { position: usize, message: String },

    /// An id or model attribute failed validation.
    #[error("invalid value in object document: {0}")]
    InvalidValue(#[from] TypeError),
}

/// A parsed document: the model tag and its objects in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDocument {
    pub model: SerializationModel,
    pub objects: Vec<GraphObject>,
}

impl ObjectDocument {
    pub fn new(model: SerializationModel, objects: Vec<GraphObject>) -> Self {
        Self { model, objects }
    }

    /// Find an object by id.
    pub fn find(&self, id: &ObjectId) -> Option<&GraphObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    /// The first object of a class.
    pub fn first_of(&self, class: &ObjectClass) -> Option<&GraphObject> {
        self.objects.iter().find(|o| &o.class == class)
    }

    /// All objects of a class, in file order.
    pub fn all_of<'a>(&'a self, class: &'a ObjectClass) -> impl Iterator<Item = &'a GraphObject> {
        self.objects.iter().filter(move |o| &o.class == class)
    }
}

/// Where character data currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ignored,
    Value,
    Destination,
}

/// Incremental state while walking the event stream.
struct DocumentParser {
    model: Option<SerializationModel>,
    objects: Vec<GraphObject>,
    current: Option<GraphObject>,
    property: Option<String>,
    relationship: Option<String>,
    slot: Slot,
    text: String,
    saw_root: bool,
    closed_root: bool,
}

impl DocumentParser {
    fn new() -> Self {
        Self {
            model: None,
            objects: Vec::new(),
            current: None,
            property: None,
            relationship: None,
            slot: Slot::Ignored,
            text: String::new(),
            saw_root: false,
            closed_root: false,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool, position: usize) -> Result<(), XmlError> {
        match e.name().as_ref() {
            b"objects" => {
                let model = required_attr(e, b"serializationModel", position)?;
                self.model = Some(SerializationModel::new(model)?);
                self.saw_root = true;
                self.closed_root = empty;
            }
            b"object" => {
                if !self.saw_root {
                    return Err(malformed(position, "<object> outside <objects>"));
                }
                if self.current.is_some() {
                    return Err(malformed(position, "nested <object> elements"));
                }
                let class = required_attr(e, b"class", position)?;
                let id = ObjectId::new(required_attr(e, b"id", position)?)?;
                let object = GraphObject::new(id, ObjectClass::parse(&class));
                if empty {
                    self.objects.push(object);
                } else {
                    self.current = Some(object);
                }
            }
            b"property" if self.current.is_some() => {
                self.property = Some(required_attr(e, b"name", position)?);
            }
            b"relationship" => {
                let label = required_attr(e, b"name", position)?;
                let object = self
                    .current
                    .as_mut()
                    .ok_or_else(|| malformed(position, "<relationship> outside <object>"))?;
                // An explicitly empty relationship still exists.
                object.edges.entry(label.clone()).or_default();
                if !empty {
                    self.relationship = Some(label);
                }
            }
            b"value" if self.property.is_some() => {
                if empty {
                    self.finish_value();
                } else {
                    self.slot = Slot::Value;
                    self.text.clear();
                }
            }
            b"destination" if self.relationship.is_some() && !empty => {
                self.slot = Slot::Destination;
                self.text.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], position: usize) -> Result<(), XmlError> {
        match name {
            b"value" if self.slot == Slot::Value => {
                self.finish_value();
            }
            b"destination" if self.slot == Slot::Destination => {
                self.slot = Slot::Ignored;
                let text = std::mem::take(&mut self.text);
                let id = ObjectId::new(text.trim())?;
                if let (Some(object), Some(label)) = (self.current.as_mut(), &self.relationship) {
                    object.push_edge(label.clone(), id);
                }
            }
            b"objects" => self.closed_root = true,
            b"property" => self.property = None,
            b"relationship" => self.relationship = None,
            b"object" => {
                let object = self
                    .current
                    .take()
                    .ok_or_else(|| malformed(position, "unbalanced </object>"))?;
                self.objects.push(object);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_value(&mut self) {
        self.slot = Slot::Ignored;
        let value = std::mem::take(&mut self.text);
        if let (Some(object), Some(name)) = (self.current.as_mut(), &self.property) {
            object.set_property(name.clone(), value);
        }
    }

    fn finish(self, position: usize) -> Result<ObjectDocument, XmlError> {
        let model = self
            .model
            .ok_or_else(|| malformed(position, "missing <objects serializationModel=...>"))?;
        if self.current.is_some() {
            return Err(malformed(position, "unterminated <object>"));
        }
        if !self.closed_root {
            return Err(malformed(position, "unterminated <objects>"));
        }
        Ok(ObjectDocument {
            model,
            objects: self.objects,
        })
    }
}

fn malformed(position: usize, message: impl Into<String>) -> XmlError {
    XmlError::Malformed {
        position,
        message: message.into(),
    }
}

fn required_attr(e: &BytesStart<'_>, key: &[u8], position: usize) -> Result<String, XmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(malformed(
        position,
        format!(
            "<{}> is missing attribute '{}'",
            String::from_utf8_lossy(e.name().as_ref()),
            String::from_utf8_lossy(key)
        ),
    ))
}

/// Parse an object document.
///
/// # Errors
///
/// - [`XmlError::Syntax`] for XML that is not well formed
/// - [`XmlError::Malformed`] when the structure is not an object document
/// - [`XmlError::InvalidValue`] for an invalid id or model tag
///
/// # Example
///
/// ```
/// use eventforge::core::xml::parse_document;
///
/// let doc = parse_document(r#"
///     <objects serializationModel="Studio.02.02.00">
///         <object class="Bank" id="B1">
///             <property name="name"><value>Boss</value></property>
///         </object>
///     </objects>"#).unwrap();
/// assert_eq!(doc.model.as_str(), "Studio.02.02.00");
/// assert_eq!(doc.objects[0].name(), Some("Boss"));
/// ```
pub fn parse_document(xml: &str) -> Result<ObjectDocument, XmlError> {
    let mut reader = Reader::from_str(xml);

    let mut parser = DocumentParser::new();
    loop {
        let position = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(e) => parser.open(&e, false, position)?,
            Event::Empty(e) => parser.open(&e, true, position)?,
            Event::Text(t) if parser.slot != Slot::Ignored => {
                parser.text.push_str(&t.unescape()?);
            }
            Event::CData(c) if parser.slot != Slot::Ignored => {
                parser.text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) => parser.close(e.name().as_ref(), position)?,
            Event::Eof => break,
            _ => {}
        }
    }
    parser.finish(reader.buffer_position())
}

/// Serialize a document.
///
/// # Example
///
/// ```
/// use eventforge::core::object::GraphObject;
/// use eventforge::core::types::{ObjectClass, ObjectId, SerializationModel};
/// use eventforge::core::xml::{write_document, ObjectDocument};
///
/// let bank = GraphObject::new(ObjectId::new("B1").unwrap(), ObjectClass::Bank)
///     .with_property("name", "Boss & Co");
/// let doc = ObjectDocument::new(SerializationModel::new("Studio.02.02.00").unwrap(), vec![bank]);
/// let xml = write_document(&doc).unwrap();
/// assert!(xml.contains(r#"<objects serializationModel="Studio.02.02.00">"#));
/// assert!(xml.contains("Boss &amp; Co"));
/// ```
pub fn write_document(doc: &ObjectDocument) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("objects");
    root.push_attribute(("serializationModel", doc.model.as_str()));
    writer.write_event(Event::Start(root))?;

    for object in &doc.objects {
        let mut element = BytesStart::new("object");
        element.push_attribute(("class", object.class.as_str()));
        element.push_attribute(("id", object.id.as_str()));
        writer.write_event(Event::Start(element))?;

        for (name, value) in &object.properties {
            let mut property = BytesStart::new("property");
            property.push_attribute(("name", name.as_str()));
            writer.write_event(Event::Start(property))?;
            writer.write_event(Event::Start(BytesStart::new("value")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("value")))?;
            writer.write_event(Event::End(BytesEnd::new("property")))?;
        }

        for (label, destinations) in &object.edges {
            let mut relationship = BytesStart::new("relationship");
            relationship.push_attribute(("name", label.as_str()));
            writer.write_event(Event::Start(relationship))?;
            for destination in destinations {
                writer.write_event(Event::Start(BytesStart::new("destination")))?;
                writer.write_event(Event::Text(BytesText::new(destination.as_str())))?;
                writer.write_event(Event::End(BytesEnd::new("destination")))?;
            }
            writer.write_event(Event::End(BytesEnd::new("relationship")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("object")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("objects")))?;

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|e| malformed(0, format!("writer produced invalid utf-8: {e}")))?;
    xml.push('\n');
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUS_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<objects serializationModel="Studio.02.02.00">
	<object class="MixerGroup" id="{bus}">
		<property name="name">
			<value>Boss SFX</value>
		</property>
		<property name="volume">
			<value>-3.5</value>
		</property>
		<relationship name="effectChain">
			<destination>{chain}</destination>
		</relationship>
		<relationship name="output">
			<destination>{master}</destination>
		</relationship>
	</object>
	<object class="MixerBusEffectChain" id="{chain}">
		<relationship name="effects">
			<destination>{fader}</destination>
		</relationship>
	</object>
	<object class="MixerBusFader" id="{fader}" />
</objects>
"#;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    #[test]
    fn parses_multiple_objects() {
        let doc = parse_document(BUS_DOC).unwrap();
        assert_eq!(doc.objects.len(), 3);
        assert_eq!(doc.objects[0].class, ObjectClass::MixerGroup);
        assert_eq!(doc.objects[0].name(), Some("Boss SFX"));
        assert_eq!(doc.objects[0].property("volume"), Some("-3.5"));
        assert_eq!(doc.objects[0].edge("output"), &[id("{master}")]);
        assert_eq!(doc.objects[2].class, ObjectClass::MixerBusFader);
        assert!(doc.objects[2].edges.is_empty());
    }

    #[test]
    fn preserves_property_and_edge_order() {
        let doc = parse_document(BUS_DOC).unwrap();
        let bus = &doc.objects[0];
        let props: Vec<&str> = bus.properties.keys().map(String::as_str).collect();
        let edges: Vec<&str> = bus.edges.keys().map(String::as_str).collect();
        assert_eq!(props, vec!["name", "volume"]);
        assert_eq!(edges, vec!["effectChain", "output"]);
    }

    #[test]
    fn write_then_parse_preserves_content() {
        let doc = parse_document(BUS_DOC).unwrap();
        let written = write_document(&doc).unwrap();
        let reparsed = parse_document(&written).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let obj = GraphObject::new(id("E1"), ObjectClass::Event)
            .with_property("name", "Fire <big> & \"loud\"");
        let doc = ObjectDocument::new(SerializationModel::new("Studio.02.01.00").unwrap(), vec![obj]);
        let xml = write_document(&doc).unwrap();
        assert!(xml.contains("&lt;big&gt;"));
        let parsed = parse_document(&xml).unwrap();
        assert_eq!(parsed.objects[0].name(), Some("Fire <big> & \"loud\""));
    }

    #[test]
    fn values_keep_surrounding_whitespace() {
        let xml = r#"<objects serializationModel="Studio.02.02.00">
            <object class="Event" id="E">
                <property name="note"><value>  padded text </value></property>
                <relationship name="folder">
                    <destination> {F} </destination>
                </relationship>
            </object>
        </objects>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.objects[0].property("note"), Some("  padded text "));
        assert_eq!(doc.objects[0].edge("folder"), &[id("{F}")]);

        let reparsed = parse_document(&write_document(&doc).unwrap()).unwrap();
        assert_eq!(reparsed.objects[0].property("note"), Some("  padded text "));
    }

    #[test]
    fn empty_value_and_relationship() {
        let xml = r#"<objects serializationModel="Studio.02.02.00">
            <object class="Event" id="E">
                <property name="note"><value/></property>
                <relationship name="tags"/>
            </object>
        </objects>"#;
        let doc = parse_document(xml).unwrap();
        let event = &doc.objects[0];
        assert_eq!(event.property("note"), Some(""));
        assert!(event.has_edge("tags"));
        assert!(event.edge("tags").is_empty());
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<objects serializationModel="Studio.02.02.00">
            <object class="Sound" id="S">
                <comment>ignored</comment>
                <property name="x"><value>1</value></property>
            </object>
        </objects>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.objects[0].class, ObjectClass::Other("Sound".into()));
        assert_eq!(doc.objects[0].property("x"), Some("1"));
    }

    #[test]
    fn missing_model_is_malformed() {
        let err = parse_document("<objects><object class=\"A\" id=\"x\"/></objects>").unwrap_err();
        assert!(matches!(err, XmlError::Malformed { .. }));
    }

    #[test]
    fn invalid_model_is_rejected() {
        let err = parse_document(r#"<objects serializationModel="v2"/>"#).unwrap_err();
        assert!(matches!(err, XmlError::InvalidValue(_)));
    }

    #[test]
    fn missing_id_is_malformed() {
        let xml = r#"<objects serializationModel="Studio.02.02.00"><object class="Bank"/></objects>"#;
        let err = parse_document(xml).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn broken_xml_is_syntax_error() {
        let err = parse_document(r#"<objects serializationModel="Studio.02.02.00"><object"#)
            .unwrap_err();
        assert!(matches!(err, XmlError::Syntax(_) | XmlError::Malformed { .. }));
    }

    #[test]
    fn document_lookup_helpers() {
        let doc = parse_document(BUS_DOC).unwrap();
        assert!(doc.find(&id("{chain}")).is_some());
        assert!(doc.first_of(&ObjectClass::MixerBusFader).is_some());
        assert_eq!(doc.all_of(&ObjectClass::MixerGroup).count(), 1);
    }
}
