//! Owned XML document tree over quick-xml.
//!
//! quick-xml is event-based; the modifier needs to detach, re-group, and
//! re-insert whole elements, so this module materializes the event stream
//! into a small owned tree and serializes it back through `quick_xml::Writer`.
//! The tree is exclusively owned by whoever parsed it — detaching a node
//! moves it out, so there are no aliasing hazards to guard against.
//!
//! Whitespace-only text is dropped at parse time and the writer re-indents,
//! which is what makes the output layout deterministic regardless of how the
//! input was formatted.

use std::io::Cursor;

use anyhow::Result;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(String),

    #[error("document has no root element")]
    MissingRoot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// One element: name, attributes in document order, children in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute_name, _)| attribute_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replace an existing attribute value, or append the attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(attribute_name, _)| attribute_name == name)
        {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Concatenated direct text and CDATA content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
                _ => {}
            }
        }
        out
    }

    /// Replace all children with a single text node (none when `text` is empty).
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    /// Direct child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children
            .iter()
            .filter_map(XmlNode::as_element)
            .filter(move |element| element.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .filter(move |element| element.name == name)
    }

    /// Detach and return every direct child element with the given name.
    ///
    /// Children that were never attached simply cannot appear here, so the
    /// "skip already-detached" rule of the mutation contract is vacuous —
    /// detaching is a move.
    pub fn take_children_named(&mut self, name: &str) -> Vec<XmlElement> {
        let mut taken = Vec::new();
        let mut index = 0;

        while index < self.children.len() {
            let matches =
                matches!(&self.children[index], XmlNode::Element(element) if element.name == name);

            if matches {
                if let XmlNode::Element(element) = self.children.remove(index) {
                    taken.push(element);
                }
            } else {
                index += 1;
            }
        }

        taken
    }

    /// Detach and return every direct child element, regardless of name.
    pub fn take_child_elements(&mut self) -> Vec<XmlElement> {
        let mut taken = Vec::new();
        let mut index = 0;

        while index < self.children.len() {
            if matches!(&self.children[index], XmlNode::Element(_)) {
                if let XmlNode::Element(element) = self.children.remove(index) {
                    taken.push(element);
                }
            } else {
                index += 1;
            }
        }

        taken
    }

    /// Index (into `children`) of the last direct child element with the
    /// given name.
    pub fn last_child_index_named(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                matches!(node, XmlNode::Element(element) if element.name == name)
            })
            .map(|(index, _)| index)
            .last()
    }

    pub fn has_no_attributes(&self) -> bool {
        self.attributes.is_empty()
    }

    /// No attributes and no child elements. Text-only containers count as
    /// empty; they carry nothing the build tool reads.
    pub fn is_empty_element(&self) -> bool {
        self.has_no_attributes() && !self.children.iter().any(|c| c.as_element().is_some())
    }
}

/// Build a fresh element wrapping `items` in document order.
pub fn create_element_with_items(name: &str, items: Vec<XmlElement>) -> XmlElement {
    let mut element = XmlElement::new(name);
    element
        .children
        .extend(items.into_iter().map(XmlNode::Element));
    element
}

/// A parsed document: nodes before the root, the root element, nodes after.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prologue: Vec<XmlNode>,
    pub root: XmlElement,
    pub epilogue: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn parse(content: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(content);

        let mut prologue = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut epilogue = Vec::new();
        let mut open_elements: Vec<XmlElement> = Vec::new();

        // Attach a completed node to its parent, or to the document level.
        fn attach(
            node: XmlNode,
            open_elements: &mut [XmlElement],
            root: &mut Option<XmlElement>,
            prologue: &mut Vec<XmlNode>,
            epilogue: &mut Vec<XmlNode>,
        ) {
            if let Some(parent) = open_elements.last_mut() {
                parent.children.push(node);
            } else if root.is_none() {
                if let XmlNode::Element(element) = node {
                    *root = Some(element);
                } else {
                    prologue.push(node);
                }
            } else {
                epilogue.push(node);
            }
        }

        loop {
            match reader.read_event()? {
                Event::Decl(_) => {
                    // The serializer always writes its own UTF-8 declaration.
                }
                Event::Start(start) => {
                    open_elements.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(
                        XmlNode::Element(element),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::End(_) => {
                    // quick-xml verifies tag nesting, so the stack is never empty here.
                    let element = open_elements.pop().expect("end event without start");
                    attach(
                        XmlNode::Element(element),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if !text.trim().is_empty() {
                        attach(
                            XmlNode::Text(text.into_owned()),
                            &mut open_elements,
                            &mut root,
                            &mut prologue,
                            &mut epilogue,
                        );
                    }
                }
                Event::CData(data) => {
                    let data = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    attach(
                        XmlNode::CData(data),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::Comment(comment) => {
                    let comment = String::from_utf8_lossy(&comment).into_owned();
                    attach(
                        XmlNode::Comment(comment),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::PI(instruction) => {
                    let instruction = String::from_utf8_lossy(&instruction).into_owned();
                    attach(
                        XmlNode::ProcessingInstruction(instruction),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::DocType(doctype) => {
                    let doctype = String::from_utf8_lossy(&doctype).into_owned();
                    attach(
                        XmlNode::DocType(doctype),
                        &mut open_elements,
                        &mut root,
                        &mut prologue,
                        &mut epilogue,
                    );
                }
                Event::Eof => break,
            }
        }

        match root {
            Some(root) => Ok(Self {
                prologue,
                root,
                epilogue,
            }),
            None => Err(XmlError::MissingRoot),
        }
    }

    /// Serialize with a UTF-8 declaration and two-space indentation,
    /// regardless of the host platform's default text encoding.
    pub fn to_string_utf8(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        for node in &self.prologue {
            write_node(&mut writer, node)?;
        }

        write_element(&mut writer, &self.root)?;

        for node in &self.epilogue {
            write_node(&mut writer, node)?;
        }

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|error| XmlError::Attribute(error.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    }

    Ok(())
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    match node {
        XmlNode::Element(element) => write_element(writer, element)?,
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        XmlNode::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
        // Comments and PI bodies are stored verbatim; they are not entity-escaped.
        XmlNode::Comment(comment) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
        }
        XmlNode::ProcessingInstruction(instruction) => {
            writer.write_event(Event::PI(BytesText::from_escaped(instruction.as_str())))?
        }
        XmlNode::DocType(doctype) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elements_attributes_and_text() {
        let document = XmlDocument::parse(
            r#"<Project xmlns="ns"><ItemGroup><Compile Include="A.cs"/><Version>1.2.3</Version></ItemGroup></Project>"#,
        )
        .unwrap();

        assert_eq!(document.root.name, "Project");
        assert_eq!(document.root.attribute("xmlns"), Some("ns"));

        let group = document.root.children_named("ItemGroup").next().unwrap();
        let compile = group.children_named("Compile").next().unwrap();
        assert_eq!(compile.attribute("Include"), Some("A.cs"));

        let version = group.children_named("Version").next().unwrap();
        assert_eq!(version.text(), "1.2.3");
    }

    #[test]
    fn drops_whitespace_only_text_but_keeps_significant_text() {
        let document = XmlDocument::parse(
            "<Project>\n  <HintPath>\\lib\\a.dll</HintPath>\n</Project>",
        )
        .unwrap();

        assert_eq!(document.root.children.len(), 1);
        let hint_path = document.root.children_named("HintPath").next().unwrap();
        assert_eq!(hint_path.text(), "\\lib\\a.dll");
    }

    #[test]
    fn preserves_document_level_comments() {
        let document =
            XmlDocument::parse("<!--before--><Project/><!--after-->").unwrap();

        assert_eq!(
            document.prologue,
            vec![XmlNode::Comment("before".to_string())]
        );
        assert_eq!(
            document.epilogue,
            vec![XmlNode::Comment("after".to_string())]
        );

        let output = document.to_string_utf8().unwrap();
        assert!(output.contains("<!--before-->"));
        assert!(output.contains("<!--after-->"));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(XmlDocument::parse("<Project><Open></Project>").is_err());
        assert!(matches!(
            XmlDocument::parse("  \n "),
            Err(XmlError::MissingRoot)
        ));
    }

    #[test]
    fn serializes_with_utf8_declaration_and_indentation() {
        let document = XmlDocument::parse(
            r#"<?xml version="1.0" encoding="Windows-1252"?><Project><ItemGroup><Compile Include="A.cs"/></ItemGroup></Project>"#,
        )
        .unwrap();

        let output = document.to_string_utf8().unwrap();
        assert!(output.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(output.contains("\n  <ItemGroup>"));
        assert!(output.contains("\n    <Compile Include=\"A.cs\"/>"));
    }

    #[test]
    fn escaped_content_round_trips() {
        let input = r#"<Project><Compile Include="A&amp;B.cs"/><Defines>X&lt;Y</Defines></Project>"#;
        let document = XmlDocument::parse(input).unwrap();

        let compile = document.root.children_named("Compile").next().unwrap();
        assert_eq!(compile.attribute("Include"), Some("A&B.cs"));
        assert_eq!(
            document.root.children_named("Defines").next().unwrap().text(),
            "X<Y"
        );

        let output = document.to_string_utf8().unwrap();
        assert!(output.contains("A&amp;B.cs"));
        assert!(output.contains("X&lt;Y"));
    }

    #[test]
    fn take_children_named_detaches_only_matches() {
        let mut document = XmlDocument::parse(
            r#"<Group><Compile Include="b.cs"/><Reference Include="R"/><Compile Include="a.cs"/></Group>"#,
        )
        .unwrap();

        let compiles = document.root.take_children_named("Compile");
        assert_eq!(compiles.len(), 2);
        assert_eq!(compiles[0].attribute("Include"), Some("b.cs"));
        assert_eq!(compiles[1].attribute("Include"), Some("a.cs"));

        assert_eq!(document.root.children.len(), 1);
        assert!(document.root.children_named("Reference").next().is_some());

        // A second pass finds nothing left to detach.
        assert!(document.root.take_children_named("Compile").is_empty());
    }

    #[test]
    fn empty_element_predicates() {
        let document = XmlDocument::parse(
            r#"<Project><ItemGroup/><ItemGroup Label="x"/><ItemGroup><Compile Include="A.cs"/></ItemGroup><ItemGroup>  stray  </ItemGroup></Project>"#,
        )
        .unwrap();

        let groups: Vec<&XmlElement> = document.root.children_named("ItemGroup").collect();
        assert!(groups[0].is_empty_element());
        assert!(!groups[1].is_empty_element());
        assert!(!groups[1].has_no_attributes());
        assert!(!groups[2].is_empty_element());
        assert!(groups[3].is_empty_element());
    }

    #[test]
    fn create_element_with_items_keeps_order() {
        let element = create_element_with_items(
            "ItemGroup",
            vec![
                XmlElement::new("Compile").with_attribute("Include", "a.cs"),
                XmlElement::new("Compile").with_attribute("Include", "b.cs"),
            ],
        );

        let includes: Vec<&str> = element
            .children_named("Compile")
            .filter_map(|child| child.attribute("Include"))
            .collect();
        assert_eq!(includes, ["a.cs", "b.cs"]);
    }

    #[test]
    fn last_child_index_named_finds_final_occurrence() {
        let document = XmlDocument::parse(
            r#"<Project><PropertyGroup/><ItemGroup/><PropertyGroup/></Project>"#,
        )
        .unwrap();

        assert_eq!(document.root.last_child_index_named("PropertyGroup"), Some(2));
        assert_eq!(document.root.last_child_index_named("ItemGroup"), Some(1));
        assert_eq!(document.root.last_child_index_named("Target"), None);
    }
}
