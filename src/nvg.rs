//! NVG (NATO Vector Graphics) output document model.

use std::io::{BufRead, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::error::{TranscodeError, TranscodeResult};
use crate::model::Point;

/// Default namespace of NVG documents
pub const NVG_NAMESPACE: &str = "https://tide.act.nato.int/schemas/2012/10/nvg";
/// Namespace bound to the `g` prefix
pub const G_NAMESPACE: &str = "https://tide.assct.nato.int/schemas/2012/10/nvg";
/// Dublin Core terms, bound to the `nt` prefix
pub const DC_TERMS_NAMESPACE: &str = "http://purl.org/dc/terms/";
/// NVG schema version written on the root element
pub const NVG_VERSION: &str = "2.0.2";

pub const ROOT_ELEMENT: &str = "nvg";
pub const POINT_ELEMENT: &str = "point";

const INDENT_SIZE: usize = 2;

/// A namespace declaration on the root element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBinding {
    /// `None` for the default namespace
    pub prefix: Option<String>,
    pub uri: String,
}

impl NamespaceBinding {
    fn attribute_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        }
    }
}

/// The fixed namespace bindings of every NVG document
pub fn standard_namespaces() -> Vec<NamespaceBinding> {
    vec![
        NamespaceBinding {
            prefix: None,
            uri: NVG_NAMESPACE.to_string(),
        },
        NamespaceBinding {
            prefix: Some("g".to_string()),
            uri: G_NAMESPACE.to_string(),
        },
        NamespaceBinding {
            prefix: Some("nt".to_string()),
            uri: DC_TERMS_NAMESPACE.to_string(),
        },
    ]
}

/// NVG point geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NvgPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for NvgPoint {
    fn from(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

/// A child of the NVG root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputNode {
    Point(NvgPoint),
}

/// In-memory NVG document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NvgDocument {
    version: String,
    namespaces: Vec<NamespaceBinding>,
    children: Vec<OutputNode>,
}

impl Default for NvgDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl NvgDocument {
    /// Empty document with the fixed version and namespace bindings already set
    pub fn new() -> Self {
        Self {
            version: NVG_VERSION.to_string(),
            namespaces: standard_namespaces(),
            children: Vec::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn namespaces(&self) -> &[NamespaceBinding] {
        &self.namespaces
    }

    pub fn children(&self) -> &[OutputNode] {
        &self.children
    }

    pub fn push(&mut self, node: OutputNode) {
        self.children.push(node);
    }

    /// Points of the document in order
    pub fn points(&self) -> Vec<NvgPoint> {
        self.children
            .iter()
            .map(|node| match node {
                OutputNode::Point(p) => *p,
            })
            .collect()
    }

    /// Marshal the complete document
    pub fn write_to<W: Write>(&self, sink: W) -> TranscodeResult<()> {
        let mut writer = Writer::new_with_indent(sink, b' ', INDENT_SIZE);
        write_prolog(&mut writer, self)?;
        for node in &self.children {
            write_node(&mut writer, node)?;
        }
        write_epilog(&mut writer)?;
        writer.get_mut().flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> TranscodeResult<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TranscodeError::structure(e.to_string()))
    }

    /// Read an NVG document back. Only the root attributes and point nodes are
    /// recognised; other content is skipped.
    pub fn read_from<R: BufRead>(source: R) -> TranscodeResult<Self> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut document = NvgDocument {
            version: String::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        };
        let mut seen_root = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    match e.local_name().as_ref() {
                        b"nvg" if !seen_root => {
                            seen_root = true;
                            read_root_attributes(e, &mut document)?;
                        }
                        b"point" => document.children.push(read_point(e)?),
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(TranscodeError::EmptyDocument);
        }
        Ok(document)
    }

    pub(crate) fn root_start(&self) -> BytesStart<'static> {
        let mut root = BytesStart::new(ROOT_ELEMENT);
        for binding in &self.namespaces {
            root.push_attribute((binding.attribute_name().as_str(), binding.uri.as_str()));
        }
        root.push_attribute(("version", self.version.as_str()));
        root
    }
}

/// XML declaration and root start tag
pub(crate) fn write_prolog<W: Write>(
    writer: &mut Writer<W>,
    document: &NvgDocument,
) -> TranscodeResult<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(document.root_start()))?;
    Ok(())
}

pub(crate) fn write_node<W: Write>(
    writer: &mut Writer<W>,
    node: &OutputNode,
) -> TranscodeResult<()> {
    match node {
        OutputNode::Point(point) => {
            let mut elem = BytesStart::new(POINT_ELEMENT);
            elem.push_attribute(("x", point.x.to_string().as_str()));
            elem.push_attribute(("y", point.y.to_string().as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
    }
    Ok(())
}

pub(crate) fn write_epilog<W: Write>(writer: &mut Writer<W>) -> TranscodeResult<()> {
    writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    Ok(())
}

fn read_root_attributes(e: &BytesStart, document: &mut NvgDocument) -> TranscodeResult<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| TranscodeError::Xml(quick_xml::Error::from(e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();

        if key == "version" {
            document.version = value;
        } else if key == "xmlns" {
            document.namespaces.push(NamespaceBinding {
                prefix: None,
                uri: value,
            });
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            document.namespaces.push(NamespaceBinding {
                prefix: Some(prefix.to_string()),
                uri: value,
            });
        }
    }
    Ok(())
}

fn read_point(e: &BytesStart) -> TranscodeResult<OutputNode> {
    let mut point = NvgPoint { x: 0.0, y: 0.0 };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| TranscodeError::Xml(quick_xml::Error::from(e)))?;
        let value = attr.unescape_value()?;
        let target = match attr.key.local_name().as_ref() {
            b"x" => &mut point.x,
            b"y" => &mut point.y,
            _ => continue,
        };
        *target = value.trim().parse().map_err(|_| {
            TranscodeError::structure(format!("invalid point coordinate '{}'", value))
        })?;
    }
    Ok(OutputNode::Point(point))
}
