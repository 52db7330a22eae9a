//! Symbol descriptors embedded in records as escaped XML text.
//!
//! A MILXLY record stores its symbol as an XML fragment inside character
//! data, for example
//! `&lt;Symbol ID="SFGPUCI----D"/&gt;&lt;Attribute ID="color"&gt;red&lt;/Attribute&gt;`.
//! Only `&lt;`, `&gt;` and `&amp;` are unescaped before the fragment is parsed;
//! any other entity reaches the XML parser untouched.

use std::collections::BTreeMap;
use std::fmt;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::DescriptorError;

const COMPONENT: &str = "symbol";

/// Decoded symbol descriptor of one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    /// Symbology code taken from the `Symbol` element's `ID`
    pub code: Option<String>,
    /// Named attributes, last write wins on duplicate keys
    pub attributes: BTreeMap<String, String>,
}

impl SymbolDescriptor {
    /// Render the attributes as `key:value` pairs joined by `;`
    pub fn attributes_string(&self) -> String {
        self.attributes
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for SymbolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.attributes_string())
    }
}

/// Replace the three recognised entities, in this order.
pub fn unescape_fragment(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Structured parser for descriptor fragments
pub struct SymbolDescriptorParser<'d> {
    diagnostics: &'d dyn Diagnostics,
}

impl<'d> SymbolDescriptorParser<'d> {
    pub fn new(diagnostics: &'d dyn Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn parse(&self, escaped: &str) -> Result<SymbolDescriptor, DescriptorError> {
        let fragment = unescape_fragment(escaped);
        let mut reader = Reader::from_str(&fragment);
        reader.config_mut().expand_empty_elements = true;

        let mut descriptor = SymbolDescriptor::default();
        let mut open: Vec<String> = Vec::new();
        // Key and collected text of the Attribute element being read
        let mut pending: Option<(Option<String>, String)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let name = local_name(e);

                    if let Some(parent) = open.last()
                        && pending.is_some()
                    {
                        return Err(DescriptorError::NestedElement {
                            parent: parent.clone(),
                            child: name,
                        });
                    }

                    match name.as_str() {
                        "Symbol" => {
                            if let Some(id) = id_attribute(e)? {
                                descriptor.code = Some(id);
                            }
                        }
                        "Attribute" => {
                            pending = Some((id_attribute(e)?, String::new()));
                        }
                        other => {
                            self.diagnostics.warn(
                                COMPONENT,
                                format!("Unknown element in symbol descriptor: {}", other),
                            );
                        }
                    }
                    open.push(name);
                }
                Event::Text(ref t) => {
                    if let Some((_, ref mut text)) = pending {
                        match t.unescape() {
                            Ok(value) => text.push_str(&value),
                            Err(_) => text.push_str(&String::from_utf8_lossy(t)),
                        }
                    }
                }
                Event::CData(ref c) => {
                    if let Some((_, ref mut text)) = pending {
                        text.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::End(_) => {
                    let closed = open.pop();
                    if closed.as_deref() == Some("Attribute")
                        && let Some((key, value)) = pending.take()
                    {
                        match key {
                            Some(key) => {
                                descriptor.attributes.insert(key, value);
                            }
                            None => self.diagnostics.warn(
                                COMPONENT,
                                "Attribute element without ID ignored".to_string(),
                            ),
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(element) = open.pop() {
            return Err(DescriptorError::Unclosed { element });
        }

        Ok(descriptor)
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn id_attribute(e: &BytesStart) -> Result<Option<String>, DescriptorError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == b"ID" {
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            return Ok(Some(value));
        }
    }
    Ok(None)
}
