//! Lazy structural events over an XML byte stream.
//!
//! [`EventCursor`] pulls events from quick-xml one at a time and turns them
//! into owned [`StructuralEvent`] tokens. Element names are reduced to their
//! local part, so namespace prefixes never influence record recognition.
//! Empty elements are expanded into a start and an end event.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{TranscodeError, TranscodeResult};

/// One token of the structural parse
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralEvent {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Text(String),
}

impl StructuralEvent {
    /// Local name of a start or end event
    pub fn name(&self) -> Option<&str> {
        match self {
            StructuralEvent::Start { name, .. } | StructuralEvent::End { name } => Some(name),
            StructuralEvent::Text(_) => None,
        }
    }

    pub fn is_start_of(&self, element: &str) -> bool {
        matches!(self, StructuralEvent::Start { name, .. } if name == element)
    }

    pub fn is_end_of(&self, element: &str) -> bool {
        matches!(self, StructuralEvent::End { name } if name == element)
    }

    /// Value of an attribute (matched on local name) of a start event
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            StructuralEvent::Start { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            StructuralEvent::Start { name, .. } => format!("<{}>", name),
            StructuralEvent::End { name } => format!("</{}>", name),
            StructuralEvent::Text(_) => "text".to_string(),
        }
    }
}

/// Forward-only cursor producing structural events from a byte stream
pub struct EventCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<String>,
    seen_root: bool,
    finished: bool,
}

impl<R: BufRead> EventCursor<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.trim_text(true);
        config.expand_empty_elements = true;

        Self {
            reader,
            buf: Vec::new(),
            open: Vec::new(),
            seen_root: false,
            finished: false,
        }
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Pull the next structural event, `None` once the document is exhausted.
    ///
    /// Fails when the XML is malformed, when the input ends inside an open
    /// element, or when the document has no root element at all.
    pub fn next_event(&mut self) -> TranscodeResult<Option<StructuralEvent>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.finished = true;
                    return Err(TranscodeError::Xml(e));
                }
            };

            match event {
                Event::Start(ref e) => {
                    let token = start_event(e)?;
                    if let StructuralEvent::Start { ref name, .. } = token {
                        self.open.push(name.clone());
                    }
                    self.seen_root = true;
                    return Ok(Some(token));
                }
                Event::End(ref e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.open.pop();
                    return Ok(Some(StructuralEvent::End { name }));
                }
                Event::Text(ref t) => {
                    let text = t.unescape()?.into_owned();
                    if !text.is_empty() {
                        return Ok(Some(StructuralEvent::Text(text)));
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    return Ok(Some(StructuralEvent::Text(text)));
                }
                Event::Eof => {
                    self.finished = true;
                    if let Some(open) = self.open.last() {
                        return Err(TranscodeError::structure(format!(
                            "unexpected end of input inside <{}>",
                            open
                        )));
                    }
                    if !self.seen_root {
                        return Err(TranscodeError::EmptyDocument);
                    }
                    return Ok(None);
                }
                // Declarations, comments, processing instructions and doctypes
                // carry no structure for the transcoder
                _ => {}
            }
        }
    }

    /// Collect the complete sub-tree opened by `start`, which must be the
    /// event most recently returned by [`next_event`](Self::next_event).
    ///
    /// The returned tokens begin with `start` and end with its matching end
    /// event; the cursor is left just past that end event.
    pub fn read_subtree(
        &mut self,
        start: StructuralEvent,
    ) -> TranscodeResult<Vec<StructuralEvent>> {
        if !matches!(start, StructuralEvent::Start { .. }) {
            return Err(TranscodeError::structure(format!(
                "sub-tree must begin with a start event, found {}",
                start.describe()
            )));
        }

        let target_depth = self.depth().saturating_sub(1);
        let mut events = vec![start];

        while self.depth() > target_depth {
            match self.next_event()? {
                Some(event) => events.push(event),
                None => {
                    return Err(TranscodeError::structure(
                        "input ended before the element was closed",
                    ));
                }
            }
        }

        Ok(events)
    }
}

impl<R: BufRead> Iterator for EventCursor<R> {
    type Item = TranscodeResult<StructuralEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

fn start_event(e: &BytesStart) -> TranscodeResult<StructuralEvent> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|e| TranscodeError::Xml(quick_xml::Error::from(e)))?;
        // Namespace declarations are not data
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(StructuralEvent::Start { name, attributes })
}
