//! Output emitters assembling the NVG document.
//!
//! The root element's attributes and namespace declarations must be written
//! before the set of children is known. [`BufferedEmitter`] builds the whole
//! [`NvgDocument`] and marshals it once at the end; [`IncrementalEmitter`]
//! writes the root start tag up front and each node as soon as it arrives.
//! Both produce the same logical document.

use std::io::Write;

use clap::ValueEnum;
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{TranscodeError, TranscodeResult};
use crate::nvg::{self, NvgDocument, OutputNode};

/// Output assembly strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmitStrategy {
    /// Build the document in memory, write it once at the end
    #[default]
    Buffered,
    /// Write each node as soon as it is produced
    Incremental,
}

/// Destination of mapped output nodes
pub trait OutputEmitter {
    /// Called once before any node
    fn begin(&mut self) -> TranscodeResult<()>;

    fn emit(&mut self, node: OutputNode) -> TranscodeResult<()>;

    /// Complete the document and flush the destination
    fn finish(&mut self) -> TranscodeResult<()>;
}

/// Build-then-marshal emitter
pub struct BufferedEmitter<W: Write> {
    document: NvgDocument,
    sink: W,
    finished: bool,
}

impl<W: Write> BufferedEmitter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            document: NvgDocument::new(),
            sink,
            finished: false,
        }
    }

    /// The document assembled so far
    pub fn document(&self) -> &NvgDocument {
        &self.document
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> OutputEmitter for BufferedEmitter<W> {
    fn begin(&mut self) -> TranscodeResult<()> {
        Ok(())
    }

    fn emit(&mut self, node: OutputNode) -> TranscodeResult<()> {
        if self.finished {
            return Err(TranscodeError::structure("node emitted after finish"));
        }
        self.document.push(node);
        Ok(())
    }

    fn finish(&mut self) -> TranscodeResult<()> {
        if self.finished {
            return Ok(());
        }
        self.document.write_to(&mut self.sink)?;
        self.finished = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Open,
    Closed,
}

/// Event-writing emitter
pub struct IncrementalEmitter<W: Write> {
    writer: Writer<W>,
    state: WriteState,
    written: usize,
}

impl<W: Write> IncrementalEmitter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: Writer::new_with_indent(sink, b' ', 2),
            state: WriteState::Idle,
            written: 0,
        }
    }

    /// Number of nodes written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> OutputEmitter for IncrementalEmitter<W> {
    fn begin(&mut self) -> TranscodeResult<()> {
        if self.state != WriteState::Idle {
            return Ok(());
        }
        nvg::write_prolog(&mut self.writer, &NvgDocument::new())?;
        self.state = WriteState::Open;
        Ok(())
    }

    fn emit(&mut self, node: OutputNode) -> TranscodeResult<()> {
        match self.state {
            WriteState::Idle => self.begin()?,
            WriteState::Open => {}
            WriteState::Closed => {
                return Err(TranscodeError::structure("node emitted after finish"));
            }
        }
        nvg::write_node(&mut self.writer, &node)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> TranscodeResult<()> {
        match self.state {
            WriteState::Idle => self.begin()?,
            WriteState::Open => {}
            WriteState::Closed => return Ok(()),
        }
        nvg::write_epilog(&mut self.writer)?;
        self.writer.get_mut().flush()?;
        self.state = WriteState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvg::NvgPoint;

    fn nodes() -> Vec<OutputNode> {
        vec![
            OutputNode::Point(NvgPoint { x: 1.0, y: 2.0 }),
            OutputNode::Point(NvgPoint { x: 3.5, y: -4.0 }),
        ]
    }

    fn run<E: OutputEmitter>(emitter: &mut E, nodes: Vec<OutputNode>) {
        emitter.begin().unwrap();
        for node in nodes {
            emitter.emit(node).unwrap();
        }
        emitter.finish().unwrap();
    }

    #[test]
    fn test_buffered_emitter_document_is_inspectable() {
        let mut emitter = BufferedEmitter::new(Vec::new());
        emitter.begin().unwrap();
        emitter.emit(nodes()[0].clone()).unwrap();

        assert_eq!(emitter.document().children().len(), 1);
        assert_eq!(emitter.document().namespaces().len(), 3);
    }

    #[test]
    fn test_strategies_produce_same_document() {
        let mut buffered = BufferedEmitter::new(Vec::new());
        run(&mut buffered, nodes());
        let mut incremental = IncrementalEmitter::new(Vec::new());
        run(&mut incremental, nodes());

        let a = NvgDocument::read_from(&buffered.into_inner()[..]).unwrap();
        let b = NvgDocument::read_from(&incremental.into_inner()[..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.children().len(), 2);
    }

    #[test]
    fn test_incremental_without_nodes_is_valid_document() {
        let mut emitter = IncrementalEmitter::new(Vec::new());
        run(&mut emitter, vec![]);

        let document = NvgDocument::read_from(&emitter.into_inner()[..]).unwrap();
        assert_eq!(document, NvgDocument::new());
    }

    #[test]
    fn test_incremental_finish_without_begin() {
        let mut emitter = IncrementalEmitter::new(Vec::new());
        emitter.finish().unwrap();
        let xml = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(xml.contains("<nvg"));
        assert!(xml.contains("</nvg>"));
    }

    #[test]
    fn test_emit_after_finish_is_rejected() {
        let mut incremental = IncrementalEmitter::new(Vec::new());
        run(&mut incremental, vec![]);
        assert!(incremental.emit(nodes()[0].clone()).is_err());
        assert_eq!(incremental.written(), 0);

        let mut buffered = BufferedEmitter::new(Vec::new());
        run(&mut buffered, vec![]);
        assert!(buffered.emit(nodes()[0].clone()).is_err());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(
            serde_json::to_string(&EmitStrategy::Incremental).unwrap(),
            "\"incremental\""
        );
        assert_eq!(EmitStrategy::default(), EmitStrategy::Buffered);
    }
}
