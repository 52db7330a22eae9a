//! Typed representation of MILXLY records.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::DescriptorError;
use crate::symbol::{SymbolDescriptor, SymbolDescriptorParser};

/// X value used when a source point has no X
///
/// Inherited from the MILXLY object model, where it looks like a leftover
/// placeholder rather than a domain default. Kept for output compatibility.
pub const DEFAULT_X: f64 = 1.0;

/// Y value used when a source point has no Y
pub const DEFAULT_Y: f64 = 0.0;

/// A 2-D point as found in a record's point list. No unit conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            x: DEFAULT_X,
            y: DEFAULT_Y,
        }
    }
}

/// One decoded `MilXGraphic` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordModel {
    /// Raw (still entity-escaped) symbol descriptor text
    pub descriptor: Option<String>,
    /// Points in source order
    pub points: Vec<Point>,
}

impl RecordModel {
    pub fn new(descriptor: Option<String>, points: Vec<Point>) -> Self {
        Self {
            descriptor: descriptor.filter(|d| !d.is_empty()),
            points,
        }
    }

    pub fn first_point(&self) -> Option<&Point> {
        self.points.first()
    }

    /// Parse the embedded symbol descriptor.
    ///
    /// Returns `None` when the record carries no descriptor text.
    pub fn symbol_descriptor(
        &self,
        diagnostics: &dyn Diagnostics,
    ) -> Option<Result<SymbolDescriptor, DescriptorError>> {
        self.descriptor
            .as_deref()
            .map(|text| SymbolDescriptorParser::new(diagnostics).parse(text))
    }
}
