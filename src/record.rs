//! Decoding of one `MilXGraphic` sub-tree into a [`RecordModel`].
//!
//! Recognised layout, unknown children are ignored at every level:
//!
//! ```text
//! <MilXGraphic>
//!   <MssStringXML>escaped symbol fragment</MssStringXML>
//!   <PointList>
//!     <Point><X>8.51</X><Y>47.32</Y></Point>
//!     <Point X="8.52" Y="47.33"/>
//!   </PointList>
//! </MilXGraphic>
//! ```
//!
//! A coordinate given as a child element overrides the same coordinate given
//! as an attribute. Missing or empty coordinates fall back to
//! [`DEFAULT_X`](crate::model::DEFAULT_X) / [`DEFAULT_Y`](crate::model::DEFAULT_Y).

use crate::error::RecordError;
use crate::events::StructuralEvent;
use crate::model::{Point, RecordModel};

/// Element name of a record in MILXLY documents
pub const RECORD_ELEMENT: &str = "MilXGraphic";

const DESCRIPTOR_ELEMENT: &str = "MssStringXML";
const POINT_LIST_ELEMENT: &str = "PointList";
const POINT_ELEMENT: &str = "Point";

/// Where the decoder currently is inside the record
enum Field {
    Descriptor,
    Coordinate(char),
    Other,
}

struct PointBuilder {
    index: usize,
    x: Option<String>,
    y: Option<String>,
}

impl PointBuilder {
    fn from_attributes(index: usize, start: &StructuralEvent) -> Self {
        Self {
            index,
            x: start.attribute("X").map(str::to_string),
            y: start.attribute("Y").map(str::to_string),
        }
    }

    fn build(self) -> Result<Point, RecordError> {
        let mut point = Point::default();
        if let Some(x) = parse_coordinate('X', self.x.as_deref(), self.index)? {
            point.x = x;
        }
        if let Some(y) = parse_coordinate('Y', self.y.as_deref(), self.index)? {
            point.y = y;
        }
        Ok(point)
    }
}

fn parse_coordinate(
    axis: char,
    value: Option<&str>,
    point: usize,
) -> Result<Option<f64>, RecordError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => match text.parse::<f64>() {
            // NaN and infinities have no place on a map
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(RecordError::InvalidCoordinate {
                axis,
                value: text.to_string(),
                point,
            }),
        },
    }
}

/// Decode the complete token sequence of one record element.
///
/// `events` must start with the record's start event and end with its end
/// event, as produced by
/// [`EventCursor::read_subtree`](crate::events::EventCursor::read_subtree).
pub fn decode_record(
    events: &[StructuralEvent],
    element: &str,
) -> Result<RecordModel, RecordError> {
    let rest = match events.split_first() {
        Some((first, rest)) if first.is_start_of(element) => rest,
        Some((first, _)) => {
            return Err(RecordError::NotARecord {
                expected: element.to_string(),
                found: first.name().unwrap_or("text").to_string(),
            });
        }
        None => {
            return Err(RecordError::NotARecord {
                expected: element.to_string(),
                found: "nothing".to_string(),
            });
        }
    };

    if !rest.last().is_some_and(|last| last.is_end_of(element)) {
        return Err(RecordError::Truncated {
            element: element.to_string(),
        });
    }
    let body = &rest[..rest.len() - 1];

    let mut descriptor: Option<String> = None;
    let mut points = Vec::new();
    // Element names below the record element
    let mut path: Vec<&str> = Vec::new();
    let mut field = Field::Other;
    let mut current: Option<PointBuilder> = None;

    for event in body {
        match event {
            StructuralEvent::Start { name, .. } => {
                let parent = path.last().copied();
                field = match (parent, name.as_str()) {
                    (None, DESCRIPTOR_ELEMENT) => {
                        descriptor = Some(String::new());
                        Field::Descriptor
                    }
                    (Some(POINT_LIST_ELEMENT), POINT_ELEMENT) if path.len() == 1 => {
                        current = Some(PointBuilder::from_attributes(points.len(), event));
                        Field::Other
                    }
                    (Some(POINT_ELEMENT), axis @ ("X" | "Y"))
                        if path.len() == 2 && current.is_some() =>
                    {
                        if let Some(point) = current.as_mut() {
                            let slot = if axis == "X" { &mut point.x } else { &mut point.y };
                            *slot = Some(String::new());
                        }
                        Field::Coordinate(if axis == "X" { 'X' } else { 'Y' })
                    }
                    _ => Field::Other,
                };
                path.push(name.as_str());
            }
            StructuralEvent::Text(text) => match field {
                Field::Descriptor => {
                    if let Some(d) = descriptor.as_mut() {
                        d.push_str(text);
                    }
                }
                Field::Coordinate(axis) => {
                    if let Some(point) = current.as_mut() {
                        let slot = if axis == 'X' { &mut point.x } else { &mut point.y };
                        if let Some(value) = slot.as_mut() {
                            value.push_str(text);
                        }
                    }
                }
                Field::Other => {}
            },
            StructuralEvent::End { name } => {
                path.pop();
                if name == POINT_ELEMENT
                    && path.len() == 1
                    && path.last() == Some(&POINT_LIST_ELEMENT)
                    && let Some(point) = current.take()
                {
                    points.push(point.build()?);
                }
                field = Field::Other;
            }
        }
    }

    Ok(RecordModel::new(descriptor, points))
}
