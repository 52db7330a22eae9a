//! Projection of decoded records onto NVG output nodes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::model::RecordModel;
use crate::nvg::{NvgPoint, OutputNode};

/// How a record's point list becomes output nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MappingPolicy {
    /// One point node per record, taken from the record's first point.
    /// Further points are not projected.
    #[default]
    FirstPoint,
    /// One point node per source point, in source order
    EachPoint,
}

/// Map one record to the output nodes it produces.
///
/// A record without points cannot be represented under either policy.
pub fn map_record(
    record: &RecordModel,
    policy: MappingPolicy,
) -> Result<Vec<OutputNode>, MappingError> {
    let first = record.first_point().ok_or(MappingError::EmptyPointList)?;

    let nodes = match policy {
        MappingPolicy::FirstPoint => vec![OutputNode::Point(NvgPoint::from(*first))],
        MappingPolicy::EachPoint => record
            .points
            .iter()
            .map(|p| OutputNode::Point(NvgPoint::from(*p)))
            .collect(),
    };

    Ok(nodes)
}
