// Pipeline processing: row validation, name normalization, place aggregation, roster filtering

pub mod conflation;
pub mod normalize;
pub mod quality_gate;
pub mod roster;

pub use conflation::{aggregate, aggregate_rows, AggregationOutcome, PlaceSummary};
pub use normalize::normalize;
pub use roster::{RosterContext, RosterFilterIndex};
