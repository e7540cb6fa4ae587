// Data processing pipeline: validation, normalization, aggregation and roster views

pub mod processing;
