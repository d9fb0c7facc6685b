mod classifier;
mod config;
mod corpus;
mod detector;
mod emit;
mod engine;
mod error;
mod helpers;
mod ingest;
mod normalize;
mod patterns;
mod pipeline;
mod structure;
mod tables;
mod types;

pub use config::{CoreConfig, DatePolicy};
pub use emit::{MemorySink, Sink, SinkError};
pub use engine::{Engine, EngineStats};
pub use error::{Error, Result};
pub use ingest::{Converted, Converter, FileConverter};
pub use pipeline::{Pipeline, PipelineError, StatsSnapshot};
pub use tables::{CountryEntry, MeasurementCategory, Tables, UnitEntry};
pub use types::*;
