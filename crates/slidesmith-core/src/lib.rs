#![forbid(unsafe_code)]

//! Core data model for the slidesmith generation pipeline.
//!
//! Design goals:
//! - one immutable entity per pipeline stage (request → brief → record/artifact)
//! - deterministic, pure policy functions (classification, plan checks)
//! - no I/O and no provider types; those live behind capability traits in
//!   `slidesmith-gateway` and the facade crate

pub mod classify;
pub mod color;
pub mod config;
pub mod error;
pub mod model;
pub mod plan;
pub mod script;
pub mod units;

pub use classify::{ClassifyInput, Tier, classify};
pub use config::{Config, ConfigHandle, ModelMap, RateLimit, RateLimitTable};
pub use error::{Error, ErrorKind, Result, Warning};
pub use model::artifact::Artifact;
pub use model::brief::{
    BRIEF_SCHEMA_VERSION, Brief, Connection, ConnectorStyle, DiagramType, Emphasis, Entity, Layer,
    LayerPosition, Theme,
};
pub use model::record::{GenerationOutcome, GenerationRecord};
pub use model::request::{GenerateRequest, OutputFormat, PlanTier};
pub use plan::{PlanCatalog, PlanLimits};
