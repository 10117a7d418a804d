#![forbid(unsafe_code)]

//! Facade crate: wires the gateway, layout engine, renderers, and metering
//! into the end-to-end generation pipeline.
//!
//! Process-wide state lives here and only here — stores, caches, and
//! providers are injected capabilities; the library crates underneath stay
//! pure. Everything async is runtime-agnostic; drive it with
//! `futures::executor::block_on` or any executor the host prefers.

pub mod metering;
pub mod pipeline;
pub mod preprocess;
pub mod storage;

pub use metering::{MemoryRecordStore, MemoryWindowStore, MonthlyQuota, RateLimiter, RecordStore, WindowStore};
pub use pipeline::{GenerationResult, Pipeline, StoredArtifact};
pub use preprocess::{extract_logo_palette, extract_template_theme, parse_palette};
pub use storage::{ArtifactStore, MemoryArtifactStore};

pub use slidesmith_core as core;
pub use slidesmith_gateway as gateway;
pub use slidesmith_layout as layout;
pub use slidesmith_render as render;
