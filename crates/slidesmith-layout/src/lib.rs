#![forbid(unsafe_code)]

//! Deterministic layout engine for the generation core.
//!
//! Two halves, one-way dependency between them:
//! - [`text`]: pure, script-aware text measurement and font-size fitting
//! - [`solver`]: one closed-form placement solver per diagram archetype,
//!   consuming a validated Brief plus a [`text::TextMeasurer`] and emitting a
//!   [`model::PositionedLayout`]
//!
//! Solvers degrade instead of failing: overflow triggers uniform down-scaling
//! and a warning, never an error. The only error this crate surfaces is
//! `LayoutUnsatisfiable` from the final invariant verification pass, which a
//! correct solver cannot trip.

pub mod model;
pub mod solver;
pub mod text;
pub mod theme;

pub use model::{
    ElementKind, MeasuredText, PositionedConnector, PositionedElement, PositionedLayout, Stroke,
};
pub use solver::{ARCHETYPE_VERSION, SolvedLayout, detect_archetype, solve};
pub use text::{FontMetricsTextMeasurer, FontRegistry, HeuristicTextMeasurer, TextMeasurer};
