#![forbid(unsafe_code)]

//! The single mediator between the service and any model provider.
//!
//! Design goals, mirroring the rest of the workspace:
//! - runtime-agnostic async: capability traits return `BoxFuture`, tests and
//!   the CLI drive everything with `futures::executor::block_on`
//! - providers are values in a table, never dependencies of callers
//! - every boundary returns the closed error taxonomy from
//!   `slidesmith-core`, not thrown provider exceptions

pub mod cache;
pub mod clock;
pub mod gateway;
pub mod provider;
pub mod rates;
pub mod reasoning;

pub use cache::{Cache, MemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::{CompleteOptions, Gateway, LlmResponse};
pub use provider::{ChatRequest, ChatResponse, ModelProvider, ProviderError, ProviderTable, ScriptedProvider};
pub use rates::{RateCard, RateTable};
pub use reasoning::{BrandSnapshot, ReasoningInput, ReasoningOutcome, ReasoningService};
