use crate::classify::Tier;
use crate::model::request::PlanTier;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

/// Closed failure taxonomy for the generation pipeline.
///
/// Every stage boundary returns one of these kinds instead of bubbling ad-hoc
/// errors; the orchestrator maps them onto the stable outward contract via
/// [`Error::kind`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rate limited; retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("monthly generation quota exhausted for plan {plan}")]
    QuotaExceeded { plan: PlanTier },

    #[error("plan limit exceeded: {message}")]
    PlanLimitExceeded { message: String },

    #[error("plan {plan} does not allow model tier {tier}")]
    PlanForbidsTier { plan: PlanTier, tier: Tier },

    #[error("model output failed brief validation after {attempts} attempts: {detail}")]
    BriefRejected { attempts: u32, detail: String },

    #[error("all models in tier {tier} failed; last error: {last_error}")]
    AllModelsFailed { tier: Tier, last_error: String },

    #[error("deadline expired during {stage}")]
    Timeout { stage: &'static str },

    #[error("invalid input: {message}")]
    InputInvalid { message: String },

    #[error("layout invariants could not be satisfied: {message}")]
    LayoutUnsatisfiable { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Error::PlanLimitExceeded { .. } => ErrorKind::PlanLimitExceeded,
            Error::PlanForbidsTier { .. } => ErrorKind::PlanForbidsTier,
            Error::BriefRejected { .. } => ErrorKind::BriefRejected,
            Error::AllModelsFailed { .. } => ErrorKind::AllModelsFailed,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::InputInvalid { .. } => ErrorKind::InputInvalid,
            Error::LayoutUnsatisfiable { .. } => ErrorKind::LayoutUnsatisfiable,
            Error::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Only sliding-window breaches are retryable without caller-side changes;
    /// plan policy kinds need an upgrade, the rest need new input or a fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Timeout { .. })
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InputInvalid {
            message: message.into(),
        }
    }
}

/// Stable outward-facing error identifiers (wire contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    RateLimited,
    QuotaExceeded,
    PlanLimitExceeded,
    PlanForbidsTier,
    BriefRejected,
    AllModelsFailed,
    Timeout,
    InputInvalid,
    LayoutUnsatisfiable,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::QuotaExceeded => "quota-exceeded",
            ErrorKind::PlanLimitExceeded => "plan-limit-exceeded",
            ErrorKind::PlanForbidsTier => "plan-forbids-tier",
            ErrorKind::BriefRejected => "brief-rejected",
            ErrorKind::AllModelsFailed => "all-models-failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InputInvalid => "input-invalid",
            ErrorKind::LayoutUnsatisfiable => "layout-unsatisfiable",
            ErrorKind::InternalError => "internal-error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal degradations that travel alongside a successful result.
///
/// Warnings are recorded with the generation and surfaced to the caller; they
/// never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    TextDidNotFit { element_id: String },
    UniformScalingApplied { scale: f64 },
    ConnectorLabelTruncated { connector_id: String },
    PromptCacheUnavailable { model: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_strings() {
        let err = Error::Timeout { stage: "reasoning" };
        assert_eq!(err.kind().as_str(), "timeout");
        assert!(err.is_retryable());

        let err = Error::PlanLimitExceeded {
            message: "too many entities".to_string(),
        };
        assert_eq!(err.kind().as_str(), "plan-limit-exceeded");
        assert!(!err.is_retryable());
    }
}
