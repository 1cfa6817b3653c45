//! Error taxonomy
//!
//! Only construction-time problems are errors. Steady-state conditions
//! (a pursued target dying, an empty enemy group, a script running out of
//! steps) are ordinary data states and never surface here.

use thiserror::Error;

/// Errors raised while building simulation objects
#[derive(Error, Debug)]
pub enum SimError {
    /// A trajectory provider was configured with unusable parameters
    #[error("invalid trajectory config: {0}")]
    InvalidTrajectoryConfig(String),

    /// An animation track was built from an empty frame list or bad delay
    #[error("invalid animation: {0}")]
    InvalidAnimation(String),

    /// Balance data failed validation
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    /// Balance data could not be parsed
    #[error("tuning JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A behavior script reported a failure to its driver
    #[error("script error: {0}")]
    Script(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
