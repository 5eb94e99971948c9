use thiserror::Error;

use crate::types::Float;

#[derive(Error, Debug)]
pub enum ControlError {
    /// The mass matrix could not be inverted, or the solve produced NaN/Inf.
    /// `model` is the bank index when the model belongs to a bank.
    #[error(
        "Mass matrix{} is singular at q2 = {q2}",
        .model.map(|i| format!(" of model {}", i)).unwrap_or_default()
    )]
    SingularMassMatrix { model: Option<usize>, q2: Float },

    /// NaN or infinite input, rejected before any computation
    #[error("Non-finite value in {name}")]
    NonFiniteInput { name: &'static str },

    /// Input vector of the wrong dimension, rejected before any computation
    #[error("Invalid shape for {name}: expected {expected} elements, got {actual}")]
    InvalidStateShape {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ControlError>;
