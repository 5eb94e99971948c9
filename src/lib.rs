#![allow(non_snake_case)]

use types::Float;
pub extern crate nalgebra as na;

pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod types;
pub mod util;

pub use control::{
    feedback_linearization::FeedbackLinearizationController, mma::MMAController, Controller,
};
pub use dynamics::DynamicsModel;
pub use error::{ControlError, Result};

/// Number of candidate models in the multiple-model bank
pub const MODEL_BANK_SIZE: usize = 3;

pub const PI: Float = std::f64::consts::PI;
