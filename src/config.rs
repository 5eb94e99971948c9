//! Controller configuration, loaded from TOML.
//!
//! Every field has a default, so a partial file only overrides what it names:
//!
//! ```toml
//! sampling_period = 0.01
//!
//! [feedback_linearization]
//! kp = 3.0
//! kd = 5.5
//!
//! [[mma.tip_loads]]
//! mass = 0.1
//! radius = 0.05
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::types::Float;
use crate::MODEL_BANK_SIZE;

/// Point mass at the tip, treated as a solid sphere
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TipLoad {
    pub mass: Float,
    pub radius: Float,
}

impl TipLoad {
    pub const fn new(mass: Float, radius: Float) -> Self {
        TipLoad { mass, radius }
    }
}

impl Default for TipLoad {
    fn default() -> Self {
        TipLoad::new(0.1, 0.05)
    }
}

/// Geometric and inertial parameters of the two-link arm.
/// Links are modelled as solid cylinders with their centroid at mid-length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulatorParams {
    pub l1: Float,
    pub r1: Float,
    pub m1: Float,
    pub l2: Float,
    pub r2: Float,
    pub m2: Float,
    pub tip: TipLoad,
}

impl Default for ManipulatorParams {
    fn default() -> Self {
        ManipulatorParams {
            l1: 0.5,
            r1: 0.04,
            m1: 3.0,
            l2: 0.4,
            r2: 0.04,
            m2: 2.4,
            tip: TipLoad::default(),
        }
    }
}

impl ManipulatorParams {
    pub fn with_tip(self, tip: TipLoad) -> Self {
        ManipulatorParams { tip, ..self }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("l1", self.l1),
            ("r1", self.r1),
            ("m1", self.m1),
            ("l2", self.l2),
            ("r2", self.r2),
            ("m2", self.m2),
        ] {
            if !(value.is_finite() && value > 0.) {
                return Err(ControlError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        validate_tip(&self.tip)
    }
}

fn validate_tip(tip: &TipLoad) -> Result<()> {
    if !(tip.mass.is_finite() && tip.mass >= 0.) || !(tip.radius.is_finite() && tip.radius >= 0.)
    {
        return Err(ControlError::InvalidConfig(format!(
            "tip load must be non-negative, got mass {} radius {}",
            tip.mass, tip.radius
        )));
    }
    Ok(())
}

pub fn validate_sampling_period(Tp: Float) -> Result<()> {
    if !(Tp.is_finite() && Tp > 0.) {
        return Err(ControlError::InvalidConfig(format!(
            "sampling_period must be positive, got {}",
            Tp
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gains {
    pub kp: Float,
    pub kd: Float,
}

impl Gains {
    pub const fn new(kp: Float, kd: Float) -> Self {
        Gains { kp, kd }
    }

    pub(crate) fn validate(&self, section: &str) -> Result<()> {
        if !self.kp.is_finite() || !self.kd.is_finite() {
            return Err(ControlError::InvalidConfig(format!(
                "{} gains must be finite, got kp {} kd {}",
                section, self.kp, self.kd
            )));
        }
        Ok(())
    }
}

pub const FEEDBACK_LINEARIZATION_GAINS: Gains = Gains::new(3.0, 5.5);
pub const MMA_GAINS: Gains = Gains::new(8.0, 20.0);

/// Candidate tip loads of the multiple-model bank, in selection order
pub const MMA_TIP_LOADS: [TipLoad; MODEL_BANK_SIZE] = [
    TipLoad::new(0.1, 0.05),
    TipLoad::new(0.01, 0.01),
    TipLoad::new(1.0, 0.3),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackLinearizationConfig {
    pub kp: Float,
    pub kd: Float,
}

impl FeedbackLinearizationConfig {
    pub fn gains(&self) -> Gains {
        Gains::new(self.kp, self.kd)
    }
}

impl Default for FeedbackLinearizationConfig {
    fn default() -> Self {
        FeedbackLinearizationConfig {
            kp: FEEDBACK_LINEARIZATION_GAINS.kp,
            kd: FEEDBACK_LINEARIZATION_GAINS.kd,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MMAConfig {
    pub kp: Float,
    pub kd: Float,
    pub tip_loads: [TipLoad; MODEL_BANK_SIZE],
}

impl MMAConfig {
    pub fn gains(&self) -> Gains {
        Gains::new(self.kp, self.kd)
    }
}

impl Default for MMAConfig {
    fn default() -> Self {
        MMAConfig {
            kp: MMA_GAINS.kp,
            kd: MMA_GAINS.kd,
            tip_loads: MMA_TIP_LOADS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Control period Tp in seconds
    pub sampling_period: Float,
    pub manipulator: ManipulatorParams,
    pub feedback_linearization: FeedbackLinearizationConfig,
    pub mma: MMAConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            sampling_period: 0.01,
            manipulator: ManipulatorParams::default(),
            feedback_linearization: FeedbackLinearizationConfig::default(),
            mma: MMAConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Loaded controller config from {} (Tp = {})",
            path.as_ref().display(),
            config.sampling_period
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_sampling_period(self.sampling_period)?;
        self.manipulator.validate()?;
        self.feedback_linearization
            .gains()
            .validate("feedback_linearization")?;
        self.mma.gains().validate("mma")?;
        for tip in self.mma.tip_loads.iter() {
            validate_tip(tip)?;
        }
        Ok(())
    }
}
