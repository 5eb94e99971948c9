use crate::{
    config::{
        validate_sampling_period, ControllerConfig, Gains, TipLoad, FEEDBACK_LINEARIZATION_GAINS,
    },
    control::Controller,
    dynamics::DynamicsModel,
    error::Result,
    types::{check_finite, split_state, Float, JointVector, State},
};

/// Inverse-dynamics controller on a fixed model of the arm.
/// The commanded acceleration
///     v = q_r_ddot + kp (q_r - q) + kd (q_r_dot - qdot)
/// is mapped to torque through the model:
///     τ = M(q) v + C(q, qdot) qdot
/// which cancels the nonlinear dynamics when the model is exact, leaving
/// linear PD error dynamics.
#[derive(Clone, Debug)]
pub struct FeedbackLinearizationController {
    model: DynamicsModel,
    pub kp: Float,
    pub kd: Float,
}

impl FeedbackLinearizationController {
    /// Unchecked construction; see `try_new`.
    pub fn new(Tp: Float, kp: Float, kd: Float) -> Self {
        let tip = TipLoad::default();
        FeedbackLinearizationController {
            model: DynamicsModel::new(Tp, tip.mass, tip.radius),
            kp,
            kd,
        }
    }

    /// Rejects a non-positive or non-finite Tp and non-finite gains
    pub fn try_new(Tp: Float, kp: Float, kd: Float) -> Result<Self> {
        validate_sampling_period(Tp)?;
        Gains::new(kp, kd).validate("feedback_linearization")?;
        Ok(FeedbackLinearizationController::new(Tp, kp, kd))
    }

    pub fn with_default_gains(Tp: Float) -> Self {
        let gains = FEEDBACK_LINEARIZATION_GAINS;
        FeedbackLinearizationController::new(Tp, gains.kp, gains.kd)
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(FeedbackLinearizationController {
            model: DynamicsModel::from_params(config.sampling_period, config.manipulator),
            kp: config.feedback_linearization.kp,
            kd: config.feedback_linearization.kd,
        })
    }

    pub fn model(&self) -> &DynamicsModel {
        &self.model
    }
}

impl Controller for FeedbackLinearizationController {
    fn calculate_control(
        &mut self,
        x: &State,
        q_r: &JointVector,
        q_r_dot: &JointVector,
        q_r_ddot: &JointVector,
    ) -> Result<JointVector> {
        check_finite(x, q_r, q_r_dot, q_r_ddot)?;
        let (q, qdot) = split_state(x);
        let v = q_r_ddot + (q_r - q) * self.kp + (q_r_dot - qdot) * self.kd;
        Ok(self.model.inverse_dynamics(x, &v))
    }
}
