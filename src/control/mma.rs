use itertools::Itertools;
use log::{debug, trace};

use crate::{
    config::{
        validate_sampling_period, ControllerConfig, Gains, TipLoad, MMA_GAINS, MMA_TIP_LOADS,
    },
    control::Controller,
    dynamics::DynamicsModel,
    error::{ControlError, Result},
    types::{check_finite, split_state, Float, JointVector, State},
    MODEL_BANK_SIZE,
};

/// State carried between two control steps
#[derive(Clone, Debug, PartialEq)]
struct SwitchingState {
    /// Index of the model used for the last command
    i: usize,
    last_x: State,
    last_u: JointVector,
    residuals: [Float; MODEL_BANK_SIZE],
}

impl Default for SwitchingState {
    fn default() -> Self {
        SwitchingState {
            i: 0,
            last_x: State::zeros(),
            last_u: JointVector::zeros(),
            residuals: [0.; MODEL_BANK_SIZE],
        }
    }
}

/// Multiple-model adaptive controller.
///
/// Keeps a bank of arm models that differ only in the tip load. Every step,
/// each model predicts where the previous command should have taken the
/// previous state, and the model whose prediction lands closest to the
/// measured state is used for feedback linearization:
///     v = 2 q_r_ddot + kp (q_r - q) + kd (q_r_dot - qdot)
///     τ = M_i(q) v + C_i(q, qdot) qdot
///
/// Ref: Narendra & Balakrishnan, "Adaptive control using multiple models",
/// IEEE TAC 1997
#[derive(Clone, Debug)]
pub struct MMAController {
    models: [DynamicsModel; MODEL_BANK_SIZE],
    pub kp: Float,
    pub kd: Float,
    Tp: Float,
    state: SwitchingState,
}

impl MMAController {
    /// Unchecked construction; see `try_new`.
    pub fn new(Tp: Float, kp: Float, kd: Float) -> Self {
        let models = MMA_TIP_LOADS.map(|tip| DynamicsModel::new(Tp, tip.mass, tip.radius));
        MMAController::with_models(Tp, kp, kd, models)
    }

    /// Rejects a non-positive or non-finite Tp and non-finite gains
    pub fn try_new(Tp: Float, kp: Float, kd: Float) -> Result<Self> {
        validate_sampling_period(Tp)?;
        Gains::new(kp, kd).validate("mma")?;
        Ok(MMAController::new(Tp, kp, kd))
    }

    pub fn with_default_gains(Tp: Float) -> Self {
        MMAController::new(Tp, MMA_GAINS.kp, MMA_GAINS.kd)
    }

    /// Bank built from the configured arm, one model per configured tip load
    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        let Tp = config.sampling_period;
        let models = config
            .mma
            .tip_loads
            .map(|tip: TipLoad| DynamicsModel::from_params(Tp, config.manipulator.with_tip(tip)));
        Ok(MMAController::with_models(
            Tp,
            config.mma.kp,
            config.mma.kd,
            models,
        ))
    }

    pub fn with_models(
        Tp: Float,
        kp: Float,
        kd: Float,
        models: [DynamicsModel; MODEL_BANK_SIZE],
    ) -> Self {
        MMAController {
            models,
            kp,
            kd,
            Tp,
            state: SwitchingState::default(),
        }
    }

    pub fn models(&self) -> &[DynamicsModel; MODEL_BANK_SIZE] {
        &self.models
    }

    /// Index into `models()` of the model currently in use
    pub fn selected_model(&self) -> usize {
        self.state.i
    }

    /// Prediction residuals of the latest model selection
    pub fn last_residuals(&self) -> &[Float; MODEL_BANK_SIZE] {
        &self.state.residuals
    }

    pub fn last_state(&self) -> &State {
        &self.state.last_x
    }

    pub fn last_command(&self) -> &JointVector {
        &self.state.last_u
    }

    /// Forget the control history, as if freshly constructed
    pub fn reset(&mut self) {
        self.state = SwitchingState::default();
    }

    /// Residual of every model: distance between the measured state x and
    /// the one-step prediction from the previous state and command.
    pub fn residuals(&self, x: &State) -> Result<[Float; MODEL_BANK_SIZE]> {
        let mut residuals = [0.; MODEL_BANK_SIZE];
        for (j, model) in self.models.iter().enumerate() {
            let x_pred = self.predict(j, model)?;
            residuals[j] = (x - x_pred).norm();
        }
        Ok(residuals)
    }

    fn predict(&self, j: usize, model: &DynamicsModel) -> Result<State> {
        let (_, qdot) = split_state(&self.state.last_x);
        let qddot = model
            .forward_dynamics(&self.state.last_x, &self.state.last_u)
            .map_err(|err| match err {
                ControlError::SingularMassMatrix { q2, .. } => {
                    ControlError::SingularMassMatrix { model: Some(j), q2 }
                }
                err => err,
            })?;
        let x_dot = State::new(qdot[0], qdot[1], qddot[0], qddot[1]);
        Ok(self.state.last_x + x_dot * self.Tp)
    }

    /// Select the model that best explains the transition from the previous
    /// state to x. Ties go to the lowest index.
    pub fn choose_model(&mut self, x: &State) -> Result<usize> {
        let residuals = self.residuals(x)?;
        trace!("MMA residuals: {:?}", residuals);

        let i = residuals
            .iter()
            .position_min_by(|a, b| a.total_cmp(b))
            .unwrap_or(0);
        if i != self.state.i {
            debug!(
                "MMA switched model {} -> {} (residual {:.3e} vs {:.3e})",
                self.state.i, i, residuals[self.state.i], residuals[i]
            );
        }

        self.state.i = i;
        self.state.residuals = residuals;
        Ok(i)
    }
}

impl Controller for MMAController {
    fn calculate_control(
        &mut self,
        x: &State,
        q_r: &JointVector,
        q_r_dot: &JointVector,
        q_r_ddot: &JointVector,
    ) -> Result<JointVector> {
        check_finite(x, q_r, q_r_dot, q_r_ddot)?;
        let i = self.choose_model(x)?;
        let (q, qdot) = split_state(x);

        // Feedforward acceleration enters twice
        let v = q_r_ddot + q_r_ddot + (q_r - q) * self.kp + (q_r_dot - qdot) * self.kd;
        let u = self.models[i].inverse_dynamics(x, &v);

        self.state.last_x = *x;
        self.state.last_u = u;
        Ok(u)
    }
}
