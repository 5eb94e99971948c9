use crate::error::Result;
use crate::types::{state_from_slice, Float, JointVector, ReferenceSample, State};

pub mod feedback_linearization;
pub mod mma;

/// Joint-space control law, invoked once per sampling period by the control
/// loop. Calls on one instance must be serialised by the caller.
pub trait Controller {
    /// Joint torques for state x tracking the reference (q_r, q_r_dot, q_r_ddot)
    fn calculate_control(
        &mut self,
        x: &State,
        q_r: &JointVector,
        q_r_dot: &JointVector,
        q_r_ddot: &JointVector,
    ) -> Result<JointVector>;

    fn track(&mut self, x: &State, reference: &ReferenceSample) -> Result<JointVector> {
        self.calculate_control(x, &reference.q, &reference.q_dot, &reference.q_ddot)
    }

    /// Same as `calculate_control`, for callers holding plain slices.
    /// Shapes are checked before anything is computed, so a rejected call
    /// leaves the controller untouched.
    fn calculate_control_slices(
        &mut self,
        x: &[Float],
        q_r: &[Float],
        q_r_dot: &[Float],
        q_r_ddot: &[Float],
    ) -> Result<JointVector> {
        let x = state_from_slice(x)?;
        let reference = ReferenceSample::from_slices(q_r, q_r_dot, q_r_ddot)?;
        self.track(&x, &reference)
    }
}
