use na::{Vector2, Vector4};

use crate::error::{ControlError, Result};

pub type Float = f64;

/// Joint state (q1, q2, q1dot, q2dot)
pub type State = Vector4<Float>;

/// Per-joint quantity: position, velocity, acceleration or torque
pub type JointVector = Vector2<Float>;

/// Split a state into joint positions and joint velocities.
pub fn split_state(x: &State) -> (JointVector, JointVector) {
    (
        x.fixed_rows::<2>(0).into_owned(),
        x.fixed_rows::<2>(2).into_owned(),
    )
}

/// Stack joint positions and velocities back into a state.
pub fn join_state(q: &JointVector, q_dot: &JointVector) -> State {
    State::new(q[0], q[1], q_dot[0], q_dot[1])
}

pub fn state_from_slice(x: &[Float]) -> Result<State> {
    if x.len() != 4 {
        return Err(ControlError::InvalidStateShape {
            name: "x",
            expected: 4,
            actual: x.len(),
        });
    }
    Ok(State::from_column_slice(x))
}

pub fn joint_vector_from_slice(name: &'static str, v: &[Float]) -> Result<JointVector> {
    if v.len() != 2 {
        return Err(ControlError::InvalidStateShape {
            name,
            expected: 2,
            actual: v.len(),
        });
    }
    Ok(JointVector::from_column_slice(v))
}

/// Reject NaN/Inf in the state or the reference before anything is computed
pub fn check_finite(
    x: &State,
    q_r: &JointVector,
    q_r_dot: &JointVector,
    q_r_ddot: &JointVector,
) -> Result<()> {
    let inputs: [(&'static str, &[Float]); 4] = [
        ("x", x.as_slice()),
        ("q_r", q_r.as_slice()),
        ("q_r_dot", q_r_dot.as_slice()),
        ("q_r_ddot", q_r_ddot.as_slice()),
    ];
    for (name, values) in inputs {
        if !values.iter().all(|v| v.is_finite()) {
            return Err(ControlError::NonFiniteInput { name });
        }
    }
    Ok(())
}

/// One sample of the desired joint trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSample {
    pub q: JointVector,
    pub q_dot: JointVector,
    pub q_ddot: JointVector,
}

impl ReferenceSample {
    pub fn new(q: JointVector, q_dot: JointVector, q_ddot: JointVector) -> Self {
        ReferenceSample { q, q_dot, q_ddot }
    }

    /// Hold position q with zero velocity and acceleration
    pub fn hold(q: JointVector) -> Self {
        ReferenceSample::new(q, JointVector::zeros(), JointVector::zeros())
    }

    pub fn from_slices(q_r: &[Float], q_r_dot: &[Float], q_r_ddot: &[Float]) -> Result<Self> {
        Ok(ReferenceSample::new(
            joint_vector_from_slice("q_r", q_r)?,
            joint_vector_from_slice("q_r_dot", q_r_dot)?,
            joint_vector_from_slice("q_r_ddot", q_r_ddot)?,
        ))
    }
}
