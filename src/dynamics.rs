use log::warn;
use na::Matrix2;

use crate::{
    config::{ManipulatorParams, TipLoad},
    error::{ControlError, Result},
    types::{join_state, split_state, Float, JointVector, State},
};

/// Closed-form manipulator equation of a planar two-link arm with a solid
/// sphere at the tip:
///     M(q) qddot + C(q, qdot) qdot = τ
/// Gravity acts along the joint axes, so there is no gravity term.
///
/// Ref: https://underactuated.csail.mit.edu/multibody.html#manipulator
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicsModel {
    Tp: Float,
    params: ManipulatorParams,
    alfa: Float,
    beta: Float,
    ceta: Float,
}

impl DynamicsModel {
    /// Model with the default link constants and the given tip load.
    /// Tp is stored as given; `config::validate_sampling_period` checks it.
    pub fn new(Tp: Float, m3: Float, r3: Float) -> Self {
        DynamicsModel::from_params(
            Tp,
            ManipulatorParams::default().with_tip(TipLoad::new(m3, r3)),
        )
    }

    #[rustfmt::skip]
    pub fn from_params(Tp: Float, params: ManipulatorParams) -> Self {
        let ManipulatorParams { l1, r1, m1, l2, r2, m2, tip } = params;
        let (m3, r3) = (tip.mass, tip.radius);
        let d1 = l1 / 2.;
        let d2 = l2 / 2.;

        // Links are solid cylinders about their centroid, the load a solid sphere
        let I1 = m1 * (3. * r1 * r1 + l1 * l1) / 12.;
        let I2 = m2 * (3. * r2 * r2 + l2 * l2) / 12.;
        let I3 = 2. / 5. * m3 * r3 * r3;

        let alfa = m1*d1*d1 + I1 + m2*(l1*l1 + d2*d2) + I2 + m3*(l1*l1 + l2*l2) + I3;
        let beta = l1 * (m2*d2 + m3*l2);
        let ceta = m2*d2*d2 + I2 + m3*l2*l2 + I3;

        DynamicsModel { Tp, params, alfa, beta, ceta }
    }

    pub fn sampling_period(&self) -> Float {
        self.Tp
    }

    pub fn params(&self) -> &ManipulatorParams {
        &self.params
    }

    pub fn alfa(&self) -> Float {
        self.alfa
    }

    pub fn beta(&self) -> Float {
        self.beta
    }

    pub fn ceta(&self) -> Float {
        self.ceta
    }

    /// Mass matrix. Depends on q2 only.
    #[rustfmt::skip]
    pub fn M(&self, x: &State) -> Matrix2<Float> {
        let c2 = x[1].cos();
        let m12 = self.ceta + self.beta * c2;
        Matrix2::new(
            self.alfa + 2. * self.beta * c2, m12,
            m12,                             self.ceta,
        )
    }

    /// Coriolis and centrifugal matrix
    #[rustfmt::skip]
    pub fn C(&self, x: &State) -> Matrix2<Float> {
        let s2 = x[1].sin();
        let q1dot = x[2];
        let q2dot = x[3];
        Matrix2::new(
            -self.beta * s2 * q2dot, -self.beta * s2 * (q1dot + q2dot),
             self.beta * s2 * q1dot,  0.,
        )
    }

    /// Joint torques that produce acceleration qddot at state x:
    ///     τ = M(q) qddot + C(q, qdot) qdot
    pub fn inverse_dynamics(&self, x: &State, qddot: &JointVector) -> JointVector {
        let (_, qdot) = split_state(x);
        self.M(x) * qddot + self.C(x) * qdot
    }

    /// Joint accelerations under torque tau at state x, i.e. solve
    ///     M(q) qddot = τ - C(q, qdot) qdot
    pub fn forward_dynamics(&self, x: &State, tau: &JointVector) -> Result<JointVector> {
        let (_, qdot) = split_state(x);
        let M = self.M(x);
        let rhs = tau - self.C(x) * qdot;
        match M.lu().solve(&rhs) {
            Some(qddot) if qddot.iter().all(|a| a.is_finite()) => Ok(qddot),
            _ => {
                warn!(
                    "Failed to solve for qddot in M(q) qddot = τ - C(q, qdot) qdot\n  where M = {}",
                    M
                );
                Err(ControlError::SingularMassMatrix { model: None, q2: x[1] })
            }
        }
    }

    /// State one sampling period ahead under constant torque tau, by a single
    /// forward Euler step.
    pub fn predict(&self, x: &State, tau: &JointVector) -> Result<State> {
        let (_, qdot) = split_state(x);
        let qddot = self.forward_dynamics(x, tau)?;
        Ok(x + join_state(&qdot, &qddot) * self.Tp)
    }
}

impl Default for DynamicsModel {
    fn default() -> Self {
        DynamicsModel::from_params(0.01, ManipulatorParams::default())
    }
}

#[cfg(test)]
mod dynamics_tests {
    use approx::assert_relative_eq;
    use na::{vector, Matrix2, Vector2};

    use crate::{
        assert_close,
        util::test_utils::{random_joint_vector, random_state},
        PI,
    };

    use super::*;

    #[test]
    fn derived_terms_default_load() {
        // Arrange
        let model = DynamicsModel::new(0.01, 0.1, 0.05);

        // Hand-computed from the link constants
        let I1 = 3.0 * (3. * 0.04 * 0.04 + 0.25) / 12.;
        let I2 = 2.4 * (3. * 0.04 * 0.04 + 0.16) / 12.;
        let I3 = 0.4 * 0.1 * 0.05 * 0.05;
        let alfa = 3.0 * 0.0625 + I1 + 2.4 * (0.25 + 0.04) + I2 + 0.1 * (0.25 + 0.16) + I3;
        let beta = 0.5 * (2.4 * 0.2 + 0.1 * 0.4);
        let ceta = 2.4 * 0.04 + I2 + 0.1 * 0.16 + I3;

        // Assert
        assert_relative_eq!(model.alfa(), alfa, epsilon = 1e-12);
        assert_relative_eq!(model.beta(), beta, epsilon = 1e-12);
        assert_relative_eq!(model.ceta(), ceta, epsilon = 1e-12);
        assert_relative_eq!(model.beta(), 0.26, epsilon = 1e-12);
    }

    #[test]
    fn default_matches_default_tip_load() {
        assert_eq!(DynamicsModel::default(), DynamicsModel::new(0.01, 0.1, 0.05));
    }

    #[test]
    fn heavier_tip_increases_inertia() {
        let light = DynamicsModel::new(0.01, 0.01, 0.01);
        let heavy = DynamicsModel::new(0.01, 1.0, 0.3);
        assert!(heavy.alfa() > light.alfa());
        assert!(heavy.beta() > light.beta());
        assert!(heavy.ceta() > light.ceta());
    }

    #[test]
    fn zero_elbow_angle() {
        // Arrange
        let model = DynamicsModel::default();
        let x = vector![0.7, 0., 1.5, -2.0];
        let (a, b, c) = (model.alfa(), model.beta(), model.ceta());

        // Act
        let M = model.M(&x);
        let C = model.C(&x);

        // Assert
        assert_eq!(M, Matrix2::new(a + 2. * b, c + b, c + b, c));
        assert_eq!(C, Matrix2::zeros());
    }

    #[test]
    fn coriolis_entries() {
        // Arrange
        let model = DynamicsModel::default();
        let x = vector![0., PI / 2., 2., 3.];
        let b = model.beta();

        // Act
        let C = model.C(&x);

        // Assert
        assert_close!(C[(0, 0)], -b * 3., 1e-12);
        assert_close!(C[(0, 1)], -b * 5., 1e-12);
        assert_close!(C[(1, 0)], b * 2., 1e-12);
        assert_eq!(C[(1, 1)], 0.);
    }

    #[test]
    fn mass_matrix_symmetric() {
        let model = DynamicsModel::new(0.01, 1.0, 0.3);
        let mut rng = rand::rng();
        for _ in 0..100 {
            let x = random_state(&mut rng, 10.0, 10.0);
            let M = model.M(&x);
            assert_eq!(M[(0, 1)], M[(1, 0)]);
        }
    }

    #[test]
    fn mass_matrix_positive_definite() {
        for (m3, r3) in [(0.1, 0.05), (0.01, 0.01), (1.0, 0.3)] {
            let model = DynamicsModel::new(0.01, m3, r3);
            let n = 720;
            for i in 0..=n {
                let q2 = -PI + 2. * PI * i as Float / n as Float;
                let M = model.M(&vector![0., q2, 0., 0.]);
                assert!(M[(0, 0)] > 0.);
                assert!(M.determinant() > 0., "det(M) <= 0 at q2 = {}", q2);
                assert!(M.cholesky().is_some());
            }
        }
    }

    #[test]
    fn mass_matrix_depends_only_on_elbow() {
        let model = DynamicsModel::default();
        let a = model.M(&vector![0., 0.3, 0., 0.]);
        let b = model.M(&vector![5., 0.3, -1., 7.]);
        assert_eq!(a, b);
    }

    #[test]
    fn forward_inverse_consistency() {
        // Arrange
        let model = DynamicsModel::new(0.01, 1.0, 0.3);
        let mut rng = rand::rng();

        for _ in 0..50 {
            let x = random_state(&mut rng, PI, 5.0);
            let qddot = random_joint_vector(&mut rng, 5.0);

            // Act
            let tau = model.inverse_dynamics(&x, &qddot);
            let recovered = model.forward_dynamics(&x, &tau).unwrap();

            // Assert
            assert_relative_eq!(recovered, qddot, epsilon = 1e-9);
        }
    }

    #[test]
    fn predict_at_rest_without_torque() {
        let model = DynamicsModel::default();
        let x = vector![0.4, -0.2, 0., 0.];
        let x_next = model.predict(&x, &Vector2::zeros()).unwrap();
        assert_eq!(x_next, x);
    }

    #[test]
    fn predict_euler_step() {
        // Arrange
        let Tp = 0.05;
        let model = DynamicsModel::new(Tp, 0.1, 0.05);
        let x = vector![0.1, 0.2, 1.0, -1.0];
        let tau = Vector2::new(0.5, -0.3);

        // Act
        let x_next = model.predict(&x, &tau).unwrap();

        // Assert
        let qddot = model.M(&x).try_inverse().unwrap() * (tau - model.C(&x) * Vector2::new(1.0, -1.0));
        assert_relative_eq!(x_next[0], 0.1 + Tp * 1.0, epsilon = 1e-12);
        assert_relative_eq!(x_next[1], 0.2 - Tp * 1.0, epsilon = 1e-12);
        assert_relative_eq!(x_next[2], 1.0 + Tp * qddot[0], epsilon = 1e-12);
        assert_relative_eq!(x_next[3], -1.0 + Tp * qddot[1], epsilon = 1e-12);
    }

    #[test]
    fn singular_mass_matrix_is_reported() {
        // Arrange: a massless arm has a zero mass matrix
        let params = ManipulatorParams {
            m1: 0.,
            m2: 0.,
            tip: TipLoad::new(0., 0.),
            ..ManipulatorParams::default()
        };
        let model = DynamicsModel::from_params(0.01, params);
        let x = vector![0., 0.5, 0., 0.];

        // Act
        let result = model.forward_dynamics(&x, &Vector2::new(1., 1.));

        // Assert
        assert!(matches!(
            result,
            Err(ControlError::SingularMassMatrix { model: None, q2 }) if q2 == 0.5
        ));
    }
}
