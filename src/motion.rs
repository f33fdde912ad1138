//! Odometry-based motion model: samples a new pose from the previous pose
//! and the raw odometry delta, perturbing the decomposed rotate-translate-rotate
//! motion with additive Gaussian noise.

use serde::{Deserialize, Serialize};

use crate::error::SlamError;
use crate::utility::{sample_normal, Pose, Rng};

/// Two consecutive odometry poses. `still` holds iff they are bit-identical,
/// in which case the motion model is a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub current: Pose,
    pub last: Pose,
}

impl Control {
    pub fn new(current: Pose, last: Pose) -> Self {
        Self { current, last }
    }

    pub fn still(&self) -> bool {
        self.current == self.last
    }
}

/// Non-negative variance coefficients for the odometry noise model, as used
/// by Thrun/Burgard/Fox's "sample_motion_model_odometry".
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionModelConfig {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
}

impl MotionModelConfig {
    /// Checks the coefficients a host deserialized from its own config file
    /// before handing them to `MotionModel::try_new`. Internal construction
    /// that the crate itself trusts (e.g. `new`, called with a literal or
    /// already-validated config) skips straight to a `debug_assert!`
    /// instead.
    pub fn validate(&self) -> Result<(), SlamError> {
        for (field, value) in [
            ("a1", self.a1),
            ("a2", self.a2),
            ("a3", self.a3),
            ("a4", self.a4),
        ] {
            if value < 0.0 {
                return Err(SlamError::MotionCoefficientNegative { field, value });
            }
        }
        Ok(())
    }
}

/// Samples a new pose from an odometry control and a prior pose, perturbing
/// the rotate-translate-rotate decomposition of the odometry delta with
/// additive Gaussian noise scaled by the delta's own magnitude.
pub struct MotionModel {
    config: MotionModelConfig,
}

impl MotionModel {
    pub fn new(config: MotionModelConfig) -> Self {
        debug_assert!(config.a1 >= 0.0 && config.a2 >= 0.0 && config.a3 >= 0.0 && config.a4 >= 0.0);
        Self { config }
    }

    /// Like `new`, but for a config a host loaded from its own file rather
    /// than one the crate's own caller hardcoded: validates instead of
    /// asserting, so a bad file produces a `Result` the host can report
    /// instead of a panic.
    pub fn try_new(config: MotionModelConfig) -> Result<Self, SlamError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Draws a new pose hypothesis given the prior pose and the raw
    /// odometry control. If `control.still()`, returns `prior` unchanged.
    pub fn sample(&self, rng: &mut Rng, control: Control, prior: Pose) -> Pose {
        if control.still() {
            return prior;
        }

        let delta = control.current - control.last;
        let rot1 = delta.position.y.atan2(delta.position.x) - control.last.angle;
        let trans = (delta.position.x.powi(2) + delta.position.y.powi(2)).sqrt();
        let rot2 = control.current.angle - control.last.angle - rot1;

        let a = &self.config;
        let rot1_hat = rot1
            + sample_normal(rng, 0.0, a.a1 * rot1.powi(2) + a.a2 * trans.powi(2));
        let trans_hat = trans
            + sample_normal(
                rng,
                0.0,
                a.a3 * trans.powi(2) + a.a4 * (rot1.powi(2) + rot2.powi(2)),
            );
        let rot2_hat = rot2
            + sample_normal(rng, 0.0, a.a1 * rot2.powi(2) + a.a2 * trans.powi(2));

        let advance = Pose::polar(trans_hat, prior.angle + rot1_hat);
        Pose {
            position: prior.position + advance.position,
            angle: prior.angle + rot1_hat + rot2_hat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn still_control_is_a_no_op() {
        let model = MotionModel::new(MotionModelConfig::default());
        let mut rng = Rng::from_seed(1);
        let p = Pose::new(1.0, 2.0, 0.3);
        let control = Control::new(p, p);
        assert_eq!(model.sample(&mut rng, control, Pose::new(5.0, -1.0, 1.2)), Pose::new(5.0, -1.0, 1.2));
    }

    #[test]
    fn zero_noise_reproduces_the_odometry_delta() {
        let model = MotionModel::new(MotionModelConfig::default());
        let mut rng = Rng::from_seed(1);
        let control = Control::new(Pose::new(0.0, 0.0, 0.0), Pose::new(0.0, 0.0, 0.0));
        let out = model.sample(&mut rng, control, Pose::new(0.0, 0.0, 0.0));
        assert_eq!(out, Pose::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn zero_noise_coefficients_give_deterministic_translation() {
        let model = MotionModel::new(MotionModelConfig::default());
        let mut rng = Rng::from_seed(1);
        let control = Control::new(Pose::new(1.0, 0.0, 0.0), Pose::new(0.0, 0.0, 0.0));
        let out = model.sample(&mut rng, control, Pose::new(0.0, 0.0, 0.0));
        assert_relative_eq!(out.x(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(out.y(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(out.angle, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn try_new_rejects_a_negative_coefficient() {
        let config = MotionModelConfig {
            a1: 0.1,
            a2: -0.01,
            a3: 0.1,
            a4: 0.1,
        };
        let err = MotionModel::try_new(config).unwrap_err();
        assert_eq!(
            err,
            SlamError::MotionCoefficientNegative {
                field: "a2",
                value: -0.01
            }
        );
    }

    #[test]
    fn try_new_accepts_a_valid_config() {
        assert!(MotionModel::try_new(MotionModelConfig::default()).is_ok());
    }
}
