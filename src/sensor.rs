//! The beam-based sensor model: likelihood of a scan given a pose and a
//! map, and the free/occupied cell updates a scan implies along each beam.

use serde::{Deserialize, Serialize};

use crate::map::Bit;
use crate::raytrace::trace;
use crate::utility::{prob_normal, Point, Pose};

/// Per-beam likelihood is floored at this value so a single unlucky beam
/// can't annihilate the whole scan's probability to zero.
const LIKELIHOOD_FLOOR: f64 = 1e-9;

/// One full-rotation laser scan: `size` ordered beam ranges, where `0.0`
/// means "no return on that beam".
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    ranges: Vec<f64>,
}

impl Measurement {
    /// Builds a measurement straight from a `Vec`, with the scan length
    /// implied by the vector itself.
    pub fn new(ranges: Vec<f64>) -> Self {
        Self { ranges }
    }

    /// Builds a measurement, validating its length against a host's
    /// expected scan size. Unlike `new`, this is the fallible, caller-data
    /// path: a mismatched scan length is a data error a caller can recover
    /// from, not a programmer contract violation.
    pub fn with_expected_size(
        ranges: Vec<f64>,
        expected: usize,
    ) -> Result<Self, crate::error::SlamError> {
        if ranges.len() != expected {
            return Err(crate::error::SlamError::MeasurementSizeMismatch {
                expected,
                actual: ranges.len(),
            });
        }
        Ok(Self { ranges })
    }

    pub fn size(&self) -> usize {
        self.ranges.len()
    }

    pub fn range(&self, i: usize) -> f64 {
        self.ranges[i]
    }

    pub fn all_zero(&self) -> bool {
        self.ranges.iter().all(|&r| r == 0.0)
    }
}

/// `variance`: range-noise σ². `max_ray`: sensor max range. `samples`:
/// beams actually evaluated per scan. `size`: scan length. Requires
/// `size % samples == 0` and `samples >= 1` (debug-asserted at
/// construction — these are programmer-configured constants, not
/// caller data).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorModelConfig {
    pub variance: f64,
    pub max_ray: f64,
    pub samples: u32,
    pub size: u32,
}

impl SensorModelConfig {
    /// Checks the two constraints that matter for a config a host
    /// deserialized from its own file. `variance` isn't checked here: a
    /// non-positive variance is still a programmer-contract violation
    /// rather than data a caller provides, so it stays a `debug_assert!`
    /// in `SensorModel::new`/`try_new`.
    pub fn validate(&self) -> Result<(), crate::error::SlamError> {
        if self.samples == 0 {
            return Err(crate::error::SlamError::SensorSamplesZero);
        }
        if self.size % self.samples != 0 {
            return Err(crate::error::SlamError::SensorSizeNotDivisible {
                size: self.size,
                samples: self.samples,
            });
        }
        Ok(())
    }
}

pub struct SensorModel {
    config: SensorModelConfig,
    range_size: u32,
    start_index: u32,
    delta_rot: f64,
}

impl SensorModel {
    pub fn new(config: SensorModelConfig) -> Self {
        debug_assert!(config.samples >= 1, "samples must be at least 1");
        debug_assert!(
            config.size % config.samples == 0,
            "size must be a multiple of samples"
        );
        debug_assert!(config.variance > 0.0, "variance must be positive");
        Self {
            range_size: config.size / config.samples,
            start_index: 0,
            delta_rot: 2.0 * std::f64::consts::PI / config.size as f64,
            config,
        }
    }

    /// Like `new`, but for a config a host loaded from its own file:
    /// validates `samples`/`size` instead of asserting, so a bad file
    /// produces a `Result` the host can report instead of a panic.
    /// `variance` is still debug-asserted, since it isn't data a caller
    /// supplies at this boundary.
    pub fn try_new(config: SensorModelConfig) -> Result<Self, crate::error::SlamError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// The likelihood of one beam's observed range under the map, found by
    /// casting from `pose` in the beam's absolute direction and scoring the
    /// observed range against the distance to the first occupied cell.
    /// Returns `1.0` (no evidence) if the ray sees no occupancy before
    /// `max_ray`.
    pub fn prob_ray(
        &self,
        pose: Pose,
        beam_angle: f64,
        observed_range: f64,
        lookup: &dyn Fn(i32, i32) -> bool,
    ) -> f64 {
        let absolute_angle = pose.angle + beam_angle;
        let endpoint = pose.position
            + Point::new(
                self.config.max_ray * absolute_angle.cos(),
                self.config.max_ray * absolute_angle.sin(),
            );

        let mut expected: Option<Point> = None;
        trace(pose.position, endpoint, |cx, cy, _remaining| {
            if lookup(cx, cy) {
                expected = Some(Point::new(cx as f64 + 0.5, cy as f64 + 0.5));
                true
            } else {
                false
            }
        });

        match expected {
            Some(cell_center) => {
                let expected_dist = pose.position.dist(cell_center);
                prob_normal(observed_range, expected_dist, self.config.variance)
            }
            None => 1.0,
        }
    }

    /// The likelihood of the whole scan under the map: the product, over
    /// the sampled beam indices, of each beam's floored likelihood.
    pub fn prob(&self, pose: Pose, scan: &Measurement, lookup: &dyn Fn(i32, i32) -> bool) -> f64 {
        debug_assert_eq!(scan.size(), self.config.size as usize);
        let mut total = 1.0;
        let mut i = self.start_index as usize;
        while i < scan.size() {
            let beam_angle = i as f64 * self.delta_rot;
            let p = self.prob_ray(pose, beam_angle, scan.range(i), lookup);
            total *= p.max(LIKELIHOOD_FLOOR);
            i += self.range_size as usize;
        }
        total
    }

    /// For each sampled beam, ray-traces to the reported hit endpoint and
    /// calls `writer(Bit::Free, cx, cy)` for every cell along the way
    /// except the last, and `writer(Bit::Occupied, cx, cy)` for the
    /// terminal cell. Beams reporting no return (`range == 0.0`) carry no
    /// endpoint to write and are skipped.
    pub fn update(&self, pose: Pose, scan: &Measurement, mut writer: impl FnMut(Bit, i32, i32)) {
        debug_assert_eq!(scan.size(), self.config.size as usize);
        let mut i = self.start_index as usize;
        while i < scan.size() {
            let range = scan.range(i);
            if range != 0.0 {
                let beam_angle = i as f64 * self.delta_rot;
                let absolute_angle = pose.angle + beam_angle;
                let endpoint = pose.position
                    + Point::new(range * absolute_angle.cos(), range * absolute_angle.sin());
                trace(pose.position, endpoint, |cx, cy, remaining| {
                    let bit = if remaining == 0 {
                        Bit::Occupied
                    } else {
                        Bit::Free
                    };
                    writer(bit, cx, cy);
                    false
                });
            }
            i += self.range_size as usize;
        }
    }

    /// Advances the rotating start index, interleaving the sampled beam
    /// set across steps.
    pub fn increment(&mut self) {
        self.start_index = (self.start_index + 1) % self.range_size;
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }
}
