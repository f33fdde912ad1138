//! 2-D pose algebra and the sampling primitives built on top of it.
//!
//! `Point` and `Pose` are plain value types: every operation returns a fresh
//! value rather than mutating in place, which is what lets the rest of the
//! crate pass poses around by copy without worrying about aliasing.

use std::ops::{Add, AddAssign, Div, Mul, Sub};

use rand::Rng as _;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A 2-D Cartesian point.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn dist(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// The integer cell this point falls in, for a unit-sized grid.
    pub fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A 2-D pose: position plus heading. Equality is bit-exact; `dist` only
/// considers the position, since heading doesn't affect how far apart two
/// poses are in the map.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point,
    pub angle: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self {
            position: Point::new(x, y),
            angle,
        }
    }

    /// Builds a pose from polar coordinates: `(x, y) = (r cos angle, r sin angle)`.
    pub fn polar(r: f64, angle: f64) -> Self {
        Self {
            position: Point::new(r * angle.cos(), r * angle.sin()),
            angle,
        }
    }

    pub fn dist(&self, other: Pose) -> f64 {
        self.position.dist(other.position)
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }
}

impl Add for Pose {
    type Output = Pose;
    fn add(self, rhs: Pose) -> Pose {
        Pose {
            position: self.position + rhs.position,
            angle: self.angle + rhs.angle,
        }
    }
}

impl AddAssign for Pose {
    fn add_assign(&mut self, rhs: Pose) {
        *self = *self + rhs;
    }
}

impl Sub for Pose {
    type Output = Pose;
    fn sub(self, rhs: Pose) -> Pose {
        Pose {
            position: self.position - rhs.position,
            angle: self.angle - rhs.angle,
        }
    }
}

impl Div<f64> for Pose {
    type Output = Pose;
    fn div(self, rhs: f64) -> Pose {
        Pose {
            position: self.position * (1. / rhs),
            angle: self.angle / rhs,
        }
    }
}

/// An explicit, seedable random source. Every part of the crate that needs
/// randomness takes one of these rather than reaching for
/// `rand::thread_rng()`, so a caller can seed it and get a reproducible run.
#[derive(Clone)]
pub struct Rng(StdRng);

impl Rng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// A uniform draw from `(0, 1]`, excluding zero so callers can safely
    /// take its logarithm.
    pub fn unit_open_below(&mut self) -> f64 {
        // gen::<f64>() draws from [0, 1); flipping keeps it in (0, 1].
        1.0 - self.0.gen::<f64>()
    }

    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.0.gen_range(lo..hi)
    }

    pub fn gen<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.gen()
    }
}

/// Samples one value from `Normal(mean, variance)` via Box-Muller, using two
/// uniform draws from `(0, 1]` so the logarithm never sees zero.
pub fn sample_normal(rng: &mut Rng, mean: f64, variance: f64) -> f64 {
    debug_assert!(variance >= 0.0, "variance must be non-negative");
    let u1 = rng.unit_open_below();
    let u2 = rng.unit_open_below();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + variance.sqrt() * z
}

/// The Gaussian probability density of `v` under `Normal(mean, variance)`.
pub fn prob_normal(v: f64, mean: f64, variance: f64) -> f64 {
    debug_assert!(variance > 0.0, "variance must be positive");
    let diff = v - mean;
    (-diff * diff / (2.0 * variance)).exp() / (2.0 * std::f64::consts::PI * variance).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_muller_sanity() {
        let mut rng = Rng::from_seed(42);
        let n = 100_000;
        let samples: Vec<f64> = (0..n).map(|_| sample_normal(&mut rng, 0.0, 1.0)).collect();
        let mean: f64 = samples.iter().sum::<f64>() / n as f64;
        let var: f64 =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.02, "mean={mean}");
        assert!((var - 1.0).abs() < 0.05, "var={var}");
    }

    #[test]
    fn pose_add_sub_roundtrip() {
        let a = Pose::new(1.0, 2.0, 0.5);
        let b = Pose::new(-3.0, 4.5, 0.1);
        assert_relative_eq!((a + b - b).x(), a.x(), epsilon = 1e-12);
        assert_relative_eq!((a + b - b).y(), a.y(), epsilon = 1e-12);
        assert_relative_eq!((a + b - b).angle, a.angle, epsilon = 1e-12);
    }

    #[test]
    fn polar_matches_trig() {
        let p = Pose::polar(2.0, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(p.x(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn point_cell_floors() {
        assert_eq!(Point::new(1.9, -0.1).cell(), (1, -1));
    }
}
