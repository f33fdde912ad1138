//! Distributed-Particle SLAM: a particle filter over a shared
//! ancestry-tree occupancy map.
//!
//! A [`SlamEstimator`] owns a population of pose particles, each one a leaf
//! in an ancestry [`tree::Tree`] whose nodes share a single
//! [`map::DistributedMap`] keyed by the node that wrote each cell. Feed it
//! odometry [`motion::Control`]s and laser [`sensor::Measurement`]s via
//! [`SlamEstimator::update`]; read back a pose and an occupancy grid via
//! [`SlamEstimator::sample`].
//!
//! The crate has no I/O, no UI, and no notion of a sensor or robot beyond
//! the two opaque input records above — synthesizing those, rendering the
//! map, and persisting anything are all a host application's job.

pub mod error;
pub mod filter;
pub mod map;
pub mod motion;
pub mod raytrace;
pub mod sensor;
pub mod slam;
pub mod tree;
pub mod utility;

pub use error::SlamError;
pub use map::{Bit, DistributedMap};
pub use motion::{Control, MotionModel, MotionModelConfig};
pub use sensor::{Measurement, SensorModel, SensorModelConfig};
pub use slam::{FilterConfig, Grid, SlamEstimator};
pub use tree::{NodeId, Tree};
pub use utility::{Pose, Point, Rng};
