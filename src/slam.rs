//! The top-level driver: owns the ancestry tree, the distributed map, the
//! motion/sensor models, and the particle filter, and sequences one
//! predict/weight/resample/sensor-update cycle per `update()` call.

use tracing::{debug, instrument};

use crate::filter::{ParticleFilter, ParticleModel};
use crate::map::DistributedMap;
use crate::motion::{Control, MotionModel};
use crate::sensor::{Measurement, SensorModel};
use crate::tree::{NodeId, Tree};
use crate::utility::{Pose, Rng};

/// A dense occupancy snapshot of a rectangular region, row-major from the
/// region's low-y edge to its high-y edge. `true` means occupied.
pub type Grid = Vec<Vec<bool>>;

/// `FilterConfig`: particle-count and resampling knobs, independent of the
/// motion/sensor models' own configs so a host can tune them separately.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterConfig {
    pub particle_count: usize,
    pub elimination_factor: f64,
    /// Resample whenever `effective_sample_size() < resample_threshold_frac * particle_count`.
    pub resample_threshold_frac: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            particle_count: 100,
            elimination_factor: 0.0,
            resample_threshold_frac: 0.5,
        }
    }
}

/// Ties a tree node's id to the sensor-model lookup closure its map entries
/// need, so `ParticleModel::weight_one` can borrow both `tree` and `map`
/// read-only during the parallel weighting pass.
struct SlamModel<'a> {
    tree: &'a mut Tree,
    map: &'a DistributedMap,
    motion: &'a MotionModel,
    sensor: &'a SensorModel,
    rng: &'a mut Rng,
}

impl<'a> ParticleModel<NodeId, Control, Measurement> for SlamModel<'a> {
    fn predict_one(&mut self, particle: &NodeId, control: &Control) -> NodeId {
        let prior = self.tree.pose(*particle);
        let pose = self.motion.sample(self.rng, *control, prior);
        self.tree.new_child(*particle, pose)
    }

    fn weight_one(&self, particle: &NodeId, measurement: &Measurement) -> f64 {
        let pose = self.tree.pose(*particle);
        let tree: &Tree = &*self.tree;
        let map = self.map;
        let lookup = |cx: i32, cy: i32| map.lookup(tree, *particle, cx, cy).is_occupied();
        self.sensor.prob(pose, measurement, &lookup)
    }
}

/// A particle filter over the distributed-particle SLAM ancestry tree:
/// every particle is a `NodeId` into `tree`, its occupancy evidence lives
/// in `map`, and `update()` advances the whole population by one
/// odometry/scan cycle.
pub struct SlamEstimator {
    tree: Tree,
    map: DistributedMap,
    motion: MotionModel,
    sensor: SensorModel,
    filter: ParticleFilter,
    particles: Vec<NodeId>,
    rng: Rng,
    resample_threshold_frac: f64,
}

impl SlamEstimator {
    pub fn new(
        config: FilterConfig,
        motion: MotionModel,
        sensor: SensorModel,
        rng: Rng,
    ) -> Self {
        debug_assert!(config.particle_count > 0);
        let tree = Tree::new();
        let root = tree.root();
        Self {
            tree,
            map: DistributedMap::new(),
            motion,
            sensor,
            filter: ParticleFilter::new(config.particle_count, config.elimination_factor),
            particles: vec![root; config.particle_count],
            rng,
            resample_threshold_frac: config.resample_threshold_frac,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn effective_sample_size(&self) -> f64 {
        self.filter.effective_sample_size()
    }

    /// Runs one predict/weight/(maybe resample)/trim/sensor-update cycle:
    /// 1. Predict: every particle advances to a fresh child node under the
    ///    motion model.
    /// 2. Weight: every particle's likelihood is scored against `scan`.
    /// 3. If the effective sample size has fallen below threshold,
    ///    resample; otherwise keep the current population.
    /// 4. Trim every old particle position, now that its children (or its
    ///    own survival) are settled.
    /// 5. Each particle writes `scan`'s implied free/occupied cells into
    ///    the map and advances the sensor's beam rotation.
    #[instrument(skip(self, control, scan))]
    pub fn update(&mut self, control: Control, scan: &Measurement) {
        let mut model = SlamModel {
            tree: &mut self.tree,
            map: &self.map,
            motion: &self.motion,
            sensor: &self.sensor,
            rng: &mut self.rng,
        };
        let predicted = self.filter.predict(&mut model, &self.particles, &control);

        let model = SlamModel {
            tree: &mut self.tree,
            map: &self.map,
            motion: &self.motion,
            sensor: &self.sensor,
            rng: &mut self.rng,
        };
        self.filter.weight(&model, &predicted, scan);

        let ess = self.filter.effective_sample_size();
        let threshold = self.resample_threshold_frac * predicted.len() as f64;
        self.particles = if ess < threshold {
            debug!(ess, threshold, "resampling particle population");
            self.filter.resample(&mut self.rng, &predicted)
        } else {
            predicted.clone()
        };

        // Every predicted hypothesis not carried into the surviving
        // population is a dead particle: mark it as such so trimming can
        // erase its (still empty) cell entries and collapse the branch.
        let mut survivor_counts = std::collections::HashMap::new();
        for &id in &self.particles {
            *survivor_counts.entry(id).or_insert(0u32) += 1;
        }
        for &id in &predicted {
            let count = survivor_counts.entry(id).or_insert(0);
            if *count == 0 {
                self.tree.set_leaf(id, false);
                self.tree.trim(id, &mut self.map);
            } else {
                *count -= 1;
            }
        }

        // Trim every surviving predicted particle too: trim is idempotent, so
        // calling it again on a particle the dead-particle pass above
        // already trimmed is harmless, and together the two passes cover
        // the whole predicted population.
        for &particle in &self.particles {
            self.tree.trim(particle, &mut self.map);
        }

        for &particle in &self.particles {
            let pose = self.tree.pose(particle);
            let mut writes = Vec::new();
            self.sensor
                .update(pose, scan, |bit, cx, cy| writes.push((bit, cx, cy)));
            for (bit, cx, cy) in writes {
                if self.map.update(&self.tree, particle, cx, cy, bit) {
                    self.tree.add_cell(particle, cx, cy);
                }
            }
        }

        self.sensor.increment();
    }

    /// Samples a dense occupancy grid over `[x_min, x_max) x [y_min, y_max)`
    /// at unit-cell resolution, resolved against one particle drawn from
    /// the current population, alongside that particle's pose.
    pub fn sample(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> (Pose, Grid) {
        let particle = self.filter.sample(&mut self.rng, &self.particles);
        let pose = self.tree.pose(particle);
        let mut grid = Vec::with_capacity((y_max - y_min).max(0) as usize);
        for cy in y_min..y_max {
            let mut row = Vec::with_capacity((x_max - x_min).max(0) as usize);
            for cx in x_min..x_max {
                row.push(
                    self.map
                        .lookup(&self.tree, particle, cx, cy)
                        .is_occupied(),
                );
            }
            grid.push(row);
        }
        (pose, grid)
    }
}
