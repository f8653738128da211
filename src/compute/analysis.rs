//! Simulation statistics and pattern detection.
//!
//! Explicitly caller-invoked: each [`AnalysisEngine::analyze`] call reduces
//! the current field to an [`AnalysisSnapshot`], pushes the scalars into
//! fixed-depth ring buffers, and re-evaluates the stabilization, periodicity,
//! and movement detectors. Nothing here runs automatically per step.

use serde::{Deserialize, Serialize};

use super::Field;

/// Depth of every history ring buffer.
pub const HISTORY_SIZE: usize = 512;

/// Snapshots examined by the stabilization check.
pub const STABLE_WINDOW: usize = 30;

/// Smallest detectable period, in snapshots.
pub const MIN_PERIOD: usize = 4;

/// Largest detectable period, in snapshots.
pub const MAX_PERIOD: usize = 200;

/// Periodicity detection runs every this many analyze calls.
pub const PERIOD_CHECK_INTERVAL: u32 = 16;

/// Autocorrelation required to declare a period.
pub const PERIOD_THRESHOLD: f32 = 0.85;

/// Aggregate statistics for one analyze call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Sum of all cell values (channel sum per cell).
    pub total_mass: f32,
    /// Maximum cell value.
    pub max_value: f32,
    /// Minimum non-zero cell value.
    pub min_value: f32,
    /// Cells above the analyze threshold.
    pub alive_count: usize,
    /// Unweighted centroid of alive cells.
    pub centroid_x: f32,
    pub centroid_y: f32,
    /// Value-weighted centroid.
    pub weighted_x: f32,
    pub weighted_y: f32,
    /// Mean cell value.
    pub mean_value: f32,
    /// Value variance.
    pub variance: f32,
    /// Axis-aligned bounding box of alive cells.
    pub bound_min_x: f32,
    pub bound_min_y: f32,
    pub bound_max_x: f32,
    pub bound_max_y: f32,
    /// Total grid cells.
    pub total_cells: usize,
    /// Distance between this and the previous centroid.
    pub movement_speed: f32,
    /// Movement heading in degrees.
    pub movement_direction: f32,
    /// Bounding-box aspect angle in degrees.
    pub orientation: f32,
    /// Rough estimate of distinct organisms.
    pub species_count: usize,
}

/// Computes statistics and detects patterns across analyze calls.
pub struct AnalysisEngine {
    data: AnalysisSnapshot,
    mass_history: Vec<f32>,
    alive_history: Vec<f32>,
    centroid_x_history: Vec<f32>,
    centroid_y_history: Vec<f32>,
    speed_history: Vec<f32>,
    direction_history: Vec<f32>,
    orientation_history: Vec<f32>,
    head: usize,
    count: usize,
    analyze_counter: u32,
    stabilized: bool,
    empty: bool,
    periodic: bool,
    period: usize,
    period_confidence: f32,
    prev_centroid: Option<(f32, f32)>,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self {
            data: AnalysisSnapshot::default(),
            mass_history: vec![0.0; HISTORY_SIZE],
            alive_history: vec![0.0; HISTORY_SIZE],
            centroid_x_history: vec![0.0; HISTORY_SIZE],
            centroid_y_history: vec![0.0; HISTORY_SIZE],
            speed_history: vec![0.0; HISTORY_SIZE],
            direction_history: vec![0.0; HISTORY_SIZE],
            orientation_history: vec![0.0; HISTORY_SIZE],
            head: 0,
            count: 0,
            analyze_counter: 0,
            stabilized: false,
            empty: true,
            periodic: false,
            period: 0,
            period_confidence: 0.0,
            prev_centroid: None,
        }
    }

    /// Analyze the field's current buffer and record the snapshot.
    pub fn analyze(&mut self, field: &Field, threshold: f32) -> AnalysisSnapshot {
        let snapshot = Self::reduce(field, threshold);
        self.record(snapshot)
    }

    /// Reduce the current buffer to aggregate statistics.
    ///
    /// Multi-channel fields are reduced over the per-cell channel sum.
    pub fn reduce(field: &Field, threshold: f32) -> AnalysisSnapshot {
        let width = field.width();
        let height = field.height();

        let mut snap = AnalysisSnapshot {
            total_cells: width * height,
            min_value: f32::INFINITY,
            bound_min_x: f32::INFINITY,
            bound_min_y: f32::INFINITY,
            bound_max_x: f32::NEG_INFINITY,
            bound_max_y: f32::NEG_INFINITY,
            ..Default::default()
        };

        let mut sum_sq = 0.0f64;
        let mut weighted_x = 0.0f64;
        let mut weighted_y = 0.0f64;
        let mut alive_x = 0.0f64;
        let mut alive_y = 0.0f64;

        for y in 0..height {
            for x in 0..width {
                let v = field.sum_at(x, y);

                snap.total_mass += v;
                sum_sq += (v as f64) * (v as f64);
                if v > snap.max_value {
                    snap.max_value = v;
                }
                if v > 0.0 && v < snap.min_value {
                    snap.min_value = v;
                }

                weighted_x += (v * x as f32) as f64;
                weighted_y += (v * y as f32) as f64;

                if v > threshold {
                    snap.alive_count += 1;
                    alive_x += x as f64;
                    alive_y += y as f64;
                    snap.bound_min_x = snap.bound_min_x.min(x as f32);
                    snap.bound_min_y = snap.bound_min_y.min(y as f32);
                    snap.bound_max_x = snap.bound_max_x.max(x as f32);
                    snap.bound_max_y = snap.bound_max_y.max(y as f32);
                }
            }
        }

        if snap.min_value == f32::INFINITY {
            snap.min_value = 0.0;
        }
        if snap.alive_count == 0 {
            snap.bound_min_x = 0.0;
            snap.bound_min_y = 0.0;
            snap.bound_max_x = 0.0;
            snap.bound_max_y = 0.0;
        } else {
            snap.centroid_x = (alive_x / snap.alive_count as f64) as f32;
            snap.centroid_y = (alive_y / snap.alive_count as f64) as f32;
        }

        if snap.total_mass > 0.0 {
            snap.weighted_x = (weighted_x / snap.total_mass as f64) as f32;
            snap.weighted_y = (weighted_y / snap.total_mass as f64) as f32;
        }

        let n = snap.total_cells as f64;
        snap.mean_value = (snap.total_mass as f64 / n) as f32;
        snap.variance = (sum_sq / n - (snap.mean_value as f64).powi(2)).max(0.0) as f32;

        snap
    }

    /// Record a snapshot: derive movement, push history, run the detectors.
    ///
    /// Exposed separately from [`Self::analyze`] so synthetic histories can
    /// be driven through the same path.
    pub fn record(&mut self, mut snapshot: AnalysisSnapshot) -> AnalysisSnapshot {
        self.derive_movement(&mut snapshot);

        self.mass_history[self.head] = snapshot.total_mass;
        self.alive_history[self.head] = snapshot.alive_count as f32;
        self.centroid_x_history[self.head] = snapshot.centroid_x;
        self.centroid_y_history[self.head] = snapshot.centroid_y;
        self.speed_history[self.head] = snapshot.movement_speed;
        self.direction_history[self.head] = snapshot.movement_direction;
        self.orientation_history[self.head] = snapshot.orientation;

        self.head = (self.head + 1) % HISTORY_SIZE;
        if self.count < HISTORY_SIZE {
            self.count += 1;
        }

        self.empty = snapshot.alive_count == 0;
        self.check_stabilization();

        self.analyze_counter += 1;
        if self.analyze_counter % PERIOD_CHECK_INTERVAL == 0 {
            self.detect_periodicity();
        }

        self.data = snapshot.clone();
        snapshot
    }

    fn derive_movement(&mut self, snap: &mut AnalysisSnapshot) {
        if snap.alive_count == 0 {
            snap.movement_speed = 0.0;
            snap.movement_direction = 0.0;
            snap.orientation = 0.0;
            snap.species_count = 0;
            self.prev_centroid = None;
            return;
        }

        if let Some((px, py)) = self.prev_centroid {
            let dx = snap.centroid_x - px;
            let dy = snap.centroid_y - py;
            snap.movement_speed = (dx * dx + dy * dy).sqrt();
            snap.movement_direction = dy.atan2(dx).to_degrees();
        }
        self.prev_centroid = Some((snap.centroid_x, snap.centroid_y));

        let bw = snap.bound_max_x - snap.bound_min_x;
        let bh = snap.bound_max_y - snap.bound_min_y;
        if bw > 1e-3 || bh > 1e-3 {
            snap.orientation = bh.atan2(bw).to_degrees();
        }

        // Crude organism count: bounding area over a nominal radius-10
        // organism footprint, collapsed to one blob at high density.
        let density = snap.alive_count as f32 / snap.total_cells as f32;
        let area = (bw * bh).max(1.0);
        let footprint = std::f32::consts::PI * 10.0 * 10.0;
        let mut estimate = ((area / footprint) as usize).max(1);
        if density > 0.3 {
            estimate = 1;
        }
        snap.species_count = estimate.min(snap.alive_count);
    }

    /// Index into a ring buffer counting back from the most recent sample.
    #[inline]
    fn back(&self, i: usize) -> usize {
        (self.head + HISTORY_SIZE - 1 - i) % HISTORY_SIZE
    }

    fn check_stabilization(&mut self) {
        self.stabilized = false;
        if self.count < STABLE_WINDOW {
            return;
        }

        let mut max_mass = f32::NEG_INFINITY;
        let mut min_mass = f32::INFINITY;
        for i in 0..STABLE_WINDOW {
            let m = self.mass_history[self.back(i)];
            max_mass = max_mass.max(m);
            min_mass = min_mass.min(m);
        }

        let range = max_mass - min_mass;
        let avg = (max_mass + min_mass) * 0.5;
        let rel_range = if avg > 1e-6 { range / avg } else { range };
        self.stabilized = rel_range < 0.001 && !self.empty;
    }

    /// Detect periodic behavior via the autocorrelation of the mass history.
    ///
    /// The lag with the highest correlation is the candidate period; it is
    /// only declared once the correlation clears [`PERIOD_THRESHOLD`].
    fn detect_periodicity(&mut self) {
        self.periodic = false;
        self.period = 0;
        self.period_confidence = 0.0;

        let n = self.count;
        if n < MIN_PERIOD * 3 {
            return;
        }
        let max_lag = MAX_PERIOD.min(n / 2);
        if max_lag < MIN_PERIOD {
            return;
        }

        let start = (self.head + HISTORY_SIZE - n) % HISTORY_SIZE;
        let at = |i: usize| self.mass_history[(start + i) % HISTORY_SIZE];

        let mut mean = 0.0f32;
        for i in 0..n {
            mean += at(i);
        }
        mean /= n as f32;

        let mut var = 0.0f32;
        for i in 0..n {
            let d = at(i) - mean;
            var += d * d;
        }
        if var < 1e-10 {
            // Constant signal carries no period.
            return;
        }

        let mut best_lag = 0;
        let mut best_corr = -1.0f32;
        for lag in MIN_PERIOD..=max_lag {
            let mut corr = 0.0f32;
            for i in 0..n - lag {
                corr += (at(i) - mean) * (at(i + lag) - mean);
            }
            corr /= var;
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        if best_corr >= PERIOD_THRESHOLD && best_lag >= MIN_PERIOD {
            self.periodic = true;
            self.period = best_lag;
            self.period_confidence = best_corr;
        }
    }

    /// Most recent snapshot.
    pub fn data(&self) -> &AnalysisSnapshot {
        &self.data
    }

    /// Number of valid history samples (up to [`HISTORY_SIZE`]).
    pub fn history_len(&self) -> usize {
        self.count
    }

    /// Ring buffer head (next write position).
    pub fn history_head(&self) -> usize {
        self.head
    }

    pub fn mass_history(&self, i: usize) -> f32 {
        self.mass_history[i % HISTORY_SIZE]
    }

    pub fn alive_history(&self, i: usize) -> f32 {
        self.alive_history[i % HISTORY_SIZE]
    }

    pub fn centroid_x_history(&self, i: usize) -> f32 {
        self.centroid_x_history[i % HISTORY_SIZE]
    }

    pub fn centroid_y_history(&self, i: usize) -> f32 {
        self.centroid_y_history[i % HISTORY_SIZE]
    }

    pub fn speed_history(&self, i: usize) -> f32 {
        self.speed_history[i % HISTORY_SIZE]
    }

    pub fn direction_history(&self, i: usize) -> f32 {
        self.direction_history[i % HISTORY_SIZE]
    }

    pub fn orientation_history(&self, i: usize) -> f32 {
        self.orientation_history[i % HISTORY_SIZE]
    }

    pub fn is_stabilized(&self) -> bool {
        self.stabilized
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn detected_period(&self) -> usize {
        self.period
    }

    pub fn period_confidence(&self) -> f32 {
        self.period_confidence
    }
}
