//! Profile aggregates: per-bin means of the last coordinate.

use serde::{Deserialize, Serialize};

use super::{Axis, Fillable};

/// One-dimensional profile: the mean of `y` per bin of `x`.
/// Requires finite axis limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile1D {
    axis: Axis,
    sumw: Vec<f64>,
    sumwy: Vec<f64>,
    entries: u64,
}

impl Profile1D {
    /// Create a profile with `nbins` uniform bins between `lo` and `hi`.
    pub fn new(nbins: usize, lo: f64, hi: f64) -> Self {
        let axis = Axis::new(nbins.max(1), lo, hi);
        let nbins = axis.nbins();
        Self {
            axis,
            sumw: vec![0.0; nbins],
            sumwy: vec![0.0; nbins],
            entries: 0,
        }
    }

    /// The binning axis.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Total number of fill calls.
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Mean of `y` in bin `i`, or `0.0` when the bin is empty.
    pub fn mean_at(&self, i: usize) -> f64 {
        match (self.sumwy.get(i), self.sumw.get(i)) {
            (Some(sumwy), Some(&sumw)) if sumw != 0.0 => sumwy / sumw,
            _ => 0.0,
        }
    }

    /// Sum of weights in bin `i`.
    pub fn bin_entries(&self, i: usize) -> f64 {
        self.sumw.get(i).copied().unwrap_or(0.0)
    }
}

impl Fillable for Profile1D {
    fn dimensions(&self) -> usize {
        2
    }

    fn fill(&mut self, values: &[f64]) {
        debug_assert!(matches!(values.len(), 2 | 3));
        self.entries += 1;
        let weight = values.get(2).copied().unwrap_or(1.0);
        if let Some(i) = self.axis.index(values[0]) {
            self.sumw[i] += weight;
            self.sumwy[i] += weight * values[1];
        }
    }

    fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
            *a += b;
        }
        for (a, b) in self.sumwy.iter_mut().zip(&other.sumwy) {
            *a += b;
        }
    }

    fn has_finite_limits(&self) -> bool {
        !self.axis.is_degenerate()
    }
}

/// Two-dimensional profile: the mean of `z` per bin of `(x, y)`.
/// Requires finite axis limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile2D {
    xaxis: Axis,
    yaxis: Axis,
    sumw: Vec<f64>,
    sumwz: Vec<f64>,
    entries: u64,
}

impl Profile2D {
    /// Create a profile over the given x and y binning.
    pub fn new(nx: usize, xlo: f64, xhi: f64, ny: usize, ylo: f64, yhi: f64) -> Self {
        let xaxis = Axis::new(nx.max(1), xlo, xhi);
        let yaxis = Axis::new(ny.max(1), ylo, yhi);
        let nbins = xaxis.nbins() * yaxis.nbins();
        Self {
            xaxis,
            yaxis,
            sumw: vec![0.0; nbins],
            sumwz: vec![0.0; nbins],
            entries: 0,
        }
    }

    /// Total number of fill calls.
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Mean of `z` in bin `(ix, iy)`, or `0.0` when the bin is empty.
    pub fn mean_at(&self, ix: usize, iy: usize) -> f64 {
        let i = iy * self.xaxis.nbins() + ix;
        match (self.sumwz.get(i), self.sumw.get(i)) {
            (Some(sumwz), Some(&sumw)) if sumw != 0.0 => sumwz / sumw,
            _ => 0.0,
        }
    }
}

impl Fillable for Profile2D {
    fn dimensions(&self) -> usize {
        3
    }

    fn fill(&mut self, values: &[f64]) {
        debug_assert!(matches!(values.len(), 3 | 4));
        self.entries += 1;
        let weight = values.get(3).copied().unwrap_or(1.0);
        if let (Some(ix), Some(iy)) = (self.xaxis.index(values[0]), self.yaxis.index(values[1])) {
            let i = iy * self.xaxis.nbins() + ix;
            self.sumw[i] += weight;
            self.sumwz[i] += weight * values[2];
        }
    }

    fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
            *a += b;
        }
        for (a, b) in self.sumwz.iter_mut().zip(&other.sumwz) {
            *a += b;
        }
    }

    fn has_finite_limits(&self) -> bool {
        !self.xaxis.is_degenerate() && !self.yaxis.is_degenerate()
    }
}
