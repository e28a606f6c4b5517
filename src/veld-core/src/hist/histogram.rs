//! One-, two- and three-dimensional histograms.

use serde::{Deserialize, Serialize};

use super::{Axis, Fillable};

/// One-dimensional weighted histogram.
///
/// A model built with degenerate limits (`lo == hi`) buffers its fills and
/// derives the axis range from the observed values when finalized, so the
/// caller does not need to know the data range up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist1D {
    axis: Axis,
    bins: Vec<f64>,
    entries: u64,
    sumw: f64,
    sumwx: f64,
    /// Buffered `(value, weight)` pairs while the axis is unresolved.
    buffer: Option<Vec<(f64, f64)>>,
}

impl Hist1D {
    /// Create a histogram with `nbins` uniform bins between `lo` and `hi`.
    ///
    /// Passing `lo == hi` defers the axis limits to the observed data.
    pub fn new(nbins: usize, lo: f64, hi: f64) -> Self {
        let axis = Axis::new(nbins.max(1), lo, hi);
        let buffer = axis.is_degenerate().then(Vec::new);
        let nbins = axis.nbins();
        Self {
            axis,
            bins: vec![0.0; nbins],
            entries: 0,
            sumw: 0.0,
            sumwx: 0.0,
            buffer,
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

    /// Sum of weights in bin `i`.
    pub fn bin_content(&self, i: usize) -> f64 {
        self.bins.get(i).copied().unwrap_or(0.0)
    }

    /// Sum of all bin contents.
    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Weighted mean of the filled values.
    pub fn mean(&self) -> f64 {
        if self.sumw == 0.0 {
            0.0
        } else {
            self.sumwx / self.sumw
        }
    }

    fn record(&mut self, value: f64, weight: f64) {
        self.entries += 1;
        self.sumw += weight;
        self.sumwx += weight * value;
        if let Some(buffer) = &mut self.buffer {
            buffer.push((value, weight));
        } else if let Some(i) = self.axis.index(value) {
            self.bins[i] += weight;
        }
    }
}

impl Fillable for Hist1D {
    fn dimensions(&self) -> usize {
        1
    }

    fn fill(&mut self, values: &[f64]) {
        debug_assert!(matches!(values.len(), 1 | 2));
        let weight = values.get(1).copied().unwrap_or(1.0);
        self.record(values[0], weight);
    }

    fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        self.sumw += other.sumw;
        self.sumwx += other.sumwx;
        match (&mut self.buffer, &other.buffer) {
            (Some(buffer), Some(other_buffer)) => buffer.extend_from_slice(other_buffer),
            (None, None) => {
                for (bin, content) in self.bins.iter_mut().zip(&other.bins) {
                    *bin += content;
                }
            }
            // Clones of one model are either all buffered or none.
            _ => unreachable!("merging histograms with different axis modes"),
        }
    }

    fn has_finite_limits(&self) -> bool {
        !self.axis.is_degenerate()
    }

    fn can_extend_axes(&self) -> bool {
        self.buffer.is_some()
    }

    fn finalize(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        if buffer.is_empty() {
            self.axis = Axis::new(self.axis.nbins(), 0.0, 1.0);
            return;
        }
        let min = buffer.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
        let max = buffer
            .iter()
            .map(|(v, _)| *v)
            .fold(f64::NEG_INFINITY, f64::max);
        let span = if max > min { max - min } else { 1.0 };
        // Nudge the upper edge so the maximum lands in the last bin.
        self.axis = Axis::new(self.axis.nbins(), min, min + span * (1.0 + 1e-9));
        for (value, weight) in buffer {
            if let Some(i) = self.axis.index(value) {
                self.bins[i] += weight;
            }
        }
    }
}

/// Two-dimensional weighted histogram. Requires finite axis limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist2D {
    xaxis: Axis,
    yaxis: Axis,
    bins: Vec<f64>,
    entries: u64,
}

impl Hist2D {
    /// Create a histogram over the given x and y binning.
    pub fn new(nx: usize, xlo: f64, xhi: f64, ny: usize, ylo: f64, yhi: f64) -> Self {
        let xaxis = Axis::new(nx.max(1), xlo, xhi);
        let yaxis = Axis::new(ny.max(1), ylo, yhi);
        let bins = vec![0.0; xaxis.nbins() * yaxis.nbins()];
        Self {
            xaxis,
            yaxis,
            bins,
            entries: 0,
        }
    }

    /// The x axis.
    pub fn xaxis(&self) -> &Axis {
        &self.xaxis
    }

    /// The y axis.
    pub fn yaxis(&self) -> &Axis {
        &self.yaxis
    }

    /// Total number of fill calls.
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights in bin `(ix, iy)`.
    pub fn bin_content(&self, ix: usize, iy: usize) -> f64 {
        self.bins
            .get(iy * self.xaxis.nbins() + ix)
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of all bin contents.
    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }
}

impl Fillable for Hist2D {
    fn dimensions(&self) -> usize {
        2
    }

    fn fill(&mut self, values: &[f64]) {
        debug_assert!(matches!(values.len(), 2 | 3));
        self.entries += 1;
        let weight = values.get(2).copied().unwrap_or(1.0);
        if let (Some(ix), Some(iy)) = (self.xaxis.index(values[0]), self.yaxis.index(values[1])) {
            self.bins[iy * self.xaxis.nbins() + ix] += weight;
        }
    }

    fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        for (bin, content) in self.bins.iter_mut().zip(&other.bins) {
            *bin += content;
        }
    }

    fn has_finite_limits(&self) -> bool {
        !self.xaxis.is_degenerate() && !self.yaxis.is_degenerate()
    }
}

/// Three-dimensional weighted histogram. Requires finite axis limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist3D {
    axes: [Axis; 3],
    bins: Vec<f64>,
    entries: u64,
}

impl Hist3D {
    /// Create a histogram over the given x, y and z binning.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: usize,
        xlo: f64,
        xhi: f64,
        ny: usize,
        ylo: f64,
        yhi: f64,
        nz: usize,
        zlo: f64,
        zhi: f64,
    ) -> Self {
        let axes = [
            Axis::new(nx.max(1), xlo, xhi),
            Axis::new(ny.max(1), ylo, yhi),
            Axis::new(nz.max(1), zlo, zhi),
        ];
        let bins = vec![0.0; axes.iter().map(Axis::nbins).product()];
        Self {
            axes,
            bins,
            entries: 0,
        }
    }

    /// Total number of fill calls.
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights in bin `(ix, iy, iz)`.
    pub fn bin_content(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        let (nx, ny) = (self.axes[0].nbins(), self.axes[1].nbins());
        self.bins.get((iz * ny + iy) * nx + ix).copied().unwrap_or(0.0)
    }

    /// Sum of all bin contents.
    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }
}

impl Fillable for Hist3D {
    fn dimensions(&self) -> usize {
        3
    }

    fn fill(&mut self, values: &[f64]) {
        debug_assert!(matches!(values.len(), 3 | 4));
        self.entries += 1;
        let weight = values.get(3).copied().unwrap_or(1.0);
        let indices = [
            self.axes[0].index(values[0]),
            self.axes[1].index(values[1]),
            self.axes[2].index(values[2]),
        ];
        if let [Some(ix), Some(iy), Some(iz)] = indices {
            let (nx, ny) = (self.axes[0].nbins(), self.axes[1].nbins());
            self.bins[(iz * ny + iy) * nx + ix] += weight;
        }
    }

    fn merge(&mut self, other: &Self) {
        self.entries += other.entries;
        for (bin, content) in self.bins.iter_mut().zip(&other.bins) {
            *bin += content;
        }
    }

    fn has_finite_limits(&self) -> bool {
        self.axes.iter().all(|a| !a.is_degenerate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hist1d_fill_and_query() {
        let mut h = Hist1D::new(10, 0.0, 10.0);
        h.fill(&[0.5]);
        h.fill(&[0.7]);
        h.fill(&[9.5]);
        h.fill(&[42.0]); // out of range, dropped
        assert_eq!(h.entries(), 4);
        assert_eq!(h.bin_content(0), 2.0);
        assert_eq!(h.bin_content(9), 1.0);
        assert_eq!(h.integral(), 3.0);
    }

    #[test]
    fn test_hist1d_weighted() {
        let mut h = Hist1D::new(4, 0.0, 4.0);
        h.fill(&[1.5, 2.0]);
        h.fill(&[1.5, 0.5]);
        assert_eq!(h.bin_content(1), 2.5);
    }

    #[test]
    fn test_hist1d_merge() {
        let model = Hist1D::new(4, 0.0, 4.0);
        let mut a = model.clone();
        let mut b = model.clone();
        a.fill(&[0.5]);
        b.fill(&[0.5]);
        b.fill(&[3.5]);
        a.merge(&b);
        assert_eq!(a.entries(), 3);
        assert_eq!(a.bin_content(0), 2.0);
        assert_eq!(a.bin_content(3), 1.0);
    }

    #[test]
    fn test_hist1d_auto_extend() {
        let mut h = Hist1D::new(8, 0.0, 0.0);
        assert!(!h.has_finite_limits());
        assert!(h.can_extend_axes());
        for v in [2.0, 3.0, 5.0, 9.0] {
            h.fill(&[v]);
        }
        h.finalize();
        assert!(h.has_finite_limits());
        assert_eq!(h.integral(), 4.0);
        assert_eq!(h.axis().lo(), 2.0);
        // The maximum must land inside the axis.
        assert!(h.axis().index(9.0).is_some());
    }

    #[test]
    fn test_hist1d_mean() {
        let mut h = Hist1D::new(10, 0.0, 10.0);
        h.fill(&[2.0]);
        h.fill(&[4.0]);
        assert_eq!(h.mean(), 3.0);
    }

    #[test]
    fn test_hist2d() {
        let mut h = Hist2D::new(2, 0.0, 2.0, 2, 0.0, 2.0);
        h.fill(&[0.5, 1.5]);
        h.fill(&[1.5, 0.5, 3.0]);
        assert_eq!(h.bin_content(0, 1), 1.0);
        assert_eq!(h.bin_content(1, 0), 3.0);
        assert_eq!(h.integral(), 4.0);
        assert!(h.has_finite_limits());
        assert!(!Hist2D::new(2, 0.0, 0.0, 2, 0.0, 2.0).has_finite_limits());
    }

    #[test]
    fn test_hist3d() {
        let mut h = Hist3D::new(2, 0.0, 2.0, 2, 0.0, 2.0, 2, 0.0, 2.0);
        h.fill(&[0.5, 1.5, 1.5]);
        assert_eq!(h.bin_content(0, 1, 1), 1.0);
        assert_eq!(h.integral(), 1.0);
    }
}
