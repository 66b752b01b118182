use ndarray::{s, Array2, ArrayView2};

use crate::error::{invalid, shape, Result};

/// Passive multichannel seismic record.
///
/// Samples are stored `[time, channel]`. The shape-derived fields (`nt`,
/// `nx`) and the sampling rate are recomputed whenever the matrix or the
/// sampling interval is replaced.
#[derive(Debug, Clone)]
pub struct SeismicRecord {
    seismogram: Array2<f64>,
    dt: f64,
    fs: u32,
    nt: usize,
    nx: usize,
}

impl SeismicRecord {
    pub fn new(seismogram: Array2<f64>, dt: f64) -> Result<Self> {
        let mut record = Self {
            seismogram: Array2::zeros((0, 0)),
            dt: 1.0,
            fs: 1,
            nt: 0,
            nx: 0,
        };
        record.set_dt(dt)?;
        record.set_seismogram(seismogram)?;
        Ok(record)
    }

    /// Builds a record from integer counts, as delivered by most digitisers.
    pub fn from_integer_samples(seismogram: Array2<i32>, dt: f64) -> Result<Self> {
        Self::new(seismogram.mapv(f64::from), dt)
    }

    pub fn seismogram(&self) -> &Array2<f64> {
        &self.seismogram
    }

    pub fn set_seismogram(&mut self, seismogram: Array2<f64>) -> Result<()> {
        let (nt, nx) = seismogram.dim();
        if nt == 0 || nx == 0 {
            return Err(shape(format!(
                "seismogram must be non-empty in both dimensions, got {nt}x{nx}"
            )));
        }
        if seismogram.iter().any(|v| !v.is_finite()) {
            return Err(invalid("seismogram must contain finite samples only"));
        }
        self.seismogram = seismogram;
        self.nt = nt;
        self.nx = nx;
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Replaces the sampling interval.
    ///
    /// The rate `round(1 / dt)` must be at least 1 Hz, so intervals above
    /// 2 s are rejected.
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(invalid(format!(
                "sampling interval must be a positive number, got {dt}"
            )));
        }
        let fs = dt.recip().round();
        if fs < 1.0 || fs > u32::MAX as f64 {
            return Err(invalid(format!(
                "sampling interval {dt} s does not map to an integer rate in Hz"
            )));
        }
        self.dt = dt;
        self.fs = fs as u32;
        Ok(())
    }

    /// Sampling rate in Hz, `round(1 / dt)`.
    pub fn sampling_rate(&self) -> u32 {
        self.fs
    }

    pub fn set_sampling_rate(&mut self, fs: u32) -> Result<()> {
        if fs == 0 {
            return Err(invalid("sampling rate must be a positive integer"));
        }
        self.fs = fs;
        self.dt = (fs as f64).recip();
        Ok(())
    }

    /// Nyquist frequency of the record in Hz.
    pub fn nyquist(&self) -> f64 {
        0.5 / self.dt
    }

    /// Number of time samples.
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Number of channels.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of whole windows of `length` samples; trailing samples are not counted.
    pub fn n_windows(&self, length: usize) -> usize {
        if length == 0 {
            0
        } else {
            self.nt / length
        }
    }

    pub fn window(&self, index: usize, length: usize) -> Option<ArrayView2<'_, f64>> {
        let start = index.checked_mul(length)?;
        let end = start.checked_add(length)?;
        if length == 0 || end > self.nt {
            return None;
        }
        Some(self.seismogram.slice(s![start..end, ..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn record(nt: usize, nx: usize) -> SeismicRecord {
        let data = Array2::from_shape_fn((nt, nx), |(t, x)| (t * nx + x) as f64);
        SeismicRecord::new(data, 0.002).unwrap()
    }

    #[test]
    fn derived_fields() {
        let rec = record(100, 12);
        assert_eq!(rec.nt(), 100);
        assert_eq!(rec.nx(), 12);
        assert_eq!(rec.sampling_rate(), 500);
        assert_relative_eq!(rec.nyquist(), 250.0, epsilon = 1e-9);
    }

    #[test]
    fn dt_round_trip() {
        let mut rec = record(10, 2);
        rec.set_dt(0.003).unwrap();
        assert_eq!(rec.sampling_rate(), (1.0f64 / 0.003).round() as u32);

        rec.set_sampling_rate(250).unwrap();
        assert_relative_eq!(rec.dt(), 1.0 / 250.0, epsilon = 1e-15);
        assert_eq!(rec.sampling_rate(), 250);
    }

    #[test]
    fn replacing_matrix_recomputes_shape() {
        let mut rec = record(10, 2);
        rec.set_seismogram(Array2::zeros((40, 7))).unwrap();
        assert_eq!((rec.nt(), rec.nx()), (40, 7));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(SeismicRecord::new(Array2::zeros((0, 3)), 0.01).is_err());
        assert!(SeismicRecord::new(Array2::zeros((3, 0)), 0.01).is_err());
        assert!(SeismicRecord::new(Array2::zeros((3, 3)), 0.0).is_err());
        assert!(SeismicRecord::new(Array2::zeros((3, 3)), -0.5).is_err());
        // slower than 1 Hz rounds to a zero rate
        assert!(SeismicRecord::new(Array2::zeros((3, 3)), 2.5).is_err());
        assert_eq!(SeismicRecord::new(Array2::zeros((3, 3)), 2.0).unwrap().sampling_rate(), 1);

        let mut rec = record(10, 2);
        let mut nan = Array2::zeros((4, 2));
        nan[[1, 1]] = f64::NAN;
        assert!(rec.set_seismogram(nan).is_err());
        assert_eq!(rec.nt(), 10);
        assert!(rec.set_sampling_rate(0).is_err());
        assert_relative_eq!(rec.dt(), 0.002);
    }

    #[test]
    fn integer_samples() {
        let counts = Array2::from_shape_vec((2, 2), vec![1, -2, 3, 4]).unwrap();
        let rec = SeismicRecord::from_integer_samples(counts, 0.01).unwrap();
        assert_eq!(rec.seismogram()[[0, 1]], -2.0);
    }

    #[test]
    fn windows_drop_remainder() {
        let rec = record(25, 3);
        assert_eq!(rec.n_windows(10), 2);
        let w = rec.window(1, 10).unwrap();
        assert_eq!(w.dim(), (10, 3));
        assert_eq!(w[[0, 0]], rec.seismogram()[[10, 0]]);
        assert!(rec.window(2, 10).is_none());
        assert_eq!(rec.n_windows(0), 0);
    }
}
