//! In-place conditioning of a record before the energy scan.

pub mod filter;

pub use filter::{Biquad, Butterworth};

use log::info;
use ndarray::{s, Axis};
use rayon::prelude::*;

use crate::{
    data::SeismicRecord,
    error::{invalid, Result},
};

/// Order of the anti-alias band-pass applied before decimation.
pub const DECIMATION_ORDER: usize = 5;
/// Low corner of the anti-alias band-pass, in Hz.
pub const LOW_CORNER: f64 = 1.0;
/// High corner of the anti-alias band-pass, as a fraction of the decimated Nyquist.
pub const HIGH_CORNER_RATIO: f64 = 0.9;

/// Mutates a [`SeismicRecord`] in place; calls can be chained.
///
/// ```
/// use ndarray::Array2;
/// use pmasw::{data::SeismicRecord, preprocessing::Preprocessor};
///
/// let mut record = SeismicRecord::new(Array2::zeros((1000, 4)), 0.002)?;
/// Preprocessor::new(&mut record).detrend()?.decimate(50.0)?;
/// assert_eq!(record.sampling_rate(), 100);
/// assert_eq!(record.nt(), 200);
/// # Ok::<(), pmasw::Error>(())
/// ```
pub struct Preprocessor<'a> {
    record: &'a mut SeismicRecord,
}

impl<'a> Preprocessor<'a> {
    pub fn new(record: &'a mut SeismicRecord) -> Self {
        Self { record }
    }

    /// Integer decimation factor that keeps `f_max` below the new Nyquist.
    pub fn decimation_factor(sampling_rate: u32, f_max: f64) -> Result<usize> {
        if !f_max.is_finite() || f_max <= 0.0 {
            return Err(invalid(format!("f_max must be positive, got {f_max}")));
        }
        let factor = ((sampling_rate / 2) as f64 / f_max).floor() as usize;
        if factor == 0 {
            return Err(invalid(format!(
                "f_max {f_max} Hz is above the Nyquist frequency of a {sampling_rate} Hz record"
            )));
        }
        Ok(factor)
    }

    /// Band-passes every channel (zero phase) and keeps every `factor`-th sample.
    pub fn decimate(&mut self, f_max: f64) -> Result<&mut Self> {
        let fs = self.record.sampling_rate();
        let factor = Self::decimation_factor(fs, f_max)?;
        let new_fs = fs / factor as u32;
        let high = HIGH_CORNER_RATIO * new_fs as f64 / 2.0;
        let filter = Butterworth::bandpass(DECIMATION_ORDER, LOW_CORNER, high, fs as f64)?;

        let mut data = self.record.seismogram().clone();
        data.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each(|trace| filter.filtfilt(trace));
        let data = data.slice(s![..;factor, ..]).to_owned();

        info!(
            "decimated {} Hz -> {} Hz (factor {}), band {} - {:.2} Hz",
            fs, new_fs, factor, LOW_CORNER, high
        );
        self.record.set_seismogram(data)?;
        self.record.set_sampling_rate(new_fs)?;
        Ok(self)
    }

    /// Removes the least-squares straight line from every channel.
    pub fn detrend(&mut self) -> Result<&mut Self> {
        let mut data = self.record.seismogram().clone();
        let nt = data.nrows();
        let t_mean = (nt as f64 - 1.0) / 2.0;
        let t_var = (0..nt).map(|t| (t as f64 - t_mean).powi(2)).sum::<f64>();

        data.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each(|mut trace| {
                let y_mean = trace.mean().unwrap_or(0.0);
                let slope = if t_var > 0.0 {
                    trace
                        .iter()
                        .enumerate()
                        .map(|(t, &y)| (t as f64 - t_mean) * (y - y_mean))
                        .sum::<f64>()
                        / t_var
                } else {
                    0.0
                };
                trace
                    .iter_mut()
                    .enumerate()
                    .for_each(|(t, y)| *y -= y_mean + slope * (t as f64 - t_mean));
            });

        self.record.set_seismogram(data)?;
        Ok(self)
    }
}
