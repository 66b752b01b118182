//! Dispersion-curve picking on a velocity-frequency energy slice.
//!
//! A rough guide curve `v_p(f_p)` and two half-widths (at the lowest and
//! highest guide frequency) define, for every scan frequency inside the
//! guide's range, a velocity window. The pick is the velocity of the
//! strongest energy inside that window.

pub mod interp;

use itertools::izip;
use log::debug;
use ndarray::{s, Array1, Array2};

use crate::data::check_sequence;
use crate::error::{invalid, shape, Error, Result};
use interp::{argmax, interp1d, nearest_index, ramp};

/// Picked dispersion curve; all four sequences are aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionCurve {
    pub frequencies: Array1<f64>,
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
    pub velocities: Array1<f64>,
}

impl DispersionCurve {
    fn empty() -> Self {
        Self {
            frequencies: Array1::zeros(0),
            lower: Array1::zeros(0),
            upper: Array1::zeros(0),
            velocities: Array1::zeros(0),
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DispersionPeaker {
    f_p: Array1<f64>,
    v_p: Array1<f64>,
    half_width_low: f64,
    half_width_high: f64,
}

fn check_half_width(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{name} must be a positive number, got {value}")));
    }
    Ok(())
}

fn check_guide(f_p: &Array1<f64>, v_p: &Array1<f64>) -> Result<()> {
    check_sequence(f_p, "guide frequencies")?;
    check_sequence(v_p, "guide velocities")?;
    if f_p.len() != v_p.len() {
        return Err(shape(format!(
            "guide has {} frequencies but {} velocities",
            f_p.len(),
            v_p.len()
        )));
    }
    if f_p.iter().chain(v_p.iter()).any(|&v| v <= 0.0) {
        return Err(invalid("guide frequencies and velocities must be positive"));
    }
    if f_p.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(invalid("guide frequencies must be strictly increasing"));
    }
    Ok(())
}

impl DispersionPeaker {
    /// Guide curve `v_p(f_p)` and the velocity half-widths at its lowest and
    /// highest frequency.
    pub fn new(
        f_p: Array1<f64>,
        v_p: Array1<f64>,
        half_width_low: f64,
        half_width_high: f64,
    ) -> Result<Self> {
        check_guide(&f_p, &v_p)?;
        check_half_width(half_width_low, "low-frequency half-width")?;
        check_half_width(half_width_high, "high-frequency half-width")?;
        Ok(Self {
            f_p,
            v_p,
            half_width_low,
            half_width_high,
        })
    }

    pub fn f_p(&self) -> &Array1<f64> {
        &self.f_p
    }

    pub fn v_p(&self) -> &Array1<f64> {
        &self.v_p
    }

    pub fn set_guide(&mut self, f_p: Array1<f64>, v_p: Array1<f64>) -> Result<()> {
        check_guide(&f_p, &v_p)?;
        self.f_p = f_p;
        self.v_p = v_p;
        Ok(())
    }

    pub fn half_width_low(&self) -> f64 {
        self.half_width_low
    }

    pub fn set_half_width_low(&mut self, value: f64) -> Result<()> {
        check_half_width(value, "low-frequency half-width")?;
        self.half_width_low = value;
        Ok(())
    }

    pub fn half_width_high(&self) -> f64 {
        self.half_width_high
    }

    pub fn set_half_width_high(&mut self, value: f64) -> Result<()> {
        check_half_width(value, "high-frequency half-width")?;
        self.half_width_high = value;
        Ok(())
    }

    /// Picks the dispersion curve from `vf` (`[velocity, frequency]`).
    ///
    /// Only frequencies inside the guide's range are picked; an empty curve
    /// is returned when none are. A search window that collapses onto a
    /// single velocity index is an error.
    pub fn peak(
        &self,
        vf: &Array2<f64>,
        velocities: &Array1<f64>,
        freqs: &Array1<f64>,
    ) -> Result<DispersionCurve> {
        if vf.dim() != (velocities.len(), freqs.len()) {
            return Err(shape(format!(
                "energy slice is {:?} but grids are {} velocities x {} frequencies",
                vf.dim(),
                velocities.len(),
                freqs.len()
            )));
        }
        check_sequence(velocities, "velocity grid")?;

        let f_p = self.f_p.to_vec();
        let v_p = self.v_p.to_vec();
        let (f_first, f_last) = (f_p[0], f_p[f_p.len() - 1]);

        let selected = freqs
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, f)| f_first <= f && f <= f_last)
            .collect::<Vec<_>>();
        if selected.is_empty() {
            debug!("guide range {f_first}..={f_last} Hz misses the frequency grid");
            return Ok(DispersionCurve::empty());
        }

        let v_lo = velocities.iter().cloned().fold(f64::INFINITY, f64::min);
        let v_hi = velocities.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut curve = DispersionCurve {
            frequencies: Array1::zeros(selected.len()),
            lower: Array1::zeros(selected.len()),
            upper: Array1::zeros(selected.len()),
            velocities: Array1::zeros(selected.len()),
        };

        for ((k, f), freq, lower, upper, picked) in izip!(
            selected,
            curve.frequencies.iter_mut(),
            curve.lower.iter_mut(),
            curve.upper.iter_mut(),
            curve.velocities.iter_mut()
        ) {
            let guide = interp1d(&f_p, &v_p, f)
                .ok_or_else(|| invalid(format!("{f} Hz is outside the guide curve")))?;
            let half_width = ramp(
                (f_first, self.half_width_low),
                (f_last, self.half_width_high),
                f,
            );

            *freq = f;
            *lower = (guide - half_width).clamp(v_lo, v_hi);
            *upper = (guide + half_width).clamp(v_lo, v_hi);

            let lower_index = nearest_index(velocities.iter().copied(), *lower).unwrap_or(0);
            let upper_index = nearest_index(velocities.iter().copied(), *upper).unwrap_or(0);
            if lower_index >= upper_index {
                return Err(Error::DegenerateSearchWindow {
                    frequency: f,
                    index: lower_index,
                });
            }

            let column = vf.slice(s![lower_index..upper_index, k]);
            let row = argmax(column.iter().copied()).ok_or(Error::DegenerateSearchWindow {
                frequency: f,
                index: lower_index,
            })?;
            *picked = velocities[lower_index + row];
        }
        Ok(curve)
    }
}
