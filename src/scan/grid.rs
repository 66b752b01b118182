use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::check_sequence;
use crate::error::{invalid, Result};

/// Relative slack, in units of one step, used when counting grid points.
const STEP_TOLERANCE: f64 = 1e-9;

/// Scan bounds in external units (seconds, samples, m/s, Hz, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParameters {
    pub dt: f64,
    pub window_length: usize,
    pub v_min: f64,
    pub v_max: f64,
    pub v_step: f64,
    pub f_min: f64,
    pub f_max: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    pub theta_step: f64,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            dt: 0.002,
            window_length: 1000,
            v_min: 1.0,
            v_max: 1000.0,
            v_step: 10.0,
            f_min: 0.0,
            f_max: 50.0,
            theta_min: 0.0,
            theta_max: 180.0,
            theta_step: 10.0,
        }
    }
}

/// Grid axis regenerated after a bound changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridAxis {
    Velocity,
    Frequency,
    Azimuth,
}

/// Internal bounds; angles in radians, normalised into `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    dt: f64,
    nt: usize,
    v_min: f64,
    v_max: f64,
    v_step: f64,
    f_min: f64,
    f_max: f64,
    theta_min: f64,
    theta_max: f64,
    theta_step: f64,
}

impl Bounds {
    fn nyquist(&self) -> f64 {
        0.5 / self.dt
    }

    fn df(&self) -> f64 {
        (self.dt * self.nt as f64).recip()
    }

    fn validate(&self) -> Result<()> {
        let finite = [
            ("sampling interval", self.dt),
            ("v_min", self.v_min),
            ("v_max", self.v_max),
            ("v_step", self.v_step),
            ("f_min", self.f_min),
            ("f_max", self.f_max),
            ("theta_min", self.theta_min),
            ("theta_max", self.theta_max),
            ("theta_step", self.theta_step),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} must be a finite number, got {value}")));
        }

        if self.dt <= 0.0 {
            return Err(invalid("sampling interval must be positive"));
        }
        if self.nt == 0 {
            return Err(invalid("window length must be a positive number of samples"));
        }

        if self.v_min <= 0.0 {
            return Err(invalid("v_min must be positive"));
        }
        if self.v_max <= 0.0 {
            return Err(invalid("v_max must be positive"));
        }
        if self.v_min >= self.v_max {
            return Err(invalid(format!(
                "v_min ({}) must be less than v_max ({})",
                self.v_min, self.v_max
            )));
        }
        if self.v_step <= 0.0 {
            return Err(invalid("v_step must be positive"));
        }

        if self.f_min < 0.0 {
            return Err(invalid("f_min must not be negative"));
        }
        if self.f_max <= 0.0 {
            return Err(invalid("f_max must be positive"));
        }
        if self.f_min >= self.f_max {
            return Err(invalid(format!(
                "f_min ({}) must be less than f_max ({})",
                self.f_min, self.f_max
            )));
        }
        if self.f_max > self.nyquist() {
            return Err(invalid(format!(
                "f_max ({}) exceeds the Nyquist frequency ({})",
                self.f_max,
                self.nyquist()
            )));
        }

        if self.theta_min > self.theta_max {
            return Err(invalid(format!(
                "theta_min ({}°) must not exceed theta_max ({}°)",
                self.theta_min.to_degrees(),
                self.theta_max.to_degrees()
            )));
        }
        if self.theta_step <= 0.0 {
            return Err(invalid("theta_step must be positive after normalisation"));
        }
        Ok(())
    }
}

/// Maps an angle in degrees into `[0, 2π)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    deg.rem_euclid(360.0).to_radians()
}

/// Number of points of `start + k * step` strictly below `stop`.
fn count_below(start: f64, stop: f64, step: f64) -> usize {
    let n = ((stop - start) / step - STEP_TOLERANCE).ceil();
    if n > 0.0 {
        n as usize
    } else {
        0
    }
}

fn arithmetic(start: f64, step: f64, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| start + i as f64 * step)
}

/// Velocity, frequency and azimuth grids of the energy scan.
///
/// Every bound setter validates the full set of bounds before committing,
/// then regenerates only the axis depending on that bound. Manual grid
/// overrides survive until the next bound change on the same axis.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    bounds: Bounds,
    velocities: Array1<f64>,
    freqs: Array1<f64>,
    thetas: Array1<f64>,
}

impl ParameterGrid {
    /// Grid with default velocity minimum/step, frequency minimum and azimuth bounds.
    pub fn new(dt: f64, window_length: usize, v_max: f64, f_max: f64) -> Result<Self> {
        Self::from_parameters(&ScanParameters {
            dt,
            window_length,
            v_max,
            f_max,
            ..Default::default()
        })
    }

    pub fn from_parameters(params: &ScanParameters) -> Result<Self> {
        let bounds = Bounds {
            dt: params.dt,
            nt: params.window_length,
            v_min: params.v_min,
            v_max: params.v_max,
            v_step: params.v_step,
            f_min: params.f_min,
            f_max: params.f_max,
            theta_min: normalize_degrees(params.theta_min),
            theta_max: normalize_degrees(params.theta_max),
            theta_step: normalize_degrees(params.theta_step),
        };
        bounds.validate()?;

        let mut grid = Self {
            bounds,
            velocities: Array1::zeros(0),
            freqs: Array1::zeros(0),
            thetas: Array1::zeros(0),
        };
        grid.regenerate(GridAxis::Velocity);
        grid.regenerate(GridAxis::Frequency);
        grid.regenerate(GridAxis::Azimuth);
        Ok(grid)
    }

    /// Current bounds in external units.
    pub fn parameters(&self) -> ScanParameters {
        let b = &self.bounds;
        ScanParameters {
            dt: b.dt,
            window_length: b.nt,
            v_min: b.v_min,
            v_max: b.v_max,
            v_step: b.v_step,
            f_min: b.f_min,
            f_max: b.f_max,
            theta_min: b.theta_min.to_degrees(),
            theta_max: b.theta_max.to_degrees(),
            theta_step: b.theta_step.to_degrees(),
        }
    }

    fn update(&mut self, axis: GridAxis, apply: impl FnOnce(&mut Bounds)) -> Result<()> {
        let mut candidate = self.bounds;
        apply(&mut candidate);
        candidate.validate()?;
        self.bounds = candidate;
        self.regenerate(axis);
        Ok(())
    }

    fn regenerate(&mut self, axis: GridAxis) {
        let b = &self.bounds;
        match axis {
            GridAxis::Velocity => {
                let n = count_below(b.v_min, b.v_max + b.v_step, b.v_step);
                self.velocities = arithmetic(b.v_min, b.v_step, n);
                debug!("velocity grid regenerated: {} values", n);
            }
            GridAxis::Frequency => {
                let df = b.df();
                // inclusive of f_max, never above it
                let n = ((b.f_max - b.f_min) / df + STEP_TOLERANCE).floor() as usize + 1;
                self.freqs = arithmetic(b.f_min, df, n);
                debug!("frequency grid regenerated: {} values, df = {} Hz", n, df);
            }
            GridAxis::Azimuth => {
                let n = count_below(b.theta_min, b.theta_max, b.theta_step).max(1);
                self.thetas = arithmetic(b.theta_min, b.theta_step, n);
                debug!("azimuth grid regenerated: {} values", n);
            }
        }
    }

    pub fn dt(&self) -> f64 {
        self.bounds.dt
    }

    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        self.update(GridAxis::Frequency, |b| b.dt = dt)
    }

    /// Window length in samples.
    pub fn window_length(&self) -> usize {
        self.bounds.nt
    }

    pub fn set_window_length(&mut self, nt: usize) -> Result<()> {
        self.update(GridAxis::Frequency, |b| b.nt = nt)
    }

    /// Frequency resolution `1 / (dt * window_length)`.
    pub fn df(&self) -> f64 {
        self.bounds.df()
    }

    pub fn nyquist(&self) -> f64 {
        self.bounds.nyquist()
    }

    pub fn v_min(&self) -> f64 {
        self.bounds.v_min
    }

    pub fn set_v_min(&mut self, v_min: f64) -> Result<()> {
        self.update(GridAxis::Velocity, |b| b.v_min = v_min)
    }

    pub fn v_max(&self) -> f64 {
        self.bounds.v_max
    }

    pub fn set_v_max(&mut self, v_max: f64) -> Result<()> {
        self.update(GridAxis::Velocity, |b| b.v_max = v_max)
    }

    pub fn v_step(&self) -> f64 {
        self.bounds.v_step
    }

    pub fn set_v_step(&mut self, v_step: f64) -> Result<()> {
        self.update(GridAxis::Velocity, |b| b.v_step = v_step)
    }

    pub fn f_min(&self) -> f64 {
        self.bounds.f_min
    }

    pub fn set_f_min(&mut self, f_min: f64) -> Result<()> {
        self.update(GridAxis::Frequency, |b| b.f_min = f_min)
    }

    pub fn f_max(&self) -> f64 {
        self.bounds.f_max
    }

    pub fn set_f_max(&mut self, f_max: f64) -> Result<()> {
        self.update(GridAxis::Frequency, |b| b.f_max = f_max)
    }

    /// Minimum azimuth in degrees.
    pub fn theta_min(&self) -> f64 {
        self.bounds.theta_min.to_degrees()
    }

    pub fn set_theta_min(&mut self, deg: f64) -> Result<()> {
        self.update(GridAxis::Azimuth, |b| b.theta_min = normalize_degrees(deg))
    }

    /// Maximum azimuth in degrees (excluded from the grid).
    ///
    /// When it equals the minimum the grid still holds the single azimuth
    /// `theta_min` rather than being empty.
    pub fn theta_max(&self) -> f64 {
        self.bounds.theta_max.to_degrees()
    }

    pub fn set_theta_max(&mut self, deg: f64) -> Result<()> {
        self.update(GridAxis::Azimuth, |b| b.theta_max = normalize_degrees(deg))
    }

    /// Azimuth step in degrees.
    pub fn theta_step(&self) -> f64 {
        self.bounds.theta_step.to_degrees()
    }

    pub fn set_theta_step(&mut self, deg: f64) -> Result<()> {
        self.update(GridAxis::Azimuth, |b| b.theta_step = normalize_degrees(deg))
    }

    pub fn velocities(&self) -> &Array1<f64> {
        &self.velocities
    }

    /// Replaces the velocity grid; values must be strictly positive.
    pub fn set_velocities(&mut self, velocities: Array1<f64>) -> Result<()> {
        check_sequence(&velocities, "velocity grid")?;
        if velocities.iter().any(|&v| v <= 0.0) {
            return Err(invalid("velocity grid must be strictly positive"));
        }
        self.velocities = velocities;
        Ok(())
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.freqs
    }

    /// Replaces the frequency grid; values must lie in `[0, nyquist]`.
    pub fn set_frequencies(&mut self, freqs: Array1<f64>) -> Result<()> {
        check_sequence(&freqs, "frequency grid")?;
        if freqs.iter().any(|&f| f < 0.0) {
            return Err(invalid("frequency grid must not contain negative values"));
        }
        let nyquist = self.nyquist();
        if freqs.iter().any(|&f| f > nyquist) {
            return Err(invalid(format!(
                "frequency grid must not exceed the Nyquist frequency ({nyquist} Hz)"
            )));
        }
        self.freqs = freqs;
        Ok(())
    }

    /// Azimuth grid in degrees.
    pub fn azimuths(&self) -> Array1<f64> {
        self.thetas.mapv(f64::to_degrees)
    }

    /// Azimuth grid in radians, as handed to the energy kernel.
    pub fn azimuths_rad(&self) -> &Array1<f64> {
        &self.thetas
    }

    /// Replaces the azimuth grid; values in degrees are normalised into `[0, 360)`.
    pub fn set_azimuths(&mut self, deg: Array1<f64>) -> Result<()> {
        check_sequence(&deg, "azimuth grid")?;
        self.thetas = deg.mapv(normalize_degrees);
        Ok(())
    }

    /// Energy volume dimensions `(velocities, frequencies, azimuths)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.velocities.len(), self.freqs.len(), self.thetas.len())
    }
}

impl TryFrom<ScanParameters> for ParameterGrid {
    type Error = crate::error::Error;

    fn try_from(params: ScanParameters) -> Result<Self> {
        Self::from_parameters(&params)
    }
}
