use std::f64::consts::PI;

use ndarray::{Array2, Array3, ArrayView2};
use num_complex::Complex64;
use rustfft::FftPlanner;

use super::grid::ParameterGrid;
use crate::error::{Error, Result};

/// Per-window energy estimator.
///
/// Given one window `[time, channel]`, the scan frequencies (Hz), phase
/// velocities, azimuths (radians) and receiver coordinates, returns the
/// beam response shaped `[velocity, frequency, azimuth]`. The energy scan
/// only ever uses the modulus of the result.
///
/// `prepare` runs once before every scan with the grid about to be used, so
/// kernels holding sampling state can follow grid changes.
pub trait EnergyKernel: Sync {
    fn prepare(&mut self, _grid: &ParameterGrid) -> Result<()> {
        Ok(())
    }

    fn compute(
        &self,
        window: ArrayView2<f64>,
        freqs: &[f64],
        velocities: &[f64],
        thetas: &[f64],
        x: &[f64],
        y: &[f64],
    ) -> Result<Array3<Complex64>>;
}

impl<F> EnergyKernel for F
where
    F: Fn(ArrayView2<f64>, &[f64], &[f64], &[f64], &[f64], &[f64]) -> Result<Array3<Complex64>>
        + Sync,
{
    fn compute(
        &self,
        window: ArrayView2<f64>,
        freqs: &[f64],
        velocities: &[f64],
        thetas: &[f64],
        x: &[f64],
        y: &[f64],
    ) -> Result<Array3<Complex64>> {
        self(window, freqs, velocities, thetas, x, y)
    }
}

/// Frequency-domain delay-and-sum beamformer for plane waves.
///
/// Each channel is Fourier transformed and sampled at the FFT bin nearest
/// to every scan frequency. The spectra are then phase-shifted for the
/// slowness vector `(cos θ, sin θ) / v` and summed over receivers:
///
/// `E(v, f, θ) = Σ_j U_j(f) exp(i 2π f (x_j cos θ + y_j sin θ) / v)`
///
/// Azimuth is the propagation direction measured counter-clockwise from the
/// x axis. With whitening enabled every spectral value is reduced to unit
/// modulus first, so each channel contributes phase only.
#[derive(Debug, Clone, Copy)]
pub struct PlaneWaveKernel {
    dt: f64,
    whiten: bool,
}

impl PlaneWaveKernel {
    pub fn new(dt: f64) -> Self {
        Self { dt, whiten: true }
    }

    pub fn whiten(mut self, whiten: bool) -> Self {
        self.whiten = whiten;
        self
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Spectral values `[frequency, channel]` at the bins nearest to `freqs`.
    fn spectra(&self, window: ArrayView2<f64>, freqs: &[f64]) -> Result<Array2<Complex64>> {
        let (nt, nx) = window.dim();
        let df = (self.dt * nt as f64).recip();
        let bins = freqs
            .iter()
            .map(|&f| {
                let bin = (f / df).round();
                if bin < 0.0 || bin as usize > nt / 2 {
                    Err(Error::Kernel(format!(
                        "frequency {f} Hz is outside the window spectrum (0..={} Hz)",
                        (nt / 2) as f64 * df
                    )))
                } else {
                    Ok(bin as usize)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let fft = FftPlanner::<f64>::new().plan_fft_forward(nt);
        let mut spectra = Array2::zeros((freqs.len(), nx));
        let mut buffer = vec![Complex64::new(0.0, 0.0); nt];

        for (j, trace) in window.columns().into_iter().enumerate() {
            buffer
                .iter_mut()
                .zip(trace.iter())
                .for_each(|(b, &s)| *b = Complex64::new(s, 0.0));
            fft.process(&mut buffer);

            for (k, &bin) in bins.iter().enumerate() {
                let value = buffer[bin];
                spectra[[k, j]] = if self.whiten {
                    let norm = value.norm();
                    if norm > 0.0 {
                        value / norm
                    } else {
                        value
                    }
                } else {
                    value
                };
            }
        }
        Ok(spectra)
    }
}

impl EnergyKernel for PlaneWaveKernel {
    fn prepare(&mut self, grid: &ParameterGrid) -> Result<()> {
        self.dt = grid.dt();
        Ok(())
    }

    fn compute(
        &self,
        window: ArrayView2<f64>,
        freqs: &[f64],
        velocities: &[f64],
        thetas: &[f64],
        x: &[f64],
        y: &[f64],
    ) -> Result<Array3<Complex64>> {
        let nx = window.ncols();
        if x.len() != nx || y.len() != nx {
            return Err(Error::Kernel(format!(
                "{} channels but {}/{} receiver coordinates",
                nx,
                x.len(),
                y.len()
            )));
        }

        let spectra = self.spectra(window, freqs)?;
        let mut energy = Array3::zeros((velocities.len(), freqs.len(), thetas.len()));

        for (a, &theta) in thetas.iter().enumerate() {
            let (sin, cos) = theta.sin_cos();
            // distance travelled by the wavefront to reach each receiver
            let offsets = x
                .iter()
                .zip(y.iter())
                .map(|(&xj, &yj)| xj * cos + yj * sin)
                .collect::<Vec<_>>();

            for (k, &f) in freqs.iter().enumerate() {
                let spectrum = spectra.row(k);
                for (i, &v) in velocities.iter().enumerate() {
                    let omega_over_v = 2.0 * PI * f / v;
                    energy[[i, k, a]] = spectrum
                        .iter()
                        .zip(offsets.iter())
                        .map(|(u, &d)| u * Complex64::from_polar(1.0, omega_over_v * d))
                        .sum::<Complex64>();
                }
            }
        }
        Ok(energy)
    }
}
