//! Butterworth filters as cascades of second-order sections.

use std::f64::consts::PI;

use ndarray::ArrayViewMut1;
use num_complex::Complex64;

use crate::error::{invalid, Result};

/// Second-order section `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
/// in Direct Form II Transposed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self {
            b,
            a,
            state: [0.0; 2],
        }
    }

    pub fn numerator(&self) -> &[f64; 3] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64; 2] {
        &self.a
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    /// Loads the state reached after an infinitely long constant `input`,
    /// returning the matching output level.
    pub fn prime(&mut self, input: f64) -> f64 {
        let output = self.dc_gain() * input;
        self.state[1] = self.b[2] * input - self.a[1] * output;
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        output
    }

    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / (1.0 + self.a[0] + self.a[1])
    }

    /// Stability triangle: both poles inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    fn response(&self, z_inv: Complex64) -> Complex64 {
        let num = self.b[0] + z_inv * (self.b[1] + z_inv * self.b[2]);
        let den = 1.0 + z_inv * (self.a[0] + z_inv * self.a[1]);
        num / den
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Low,
    High,
}

fn prewarp(freq: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq / sample_rate).tan()
}

/// Analog prototype poles in the upper half plane plus the real pole of odd orders.
fn prototype_poles(order: usize) -> (Vec<Complex64>, Option<f64>) {
    let pairs = (0..order / 2)
        .map(|k| Complex64::from_polar(1.0, PI * (2 * k + order + 1) as f64 / (2 * order) as f64))
        .map(|p| Complex64::new(p.re, p.im.abs()))
        .collect();
    let real = (order % 2 == 1).then_some(-1.0);
    (pairs, real)
}

/// Bilinear transform of `1 / (s - p)` (or `s / (s - p)`), `p` real.
fn bilinear_real(p: f64, k: f64, pass: Pass) -> Biquad {
    let alpha = k - p;
    let a1 = -(k + p) / alpha;
    match pass {
        Pass::Low => Biquad::new([-p / alpha, -p / alpha, 0.0], [a1, 0.0]),
        Pass::High => Biquad::new([k / alpha, -k / alpha, 0.0], [a1, 0.0]),
    }
}

/// Bilinear transform of a conjugate pole pair `p, p*`.
fn bilinear_pair(p: Complex64, k: f64, pass: Pass) -> Biquad {
    let mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + mag_sq;
    let a = [2.0 * (mag_sq - k2) / d, (k2 + 2.0 * k * p.re + mag_sq) / d];
    let b = match pass {
        Pass::Low => [mag_sq / d, 2.0 * mag_sq / d, mag_sq / d],
        Pass::High => [k2 / d, -2.0 * k2 / d, k2 / d],
    };
    Biquad::new(b, a)
}

fn design(order: usize, cutoff: f64, sample_rate: f64, pass: Pass) -> Vec<Biquad> {
    let wc = prewarp(cutoff, sample_rate);
    let k = 2.0 * sample_rate;
    let (pairs, real) = prototype_poles(order);
    pairs
        .into_iter()
        .map(|p| bilinear_pair(p * wc, k, pass))
        .chain(real.map(|p| bilinear_real(p * wc, k, pass)))
        .collect()
}

/// Digital Butterworth filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Butterworth {
    sections: Vec<Biquad>,
}

impl Butterworth {
    fn check(order: usize, corners: &[f64], sample_rate: f64) -> Result<()> {
        if order == 0 || order > 20 {
            return Err(invalid(format!("filter order must be 1..=20, got {order}")));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(invalid(format!("sampling rate must be positive, got {sample_rate}")));
        }
        let nyquist = sample_rate / 2.0;
        if let Some(&f) = corners.iter().find(|&&f| !(f > 0.0 && f < nyquist)) {
            return Err(invalid(format!(
                "corner frequency {f} Hz must lie strictly between 0 and {nyquist} Hz"
            )));
        }
        Ok(())
    }

    pub fn lowpass(order: usize, cutoff: f64, sample_rate: f64) -> Result<Self> {
        Self::check(order, &[cutoff], sample_rate)?;
        Ok(Self {
            sections: design(order, cutoff, sample_rate, Pass::Low),
        })
    }

    pub fn highpass(order: usize, cutoff: f64, sample_rate: f64) -> Result<Self> {
        Self::check(order, &[cutoff], sample_rate)?;
        Ok(Self {
            sections: design(order, cutoff, sample_rate, Pass::High),
        })
    }

    /// Low-pass at `high` cascaded with high-pass at `low`.
    pub fn bandpass(order: usize, low: f64, high: f64, sample_rate: f64) -> Result<Self> {
        Self::check(order, &[low, high], sample_rate)?;
        if low >= high {
            return Err(invalid(format!(
                "band-pass corners must be increasing, got {low} Hz and {high} Hz"
            )));
        }
        let mut sections = design(order, high, sample_rate, Pass::Low);
        sections.extend(design(order, low, sample_rate, Pass::High));
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    pub fn frequency_response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        let z_inv = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        self.sections
            .iter()
            .map(|s| s.response(z_inv))
            .product()
    }

    /// Causal filtering in place, starting from the steady state of the first sample.
    pub fn filter(&self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };
        let mut sections = self.sections.clone();
        let mut level = first;
        for section in sections.iter_mut() {
            level = section.prime(level);
        }
        for v in signal.iter_mut() {
            *v = sections.iter_mut().fold(*v, |x, s| s.process(x));
        }
    }

    fn padding(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Zero-phase filtering: forward then backward over an odd extension of the trace.
    pub fn filtfilt(&self, mut trace: ArrayViewMut1<f64>) {
        let n = trace.len();
        if n == 0 {
            return;
        }
        let pad = self.padding().min(n - 1);
        let (first, last) = (trace[0], trace[n - 1]);

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - trace[i]));
        extended.extend(trace.iter().copied());
        extended.extend((1..=pad).map(|i| 2.0 * last - trace[n - 1 - i]));

        self.filter(&mut extended);
        extended.reverse();
        self.filter(&mut extended);
        extended.reverse();

        trace
            .iter_mut()
            .zip(&extended[pad..pad + n])
            .for_each(|(t, &e)| *t = e);
    }
}
