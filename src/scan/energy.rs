use std::time::Instant;

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use ndarray::{Array2, Array3, Axis, Zip};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::grid::ParameterGrid;
use super::kernel::{EnergyKernel, PlaneWaveKernel};
use crate::data::{Receivers, SeismicRecord};
use crate::error::{invalid, shape, Error, Result};

/// Relative tolerance when comparing the record and grid sampling intervals.
const DT_TOLERANCE: f64 = 1e-9;

/// Windowed frequency-azimuth-velocity energy scan.
///
/// The record is cut into consecutive windows of `window_length` samples;
/// samples after the last whole window are discarded. Windows are scanned in
/// parallel and the moduli of the kernel outputs are summed into a volume
/// indexed `[velocity, frequency, azimuth]`.
pub struct EnergyScan<K> {
    grid: ParameterGrid,
    kernel: K,
    energy: Option<Array3<f64>>,
    progress: bool,
}

impl EnergyScan<PlaneWaveKernel> {
    /// Scan using the plane-wave beamformer at the grid's sampling interval.
    pub fn plane_wave(grid: ParameterGrid) -> Self {
        let kernel = PlaneWaveKernel::new(grid.dt());
        Self::new(grid, kernel)
    }
}

impl<K> EnergyScan<K>
where
    K: EnergyKernel,
{
    pub fn new(grid: ParameterGrid, kernel: K) -> Self {
        Self {
            grid,
            kernel,
            energy: None,
            progress: false,
        }
    }

    /// Show a progress bar over the windows while scanning.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    /// Mutable access to the grid; a previously computed volume is kept
    /// until the next call to [`compute_energy`](Self::compute_energy),
    /// which also hands the updated grid to the kernel.
    pub fn grid_mut(&mut self) -> &mut ParameterGrid {
        &mut self.grid
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn compute_energy(
        &mut self,
        record: &SeismicRecord,
        receivers: &Receivers,
    ) -> Result<&Array3<f64>> {
        // a failed scan leaves no volume behind
        self.energy = None;
        let n_receivers = receivers.n_receivers().ok_or_else(|| {
            shape(format!(
                "receiver x and y have different lengths ({} and {})",
                receivers.x().len(),
                receivers.y().len()
            ))
        })?;
        if n_receivers != record.nx() {
            return Err(shape(format!(
                "record has {} channels but {} receivers were given",
                record.nx(),
                n_receivers
            )));
        }
        if (record.dt() - self.grid.dt()).abs() > DT_TOLERANCE * self.grid.dt() {
            return Err(invalid(format!(
                "record sampling interval ({} s) differs from the scan interval ({} s)",
                record.dt(),
                self.grid.dt()
            )));
        }

        let nt = self.grid.window_length();
        let n_windows = record.n_windows(nt);
        let remainder = record.nt() - n_windows * nt;
        if n_windows == 0 {
            warn!(
                "record of {} samples is shorter than one {}-sample window",
                record.nt(),
                nt
            );
        } else if remainder > 0 {
            warn!("discarding {} trailing samples", remainder);
        }

        let dim = self.grid.dim();
        let freqs = self.grid.frequencies().to_vec();
        let velocities = self.grid.velocities().to_vec();
        let thetas = self.grid.azimuths_rad().to_vec();
        let x = receivers.x().to_vec();
        let y = receivers.y().to_vec();
        self.kernel.prepare(&self.grid)?;
        let kernel = &self.kernel;

        info!(
            "scanning {} windows of {} samples over {}x{}x{} (v, f, theta) grid",
            n_windows, nt, dim.0, dim.1, dim.2
        );
        let now = Instant::now();

        let bar = if self.progress {
            ProgressBar::new(n_windows as u64)
        } else {
            ProgressBar::hidden()
        };

        let energy = (0..n_windows)
            .into_par_iter()
            .progress_with(bar)
            .try_fold(
                || Array3::<f64>::zeros(dim),
                |mut acc, i| -> Result<Array3<f64>> {
                    let window = record
                        .window(i, nt)
                        .ok_or_else(|| shape(format!("window {i} is out of range")))?;
                    let response = kernel.compute(window, &freqs, &velocities, &thetas, &x, &y)?;
                    if response.dim() != dim {
                        return Err(Error::Kernel(format!(
                            "kernel returned shape {:?}, expected {:?}",
                            response.dim(),
                            dim
                        )));
                    }
                    Zip::from(&mut acc)
                        .and(&response)
                        .for_each(|e, r| *e += r.norm());
                    Ok(acc)
                },
            )
            .try_reduce(
                || Array3::<f64>::zeros(dim),
                |mut acc, partial| {
                    acc += &partial;
                    Ok(acc)
                },
            )?;

        info!("... scanned in {:.3}s", now.elapsed().as_secs_f64());
        Ok(self.energy.insert(energy))
    }

    /// Energy volume `[velocity, frequency, azimuth]` of the last scan.
    pub fn energy(&self) -> Result<&Array3<f64>> {
        self.energy.as_ref().ok_or(Error::NotComputedYet)
    }

    /// Velocity-frequency energy, summed over azimuths.
    pub fn vf(&self) -> Result<Array2<f64>> {
        Ok(self.energy()?.sum_axis(Axis(2)))
    }

    /// Frequency-azimuth energy, summed over velocities.
    pub fn ftheta(&self) -> Result<Array2<f64>> {
        Ok(self.energy()?.sum_axis(Axis(0)))
    }

    /// Velocity-frequency energy with every frequency column scaled to a unit maximum.
    pub fn normalized_vf(&self) -> Result<Array2<f64>> {
        let mut vf = self.vf()?;
        for mut column in vf.axis_iter_mut(Axis(1)) {
            let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if max > 0.0 {
                column.mapv_inplace(|e| e / max);
            }
        }
        Ok(vf)
    }
}
