pub mod energy;
pub mod grid;
pub mod kernel;

pub use energy::EnergyScan;
pub use grid::{ParameterGrid, ScanParameters};
pub use kernel::{EnergyKernel, PlaneWaveKernel};
