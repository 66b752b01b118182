pub mod data;
pub mod error;
pub mod io;
pub mod peaking;
pub mod preprocessing;
pub mod scan;

pub use error::{Error, Result};

pub mod prelude {

    pub mod re_exports {
        pub use ndarray;
        pub use num_complex;
    }

    pub use crate::data::{Receivers, SeismicRecord};
    pub use crate::error::{Error, Result};
    pub use crate::io::{Component, Components, DataLoader, Format};
    pub use crate::peaking::{DispersionCurve, DispersionPeaker};
    pub use crate::preprocessing::Preprocessor;
    pub use crate::scan::{EnergyKernel, EnergyScan, ParameterGrid, PlaneWaveKernel, ScanParameters};
}
