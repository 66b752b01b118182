//! Reading passive records from disk.

pub mod baykal;
pub mod segy;

pub use baykal::{BaykalChannel, BaykalHeader};

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

use log::{info, warn};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::{data::SeismicRecord, error::Result};

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),
    #[error("unknown record format {0:?}")]
    UnknownFormat(String),
    #[error("unknown component {0:?}")]
    UnknownComponent(String),
    #[error("unsupported SEG-Y sample format code {0}")]
    UnsupportedSampleFormat(i16),
    #[error("file is truncated: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Segy,
    Baykal,
}

impl FromStr for Format {
    type Err = ReadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "segy" | "sgy" | "seg-y" => Ok(Self::Segy),
            "baykal" | "bay" => Ok(Self::Baykal),
            _ => Err(ReadError::UnknownFormat(s.to_string())),
        }
    }
}

/// Whether channels hold one component each or Z, X, Y triplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Components {
    One,
    #[default]
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Component {
    #[default]
    Z,
    X,
    Y,
}

impl Component {
    /// Position of the component inside an interleaved Z, X, Y triplet.
    pub fn offset(&self) -> usize {
        match self {
            Component::Z => 0,
            Component::X => 1,
            Component::Y => 2,
        }
    }
}

impl FromStr for Component {
    type Err = ReadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Z" | "z" => Ok(Self::Z),
            "X" | "x" => Ok(Self::X),
            "Y" | "y" => Ok(Self::Y),
            _ => Err(ReadError::UnknownComponent(s.to_string())),
        }
    }
}

/// Keeps one component of three-component data, or everything for single-component data.
pub fn select_component(
    data: Array2<f64>,
    components: Components,
    component: Component,
) -> Array2<f64> {
    match components {
        Components::One => data,
        Components::Three => {
            if data.ncols() % 3 != 0 {
                warn!(
                    "{} channels is not a whole number of Z/X/Y triplets",
                    data.ncols()
                );
            }
            if component.offset() >= data.ncols() {
                return Array2::zeros((data.nrows(), 0));
            }
            data.slice(s![.., component.offset()..;3]).to_owned()
        }
    }
}

/// Loads a record file into a [`SeismicRecord`].
///
/// ```no_run
/// use pmasw::io::{Component, DataLoader, Format};
///
/// let record = DataLoader::new("line_1.sgy", Format::Segy)
///     .component(Component::Z)
///     .load()?;
/// # Ok::<(), pmasw::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DataLoader {
    path: PathBuf,
    format: Format,
    components: Components,
    component: Component,
}

impl DataLoader {
    pub fn new(path: impl AsRef<Path>, format: Format) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            components: Components::default(),
            component: Component::default(),
        }
    }

    pub fn components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.component = component;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SeismicRecord> {
        info!("Loading {:?}...", self.path);
        let now = Instant::now();
        let bytes = std::fs::read(&self.path).map_err(ReadError::from)?;

        let (data, dt) = match self.format {
            Format::Segy => {
                let segy = segy::parse(&bytes)?;
                (segy.data, segy.dt)
            }
            Format::Baykal => {
                let (header, data) = baykal::parse(&bytes)?;
                info!(
                    "station {} at ({}, {}), {} channels",
                    header.station,
                    header.latitude,
                    header.longitude,
                    header.channels.len()
                );
                (data.mapv(f64::from), header.dt())
            }
        };

        let data = select_component(data, self.components, self.component);
        let record = SeismicRecord::new(data, dt)?;
        info!(
            "... loaded {} samples x {} channels in {:}s",
            record.nt(),
            record.nx(),
            now.elapsed().as_secs()
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_relative_eq;
    use byteorder::BigEndian;
    use std::io::Write;

    fn write(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn parse_names() {
        assert_eq!("SEGY".parse::<Format>().unwrap(), Format::Segy);
        assert_eq!("baykal".parse::<Format>().unwrap(), Format::Baykal);
        assert!(matches!(
            "miniseed".parse::<Format>(),
            Err(ReadError::UnknownFormat(_))
        ));
        assert_eq!("y".parse::<Component>().unwrap(), Component::Y);
        assert!("N".parse::<Component>().is_err());
    }

    #[test]
    fn component_selection() {
        let data = Array2::from_shape_fn((2, 6), |(_, j)| j as f64);
        let y = select_component(data.clone(), Components::Three, Component::Y);
        assert_eq!(y.row(0).to_vec(), vec![2.0, 5.0]);
        let x = select_component(data.clone(), Components::Three, Component::X);
        assert_eq!(x.row(1).to_vec(), vec![1.0, 4.0]);
        let all = select_component(data, Components::One, Component::Y);
        assert_eq!(all.ncols(), 6);
    }

    #[test]
    fn loads_segy_component() {
        let traces = (0..6)
            .map(|j| vec![j as f64, 10.0 + j as f64])
            .collect::<Vec<_>>();
        let file = write(&segy::tests::segy_bytes::<BigEndian>(&traces, 2000, 5));

        let record = DataLoader::new(file.path(), Format::Segy)
            .component(Component::X)
            .load()
            .unwrap();
        assert_relative_eq!(record.dt(), 0.002);
        assert_eq!(record.sampling_rate(), 500);
        assert_eq!(record.nx(), 2);
        assert_eq!(record.seismogram().column(1).to_vec(), vec![4.0, 14.0]);

        let single = DataLoader::new(file.path(), Format::Segy)
            .components(Components::One)
            .load()
            .unwrap();
        assert_eq!(single.nx(), 6);
    }

    #[test]
    fn loads_baykal() {
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let file = write(&baykal::tests::baykal_bytes(200, &rows));
        let record = DataLoader::new(file.path(), Format::Baykal)
            .load()
            .unwrap();
        assert_relative_eq!(record.dt(), 0.005);
        assert_eq!(record.nx(), 1);
        assert_eq!(record.seismogram().column(0).to_vec(), vec![1.0, 4.0]);
    }

    #[test]
    fn missing_file() {
        let result = DataLoader::new("/nonexistent/record.sgy", Format::Segy).load();
        assert!(matches!(result, Err(Error::Read(ReadError::Io(_)))));
    }
}
