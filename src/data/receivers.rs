use ndarray::Array1;

use super::check_sequence;
use crate::error::Result;

/// Planar receiver coordinates, one entry per channel.
///
/// The two sequences are validated independently; matching their length to
/// a record's channel count is the energy scan's job.
#[derive(Debug, Clone, PartialEq)]
pub struct Receivers {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Receivers {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        check_sequence(&x, "receiver x")?;
        check_sequence(&y, "receiver y")?;
        Ok(Self { x, y })
    }

    /// Evenly spaced line of `n` receivers along the x axis starting at the origin.
    pub fn from_line(n: usize, spacing: f64) -> Result<Self> {
        let x = Array1::from_shape_fn(n, |i| i as f64 * spacing);
        Self::new(x, Array1::zeros(n))
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn set_x(&mut self, x: Array1<f64>) -> Result<()> {
        check_sequence(&x, "receiver x")?;
        self.x = x;
        Ok(())
    }

    pub fn set_y(&mut self, y: Array1<f64>) -> Result<()> {
        check_sequence(&y, "receiver y")?;
        self.y = y;
        Ok(())
    }

    /// Number of receivers, or `None` when the coordinate sequences disagree.
    pub fn n_receivers(&self) -> Option<usize> {
        (self.x.len() == self.y.len()).then_some(self.x.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn construction() {
        let r = Receivers::new(array![0.0, 1.0, 2.0], array![0.0, 0.5, 1.0]).unwrap();
        assert_eq!(r.n_receivers(), Some(3));
        assert_eq!(r.y()[2], 1.0);
    }

    #[test]
    fn line() {
        let r = Receivers::from_line(4, 2.5).unwrap();
        assert_eq!(r.x(), &array![0.0, 2.5, 5.0, 7.5]);
        assert!(r.y().iter().all(|&y| y == 0.0));
    }

    #[test]
    fn rejects_empty_and_nan() {
        assert!(Receivers::new(array![], array![1.0]).is_err());
        assert!(Receivers::new(array![1.0], array![f64::NAN]).is_err());

        let mut r = Receivers::from_line(2, 1.0).unwrap();
        assert!(r.set_x(array![]).is_err());
        assert_eq!(r.x().len(), 2);
    }

    #[test]
    fn unequal_lengths_are_reported() {
        let mut r = Receivers::from_line(3, 1.0).unwrap();
        r.set_y(array![0.0, 0.0]).unwrap();
        assert_eq!(r.n_receivers(), None);
    }
}
