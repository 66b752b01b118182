use num_traits::Float;

/// Piecewise-linear interpolation of `y(x)` at `at`.
///
/// `x` must be strictly increasing. Returns `None` outside `[x[0], x[n-1]]`
/// or when the two sequences differ in length.
pub fn interp1d<T: Float>(x: &[T], y: &[T], at: T) -> Option<T> {
    let last = x.len().checked_sub(1)?;
    if x.len() != y.len() || at < x[0] || at > x[last] {
        return None;
    }
    let j = x.partition_point(|&xi| xi < at);
    if x[j] == at {
        return Some(y[j]);
    }
    let (x0, x1, y0, y1) = (x[j - 1], x[j], y[j - 1], y[j]);
    Some(y0 + (y1 - y0) * (at - x0) / (x1 - x0))
}

/// Linear ramp between `(x0, y0)` and `(x1, y1)`; constant `y0` when `x0 == x1`.
pub fn ramp<T: Float>((x0, y0): (T, T), (x1, y1): (T, T), at: T) -> T {
    if x1 == x0 {
        y0
    } else {
        y0 + (y1 - y0) * (at - x0) / (x1 - x0)
    }
}

/// Index of the first element nearest to `value`.
pub fn nearest_index<T: Float>(values: impl IntoIterator<Item = T>, value: T) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        let distance = (v - value).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the first maximum; NaNs are skipped.
pub fn argmax<T: Float>(values: impl IntoIterator<Item = T>) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interpolation() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, 0.0];
        assert_relative_eq!(interp1d(&x, &y, 1.0).unwrap(), 10.0);
        assert_relative_eq!(interp1d(&x, &y, 1.5).unwrap(), 15.0);
        assert_relative_eq!(interp1d(&x, &y, 2.0).unwrap(), 20.0);
        assert_relative_eq!(interp1d(&x, &y, 3.0).unwrap(), 10.0);
        assert_relative_eq!(interp1d(&x, &y, 4.0).unwrap(), 0.0);
        assert!(interp1d(&x, &y, 0.99).is_none());
        assert!(interp1d(&x, &y, 4.01).is_none());
        assert!(interp1d::<f64>(&[], &[], 0.0).is_none());
        assert!(interp1d(&x, &y[..2], 1.5).is_none());
    }

    #[test]
    fn single_point() {
        assert_relative_eq!(interp1d(&[5.0], &[7.0], 5.0).unwrap(), 7.0);
        assert_relative_eq!(ramp((5.0, 3.0), (5.0, 9.0), 5.0), 3.0);
        assert_relative_eq!(ramp((0.0, 3.0), (10.0, 9.0), 5.0), 6.0);
    }

    #[test]
    fn ties_resolve_to_first_index() {
        let v = [100.0, 110.0, 120.0, 130.0];
        assert_eq!(nearest_index(v.iter().copied(), 125.0), Some(2));
        assert_eq!(nearest_index(v.iter().copied(), 104.0), Some(0));
        assert_eq!(nearest_index(v.iter().copied(), 1e6), Some(3));
        assert_eq!(nearest_index(Vec::<f64>::new(), 1.0), None);

        assert_eq!(argmax([0.1, 0.9, 0.3, 0.9]), Some(1));
        assert_eq!(argmax([f64::NAN, 0.2, 0.1]), Some(1));
        assert_eq!(argmax(Vec::<f64>::new()), None);
    }
}
