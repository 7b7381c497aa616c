use argminmax::ArgMinMax;

/// Population mean and standard deviation.
#[inline]
pub fn mean_and_stddev(data: &[f64]) -> (f64, f64) {
    let count = data.len();
    if count == 0 {
        return (0.0, 0.0);
    }

    let sum: f64 = data.iter().sum();
    let mean = sum / count as f64;

    let variance: f64 = data
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    (mean, variance.sqrt())
}

#[inline]
pub fn get_max(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let max_index: usize = vec.argmax();
    Some(vec[max_index])
}

#[inline]
pub fn get_min(vec: &[f64]) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let min_index: usize = vec.argmin();
    Some(vec[min_index])
}

/// Linear score in 0..=1 that reaches 1 once `value` hits `saturation`.
#[inline]
pub fn saturating_ratio(value: f64, saturation: f64) -> f64 {
    if saturation <= f64::EPSILON {
        return 1.0;
    }
    (value / saturation).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_is_population_form() {
        let (mean, sd) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(mean_and_stddev(&[]), (0.0, 0.0));
        assert_eq!(get_max(&[]), None);
        assert_eq!(get_min(&[]), None);
    }

    #[test]
    fn extremes() {
        let v = [1.2, 0.9, 1.5, 1.1];
        assert_eq!(get_max(&v), Some(1.5));
        assert_eq!(get_min(&v), Some(0.9));
    }

    #[test]
    fn saturation_clamps() {
        assert_eq!(saturating_ratio(48.0, 24.0), 1.0);
        assert_eq!(saturating_ratio(12.0, 24.0), 0.5);
    }
}
