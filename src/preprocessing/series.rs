//! Helpers over 1-D series: first difference, moving average, moments

/// First-order difference `x[i + 1] - x[i]` (one element shorter than the input)
pub fn first_difference(values: &[f32]) -> Vec<f32> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Trailing moving average over `window` elements
///
/// The first `window - 1` outputs average over the elements available so far,
/// so the output has the input's length.
///
/// ```
/// use perfprint::preprocessing::series::moving_average;
///
/// assert_eq!(moving_average(&[0.0, 2.0, 4.0, 6.0, 8.0], 2), vec![0.0, 1.0, 3.0, 5.0, 7.0]);
/// ```
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0f32;
    for (i, &value) in values.iter().enumerate() {
        running += value;
        if i >= window {
            running -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(running / count as f32);
    }
    out
}

/// Mean and population standard deviation; `(0, 0)` for an empty series
pub fn mean_and_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f32>()
        / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_regular_window() {
        let average = moving_average(&[0.0, 2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(average, vec![0.0, 1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_moving_average_smaller_than_window() {
        let average = moving_average(&[0.0, 2.0, 4.0], 5);
        assert_eq!(average, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_moving_average_empty() {
        assert!(moving_average(&[], 4).is_empty());
    }

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[0.0, 0.5, 1.5, 1.5]), vec![0.5, 1.0, 0.0]);
        assert!(first_difference(&[1.0]).is_empty());
    }

    #[test]
    fn test_mean_and_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }
}
