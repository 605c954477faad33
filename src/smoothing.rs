/// Centered moving average with a clipped window at the series edges: each
/// output is the unweighted mean over `[i-radius, i+radius]` intersected with
/// the series, divided by the number of points actually present. Output
/// length always equals input length. Smoothing twice is not the same as
/// smoothing once.
pub fn moving_average(values: &[f64], radius: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(values.len() - 1);
            let window = &values[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}
