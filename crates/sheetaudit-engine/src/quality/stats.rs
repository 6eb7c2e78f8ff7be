//! Robust location/scale estimates for outlier detection.

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Median absolute deviation from the median.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// The spread outliers are measured against: the MAD, or the mean absolute
/// deviation when more than half the values sit exactly on the median.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub center: f64,
    pub scale: f64,
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    let center = median(values)?;
    let mad = median_absolute_deviation(values, center)?;
    let scale = if mad > 0.0 {
        mad
    } else {
        values.iter().map(|v| (v - center).abs()).sum::<f64>() / values.len() as f64
    };
    (scale > 0.0).then_some(Spread { center, scale })
}

/// Indices of values further than `multiplier * scale` from the center.
pub fn outlier_indices(values: &[f64], multiplier: f64, min_samples: usize) -> Vec<usize> {
    if values.len() < min_samples {
        return Vec::new();
    }
    let Some(Spread { center, scale }) = spread(values) else {
        return Vec::new();
    };
    let limit = multiplier * scale;
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| (*v - center).abs() > limit)
        .map(|(i, _)| i)
        .collect()
}
