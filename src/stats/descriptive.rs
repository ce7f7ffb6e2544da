//! Descriptive statistics over plain slices of valid values
//!
//! Callers filter out missing values first. Every function answers `None`
//! where the statistic is undefined instead of returning NaN or zero.

use std::cmp::Ordering;

/// Arithmetic mean
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample variance (n - 1 denominator); needs at least 2 values
pub fn sample_variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x - m).powi(2)).sum();
    Some(ss / (data.len() - 1) as f64)
}

/// Sample standard deviation
pub fn sample_std(data: &[f64]) -> Option<f64> {
    sample_variance(data).map(f64::sqrt)
}

/// Population variance (n denominator)
pub fn population_variance(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x - m).powi(2)).sum();
    Some(ss / data.len() as f64)
}

/// Ascending copy of the data
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut sorted_data = data.to_vec();
    sorted_data.sort_by(|a, b| a.total_cmp(b));
    sorted_data
}

/// Calculate percentile of sorted data with linear interpolation between
/// closest ranks (`p` in 0..=100)
pub fn percentile(sorted_data: &[f64], p: f64) -> Option<f64> {
    if sorted_data.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }

    let n = sorted_data.len();
    let index = (p / 100.0) * (n - 1) as f64;
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        Some(sorted_data[lower_index])
    } else {
        let weight = index - lower_index as f64;
        Some(sorted_data[lower_index] * (1.0 - weight) + sorted_data[upper_index] * weight)
    }
}

/// Median of unsorted data
pub fn median(data: &[f64]) -> Option<f64> {
    percentile(&sorted(data), 50.0)
}

/// Pearson correlation; `None` with fewer than 2 points or zero variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    if sum_xx == 0.0 || sum_yy == 0.0 {
        return None;
    }
    let r = sum_xy / (sum_xx * sum_yy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// 1-based ranks, ties get the average of their positions
pub fn average_ranks(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut indexed_data: Vec<(usize, f64)> = data.iter().copied().enumerate().collect();

    // Sort by value
    indexed_data.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];

    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && indexed_data[j].1 == indexed_data[i].1 {
            j += 1;
        }

        // Average rank for tied values
        let avg_rank = (i + j - 1) as f64 / 2.0 + 1.0;
        for entry in &indexed_data[i..j] {
            ranks[entry.0] = avg_rank;
        }

        i = j;
    }

    ranks
}

/// Spearman rank correlation: Pearson over average ranks
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}
