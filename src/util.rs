pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Mean of the trailing `n` values, or None when fewer than `n` exist
pub fn trailing_mean(data: &[f64], n: usize) -> Option<f64> {
    if n == 0 || data.len() < n {
        return None;
    }
    mean(&data[data.len() - n..])
}

/// Fixed two-decimal rendering used for every time shown to the user
pub fn format_secs(secs: f64) -> String {
    format!("{:.2}", secs)
}
