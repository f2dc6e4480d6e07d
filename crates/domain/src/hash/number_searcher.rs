/// Value in `sorted` nearest to `target`.
///
/// Targets beyond either end clamp to the first or last value. When `target`
/// sits exactly between two neighbours the lower one wins. `sorted` must be
/// ascending and free of NaN.
pub fn closest(sorted: &[f64], target: f64) -> Option<f64> {
    let insertion = match sorted.binary_search_by(|probe| probe.total_cmp(&target)) {
        Ok(index) => return Some(sorted[index]),
        Err(insertion) => insertion,
    };

    if insertion == 0 {
        return sorted.first().copied();
    }
    if insertion >= sorted.len() {
        return sorted.last().copied();
    }

    let lower = sorted[insertion - 1];
    let upper = sorted[insertion];
    if upper - target < target - lower {
        Some(upper)
    } else {
        Some(lower)
    }
}
