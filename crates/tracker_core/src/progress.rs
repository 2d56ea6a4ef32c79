//! Progress arithmetic and byte formatting for the progress panel.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Whole-number percentage of `done` against `expected`, rounded half up and
/// capped at 100. `None` when the expected size is unknown or zero.
pub fn percentage(done: u64, expected: Option<u64>) -> Option<u8> {
    let expected = expected.filter(|&total| total > 0)?;
    let scaled = (u128::from(done) * 100 + u128::from(expected) / 2) / u128::from(expected);
    Some(scaled.min(100) as u8)
}

/// Bytes still to come, or `None` when the expected size is unknown or zero.
pub fn remaining(done: u64, expected: Option<u64>) -> Option<u64> {
    expected
        .filter(|&total| total > 0)
        .map(|total| total.saturating_sub(done))
}

/// Formats a byte count with binary units, e.g. `1.9 MB`.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(500_000, Some(2_000_000)), Some(25));
        assert_eq!(percentage(1, Some(3)), Some(33));
        assert_eq!(percentage(2, Some(3)), Some(67));
        assert_eq!(percentage(1, Some(200)), Some(1));
        assert_eq!(percentage(0, Some(10)), Some(0));
    }

    #[test]
    fn percentage_unknown_for_missing_or_zero_total() {
        assert_eq!(percentage(10, None), None);
        assert_eq!(percentage(10, Some(0)), None);
        assert_eq!(remaining(10, None), None);
        assert_eq!(remaining(10, Some(0)), None);
    }

    #[test]
    fn overshoot_is_capped() {
        assert_eq!(percentage(3_000, Some(2_000)), Some(100));
        assert_eq!(remaining(3_000, Some(2_000)), Some(0));
    }

    #[test]
    fn percentage_handles_huge_values() {
        assert_eq!(percentage(u64::MAX / 2, Some(u64::MAX)), Some(50));
    }

    #[test]
    fn human_size_picks_unit() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1024), "1.0 KB");
        assert_eq!(human_size(2_000_000), "1.9 MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }
}
