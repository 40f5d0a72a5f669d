//! Simulated participant satisfaction.

/// Map a final score onto a 1.0..=5.0 scale, rounded to one decimal.
pub fn satisfaction(final_score: u32) -> f64 {
    let raw = (f64::from(final_score) / 20.0).clamp(1.0, 5.0);
    (raw * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::satisfaction;

    #[test]
    fn clamps_and_scales() {
        assert_eq!(satisfaction(0), 1.0);
        assert_eq!(satisfaction(60), 3.0);
        assert_eq!(satisfaction(75), 3.8);
        assert_eq!(satisfaction(100), 5.0);
        assert_eq!(satisfaction(200), 5.0);
    }
}
