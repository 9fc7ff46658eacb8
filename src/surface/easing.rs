//! Easing curves for the fold/unfold animation

/// Cubic ease-out: fast start, slow end
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let p = t - 1.0;
    p * p * p + 1.0
}

/// Inverse of `ease_out_cubic`
#[inline]
pub fn reverse_ease_out_cubic(t: f64) -> f64 {
    (t - 1.0).cbrt() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_cubic_boundaries() {
        assert!(ease_out_cubic(0.0).abs() < 1e-9);
        assert!((ease_out_cubic(1.0) - 1.0).abs() < 1e-9);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn test_reverse_is_inverse() {
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert!((reverse_ease_out_cubic(ease_out_cubic(t)) - t).abs() < 1e-9);
        }
    }
}
