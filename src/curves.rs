use crate::estimator::PriceEstimate;

/// Peak of the raw two-sigmoid product over ages 10-45; dividing by it
/// normalizes the curve so its maximum maps to a multiplier of 1.
const AGE_CURVE_PEAK: f64 = 0.953_228_775_223_303_3;

/// Bell-shaped price multiplier over age in years.
///
/// One sigmoid rises through the teenage years (center 17, scale 1.5), a
/// second declines for veterans (center 30, scale 2). The product is near
/// zero at the extremes, climbs monotonically to a peak around age 23-24,
/// then decays monotonically.
pub fn age_price_multiplier(age_years: f64) -> f64 {
    let rise = 1.0 / (1.0 + (-(age_years - 17.0) / 1.5).exp());
    let decline = 1.0 / (1.0 + ((age_years - 30.0) / 2.0).exp());
    rise * decline / AGE_CURVE_PEAK
}

/// Wrap a model-path point estimate in the fixed quantile fan. The spread
/// fractions and the flat 0.5 confidence reflect the higher uncertainty of
/// the regression fallback compared to a well-supported comparable set.
pub fn fallback_estimate(price_pred: f64) -> PriceEstimate {
    PriceEstimate {
        price_pred,
        p25: price_pred * 0.8,
        p75: price_pred * 1.2,
        p05: price_pred * 0.6,
        p95: price_pred * 1.4,
        confidence: 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_sits_in_the_prime_years() {
        let peak_age = (100..=450)
            .map(|tenth| tenth as f64 / 10.0)
            .max_by(|a, b| {
                age_price_multiplier(*a).total_cmp(&age_price_multiplier(*b))
            })
            .unwrap();
        assert!((23.0..=24.5).contains(&peak_age), "peak at {peak_age}");
        assert!((age_price_multiplier(peak_age) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn extremes_are_near_zero() {
        assert!(age_price_multiplier(11.0) < 0.05);
        assert!(age_price_multiplier(41.0) < 0.05);
    }

    #[test]
    fn rises_then_falls_monotonically() {
        for age in 11..23 {
            assert!(age_price_multiplier(age as f64) < age_price_multiplier(age as f64 + 1.0));
        }
        for age in 25..44 {
            assert!(age_price_multiplier(age as f64) > age_price_multiplier(age as f64 + 1.0));
        }
    }

    #[test]
    fn fallback_fan_is_ordered() {
        let est = fallback_estimate(1_000_000.0);
        assert_eq!(est.p05, 600_000.0);
        assert_eq!(est.p25, 800_000.0);
        assert_eq!(est.p75, 1_200_000.0);
        assert_eq!(est.p95, 1_400_000.0);
        assert_eq!(est.confidence, 0.5);
        assert!(est.p05 <= est.p25 && est.p25 <= est.price_pred);
        assert!(est.price_pred <= est.p75 && est.p75 <= est.p95);
    }
}
