use valuation_core::{Signal, SignalThresholds, ValuationRecord};

/// Labels a valuation record from its EVA spread and intrinsic premium.
#[derive(Debug)]
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// Undervalued needs both a positive spread beyond the threshold and a
    /// positive intrinsic premium; overvalued needs either a spread below
    /// the negative threshold or a deep intrinsic discount.
    pub fn classify(&self, eva_spread: f64, intrinsic_premium: f64) -> Signal {
        if eva_spread > self.thresholds.spread_threshold && intrinsic_premium > 0.0 {
            Signal::Undervalued
        } else if eva_spread < -self.thresholds.spread_threshold
            || intrinsic_premium < -self.thresholds.margin_threshold
        {
            Signal::Overvalued
        } else {
            Signal::FairValue
        }
    }

    pub fn classify_record(&self, record: &ValuationRecord) -> Signal {
        self.classify(record.eva_spread, record.intrinsic_premium)
    }
}

impl Default for SignalClassifier {
    fn default() -> Self {
        Self::new(SignalThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SignalClassifier {
        SignalClassifier::new(SignalThresholds {
            spread_threshold: 0.02,
            margin_threshold: 0.15,
        })
    }

    #[test]
    fn positive_spread_and_premium_is_undervalued() {
        assert_eq!(classifier().classify(0.05, 0.20), Signal::Undervalued);
    }

    #[test]
    fn positive_spread_without_premium_is_not_undervalued() {
        assert_eq!(classifier().classify(0.05, -0.05), Signal::FairValue);
    }

    #[test]
    fn negative_spread_is_overvalued() {
        assert_eq!(classifier().classify(-0.10, 0.05), Signal::Overvalued);
    }

    #[test]
    fn deep_intrinsic_discount_alone_is_overvalued() {
        assert_eq!(classifier().classify(0.01, -0.30), Signal::Overvalued);
    }

    #[test]
    fn spread_inside_band_is_fair_value() {
        assert_eq!(classifier().classify(0.01, 0.05), Signal::FairValue);
        assert_eq!(classifier().classify(-0.01, -0.05), Signal::FairValue);
    }
}
