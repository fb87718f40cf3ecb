use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValuationError;

/// Macro-economic rates every valuation in a run shares.
///
/// Passed into the engine as an explicit value, never read from ambient
/// state, so recomputation with the same inputs is bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionSet {
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
}

impl Default for AssumptionSet {
    fn default() -> Self {
        // Egyptian market macro parameters
        Self {
            risk_free_rate: 0.26,
            market_risk_premium: 0.08,
            cost_of_debt: 0.22,
            tax_rate: 0.225,
        }
    }
}

impl AssumptionSet {
    /// Reject malformed assumptions before any ticker is processed.
    /// Rates above 1.0 are tolerated (stressed economies); negatives are not.
    pub fn validate(&self) -> Result<(), ValuationError> {
        let rates = [
            ("risk_free_rate", self.risk_free_rate),
            ("market_risk_premium", self.market_risk_premium),
            ("cost_of_debt", self.cost_of_debt),
            ("tax_rate", self.tax_rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() {
                return Err(ValuationError::ConfigurationInvalid(format!(
                    "{name} is not a finite number"
                )));
            }
            if rate < 0.0 {
                return Err(ValuationError::ConfigurationInvalid(format!(
                    "{name} must not be negative, got {rate}"
                )));
            }
        }
        if self.tax_rate >= 1.0 {
            return Err(ValuationError::ConfigurationInvalid(format!(
                "tax_rate must be below 1.0, got {}",
                self.tax_rate
            )));
        }
        Ok(())
    }
}

/// Knobs for cross-source reconciliation and currency normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Relative deviation from the median still counted as agreement.
    pub relative_tolerance: f64,
    /// Tie-break order, most trusted source first.
    pub source_priority: Vec<String>,
    /// Currency every monetary field is normalized into.
    pub reporting_currency: String,
    /// Conversion rates into the reporting currency, keyed by currency code.
    pub fx_rates: BTreeMap<String, f64>,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 0.05,
            source_priority: vec![
                "yahoo_finance".to_string(),
                "stockanalysis".to_string(),
                "mubasher".to_string(),
                "egx_official".to_string(),
            ],
            reporting_currency: "EGP".to_string(),
            fx_rates: BTreeMap::new(),
        }
    }
}

/// Engine-level fallbacks and cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Beta used when no source supplies one.
    pub default_beta: f64,
    /// |invested capital| at or below this is treated as degenerate.
    pub degenerate_capital_cutoff: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_beta: 1.0,
            degenerate_capital_cutoff: 1e-6,
        }
    }
}

/// Signal classification thresholds, configurable so the cutoffs can be
/// recalibrated without touching the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Minimum EVA spread before a record can be called undervalued.
    pub spread_threshold: f64,
    /// Intrinsic discount beyond which a record is called overvalued.
    pub margin_threshold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            spread_threshold: 0.0,
            margin_threshold: 0.15,
        }
    }
}
