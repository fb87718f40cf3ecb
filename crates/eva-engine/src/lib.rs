//! Economic Value Added calculation.
//!
//! EVA = NOPAT - (WACC x invested capital), with the cost of equity from
//! CAPM. The engine is a pure function of one profile, one assumption set
//! and one calculation date: no I/O, no clock reads, no retries. A failure
//! is a value the caller records, never something to recover from here.

pub mod signal;

use chrono::NaiveDate;
use valuation_core::{
    AssumptionSet, CompanyProfile, EngineConfig, SignalThresholds, ValuationError, ValuationRecord,
};

pub use signal::SignalClassifier;

/// Quality deduction applied when beta had to fall back to the default.
const DEFAULT_BETA_QUALITY_PENALTY: f64 = 0.1;

/// Implied tax rates outside this band are treated as reporting noise.
const TAX_RATE_SANITY_BAND: (f64, f64) = (0.05, 0.5);

#[derive(Debug)]
pub struct EvaEngine {
    config: EngineConfig,
    classifier: SignalClassifier,
}

impl EvaEngine {
    pub fn new(config: EngineConfig, thresholds: SignalThresholds) -> Self {
        Self {
            config,
            classifier: SignalClassifier::new(thresholds),
        }
    }

    /// Produce the valuation record for one company.
    ///
    /// Refuses incomplete profiles, refuses degenerate invested capital,
    /// and records (rather than fails on) negative invested capital and a
    /// defaulted beta.
    pub fn calculate(
        &self,
        profile: &CompanyProfile,
        assumptions: &AssumptionSet,
        calculation_date: NaiveDate,
    ) -> Result<ValuationRecord, ValuationError> {
        let ticker = profile.ticker.clone();

        let missing = profile.missing_required_fields();
        if !missing.is_empty() {
            return Err(ValuationError::IncompleteProfile {
                ticker,
                missing: missing.join(", "),
            });
        }

        let incomplete = |name: &str| ValuationError::IncompleteProfile {
            ticker: profile.ticker.clone(),
            missing: name.to_string(),
        };
        let ebit = profile.ebit.ok_or_else(|| incomplete("ebit"))?;
        let total_assets = profile.total_assets.ok_or_else(|| incomplete("total_assets"))?;
        let current_liabilities = profile
            .current_liabilities
            .ok_or_else(|| incomplete("current_liabilities"))?;
        let market_cap = profile.market_cap.ok_or_else(|| incomplete("market_cap"))?;
        if market_cap <= 0.0 {
            return Err(incomplete("market_cap (non-positive)"));
        }

        let mut warnings = Vec::new();
        let mut data_quality_score = profile.overall_data_quality;

        // Prefer the company's own effective tax rate when the reported tax
        // expense implies a plausible one.
        let mut tax_rate = assumptions.tax_rate;
        if let Some(tax_expense) = profile.tax_expense {
            if ebit != 0.0 {
                let implied = (tax_expense / ebit).abs();
                if implied > TAX_RATE_SANITY_BAND.0 && implied < TAX_RATE_SANITY_BAND.1 {
                    tax_rate = implied;
                }
            }
        }

        let nopat = ebit * (1.0 - tax_rate);

        let invested_capital = total_assets - current_liabilities;
        if invested_capital.abs() <= self.config.degenerate_capital_cutoff {
            return Err(ValuationError::DivisionDegenerate { ticker });
        }
        if invested_capital < 0.0 {
            warnings.push("negative invested capital: EVA and ROIC are not meaningful".to_string());
        }

        let beta = match profile.beta {
            Some(beta) => beta,
            None => {
                warnings.push(format!(
                    "beta unavailable, defaulted to {}",
                    self.config.default_beta
                ));
                data_quality_score = (data_quality_score - DEFAULT_BETA_QUALITY_PENALTY).max(0.0);
                self.config.default_beta
            }
        };
        let cost_of_equity = assumptions.risk_free_rate + beta * assumptions.market_risk_premium;
        let cost_of_debt_after_tax = assumptions.cost_of_debt * (1.0 - tax_rate);

        // No debt figure means no debt in the capital structure, not a failure.
        let total_debt = profile.total_debt.unwrap_or(0.0).max(0.0);
        let equity_weight = market_cap / (market_cap + total_debt);
        let debt_weight = 1.0 - equity_weight;

        let wacc = equity_weight * cost_of_equity + debt_weight * cost_of_debt_after_tax;
        let capital_charge = wacc * invested_capital;
        let eva = nopat - capital_charge;
        let roic = nopat / invested_capital;
        let eva_spread = roic - wacc;

        // Shares can be recovered from market cap and price when absent.
        let shares = profile.shares_outstanding.or_else(|| {
            profile
                .price
                .filter(|price| *price > 0.0)
                .map(|price| market_cap / price)
        });
        let eva_per_share = shares.filter(|s| *s > 0.0).map(|s| eva / s);

        // Gordon-style capitalization of the EVA stream over WACC.
        let intrinsic_value = if wacc > 0.0 {
            invested_capital + eva / wacc
        } else {
            invested_capital
        };
        let intrinsic_premium = (intrinsic_value - market_cap) / market_cap;

        let signal = self.classifier.classify(eva_spread, intrinsic_premium);

        Ok(ValuationRecord {
            ticker,
            name: profile.name.clone(),
            sector: profile.sector.clone(),
            calculation_date,
            nopat,
            invested_capital,
            wacc,
            cost_of_equity,
            cost_of_debt_after_tax,
            equity_weight,
            debt_weight,
            eva,
            eva_spread,
            roic,
            capital_charge,
            eva_per_share,
            intrinsic_value,
            intrinsic_premium,
            market_cap,
            signal,
            data_quality_score,
            warnings,
        })
    }
}

impl Default for EvaEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), SignalThresholds::default())
    }
}
