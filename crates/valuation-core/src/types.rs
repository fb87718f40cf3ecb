use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::FieldName;

/// A single value reported by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Numeric {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    Text(String),
}

impl FieldValue {
    pub fn numeric(value: f64) -> Self {
        FieldValue::Numeric {
            value,
            currency: None,
        }
    }

    pub fn monetary(value: f64, currency: &str) -> Self {
        FieldValue::Numeric {
            value,
            currency: Some(currency.to_string()),
        }
    }

    pub fn text(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric { value, .. } => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Numeric { .. } => None,
        }
    }
}

/// Everything one source reported about one company in one snapshot.
/// Immutable once built by a collection adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub ticker: String,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub fields: BTreeMap<FieldName, FieldValue>,
}

/// One field merged across sources, with the cross-source agreement score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledField {
    pub field: FieldName,
    pub chosen: FieldValue,
    pub chosen_source: String,
    /// Fraction of contributing sources within tolerance of the chosen value.
    pub agreement_score: f64,
    /// Every (source, value) pair that took part, outliers included.
    pub contributions: Vec<(String, FieldValue)>,
}

/// The merged financial picture of one company for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,

    // Income statement
    pub revenue: Option<f64>,
    pub ebit: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub tax_expense: Option<f64>,

    // Balance sheet
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub total_debt: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub total_equity: Option<f64>,
    pub cash_and_equivalents: Option<f64>,

    // Market data
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub beta: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,

    /// Weighted average of per-field agreement scores, 0.0 to 1.0.
    pub overall_data_quality: f64,
    pub required_fields_present: bool,
}

impl CompanyProfile {
    /// Required inputs without which a valuation is refused.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.ebit.is_none() {
            missing.push("ebit");
        }
        if self.total_assets.is_none() {
            missing.push("total_assets");
        }
        if self.current_liabilities.is_none() {
            missing.push("current_liabilities");
        }
        if self.total_equity.is_none() && self.total_debt.is_none() {
            missing.push("total_equity or total_debt");
        }
        if self.market_cap.is_none() {
            missing.push("market_cap");
        }
        missing
    }
}

/// Valuation verdict for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Undervalued,
    FairValue,
    Overvalued,
}

impl Signal {
    pub fn to_label(&self) -> &'static str {
        match self {
            Signal::Undervalued => "UNDERVALUED",
            Signal::FairValue => "FAIR VALUE",
            Signal::Overvalued => "OVERVALUED",
        }
    }
}

/// The EVA valuation of one company on one date.
/// Deterministic function of (profile, assumptions, date); never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub calculation_date: NaiveDate,

    pub nopat: f64,
    pub invested_capital: f64,
    pub wacc: f64,
    pub cost_of_equity: f64,
    pub cost_of_debt_after_tax: f64,
    pub equity_weight: f64,
    pub debt_weight: f64,
    pub eva: f64,
    pub eva_spread: f64,
    pub roic: f64,
    pub capital_charge: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eva_per_share: Option<f64>,
    pub intrinsic_value: f64,
    pub intrinsic_premium: f64,
    pub market_cap: f64,

    pub signal: Signal,
    pub data_quality_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Per-sector rollup inside a RunSummary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAggregate {
    pub count: usize,
    pub total_eva: f64,
    pub avg_roic: f64,
    pub avg_wacc: f64,
}

/// Portfolio-level statistics for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_timestamp: DateTime<Utc>,
    pub companies_analyzed: usize,
    pub undervalued_count: usize,
    pub positive_eva_count: usize,
    pub sector_aggregates: BTreeMap<String, SectorAggregate>,
}

/// Why a ticker produced no valuation this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub ticker: String,
    pub reason: String,
}

/// Everything a run hands to the persistence and reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub profiles: Vec<CompanyProfile>,
    pub records: Vec<ValuationRecord>,
    pub skipped: Vec<Diagnostic>,
}
