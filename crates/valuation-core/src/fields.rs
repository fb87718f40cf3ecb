//! The catalogue of financial fields the pipeline understands.
//!
//! Every value arriving from a collection adapter is keyed by one of these
//! names, so loosely-typed scraper output is pinned to a fixed vocabulary at
//! the boundary. Each field knows how it reconciles (numeric vs. text) and
//! how much it matters to the EVA formula (quality weight).

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a field's values are interpreted and reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Currency-denominated amount, converted to the reporting currency.
    Monetary,
    /// Unit-free numeric value (ratios, share counts); never converted.
    Scalar,
    /// Free text, reconciled by majority vote.
    Text,
}

/// A known financial field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    // Income statement
    Revenue,
    Ebit,
    Ebitda,
    NetIncome,
    InterestExpense,
    TaxExpense,
    // Balance sheet
    TotalAssets,
    CurrentAssets,
    CurrentLiabilities,
    TotalDebt,
    LongTermDebt,
    TotalEquity,
    CashAndEquivalents,
    // Market data
    Price,
    MarketCap,
    SharesOutstanding,
    Beta,
    PeRatio,
    DividendYield,
    // Identity
    CompanyName,
    Sector,
}

impl FieldName {
    pub const ALL: [FieldName; 21] = [
        FieldName::Revenue,
        FieldName::Ebit,
        FieldName::Ebitda,
        FieldName::NetIncome,
        FieldName::InterestExpense,
        FieldName::TaxExpense,
        FieldName::TotalAssets,
        FieldName::CurrentAssets,
        FieldName::CurrentLiabilities,
        FieldName::TotalDebt,
        FieldName::LongTermDebt,
        FieldName::TotalEquity,
        FieldName::CashAndEquivalents,
        FieldName::Price,
        FieldName::MarketCap,
        FieldName::SharesOutstanding,
        FieldName::Beta,
        FieldName::PeRatio,
        FieldName::DividendYield,
        FieldName::CompanyName,
        FieldName::Sector,
    ];

    pub fn all() -> &'static [FieldName] {
        &Self::ALL
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldName::Revenue
            | FieldName::Ebit
            | FieldName::Ebitda
            | FieldName::NetIncome
            | FieldName::InterestExpense
            | FieldName::TaxExpense
            | FieldName::TotalAssets
            | FieldName::CurrentAssets
            | FieldName::CurrentLiabilities
            | FieldName::TotalDebt
            | FieldName::LongTermDebt
            | FieldName::TotalEquity
            | FieldName::CashAndEquivalents
            | FieldName::Price
            | FieldName::MarketCap => FieldKind::Monetary,
            FieldName::SharesOutstanding
            | FieldName::Beta
            | FieldName::PeRatio
            | FieldName::DividendYield => FieldKind::Scalar,
            FieldName::CompanyName | FieldName::Sector => FieldKind::Text,
        }
    }

    /// Weight of this field in the overall data-quality score.
    ///
    /// Fields the EVA formula cannot do without weigh 3, inputs it can
    /// estimate around weigh 2, and context-only fields weigh 1. Identity
    /// fields do not participate.
    pub fn quality_weight(&self) -> f64 {
        match self {
            FieldName::Ebit
            | FieldName::TotalAssets
            | FieldName::CurrentLiabilities
            | FieldName::TotalDebt
            | FieldName::TotalEquity
            | FieldName::MarketCap
            | FieldName::SharesOutstanding => 3.0,
            FieldName::Revenue | FieldName::NetIncome | FieldName::Price | FieldName::Beta => 2.0,
            FieldName::Ebitda
            | FieldName::InterestExpense
            | FieldName::TaxExpense
            | FieldName::CashAndEquivalents
            | FieldName::CurrentAssets
            | FieldName::LongTermDebt
            | FieldName::PeRatio
            | FieldName::DividendYield => 1.0,
            FieldName::CompanyName | FieldName::Sector => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Revenue => "revenue",
            FieldName::Ebit => "ebit",
            FieldName::Ebitda => "ebitda",
            FieldName::NetIncome => "net_income",
            FieldName::InterestExpense => "interest_expense",
            FieldName::TaxExpense => "tax_expense",
            FieldName::TotalAssets => "total_assets",
            FieldName::CurrentAssets => "current_assets",
            FieldName::CurrentLiabilities => "current_liabilities",
            FieldName::TotalDebt => "total_debt",
            FieldName::LongTermDebt => "long_term_debt",
            FieldName::TotalEquity => "total_equity",
            FieldName::CashAndEquivalents => "cash_and_equivalents",
            FieldName::Price => "price",
            FieldName::MarketCap => "market_cap",
            FieldName::SharesOutstanding => "shares_outstanding",
            FieldName::Beta => "beta",
            FieldName::PeRatio => "pe_ratio",
            FieldName::DividendYield => "dividend_yield",
            FieldName::CompanyName => "company_name",
            FieldName::Sector => "sector",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
