//! Builds one validated CompanyProfile per ticker from reconciled fields.

use std::collections::BTreeMap;

use valuation_core::{
    CompanyProfile, FieldKind, FieldName, FieldValue, MergerConfig, ReconciledField, SourceRecord,
    ValuationError,
};

#[derive(Debug)]
pub struct ProfileAssembler {
    config: MergerConfig,
}

impl ProfileAssembler {
    pub fn new(config: MergerConfig) -> Self {
        Self { config }
    }

    /// Convert every monetary field into the reporting currency.
    ///
    /// Runs before reconciliation: a median across mixed currencies would be
    /// meaningless. A value without a currency code is assumed to already be
    /// in the reporting currency; an unknown code fails the ticker.
    pub fn normalize(
        &self,
        records: Vec<SourceRecord>,
    ) -> Result<Vec<SourceRecord>, ValuationError> {
        records
            .into_iter()
            .map(|mut record| {
                for (field, value) in record.fields.iter_mut() {
                    if field.kind() != FieldKind::Monetary {
                        continue;
                    }
                    if let FieldValue::Numeric {
                        value: amount,
                        currency: Some(code),
                    } = value
                    {
                        if *code == self.config.reporting_currency {
                            continue;
                        }
                        match self.config.fx_rates.get(code.as_str()) {
                            Some(rate) => {
                                *amount *= rate;
                                *code = self.config.reporting_currency.clone();
                            }
                            None => {
                                return Err(ValuationError::UnitMismatch {
                                    ticker: record.ticker.clone(),
                                    field: *field,
                                    currency: code.clone(),
                                });
                            }
                        }
                    }
                }
                Ok(record)
            })
            .collect()
    }

    /// Assemble the reconciled fields of one ticker into a profile.
    ///
    /// The overall data quality is the weighted mean of per-field agreement
    /// scores over the whole catalogue; an absent field contributes zero but
    /// its weight still counts, so incompleteness costs quality.
    pub fn assemble(
        &self,
        ticker: &str,
        fields: &BTreeMap<FieldName, ReconciledField>,
    ) -> CompanyProfile {
        let num = |f: FieldName| fields.get(&f).and_then(|rf| rf.chosen.as_numeric());
        let text = |f: FieldName| {
            fields
                .get(&f)
                .and_then(|rf| rf.chosen.as_text().map(|s| s.to_string()))
        };

        let mut weight_total = 0.0;
        let mut weighted_score = 0.0;
        for field in FieldName::all() {
            let weight = field.quality_weight();
            if weight == 0.0 {
                continue;
            }
            weight_total += weight;
            if let Some(reconciled) = fields.get(field) {
                weighted_score += weight * reconciled.agreement_score;
            }
        }
        let overall_data_quality = if weight_total > 0.0 {
            weighted_score / weight_total
        } else {
            0.0
        };

        let mut profile = CompanyProfile {
            ticker: ticker.to_string(),
            name: text(FieldName::CompanyName),
            sector: text(FieldName::Sector),
            revenue: num(FieldName::Revenue),
            ebit: num(FieldName::Ebit),
            ebitda: num(FieldName::Ebitda),
            net_income: num(FieldName::NetIncome),
            interest_expense: num(FieldName::InterestExpense),
            tax_expense: num(FieldName::TaxExpense),
            total_assets: num(FieldName::TotalAssets),
            current_assets: num(FieldName::CurrentAssets),
            current_liabilities: num(FieldName::CurrentLiabilities),
            total_debt: num(FieldName::TotalDebt),
            long_term_debt: num(FieldName::LongTermDebt),
            total_equity: num(FieldName::TotalEquity),
            cash_and_equivalents: num(FieldName::CashAndEquivalents),
            price: num(FieldName::Price),
            market_cap: num(FieldName::MarketCap),
            shares_outstanding: num(FieldName::SharesOutstanding),
            beta: num(FieldName::Beta),
            pe_ratio: num(FieldName::PeRatio),
            dividend_yield: num(FieldName::DividendYield),
            overall_data_quality,
            required_fields_present: false,
        };
        profile.required_fields_present = profile.missing_required_fields().is_empty();
        profile
    }
}
