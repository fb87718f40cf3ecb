//! Batch valuation pipeline: reconcile, assemble, value and classify each
//! ticker independently, then reduce the results into one run summary.
//!
//! Per-ticker work is pure and shares nothing, so tickers run in parallel.
//! A ticker that fails is recorded and skipped; only invalid configuration
//! aborts a run, and it does so before any ticker is touched.

pub mod aggregate;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use data_merger::{FieldReconciler, ProfileAssembler};
use eva_engine::EvaEngine;
use valuation_core::{
    AssumptionSet, CompanyProfile, Diagnostic, EngineConfig, MergerConfig, RunReport,
    SignalThresholds, SourceRecord, ValuationError, ValuationRecord,
};

pub use aggregate::{summarize, RunAccumulator, UNKNOWN_SECTOR};

/// Everything a run needs beyond its input records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub assumptions: AssumptionSet,
    pub merger: MergerConfig,
    pub engine: EngineConfig,
    pub thresholds: SignalThresholds,
}

#[derive(Debug)]
pub struct ValuationPipeline {
    reconciler: FieldReconciler,
    assembler: ProfileAssembler,
    engine: EvaEngine,
    assumptions: AssumptionSet,
}

struct TickerOutcome {
    ticker: String,
    profile: Option<CompanyProfile>,
    record: Result<ValuationRecord, ValuationError>,
}

impl ValuationPipeline {
    /// Fails with ConfigurationInvalid before any ticker is processed;
    /// every valuation depends on the assumption set.
    pub fn new(config: PipelineConfig) -> Result<Self, ValuationError> {
        config.assumptions.validate()?;
        Ok(Self {
            reconciler: FieldReconciler::new(config.merger.clone()),
            assembler: ProfileAssembler::new(config.merger),
            engine: EvaEngine::new(config.engine, config.thresholds),
            assumptions: config.assumptions,
        })
    }

    /// Run one batch. Per-ticker failures never abort the batch; every
    /// skipped ticker comes back as a diagnostic.
    pub fn run(&self, batch: Vec<SourceRecord>, run_timestamp: DateTime<Utc>) -> RunReport {
        let calculation_date = run_timestamp.date_naive();

        let mut by_ticker: BTreeMap<String, Vec<SourceRecord>> = BTreeMap::new();
        for record in batch {
            by_ticker.entry(record.ticker.clone()).or_default().push(record);
        }
        info!(tickers = by_ticker.len(), "starting valuation run");

        let groups: Vec<(String, Vec<SourceRecord>)> = by_ticker.into_iter().collect();
        let outcomes: Vec<TickerOutcome> = groups
            .into_par_iter()
            .map(|(ticker, records)| self.process_ticker(ticker, records, calculation_date))
            .collect();

        let mut profiles = Vec::new();
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            if let Some(profile) = outcome.profile {
                profiles.push(profile);
            }
            match outcome.record {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(ticker = %outcome.ticker, reason = %err, "ticker skipped");
                    skipped.push(Diagnostic {
                        ticker: outcome.ticker,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let summary = aggregate::summarize(&records, run_timestamp);
        info!(
            analyzed = summary.companies_analyzed,
            undervalued = summary.undervalued_count,
            skipped = skipped.len(),
            "valuation run complete"
        );

        RunReport {
            summary,
            profiles,
            records,
            skipped,
        }
    }

    fn process_ticker(
        &self,
        ticker: String,
        records: Vec<SourceRecord>,
        calculation_date: NaiveDate,
    ) -> TickerOutcome {
        let normalized = match self.assembler.normalize(records) {
            Ok(normalized) => normalized,
            Err(err) => {
                return TickerOutcome {
                    ticker,
                    profile: None,
                    record: Err(err),
                }
            }
        };
        let fields = self.reconciler.reconcile_all(&normalized);
        let profile = self.assembler.assemble(&ticker, &fields);
        let record = self
            .engine
            .calculate(&profile, &self.assumptions, calculation_date);
        TickerOutcome {
            ticker,
            profile: Some(profile),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valuation_core::{FieldName, FieldValue, Signal};

    fn source_record(
        ticker: &str,
        source: &str,
        fields: Vec<(FieldName, FieldValue)>,
    ) -> SourceRecord {
        SourceRecord {
            ticker: ticker.to_string(),
            source: source.to_string(),
            fetched_at: Utc::now(),
            fields: fields.into_iter().collect(),
        }
    }

    fn complete_fields(sector: &str) -> Vec<(FieldName, FieldValue)> {
        vec![
            (FieldName::Sector, FieldValue::text(sector)),
            (FieldName::Ebit, FieldValue::numeric(100.0)),
            (FieldName::TotalAssets, FieldValue::numeric(1000.0)),
            (FieldName::CurrentLiabilities, FieldValue::numeric(200.0)),
            (FieldName::TotalDebt, FieldValue::numeric(100.0)),
            (FieldName::TotalEquity, FieldValue::numeric(700.0)),
            (FieldName::MarketCap, FieldValue::numeric(900.0)),
            (FieldName::Beta, FieldValue::numeric(1.2)),
            (FieldName::SharesOutstanding, FieldValue::numeric(20.0)),
        ]
    }

    fn pipeline() -> ValuationPipeline {
        ValuationPipeline::new(PipelineConfig::default()).unwrap()
    }

    #[test]
    fn invalid_assumptions_abort_before_any_ticker() {
        let config = PipelineConfig {
            assumptions: AssumptionSet {
                market_risk_premium: -0.08,
                ..AssumptionSet::default()
            },
            ..PipelineConfig::default()
        };
        match ValuationPipeline::new(config) {
            Err(ValuationError::ConfigurationInvalid(_)) => {}
            other => panic!("expected ConfigurationInvalid, got {other:?}"),
        }
    }

    #[test]
    fn batch_continues_past_incomplete_tickers() {
        let batch = vec![
            source_record("COMI", "yahoo_finance", complete_fields("Banking")),
            // Only a sector: required fields missing, must be skipped
            source_record(
                "GAPS",
                "mubasher",
                vec![(FieldName::Sector, FieldValue::text("Materials"))],
            ),
        ];

        let report = pipeline().run(batch, Utc::now());

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].ticker, "COMI");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].ticker, "GAPS");
        assert!(report.skipped[0].reason.contains("Incomplete profile"));
        // Both profiles exist; the incomplete one is flagged, not hidden
        assert_eq!(report.profiles.len(), 2);
        assert_eq!(report.summary.companies_analyzed, 1);
    }

    #[test]
    fn degenerate_capital_shows_in_diagnostics_not_in_records() {
        let mut fields = complete_fields("Energy");
        for (name, value) in fields.iter_mut() {
            if *name == FieldName::TotalAssets {
                *value = FieldValue::numeric(200.0); // equals current liabilities
            }
        }
        let batch = vec![source_record("FLAT", "yahoo_finance", fields)];

        let report = pipeline().run(batch, Utc::now());
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("Degenerate"));
    }

    #[test]
    fn unit_mismatch_skips_only_the_offending_ticker() {
        let mut bad_fields = complete_fields("Banking");
        bad_fields.push((FieldName::Revenue, FieldValue::monetary(10.0, "XYZ")));
        let batch = vec![
            source_record("GOOD", "yahoo_finance", complete_fields("Banking")),
            source_record("BADC", "yahoo_finance", bad_fields),
        ];

        let report = pipeline().run(batch, Utc::now());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].ticker, "GOOD");
        assert_eq!(report.skipped[0].ticker, "BADC");
        assert!(report.skipped[0].reason.contains("Unit mismatch"));
    }

    #[test]
    fn disagreeing_sources_are_reconciled_before_valuation() {
        // Two sources agree on EBIT within tolerance, a third is a wild
        // outlier; the valuation must be driven by the median.
        let mut batch = vec![
            source_record("COMI", "yahoo_finance", complete_fields("Banking")),
            source_record(
                "COMI",
                "mubasher",
                vec![(FieldName::Ebit, FieldValue::numeric(102.0))],
            ),
            source_record(
                "COMI",
                "egx_official",
                vec![(FieldName::Ebit, FieldValue::numeric(500.0))],
            ),
        ];
        batch.reverse(); // input order must not matter

        let report = pipeline().run(batch, Utc::now());
        let record = &report.records[0];
        // median EBIT = 102, nopat = 102 * (1 - 0.225)
        assert!((record.nopat - 102.0 * 0.775).abs() < 1e-9);
    }

    #[test]
    fn run_summary_reflects_signals_and_sectors() {
        let batch = vec![
            source_record("COMI", "yahoo_finance", complete_fields("Banking")),
            source_record("SWDY", "yahoo_finance", complete_fields("Industrials")),
        ];
        let report = pipeline().run(batch, Utc::now());

        assert_eq!(report.summary.companies_analyzed, 2);
        assert_eq!(report.summary.sector_aggregates.len(), 2);
        assert!(report.summary.sector_aggregates.contains_key("Banking"));
        // The worked example is deeply EVA-negative, so nothing is undervalued
        assert_eq!(report.summary.undervalued_count, 0);
        assert_eq!(report.summary.positive_eva_count, 0);
        assert!(report
            .records
            .iter()
            .all(|r| r.signal == Signal::Overvalued));
    }
}
