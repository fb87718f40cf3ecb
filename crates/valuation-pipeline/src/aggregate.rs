//! Order-independent reduction of a run's valuation records.
//!
//! Only commutative sums and counts accumulate; averages are derived at
//! finalization. Reordering or re-chunking the input leaves the summary
//! unchanged, which is what lets the batch run in parallel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use valuation_core::{RunSummary, SectorAggregate, Signal, ValuationRecord};

/// Bucket for records whose sector no source could supply.
pub const UNKNOWN_SECTOR: &str = "Unknown";

#[derive(Debug, Clone, Default)]
struct SectorAccumulator {
    count: usize,
    total_eva: f64,
    roic_sum: f64,
    wacc_sum: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    companies: usize,
    undervalued: usize,
    positive_eva: usize,
    sectors: BTreeMap<String, SectorAccumulator>,
}

impl RunAccumulator {
    pub fn add(&mut self, record: &ValuationRecord) {
        self.companies += 1;
        if record.signal == Signal::Undervalued {
            self.undervalued += 1;
        }
        if record.eva > 0.0 {
            self.positive_eva += 1;
        }

        let sector = record
            .sector
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_SECTOR);
        let bucket = self.sectors.entry(sector.to_string()).or_default();
        bucket.count += 1;
        bucket.total_eva += record.eva;
        bucket.roic_sum += record.roic;
        bucket.wacc_sum += record.wacc;
    }

    /// Combine two partial accumulators; used to reduce parallel chunks.
    pub fn merge(mut self, other: RunAccumulator) -> RunAccumulator {
        self.companies += other.companies;
        self.undervalued += other.undervalued;
        self.positive_eva += other.positive_eva;
        for (sector, theirs) in other.sectors {
            let bucket = self.sectors.entry(sector).or_default();
            bucket.count += theirs.count;
            bucket.total_eva += theirs.total_eva;
            bucket.roic_sum += theirs.roic_sum;
            bucket.wacc_sum += theirs.wacc_sum;
        }
        self
    }

    pub fn finish(self, run_timestamp: DateTime<Utc>) -> RunSummary {
        let sector_aggregates = self
            .sectors
            .into_iter()
            .map(|(sector, bucket)| {
                let n = bucket.count as f64;
                (
                    sector,
                    SectorAggregate {
                        count: bucket.count,
                        total_eva: bucket.total_eva,
                        avg_roic: bucket.roic_sum / n,
                        avg_wacc: bucket.wacc_sum / n,
                    },
                )
            })
            .collect();

        RunSummary {
            run_timestamp,
            companies_analyzed: self.companies,
            undervalued_count: self.undervalued,
            positive_eva_count: self.positive_eva,
            sector_aggregates,
        }
    }
}

/// Single-pass summary of a finished run.
pub fn summarize(records: &[ValuationRecord], run_timestamp: DateTime<Utc>) -> RunSummary {
    let accumulator = records.iter().fold(RunAccumulator::default(), |mut acc, record| {
        acc.add(record);
        acc
    });
    accumulator.finish(run_timestamp)
}
