//! Cross-source field reconciliation.
//!
//! Numeric fields take the median of contributed values, so one bad source
//! cannot drag the chosen value. Text fields take a majority vote with the
//! configured source-priority order as tie-break. A field no source supplies
//! stays absent; it is never defaulted to zero.

use std::collections::BTreeMap;

use valuation_core::{FieldKind, FieldName, FieldValue, MergerConfig, ReconciledField, SourceRecord};

#[derive(Debug)]
pub struct FieldReconciler {
    config: MergerConfig,
}

impl FieldReconciler {
    pub fn new(config: MergerConfig) -> Self {
        Self { config }
    }

    /// Merge every field reported by any source for one ticker.
    /// Pure function of its inputs; unreported fields are simply missing
    /// from the result.
    pub fn reconcile_all(
        &self,
        records: &[SourceRecord],
    ) -> BTreeMap<FieldName, ReconciledField> {
        let mut by_field: BTreeMap<FieldName, Vec<(String, FieldValue)>> = BTreeMap::new();
        for record in records {
            for (field, value) in &record.fields {
                by_field
                    .entry(*field)
                    .or_default()
                    .push((record.source.clone(), value.clone()));
            }
        }

        by_field
            .into_iter()
            .filter_map(|(field, contributions)| self.reconcile_field(field, contributions))
            .map(|reconciled| (reconciled.field, reconciled))
            .collect()
    }

    /// Merge the contributions for a single field, or None when no source
    /// supplied a usable value.
    pub fn reconcile_field(
        &self,
        field: FieldName,
        contributions: Vec<(String, FieldValue)>,
    ) -> Option<ReconciledField> {
        match field.kind() {
            FieldKind::Text => self.majority_vote(field, contributions),
            FieldKind::Monetary | FieldKind::Scalar => {
                self.median_with_tolerance(field, contributions)
            }
        }
    }

    fn median_with_tolerance(
        &self,
        field: FieldName,
        contributions: Vec<(String, FieldValue)>,
    ) -> Option<ReconciledField> {
        let mut values: Vec<f64> = contributions
            .iter()
            .filter_map(|(_, value)| value.as_numeric())
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        // Lower median keeps the chosen value an actual contribution even
        // for even-sized sets. Negative values (a loss-making EBIT, say)
        // reconcile like any other numeric.
        let median = values[(values.len() - 1) / 2];

        let within_tolerance = |v: f64| {
            if median != 0.0 {
                ((v - median) / median).abs() <= self.config.relative_tolerance
            } else {
                v.abs() <= self.config.relative_tolerance
            }
        };
        let agreeing = values.iter().filter(|&&v| within_tolerance(v)).count();
        let agreement_score = agreeing as f64 / values.len() as f64;

        // Among sources that reported the median, trust the highest-priority one.
        let (chosen_source, chosen) = contributions
            .iter()
            .filter(|(_, value)| value.as_numeric() == Some(median))
            .min_by_key(|(source, _)| self.source_rank(source))?;

        Some(ReconciledField {
            field,
            chosen: chosen.clone(),
            chosen_source: chosen_source.clone(),
            agreement_score,
            contributions,
        })
    }

    fn majority_vote(
        &self,
        field: FieldName,
        contributions: Vec<(String, FieldValue)>,
    ) -> Option<ReconciledField> {
        let texts: Vec<(&String, &str)> = contributions
            .iter()
            .filter_map(|(source, value)| value.as_text().map(|t| (source, t)))
            .collect();
        if texts.is_empty() {
            return None;
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, text) in &texts {
            *counts.entry(text).or_default() += 1;
        }
        let best_count = counts.values().copied().max()?;

        let (chosen_source, chosen_text) = texts
            .iter()
            .filter(|(_, text)| counts[text] == best_count)
            .min_by_key(|(source, _)| self.source_rank(source))?;

        Some(ReconciledField {
            field,
            chosen: FieldValue::text(chosen_text),
            chosen_source: (*chosen_source).clone(),
            agreement_score: best_count as f64 / texts.len() as f64,
            contributions,
        })
    }

    /// Position in the configured priority list; unlisted sources rank last.
    fn source_rank(&self, source: &str) -> usize {
        self.config
            .source_priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(source: &str, fields: Vec<(FieldName, FieldValue)>) -> SourceRecord {
        SourceRecord {
            ticker: "COMI".to_string(),
            source: source.to_string(),
            fetched_at: Utc::now(),
            fields: fields.into_iter().collect(),
        }
    }

    fn reconciler() -> FieldReconciler {
        FieldReconciler::new(MergerConfig::default())
    }

    #[test]
    fn outlier_excluded_from_chosen_value_but_kept_in_contributions() {
        let records = vec![
            record("yahoo_finance", vec![(FieldName::Revenue, FieldValue::numeric(10.0))]),
            record("mubasher", vec![(FieldName::Revenue, FieldValue::numeric(10.2))]),
            record("egx_official", vec![(FieldName::Revenue, FieldValue::numeric(50.0))]),
        ];
        let merged = reconciler().reconcile_all(&records);
        let revenue = &merged[&FieldName::Revenue];

        assert_eq!(revenue.chosen.as_numeric(), Some(10.2));
        assert!((revenue.agreement_score - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(revenue.contributions.len(), 3);
        assert!(revenue
            .contributions
            .iter()
            .any(|(_, v)| v.as_numeric() == Some(50.0)));
    }

    #[test]
    fn unreported_field_stays_absent_never_zero() {
        let records = vec![record(
            "yahoo_finance",
            vec![(FieldName::Revenue, FieldValue::numeric(10.0))],
        )];
        let merged = reconciler().reconcile_all(&records);
        assert!(!merged.contains_key(&FieldName::Ebit));
    }

    #[test]
    fn single_source_scores_full_agreement() {
        let merged = reconciler()
            .reconcile_field(
                FieldName::Ebit,
                vec![("mubasher".to_string(), FieldValue::numeric(123.0))],
            )
            .unwrap();
        assert_eq!(merged.agreement_score, 1.0);
        assert_eq!(merged.chosen_source, "mubasher");
    }

    #[test]
    fn two_agreeing_sources_score_above_zero() {
        let merged = reconciler()
            .reconcile_field(
                FieldName::Ebit,
                vec![
                    ("yahoo_finance".to_string(), FieldValue::numeric(100.0)),
                    ("mubasher".to_string(), FieldValue::numeric(102.0)),
                ],
            )
            .unwrap();
        assert!(merged.agreement_score > 0.0);
    }

    #[test]
    fn even_count_median_is_an_actual_contribution() {
        let contributions = vec![
            ("a".to_string(), FieldValue::numeric(10.0)),
            ("b".to_string(), FieldValue::numeric(20.0)),
            ("c".to_string(), FieldValue::numeric(30.0)),
            ("d".to_string(), FieldValue::numeric(40.0)),
        ];
        let merged = reconciler()
            .reconcile_field(FieldName::TotalAssets, contributions.clone())
            .unwrap();
        let chosen = merged.chosen.as_numeric().unwrap();
        assert!(contributions
            .iter()
            .any(|(_, v)| v.as_numeric() == Some(chosen)));
    }

    #[test]
    fn negative_values_reconcile_like_any_numeric() {
        let merged = reconciler()
            .reconcile_field(
                FieldName::Ebit,
                vec![
                    ("yahoo_finance".to_string(), FieldValue::numeric(-52.0)),
                    ("mubasher".to_string(), FieldValue::numeric(-50.0)),
                ],
            )
            .unwrap();
        assert!(merged.chosen.as_numeric().unwrap() < 0.0);
        // -50 is within 5% of -52, so both agree
        assert_eq!(merged.agreement_score, 1.0);
    }

    #[test]
    fn text_fields_use_majority_vote() {
        let records = vec![
            record("yahoo_finance", vec![(FieldName::Sector, FieldValue::text("Banking"))]),
            record("mubasher", vec![(FieldName::Sector, FieldValue::text("Banking"))]),
            record("egx_official", vec![(FieldName::Sector, FieldValue::text("Financials"))]),
        ];
        let merged = reconciler().reconcile_all(&records);
        let sector = &merged[&FieldName::Sector];
        assert_eq!(sector.chosen.as_text(), Some("Banking"));
        assert!((sector.agreement_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn text_tie_broken_by_source_priority() {
        // One vote each; yahoo_finance outranks egx_official regardless of
        // the order contributions arrive in.
        for contributions in [
            vec![
                ("egx_official".to_string(), FieldValue::text("Real Estate")),
                ("yahoo_finance".to_string(), FieldValue::text("Property")),
            ],
            vec![
                ("yahoo_finance".to_string(), FieldValue::text("Property")),
                ("egx_official".to_string(), FieldValue::text("Real Estate")),
            ],
        ] {
            let merged = reconciler()
                .reconcile_field(FieldName::Sector, contributions)
                .unwrap();
            assert_eq!(merged.chosen.as_text(), Some("Property"));
            assert_eq!(merged.chosen_source, "yahoo_finance");
        }
    }

    #[test]
    fn median_reported_by_several_sources_credits_highest_priority() {
        let merged = reconciler()
            .reconcile_field(
                FieldName::MarketCap,
                vec![
                    ("egx_official".to_string(), FieldValue::numeric(900.0)),
                    ("yahoo_finance".to_string(), FieldValue::numeric(900.0)),
                    ("mubasher".to_string(), FieldValue::numeric(880.0)),
                ],
            )
            .unwrap();
        assert_eq!(merged.chosen.as_numeric(), Some(900.0));
        assert_eq!(merged.chosen_source, "yahoo_finance");
    }
}
