//! Bucketed incident counts and complete period blocks

use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::config::BucketRule;
use crate::types::{CellValue, Frame};

/// One aged incident after entity normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgedIncident {
    pub oe: String,
    pub days: i64,
}

/// Counts per `(OE code, metric)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketCounts {
    counts: HashMap<(String, String), u64>,
}

impl BucketCounts {
    pub fn get(&self, oe: &str, metric: &str) -> u64 {
        self.counts
            .get(&(oe.to_string(), metric.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total per metric across all entities
    pub fn metric_total(&self, metric: &str) -> u64 {
        self.counts
            .iter()
            .filter(|((_, m), _)| m == metric)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Count every incident into every bucket it falls in.
///
/// Buckets may overlap: a 45-day incident counts both in a "> 30" total and
/// in a "31-90" range.
pub fn count_buckets(incidents: &[AgedIncident], buckets: &[BucketRule]) -> BucketCounts {
    let mut counts = BucketCounts::default();
    for incident in incidents {
        for bucket in buckets.iter().filter(|b| b.contains(incident.days)) {
            *counts
                .counts
                .entry((incident.oe.clone(), bucket.metric.clone()))
                .or_insert(0) += 1;
        }
    }
    counts
}

/// One row of a period block
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub oe: String,
    pub metric: String,
    pub period: NaiveDateTime,
    pub value: u64,
}

/// The full `metrics × oe_order` rectangle for `period`, zero-filled.
/// Rows are metric-major, entities in `oe_order`.
pub fn period_block(
    counts: &BucketCounts,
    oe_order: &[String],
    metrics: &[String],
    period: NaiveDateTime,
) -> Vec<MetricRecord> {
    metrics
        .iter()
        .flat_map(|metric| {
            oe_order.iter().map(move |oe| MetricRecord {
                oe: oe.clone(),
                metric: metric.clone(),
                period,
                value: counts.get(oe, metric),
            })
        })
        .collect()
}

/// Column labels of a block frame
#[derive(Debug, Clone, Copy)]
pub struct BlockColumns<'a> {
    pub oe: &'a str,
    pub metric: &'a str,
    pub date: &'a str,
    pub value: &'a str,
}

/// Lay out block records as a frame with columns `oe, metric, date, value`
pub fn block_frame(records: &[MetricRecord], columns: BlockColumns<'_>) -> Frame {
    let mut frame = Frame::with_columns([columns.oe, columns.metric, columns.date, columns.value]);
    for record in records {
        frame.push_values(vec![
            CellValue::text(record.oe.as_str()),
            CellValue::text(record.metric.as_str()),
            CellValue::Date(record.period),
            CellValue::Number(record.value as f64),
        ]);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgingConfig;
    use chrono::NaiveDate;

    fn period() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn incidents(oe: &str, days: &[i64]) -> Vec<AgedIncident> {
        days.iter()
            .map(|&d| AgedIncident {
                oe: oe.to_string(),
                days: d,
            })
            .collect()
    }

    #[test]
    fn test_overlapping_buckets() {
        let config = AgingConfig::default();
        let metrics = config.metrics();
        let counts = count_buckets(&incidents("MY", &[10, 35, 60, 95]), &config.buckets);

        assert_eq!(counts.get("MY", &metrics[0]), 3);
        assert_eq!(counts.get("MY", &metrics[1]), 2);
        assert_eq!(counts.get("MY", &metrics[2]), 1);
    }

    #[test]
    fn test_bucket_edges() {
        let config = AgingConfig::default();
        let metrics = config.metrics();
        let counts = count_buckets(&incidents("ID", &[30, 31, 90, 91]), &config.buckets);

        assert_eq!(counts.get("ID", &metrics[0]), 3);
        assert_eq!(counts.get("ID", &metrics[1]), 2);
        assert_eq!(counts.get("ID", &metrics[2]), 1);
    }

    #[test]
    fn test_total_is_superset_of_range() {
        let config = AgingConfig::default();
        let metrics = config.metrics();
        let mut all = incidents("MY", &[0, 1, 29, 30, 31, 45, 89, 90, 91, 400]);
        all.extend(incidents("TH", &[31, 32, 120, -3]));
        let counts = count_buckets(&all, &config.buckets);
        for oe in &config.oe_order {
            assert!(counts.get(oe, &metrics[0]) >= counts.get(oe, &metrics[1]), "{}", oe);
        }
    }

    #[test]
    fn test_period_block_is_complete_rectangle() {
        let config = AgingConfig::default();
        let metrics = config.metrics();
        let counts = count_buckets(&incidents("MY", &[40]), &config.buckets);
        let block = period_block(&counts, &config.oe_order, &metrics, period());

        assert_eq!(block.len(), config.oe_order.len() * metrics.len());
        assert_eq!(block[0].oe, "AZCH");
        assert_eq!(block[0].metric, metrics[0]);
        assert_eq!(block[9].metric, metrics[1]);

        let my_total = block.iter().find(|r| r.oe == "MY" && r.metric == metrics[0]).unwrap();
        assert_eq!(my_total.value, 1);
        let zeros = block.iter().filter(|r| r.value == 0).count();
        assert_eq!(zeros, block.len() - 2);
    }

    #[test]
    fn test_period_block_empty_counts_all_zero() {
        let config = AgingConfig::default();
        let block = period_block(&BucketCounts::default(), &config.oe_order, &config.metrics(), period());
        assert_eq!(block.len(), 27);
        assert!(block.iter().all(|r| r.value == 0 && r.period == period()));
    }

    #[test]
    fn test_block_frame_layout() {
        let config = AgingConfig::default();
        let block = period_block(&BucketCounts::default(), &config.oe_order, &config.metrics(), period());
        let frame = block_frame(
            &block,
            BlockColumns {
                oe: "OE",
                metric: "Metric",
                date: "Date",
                value: "Value",
            },
        );
        assert_eq!(frame.column_names(), vec!["OE", "Metric", "Date", "Value"]);
        assert_eq!(frame.height(), 27);
        assert_eq!(frame.get(0, 2), &CellValue::Date(period()));
        assert_eq!(frame.get(0, 3), &CellValue::Number(0.0));
    }

    #[test]
    fn test_metric_total() {
        let config = AgingConfig::default();
        let mut all = incidents("MY", &[95]);
        all.extend(incidents("ID", &[100]));
        let counts = count_buckets(&all, &config.buckets);
        assert_eq!(counts.metric_total(&config.metrics()[2]), 2);
    }
}
