//! Dashboard vocabularies
//!
//! Every sheet name, header label, entity rule and ordering used by the
//! dashboards lives here as plain data. The defaults reproduce the monthly
//! reporting workbooks; a YAML file may override any subset of them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DashResult;

/// One ordered `(substring, code)` rule for entity normalisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OeRule {
    pub pattern: String,
    pub code: String,
}

impl OeRule {
    pub fn new(pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            code: code.into(),
        }
    }
}

/// Day-count bucket: `above_days < days <= through_days`, either bound optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRule {
    pub metric: String,
    #[serde(default)]
    pub above_days: Option<i64>,
    #[serde(default)]
    pub through_days: Option<i64>,
}

impl BucketRule {
    pub fn new(metric: impl Into<String>, above_days: Option<i64>, through_days: Option<i64>) -> Self {
        Self {
            metric: metric.into(),
            above_days,
            through_days,
        }
    }

    pub fn contains(&self, days: i64) -> bool {
        self.above_days.map_or(true, |lo| days > lo) && self.through_days.map_or(true, |hi| days <= hi)
    }
}

/// KPI sheet and the canonical headers scanned for in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSheet {
    pub name: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub aging: AgingConfig,
    pub cockpit: CockpitConfig,
    pub stability: StabilityConfig,
    pub toxic: ToxicConfig,
}

impl DashboardConfig {
    /// Load overrides from a YAML file; omitted keys keep their defaults
    pub fn load(path: &Path) -> DashResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> DashResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//==============================================================================
// Aging incidents
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    pub raw_sheet: String,
    pub created_column: String,
    pub resolved_column: String,
    pub oe_column: String,
    pub date_column: String,
    pub oe_output_column: String,
    pub metric_column: String,
    pub value_column: String,
    pub oe_order: Vec<String>,
    pub buckets: Vec<BucketRule>,
    pub oe_rules: Vec<OeRule>,
    pub date_formats: Vec<String>,
    pub output_sheet: String,
    pub period_format: String,
    pub width_padding: f64,
    pub output_file: String,
}

impl AgingConfig {
    /// Metric names in bucket order
    pub fn metrics(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.metric.clone()).collect()
    }
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            raw_sheet: "Page 1".to_string(),
            created_column: "Created".to_string(),
            resolved_column: "Resolved".to_string(),
            oe_column: "Affected OEs".to_string(),
            date_column: "Date".to_string(),
            oe_output_column: "OE".to_string(),
            metric_column: "Metric".to_string(),
            value_column: "Value".to_string(),
            oe_order: strings(&["AZCH", "ID", "MY", "PH", "AIS", "SL", "TH", "TW", "AZAP"]),
            buckets: vec![
                BucketRule::new("Incidents Total Aging > 31 days", Some(30), None),
                BucketRule::new("Incidents Aging > 31-90 days", Some(30), Some(90)),
                BucketRule::new("Incidents Aging > 90 days", Some(90), None),
            ],
            oe_rules: vec![
                OeRule::new("Allianz China", "AZCH"),
                OeRule::new("Allianz China - P&C", "AZCH"),
                OeRule::new("Allianz Indonesia", "ID"),
                OeRule::new("Allianz Malaysia", "MY"),
                OeRule::new("Allianz Philippine", "PH"),
                OeRule::new("Allianz Singapore", "AIS"),
                OeRule::new("Allianz Sri Lanka", "SL"),
                OeRule::new("Allianz Thailand", "TH"),
                OeRule::new("Allianz Taiwan", "TW"),
                OeRule::new("Allianz SE Singapore Branch OE", "AZAP"),
            ],
            date_formats: strings(&[
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M",
                "%Y-%m-%d",
                "%m/%d/%Y %H:%M:%S",
                "%m/%d/%Y %H:%M",
                "%m/%d/%Y",
                "%d-%b-%Y %H:%M:%S",
                "%d-%b-%Y",
                "%d-%b-%y",
                "%b-%y",
            ]),
            output_sheet: "Sheet1".to_string(),
            period_format: "mmm-yy".to_string(),
            width_padding: 1.0,
            output_file: "Updated_PowerBI_ITSM.xlsx".to_string(),
        }
    }
}

//==============================================================================
// ITIS cockpit KPIs
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CockpitConfig {
    pub kpi_sheet: String,
    pub passthrough_sheet: String,
    pub sheets: Vec<KpiSheet>,
    /// Header scan window, 1-based inclusive
    pub header_rows: usize,
    pub header_cols: usize,
    /// Entity rows, 1-based inclusive
    pub first_data_row: usize,
    pub last_data_row: usize,
    /// 1-based column holding the entity name (E)
    pub entity_column: usize,
    pub rating_pattern: String,
    pub oe_column: String,
    pub id_column: String,
    pub date_column: String,
    pub oe_order: Vec<String>,
    pub period_formats: Vec<String>,
    pub period_format: String,
    pub width_padding: f64,
    pub output_file: String,
}

impl Default for CockpitConfig {
    fn default() -> Self {
        Self {
            kpi_sheet: "KPI2".to_string(),
            passthrough_sheet: "Sheet1".to_string(),
            sheets: vec![
                KpiSheet {
                    name: "IT Strategy & Project Port(H06)".to_string(),
                    headers: strings(&["Group IT Strategy Alignment Score", "IT Steering Board Score"]),
                },
                KpiSheet {
                    name: "Architecture & Demand(H06)".to_string(),
                    headers: strings(&[
                        "Architecture Data Quality Score",
                        "Cloudification",
                        "Information Domain - Initialization",
                        "Information Domain - Documentation",
                        "Legacy Index",
                    ]),
                },
                KpiSheet {
                    name: "IT Service Agreements & Su(H06)".to_string(),
                    headers: strings(&[
                        "Group Toxicity",
                        "Local Toxicity",
                        "Overall Toxicity",
                        "IT Asset Lifecycle Management Score",
                    ]),
                },
                KpiSheet {
                    name: "IT Governance, Risk & Comp(H06)".to_string(),
                    headers: strings(&[
                        "IT Compliance Score",
                        "Unmanaged Risks: ITOM",
                        "Unmanaged Risks: ITOM+ISMS+BA",
                        "Completed risk scoping BAs",
                        "Completed risk scoping BAs: regular",
                        "Completed risk scoping BAs: EUCs",
                    ]),
                },
            ],
            header_rows: 29,
            header_cols: 24,
            first_data_row: 20,
            last_data_row: 99,
            entity_column: 5,
            rating_pattern: r"(Very Bad|Bad|Medium|Good|Very Good)\s*\(([-+]?\d+(\.\d+)?)\)".to_string(),
            oe_column: "OE".to_string(),
            id_column: "CIM ID / OE ID".to_string(),
            date_column: "Date".to_string(),
            oe_order: strings(&[
                "Allianz China - Holding",
                "Allianz Indonesia",
                "Allianz Philippine - L&H",
                "Allianz SingaporeⒼ",
                "Allianz Sri Lanka",
                "Allianz Taiwan - Life",
                "Allianz Thailand",
                "Allianz Australia - P&CⒼ",
                "Allianz Malaysia",
            ]),
            period_formats: strings(&["%b-%y", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d"]),
            period_format: "mmm-yy".to_string(),
            width_padding: 0.5,
            output_file: "Updated_KPI2.xlsx".to_string(),
        }
    }
}

//==============================================================================
// IT stability appender
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub source_sheet: String,
    pub target_sheet: String,
    /// 0-based source column positions (A,B,C,F,O,H,I,J,L)
    pub pick_columns: Vec<usize>,
    /// 0-based output columns shown as months (H, I)
    pub date_columns: Vec<usize>,
    pub period_format: String,
    /// Widths for output columns A.. in order
    pub column_widths: Vec<f64>,
    pub output_file: String,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            source_sheet: "Page 1".to_string(),
            target_sheet: "IT Stability".to_string(),
            pick_columns: vec![0, 1, 2, 5, 14, 7, 8, 9, 11],
            date_columns: vec![7, 8],
            period_format: "mmm-yy".to_string(),
            column_widths: vec![15.0, 20.0, 18.0, 25.0, 25.0, 22.0, 30.0, 14.0, 14.0],
            output_file: "All_Data_Updated.xlsx".to_string(),
        }
    }
}

//==============================================================================
// Toxic data appender
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToxicConfig {
    pub target_sheet: String,
    /// Exact (lowercase) header labels that mark period columns
    pub period_labels: Vec<String>,
    pub header_scan_rows: usize,
    /// 1-based first row copied from the new-data sheet
    pub first_source_row: usize,
    pub date_formats: Vec<String>,
    pub period_format: String,
    pub output_prefix: String,
}

impl Default for ToxicConfig {
    fn default() -> Self {
        Self {
            target_sheet: "Overall database".to_string(),
            period_labels: strings(&["file", "date"]),
            header_scan_rows: 10,
            first_source_row: 2,
            date_formats: strings(&["%d-%b-%y", "%d-%b-%Y", "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d"]),
            period_format: "d-mmm-yy".to_string(),
            output_prefix: "manual_calculated_combined_".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_bounds() {
        let mid = BucketRule::new("31-90", Some(30), Some(90));
        assert!(!mid.contains(30));
        assert!(mid.contains(31));
        assert!(mid.contains(90));
        assert!(!mid.contains(91));

        let open = BucketRule::new("> 90", Some(90), None);
        assert!(open.contains(10_000));
        assert!(!open.contains(90));
    }

    #[test]
    fn test_default_rule_order_is_preserved() {
        let config = AgingConfig::default();
        assert_eq!(config.oe_rules[0].pattern, "Allianz China");
        assert_eq!(config.oe_rules[1].pattern, "Allianz China - P&C");
        assert_eq!(config.metrics().len(), 3);
        assert_eq!(config.oe_order.len(), 9);
    }

    #[test]
    fn test_partial_yaml_override() {
        let yaml = r#"
aging:
  oe_order: [MY, ID]
  oe_rules:
    - { pattern: "Malaysia", code: MY }
toxic:
  target_sheet: "Database"
"#;
        let config = DashboardConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.aging.oe_order, vec!["MY", "ID"]);
        assert_eq!(config.aging.oe_rules.len(), 1);
        // Untouched keys keep defaults
        assert_eq!(config.aging.raw_sheet, "Page 1");
        assert_eq!(config.toxic.target_sheet, "Database");
        assert_eq!(config.cockpit, CockpitConfig::default());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(DashboardConfig::from_yaml_str("  \n").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = DashboardConfig::from_yaml_str("aging: [1, 2").unwrap_err();
        assert!(matches!(err, crate::error::DashError::Config(_)));
    }
}
