use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 估值模式，對應 config.yaml 的 real_estate.*.mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMode {
    /// 向縣府 GIS 端點查詢市值，失敗時退回 fallback_value
    Gis,
    FallbackOnly,
    InflationIsh,
    CadTimesHpi,
}

impl ValuationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gis => "gis",
            Self::FallbackOnly => "fallback_only",
            Self::InflationIsh => "inflation_ish",
            Self::CadTimesHpi => "cad_times_hpi",
        }
    }
}

/// 單筆不動產的估值結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealEstateValue {
    pub key: String,
    pub label: String,
    pub mode: ValuationMode,
    pub county: String,
    pub ownership_pct: f64,
    pub fallback_value: f64,
    pub adjusted_value: f64,
    pub owned_value: f64,
    /// adjusted_value 是否來自 GIS 回應（而非 fallback）
    pub from_gis: bool,
}

/// 每季落盤的快照。BTreeMap 讓 JSON 輸出保持 key 排序，
/// 與前一版快照 diff 時才不會整份亂掉。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at_utc: DateTime<Utc>,
    pub real_estate: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub securities: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub totals: BTreeMap<String, f64>,
}

impl Snapshot {
    pub fn new(generated_at_utc: DateTime<Utc>) -> Self {
        Self {
            generated_at_utc,
            real_estate: BTreeMap::new(),
            securities: BTreeMap::new(),
            totals: BTreeMap::new(),
        }
    }

    /// 總淨值：不動產 + 證券
    pub fn net_worth(&self) -> f64 {
        self.real_estate.values().sum::<f64>() + self.securities.values().sum::<f64>()
    }

    /// 例如 "Q3 2026"
    pub fn quarter_label(&self) -> String {
        let quarter = (self.generated_at_utc.month() - 1) / 3 + 1;
        format!("Q{} {}", quarter, self.generated_at_utc.year())
    }
}

/// Extract 階段的產出：本季估值 + 歷史快照
#[derive(Debug, Clone)]
pub struct ValuationSet {
    pub real_estate: Vec<RealEstateValue>,
    /// owner bucket -> 證券市值（未設定 securities master 時為空）
    pub securities_totals: BTreeMap<String, f64>,
    pub previous: Option<Snapshot>,
    pub history: Vec<Snapshot>,
}

#[derive(Debug, Clone)]
pub struct ChartSeriesData {
    pub name: String,
    pub target_year: i32,
    pub values: Vec<f64>,
}

/// Transform 階段的產出，Load 階段據此落盤並寄送
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub snapshot: Snapshot,
    pub qoq_changes: HashMap<String, f64>,
    pub email_html: String,
    pub chart_quarters: Vec<String>,
    pub chart_series: Vec<ChartSeriesData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_quarter_label() {
        let snap = Snapshot::new(Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap());
        assert_eq!(snap.quarter_label(), "Q3 2026");

        let snap = Snapshot::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(snap.quarter_label(), "Q1 2026");

        let snap = Snapshot::new(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(snap.quarter_label(), "Q4 2025");
    }

    #[test]
    fn test_net_worth_sums_all_buckets() {
        let mut snap = Snapshot::new(Utc::now());
        snap.real_estate.insert("primary_home".to_string(), 850_000.0);
        snap.real_estate.insert("celina_land".to_string(), 120_000.0);
        snap.securities.insert("Parents".to_string(), 365_000.0);
        assert_eq!(snap.net_worth(), 1_335_000.0);
    }

    #[test]
    fn test_valuation_mode_serde_names() {
        let mode: ValuationMode = serde_json::from_str("\"fallback_only\"").unwrap();
        assert_eq!(mode, ValuationMode::FallbackOnly);
        assert_eq!(
            serde_json::to_string(&ValuationMode::CadTimesHpi).unwrap(),
            "\"cad_times_hpi\""
        );
        assert_eq!(ValuationMode::Gis.as_str(), "gis");
    }
}
