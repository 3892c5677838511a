use crate::domain::model::ValuationMode;
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlConfig {
    pub report: ReportConfig,
    pub real_estate: BTreeMap<String, HoldingConfig>,
    pub gis: GisConfig,
    pub assumptions: Option<AssumptionsConfig>,
    pub inputs: Option<InputsConfig>,
    pub pricing: Option<PricingConfig>,
    pub chart: ChartConfig,
    pub email: EmailConfig,
    pub snapshots: Option<SnapshotsConfig>,
    pub output: Option<OutputConfig>,
    pub delivery: Option<DeliveryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingConfig {
    pub county: String,
    pub mode: ValuationMode,
    pub situs_address: Option<String>,
    /// 經緯度 [lon, lat]，situs_address 查不到時用點位查詢
    pub parcel_point: Option<[f64; 2]>,
    pub ownership_pct: Option<f64>,
    pub fallback_value: Option<f64>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GisConfig {
    pub endpoints: BTreeMap<String, GisEndpoint>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GisEndpoint {
    /// ArcGIS REST layer query URL（.../MapServer/0/query）
    pub url: String,
    pub address_field: String,
    pub value_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionsConfig {
    pub inflation_qoq_pct: Option<f64>,
    pub hpi_qoq_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    pub securities_master_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub endpoint: String,
    /// 用來推交易日曆的基準代號
    pub calendar_ticker: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub series: Vec<ChartSeriesConfig>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeriesConfig {
    pub name: String,
    /// 取值來源："total" 或 securities 的 owner bucket 名稱
    pub bucket: String,
    pub target_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub subject: String,
    pub from: String,
    /// 收件者放在環境變數，不進 repo
    pub to_env: String,
    pub token_url: Option<String>,
    pub send_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotsConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<String>,
    pub bundle: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub dry_run: Option<bool>,
    pub skip_send: Option<bool>,
}

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

impl YamlConfig {
    /// 從 YAML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TrackerError::IoError)?;
        Self::from_yaml_str(&content)
    }

    /// 從 YAML 字串解析配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        serde_yaml::from_str(&processed_content).map_err(|e| TrackerError::ConfigValidationError {
            field: "yaml_parsing".to_string(),
            message: format!("YAML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EMAIL_FROM})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.name", &self.report.name)?;
        validation::validate_non_empty_string("email.subject", &self.email.subject)?;
        validation::validate_non_empty_string("email.from", &self.email.from)?;
        validation::validate_non_empty_string("email.to_env", &self.email.to_env)?;
        validation::validate_url("email.token_url", self.token_url())?;
        validation::validate_url("email.send_url", self.send_url())?;

        if self.real_estate.is_empty() {
            return Err(TrackerError::MissingConfigError {
                field: "real_estate".to_string(),
            });
        }

        for (name, endpoint) in &self.gis.endpoints {
            validation::validate_url(&format!("gis.endpoints.{}.url", name), &endpoint.url)?;
            validation::validate_non_empty_string(
                &format!("gis.endpoints.{}.address_field", name),
                &endpoint.address_field,
            )?;
            validation::validate_non_empty_string(
                &format!("gis.endpoints.{}.value_field", name),
                &endpoint.value_field,
            )?;
        }

        if let Some(attempts) = self.gis.retry_attempts {
            validation::validate_positive_number("gis.retry_attempts", attempts as usize, 1)?;
        }

        for (key, holding) in &self.real_estate {
            let pct = holding.ownership_pct.unwrap_or(1.0);
            validation::validate_range(
                &format!("real_estate.{}.ownership_pct", key),
                pct,
                0.0,
                1.0,
            )?;

            // gis 模式必須有對應縣的端點，以及地址或點位其中之一
            if holding.mode == ValuationMode::Gis {
                if !self.gis.endpoints.contains_key(&holding.county) {
                    return Err(TrackerError::ConfigValidationError {
                        field: format!("real_estate.{}.county", key),
                        message: format!(
                            "No GIS endpoint configured for county '{}'",
                            holding.county
                        ),
                    });
                }
                if holding.situs_address.is_none() && holding.parcel_point.is_none() {
                    return Err(TrackerError::ConfigValidationError {
                        field: format!("real_estate.{}", key),
                        message: "gis mode requires situs_address or parcel_point".to_string(),
                    });
                }
            }
        }

        if self.chart.series.is_empty() {
            return Err(TrackerError::MissingConfigError {
                field: "chart.series".to_string(),
            });
        }

        if let Some(pricing) = &self.pricing {
            validation::validate_url("pricing.endpoint", &pricing.endpoint)?;
        }

        if let Some(inputs) = &self.inputs {
            if let Some(path) = &inputs.securities_master_path {
                validation::validate_path("inputs.securities_master_path", path)?;
                if self.pricing.is_none() {
                    return Err(TrackerError::ConfigValidationError {
                        field: "pricing".to_string(),
                        message: "securities master configured but no pricing endpoint".to_string(),
                    });
                }
            }
        }

        validation::validate_path("snapshots.dir", self.snapshots_dir())?;
        validation::validate_path("output.dir", self.output_dir())?;

        Ok(())
    }

    /// 收件者 email，從 email.to_env 指到的環境變數讀出
    pub fn env_email_to(&self) -> Result<String> {
        std::env::var(&self.email.to_env).map_err(|_| TrackerError::MissingEnvError {
            name: self.email.to_env.clone(),
        })
    }

    pub fn token_url(&self) -> &str {
        self.email.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    pub fn send_url(&self) -> &str {
        self.email.send_url.as_deref().unwrap_or(DEFAULT_SEND_URL)
    }

    pub fn gis_timeout_seconds(&self) -> u64 {
        self.gis.timeout_seconds.unwrap_or(30)
    }

    pub fn gis_retry_attempts(&self) -> u32 {
        self.gis.retry_attempts.unwrap_or(3)
    }

    pub fn gis_retry_delay_seconds(&self) -> u64 {
        self.gis.retry_delay_seconds.unwrap_or(5)
    }

    pub fn inflation_qoq_pct(&self) -> f64 {
        self.assumptions
            .as_ref()
            .and_then(|a| a.inflation_qoq_pct)
            .unwrap_or(0.5)
    }

    pub fn hpi_qoq_pct(&self) -> f64 {
        self.assumptions
            .as_ref()
            .and_then(|a| a.hpi_qoq_pct)
            .unwrap_or(0.0)
    }

    pub fn securities_master_path(&self) -> Option<&str> {
        self.inputs
            .as_ref()
            .and_then(|i| i.securities_master_path.as_deref())
    }

    pub fn snapshots_dir(&self) -> &str {
        self.snapshots
            .as_ref()
            .and_then(|s| s.dir.as_deref())
            .unwrap_or("snapshots")
    }

    pub fn output_dir(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.dir.as_deref())
            .unwrap_or("output")
    }

    pub fn bundle_filename(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.bundle.as_deref())
            .unwrap_or("report_bundle.zip")
    }

    pub fn dry_run(&self) -> bool {
        self.delivery
            .as_ref()
            .and_then(|d| d.dry_run)
            .unwrap_or(false)
    }

    pub fn skip_send(&self) -> bool {
        self.delivery
            .as_ref()
            .and_then(|d| d.skip_send)
            .unwrap_or(false)
    }

    pub fn chart_width(&self) -> u32 {
        self.chart.width.unwrap_or(1100)
    }

    pub fn chart_height(&self) -> u32 {
        self.chart.height.unwrap_or(500)
    }
}

impl HoldingConfig {
    /// Email 顯示用的標籤：未設定時由 key 推導
    pub fn display_label(&self, key: &str) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match key {
            "primary_home" => "Primary Home".to_string(),
            "cedar_hill_commercial" => "Cedar Hill Commercial Property".to_string(),
            "celina_land" => "Celina Land".to_string(),
            _ => key
                .split('_')
                .map(|w| {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl Validate for YamlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_yaml() -> &'static str {
        r#"
report:
  name: "NET WORTH TRACKER"

real_estate:
  primary_home:
    county: collin
    mode: fallback_only
    ownership_pct: 1.0
    fallback_value: 850000

gis:
  endpoints:
    collin:
      url: "https://gis.collincountytx.gov/arcgis/rest/services/parcels/MapServer/0/query"
      address_field: SITUS_ADDRESS
      value_field: TOTAL_VALUE

chart:
  series:
    - name: Parents
      bucket: total
      target_year: 2040

email:
  subject: "Quarterly Net Worth"
  from: "tracker@example.com"
  to_env: EMAIL_TO
"#
    }

    #[test]
    fn test_parse_minimal_yaml_config() {
        let config = YamlConfig::from_yaml_str(minimal_yaml()).unwrap();

        assert_eq!(config.report.name, "NET WORTH TRACKER");
        assert_eq!(config.real_estate.len(), 1);
        let home = config.real_estate.get("primary_home").unwrap();
        assert_eq!(home.mode, ValuationMode::FallbackOnly);
        assert_eq!(home.fallback_value, Some(850000.0));
        assert_eq!(config.token_url(), DEFAULT_TOKEN_URL);
        assert_eq!(config.snapshots_dir(), "snapshots");
        assert!(!config.dry_run());
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_TRACKER_SUBJECT", "Q3 Report");

        let yaml = minimal_yaml().replace("Quarterly Net Worth", "${TEST_TRACKER_SUBJECT}");
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.email.subject, "Q3 Report");

        std::env::remove_var("TEST_TRACKER_SUBJECT");
    }

    #[test]
    fn test_unresolved_env_var_left_in_place() {
        let yaml = minimal_yaml().replace("EMAIL_TO", "${NO_SUCH_TRACKER_VAR}");
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.email.to_env, "${NO_SUCH_TRACKER_VAR}");
    }

    #[test]
    fn test_gis_mode_requires_endpoint_and_address() {
        let yaml = minimal_yaml().replace("mode: fallback_only", "mode: gis");
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        // gis 模式但沒給 situs_address / parcel_point
        assert!(config.validate_config().is_err());

        let yaml = yaml.replace(
            "ownership_pct: 1.0",
            "situs_address: \"123 MAIN ST\"\n    ownership_pct: 1.0",
        );
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        let yaml = minimal_yaml().replace("fallback_only", "guess_something");
        assert!(YamlConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_ownership_pct_out_of_range_rejected() {
        let yaml = minimal_yaml().replace("ownership_pct: 1.0", "ownership_pct: 1.5");
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate_config().is_err());
    }

    #[test]
    fn test_securities_master_requires_pricing() {
        let yaml = format!(
            "{}\ninputs:\n  securities_master_path: data/master.csv\n",
            minimal_yaml()
        );
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate_config().is_err());

        let yaml = format!(
            "{}\npricing:\n  endpoint: \"https://stooq.com/q/d/l/\"\n",
            yaml
        );
        let config = YamlConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate_config().is_ok());
        assert_eq!(config.securities_master_path(), Some("data/master.csv"));
    }

    #[test]
    fn test_display_label_derivation() {
        let config = YamlConfig::from_yaml_str(minimal_yaml()).unwrap();
        let home = config.real_estate.get("primary_home").unwrap();
        assert_eq!(home.display_label("primary_home"), "Primary Home");
        assert_eq!(home.display_label("lake_house"), "Lake House");
        assert_eq!(
            home.display_label("cedar_hill_commercial"),
            "Cedar Hill Commercial Property"
        );
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(minimal_yaml().as_bytes()).unwrap();

        let config = YamlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report.name, "NET WORTH TRACKER");
    }
}
