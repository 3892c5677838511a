use crate::config::GisEndpoint;
use crate::utils::error::{Result, TrackerError};
use reqwest::Client;
use std::time::Duration;

/// 縣府 ArcGIS REST 圖層查詢客戶端。
/// 只用到公開的 query 操作 (f=json)，不需要金鑰。
pub struct GisClient {
    client: Client,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl GisClient {
    pub fn new(timeout_seconds: u64, retry_attempts: u32, retry_delay_seconds: u64) -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(timeout_seconds),
            retry_attempts: retry_attempts.max(1),
            retry_delay: Duration::from_secs(retry_delay_seconds),
        }
    }

    /// 以門牌地址 (situs) 查宗地市值
    pub async fn market_value_by_address(
        &self,
        endpoint: &GisEndpoint,
        situs_address: &str,
    ) -> Result<f64> {
        // ArcGIS where 子句用單引號包字串，字串內的單引號要雙寫
        let escaped = situs_address.trim().to_uppercase().replace('\'', "''");
        let where_clause = format!(
            "UPPER({}) LIKE '{}%'",
            endpoint.address_field, escaped
        );

        let params = vec![
            ("where".to_string(), where_clause),
            ("outFields".to_string(), endpoint.value_field.clone()),
            ("returnGeometry".to_string(), "false".to_string()),
            ("f".to_string(), "json".to_string()),
        ];

        self.query_with_retry(endpoint, params).await
    }

    /// 以經緯度點位查宗地市值
    pub async fn market_value_by_point(
        &self,
        endpoint: &GisEndpoint,
        lon: f64,
        lat: f64,
    ) -> Result<f64> {
        let params = vec![
            ("geometry".to_string(), format!("{},{}", lon, lat)),
            ("geometryType".to_string(), "esriGeometryPoint".to_string()),
            ("inSR".to_string(), "4326".to_string()),
            (
                "spatialRel".to_string(),
                "esriSpatialRelIntersects".to_string(),
            ),
            ("outFields".to_string(), endpoint.value_field.clone()),
            ("returnGeometry".to_string(), "false".to_string()),
            ("f".to_string(), "json".to_string()),
        ];

        self.query_with_retry(endpoint, params).await
    }

    async fn query_with_retry(
        &self,
        endpoint: &GisEndpoint,
        params: Vec<(String, String)>,
    ) -> Result<f64> {
        let mut last_error = TrackerError::GisError {
            message: "no attempt made".to_string(),
        };

        for attempt in 1..=self.retry_attempts {
            match self.query_once(endpoint, &params).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "🔶 GIS query attempt {}/{} failed: {}",
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    last_error = e;
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn query_once(&self, endpoint: &GisEndpoint, params: &[(String, String)]) -> Result<f64> {
        tracing::debug!("📡 GIS request to: {}", endpoint.url);

        let response = self
            .client
            .get(&endpoint.url)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await?;

        tracing::debug!("📡 GIS response status: {}", response.status());

        if !response.status().is_success() {
            return Err(TrackerError::GisError {
                message: format!("GIS request failed with status: {}", response.status()),
            });
        }

        let json_data: serde_json::Value = response.json().await?;

        // ArcGIS 的錯誤常常包在 200 回應裡
        if let Some(error) = json_data.get("error") {
            return Err(TrackerError::GisError {
                message: format!("GIS service error: {}", error),
            });
        }

        let features = json_data
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| TrackerError::GisError {
                message: "GIS response missing 'features' array".to_string(),
            })?;

        let attributes = features
            .first()
            .and_then(|f| f.get("attributes"))
            .ok_or_else(|| TrackerError::GisError {
                message: "No parcel matched the query".to_string(),
            })?;

        let raw_value =
            attributes
                .get(&endpoint.value_field)
                .ok_or_else(|| TrackerError::GisError {
                    message: format!(
                        "GIS attributes missing value field '{}'",
                        endpoint.value_field
                    ),
                })?;

        parse_market_value(raw_value).ok_or_else(|| TrackerError::GisError {
            message: format!("Unparseable market value: {}", raw_value),
        })
    }
}

/// 市值欄位可能是數字也可能是字串（有的縣會回 "850000"）
fn parse_market_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}
