use crate::utils::error::{Result, TrackerError};
use chrono::NaiveDate;
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// 代號別名，輸入習慣寫法 -> 行情源的正式代號
pub fn normalize_ticker(ticker: &str) -> String {
    let cleaned = ticker.trim();
    match cleaned {
        "BRKB" | "BRK.B" => "BRK-B".to_string(),
        other => other.to_string(),
    }
}

/// Stooq 風格的查詢代號：小寫，美股加 .us 後綴
fn to_feed_symbol(normalized: &str) -> String {
    let lower = normalized.to_lowercase();
    if lower.contains('.') {
        lower
    } else {
        format!("{}.us", lower)
    }
}

fn dedupe_and_strip(tickers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut output = Vec::new();
    for raw in tickers {
        let cleaned = raw.trim().to_string();
        if cleaned.is_empty() || !seen.insert(cleaned.clone()) {
            continue;
        }
        output.push(cleaned);
    }
    output
}

/// 每日收盤價面板：normalized ticker -> (date -> close)
#[derive(Debug, Clone, Default)]
pub struct PricePanel {
    closes: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl PricePanel {
    pub fn close(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.closes.get(ticker).and_then(|m| m.get(&date)).copied()
    }

    /// 某代號最後一筆收盤（日期與價格）
    pub fn last_close(&self, ticker: &str) -> Option<(NaiveDate, f64)> {
        self.closes
            .get(ticker)
            .and_then(|m| m.iter().next_back())
            .map(|(d, v)| (*d, *v))
    }

    pub fn dates(&self, ticker: &str) -> Vec<NaiveDate> {
        self.closes
            .get(ticker)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.closes.contains_key(ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.closes.values().all(|m| m.is_empty())
    }

    pub fn insert(&mut self, ticker: String, date: NaiveDate, close: f64) {
        self.closes.entry(ticker).or_default().insert(date, close);
    }
}

#[derive(Debug, Clone)]
pub struct PricingResult {
    /// 原始輸入代號 -> 收盤價
    pub prices: HashMap<String, f64>,
    pub source_dates: HashMap<String, NaiveDate>,
}

/// 公開行情端點客戶端（Stooq 風格 CSV：Date,Open,High,Low,Close,Volume）
pub struct PriceClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl PriceClient {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// 抓一段期間的收盤價面板
    pub async fn fetch_close_price_panel(
        &self,
        tickers: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PricePanel> {
        let unique = dedupe_and_strip(tickers);
        if unique.is_empty() {
            return Err(TrackerError::PricingError {
                message: "No tickers provided for price panel".to_string(),
            });
        }

        let mut panel = PricePanel::default();

        for ticker in &unique {
            let normalized = normalize_ticker(ticker);
            if panel.has_ticker(&normalized) {
                continue;
            }

            let csv_body = self.fetch_daily_csv(&normalized, start_date, end_date).await?;
            let rows = parse_close_rows(&csv_body)?;

            tracing::debug!("📈 {}: {} close rows fetched", normalized, rows.len());
            for (date, close) in rows {
                panel.insert(normalized.clone(), date, close);
            }
        }

        if panel.is_empty() {
            return Err(TrackerError::PricingError {
                message: format!(
                    "No price data returned for window {} to {}",
                    start_date, end_date
                ),
            });
        }

        Ok(panel)
    }

    /// 抓單一估值日的收盤價，缺價就報錯（列出缺哪些代號）
    pub async fn fetch_close_prices(
        &self,
        tickers: &[String],
        valuation_date: NaiveDate,
    ) -> Result<PricingResult> {
        let unique = dedupe_and_strip(tickers);
        if unique.is_empty() {
            return Err(TrackerError::PricingError {
                message: "No tickers provided for pricing".to_string(),
            });
        }

        let panel = self
            .fetch_close_price_panel(&unique, valuation_date, valuation_date)
            .await?;

        let mut prices = HashMap::new();
        let mut source_dates = HashMap::new();
        let mut missing = Vec::new();

        for original in &unique {
            let normalized = normalize_ticker(original);
            match panel.close(&normalized, valuation_date) {
                Some(close) => {
                    prices.insert(original.clone(), close);
                    source_dates.insert(original.clone(), valuation_date);
                }
                None => missing.push(normalized),
            }
        }

        if !missing.is_empty() {
            missing.sort();
            return Err(TrackerError::PricingError {
                message: format!(
                    "Missing close prices for valuation date {}: {}",
                    valuation_date,
                    missing.join(", ")
                ),
            });
        }

        Ok(PricingResult {
            prices,
            source_dates,
        })
    }

    async fn fetch_daily_csv(
        &self,
        normalized: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<String> {
        let symbol = to_feed_symbol(normalized);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("s", symbol.as_str()),
                ("d1", &start_date.format("%Y%m%d").to_string()),
                ("d2", &end_date.format("%Y%m%d").to_string()),
                ("i", "d"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::PricingError {
                message: format!(
                    "Price request for {} failed with status: {}",
                    symbol,
                    response.status()
                ),
            });
        }

        Ok(response.text().await?)
    }
}

/// 解析日線 CSV，回傳 (日期, 收盤) 列表。
/// 行情源查無資料時會回一行 "No data"，當成空結果。
fn parse_close_rows(csv_body: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let trimmed = csv_body.trim();
    if trimmed.is_empty() || trimmed.starts_with("No data") || trimmed.starts_with("N/D") {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(trimmed.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date_str = record.get(0).unwrap_or_default();
        let close_str = record.get(4).unwrap_or_default();

        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => continue,
        };
        let close = match close_str.parse::<f64>() {
            Ok(c) => c,
            Err(_) => continue,
        };

        rows.push((date, close));
    }

    Ok(rows)
}
