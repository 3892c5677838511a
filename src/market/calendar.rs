use crate::market::pricing::{normalize_ticker, PriceClient};
use crate::utils::error::{Result, TrackerError};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// 回傳 dt 所在季度的起迄日（含）
pub fn get_quarter_bounds(dt: NaiveDate) -> (NaiveDate, NaiveDate) {
    let quarter = (dt.month() - 1) / 3 + 1;
    let start_month = (quarter - 1) * 3 + 1;
    let start_date = NaiveDate::from_ymd_opt(dt.year(), start_month, 1)
        .expect("quarter start is always a valid date");
    let end_date = if start_month + 3 > 12 {
        NaiveDate::from_ymd_opt(dt.year() + 1, 1, 1).expect("jan 1 is valid") - Duration::days(1)
    } else {
        NaiveDate::from_ymd_opt(dt.year(), start_month + 3, 1).expect("month start is valid")
            - Duration::days(1)
    };
    (start_date, end_date)
}

/// 列出範圍內所有週三
pub fn list_wednesdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let days_to_wed = (2 + 7 - start.weekday().num_days_from_monday()) % 7;
    let mut current = start + Duration::days(days_to_wed as i64);
    let mut wednesdays = Vec::new();
    while current <= end {
        wednesdays.push(current);
        current += Duration::days(7);
    }
    wednesdays
}

fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(current);
        }
        current += Duration::days(1);
    }
    days
}

/// 用基準代號的日線推交易日曆。
/// 未來的季度不打行情源，直接用平日近似。
pub async fn fetch_trading_days(
    pricing: &PriceClient,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Ok(Vec::new());
    }

    if start > today {
        return Ok(business_days(start, end));
    }

    let buffer_days = 7;
    let price_end = end + Duration::days(buffer_days);
    let normalized = normalize_ticker(ticker);
    let panel = pricing
        .fetch_close_price_panel(&[normalized.clone()], start, price_end)
        .await?;

    let days = panel.dates(&normalized);
    if days.is_empty() {
        return Err(TrackerError::PricingError {
            message: format!(
                "No trading data returned for {} between {} and {}",
                ticker, start, price_end
            ),
        });
    }
    Ok(days)
}

/// 週三若休市就順延到下一個交易日
pub fn shift_wednesdays_to_trading_days(
    wednesdays: &[NaiveDate],
    trading_days: &[NaiveDate],
) -> Result<Vec<NaiveDate>> {
    if wednesdays.is_empty() {
        return Ok(Vec::new());
    }
    if trading_days.is_empty() {
        return Err(TrackerError::ProcessingError {
            message: "No trading days available to shift Wednesday dates".to_string(),
        });
    }

    let trading_set: std::collections::HashSet<NaiveDate> = trading_days.iter().copied().collect();
    let mut shifted = Vec::with_capacity(wednesdays.len());

    for wed in wednesdays {
        if trading_set.contains(wed) {
            shifted.push(*wed);
            continue;
        }
        let next = trading_days.iter().find(|d| *d > wed);
        match next {
            Some(day) => shifted.push(*day),
            None => {
                return Err(TrackerError::ProcessingError {
                    message: format!("No trading day after {}", wed),
                })
            }
        }
    }

    Ok(shifted)
}
