pub mod dca;
pub mod master;

use crate::market::calendar;
use crate::market::pricing::{normalize_ticker, PriceClient};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// 證券估值總管：讀 master、排 DCA 日程、抓價、
/// 算到 today 為止每個 owner bucket 的市值。
pub async fn value_securities(
    master_path: &str,
    pricing: &PriceClient,
    calendar_ticker: &str,
    today: NaiveDate,
) -> Result<BTreeMap<String, f64>> {
    let master = master::read_securities_master(master_path)?;
    tracing::info!(
        "📑 Securities master loaded: {} rows from {}",
        master.rows.len(),
        master.source_path
    );

    let (quarter_start, quarter_end) = calendar::get_quarter_bounds(today);
    // 只排已經發生的投入；未來的週三留給下一次跑
    let schedule_end = quarter_end.min(today);
    let wednesdays = calendar::list_wednesdays(quarter_start, schedule_end);

    let trading_days = match (wednesdays.first(), wednesdays.last()) {
        (Some(first), Some(last)) => {
            calendar::fetch_trading_days(pricing, calendar_ticker, *first, *last, today).await?
        }
        _ => Vec::new(),
    };
    let adjusted = calendar::shift_wednesdays_to_trading_days(&wednesdays, &trading_days)?;

    let schedule = dca::build_dca_schedule(&master.rows, &adjusted);

    let tickers: Vec<String> = master.rows.iter().map(|r| r.security.clone()).collect();
    let panel = pricing
        .fetch_close_price_panel(&tickers, quarter_start, today)
        .await?;

    let quantities = dca::compute_quarter_quantities(&schedule, &panel)?;

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for q in &quantities {
        let normalized = normalize_ticker(&q.row.security);
        let Some((price_date, close)) = panel.last_close(&normalized) else {
            tracing::warn!("🔶 {}: no close price in quarter, skipping", q.row.security);
            continue;
        };
        let market_value = q.ending_quantity * close;
        tracing::debug!(
            "💰 {} / {}: {:.4} shares @ ${:.2} ({}) = ${:.0}",
            q.row.owner_bucket,
            q.row.security,
            q.ending_quantity,
            close,
            price_date,
            market_value
        );
        *totals.entry(q.row.owner_bucket.clone()).or_insert(0.0) += market_value;
    }

    for (bucket, total) in &totals {
        tracing::info!("💰 {}: securities total ${:.0}", bucket, total);
    }

    Ok(totals)
}
