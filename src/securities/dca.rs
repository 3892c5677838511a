use crate::market::pricing::{normalize_ticker, PricePanel};
use crate::securities::master::{HoldingType, SecurityRow};
use crate::utils::error::{Result, TrackerError};
use chrono::NaiveDate;

/// 單一持倉的季度 DCA 日程
#[derive(Debug, Clone)]
pub struct DcaRow {
    pub row: SecurityRow,
    pub investment_dates: Vec<NaiveDate>,
    pub num_investments: usize,
    pub invested_dollars: f64,
}

/// 依照已調整過的週三清單，為每個持倉排投入日程。
/// Active 每週投 weekly_investment_dollars；NoMoreFunding 不投。
pub fn build_dca_schedule(rows: &[SecurityRow], adjusted_wednesdays: &[NaiveDate]) -> Vec<DcaRow> {
    rows.iter()
        .map(|row| match row.holding_type {
            HoldingType::Active => {
                let dates = adjusted_wednesdays.to_vec();
                let count = dates.len();
                DcaRow {
                    invested_dollars: row.weekly_investment_dollars * count as f64,
                    num_investments: count,
                    investment_dates: dates,
                    row: row.clone(),
                }
            }
            HoldingType::NoMoreFunding => DcaRow {
                row: row.clone(),
                investment_dates: Vec::new(),
                num_investments: 0,
                invested_dollars: 0.0,
            },
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct QuarterQuantity {
    pub row: SecurityRow,
    pub shares_added: f64,
    pub ending_quantity: f64,
    pub invested_dollars: f64,
    pub avg_purchase_price: Option<f64>,
}

/// 用每個投入日的收盤價把美元投入換算成股數。
/// 任何排程日缺價都是錯誤，訊息列出每一筆 ticker@date。
pub fn compute_quarter_quantities(
    schedule: &[DcaRow],
    panel: &PricePanel,
) -> Result<Vec<QuarterQuantity>> {
    let mut missing: Vec<String> = Vec::new();

    for dca in schedule {
        let normalized = normalize_ticker(&dca.row.security);
        for date in &dca.investment_dates {
            if panel.close(&normalized, *date).is_none() {
                missing.push(format!("{}@{}", normalized, date));
            }
        }
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(TrackerError::PricingError {
            message: format!("Missing close prices for: {}", missing.join(", ")),
        });
    }

    let mut out = Vec::with_capacity(schedule.len());
    for dca in schedule {
        let normalized = normalize_ticker(&dca.row.security);

        let mut shares_added = 0.0;
        for date in &dca.investment_dates {
            let close = panel.close(&normalized, *date).ok_or_else(|| {
                TrackerError::PricingError {
                    message: format!("Missing close price for {}@{}", normalized, date),
                }
            })?;
            shares_added += dca.row.weekly_investment_dollars / close;
        }

        let ending_quantity = dca.row.starting_quantity + shares_added;
        let avg_purchase_price = if shares_added > 0.0 {
            Some(dca.invested_dollars / shares_added)
        } else {
            None
        };

        out.push(QuarterQuantity {
            row: dca.row.clone(),
            shares_added,
            ending_quantity,
            invested_dollars: dca.invested_dollars,
            avg_purchase_price,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn active_row(security: &str, starting: f64, weekly: f64) -> SecurityRow {
        SecurityRow {
            owner_bucket: "Parents".to_string(),
            account_name: "Fidelity".to_string(),
            security: security.to_string(),
            holding_type: HoldingType::Active,
            starting_quantity: starting,
            weekly_investment_dollars: weekly,
        }
    }

    fn frozen_row(security: &str, starting: f64) -> SecurityRow {
        SecurityRow {
            holding_type: HoldingType::NoMoreFunding,
            ..active_row(security, starting, 0.0)
        }
    }

    #[test]
    fn test_schedule_active_vs_frozen() {
        let rows = vec![active_row("VTI", 100.0, 300.0), frozen_row("VTI", 50.0)];
        let weds = vec![d(2026, 7, 1), d(2026, 7, 8)];

        let schedule = build_dca_schedule(&rows, &weds);

        assert_eq!(schedule[0].num_investments, 2);
        assert_eq!(schedule[0].invested_dollars, 600.0);
        assert_eq!(schedule[1].num_investments, 0);
        assert_eq!(schedule[1].invested_dollars, 0.0);
    }

    #[test]
    fn test_quantities_accumulate_shares() {
        let rows = vec![active_row("VTI", 100.0, 300.0)];
        let weds = vec![d(2026, 7, 1), d(2026, 7, 8)];
        let schedule = build_dca_schedule(&rows, &weds);

        let mut panel = PricePanel::default();
        panel.insert("VTI".to_string(), d(2026, 7, 1), 150.0);
        panel.insert("VTI".to_string(), d(2026, 7, 8), 300.0);

        let quantities = compute_quarter_quantities(&schedule, &panel).unwrap();
        let q = &quantities[0];

        // 300/150 + 300/300 = 3 股
        assert!((q.shares_added - 3.0).abs() < 1e-9);
        assert!((q.ending_quantity - 103.0).abs() < 1e-9);
        // 600 美元買 3 股 -> 平均 200
        assert_eq!(q.avg_purchase_price, Some(200.0));
    }

    #[test]
    fn test_frozen_rows_have_no_avg_price() {
        let rows = vec![frozen_row("VTI", 50.0)];
        let schedule = build_dca_schedule(&rows, &[]);
        let panel = PricePanel::default();

        let quantities = compute_quarter_quantities(&schedule, &panel).unwrap();
        assert_eq!(quantities[0].ending_quantity, 50.0);
        assert_eq!(quantities[0].avg_purchase_price, None);
    }

    #[test]
    fn test_missing_price_lists_ticker_and_date() {
        let rows = vec![active_row("BRKB", 10.0, 930.0)];
        let weds = vec![d(2026, 7, 1)];
        let schedule = build_dca_schedule(&rows, &weds);
        let panel = PricePanel::default();

        let err = compute_quarter_quantities(&schedule, &panel).unwrap_err();
        assert!(err.to_string().contains("BRK-B@2026-07-01"));
    }
}
