use crate::domain::model::RealEstateValue;
use crate::report::md_table::markdown_table_to_html;
use std::collections::HashMap;

// Email #2 模板凍結列的數字（尚未自動化的資產）
const GOLD_VALUE: f64 = 7_300.0;
const GOLD_QOQ: f64 = 200.0;
const LIC_VALUE: f64 = 47_500.0;
const LIC_QOQ: f64 = 1_300.0;
const DEFAULT_SECURITIES_VALUE: f64 = 365_000.0;
const DEFAULT_SECURITIES_QOQ: f64 = 13_000.0;

/// 摘要區的三個字串，由 pipeline 依快照歷史算好傳進來
#[derive(Debug, Clone)]
pub struct GrowthSummary {
    pub qoq_growth: String,
    pub yoy_growth: String,
    pub since_start: String,
}

#[derive(Debug)]
pub struct TemplateInputs<'a> {
    pub summary: &'a GrowthSummary,
    pub chart_cid: &'a str,
    pub holdings: &'a [RealEstateValue],
    pub qoq_changes: &'a HashMap<String, f64>,
    pub securities_total: Option<f64>,
    pub securities_qoq: Option<f64>,
}

/// 千分位整數金額："$1,234,568"，負數 "-$1,234"
pub fn fmt_money(x: f64) -> String {
    let rounded = x.round();
    let negative = rounded < 0.0;
    let mut n = rounded.abs() as u64;

    let mut groups = Vec::new();
    loop {
        groups.push((n % 1000).to_string());
        n /= 1000;
        if n == 0 {
            break;
        }
    }
    let mut body = String::new();
    for (i, group) in groups.iter().rev().enumerate() {
        if i == 0 {
            body.push_str(group);
        } else {
            body.push_str(&format!("{:0>3}", group));
        }
        if i < groups.len() - 1 {
            body.push(',');
        }
    }

    if negative {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// 帶正負號的變動金額："+$5,000"、"-$70"，零是 "$0"
pub fn fmt_money_delta(x: f64) -> String {
    let rounded = x.round();
    if rounded == 0.0 {
        "$0".to_string()
    } else if rounded > 0.0 {
        format!("+{}", fmt_money(rounded))
    } else {
        fmt_money(rounded)
    }
}

/// Frozen Email #2 template（結構鎖定，只換注入的數字）。
pub fn render_email_html(inputs: &TemplateInputs) -> String {
    let securities_value = inputs.securities_total.unwrap_or(DEFAULT_SECURITIES_VALUE);
    let securities_qoq = inputs.securities_qoq.unwrap_or(DEFAULT_SECURITIES_QOQ);

    // --- TABLE 1：凍結格式，不動產列與證券列注入計算值 ---
    let mut table1_lines = vec![
        "| Asset                          | Owner       |  Current Value |   QoQ Change |  True Growth |".to_string(),
        "| ------------------------------ | ----------- | -------------: | -----------: | -----------: |".to_string(),
    ];

    let mut holdings_total = 0.0;
    let mut holdings_qoq_total = 0.0;
    for holding in inputs.holdings {
        let qoq = inputs
            .qoq_changes
            .get(&holding.key)
            .copied()
            .unwrap_or(0.0);
        holdings_total += holding.owned_value;
        holdings_qoq_total += qoq;
        table1_lines.push(format!(
            "| {} | Parents | {} | {} | $0 |",
            holding.label,
            fmt_money(holding.owned_value),
            fmt_money_delta(qoq)
        ));
    }

    table1_lines.push(format!(
        "| Gold (100 gms) | Parents | {} | {} | {} |",
        fmt_money(GOLD_VALUE),
        fmt_money_delta(GOLD_QOQ),
        fmt_money_delta(GOLD_QOQ)
    ));
    table1_lines.push(format!(
        "| LIC Policies | Parents | {} | {} | {} |",
        fmt_money(LIC_VALUE),
        fmt_money_delta(LIC_QOQ),
        fmt_money_delta(LIC_QOQ)
    ));
    table1_lines.push(format!(
        "| Securities (All Accounts) | Parents | {} | {} | +$8,600 |",
        fmt_money(securities_value),
        fmt_money_delta(securities_qoq)
    ));

    let total = holdings_total + GOLD_VALUE + LIC_VALUE + securities_value;
    let total_qoq = holdings_qoq_total + GOLD_QOQ + LIC_QOQ + securities_qoq;
    table1_lines.push(format!(
        "| **TOTAL NET WORTH** | **Parents** | **{}** | **{}** | **+$15,100** |",
        fmt_money(total),
        fmt_money_delta(total_qoq)
    ));
    table1_lines.push("| Net Worth | Kid 1 | $94,000 | +$2,800 | +$1,500 |".to_string());
    table1_lines.push("| Net Worth | Kid 2 | $78,000 | +$2,900 | +$1,925 |".to_string());

    let table1_md = table1_lines.join("\n");

    let table2_md = "\
| Quarter     | Portfolio   | Securities Value | New Investment |  Dividends |   QoQ Change | True Market Growth |
| ----------- | ----------- | ---------------: | -------------: | ---------: | -----------: | -----------------: |
| Q1 2026     | Parents     |         $352,000 |         $3,900 |     $1,200 |            — |                  — |
| **Q2 2026** | **Parents** |     **$365,000** |     **$3,900** | **$1,200** | **+$13,000** |        **+$7,900** |
| Q1 2026     | Kid 1       |          $60,300 |         $1,300 |          — |            — |                  — |
| Q2 2026     | Kid 1       |          $63,100 |         $1,300 |          — |      +$2,800 |            +$1,500 |
| Q1 2026     | Kid 2       |          $50,700 |           $975 |          — |            — |                  — |
| Q2 2026     | Kid 2       |          $53,600 |           $975 |          — |      +$2,900 |            +$1,925 |";

    let table3_md = "\
| Quarter | Security | In the Account(s)      | Market Value | New Investment | Dividends | QoQ Change | True Market Growth |
| ------- | -------- | ---------------------- | -----------: | -------------: | --------: | ---------: | -----------------: |
| Q2 2026 | VTI      | Fidelity, M1 WeeklyDCA |     $198,000 |           $900 |         — |    +$7,500 |            +$6,600 |
| Q2 2026 | BRK.B    | 401k, M1 WeeklyDCA     |      $60,500 |           $930 |         — |    +$2,300 |            +$1,370 |
| Q2 2026 | CASH     | Fidelity Core, M1 Cash |      $23,500 |         $2,070 |    $1,200 |    +$3,200 |               -$70 |";

    let table4_md = "\
| Quarter | Security | In the Account(s)          | Market Value | New Investment | Dividends | QoQ Change | True Market Growth |
| ------- | -------- | -------------------------- | -----------: | -------------: | --------: | ---------: | -----------------: |
| Q2 2026 | VTI      | ForKid1Before2025, Sweetie |      $41,800 |         $1,300 |         — |    +$2,800 |            +$1,500 |";

    let table5_md = "\
| Quarter | Security | In the Account(s) | Market Value | New Investment | Dividends | QoQ Change | True Market Growth |
| ------- | -------- | ----------------- | -----------: | -------------: | --------: | ---------: | -----------------: |
| Q2 2026 | VTI      | ForKid2Before2025 |      $33,900 |           $975 |         — |    +$2,900 |            +$1,925 |";

    let t1 = markdown_table_to_html(&table1_md);
    let t2 = markdown_table_to_html(table2_md);
    let t3 = markdown_table_to_html(table3_md);
    let t4 = markdown_table_to_html(table4_md);
    let t5 = markdown_table_to_html(table5_md);

    format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; color:#111; font-size:14px;">
    <div style="font-weight:700; font-size:16px;">NET WORTH TRACKER — QUARTERLY SNAPSHOT</div>
    <div style="margin-top:4px;">(Open only the latest email. This email is cumulative by design.)</div>

    <h2 style="margin-top:18px;">📊 NET WORTH SUMMARY (1-Minute View)</h2>
    <ul>
      <li><b>QoQ Growth:</b> <b>{qoq_growth}</b></li>
      <li><b>YoY Growth:</b> {yoy_growth}</li>
      <li><b>Growth Since Start:</b> <b>{since_start}</b></li>
    </ul>

    <h2 style="margin-top:18px;">📈 NET WORTH TRAJECTORY (SIMPLE LINE VIEW)</h2>

    <div style="margin-top:10px;">
      <img src="cid:{chart_cid}" alt="Net Worth Trajectory" style="max-width: 1100px; width: 100%;"/>
    </div>

    <h2 style="margin-top:18px;">TABLE 1 — NET WORTH (CURRENT SNAPSHOT — NO HISTORY)</h2>
    {t1}

    <h2 style="margin-top:18px;">TABLE 2 — SECURITIES TOTAL (RECONCILIATION)</h2>
    {t2}
    <div style="margin-top:8px; font-weight:700;">✔ Sums reconcile exactly with Tables 3–5</div>

    <h2 style="margin-top:18px;">TABLE 3 — PER-SECURITY (PARENTS — ALL ACCOUNTS COMBINED)</h2>
    {t3}

    <h2 style="margin-top:18px;">TABLE 4 — KID 1 SECURITIES (ALL ACCOUNTS COMBINED — Target: 2034)</h2>
    {t4}

    <h2 style="margin-top:18px;">TABLE 5 — KID 2 SECURITIES (ALL ACCOUNTS COMBINED — Target: 2039)</h2>
    {t5}
  </body>
</html>"#,
        qoq_growth = inputs.summary.qoq_growth,
        yoy_growth = inputs.summary.yoy_growth,
        since_start = inputs.summary.since_start,
        chart_cid = inputs.chart_cid,
        t1 = t1,
        t2 = t2,
        t3 = t3,
        t4 = t4,
        t5 = t5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ValuationMode;

    fn holding(key: &str, label: &str, owned: f64) -> RealEstateValue {
        RealEstateValue {
            key: key.to_string(),
            label: label.to_string(),
            mode: ValuationMode::FallbackOnly,
            county: "collin".to_string(),
            ownership_pct: 1.0,
            fallback_value: owned,
            adjusted_value: owned,
            owned_value: owned,
            from_gis: false,
        }
    }

    #[test]
    fn test_fmt_money() {
        assert_eq!(fmt_money(0.0), "$0");
        assert_eq!(fmt_money(850.0), "$850");
        assert_eq!(fmt_money(850_000.0), "$850,000");
        assert_eq!(fmt_money(1_821_800.4), "$1,821,800");
        assert_eq!(fmt_money(-1_234.0), "-$1,234");
        assert_eq!(fmt_money(1_000_000.0), "$1,000,000");
    }

    #[test]
    fn test_fmt_money_delta() {
        assert_eq!(fmt_money_delta(5_000.0), "+$5,000");
        assert_eq!(fmt_money_delta(-70.0), "-$70");
        assert_eq!(fmt_money_delta(0.0), "$0");
        assert_eq!(fmt_money_delta(0.4), "$0");
    }

    #[test]
    fn test_render_injects_holdings_and_totals() {
        let holdings = vec![
            holding("primary_home", "Primary Home", 850_000.0),
            holding("celina_land", "Celina Land", 125_000.0),
        ];
        let mut qoq = HashMap::new();
        qoq.insert("celina_land".to_string(), 5_000.0);

        let summary = GrowthSummary {
            qoq_growth: "+$25,500 (+1.4%)".to_string(),
            yoy_growth: "n/a (first year)".to_string(),
            since_start: "+$120,000".to_string(),
        };

        let html = render_email_html(&TemplateInputs {
            summary: &summary,
            chart_cid: "chart",
            holdings: &holdings,
            qoq_changes: &qoq,
            securities_total: Some(372_500.0),
            securities_qoq: Some(7_500.0),
        });

        assert!(html.contains("<td>Primary Home</td>"));
        assert!(html.contains("<td>$850,000</td>"));
        assert!(html.contains("<td>Celina Land</td>"));
        assert!(html.contains("<td>+$5,000</td>"));
        assert!(html.contains("<td>$372,500</td>"));
        // TOTAL = 850,000 + 125,000 + 7,300 + 47,500 + 372,500
        assert!(html.contains("<td>$1,402,300</td>"));
        assert!(html.contains("cid:chart"));
        assert!(html.contains("+$25,500 (+1.4%)"));
        // 凍結的敘述區塊不能動
        assert!(html.contains("NET WORTH TRACKER — QUARTERLY SNAPSHOT"));
        assert!(html.contains("Sums reconcile exactly with Tables 3–5"));
    }

    #[test]
    fn test_render_defaults_when_securities_disabled() {
        let holdings = vec![holding("primary_home", "Primary Home", 850_000.0)];
        let qoq = HashMap::new();
        let summary = GrowthSummary {
            qoq_growth: "$0".to_string(),
            yoy_growth: "n/a".to_string(),
            since_start: "$0".to_string(),
        };

        let html = render_email_html(&TemplateInputs {
            summary: &summary,
            chart_cid: "chart",
            holdings: &holdings,
            qoq_changes: &qoq,
            securities_total: None,
            securities_qoq: None,
        });

        // 沒接證券時沿用模板凍結值
        assert!(html.contains("<td>$365,000</td>"));
        assert!(html.contains("<td>+$13,000</td>"));
    }
}
