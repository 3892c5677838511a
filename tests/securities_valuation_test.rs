use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use networth_tracker::market::PriceClient;
use networth_tracker::securities;
use std::io::Write;
use tempfile::NamedTempFile;

const SPY_CSV: &str = "Date,Open,High,Low,Close,Volume\n\
2026-07-01,620,622,618,621.00,100\n\
2026-07-02,621,623,620,622.50,100\n\
2026-07-06,622,624,621,623.10,100\n\
2026-07-07,623,625,622,624.40,100\n\
2026-07-08,624,626,623,625.20,100\n\
2026-07-09,625,627,624,626.00,100\n\
2026-07-10,626,628,625,627.30,100\n";

const VTI_CSV: &str = "Date,Open,High,Low,Close,Volume\n\
2026-07-01,149,151,148,150.00,100\n\
2026-07-08,299,301,298,300.00,100\n\
2026-07-10,199,201,198,200.00,100\n";

/// 整條證券估值鏈：master CSV -> DCA 日程 -> 行情 -> 每個 bucket 的市值
#[tokio::test]
async fn test_value_securities_end_to_end() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/q/d/l/").query_param("s", "spy.us");
        then.status(200).body(SPY_CSV);
    });
    server.mock(|when, then| {
        when.method(GET).path("/q/d/l/").query_param("s", "vti.us");
        then.status(200).body(VTI_CSV);
    });

    let mut master = NamedTempFile::new()?;
    master.write_all(
        b"owner_bucket,account_name,security,type,starting_quantity,weekly_investment_dollars\n\
Parents,Fidelity,VTI,Active,100,300\n\
Kid 1,Sweetie,VTI,NoMoreFunding,50,0\n",
    )?;

    let pricing = PriceClient::new(server.url("/q/d/l/"), 5);
    let today = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();

    let totals = securities::value_securities(
        master.path().to_str().unwrap(),
        &pricing,
        "SPY",
        today,
    )
    .await?;

    // 排程週三：7/1 與 7/8（都有行情）
    // Parents: 100 股 + 300/150 + 300/300 = 103 股，用 7/10 收盤 200 估值
    assert_eq!(totals.get("Parents").copied(), Some(103.0 * 200.0));
    // Kid 1 不再投入：50 股 * 200
    assert_eq!(totals.get("Kid 1").copied(), Some(50.0 * 200.0));

    println!("✅ Securities valuation chain test passed!");
    Ok(())
}

/// 壞掉的 master CSV 要整批報錯，不能悄悄吞掉
#[tokio::test]
async fn test_invalid_master_fails_loudly() -> Result<()> {
    let server = MockServer::start();
    let pricing = PriceClient::new(server.url("/q/d/l/"), 5);

    let mut master = NamedTempFile::new()?;
    master.write_all(
        b"owner_bucket,account_name,security,type,starting_quantity,weekly_investment_dollars\n\
Parents,Fidelity,VTI,NotAType,abc,300\n",
    )?;

    let today = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();
    let result = securities::value_securities(
        master.path().to_str().unwrap(),
        &pricing,
        "SPY",
        today,
    )
    .await;

    let err = result.unwrap_err().to_string();
    assert!(err.contains("row 2"));
    assert!(err.contains("starting_quantity"));

    Ok(())
}
