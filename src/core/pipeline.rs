use crate::config::YamlConfig;
use crate::core::{Pipeline, ReportArtifacts, Storage, ValuationSet};
use crate::domain::model::{ChartSeriesData, Snapshot};
use crate::mail::{GmailMailer, OAuthCredentials};
use crate::market::{valuation, GisClient, PriceClient};
use crate::report::{chart, template};
use crate::securities;
use crate::snapshot::{qoq_deltas, SnapshotStore};
use crate::utils::error::Result;
use chrono::Utc;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

const CHART_CID: &str = "chart";

/// 每季報表管道：估值 -> 報表 -> 快照/壓縮包/寄送
pub struct QuarterlyReportPipeline<S: Storage> {
    storage: S,
    config: YamlConfig,
    gis: GisClient,
    pricing: Option<PriceClient>,
    mailer: GmailMailer,
    snapshots: SnapshotStore,
}

impl<S: Storage> QuarterlyReportPipeline<S> {
    pub fn new(storage: S, config: YamlConfig) -> Self {
        let gis = GisClient::new(
            config.gis_timeout_seconds(),
            config.gis_retry_attempts(),
            config.gis_retry_delay_seconds(),
        );
        let pricing = config.pricing.as_ref().map(|p| {
            PriceClient::new(p.endpoint.clone(), p.timeout_seconds.unwrap_or(30))
        });
        let mailer = GmailMailer::new(
            config.token_url().to_string(),
            config.send_url().to_string(),
        );
        let snapshots = SnapshotStore::new(config.snapshots_dir());

        Self {
            storage,
            config,
            gis,
            pricing,
            mailer,
            snapshots,
        }
    }

    /// "+$25,500 (+1.4%)"，沒有基準值時回 n/a 標籤
    fn format_growth(current: f64, baseline: Option<f64>, none_label: &str) -> String {
        match baseline {
            Some(base) if base.abs() > f64::EPSILON => {
                let delta = current - base;
                let pct = delta / base * 100.0;
                format!("{} ({:+.1}%)", template::fmt_money_delta(delta), pct)
            }
            Some(base) => template::fmt_money_delta(current - base),
            None => none_label.to_string(),
        }
    }

    /// 圖表的一個取樣點：bucket 是 "total" 或某個 owner bucket
    fn series_point(snapshot: &Snapshot, bucket: &str) -> f64 {
        if bucket == "total" {
            snapshot.net_worth()
        } else {
            snapshot.securities.get(bucket).copied().unwrap_or(0.0)
        }
    }

    async fn render_chart_png(&self, artifacts: &ReportArtifacts) -> Result<Vec<u8>> {
        // plotters 的點陣後端寫檔最單純：畫到暫存檔再讀回 bytes
        let temp_path = std::env::temp_dir().join(format!(
            "networth_chart_{}_{}.png",
            std::process::id(),
            artifacts.snapshot.generated_at_utc.timestamp_micros()
        ));

        chart::render_line_chart(
            &temp_path,
            &artifacts.chart_quarters,
            &artifacts.chart_series,
            self.config.chart_width(),
            self.config.chart_height(),
        )?;

        let bytes = std::fs::read(&temp_path)?;
        let _ = std::fs::remove_file(&temp_path);
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for QuarterlyReportPipeline<S> {
    async fn extract(&self) -> Result<ValuationSet> {
        let previous = self.snapshots.load_latest();
        let history = self.snapshots.load_history();
        if previous.is_none() {
            tracing::info!("📂 No previous snapshot, this looks like the first run");
        }

        let real_estate = valuation::compute_real_estate(&self.config, &self.gis).await?;

        let mut securities_totals = std::collections::BTreeMap::new();
        if let (Some(master_path), Some(pricing)) =
            (self.config.securities_master_path(), self.pricing.as_ref())
        {
            let calendar_ticker = self
                .config
                .pricing
                .as_ref()
                .and_then(|p| p.calendar_ticker.as_deref())
                .unwrap_or("SPY");
            let today = Utc::now().date_naive();

            // 證券估值失敗不擋信：模板會退回凍結值
            match securities::value_securities(master_path, pricing, calendar_ticker, today).await
            {
                Ok(totals) => securities_totals = totals,
                Err(e) => {
                    tracing::warn!("🔶 Securities valuation failed, using frozen values: {}", e);
                }
            }
        }

        Ok(ValuationSet {
            real_estate,
            securities_totals,
            previous,
            history,
        })
    }

    async fn transform(&self, data: ValuationSet) -> Result<ReportArtifacts> {
        let now = Utc::now();

        // 組本季快照
        let mut snapshot = Snapshot::new(now);
        for value in &data.real_estate {
            snapshot
                .real_estate
                .insert(value.key.clone(), value.owned_value);
        }
        for (bucket, total) in &data.securities_totals {
            snapshot.securities.insert(bucket.clone(), *total);
        }
        let net_worth = snapshot.net_worth();
        snapshot.totals.insert("net_worth".to_string(), net_worth);

        let qoq_changes = qoq_deltas(&data.real_estate, data.previous.as_ref());

        // 摘要：QoQ 比上一季；YoY 比四季前；Since Start 比最早一筆
        let current_total = snapshot.net_worth();
        let qoq_growth = Self::format_growth(
            current_total,
            data.previous.as_ref().map(|p| p.net_worth()),
            "n/a (first run)",
        );
        let year_ago = if data.history.len() >= 4 {
            Some(data.history[data.history.len() - 4].net_worth())
        } else {
            None
        };
        let yoy_growth = Self::format_growth(current_total, year_ago, "n/a (first year)");
        let since_start = Self::format_growth(
            current_total,
            data.history.first().map(|s| s.net_worth()),
            "n/a (first run)",
        );

        // 圖表資料：歷史 + 本季；只有一點時補一個平起點讓線畫得出來
        let mut chart_quarters: Vec<String> =
            data.history.iter().map(|s| s.quarter_label()).collect();
        chart_quarters.push(snapshot.quarter_label());

        let mut chart_series = Vec::with_capacity(self.config.chart.series.len());
        for series_cfg in &self.config.chart.series {
            let mut values: Vec<f64> = data
                .history
                .iter()
                .map(|s| Self::series_point(s, &series_cfg.bucket))
                .collect();
            values.push(Self::series_point(&snapshot, &series_cfg.bucket));
            chart_series.push(ChartSeriesData {
                name: series_cfg.name.clone(),
                target_year: series_cfg.target_year,
                values,
            });
        }

        if chart_quarters.len() == 1 {
            let label = chart_quarters[0].clone();
            chart_quarters.insert(0, label);
            for series in &mut chart_series {
                let first = series.values[0];
                series.values.insert(0, first);
            }
        }

        // 證券注入值：沒接證券時讓模板用凍結數字
        let securities_total = if snapshot.securities.is_empty() {
            None
        } else {
            Some(snapshot.securities.values().sum::<f64>())
        };
        let securities_qoq = securities_total.map(|current| {
            let prev: f64 = data
                .previous
                .as_ref()
                .map(|p| p.securities.values().sum())
                .unwrap_or(0.0);
            if prev > 0.0 {
                current - prev
            } else {
                0.0
            }
        });

        let summary = template::GrowthSummary {
            qoq_growth,
            yoy_growth,
            since_start,
        };
        let email_html = template::render_email_html(&template::TemplateInputs {
            summary: &summary,
            chart_cid: CHART_CID,
            holdings: &data.real_estate,
            qoq_changes: &qoq_changes,
            securities_total,
            securities_qoq,
        });

        Ok(ReportArtifacts {
            snapshot,
            qoq_changes,
            email_html,
            chart_quarters,
            chart_series,
        })
    }

    async fn load(&self, artifacts: ReportArtifacts) -> Result<String> {
        let chart_png = self.render_chart_png(&artifacts).await?;
        tracing::debug!("📈 Chart rendered ({} bytes)", chart_png.len());

        self.storage.write_file("chart.png", &chart_png).await?;
        self.storage
            .write_file("report.html", artifacts.email_html.as_bytes())
            .await?;

        self.snapshots.save(&artifacts.snapshot)?;

        // 季度稽核用的壓縮包：信件 HTML + 圖 + 快照
        let snapshot_json = serde_json::to_string_pretty(&artifacts.snapshot)?;
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file("report.html", SimpleFileOptions::default())?;
            zip.write_all(artifacts.email_html.as_bytes())?;

            zip.start_file("chart.png", SimpleFileOptions::default())?;
            zip.write_all(&chart_png)?;

            zip.start_file("snapshot.json", SimpleFileOptions::default())?;
            zip.write_all(snapshot_json.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };
        self.storage
            .write_file(self.config.bundle_filename(), &zip_data)
            .await?;

        let output_path = format!(
            "{}/{}",
            self.config.output_dir(),
            self.config.bundle_filename()
        );

        if self.config.dry_run() || self.config.skip_send() {
            tracing::info!("⏭️ Email delivery skipped (dry-run / skip-send)");
            return Ok(output_path);
        }

        let to = self.config.env_email_to()?;
        let creds = OAuthCredentials::from_env()?;
        self.mailer
            .send_html_with_inline_image(
                &creds,
                &self.config.email.subject,
                &self.config.email.from,
                &to,
                &artifacts.email_html,
                Some(chart_png.as_slice()),
                CHART_CID,
            )
            .await?;
        tracing::info!(
            "📧 Quarterly email sent (recipient from {})",
            self.config.email.to_env
        );

        Ok(output_path)
    }
}
