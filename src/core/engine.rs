use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// 報表引擎：依序跑 extract -> transform -> load
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting quarterly report run");
        self.monitor.log_stats("Run started");

        // Extract
        tracing::info!("📥 Fetching valuations...");
        let valuations = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Valuations ready: {} real estate holdings, {} securities buckets",
            valuations.real_estate.len(),
            valuations.securities_totals.len()
        );
        self.monitor.log_stats("Extract complete");

        // Transform
        tracing::info!("🔄 Building report artifacts...");
        let artifacts = self.pipeline.transform(valuations).await?;
        tracing::info!(
            "🔄 Report built: {} chart quarters, {} series",
            artifacts.chart_quarters.len(),
            artifacts.chart_series.len()
        );
        self.monitor.log_stats("Transform complete");

        // Load
        tracing::info!("💾 Persisting and delivering...");
        let output_path = self.pipeline.load(artifacts).await?;
        tracing::info!("💾 Output saved to: {}", output_path);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
