use crate::config::YamlConfig;
use crate::domain::model::{RealEstateValue, ValuationMode};
use crate::market::gis::GisClient;
use crate::utils::error::Result;

/// 依模式做調整。除了 gis 以外都是純配置驅動的確定性運算。
fn apply_mode_adjustment(
    mode: ValuationMode,
    base_value: f64,
    inflation_qoq_pct: f64,
    hpi_qoq_pct: f64,
) -> f64 {
    match mode {
        ValuationMode::FallbackOnly | ValuationMode::Gis => base_value,
        ValuationMode::InflationIsh => base_value * (1.0 + inflation_qoq_pct / 100.0),
        ValuationMode::CadTimesHpi => base_value * (1.0 + hpi_qoq_pct / 100.0),
    }
}

/// 計算所有不動產的估值。
/// gis 模式會打縣府端點，拿不到就退回 fallback_value 並留下警告，
/// 絕不讓單一縣的停機擋掉整季的報告。
pub async fn compute_real_estate(
    config: &YamlConfig,
    gis: &GisClient,
) -> Result<Vec<RealEstateValue>> {
    let inflation = config.inflation_qoq_pct();
    let hpi = config.hpi_qoq_pct();

    let mut out = Vec::with_capacity(config.real_estate.len());

    for (key, holding) in &config.real_estate {
        let ownership_pct = holding.ownership_pct.unwrap_or(1.0);
        let fallback_value = holding.fallback_value.unwrap_or(0.0);

        let (base_value, from_gis) = if holding.mode == ValuationMode::Gis {
            match fetch_gis_value(config, gis, key, holding).await {
                Some(value) => (value, true),
                None => {
                    tracing::warn!(
                        "🔶 {}: GIS lookup failed, using fallback value ${:.0}",
                        key,
                        fallback_value
                    );
                    (fallback_value, false)
                }
            }
        } else {
            (fallback_value, false)
        };

        let adjusted = apply_mode_adjustment(holding.mode, base_value, inflation, hpi);
        let owned = adjusted * ownership_pct;

        tracing::info!(
            "🏠 {}: mode={}, adjusted=${:.0}, owned=${:.0}",
            key,
            holding.mode.as_str(),
            adjusted,
            owned
        );

        out.push(RealEstateValue {
            key: key.clone(),
            label: holding.display_label(key),
            mode: holding.mode,
            county: holding.county.clone(),
            ownership_pct,
            fallback_value,
            adjusted_value: adjusted,
            owned_value: owned,
            from_gis,
        });
    }

    Ok(out)
}

async fn fetch_gis_value(
    config: &YamlConfig,
    gis: &GisClient,
    key: &str,
    holding: &crate::config::HoldingConfig,
) -> Option<f64> {
    let endpoint = config.gis.endpoints.get(&holding.county)?;

    if let Some(situs) = &holding.situs_address {
        match gis.market_value_by_address(endpoint, situs).await {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::warn!("🔶 {}: address lookup failed ({})", key, e);
            }
        }
    }

    // 地址查不到再試點位
    if let Some([lon, lat]) = holding.parcel_point {
        match gis.market_value_by_point(endpoint, lon, lat).await {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::warn!("🔶 {}: point lookup failed ({})", key, e);
            }
        }
    }

    None
}
