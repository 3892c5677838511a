use crate::domain::model::ChartSeriesData;
use crate::utils::error::{Result, TrackerError};
use plotters::prelude::*;
use std::path::Path;

/// 簡短金額："1.23B" / "2.45M" / "365K"
pub fn fmt_money_short(x: f64) -> String {
    if x >= 1_000_000_000.0 {
        format!("{:.2}B", x / 1_000_000_000.0)
    } else if x >= 1_000_000.0 {
        format!("{:.2}M", x / 1_000_000.0)
    } else if x >= 1_000.0 {
        format!("{:.0}K", x / 1_000.0)
    } else {
        format!("{:.0}", x)
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> TrackerError {
    TrackerError::ChartError {
        message: e.to_string(),
    }
}

/// 簡單折線圖：無圖例、無格線，只在線尾放標籤。
/// 輸出 PNG 到 path。
pub fn render_line_chart(
    path: &Path,
    quarters: &[String],
    series: &[ChartSeriesData],
    width: u32,
    height: u32,
) -> Result<()> {
    if quarters.is_empty() || series.is_empty() {
        return Err(TrackerError::ChartError {
            message: "Nothing to plot: empty quarters or series".to_string(),
        });
    }
    for s in series {
        if s.values.len() != quarters.len() {
            return Err(TrackerError::ChartError {
                message: format!(
                    "Series '{}' has {} points but {} quarters",
                    s.name,
                    s.values.len(),
                    quarters.len()
                ),
            });
        }
    }

    let y_max = series
        .iter()
        .flat_map(|s| s.values.iter())
        .fold(0.0_f64, |acc, v| acc.max(*v));
    let y_max = if y_max <= 0.0 { 1.0 } else { y_max * 1.15 };

    let x_last = (quarters.len() - 1) as f64;
    // 右側多留 35% 寬度放線尾標籤
    let x_max = x_last + (x_last.max(1.0)) * 0.35;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 90)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(chart_err)?;

    let quarter_labels = quarters.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(quarters.len())
        .x_label_formatter(&move |x| {
            let idx = x.round() as usize;
            if (x - idx as f64).abs() < 0.01 {
                quarter_labels.get(idx).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .y_label_formatter(&|y| format!("${}", fmt_money_short(*y)))
        .x_desc("Quarter")
        .y_desc("Portfolio Value ($)")
        .draw()
        .map_err(chart_err)?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();

        chart
            .draw_series(LineSeries::new(
                s.values.iter().enumerate().map(|(x, y)| (x as f64, *y)),
                color.stroke_width(2),
            ))
            .map_err(chart_err)?;

        if let Some(last) = s.values.last() {
            let label = format!(
                "{} — ${} (Target: {})",
                s.name,
                fmt_money_short(*last),
                s.target_year
            );
            chart
                .draw_series(std::iter::once(Text::new(
                    label,
                    (x_last + 0.05, *last),
                    ("sans-serif", 14).into_font().color(&color),
                )))
                .map_err(chart_err)?;
        }
    }

    root.present().map_err(chart_err)?;
    Ok(())
}
