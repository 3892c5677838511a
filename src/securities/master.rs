use crate::utils::error::{Result, TrackerError};
use std::collections::HashMap;
use std::path::Path;

/// master CSV 必要欄位（別名處理後）
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "owner_bucket",
    "account_name",
    "security",
    "type",
    "starting_quantity",
    "weekly_investment_dollars",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingType {
    Active,
    NoMoreFunding,
}

impl HoldingType {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Active" => Some(Self::Active),
            "NoMoreFunding" => Some(Self::NoMoreFunding),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityRow {
    pub owner_bucket: String,
    pub account_name: String,
    pub security: String,
    pub holding_type: HoldingType,
    pub starting_quantity: f64,
    pub weekly_investment_dollars: f64,
}

#[derive(Debug, Clone)]
pub struct SecuritiesMaster {
    pub rows: Vec<SecurityRow>,
    pub source_path: String,
}

fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// 舊版表頭的別名對應
fn apply_alias(normalized: &str) -> &str {
    match normalized {
        "for" => "owner_bucket",
        "category" => "account_name",
        "symbol" => "security",
        "quantity" => "starting_quantity",
        "weekly_investment_in_dollars" => "weekly_investment_dollars",
        other => other,
    }
}

/// 讀取並驗證 securities master CSV。
/// 所有列的問題一次收齊回報，行號是 1-based（含表頭，與試算表對得上）。
pub fn read_securities_master<P: AsRef<Path>>(path: P) -> Result<SecuritiesMaster> {
    let source_path = path.as_ref().display().to_string();
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let canonical = apply_alias(&normalize_column(header)).to_string();
        column_index.entry(canonical).or_insert(idx);
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !column_index.contains_key(**c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(TrackerError::ValidationError {
            message: format!(
                "Missing required columns in securities master after aliasing: {}",
                missing.join(", ")
            ),
        });
    }

    let mut rows = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row_number = i + 2; // 資料第一列在試算表裡是第 2 行

        let get = |column: &str| -> String {
            column_index
                .get(column)
                .and_then(|idx| record.get(*idx))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        let owner_bucket = get("owner_bucket");
        let account_name = get("account_name");
        let security = get("security");
        let type_raw = get("type");

        for (column, value) in [
            ("owner_bucket", &owner_bucket),
            ("account_name", &account_name),
            ("security", &security),
            ("type", &type_raw),
        ] {
            if value.is_empty() {
                errors.push(format!("Blank value in '{}' at row {}", column, row_number));
            }
        }

        let starting_quantity = match get("starting_quantity").parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                errors.push(format!(
                    "Non-numeric value in 'starting_quantity' at row {}",
                    row_number
                ));
                0.0
            }
        };

        let weekly_investment_dollars = match get("weekly_investment_dollars").parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                errors.push(format!(
                    "Non-numeric value in 'weekly_investment_dollars' at row {}",
                    row_number
                ));
                0.0
            }
        };

        let holding_type = match HoldingType::parse(&type_raw) {
            Some(t) => t,
            None => {
                if !type_raw.is_empty() {
                    errors.push(format!(
                        "Invalid 'type' value (expected Active or NoMoreFunding) at row {}",
                        row_number
                    ));
                }
                HoldingType::NoMoreFunding
            }
        };

        rows.push(SecurityRow {
            owner_bucket,
            account_name,
            security,
            holding_type,
            starting_quantity,
            weekly_investment_dollars,
        });
    }

    if !errors.is_empty() {
        return Err(TrackerError::ValidationError {
            message: format!(
                "Securities master validation failed:\n- {}",
                errors.join("\n- ")
            ),
        });
    }

    Ok(SecuritiesMaster { rows, source_path })
}
