use crate::domain::model::{RealEstateValue, Snapshot};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 快照檔案管理：latest.json 覆寫 + 留一份帶時間戳的歷史副本
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join("latest.json")
    }

    /// 讀上一季快照。檔案不存在或壞掉都當成「沒有歷史」，
    /// 寧可少一個 QoQ 也不能擋掉整季的報告。
    pub fn load_latest(&self) -> Option<Snapshot> {
        let path = self.latest_path();
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!("🔶 Corrupt latest snapshot ignored: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("🔶 Cannot read latest snapshot: {}", e);
                None
            }
        }
    }

    /// 讀所有帶時間戳的歷史快照，照產生時間排序
    pub fn load_history(&self) -> Vec<Snapshot> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut history: Vec<Snapshot> = entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with("snapshot_") && name.ends_with(".json")
            })
            .filter_map(|entry| {
                let content = std::fs::read_to_string(entry.path()).ok()?;
                match serde_json::from_str::<Snapshot>(&content) {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        tracing::warn!(
                            "🔶 Skipping corrupt history snapshot {:?}: {}",
                            entry.file_name(),
                            e
                        );
                        None
                    }
                }
            })
            .collect();

        history.sort_by_key(|s| s.generated_at_utc);
        history
    }

    /// 落盤：覆寫 latest.json，並新增 snapshot_<時間戳>.json
    pub fn save(&self, snapshot: &Snapshot) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir)?;

        // BTreeMap 欄位讓輸出 key 有序，等同 sort_keys
        let json = serde_json::to_string_pretty(snapshot)?;

        let latest = self.latest_path();
        std::fs::write(&latest, &json)?;

        let stamped = self.dir.join(format!(
            "snapshot_{}.json",
            snapshot.generated_at_utc.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&stamped, &json)?;

        tracing::info!("💾 Snapshot saved to {:?} and {:?}", latest, stamped);
        Ok(vec![latest, stamped])
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 每筆不動產的 QoQ 變化。沒有上一季或是新 key 都算 0。
pub fn qoq_deltas(
    current: &[RealEstateValue],
    previous: Option<&Snapshot>,
) -> HashMap<String, f64> {
    let mut deltas = HashMap::new();
    for value in current {
        let delta = match previous.and_then(|p| p.real_estate.get(&value.key)) {
            Some(prev_value) => value.owned_value - prev_value,
            None => 0.0,
        };
        deltas.insert(value.key.clone(), delta);
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ValuationMode;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn snapshot_at(y: i32, m: u32, d: u32, home_value: f64) -> Snapshot {
        let mut snap = Snapshot::new(Utc.with_ymd_and_hms(y, m, d, 6, 0, 0).unwrap());
        snap.real_estate
            .insert("primary_home".to_string(), home_value);
        snap
    }

    fn value(key: &str, owned: f64) -> RealEstateValue {
        RealEstateValue {
            key: key.to_string(),
            label: key.to_string(),
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
    fn test_save_writes_latest_and_stamped_copy() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path());

        let snap = snapshot_at(2026, 8, 6, 850_000.0);
        let paths = store.save(&snap).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(temp_dir.path().join("latest.json").exists());
        assert!(temp_dir
            .path()
            .join("snapshot_20260806_060000.json")
            .exists());

        let loaded = store.load_latest().unwrap();
        assert_eq!(loaded.real_estate.get("primary_home"), Some(&850_000.0));
    }

    #[test]
    fn test_missing_latest_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path());
        assert!(store.load_latest().is_none());
    }

    #[test]
    fn test_corrupt_latest_is_none() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("latest.json"), "{not json").unwrap();

        let store = SnapshotStore::new(temp_dir.path());
        assert!(store.load_latest().is_none());
    }

    #[test]
    fn test_history_sorted_and_skips_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path());

        // 故意亂序寫入
        store.save(&snapshot_at(2026, 5, 6, 2.0)).unwrap();
        store.save(&snapshot_at(2025, 11, 6, 1.0)).unwrap();
        std::fs::write(temp_dir.path().join("snapshot_garbage.json"), "{").unwrap();

        let history = store.load_history();
        assert_eq!(history.len(), 2);
        assert!(history[0].generated_at_utc < history[1].generated_at_utc);
        assert_eq!(history[0].real_estate.get("primary_home"), Some(&1.0));
    }

    #[test]
    fn test_qoq_deltas() {
        let previous = snapshot_at(2026, 5, 6, 800_000.0);
        let current = vec![value("primary_home", 850_000.0), value("celina_land", 125_000.0)];

        let deltas = qoq_deltas(&current, Some(&previous));
        assert_eq!(deltas.get("primary_home"), Some(&50_000.0));
        // 上一季沒有的 key -> 0
        assert_eq!(deltas.get("celina_land"), Some(&0.0));

        let deltas = qoq_deltas(&current, None);
        assert_eq!(deltas.get("primary_home"), Some(&0.0));
    }
}
