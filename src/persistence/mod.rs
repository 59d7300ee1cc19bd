//! Level progress save data
//!
//! One JSON file with an entry per level number. Completing a level records
//! its report; the best result is kept and a perfect rating is never lost.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::CompletionReport;

/// Progress on a single level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelProgress {
    pub completed: bool,
    /// Finished within par at least once
    pub perfect: bool,
    /// Fewest moves used to finish
    pub best_moves: Option<u32>,
}

/// Everything written to the save file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(default)]
    pub levels: BTreeMap<u32, LevelProgress>,
}

impl SaveData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion. Returns true if it improved on the stored result.
    pub fn record(&mut self, report: &CompletionReport) -> bool {
        let entry = self.levels.entry(report.level).or_default();
        let improved = !entry.completed
            || (report.perfect() && !entry.perfect)
            || entry.best_moves.is_none_or(|best| report.total_moves < best);

        entry.completed = true;
        entry.perfect |= report.perfect();
        entry.best_moves = Some(
            entry
                .best_moves
                .map_or(report.total_moves, |best| best.min(report.total_moves)),
        );

        if improved {
            log::info!(
                "Level {} progress updated: {} moves{}",
                report.level,
                report.total_moves,
                if entry.perfect { " (perfect)" } else { "" }
            );
        }
        improved
    }

    pub fn progress(&self, level: u32) -> Option<&LevelProgress> {
        self.levels.get(&level)
    }

    pub fn is_completed(&self, level: u32) -> bool {
        self.progress(level).is_some_and(|p| p.completed)
    }

    pub fn is_perfect(&self, level: u32) -> bool {
        self.progress(level).is_some_and(|p| p.perfect)
    }

    /// Number of levels finished
    pub fn completed_count(&self) -> usize {
        self.levels.values().filter(|p| p.completed).count()
    }

    /// Read save data from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        let data: Self = serde_json::from_str(&json)?;
        log::info!("Loaded progress for {} levels", data.levels.len());
        Ok(data)
    }

    /// Read save data, starting fresh if there is none or it is unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("No usable save data, starting fresh: {e}");
                Self::new()
            }
        }
    }

    /// Write save data to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ConfigError::write(path, e))?;
        log::info!("Progress saved ({} levels)", self.levels.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(level: u32, total_moves: u32, par_moves: u32) -> CompletionReport {
        CompletionReport {
            level,
            total_moves,
            par_moves,
        }
    }

    #[test]
    fn test_record_keeps_best() {
        let mut save = SaveData::new();
        assert!(!save.is_completed(3));

        assert!(save.record(&report(3, 6, 4)));
        assert!(save.is_completed(3));
        assert!(!save.is_perfect(3));
        assert_eq!(save.progress(3).unwrap().best_moves, Some(6));

        // Worse run changes nothing
        assert!(!save.record(&report(3, 8, 4)));
        assert_eq!(save.progress(3).unwrap().best_moves, Some(6));

        assert!(save.record(&report(3, 4, 4)));
        assert!(save.is_perfect(3));
        assert_eq!(save.progress(3).unwrap().best_moves, Some(4));
    }

    #[test]
    fn test_perfect_is_sticky() {
        let mut save = SaveData::new();
        save.record(&report(1, 2, 3));
        save.record(&report(1, 9, 3));
        assert!(save.is_perfect(1));
        assert_eq!(save.completed_count(), 1);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("tether-path-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("save.json");

        let mut save = SaveData::new();
        save.record(&report(2, 5, 5));
        save.save(&path).unwrap();
        assert_eq!(SaveData::load(&path).unwrap(), save);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = Path::new("/nonexistent/tether-path/save.json");
        assert!(matches!(SaveData::load(path), Err(ConfigError::Read { .. })));
        assert_eq!(SaveData::load_or_default(path), SaveData::new());
    }
}
