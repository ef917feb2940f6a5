use crate::data::{Class, ClassPriorityConfig, ScenarioState, SchoolConfig, Teacher, Timetable};
use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

const TEACHERS_FILE: &str = "teachers.json";
const CLASSES_FILE: &str = "classes.json";
const CONFIG_FILE: &str = "config.json";
const PRIORITY_CONFIGS_FILE: &str = "priority_configs.json";
const BASE_TIMETABLE_FILE: &str = "base_timetable.json";
const SCENARIO_STATE_FILE: &str = "scenario_state.json";
const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One activity-log record. The engine only appends these; it never reads
/// them back for correctness.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub ts: DateTime<Utc>,
    pub action: String,
    pub target: String,
    pub summary: String,
    #[serde(default)]
    pub details: String,
}

impl HistoryEntry {
    pub fn new(action: &str, target: &str, summary: &str, details: &str) -> Self {
        Self {
            ts: Utc::now(),
            action: action.to_string(),
            target: target.to_string(),
            summary: summary.to_string(),
            details: details.to_string(),
        }
    }
}

/// File-backed persistence: one JSON document per collection under a single
/// data directory. A missing file loads as the empty value.
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    fn load_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(self.path(file), raw)?;
        Ok(())
    }

    fn remove(&self, file: &str) -> Result<(), StorageError> {
        let path = self.path(file);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    // teachers
    pub fn load_teachers(&self) -> Result<Vec<Teacher>, StorageError> {
        Ok(self.load_json(TEACHERS_FILE)?.unwrap_or_default())
    }

    pub fn save_teachers(&self, teachers: &[Teacher]) -> Result<(), StorageError> {
        self.save_json(TEACHERS_FILE, &teachers)
    }

    // classes
    pub fn load_classes(&self) -> Result<Vec<Class>, StorageError> {
        Ok(self.load_json(CLASSES_FILE)?.unwrap_or_default())
    }

    pub fn save_classes(&self, classes: &[Class]) -> Result<(), StorageError> {
        self.save_json(CLASSES_FILE, &classes)
    }

    // school config
    pub fn load_config(&self) -> Result<Option<SchoolConfig>, StorageError> {
        self.load_json(CONFIG_FILE)
    }

    pub fn save_config(&self, config: &SchoolConfig) -> Result<(), StorageError> {
        self.save_json(CONFIG_FILE, config)
    }

    // priority configs
    pub fn load_priority_configs(&self) -> Result<Vec<ClassPriorityConfig>, StorageError> {
        Ok(self.load_json(PRIORITY_CONFIGS_FILE)?.unwrap_or_default())
    }

    pub fn save_priority_configs(
        &self,
        configs: &[ClassPriorityConfig],
    ) -> Result<(), StorageError> {
        self.save_json(PRIORITY_CONFIGS_FILE, &configs)
    }

    // the last generated base timetable
    pub fn load_base_timetable(&self) -> Result<Option<Timetable>, StorageError> {
        self.load_json(BASE_TIMETABLE_FILE)
    }

    pub fn save_base_timetable(&self, timetable: &Timetable) -> Result<(), StorageError> {
        self.save_json(BASE_TIMETABLE_FILE, timetable)
    }

    pub fn clear_base_timetable(&self) -> Result<(), StorageError> {
        self.remove(BASE_TIMETABLE_FILE)
    }

    // what-if scenario state
    pub fn load_scenario_state(&self) -> Result<Option<ScenarioState>, StorageError> {
        self.load_json(SCENARIO_STATE_FILE)
    }

    pub fn save_scenario_state(&self, state: &ScenarioState) -> Result<(), StorageError> {
        self.save_json(SCENARIO_STATE_FILE, state)
    }

    // activity history (append-only JSONL)
    pub fn append_history(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(HISTORY_FILE))?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
        Ok(())
    }

    pub fn load_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        let path = self.path(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable history line: {e}"),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassSubject, Lesson, ScenarioSet, TeacherAbsent};
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn missing_files_load_as_empty_values() {
        let (_dir, storage) = storage();
        assert!(storage.load_teachers().unwrap().is_empty());
        assert!(storage.load_classes().unwrap().is_empty());
        assert!(storage.load_config().unwrap().is_none());
        assert!(storage.load_base_timetable().unwrap().is_none());
        assert!(storage.load_scenario_state().unwrap().is_none());
        assert!(storage.load_history().unwrap().is_empty());
    }

    #[test]
    fn teachers_round_trip() {
        let (_dir, storage) = storage();
        let teachers = vec![Teacher {
            id: "t1".into(),
            name: "Eric Simon".into(),
            subjects: vec!["Physics".into()],
            eligible_sections: vec!["11SCI".into()],
            max_periods_per_day: 5,
            max_periods_per_week: 30,
        }];

        storage.save_teachers(&teachers).unwrap();
        assert_eq!(storage.load_teachers().unwrap(), teachers);
    }

    #[test]
    fn classes_and_config_round_trip() {
        let (_dir, storage) = storage();
        let classes = vec![Class {
            id: "11SCI".into(),
            name: "11 Science".into(),
            subjects: vec![ClassSubject {
                subject: "Physics".into(),
                weekly_periods: 6,
                teacher_id: "t1".into(),
            }],
        }];
        let mut config = SchoolConfig::default();
        config.break_periods.insert(3, "Lunch".into());

        storage.save_classes(&classes).unwrap();
        storage.save_config(&config).unwrap();

        assert_eq!(storage.load_classes().unwrap(), classes);
        assert_eq!(storage.load_config().unwrap(), Some(config));
    }

    #[test]
    fn base_timetable_round_trips_and_clears() {
        let (_dir, storage) = storage();
        let tt = Timetable::from_lessons(vec![Lesson {
            class_id: "11SCI".into(),
            day: 0,
            period: 1,
            subject: "Physics".into(),
            teacher_id: "t1".into(),
        }]);

        storage.save_base_timetable(&tt).unwrap();
        assert_eq!(storage.load_base_timetable().unwrap(), Some(tt));

        storage.clear_base_timetable().unwrap();
        assert!(storage.load_base_timetable().unwrap().is_none());
    }

    #[test]
    fn scenario_state_round_trips() {
        let (_dir, storage) = storage();
        let state = ScenarioState {
            selected_day: 3,
            scenarios: ScenarioSet {
                teacher_absent: Some(TeacherAbsent {
                    active: true,
                    teacher_id: "t1".into(),
                }),
                ..Default::default()
            },
        };

        storage.save_scenario_state(&state).unwrap();
        assert_eq!(storage.load_scenario_state().unwrap(), Some(state));
    }

    #[test]
    fn history_appends_in_order() {
        let (_dir, storage) = storage();
        storage
            .append_history(&HistoryEntry::new("generate", "Timetable", "first", ""))
            .unwrap();
        storage
            .append_history(&HistoryEntry::new("edit", "Slot", "second", "details"))
            .unwrap();

        let history = storage.load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].summary, "first");
        assert_eq!(history[1].action, "edit");
    }
}
