use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type TeacherId = String;
pub type ClassId = String;
pub type Subject = String;
pub type DayIndex = usize;
pub type PeriodIndex = usize;

/// A teacher with their load limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub subjects: Vec<Subject>,
    /// Sections (class ids) this teacher may be assigned to. Empty = no restriction.
    #[serde(default)]
    pub eligible_sections: Vec<ClassId>,
    pub max_periods_per_day: u32,
    pub max_periods_per_week: u32,
}

impl Teacher {
    pub fn can_teach_section(&self, class_id: &str) -> bool {
        self.eligible_sections.is_empty() || self.eligible_sections.iter().any(|s| s == class_id)
    }
}

/// One subject requirement of a class: how many periods per week, taught by whom.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSubject {
    pub subject: Subject,
    pub weekly_periods: u32,
    pub teacher_id: TeacherId,
}

/// A class (section) with its weekly subject requirements.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub subjects: Vec<ClassSubject>,
}

/// The school calendar: day names, periods per day, and fixed break periods.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolConfig {
    pub days: Vec<String>,
    pub periods_per_day: usize,
    /// period index -> break label, e.g. {3: "Lunch"}. Break periods are never assignable.
    #[serde(default)]
    pub break_periods: BTreeMap<PeriodIndex, String>,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            days: ["Mon", "Tue", "Wed", "Thu", "Fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            periods_per_day: 8,
            break_periods: BTreeMap::new(),
        }
    }
}

impl SchoolConfig {
    pub fn is_break(&self, period: PeriodIndex) -> bool {
        self.break_periods.contains_key(&period)
    }

    /// Period indices that can carry a lesson, in order.
    pub fn assignable_periods(&self) -> impl Iterator<Item = PeriodIndex> + '_ {
        (0..self.periods_per_day).filter(|p| !self.is_break(*p))
    }
}

/// Optional per-class soft preferences. Absence means no preferences apply.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPriorityConfig {
    pub class_id: ClassId,
    /// Prefer early periods for these subjects.
    #[serde(default)]
    pub priority_subjects: Vec<Subject>,
    /// May be bumped by the repair loop without hurting correctness.
    #[serde(default)]
    pub weak_subjects: Vec<Subject>,
    /// Avoid scheduling these back-to-back.
    #[serde(default)]
    pub heavy_subjects: Vec<Subject>,
}

/// A single assigned slot: (class, day, period) carries (subject, teacher).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub class_id: ClassId,
    pub day: DayIndex,
    pub period: PeriodIndex,
    pub subject: Subject,
    pub teacher_id: TeacherId,
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} d{}p{}: {} ({})",
            self.class_id, self.day, self.period, self.subject, self.teacher_id
        )
    }
}

/// A complete assignment of lessons to slots. Kept sorted for stable output
/// and round-trip fidelity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub lessons: Vec<Lesson>,
}

impl Timetable {
    pub fn from_lessons(mut lessons: Vec<Lesson>) -> Self {
        lessons.sort();
        Self { lessons }
    }

    pub fn get(&self, class_id: &str, day: DayIndex, period: PeriodIndex) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.class_id == class_id && l.day == day && l.period == period)
    }

    pub fn teacher_busy(&self, teacher_id: &str, day: DayIndex, period: PeriodIndex) -> bool {
        self.lessons
            .iter()
            .any(|l| l.teacher_id == teacher_id && l.day == day && l.period == period)
    }

    /// A copy with the slot (class, day, period) replaced by `lesson`.
    pub fn with_lesson(&self, lesson: Lesson) -> Self {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|l| {
                !(l.class_id == lesson.class_id && l.day == lesson.day && l.period == lesson.period)
            })
            .cloned()
            .collect();
        lessons.push(lesson);
        Self::from_lessons(lessons)
    }
}

/// One entry of the inverted, per-teacher view.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSlot {
    pub day: DayIndex,
    pub period: PeriodIndex,
    pub class_id: ClassId,
    pub subject: Subject,
}

/// Per-teacher view of a timetable: teacher -> occupied slots.
pub type TeacherView = BTreeMap<TeacherId, Vec<TeacherSlot>>;

// --- what-if scenario state ---------------------------------------------

/// The persisted what-if configuration: a selected day plus scenario toggles.
/// Consumed transiently by the overlay engine; never mutates the base timetable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioState {
    pub selected_day: DayIndex,
    pub scenarios: ScenarioSet,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioSet {
    pub teacher_absent: Option<TeacherAbsent>,
    pub substitute: Option<Substitution>,
    pub lab_unavailable: Option<LabUnavailable>,
    pub shortened_day: Option<ShortenedDay>,
    pub emergency_free: Option<EmergencyFree>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAbsent {
    pub active: bool,
    pub teacher_id: TeacherId,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub active: bool,
    pub original_teacher: TeacherId,
    pub substitute_teacher: TeacherId,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabUnavailable {
    pub active: bool,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenedDay {
    pub active: bool,
    pub max_periods: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyFree {
    pub active: bool,
    pub class_id: ClassId,
    pub period: PeriodIndex,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(class_id: &str, day: usize, period: usize, subject: &str, teacher: &str) -> Lesson {
        Lesson {
            class_id: class_id.to_string(),
            day,
            period,
            subject: subject.to_string(),
            teacher_id: teacher.to_string(),
        }
    }

    #[test]
    fn break_periods_are_not_assignable() {
        let mut config = SchoolConfig {
            days: vec!["Mon".into(), "Tue".into()],
            periods_per_day: 6,
            break_periods: BTreeMap::new(),
        };
        config.break_periods.insert(3, "Lunch".to_string());

        assert!(config.is_break(3));
        assert!(!config.is_break(2));
        let assignable: Vec<usize> = config.assignable_periods().collect();
        assert_eq!(assignable, vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn with_lesson_replaces_the_slot() {
        let base = Timetable::from_lessons(vec![
            lesson("10A", 0, 0, "Math", "t1"),
            lesson("10A", 0, 1, "English", "t2"),
        ]);
        let edited = base.with_lesson(lesson("10A", 0, 0, "Physics", "t3"));

        assert_eq!(edited.lessons.len(), 2);
        assert_eq!(edited.get("10A", 0, 0).unwrap().subject, "Physics");
        // base untouched
        assert_eq!(base.get("10A", 0, 0).unwrap().subject, "Math");
    }

    #[test]
    fn timetable_round_trips_through_serde() {
        let tt = Timetable::from_lessons(vec![
            lesson("10A", 0, 0, "Math", "t1"),
            lesson("10B", 4, 7, "History", "t2"),
        ]);
        let json = serde_json::to_string(&tt).unwrap();
        let back: Timetable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tt);
    }

    #[test]
    fn scenario_state_round_trips_through_serde() {
        let state = ScenarioState {
            selected_day: 2,
            scenarios: ScenarioSet {
                teacher_absent: Some(TeacherAbsent {
                    active: true,
                    teacher_id: "t1".into(),
                }),
                substitute: Some(Substitution {
                    active: true,
                    original_teacher: "t1".into(),
                    substitute_teacher: "t2".into(),
                }),
                lab_unavailable: Some(LabUnavailable {
                    active: false,
                    subjects: vec!["Physics".into()],
                }),
                shortened_day: None,
                emergency_free: None,
            },
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: ScenarioState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn empty_scenario_state_deserializes_from_defaults() {
        let state: ScenarioState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.selected_day, 0);
        assert!(state.scenarios.teacher_absent.is_none());
    }
}
