use crate::data::{Class, DayIndex, PeriodIndex, SchoolConfig, Teacher, Timetable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A hard-constraint breach found in a materialized timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Violation {
    /// A (class, subject, teacher) triple is assigned more or fewer slots
    /// than its declared weekly quota.
    QuotaMismatch {
        class_id: String,
        subject: String,
        assigned: u32,
        required: u32,
    },
    /// A teacher occupies two different slots at the same (day, period).
    TeacherClash {
        teacher_id: String,
        day: DayIndex,
        period: PeriodIndex,
    },
    /// A class carries two subjects in the same (day, period).
    ClassClash {
        class_id: String,
        day: DayIndex,
        period: PeriodIndex,
    },
    DailyOverload {
        teacher_id: String,
        day: DayIndex,
        count: u32,
        max: u32,
    },
    WeeklyOverload {
        teacher_id: String,
        count: u32,
        max: u32,
    },
    /// A lesson sits on a break period or outside the calendar.
    InvalidSlot {
        class_id: String,
        day: DayIndex,
        period: PeriodIndex,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::QuotaMismatch {
                class_id,
                subject,
                assigned,
                required,
            } => write!(
                f,
                "{class_id}: {subject} has {assigned} periods, requires {required}"
            ),
            Violation::TeacherClash {
                teacher_id,
                day,
                period,
            } => write!(
                f,
                "{teacher_id} is double-booked on day {day} period {period}"
            ),
            Violation::ClassClash {
                class_id,
                day,
                period,
            } => write!(
                f,
                "{class_id} has two subjects on day {day} period {period}"
            ),
            Violation::DailyOverload {
                teacher_id,
                day,
                count,
                max,
            } => write!(
                f,
                "{teacher_id}: {count} periods on day {day} (max {max})"
            ),
            Violation::WeeklyOverload {
                teacher_id,
                count,
                max,
            } => write!(f, "{teacher_id}: {count} periods this week (max {max})"),
            Violation::InvalidSlot {
                class_id,
                day,
                period,
            } => write!(
                f,
                "{class_id} has a lesson on day {day} period {period}, which is not assignable"
            ),
        }
    }
}

/// Checks a timetable against every hard constraint of the assignment model.
/// Returns an empty vec for a valid timetable. Total: unknown teachers or
/// classes in the lesson list degrade to quota findings, never to a panic.
pub fn verify_timetable(
    timetable: &Timetable,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    // calendar bounds and break periods
    for lesson in &timetable.lessons {
        if lesson.day >= config.days.len()
            || lesson.period >= config.periods_per_day
            || config.is_break(lesson.period)
        {
            violations.push(Violation::InvalidSlot {
                class_id: lesson.class_id.clone(),
                day: lesson.day,
                period: lesson.period,
            });
        }
    }

    // exactly-N per declared (class, subject, teacher) triple
    let mut assigned: BTreeMap<(&str, &str, &str), u32> = BTreeMap::new();
    for l in &timetable.lessons {
        *assigned
            .entry((l.class_id.as_str(), l.subject.as_str(), l.teacher_id.as_str()))
            .or_default() += 1;
    }
    let mut declared: BTreeMap<(&str, &str, &str), u32> = BTreeMap::new();
    for class in classes {
        for cs in &class.subjects {
            declared.insert(
                (class.id.as_str(), cs.subject.as_str(), cs.teacher_id.as_str()),
                cs.weekly_periods,
            );
        }
    }
    for (key, required) in &declared {
        let got = assigned.get(key).copied().unwrap_or(0);
        if got != *required {
            violations.push(Violation::QuotaMismatch {
                class_id: key.0.to_string(),
                subject: key.1.to_string(),
                assigned: got,
                required: *required,
            });
        }
    }
    for (key, got) in &assigned {
        if !declared.contains_key(key) {
            violations.push(Violation::QuotaMismatch {
                class_id: key.0.to_string(),
                subject: key.1.to_string(),
                assigned: *got,
                required: 0,
            });
        }
    }

    // no teacher double-booking
    let mut slot_counts: BTreeMap<(&str, DayIndex, PeriodIndex), u32> = BTreeMap::new();
    for l in &timetable.lessons {
        *slot_counts
            .entry((l.teacher_id.as_str(), l.day, l.period))
            .or_default() += 1;
    }
    for ((tid, day, period), count) in &slot_counts {
        if *count > 1 {
            violations.push(Violation::TeacherClash {
                teacher_id: tid.to_string(),
                day: *day,
                period: *period,
            });
        }
    }

    // at most one subject per class slot
    let mut class_slots: BTreeMap<(&str, DayIndex, PeriodIndex), u32> = BTreeMap::new();
    for l in &timetable.lessons {
        *class_slots
            .entry((l.class_id.as_str(), l.day, l.period))
            .or_default() += 1;
    }
    for ((cid, day, period), count) in &class_slots {
        if *count > 1 {
            violations.push(Violation::ClassClash {
                class_id: cid.to_string(),
                day: *day,
                period: *period,
            });
        }
    }

    // per-teacher load caps
    for teacher in teachers {
        let mut week_total = 0u32;
        for day in 0..config.days.len() {
            let count = timetable
                .lessons
                .iter()
                .filter(|l| l.teacher_id == teacher.id && l.day == day)
                .count() as u32;
            week_total += count;
            if count > teacher.max_periods_per_day {
                violations.push(Violation::DailyOverload {
                    teacher_id: teacher.id.clone(),
                    day,
                    count,
                    max: teacher.max_periods_per_day,
                });
            }
        }
        if week_total > teacher.max_periods_per_week {
            violations.push(Violation::WeeklyOverload {
                teacher_id: teacher.id.clone(),
                count: week_total,
                max: teacher.max_periods_per_week,
            });
        }
    }

    violations
}
