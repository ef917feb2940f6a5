use crate::check::{Violation, verify_timetable};
use crate::data::{Class, DayIndex, Lesson, PeriodIndex, SchoolConfig, Teacher, Timetable};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

/// Upper bound on force-fit passes before giving up.
pub const MAX_REPAIR_PASSES: u32 = 10;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("repair pass hit inconsistent state: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RepairStatus {
    /// Every violation was resolved.
    Clean,
    /// The pass cap or a fixed point was reached with violations left over.
    Residual,
    /// A pass failed; the schedule was restored to the last known-good one.
    RolledBack,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub timetable: Timetable,
    pub remaining: Vec<Violation>,
    pub passes: u32,
    pub status: RepairStatus,
}

/// One force-fit pass: relocate each violating assignment into a currently
/// free, constraint-respecting slot where one exists. Pure: returns a new
/// candidate, or `None` when no move was possible (fixed point).
///
/// Only daily overloads and teacher clashes have a relocation remedy; weekly
/// overloads and quota mismatches pass through untouched.
pub fn force_fit_pass(
    timetable: &Timetable,
    violations: &[Violation],
    config: &SchoolConfig,
    teachers: &[Teacher],
) -> Result<Option<Timetable>, RepairError> {
    let mut lessons = timetable.lessons.clone();
    let mut moved = false;

    for violation in violations {
        match violation {
            Violation::DailyOverload {
                teacher_id, day, ..
            } => {
                let teacher = lookup_teacher(teachers, teacher_id)?;
                // bump the latest period that teacher holds on the loaded day
                let idx = lessons
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.teacher_id == *teacher_id && l.day == *day)
                    .max_by(|(_, a), (_, b)| {
                        (a.period, &a.class_id).cmp(&(b.period, &b.class_id))
                    })
                    .map(|(i, _)| i);
                let Some(idx) = idx else { continue };
                if let Some((d2, p2)) = find_free_slot(&lessons, &lessons[idx], teacher, config, true)
                {
                    debug!(
                        "force-fit: moving {} to day {} period {}",
                        lessons[idx], d2, p2
                    );
                    lessons[idx].day = d2;
                    lessons[idx].period = p2;
                    moved = true;
                }
            }
            Violation::TeacherClash {
                teacher_id,
                day,
                period,
            } => {
                let teacher = lookup_teacher(teachers, teacher_id)?;
                let clashing: Vec<usize> = lessons
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| {
                        l.teacher_id == *teacher_id && l.day == *day && l.period == *period
                    })
                    .map(|(i, _)| i)
                    .collect();
                // keep the first booking in place, relocate the second
                if let Some(&idx) = clashing.get(1) {
                    if let Some((d2, p2)) =
                        find_free_slot(&lessons, &lessons[idx], teacher, config, false)
                    {
                        debug!(
                            "force-fit: moving {} to day {} period {}",
                            lessons[idx], d2, p2
                        );
                        lessons[idx].day = d2;
                        lessons[idx].period = p2;
                        moved = true;
                    }
                }
            }
            // not fixable by moving lessons around
            Violation::WeeklyOverload { .. }
            | Violation::QuotaMismatch { .. }
            | Violation::ClassClash { .. }
            | Violation::InvalidSlot { .. } => {}
        }
    }

    Ok(moved.then(|| Timetable::from_lessons(lessons)))
}

/// Drives [`force_fit_pass`] to a fixed point or the pass cap. On a step
/// error all partial repair is discarded and `known_good` is restored; the
/// violations that prompted the repair are still reported.
pub fn repair_with_rollback(
    candidate: Timetable,
    known_good: &Timetable,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
) -> RepairOutcome {
    let mut current = candidate;
    let mut passes = 0;

    while passes < MAX_REPAIR_PASSES {
        let violations = verify_timetable(&current, config, teachers, classes);
        if !violations.iter().any(is_repairable) {
            return outcome(current, violations, passes);
        }
        match force_fit_pass(&current, &violations, config, teachers) {
            Ok(Some(next)) => {
                current = next;
                passes += 1;
            }
            Ok(None) => return outcome(current, violations, passes),
            Err(e) => {
                warn!("Repair failed after {passes} passes, restoring previous schedule: {e}");
                return RepairOutcome {
                    remaining: verify_timetable(&current, config, teachers, classes),
                    timetable: known_good.clone(),
                    passes,
                    status: RepairStatus::RolledBack,
                };
            }
        }
    }

    let remaining = verify_timetable(&current, config, teachers, classes);
    outcome(current, remaining, passes)
}

fn outcome(timetable: Timetable, remaining: Vec<Violation>, passes: u32) -> RepairOutcome {
    let status = if remaining.is_empty() {
        RepairStatus::Clean
    } else {
        RepairStatus::Residual
    };
    RepairOutcome {
        timetable,
        remaining,
        passes,
        status,
    }
}

fn is_repairable(violation: &Violation) -> bool {
    matches!(
        violation,
        Violation::DailyOverload { .. } | Violation::TeacherClash { .. }
    )
}

fn lookup_teacher<'a>(teachers: &'a [Teacher], id: &str) -> Result<&'a Teacher, RepairError> {
    teachers
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| RepairError::Inconsistent(format!("violation references unknown teacher {id}")))
}

/// A slot the lesson can move to without breaking any hard constraint:
/// assignable period, class idle, teacher idle, target-day cap respected.
fn find_free_slot(
    lessons: &[Lesson],
    moving: &Lesson,
    teacher: &Teacher,
    config: &SchoolConfig,
    different_day: bool,
) -> Option<(DayIndex, PeriodIndex)> {
    for d2 in 0..config.days.len() {
        if different_day && d2 == moving.day {
            continue;
        }
        if d2 != moving.day {
            let day_count = lessons
                .iter()
                .filter(|l| l.teacher_id == moving.teacher_id && l.day == d2)
                .count() as u32;
            if day_count + 1 > teacher.max_periods_per_day {
                continue;
            }
        }
        for p2 in config.assignable_periods() {
            if d2 == moving.day && p2 == moving.period {
                continue;
            }
            let class_taken = lessons
                .iter()
                .any(|l| l.class_id == moving.class_id && l.day == d2 && l.period == p2);
            let teacher_taken = lessons
                .iter()
                .any(|l| l.teacher_id == moving.teacher_id && l.day == d2 && l.period == p2);
            if !class_taken && !teacher_taken {
                return Some((d2, p2));
            }
        }
    }
    None
}
