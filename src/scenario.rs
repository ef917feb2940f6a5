use crate::data::{Class, Lesson, SchoolConfig, ScenarioState, Teacher, Timetable};
use log::debug;
use std::collections::HashSet;

/// Resolves the what-if overlay for the selected day.
///
/// Pure function over the frozen base timetable: active scenarios are applied
/// in a fixed precedence order and the result is a new timetable; the base is
/// never touched. Scenarios referencing teachers or classes that no longer
/// exist are treated as inactive.
///
/// Precedence:
/// 1. lab unavailable — matching subjects become free periods
/// 2. teacher absent — slots go free, or to the substitute when one is
///    defined for that teacher and idle at the slot in the base schedule
/// 3. shortened day — periods at or past the cut become free
/// 4. emergency free — the named (class, period) goes free no matter what
pub fn apply_scenarios(
    base: &Timetable,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
    state: &ScenarioState,
) -> Timetable {
    let day = state.selected_day;
    if day >= config.days.len() {
        return base.clone();
    }

    let mut other_days: Vec<Lesson> = base
        .lessons
        .iter()
        .filter(|l| l.day != day)
        .cloned()
        .collect();
    let mut day_lessons: Vec<Lesson> = base
        .lessons
        .iter()
        .filter(|l| l.day == day)
        .cloned()
        .collect();
    let scenarios = &state.scenarios;

    // 1. lab unavailable
    if let Some(lab) = scenarios.lab_unavailable.as_ref().filter(|s| s.active) {
        let closed: HashSet<&str> = lab.subjects.iter().map(String::as_str).collect();
        day_lessons.retain(|l| !closed.contains(l.subject.as_str()));
    }

    // 2. teacher absent, with optional substitution
    if let Some(absent) = scenarios.teacher_absent.as_ref().filter(|s| s.active) {
        if teachers.iter().any(|t| t.id == absent.teacher_id) {
            let substitute = scenarios
                .substitute
                .as_ref()
                .filter(|s| s.active && s.original_teacher == absent.teacher_id)
                .map(|s| s.substitute_teacher.as_str())
                .filter(|sub| teachers.iter().any(|t| t.id == *sub));

            let mut resolved = Vec::with_capacity(day_lessons.len());
            for mut lesson in day_lessons {
                if lesson.teacher_id != absent.teacher_id {
                    resolved.push(lesson);
                    continue;
                }
                match substitute {
                    // the substitute steps in only where the base schedule has them idle
                    Some(sub) if !base.teacher_busy(sub, day, lesson.period) => {
                        lesson.teacher_id = sub.to_string();
                        resolved.push(lesson);
                    }
                    _ => {}
                }
            }
            day_lessons = resolved;
        } else {
            debug!(
                "Ignoring absence of unknown teacher {}.",
                absent.teacher_id
            );
        }
    }

    // 3. shortened day
    if let Some(short) = scenarios.shortened_day.as_ref().filter(|s| s.active) {
        day_lessons.retain(|l| l.period < short.max_periods);
    }

    // 4. emergency free period
    if let Some(free) = scenarios.emergency_free.as_ref().filter(|s| s.active) {
        if classes.iter().any(|c| c.id == free.class_id) {
            day_lessons.retain(|l| !(l.class_id == free.class_id && l.period == free.period));
        } else {
            debug!("Ignoring emergency free for unknown class {}.", free.class_id);
        }
    }

    other_days.append(&mut day_lessons);
    Timetable::from_lessons(other_days)
}
