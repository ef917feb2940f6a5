use crate::data::{
    Class, ClassPriorityConfig, Lesson, SchoolConfig, Teacher, TeacherSlot, TeacherView, Timetable,
};
use crate::model::{declare_variables, hard_constraints};
use crate::objective::build_objective;
use good_lp::{ProblemVariables, Solution, SolverModel, default_solver};
use itertools::Itertools;
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use thiserror::Error;

/// Wall-clock budget handed to the MILP backend.
pub const DEFAULT_TIME_BUDGET_SECS: f64 = 30.0;

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    /// The model is infeasible, or the time budget ran out before a feasible
    /// point was found. The two are indistinguishable to the caller.
    #[error("no feasible timetable found: the constraints cannot be met, or the time budget was too small to find a solution")]
    NoSolution,
    /// The domain data is structurally broken and was never handed to the solver.
    #[error("invalid domain data: {0}")]
    InvalidDomain(String),
}

/// Solves the timetable under the default time budget.
pub fn solve_timetable(
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
    priority_configs: &[ClassPriorityConfig],
) -> Result<Timetable, SolveError> {
    solve_timetable_with_budget(
        config,
        teachers,
        classes,
        priority_configs,
        DEFAULT_TIME_BUDGET_SECS,
    )
}

/// Builds the full MILP model and solves it with the HiGHS backend.
///
/// Returns the materialized timetable, or [`SolveError::NoSolution`] when the
/// solver proves infeasibility or exhausts the budget without an incumbent.
/// Does not mutate the domain model.
pub fn solve_timetable_with_budget(
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
    priority_configs: &[ClassPriorityConfig],
    time_budget_secs: f64,
) -> Result<Timetable, SolveError> {
    validate_domain(config, teachers, classes)?;

    let start_time = Instant::now();
    info!(
        "Setting up ILP model with {} classes, {} teachers, {} days x {} periods...",
        classes.len(),
        teachers.len(),
        config.days.len(),
        config.periods_per_day
    );

    let mut problem = ProblemVariables::new();
    let model_vars = declare_variables(&mut problem, config, teachers, classes);

    if !model_vars.unplaceable.is_empty() {
        for (class_id, subject) in &model_vars.unplaceable {
            warn!(
                "No feasible slot for {subject} in class {class_id} (missing or ineligible teacher)."
            );
        }
        return Err(SolveError::NoSolution);
    }
    if model_vars.vars.is_empty() {
        info!("Nothing to schedule; returning an empty timetable.");
        return Ok(Timetable::default());
    }

    let objective = build_objective(&mut problem, &model_vars, config, classes, priority_configs);

    let mut model = problem
        .maximise(objective.expr)
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", 1234) // fixed seed for reproducibility
        .set_option("time_limit", time_budget_secs)
        .set_option("log_to_console", "false");

    for c in hard_constraints(&model_vars, config, teachers, classes) {
        model.add_constraint(c);
    }
    for c in objective.links {
        model.add_constraint(c);
    }

    info!("Starting ILP solver with a {time_budget_secs}s budget...");
    let solution = match model.solve() {
        Ok(s) => s,
        Err(e) => {
            // infeasible and timed-out-without-incumbent both land here
            warn!("Solver returned no solution: {e}");
            return Err(SolveError::NoSolution);
        }
    };
    info!("Solution found in {:.2?}", start_time.elapsed());

    // materialize the chosen variables
    let mut lessons = Vec::new();
    for ((ci, si, day, period), var) in &model_vars.vars {
        if solution.value(*var) > 0.9 {
            let class = &classes[*ci];
            let cs = &class.subjects[*si];
            lessons.push(Lesson {
                class_id: class.id.clone(),
                day: *day,
                period: *period,
                subject: cs.subject.clone(),
                teacher_id: cs.teacher_id.clone(),
            });
        }
    }

    Ok(Timetable::from_lessons(lessons))
}

/// Inverts a class timetable into the per-teacher view:
/// teacher -> [(day, period) -> (class, subject)].
pub fn invert_to_teacher_view(timetable: &Timetable) -> TeacherView {
    timetable
        .lessons
        .iter()
        .map(|l| {
            (
                l.teacher_id.clone(),
                TeacherSlot {
                    day: l.day,
                    period: l.period,
                    class_id: l.class_id.clone(),
                    subject: l.subject.clone(),
                },
            )
        })
        .into_group_map()
        .into_iter()
        .map(|(tid, mut slots)| {
            slots.sort_by_key(|s| (s.day, s.period));
            (tid, slots)
        })
        .collect::<BTreeMap<_, _>>()
}

/// Structural sanity checks collected in one pass, in the style of a
/// validation report: everything wrong is listed, not just the first finding.
fn validate_domain(
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
) -> Result<(), SolveError> {
    let mut errors = Vec::new();

    if config.days.is_empty() {
        errors.push("no school days configured".to_string());
    }
    if config.periods_per_day == 0 {
        errors.push("periods per day must be at least 1".to_string());
    }

    let mut teacher_ids = HashSet::new();
    for t in teachers {
        if !teacher_ids.insert(t.id.as_str()) {
            errors.push(format!("duplicate teacher id: {}", t.id));
        }
    }
    let mut class_ids = HashSet::new();
    for c in classes {
        if !class_ids.insert(c.id.as_str()) {
            errors.push(format!("duplicate class id: {}", c.id));
        }
        for cs in &c.subjects {
            if cs.weekly_periods == 0 {
                errors.push(format!(
                    "class {} declares {} with zero weekly periods",
                    c.id, cs.subject
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SolveError::InvalidDomain(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::verify_timetable;
    use crate::data::ClassSubject;
    use std::collections::BTreeMap;

    fn teacher(id: &str, max_day: u32, max_week: u32) -> Teacher {
        Teacher {
            id: id.to_string(),
            name: id.to_string(),
            subjects: vec!["Math".to_string(), "Science".to_string()],
            eligible_sections: vec![],
            max_periods_per_day: max_day,
            max_periods_per_week: max_week,
        }
    }

    fn class(id: &str, entries: &[(&str, u32, &str)]) -> Class {
        Class {
            id: id.to_string(),
            name: id.to_string(),
            subjects: entries
                .iter()
                .map(|(subject, weekly, tid)| ClassSubject {
                    subject: subject.to_string(),
                    weekly_periods: *weekly,
                    teacher_id: tid.to_string(),
                })
                .collect(),
        }
    }

    fn config(days: usize, periods: usize) -> SchoolConfig {
        SchoolConfig {
            days: (0..days).map(|d| format!("D{d}")).collect(),
            periods_per_day: periods,
            break_periods: BTreeMap::new(),
        }
    }

    #[test]
    fn two_classes_two_teachers_spread_across_the_week() {
        // 2 classes, 2 dedicated teachers, 5 days x 6 periods, 6 periods each
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 30), teacher("t2", 6, 30)];
        let classes = vec![
            class("A", &[("Math", 6, "t1")]),
            class("B", &[("Science", 6, "t2")]),
        ];

        let tt = solve_timetable(&cfg, &teachers, &classes, &[]).unwrap();

        assert_eq!(tt.lessons.len(), 12);
        assert_eq!(
            tt.lessons.iter().filter(|l| l.class_id == "A").count(),
            6
        );
        assert_eq!(
            tt.lessons.iter().filter(|l| l.class_id == "B").count(),
            6
        );
        assert!(verify_timetable(&tt, &cfg, &teachers, &classes).is_empty());
    }

    #[test]
    fn overloaded_teacher_yields_no_solution() {
        // 12 required periods against a weekly cap of 6
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 6)];
        let classes = vec![
            class("A", &[("Math", 6, "t1")]),
            class("B", &[("Math", 6, "t1")]),
        ];

        let result = solve_timetable(&cfg, &teachers, &classes, &[]);
        assert_eq!(result, Err(SolveError::NoSolution));
    }

    #[test]
    fn breaks_never_carry_lessons() {
        let mut cfg = config(5, 6);
        cfg.break_periods.insert(2, "Lunch".to_string());
        let teachers = vec![teacher("t1", 5, 25)];
        let classes = vec![class("A", &[("Math", 8, "t1")])];

        let tt = solve_timetable(&cfg, &teachers, &classes, &[]).unwrap();
        assert_eq!(tt.lessons.len(), 8);
        assert!(tt.lessons.iter().all(|l| l.period != 2));
    }

    #[test]
    fn missing_teacher_reference_yields_no_solution() {
        let cfg = config(5, 6);
        let classes = vec![class("A", &[("Math", 4, "ghost")])];

        let result = solve_timetable(&cfg, &[], &classes, &[]);
        assert_eq!(result, Err(SolveError::NoSolution));
    }

    #[test]
    fn priority_configs_do_not_change_feasibility() {
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 30), teacher("t2", 6, 30)];
        let classes = vec![
            class("A", &[("Math", 6, "t1"), ("Science", 4, "t2")]),
            class("B", &[("Science", 6, "t2")]),
        ];
        let prio = vec![ClassPriorityConfig {
            class_id: "A".into(),
            priority_subjects: vec!["Math".into()],
            weak_subjects: vec![],
            heavy_subjects: vec!["Math".into(), "Science".into()],
        }];

        let tt = solve_timetable(&cfg, &teachers, &classes, &prio).unwrap();
        assert!(verify_timetable(&tt, &cfg, &teachers, &classes).is_empty());
    }

    #[test]
    fn zero_weekly_periods_is_an_invalid_domain() {
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 30)];
        let classes = vec![class("A", &[("Math", 0, "t1")])];

        match solve_timetable(&cfg, &teachers, &classes, &[]) {
            Err(SolveError::InvalidDomain(msg)) => assert!(msg.contains("zero weekly periods")),
            other => panic!("expected InvalidDomain, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_an_invalid_domain() {
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 30), teacher("t1", 6, 30)];
        let classes = vec![class("A", &[("Math", 2, "t1")])];

        assert!(matches!(
            solve_timetable(&cfg, &teachers, &classes, &[]),
            Err(SolveError::InvalidDomain(_))
        ));
    }

    #[test]
    fn teacher_view_is_the_inversion_of_the_class_view() {
        let cfg = config(5, 6);
        let teachers = vec![teacher("t1", 6, 30), teacher("t2", 6, 30)];
        let classes = vec![
            class("A", &[("Math", 3, "t1")]),
            class("B", &[("Science", 2, "t2")]),
        ];

        let tt = solve_timetable(&cfg, &teachers, &classes, &[]).unwrap();
        let view = invert_to_teacher_view(&tt);

        assert_eq!(view["t1"].len(), 3);
        assert_eq!(view["t2"].len(), 2);
        for (tid, slots) in &view {
            for slot in slots {
                let lesson = tt.get(&slot.class_id, slot.day, slot.period).unwrap();
                assert_eq!(&lesson.teacher_id, tid);
                assert_eq!(lesson.subject, slot.subject);
            }
        }
    }
}
