use crate::data::{Class, ClassId, DayIndex, PeriodIndex, SchoolConfig, Subject, Teacher};
use good_lp::variable;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint};
use itertools::Itertools;
use log::trace;
use std::collections::HashMap;

/// Decision variable key: (class index, subject index within the class, day, period).
pub type VarKey = (usize, usize, DayIndex, PeriodIndex);

/// The declared boolean assignment variables.
///
/// x_csdp = 1 if class c has subject s in period p of day d, 0 otherwise.
pub struct ModelVars {
    pub vars: HashMap<VarKey, Variable>,
    /// (class, subject) pairs that ended up with no feasible variable at all.
    /// Their exactly-N constraint can never be met, so the model is unsatisfiable.
    pub unplaceable: Vec<(ClassId, Subject)>,
}

/// Declares one binary variable per feasible (class, subject, day, period)
/// combination. Pre-filtering handles breaks and teacher/section eligibility,
/// which keeps the model small and some hard constraints implicit.
pub fn declare_variables(
    problem: &mut ProblemVariables,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
) -> ModelVars {
    let teacher_map: HashMap<&str, &Teacher> = teachers.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut feasible: Vec<VarKey> = Vec::new();
    let mut unplaceable = Vec::new();
    for (ci, class) in classes.iter().enumerate() {
        for (si, cs) in class.subjects.iter().enumerate() {
            let placeable = match teacher_map.get(cs.teacher_id.as_str()) {
                Some(t) => t.can_teach_section(&class.id),
                None => false,
            };
            if !placeable {
                unplaceable.push((class.id.clone(), cs.subject.clone()));
                continue;
            }
            for d in 0..config.days.len() {
                for p in config.assignable_periods() {
                    feasible.push((ci, si, d, p));
                }
            }
        }
    }
    trace!(
        "Generated {} assignment variables out of a theoretical maximum of {}.",
        feasible.len(),
        classes.iter().map(|c| c.subjects.len()).sum::<usize>()
            * config.days.len()
            * config.periods_per_day
    );

    let vec = problem.add_vector(variable().binary(), feasible.len());
    let vars = feasible.into_iter().zip(vec).collect();

    ModelVars { vars, unplaceable }
}

/// Emits the hard-constraint rows over the declared variables:
/// exactly-N periods per (class, subject), at most one subject per class slot,
/// no teacher double-booking, and the per-teacher daily and weekly load caps.
pub fn hard_constraints(
    model_vars: &ModelVars,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
) -> Vec<Constraint> {
    let vars = &model_vars.vars;
    let mut constraints = Vec::new();

    // exactly-N: each (class, subject) fills its weekly quota
    for (ci, class) in classes.iter().enumerate() {
        for (si, cs) in class.subjects.iter().enumerate() {
            if model_vars.unplaceable.contains(&(class.id.clone(), cs.subject.clone())) {
                continue;
            }
            let total: Expression = vars
                .iter()
                .filter(|((c, s, _, _), _)| *c == ci && *s == si)
                .map(|(_, var)| *var)
                .sum();
            constraints.push(constraint!(total == cs.weekly_periods as f64));
        }
    }

    // at most one subject per (class, day, period); a class slot may stay free
    for (ci, _) in classes.iter().enumerate() {
        for d in 0..config.days.len() {
            for p in config.assignable_periods() {
                let occupied: Expression = vars
                    .iter()
                    .filter(|((c, _, day, period), _)| *c == ci && *day == d && *period == p)
                    .map(|(_, var)| *var)
                    .sum();
                constraints.push(constraint!(occupied <= 1));
            }
        }
    }

    // group (class idx, subject idx) pairs by the teacher who takes them
    let teacher_pairs: HashMap<&str, Vec<(usize, usize)>> = classes
        .iter()
        .enumerate()
        .flat_map(|(ci, class)| {
            class
                .subjects
                .iter()
                .enumerate()
                .map(move |(si, cs)| (cs.teacher_id.as_str(), (ci, si)))
        })
        .into_group_map();

    for teacher in teachers {
        let Some(pairs) = teacher_pairs.get(teacher.id.as_str()) else {
            continue;
        };

        // no double-booking: a teacher sits in at most one class per slot
        for d in 0..config.days.len() {
            for p in config.assignable_periods() {
                let busy: Expression = vars
                    .iter()
                    .filter(|((c, s, day, period), _)| {
                        *day == d && *period == p && pairs.contains(&(*c, *s))
                    })
                    .map(|(_, var)| *var)
                    .sum();
                constraints.push(constraint!(busy <= 1));
            }
        }

        // daily load cap
        for d in 0..config.days.len() {
            let day_load: Expression = vars
                .iter()
                .filter(|((c, s, day, _), _)| *day == d && pairs.contains(&(*c, *s)))
                .map(|(_, var)| *var)
                .sum();
            constraints.push(constraint!(day_load <= teacher.max_periods_per_day as f64));
        }

        // weekly load cap
        let week_load: Expression = vars
            .iter()
            .filter(|((c, s, _, _), _)| pairs.contains(&(*c, *s)))
            .map(|(_, var)| *var)
            .sum();
        constraints.push(constraint!(week_load <= teacher.max_periods_per_week as f64));
    }

    constraints
}
