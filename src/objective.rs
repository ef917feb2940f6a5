use crate::data::{Class, ClassPriorityConfig, SchoolConfig};
use crate::model::{ModelVars, VarKey};
use good_lp::variable;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint};
use log::info;
use std::collections::HashMap;

// soft constraint weights
const PRIORITY_BONUS_WEIGHT: f64 = 1.0;
const HEAVY_BACK_TO_BACK_WEIGHT: f64 = 2.0;

/// Periods earlier than this earn a bonus for priority subjects:
/// contribution = EARLY_PERIOD_CUTOFF - period.
const EARLY_PERIOD_CUTOFF: usize = 3;

/// The soft scoring function layered on top of the hard model.
///
/// `links` are the linearization rows tying each back-to-back penalty
/// variable to its pair of adjacent assignment variables; they must be added
/// to the model alongside the hard constraints.
pub struct SoftObjective {
    pub expr: Expression,
    pub links: Vec<Constraint>,
}

/// Builds the optional preference objective. With no priority configs this
/// returns a zero objective and no links, leaving feasibility untouched.
pub fn build_objective(
    problem: &mut ProblemVariables,
    model_vars: &ModelVars,
    config: &SchoolConfig,
    classes: &[Class],
    priority_configs: &[ClassPriorityConfig],
) -> SoftObjective {
    if priority_configs.is_empty() {
        return SoftObjective {
            expr: Expression::default(),
            links: Vec::new(),
        };
    }

    let priority_map: HashMap<&str, &ClassPriorityConfig> = priority_configs
        .iter()
        .map(|pc| (pc.class_id.as_str(), pc))
        .collect();

    // bonus: priority subjects placed in early periods
    let early_bonus: Expression = model_vars
        .vars
        .iter()
        .filter_map(|((ci, si, _, p), var)| {
            let class = &classes[*ci];
            let subject = &class.subjects[*si].subject;
            let pc = priority_map.get(class.id.as_str())?;
            if !pc.priority_subjects.contains(subject) || *p >= EARLY_PERIOD_CUTOFF {
                return None;
            }
            let weight = (EARLY_PERIOD_CUTOFF - p) as f64;
            Some(weight * *var)
        })
        .sum();

    // penalty: the same heavy subject in two consecutive non-break periods.
    // b >= x1 + x2 - 1 forces the binary penalty variable on when both
    // assignment variables are on; the maximisation keeps it off otherwise.
    let mut links = Vec::new();
    let mut penalty_vars: Vec<Variable> = Vec::new();
    for ((ci, si, d, p), var) in &model_vars.vars {
        let class = &classes[*ci];
        let subject = &class.subjects[*si].subject;
        let Some(pc) = priority_map.get(class.id.as_str()) else {
            continue;
        };
        if !pc.heavy_subjects.contains(subject) {
            continue;
        }
        if config.is_break(p + 1) {
            continue;
        }
        let key: VarKey = (*ci, *si, *d, p + 1);
        let Some(next_var) = model_vars.vars.get(&key) else {
            continue;
        };
        let penalty = problem.add(variable().binary());
        links.push(constraint!(penalty >= *var + *next_var - 1));
        penalty_vars.push(penalty);
    }
    let back_to_back_penalty: Expression = penalty_vars.iter().map(|v| *v).sum();

    info!(
        "Objective defined: early-period bonus for priority subjects, {} back-to-back heavy pairs penalized.",
        links.len()
    );

    SoftObjective {
        expr: PRIORITY_BONUS_WEIGHT * early_bonus
            - HEAVY_BACK_TO_BACK_WEIGHT * back_to_back_penalty,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassSubject, Teacher};
    use crate::model::declare_variables;
    use std::collections::BTreeMap;

    fn domain() -> (SchoolConfig, Vec<Teacher>, Vec<Class>) {
        let config = SchoolConfig {
            days: vec!["Mon".into(), "Tue".into()],
            periods_per_day: 4,
            break_periods: BTreeMap::from([(2, "Lunch".to_string())]),
        };
        let teachers = vec![Teacher {
            id: "t1".into(),
            name: "t1".into(),
            subjects: vec!["Math".into()],
            eligible_sections: vec![],
            max_periods_per_day: 4,
            max_periods_per_week: 20,
        }];
        let classes = vec![Class {
            id: "10A".into(),
            name: "10A".into(),
            subjects: vec![ClassSubject {
                subject: "Math".into(),
                weekly_periods: 3,
                teacher_id: "t1".into(),
            }],
        }];
        (config, teachers, classes)
    }

    #[test]
    fn no_priority_configs_means_no_penalty_links() {
        let (config, teachers, classes) = domain();
        let mut problem = ProblemVariables::new();
        let mv = declare_variables(&mut problem, &config, &teachers, &classes);

        let objective = build_objective(&mut problem, &mv, &config, &classes, &[]);
        assert!(objective.links.is_empty());
    }

    #[test]
    fn heavy_subjects_link_adjacent_non_break_pairs() {
        let (config, teachers, classes) = domain();
        let mut problem = ProblemVariables::new();
        let mv = declare_variables(&mut problem, &config, &teachers, &classes);

        let configs = vec![ClassPriorityConfig {
            class_id: "10A".into(),
            priority_subjects: vec![],
            weak_subjects: vec![],
            heavy_subjects: vec!["Math".into()],
        }];
        let objective = build_objective(&mut problem, &mv, &config, &classes, &configs);

        // periods are 0,1,3 (2 is lunch); adjacent assignable pairs per day:
        // (0,1) only, since (1,2) hits the break and (3,4) is out of range.
        assert_eq!(objective.links.len(), config.days.len());
    }

    #[test]
    fn unrelated_class_gets_no_links() {
        let (config, teachers, classes) = domain();
        let mut problem = ProblemVariables::new();
        let mv = declare_variables(&mut problem, &config, &teachers, &classes);

        let configs = vec![ClassPriorityConfig {
            class_id: "12HUM".into(),
            priority_subjects: vec!["Math".into()],
            weak_subjects: vec![],
            heavy_subjects: vec!["Math".into()],
        }];
        let objective = build_objective(&mut problem, &mv, &config, &classes, &configs);
        assert!(objective.links.is_empty());
    }
}
