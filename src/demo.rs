use crate::data::{
    Class, ClassPriorityConfig, ClassSubject, SchoolConfig, Teacher,
};
use std::collections::BTreeMap;

fn teacher(id: &str, subjects: &[&str], sections: &[&str], max_day: u32) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: id.to_string(),
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        eligible_sections: sections.iter().map(|s| s.to_string()).collect(),
        max_periods_per_day: max_day,
        max_periods_per_week: 30,
    }
}

fn subject(name: &str, weekly: u32, teacher_id: &str) -> ClassSubject {
    ClassSubject {
        subject: name.to_string(),
        weekly_periods: weekly,
        teacher_id: teacher_id.to_string(),
    }
}

fn class(id: &str, subjects: Vec<ClassSubject>) -> Class {
    Class {
        id: id.to_string(),
        name: id.to_string(),
        subjects,
    }
}

/// Mon-Fri, 8 periods with a lunch break after the fourth.
pub fn demo_config() -> SchoolConfig {
    SchoolConfig {
        days: ["Mon", "Tue", "Wed", "Thu", "Fri"]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        periods_per_day: 8,
        break_periods: BTreeMap::from([(3, "Lunch".to_string())]),
    }
}

/// Demo teachers: Science, Commerce, Humanities streams.
pub fn demo_teachers() -> Vec<Teacher> {
    let all = &["11SCI", "12SCI", "11COM", "12COM", "11HUM", "12HUM"][..];
    vec![
        teacher("Eric Simon", &["Physics"], &["11SCI", "12SCI"], 5),
        teacher("Aisha Khan", &["Chemistry"], &["11SCI", "12SCI"], 5),
        teacher(
            "Rahul Mehta",
            &["Mathematics"],
            &["11SCI", "12SCI", "11COM", "12COM"],
            5,
        ),
        teacher("Neha Verma", &["Biology"], &["11SCI", "12SCI"], 5),
        teacher("Daniel Brooks", &["English"], all, 5),
        teacher("Priya Nair", &["Economics"], &["11COM", "12COM"], 5),
        teacher("Arjun Patel", &["Accountancy"], &["11COM", "12COM"], 5),
        teacher("Kavita Rao", &["Business Studies"], &["11COM", "12COM"], 4),
        teacher("Sofia Mendes", &["History"], &["11HUM", "12HUM"], 5),
        teacher("Aman Gupta", &["Political Science"], &["11HUM", "12HUM"], 5),
        teacher("Ritu Chawla", &["Geography"], &["11HUM", "12HUM"], 4),
        teacher("Marcus Lee", &["Physical Education"], all, 3),
    ]
}

/// Demo classes: 11SCI, 12SCI, 11COM, 12COM, 11HUM, 12HUM.
pub fn demo_classes() -> Vec<Class> {
    let science = |id: &str| {
        class(
            id,
            vec![
                subject("Physics", 6, "Eric Simon"),
                subject("Chemistry", 6, "Aisha Khan"),
                subject("Mathematics", 6, "Rahul Mehta"),
                subject("Biology", 6, "Neha Verma"),
                subject("English", 4, "Daniel Brooks"),
                subject("Physical Education", 2, "Marcus Lee"),
            ],
        )
    };
    let commerce = |id: &str| {
        class(
            id,
            vec![
                subject("Accountancy", 6, "Arjun Patel"),
                subject("Business Studies", 6, "Kavita Rao"),
                subject("Economics", 6, "Priya Nair"),
                subject("Mathematics", 4, "Rahul Mehta"),
                subject("English", 4, "Daniel Brooks"),
                subject("Physical Education", 2, "Marcus Lee"),
            ],
        )
    };
    let humanities = |id: &str| {
        class(
            id,
            vec![
                subject("History", 6, "Sofia Mendes"),
                subject("Political Science", 6, "Aman Gupta"),
                subject("Geography", 6, "Ritu Chawla"),
                subject("English", 4, "Daniel Brooks"),
                subject("Physical Education", 2, "Marcus Lee"),
            ],
        )
    };
    vec![
        science("11SCI"),
        science("12SCI"),
        commerce("11COM"),
        commerce("12COM"),
        humanities("11HUM"),
        humanities("12HUM"),
    ]
}

/// Soft preferences for the science stream: core subjects early, lab-heavy
/// subjects spaced out.
pub fn demo_priority_configs() -> Vec<ClassPriorityConfig> {
    ["11SCI", "12SCI"]
        .iter()
        .map(|id| ClassPriorityConfig {
            class_id: id.to_string(),
            priority_subjects: vec!["Mathematics".to_string(), "Physics".to_string()],
            weak_subjects: vec!["Physical Education".to_string()],
            heavy_subjects: vec![
                "Physics".to_string(),
                "Chemistry".to_string(),
                "Mathematics".to_string(),
            ],
        })
        .collect()
}
