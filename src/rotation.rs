use crate::check::verify_timetable;
use crate::data::{Class, SchoolConfig, Teacher, Timetable};
use log::{info, warn};

/// Produces up to `count` weekly variants of the base timetable by cyclically
/// shifting every lesson's day. A shift permutes whole days, so per-class and
/// per-teacher weekly totals are preserved by construction; each variant is
/// still re-verified against the full hard-constraint set and dropped if it
/// fails.
pub fn generate_rotations(
    base: &Timetable,
    config: &SchoolConfig,
    teachers: &[Teacher],
    classes: &[Class],
    count: usize,
) -> Vec<Timetable> {
    let num_days = config.days.len();
    if num_days == 0 {
        return Vec::new();
    }

    let mut rotations = Vec::with_capacity(count);
    for week in 1..=count {
        let shift = week % num_days;
        let mut lessons = base.lessons.clone();
        for lesson in &mut lessons {
            lesson.day = (lesson.day + shift) % num_days;
        }
        let variant = Timetable::from_lessons(lessons);

        let violations = verify_timetable(&variant, config, teachers, classes);
        if violations.is_empty() {
            rotations.push(variant);
        } else {
            warn!(
                "Discarding rotation variant for week {week}: {} hard-constraint violations.",
                violations.len()
            );
        }
    }
    info!("Generated {} of {count} requested rotation variants.", rotations.len());
    rotations
}
