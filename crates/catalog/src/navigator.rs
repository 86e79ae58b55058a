/// Deterministic linear ordering over the course tree for next/previous
/// navigation. The sequence is re-derived on every call rather than kept as
/// a cursor; the tree can be mutated between calls and a stale cursor would
/// silently desynchronize.
use crate::{Course, Lesson, LessonId};

/// All lessons in display order: topics ascending by `order`, lessons
/// ascending within each topic, ties stable.
pub fn flatten(course: &Course) -> Vec<&Lesson> {
    course
        .topics_ordered()
        .into_iter()
        .flat_map(|t| t.lessons_ordered())
        .collect()
}

fn index_of(sequence: &[&Lesson], current: LessonId) -> Option<usize> {
    sequence.iter().position(|l| l.id == current)
}

/// The lesson after `current`, or None at the end of the course. A stale id
/// that no longer exists in the tree also yields None.
pub fn next(course: &Course, current: LessonId) -> Option<&Lesson> {
    let sequence = flatten(course);
    let idx = index_of(&sequence, current)?;
    sequence.get(idx + 1).copied()
}

pub fn previous(course: &Course, current: LessonId) -> Option<&Lesson> {
    let sequence = flatten(course);
    let idx = index_of(&sequence, current)?;
    idx.checked_sub(1).and_then(|i| sequence.get(i)).copied()
}

pub fn has_next(course: &Course, current: LessonId) -> bool {
    next(course, current).is_some()
}

pub fn has_previous(course: &Course, current: LessonId) -> bool {
    previous(course, current).is_some()
}

/// 1-based position of the lesson in the flattened sequence, with the
/// sequence length, for "lesson i of n" displays.
pub fn position(course: &Course, current: LessonId) -> Option<(usize, usize)> {
    let sequence = flatten(course);
    index_of(&sequence, current).map(|idx| (idx + 1, sequence.len()))
}
