use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use catalog::{navigator, Course, CourseId, LessonId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EnrollmentId(pub i64);

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Per-student, per-lesson completion record, owned by the enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonProgress {
    pub enrollment_id: EnrollmentId,
    pub lesson_id: LessonId,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub video_completed: bool,
    #[serde(default)]
    pub time_spent_secs: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// A lesson counts as completed when its status says so or the video
    /// was watched to the end.
    pub fn is_complete(&self) -> bool {
        self.status == ProgressStatus::Completed || self.video_completed
    }
}

/// A student's relationship to a course, carrying aggregate progress. The
/// percentage is a cache of `compute()` output, never an independent source
/// of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    pub student_id: i64,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub completed_lessons: u32,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub progress_percentage: u8,
}

/// Aggregate completion over the live tree. Totals are always recounted
/// from the course; structural edits change the denominator, so a cached
/// total would drift.
pub fn compute(course: &Course, completed: &HashSet<LessonId>) -> ProgressSnapshot {
    let lessons = navigator::flatten(course);
    let total = lessons.len() as u32;
    let done = lessons.iter().filter(|l| completed.contains(&l.id)).count() as u32;

    let percentage = if total > 0 {
        (f64::from(done) / f64::from(total) * 100.0).round() as u8
    } else {
        0
    };

    ProgressSnapshot {
        total_lessons: total,
        completed_lessons: done,
        progress_percentage: percentage,
    }
}

/// Completed-lesson ids derived from fetched progress records.
pub fn completed_set(records: &[LessonProgress]) -> HashSet<LessonId> {
    records
        .iter()
        .filter(|r| r.is_complete())
        .map(|r| r.lesson_id)
        .collect()
}

/// Derived structure counts, recovered on demand rather than cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseTotals {
    pub topics: u32,
    pub lessons: u32,
    pub estimated_minutes: u32,
}

pub fn course_totals(course: &Course) -> CourseTotals {
    let mut totals = CourseTotals {
        topics: course.topics.len() as u32,
        ..Default::default()
    };
    for topic in &course.topics {
        totals.lessons += topic.lessons.len() as u32;
        totals.estimated_minutes += topic
            .lessons
            .iter()
            .filter_map(|l| l.estimated_duration_minutes)
            .sum::<u32>();
    }
    totals
}
