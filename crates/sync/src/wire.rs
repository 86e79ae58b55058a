use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use catalog::{
    Attachment, ContentType, Course, CourseId, CourseStatus, Lesson, LessonId, QuizRef, Topic,
    TopicId,
};
use progress::{
    Enrollment, EnrollmentId, EnrollmentStatus, LessonProgress, ProgressStatus,
};

/// The backend has shipped both snake_case and camelCase payloads over its
/// lifetime, and `order` arrives as a number, a numeric string, or not at
/// all. All of that tolerance lives here, in one place; everything past
/// this module sees the typed model only.

fn lenient_order<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOrder {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let raw = Option::<RawOrder>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawOrder::Int(n)) => Some(n),
        Some(RawOrder::Float(f)) => Some(f.round() as i64),
        Some(RawOrder::Text(s)) => s.trim().parse::<i64>().ok(),
        None => None,
    })
}

fn parse_status(raw: Option<&str>) -> CourseStatus {
    match raw {
        Some("published") => CourseStatus::Published,
        Some("archived") => CourseStatus::Archived,
        _ => CourseStatus::Draft,
    }
}

fn parse_content_type(raw: Option<&str>) -> ContentType {
    match raw {
        Some("video") => ContentType::Video,
        Some("interactive") => ContentType::Interactive,
        _ => ContentType::Text,
    }
}

fn parse_progress_status(raw: Option<&str>) -> ProgressStatus {
    match raw {
        Some("completed") => ProgressStatus::Completed,
        Some("in_progress") => ProgressStatus::InProgress,
        _ => ProgressStatus::NotStarted,
    }
}

fn parse_enrollment_status(raw: Option<&str>) -> EnrollmentStatus {
    match raw {
        Some("completed") => EnrollmentStatus::Completed,
        Some("dropped") => EnrollmentStatus::Dropped,
        _ => EnrollmentStatus::Active,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl CourseRecord {
    pub fn into_course(self) -> Course {
        Course {
            id: CourseId(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            status: parse_status(self.status.as_deref()),
            topics: Vec::new(),
            created_at: self.created_at,
            published_at: self.published_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Option<i64>,
    /// Present when the topics endpoint embeds lessons; absent payloads
    /// require a follow-up per-topic fetch.
    #[serde(default)]
    pub lessons: Option<Vec<LessonRecord>>,
}

impl TopicRecord {
    pub fn into_topic(self) -> Topic {
        Topic {
            id: TopicId(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            order: self.order,
            lessons: self
                .lessons
                .unwrap_or_default()
                .into_iter()
                .map(LessonRecord::into_lesson)
                .collect(),
            assessments: Vec::new(),
            expanded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub title: String,
    #[serde(alias = "fileUrl")]
    pub file_url: String,
    #[serde(default, alias = "fileType")]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "contentType")]
    pub content_type: Option<String>,
    #[serde(default, alias = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(
        default,
        alias = "estimatedDuration",
        alias = "estimated_duration_minutes"
    )]
    pub estimated_duration: Option<u32>,
    #[serde(default, alias = "isFreePreview")]
    pub is_free_preview: bool,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Option<i64>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    #[serde(default)]
    pub quiz: Option<QuizRef>,
}

impl LessonRecord {
    pub fn into_lesson(self) -> Lesson {
        Lesson {
            id: LessonId(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            content_type: parse_content_type(self.content_type.as_deref()),
            video_url: self.video_url,
            estimated_duration_minutes: self.estimated_duration,
            is_free_preview: self.is_free_preview,
            order: self.order,
            is_completed: false,
            attachments: self
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    title: a.title,
                    file_url: a.file_url,
                    file_type: a.file_type,
                })
                .collect(),
            quiz: self.quiz,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    /// The backend stores this as a float; it is clamped and re-rounded
    /// here and recomputed entirely once lesson-level data is available.
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub completed_lessons: u32,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl EnrollmentRecord {
    pub fn into_enrollment(self) -> Enrollment {
        Enrollment {
            id: EnrollmentId(self.id),
            course_id: CourseId(self.course_id),
            student_id: self.student_id,
            status: parse_enrollment_status(self.status.as_deref()),
            completed_lessons: self.completed_lessons,
            total_lessons: self.total_lessons,
            progress_percentage: self.progress_percentage.clamp(0.0, 100.0).round() as u8,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressRecord {
    pub enrollment_id: i64,
    pub lesson_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "videoCompleted")]
    pub video_completed: bool,
    #[serde(default, alias = "timeSpent")]
    pub time_spent: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LessonProgressRecord {
    pub fn into_lesson_progress(self) -> LessonProgress {
        LessonProgress {
            enrollment_id: EnrollmentId(self.enrollment_id),
            lesson_id: LessonId(self.lesson_id),
            status: parse_progress_status(self.status.as_deref()),
            video_completed: self.video_completed,
            time_spent_secs: self.time_spent,
            completed_at: self.completed_at,
        }
    }
}

/// The lesson-progress endpoint wraps its records in an envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonProgressPage {
    #[serde(default)]
    pub progress: Vec<LessonProgressRecord>,
}
