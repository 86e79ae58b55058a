use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod tree;
pub use tree::*;
pub mod navigator;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("topic not found: {0}")]
    TopicNotFound(TopicId),
    #[error("lesson not found: {0}")]
    LessonNotFound(LessonId),
    #[error("invalid status change: {0} -> {1}")]
    InvalidStatusChange(CourseStatus, CourseStatus),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CourseId(pub i64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TopicId(pub i64);

impl TopicId {
    /// Ids handed out by the tree before the server has confirmed the
    /// entity are negative; server ids are always positive.
    pub fn is_local(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LessonId(pub i64);

impl LessonId {
    pub fn is_local(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl Default for CourseStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Video,
    Text,
    Interactive,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::Text
    }
}

/// Downloadable resource attached to a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub title: String,
    pub file_url: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Reference to a knowledge-check quiz; the quiz content itself lives
/// behind the assessment service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizRef {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default)]
    pub is_free_preview: bool,
    #[serde(default)]
    pub order: Option<i64>,
    /// Derived cache of the student's LessonProgress; false until the
    /// progress records have been fetched and applied.
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub quiz: Option<QuizRef>,
}

impl Lesson {
    /// Missing order sorts lowest, never errors.
    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    /// UI-only expansion state; never persisted remotely.
    #[serde(skip)]
    pub expanded: bool,
}

impl Topic {
    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(0)
    }

    /// Lessons in display order: ascending `order`, ties stable.
    pub fn lessons_ordered(&self) -> Vec<&Lesson> {
        let mut lessons: Vec<&Lesson> = self.lessons.iter().collect();
        lessons.sort_by_key(|l| l.sort_key());
        lessons
    }

    pub fn find_lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn new(id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: CourseStatus::Draft,
            topics: Vec::new(),
            created_at: None,
            published_at: None,
        }
    }

    /// Topics in display order: ascending `order`, ties stable.
    pub fn topics_ordered(&self) -> Vec<&Topic> {
        let mut topics: Vec<&Topic> = self.topics.iter().collect();
        topics.sort_by_key(|t| t.sort_key());
        topics
    }

    pub fn find_topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn find_lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.topics.iter().find_map(|t| t.find_lesson(id))
    }
}

/// Fields a tutor supplies when creating a topic; everything else is
/// assigned by the tree or the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default)]
    pub is_free_preview: bool,
    #[serde(default)]
    pub order: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_state_is_never_serialized() {
        let topic = Topic {
            id: TopicId(3),
            title: "Basics".to_string(),
            description: String::new(),
            order: Some(1),
            lessons: Vec::new(),
            assessments: Vec::new(),
            expanded: true,
        };

        let json = serde_json::to_value(&topic).unwrap();
        assert!(json.get("expanded").is_none());

        let back: Topic = serde_json::from_value(json).unwrap();
        assert!(!back.expanded);
    }

    #[test]
    fn statuses_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&CourseStatus::Published).unwrap(),
            "\"published\""
        );
        assert_eq!(
            serde_json::to_string(&ContentType::Interactive).unwrap(),
            "\"interactive\""
        );
    }
}
