use serde::{Deserialize, Serialize};
use thiserror::Error;

use catalog::{CourseId, LessonDraft, LessonId, TopicDraft, TopicId};
use progress::EnrollmentId;

use crate::{
    CourseRecord, EnrollmentRecord, LessonProgressRecord, LessonRecord, TopicRecord,
};

/// Failure taxonomy for the remote collaborator. Status-coded variants let
/// the sync layer choose the right user-facing message.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Enrollment progress fields pushed after a completion, mirroring the
/// locally computed snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollmentProgressUpdate {
    pub progress_percentage: u8,
    pub completed_lessons: u32,
}

/// Abstract request/response surface of the course backend. Transport and
/// format live behind the implementation; the engine and loader only see
/// these operations.
#[async_trait::async_trait]
pub trait CourseApi: Send + Sync {
    async fn get_course(&self, course_id: CourseId) -> ApiResult<CourseRecord>;

    async fn get_course_topics(&self, course_id: CourseId) -> ApiResult<Vec<TopicRecord>>;

    async fn get_topic_lessons(&self, topic_id: TopicId) -> ApiResult<Vec<LessonRecord>>;

    /// Full lesson detail, used to hydrate a tree-summary lesson before
    /// display.
    async fn get_lesson(&self, lesson_id: LessonId) -> ApiResult<LessonRecord>;

    async fn create_topic(&self, course_id: CourseId, draft: &TopicDraft) -> ApiResult<TopicRecord>;

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        draft: &LessonDraft,
    ) -> ApiResult<LessonRecord>;

    async fn get_my_enrollments(&self) -> ApiResult<Vec<EnrollmentRecord>>;

    async fn get_enrollment_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> ApiResult<Vec<LessonProgressRecord>>;

    async fn mark_lesson_complete(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> ApiResult<LessonProgressRecord>;

    async fn update_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
        update: &EnrollmentProgressUpdate,
    ) -> ApiResult<EnrollmentRecord>;

    /// Status transition draft -> published; there is no unpublish.
    async fn publish_course(&self, course_id: CourseId) -> ApiResult<CourseRecord>;

    async fn archive_course(&self, course_id: CourseId) -> ApiResult<CourseRecord>;
}
