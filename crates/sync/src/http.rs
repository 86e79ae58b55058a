use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use catalog::{CourseId, LessonDraft, LessonId, TopicDraft, TopicId};
use progress::EnrollmentId;

use crate::{
    ApiError, ApiResult, CourseApi, CourseRecord, EnrollmentProgressUpdate, EnrollmentRecord,
    LessonProgressPage, LessonProgressRecord, LessonRecord, TopicRecord,
};

/// Connection settings for the course backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the version prefix, e.g. `https://host/api/v1`.
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_secs: 30,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// `CourseApi` over HTTP/JSON against the backend's REST surface.
pub struct HttpCourseApi {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpCourseApi {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send_json(self.client.get(self.url(path))).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send_json(self.client.post(self.url(path)).json(body))
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send_json(self.client.post(self.url(path))).await
    }

    async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send_json(self.client.put(self.url(path)).json(body))
            .await
    }
}

/// Maps an error status to the taxonomy. The backend wraps its messages in
/// `{"detail": ...}`; fall back to the raw body when it does not.
fn status_error(status: u16, body: String) -> ApiError {
    #[derive(serde::Deserialize)]
    struct Detail {
        detail: String,
    }

    let message = serde_json::from_str::<Detail>(&body)
        .map(|d| d.detail)
        .unwrap_or(body);

    match status {
        401 => ApiError::Unauthorized(message),
        403 => ApiError::Forbidden(message),
        404 => ApiError::NotFound(message),
        500..=599 => ApiError::Server { status, message },
        _ => ApiError::Http { status, message },
    }
}

#[async_trait::async_trait]
impl CourseApi for HttpCourseApi {
    async fn get_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.get_json(&format!("/courses/{course_id}")).await
    }

    async fn get_course_topics(&self, course_id: CourseId) -> ApiResult<Vec<TopicRecord>> {
        self.get_json(&format!("/courses/{course_id}/topics")).await
    }

    async fn get_topic_lessons(&self, topic_id: TopicId) -> ApiResult<Vec<LessonRecord>> {
        self.get_json(&format!("/courses/topics/{topic_id}/lessons"))
            .await
    }

    async fn get_lesson(&self, lesson_id: LessonId) -> ApiResult<LessonRecord> {
        self.get_json(&format!("/courses/lessons/{lesson_id}")).await
    }

    async fn create_topic(&self, course_id: CourseId, draft: &TopicDraft) -> ApiResult<TopicRecord> {
        self.post_json(&format!("/courses/{course_id}/topics"), draft)
            .await
    }

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        draft: &LessonDraft,
    ) -> ApiResult<LessonRecord> {
        self.post_json(&format!("/courses/topics/{topic_id}/lessons"), draft)
            .await
    }

    async fn get_my_enrollments(&self) -> ApiResult<Vec<EnrollmentRecord>> {
        self.get_json("/users/me/enrollments").await
    }

    async fn get_enrollment_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> ApiResult<Vec<LessonProgressRecord>> {
        let page: LessonProgressPage = self
            .get_json(&format!("/courses/enrollments/{enrollment_id}/lesson-progress"))
            .await?;
        Ok(page.progress)
    }

    async fn mark_lesson_complete(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> ApiResult<LessonProgressRecord> {
        self.post_empty(&format!(
            "/courses/enrollments/{enrollment_id}/lessons/{lesson_id}/complete"
        ))
        .await
    }

    async fn update_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
        update: &EnrollmentProgressUpdate,
    ) -> ApiResult<EnrollmentRecord> {
        self.put_json(&format!("/courses/enrollments/{enrollment_id}"), update)
            .await
    }

    async fn publish_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.post_empty(&format!("/courses/{course_id}/publish")).await
    }

    async fn archive_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.post_empty(&format!("/courses/{course_id}/archive")).await
    }
}
