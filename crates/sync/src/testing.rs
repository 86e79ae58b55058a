use std::collections::HashMap;
use std::sync::Mutex;

use catalog::{CourseId, LessonDraft, LessonId, TopicDraft, TopicId};
use progress::EnrollmentId;

use crate::{
    ApiError, ApiResult, CourseApi, CourseRecord, EnrollmentProgressUpdate, EnrollmentRecord,
    LessonProgressRecord, LessonRecord, TopicRecord,
};

/// In-memory `CourseApi` for engine and loader tests: seedable data,
/// per-operation injected failures, and a call journal.
pub struct MockApi {
    course: Mutex<Option<CourseRecord>>,
    topics: Mutex<Vec<TopicRecord>>,
    lessons_by_topic: Mutex<HashMap<i64, Vec<LessonRecord>>>,
    lesson_details: Mutex<HashMap<i64, LessonRecord>>,
    enrollments: Mutex<Vec<EnrollmentRecord>>,
    progress: Mutex<Vec<LessonProgressRecord>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<i64>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            course: Mutex::new(None),
            topics: Mutex::new(Vec::new()),
            lessons_by_topic: Mutex::new(HashMap::new()),
            lesson_details: Mutex::new(HashMap::new()),
            enrollments: Mutex::new(Vec::new()),
            progress: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(1000),
        }
    }

    pub fn seed_course(&self, id: i64, title: &str) {
        *self.course.lock().unwrap() = Some(CourseRecord {
            id,
            title: title.to_string(),
            description: None,
            status: Some("draft".to_string()),
            created_at: None,
            published_at: None,
        });
    }

    pub fn seed_topics(&self, topics: Vec<TopicRecord>) {
        *self.topics.lock().unwrap() = topics;
    }

    pub fn seed_topic_lessons(&self, topic_id: i64, lessons: Vec<LessonRecord>) {
        self.lessons_by_topic
            .lock()
            .unwrap()
            .insert(topic_id, lessons);
    }

    pub fn seed_lesson_detail(&self, lesson: LessonRecord) {
        self.lesson_details.lock().unwrap().insert(lesson.id, lesson);
    }

    pub fn seed_enrollments(&self, enrollments: Vec<EnrollmentRecord>) {
        *self.enrollments.lock().unwrap() = enrollments;
    }

    pub fn seed_progress(&self, records: Vec<LessonProgressRecord>) {
        *self.progress.lock().unwrap() = records;
    }

    pub fn fail(&self, op: &'static str, error: ApiError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(op))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &str) -> ApiResult<()> {
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn alloc_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CourseApi for MockApi {
    async fn get_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.record(format!("get_course {course_id}"));
        self.check("get_course")?;
        self.course
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
    }

    async fn get_course_topics(&self, course_id: CourseId) -> ApiResult<Vec<TopicRecord>> {
        self.record(format!("get_course_topics {course_id}"));
        self.check("get_course_topics")?;
        Ok(self.topics.lock().unwrap().clone())
    }

    async fn get_topic_lessons(&self, topic_id: TopicId) -> ApiResult<Vec<LessonRecord>> {
        self.record(format!("get_topic_lessons {topic_id}"));
        self.check("get_topic_lessons")?;
        Ok(self
            .lessons_by_topic
            .lock()
            .unwrap()
            .get(&topic_id.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_lesson(&self, lesson_id: LessonId) -> ApiResult<LessonRecord> {
        self.record(format!("get_lesson {lesson_id}"));
        self.check("get_lesson")?;
        self.lesson_details
            .lock()
            .unwrap()
            .get(&lesson_id.0)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))
    }

    async fn create_topic(
        &self,
        course_id: CourseId,
        draft: &TopicDraft,
    ) -> ApiResult<TopicRecord> {
        self.record(format!("create_topic {course_id}"));
        self.check("create_topic")?;
        Ok(TopicRecord {
            id: self.alloc_id(),
            title: draft.title.clone(),
            description: Some(draft.description.clone()),
            order: draft.order,
            lessons: None,
        })
    }

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        draft: &LessonDraft,
    ) -> ApiResult<LessonRecord> {
        self.record(format!("create_lesson {topic_id}"));
        self.check("create_lesson")?;
        Ok(LessonRecord {
            id: self.alloc_id(),
            title: draft.title.clone(),
            description: Some(draft.description.clone()),
            content: Some(draft.content.clone()),
            content_type: None,
            video_url: draft.video_url.clone(),
            estimated_duration: draft.estimated_duration_minutes,
            is_free_preview: draft.is_free_preview,
            order: draft.order,
            attachments: Vec::new(),
            quiz: None,
        })
    }

    async fn get_my_enrollments(&self) -> ApiResult<Vec<EnrollmentRecord>> {
        self.record("get_my_enrollments".to_string());
        self.check("get_my_enrollments")?;
        Ok(self.enrollments.lock().unwrap().clone())
    }

    async fn get_enrollment_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
    ) -> ApiResult<Vec<LessonProgressRecord>> {
        self.record(format!("get_enrollment_lesson_progress {enrollment_id}"));
        self.check("get_enrollment_lesson_progress")?;
        Ok(self.progress.lock().unwrap().clone())
    }

    async fn mark_lesson_complete(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> ApiResult<LessonProgressRecord> {
        self.record(format!("mark_lesson_complete {enrollment_id} {lesson_id}"));
        self.check("mark_lesson_complete")?;
        Ok(progress_record(enrollment_id.0, lesson_id.0, "completed", true))
    }

    async fn update_lesson_progress(
        &self,
        enrollment_id: EnrollmentId,
        update: &EnrollmentProgressUpdate,
    ) -> ApiResult<EnrollmentRecord> {
        self.record(format!(
            "update_lesson_progress {enrollment_id} {} {}",
            update.progress_percentage, update.completed_lessons
        ));
        self.check("update_lesson_progress")?;
        let enrollment = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == enrollment_id.0)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;
        Ok(EnrollmentRecord {
            progress_percentage: f64::from(update.progress_percentage),
            completed_lessons: update.completed_lessons,
            ..enrollment
        })
    }

    async fn publish_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.record(format!("publish_course {course_id}"));
        self.check("publish_course")?;
        let mut course = self
            .course
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
        course.status = Some("published".to_string());
        Ok(course)
    }

    async fn archive_course(&self, course_id: CourseId) -> ApiResult<CourseRecord> {
        self.record(format!("archive_course {course_id}"));
        self.check("archive_course")?;
        let mut course = self
            .course
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
        course.status = Some("archived".to_string());
        Ok(course)
    }
}

pub fn topic_record(
    id: i64,
    title: &str,
    order: i64,
    lessons: Option<Vec<LessonRecord>>,
) -> TopicRecord {
    TopicRecord {
        id,
        title: title.to_string(),
        description: None,
        order: Some(order),
        lessons,
    }
}

pub fn lesson_record(id: i64, title: &str, order: i64) -> LessonRecord {
    LessonRecord {
        id,
        title: title.to_string(),
        description: None,
        content: None,
        content_type: None,
        video_url: None,
        estimated_duration: None,
        is_free_preview: false,
        order: Some(order),
        attachments: Vec::new(),
        quiz: None,
    }
}

pub fn enrollment_record(id: i64, course_id: i64, student_id: i64) -> EnrollmentRecord {
    EnrollmentRecord {
        id,
        course_id,
        student_id,
        status: Some("active".to_string()),
        progress_percentage: 0.0,
        completed_lessons: 0,
        total_lessons: 0,
        last_accessed_at: None,
    }
}

pub fn progress_record(
    enrollment_id: i64,
    lesson_id: i64,
    status: &str,
    video_completed: bool,
) -> LessonProgressRecord {
    LessonProgressRecord {
        enrollment_id,
        lesson_id,
        status: Some(status.to_string()),
        video_completed,
        time_spent: 0,
        completed_at: None,
    }
}
