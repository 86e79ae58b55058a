use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use catalog::{
    ContentTree, Course, CourseId, CourseStatus, Lesson, LessonDraft, LessonId, TopicDraft,
    TopicId,
};
use progress::{Enrollment, EnrollmentId, ProgressSnapshot};

use crate::{
    load_course, sync_failure_message, CourseApi, EnrollmentProgressUpdate, NoticeBoard,
    OperationId, Result, SessionContext, SyncError,
};

/// Everything the viewing/editing session owns: the tree, the set of
/// completed lesson ids, and the resolved enrollment if any.
#[derive(Debug)]
pub struct CourseState {
    pub tree: ContentTree,
    pub completed: HashSet<LessonId>,
    pub enrollment: Option<Enrollment>,
}

impl CourseState {
    pub fn new(tree: ContentTree) -> Self {
        Self {
            tree,
            completed: HashSet::new(),
            enrollment: None,
        }
    }
}

/// Reconciles local optimistic mutations with the remote backend without
/// blocking the caller. Local state is applied first and is never rolled
/// back by a failed push; failures surface as transient notices instead.
pub struct SyncEngine {
    api: Arc<dyn CourseApi>,
    session: SessionContext,
    state: Arc<RwLock<CourseState>>,
    notices: NoticeBoard,
    selection_generation: Arc<AtomicU64>,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn CourseApi>, session: SessionContext, state: CourseState) -> Self {
        Self {
            api,
            session,
            state: Arc::new(RwLock::new(state)),
            notices: NoticeBoard::new(),
            selection_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetches the course, its structure, and the student's progress, then
    /// wraps the result in an engine.
    pub async fn load(
        api: Arc<dyn CourseApi>,
        session: SessionContext,
        course_id: CourseId,
    ) -> Result<Self> {
        let state = load_course(api.as_ref(), &session, course_id).await?;
        Ok(Self::new(api, session, state))
    }

    pub fn notices(&self) -> NoticeBoard {
        self.notices.clone()
    }

    pub async fn course(&self) -> Course {
        self.state.read().await.tree.course().clone()
    }

    pub async fn enrollment(&self) -> Option<Enrollment> {
        self.state.read().await.enrollment.clone()
    }

    pub async fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.read().await;
        progress::compute(state.tree.course(), &state.completed)
    }

    /// Read access to the tree for navigation and rendering.
    pub async fn with_tree<R>(&self, f: impl FnOnce(&ContentTree) -> R) -> R {
        f(&self.state.read().await.tree)
    }

    /// Mutable access for UI-local edits (expansion state, field edits)
    /// that have no reconciliation protocol of their own.
    pub async fn with_tree_mut<R>(&self, f: impl FnOnce(&mut ContentTree) -> R) -> R {
        f(&mut self.state.write().await.tree)
    }

    async fn resolve_enrollment(&self) -> Result<EnrollmentId> {
        let course_id = {
            let state = self.state.read().await;
            if let Some(enrollment) = &state.enrollment {
                return Ok(enrollment.id);
            }
            state.tree.course().id
        };

        let records = self.api.get_my_enrollments().await?;
        let enrollment = records
            .into_iter()
            .map(|r| r.into_enrollment())
            .find(|e| e.course_id == course_id && e.student_id == self.session.student_id)
            .ok_or(SyncError::EnrollmentNotFound(course_id))?;

        let id = enrollment.id;
        self.state.write().await.enrollment = Some(enrollment);
        Ok(id)
    }

    /// Marks a lesson complete: the tree and aggregate progress update
    /// synchronously, then the two remote calls run in a detached task.
    /// The caller gets the post-mutation snapshot immediately; a failed
    /// push only posts a notice.
    pub async fn mark_lesson_complete(&self, lesson_id: LessonId) -> Result<ProgressSnapshot> {
        let enrollment_id = self.resolve_enrollment().await?;

        let (snapshot, newly_completed) = {
            let mut state = self.state.write().await;
            let newly = state.tree.set_lesson_completed(lesson_id)?;
            state.completed.insert(lesson_id);
            let snapshot = progress::compute(state.tree.course(), &state.completed);
            if let Some(enrollment) = state.enrollment.as_mut() {
                enrollment.completed_lessons = snapshot.completed_lessons;
                enrollment.total_lessons = snapshot.total_lessons;
                enrollment.progress_percentage = snapshot.progress_percentage;
                enrollment.last_accessed_at = Some(Utc::now());
            }
            (snapshot, newly)
        };

        if !newly_completed {
            // Completion is terminal; repeating it changes nothing and
            // must not re-issue remote calls.
            return Ok(snapshot);
        }

        let op = OperationId::new();
        let api = Arc::clone(&self.api);
        let notices = self.notices.clone();
        let update = EnrollmentProgressUpdate {
            progress_percentage: snapshot.progress_percentage,
            completed_lessons: snapshot.completed_lessons,
        };

        tokio::spawn(async move {
            // The per-lesson upsert must land before the enrollment
            // update; the server sees a well-defined ordering even though
            // the client never waited for either.
            if let Err(err) = api.mark_lesson_complete(enrollment_id, lesson_id).await {
                warn!(%op, %lesson_id, error = %err, "completion push failed, keeping local state");
                notices.post_warning(sync_failure_message(&err)).await;
                return;
            }
            if let Err(err) = api.update_lesson_progress(enrollment_id, &update).await {
                warn!(%op, %enrollment_id, error = %err, "enrollment update failed, keeping local state");
                notices.post_warning(sync_failure_message(&err)).await;
            }
        });

        Ok(snapshot)
    }

    /// Adds a topic locally under a pending id and pushes the create in a
    /// detached task; the server id replaces the pending one on success.
    pub async fn create_topic(&self, draft: TopicDraft) -> Result<TopicId> {
        let (course_id, local_id, push_draft) = {
            let mut state = self.state.write().await;
            let course_id = state.tree.course().id;
            let topic = state.tree.add_topic(draft)?;
            let push_draft = TopicDraft {
                title: topic.title.clone(),
                description: topic.description.clone(),
                order: topic.order,
            };
            (course_id, topic.id, push_draft)
        };

        let op = OperationId::new();
        let api = Arc::clone(&self.api);
        let notices = self.notices.clone();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            match api.create_topic(course_id, &push_draft).await {
                Ok(record) => {
                    let confirmed = TopicId(record.id);
                    let mut state = state.write().await;
                    if let Err(err) = state.tree.confirm_topic_id(local_id, confirmed) {
                        warn!(%op, %local_id, error = %err, "topic missing at id confirmation");
                    }
                }
                Err(err) => {
                    warn!(%op, %course_id, error = %err, "topic create push failed");
                    notices
                        .post_warning(format!("topic saved locally only: {err}"))
                        .await;
                }
            }
        });

        Ok(local_id)
    }

    /// Adds a lesson locally and pushes it unless its topic is itself
    /// still pending, in which case the lesson waits for the topic.
    pub async fn create_lesson(&self, topic_id: TopicId, draft: LessonDraft) -> Result<LessonId> {
        let (local_id, push_draft) = {
            let mut state = self.state.write().await;
            let lesson = state.tree.add_lesson(topic_id, draft)?;
            let push_draft = LessonDraft {
                title: lesson.title.clone(),
                description: lesson.description.clone(),
                content: lesson.content.clone(),
                content_type: Some(lesson.content_type),
                video_url: lesson.video_url.clone(),
                estimated_duration_minutes: lesson.estimated_duration_minutes,
                is_free_preview: lesson.is_free_preview,
                order: lesson.order,
            };
            (lesson.id, push_draft)
        };

        if topic_id.is_local() {
            self.notices
                .post_info("lesson saved locally, waiting for its topic to sync")
                .await;
            return Ok(local_id);
        }

        let op = OperationId::new();
        let api = Arc::clone(&self.api);
        let notices = self.notices.clone();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            match api.create_lesson(topic_id, &push_draft).await {
                Ok(record) => {
                    let confirmed = LessonId(record.id);
                    let mut state = state.write().await;
                    if let Err(err) = state.tree.confirm_lesson_id(local_id, confirmed) {
                        warn!(%op, %local_id, error = %err, "lesson missing at id confirmation");
                    }
                }
                Err(err) => {
                    warn!(%op, %topic_id, error = %err, "lesson create push failed");
                    notices
                        .post_warning(format!("lesson saved locally only: {err}"))
                        .await;
                }
            }
        });

        Ok(local_id)
    }

    /// Publishing is irreversible, so unlike completion it is confirmed by
    /// the server before the local status flips.
    pub async fn publish_course(&self) -> Result<CourseStatus> {
        let course_id = self.state.read().await.tree.course().id;
        self.api.publish_course(course_id).await?;

        let mut state = self.state.write().await;
        state.tree.set_course_status(CourseStatus::Published)?;
        Ok(CourseStatus::Published)
    }

    pub async fn archive_course(&self) -> Result<CourseStatus> {
        let course_id = self.state.read().await.tree.course().id;
        self.api.archive_course(course_id).await?;

        let mut state = self.state.write().await;
        state.tree.set_course_status(CourseStatus::Archived)?;
        Ok(CourseStatus::Archived)
    }

    /// Marks `lesson_id` as the active selection and returns the
    /// generation tag for its hydration fetch. Selecting again invalidates
    /// every fetch still in flight for earlier selections.
    pub fn select_lesson(&self, lesson_id: LessonId) -> u64 {
        let generation = self.selection_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%lesson_id, generation, "lesson selected");
        generation
    }

    /// Fetches full lesson detail and merges it into the tree, unless the
    /// selection moved on while the request was in flight; a stale
    /// response is discarded, not merged.
    pub async fn hydrate_lesson(
        &self,
        lesson_id: LessonId,
        generation: u64,
    ) -> Result<Option<Lesson>> {
        let record = self.api.get_lesson(lesson_id).await?;

        if self.selection_generation.load(Ordering::SeqCst) != generation {
            debug!(%lesson_id, generation, "stale hydration response discarded");
            return Ok(None);
        }

        let mut lesson = record.into_lesson();
        let mut state = self.state.write().await;
        lesson.is_completed = state.completed.contains(&lesson.id);
        state.tree.update_lesson(lesson.clone())?;
        Ok(Some(lesson))
    }
}
