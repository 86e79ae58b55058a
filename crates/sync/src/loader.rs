use tracing::{info, warn};

use catalog::{ContentTree, CourseId, Topic};
use progress::ProgressSnapshot;

use crate::{CourseApi, CourseState, Result, SessionContext, SyncError};

/// Fetches a course and its structure, then best-effort resolves the
/// student's enrollment and progress. Structure failures are fatal; there
/// is no content to show without it. Enrollment/progress failures degrade
/// to a zero-progress view of the same content.
pub async fn load_course(
    api: &dyn CourseApi,
    session: &SessionContext,
    course_id: CourseId,
) -> Result<CourseState> {
    let course_record = api.get_course(course_id).await.map_err(SyncError::Load)?;
    let topic_records = api
        .get_course_topics(course_id)
        .await
        .map_err(SyncError::Load)?;

    let mut topics: Vec<Topic> = Vec::with_capacity(topic_records.len());
    for record in topic_records {
        let lessons_embedded = record.lessons.is_some();
        let mut topic = record.into_topic();
        if !lessons_embedded {
            // Only fetch per-topic lessons when the payload came without
            // them; embedded payloads make the round trip redundant.
            let lesson_records = api
                .get_topic_lessons(topic.id)
                .await
                .map_err(SyncError::Load)?;
            topic.lessons = lesson_records
                .into_iter()
                .map(|r| r.into_lesson())
                .collect();
        }
        topics.push(topic);
    }

    let mut tree = ContentTree::new(course_record.into_course());
    tree.absorb_topics(topics);
    let mut state = CourseState::new(tree);

    match api.get_my_enrollments().await {
        Ok(records) => {
            let enrollment = records
                .into_iter()
                .map(|r| r.into_enrollment())
                .find(|e| e.course_id == course_id && e.student_id == session.student_id);

            if let Some(mut enrollment) = enrollment {
                match api.get_enrollment_lesson_progress(enrollment.id).await {
                    Ok(progress_records) => {
                        let records: Vec<_> = progress_records
                            .into_iter()
                            .map(|r| r.into_lesson_progress())
                            .collect();
                        state.completed = progress::completed_set(&records);
                        state.tree.apply_completion(&state.completed);

                        // Recompute over the live tree; the stored
                        // percentage may predate structural edits.
                        let snapshot = progress::compute(state.tree.course(), &state.completed);
                        apply_snapshot(&mut enrollment, snapshot);
                        info!(
                            %course_id,
                            enrollment = %enrollment.id,
                            percentage = snapshot.progress_percentage,
                            "course loaded with progress"
                        );
                    }
                    Err(err) => {
                        warn!(
                            %course_id,
                            enrollment = %enrollment.id,
                            error = %err,
                            "lesson progress fetch failed, rendering with zero progress"
                        );
                    }
                }
                state.enrollment = Some(enrollment);
            }
        }
        Err(err) => {
            warn!(
                %course_id,
                error = %err,
                "enrollment fetch failed, rendering with zero progress"
            );
        }
    }

    Ok(state)
}

fn apply_snapshot(enrollment: &mut progress::Enrollment, snapshot: ProgressSnapshot) {
    enrollment.completed_lessons = snapshot.completed_lessons;
    enrollment.total_lessons = snapshot.total_lessons;
    enrollment.progress_percentage = snapshot.progress_percentage;
}
