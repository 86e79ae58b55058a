use std::collections::HashSet;

use crate::{
    CatalogError, ContentType, Course, CourseStatus, Lesson, LessonDraft, LessonId, Result, Topic,
    TopicDraft, TopicId,
};

/// Authoritative in-memory representation of a course's structure and the
/// single point of mutation. Every operation either applies fully or leaves
/// the tree untouched.
#[derive(Debug, Clone)]
pub struct ContentTree {
    course: Course,
    next_local_id: i64,
}

impl ContentTree {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            next_local_id: -1,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    fn alloc_local_id(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id -= 1;
        id
    }

    /// Validates the draft, assigns a pending local id and an order slot at
    /// the end of the course, and appends the topic.
    pub fn add_topic(&mut self, draft: TopicDraft) -> Result<&Topic> {
        if draft.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }

        let order = draft.order.unwrap_or_else(|| {
            self.course
                .topics
                .iter()
                .map(|t| t.sort_key())
                .max()
                .unwrap_or(0)
                + 1
        });

        let topic = Topic {
            id: TopicId(self.alloc_local_id()),
            title: draft.title,
            description: draft.description,
            order: Some(order),
            lessons: Vec::new(),
            assessments: Vec::new(),
            expanded: false,
        };

        self.course.topics.push(topic);
        Ok(self.course.topics.last().expect("topic just pushed"))
    }

    /// Validates the draft and appends a lesson to the given topic, with a
    /// default order slot after the topic's existing lessons.
    pub fn add_lesson(&mut self, topic_id: TopicId, draft: LessonDraft) -> Result<&Lesson> {
        if draft.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }

        let id = LessonId(self.alloc_local_id());
        let topic = self
            .course
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or(CatalogError::TopicNotFound(topic_id))?;

        let order = draft.order.unwrap_or(topic.lessons.len() as i64 + 1);

        let lesson = Lesson {
            id,
            title: draft.title,
            description: draft.description,
            content: draft.content,
            content_type: draft.content_type.unwrap_or(ContentType::Text),
            video_url: draft.video_url,
            estimated_duration_minutes: draft.estimated_duration_minutes,
            is_free_preview: draft.is_free_preview,
            order: Some(order),
            is_completed: false,
            attachments: Vec::new(),
            quiz: None,
        };

        topic.lessons.push(lesson);
        Ok(topic.lessons.last().expect("lesson just pushed"))
    }

    /// Replaces the topic wholesale and returns the previous value, which
    /// doubles as the inverse of the edit.
    pub fn update_topic(&mut self, topic: Topic) -> Result<Topic> {
        if topic.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }

        let entry = self
            .course
            .topics
            .iter_mut()
            .find(|t| t.id == topic.id)
            .ok_or(CatalogError::TopicNotFound(topic.id))?;

        Ok(std::mem::replace(entry, topic))
    }

    /// Replaces the lesson wholesale and returns the previous value.
    pub fn update_lesson(&mut self, lesson: Lesson) -> Result<Lesson> {
        if lesson.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }

        let entry = self
            .course
            .topics
            .iter_mut()
            .flat_map(|t| t.lessons.iter_mut())
            .find(|l| l.id == lesson.id)
            .ok_or(CatalogError::LessonNotFound(lesson.id))?;

        Ok(std::mem::replace(entry, lesson))
    }

    pub fn update_course_info(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        self.course.title = title;
        self.course.description = description.into();
        Ok(())
    }

    /// Validated status transition. Publishing is one-way and an archived
    /// course stays archived.
    pub fn set_course_status(&mut self, status: CourseStatus) -> Result<CourseStatus> {
        let current = self.course.status;
        let allowed = match (current, status) {
            (a, b) if a == b => true,
            (CourseStatus::Draft, CourseStatus::Published) => true,
            (CourseStatus::Draft, CourseStatus::Archived) => true,
            (CourseStatus::Published, CourseStatus::Archived) => true,
            _ => false,
        };
        if !allowed {
            return Err(CatalogError::InvalidStatusChange(current, status));
        }
        self.course.status = status;
        Ok(current)
    }

    /// Flips the UI expansion flag; returns the new state.
    pub fn toggle_expansion(&mut self, topic_id: TopicId) -> Result<bool> {
        let topic = self
            .course
            .topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or(CatalogError::TopicNotFound(topic_id))?;
        topic.expanded = !topic.expanded;
        Ok(topic.expanded)
    }

    /// Replaces the topic list with a freshly fetched one. Entries with
    /// duplicate ids are collapsed, first occurrence wins; the remote API
    /// has been seen returning overlapping pages.
    pub fn absorb_topics(&mut self, topics: Vec<Topic>) {
        let mut seen = HashSet::new();
        self.course.topics = topics
            .into_iter()
            .filter(|t| seen.insert(t.id))
            .collect();
    }

    /// Stamps `is_completed` onto every lesson from the completed-id set.
    pub fn apply_completion(&mut self, completed: &HashSet<LessonId>) {
        for topic in &mut self.course.topics {
            for lesson in &mut topic.lessons {
                lesson.is_completed = completed.contains(&lesson.id);
            }
        }
    }

    /// Marks one lesson completed. Returns false when it already was, so
    /// callers can skip redundant remote pushes.
    pub fn set_lesson_completed(&mut self, lesson_id: LessonId) -> Result<bool> {
        let lesson = self
            .course
            .topics
            .iter_mut()
            .flat_map(|t| t.lessons.iter_mut())
            .find(|l| l.id == lesson_id)
            .ok_or(CatalogError::LessonNotFound(lesson_id))?;

        let newly = !lesson.is_completed;
        lesson.is_completed = true;
        Ok(newly)
    }

    /// Swaps a pending local topic id for the server-confirmed one.
    pub fn confirm_topic_id(&mut self, local: TopicId, confirmed: TopicId) -> Result<()> {
        let topic = self
            .course
            .topics
            .iter_mut()
            .find(|t| t.id == local)
            .ok_or(CatalogError::TopicNotFound(local))?;
        topic.id = confirmed;
        Ok(())
    }

    pub fn confirm_lesson_id(&mut self, local: LessonId, confirmed: LessonId) -> Result<()> {
        let lesson = self
            .course
            .topics
            .iter_mut()
            .flat_map(|t| t.lessons.iter_mut())
            .find(|l| l.id == local)
            .ok_or(CatalogError::LessonNotFound(local))?;
        lesson.id = confirmed;
        Ok(())
    }
}
