use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use catalog::{CourseId, LessonDraft, LessonId, TopicDraft, TopicId};
use playback::{embed_provider, PlaybackController, PlaybackMode};
use sync::{ApiConfig, HttpCourseApi, SessionContext, SyncEngine};

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Campus course tooling - headless course and progress operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL including the version prefix
    #[arg(long, global = true, env = "CAMPUS_API_URL", default_value = "http://localhost:8000/api/v1")]
    api_url: String,

    /// Bearer token for the backend
    #[arg(long, global = true, env = "CAMPUS_API_TOKEN")]
    token: Option<String>,

    /// Acting student/tutor id
    #[arg(long, global = true, env = "CAMPUS_STUDENT_ID", default_value = "0")]
    student_id: i64,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the course outline with per-lesson completion state
    Outline {
        /// Course id
        course_id: i64,

        /// Emit the outline as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Mark a lesson complete and reconcile with the backend
    Complete {
        /// Course id
        course_id: i64,

        /// Lesson id
        lesson_id: i64,
    },

    /// Show full lesson detail and how the player would treat it
    Inspect {
        /// Course id
        course_id: i64,

        /// Lesson id
        lesson_id: i64,
    },

    /// Create a topic under a course
    NewTopic {
        /// Course id
        course_id: i64,

        /// Topic title
        title: String,

        /// Topic description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Create a lesson under a topic
    NewLesson {
        /// Course id
        course_id: i64,

        /// Parent topic id
        topic_id: i64,

        /// Lesson title
        title: String,

        /// Video URL, if the lesson is a video
        #[arg(long)]
        video_url: Option<String>,

        /// Estimated duration in minutes
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Publish a draft course (irreversible)
    Publish {
        /// Course id
        course_id: i64,
    },

    /// Archive a course
    Archive {
        /// Course id
        course_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let mut session = SessionContext::new(cli.student_id);
    if let Some(token) = &cli.token {
        session = session.with_auth_token(token.clone());
    }

    let mut config = ApiConfig::new(cli.api_url.clone());
    if let Some(token) = &cli.token {
        config = config.with_auth_token(token.clone());
    }
    let api = Arc::new(HttpCourseApi::new(config).context("building API client")?);

    match cli.command {
        Commands::Outline { course_id, json } => outline_command(api, session, course_id, json).await,
        Commands::Complete {
            course_id,
            lesson_id,
        } => complete_command(api, session, course_id, lesson_id).await,
        Commands::Inspect {
            course_id,
            lesson_id,
        } => inspect_command(api, session, course_id, lesson_id).await,
        Commands::NewTopic {
            course_id,
            title,
            description,
        } => new_topic_command(api, session, course_id, title, description).await,
        Commands::NewLesson {
            course_id,
            topic_id,
            title,
            video_url,
            duration,
        } => new_lesson_command(api, session, course_id, topic_id, title, video_url, duration).await,
        Commands::Publish { course_id } => publish_command(api, session, course_id).await,
        Commands::Archive { course_id } => archive_command(api, session, course_id).await,
    }
}

async fn load_engine(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
) -> Result<SyncEngine> {
    SyncEngine::load(api, session, CourseId(course_id))
        .await
        .context("loading course")
}

async fn outline_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
    json: bool,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;

    let course = engine.course().await;
    let snapshot = engine.snapshot().await;
    let totals = progress::course_totals(&course);

    if json {
        let payload = serde_json::json!({
            "course": course,
            "totals": totals,
            "progress": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{} [{}]", course.title, course.status);
    if !course.description.is_empty() {
        println!("{}", course.description);
    }
    println!(
        "{} topics, {} lessons, ~{} min",
        totals.topics, totals.lessons, totals.estimated_minutes
    );
    println!(
        "progress: {}/{} lessons ({}%)",
        snapshot.completed_lessons, snapshot.total_lessons, snapshot.progress_percentage
    );
    println!();

    for topic in course.topics_ordered() {
        println!("  {} {}", topic.id, topic.title);
        for lesson in topic.lessons_ordered() {
            let mark = if lesson.is_completed { "x" } else { " " };
            let duration = lesson
                .estimated_duration_minutes
                .map(|m| format!(" ({m} min)"))
                .unwrap_or_default();
            println!("    [{mark}] {} {}{duration}", lesson.id, lesson.title);
        }
    }

    Ok(())
}

async fn complete_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
    lesson_id: i64,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;

    let snapshot = engine
        .mark_lesson_complete(LessonId(lesson_id))
        .await
        .context("marking lesson complete")?;

    println!(
        "lesson {lesson_id} complete; progress {}/{} ({}%)",
        snapshot.completed_lessons, snapshot.total_lessons, snapshot.progress_percentage
    );

    // the push is fire-and-forget; give it a moment before reporting
    tokio::time::sleep(Duration::from_millis(750)).await;
    report_notices(&engine).await;

    let course = engine.course().await;
    if let Some(next) = catalog::navigator::next(&course, LessonId(lesson_id)) {
        println!("next up: {} {}", next.id, next.title);
    } else {
        println!("that was the last lesson");
    }

    Ok(())
}

async fn inspect_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
    lesson_id: i64,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;

    let generation = engine.select_lesson(LessonId(lesson_id));
    let lesson = engine
        .hydrate_lesson(LessonId(lesson_id), generation)
        .await
        .context("fetching lesson detail")?
        .context("lesson detail discarded as stale")?;

    println!("{} {}", lesson.id, lesson.title);
    if !lesson.description.is_empty() {
        println!("{}", lesson.description);
    }
    println!("type: {:?}, completed: {}", lesson.content_type, lesson.is_completed);

    let (mut player, _completions) = PlaybackController::new();
    match player.load_lesson(&lesson) {
        Ok(PlaybackMode::Tracked) => {
            println!("playback: directly hosted, auto-completes when the video ends")
        }
        Ok(PlaybackMode::Embedded(provider)) => {
            println!("playback: embedded {provider:?} frame, complete manually when done")
        }
        Ok(PlaybackMode::Inert) => println!("playback: not a video lesson"),
        Err(err) => println!("playback: {err}"),
    }
    if let Some(url) = &lesson.video_url {
        if let Some(provider) = embed_provider(url) {
            info!(?provider, "third-party video link detected");
        }
    }

    let course = engine.course().await;
    if let Some((index, total)) = catalog::navigator::position(&course, lesson.id) {
        println!("lesson {index} of {total}");
    }

    Ok(())
}

async fn new_topic_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
    title: String,
    description: String,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;

    let local_id = engine
        .create_topic(TopicDraft {
            title,
            description,
            order: None,
        })
        .await
        .context("creating topic")?;

    let confirmed = wait_for_confirmation(&engine, local_id).await;
    report_notices(&engine).await;

    match confirmed {
        Some(id) => println!("topic created with id {id}"),
        None => println!("topic kept locally under pending id {local_id}"),
    }
    Ok(())
}

async fn new_lesson_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
    topic_id: i64,
    title: String,
    video_url: Option<String>,
    duration: Option<u32>,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;

    let content_type = video_url
        .is_some()
        .then_some(catalog::ContentType::Video);

    let local_id = engine
        .create_lesson(
            TopicId(topic_id),
            LessonDraft {
                title,
                content_type,
                video_url,
                estimated_duration_minutes: duration,
                ..Default::default()
            },
        )
        .await
        .context("creating lesson")?;

    // give the push a moment, then report where things landed
    tokio::time::sleep(Duration::from_millis(750)).await;
    report_notices(&engine).await;

    let course = engine.course().await;
    if course.find_lesson(local_id).is_some() {
        println!("lesson kept locally under pending id {local_id}");
    } else {
        println!("lesson created");
    }
    Ok(())
}

async fn publish_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;
    let status = engine.publish_course().await.context("publishing course")?;
    println!("course {course_id} is now {status}");
    Ok(())
}

async fn archive_command(
    api: Arc<HttpCourseApi>,
    session: SessionContext,
    course_id: i64,
) -> Result<()> {
    let engine = load_engine(api, session, course_id).await?;
    let status = engine.archive_course().await.context("archiving course")?;
    println!("course {course_id} is now {status}");
    Ok(())
}

/// Polls until the pending topic id has been replaced by a server id, or
/// gives up after a short grace period.
async fn wait_for_confirmation(engine: &SyncEngine, local_id: TopicId) -> Option<TopicId> {
    let pending_order = engine
        .with_tree(|tree| tree.course().find_topic(local_id).and_then(|t| t.order))
        .await;

    for _ in 0..20 {
        let confirmed = engine
            .with_tree(|tree| {
                if tree.course().find_topic(local_id).is_some() {
                    return None;
                }
                tree.course()
                    .topics
                    .iter()
                    .find(|t| !t.id.is_local() && t.order == pending_order)
                    .map(|t| t.id)
            })
            .await;
        if confirmed.is_some() {
            return confirmed;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    None
}

async fn report_notices(engine: &SyncEngine) {
    for notice in engine.notices().active().await {
        println!("note: {}", notice.message);
    }
}
