use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use catalog::{ContentType, Lesson, LessonId};

/// Playback failures carry the root cause; "video failed" tells the user
/// nothing about whether to retry, re-upload, or fix the URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("the lesson has no video source; add a video URL and save again")]
    EmptySource,

    #[error("this video format is not supported by the player: {0}")]
    UnsupportedSource(String),

    #[error("the video could not be loaded over the network; check the connection and retry")]
    Network(String),

    #[error("the video file appears to be corrupted and could not be decoded; try re-uploading it")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Raw fault reported by the underlying media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFault {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
}

/// Maps a media-element fault onto the user-facing taxonomy.
pub fn classify_fault(fault: MediaFault, source: &str) -> PlaybackError {
    match fault {
        MediaFault::Network | MediaFault::Aborted => PlaybackError::Network(source.to_string()),
        MediaFault::Decode => PlaybackError::Decode(source.to_string()),
        MediaFault::SrcNotSupported => PlaybackError::UnsupportedSource(source.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedProvider {
    YouTube,
    Vimeo,
}

/// Detects embeddable third-party links by URL shape; the stored content
/// flag says "video" for these too, so the URL is the only signal.
pub fn embed_provider(url: &str) -> Option<EmbedProvider> {
    let url = url.trim();
    if url.contains("youtube.com/watch")
        || url.contains("youtube.com/embed")
        || url.contains("youtu.be/")
    {
        Some(EmbedProvider::YouTube)
    } else if url.contains("vimeo.com/") {
        Some(EmbedProvider::Vimeo)
    } else {
        None
    }
}

/// How the active lesson is rendered, which decides who tracks time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Directly hosted media; the controller tracks position and fires
    /// auto-completion when playback ends.
    Tracked,
    /// Third-party frame; position is opaque to us and completion only
    /// ever happens by explicit user action.
    Embedded(EmbedProvider),
    /// Non-video content; the controller is inert.
    Inert,
}

#[derive(Debug, Clone)]
struct ActiveMedia {
    lesson_id: LessonId,
    mode: PlaybackMode,
    position_secs: f64,
    duration_secs: Option<f64>,
    playing: bool,
    ended: bool,
}

/// Tracks the media element's local playback state and emits a completion
/// signal when a tracked video plays to the end. Each mutation mirrors a
/// synchronous operation on the underlying element.
pub struct PlaybackController {
    active: Option<ActiveMedia>,
    volume: f32,
    muted: bool,
    completion_tx: mpsc::UnboundedSender<LessonId>,
}

impl PlaybackController {
    /// The receiver carries "lesson finished" signals for the sync layer
    /// to consume as completion triggers.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LessonId>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        (
            Self {
                active: None,
                volume: 1.0,
                muted: false,
                completion_tx,
            },
            completion_rx,
        )
    }

    /// Switches the active lesson. Position resets to zero and playback
    /// pauses unconditionally, even mid-playback of the previous lesson.
    pub fn load_lesson(&mut self, lesson: &Lesson) -> Result<PlaybackMode> {
        let mode = match lesson.content_type {
            ContentType::Video => match lesson.video_url.as_deref() {
                None | Some("") => return Err(PlaybackError::EmptySource),
                Some(url) => match embed_provider(url) {
                    Some(provider) => PlaybackMode::Embedded(provider),
                    None => PlaybackMode::Tracked,
                },
            },
            _ => PlaybackMode::Inert,
        };

        debug!(lesson = %lesson.id, ?mode, "lesson loaded into player");
        self.active = Some(ActiveMedia {
            lesson_id: lesson.id,
            mode,
            position_secs: 0.0,
            duration_secs: lesson
                .estimated_duration_minutes
                .map(|m| f64::from(m) * 60.0),
            playing: false,
            ended: false,
        });
        Ok(mode)
    }

    pub fn active_lesson(&self) -> Option<LessonId> {
        self.active.as_ref().map(|a| a.lesson_id)
    }

    pub fn mode(&self) -> Option<PlaybackMode> {
        self.active.as_ref().map(|a| a.mode)
    }

    pub fn position_secs(&self) -> f64 {
        self.active.as_ref().map(|a| a.position_secs).unwrap_or(0.0)
    }

    pub fn is_playing(&self) -> bool {
        self.active.as_ref().map(|a| a.playing).unwrap_or(false)
    }

    pub fn play(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if active.mode == PlaybackMode::Tracked && !active.ended {
                active.playing = true;
            }
        }
    }

    pub fn pause(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.playing = false;
        }
    }

    /// Clamps into the known duration when there is one; the element
    /// reports the true duration only once metadata arrives.
    pub fn seek(&mut self, position_secs: f64) {
        if let Some(active) = self.active.as_mut() {
            if active.mode != PlaybackMode::Tracked {
                return;
            }
            let clamped = match active.duration_secs {
                Some(duration) => position_secs.clamp(0.0, duration),
                None => position_secs.max(0.0),
            };
            active.position_secs = clamped;
            active.ended = false;
        }
    }

    /// Periodic position report from the media element.
    pub fn report_position(&mut self, position_secs: f64, duration_secs: Option<f64>) {
        if let Some(active) = self.active.as_mut() {
            if active.mode == PlaybackMode::Tracked {
                active.position_secs = position_secs.max(0.0);
                if duration_secs.is_some() {
                    active.duration_secs = duration_secs;
                }
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Natural end of playback: the single trigger for auto-completion.
    /// Fires once per playback run (seeking back rearms it, and the
    /// downstream completion is idempotent) and never for embedded or
    /// inert content, which complete only by explicit user action.
    pub fn on_ended(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.mode != PlaybackMode::Tracked || active.ended {
            return;
        }

        active.ended = true;
        active.playing = false;
        if let Some(duration) = active.duration_secs {
            active.position_secs = duration;
        }

        debug!(lesson = %active.lesson_id, "playback ended, emitting completion signal");
        // receiver gone means nobody cares about completions anymore
        let _ = self.completion_tx.send(active.lesson_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_lesson(id: i64, url: &str) -> Lesson {
        Lesson {
            id: LessonId(id),
            title: "Watch me".to_string(),
            description: String::new(),
            content: String::new(),
            content_type: ContentType::Video,
            video_url: Some(url.to_string()),
            estimated_duration_minutes: Some(10),
            is_free_preview: false,
            order: Some(1),
            is_completed: false,
            attachments: Vec::new(),
            quiz: None,
        }
    }

    fn text_lesson(id: i64) -> Lesson {
        Lesson {
            content_type: ContentType::Text,
            video_url: None,
            ..video_lesson(id, "")
        }
    }

    #[test]
    fn embed_detection_by_url_shape() {
        assert_eq!(
            embed_provider("https://www.youtube.com/watch?v=abc123"),
            Some(EmbedProvider::YouTube)
        );
        assert_eq!(
            embed_provider("https://youtu.be/abc123"),
            Some(EmbedProvider::YouTube)
        );
        assert_eq!(
            embed_provider("https://vimeo.com/987654"),
            Some(EmbedProvider::Vimeo)
        );
        assert_eq!(embed_provider("https://cdn.example.com/v.mp4"), None);
    }

    #[test]
    fn loading_resets_position_and_pauses() {
        let (mut player, _rx) = PlaybackController::new();

        player
            .load_lesson(&video_lesson(1, "https://cdn.example.com/a.mp4"))
            .unwrap();
        player.play();
        player.report_position(42.0, Some(600.0));
        assert!(player.is_playing());

        player
            .load_lesson(&video_lesson(2, "https://cdn.example.com/b.mp4"))
            .unwrap();
        assert_eq!(player.position_secs(), 0.0);
        assert!(!player.is_playing());
        assert_eq!(player.active_lesson(), Some(LessonId(2)));
    }

    #[test]
    fn empty_source_is_its_own_error() {
        let (mut player, _rx) = PlaybackController::new();
        let mut lesson = video_lesson(1, "");
        lesson.video_url = None;

        assert_eq!(
            player.load_lesson(&lesson).unwrap_err(),
            PlaybackError::EmptySource
        );
    }

    #[test]
    fn fault_classification_is_specific() {
        let network = classify_fault(MediaFault::Network, "v.mp4");
        let decode = classify_fault(MediaFault::Decode, "v.mp4");
        let unsupported = classify_fault(MediaFault::SrcNotSupported, "v.mkv");

        assert!(network.to_string().contains("network"));
        assert!(decode.to_string().contains("decoded"));
        assert!(unsupported.to_string().contains("not supported"));
        assert_ne!(network.to_string(), decode.to_string());
    }

    #[tokio::test]
    async fn ended_fires_completion_once() {
        let (mut player, mut rx) = PlaybackController::new();
        player
            .load_lesson(&video_lesson(7, "https://cdn.example.com/a.mp4"))
            .unwrap();
        player.play();

        player.on_ended();
        player.on_ended();

        assert_eq!(rx.recv().await, Some(LessonId(7)));
        assert!(rx.try_recv().is_err());
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn embedded_videos_never_auto_complete() {
        let (mut player, mut rx) = PlaybackController::new();
        let mode = player
            .load_lesson(&video_lesson(7, "https://www.youtube.com/watch?v=abc"))
            .unwrap();
        assert_eq!(mode, PlaybackMode::Embedded(EmbedProvider::YouTube));

        player.on_ended();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn non_video_content_is_inert() {
        let (mut player, _rx) = PlaybackController::new();
        let mode = player.load_lesson(&text_lesson(3)).unwrap();
        assert_eq!(mode, PlaybackMode::Inert);

        player.play();
        assert!(!player.is_playing());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let (mut player, _rx) = PlaybackController::new();
        player
            .load_lesson(&video_lesson(1, "https://cdn.example.com/a.mp4"))
            .unwrap();
        player.report_position(0.0, Some(300.0));

        player.seek(1000.0);
        assert_eq!(player.position_secs(), 300.0);

        player.seek(-5.0);
        assert_eq!(player.position_secs(), 0.0);
    }

    #[test]
    fn volume_clamps_and_mute_toggles() {
        let (mut player, _rx) = PlaybackController::new();
        player.set_volume(1.8);
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-0.3);
        assert_eq!(player.volume(), 0.0);

        assert!(player.toggle_mute());
        assert!(!player.toggle_mute());
    }

    #[tokio::test]
    async fn seeking_back_rearms_the_end_signal() {
        let (mut player, mut rx) = PlaybackController::new();
        player
            .load_lesson(&video_lesson(1, "https://cdn.example.com/a.mp4"))
            .unwrap();
        player.report_position(0.0, Some(300.0));
        player.on_ended();
        assert_eq!(rx.recv().await, Some(LessonId(1)));

        player.seek(10.0);
        player.play();
        assert!(player.is_playing());

        player.on_ended();
        assert_eq!(rx.recv().await, Some(LessonId(1)));
    }
}
