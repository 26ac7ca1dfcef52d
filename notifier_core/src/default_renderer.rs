use crate::catalog::{EventKind, KindMask};
use crate::plugin::{Notification, RendererPlugin};
use crate::registry::DEFAULT_PLUGIN_ID;
use crate::settings::{PluginSettings, DEFAULT_ON_SCREEN_TIME_MS};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_BLOCKS: usize = 1;
const FALLBACK_BLOCKS: usize = 3;
const DEFAULT_MAX_PATH_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockLayout {
    blocks: usize,
    max_path_chars: usize,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            blocks: DEFAULT_BLOCKS,
            max_path_chars: DEFAULT_MAX_PATH_CHARS,
        }
    }
}

impl BlockLayout {
    /// Reads `Key=Value` lines. Visual keys (colors, sizes, margins) have no
    /// meaning here and are skipped.
    fn parse(additional_data: &str) -> Self {
        let mut layout = Self::default();
        for line in additional_data.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Blocks" => layout.blocks = value.parse().unwrap_or(FALLBACK_BLOCKS),
                "MaxPathChars" => {
                    layout.max_path_chars = value.parse().unwrap_or(DEFAULT_MAX_PATH_CHARS)
                }
                _ => {}
            }
        }
        layout
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleBlock {
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    shown_at: Instant,
}

/// Headless stacking popup: newest block first, each one expiring after the
/// configured on-screen time.
pub struct DefaultRenderer {
    layout: BlockLayout,
    on_screen_time: Duration,
    stack: VecDeque<VisibleBlock>,
    active: bool,
}

impl DefaultRenderer {
    pub fn new() -> Self {
        Self {
            layout: BlockLayout::default(),
            on_screen_time: Duration::from_millis(DEFAULT_ON_SCREEN_TIME_MS),
            stack: VecDeque::new(),
            active: false,
        }
    }

    /// Blocks still on screen at `now`, newest first.
    pub fn visible_at(&mut self, now: Instant) -> impl Iterator<Item = &VisibleBlock> {
        let ttl = self.on_screen_time;
        self.stack
            .retain(|block| now.saturating_duration_since(block.shown_at) < ttl);
        self.stack.iter()
    }

    pub fn visible(&mut self) -> impl Iterator<Item = &VisibleBlock> {
        self.visible_at(Instant::now())
    }

    fn push(&mut self, notification: &Notification, now: Instant) {
        let description = notification
            .description
            .as_deref()
            .map(|text| shorten_left(text, self.layout.max_path_chars));

        info!(
            kind = ?notification.kind,
            title = %notification.title,
            description = description.as_deref().unwrap_or(""),
            "notification"
        );

        self.stack.push_front(VisibleBlock {
            kind: notification.kind,
            title: notification.title.clone(),
            description,
            shown_at: now,
        });
        self.stack.truncate(self.layout.blocks);
    }
}

impl Default for DefaultRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererPlugin for DefaultRenderer {
    fn id(&self) -> &str {
        DEFAULT_PLUGIN_ID
    }

    fn default_active_kinds(&self) -> KindMask {
        KindMask::MINIMAL
    }

    fn render(&mut self, notification: &Notification) {
        if !self.active {
            return;
        }
        self.push(notification, Instant::now());
    }

    fn activate(&mut self, settings: &PluginSettings) {
        self.layout = BlockLayout::parse(&settings.additional_data);
        self.on_screen_time = Duration::from_millis(settings.on_screen_time_ms);
        self.stack.truncate(self.layout.blocks);
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.stack.clear();
    }

    fn dispose(&mut self) {
        self.deactivate();
    }
}

/// Keeps the last `max_chars` characters, marking the cut with `...`.
fn shorten_left(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max_chars).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(kind: EventKind, description: Option<&str>) -> Notification {
        Notification {
            kind,
            title: kind.name().to_string(),
            description: description.map(str::to_string),
            args: Vec::new(),
        }
    }

    fn activated(additional_data: &str, on_screen_time_ms: u64) -> DefaultRenderer {
        let mut renderer = DefaultRenderer::new();
        renderer.activate(&PluginSettings {
            additional_data: additional_data.to_string(),
            on_screen_time_ms,
            ..PluginSettings::default()
        });
        renderer
    }

    #[test]
    fn layout_keys_parse_with_fallbacks() {
        assert_eq!(BlockLayout::parse(""), BlockLayout::default());
        let layout = BlockLayout::parse("Blocks=4\r\nBackgroundColor=#fff\nMaxPathChars = 10");
        assert_eq!(layout.blocks, 4);
        assert_eq!(layout.max_path_chars, 10);

        let invalid = BlockLayout::parse("Blocks=many\nMaxPathChars=-");
        assert_eq!(invalid.blocks, FALLBACK_BLOCKS);
        assert_eq!(invalid.max_path_chars, DEFAULT_MAX_PATH_CHARS);
    }

    #[test]
    fn stack_is_bounded_and_newest_first() {
        let mut renderer = activated("Blocks=2", 60_000);
        renderer.render(&notification(EventKind::RecordingStarted, None));
        renderer.render(&notification(EventKind::RecordingPaused, None));
        renderer.render(&notification(EventKind::RecordingStopped, None));

        let kinds: Vec<EventKind> = renderer.visible().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![EventKind::RecordingStopped, EventKind::RecordingPaused]);
    }

    #[test]
    fn blocks_expire_after_on_screen_time() {
        let mut renderer = activated("", 100);
        let now = Instant::now();
        renderer.push(&notification(EventKind::Connected, None), now);
        assert_eq!(renderer.visible_at(now + Duration::from_millis(50)).count(), 1);
        assert_eq!(renderer.visible_at(now + Duration::from_millis(100)).count(), 0);
    }

    #[test]
    fn long_descriptions_are_cut_from_the_left() {
        let mut renderer = activated("MaxPathChars=8", 60_000);
        renderer.render(&notification(
            EventKind::ReplaySaved,
            Some("C:/videos/replay-0001.mkv"),
        ));
        let block = renderer.visible().next().cloned();
        assert_eq!(
            block.and_then(|b| b.description),
            Some("...0001.mkv".to_string())
        );
        assert_eq!(shorten_left("short", 8), "short");
    }

    #[test]
    fn inactive_renderer_shows_nothing() {
        let mut renderer = DefaultRenderer::new();
        renderer.render(&notification(EventKind::Connected, None));
        assert_eq!(renderer.visible().count(), 0);

        let mut renderer = activated("", 60_000);
        renderer.render(&notification(EventKind::Connected, None));
        renderer.deactivate();
        assert_eq!(renderer.visible().count(), 0);
    }
}
