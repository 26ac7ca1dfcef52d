use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{BitOr, BitOrAssign};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    ReplayStarted,
    ReplayStopped,
    ReplaySaved,
    RecordingStarted,
    RecordingStopped,
    RecordingPaused,
    RecordingResumed,
    StreamingStarted,
    StreamingStopped,
    VirtualCameraStarted,
    VirtualCameraStopped,
    SceneSwitched,
    SceneCollectionSwitched,
    ProfileSwitched,
    AudioSourceMuted,
    AudioSourceUnmuted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub template: Option<&'static str>,
}

impl EventKind {
    pub const ALL: [EventKind; 18] = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::ReplayStarted,
        EventKind::ReplayStopped,
        EventKind::ReplaySaved,
        EventKind::RecordingStarted,
        EventKind::RecordingStopped,
        EventKind::RecordingPaused,
        EventKind::RecordingResumed,
        EventKind::StreamingStarted,
        EventKind::StreamingStopped,
        EventKind::VirtualCameraStarted,
        EventKind::VirtualCameraStopped,
        EventKind::SceneSwitched,
        EventKind::SceneCollectionSwitched,
        EventKind::ProfileSwitched,
        EventKind::AudioSourceMuted,
        EventKind::AudioSourceUnmuted,
    ];

    /// Bit positions are persisted in user settings and must not move.
    pub const fn bit(self) -> u64 {
        match self {
            EventKind::Connected => 1 << 0,
            EventKind::Disconnected => 1 << 1,
            EventKind::ReplayStarted => 1 << 2,
            EventKind::ReplayStopped => 1 << 3,
            EventKind::ReplaySaved => 1 << 4,
            EventKind::RecordingStarted => 1 << 5,
            EventKind::RecordingStopped => 1 << 6,
            EventKind::RecordingPaused => 1 << 7,
            EventKind::RecordingResumed => 1 << 8,
            EventKind::StreamingStarted => 1 << 9,
            EventKind::StreamingStopped => 1 << 10,
            EventKind::VirtualCameraStarted => 1 << 11,
            EventKind::VirtualCameraStopped => 1 << 12,
            EventKind::SceneSwitched => 1 << 24,
            EventKind::SceneCollectionSwitched => 1 << 25,
            EventKind::ProfileSwitched => 1 << 32,
            EventKind::AudioSourceMuted => 1 << 34,
            EventKind::AudioSourceUnmuted => 1 << 35,
        }
    }

    pub const fn entry(self) -> CatalogEntry {
        const CURRENT: Option<&str> = Some("Current: {0}");
        const SOURCE: Option<&str> = Some("Source: {0}");
        let (name, template) = match self {
            EventKind::Connected => ("Connected to OBS", None),
            EventKind::Disconnected => ("Disconnected from OBS", None),
            EventKind::ReplayStarted => ("Replay Started", None),
            EventKind::ReplayStopped => ("Replay Stopped", None),
            EventKind::ReplaySaved => ("Replay Saved", None),
            EventKind::RecordingStarted => ("Recording Started", None),
            EventKind::RecordingStopped => ("Recording Stopped", None),
            EventKind::RecordingPaused => ("Recording Paused", None),
            EventKind::RecordingResumed => ("Recording Resumed", None),
            EventKind::StreamingStarted => ("Streaming Started", None),
            EventKind::StreamingStopped => ("Streaming Stopped", None),
            EventKind::VirtualCameraStarted => ("Virtual Camera Started", None),
            EventKind::VirtualCameraStopped => ("Virtual Camera Stopped", None),
            EventKind::SceneSwitched => ("Scene Switched", CURRENT),
            EventKind::SceneCollectionSwitched => ("Scene Collection Switched", CURRENT),
            EventKind::ProfileSwitched => ("Profile Switched", CURRENT),
            EventKind::AudioSourceMuted => ("Audio is Muted", SOURCE),
            EventKind::AudioSourceUnmuted => ("Audio is Turned On", SOURCE),
        };
        CatalogEntry { name, template }
    }

    pub const fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn is_connection_notice(self) -> bool {
        matches!(self, EventKind::Connected | EventKind::Disconnected)
    }
}

/// A set of [`EventKind`]s. Membership is only ever tested against a single
/// kind; the preset unions are values, never members.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct KindMask(u64);

impl KindMask {
    pub const NONE: KindMask = KindMask(0);

    pub const MINIMAL: KindMask = KindMask::from_kinds(&[
        EventKind::ReplaySaved,
        EventKind::RecordingStarted,
        EventKind::RecordingStopped,
        EventKind::StreamingStarted,
        EventKind::StreamingStopped,
        EventKind::SceneSwitched,
        EventKind::AudioSourceMuted,
        EventKind::AudioSourceUnmuted,
    ]);

    pub const ALL: KindMask = KindMask::from_kinds(&EventKind::ALL);

    pub const fn from_kinds(kinds: &[EventKind]) -> KindMask {
        let mut bits = 0;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        KindMask(bits)
    }

    /// Drops bits that do not belong to any known kind.
    pub const fn from_bits_truncate(bits: u64) -> KindMask {
        KindMask(bits & KindMask::ALL.0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn with(self, kind: EventKind) -> KindMask {
        KindMask(self.0 | kind.bit())
    }

    pub const fn without(self, kind: EventKind) -> KindMask {
        KindMask(self.0 & !kind.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn kinds(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl BitOr for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: KindMask) -> KindMask {
        KindMask(self.0 | rhs.0)
    }
}

impl BitOr<EventKind> for KindMask {
    type Output = KindMask;

    fn bitor(self, rhs: EventKind) -> KindMask {
        self.with(rhs)
    }
}

impl BitOrAssign for KindMask {
    fn bitor_assign(&mut self, rhs: KindMask) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<EventKind> for KindMask {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(KindMask::NONE, KindMask::with)
    }
}

/// Substitutes `{n}` placeholders with positional arguments.
///
/// Strings are inserted verbatim, other values as their JSON text. Returns
/// `None` when the template references an argument that was not supplied.
pub fn format_description(template: &str, args: &[Value]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Some(out);
        };
        match after[..close].parse::<usize>() {
            Ok(index) => {
                let arg = args.get(index)?;
                match arg {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
            Err(_) => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Some(out)
}
