//! Channel model.
//!
//! [`VideoChannel`] and [`Stage`] are minimal in-process stand-ins for
//! the render pipeline: the control plane only needs the channel's frame
//! rate, its running timecode and per-layer content bookkeeping. The
//! [`ChannelContext`] bundles the handles every channel command receives.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use amcp_proto::FrameTimecode;
use parking_lot::{Mutex, RwLock};

use crate::command::lock::LockContainer;

/// A video format a channel can run in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    /// Format name as used by `SET MODE` (e.g., "PAL", "720p50").
    pub name: String,
    /// Frames per second, rounded to the channel clock rate.
    pub fps: u8,
}

impl VideoFormat {
    /// Look up a format by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let fps = match name.to_ascii_uppercase().as_str() {
            "PAL" | "576P2500" | "1080P25" | "1080I50" => 25,
            "NTSC" | "1080P30" | "1080I5994" => 30,
            "720P50" | "1080P50" => 50,
            "720P5994" | "720P60" | "1080P60" => 60,
            _ => return None,
        };
        Some(Self { name: name.to_ascii_uppercase(), fps })
    }
}

/// One independently rendered output signal.
///
/// The render pipeline itself is an external collaborator; this handle
/// carries the pieces the command subsystem observes and mutates: the
/// active format and the per-frame timecode counter.
pub struct VideoChannel {
    index: usize,
    format: RwLock<VideoFormat>,
    frames: AtomicU32,
}

impl VideoChannel {
    pub fn new(index: usize, format: VideoFormat) -> Self {
        Self {
            index,
            format: RwLock::new(format),
            frames: AtomicU32::new(0),
        }
    }

    /// Zero-based channel index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current frame rate.
    pub fn fps(&self) -> u8 {
        self.format.read().fps
    }

    /// Current format name.
    pub fn format_name(&self) -> String {
        self.format.read().name.clone()
    }

    /// Switch video format, re-timing the running timecode.
    pub fn set_format(&self, format: VideoFormat) {
        let mut current = self.format.write();
        let tc = FrameTimecode::new(self.frames.load(Ordering::Acquire), current.fps);
        self.frames
            .store(tc.with_fps(format.fps).total_frames(), Ordering::Release);
        *current = format;
    }

    /// Current channel timecode.
    pub fn timecode(&self) -> FrameTimecode {
        FrameTimecode::new(self.frames.load(Ordering::Acquire), self.fps())
    }

    /// Jump the channel timecode.
    pub fn set_timecode(&self, tc: FrameTimecode) {
        self.frames
            .store(tc.with_fps(self.fps()).total_frames(), Ordering::Release);
    }

    /// Advance one frame and return the new timecode. Called by the
    /// render tick loop once per rendered frame.
    pub fn tick(&self) -> FrameTimecode {
        let fps = self.fps();
        let max = amcp_proto::timecode::max_frames_for_fps(fps);
        let prev = self
            .frames
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |f| {
                Some(if f + 1 >= max { 0 } else { f + 1 })
            })
            .unwrap_or(0);
        FrameTimecode::new(if prev + 1 >= max { 0 } else { prev + 1 }, fps)
    }
}

/// Content state of one layer.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub foreground: Option<String>,
    pub background: Option<String>,
    pub paused: bool,
}

/// Per-channel layer bookkeeping. Stands in for the compositing stage of
/// the render pipeline at the granularity the control plane cares about.
#[derive(Default)]
pub struct Stage {
    layers: Mutex<BTreeMap<i32, Layer>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a clip into a layer's background slot.
    pub fn load_background(&self, layer: i32, clip: String) {
        let mut layers = self.layers.lock();
        layers.entry(layer).or_default().background = Some(clip);
    }

    /// Load a clip straight into the foreground, preempting playback.
    pub fn load(&self, layer: i32, clip: String) {
        let mut layers = self.layers.lock();
        let entry = layers.entry(layer).or_default();
        entry.foreground = Some(clip);
        entry.paused = true;
    }

    /// Start playback: promotes the background when one is loaded.
    pub fn play(&self, layer: i32) {
        let mut layers = self.layers.lock();
        let entry = layers.entry(layer).or_default();
        if let Some(bg) = entry.background.take() {
            entry.foreground = Some(bg);
        }
        entry.paused = false;
    }

    pub fn pause(&self, layer: i32) {
        let mut layers = self.layers.lock();
        layers.entry(layer).or_default().paused = true;
    }

    pub fn resume(&self, layer: i32) {
        let mut layers = self.layers.lock();
        layers.entry(layer).or_default().paused = false;
    }

    /// Stop playback on a layer, discarding its foreground.
    pub fn stop(&self, layer: i32) {
        let mut layers = self.layers.lock();
        if let Some(entry) = layers.get_mut(&layer) {
            entry.foreground = None;
            entry.paused = false;
        }
    }

    /// Clear one layer, or the whole stage when `layer` is `None`.
    pub fn clear(&self, layer: Option<i32>) {
        let mut layers = self.layers.lock();
        match layer {
            Some(l) => {
                layers.remove(&l);
            }
            None => layers.clear(),
        }
    }

    /// Swap the contents of two layers, possibly across stages.
    pub fn swap_layer(&self, own_layer: i32, other: &Stage, other_layer: i32) {
        if std::ptr::eq(self, other) {
            let mut layers = self.layers.lock();
            let a = layers.remove(&own_layer).unwrap_or_default();
            let b = layers.remove(&other_layer).unwrap_or_default();
            layers.insert(own_layer, b);
            layers.insert(other_layer, a);
        } else {
            let mut mine = self.layers.lock();
            let mut theirs = other.layers.lock();
            let a = mine.remove(&own_layer).unwrap_or_default();
            let b = theirs.remove(&other_layer).unwrap_or_default();
            mine.insert(own_layer, b);
            theirs.insert(other_layer, a);
        }
    }

    /// Swap all layers with another stage.
    pub fn swap(&self, other: &Stage) {
        if std::ptr::eq(self, other) {
            return;
        }
        let mut mine = self.layers.lock();
        let mut theirs = other.layers.lock();
        std::mem::swap(&mut *mine, &mut *theirs);
    }

    /// Snapshot of the layer currently at `layer`.
    pub fn layer(&self, layer: i32) -> Layer {
        self.layers.lock().get(&layer).cloned().unwrap_or_default()
    }

    /// Human-readable stage dump for PRINT/INFO.
    pub fn describe(&self) -> String {
        let layers = self.layers.lock();
        let mut out = String::new();
        for (index, layer) in layers.iter() {
            let state = if layer.paused { "PAUSED" } else { "PLAYING" };
            let fg = layer.foreground.as_deref().unwrap_or("EMPTY");
            let _ = writeln!(out, "{index} {fg} {state}");
        }
        out
    }
}

/// Everything a command addressing one channel needs, shared by
/// reference for the process lifetime.
#[derive(Clone)]
pub struct ChannelContext {
    pub channel: Arc<VideoChannel>,
    pub stage: Arc<Stage>,
    pub lock: Arc<LockContainer>,
}

impl ChannelContext {
    /// Build the process-lifetime channel list from configuration. Lock
    /// lifecycle keys are `lockN` by channel index.
    pub fn create_all(formats: Vec<VideoFormat>) -> Vec<ChannelContext> {
        formats
            .into_iter()
            .enumerate()
            .map(|(index, format)| ChannelContext {
                channel: Arc::new(VideoChannel::new(index, format)),
                stage: Arc::new(Stage::new()),
                lock: Arc::new(LockContainer::new(format!("lock{index}"))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_promotes_background() {
        let stage = Stage::new();
        stage.load_background(10, "intro".into());
        assert!(stage.layer(10).foreground.is_none());

        stage.play(10);
        let layer = stage.layer(10);
        assert_eq!(layer.foreground.as_deref(), Some("intro"));
        assert!(!layer.paused);
    }

    #[test]
    fn format_switch_retimes_timecode() {
        let ch = VideoChannel::new(0, VideoFormat::from_name("PAL").unwrap());
        ch.set_timecode(FrameTimecode::new(25, 25));
        ch.set_format(VideoFormat::from_name("720p50").unwrap());
        assert_eq!(ch.timecode().total_frames(), 50);
        assert_eq!(ch.fps(), 50);
    }

    #[test]
    fn tick_wraps_at_midnight() {
        let ch = VideoChannel::new(0, VideoFormat::from_name("PAL").unwrap());
        let max = amcp_proto::timecode::max_frames_for_fps(25);
        ch.set_timecode(FrameTimecode::new(max - 1, 25));
        assert_eq!(ch.tick().total_frames(), 0);
    }
}
