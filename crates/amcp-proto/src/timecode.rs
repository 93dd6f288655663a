//! Frame timecodes.
//!
//! A [`FrameTimecode`] is a frame counter within a 24-hour day at a given
//! channel frame rate. Arithmetic wraps at `24 * 60 * 60 * fps` frames,
//! mirroring a production clock that rolls over at midnight. Comparison
//! across frame rates goes through [`FrameTimecode::pts`], the position in
//! milliseconds.

use std::fmt;

use thiserror::Error;

/// Errors from parsing an `HH:MM:SS:FF` timecode string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeParseError {
    /// The string is not 11 characters of `HH:MM:SS:FF`.
    #[error("malformed timecode string: {0:?}")]
    Malformed(String),
    /// A component is outside its valid range for the frame rate.
    #[error("timecode component out of range: {0:?}")]
    OutOfRange(String),
}

/// A frame counter at a fixed frame rate, wrapping every 24 hours.
///
/// The `empty()` sentinel (fps 0) marks "no timecode"; it compares
/// unequal to every real timecode because equality includes the frame
/// rate.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimecode {
    frames: u32,
    fps: u8,
}

/// Total frames in a 24-hour day at the given rate.
pub fn max_frames_for_fps(fps: u8) -> u32 {
    const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
    SECONDS_PER_DAY * u32::from(fps)
}

impl FrameTimecode {
    /// Create a timecode, wrapping the frame count into the 24-hour range.
    pub fn new(frames: u32, fps: u8) -> Self {
        let frames = if fps == 0 {
            frames
        } else {
            frames % max_frames_for_fps(fps)
        };
        Self { frames, fps }
    }

    /// The "no timecode" sentinel.
    pub const fn empty() -> Self {
        Self { frames: 0, fps: 0 }
    }

    /// True unless this is the `empty()` sentinel.
    pub fn is_valid(&self) -> bool {
        self.fps != 0
    }

    /// Frame counter value.
    pub fn total_frames(&self) -> u32 {
        self.frames
    }

    /// Frame rate this timecode counts at.
    pub fn fps(&self) -> u8 {
        self.fps
    }

    /// Total frames in a day at this timecode's rate.
    pub fn max_frames(&self) -> u32 {
        max_frames_for_fps(self.fps)
    }

    /// Position in milliseconds, for comparison across frame rates.
    pub fn pts(&self) -> i64 {
        if self.fps == 0 {
            return 0;
        }
        i64::from(self.frames) * 1000 / i64::from(self.fps)
    }

    /// Add a signed frame delta, wrapping at the day boundary.
    pub fn wrapping_add(&self, delta: i64) -> Self {
        if self.fps == 0 {
            return *self;
        }
        let max = i64::from(self.max_frames());
        let mut val = (i64::from(self.frames) + delta) % max;
        if val < 0 {
            val += max;
        }
        Self { frames: val as u32, fps: self.fps }
    }

    /// Subtract a signed frame delta, wrapping at the day boundary.
    pub fn wrapping_sub(&self, delta: i64) -> Self {
        self.wrapping_add(-delta)
    }

    /// Frames from `other` to `self`, wrapped into `0..max_frames`.
    pub fn frames_since(&self, other: &FrameTimecode) -> u32 {
        self.wrapping_sub(i64::from(other.frames)).total_frames()
    }

    /// Build from clock components. Frames at or above 30 fps are SMPTE
    /// frame pairs, matching [`FrameTimecode::parse`].
    pub fn from_components(
        hours: u8,
        minutes: u8,
        seconds: u8,
        frames: u8,
        fps: u8,
    ) -> Result<Self, TimecodeParseError> {
        if hours > 23 || minutes > 59 || seconds > 59 || frames >= fps {
            return Err(TimecodeParseError::OutOfRange(format!(
                "{hours:02}:{minutes:02}:{seconds:02}:{frames:02}@{fps}"
            )));
        }

        let mut total = u32::from(hours);
        total = total * 60 + u32::from(minutes);
        total = total * 60 + u32::from(seconds);
        total = total * u32::from(fps) + u32::from(frames);

        Ok(Self::new(total, fps))
    }

    /// Parse an `HH:MM:SS:FF` string (separators `:`, `.`, `;`, `,`).
    ///
    /// SMPTE frame numbers only count to 30; above 30 fps the frame
    /// component is doubled.
    pub fn parse(s: &str, fps: u8) -> Result<Self, TimecodeParseError> {
        if s.chars().count() != 11 {
            return Err(TimecodeParseError::Malformed(s.to_owned()));
        }

        let parts: Vec<&str> = s.split([':', '.', ';', ',']).collect();
        if parts.len() != 4 {
            return Err(TimecodeParseError::Malformed(s.to_owned()));
        }

        let parse_part = |p: &str| {
            p.parse::<u8>()
                .map_err(|_| TimecodeParseError::Malformed(s.to_owned()))
        };

        let hours = parse_part(parts[0])?;
        let minutes = parse_part(parts[1])?;
        let seconds = parse_part(parts[2])?;
        let mut frames = parse_part(parts[3])?;

        if fps > 30 {
            frames = frames.saturating_mul(2);
        }

        Self::from_components(hours, minutes, seconds, frames, fps)
    }

    /// Clock components, with SMPTE frame halving above 30 fps.
    fn components(&self) -> (u8, u8, u8, u8) {
        if self.fps == 0 {
            return (0, 0, 0, 0);
        }

        let mut total = self.frames;
        let mut frames = (total % u32::from(self.fps)) as u8;
        if self.fps > 30 {
            frames /= 2;
        }
        total /= u32::from(self.fps);

        let seconds = (total % 60) as u8;
        total /= 60;
        let minutes = (total % 60) as u8;
        total /= 60;
        let hours = (total % 24) as u8;

        (hours, minutes, seconds, frames)
    }

    /// Re-time to another frame rate, keeping the millisecond position.
    pub fn with_fps(&self, new_fps: u8) -> Self {
        if new_fps == self.fps {
            return *self;
        }
        let frames = self.pts() * i64::from(new_fps) / 1000;
        Self::new(frames as u32, new_fps)
    }
}

impl fmt::Display for FrameTimecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes, seconds, frames) = self.components();
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}:{frames:02}")
    }
}

impl PartialEq for FrameTimecode {
    fn eq(&self, other: &Self) -> bool {
        self.pts() == other.pts() && self.fps == other.fps
    }
}

impl Eq for FrameTimecode {}
