//! Timecode-driven command scheduling.
//!
//! Commands are parked under a token at a target timecode on one
//! channel's schedule. Every rendered frame the tick loop asks for the
//! commands that became due since the previous tick; the scheduler
//! answers from a window of timecodes so no entry is skipped when ticks
//! arrive unevenly. Tokens are unique across all channels, so setting a
//! token again moves its command instead of duplicating it.
//!
//! The tick call runs on the render path and must not stall it: the
//! schedule lock is taken with a 5 ms bound and the tick is skipped when
//! the bound is missed (the next tick's window covers the gap).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use amcp_proto::FrameTimecode;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{AmcpCommand, GroupCommand};

/// Lock bound for the render-path tick.
const TICK_LOCK_BOUND: Duration = Duration::from_millis(5);

struct ScheduledEntry {
    timecode: FrameTimecode,
    /// Token order gives a stable firing order within one timecode.
    commands: BTreeMap<String, Arc<AmcpCommand>>,
}

struct SchedulerQueue {
    entries: Vec<ScheduledEntry>,
    /// Exclusive end of the last served window; `empty()` before the
    /// first tick.
    last_timecode: FrameTimecode,
}

/// A half-open window of timecodes, compared by millisecond position.
/// When `start` is past `end` the window wraps midnight.
struct TimecodeRange {
    start: FrameTimecode,
    end: FrameTimecode,
}

impl TimecodeRange {
    fn single(tc: FrameTimecode) -> Self {
        Self { start: tc, end: tc.wrapping_add(1) }
    }

    fn contains(&self, tc: &FrameTimecode) -> bool {
        let (start, end, pts) = (self.start.pts(), self.end.pts(), tc.pts());
        if start <= end {
            pts >= start && pts < end
        } else {
            pts >= start || pts < end
        }
    }
}

/// One schedule per channel, behind a single short-held lock.
pub struct CommandScheduler {
    queues: Mutex<Vec<SchedulerQueue>>,
}

impl CommandScheduler {
    pub fn new(channel_count: usize) -> Self {
        let queues = (0..channel_count)
            .map(|_| SchedulerQueue {
                entries: Vec::new(),
                last_timecode: FrameTimecode::empty(),
            })
            .collect();
        Self { queues: Mutex::new(queues) }
    }

    /// Park `command` under `token` at `timecode` on `channel`'s
    /// schedule. An empty token or invalid timecode is ignored. The
    /// token is globally unique: any previous schedule under it, on any
    /// channel, is dropped first.
    pub fn set(
        &self,
        channel: usize,
        token: &str,
        timecode: FrameTimecode,
        command: Arc<AmcpCommand>,
    ) {
        if token.is_empty() || !timecode.is_valid() {
            return;
        }

        let mut queues = self.queues.lock();
        Self::remove_token(&mut queues, token);

        let Some(queue) = queues.get_mut(channel) else {
            return;
        };

        match queue.entries.iter_mut().find(|e| e.timecode == timecode) {
            Some(entry) => {
                entry.commands.insert(token.to_owned(), command);
            }
            None => {
                let mut commands = BTreeMap::new();
                commands.insert(token.to_owned(), command);
                queue.entries.push(ScheduledEntry { timecode, commands });
            }
        }
        debug!(channel, token, timecode = %timecode, "Command scheduled");
    }

    /// Drop the schedule under `token`. Returns whether one existed.
    pub fn remove(&self, token: &str) -> bool {
        let mut queues = self.queues.lock();
        Self::remove_token(&mut queues, token)
    }

    /// Drop every scheduled command on every channel.
    pub fn clear(&self) {
        let mut queues = self.queues.lock();
        for queue in queues.iter_mut() {
            queue.entries.clear();
        }
    }

    /// The timecode a token is scheduled for and the parked command.
    pub fn find(&self, token: &str) -> Option<(FrameTimecode, Arc<AmcpCommand>)> {
        let queues = self.queues.lock();
        queues
            .iter()
            .flat_map(|q| &q.entries)
            .find_map(|e| e.commands.get(token).map(|c| (e.timecode, Arc::clone(c))))
    }

    /// Snapshot of scheduled commands as `(channel, token, timecode)`,
    /// filtered to one channel and to entries at exactly `at` when
    /// given.
    pub fn list(
        &self,
        channel: Option<usize>,
        at: Option<FrameTimecode>,
    ) -> Vec<(usize, String, FrameTimecode)> {
        let queues = self.queues.lock();
        let mut out = Vec::new();
        for (index, queue) in queues.iter().enumerate() {
            if channel.is_some_and(|c| c != index) {
                continue;
            }
            for entry in &queue.entries {
                if at.is_some_and(|f| entry.timecode != f) {
                    continue;
                }
                for token in entry.commands.keys() {
                    out.push((index, token.clone(), entry.timecode));
                }
            }
        }
        out.sort_by_key(|(ch, token, tc)| (*ch, tc.pts(), token.clone()));
        out
    }

    /// Serve the commands that became due on `channel` at this tick.
    ///
    /// Called from the render path once per frame; returns one group per
    /// due timecode slot, empty when nothing is due or the lock bound
    /// was missed. The served window runs from the previous tick's end
    /// up to and including `timecode`, so frames skipped between ticks
    /// still fire. A frame-rate change or a jump larger than one second
    /// collapses the window to the current frame.
    pub fn schedule(&self, channel: usize, timecode: FrameTimecode) -> Vec<GroupCommand> {
        let Some(mut queues) = self.queues.try_lock_for(TICK_LOCK_BOUND) else {
            return Vec::new();
        };
        let Some(queue) = queues.get_mut(channel) else {
            return Vec::new();
        };

        let range = Self::find_range(queue, timecode);

        let entries = std::mem::take(&mut queue.entries);
        let (fired, kept): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| range.contains(&e.timecode));
        queue.entries = kept;

        if !fired.is_empty() {
            debug!(channel, timecode = %timecode, slots = fired.len(), "Scheduled commands due");
        }

        // One group per slot, in the order the slots were created.
        fired
            .into_iter()
            .map(|e| GroupCommand::scheduled(e.commands.into_values().collect()))
            .collect()
    }

    fn remove_token(queues: &mut [SchedulerQueue], token: &str) -> bool {
        for queue in queues.iter_mut() {
            for entry in queue.entries.iter_mut() {
                if entry.commands.remove(token).is_some() {
                    queue.entries.retain(|e| !e.commands.is_empty());
                    return true;
                }
            }
        }
        false
    }

    /// The window of timecodes this tick serves, ending just past
    /// `timecode`. Also advances the queue's window cursor.
    fn find_range(queue: &mut SchedulerQueue, timecode: FrameTimecode) -> TimecodeRange {
        let next = timecode.wrapping_add(1);
        let last = queue.last_timecode;
        queue.last_timecode = next;

        if !last.is_valid() || last.fps() != timecode.fps() {
            return TimecodeRange::single(timecode);
        }

        let max = i64::from(timecode.max_frames());
        let mut delta = i64::from(next.frames_since(&last));
        if delta >= max / 2 {
            delta -= max;
        }

        if delta < 0 || delta > i64::from(timecode.fps()) {
            warn!(
                last = %last,
                current = %timecode,
                delta,
                "Timecode jump, serving current frame only"
            );
            return TimecodeRange::single(timecode);
        }

        TimecodeRange { start: last, end: next }
    }
}
