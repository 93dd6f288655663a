//! Render tick loops.
//!
//! One task per channel stands in for the render pipeline's frame
//! clock: it advances the channel timecode at the channel's frame rate
//! and submits scheduled commands that became due to the channel's own
//! command queue. The frame rate is re-read every tick so `SET MODE`
//! takes effect without restarting the loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::command::Environment;
use crate::command::queue::CommandQueue;

/// Spawn a tick task per channel. `queues[i + 1]` is channel `i`'s
/// queue, as in the protocol strategy.
pub fn spawn_tick_loops(env: &Arc<Environment>, queues: &[Arc<CommandQueue>]) {
    for (index, context) in env.channels.iter().enumerate() {
        let channel = Arc::clone(&context.channel);
        let scheduler = Arc::clone(&env.scheduler);
        let queue = Arc::clone(&queues[index + 1]);

        tokio::spawn(async move {
            debug!(channel = index, "Tick loop started");
            loop {
                let fps = u64::from(channel.fps().max(1));
                tokio::time::sleep(Duration::from_millis(1000 / fps)).await;

                let timecode = channel.tick();
                for group in scheduler.schedule(index, timecode) {
                    queue.add(Arc::new(group));
                }
            }
        });
    }
}
