//! Scheduler and timecode commands.

use std::collections::VecDeque;
use std::sync::Arc;

use amcp_proto::FrameTimecode;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::command::CommandContext;
use crate::error::CommandResult;

/// `SCHEDULE SET <token> <timecode> <command...>`: park a channel
/// command for later execution. The token doubles as the request id of
/// the eventual reply, so the submitter can correlate it.
pub fn set(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let token = ctx.parameter(0)?.to_owned();
        let timecode_raw = ctx.parameter(1)?.to_owned();
        let tokens: VecDeque<String> = ctx.parameters[2..].iter().cloned().collect();

        let Ok(command) =
            ctx.env
                .repository
                .resolve(ctx.client.clone(), tokens, Some(token.clone()))
        else {
            return Ok("403 SCHEDULE SET ERROR\r\n".to_string());
        };

        // Only channel commands can be scheduled.
        let Some(channel_index) = command.channel_index() else {
            return Ok("503 SCHEDULE SET FAILED\r\n".to_string());
        };

        if let Some(client) = &ctx.client {
            if !ctx.env.channels[channel_index].lock.check_access(client) {
                return Ok("503 SCHEDULE SET FAILED\r\n".to_string());
            }
        }

        let fps = ctx.env.channels[channel_index].channel.fps();
        let Ok(timecode) = FrameTimecode::parse(&timecode_raw, fps) else {
            return Ok("403 SCHEDULE SET ERROR\r\n".to_string());
        };
        if !timecode.is_valid() {
            return Ok("403 SCHEDULE SET ERROR\r\n".to_string());
        }

        ctx.env
            .scheduler
            .set(channel_index, &token, timecode, Arc::new(command));
        Ok("202 SCHEDULE SET OK\r\n".to_string())
    }
    .boxed()
}

pub fn remove(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let token = ctx.parameter(0)?;
        if !ctx.env.scheduler.remove(token) {
            return Ok("403 SCHEDULE REMOVE ERROR\r\n".to_string());
        }
        Ok("202 SCHEDULE REMOVE OK\r\n".to_string())
    }
    .boxed()
}

pub fn clear(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.env.scheduler.clear();
        Ok("202 SCHEDULE CLEAR OK\r\n".to_string())
    }
    .boxed()
}

fn format_list(entries: Vec<(usize, String, FrameTimecode)>) -> String {
    let mut reply = String::from("200 SCHEDULE LIST OK\r\n");
    for (channel, token, timecode) in entries {
        // Channels are reported 1-based, the way clients address them.
        reply.push_str(&format!("{} {timecode} {token}\r\n", channel + 1));
    }
    reply.push_str("\r\n");
    reply
}

/// `SCHEDULE LIST [channel] [timecode]`.
pub fn list(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        if ctx.parameters.is_empty() {
            return Ok(format_list(ctx.env.scheduler.list(None, None)));
        }

        let Some(index) = ctx
            .parameter(0)?
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|i| *i < ctx.env.channels.len())
        else {
            return Ok("403 SCHEDULE LIST ERROR\r\n".to_string());
        };

        let mut at = None;
        if let Some(raw) = ctx.parameters.get(1) {
            let fps = ctx.env.channels[index].channel.fps();
            let Ok(timecode) = FrameTimecode::parse(raw, fps) else {
                return Ok("403 SCHEDULE LIST ERROR\r\n".to_string());
            };
            at = Some(timecode);
        }

        Ok(format_list(ctx.env.scheduler.list(Some(index), at)))
    }
    .boxed()
}

pub fn info(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let token = ctx.parameter(0)?;
        match ctx.env.scheduler.find(token) {
            Some((timecode, _command)) => Ok(format!("201 SCHEDULE INFO OK\r\n{timecode}\r\n")),
            None => Ok("403 SCHEDULE INFO ERROR\r\n".to_string()),
        }
    }
    .boxed()
}

/// `TIME [timecode]`: report, and optionally jump, the channel clock.
pub fn time(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let channel = &ctx.channel()?.channel;

        if let Some(raw) = ctx.parameters.first() {
            let Ok(timecode) = FrameTimecode::parse(raw, channel.fps()) else {
                return Ok("403 TIME FAILED\r\n".to_string());
            };
            channel.set_timecode(timecode);
        }

        Ok(format!("201 TIME OK\r\n{}\r\n", channel.timecode()))
    }
    .boxed()
}

/// `TIMECODE SOURCE [CLOCK | LAYER <n> | CLEAR]`.
///
/// This control plane always drives the clock itself, so source
/// switches are acknowledged without changing behavior.
pub fn timecode_source(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        let Some(source) = ctx.parameters.first() else {
            return Ok("201 TIMECODE SOURCE OK\r\nclock\r\n".to_string());
        };

        match source.to_ascii_uppercase().as_str() {
            "CLOCK" | "LAYER" | "CLEAR" => Ok("202 TIMECODE SOURCE OK\r\n".to_string()),
            _ => Ok("400 TIMECODE SOURCE FAILED\r\n".to_string()),
        }
    }
    .boxed()
}
