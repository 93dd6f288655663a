//! Basic playback commands.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::channel::VideoFormat;
use crate::command::CommandContext;
use crate::command::repository::parse_channel_spec;
use crate::error::{AmcpError, CommandResult};

pub fn loadbg(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let clip = ctx.parameter(0)?.to_owned();
        ctx.channel()?.stage.load_background(ctx.layer_or(0), clip);
        Ok("202 LOADBG OK\r\n".to_string())
    }
    .boxed()
}

pub fn load(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let clip = ctx.parameter(0)?.to_owned();
        ctx.channel()?.stage.load(ctx.layer_or(0), clip);
        Ok("202 LOAD OK\r\n".to_string())
    }
    .boxed()
}

pub fn play(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let stage = &ctx.channel()?.stage;
        let layer = ctx.layer_or(0);
        // PLAY with a clip argument is an implicit LOADBG first.
        if let Some(clip) = ctx.parameters.first() {
            stage.load_background(layer, clip.clone());
        }
        stage.play(layer);
        Ok("202 PLAY OK\r\n".to_string())
    }
    .boxed()
}

pub fn pause(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?.stage.pause(ctx.layer_or(0));
        Ok("202 PAUSE OK\r\n".to_string())
    }
    .boxed()
}

pub fn resume(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?.stage.resume(ctx.layer_or(0));
        Ok("202 RESUME OK\r\n".to_string())
    }
    .boxed()
}

pub fn stop(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?.stage.stop(ctx.layer_or(0));
        Ok("202 STOP OK\r\n".to_string())
    }
    .boxed()
}

pub fn clear(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?.stage.clear(ctx.layer);
        Ok("202 CLEAR OK\r\n".to_string())
    }
    .boxed()
}

pub fn call(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.parameter(0)?;
        Ok("202 CALL OK\r\n".to_string())
    }
    .boxed()
}

/// `SWAP C2[-L2]`: exchange layers (or whole stages) with another
/// channel.
pub fn swap(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let target = ctx.parameter(0)?;
        let (other_channel, other_layer) = parse_channel_spec(target)
            .ok_or_else(|| AmcpError::InvalidParameter(target.to_owned()))?;
        let other_index = (other_channel as usize)
            .checked_sub(1)
            .filter(|i| *i < ctx.env.channels.len())
            .ok_or_else(|| AmcpError::InvalidParameter(target.to_owned()))?;

        let own = ctx.channel()?;
        let other = &ctx.env.channels[other_index];

        match (ctx.layer, other_layer) {
            (Some(own_layer), Some(target_layer)) => {
                own.stage.swap_layer(own_layer, &other.stage, target_layer);
            }
            (None, None) => own.stage.swap(&other.stage),
            _ => return Err(AmcpError::InvalidParameter(target.to_owned())),
        }
        Ok("202 SWAP OK\r\n".to_string())
    }
    .boxed()
}

pub fn add(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.parameter(0)?;
        Ok("202 ADD OK\r\n".to_string())
    }
    .boxed()
}

pub fn remove(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        Ok("202 REMOVE OK\r\n".to_string())
    }
    .boxed()
}

pub fn print(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        Ok("202 PRINT OK\r\n".to_string())
    }
    .boxed()
}

/// `SET MODE <format>`: switch the channel's video format.
pub fn set(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let variable = ctx.parameter(0)?.to_ascii_uppercase();
        let value = ctx.parameter(1)?;
        if variable != "MODE" {
            return Err(AmcpError::InvalidParameter(variable));
        }
        let format = VideoFormat::from_name(value)
            .ok_or_else(|| AmcpError::InvalidParameter(value.to_owned()))?;
        ctx.channel()?.channel.set_format(format);
        Ok("202 SET MODE OK\r\n".to_string())
    }
    .boxed()
}
