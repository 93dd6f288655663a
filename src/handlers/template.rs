//! Template graphics commands.
//!
//! Templates render on a dedicated stage layer; the flash-layer number
//! in the first parameter picks the slot within that layer, which this
//! control plane folds into the layer key.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::command::CommandContext;
use crate::error::{AmcpError, CommandResult};

/// Stage layer templates render on when the channel spec names none.
const DEFAULT_CG_LAYER: i32 = 9999;

fn cg_layer(ctx: &CommandContext) -> i32 {
    ctx.layer_or(DEFAULT_CG_LAYER)
}

/// `CG ADD <flash layer> <template> <play on load> [data]`.
pub fn cg_add(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        let template = ctx.parameter(1)?.to_owned();
        let play_on_load = ctx.parameter(2)? == "1";

        let stage = &ctx.channel()?.stage;
        let layer = cg_layer(&ctx);
        stage.load(layer, template);
        if play_on_load {
            stage.resume(layer);
        }
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_play(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.channel()?.stage.resume(cg_layer(&ctx));
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_stop(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.channel()?.stage.pause(cg_layer(&ctx));
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_next(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.channel()?;
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_remove(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.channel()?.stage.clear(Some(cg_layer(&ctx)));
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_clear(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?.stage.clear(Some(cg_layer(&ctx)));
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_update(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.parameter(1)?;
        ctx.channel()?;
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_invoke(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.int_parameter(0)?;
        ctx.parameter(1)?;
        ctx.channel()?;
        Ok("202 CG OK\r\n".to_string())
    }
    .boxed()
}

pub fn cg_info(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let layer = ctx.channel()?.stage.layer(cg_layer(&ctx));
        let template = layer
            .foreground
            .ok_or_else(|| AmcpError::FileNotFound("no template on layer".into()))?;
        Ok(format!("201 CG OK\r\n{template}\r\n"))
    }
    .boxed()
}
