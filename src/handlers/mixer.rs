//! Mixer commands.
//!
//! The mixer itself lives in the excluded render pipeline; these
//! handlers validate parameters and answer with the mixer's wire
//! conventions: `201` plus the current value for a query, `202` for a
//! mutation.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::command::CommandContext;
use crate::error::{AmcpError, CommandResult};

fn parse_value(raw: &str) -> Result<f64, AmcpError> {
    raw.parse()
        .map_err(|_| AmcpError::InvalidParameter(raw.to_owned()))
}

/// `MIXER OPACITY [value]`.
pub fn opacity(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        match ctx.parameters.first() {
            None => Ok("201 MIXER OK\r\n1\r\n".to_string()),
            Some(raw) => {
                parse_value(raw)?;
                Ok("202 MIXER OK\r\n".to_string())
            }
        }
    }
    .boxed()
}

/// `MIXER VOLUME [value]`.
pub fn volume(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        match ctx.parameters.first() {
            None => Ok("201 MIXER OK\r\n1\r\n".to_string()),
            Some(raw) => {
                parse_value(raw)?;
                Ok("202 MIXER OK\r\n".to_string())
            }
        }
    }
    .boxed()
}

/// `MIXER FILL [x y x-scale y-scale]`.
pub fn fill(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        if ctx.parameters.is_empty() {
            return Ok("201 MIXER OK\r\n0 0 1 1\r\n".to_string());
        }
        if ctx.parameters.len() < 4 {
            return Err(AmcpError::MissingParameter("x y x-scale y-scale".into()));
        }
        for raw in &ctx.parameters[..4] {
            parse_value(raw)?;
        }
        Ok("202 MIXER OK\r\n".to_string())
    }
    .boxed()
}

pub fn clear(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.channel()?;
        Ok("202 MIXER OK\r\n".to_string())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelContext, VideoFormat};
    use crate::command::repository::CommandRepository;
    use crate::command::scheduler::CommandScheduler;
    use crate::command::{Environment, LogControl};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn ctx(params: &[&str]) -> CommandContext {
        let (shutdown_tx, _rx) = mpsc::unbounded_channel();
        let env = Arc::new(Environment {
            channels: ChannelContext::create_all(vec![VideoFormat::from_name("PAL").unwrap()]),
            repository: Arc::new(CommandRepository::new(1)),
            scheduler: Arc::new(CommandScheduler::new(1)),
            data_path: std::env::temp_dir(),
            lock_clear_phrase: None,
            log: LogControl::disabled("info".into()),
            shutdown_tx,
        });
        CommandContext {
            client: None,
            channel: Some(env.channels[0].clone()),
            layer: Some(10),
            parameters: params.iter().map(|s| s.to_string()).collect(),
            env,
        }
    }

    #[tokio::test]
    async fn query_answers_201_mutation_202() {
        assert_eq!(opacity(ctx(&[])).await.unwrap(), "201 MIXER OK\r\n1\r\n");
        assert_eq!(opacity(ctx(&["0.5"])).await.unwrap(), "202 MIXER OK\r\n");
        assert_eq!(fill(ctx(&[])).await.unwrap(), "201 MIXER OK\r\n0 0 1 1\r\n");
        assert_eq!(
            fill(ctx(&["0.1", "0.1", "0.8", "0.8"])).await.unwrap(),
            "202 MIXER OK\r\n"
        );
    }

    #[tokio::test]
    async fn malformed_values_are_rejected() {
        assert_eq!(volume(ctx(&["loud"])).await.unwrap_err().code(), 403);
        assert_eq!(fill(ctx(&["0", "0"])).await.unwrap_err().code(), 402);
    }
}
