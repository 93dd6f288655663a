//! System and query commands.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::command::{CommandContext, Shutdown};
use crate::error::{AmcpError, CommandResult};

/// `LOCK <channel> ACQUIRE <phrase> | RELEASE | CLEAR [phrase]`.
pub fn lock(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let channel_index = ctx
            .int_parameter(0)?
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < ctx.env.channels.len())
            .ok_or_else(|| AmcpError::InvalidParameter("channel".into()))?;
        let lock = &ctx.env.channels[channel_index].lock;

        let client = ctx
            .client
            .as_ref()
            .ok_or_else(|| AmcpError::Internal("LOCK without a connection".into()))?;

        match ctx.parameter(1)?.to_ascii_uppercase().as_str() {
            "ACQUIRE" => {
                let phrase = ctx.parameter(2)?;
                if !lock.try_lock(phrase, client) {
                    return Ok("503 LOCK ACQUIRE FAILED\r\n".to_string());
                }
                Ok("202 LOCK ACQUIRE OK\r\n".to_string())
            }
            "RELEASE" => {
                lock.release_lock(client);
                Ok("202 LOCK RELEASE OK\r\n".to_string())
            }
            "CLEAR" => {
                // Clearing requires the configured override phrase, when
                // one is configured.
                if let Some(override_phrase) =
                    ctx.env.lock_clear_phrase.as_deref().filter(|p| !p.is_empty())
                {
                    if ctx.parameters.get(2).map(String::as_str) != Some(override_phrase) {
                        return Ok("503 LOCK CLEAR FAILED\r\n".to_string());
                    }
                }
                lock.clear_locks();
                Ok("202 LOCK CLEAR OK\r\n".to_string())
            }
            other => Err(AmcpError::FileNotFound(format!("unknown LOCK command {other}"))),
        }
    }
    .boxed()
}

/// `LOG LEVEL [level]`: query or change the active log filter.
pub fn log_level(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let Some(level) = ctx.parameters.first() else {
            return Ok(format!(
                "201 LOG OK\r\n{}\r\n",
                ctx.env.log.current().to_ascii_uppercase()
            ));
        };

        let level = level.to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(AmcpError::UserError(format!("unknown log level {level:?}"))),
        }
        ctx.env
            .log
            .set(&level)
            .map_err(|e| AmcpError::Internal(e.to_string()))?;
        Ok("202 LOG OK\r\n".to_string())
    }
    .boxed()
}

pub fn version(_ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async {
        Ok(format!(
            "201 VERSION OK\r\n{}\r\n",
            env!("CARGO_PKG_VERSION")
        ))
    }
    .boxed()
}

/// `INFO [channel]`: without a parameter, one line per channel with
/// 1-based index, format and state. With a channel number, a per-layer
/// dump of that channel's stage.
pub fn info(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        if let Some(raw) = ctx.parameters.first() {
            let context = raw
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| ctx.env.channels.get(i))
                .ok_or_else(|| AmcpError::InvalidParameter(raw.clone()))?;
            let mut reply = String::from("201 INFO OK\r\n");
            for line in context.stage.describe().lines() {
                reply.push_str(line);
                reply.push_str("\r\n");
            }
            reply.push_str("\r\n");
            return Ok(reply);
        }

        let mut reply = String::from("200 INFO OK\r\n");
        for context in &ctx.env.channels {
            reply.push_str(&format!(
                "{} {} PLAYING\r\n",
                context.channel.index() + 1,
                context.channel.format_name()
            ));
        }
        reply.push_str("\r\n");
        Ok(reply)
    }
    .boxed()
}

/// `BYE`: close the connection, replying with silence.
pub fn bye(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        if let Some(client) = &ctx.client {
            client.disconnect();
        }
        Ok(String::new())
    }
    .boxed()
}

pub fn kill(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.env
            .shutdown_tx
            .send(Shutdown::Kill)
            .map_err(|_| AmcpError::Internal("shutdown channel closed".into()))?;
        Ok("202 KILL OK\r\n".to_string())
    }
    .boxed()
}

pub fn restart(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        ctx.env
            .shutdown_tx
            .send(Shutdown::Restart)
            .map_err(|_| AmcpError::Internal("shutdown channel closed".into()))?;
        Ok("202 RESTART OK\r\n".to_string())
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
    use crate::network::client::Client;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn env(clear_phrase: Option<&str>) -> (Arc<Environment>, mpsc::UnboundedReceiver<Shutdown>) {
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let env = Arc::new(Environment {
            channels: ChannelContext::create_all(vec![VideoFormat::from_name("PAL").unwrap()]),
            repository: Arc::new(CommandRepository::new(1)),
            scheduler: Arc::new(CommandScheduler::new(1)),
            data_path: std::env::temp_dir(),
            lock_clear_phrase: clear_phrase.map(str::to_owned),
            log: LogControl::disabled("info".into()),
            shutdown_tx,
        });
        (env, shutdown_rx)
    }

    fn ctx(env: &Arc<Environment>, client: &Arc<Client>, params: &[&str]) -> CommandContext {
        CommandContext {
            client: Some(Arc::clone(client)),
            channel: None,
            layer: None,
            parameters: params.iter().map(|s| s.to_string()).collect(),
            env: Arc::clone(env),
        }
    }

    fn client(id: u64) -> Arc<Client> {
        Client::new(id, "127.0.0.1:5250".parse().unwrap()).0
    }

    #[tokio::test]
    async fn lock_acquire_release_cycle() {
        let (env, _rx) = env(None);
        let holder = client(1);
        let other = client(2);

        assert_eq!(
            lock(ctx(&env, &holder, &["1", "ACQUIRE", "pw"])).await.unwrap(),
            "202 LOCK ACQUIRE OK\r\n"
        );
        assert_eq!(
            lock(ctx(&env, &other, &["1", "acquire", "wrong"])).await.unwrap(),
            "503 LOCK ACQUIRE FAILED\r\n"
        );
        assert_eq!(
            lock(ctx(&env, &holder, &["1", "RELEASE"])).await.unwrap(),
            "202 LOCK RELEASE OK\r\n"
        );
        assert_eq!(
            lock(ctx(&env, &other, &["1", "ACQUIRE", "wrong"])).await.unwrap(),
            "202 LOCK ACQUIRE OK\r\n"
        );
    }

    #[tokio::test]
    async fn lock_clear_requires_the_override_phrase() {
        let (env, _rx) = env(Some("opensesame"));
        let holder = client(1);

        lock(ctx(&env, &holder, &["1", "ACQUIRE", "pw"])).await.unwrap();
        assert_eq!(
            lock(ctx(&env, &holder, &["1", "CLEAR"])).await.unwrap(),
            "503 LOCK CLEAR FAILED\r\n"
        );
        assert_eq!(
            lock(ctx(&env, &holder, &["1", "CLEAR", "opensesame"])).await.unwrap(),
            "202 LOCK CLEAR OK\r\n"
        );
        assert!(env.channels[0].lock.check_access(&client(3)));
    }

    #[tokio::test]
    async fn lock_validates_channel_and_subcommand() {
        let (env, _rx) = env(None);
        let c = client(1);
        assert_eq!(
            lock(ctx(&env, &c, &["9", "ACQUIRE", "pw"])).await.unwrap_err().code(),
            403
        );
        assert_eq!(
            lock(ctx(&env, &c, &["1", "FROB"])).await.unwrap_err().code(),
            404
        );
    }

    #[tokio::test]
    async fn log_level_queries_and_updates() {
        let (env, _rx) = env(None);
        let c = client(1);
        assert_eq!(
            log_level(ctx(&env, &c, &[])).await.unwrap(),
            "201 LOG OK\r\nINFO\r\n"
        );
        assert_eq!(log_level(ctx(&env, &c, &["debug"])).await.unwrap(), "202 LOG OK\r\n");
        assert_eq!(env.log.current(), "debug");
        assert_eq!(
            log_level(ctx(&env, &c, &["loud"])).await.unwrap_err().code(),
            403
        );
    }

    #[tokio::test]
    async fn kill_and_restart_signal_main() {
        let (env, mut rx) = env(None);
        let c = client(1);
        assert_eq!(kill(ctx(&env, &c, &[])).await.unwrap(), "202 KILL OK\r\n");
        assert_eq!(rx.recv().await, Some(Shutdown::Kill));
        assert_eq!(restart(ctx(&env, &c, &[])).await.unwrap(), "202 RESTART OK\r\n");
        assert_eq!(rx.recv().await, Some(Shutdown::Restart));
    }

    #[tokio::test]
    async fn bye_disconnects_silently() {
        let (env, _rx) = env(None);
        let c = client(1);
        assert_eq!(bye(ctx(&env, &c, &[])).await.unwrap(), "");
        assert!(c.is_closed());
    }

    #[tokio::test]
    async fn info_lists_channels_one_based() {
        let (env, _rx) = env(None);
        let c = client(1);
        assert_eq!(
            info(ctx(&env, &c, &[])).await.unwrap(),
            "200 INFO OK\r\n1 PAL PLAYING\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn info_dumps_one_channel_stage() {
        let (env, _rx) = env(None);
        let c = client(1);
        env.channels[0].stage.load(10, "intro".into());
        assert_eq!(
            info(ctx(&env, &c, &["1"])).await.unwrap(),
            "201 INFO OK\r\n10 intro PAUSED\r\n\r\n"
        );
        assert_eq!(info(ctx(&env, &c, &["9"])).await.unwrap_err().code(), 403);
    }
}
