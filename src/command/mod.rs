//! Command objects and the shared execution environment.
//!
//! An [`AmcpCommand`] is a fully bound unit of work: resolved handler,
//! channel context, parameters and optional request id. Handlers are
//! plain functions returning boxed futures; the handler table is closed
//! at startup, so no open-ended dynamic dispatch is needed.

pub mod lock;
pub mod queue;
pub mod repository;
pub mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::channel::ChannelContext;
use crate::error::{AmcpError, CommandResult};
use crate::network::client::Client;
use repository::CommandRepository;
use scheduler::CommandScheduler;

/// A command handler: business logic invoked with a bound context.
pub type AmcpCommandFn = fn(CommandContext) -> BoxFuture<'static, CommandResult>;

/// Shutdown requests commands can raise towards `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Stop the server (exit code 0).
    Kill,
    /// Stop the server asking the wrapper to restart it (exit code 5).
    Restart,
}

/// Runtime control over the active log filter, driven by `LOG LEVEL`.
pub struct LogControl {
    level: Mutex<String>,
    reload: Option<Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>>,
}

impl LogControl {
    pub fn new(
        initial: String,
        reload: Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>,
    ) -> Self {
        Self { level: Mutex::new(initial), reload: Some(reload) }
    }

    /// A control that records levels but reloads nothing (tests).
    pub fn disabled(initial: String) -> Self {
        Self { level: Mutex::new(initial), reload: None }
    }

    pub fn current(&self) -> String {
        self.level.lock().clone()
    }

    pub fn set(&self, level: &str) -> anyhow::Result<()> {
        if let Some(reload) = &self.reload {
            reload(level)?;
        }
        *self.level.lock() = level.to_owned();
        Ok(())
    }
}

/// Process-lifetime collaborators shared by every executing command.
pub struct Environment {
    pub channels: Vec<ChannelContext>,
    pub repository: Arc<CommandRepository>,
    pub scheduler: Arc<CommandScheduler>,
    pub data_path: PathBuf,
    pub lock_clear_phrase: Option<String>,
    pub log: LogControl,
    pub shutdown_tx: mpsc::UnboundedSender<Shutdown>,
}

/// Everything a handler sees for one invocation.
pub struct CommandContext {
    /// Originating connection; absent for commands fired without one.
    pub client: Option<Arc<Client>>,
    /// Channel context for channel commands.
    pub channel: Option<ChannelContext>,
    /// Layer from the `N-L` channel spec, when given.
    pub layer: Option<i32>,
    /// Parameter tokens in original case.
    pub parameters: Vec<String>,
    /// Shared collaborators.
    pub env: Arc<Environment>,
}

impl CommandContext {
    /// The channel context, or an internal error for a command that was
    /// registered globally by mistake.
    pub fn channel(&self) -> Result<&ChannelContext, AmcpError> {
        self.channel
            .as_ref()
            .ok_or_else(|| AmcpError::Internal("channel command without channel".into()))
    }

    /// Parameter `n`, or the 402 missing-parameter failure.
    pub fn parameter(&self, n: usize) -> Result<&str, AmcpError> {
        self.parameters
            .get(n)
            .map(String::as_str)
            .ok_or_else(|| AmcpError::MissingParameter(format!("parameter {n}")))
    }

    /// Parameter `n` parsed as an integer.
    pub fn int_parameter(&self, n: usize) -> Result<i64, AmcpError> {
        let raw = self.parameter(n)?;
        raw.parse()
            .map_err(|_| AmcpError::InvalidParameter(raw.to_owned()))
    }

    /// The addressed layer, or `default` when the spec carried none.
    pub fn layer_or(&self, default: i32) -> i32 {
        self.layer.unwrap_or(default)
    }
}

/// One bound command instance. Immutable after construction.
pub struct AmcpCommand {
    name: String,
    request_id: Option<String>,
    client: Option<Arc<Client>>,
    channel_index: Option<usize>,
    layer: Option<i32>,
    parameters: Vec<String>,
    min_params: usize,
    handler: AmcpCommandFn,
}

impl AmcpCommand {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        request_id: Option<String>,
        client: Option<Arc<Client>>,
        channel_index: Option<usize>,
        layer: Option<i32>,
        parameters: Vec<String>,
        min_params: usize,
        handler: AmcpCommandFn,
    ) -> Self {
        Self { name, request_id, client, channel_index, layer, parameters, min_params, handler }
    }

    /// Resolved command name (uppercased, including a consumed
    /// subcommand token, e.g. `CG ADD`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Zero-based channel index, `None` for global commands.
    pub fn channel_index(&self) -> Option<usize> {
        self.channel_index
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Minimum parameter count from the registry descriptor; validated
    /// by the protocol strategy after resolution.
    pub fn min_params(&self) -> usize {
        self.min_params
    }

    /// Run the handler against the shared environment.
    pub async fn execute(&self, env: &Arc<Environment>) -> CommandResult {
        let channel = self.channel_index.and_then(|i| env.channels.get(i).cloned());
        let ctx = CommandContext {
            client: self.client.clone(),
            channel,
            layer: self.layer,
            parameters: self.parameters.clone(),
            env: Arc::clone(env),
        };
        (self.handler)(ctx).await
    }

    /// Send reply text back to the originating connection, prefixed with
    /// the request id when one was supplied. An empty body sends nothing
    /// (BYE answers with silence).
    pub fn send_reply(&self, body: &str) {
        if body.is_empty() {
            return;
        }
        if let Some(client) = &self.client {
            client.send(amcp_proto::format_reply(self.request_id(), body));
        }
    }
}

/// How a group of commands came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrigin {
    /// One command submitted on its own.
    Single,
    /// A client-submitted `BEGIN`/`COMMIT` batch.
    ClientBatch,
    /// Commands that became due on the same scheduler tick.
    Scheduled,
}

/// An ordered collection of commands reported back together.
pub struct GroupCommand {
    commands: Vec<Arc<AmcpCommand>>,
    origin: GroupOrigin,
    /// Batch submitter, for consolidated reporting. Scheduler batches
    /// have none; members reply on their own paths.
    client: Option<Arc<Client>>,
    request_id: Option<String>,
}

impl GroupCommand {
    /// Wrap a single command.
    pub fn single(command: Arc<AmcpCommand>) -> Self {
        Self { commands: vec![command], origin: GroupOrigin::Single, client: None, request_id: None }
    }

    /// A client-submitted batch with its submitter as reply target.
    pub fn batch(
        commands: Vec<Arc<AmcpCommand>>,
        client: Arc<Client>,
        request_id: Option<String>,
    ) -> Self {
        Self { commands, origin: GroupOrigin::ClientBatch, client: Some(client), request_id }
    }

    /// A batch synthesized by the scheduler; no direct reply target.
    pub fn scheduled(commands: Vec<Arc<AmcpCommand>>) -> Self {
        Self { commands, origin: GroupOrigin::Scheduled, client: None, request_id: None }
    }

    pub fn commands(&self) -> &[Arc<AmcpCommand>] {
        &self.commands
    }

    pub fn origin(&self) -> GroupOrigin {
        self.origin
    }

    /// The sole member's name, or the synthetic batch label.
    pub fn name(&self) -> &str {
        match self.commands.as_slice() {
            [only] => only.name(),
            _ => "BATCH",
        }
    }

    /// Send consolidated text to the batch submitter, if there is one.
    pub fn send_reply(&self, body: &str) {
        if let Some(client) = &self.client {
            client.send(amcp_proto::format_reply(self.request_id.as_deref(), body));
        }
    }
}
