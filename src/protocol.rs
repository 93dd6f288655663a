//! The AMCP front controller.
//!
//! [`ProtocolStrategy::parse`] takes one complete line from the
//! transport and either enqueues a resolved command or answers with a
//! synthesized error reply. Parsing-stage failures are resolved here
//! and never reach a queue; a failed line degrades to a reply, never to
//! a dropped connection.

use std::collections::VecDeque;
use std::sync::Arc;

use amcp_proto::tokenize;
use tracing::info;

use crate::command::queue::CommandQueue;
use crate::command::repository::ResolveError;
use crate::command::{AmcpCommand, Environment, GroupCommand};
use crate::network::client::Client;

/// Per-connection `BEGIN`/`COMMIT` accumulation state.
#[derive(Default)]
pub struct BatchState {
    in_progress: bool,
    request_id: Option<String>,
    commands: Vec<Arc<AmcpCommand>>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, request_id: Option<String>) {
        self.in_progress = true;
        self.request_id = request_id;
        self.commands.clear();
    }

    fn finish(&mut self) -> (Vec<Arc<AmcpCommand>>, Option<String>) {
        self.in_progress = false;
        (std::mem::take(&mut self.commands), self.request_id.take())
    }
}

enum ParseErrorKind {
    /// 400: unrecognized command, echoed back.
    Command,
    /// 401: malformed or out-of-range channel index.
    Channel,
    /// 402: fewer parameters than the command needs.
    Parameters,
    /// 503: lock check denied the connection.
    Access,
}

struct ParseFailure {
    kind: ParseErrorKind,
    command_name: String,
}

/// Stateless line interpreter; per-connection batch state is passed in
/// by the connection task.
pub struct ProtocolStrategy {
    env: Arc<Environment>,
    /// Index 0 is the general queue; index `i + 1` serves channel `i`.
    queues: Vec<Arc<CommandQueue>>,
}

impl ProtocolStrategy {
    pub fn new(env: Arc<Environment>, queues: Vec<Arc<CommandQueue>>) -> Self {
        Self { env, queues }
    }

    /// Interpret one complete line (delimiter already stripped).
    pub fn parse(&self, client: &Arc<Client>, message: &str, batch: &mut BatchState) {
        let mut tokens: VecDeque<String> = tokenize(message).into();

        // PING answers straight away: not queued, not logged.
        if tokens
            .front()
            .is_some_and(|t| t.eq_ignore_ascii_case("PING"))
        {
            tokens.pop_front();
            let mut answer = String::from("PONG");
            for token in &tokens {
                answer.push(' ');
                answer.push_str(token);
            }
            answer.push_str("\r\n");
            client.send(answer);
            return;
        }

        info!(client = %client.address(), %message, "Received message");

        let mut request_id = None;
        if let Err(failure) = self.interpret(client, tokens, batch, &mut request_id) {
            let mut answer = String::new();
            if let Some(id) = &request_id {
                answer.push_str("RES ");
                answer.push_str(id);
                answer.push(' ');
            }
            match failure.kind {
                ParseErrorKind::Command => {
                    answer.push_str(&format!("400 ERROR\r\n{message}\r\n"));
                }
                ParseErrorKind::Channel => {
                    answer.push_str(&format!("401 {} ERROR\r\n", failure.command_name));
                }
                ParseErrorKind::Parameters => {
                    answer.push_str(&format!("402 {} ERROR\r\n", failure.command_name));
                }
                ParseErrorKind::Access => {
                    answer.push_str(&format!("503 {} FAILED\r\n", failure.command_name));
                }
            }
            client.send(answer);
        }
    }

    fn interpret(
        &self,
        client: &Arc<Client>,
        mut tokens: VecDeque<String>,
        batch: &mut BatchState,
        request_id: &mut Option<String>,
    ) -> Result<(), ParseFailure> {
        // Legacy "switch" marker.
        if tokens.front().is_some_and(|t| t.starts_with('/')) {
            tokens.pop_front();
        }

        if tokens.front().is_some_and(|t| t.eq_ignore_ascii_case("REQ")) {
            tokens.pop_front();
            let id = tokens.pop_front().ok_or(ParseFailure {
                kind: ParseErrorKind::Parameters,
                command_name: String::new(),
            })?;
            *request_id = Some(id);
        }

        let first = tokens.front().ok_or(ParseFailure {
            kind: ParseErrorKind::Command,
            command_name: String::new(),
        })?;
        let base_name = first.to_ascii_uppercase();

        match base_name.as_str() {
            "BEGIN" => {
                if batch.in_progress {
                    return Err(ParseFailure {
                        kind: ParseErrorKind::Command,
                        command_name: base_name,
                    });
                }
                batch.begin(request_id.clone());
                return Ok(());
            }
            "COMMIT" => {
                if !batch.in_progress {
                    return Err(ParseFailure {
                        kind: ParseErrorKind::Command,
                        command_name: base_name,
                    });
                }
                let (commands, batch_request_id) = batch.finish();
                let group =
                    GroupCommand::batch(commands, Arc::clone(client), batch_request_id);
                self.queues[0].add(Arc::new(group));
                return Ok(());
            }
            "DISCARD" => {
                if !batch.in_progress {
                    return Err(ParseFailure {
                        kind: ParseErrorKind::Command,
                        command_name: base_name,
                    });
                }
                batch.finish();
                return Ok(());
            }
            _ => {}
        }

        let command = self
            .env
            .repository
            .resolve(Some(Arc::clone(client)), tokens, request_id.clone())
            .map_err(|err| ParseFailure {
                kind: match err {
                    ResolveError::NotFound => ParseErrorKind::Command,
                    ResolveError::BadChannel => ParseErrorKind::Channel,
                },
                command_name: base_name,
            })?;

        if command.parameters().len() < command.min_params() {
            return Err(ParseFailure {
                kind: ParseErrorKind::Parameters,
                command_name: command.name().to_owned(),
            });
        }

        if let Some(index) = command.channel_index() {
            let context = &self.env.channels[index];
            if !context.lock.check_access(client) {
                return Err(ParseFailure {
                    kind: ParseErrorKind::Access,
                    command_name: command.name().to_owned(),
                });
            }
        }

        let command = Arc::new(command);
        if batch.in_progress {
            batch.commands.push(command);
            return Ok(());
        }

        let queue_index = command.channel_index().map_or(0, |i| i + 1);
        self.queues[queue_index].add(Arc::new(GroupCommand::single(command)));
        Ok(())
    }
}
