//! Command registry and name resolution.
//!
//! Two independent tables exist: global commands and channel commands.
//! Lookup is case-insensitive and tries the two-word form first
//! (`MIXER CLEAR` before `MIXER`), so multi-word command names take
//! precedence over a base command whose first parameter happens to
//! match. Registration happens once at startup; re-registering a name
//! overwrites its descriptor.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use super::{AmcpCommand, AmcpCommandFn};
use crate::network::client::Client;

/// Why token resolution produced no command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registered command matches the tokens.
    #[error("unknown command")]
    NotFound,
    /// The command exists but the channel index is out of range.
    #[error("channel index out of range")]
    BadChannel,
}

struct CommandDescriptor {
    #[allow(dead_code)] // Kept for HELP-style listings; mirrors registration source.
    category: &'static str,
    handler: AmcpCommandFn,
    min_params: usize,
}

/// Immutable lookup table from command names to handlers.
///
/// Built once at startup and shared read-only, so concurrent lookups
/// need no locking.
pub struct CommandRepository {
    commands: HashMap<String, CommandDescriptor>,
    channel_commands: HashMap<String, CommandDescriptor>,
    channel_count: usize,
}

/// Parse a channel spec token: `N` or `N-L`, both parts digits only.
/// Returns the 1-based channel number and the optional layer.
pub fn parse_channel_spec(token: &str) -> Option<(u32, Option<i32>)> {
    let (channel_part, layer_part) = match token.split_once('-') {
        Some((c, l)) => (c, Some(l)),
        None => (token, None),
    };

    if channel_part.is_empty() || !channel_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let channel: u32 = channel_part.parse().ok()?;

    let layer = match layer_part {
        None => None,
        Some(l) if !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit()) => {
            Some(l.parse().ok()?)
        }
        Some(_) => return None,
    };

    Some((channel, layer))
}

impl CommandRepository {
    pub fn new(channel_count: usize) -> Self {
        Self {
            commands: HashMap::new(),
            channel_commands: HashMap::new(),
            channel_count,
        }
    }

    /// Register a global command.
    pub fn register_command(
        &mut self,
        category: &'static str,
        name: &str,
        handler: AmcpCommandFn,
        min_params: usize,
    ) {
        self.commands.insert(
            name.to_ascii_uppercase(),
            CommandDescriptor { category, handler, min_params },
        );
    }

    /// Register a channel command.
    pub fn register_channel_command(
        &mut self,
        category: &'static str,
        name: &str,
        handler: AmcpCommandFn,
        min_params: usize,
    ) {
        self.channel_commands.insert(
            name.to_ascii_uppercase(),
            CommandDescriptor { category, handler, min_params },
        );
    }

    /// Two-step lookup: `"{name} {next_token}"` first, then `name`.
    /// On a two-word hit the subcommand token is consumed.
    fn find<'a>(
        map: &'a HashMap<String, CommandDescriptor>,
        name: &str,
        tokens: &mut VecDeque<String>,
    ) -> Option<(String, &'a CommandDescriptor)> {
        if let Some(first) = tokens.front() {
            let full = format!("{} {}", name, first.to_ascii_uppercase());
            if let Some(descriptor) = map.get(&full) {
                tokens.pop_front();
                return Some((full, descriptor));
            }
        }
        map.get(name).map(|d| (name.to_owned(), d))
    }

    /// Bind a global command. Minimum-parameter validation happens later
    /// in the protocol strategy, not here.
    pub fn create_command(
        &self,
        name: &str,
        request_id: Option<String>,
        client: Option<Arc<Client>>,
        mut tokens: VecDeque<String>,
    ) -> Option<AmcpCommand> {
        let (full_name, descriptor) = Self::find(&self.commands, name, &mut tokens)?;
        Some(AmcpCommand::new(
            full_name,
            request_id,
            client,
            None,
            None,
            tokens.into(),
            descriptor.min_params,
            descriptor.handler,
        ))
    }

    /// Bind a channel command against a zero-based channel index.
    ///
    /// An unknown name and an out-of-range index are distinct failures:
    /// the caller retries unknown names against the global table, while
    /// a bad index on a real channel command is a 401.
    pub fn create_channel_command(
        &self,
        name: &str,
        request_id: Option<String>,
        client: Option<Arc<Client>>,
        channel_index: Option<usize>,
        layer: Option<i32>,
        mut tokens: VecDeque<String>,
    ) -> Result<AmcpCommand, ResolveError> {
        let (full_name, descriptor) =
            Self::find(&self.channel_commands, name, &mut tokens).ok_or(ResolveError::NotFound)?;

        let channel_index = channel_index
            .filter(|i| *i < self.channel_count)
            .ok_or(ResolveError::BadChannel)?;

        Ok(AmcpCommand::new(
            full_name,
            request_id,
            client,
            Some(channel_index),
            layer,
            tokens.into(),
            descriptor.min_params,
            descriptor.handler,
        ))
    }

    /// Resolve a full token sequence, starting at the command name.
    ///
    /// A second token shaped like `N` or `N-L` is first treated as a
    /// channel spec; when no channel command matches, the token is
    /// restored and the name retried against the global table, so a
    /// numeric first parameter is not misread as a channel for global
    /// commands.
    pub fn resolve(
        &self,
        client: Option<Arc<Client>>,
        mut tokens: VecDeque<String>,
        request_id: Option<String>,
    ) -> Result<AmcpCommand, ResolveError> {
        let name = tokens
            .pop_front()
            .ok_or(ResolveError::NotFound)?
            .to_ascii_uppercase();

        if let Some(spec_token) = tokens.front().cloned() {
            if let Some((channel, layer)) = parse_channel_spec(&spec_token) {
                tokens.pop_front();
                // Channel numbers on the wire are 1-based; 0 can never match.
                let channel_index = (channel as usize).checked_sub(1);

                let attempt = self.create_channel_command(
                    &name,
                    request_id.clone(),
                    client.clone(),
                    channel_index,
                    layer,
                    tokens.clone(),
                );

                match attempt {
                    Ok(command) => return Ok(command),
                    Err(ResolveError::NotFound) => {
                        // Not a channel command after all; the numeric
                        // token was a plain parameter.
                        tokens.push_front(spec_token);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        self.create_command(&name, request_id, client, tokens)
            .ok_or(ResolveError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmcpError;
    use futures_util::FutureExt;

    fn noop(_ctx: crate::command::CommandContext) -> futures_util::future::BoxFuture<'static, Result<String, AmcpError>> {
        async { Ok(String::new()) }.boxed()
    }

    fn repo() -> CommandRepository {
        let mut repo = CommandRepository::new(2);
        repo.register_command("System Commands", "LOCK", noop, 2);
        repo.register_command("Data Commands", "DATA STORE", noop, 2);
        repo.register_command("Data Commands", "DATA LIST", noop, 0);
        repo.register_channel_command("Basic Commands", "PLAY", noop, 0);
        repo.register_channel_command("Basic Commands", "CLEAR", noop, 0);
        repo.register_channel_command("Template Commands", "CG ADD", noop, 3);
        repo
    }

    fn tokens(parts: &[&str]) -> VecDeque<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_channel_command_with_spec() {
        let cmd = repo()
            .resolve(None, tokens(&["PLAY", "1-10", "clip"]), None)
            .unwrap();
        assert_eq!(cmd.name(), "PLAY");
        assert_eq!(cmd.channel_index(), Some(0));
        assert_eq!(cmd.parameters(), ["clip"]);
    }

    #[test]
    fn two_word_name_takes_precedence() {
        let cmd = repo()
            .resolve(None, tokens(&["CG", "1", "ADD", "0", "tpl", "1"]), None)
            .unwrap();
        assert_eq!(cmd.name(), "CG ADD");
        assert_eq!(cmd.parameters(), ["0", "tpl", "1"]);
    }

    #[test]
    fn lookup_is_case_insensitive_but_parameters_keep_case() {
        let cmd = repo()
            .resolve(None, tokens(&["play", "1", "MyClip"]), None)
            .unwrap();
        assert_eq!(cmd.name(), "PLAY");
        assert_eq!(cmd.parameters(), ["MyClip"]);
    }

    #[test]
    fn numeric_parameter_falls_back_to_global() {
        // LOCK is global; "1" must not be eaten as a channel spec.
        let cmd = repo()
            .resolve(None, tokens(&["LOCK", "1", "ACQUIRE", "secret"]), None)
            .unwrap();
        assert_eq!(cmd.name(), "LOCK");
        assert_eq!(cmd.parameters(), ["1", "ACQUIRE", "secret"]);
        assert_eq!(cmd.channel_index(), None);
    }

    #[test]
    fn out_of_range_channel_is_distinct_from_not_found() {
        assert!(matches!(
            repo().resolve(None, tokens(&["PLAY", "9"]), None),
            Err(ResolveError::BadChannel)
        ));
        // Channel numbers are 1-based, so 0 is out of range too.
        assert!(matches!(
            repo().resolve(None, tokens(&["PLAY", "0"]), None),
            Err(ResolveError::BadChannel)
        ));
        assert!(matches!(
            repo().resolve(None, tokens(&["BOGUS"]), None),
            Err(ResolveError::NotFound)
        ));
    }

    #[test]
    fn resolution_succeeds_below_minimum_params() {
        // Parameter-count validation is the strategy's job.
        let cmd = repo()
            .resolve(None, tokens(&["CG", "1", "ADD", "0"]), None)
            .unwrap();
        assert_eq!(cmd.name(), "CG ADD");
        assert_eq!(cmd.min_params(), 3);
        assert!(cmd.parameters().len() < cmd.min_params());
    }

    #[test]
    fn reregistration_overwrites() {
        let mut repo = repo();
        repo.register_channel_command("Basic Commands", "PLAY", noop, 5);
        let cmd = repo.resolve(None, tokens(&["PLAY", "1"]), None).unwrap();
        assert_eq!(cmd.min_params(), 5);
    }

    #[test]
    fn channel_spec_shapes() {
        assert_eq!(parse_channel_spec("1"), Some((1, None)));
        assert_eq!(parse_channel_spec("2-10"), Some((2, Some(10))));
        assert_eq!(parse_channel_spec("x"), None);
        assert_eq!(parse_channel_spec("1-"), None);
        assert_eq!(parse_channel_spec("-5"), None);
        assert_eq!(parse_channel_spec("1-x"), None);
    }
}
