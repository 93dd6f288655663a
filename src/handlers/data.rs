//! Flat-file data storage commands.
//!
//! `DATA STORE` persists a value under a key as a `.ftd` file in the
//! configured data path; keys are restricted to a safe character set so
//! a key can never escape that directory.

use std::io::ErrorKind;
use std::path::PathBuf;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::command::CommandContext;
use crate::error::{AmcpError, CommandResult};

const DATA_EXTENSION: &str = "ftd";

fn data_file(ctx: &CommandContext, key: &str) -> Result<PathBuf, AmcpError> {
    let safe = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !safe {
        return Err(AmcpError::ExpectedUserError(format!("bad data key {key:?}")));
    }
    Ok(ctx.env.data_path.join(format!("{key}.{DATA_EXTENSION}")))
}

fn map_not_found(err: std::io::Error, key: &str) -> AmcpError {
    if err.kind() == ErrorKind::NotFound {
        AmcpError::FileNotFound(key.to_owned())
    } else {
        AmcpError::Io(err)
    }
}

pub fn store(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let key = ctx.parameter(0)?.to_owned();
        let value = ctx.parameters[1..].join(" ");
        let path = data_file(&ctx, &key)?;

        tokio::fs::create_dir_all(&ctx.env.data_path).await?;
        tokio::fs::write(&path, value).await?;
        Ok("202 DATA STORE OK\r\n".to_string())
    }
    .boxed()
}

pub fn retrieve(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let key = ctx.parameter(0)?.to_owned();
        let path = data_file(&ctx, &key)?;
        let value = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| map_not_found(e, &key))?;
        Ok(format!("201 DATA RETRIEVE OK\r\n{value}\r\n"))
    }
    .boxed()
}

pub fn list(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let mut keys = Vec::new();
        match tokio::fs::read_dir(&ctx.env.data_path).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) == Some(DATA_EXTENSION) {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            keys.push(stem.to_owned());
                        }
                    }
                }
            }
            // A data path that does not exist yet simply has no keys.
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        keys.sort();

        let mut reply = String::from("200 DATA LIST OK\r\n");
        for key in keys {
            reply.push_str(&key);
            reply.push_str("\r\n");
        }
        reply.push_str("\r\n");
        Ok(reply)
    }
    .boxed()
}

pub fn remove(ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
    async move {
        let key = ctx.parameter(0)?.to_owned();
        let path = data_file(&ctx, &key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_not_found(e, &key))?;
        Ok("202 DATA REMOVE OK\r\n".to_string())
    }
    .boxed()
}
