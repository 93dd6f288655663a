//! The AMCP command set.
//!
//! Handlers are plain functions returning boxed futures; each submodule
//! groups one command category. [`register_commands`] wires the whole
//! table into a repository at startup.

pub mod basic;
pub mod data;
pub mod mixer;
pub mod schedule;
pub mod system;
pub mod template;

use crate::command::repository::CommandRepository;

/// Register every supported command with its category and minimum
/// parameter count.
pub fn register_commands(repo: &mut CommandRepository) {
    repo.register_channel_command("Basic Commands", "LOADBG", basic::loadbg, 1);
    repo.register_channel_command("Basic Commands", "LOAD", basic::load, 1);
    repo.register_channel_command("Basic Commands", "PLAY", basic::play, 0);
    repo.register_channel_command("Basic Commands", "PAUSE", basic::pause, 0);
    repo.register_channel_command("Basic Commands", "RESUME", basic::resume, 0);
    repo.register_channel_command("Basic Commands", "STOP", basic::stop, 0);
    repo.register_channel_command("Basic Commands", "CLEAR", basic::clear, 0);
    repo.register_channel_command("Basic Commands", "CALL", basic::call, 1);
    repo.register_channel_command("Basic Commands", "SWAP", basic::swap, 1);
    repo.register_channel_command("Basic Commands", "ADD", basic::add, 1);
    repo.register_channel_command("Basic Commands", "REMOVE", basic::remove, 0);
    repo.register_channel_command("Basic Commands", "PRINT", basic::print, 0);
    repo.register_channel_command("Basic Commands", "SET", basic::set, 2);

    repo.register_channel_command("Template Commands", "CG ADD", template::cg_add, 3);
    repo.register_channel_command("Template Commands", "CG PLAY", template::cg_play, 1);
    repo.register_channel_command("Template Commands", "CG STOP", template::cg_stop, 1);
    repo.register_channel_command("Template Commands", "CG NEXT", template::cg_next, 1);
    repo.register_channel_command("Template Commands", "CG REMOVE", template::cg_remove, 1);
    repo.register_channel_command("Template Commands", "CG CLEAR", template::cg_clear, 0);
    repo.register_channel_command("Template Commands", "CG UPDATE", template::cg_update, 2);
    repo.register_channel_command("Template Commands", "CG INVOKE", template::cg_invoke, 2);
    repo.register_channel_command("Template Commands", "CG INFO", template::cg_info, 0);

    repo.register_channel_command("Mixer Commands", "MIXER OPACITY", mixer::opacity, 0);
    repo.register_channel_command("Mixer Commands", "MIXER VOLUME", mixer::volume, 0);
    repo.register_channel_command("Mixer Commands", "MIXER FILL", mixer::fill, 0);
    repo.register_channel_command("Mixer Commands", "MIXER CLEAR", mixer::clear, 0);

    repo.register_channel_command("Query Commands", "TIME", schedule::time, 0);
    repo.register_channel_command("Timecode Commands", "TIMECODE SOURCE", schedule::timecode_source, 0);

    repo.register_command("Scheduler Commands", "SCHEDULE SET", schedule::set, 3);
    repo.register_command("Scheduler Commands", "SCHEDULE REMOVE", schedule::remove, 1);
    repo.register_command("Scheduler Commands", "SCHEDULE CLEAR", schedule::clear, 0);
    repo.register_command("Scheduler Commands", "SCHEDULE LIST", schedule::list, 0);
    repo.register_command("Scheduler Commands", "SCHEDULE INFO", schedule::info, 1);

    repo.register_command("Data Commands", "DATA STORE", data::store, 2);
    repo.register_command("Data Commands", "DATA RETRIEVE", data::retrieve, 1);
    repo.register_command("Data Commands", "DATA LIST", data::list, 0);
    repo.register_command("Data Commands", "DATA REMOVE", data::remove, 1);

    repo.register_command("Basic Commands", "LOCK", system::lock, 2);
    repo.register_command("System Commands", "LOG LEVEL", system::log_level, 0);
    repo.register_command("Query Commands", "VERSION", system::version, 0);
    repo.register_command("Query Commands", "INFO", system::info, 0);
    repo.register_command("System Commands", "BYE", system::bye, 0);
    repo.register_command("System Commands", "KILL", system::kill, 0);
    repo.register_command("System Commands", "RESTART", system::restart, 0);
}
