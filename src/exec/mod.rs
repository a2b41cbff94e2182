// ABOUTME: Whitelisted remote command execution with audit logging.
// ABOUTME: Commands are validated per OS before any SSH session is opened.

mod error;
mod executor;
pub mod whitelist;

pub use error::{ExecError, ExecErrorKind};
pub use executor::{CommandExecutor, ExecutorSettings, RemoteCommandResult};
pub use whitelist::{CommandParams, CommandSpec, available_commands, is_whitelisted};
