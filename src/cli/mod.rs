mod commands;

pub use commands::{execute_command, Args, Commands};
