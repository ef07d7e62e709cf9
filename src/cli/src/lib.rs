pub mod commands;
pub mod forward;
pub mod logging;
pub mod process_command;
