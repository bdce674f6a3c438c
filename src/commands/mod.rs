//! # CLI Subcommands
//!
//! Contains modules that run the subcommands.

pub mod langx;
pub mod completions;

#[derive(thiserror::Error,Debug)]
pub enum CommandError {
    #[error("Command could not be interpreted")]
    InvalidCommand,
    #[error("Language could not be determined, use `--type`")]
    UnknownFormat,
    #[error("File not found")]
    FileNotFound,
    #[error("Listing has no /MN and /POS sections to format")]
    NotFormattable
}
