//! # Command Line Interface
//!
//! The clap command is built in `cli.rs`, which the build script also uses for shell completions.
//! The subcommands are in the `commands` module.

use env_logger;
#[cfg(windows)]
use colored;
use log::error;
use tpkarel::commands;
use tpkarel::commands::CommandError;

mod cli;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    let main_cmd = cli::build_cli();
    let matches = main_cmd.clone().get_matches();

    // Check syntax of a TP or KAREL source
    if let Some(cmd) = matches.subcommand_matches("verify") {
        return commands::langx::verify(cmd);
    }

    // Indent and align a TP listing
    if let Some(cmd) = matches.subcommand_matches("format") {
        return commands::langx::format(cmd);
    }

    // Labels or declarations
    if let Some(cmd) = matches.subcommand_matches("symbols") {
        return commands::langx::symbols(cmd);
    }

    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(main_cmd,cmd);
    }

    error!("No subcommand was found, try `tpkarel --help`");
    return Err(Box::new(CommandError::InvalidCommand));
}
