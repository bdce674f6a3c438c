//! ## Language Analysis and Transformations

use std::io::Read;
use std::str::FromStr;
use colored::Colorize;
use lsp_types as lsp;
use super::CommandError;
use crate::lang;
use crate::lang::LanguageKind;
use crate::lang::workspace::{parse_program,ParsedProgram};
use crate::{DYNERR,STDRESULT};

/// Source text from `--file`, or from stdin if there is no file.
/// The language comes from `--type` if given, otherwise from the file extension,
/// otherwise from `default_kind`.
fn read_source(cmd: &clap::ArgMatches, default_kind: Option<LanguageKind>) -> Result<(String,LanguageKind),DYNERR> {
    let explicit = match cmd.try_get_one::<String>("type") {
        Ok(Some(t)) => Some(LanguageKind::from_str(t)?),
        _ => None
    };
    match cmd.get_one::<String>("file") {
        Some(path_str) => {
            let path = std::path::Path::new(path_str);
            if !path.is_file() {
                log::error!("{} is not a file",path_str);
                return Err(Box::new(CommandError::FileNotFound));
            }
            let from_ext = path.extension().and_then(|e| LanguageKind::from_extension(&e.to_string_lossy()));
            let kind = match explicit.or(from_ext).or(default_kind) {
                Some(k) => k,
                None => return Err(Box::new(CommandError::UnknownFormat))
            };
            Ok((std::fs::read_to_string(path)?,kind))
        },
        None => {
            if atty::is(atty::Stream::Stdin) {
                log::error!("line entry is not supported, please pipe something in or use `--file`");
                return Err(Box::new(CommandError::InvalidCommand));
            }
            let kind = match explicit.or(default_kind) {
                Some(k) => k,
                None => return Err(Box::new(CommandError::UnknownFormat))
            };
            let mut program = String::new();
            std::io::stdin().read_to_string(&mut program)?;
            Ok((program,kind))
        }
    }
}

/// Parse or print the error with its location
fn parse_or_report(text: &str, kind: LanguageKind) -> Result<ParsedProgram,DYNERR> {
    match parse_program(kind,text) {
        Ok(prog) => Ok(prog),
        Err(e) => {
            lang::eprint_syntax_error(&e,text);
            eprintln!("\u{2717} {}","Syntax error".red());
            Err(Box::new(lang::Error::Syntax))
        }
    }
}

pub fn verify(cmd: &clap::ArgMatches) -> STDRESULT {
    let (text,kind) = read_source(cmd,None)?;
    if text.trim().len()==0 {
        log::error!("verify was handed an empty string");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let prog = parse_or_report(&text,kind)?;
    eprintln!("\u{2713} {} {} {}",kind,prog.name().bold(),"Syntax OK".green());
    if !atty::is(atty::Stream::Stdout) {
        // if not the console, pipe the code to the next node
        print!("{}",text);
    }
    Ok(())
}

pub fn format(cmd: &clap::ArgMatches) -> STDRESULT {
    let (text,kind) = read_source(cmd,Some(LanguageKind::Instruction))?;
    if kind != LanguageKind::Instruction {
        log::error!("only TP listings can be formatted");
        return Err(Box::new(CommandError::NotFormattable));
    }
    let tab_size = match cmd.get_one::<u32>("tab-size") {
        Some(n) => *n,
        None => 2
    };
    let options = lsp::FormattingOptions {
        tab_size,
        insert_spaces: true,
        ..Default::default()
    };
    match lang::tp::formatter::Formatter::new().format(&text,&options) {
        Some(ans) => {
            print!("{}",ans);
            Ok(())
        },
        None => Err(Box::new(CommandError::NotFormattable))
    }
}

fn kind_label(kind: lsp::SymbolKind) -> &'static str {
    match kind {
        lsp::SymbolKind::KEY => "label",
        lsp::SymbolKind::CONSTANT => "const",
        lsp::SymbolKind::STRUCT => "type",
        lsp::SymbolKind::FIELD => "field",
        lsp::SymbolKind::FUNCTION => "routine",
        _ => "var"
    }
}

fn print_symbols(syms: &[lsp::DocumentSymbol], depth: usize, console: bool) {
    for sym in syms {
        let label = kind_label(sym.kind);
        let detail = sym.detail.clone().unwrap_or_default();
        let line = sym.range.start.line + 1;
        match console {
            true => println!("{}{} {} {} {}","  ".repeat(depth),label.cyan(),sym.name.bold(),detail,format!("(line {})",line).dimmed()),
            false => println!("{}{}\t{}\t{}\t{}","  ".repeat(depth),label,sym.name,detail,line)
        }
        if let Some(children) = &sym.children {
            print_symbols(children,depth+1,console);
        }
    }
}

pub fn symbols(cmd: &clap::ArgMatches) -> STDRESULT {
    let (text,kind) = read_source(cmd,None)?;
    let prog = parse_or_report(&text,kind)?;
    let console = atty::is(atty::Stream::Stdout);
    if cmd.get_flag("header") {
        for line in prog.header_comment().lines() {
            println!("-- {}",line);
        }
    }
    print_symbols(&lang::symbols::document_symbols(&prog),0,console);
    Ok(())
}
