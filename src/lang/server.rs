//! # Language server helpers
//!
//! Pieces of the language server that are independent of the connection, so they can be
//! shared with the CLI and tested without a client.  The server binary in `src/bin` handles
//! the message loop.

use std::io::Write;
use std::str::FromStr;
use lsp_types as lsp;
use serde::Serialize;

use crate::lang::combinators::SyntaxError;
use crate::lang::workspace::ParseStatus;
use crate::DYNERR;

/// JSON-RPC error codes.
/// -32768 through -32000 are reserved.
pub mod rpc_error {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Turn the result of a query into a response.  Query errors are contract violations
/// (e.g. the document was never opened) and become an error response for this request only.
pub fn query_response<T: Serialize, E: std::fmt::Display>(id: lsp_server::RequestId, res: Result<T,E>) -> lsp_server::Response {
    match res {
        Ok(ans) => match serde_json::to_value(ans) {
            Ok(result) => lsp_server::Response::new_ok(id,result),
            Err(_) => lsp_server::Response::new_err(id,rpc_error::PARSE_ERROR,"could not serialize the result".to_string())
        },
        Err(e) => lsp_server::Response::new_err(id,rpc_error::INTERNAL_ERROR,e.to_string())
    }
}

pub fn basic_diag(range: lsp::Range,mess: &str,severity: lsp::DiagnosticSeverity) -> lsp::Diagnostic {
    lsp::Diagnostic {
        range,
        severity: Some(severity),
        code: None,
        code_description: None,
        source: Some("tpkarel".to_string()),
        message: mess.to_string(),
        related_information: None,
        tags: None,
        data: None
    }
}

/// Diagnostic covering the rest of the line where the parser gave up
pub fn syntax_diag(err: &SyntaxError, text: &str) -> lsp::Diagnostic {
    let start = err.position.to_lsp();
    let len = match crate::lang::get_line(text,start.line as usize) {
        Some(line) => line.chars().count() as u32,
        None => start.character
    };
    let end = lsp::Position::new(start.line,u32::max(len,start.character));
    let mut mess = err.message.clone();
    if err.expected.len() > 0 {
        mess += &format!(", expected {}",err.expected.join(", "));
    }
    basic_diag(lsp::Range::new(start,end),&mess,lsp::DiagnosticSeverity::ERROR)
}

/// Diagnostics to push after a parse.  A successful parse clears the diagnostics.
pub fn status_diags(status: &ParseStatus, text: &str) -> Vec<lsp::Diagnostic> {
    match status {
        ParseStatus::Parsed => Vec::new(),
        ParseStatus::Failed(err) => vec![syntax_diag(err,text)]
    }
}

/// Get a path relative to the workspace path for display purposes.
/// Only checks the first workspace folder.
/// If there is any failure we keep the whole URI string.
pub fn path_in_workspace(full: &lsp::Url, ws_folder: &Vec<lsp::Url>) -> String {
    if ws_folder.len() == 0 {
        return full.to_string();
    }
    let (full_path,ws_path) = match (super::pathbuf_from_uri(full),super::pathbuf_from_uri(&ws_folder[0])) {
        (Ok(f),Ok(w)) => (f,w),
        _ => return full.to_string()
    };
    match full_path.strip_prefix(&ws_path) {
        Ok(rel) if rel.as_os_str().len() > 0 => {
            rel.iter().map(|node| node.to_string_lossy().to_string()).collect::<Vec<String>>().join("/")
        },
        _ => full.to_string()
    }
}

fn setup_env_logger(filt: log::LevelFilter, path: &str) -> Result<(),DYNERR> {
    if filt==log::LevelFilter::Off {
        return Ok(());
    }
    let logging_file = Box::new(std::fs::File::create(path)?);
    env_logger::Builder::new().format(|buf,record| {
        writeln!(buf,"{}:{} [{}] - {}",record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        )
    })
    .filter(Some("tpkarel::lang"),filt)
    .target(env_logger::Target::Pipe(logging_file))
    .init();
    Ok(())
}

/// Parse the language server's command line arguments and set up logging.
/// Logging stays off unless `--log-level` is given.
pub fn parse_args() -> Result<(),DYNERR> {
    let mut log_level = log::LevelFilter::Off;
    let mut log_file = "tpkarel_log.txt".to_string();
    let mut args = std::env::args().into_iter();
    args.next();
    while let Some(val) = args.next() {
        if &val == "--log-level" {
            if let Some(val) = args.next() {
                log_level = log::LevelFilter::from_str(&val)?;
            }
        } else if &val == "--log-file" {
            if let Some(val) = args.next() {
                log_file = val;
            }
        }
    }
    setup_env_logger(log_level,&log_file)
}
