//! # Language Module
//!
//! Language services for FANUC Teach Pendant (TP) and KAREL source files.
//! Both grammars are built from the position tracking combinators in `combinators`,
//! and produce the syntax trees found in `tp::ast` and `karel::ast`.
//! The `workspace` module keeps every known document along with its last good syntax tree,
//! and the query modules (`completions`, `hovers`, `definitions`, `symbols`) walk those trees
//! to answer editor requests, crossing file boundaries through the workspace name index.

pub mod combinators;
pub mod tp;
pub mod karel;
pub mod workspace;
pub mod completions;
pub mod hovers;
pub mod definitions;
pub mod symbols;
pub mod snippets;
pub mod settings;
pub mod server;

#[cfg(test)]
mod combinators_test;
#[cfg(test)]
mod completions_test;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use lsp_types as lsp;
use thiserror::Error;
use colored::Colorize;

use crate::DYNERR;

#[derive(Error,Debug)]
pub enum Error {
    #[error("Syntax error")]
    Syntax,
    #[error("Parse error at line {line} column {column}: {message}")]
    Parse {
        line: u32,
        column: u32,
        message: String
    },
    #[error("Document is not open: {0}")]
    DocumentNotOpen(String),
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
    #[error("Path not found")]
    PathNotFound,
    #[error("Invalid range")]
    InvalidRange
}

/// The two source languages.
/// `Instruction` is the line numbered TP language, `Structured` is KAREL.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum LanguageKind {
    Instruction,
    Structured
}

impl LanguageKind {
    /// Language kind from a file extension, case insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ls" | "tp" => Some(Self::Instruction),
            "kl" => Some(Self::Structured),
            _ => None
        }
    }
    /// Language kind from the extension of the URI's path
    pub fn from_uri(uri: &lsp::Url) -> Option<Self> {
        let path = PathBuf::from(uri.path());
        match path.extension() {
            Some(ext) => Self::from_extension(&ext.to_string_lossy()),
            None => None
        }
    }
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Instruction => "ls",
            Self::Structured => "kl"
        }
    }
    /// The label used when describing a document of this kind to the user
    pub fn program_type(&self) -> &'static str {
        match self {
            Self::Instruction => "TP program",
            Self::Structured => "KAREL program"
        }
    }
}

impl FromStr for LanguageKind {
    type Err = Error;
    /// Accepts LSP language identifiers as well as the short names used by the CLI
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s.to_lowercase().as_str() {
            "tp" | "fanuc-tp" | "ls" => Ok(Self::Instruction),
            "karel" | "fanuc-karel" | "kl" => Ok(Self::Structured),
            _ => Err(Error::UnknownLanguage(s.to_string()))
        }
    }
}

impl fmt::Display for LanguageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction => write!(f,"TP"),
            Self::Structured => write!(f,"KAREL")
        }
    }
}

/// Source text along with its URI and the client's version.
#[derive(Clone,Debug)]
pub struct Document {
    pub uri: lsp::Url,
    pub version: Option<i32>,
    pub text: String
}

impl Document {
    pub fn new(uri: lsp::Url, text: String) -> Self {
        Self {
            uri,
            version: None,
            text
        }
    }
    pub fn from_file_path(path: &std::path::Path) -> Result<Self,DYNERR> {
        let canon = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => return Err(Box::new(Error::PathNotFound))
        };
        let uri = match lsp::Url::from_file_path(&canon) {
            Ok(u) => u,
            Err(_) => return Err(Box::new(Error::PathNotFound))
        };
        let text = std::fs::read_to_string(&canon)?;
        Ok(Self::new(uri,text))
    }
    /// Program name derived from the file name without extension.
    pub fn bare_name(&self) -> String {
        bare_name(&self.uri)
    }
}

/// Program name as used in cross references: file name without extension.
/// The workspace indexes this in lower case, display code usually wants upper case.
pub fn bare_name(uri: &lsp::Url) -> String {
    let path = PathBuf::from(uri.path());
    match path.file_stem() {
        Some(stem) => stem.to_string_lossy().to_string(),
        None => uri.path().to_string()
    }
}

/// Some clients percent-encode the drive colon on Windows, which would break comparisons
/// with URIs we build from the file system.
pub fn normalize_client_uri(uri: lsp::Url) -> lsp::Url {
    let s = uri.as_str().replace("%3A",":").replace("%3a",":");
    match lsp::Url::parse(&s) {
        Ok(ans) => ans,
        Err(_) => uri
    }
}

pub fn normalize_client_uri_str(uri: &str) -> Result<lsp::Url,DYNERR> {
    let parsed = lsp::Url::parse(uri)?;
    Ok(normalize_client_uri(parsed))
}

pub fn pathbuf_from_uri(uri: &lsp::Url) -> Result<PathBuf,DYNERR> {
    match uri.to_file_path() {
        Ok(p) => Ok(p),
        Err(_) => Err(Box::new(Error::PathNotFound))
    }
}

/// Normalize line separators to `\n`
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n","\n")
}

/// Range contains position, the end of the range is included
pub fn range_contains_pos(rng: &lsp::Range, pos: &lsp::Position) -> bool {
    if pos.line < rng.start.line || pos.line > rng.end.line {
        return false;
    }
    if pos.line == rng.start.line && pos.character < rng.start.character {
        return false;
    }
    if pos.line == rng.end.line && pos.character > rng.end.character {
        return false;
    }
    true
}

/// Get the row of the text, if it exists
pub fn get_line(text: &str, row: usize) -> Option<&str> {
    text.split('\n').nth(row).map(|s| s.trim_end_matches('\r'))
}

/// Find the identifier-like word that contains the character position.
/// Returns the word and its start and end character indices.
pub fn word_at(line: &str, character: usize) -> Option<(String,usize,usize)> {
    let chars: Vec<char> = line.chars().collect();
    let is_word = |c: &char| c.is_alphanumeric() || *c == '_' || *c == '$';
    if chars.len() == 0 {
        return None;
    }
    let mut beg = usize::min(character,chars.len());
    if beg == chars.len() || !is_word(&chars[beg]) {
        if beg == 0 || !is_word(&chars[beg-1]) {
            return None;
        }
        beg -= 1;
    }
    let mut end = beg;
    while beg > 0 && is_word(&chars[beg-1]) {
        beg -= 1;
    }
    while end < chars.len() && is_word(&chars[end]) {
        end += 1;
    }
    Some((chars[beg..end].iter().collect(),beg,end))
}

pub fn update_json_bool(maybe_obj: &serde_json::Value, key: &str, curr: &mut bool) {
    if let Some(obj) = maybe_obj.as_object() {
        if let Some(x) = obj.get(key) {
            if let Some(b) = x.as_bool() {
                *curr = b;
            }
        }
    }
}

pub fn update_json_i64(maybe_obj: &serde_json::Value, key: &str, curr: &mut i64) {
    if let Some(obj) = maybe_obj.as_object() {
        if let Some(x) = obj.get(key) {
            if let Some(i) = x.as_i64() {
                *curr = i;
            }
        }
    }
}

pub fn update_json_string(maybe_obj: &serde_json::Value, key: &str, curr: &mut String) {
    if let Some(obj) = maybe_obj.as_object() {
        if let Some(x) = obj.get(key) {
            if let Some(s) = x.as_str() {
                *curr = s.to_string();
            }
        }
    }
}

pub fn update_json_vec_str(maybe_obj: &serde_json::Value, key: &str, curr: &mut Vec<String>) {
    if let Some(obj) = maybe_obj.as_object() {
        if let Some(x) = obj.get(key) {
            if let Some(a) = x.as_array() {
                let mut ans = Vec::new();
                for v in a {
                    match v.as_str() {
                        Some(s) => ans.push(s.to_string()),
                        None => return
                    }
                }
                *curr = ans;
            }
        }
    }
}

/// Print a parse error with the offending line, for use by the CLI
pub fn eprint_syntax_error(err: &combinators::SyntaxError, text: &str) {
    let row = err.position.line as usize;
    eprintln!("{} row {} col {}: {}","ERROR".red(),row,err.position.column,err.message);
    if !err.expected.is_empty() {
        eprintln!("    expected {}",err.expected.join(", "));
    }
    if row > 0 {
        if let Some(line) = get_line(text,row-1) {
            eprintln!("    {}",line);
            eprintln!("    {}{}"," ".repeat(err.position.column.saturating_sub(1) as usize),"^".red().bold());
        }
    }
}
