//! # Completions
//!
//! Completions are computed from the text of the current line up to the cursor.
//! The line number prefix of a TP line is dropped, and the rest is split into
//! whitespace separated tokens (quoted strings stay whole).  Each provider looks at the
//! tokens on its own, and the results are concatenated in provider order:
//! program names after `CALL` or `RUN`, variable paths after `$[`, then builtin snippets.

use std::collections::BTreeMap;
use std::sync::Arc;
use lsp_types as lsp;
use regex::Regex;

use crate::lang::karel::ast::{Program,Type,TypeKind};
use crate::lang::settings::Settings;
use crate::lang::snippets::SnippetTable;
use crate::lang::workspace::Workspace;
use crate::lang::{LanguageKind,Error};

const RCH: &str = "unreachable was reached";
const MAX_TYPE_DEPTH: usize = 16;

/// Split on whitespace, keeping quoted strings as one token
pub fn tokenize(line: &str) -> Vec<String> {
    let mut ans = Vec::new();
    let mut curr = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                curr.push(c);
                if c == q {
                    quote = None;
                }
            },
            None if c.is_whitespace() => {
                if curr.len() > 0 {
                    ans.push(std::mem::take(&mut curr));
                }
            },
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                curr.push(c);
            }
        }
    }
    if curr.len() > 0 {
        ans.push(curr);
    }
    ans
}

/// Number of `AR[` lines in a header comment, each is one argument of the program
pub fn argument_count(header: &str) -> usize {
    header.lines().filter(|l| l.trim_start().starts_with("AR[")).count()
}

/// Follow named types to the type they stand for
pub fn resolve_type<'a>(prog: &'a Program, ty: &'a Type) -> Option<&'a Type> {
    let mut curr = ty;
    for _ in 0..MAX_TYPE_DEPTH {
        match &curr.kind {
            TypeKind::Named(name) => curr = &prog.find_type(name)?.ty,
            _ => return Some(curr)
        }
    }
    log::warn!("type {} could not be resolved",ty);
    None
}

fn element_type<'a>(prog: &'a Program, ty: &'a Type) -> Option<&'a Type> {
    match &resolve_type(prog,ty)?.kind {
        TypeKind::Array { element, .. } => Some(element),
        _ => None
    }
}

fn is_array(prog: &Program, ty: &Type) -> bool {
    match resolve_type(prog,ty) {
        Some(t) => matches!(t.kind,TypeKind::Array{..}),
        None => false
    }
}

fn path_item(prog: &Program, name: &str, ty: &Type, kind: lsp::CompletionItemKind) -> lsp::CompletionItem {
    let (insert_text,format) = match is_array(prog,ty) {
        true => (format!("{}[${{1:index}}]",name),lsp::InsertTextFormat::SNIPPET),
        false => (name.to_string(),lsp::InsertTextFormat::PLAIN_TEXT)
    };
    lsp::CompletionItem {
        label: name.to_string(),
        kind: Some(kind),
        detail: Some(ty.to_string()),
        insert_text: Some(insert_text),
        insert_text_format: Some(format),
        ..Default::default()
    }
}

pub struct CompletionProvider {
    config: Settings,
    snippets: Arc<SnippetTable>,
    line_number: Regex,
    program_name: Regex,
    field_path: Regex,
    subscript: Regex
}

impl CompletionProvider {
    pub fn new(snippets: Arc<SnippetTable>) -> Self {
        Self {
            config: Settings::new(),
            snippets,
            line_number: Regex::new(r"^\s*\d+:").expect(RCH),
            program_name: Regex::new(r"^\w*$").expect(RCH),
            field_path: Regex::new(r"^(\w+)\]([\w\[\],.]*)$").expect(RCH),
            subscript: Regex::new(r"\[[^\]]*\]$").expect(RCH)
        }
    }
    pub fn set_config(&mut self, config: Settings) {
        self.config = config;
    }
    /// Every known program, with a snippet that has one placeholder per documented argument
    fn calls(&self, ws: &Workspace, tokens: &[String]) -> Vec<lsp::CompletionItem> {
        match tokens.last() {
            Some(tok) if tok.eq_ignore_ascii_case("CALL") || tok.eq_ignore_ascii_case("RUN") => {},
            _ => return Vec::new()
        }
        let mut programs = BTreeMap::new();
        for entry in ws.documents() {
            let name = match self.config.completions.lower_case {
                true => entry.bare_name().to_lowercase(),
                false => entry.bare_name().to_uppercase()
            };
            programs.entry(name).or_insert(entry);
        }
        let mut ans = Vec::new();
        for (name,entry) in programs {
            let header = entry.header_comment();
            let args: Vec<String> = (1..=argument_count(&header)).map(|i| format!("${{{}:arg{}}}",i,i)).collect();
            let insert_text = match args.len() {
                0 => name.clone(),
                _ => format!("{}({})",name,args.join(","))
            };
            ans.push(lsp::CompletionItem {
                label: name,
                kind: Some(lsp::CompletionItemKind::MODULE),
                detail: Some(entry.kind.program_type().to_string()),
                documentation: match header.len() {
                    0 => None,
                    _ => Some(lsp::Documentation::String(header))
                },
                insert_text: Some(insert_text),
                insert_text_format: Some(lsp::InsertTextFormat::SNIPPET),
                ..Default::default()
            });
        }
        ans
    }
    /// Names of KAREL programs, used while the program part of `$[PROG]` is typed
    fn program_names(&self, ws: &Workspace) -> Vec<lsp::CompletionItem> {
        ws.documents().iter().filter(|e| e.kind == LanguageKind::Structured).map(|e| {
            lsp::CompletionItem {
                label: e.bare_name().to_uppercase(),
                kind: Some(lsp::CompletionItemKind::MODULE),
                detail: Some(e.kind.program_type().to_string()),
                ..Default::default()
            }
        }).collect()
    }
    /// Walk `segments` through the variables and structure types of `prog`.
    /// The last segment is the one being typed and is not resolved.
    fn fields(&self, prog: &Program, segments: &[&str]) -> Vec<lsp::CompletionItem> {
        if segments.len() < 2 {
            return prog.variables().map(|v| path_item(prog,&v.name,&v.ty,lsp::CompletionItemKind::VARIABLE)).collect();
        }
        let mut ty: Option<&Type> = None;
        for (i,seg) in segments[0..segments.len()-1].iter().enumerate() {
            let name = self.subscript.replace(seg,"").to_string();
            let subscripted = name.len() < seg.len();
            let next = match (i,ty) {
                (0,_) => prog.find_variable(&name).map(|v| &v.ty),
                (_,Some(t)) => match resolve_type(prog,t).map(|r| &r.kind) {
                    Some(TypeKind::Structure(fields)) => fields.iter().find(|f| f.name.eq_ignore_ascii_case(&name)).map(|f| &f.ty),
                    _ => None
                },
                (_,None) => None
            };
            ty = match (next,subscripted) {
                (Some(t),true) => element_type(prog,t),
                (Some(t),false) => Some(t),
                (None,_) => None
            };
            if ty.is_none() {
                log::trace!("path segment {} not resolved",seg);
                return Vec::new();
            }
        }
        match ty.and_then(|t| resolve_type(prog,t)).map(|r| &r.kind) {
            Some(TypeKind::Structure(fields)) => fields.iter().map(|f| path_item(prog,&f.name,&f.ty,lsp::CompletionItemKind::FIELD)).collect(),
            _ => Vec::new()
        }
    }
    /// Variable paths such as `$[PROG]VAR.FIELD`
    fn var_paths(&self, ws: &Workspace, tokens: &[String]) -> Vec<lsp::CompletionItem> {
        let tok = match tokens.last() {
            Some(t) => t,
            None => return Vec::new()
        };
        let remainder = match tok.rfind("$[") {
            Some(i) => &tok[i+2..],
            None => return Vec::new()
        };
        if self.program_name.is_match(remainder) {
            return self.program_names(ws);
        }
        let caps = match self.field_path.captures(remainder) {
            Some(c) => c,
            None => return Vec::new()
        };
        let prog = match ws.find_by_bare_name_of_kind(&caps[1],LanguageKind::Structured).and_then(|e| e.karel()) {
            Some(p) => p,
            None => return Vec::new()
        };
        let segments: Vec<&str> = caps.get(2).map_or("",|m| m.as_str()).split('.').collect();
        self.fields(prog,&segments)
    }
    fn snippets(&self, kind: LanguageKind, tokens: &[String], code: &str) -> Vec<lsp::CompletionItem> {
        match tokens.len() {
            0 => self.snippets.completions(kind,""),
            1 if !code.ends_with(char::is_whitespace) => self.snippets.completions(kind,&tokens[0]),
            _ => Vec::new()
        }
    }
    /// Completions for `line`, which is the current line cut off at the cursor
    pub fn get(&self, ws: &Workspace, kind: LanguageKind, line: &str) -> Vec<lsp::CompletionItem> {
        let code = self.line_number.replace(line,"").to_string();
        let tokens = tokenize(&code);
        let mut ans = self.calls(ws,&tokens);
        ans.append(&mut self.var_paths(ws,&tokens));
        ans.append(&mut self.snippets(kind,&tokens,&code));
        ans
    }
    /// Completions at a position given by the client.  A position past the end of the
    /// text falls back to the tracked edit cursor.
    pub fn complete_at(&self, ws: &Workspace, uri: &lsp::Url, pos: &lsp::Position) -> Result<Vec<lsp::CompletionItem>,Error> {
        let entry = ws.entry(uri)?;
        let pos = ws.char_position(&entry.doc.text,pos);
        match crate::lang::get_line(&entry.doc.text,pos.line as usize) {
            Some(line) => {
                let cut: String = line.chars().take(pos.character as usize).collect();
                Ok(self.get(ws,entry.kind,&cut))
            },
            None => self.complete_at_cursor(ws,uri)
        }
    }
    /// Completions at the position of the last edit of an opened document
    pub fn complete_at_cursor(&self, ws: &Workspace, uri: &lsp::Url) -> Result<Vec<lsp::CompletionItem>,Error> {
        let kind = ws.entry(uri)?.kind;
        match ws.cursor_line(uri)? {
            Some(line) => Ok(self.get(ws,kind,&line)),
            None => Ok(Vec::new())
        }
    }
}
