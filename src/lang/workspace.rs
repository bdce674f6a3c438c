//! # Workspace module
//!
//! Holds every document the server knows about, along with its last good syntax tree.
//! There are two sets of documents: the ones the client has opened, keyed by URI, and the
//! ones discovered by scanning the workspace folders.  An opened document shadows a scanned
//! document with the same URI.  Both sets are indexed by bare name (file name without extension,
//! case insensitive), which is how TP and KAREL programs refer to each other.
//!
//! A failed parse never discards a syntax tree, so queries keep working while the user types.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use lsp_types as lsp;

use crate::lang::combinators::SyntaxError;
use crate::lang::settings::Settings;
use crate::lang::{tp,karel,Document,LanguageKind,Error};
use crate::{DYNERR,STDRESULT};

/// Syntax tree of either language, shared so that queries can hold on to it across edits
#[derive(Clone,Debug)]
pub enum ParsedProgram {
    Tp(Arc<tp::ast::Program>),
    Karel(Arc<karel::ast::Program>)
}

impl ParsedProgram {
    pub fn tp(&self) -> Option<&tp::ast::Program> {
        match self {
            Self::Tp(p) => Some(p),
            Self::Karel(_) => None
        }
    }
    pub fn karel(&self) -> Option<&karel::ast::Program> {
        match self {
            Self::Tp(_) => None,
            Self::Karel(p) => Some(p)
        }
    }
    pub fn name(&self) -> &str {
        match self {
            Self::Tp(p) => &p.name,
            Self::Karel(p) => &p.name
        }
    }
    pub fn header_comment(&self) -> &str {
        match self {
            Self::Tp(p) => &p.header_comment,
            Self::Karel(p) => &p.header_comment
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum ParseStatus {
    Parsed,
    Failed(SyntaxError)
}

/// Run the grammar for the given language
pub fn parse_program(kind: LanguageKind, text: &str) -> Result<ParsedProgram,SyntaxError> {
    match kind {
        LanguageKind::Instruction => Ok(ParsedProgram::Tp(Arc::new(tp::parse(text)?))),
        LanguageKind::Structured => Ok(ParsedProgram::Karel(Arc::new(karel::parse(text)?)))
    }
}

#[derive(Clone,Debug)]
pub struct DocumentEntry {
    pub doc: Document,
    pub kind: LanguageKind,
    /// last successfully parsed program
    pub program: Option<ParsedProgram>,
    /// position just after the most recent edit
    pub cursor: Option<lsp::Position>
}

impl DocumentEntry {
    fn new(doc: Document, kind: LanguageKind) -> Self {
        Self {
            doc,
            kind,
            program: None,
            cursor: None
        }
    }
    /// Parse the current text, the stored program is replaced only on success
    fn parse(&mut self) -> ParseStatus {
        match parse_program(self.kind,&self.doc.text) {
            Ok(prog) => {
                self.program = Some(prog);
                ParseStatus::Parsed
            },
            Err(e) => {
                log::debug!("{}: {}",self.doc.uri.as_str(),e);
                ParseStatus::Failed(e)
            }
        }
    }
    pub fn bare_name(&self) -> String {
        self.doc.bare_name()
    }
    pub fn tp(&self) -> Option<&tp::ast::Program> {
        self.program.as_ref().and_then(|p| p.tp())
    }
    pub fn karel(&self) -> Option<&karel::ast::Program> {
        self.program.as_ref().and_then(|p| p.karel())
    }
    pub fn header_comment(&self) -> String {
        match &self.program {
            Some(p) => p.header_comment().to_string(),
            None => String::new()
        }
    }
}

/// Unit the client counts a position's character in.  LSP clients use UTF-16 unless
/// the server agrees to something else during initialization.
#[derive(Clone,Copy,PartialEq,Debug)]
pub enum PositionEncoding {
    Utf16,
    Utf32
}

impl PositionEncoding {
    fn units(&self, c: char) -> usize {
        match self {
            Self::Utf16 => c.len_utf16(),
            Self::Utf32 => 1
        }
    }
    fn count(&self, s: &str) -> usize {
        s.chars().map(|c| self.units(c)).sum()
    }
    /// Byte index of a character offset within `code`, clamped to the end of `code`.
    /// An offset that falls inside a surrogate pair moves past the pair.
    fn byte_index(&self, code: &str, character: u32) -> usize {
        let mut units = 0;
        for (i,c) in code.char_indices() {
            if units >= character as usize {
                return i;
            }
            units += self.units(c);
        }
        code.len()
    }
}

/// Byte offset of an LSP position.  The character is clamped to the line,
/// a line past the end of the text gives `None`.
fn offset_of(text: &str, pos: &lsp::Position, enc: PositionEncoding) -> Option<usize> {
    let mut offset = 0;
    for (row,line) in text.split('\n').enumerate() {
        if row == pos.line as usize {
            let code = line.trim_end_matches('\r');
            return Some(offset + enc.byte_index(code,pos.character));
        }
        offset += line.len() + 1;
    }
    None
}

/// Position immediately after `inserted` when it is placed at `start`
fn advance(start: &lsp::Position, inserted: &str, enc: PositionEncoding) -> lsp::Position {
    match inserted.rfind('\n') {
        Some(i) => lsp::Position::new(
            start.line + inserted.matches('\n').count() as u32,
            enc.count(&inserted[i+1..]) as u32
        ),
        None => lsp::Position::new(start.line,start.character + enc.count(inserted) as u32)
    }
}

/// Position at the end of the text, in UTF-16 units
pub fn end_of_text(text: &str) -> lsp::Position {
    advance(&lsp::Position::new(0,0),text,PositionEncoding::Utf16)
}

pub struct Workspace {
    pub ws_folders: Vec<lsp::Url>,
    /// how incoming positions count characters
    pub encoding: PositionEncoding,
    opened: HashMap<String,DocumentEntry>,
    known: HashMap<String,DocumentEntry>,
    /// lower case bare name to URIs
    names: HashMap<String,Vec<String>>
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            ws_folders: Vec::new(),
            encoding: PositionEncoding::Utf16,
            opened: HashMap::new(),
            known: HashMap::new(),
            names: HashMap::new()
        }
    }
    fn index(&mut self, uri: &lsp::Url) {
        let key = crate::lang::bare_name(uri).to_lowercase();
        let uris = self.names.entry(key).or_insert(Vec::new());
        if !uris.contains(&uri.to_string()) {
            uris.push(uri.to_string());
        }
    }
    fn unindex(&mut self, uri: &lsp::Url) {
        let key = crate::lang::bare_name(uri).to_lowercase();
        if let Some(uris) = self.names.get_mut(&key) {
            uris.retain(|u| u != uri.as_str());
            if uris.len() == 0 {
                self.names.remove(&key);
            }
        }
    }
    /// Register an opened document and parse it.
    pub fn open(&mut self, doc: Document, kind: LanguageKind) -> ParseStatus {
        log::debug!("open {} as {}",doc.uri.as_str(),kind);
        let uri = doc.uri.clone();
        let mut entry = DocumentEntry::new(doc,kind);
        let status = entry.parse();
        self.opened.insert(uri.to_string(),entry);
        self.index(&uri);
        status
    }
    /// Remove from the opened set, a scanned copy of the same file remains known
    pub fn close(&mut self, uri: &lsp::Url) {
        if self.opened.remove(uri.as_str()).is_some() && !self.known.contains_key(uri.as_str()) {
            self.unindex(uri);
        }
    }
    /// Add a document that was not opened by the client, such as one found on disk
    pub fn add_known(&mut self, doc: Document, kind: LanguageKind) -> ParseStatus {
        let uri = doc.uri.clone();
        let mut entry = DocumentEntry::new(doc,kind);
        let status = entry.parse();
        self.known.insert(uri.to_string(),entry);
        self.index(&uri);
        status
    }
    /// Apply the changes in order.  A change with a bad range is logged and skipped.
    /// A change without a range replaces the whole text.
    pub fn apply_edit(&mut self, uri: &lsp::Url, changes: &[lsp::TextDocumentContentChangeEvent]) -> STDRESULT {
        let enc = self.encoding;
        let entry = match self.opened.get_mut(uri.as_str()) {
            Some(e) => e,
            None => return Err(Box::new(Error::DocumentNotOpen(uri.to_string())))
        };
        for change in changes {
            let rng = match change.range {
                Some(r) => r,
                None => {
                    entry.doc.text = change.text.clone();
                    entry.cursor = Some(advance(&lsp::Position::new(0,0),&entry.doc.text,enc));
                    continue;
                }
            };
            let (beg,end) = match (offset_of(&entry.doc.text,&rng.start,enc),offset_of(&entry.doc.text,&rng.end,enc)) {
                (Some(b),Some(e)) if b <= e => (b,e),
                _ => {
                    log::warn!("{}: {:?}, change dropped",Error::InvalidRange,rng);
                    continue;
                }
            };
            let line = entry.doc.text.split('\n').nth(rng.start.line as usize).unwrap_or("");
            let code = line.trim_end_matches('\r');
            let start = lsp::Position::new(rng.start.line,enc.count(&code[..enc.byte_index(code,rng.start.character)]) as u32);
            entry.doc.text.replace_range(beg..end,&change.text);
            entry.cursor = Some(advance(&start,&change.text,enc));
        }
        Ok(())
    }
    /// Record the client's version of an opened document
    pub fn set_version(&mut self, uri: &lsp::Url, version: i32) {
        if let Some(entry) = self.opened.get_mut(uri.as_str()) {
            entry.doc.version = Some(version);
        }
    }
    /// Parse the current text of an opened document.  On failure the previous syntax tree is kept.
    pub fn reparse(&mut self, uri: &lsp::Url) -> Result<ParseStatus,DYNERR> {
        match self.opened.get_mut(uri.as_str()) {
            Some(entry) => Ok(entry.parse()),
            None => Err(Box::new(Error::DocumentNotOpen(uri.to_string())))
        }
    }
    /// Opened document, it is an error if the client never opened it
    pub fn entry(&self, uri: &lsp::Url) -> Result<&DocumentEntry,Error> {
        match self.opened.get(uri.as_str()) {
            Some(e) => Ok(e),
            None => Err(Error::DocumentNotOpen(uri.to_string()))
        }
    }
    /// Any document, opened or scanned
    pub fn get(&self, uri: &lsp::Url) -> Option<&DocumentEntry> {
        match self.opened.get(uri.as_str()) {
            Some(e) => Some(e),
            None => self.known.get(uri.as_str())
        }
    }
    /// Every document, an opened document replaces a scanned one with the same URI
    pub fn documents(&self) -> Vec<&DocumentEntry> {
        let mut ans: Vec<&DocumentEntry> = self.opened.values().collect();
        for (uri,entry) in &self.known {
            if !self.opened.contains_key(uri) {
                ans.push(entry);
            }
        }
        ans.sort_by(|a,b| a.doc.uri.as_str().cmp(b.doc.uri.as_str()));
        ans
    }
    /// Case insensitive lookup by bare name, opened documents take precedence
    pub fn find_by_bare_name(&self, name: &str) -> Option<&DocumentEntry> {
        let uris = self.names.get(&name.to_lowercase())?;
        for uri in uris {
            if let Some(entry) = self.opened.get(uri) {
                return Some(entry);
            }
        }
        uris.iter().find_map(|uri| self.known.get(uri))
    }
    /// Same as `find_by_bare_name`, but only documents of the given language
    pub fn find_by_bare_name_of_kind(&self, name: &str, kind: LanguageKind) -> Option<&DocumentEntry> {
        let uris = self.names.get(&name.to_lowercase())?;
        let matches = |e: &&DocumentEntry| e.kind == kind;
        let opened = uris.iter().filter_map(|u| self.opened.get(u)).find(matches);
        opened.or_else(|| uris.iter().filter_map(|u| self.known.get(u)).find(matches))
    }
    /// Text of the line holding the edit cursor, cut off at the cursor
    pub fn cursor_line(&self, uri: &lsp::Url) -> Result<Option<String>,Error> {
        let entry = self.entry(uri)?;
        let pos = match entry.cursor {
            Some(p) => p,
            None => return Ok(None)
        };
        Ok(crate::lang::get_line(&entry.doc.text,pos.line as usize).map(|line| {
            line[..self.encoding.byte_index(line,pos.character)].to_string()
        }))
    }
    /// Convert a client position in `text` to one whose character counts chars,
    /// which is how syntax tree positions are counted.
    pub fn char_position(&self, text: &str, pos: &lsp::Position) -> lsp::Position {
        match crate::lang::get_line(text,pos.line as usize) {
            Some(line) => {
                let code = line.trim_end_matches('\r');
                let chars = code[..self.encoding.byte_index(code,pos.character)].chars().count();
                lsp::Position::new(pos.line,chars as u32)
            },
            None => pos.clone()
        }
    }
    /// Replace the scanned documents with the sources found under the folders.
    /// Each language has its own root under a folder, if the root is missing the folder itself is searched.
    pub fn scan(&mut self, folders: &[lsp::Url], settings: &Settings) -> STDRESULT {
        self.ws_folders = folders.to_vec();
        let stale: Vec<String> = self.known.keys().cloned().collect();
        self.known = HashMap::new();
        for uri in stale {
            if !self.opened.contains_key(&uri) {
                if let Ok(u) = lsp::Url::parse(&uri) {
                    self.unindex(&u);
                }
            }
        }
        for folder in folders {
            let base = match folder.to_file_path() {
                Ok(b) => b,
                Err(_) => return Err(Box::new(Error::PathNotFound))
            };
            log::debug!("scanning {}",folder.as_str());
            for (kind,root) in [
                (LanguageKind::Instruction,&settings.workspace.tp_root),
                (LanguageKind::Structured,&settings.workspace.karel_root)
            ] {
                let dir = match base.join(root).is_dir() {
                    true => base.join(root),
                    false => base.clone()
                };
                self.scan_dir(&dir,kind);
            }
        }
        log::info!("there were {} sources in the workspace",self.known.len());
        Ok(())
    }
    fn scan_dir(&mut self, dir: &Path, kind: LanguageKind) {
        let opt = glob::MatchOptions {
            case_sensitive: false,
            require_literal_leading_dot: false,
            require_literal_separator: false
        };
        let patt = dir.join("**").join(["*.",kind.extension()].concat());
        let globable = match patt.as_os_str().to_str() {
            Some(g) => g,
            None => {
                log::warn!("directory {} could not be globbed",dir.display());
                return;
            }
        };
        if let Ok(paths) = glob::glob_with(globable,opt) {
            for entry in paths.flatten() {
                match Document::from_file_path(&entry) {
                    Ok(doc) => {
                        log::trace!("{}",doc.uri.as_str());
                        self.add_known(doc,kind);
                    },
                    Err(e) => log::warn!("could not read {}: {}",entry.display(),e)
                }
            }
        }
    }
}
