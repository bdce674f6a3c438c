//! # Definitions
//!
//! Finds what the token under the cursor refers to.  The hover provider uses the same lookup.
//!
//! In TP, the callee of a `CALL` or `RUN` resolves to the program with that bare name anywhere
//! in the workspace, while a label reference resolves to the `LBL[n]` instruction of the same
//! program.  In KAREL, a word resolves to a declaration of the same program.

use lsp_types as lsp;

use crate::lang::combinators::lsp_range;
use crate::lang::karel::ast as kast;
use crate::lang::tp::ast as tast;
use crate::lang::workspace::{DocumentEntry,Workspace};
use crate::lang::{get_line,range_contains_pos,word_at,Error};

/// Declaration found in a KAREL program
#[derive(Clone,Copy,Debug)]
pub enum Declared<'a> {
    Constant(&'a kast::Constant),
    Type(&'a kast::TypeDeclaration),
    Variable(&'a kast::Variable),
    Routine(&'a kast::Routine)
}

impl<'a> Declared<'a> {
    pub fn name(&self) -> &str {
        match self {
            Self::Constant(c) => &c.name,
            Self::Type(t) => &t.name,
            Self::Variable(v) => &v.name,
            Self::Routine(r) => &r.name
        }
    }
    pub fn range(&self) -> lsp::Range {
        match self {
            Self::Constant(c) => lsp_range(&c.start,&c.end),
            Self::Type(t) => lsp_range(&t.start,&t.end),
            Self::Variable(v) => lsp_range(&v.start,&v.end),
            Self::Routine(r) => lsp_range(&r.name_start,&r.name_end)
        }
    }
}

/// Find a program level declaration, case insensitive
pub fn find_declaration<'a>(prog: &'a kast::Program, name: &str) -> Option<Declared<'a>> {
    if let Some(c) = prog.constants().find(|c| c.name.eq_ignore_ascii_case(name)) {
        return Some(Declared::Constant(c));
    }
    if let Some(t) = prog.find_type(name) {
        return Some(Declared::Type(t));
    }
    if let Some(v) = prog.find_variable(name) {
        return Some(Declared::Variable(v));
    }
    // the last declaration with a body wins over a forward declaration
    let mut routines = prog.routines().filter(|r| r.name.eq_ignore_ascii_case(name)).collect::<Vec<_>>();
    routines.sort_by_key(|r| r.body.is_some());
    routines.pop().map(Declared::Routine)
}

/// What the cursor is on, along with the range of the token under the cursor
pub enum Resolved<'a> {
    /// callee of a CALL or RUN
    Program(&'a DocumentEntry),
    Label(&'a tast::Instruction,&'a tast::LabelDefinition),
    Declaration(Declared<'a>)
}

fn resolve_tp<'a>(ws: &'a Workspace, prog: &'a tast::Program, pos: &lsp::Position) -> Option<(Resolved<'a>,lsp::Range)> {
    let instr = prog.instruction_at_line(pos.line + 1)?;
    if let Some(call) = instr.call() {
        let rng = lsp_range(&call.name_start,&call.name_end);
        if range_contains_pos(&rng,pos) {
            let target = ws.find_by_bare_name(&call.name)?;
            return Some((Resolved::Program(target),rng));
        }
    }
    for lbl in instr.label_references() {
        let rng = lsp_range(&lbl.start,&lbl.end);
        if range_contains_pos(&rng,pos) {
            let (def_instr,def) = prog.find_label(lbl.direct_id()?)?;
            return Some((Resolved::Label(def_instr,def),rng));
        }
    }
    None
}

fn resolve_karel<'a>(entry: &'a DocumentEntry, prog: &'a kast::Program, pos: &lsp::Position) -> Option<(Resolved<'a>,lsp::Range)> {
    let line = get_line(&entry.doc.text,pos.line as usize)?;
    let (word,beg,end) = word_at(line,pos.character as usize)?;
    let decl = find_declaration(prog,&word)?;
    let rng = lsp::Range::new(lsp::Position::new(pos.line,beg as u32),lsp::Position::new(pos.line,end as u32));
    Some((Resolved::Declaration(decl),rng))
}

/// Resolve the token at `pos` in an opened document.  It is an error if the document is not open,
/// while failing to resolve is `None`.
pub fn resolve<'a>(ws: &'a Workspace, uri: &lsp::Url, pos: &lsp::Position) -> Result<Option<(Resolved<'a>,lsp::Range)>,Error> {
    let entry = ws.entry(uri)?;
    let pos = ws.char_position(&entry.doc.text,pos);
    if let Some(prog) = entry.tp() {
        return Ok(resolve_tp(ws,prog,&pos));
    }
    if let Some(prog) = entry.karel() {
        return Ok(resolve_karel(entry,prog,&pos));
    }
    Ok(None)
}

/// Location of the definition of the token at `pos`.
/// A program is located at its start, positions within the target are not tracked.
pub fn definition(ws: &Workspace, uri: &lsp::Url, pos: &lsp::Position) -> Result<Option<lsp::Location>,Error> {
    let ans = match resolve(ws,uri,pos)? {
        Some((Resolved::Program(target),_)) => Some(lsp::Location::new(target.doc.uri.clone(),lsp::Range::default())),
        Some((Resolved::Label(_,def),_)) => Some(lsp::Location::new(uri.clone(),lsp_range(&def.start,&def.end))),
        Some((Resolved::Declaration(decl),_)) => Some(lsp::Location::new(uri.clone(),decl.range())),
        None => None
    };
    Ok(ans)
}
