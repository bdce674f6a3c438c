//! # `tpkarel` main library
//!
//! Language services for FANUC robot programs, intended to back an editor through the
//! Language Server Protocol, or a console through the `tpkarel` CLI.
//!
//! ## Languages
//!
//! * Teach Pendant (TP) programs in ASCII listing form, `.ls` files
//! * KAREL programs, `.kl` files
//!
//! ## Architecture
//!
//! Both grammars are written with `nom` combinators that record the start and end position
//! of every syntax node (`lang::combinators`).  The syntax trees are kept in a
//! `lang::workspace::Workspace`, which holds every document the client opened, along with
//! the sources found on disk, so that a `CALL` in one program can be resolved to another file.
//! The workspace keeps the last tree that parsed, so queries still work while the user is
//! in the middle of typing something invalid.
//!
//! The queries themselves are plain functions over the workspace:
//! * `lang::completions` for call targets, KAREL variable paths and snippets
//! * `lang::hovers` and `lang::definitions` for call targets, labels and KAREL declarations
//! * `lang::symbols` for document outlines
//! * `lang::tp::formatter` for indenting TP listings
//!
//! The language server binary (`server-tpkarel`) wires these to an `lsp-server` connection.

pub mod lang;
pub mod commands;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;
