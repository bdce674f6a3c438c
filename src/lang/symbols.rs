//! # Document symbols
//!
//! TP programs report their labels, KAREL programs report their declarations.

use lsp_types as lsp;

use crate::lang::combinators::lsp_range;
use crate::lang::karel::ast as kast;
use crate::lang::tp::ast as tast;
use crate::lang::workspace::ParsedProgram;

#[allow(deprecated)]
fn create_symbol(name: String, detail: Option<String>, kind: lsp::SymbolKind, rng: lsp::Range, children: Option<Vec<lsp::DocumentSymbol>>) -> lsp::DocumentSymbol {
    lsp::DocumentSymbol {
        name,
        detail,
        kind,
        range: rng,
        selection_range: rng,
        tags: None,
        children,
        deprecated: None
    }
}

fn tp_symbols(prog: &tast::Program) -> Vec<lsp::DocumentSymbol> {
    let mut ans = Vec::new();
    for instr in &prog.instructions {
        if let tast::InstructionKind::Label(def) = &instr.kind {
            ans.push(create_symbol(format!("LBL[{}]",def.id),def.comment.clone(),lsp::SymbolKind::KEY,lsp_range(&def.start,&def.end),None));
        }
    }
    ans
}

fn variable_symbol(v: &kast::Variable, kind: lsp::SymbolKind) -> lsp::DocumentSymbol {
    create_symbol(v.name.clone(),Some(v.ty.to_string()),kind,lsp_range(&v.start,&v.end),None)
}

fn declaration_symbols(decls: &[kast::Declaration]) -> Vec<lsp::DocumentSymbol> {
    let mut ans = Vec::new();
    for decl in decls {
        match &decl.kind {
            kast::DeclarationKind::Constants(consts) => {
                for c in consts {
                    ans.push(create_symbol(c.name.clone(),Some(c.value.to_string()),lsp::SymbolKind::CONSTANT,lsp_range(&c.start,&c.end),None));
                }
            },
            kast::DeclarationKind::Types(types) => {
                for t in types {
                    let children = match &t.ty.kind {
                        kast::TypeKind::Structure(fields) => Some(fields.iter().map(|f| {
                            create_symbol(f.name.clone(),Some(f.ty.to_string()),lsp::SymbolKind::FIELD,lsp_range(&f.start,&f.end),None)
                        }).collect()),
                        _ => None
                    };
                    ans.push(create_symbol(t.name.clone(),Some(t.ty.to_string()),lsp::SymbolKind::STRUCT,lsp_range(&t.start,&t.end),children));
                }
            },
            kast::DeclarationKind::Variables(vars) => {
                ans.extend(vars.iter().map(|v| variable_symbol(v,lsp::SymbolKind::VARIABLE)));
            },
            kast::DeclarationKind::Routine(r) => {
                let mut children: Vec<lsp::DocumentSymbol> = r.parameters.iter().map(|p| variable_symbol(p,lsp::SymbolKind::VARIABLE)).collect();
                children.append(&mut declaration_symbols(&r.declarations));
                let detail = match (&r.from,&r.body) {
                    (Some(prog),_) => Some(format!("from {}",prog)),
                    (None,None) => Some("forward".to_string()),
                    (None,Some(_)) => r.return_type.as_ref().map(|t| t.to_string())
                };
                ans.push(create_symbol(r.name.clone(),detail,lsp::SymbolKind::FUNCTION,lsp_range(&decl.start,&decl.end),Some(children)));
            }
        }
    }
    ans
}

pub fn document_symbols(prog: &ParsedProgram) -> Vec<lsp::DocumentSymbol> {
    match prog {
        ParsedProgram::Tp(p) => tp_symbols(p),
        ParsedProgram::Karel(p) => declaration_symbols(&p.declarations)
    }
}
