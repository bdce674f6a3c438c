//! # Hovers
//!
//! Markdown for the token under the cursor, built on the lookup in `definitions`.

use lsp_types as lsp;

use crate::lang::definitions::{resolve,Declared,Resolved};
use crate::lang::karel::ast as kast;
use crate::lang::server::path_in_workspace;
use crate::lang::workspace::Workspace;
use crate::lang::Error;

fn new_section(md: &mut String, text: &str) {
    if md.len() > 0 {
        *md += "\n\n---\n\n";
    }
    *md += text;
}

fn routine_signature(r: &kast::Routine) -> String {
    let params: Vec<String> = r.parameters.iter().map(|p| format!("{}: {}",p.name,p.ty)).collect();
    let mut ans = format!("ROUTINE {}",r.name);
    if params.len() > 0 {
        ans += &format!("({})",params.join("; "));
    }
    if let Some(ty) = &r.return_type {
        ans += &format!(": {}",ty);
    }
    if let Some(prog) = &r.from {
        ans += &format!(" FROM {}",prog);
    }
    ans
}

fn declaration_markdown(decl: &Declared) -> String {
    let code = match decl {
        Declared::Constant(c) => format!("CONST {} = {}",c.name,c.value),
        Declared::Type(t) => format!("TYPE {} = {}",t.name,t.ty),
        Declared::Variable(v) => match &v.storage {
            Some(s) => format!("{} IN {} : {}",v.name,s,v.ty),
            None => format!("{} : {}",v.name,v.ty)
        },
        Declared::Routine(r) => routine_signature(r)
    };
    let mut md = format!("```\n{}\n```",code);
    if let Declared::Type(kast::TypeDeclaration { ty: kast::Type { kind: kast::TypeKind::Structure(fields), .. }, .. }) = decl {
        let lines: Vec<String> = fields.iter().map(|f| format!("* `{}` : {}",f.name,f.ty)).collect();
        new_section(&mut md,&lines.join("\n"));
    }
    md
}

/// Hover for the token at `pos` in an opened document.
/// A token that does not resolve gives `None`.
pub fn hover(ws: &Workspace, uri: &lsp::Url, pos: &lsp::Position) -> Result<Option<lsp::Hover>,Error> {
    let (resolved,rng) = match resolve(ws,uri,pos)? {
        Some(ans) => ans,
        None => return Ok(None)
    };
    let mut md = String::new();
    match resolved {
        Resolved::Program(target) => {
            new_section(&mut md,&format!("**{}** ({})",target.bare_name().to_uppercase(),target.kind.program_type()));
            md += &format!("\n\n`{}`",path_in_workspace(&target.doc.uri,&ws.ws_folders));
            let header = target.header_comment();
            if header.len() > 0 {
                new_section(&mut md,&header.replace("\n","  \n"));
            }
        },
        Resolved::Label(instr,def) => {
            let title = match &def.comment {
                Some(c) => format!("**LBL[{}:{}]**",def.id,c),
                None => format!("**LBL[{}]**",def.id)
            };
            new_section(&mut md,&title);
            md += &format!("\n\ndefined on line {}",instr.line_number);
        },
        Resolved::Declaration(decl) => {
            new_section(&mut md,&declaration_markdown(&decl));
        }
    }
    Ok(Some(lsp::Hover {
        contents: lsp::HoverContents::Markup(lsp::MarkupContent {
            kind: lsp::MarkupKind::Markdown,
            value: md
        }),
        range: Some(rng)
    }))
}
