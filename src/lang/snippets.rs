//! # Builtin snippets
//!
//! Each language has a JSON table compiled into the crate, mapping a qualified identifier
//! to `{prefix, body, description}`, where `body` and `description` are arrays of lines.
//! The tables are loaded once when the server starts, and are never modified.

use std::collections::BTreeMap;
use lsp_types as lsp;
use crate::lang::{LanguageKind,update_json_string,update_json_vec_str};
use crate::DYNERR;

const TP_JSON: &str = include_str!("tp/snippets.json");
const KAREL_JSON: &str = include_str!("karel/snippets.json");

#[derive(Clone,Debug,PartialEq)]
pub struct Snippet {
    pub prefix: String,
    pub body: Vec<String>,
    pub description: Vec<String>
}

fn build(json: &str) -> Result<BTreeMap<String,Snippet>,DYNERR> {
    let mut ans = BTreeMap::new();
    let root = serde_json::from_str::<serde_json::Value>(json)?;
    if let Some(obj) = root.as_object() {
        for (key,info) in obj {
            let mut snip = Snippet {
                prefix: String::new(),
                body: Vec::new(),
                description: Vec::new()
            };
            update_json_string(info,"prefix",&mut snip.prefix);
            update_json_vec_str(info,"body",&mut snip.body);
            update_json_vec_str(info,"description",&mut snip.description);
            if snip.prefix.len() == 0 || snip.body.len() == 0 {
                log::warn!("snippet {} is incomplete",key);
                continue;
            }
            ans.insert(key.to_string(),snip);
        }
    }
    Ok(ans)
}

pub struct SnippetTable {
    tp: BTreeMap<String,Snippet>,
    karel: BTreeMap<String,Snippet>
}

impl SnippetTable {
    pub fn new() -> Result<Self,DYNERR> {
        Ok(Self {
            tp: build(TP_JSON)?,
            karel: build(KAREL_JSON)?
        })
    }
    pub fn get(&self, kind: LanguageKind) -> &BTreeMap<String,Snippet> {
        match kind {
            LanguageKind::Instruction => &self.tp,
            LanguageKind::Structured => &self.karel
        }
    }
    /// Completion items for the snippets whose prefix starts with `partial`, case insensitive
    pub fn completions(&self, kind: LanguageKind, partial: &str) -> Vec<lsp::CompletionItem> {
        let partial = partial.to_uppercase();
        let mut ans = Vec::new();
        for snip in self.get(kind).values() {
            if !snip.prefix.to_uppercase().starts_with(&partial) {
                continue;
            }
            ans.push(lsp::CompletionItem {
                label: snip.prefix.clone(),
                kind: Some(lsp::CompletionItemKind::SNIPPET),
                detail: snip.description.first().cloned(),
                documentation: match snip.description.len() {
                    0 | 1 => None,
                    _ => Some(lsp::Documentation::String(snip.description[1..].join("\n")))
                },
                insert_text: Some(snip.body.join("\n")),
                insert_text_format: Some(lsp::InsertTextFormat::SNIPPET),
                ..Default::default()
            });
        }
        ans
    }
}
