//! Handle incoming notifications

use lsp_types as lsp;
use lsp::{notification::Notification, NumberOrString};
use lsp_server;
use serde_json;
use std::str::FromStr;
use tpkarel::lang::{normalize_client_uri,Document,LanguageKind};

use super::{logger,push_diagnostics,push_parse_status};

pub fn handle_notification(
    connection: &lsp_server::Connection,
    note: lsp_server::Notification,
    tools: &mut super::Tools) {

    match note.method.as_str() {
        lsp::notification::DidChangeConfiguration::METHOD => {
            match super::request_configuration(&connection) {
                Ok(()) => {},
                Err(_) => logger(&connection,"request for configuration failed")
            }
        },
        lsp::notification::DidOpenTextDocument::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::DidOpenTextDocumentParams>(note.params) {
                let normalized_uri = normalize_client_uri(params.text_document.uri);
                let kind = match LanguageKind::from_str(&params.text_document.language_id) {
                    Ok(k) => Some(k),
                    Err(_) => LanguageKind::from_uri(&normalized_uri)
                };
                let kind = match kind {
                    Some(k) => k,
                    None => {
                        logger(&connection,&format!("no language for {}",normalized_uri.as_str()));
                        return;
                    }
                };
                let doc = Document {
                    uri: normalized_uri.clone(),
                    version: Some(params.text_document.version),
                    text: params.text_document.text
                };
                let status = tools.workspace.open(doc,kind);
                push_parse_status(&connection,tools,&normalized_uri,&status);
            }
        },
        lsp::notification::DidCloseTextDocument::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::DidCloseTextDocumentParams>(note.params) {
                let normalized_uri = normalize_client_uri(params.text_document.uri);
                tools.workspace.close(&normalized_uri);
                push_diagnostics(&connection,normalized_uri,None,Vec::new());
            }
        },
        lsp::notification::DidChangeTextDocument::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::DidChangeTextDocumentParams>(note.params) {
                let normalized_uri = normalize_client_uri(params.text_document.uri);
                if let Err(e) = tools.workspace.apply_edit(&normalized_uri,&params.content_changes) {
                    logger(&connection,&format!("could not apply changes: {}",e));
                    return;
                }
                tools.workspace.set_version(&normalized_uri,params.text_document.version);
                match tools.workspace.reparse(&normalized_uri) {
                    Ok(status) => push_parse_status(&connection,tools,&normalized_uri,&status),
                    Err(e) => logger(&connection,&format!("could not parse: {}",e))
                }
            }
        },
        lsp::notification::Cancel::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::CancelParams>(note.params) {
                let id = match params.id {
                    NumberOrString::Number(id) => lsp_server::RequestId::from(id),
                    NumberOrString::String(s) => lsp_server::RequestId::from(s)
                };
                // requests are answered in order, so there is nothing left to cancel
                logger(&connection,&format!("request {} was canceled",id.to_string()));
            }
        },
        lsp::notification::SetTrace::METHOD => {
            if let Ok(_params) = serde_json::from_value::<lsp::SetTraceParams>(note.params) {
                logger(&connection,"ignoring the SetTrace notification");
            }
        }
        lsp::notification::DidChangeWatchedFiles::METHOD => {
            if let Ok(_params) = serde_json::from_value::<lsp::DidChangeWatchedFilesParams>(note.params) {
                logger(&connection,"ignoring the DidChangeWatchedFiles notification");
            }
        }
        which_method => {
            logger(&connection,&format!("unhandled notification {}",which_method))
        }
    }
}
