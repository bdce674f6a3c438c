//! Provide our response to incoming requests

use lsp_types as lsp;
use lsp::request::Request;
use lsp_server::{Connection,RequestId,Response};
use serde_json;
use tpkarel::lang::{definitions,hovers,symbols,normalize_client_uri,normalize_client_uri_str,LanguageKind};
use tpkarel::lang::server::query_response;
use tpkarel::lang::server::rpc_error::{INVALID_PARAMS,PARSE_ERROR};
use super::logger;

fn def_response(req_id: RequestId, meth: &str) -> lsp_server::Response {
    let mess = req_id.to_string();
    lsp_server::Response::new_err(req_id,PARSE_ERROR,format!("request {} ({}) not understood",mess,meth))
}

/// returns true if there was a shutdown request
pub fn handle_request(
    connection: &Connection,
    req: lsp_server::Request,
    tools: &mut super::Tools) -> bool {

    let mut resp = def_response(req.id.clone(),&req.method);

    match req.method.as_str() {
        lsp::request::Shutdown::METHOD => {
            logger(&connection,"shutdown request");
            resp = lsp_server::Response::new_ok(req.id.clone(), ());
            if let Err(_) = connection.sender.send(resp.into()) {
                logger(&connection,"failed to respond to shutdown request");
            }
            let _ = connection.receiver.recv_timeout(std::time::Duration::from_secs(30));
            return true;
        },

        lsp::request::Completion::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::CompletionParams>(req.params) {
                let normalized_uri = normalize_client_uri(params.text_document_position.text_document.uri);
                let pos = params.text_document_position.position;
                let items = tools.completion_provider.complete_at(&tools.workspace,&normalized_uri,&pos);
                resp = query_response(req.id,items.map(|lst| lsp::CompletionResponse::Array(lst)));
            }
        },

        lsp::request::HoverRequest::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::HoverParams>(req.params) {
                let normalized_uri = normalize_client_uri(params.text_document_position_params.text_document.uri);
                let pos = params.text_document_position_params.position;
                resp = query_response(req.id,hovers::hover(&tools.workspace,&normalized_uri,&pos));
            }
        },

        lsp::request::GotoDefinition::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::GotoDefinitionParams>(req.params) {
                let normalized_uri = normalize_client_uri(params.text_document_position_params.text_document.uri);
                let pos = params.text_document_position_params.position;
                let loc = definitions::definition(&tools.workspace,&normalized_uri,&pos);
                resp = query_response(req.id,loc.map(|maybe| maybe.map(|l| lsp::GotoDefinitionResponse::Scalar(l))));
            }
        },

        lsp::request::DocumentSymbolRequest::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::DocumentSymbolParams>(req.params) {
                let normalized_uri = normalize_client_uri(params.text_document.uri);
                let syms = tools.workspace.entry(&normalized_uri).map(|entry| match &entry.program {
                    Some(prog) => symbols::document_symbols(prog),
                    None => Vec::new()
                });
                resp = query_response(req.id,syms);
            }
        },

        lsp::request::Formatting::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::DocumentFormattingParams>(req.params) {
                let normalized_uri = normalize_client_uri(params.text_document.uri);
                let edits = tools.workspace.entry(&normalized_uri).map(|entry| match entry.kind {
                    LanguageKind::Instruction => tools.formatter.format_edits(&entry.doc.text,&params.options),
                    LanguageKind::Structured => Vec::new()
                });
                resp = query_response(req.id,edits);
            }
        },

        lsp::request::ExecuteCommand::METHOD => {
            if let Ok(params) = serde_json::from_value::<lsp::ExecuteCommandParams>(req.params) {
                match params.command.as_str() {
                    "tpkarel.rescan" => {
                        super::rescan(&connection,tools);
                        resp = Response::new_ok(req.id,serde_json::Value::Null);
                    },
                    "tpkarel.reparse" => {
                        let maybe_uri = match params.arguments.first() {
                            Some(arg) => serde_json::from_value::<String>(arg.clone()).ok(),
                            None => None
                        };
                        resp = match maybe_uri.map(|s| normalize_client_uri_str(&s)) {
                            Some(Ok(uri)) => match tools.workspace.reparse(&uri) {
                                Ok(status) => {
                                    super::push_parse_status(&connection,tools,&uri,&status);
                                    Response::new_ok(req.id,serde_json::Value::Null)
                                },
                                Err(e) => Response::new_err(req.id,INVALID_PARAMS,e.to_string())
                            },
                            _ => Response::new_err(req.id,INVALID_PARAMS,"expected a document URI".to_string())
                        };
                    },
                    _ => {
                        logger(&connection,&format!("unhandled command {}",params.command));
                    }
                }
            }
        },
        _ => {
            logger(&connection,&format!("unhandled request: {}",req.method))
        }
    }
    if let Err(_) = connection.sender.send(lsp_server::Message::Response(resp)) {
        logger(&connection,&format!("could not send response to {}",req.method));
    }
    false
}
