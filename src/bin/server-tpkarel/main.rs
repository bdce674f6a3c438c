//! This is the TP and KAREL language server.
//! Cargo will compile this to a standalone executable.
//!
//! The tpkarel library crate provides the analysis.
//! Requests are handled one at a time on the main thread, the workspace is mutated in place.

use lsp_types as lsp;
use lsp::{notification::Notification, request::Request};
use lsp_server;
use serde_json;
use std::error::Error;
use std::sync::Arc;
use tpkarel::lang::completions::CompletionProvider;
use tpkarel::lang::settings::{self,Settings};
use tpkarel::lang::snippets::SnippetTable;
use tpkarel::lang::tp::formatter::Formatter;
use tpkarel::lang::workspace::{ParseStatus,PositionEncoding,Workspace};

mod notification;
mod request;
mod response;

#[derive(thiserror::Error,Debug)]
enum ServerError {
    #[error("Parsing")]
    Parsing
}

/// Send log messages to the client.
fn logger(connection: &lsp_server::Connection, message: &str) {
    let note = lsp_server::Notification::new(
        lsp::notification::LogMessage::METHOD.to_string(),
        lsp::LogMessageParams {
            typ: lsp::MessageType::LOG,
            message: message.to_string()
        }
    );
    match connection.sender.send(lsp_server::Message::Notification(note)) {
        Err(_) => {}, // nowhere to send log, what can we do about it?
        Ok(()) => {}
    }
}

/// request the root configuration item
fn request_configuration(connection: &lsp_server::Connection) -> Result<(),Box<dyn Error>> {
    let req = lsp_server::Request::new(
        lsp_server::RequestId::from("tpkarel-pull-config".to_string()),
        lsp::request::WorkspaceConfiguration::METHOD.to_string(),
        lsp::ConfigurationParams { items: vec![
            lsp::ConfigurationItem {
                scope_uri: None,
                section: Some("tpkarel".to_string())
            }
        ]}
    );
    match connection.sender.send(req.into()) {
        Ok(()) => Ok(()),
        Err(e) => Err(Box::new(e))
    }
}

/// parse the response to the configuration request
fn parse_configuration(resp: lsp_server::Response) -> Result<Settings,Box<dyn Error>> {
    if let Some(result) = resp.result {
        if let Some(ary) = result.as_array() {
            // we only requested 1 item
            if let Some(item) = ary.first() {
                return settings::parse(&item.to_string());
            }
        }
    }
    Err(Box::new(ServerError::Parsing))
}

/// Diagnostics are never requested by the client.
/// This server pushes them up after every parse, which in turn is triggered by document changes.
fn push_diagnostics(connection: &lsp_server::Connection, uri: lsp::Url, version: Option<i32>, diagnostics: Vec<lsp::Diagnostic>) {
    let note = lsp_server::Notification::new(
        lsp::notification::PublishDiagnostics::METHOD.to_string(),
        lsp::PublishDiagnosticsParams {
            uri,
            diagnostics,
            version
        }
    );
    match connection.sender.send(lsp_server::Message::Notification(note)) {
        Err(_) => logger(connection,"could not push diagnostics"),
        Ok(()) => {}
    }
}

/// Push the diagnostics that go with a parse of an opened document
fn push_parse_status(connection: &lsp_server::Connection, tools: &Tools, uri: &lsp::Url, status: &ParseStatus) {
    if let Ok(entry) = tools.workspace.entry(uri) {
        let diags = tpkarel::lang::server::status_diags(status,&entry.doc.text);
        if let ParseStatus::Failed(e) = status {
            logger(connection,&format!("{} did not parse: {}",uri.as_str(),e));
        }
        push_diagnostics(connection,uri.clone(),entry.doc.version,diags);
    }
}

/// Rebuild the index of sources on disk, opened documents are untouched
fn rescan(connection: &lsp_server::Connection, tools: &mut Tools) {
    let folders = tools.workspace.ws_folders.clone();
    match tools.workspace.scan(&folders,&tools.config) {
        Ok(()) => logger(connection,&format!("scanned {} workspace folders",folders.len())),
        Err(e) => logger(connection,&format!("workspace scan failed: {}",e))
    }
}

struct Tools {
    config: Settings,
    workspace: Workspace,
    completion_provider: CompletionProvider,
    formatter: Formatter
}

impl Tools {
    pub fn new(snippets: Arc<SnippetTable>) -> Self {
        Self {
            config: Settings::new(),
            workspace: Workspace::new(),
            completion_provider: CompletionProvider::new(snippets),
            formatter: Formatter::new()
        }
    }
}

fn main() -> Result<(), Box<dyn Error + Sync + Send>> {

    tpkarel::lang::server::parse_args().map_err(|e| e.to_string())?;
    let snippets = Arc::new(SnippetTable::new().map_err(|e| e.to_string())?);
    let mut tools = Tools::new(snippets);
    let (connection, io_threads) = lsp_server::Connection::stdio();

    logger(&connection,"start initializing connection");
    let (id,params) = connection.initialize_start()?;
    let params: lsp::InitializeParams = serde_json::from_value(params)?;

    // count characters in chars when the client allows it, otherwise in UTF-16 units
    let utf32 = match params.capabilities.general.as_ref().and_then(|g| g.position_encodings.as_ref()) {
        Some(offered) => offered.contains(&lsp::PositionEncodingKind::UTF32),
        None => false
    };
    let position_encoding = match utf32 {
        true => {
            tools.workspace.encoding = PositionEncoding::Utf32;
            lsp::PositionEncodingKind::UTF32
        },
        false => lsp::PositionEncodingKind::UTF16
    };

    let result = lsp::InitializeResult {
        capabilities: lsp::ServerCapabilities {
            position_encoding: Some(position_encoding),
            text_document_sync: Some(lsp::TextDocumentSyncCapability::Options(
                lsp::TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(lsp::TextDocumentSyncKind::INCREMENTAL),
                    will_save: None,
                    will_save_wait_until: None,
                    save: None
                }
            )),
            definition_provider: Some(lsp::OneOf::Left(true)),
            hover_provider: Some(lsp::HoverProviderCapability::Simple(true)),
            completion_provider: Some(lsp::CompletionOptions {
                resolve_provider: Some(false),
                trigger_characters: Some([" ","$","[","]","."].iter().map(|trig| trig.to_string()).collect()),
                ..lsp::CompletionOptions::default()
            }),
            document_symbol_provider: Some(lsp::OneOf::Left(true)),
            document_formatting_provider: Some(lsp::OneOf::Left(true)),
            execute_command_provider: Some(lsp::ExecuteCommandOptions {
                commands: vec!["tpkarel.rescan".to_string(),"tpkarel.reparse".to_string()],
                ..lsp::ExecuteCommandOptions::default()
            }),
            ..lsp::ServerCapabilities::default()
        },
        server_info: Some(lsp::ServerInfo {
            name: "tpkarel".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string())
        })
    };
    connection.initialize_finish(id, serde_json::to_value(result)?)?;
    logger(&connection,"connection initialized");

    // registrations
    let mut registrations: Vec<lsp::Registration> = Vec::new();
    if let Some(workspace) = params.capabilities.workspace {
        if let Some(true) = workspace.configuration {
            registrations.push(lsp::Registration {
                id: "pull-config".to_string(),
                method: lsp::notification::DidChangeConfiguration::METHOD.to_string(),
                register_options: None
            });
        }
    }
    let req = lsp_server::Request::new(
        lsp_server::RequestId::from("tpkarel-reg-config".to_string()),
        lsp::request::RegisterCapability::METHOD.to_string(),
        lsp::RegistrationParams { registrations });
    if let Err(_) = connection.sender.send(req.into()) {
        logger(&connection,"Could not register change configuration capability");
    }

    // Starting configuration
    match request_configuration(&connection) {
        Ok(()) => {},
        Err(_) => logger(&connection,"could not request starting configuration")
    }

    // Initial workspace scan, the roots are scanned again if the configuration changes them
    if let Some(folders) = params.workspace_folders {
        tools.workspace.ws_folders = folders.iter().map(|f| tpkarel::lang::normalize_client_uri(f.uri.clone())).collect();
        rescan(&connection,&mut tools);
    }

    // Main loop
    while let Ok(msg) = connection.receiver.recv() {
        match msg {
            lsp_server::Message::Notification(note) => {
                notification::handle_notification(&connection,note,&mut tools);
            }
            lsp_server::Message::Request(req) => {
                if request::handle_request(&connection, req, &mut tools) {
                    break;
                }
            },
            lsp_server::Message::Response(resp) => {
                response::handle_response(&connection, resp, &mut tools);
            }
        }
    }

    io_threads.join()?;
    Ok(())
}
