//! Handle incoming responses to our requests

use lsp_server;
use super::logger;

pub fn handle_response(connection: &lsp_server::Connection, resp: lsp_server::Response, tools: &mut super::Tools) {
    match resp.id.to_string().as_str() {
        "\"tpkarel-pull-config\"" => {
            match super::parse_configuration(resp) {
                Ok(config) => {
                    let roots_changed = config.workspace.tp_root != tools.config.workspace.tp_root
                        || config.workspace.karel_root != tools.config.workspace.karel_root;
                    tools.config = config.clone();
                    tools.completion_provider.set_config(config.clone());
                    tools.formatter.set_config(&config);
                    if roots_changed {
                        logger(&connection,"source roots changed, rescanning");
                        super::rescan(&connection,tools);
                    }
                },
                Err(_) => logger(&connection,"could not parse config")
            }
        },
        "\"tpkarel-reg-config\"" => {
            logger(&connection,"registration response was received");
        }
        s => {
            logger(&connection,&format!("unhandled response: {}",s))
        }
    }
}
