use std::sync::Arc;
use lsp_types as lsp;
use super::completions::{CompletionProvider,tokenize};
use super::snippets::SnippetTable;
use super::workspace::Workspace;
use super::{Document,LanguageKind};

const KAREL_A: &str = "PROGRAM a
TYPE
  t = STRUCTURE
    X : REAL
  ENDSTRUCTURE
VAR
  REC : t
  ARR : ARRAY[3] OF t
BEGIN
END a
";

fn provider() -> CompletionProvider {
    CompletionProvider::new(Arc::new(SnippetTable::new().expect("snippets did not load")))
}

fn fixture(dir: &str, name: &str) -> Document {
    let path = std::env::current_dir().expect("no cwd").join("tests").join(dir).join(name);
    Document::from_file_path(&path).expect("could not read fixture")
}

fn labels(items: &[lsp::CompletionItem]) -> Vec<String> {
    items.iter().map(|i| i.label.clone()).collect()
}

fn karel_workspace() -> Workspace {
    let mut ws = Workspace::new();
    let uri = lsp::Url::parse("file:///ws/karel/a.kl").expect("bad uri");
    ws.add_known(Document::new(uri,KAREL_A.to_string()),LanguageKind::Structured);
    ws
}

mod calls {
    use super::*;
    #[test]
    fn argument_placeholders() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","pick.ls"),LanguageKind::Instruction);
        let items = provider().get(&ws,LanguageKind::Instruction,"  CALL ");
        assert_eq!(items.len(),1);
        assert_eq!(items[0].label,"PICK");
        assert_eq!(items[0].insert_text,Some("PICK(${1:arg1},${2:arg2},${3:arg3})".to_string()));
        assert_eq!(items[0].insert_text_format,Some(lsp::InsertTextFormat::SNIPPET));
    }
    #[test]
    fn no_arguments_no_parens() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","watchdog.ls"),LanguageKind::Instruction);
        let items = provider().get(&ws,LanguageKind::Instruction,"   4:  RUN ");
        assert_eq!(items.len(),1);
        assert_eq!(items[0].insert_text,Some("WATCHDOG".to_string()));
    }
    #[test]
    fn every_program() {
        let mut ws = karel_workspace();
        ws.add_known(fixture("tp","pick.ls"),LanguageKind::Instruction);
        ws.add_known(fixture("tp","watchdog.ls"),LanguageKind::Instruction);
        let items = provider().get(&ws,LanguageKind::Instruction,"   1:  CALL ");
        assert_eq!(labels(&items),vec!["A","PICK","WATCHDOG"]);
        assert_eq!(items[0].detail,Some("KAREL program".to_string()));
    }
    #[test]
    fn lower_case() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","watchdog.ls"),LanguageKind::Instruction);
        let mut provider = provider();
        let mut settings = crate::lang::settings::Settings::new();
        settings.completions.lower_case = true;
        provider.set_config(settings);
        let items = provider.get(&ws,LanguageKind::Instruction,"CALL ");
        assert_eq!(labels(&items),vec!["watchdog"]);
    }
    #[test]
    fn not_after_other_words() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","pick.ls"),LanguageKind::Instruction);
        assert_eq!(provider().get(&ws,LanguageKind::Instruction,"   1:  JMP ").len(),0);
    }
}

mod var_paths {
    use super::*;
    #[test]
    fn structure_fields() {
        let ws = karel_workspace();
        let items = provider().get(&ws,LanguageKind::Instruction,"$[A]REC.");
        assert_eq!(labels(&items),vec!["X"]);
        assert_eq!(items[0].detail,Some("REAL".to_string()));
    }
    #[test]
    fn over_traversal() {
        let ws = karel_workspace();
        assert_eq!(provider().get(&ws,LanguageKind::Instruction,"$[A]REC.X.").len(),0);
    }
    #[test]
    fn top_level_variables() {
        let ws = karel_workspace();
        let items = provider().get(&ws,LanguageKind::Instruction,"   1:  R[1]=$[A]");
        assert_eq!(labels(&items),vec!["REC","ARR"]);
        assert_eq!(items[1].insert_text,Some("ARR[${1:index}]".to_string()));
        assert_eq!(items[1].detail,Some("ARRAY[3] OF t".to_string()));
        let items = provider().get(&ws,LanguageKind::Instruction,"$[a]RE");
        assert_eq!(labels(&items),vec!["REC","ARR"]);
    }
    #[test]
    fn subscripted_segment() {
        let ws = karel_workspace();
        assert_eq!(labels(&provider().get(&ws,LanguageKind::Instruction,"$[A]ARR[2].")),vec!["X"]);
        assert_eq!(provider().get(&ws,LanguageKind::Instruction,"$[A]ARR.").len(),0);
    }
    #[test]
    fn program_names() {
        let mut ws = karel_workspace();
        ws.add_known(fixture("tp","pick.ls"),LanguageKind::Instruction);
        assert_eq!(labels(&provider().get(&ws,LanguageKind::Instruction,"$[")),vec!["A"]);
    }
    #[test]
    fn unknown_program() {
        let ws = karel_workspace();
        assert_eq!(provider().get(&ws,LanguageKind::Instruction,"$[B]REC.").len(),0);
    }
}

mod snippets {
    use super::*;
    #[test]
    fn partial_word() {
        let ws = Workspace::new();
        let items = provider().get(&ws,LanguageKind::Instruction,"   1:  fo");
        assert_eq!(labels(&items),vec!["FOR"]);
        let items = provider().get(&ws,LanguageKind::Structured,"  REP");
        assert_eq!(labels(&items),vec!["REPEAT"]);
    }
    #[test]
    fn empty_line() {
        let ws = Workspace::new();
        let table = SnippetTable::new().expect("snippets did not load");
        let items = provider().get(&ws,LanguageKind::Instruction,"   1:  ");
        assert_eq!(items.len(),table.get(LanguageKind::Instruction).len());
    }
    #[test]
    fn not_after_first_word() {
        let ws = Workspace::new();
        assert_eq!(provider().get(&ws,LanguageKind::Instruction,"   1:  WAIT ").len(),0);
    }
}

mod cursor {
    use super::*;
    #[test]
    fn tracked_cursor() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","pick.ls"),LanguageKind::Instruction);
        let uri = lsp::Url::parse("file:///ws/tp/main.ls").expect("bad uri");
        ws.open(Document::new(uri.clone(),"/PROG  MAIN\n/MN\n   1:  ;\n/END\n".to_string()),LanguageKind::Instruction);
        assert_eq!(provider().complete_at_cursor(&ws,&uri).expect("not open").len(),0);
        let change = lsp::TextDocumentContentChangeEvent {
            range: Some(lsp::Range::new(lsp::Position::new(2,7),lsp::Position::new(2,7))),
            range_length: None,
            text: "CALL ".to_string()
        };
        ws.apply_edit(&uri,&[change]).expect("edit failed");
        let items = provider().complete_at_cursor(&ws,&uri).expect("not open");
        assert_eq!(labels(&items),vec!["MAIN","PICK"]);
    }
    #[test]
    fn client_position() {
        let mut ws = Workspace::new();
        ws.add_known(fixture("tp","watchdog.ls"),LanguageKind::Instruction);
        let uri = lsp::Url::parse("file:///ws/tp/main.ls").expect("bad uri");
        ws.open(Document::new(uri.clone(),"/PROG  MAIN\n/MN\n   1:  RUN WATCHDOG ;\n/END\n".to_string()),LanguageKind::Instruction);
        let items = provider().complete_at(&ws,&uri,&lsp::Position::new(2,11)).expect("not open");
        assert_eq!(labels(&items),vec!["MAIN","WATCHDOG"]);
        // past the end with no edits yet
        assert_eq!(provider().complete_at(&ws,&uri,&lsp::Position::new(9,0)).expect("not open").len(),0);
    }
    #[test]
    fn unopened() {
        let ws = Workspace::new();
        let uri = lsp::Url::parse("file:///ws/tp/main.ls").expect("bad uri");
        assert!(provider().complete_at_cursor(&ws,&uri).is_err());
    }
    #[test]
    fn quoted_tokens() {
        assert_eq!(tokenize("WRITE 'a b' x"),vec!["WRITE","'a b'","x"]);
        assert_eq!(tokenize("  "),Vec::<String>::new());
    }
}
