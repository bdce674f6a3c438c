use super::ast::*;
use super::parser::{parse,parse_expression};
use crate::lang::combinators::Position;

fn fixture(name: &str) -> String {
    let path = std::env::current_dir().expect("no cwd").join("tests").join("karel").join(name);
    std::fs::read_to_string(path).expect("could not read fixture")
}

fn cell_data() -> Program {
    parse(&fixture("cell_data.kl")).expect("fixture does not parse")
}

mod programs {
    use super::*;
    #[test]
    fn header() {
        let prog = cell_data();
        assert_eq!(prog.name,"cell_data");
        assert_eq!(prog.header_comment,"Cell data shared with the TP programs\nHolds the part tracking records");
        assert_eq!(prog.directives.len(),2);
        assert_eq!(prog.directives[0].name,"NOLOCKGROUP");
        assert_eq!(prog.directives[0].value,None);
        assert_eq!(prog.directives[1].value,Some("Cell data".to_string()));
    }
    #[test]
    fn header_after_program_line() {
        let prog = parse("PROGRAM p\n-- first\n-- second\nBEGIN\nEND p\n").expect("parse failed");
        assert_eq!(prog.header_comment,"first\nsecond");
    }
    #[test]
    fn declarations_in_order() {
        let prog = cell_data();
        assert_eq!(prog.declarations.len(),6);
        assert!(matches!(prog.declarations[0].kind,DeclarationKind::Constants(_)));
        assert!(matches!(prog.declarations[1].kind,DeclarationKind::Types(_)));
        assert!(matches!(prog.declarations[2].kind,DeclarationKind::Variables(_)));
        // routine after the main body is still a declaration
        let names: Vec<String> = prog.routines().map(|r| r.name.clone()).collect();
        assert_eq!(names,vec!["clear_tray","slot_free","report"]);
    }
    #[test]
    fn main_body() {
        let prog = cell_data();
        assert_eq!(prog.main.len(),6);
        assert!(matches!(prog.main[1].kind,StatementKind::For{..}));
        assert!(matches!(prog.main[5].kind,StatementKind::Repeat{..}));
        assert_eq!(prog.main[0].line_number,40);
    }
    #[test]
    fn case_insensitive() {
        let prog = parse("program P\nvar n: integer\nbegin\n  n = 1\nend P\n").expect("parse failed");
        assert_eq!(prog.main.len(),1);
        assert_eq!(prog.find_variable("N").map(|v| v.ty.to_string()),Some("INTEGER".to_string()));
    }
    #[test]
    fn syntax_error() {
        let err = parse(&fixture("bad_syntax.kl")).expect_err("should not parse");
        assert_eq!(err.position.line,5);
    }
    #[test]
    fn missing_end() {
        let err = parse("PROGRAM p\nBEGIN\n").expect_err("should not parse");
        assert_eq!(err.message,"unexpected end of input");
    }
}

mod declarations {
    use super::*;
    #[test]
    fn structure_fields() {
        let prog = cell_data();
        let part = prog.find_type("PART_T").expect("type not found");
        match &part.ty.kind {
            TypeKind::Structure(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names,vec!["x","y","id","name"]);
                assert_eq!(fields[1].ty.to_string(),"REAL");
                assert_eq!(fields[3].ty.to_string(),"STRING[16]");
            },
            _ => panic!("expected structure")
        }
    }
    #[test]
    fn array_of_user_type() {
        let prog = cell_data();
        let trays = prog.find_variable("trays").expect("variable not found");
        assert_eq!(trays.ty.to_string(),"ARRAY[4] OF tray_t");
        match &trays.ty.kind {
            TypeKind::Array { element, .. } => assert_eq!(element.kind,TypeKind::Named("tray_t".to_string())),
            _ => panic!("expected array")
        }
    }
    #[test]
    fn variable_positions() {
        let prog = cell_data();
        let rec = prog.find_variable("rec").expect("variable not found");
        assert_eq!(rec.start,Position::new(23,3));
        assert_eq!(rec.end,Position::new(23,15));
    }
    #[test]
    fn storage_and_scalars() {
        let prog = cell_data();
        assert_eq!(prog.find_variable("counter").and_then(|v| v.storage.clone()),Some("CMOS".to_string()));
        let home = prog.find_variable("home").expect("variable not found");
        assert_eq!(home.ty.kind,TypeKind::Scalar(ScalarType::JointPos(Some(1))));
    }
    #[test]
    fn constants() {
        let prog = cell_data();
        let vals: Vec<String> = prog.constants().map(|c| format!("{}={}",c.name,c.value)).collect();
        assert_eq!(vals,vec!["max_slots=10","tray_count=4"]);
    }
    #[test]
    fn routines() {
        let prog = cell_data();
        let routines: Vec<&Routine> = prog.routines().collect();
        assert_eq!(routines[0].from,Some("cell_util".to_string()));
        assert!(routines[0].body.is_none());
        assert_eq!(routines[1].parameters.len(),2);
        assert_eq!(routines[1].return_type.as_ref().map(|t| t.to_string()),Some("BOOLEAN".to_string()));
        assert_eq!(routines[1].declarations.len(),1);
        assert_eq!(routines[1].body.as_ref().map(|b| b.len()),Some(2));
        assert_eq!(routines[1].name_start,Position::new(31,9));
        assert_eq!(routines[1].name_end,Position::new(31,18));
    }
    #[test]
    fn forward_declaration() {
        let src = "PROGRAM p\nROUTINE later(n: INTEGER)\nBEGIN\n  later(1)\nEND p\nROUTINE later(n: INTEGER)\nBEGIN\nEND later\n";
        let prog = parse(src).expect("parse failed");
        let routines: Vec<&Routine> = prog.routines().collect();
        assert_eq!(routines.len(),2);
        assert!(routines[0].body.is_none());
        assert_eq!(routines[1].body.as_ref().map(|b| b.len()),Some(0));
        assert_eq!(prog.main.len(),1);
    }
}

mod statements {
    use super::*;
    #[test]
    fn end_excludes_comment() {
        let prog = cell_data();
        match &prog.main[1].kind {
            StatementKind::For { body, counter, direction, .. } => {
                assert_eq!(counter,"counter");
                assert_eq!(*direction,ForDirection::Up);
                assert_eq!(body[0].start,Position::new(42,5));
                assert_eq!(body[0].end,Position::new(42,29));
            },
            _ => panic!("expected FOR")
        }
    }
    #[test]
    fn write_is_a_call() {
        let prog = cell_data();
        match &prog.main[2].kind {
            StatementKind::If { else_branch, then_branch, .. } => {
                assert_eq!(then_branch.len(),2);
                match &else_branch[0].kind {
                    StatementKind::Call(call) => {
                        assert_eq!(call.name,"WRITE");
                        assert_eq!(call.arguments.len(),3);
                        assert_eq!(call.arguments[0].to_string(),"TPDISPLAY");
                    },
                    _ => panic!("expected call")
                }
            },
            _ => panic!("expected IF")
        }
    }
    #[test]
    fn select_cases() {
        let prog = cell_data();
        match &prog.main[4].kind {
            StatementKind::Select { cases, else_branch, .. } => {
                assert_eq!(cases.len(),2);
                assert_eq!(cases[1].values.len(),2);
                assert!(matches!(cases[1].body[0].kind,StatementKind::Call(_)));
                assert_eq!(else_branch.as_ref().map(|b| b.len()),Some(1));
            },
            _ => panic!("expected SELECT")
        }
    }
    #[test]
    fn labels_and_goto() {
        let prog = parse("PROGRAM p\nBEGIN\n  retry::\n  GOTO retry\n  GO TO retry\nEND p\n").expect("parse failed");
        assert_eq!(prog.main[0].kind,StatementKind::Label("retry".to_string()));
        assert_eq!(prog.main[1].kind,StatementKind::Goto("retry".to_string()));
        assert_eq!(prog.main[2].kind,StatementKind::Goto("retry".to_string()));
    }
}

mod expressions {
    use super::*;
    #[test]
    fn precedence() {
        let expr = parse_expression("a OR b AND c").expect("parse failed");
        match expr.kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(op,BinaryOp::Or);
                assert!(matches!(right.kind,ExpressionKind::Binary { op: BinaryOp::And, .. }));
            },
            _ => panic!("expected binary")
        }
        let expr = parse_expression("1 + 2 * 3").expect("parse failed");
        assert!(matches!(expr.kind,ExpressionKind::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(expr.to_string(),"1 + 2 * 3");
    }
    #[test]
    fn not_binds_to_operand() {
        let expr = parse_expression("NOT a = b").expect("parse failed");
        match expr.kind {
            ExpressionKind::Binary { op: BinaryOp::Equal, left, .. } => {
                assert!(matches!(left.kind,ExpressionKind::Unary { op: UnaryOp::Not, .. }));
            },
            _ => panic!("expected comparison")
        }
    }
    #[test]
    fn field_paths() {
        let expr = parse_expression("trays[1].slots[2].id").expect("parse failed");
        assert_eq!(expr.to_string(),"trays[1].slots[2].id");
        assert_eq!(expr.end,Position::new(1,21));
        let expr = parse_expression("[cell_data]rec.x").expect("parse failed");
        match expr.kind {
            ExpressionKind::Field { base, name } => {
                assert_eq!(name,"x");
                assert_eq!(base.kind,ExpressionKind::ProgramVariable { program: "cell_data".to_string(), name: "rec".to_string() });
            },
            _ => panic!("expected field")
        }
    }
    #[test]
    fn literals() {
        assert_eq!(parse_expression("1.5e3").expect("parse failed").kind,ExpressionKind::Number("1.5e3".to_string()));
        assert_eq!(parse_expression("'hi'").expect("parse failed").kind,ExpressionKind::String("hi".to_string()));
        assert_eq!(parse_expression("on").expect("parse failed").kind,ExpressionKind::Boolean(true));
        assert_eq!(parse_expression("$SPEED").expect("parse failed").kind,ExpressionKind::SystemVariable("$SPEED".to_string()));
    }
    #[test]
    fn relational_binds_loosest() {
        let expr = parse_expression("a = b OR c").expect("parse failed");
        match expr.kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(op,BinaryOp::Equal);
                assert!(matches!(right.kind,ExpressionKind::Binary { op: BinaryOp::Or, .. }));
            },
            _ => panic!("expected comparison")
        }
        let expr = parse_expression("a + b AND c").expect("parse failed");
        match expr.kind {
            ExpressionKind::Binary { op, right, .. } => {
                assert_eq!(op,BinaryOp::Add);
                assert!(matches!(right.kind,ExpressionKind::Binary { op: BinaryOp::And, .. }));
            },
            _ => panic!("expected sum")
        }
        // comparisons joined by a boolean operator need parentheses
        assert!(parse_expression("a > 1 AND b < 2").is_err());
        let expr = parse_expression("(a > 1) AND (b < 2)").expect("parse failed");
        assert!(matches!(expr.kind,ExpressionKind::Binary { op: BinaryOp::And, .. }));
        let err = parse("PROGRAM p\nBEGIN\n  IF a > 1 AND b < 2 THEN\n  ENDIF\nEND p\n").expect_err("should fail");
        assert_eq!(err.position.line,3);
    }
    #[test]
    fn sign_applies_to_term() {
        let expr = parse_expression("-a * b + c").expect("parse failed");
        match expr.kind {
            ExpressionKind::Binary { op: BinaryOp::Add, left, .. } => match left.kind {
                ExpressionKind::Unary { op: UnaryOp::Negate, operand } => {
                    assert!(matches!(operand.kind,ExpressionKind::Binary { op: BinaryOp::Multiply, .. }));
                },
                _ => panic!("expected negation")
            },
            _ => panic!("expected sum")
        }
    }
    #[test]
    fn single_operand_is_not_wrapped() {
        assert_eq!(parse_expression("a").expect("parse failed").kind,ExpressionKind::Identifier("a".to_string()));
        match parse_expression("(a)").expect("parse failed").kind {
            ExpressionKind::Parenthesized(inner) => {
                assert_eq!(inner.kind,ExpressionKind::Identifier("a".to_string()));
            },
            k => panic!("expected parenthesized, got {:?}",k)
        }
        match parse_expression("a AND b").expect("parse failed").kind {
            ExpressionKind::Binary { op, left, right } => {
                assert_eq!(op,BinaryOp::And);
                assert_eq!(left.kind,ExpressionKind::Identifier("a".to_string()));
                assert_eq!(right.kind,ExpressionKind::Identifier("b".to_string()));
            },
            k => panic!("expected one AND, got {:?}",k)
        }
    }
    #[test]
    fn dangling_operator() {
        assert!(parse_expression("a +").is_err());
    }
}
