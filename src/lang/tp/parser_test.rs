use super::ast::*;
use super::parser::{parse,parse_instruction};
use crate::lang::combinators::Position;

fn load(name: &str) -> String {
    let path = std::env::current_dir().expect("no cwd").join("tests").join("tp").join(name);
    std::fs::read_to_string(path).expect("could not read fixture")
}

fn instr(line: &str) -> Instruction {
    parse_instruction(line).expect("parse failed")
}

fn condition(line: &str) -> Expression {
    match instr(line).kind {
        InstructionKind::If(c) => c.condition,
        InstructionKind::IfThen(e) => e,
        k => panic!("not a conditional: {:?}",k)
    }
}

mod programs {
    use super::*;
    #[test]
    fn main_program() {
        let prog = parse(&load("main_prog.ls")).expect("parse failed");
        assert_eq!(prog.name,"MAIN_PROG");
        assert_eq!(prog.sub_type,None);
        assert_eq!(prog.comment,Some("Main cycle".to_string()));
        assert_eq!(prog.header_comment,"Main production cycle\nCalls the pick routine");
        assert_eq!(prog.instructions.len(),20);
        assert_eq!(prog.instructions[0].line_number,22);
        assert_eq!(prog.instructions[19].kind,InstructionKind::End);
    }
    #[test]
    fn macro_with_arguments() {
        let prog = parse(&load("pick.ls")).expect("parse failed");
        assert_eq!(prog.sub_type,Some("Macro".to_string()));
        let ar_lines = prog.header_comment.lines().filter(|l| l.starts_with("AR[")).count();
        assert_eq!(ar_lines,3);
    }
    #[test]
    fn positions_are_ordered() {
        let prog = parse(&load("main_prog.ls")).expect("parse failed");
        assert!(prog.start <= prog.end);
        for i in &prog.instructions {
            assert!(i.start <= i.end);
            assert_eq!(i.start.line,i.line_number);
            for lbl in i.label_references() {
                assert!(lbl.start <= lbl.end);
            }
        }
    }
    #[test]
    fn crlf_endings() {
        let txt = load("watchdog.ls").replace("\n","\r\n");
        let prog = parse(&txt).expect("parse failed");
        assert_eq!(prog.instructions.len(),5);
        assert_eq!(prog.instructions[2].kind,InstructionKind::Message("Watchdog tripped".to_string()));
    }
    #[test]
    fn syntax_error_position() {
        let err = parse(&load("bad_syntax.ls")).expect_err("should fail");
        assert_eq!(err.position,Position::new(4,13));
    }
    #[test]
    fn missing_end() {
        let err = parse("/PROG X\n/MN\n   1:  END ;\n").expect_err("should fail");
        assert_eq!(err.message,"unexpected end of input");
    }
    #[test]
    fn text_after_end() {
        let txt = "/PROG  T\n/ATTR\n/MN\n   1:  END ;\n/POS\n/END\nGARBAGE HERE\n";
        let err = parse(txt).expect_err("should fail");
        assert_eq!(err.position,Position::new(7,1));
        assert!(parse("/PROG  T\n/ATTR\n/MN\n   1:  END ;\n/POS\n/END\n\n\n").is_ok());
    }
}

mod instructions {
    use super::*;
    #[test]
    fn call_name_span() {
        let i = instr("   5:  CALL PICK(1,2,3) ;");
        let call = i.call().expect("not a call");
        assert_eq!(call.name,"PICK");
        assert_eq!(call.name_start,Position::new(1,13));
        assert_eq!(call.name_end,Position::new(1,17));
        assert_eq!(call.arguments.len(),3);
    }
    #[test]
    fn spaced_arguments_and_message() {
        let i = instr("   5:  CALL PICK ( 1 , 'tray' ) ;");
        assert_eq!(i.call().expect("not a call").arguments.len(),2);
        assert_eq!(instr("   6:  MESSAGE[ Door open ] ;").kind,InstructionKind::Message("Door open".to_string()));
    }
    #[test]
    fn conditional_forms() {
        assert!(matches!(instr("   1:  IF R[1]=1 THEN ;").kind,InstructionKind::IfThen(_)));
        assert!(matches!(instr("   2:  IF R[1]=1,JMP LBL[2] ;").kind,InstructionKind::If(_)));
    }
    #[test]
    fn run_counts_as_call() {
        let i = instr("   1:  RUN WATCHDOG ;");
        assert!(matches!(i.kind,InstructionKind::Run(_)));
        assert_eq!(i.call().expect("no call").name,"WATCHDOG");
    }
    #[test]
    fn call_inside_conditional() {
        let i = instr("   1:  IF R[1]=2,CALL TARGET ;");
        assert_eq!(i.call().expect("no call").name,"TARGET");
    }
    #[test]
    fn label_definition_with_comment() {
        match instr("   1:  LBL[10:retry here] ;").kind {
            InstructionKind::Label(def) => {
                assert_eq!(def.id,10);
                assert_eq!(def.comment,Some("retry here".to_string()));
            },
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn indirect_jump() {
        match instr("   1:  JMP LBL[R[5]] ;").kind {
            InstructionKind::Jump(lbl) => assert_eq!(lbl.direct_id(),None),
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn motion_with_options() {
        match instr("   1:L P[2] 500mm/sec CNT50 ACC80 Skip,LBL[2] INC ;").kind {
            InstructionKind::Motion(m) => {
                assert_eq!(m.motion_type,MotionType::Linear);
                assert!(matches!(m.speed,Speed::Value { unit: SpeedUnit::MillimetersPerSecond, .. }));
                assert!(matches!(m.termination,Termination::Continuous(_)));
                assert_eq!(m.options.len(),3);
                assert!(matches!(m.options[2].kind,MotionOptionKind::Incremental));
            },
            k => panic!("unexpected {:?}",k)
        }
        let refs: Vec<Option<u32>> = instr("   1:J P[1] 100% FINE SkipJump,LBL[7] ;").label_references().iter().map(|l| l.direct_id()).collect();
        assert_eq!(refs,vec![Some(7)]);
    }
    #[test]
    fn max_speed() {
        match instr("   1:J PR[1] max_speed CR50 ;").kind {
            InstructionKind::Motion(m) => {
                assert_eq!(m.speed,Speed::Max);
                assert!(matches!(m.termination,Termination::CornerRegion(_)));
            },
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn select_branches() {
        assert!(matches!(instr("   1:  SELECT R[1]=1,JMP LBL[1] ;").kind,InstructionKind::Select(_)));
        assert!(matches!(instr("   1:         =2,CALL PICK ;").kind,InstructionKind::Case(_)));
        assert!(matches!(instr("   1:         ELSE,JMP LBL[3] ;").kind,InstructionKind::CaseElse(_)));
        assert!(matches!(instr("   1:  ELSE ;").kind,InstructionKind::Else));
    }
    #[test]
    fn wait_forms() {
        assert!(matches!(instr("   1:  WAIT   1.00(sec) ;").kind,InstructionKind::Wait(WaitInstruction::Delay(_))));
        let i = instr("   1:  WAIT DI[1]=ON TIMEOUT,LBL[9] ;");
        assert_eq!(i.label_references()[0].direct_id(),Some(9));
    }
    #[test]
    fn for_loop() {
        match instr("   1:  FOR R[1]=10 DOWNTO 1 ;").kind {
            InstructionKind::For(f) => assert_eq!(f.direction,ForDirection::Down),
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn end_is_not_endif() {
        assert_eq!(instr("   1:  ENDIF ;").kind,InstructionKind::EndIf);
        assert_eq!(instr("   1:  END ;").kind,InstructionKind::End);
    }
    #[test]
    fn blank_and_remark() {
        assert_eq!(instr("   1:   ;").kind,InstructionKind::Blank);
        assert_eq!(instr("   1:  //CALL OLD ;").kind,InstructionKind::Remark("CALL OLD".to_string()));
    }
    #[test]
    fn pulse_output() {
        assert!(matches!(instr("   1:  DO[1]=PULSE,0.5sec ;").kind,InstructionKind::Assignment(_)));
    }
}

mod expressions {
    use super::*;
    #[test]
    fn single_operand_is_not_wrapped() {
        let e = condition("   1:  IF DI[1],JMP LBL[1] ;");
        assert!(matches!(e.kind,ExpressionKind::Register(_)));
        let e = condition("   1:  IF R[1]=1,JMP LBL[1] ;");
        assert!(matches!(e.kind,ExpressionKind::Binary { op: BinaryOp::Equal, .. }));
    }
    #[test]
    fn and_binds_tighter_than_or() {
        let e = condition("   1:  IF R[1]=1 OR R[2]=2 AND R[3]=3 THEN ;");
        match e.kind {
            ExpressionKind::Binary { op: BinaryOp::Or, right, .. } => {
                assert!(matches!(right.kind,ExpressionKind::Binary { op: BinaryOp::And, .. }));
            },
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn and_is_left_associative() {
        let e = condition("   1:  IF DI[1] AND DI[2] AND DI[3],JMP LBL[1] ;");
        match e.kind {
            ExpressionKind::Binary { op: BinaryOp::And, left, right } => {
                assert!(matches!(left.kind,ExpressionKind::Binary { op: BinaryOp::And, .. }));
                assert!(matches!(right.kind,ExpressionKind::Register(_)));
            },
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn expression_span() {
        let e = condition("   1:  IF (R[1]>2),JMP LBL[1] ;");
        assert!(matches!(e.kind,ExpressionKind::Parenthesized(_)));
        assert_eq!(e.start,Position::new(1,11));
        assert_eq!(e.end,Position::new(1,19));
    }
    #[test]
    fn system_variable_path() {
        match instr("   1:  R[1]=$[CELL_DATA]TRAY.COUNT ;").kind {
            InstructionKind::Assignment(a) => {
                assert_eq!(a.value.kind,ExpressionKind::SystemVariable("$[CELL_DATA]TRAY.COUNT".to_string()));
            },
            k => panic!("unexpected {:?}",k)
        }
    }
    #[test]
    fn register_comment() {
        match instr("   1:  R[7:count]=R[7:count]+1 ;").kind {
            InstructionKind::Assignment(a) => match a.target.kind {
                ExpressionKind::Register(r) => {
                    assert_eq!(r.kind,"R");
                    assert_eq!(r.comment,Some("count".to_string()));
                },
                k => panic!("unexpected {:?}",k)
            },
            k => panic!("unexpected {:?}",k)
        }
    }
}
