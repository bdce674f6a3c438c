//! # TP grammar
//!
//! Parses a complete `.ls` listing into `ast::Program`.
//! The listing is a sequence of sections, `/PROG`, attributes, `/MN`, and optionally `/POS`,
//! closed by `/END`.  Each body line has the form `<n>: <instruction> ;`.
//! The line number written in the file is ignored, instructions are identified by source row.
//!
//! Every parser here consumes trailing spaces and tabs but never a line separator.

use nom::branch::alt;
use nom::bytes::complete::take_till;
use nom::character::complete::{char,digit0,digit1,line_ending,space0};
use nom::combinator::{map,opt,peek,recognize,value};
use nom::multi::{many0,separated_list0};
use nom::sequence::{delimited,pair,preceded,terminated,tuple};

use crate::lang::combinators::*;
use super::ast::*;

fn sp<'a>(input: Span<'a>) -> PResult<'a,Span<'a>> {
    space0(input)
}

fn punct<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a,char> {
    move |input: Span<'a>| char(c)(input)
}

fn digits<'a>(input: Span<'a>) -> PResult<'a,Span<'a>> {
    match digit1::<Span<'a>,Error<'a>>(input) {
        Ok(ans) => Ok(ans),
        Err(_) => Err(nom::Err::Error(Error::expecting(input,"number")))
    }
}

fn unsigned<'a>(input: Span<'a>) -> PResult<'a,u32> {
    let (rest,d) = digits(input)?;
    match d.fragment().parse::<u32>() {
        Ok(n) => Ok((rest,n)),
        Err(_) => Err(nom::Err::Failure(Error::expecting(input,"number in range")))
    }
}

/// Run the parser, record its positions excluding trailing space, then skip trailing space
fn lexeme<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,Positioned<T>>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    terminated(positioned(parser),sp)
}

fn text_until<'a>(stop: char) -> impl FnMut(Span<'a>) -> PResult<'a,String> {
    move |input: Span<'a>| {
        let res: PResult<'a,Span<'a>> = take_till(|c| c==stop || c=='\n' || c=='\r')(input);
        let (rest,txt) = res?;
        Ok((rest,txt.fragment().trim().to_string()))
    }
}

fn binary(left: Expression, op: BinaryOp, right: Expression) -> Expression {
    let start = left.start;
    let end = right.end;
    Expression {
        kind: ExpressionKind::Binary { op, left: Box::new(left), right: Box::new(right) },
        start,
        end
    }
}

// ---------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------

fn number_literal<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,txt) = recognize(alt((
        recognize(pair(digits,opt(pair(punct('.'),digit0)))),
        recognize(pair(punct('.'),digits))
    )))(input)?;
    Ok((rest,ExpressionKind::Number(txt.fragment().to_string())))
}

fn string_literal<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,s) = alt((
        delimited(punct('\''),take_till(|c| c=='\'' || c=='\n'),punct('\'')),
        delimited(punct('"'),take_till(|c| c=='"' || c=='\n'),punct('"'))
    ))(input)?;
    Ok((rest,ExpressionKind::String(s.fragment().to_string())))
}

/// `$NAME`, `$NAME[i].$FIELD`, or `$[PROG]VAR.FIELD`
fn system_variable<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,txt) = recognize(tuple((
        punct('$'),
        opt(delimited(punct('['),identifier,punct(']'))),
        identifier,
        many0(alt((
            recognize(tuple((punct('.'),opt(punct('$')),identifier))),
            recognize(tuple((punct('['),take_till(|c| c==']' || c=='\n'),punct(']'))))
        )))
    )))(input)?;
    Ok((rest,ExpressionKind::SystemVariable(txt.fragment().to_string())))
}

fn register<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,kind) = identifier(input)?;
    let (rest,_) = punct('[')(rest)?;
    let (rest,_) = sp(rest)?;
    let (rest,indices) = separated_list0(symbol(","),expression)(rest)?;
    let (rest,comment) = opt(preceded(punct(':'),text_until(']')))(rest)?;
    let (rest,_) = punct(']')(rest)?;
    Ok((rest,ExpressionKind::Register(Register { kind, indices, comment })))
}

fn parenthesized<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,inner) = delimited(symbol("("),expression,punct(')'))(input)?;
    Ok((rest,ExpressionKind::Parenthesized(Box::new(inner))))
}

/// Operand without operators, also used where the grammar allows only a data reference
/// such as the target of an assignment or the subject of a select.
pub fn primary<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (rest,p) = lexeme(alt((
        parenthesized,
        number_literal,
        string_literal,
        system_variable,
        register,
        map(identifier,ExpressionKind::Identifier)
    )))(input)?;
    Ok((rest,Expression { kind: p.value, start: p.start, end: p.end }))
}

fn unary<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let start = Position::of(&input);
    let op: PResult<'a,UnaryOp> = alt((
        value(UnaryOp::Not,keyword("NOT")),
        value(UnaryOp::Not,symbol("!")),
        value(UnaryOp::Negate,symbol("-"))
    ))(input);
    match op {
        Ok((rest,op)) => {
            let (rest,operand) = unary(rest)?;
            let end = operand.end;
            Ok((rest,Expression { kind: ExpressionKind::Unary { op, operand: Box::new(operand) }, start, end }))
        },
        Err(nom::Err::Error(_)) => primary(input),
        Err(e) => Err(e)
    }
}

fn multiplicative<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(unary,alt((
        value(BinaryOp::Multiply,symbol("*")),
        value(BinaryOp::Divide,symbol("/")),
        value(BinaryOp::IntegerDivide,keyword("DIV")),
        value(BinaryOp::Modulo,keyword("MOD"))
    )),binary)(input)
}

fn additive<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(multiplicative,alt((
        value(BinaryOp::Add,symbol("+")),
        value(BinaryOp::Subtract,symbol("-"))
    )),binary)(input)
}

fn comparison_op<'a>(input: Span<'a>) -> PResult<'a,BinaryOp> {
    alt((
        value(BinaryOp::LessEqual,symbol("<=")),
        value(BinaryOp::GreaterEqual,symbol(">=")),
        value(BinaryOp::NotEqual,symbol("<>")),
        value(BinaryOp::Equal,symbol("=")),
        value(BinaryOp::Less,symbol("<")),
        value(BinaryOp::Greater,symbol(">"))
    ))(input)
}

/// Comparisons do not chain
fn comparison<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (rest,left) = additive(input)?;
    match comparison_op(rest) {
        Ok((after,op)) => {
            let (after,right) = additive(after)?;
            Ok((after,binary(left,op,right)))
        },
        Err(nom::Err::Error(_)) => Ok((rest,left)),
        Err(e) => Err(e)
    }
}

fn and_chain<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(comparison,value(BinaryOp::And,keyword("AND")),binary)(input)
}

/// Full expression, `OR` binds loosest
pub fn expression<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(and_chain,value(BinaryOp::Or,keyword("OR")),binary)(input)
}

// ---------------------------------------------------------------
// Labels, calls, actions
// ---------------------------------------------------------------

fn direct_label<'a>(input: Span<'a>) -> PResult<'a,LabelTarget> {
    let (rest,id) = terminated(unsigned,sp)(input)?;
    let _ = peek(alt((punct(']'),punct(':'))))(rest)?;
    Ok((rest,LabelTarget::Direct(id)))
}

/// `LBL[n]`, `LBL[n:comment]`, or `LBL[R[n]]`
pub fn label_reference<'a>(input: Span<'a>) -> PResult<'a,LabelReference> {
    let (rest,p) = lexeme(tuple((
        keyword("LBL"),
        punct('['),
        sp,
        alt((direct_label,map(expression,LabelTarget::Indirect))),
        opt(preceded(punct(':'),text_until(']'))),
        punct(']')
    )))(input)?;
    Ok((rest,LabelReference { target: p.value.3, start: p.start, end: p.end }))
}

fn label_definition<'a>(input: Span<'a>) -> PResult<'a,LabelDefinition> {
    let (rest,p) = lexeme(tuple((
        keyword("LBL"),
        punct('['),
        sp,
        terminated(unsigned,sp),
        opt(preceded(punct(':'),text_until(']'))),
        punct(']')
    )))(input)?;
    let comment = match p.value.4 {
        Some(s) if s.len() > 0 => Some(s),
        _ => None
    };
    Ok((rest,LabelDefinition { id: p.value.3, comment, start: p.start, end: p.end }))
}

/// Program name with optional argument list, shared by `CALL` and `RUN`
fn call_target<'a>(input: Span<'a>) -> PResult<'a,CallInstruction> {
    let (rest,name) = positioned(identifier)(input)?;
    let (rest,_) = sp(rest)?;
    let (rest,args) = opt(between_parens(separated_list0(symbol(","),expression)))(rest)?;
    Ok((rest,CallInstruction {
        name: name.value,
        name_start: name.start,
        name_end: name.end,
        arguments: args.unwrap_or_default()
    }))
}

fn assignment<'a>(input: Span<'a>) -> PResult<'a,Assignment> {
    let (rest,target) = primary(input)?;
    let (rest,_) = symbol("=")(rest)?;
    let (rest,value) = expression(rest)?;
    // pulse width, as in `DO[1]=PULSE,0.5sec`
    let (rest,_) = opt(tuple((symbol(","),number_literal,sp,opt(keyword("sec")))))(rest)?;
    Ok((rest,Assignment { target, value }))
}

fn action<'a>(input: Span<'a>) -> PResult<'a,Action> {
    let (rest,p) = positioned(alt((
        map(preceded(keyword("JMP"),label_reference),ActionKind::Jump),
        map(preceded(keyword("CALL"),call_target),ActionKind::Call),
        map(preceded(keyword("RUN"),call_target),ActionKind::Run),
        map(assignment,ActionKind::Assignment)
    )))(input)?;
    Ok((rest,Action { kind: p.value, start: p.start, end: p.end }))
}

fn case_branch<'a>(input: Span<'a>) -> PResult<'a,CaseBranch> {
    let (rest,value) = expression(input)?;
    let (rest,_) = symbol(",")(rest)?;
    let (rest,action) = action(rest)?;
    Ok((rest,CaseBranch { value, action }))
}

// ---------------------------------------------------------------
// Motion
// ---------------------------------------------------------------

fn motion_type<'a>(input: Span<'a>) -> PResult<'a,MotionType> {
    alt((
        value(MotionType::Joint,keyword("J")),
        value(MotionType::Linear,keyword("L")),
        value(MotionType::Circular,keyword("C")),
        value(MotionType::CircularArc,keyword("A"))
    ))(input)
}

fn speed_unit<'a>(input: Span<'a>) -> PResult<'a,SpeedUnit> {
    alt((
        value(SpeedUnit::Percent,symbol("%")),
        value(SpeedUnit::MillimetersPerSecond,symbol("mm/sec")),
        value(SpeedUnit::CentimetersPerMinute,symbol("cm/min")),
        value(SpeedUnit::InchesPerMinute,symbol("inch/min")),
        value(SpeedUnit::DegreesPerSecond,symbol("deg/sec")),
        value(SpeedUnit::Milliseconds,symbol("msec")),
        value(SpeedUnit::Seconds,symbol("sec"))
    ))(input)
}

fn speed<'a>(input: Span<'a>) -> PResult<'a,Speed> {
    alt((
        value(Speed::Max,keyword("max_speed")),
        map(pair(primary,speed_unit),|(value,unit)| Speed::Value { value, unit })
    ))(input)
}

fn termination<'a>(input: Span<'a>) -> PResult<'a,Termination> {
    alt((
        value(Termination::Fine,keyword("FINE")),
        map(preceded(symbol("CNT"),primary),Termination::Continuous),
        map(preceded(symbol("CR"),primary),Termination::CornerRegion)
    ))(input)
}

fn motion_option<'a>(input: Span<'a>) -> PResult<'a,MotionOption> {
    let (rest,p) = positioned(alt((
        map(preceded(pair(keyword("SkipJump"),symbol(",")),label_reference),MotionOptionKind::SkipJump),
        map(terminated(
            preceded(pair(keyword("Skip"),symbol(",")),label_reference),
            opt(preceded(symbol(","),assignment))
        ),MotionOptionKind::Skip),
        map(preceded(symbol("ACC"),primary),MotionOptionKind::Acceleration),
        map(preceded(keyword("Tool_Offset"),opt(preceded(symbol(","),primary))),MotionOptionKind::ToolOffset),
        map(preceded(keyword("Offset"),opt(preceded(symbol(","),primary))),MotionOptionKind::Offset),
        value(MotionOptionKind::Incremental,keyword("INC")),
        map(terminated(identifier,sp),MotionOptionKind::Flag)
    )))(input)?;
    Ok((rest,MotionOption { kind: p.value, start: p.start, end: p.end }))
}

fn motion<'a>(input: Span<'a>) -> PResult<'a,MotionInstruction> {
    let (rest,motion_type) = motion_type(input)?;
    let (rest,destination) = primary(rest)?;
    let (rest,speed) = speed(rest)?;
    let (rest,termination) = termination(rest)?;
    let (rest,options) = many0(motion_option)(rest)?;
    Ok((rest,MotionInstruction { motion_type, destination, speed, termination, options }))
}

// ---------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------

fn conditional<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    let (rest,condition) = preceded(keyword("IF"),expression)(input)?;
    let ans = alt((
        value(InstructionKind::IfThen(condition.clone()),keyword("THEN")),
        map(preceded(symbol(","),action),|action| InstructionKind::If(ConditionalInstruction { condition: condition.clone(), action }))
    ))(rest);
    ans
}

fn else_branch<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    let (rest,maybe_action) = preceded(keyword("ELSE"),opt(preceded(symbol(","),action)))(input)?;
    match maybe_action {
        Some(action) => Ok((rest,InstructionKind::CaseElse(action))),
        None => Ok((rest,InstructionKind::Else))
    }
}

fn for_loop<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    let (rest,(counter,_,initial,direction,limit)) = preceded(keyword("FOR"),tuple((
        primary,
        symbol("="),
        expression,
        alt((value(ForDirection::Down,keyword("DOWNTO")),value(ForDirection::Up,keyword("TO")))),
        expression
    )))(input)?;
    Ok((rest,InstructionKind::For(ForInstruction { counter, initial, direction, limit })))
}

fn select<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    let (rest,(subject,_,branch)) = preceded(keyword("SELECT"),tuple((primary,symbol("="),case_branch)))(input)?;
    Ok((rest,InstructionKind::Select(SelectInstruction { subject, branch })))
}

fn wait<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    let (rest,_) = keyword("WAIT")(input)?;
    let delay: PResult<'a,Expression> = terminated(primary,symbol("(sec)"))(rest);
    if let Ok((rest,time)) = delay {
        return Ok((rest,InstructionKind::Wait(WaitInstruction::Delay(time))));
    }
    let (rest,condition) = expression(rest)?;
    let (rest,timeout) = opt(preceded(pair(keyword("TIMEOUT"),symbol(",")),label_reference))(rest)?;
    Ok((rest,InstructionKind::Wait(WaitInstruction::Condition { condition, timeout })))
}

fn flow_instruction<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    alt((
        map(preceded(symbol("!"),text_until(';')),InstructionKind::Comment),
        map(preceded(symbol("//"),text_until(';')),InstructionKind::Remark),
        map(label_definition,InstructionKind::Label),
        map(preceded(keyword("JMP"),label_reference),InstructionKind::Jump),
        map(preceded(keyword("CALL"),call_target),InstructionKind::Call),
        map(preceded(keyword("RUN"),call_target),InstructionKind::Run),
        conditional,
        else_branch,
        value(InstructionKind::EndIf,keyword("ENDIF")),
        value(InstructionKind::EndFor,keyword("ENDFOR")),
        value(InstructionKind::End,keyword("END")),
        for_loop,
        select,
        map(preceded(symbol("="),case_branch),InstructionKind::Case)
    ))(input)
}

fn other_instruction<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    alt((
        wait,
        map(preceded(pair(keyword("SKIP"),keyword("CONDITION")),expression),InstructionKind::SkipCondition),
        map(preceded(keyword("MESSAGE"),between_brackets(text_until(']'))),InstructionKind::Message),
        value(InstructionKind::Pause,keyword("PAUSE")),
        value(InstructionKind::Abort,keyword("ABORT")),
        map(motion,InstructionKind::Motion),
        map(assignment,InstructionKind::Assignment)
    ))(input)
}

fn instruction_kind<'a>(input: Span<'a>) -> PResult<'a,InstructionKind> {
    alt((
        value(InstructionKind::Blank,peek(punct(';'))),
        flow_instruction,
        other_instruction
    ))(input)
}

/// One body line, `<n>: <instruction> ;`
pub fn instruction<'a>(input: Span<'a>) -> PResult<'a,Instruction> {
    let (rest,_) = tuple((sp,digits,punct(':'),sp))(input)?;
    let line_number = rest.location_line();
    let (rest,p) = with_start_position(with_end_position(instruction_kind))(rest)?;
    let ((kind,end),start) = p;
    let (rest,_) = tuple((sp,punct(';'),sp,line_end))(rest)?;
    Ok((rest,Instruction { line_number, kind, start, end }))
}

// ---------------------------------------------------------------
// Sections
// ---------------------------------------------------------------

fn at_marker(input: &Span, marker: &str) -> bool {
    let trimmed = input.fragment().trim_start_matches(|c| c==' ' || c=='\t');
    match trimmed.get(0..marker.len()) {
        Some(head) => head.eq_ignore_ascii_case(marker),
        None => false
    }
}

/// Skip empty physical lines
fn empty_lines<'a>(input: Span<'a>) -> PResult<'a,()> {
    let (rest,_) = many0(pair(sp,line_ending))(input)?;
    Ok((rest,()))
}

/// Value of `COMMENT = "..."` if the line is that attribute
fn attribute_comment(line: &str) -> Option<String> {
    let trimmed = line.trim();
    match trimmed.get(0..7) {
        Some(head) if head.eq_ignore_ascii_case("COMMENT") => {},
        _ => return None
    }
    let val = trimmed.get(7..)?.trim_start().strip_prefix('=')?;
    let val = val.trim().trim_end_matches(';').trim();
    Some(val.trim_matches('"').to_string())
}

/// Attribute lines up to `/MN`, capturing the program comment
fn attributes<'a>(mut input: Span<'a>) -> PResult<'a,Option<String>> {
    let mut comment = None;
    loop {
        if input.fragment().is_empty() {
            return Err(nom::Err::Error(Error::expecting(input,"/MN")));
        }
        if at_marker(&input,"/MN") {
            return Ok((input,comment));
        }
        let (rest,line) = rest_of_line(input)?;
        if let Some(c) = attribute_comment(line.fragment()) {
            comment = Some(c);
        }
        let (rest,_) = line_end(rest)?;
        input = rest;
    }
}

/// Position data is not analyzed, skip to `/END`
fn positions<'a>(mut input: Span<'a>) -> PResult<'a,()> {
    loop {
        if input.fragment().is_empty() {
            return Err(nom::Err::Error(Error::expecting(input,"/END")));
        }
        if at_marker(&input,"/END") {
            return Ok((input,()));
        }
        let (rest,_) = rest_of_line(input)?;
        let (rest,_) = line_end(rest)?;
        input = rest;
    }
}

fn header_comment(instructions: &[Instruction]) -> String {
    let mut lines = Vec::new();
    for instr in instructions.iter().skip_while(|i| i.kind == InstructionKind::Blank) {
        match &instr.kind {
            InstructionKind::Comment(txt) => lines.push(txt.clone()),
            _ => break
        }
    }
    lines.join("\n")
}

pub fn program<'a>(input: Span<'a>) -> PResult<'a,Program> {
    let start = Position::of(&input);
    let (rest,_) = empty_lines(input)?;
    let (rest,_) = keyword("/PROG")(rest)?;
    let (rest,name) = terminated(identifier,sp)(rest)?;
    let (rest,sub_type) = opt(terminated(identifier,sp))(rest)?;
    let (rest,_) = line_end(rest)?;
    let (rest,comment) = attributes(rest)?;
    let (rest,_) = tuple((sp,keyword("/MN"),line_end))(rest)?;
    let mut instructions = Vec::new();
    let mut curs = rest;
    loop {
        let (rest,_) = empty_lines(curs)?;
        curs = rest;
        if curs.fragment().is_empty() || at_marker(&curs,"/POS") || at_marker(&curs,"/END") {
            break;
        }
        let (rest,instr) = instruction(curs)?;
        instructions.push(instr);
        curs = rest;
    }
    if at_marker(&curs,"/POS") {
        let (rest,_) = tuple((sp,keyword("/POS"),line_end))(curs)?;
        let (rest,_) = positions(rest)?;
        curs = rest;
    }
    let (rest,_) = preceded(sp,keyword("/END"))(curs)?;
    let end = Position::of(&rest);
    let (rest,_) = nom::character::complete::multispace0::<Span<'a>,Error<'a>>(rest)?;
    let (rest,_) = match nom::combinator::eof::<Span<'a>,Error<'a>>(rest) {
        Ok(ans) => ans,
        Err(_) => return Err(nom::Err::Failure(Error::expecting(rest,"end of file after /END")))
    };
    Ok((rest,Program {
        name,
        sub_type,
        comment,
        header_comment: header_comment(&instructions),
        instructions,
        start,
        end
    }))
}

/// Parse a complete TP listing
pub fn parse(text: &str) -> Result<Program,SyntaxError> {
    parse_text(program,text)
}

/// Parse a single instruction line such as `  12:  CALL FOO ;`, mainly for testing
pub fn parse_instruction(line: &str) -> Result<Instruction,SyntaxError> {
    parse_text(instruction,line)
}
