//! # KAREL grammar
//!
//! Parses a complete `.kl` source file into `ast::Program`.
//! Line separators and `--` comments are whitespace, every parser here consumes the
//! whitespace that follows it.  Positions recorded in the tree exclude that whitespace.

use nom::branch::alt;
use nom::bytes::complete::{tag,take_till};
use nom::character::complete::{char,digit0,digit1,multispace1,one_of,space0};
use nom::combinator::{map,opt,recognize,value};
use nom::multi::{many0,many1,separated_list0,separated_list1};
use nom::sequence::{delimited,pair,preceded,terminated,tuple};

use crate::lang::combinators::*;
use super::ast::*;

const RESERVED: [&str;44] = [
    "ABORT","AND","ARRAY","BEGIN","BY","CASE","CONST","DELAY","DIV","DO",
    "DOWNTO","ELSE","END","ENDFOR","ENDIF","ENDSELECT","ENDSTRUCTURE","ENDWHILE","FOR","FROM",
    "GO","GOTO","IF","IN","MOD","NODEDATA","NOT","OF","OR","PATHHEADER",
    "PAUSE","PROGRAM","READ","REPEAT","RETURN","ROUTINE","SELECT","STRUCTURE","THEN","TO",
    "TYPE","UNTIL","VAR","WHILE"
];

fn comment<'a>(input: Span<'a>) -> PResult<'a,Span<'a>> {
    recognize(pair(tag("--"),rest_of_line))(input)
}

/// Whitespace including line separators and comments
fn ws<'a>(input: Span<'a>) -> PResult<'a,()> {
    let (rest,_) = many0(alt((multispace1,comment)))(input)?;
    Ok((rest,()))
}

fn punct<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a,char> {
    move |input: Span<'a>| terminated(char(c),ws)(input)
}

/// Case insensitive keyword, consumes following whitespace and comments
fn kw<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a,Span<'a>> {
    terminated(keyword(word),ws)
}

/// Literal operator, consumes following whitespace and comments
fn op<'a>(sym: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a,Span<'a>> {
    terminated(symbol(sym),ws)
}

/// Byte offset of a `--` comment in the line, quoted text is skipped
fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quoted = false;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'\'' => quoted = !quoted,
            b'-' if !quoted && bytes.get(i+1) == Some(&b'-') => return Some(i),
            _ => {}
        }
    }
    None
}

fn strip_trailing_comments(text: &str) -> &str {
    let mut ans = text.trim_end();
    loop {
        let line_start = ans.rfind('\n').map_or(0,|i| i+1);
        match comment_start(&ans[line_start..]) {
            Some(c) => ans = ans[..line_start+c].trim_end(),
            None => return ans
        }
    }
}

/// Position just after the last code character the parser consumed
fn end_of(input: &Span, rest: &Span, start: Position) -> Position {
    let len = rest.location_offset() - input.location_offset();
    let code = strip_trailing_comments(input.fragment().get(0..len).unwrap_or(""));
    match code.rfind('\n') {
        Some(i) => Position::new(
            start.line + code.matches('\n').count() as u32,
            code[i+1..].chars().count() as u32 + 1
        ),
        None => Position::new(start.line,start.column + code.chars().count() as u32)
    }
}

/// Like `positioned`, but the end excludes any whitespace or comments the parser swallowed
fn trimmed<'a,T,P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,Positioned<T>>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    move |input: Span<'a>| {
        let start = Position::of(&input);
        let (rest,value) = parser(input)?;
        let end = end_of(&input,&rest,start);
        Ok((rest,Positioned { value, start, end }))
    }
}

fn lexeme<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,Positioned<T>>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    terminated(trimmed(parser),ws)
}

/// Identifier that is not a reserved word, no trailing whitespace consumed
fn name<'a>(input: Span<'a>) -> PResult<'a,String> {
    let (rest,id) = identifier(input)?;
    let upper = id.to_uppercase();
    if RESERVED.contains(&upper.as_str()) {
        return Err(nom::Err::Error(Error::expecting(input,"identifier")));
    }
    Ok((rest,id))
}

fn ident<'a>(input: Span<'a>) -> PResult<'a,String> {
    terminated(name,ws)(input)
}

// ---------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------

fn binary(left: Expression, op: BinaryOp, right: Expression) -> Expression {
    let start = left.start;
    let end = right.end;
    Expression {
        kind: ExpressionKind::Binary { op, left: Box::new(left), right: Box::new(right) },
        start,
        end
    }
}

fn number_literal<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let res: PResult<'a,Span<'a>> = recognize(tuple((
        alt((
            recognize(pair(digit1,opt(pair(char('.'),digit0)))),
            recognize(pair(char('.'),digit1))
        )),
        opt(tuple((one_of("eE"),opt(one_of("+-")),digit1)))
    )))(input);
    match res {
        Ok((rest,txt)) => Ok((rest,ExpressionKind::Number(txt.fragment().to_string()))),
        Err(_) => Err(nom::Err::Error(Error::expecting(input,"number")))
    }
}

fn string_literal<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let res: PResult<'a,Span<'a>> = delimited(char('\''),take_till(|c| c=='\'' || c=='\n'),char('\''))(input);
    let (rest,s) = res?;
    Ok((rest,ExpressionKind::String(s.fragment().to_string())))
}

fn system_variable<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let res: PResult<'a,Span<'a>> = recognize(pair(char('$'),identifier))(input);
    let (rest,s) = res?;
    Ok((rest,ExpressionKind::SystemVariable(s.fragment().to_string())))
}

/// `[prog]var`, a variable owned by another program
fn program_variable<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,(program,name)) = pair(delimited(char('['),identifier,char(']')),identifier)(input)?;
    Ok((rest,ExpressionKind::ProgramVariable { program, name }))
}

fn boolean<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    alt((
        value(ExpressionKind::Boolean(true),keyword("TRUE")),
        value(ExpressionKind::Boolean(false),keyword("FALSE")),
        value(ExpressionKind::Boolean(true),keyword("ON")),
        value(ExpressionKind::Boolean(false),keyword("OFF"))
    ))(input)
}

fn parenthesized<'a>(input: Span<'a>) -> PResult<'a,ExpressionKind> {
    let (rest,inner) = delimited(op("("),expression,char(')'))(input)?;
    Ok((rest,ExpressionKind::Parenthesized(Box::new(inner))))
}

fn primary<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (rest,p) = lexeme(alt((
        parenthesized,
        number_literal,
        string_literal,
        system_variable,
        program_variable,
        boolean,
        map(name,ExpressionKind::Identifier)
    )))(input)?;
    Ok((rest,Expression { kind: p.value, start: p.start, end: p.end }))
}

fn arguments<'a>(input: Span<'a>) -> PResult<'a,Vec<Expression>> {
    // `::n` format specifiers are accepted in WRITE and READ argument lists
    let argument = terminated(expression,many0(preceded(op("::"),additive)));
    delimited(punct('('),separated_list0(punct(','),argument),op(")"))(input)
}

enum Suffix {
    Index(Vec<Expression>),
    Field(String),
    Call(Vec<Expression>)
}

/// Primary followed by any number of subscripts, field selections, or argument lists
fn postfix<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (mut rest,mut ans) = primary(input)?;
    loop {
        let suffix: PResult<'a,Positioned<Suffix>> = positioned(alt((
            map(delimited(punct('['),separated_list1(punct(','),expression),char(']')),Suffix::Index),
            map(preceded(char('.'),alt((name,recognize_sysvar_field))),Suffix::Field),
            map(delimited(punct('('),separated_list0(punct(','),expression),char(')')),Suffix::Call)
        )))(rest);
        let (after,p) = match suffix {
            Ok(ans) => ans,
            Err(nom::Err::Error(_)) => return Ok((rest,ans)),
            Err(e) => return Err(e)
        };
        let start = ans.start;
        let kind = match p.value {
            Suffix::Index(indices) => ExpressionKind::Index { base: Box::new(ans), indices },
            Suffix::Field(name) => ExpressionKind::Field { base: Box::new(ans), name },
            Suffix::Call(arguments) => ExpressionKind::Call { callee: Box::new(ans), arguments }
        };
        ans = Expression { kind, start, end: p.end };
        let (after,_) = ws(after)?;
        rest = after;
    }
}

/// Field names of system variables carry a `$`
fn recognize_sysvar_field<'a>(input: Span<'a>) -> PResult<'a,String> {
    let res: PResult<'a,Span<'a>> = recognize(pair(char('$'),identifier))(input);
    let (rest,s) = res?;
    Ok((rest,s.fragment().to_string()))
}

/// Operator levels from tightest to loosest:
/// `NOT`, then `* / DIV MOD AND`, then sign and `+ - OR`, then the relational operators.
fn negation<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let start = Position::of(&input);
    match kw("NOT")(input) {
        Ok((rest,_)) => {
            let (rest,operand) = negation(rest)?;
            let end = operand.end;
            Ok((rest,Expression { kind: ExpressionKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) }, start, end }))
        },
        Err(nom::Err::Error(_)) => postfix(input),
        Err(e) => Err(e)
    }
}

fn multiplicative<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(negation,alt((
        value(BinaryOp::Multiply,op("*")),
        value(BinaryOp::Divide,op("/")),
        value(BinaryOp::IntegerDivide,kw("DIV")),
        value(BinaryOp::Modulo,kw("MOD")),
        value(BinaryOp::And,kw("AND"))
    )),binary)(input)
}

/// A sign applies to the whole term that follows it, `-a * b` is `-(a * b)`
fn signed<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let start = Position::of(&input);
    let sign: PResult<'a,UnaryOp> = alt((
        value(UnaryOp::Negate,op("-")),
        value(UnaryOp::Plus,op("+"))
    ))(input);
    match sign {
        Ok((rest,unary_op)) => {
            let (rest,operand) = multiplicative(rest)?;
            let end = operand.end;
            Ok((rest,Expression { kind: ExpressionKind::Unary { op: unary_op, operand: Box::new(operand) }, start, end }))
        },
        Err(nom::Err::Error(_)) => multiplicative(input),
        Err(e) => Err(e)
    }
}

fn additive<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    left_chain(signed,alt((
        value(BinaryOp::Add,op("+")),
        value(BinaryOp::Subtract,op("-")),
        value(BinaryOp::Or,kw("OR"))
    )),binary)(input)
}

/// Full expression.  Relational operators bind loosest and do not chain,
/// so `a > 1 AND b < 2` needs parentheses.
pub fn expression<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (rest,left) = additive(input)?;
    let res: PResult<'a,BinaryOp> = alt((
        value(BinaryOp::LessEqual,op("<=")),
        value(BinaryOp::GreaterEqual,op(">=")),
        value(BinaryOp::NotEqual,op("<>")),
        value(BinaryOp::Equal,op("=")),
        value(BinaryOp::Less,op("<")),
        value(BinaryOp::Greater,op(">"))
    ))(rest);
    match res {
        Ok((after,rel)) => {
            let (after,right) = additive(after)?;
            Ok((after,binary(left,rel,right)))
        },
        Err(nom::Err::Error(_)) => Ok((rest,left)),
        Err(e) => Err(e)
    }
}

// ---------------------------------------------------------------
// Types
// ---------------------------------------------------------------

fn scalar_or_named(word: &str) -> TypeKind {
    let upper = word.to_uppercase();
    let scalar = match upper.as_str() {
        "INTEGER" => ScalarType::Integer,
        "REAL" => ScalarType::Real,
        "BOOLEAN" => ScalarType::Boolean,
        "POSITION" => ScalarType::Position,
        "XYZWPR" => ScalarType::Xyzwpr,
        "XYZWPREXT" => ScalarType::XyzwprExt,
        "JOINTPOS" => ScalarType::JointPos(None),
        "VECTOR" => ScalarType::Vector,
        "CONFIG" => ScalarType::Config,
        "FILE" => ScalarType::File,
        "SHORT" => ScalarType::Short,
        "BYTE" => ScalarType::Byte,
        s => match s.strip_prefix("JOINTPOS").and_then(|n| n.parse::<u8>().ok()) {
            Some(n) if n >= 1 && n <= 9 => ScalarType::JointPos(Some(n)),
            _ => return TypeKind::Named(word.to_string())
        }
    };
    TypeKind::Scalar(scalar)
}

fn array_bound<'a>(input: Span<'a>) -> PResult<'a,ArrayBound> {
    alt((
        value(ArrayBound::Unspecified,punct('*')),
        map(expression,ArrayBound::Fixed)
    ))(input)
}

fn array_type<'a>(input: Span<'a>) -> PResult<'a,TypeKind> {
    let (rest,(_,bounds,_,element)) = tuple((
        kw("ARRAY"),
        opt(delimited(punct('['),separated_list1(punct(','),array_bound),punct(']'))),
        kw("OF"),
        type_spec
    ))(input)?;
    Ok((rest,TypeKind::Array { bounds: bounds.unwrap_or_default(), element: Box::new(element) }))
}

/// `a, b : type` inside a structure, parameter list, or VAR section
fn typed_names<'a>(input: Span<'a>) -> PResult<'a,(Vec<Positioned<String>>,Option<String>,Type)> {
    let (rest,names) = separated_list1(punct(','),lexeme(name))(input)?;
    let (rest,storage) = opt(preceded(kw("IN"),ident))(rest)?;
    let (rest,_) = punct(':')(rest)?;
    let (rest,ty) = type_spec(rest)?;
    Ok((rest,(names,storage,ty)))
}

fn fields<'a>(input: Span<'a>) -> PResult<'a,Vec<Field>> {
    let (rest,groups) = many1(typed_names)(input)?;
    let mut ans = Vec::new();
    for (names,_,ty) in groups {
        for n in names {
            ans.push(Field { name: n.value, ty: ty.clone(), start: n.start, end: ty.end });
        }
    }
    Ok((rest,ans))
}

fn structure_type<'a>(input: Span<'a>) -> PResult<'a,TypeKind> {
    let (rest,fields) = delimited(kw("STRUCTURE"),fields,kw("ENDSTRUCTURE"))(input)?;
    Ok((rest,TypeKind::Structure(fields)))
}

fn path_type<'a>(input: Span<'a>) -> PResult<'a,TypeKind> {
    let (rest,_) = kw("PATH")(input)?;
    let (rest,header) = opt(delimited(pair(kw("PATHHEADER"),op("=")),type_spec,punct(',')))(rest)?;
    let (rest,node) = preceded(pair(kw("NODEDATA"),op("=")),type_spec)(rest)?;
    Ok((rest,TypeKind::Path { header: header.map(Box::new), node: Box::new(node) }))
}

fn string_type<'a>(input: Span<'a>) -> PResult<'a,TypeKind> {
    let (rest,len) = preceded(kw("STRING"),delimited(punct('['),expression,char(']')))(input)?;
    Ok((rest,TypeKind::Scalar(ScalarType::String(Box::new(len)))))
}

fn type_spec<'a>(input: Span<'a>) -> PResult<'a,Type> {
    let (rest,p) = lexeme(alt((
        array_type,
        structure_type,
        path_type,
        string_type,
        map(identifier,|w| scalar_or_named(&w))
    )))(input)?;
    // group qualifier on positional types is accepted but not kept
    let (rest,_) = opt(tuple((kw("IN"),keyword("GROUP"),punct('['),expression,punct(']'))))(rest)?;
    Ok((rest,Type { kind: p.value, start: p.start, end: p.end }))
}

// ---------------------------------------------------------------
// Statements
// ---------------------------------------------------------------

fn statements<'a>(input: Span<'a>) -> PResult<'a,Vec<Statement>> {
    many0(statement)(input)
}

fn if_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(_,condition,_,then_branch,else_branch,_)) = tuple((
        kw("IF"),
        expression,
        kw("THEN"),
        statements,
        opt(preceded(kw("ELSE"),statements)),
        kw("ENDIF")
    ))(input)?;
    Ok((rest,StatementKind::If { condition, then_branch, else_branch: else_branch.unwrap_or_default() }))
}

fn for_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(_,counter,_,initial,direction,limit,_,body,_)) = tuple((
        kw("FOR"),
        ident,
        op("="),
        expression,
        alt((value(ForDirection::Down,kw("DOWNTO")),value(ForDirection::Up,kw("TO")))),
        expression,
        kw("DO"),
        statements,
        kw("ENDFOR")
    ))(input)?;
    Ok((rest,StatementKind::For { counter, initial, direction, limit, body }))
}

fn while_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(_,condition,_,body,_)) = tuple((kw("WHILE"),expression,kw("DO"),statements,kw("ENDWHILE")))(input)?;
    Ok((rest,StatementKind::While { condition, body }))
}

fn repeat_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(_,body,_,condition)) = tuple((kw("REPEAT"),statements,kw("UNTIL"),expression))(input)?;
    Ok((rest,StatementKind::Repeat { body, condition }))
}

fn select_case<'a>(input: Span<'a>) -> PResult<'a,SelectCase> {
    let (rest,(_,values,_,body)) = tuple((
        kw("CASE"),
        delimited(punct('('),separated_list1(punct(','),expression),punct(')')),
        punct(':'),
        statements
    ))(input)?;
    Ok((rest,SelectCase { values, body }))
}

fn select_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(_,subject,_,cases,else_branch,_)) = tuple((
        kw("SELECT"),
        expression,
        kw("OF"),
        many1(select_case),
        opt(preceded(pair(kw("ELSE"),punct(':')),statements)),
        kw("ENDSELECT")
    ))(input)?;
    Ok((rest,StatementKind::Select { subject, cases, else_branch }))
}

fn return_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,val) = preceded(kw("RETURN"),opt(delimited(punct('('),expression,punct(')'))))(input)?;
    Ok((rest,StatementKind::Return(val)))
}

fn goto_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,label) = preceded(alt((kw("GOTO"),preceded(kw("GO"),kw("TO")))),ident)(input)?;
    Ok((rest,StatementKind::Goto(label)))
}

fn label_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,label) = terminated(terminated(name,space0),op("::"))(input)?;
    Ok((rest,StatementKind::Label(label)))
}

/// `WRITE file(args)` and `READ file(args)`, the file is optional
fn io_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let name_start = Position::of(&input);
    let (rest,verb) = alt((keyword("WRITE"),keyword("READ")))(input)?;
    let name_end = Position::new(name_start.line,name_start.column + verb.fragment().len() as u32);
    let (rest,_) = ws(rest)?;
    let (rest,file) = opt(lexeme(name))(rest)?;
    let (rest,mut args) = arguments(rest)?;
    if let Some(f) = file {
        args.insert(0,Expression {
            kind: ExpressionKind::Identifier(f.value),
            start: f.start,
            end: f.end
        });
    }
    Ok((rest,StatementKind::Call(CallStatement {
        name: verb.fragment().to_uppercase(),
        name_start,
        name_end,
        arguments: args
    })))
}

fn call_statement<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,n) = lexeme(name)(input)?;
    let (rest,args) = opt(arguments)(rest)?;
    Ok((rest,StatementKind::Call(CallStatement {
        name: n.value,
        name_start: n.start,
        name_end: n.end,
        arguments: args.unwrap_or_default()
    })))
}

fn assignment<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    let (rest,(target,_,value)) = tuple((postfix,op("="),expression))(input)?;
    Ok((rest,StatementKind::Assignment { target, value }))
}

fn statement_kind<'a>(input: Span<'a>) -> PResult<'a,StatementKind> {
    alt((
        if_statement,
        for_statement,
        while_statement,
        repeat_statement,
        select_statement,
        return_statement,
        goto_statement,
        map(preceded(kw("DELAY"),expression),StatementKind::Delay),
        map(preceded(pair(kw("WAIT"),kw("FOR")),expression),StatementKind::WaitFor),
        value(StatementKind::Abort,kw("ABORT")),
        value(StatementKind::Pause,kw("PAUSE")),
        io_statement,
        label_statement,
        assignment,
        call_statement
    ))(input)
}

pub fn statement<'a>(input: Span<'a>) -> PResult<'a,Statement> {
    let (rest,p) = trimmed(statement_kind)(input)?;
    Ok((rest,Statement { line_number: p.start.line, kind: p.value, start: p.start, end: p.end }))
}

// ---------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------

fn constant<'a>(input: Span<'a>) -> PResult<'a,Constant> {
    let (rest,(n,_,value)) = tuple((lexeme(name),op("="),expression))(input)?;
    let end = value.end;
    Ok((rest,Constant { name: n.value, value, start: n.start, end }))
}

fn type_declaration<'a>(input: Span<'a>) -> PResult<'a,TypeDeclaration> {
    let (rest,(n,from,_,ty)) = tuple((lexeme(name),opt(preceded(kw("FROM"),ident)),op("="),type_spec))(input)?;
    let end = ty.end;
    Ok((rest,TypeDeclaration { name: n.value, from, ty, start: n.start, end }))
}

fn variables<'a>(input: Span<'a>) -> PResult<'a,Vec<Variable>> {
    let (rest,groups) = many1(typed_names)(input)?;
    let mut ans = Vec::new();
    for (names,storage,ty) in groups {
        for n in names {
            ans.push(Variable { name: n.value, storage: storage.clone(), ty: ty.clone(), start: n.start, end: ty.end });
        }
    }
    Ok((rest,ans))
}

fn data_section<'a>(input: Span<'a>) -> PResult<'a,DeclarationKind> {
    alt((
        map(preceded(kw("CONST"),many1(constant)),DeclarationKind::Constants),
        map(preceded(kw("TYPE"),many1(type_declaration)),DeclarationKind::Types),
        map(preceded(kw("VAR"),variables),DeclarationKind::Variables)
    ))(input)
}

fn data_declaration<'a>(input: Span<'a>) -> PResult<'a,Declaration> {
    let (rest,p) = trimmed(data_section)(input)?;
    Ok((rest,Declaration { kind: p.value, start: p.start, end: p.end }))
}

fn parameters<'a>(input: Span<'a>) -> PResult<'a,Vec<Variable>> {
    let (rest,groups) = delimited(punct('('),separated_list1(punct(';'),typed_names),punct(')'))(input)?;
    let mut ans = Vec::new();
    for (names,_,ty) in groups {
        for n in names {
            ans.push(Variable { name: n.value, storage: None, ty: ty.clone(), start: n.start, end: ty.end });
        }
    }
    Ok((rest,ans))
}

/// Local declarations, `BEGIN`, statements, and `END name` where the name must match
fn routine_body<'a>(routine_name: String) -> impl FnMut(Span<'a>) -> PResult<'a,(Vec<Declaration>,Vec<Statement>)> {
    move |input: Span<'a>| {
        let (rest,(decs,_,body,_)) = tuple((many0(data_declaration),kw("BEGIN"),statements,kw("END")))(input)?;
        let (after,end_name) = ident(rest)?;
        if !end_name.eq_ignore_ascii_case(&routine_name) {
            return Err(nom::Err::Error(Error::expecting(rest,&routine_name)));
        }
        Ok((after,(decs,body)))
    }
}

fn routine<'a>(input: Span<'a>) -> PResult<'a,Routine> {
    let (rest,_) = kw("ROUTINE")(input)?;
    let (rest,n) = lexeme(name)(rest)?;
    let (rest,parameters) = opt(parameters)(rest)?;
    let (rest,return_type) = opt(preceded(punct(':'),type_spec))(rest)?;
    let (rest,from) = opt(preceded(kw("FROM"),ident))(rest)?;
    let (rest,body) = match from {
        Some(_) => (rest,None),
        None => opt(routine_body(n.value.clone()))(rest)?
    };
    let (declarations,body) = match body {
        Some((d,b)) => (d,Some(b)),
        None => (Vec::new(),None)
    };
    Ok((rest,Routine {
        name: n.value,
        name_start: n.start,
        name_end: n.end,
        parameters: parameters.unwrap_or_default(),
        return_type,
        from,
        declarations,
        body
    }))
}

fn declaration<'a>(input: Span<'a>) -> PResult<'a,Declaration> {
    let (rest,p) = trimmed(alt((
        data_section,
        map(routine,DeclarationKind::Routine)
    )))(input)?;
    Ok((rest,Declaration { kind: p.value, start: p.start, end: p.end }))
}

fn directive<'a>(input: Span<'a>) -> PResult<'a,Directive> {
    let (rest,p) = positioned(pair(preceded(char('%'),identifier),rest_of_line))(input)?;
    let (rest,_) = ws(rest)?;
    let (name,tail) = p.value;
    let val = tail.fragment().trim().trim_start_matches('=').trim();
    let value = match val.len() {
        0 => None,
        _ => Some(val.trim_matches('\'').to_string())
    };
    Ok((rest,Directive { name: name.to_uppercase(), value, start: p.start, end: p.end }))
}

enum Prologue {
    Directive(Directive),
    Declaration(Declaration)
}

// ---------------------------------------------------------------
// Program
// ---------------------------------------------------------------

fn comment_text(line: &str) -> Option<String> {
    line.trim_start().strip_prefix("--").map(|s| s.trim().to_string())
}

/// Comment block before `PROGRAM`, or if there is none, the block right after the `PROGRAM` line
fn header_comment(before: &str, after: &str) -> String {
    let mut lines: Vec<String> = before.lines().filter_map(comment_text).collect();
    if lines.len() == 0 {
        lines = after.lines().skip(1).map_while(comment_text).collect();
    }
    lines.join("\n")
}

pub fn program<'a>(input: Span<'a>) -> PResult<'a,Program> {
    let start = Position::of(&input);
    let (rest,_) = ws(input)?;
    let leading = input.fragment().get(0..rest.location_offset()-input.location_offset()).unwrap_or("");
    let (rest,_) = kw("PROGRAM")(rest)?;
    let (after_name,prog_name) = terminated(name,space0)(rest)?;
    let header = header_comment(leading,after_name.fragment());
    let (rest,_) = ws(after_name)?;
    let (rest,prologue) = many0(alt((
        map(directive,Prologue::Directive),
        map(declaration,Prologue::Declaration)
    )))(rest)?;
    let (rest,main) = delimited(kw("BEGIN"),statements,kw("END"))(rest)?;
    let (rest,_) = ident(rest)?;
    let (rest,trailing) = many0(declaration)(rest)?;
    let end = Position::of(&rest);
    let (rest,_) = nom::combinator::eof::<Span<'a>,Error<'a>>(rest)?;
    let mut directives = Vec::new();
    let mut declarations = Vec::new();
    for item in prologue {
        match item {
            Prologue::Directive(d) => directives.push(d),
            Prologue::Declaration(d) => declarations.push(d)
        }
    }
    declarations.extend(trailing);
    Ok((rest,Program {
        name: prog_name,
        header_comment: header,
        directives,
        declarations,
        main,
        start,
        end
    }))
}

/// Parse a complete KAREL source file
pub fn parse(text: &str) -> Result<Program,SyntaxError> {
    parse_text(program,text)
}

fn whole_expression<'a>(input: Span<'a>) -> PResult<'a,Expression> {
    let (rest,expr) = expression(input)?;
    match nom::combinator::eof::<Span<'a>,Error<'a>>(rest) {
        Ok((rest,_)) => Ok((rest,expr)),
        Err(_) => Err(nom::Err::Failure(Error::expecting(rest,"end of expression")))
    }
}

/// Parse an expression that makes up the whole text, mainly for testing
pub fn parse_expression(text: &str) -> Result<Expression,SyntaxError> {
    parse_text(whole_expression,text)
}
