//! # Position tracking parser combinators
//!
//! Both grammars are written with `nom` over a `nom_locate` span, so that every node
//! of the syntax tree can record where it starts and ends.  Positions are 1-based,
//! the end position is the cursor immediately after the construct.
//!
//! The combinators here never change what a wrapped parser accepts or how much it consumes.
//! On failure the wrapped parser's error is passed through, except that a failure
//! sitting at the end of input gets the message "unexpected end of input".

use nom::bytes::complete::{tag_no_case,take_till};
use nom::character::complete::{alpha1,alphanumeric1,line_ending,space0};
use nom::combinator::{eof,recognize};
use nom::error::{ContextError,ErrorKind,FromExternalError,ParseError};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::multi::many0;
use nom::sequence::{delimited,pair};
use nom::IResult;
use nom_locate::LocatedSpan;
use lsp_types as lsp;

pub type Span<'a> = LocatedSpan<&'a str>;
pub type PResult<'a,T> = IResult<Span<'a>,T,Error<'a>>;

const END_OF_INPUT: &str = "unexpected end of input";

/// Line and column, both starting at 1.
/// Ordering is lexicographic on (line, column).
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
    /// Position of the first character of the span
    pub fn of(span: &Span) -> Self {
        Self {
            line: span.location_line(),
            column: span.get_utf8_column() as u32
        }
    }
    /// LSP positions are zero based
    pub fn to_lsp(&self) -> lsp::Position {
        lsp::Position::new(self.line.saturating_sub(1),self.column.saturating_sub(1))
    }
}

pub fn lsp_range(start: &Position, end: &Position) -> lsp::Range {
    lsp::Range::new(start.to_lsp(),end.to_lsp())
}

/// A parsed value with the positions where it starts and ends
#[derive(Clone,Debug,PartialEq)]
pub struct Positioned<T> {
    pub value: T,
    pub start: Position,
    pub end: Position
}

/// Error produced by the grammars.  When alternatives fail, the one that got furthest wins,
/// and alternatives failing at the same place pool their expectations.
#[derive(Clone,Debug,PartialEq)]
pub struct Error<'a> {
    pub input: Span<'a>,
    pub message: String,
    pub expected: Vec<String>
}

impl<'a> Error<'a> {
    pub fn expecting(input: Span<'a>, what: &str) -> Self {
        Self {
            input,
            message: format!("expected {}",what),
            expected: vec![what.to_string()]
        }
    }
    fn at_end_of_input(mut self) -> Self {
        if self.input.fragment().is_empty() {
            self.message = END_OF_INPUT.to_string();
        }
        self
    }
}

impl<'a> ParseError<Span<'a>> for Error<'a> {
    fn from_error_kind(input: Span<'a>, kind: ErrorKind) -> Self {
        Self {
            input,
            message: format!("unexpected input ({})",kind.description()),
            expected: Vec::new()
        }
    }
    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
    fn from_char(input: Span<'a>, c: char) -> Self {
        Self::expecting(input,&format!("'{}'",c))
    }
    fn or(self, other: Self) -> Self {
        let here = self.input.location_offset();
        let there = other.input.location_offset();
        if there > here {
            return other;
        }
        if here > there {
            return self;
        }
        let mut ans = self;
        for e in other.expected {
            if !ans.expected.contains(&e) {
                ans.expected.push(e);
            }
        }
        if ans.expected.len() > 0 {
            ans.message = format!("expected {}",ans.expected.join(" or "));
        }
        ans
    }
}

impl<'a> ContextError<Span<'a>> for Error<'a> {
    fn add_context(_input: Span<'a>, ctx: &'static str, mut other: Self) -> Self {
        if !other.expected.iter().any(|e| e==ctx) {
            other.expected.push(ctx.to_string());
        }
        other
    }
}

impl<'a,E: std::fmt::Display> FromExternalError<Span<'a>,E> for Error<'a> {
    fn from_external_error(input: Span<'a>, _kind: ErrorKind, e: E) -> Self {
        Self {
            input,
            message: e.to_string(),
            expected: Vec::new()
        }
    }
}

/// Parse failure detached from the source text
#[derive(Clone,Debug,PartialEq)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
    pub expected: Vec<String>
}

impl<'a> From<Error<'a>> for SyntaxError {
    fn from(e: Error<'a>) -> Self {
        Self {
            position: Position::of(&e.input),
            message: e.message,
            expected: e.expected
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}:{}: {}",self.position.line,self.position.column,self.message)
    }
}

impl From<SyntaxError> for super::Error {
    fn from(e: SyntaxError) -> Self {
        super::Error::Parse {
            line: e.position.line,
            column: e.position.column,
            message: e.message
        }
    }
}

fn end_of_input<'a>(e: nom::Err<Error<'a>>) -> nom::Err<Error<'a>> {
    e.map(|inner| inner.at_end_of_input())
}

/// Run a whole-input parser over the text
pub fn parse_text<'a,T,P>(mut parser: P, text: &'a str) -> Result<T,SyntaxError>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    match parser(Span::new(text)) {
        Ok((_,ans)) => Ok(ans),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SyntaxError::from(e.at_end_of_input())),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError {
            position: Position::new(text.split('\n').count() as u32,1),
            message: END_OF_INPUT.to_string(),
            expected: Vec::new()
        })
    }
}

/// Record the position before running the parser
pub fn with_start_position<'a,T,P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,(T,Position)>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    move |input: Span<'a>| {
        let start = Position::of(&input);
        match parser(input) {
            Ok((rest,value)) => Ok((rest,(value,start))),
            Err(e) => Err(end_of_input(e))
        }
    }
}

/// Record the position of the remainder after the parser succeeds
pub fn with_end_position<'a,T,P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,(T,Position)>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    move |input: Span<'a>| {
        match parser(input) {
            Ok((rest,value)) => {
                let end = Position::of(&rest);
                Ok((rest,(value,end)))
            },
            Err(e) => Err(end_of_input(e))
        }
    }
}

/// Tag the parser's value with both start and end positions
pub fn positioned<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,Positioned<T>>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    let mut inner = with_start_position(with_end_position(parser));
    move |input: Span<'a>| {
        let (rest,((value,end),start)) = inner(input)?;
        Ok((rest,Positioned { value, start, end }))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case insensitive keyword followed by optional spaces or tabs.
/// If the keyword ends in a word character, the next character must not be one,
/// so that `END` does not match the start of `ENDIF`.
pub fn keyword<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a,Span<'a>> {
    move |input: Span<'a>| {
        let (rest,matched) = match tag_no_case::<&str,Span<'a>,Error<'a>>(word)(input) {
            Ok(ans) => ans,
            Err(_) => return Err(nom::Err::Error(Error::expecting(input,word)))
        };
        if word.chars().last().map_or(false,is_word_char) {
            if let Some(c) = rest.fragment().chars().next() {
                if is_word_char(c) {
                    return Err(nom::Err::Error(Error::expecting(input,word)));
                }
            }
        }
        let (rest,_) = space0::<Span<'a>,Error<'a>>(rest)?;
        Ok((rest,matched))
    }
}

/// Case insensitive literal followed by optional spaces or tabs, no word boundary check
pub fn symbol<'a>(sym: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a,Span<'a>> {
    move |input: Span<'a>| {
        let (rest,matched) = match tag_no_case::<&str,Span<'a>,Error<'a>>(sym)(input) {
            Ok(ans) => ans,
            Err(_) => return Err(nom::Err::Error(Error::expecting(input,&format!("'{}'",sym))))
        };
        let (rest,_) = space0::<Span<'a>,Error<'a>>(rest)?;
        Ok((rest,matched))
    }
}

/// Wrap with literal delimiters, each delimiter consumes its own trailing space
pub fn between<'a,T,P>(open: &'static str, close: &'static str, parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,T>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    delimited(symbol(open),parser,symbol(close))
}

pub fn between_parens<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,T>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    between("(",")",parser)
}

pub fn between_brackets<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,T>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    between("[","]",parser)
}

pub fn between_braces<'a,T,P>(parser: P) -> impl FnMut(Span<'a>) -> PResult<'a,T>
where P: FnMut(Span<'a>) -> PResult<'a,T>
{
    between("{","}",parser)
}

/// Left associative chain: one operand, then zero or more (operator, operand) pairs.
/// With no pairs the lone operand is returned as is, no wrapper node is built.
pub fn left_chain<'a,T,O,P,Q,F>(mut operand: P, mut operator: Q, mut fold: F) -> impl FnMut(Span<'a>) -> PResult<'a,T>
where
    P: FnMut(Span<'a>) -> PResult<'a,T>,
    Q: FnMut(Span<'a>) -> PResult<'a,O>,
    F: FnMut(T,O,T) -> T
{
    move |input: Span<'a>| {
        let (mut rest,mut acc) = operand(input)?;
        loop {
            let (after_op,op) = match operator(rest) {
                Ok(ans) => ans,
                Err(nom::Err::Error(_)) => return Ok((rest,acc)),
                Err(e) => return Err(e)
            };
            let (after,rhs) = operand(after_op)?;
            acc = fold(acc,op,rhs);
            rest = after;
        }
    }
}

/// Identifier: letter or underscore followed by word characters, no trailing space consumed
pub fn identifier<'a>(input: Span<'a>) -> PResult<'a,String> {
    let res: PResult<'a,Span<'a>> = recognize(pair(alt((alpha1,tag("_"))),many0(alt((alphanumeric1,tag("_"))))))(input);
    match res {
        Ok((rest,id)) => Ok((rest,id.fragment().to_string())),
        Err(_) => Err(nom::Err::Error(Error::expecting(input,"identifier")))
    }
}

/// Everything up to but not including the line separator
pub fn rest_of_line<'a>(input: Span<'a>) -> PResult<'a,Span<'a>> {
    take_till(|c| c=='\n' || c=='\r')(input)
}

/// Line separator or end of input
pub fn line_end<'a>(input: Span<'a>) -> PResult<'a,Span<'a>> {
    alt((line_ending,eof))(input)
}
