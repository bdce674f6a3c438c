//! Syntax tree for KAREL programs.
//!
//! Every node that corresponds to visible syntax carries its start and end position.

use std::fmt;
use crate::lang::combinators::Position;

#[derive(Clone,Debug,PartialEq)]
pub struct Program {
    pub name: String,
    /// leading `--` comment block, one line per comment, without the dashes
    pub header_comment: String,
    pub directives: Vec<Directive>,
    /// constants, types, variables, and routines, in source order,
    /// including routines that follow the main body
    pub declarations: Vec<Declaration>,
    pub main: Vec<Statement>,
    pub start: Position,
    pub end: Position
}

/// `%NAME` or `%NAME = value`
#[derive(Clone,Debug,PartialEq)]
pub struct Directive {
    pub name: String,
    pub value: Option<String>,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: Expression,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct TypeDeclaration {
    pub name: String,
    /// program that owns the type, from `name FROM prog = ...`
    pub from: Option<String>,
    pub ty: Type,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct Variable {
    pub name: String,
    /// storage class, from `IN CMOS` and similar
    pub storage: Option<String>,
    pub ty: Type,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct Routine {
    pub name: String,
    pub name_start: Position,
    pub name_end: Position,
    pub parameters: Vec<Variable>,
    pub return_type: Option<Type>,
    /// program that implements the routine, from `ROUTINE name FROM prog`
    pub from: Option<String>,
    pub declarations: Vec<Declaration>,
    /// `None` for a forward or external declaration
    pub body: Option<Vec<Statement>>
}

#[derive(Clone,Debug,PartialEq)]
pub enum DeclarationKind {
    Constants(Vec<Constant>),
    Types(Vec<TypeDeclaration>),
    Variables(Vec<Variable>),
    Routine(Routine)
}

#[derive(Clone,Debug,PartialEq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub enum ScalarType {
    Integer,
    Real,
    Boolean,
    String(Box<Expression>),
    Position,
    Xyzwpr,
    XyzwprExt,
    /// `JOINTPOS` or `JOINTPOS1` through `JOINTPOS9`
    JointPos(Option<u8>),
    Vector,
    Config,
    File,
    Short,
    Byte
}

#[derive(Clone,Debug,PartialEq)]
pub enum ArrayBound {
    Fixed(Expression),
    /// `*`, size set elsewhere
    Unspecified
}

#[derive(Clone,Debug,PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub enum TypeKind {
    Scalar(ScalarType),
    /// reference to a user type
    Named(String),
    Array {
        bounds: Vec<ArrayBound>,
        element: Box<Type>
    },
    Structure(Vec<Field>),
    Path {
        header: Option<Box<Type>>,
        node: Box<Type>
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub start: Position,
    pub end: Position
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f,"INTEGER"),
            Self::Real => write!(f,"REAL"),
            Self::Boolean => write!(f,"BOOLEAN"),
            Self::String(len) => write!(f,"STRING[{}]",len),
            Self::Position => write!(f,"POSITION"),
            Self::Xyzwpr => write!(f,"XYZWPR"),
            Self::XyzwprExt => write!(f,"XYZWPREXT"),
            Self::JointPos(Some(n)) => write!(f,"JOINTPOS{}",n),
            Self::JointPos(None) => write!(f,"JOINTPOS"),
            Self::Vector => write!(f,"VECTOR"),
            Self::Config => write!(f,"CONFIG"),
            Self::File => write!(f,"FILE"),
            Self::Short => write!(f,"SHORT"),
            Self::Byte => write!(f,"BYTE")
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Scalar(s) => write!(f,"{}",s),
            TypeKind::Named(n) => write!(f,"{}",n),
            TypeKind::Array { bounds, element } => {
                let b: Vec<String> = bounds.iter().map(|x| match x {
                    ArrayBound::Fixed(e) => e.to_string(),
                    ArrayBound::Unspecified => "*".to_string()
                }).collect();
                write!(f,"ARRAY[{}] OF {}",b.join(","),element)
            },
            TypeKind::Structure(fields) => write!(f,"STRUCTURE ({} fields)",fields.len()),
            TypeKind::Path { node, .. } => write!(f,"PATH NODEDATA = {}",node)
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct SelectCase {
    pub values: Vec<Expression>,
    pub body: Vec<Statement>
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum ForDirection {
    Up,
    Down
}

#[derive(Clone,Debug,PartialEq)]
pub struct CallStatement {
    pub name: String,
    pub name_start: Position,
    pub name_end: Position,
    pub arguments: Vec<Expression>
}

#[derive(Clone,Debug,PartialEq)]
pub enum StatementKind {
    Assignment {
        target: Expression,
        value: Expression
    },
    /// includes the built in `WRITE` and `READ`
    Call(CallStatement),
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>
    },
    For {
        counter: String,
        initial: Expression,
        direction: ForDirection,
        limit: Expression,
        body: Vec<Statement>
    },
    While {
        condition: Expression,
        body: Vec<Statement>
    },
    Repeat {
        body: Vec<Statement>,
        condition: Expression
    },
    Select {
        subject: Expression,
        cases: Vec<SelectCase>,
        else_branch: Option<Vec<Statement>>
    },
    Return(Option<Expression>),
    Goto(String),
    Label(String),
    Delay(Expression),
    WaitFor(Expression),
    Abort,
    Pause
}

#[derive(Clone,Debug,PartialEq)]
pub struct Statement {
    /// 1-based row in the source file
    pub line_number: u32,
    pub kind: StatementKind,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Modulo
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntegerDivide => "DIV",
            Self::Modulo => "MOD"
        };
        write!(f,"{}",s)
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum ExpressionKind {
    Number(String),
    String(String),
    Boolean(bool),
    Identifier(String),
    /// `$NAME`
    SystemVariable(String),
    /// `[prog]name`
    ProgramVariable {
        program: String,
        name: String
    },
    Index {
        base: Box<Expression>,
        indices: Vec<Expression>
    },
    Field {
        base: Box<Expression>,
        name: String
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>
    },
    Parenthesized(Box<Expression>)
}

#[derive(Clone,Debug,PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub start: Position,
    pub end: Position
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Number(n) => write!(f,"{}",n),
            ExpressionKind::String(s) => write!(f,"'{}'",s),
            ExpressionKind::Boolean(true) => write!(f,"TRUE"),
            ExpressionKind::Boolean(false) => write!(f,"FALSE"),
            ExpressionKind::Identifier(s) | ExpressionKind::SystemVariable(s) => write!(f,"{}",s),
            ExpressionKind::ProgramVariable { program, name } => write!(f,"[{}]{}",program,name),
            ExpressionKind::Index { base, indices } => {
                let idx: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f,"{}[{}]",base,idx.join(","))
            },
            ExpressionKind::Field { base, name } => write!(f,"{}.{}",base,name),
            ExpressionKind::Call { callee, arguments } => {
                let args: Vec<String> = arguments.iter().map(|i| i.to_string()).collect();
                write!(f,"{}({})",callee,args.join(","))
            },
            ExpressionKind::Unary { op: UnaryOp::Not, operand } => write!(f,"NOT {}",operand),
            ExpressionKind::Unary { op: UnaryOp::Negate, operand } => write!(f,"-{}",operand),
            ExpressionKind::Unary { op: UnaryOp::Plus, operand } => write!(f,"+{}",operand),
            ExpressionKind::Binary { op, left, right } => write!(f,"{} {} {}",left,op,right),
            ExpressionKind::Parenthesized(inner) => write!(f,"({})",inner)
        }
    }
}

impl Program {
    /// Iterate over every variable declared at program level
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.declarations.iter().filter_map(|d| match &d.kind {
            DeclarationKind::Variables(v) => Some(v.iter()),
            _ => None
        }).flatten()
    }
    pub fn types(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.iter().filter_map(|d| match &d.kind {
            DeclarationKind::Types(v) => Some(v.iter()),
            _ => None
        }).flatten()
    }
    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.declarations.iter().filter_map(|d| match &d.kind {
            DeclarationKind::Constants(v) => Some(v.iter()),
            _ => None
        }).flatten()
    }
    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.declarations.iter().filter_map(|d| match &d.kind {
            DeclarationKind::Routine(r) => Some(r),
            _ => None
        })
    }
    /// Case insensitive variable lookup
    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.variables().find(|v| v.name.eq_ignore_ascii_case(name))
    }
    /// Case insensitive type lookup
    pub fn find_type(&self, name: &str) -> Option<&TypeDeclaration> {
        self.types().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}
