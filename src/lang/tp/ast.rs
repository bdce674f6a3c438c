//! Syntax tree for TP programs.
//!
//! Every node that corresponds to visible syntax carries its start and end position.
//! Nodes are built once by the parser and never mutated.

use std::fmt;
use crate::lang::combinators::Position;

#[derive(Clone,Debug,PartialEq)]
pub struct Program {
    pub name: String,
    /// optional word after the name on the `/PROG` line, e.g. `Macro`
    pub sub_type: Option<String>,
    /// value of `COMMENT` in the attribute section
    pub comment: Option<String>,
    /// first contiguous run of comment instructions, one line per comment
    pub header_comment: String,
    pub instructions: Vec<Instruction>,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct Instruction {
    /// 1-based row in the source file
    pub line_number: u32,
    pub kind: InstructionKind,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub enum InstructionKind {
    Blank,
    /// `!text`
    Comment(String),
    /// `//text`, a line that has been commented out
    Remark(String),
    Label(LabelDefinition),
    Jump(LabelReference),
    Call(CallInstruction),
    Run(CallInstruction),
    Motion(MotionInstruction),
    Assignment(Assignment),
    /// `IF cond,action`
    If(ConditionalInstruction),
    /// `IF cond THEN`
    IfThen(Expression),
    Else,
    EndIf,
    For(ForInstruction),
    EndFor,
    Select(SelectInstruction),
    /// `=value,action` following a select
    Case(CaseBranch),
    /// `ELSE,action` following a select
    CaseElse(Action),
    Wait(WaitInstruction),
    SkipCondition(Expression),
    Message(String),
    End,
    Pause,
    Abort
}

#[derive(Clone,Debug,PartialEq)]
pub struct LabelDefinition {
    pub id: u32,
    pub comment: Option<String>,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub enum LabelTarget {
    Direct(u32),
    Indirect(Expression)
}

/// `LBL[n]` or `LBL[R[n]]` in a jump, skip, or timeout
#[derive(Clone,Debug,PartialEq)]
pub struct LabelReference {
    pub target: LabelTarget,
    pub start: Position,
    pub end: Position
}

impl LabelReference {
    pub fn direct_id(&self) -> Option<u32> {
        match &self.target {
            LabelTarget::Direct(id) => Some(*id),
            LabelTarget::Indirect(_) => None
        }
    }
}

/// Used for both `CALL` and `RUN`
#[derive(Clone,Debug,PartialEq)]
pub struct CallInstruction {
    pub name: String,
    pub name_start: Position,
    pub name_end: Position,
    pub arguments: Vec<Expression>
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum MotionType {
    Joint,
    Linear,
    Circular,
    CircularArc
}

#[derive(Clone,Debug,PartialEq)]
pub enum SpeedUnit {
    Percent,
    MillimetersPerSecond,
    CentimetersPerMinute,
    InchesPerMinute,
    DegreesPerSecond,
    Seconds,
    Milliseconds
}

#[derive(Clone,Debug,PartialEq)]
pub enum Speed {
    Value {
        value: Expression,
        unit: SpeedUnit
    },
    Max
}

#[derive(Clone,Debug,PartialEq)]
pub enum Termination {
    Fine,
    Continuous(Expression),
    CornerRegion(Expression)
}

#[derive(Clone,Debug,PartialEq)]
pub enum MotionOptionKind {
    Skip(LabelReference),
    SkipJump(LabelReference),
    Acceleration(Expression),
    Offset(Option<Expression>),
    ToolOffset(Option<Expression>),
    Incremental,
    Flag(String)
}

#[derive(Clone,Debug,PartialEq)]
pub struct MotionOption {
    pub kind: MotionOptionKind,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct MotionInstruction {
    pub motion_type: MotionType,
    pub destination: Expression,
    pub speed: Speed,
    pub termination: Termination,
    pub options: Vec<MotionOption>
}

#[derive(Clone,Debug,PartialEq)]
pub struct Assignment {
    pub target: Expression,
    pub value: Expression
}

/// The inner instruction of a conditional or select branch
#[derive(Clone,Debug,PartialEq)]
pub enum ActionKind {
    Jump(LabelReference),
    Call(CallInstruction),
    Run(CallInstruction),
    Assignment(Assignment)
}

#[derive(Clone,Debug,PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub start: Position,
    pub end: Position
}

#[derive(Clone,Debug,PartialEq)]
pub struct ConditionalInstruction {
    pub condition: Expression,
    pub action: Action
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum ForDirection {
    Up,
    Down
}

#[derive(Clone,Debug,PartialEq)]
pub struct ForInstruction {
    pub counter: Expression,
    pub initial: Expression,
    pub direction: ForDirection,
    pub limit: Expression
}

#[derive(Clone,Debug,PartialEq)]
pub struct CaseBranch {
    pub value: Expression,
    pub action: Action
}

#[derive(Clone,Debug,PartialEq)]
pub struct SelectInstruction {
    pub subject: Expression,
    pub branch: CaseBranch
}

#[derive(Clone,Debug,PartialEq)]
pub enum WaitInstruction {
    /// `WAIT 1.00(sec)`
    Delay(Expression),
    Condition {
        condition: Expression,
        timeout: Option<LabelReference>
    }
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum UnaryOp {
    Not,
    Negate
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

/// Register-like data such as `R[1]`, `PR[2,3]`, `DI[4:sensor]`, `P[1]`
#[derive(Clone,Debug,PartialEq)]
pub struct Register {
    pub kind: String,
    pub indices: Vec<Expression>,
    pub comment: Option<String>
}

#[derive(Clone,Debug,PartialEq)]
pub enum ExpressionKind {
    Number(String),
    String(String),
    Identifier(String),
    Register(Register),
    /// full text of the reference, e.g. `$SPEED` or `$[PROG]VAR.FIELD`
    SystemVariable(String),
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

impl Instruction {
    /// The action wrapped by a conditional or select branch, if any
    pub fn action(&self) -> Option<&Action> {
        match &self.kind {
            InstructionKind::If(cond) => Some(&cond.action),
            InstructionKind::Select(sel) => Some(&sel.branch.action),
            InstructionKind::Case(case) => Some(&case.action),
            InstructionKind::CaseElse(action) => Some(action),
            _ => None
        }
    }
    /// The call-by-name part of this instruction, looking inside wrappers.
    /// A `RUN` counts as a call.
    pub fn call(&self) -> Option<&CallInstruction> {
        match &self.kind {
            InstructionKind::Call(call) | InstructionKind::Run(call) => Some(call),
            _ => match self.action() {
                Some(Action { kind: ActionKind::Call(call), .. }) => Some(call),
                Some(Action { kind: ActionKind::Run(call), .. }) => Some(call),
                _ => None
            }
        }
    }
    /// Every label reference made by this instruction
    pub fn label_references(&self) -> Vec<&LabelReference> {
        let mut ans = Vec::new();
        match &self.kind {
            InstructionKind::Jump(lbl) => ans.push(lbl),
            InstructionKind::Motion(motion) => {
                for opt in &motion.options {
                    match &opt.kind {
                        MotionOptionKind::Skip(lbl) | MotionOptionKind::SkipJump(lbl) => ans.push(lbl),
                        _ => {}
                    }
                }
            },
            InstructionKind::Wait(WaitInstruction::Condition { timeout: Some(lbl), .. }) => ans.push(lbl),
            _ => {
                if let Some(Action { kind: ActionKind::Jump(lbl), .. }) = self.action() {
                    ans.push(lbl);
                }
            }
        }
        ans
    }
}

impl Program {
    /// Find the label definition with the given id
    pub fn find_label(&self, id: u32) -> Option<(&Instruction,&LabelDefinition)> {
        for instr in &self.instructions {
            if let InstructionKind::Label(def) = &instr.kind {
                if def.id == id {
                    return Some((instr,def));
                }
            }
        }
        None
    }
    /// Instruction starting on the given 1-based row
    pub fn instruction_at_line(&self, line_number: u32) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.line_number == line_number)
    }
}
