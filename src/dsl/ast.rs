//! Abstract Syntax Tree for the track language.
//!
//! Every node carries the [`SourceRange`] it was parsed from so later stages
//! can point diagnostics at it.

use super::error::SourceRange;
use super::types::Unit;

/// A complete source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub range: SourceRange,
}

impl Program {
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Assignment(a) => Some(a),
            _ => None,
        })
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackStatement> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Track(t) => Some(t),
            _ => None,
        })
    }

    pub fn mixers(&self) -> impl Iterator<Item = &MixerStatement> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Mixer(m) => Some(m),
            _ => None,
        })
    }
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment(Assignment),
    Track(TrackStatement),
    Mixer(MixerStatement),
}

/// `name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: Identifier,
    pub value: Expression,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub range: SourceRange,
}

/// `name: expr` inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: Identifier,
    pub value: Expression,
    pub range: SourceRange,
}

/// `destination << source`. Chains are split into one routing per link.
#[derive(Debug, Clone, PartialEq)]
pub struct Routing {
    pub destination: Expression,
    pub source: Expression,
    pub range: SourceRange,
}

/// `track { property* section* }`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStatement {
    pub properties: Vec<Property>,
    pub sections: Vec<SectionStatement>,
    pub range: SourceRange,
}

/// `section name for length { (property | routing)* }`
#[derive(Debug, Clone, PartialEq)]
pub struct SectionStatement {
    pub name: Identifier,
    pub length: Expression,
    pub properties: Vec<Property>,
    pub routings: Vec<Routing>,
    pub range: SourceRange,
}

/// `mixer { (property | bus | routing)* }`
#[derive(Debug, Clone, PartialEq)]
pub struct MixerStatement {
    pub properties: Vec<Property>,
    pub buses: Vec<BusStatement>,
    pub routings: Vec<Routing>,
    pub range: SourceRange,
}

/// `bus name { (property | effect)* }`
#[derive(Debug, Clone, PartialEq)]
pub struct BusStatement {
    pub name: Identifier,
    pub properties: Vec<Property>,
    pub effects: Vec<EffectStatement>,
    pub range: SourceRange,
}

/// `effect expr`
#[derive(Debug, Clone, PartialEq)]
pub struct EffectStatement {
    pub effect: Expression,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Number(NumberLiteral),
    String(StringLiteral),
    Pattern(PatternLiteral),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Call(Call),
    Member(MemberExpression),
}

impl Expression {
    pub fn range(&self) -> SourceRange {
        match self {
            Expression::Identifier(e) => e.range,
            Expression::Number(e) => e.range,
            Expression::String(e) => e.range,
            Expression::Pattern(e) => e.range,
            Expression::Unary(e) => e.range,
            Expression::Binary(e) => e.range,
            Expression::Call(e) => e.range,
            Expression::Member(e) => e.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
    pub unit: Option<Unit>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub range: SourceRange,
}

/// `callee(arguments)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Box<Expression>,
    pub arguments: Vec<Argument>,
    pub range: SourceRange,
}

/// A positional (`expr`) or named (`name: expr`) argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<Identifier>,
    pub value: Expression,
    pub range: SourceRange,
}

/// `object.member`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub member: Identifier,
    pub range: SourceRange,
}

/// A bracketed pattern, `[...]` or `<...>`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternLiteral {
    pub root: PatternNode,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternNode {
    Step(StepLiteral),
    /// `[a b c]` — children one after another.
    Serial(Vec<PatternNode>, SourceRange),
    /// `<a b c>` — children layered on top of each other.
    Parallel(Vec<PatternNode>, SourceRange),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepSymbol {
    Rest,
    Hit,
    Note(String),
}

/// `symbol(arguments):length`
#[derive(Debug, Clone, PartialEq)]
pub struct StepLiteral {
    pub symbol: StepSymbol,
    pub arguments: Vec<Argument>,
    pub length: Option<NumberLiteral>,
    pub range: SourceRange,
}
