//! Type and value model shared by the checker and the generator.
//!
//! [`Type`] is a closed sum of the language's kinds, each carrying its own
//! generic payload (a number's unit, a function's signature). [`Value`]
//! mirrors it with concrete data and is only produced during generation.

use std::fmt;
use std::rc::Rc;

use super::builtins::Builtin;
use super::error::TypeError;
use super::ir::{Bus, Effect, Instrument, RoutingSource};
use crate::pattern::Pattern;

/// A unit tag on a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Bpm,
    Bars,
    Beats,
    Steps,
    Seconds,
    Hertz,
    Decibels,
}

impl Unit {
    pub const ALL: [Unit; 7] = [
        Unit::Bpm,
        Unit::Bars,
        Unit::Beats,
        Unit::Steps,
        Unit::Seconds,
        Unit::Hertz,
        Unit::Decibels,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Bpm => "bpm",
            Unit::Bars => "bars",
            Unit::Beats => "beats",
            Unit::Steps => "steps",
            Unit::Seconds => "s",
            Unit::Hertz => "hz",
            Unit::Decibels => "db",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Unit> {
        Unit::ALL.into_iter().find(|u| u.suffix() == suffix)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A number paired with its unit. `unit: None` is a plain number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl Number {
    pub fn new(value: f64, unit: Option<Unit>) -> Self {
        Self { value, unit }
    }

    pub fn unitless(value: f64) -> Self {
        Self { value, unit: None }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} {unit}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// One named slot of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Any of these types is accepted.
    pub accepts: Vec<Type>,
    pub required: bool,
}

impl Field {
    pub fn required(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            accepts: vec![ty],
            required: true,
        }
    }

    pub fn optional(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            accepts: vec![ty],
            required: false,
        }
    }

    /// Also accept `ty`.
    pub fn or(mut self, ty: Type) -> Self {
        self.accepts.push(ty);
        self
    }

    pub fn accepts(&self, ty: &Type) -> bool {
        self.accepts.iter().any(|t| t == ty)
    }

    /// The accepted types joined for messages, e.g. `number<bars> or number<beats>`.
    pub fn expected(&self) -> String {
        let names: Vec<String> = self.accepts.iter().map(Type::to_string).collect();
        names.join(" or ")
    }
}

/// An ordered list of named, typed slots: the parameters of a function or
/// the properties of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The argument schema and return type of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub parameters: Schema,
    pub returns: Type,
}

/// The member types of a built-in module.
#[derive(Debug, Clone)]
pub struct ModuleType {
    pub name: String,
    pub members: Vec<(String, Type)>,
}

impl ModuleType {
    pub fn member(&self, name: &str) -> Option<&Type> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// The shape of a value.
#[derive(Debug, Clone)]
pub enum Type {
    Number(Option<Unit>),
    String,
    Pattern,
    Instrument,
    Bus,
    Effect,
    Group,
    Function(Rc<Signature>),
    Module(Rc<ModuleType>),
}

impl Type {
    pub const UNITLESS: Type = Type::Number(None);

    pub fn number(unit: Unit) -> Type {
        Type::Number(Some(unit))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Number(_) => "number",
            Type::String => "string",
            Type::Pattern => "pattern",
            Type::Instrument => "instrument",
            Type::Bus => "bus",
            Type::Effect => "effect",
            Type::Group => "group",
            Type::Function(_) => "function",
            Type::Module(_) => "module",
        }
    }

    /// Whether values of this type can be combined with `+` into a group.
    pub fn is_summable(&self) -> bool {
        matches!(self, Type::Instrument | Type::Bus | Type::Group)
    }

    /// Whether `value` has exactly this type.
    pub fn is(&self, value: &Value) -> bool {
        value.ty() == *self
    }

    /// `value` itself if it has this type.
    pub fn cast<'v>(&self, value: &'v Value) -> Result<&'v Value, TypeError> {
        if self.is(value) {
            Ok(value)
        } else {
            Err(TypeError::cannot_cast(value.ty(), self))
        }
    }
}

/// Kinds compare by name; numbers also compare units. Every function type
/// equals every other function type regardless of signature, and modules
/// compare by name only.
impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number(a), Type::Number(b)) => a == b,
            (Type::Function(_), Type::Function(_)) => true,
            (Type::Module(a), Type::Module(b)) => a.name == b.name,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number(Some(unit)) => write!(f, "number<{unit}>"),
            Type::Module(module) => write!(f, "module<{}>", module.name),
            other => f.write_str(other.kind_name()),
        }
    }
}

/// A built-in module value: named members reachable with `module.member`.
#[derive(Debug)]
pub struct Module {
    pub ty: Rc<ModuleType>,
    pub members: Vec<(String, Value)>,
}

impl Module {
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A concrete value produced while generating a program.
#[derive(Debug, Clone)]
pub enum Value {
    Number(Number),
    String(String),
    Pattern(Pattern),
    Instrument(Instrument),
    Bus(Bus),
    Effect(Effect),
    /// An ordered set of routable sources built with `+`.
    Group(Vec<RoutingSource>),
    Function(Rc<Builtin>),
    Module(Rc<Module>),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Number(n) => Type::Number(n.unit),
            Value::String(_) => Type::String,
            Value::Pattern(_) => Type::Pattern,
            Value::Instrument(_) => Type::Instrument,
            Value::Bus(_) => Type::Bus,
            Value::Effect(_) => Type::Effect,
            Value::Group(_) => Type::Group,
            Value::Function(builtin) => Type::Function(builtin.signature.clone()),
            Value::Module(module) => Type::Module(module.ty.clone()),
        }
    }

    fn mismatch(&self, expected: &str) -> TypeError {
        TypeError::cannot_cast(self.ty(), expected)
    }

    pub fn as_number(&self) -> Result<Number, TypeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn as_string(&self) -> Result<&str, TypeError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_pattern(&self) -> Result<&Pattern, TypeError> {
        match self {
            Value::Pattern(p) => Ok(p),
            other => Err(other.mismatch("pattern")),
        }
    }

    pub fn as_instrument(&self) -> Result<&Instrument, TypeError> {
        match self {
            Value::Instrument(i) => Ok(i),
            other => Err(other.mismatch("instrument")),
        }
    }

    pub fn as_bus(&self) -> Result<&Bus, TypeError> {
        match self {
            Value::Bus(b) => Ok(b),
            other => Err(other.mismatch("bus")),
        }
    }

    pub fn as_effect(&self) -> Result<&Effect, TypeError> {
        match self {
            Value::Effect(e) => Ok(e),
            other => Err(other.mismatch("effect")),
        }
    }

    pub fn as_function(&self) -> Result<&Rc<Builtin>, TypeError> {
        match self {
            Value::Function(f) => Ok(f),
            other => Err(other.mismatch("function")),
        }
    }

    pub fn as_module(&self) -> Result<&Rc<Module>, TypeError> {
        match self {
            Value::Module(m) => Ok(m),
            other => Err(other.mismatch("module")),
        }
    }

    /// The routable sources of an instrument, bus, or group.
    pub fn as_sources(&self) -> Result<Vec<RoutingSource>, TypeError> {
        match self {
            Value::Instrument(i) => Ok(vec![RoutingSource::Instrument(i.id)]),
            Value::Bus(b) => Ok(vec![RoutingSource::Bus(b.id)]),
            Value::Group(sources) => Ok(sources.clone()),
            other => Err(other.mismatch("group")),
        }
    }
}
