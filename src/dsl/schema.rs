//! Block property schemas and argument binding.

use super::ast::Argument;
use super::types::{Field, Schema, Type, Unit};

/// `track { tempo? }`
pub fn track() -> Schema {
    Schema::new(vec![Field::optional("tempo", Type::number(Unit::Bpm))])
}

/// Sections take no properties yet.
pub fn section() -> Schema {
    Schema::default()
}

/// The `for <length>` clause of a section.
pub fn section_length() -> Field {
    Field::required("length", Type::number(Unit::Bars))
        .or(Type::number(Unit::Beats))
        .or(Type::number(Unit::Steps))
}

/// `mixer { gain? }`
pub fn mixer() -> Schema {
    Schema::new(vec![Field::optional("gain", Type::number(Unit::Decibels))])
}

/// `bus name { gain? pan? }`
pub fn bus() -> Schema {
    Schema::new(vec![
        Field::optional("gain", Type::number(Unit::Decibels)),
        Field::optional("pan", Type::UNITLESS),
    ])
}

/// Step arguments, e.g. `C4(0.5, velocity: 0.8)`.
pub fn step() -> Schema {
    Schema::new(vec![
        Field::optional("gate", Type::UNITLESS),
        Field::optional("velocity", Type::UNITLESS),
    ])
}

/// Why an argument could not be bound to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    /// A positional argument after a named one.
    Misplaced,
    /// More positional arguments than parameters.
    TooMany,
    Unknown,
    Duplicate,
}

impl Problem {
    pub fn is_positional(self) -> bool {
        matches!(self, Problem::Misplaced | Problem::TooMany)
    }
}

/// Arguments matched against a schema: positional first, then named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// For each schema field, the index of the argument bound to it.
    pub slots: Vec<Option<usize>>,
    /// Arguments that could not be bound, by argument index.
    pub problems: Vec<(usize, Problem)>,
}

pub fn bind(schema: &Schema, arguments: &[Argument]) -> Binding {
    let mut slots = vec![None; schema.len()];
    let mut problems = Vec::new();
    let mut next_positional = 0;
    let mut seen_named = false;

    for (index, argument) in arguments.iter().enumerate() {
        match &argument.name {
            None if seen_named => problems.push((index, Problem::Misplaced)),
            None if next_positional >= schema.len() => problems.push((index, Problem::TooMany)),
            None => {
                slots[next_positional] = Some(index);
                next_positional += 1;
            }
            Some(name) => {
                seen_named = true;
                match schema.position(&name.name) {
                    None => problems.push((index, Problem::Unknown)),
                    Some(slot) if slots[slot].is_some() => {
                        problems.push((index, Problem::Duplicate))
                    }
                    Some(slot) => slots[slot] = Some(index),
                }
            }
        }
    }

    Binding { slots, problems }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ast::{Expression, Identifier, NumberLiteral};
    use crate::dsl::error::SourceRange;

    fn arg(name: Option<&str>) -> Argument {
        Argument {
            name: name.map(|n| Identifier {
                name: n.to_string(),
                range: SourceRange::default(),
            }),
            value: Expression::Number(NumberLiteral {
                value: 1.0,
                unit: None,
                range: SourceRange::default(),
            }),
            range: SourceRange::default(),
        }
    }

    #[test]
    fn positional_then_named() {
        let binding = bind(&step(), &[arg(None), arg(Some("velocity"))]);
        assert_eq!(binding.slots, vec![Some(0), Some(1)]);
        assert!(binding.problems.is_empty());
    }

    #[test]
    fn named_only_in_any_order() {
        let binding = bind(&step(), &[arg(Some("velocity")), arg(Some("gate"))]);
        assert_eq!(binding.slots, vec![Some(1), Some(0)]);
    }

    #[test]
    fn positional_after_named_is_misplaced() {
        let binding = bind(&step(), &[arg(Some("gate")), arg(None)]);
        assert_eq!(binding.problems, vec![(1, Problem::Misplaced)]);
        assert_eq!(binding.slots, vec![Some(0), None]);
    }

    #[test]
    fn too_many_positional() {
        let binding = bind(&step(), &[arg(None), arg(None), arg(None)]);
        assert_eq!(binding.problems, vec![(2, Problem::TooMany)]);
    }

    #[test]
    fn unknown_and_duplicate_names() {
        let binding = bind(
            &step(),
            &[arg(None), arg(Some("gate")), arg(Some("swing"))],
        );
        assert_eq!(
            binding.problems,
            vec![(1, Problem::Duplicate), (2, Problem::Unknown)]
        );
    }
}
