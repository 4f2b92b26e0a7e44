//! Generator — evaluates a checked AST into the Program IR.
//!
//! Runs only on programs the checker accepted. Anything that still goes
//! wrong here is a checker/generator mismatch and surfaces as an
//! [`InternalError`], never as a user diagnostic.

use super::ast::*;
use super::builtins::{Arguments, Context, Registry};
use super::error::{InternalError, SourceRange};
use super::ir;
use super::note::parse_note;
use super::schema;
use super::scope::Scope;
use super::types::{Number, Schema, Unit, Value};
use crate::config::CompileOptions;
use crate::pattern::{Pattern, Step, Trigger};

/// Build the Program IR for a checked `program`.
pub fn generate(
    program: &Program,
    registry: &Registry,
    options: &CompileOptions,
) -> Result<ir::Program, InternalError> {
    let mut generator = Generator::new(registry, options);

    for assignment in program.assignments() {
        let value = generator.evaluate(&assignment.value)?;
        generator.scope.bind(assignment.name.name.clone(), value);
    }

    let track = match program.tracks().next() {
        Some(track) => generator.track(track)?,
        None => ir::Track {
            tempo: generator.tempo(None)?,
            sections: Vec::new(),
        },
    };

    let mixer = match program.mixers().next() {
        Some(mixer) => generator.mixer(mixer)?,
        None => ir::Mixer {
            gain: 0.0,
            buses: Vec::new(),
            routings: Vec::new(),
        },
    };

    let instruments = generator.context.into_instruments();
    log::debug!(
        "generated {} instruments, {} sections, {} buses",
        instruments.len(),
        track.sections.len(),
        mixer.buses.len()
    );

    Ok(ir::Program {
        beats_per_bar: options.beats_per_bar,
        steps_per_beat: options.steps_per_beat,
        instruments,
        track,
        mixer,
    })
}

struct Generator<'o> {
    options: &'o CompileOptions,
    scope: Scope<Value>,
    context: Context,
}

impl<'o> Generator<'o> {
    fn new(registry: &Registry, options: &'o CompileOptions) -> Self {
        let mut scope = Scope::new();
        for (name, value) in registry.iter() {
            scope.bind(name, value.clone());
        }
        scope.push();
        Self {
            options,
            scope,
            context: Context::new(),
        }
    }

    // --- Blocks ---

    fn track(&mut self, track: &TrackStatement) -> Result<ir::Track, InternalError> {
        let tempo = self.tempo(find_property(&track.properties, "tempo"))?;

        let mut sections = Vec::with_capacity(track.sections.len());
        for section in &track.sections {
            sections.push(self.section(section)?);
        }

        Ok(ir::Track { tempo, sections })
    }

    fn tempo(&mut self, property: Option<&Property>) -> Result<Number, InternalError> {
        let bpm = match property {
            Some(property) => self.evaluate(&property.value)?.as_number()?.value,
            None => self.options.tempo.default,
        };
        let clamped = self.options.clamp_tempo(bpm);
        if clamped != bpm {
            log::debug!("tempo {bpm} clamped to {clamped}");
        }
        Ok(Number::new(clamped, Some(Unit::Bpm)))
    }

    fn section(&mut self, section: &SectionStatement) -> Result<ir::Section, InternalError> {
        let length = self.evaluate(&section.length)?.as_number()?;
        let steps_per_beat = f64::from(self.options.steps_per_beat);
        let length = match length.unit {
            Some(Unit::Bars) => {
                length.value * f64::from(self.options.beats_per_bar) * steps_per_beat
            }
            Some(Unit::Beats) => length.value * steps_per_beat,
            Some(Unit::Steps) => length.value,
            _ => {
                return Err(InternalError::at(
                    format!("section length {length} has no time unit"),
                    section.length.range(),
                ))
            }
        };

        let mut routings = Vec::with_capacity(section.routings.len());
        for routing in &section.routings {
            let destination = self.evaluate(&routing.destination)?.as_instrument()?.id;
            let source = self.evaluate(&routing.source)?.as_pattern()?.clone();
            routings.push(ir::SectionRouting {
                source,
                destination,
            });
        }

        Ok(ir::Section {
            name: section.name.name.clone(),
            length,
            routings,
        })
    }

    fn mixer(&mut self, mixer: &MixerStatement) -> Result<ir::Mixer, InternalError> {
        self.scope.push();
        let result = self.mixer_body(mixer);
        self.scope.pop();
        result
    }

    fn mixer_body(&mut self, mixer: &MixerStatement) -> Result<ir::Mixer, InternalError> {
        let gain = self.number_property(&mixer.properties, "gain", 0.0)?;

        let mut buses = Vec::with_capacity(mixer.buses.len());
        for (index, statement) in mixer.buses.iter().enumerate() {
            let bus = self.bus(ir::BusId(index as u32), statement)?;
            self.scope
                .bind(statement.name.name.clone(), Value::Bus(bus.clone()));
            buses.push(bus);
        }

        let mut routings = Vec::new();
        for routing in &mixer.routings {
            let destination = self.evaluate(&routing.destination)?.as_bus()?.id;
            for source in self.evaluate(&routing.source)?.as_sources()? {
                routings.push(ir::MixerRouting {
                    source,
                    destination,
                });
            }
        }

        Ok(ir::Mixer {
            gain,
            buses,
            routings,
        })
    }

    fn bus(&mut self, id: ir::BusId, bus: &BusStatement) -> Result<ir::Bus, InternalError> {
        let gain = self.number_property(&bus.properties, "gain", 0.0)?;
        let pan = self
            .number_property(&bus.properties, "pan", 0.0)?
            .clamp(-1.0, 1.0);

        let mut effects = Vec::with_capacity(bus.effects.len());
        for effect in &bus.effects {
            effects.push(self.evaluate(&effect.effect)?.as_effect()?.clone());
        }

        Ok(ir::Bus {
            id,
            name: bus.name.name.clone(),
            gain,
            pan,
            effects,
        })
    }

    fn number_property(
        &mut self,
        properties: &[Property],
        name: &str,
        default: f64,
    ) -> Result<f64, InternalError> {
        match find_property(properties, name) {
            Some(property) => Ok(self.evaluate(&property.value)?.as_number()?.value),
            None => Ok(default),
        }
    }

    // --- Expressions ---

    fn evaluate(&mut self, expr: &Expression) -> Result<Value, InternalError> {
        match expr {
            Expression::Identifier(ident) => self.scope.lookup(&ident.name).cloned().ok_or_else(|| {
                InternalError::at(format!("unresolved identifier '{}'", ident.name), ident.range)
            }),
            Expression::Number(n) => Ok(Value::Number(Number::new(n.value, n.unit))),
            Expression::String(s) => Ok(Value::String(s.value.clone())),
            Expression::Pattern(p) => {
                Ok(Value::Pattern(Pattern::new(self.pattern_steps(&p.root)?)))
            }
            Expression::Unary(unary) => {
                let operand = self.evaluate(&unary.operand)?.as_number()?;
                let value = match unary.operator {
                    UnaryOperator::Plus => operand.value,
                    UnaryOperator::Minus => -operand.value,
                };
                Ok(Value::Number(Number::new(value, operand.unit)))
            }
            Expression::Binary(binary) => {
                let left = self.evaluate(&binary.left)?;
                let right = self.evaluate(&binary.right)?;
                let (left_ty, right_ty) = (left.ty(), right.ty());
                arithmetic(binary.operator, left, right).ok_or_else(|| {
                    InternalError::at(
                        format!(
                            "operator '{}' applied to {left_ty} and {right_ty}",
                            binary.operator.symbol()
                        ),
                        binary.range,
                    )
                })
            }
            Expression::Call(call) => {
                let callee = self.evaluate(&call.callee)?;
                let builtin = callee.as_function()?.clone();
                let arguments =
                    self.arguments(&builtin.signature.parameters, &call.arguments, call.range)?;
                builtin.call(&mut self.context, &arguments)
            }
            Expression::Member(member) => {
                let object = self.evaluate(&member.object)?;
                let module = object.as_module()?;
                module.member(&member.member.name).cloned().ok_or_else(|| {
                    let message = format!(
                        "module '{}' has no member '{}'",
                        module.ty.name, member.member.name
                    );
                    InternalError::at(message, member.member.range)
                })
            }
        }
    }

    /// Evaluate `arguments` in source order, then place them in schema order.
    fn arguments(
        &mut self,
        schema: &Schema,
        arguments: &[Argument],
        range: SourceRange,
    ) -> Result<Arguments, InternalError> {
        let binding = schema::bind(schema, arguments);
        if let Some(&(index, problem)) = binding.problems.first() {
            return Err(InternalError::at(
                format!("argument {index} could not be bound ({problem:?})"),
                range,
            ));
        }

        let mut evaluated = Vec::with_capacity(arguments.len());
        for argument in arguments {
            evaluated.push(Some(self.evaluate(&argument.value)?));
        }
        let values = binding
            .slots
            .iter()
            .map(|slot| slot.and_then(|index| evaluated[index].take()))
            .collect();
        Ok(Arguments::new(values))
    }

    // --- Patterns ---

    fn pattern_steps(&mut self, node: &PatternNode) -> Result<Vec<Step>, InternalError> {
        match node {
            PatternNode::Step(step) => Ok(vec![self.step(step)?]),
            PatternNode::Serial(children, _) => {
                let mut steps = Vec::new();
                for child in children {
                    steps.extend(self.pattern_steps(child)?);
                }
                Ok(steps)
            }
            PatternNode::Parallel(children, _) => {
                let mut voices = Vec::with_capacity(children.len());
                for child in children {
                    voices.push(self.pattern_steps(child)?);
                }
                let length = voices.iter().map(Vec::len).max().unwrap_or(0);
                Ok((0..length)
                    .map(|slot| {
                        Step::layer(
                            voices
                                .iter()
                                .map(|voice| voice.get(slot).cloned().unwrap_or(Step::Rest)),
                        )
                    })
                    .collect())
            }
        }
    }

    fn step(&mut self, step: &StepLiteral) -> Result<Step, InternalError> {
        let arguments = self.arguments(&schema::step(), &step.arguments, step.range)?;
        let trigger = Trigger {
            length: step.length.as_ref().map_or(1.0, |l| l.value),
            gate: arguments.number_or(0, 1.0)?.clamp(0.0, 1.0),
            velocity: arguments.number_or(1, 1.0)?.clamp(0.0, 1.0),
        };

        match &step.symbol {
            StepSymbol::Rest => Ok(Step::Rest),
            StepSymbol::Hit => Ok(Step::Hit(trigger)),
            StepSymbol::Note(name) => {
                let note = parse_note(name).ok_or_else(|| {
                    InternalError::at(format!("invalid note '{name}'"), step.range)
                })?;
                Ok(Step::Note(note, trigger))
            }
        }
    }
}

fn find_property<'p>(properties: &'p [Property], name: &str) -> Option<&'p Property> {
    properties.iter().find(|p| p.name.name == name)
}

/// Apply `operator` to two values, or `None` if the pair is not legal.
fn arithmetic(operator: BinaryOperator, left: Value, right: Value) -> Option<Value> {
    use BinaryOperator::*;

    let value = match (operator, &left, &right) {
        (Add, Value::Number(a), Value::Number(b)) if a.unit == b.unit => {
            Value::Number(Number::new(a.value + b.value, a.unit))
        }
        (Add, Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Add, Value::Pattern(a), Value::Pattern(b)) => Value::Pattern(a.concat(b)),
        (Add, _, _) => {
            let mut sources = left.as_sources().ok()?;
            sources.extend(right.as_sources().ok()?);
            Value::Group(sources)
        }
        (Subtract, Value::Number(a), Value::Number(b)) if a.unit == b.unit => {
            Value::Number(Number::new(a.value - b.value, a.unit))
        }
        (Multiply, Value::Number(a), Value::Number(b)) if a.unit.is_none() || b.unit.is_none() => {
            Value::Number(Number::new(a.value * b.value, a.unit.or(b.unit)))
        }
        (Multiply, Value::Pattern(p), Value::Number(n))
        | (Multiply, Value::Number(n), Value::Pattern(p))
            if n.unit.is_none() =>
        {
            Value::Pattern(p.multiply(n.value))
        }
        (Divide, Value::Number(a), Value::Number(b)) if b.unit.is_none() => {
            Value::Number(Number::new(a.value / b.value, a.unit))
        }
        (Divide, Value::Number(a), Value::Number(b)) if a.unit == b.unit => {
            Value::Number(Number::unitless(a.value / b.value))
        }
        (Divide, Value::Pattern(p), Value::Number(n)) if n.unit.is_none() => {
            Value::Pattern(p.multiply(1.0 / n.value))
        }
        _ => return None,
    };
    Some(value)
}
