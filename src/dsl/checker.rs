//! Checker — whole-program static analysis.
//!
//! Walks the AST once, resolving names against a [`Scope`] of types, and
//! collects every diagnostic it can find instead of stopping at the first.
//! A program with no diagnostics is safe to hand to the generator.

use super::ast::*;
use super::builtins::Registry;
use super::error::{CompileError, SourceRange};
use super::note::midi_number;
use super::schema::{self, Problem};
use super::scope::Scope;
use super::types::{Field, Schema, Type};

/// Check `program` and return all diagnostics.
///
/// Assignments are checked first, then track blocks, then mixer blocks.
pub fn check(program: &Program, registry: &Registry) -> Vec<CompileError> {
    let mut checker = Checker::new(registry);
    checker.check_program(program);
    let mut errors = checker.errors;
    // Routing chains can report the same problem twice in a row.
    errors.dedup();
    log::debug!("check found {} diagnostics", errors.len());
    errors
}

/// The type of `left op right`, or `None` if the operator does not apply.
pub fn binary_result(operator: BinaryOperator, left: &Type, right: &Type) -> Option<Type> {
    use Type::Number;

    match operator {
        BinaryOperator::Add => match (left, right) {
            (Number(a), Number(b)) if a == b => Some(Number(*a)),
            (Type::String, Type::String) => Some(Type::String),
            (Type::Pattern, Type::Pattern) => Some(Type::Pattern),
            _ if left.is_summable() && right.is_summable() => Some(Type::Group),
            _ => None,
        },
        BinaryOperator::Subtract => match (left, right) {
            (Number(a), Number(b)) if a == b => Some(Number(*a)),
            _ => None,
        },
        BinaryOperator::Multiply => match (left, right) {
            (Number(unit), Number(None)) | (Number(None), Number(unit)) => Some(Number(*unit)),
            (Type::Pattern, Number(None)) | (Number(None), Type::Pattern) => Some(Type::Pattern),
            _ => None,
        },
        BinaryOperator::Divide => match (left, right) {
            (Number(unit), Number(None)) => Some(Number(*unit)),
            (Number(a), Number(b)) if a == b => Some(Number(None)),
            (Type::Pattern, Number(None)) => Some(Type::Pattern),
            _ => None,
        },
    }
}

/// The type of `op operand`, or `None` if the operator does not apply.
pub fn unary_result(_operator: UnaryOperator, operand: &Type) -> Option<Type> {
    match operand {
        Type::Number(unit) => Some(Type::Number(*unit)),
        _ => None,
    }
}

/// A name's type, or `None` if its definition already failed to check.
type Binding = Option<Type>;

struct Checker {
    scope: Scope<Binding>,
    errors: Vec<CompileError>,
}

impl Checker {
    fn new(registry: &Registry) -> Self {
        let mut scope = Scope::new();
        for (name, value) in registry.iter() {
            scope.bind(name, Some(value.ty()));
        }
        scope.push();
        Self {
            scope,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, range: SourceRange) {
        self.errors.push(CompileError::check(message, range));
    }

    fn check_program(&mut self, program: &Program) {
        for assignment in program.assignments() {
            self.check_assignment(assignment);
        }
        for (i, track) in program.tracks().enumerate() {
            if i > 0 {
                self.error("only one track block is allowed", track.range);
            }
            self.check_track(track);
        }
        for (i, mixer) in program.mixers().enumerate() {
            if i > 0 {
                self.error("only one mixer block is allowed", mixer.range);
            }
            self.check_mixer(mixer);
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment) {
        let ty = self.check_expression(&assignment.value);
        let name = &assignment.name;
        if self.scope.lookup_local(&name.name).is_some() {
            self.error(format!("'{}' is already defined", name.name), name.range);
            return;
        }
        self.scope.bind(name.name.clone(), ty);
    }

    // --- Blocks ---

    fn check_track(&mut self, track: &TrackStatement) {
        self.check_properties(&schema::track(), &track.properties, track.range);

        let mut names: Vec<&str> = Vec::new();
        for section in &track.sections {
            if names.contains(&section.name.name.as_str()) {
                self.error(
                    format!("section '{}' is already defined", section.name.name),
                    section.name.range,
                );
            } else {
                names.push(&section.name.name);
            }
            self.check_section(section);
        }
    }

    fn check_section(&mut self, section: &SectionStatement) {
        let length = schema::section_length();
        if let Some(ty) = self.check_expression(&section.length) {
            if !length.accepts(&ty) {
                self.error(
                    format!("section length expects {}, got {ty}", length.expected()),
                    section.length.range(),
                );
            }
        }

        self.check_properties(&schema::section(), &section.properties, section.range);

        for routing in &section.routings {
            self.check_routing(routing, &[Type::Instrument], &[Type::Pattern]);
        }
    }

    fn check_mixer(&mut self, mixer: &MixerStatement) {
        self.scope.push();

        // Buses are visible to every routing, wherever they are declared.
        for bus in &mixer.buses {
            if self.scope.lookup_local(&bus.name.name).is_some() {
                self.error(
                    format!("bus '{}' is already defined", bus.name.name),
                    bus.name.range,
                );
            } else {
                self.scope.bind(bus.name.name.clone(), Some(Type::Bus));
            }
        }

        self.check_properties(&schema::mixer(), &mixer.properties, mixer.range);

        for bus in &mixer.buses {
            self.check_properties(&schema::bus(), &bus.properties, bus.range);
            for effect in &bus.effects {
                if let Some(ty) = self.check_expression(&effect.effect) {
                    if ty != Type::Effect {
                        self.error(
                            format!("expected effect, got {ty}"),
                            effect.effect.range(),
                        );
                    }
                }
            }
        }

        for routing in &mixer.routings {
            self.check_routing(
                routing,
                &[Type::Bus],
                &[Type::Instrument, Type::Bus, Type::Group],
            );
        }

        self.scope.pop();
    }

    fn check_routing(&mut self, routing: &Routing, destinations: &[Type], sources: &[Type]) {
        self.expect_one_of(&routing.destination, destinations, "routing destination");
        self.expect_one_of(&routing.source, sources, "routing source");
    }

    fn expect_one_of(&mut self, expr: &Expression, accepted: &[Type], what: &str) {
        let Some(ty) = self.check_expression(expr) else {
            return;
        };
        if !accepted.contains(&ty) {
            let names: Vec<String> = accepted.iter().map(Type::to_string).collect();
            self.error(
                format!("{what} expects {}, got {ty}", names.join(" or ")),
                expr.range(),
            );
        }
    }

    fn check_properties(&mut self, schema: &Schema, properties: &[Property], block: SourceRange) {
        let mut seen: Vec<&str> = Vec::new();

        for property in properties {
            let ty = self.check_expression(&property.value);
            let name = &property.name;

            let Some(field) = schema.field(&name.name) else {
                self.error(format!("unknown property '{}'", name.name), name.range);
                continue;
            };
            if seen.contains(&name.name.as_str()) {
                self.error(format!("duplicate property '{}'", name.name), name.range);
                continue;
            }
            seen.push(&name.name);

            if let Some(ty) = ty {
                if !field.accepts(&ty) {
                    self.error(
                        format!(
                            "property '{}' expects {}, got {ty}",
                            name.name,
                            field.expected()
                        ),
                        property.value.range(),
                    );
                }
            }
        }

        for field in schema.fields.iter().filter(|f| f.required) {
            if !seen.contains(&field.name.as_str()) {
                self.error(format!("missing required property '{}'", field.name), block);
            }
        }
    }

    // --- Expressions ---

    fn check_expression(&mut self, expr: &Expression) -> Option<Type> {
        match expr {
            Expression::Identifier(ident) => match self.scope.lookup(&ident.name) {
                Some(binding) => binding.clone(),
                None => {
                    self.error(format!("undefined identifier '{}'", ident.name), ident.range);
                    None
                }
            },
            Expression::Number(n) => Some(Type::Number(n.unit)),
            Expression::String(_) => Some(Type::String),
            Expression::Pattern(p) => {
                self.check_pattern_node(&p.root);
                Some(Type::Pattern)
            }
            Expression::Unary(unary) => {
                let operand = self.check_expression(&unary.operand)?;
                let result = unary_result(unary.operator, &operand);
                if result.is_none() {
                    self.error(
                        format!(
                            "operator '{}' cannot be applied to {operand}",
                            unary.operator.symbol()
                        ),
                        unary.range,
                    );
                }
                result
            }
            Expression::Binary(binary) => {
                let left = self.check_expression(&binary.left);
                let right = self.check_expression(&binary.right);
                let (left, right) = (left?, right?);
                let result = binary_result(binary.operator, &left, &right);
                if result.is_none() {
                    self.error(
                        format!(
                            "operator '{}' cannot be applied to {left} and {right}",
                            binary.operator.symbol()
                        ),
                        binary.range,
                    );
                }
                result
            }
            Expression::Call(call) => self.check_call(call),
            Expression::Member(member) => {
                let object = self.check_expression(&member.object)?;
                match &object {
                    Type::Module(module) => match module.member(&member.member.name) {
                        Some(ty) => Some(ty.clone()),
                        None => {
                            self.error(
                                format!(
                                    "module '{}' has no member '{}'",
                                    module.name, member.member.name
                                ),
                                member.member.range,
                            );
                            None
                        }
                    },
                    other => {
                        self.error(format!("{other} has no members"), member.object.range());
                        None
                    }
                }
            }
        }
    }

    fn check_call(&mut self, call: &Call) -> Option<Type> {
        let callee = self.check_expression(&call.callee);
        let signature = match callee {
            Some(Type::Function(signature)) => signature,
            Some(other) => {
                self.error(format!("{other} is not callable"), call.callee.range());
                self.check_argument_values(&call.arguments);
                return None;
            }
            None => {
                self.check_argument_values(&call.arguments);
                return None;
            }
        };
        self.check_arguments(&signature.parameters, &call.arguments, call.range, "argument");
        Some(signature.returns.clone())
    }

    fn check_argument_values(&mut self, arguments: &[Argument]) -> Vec<Option<Type>> {
        arguments
            .iter()
            .map(|a| self.check_expression(&a.value))
            .collect()
    }

    /// Bind `arguments` to `schema` and report everything that does not fit.
    fn check_arguments(
        &mut self,
        schema: &Schema,
        arguments: &[Argument],
        range: SourceRange,
        what: &str,
    ) {
        let types = self.check_argument_values(arguments);
        let binding = schema::bind(schema, arguments);

        for &(index, problem) in &binding.problems {
            let argument = &arguments[index];
            let name = argument.name.as_ref().map_or("", |n| n.name.as_str());
            let message = match problem {
                Problem::Misplaced => format!("positional {what} after named {what}"),
                Problem::TooMany => format!("too many {what}s"),
                Problem::Unknown => format!("unknown {what} '{name}'"),
                Problem::Duplicate => format!("duplicate {what} '{name}'"),
            };
            self.error(message, argument.range);
        }

        for (field, slot) in schema.fields.iter().zip(&binding.slots) {
            let Some(index) = *slot else { continue };
            if let Some(ty) = &types[index] {
                self.check_field(field, ty, &arguments[index].value, what);
            }
        }

        // An unbound positional argument that already failed may have been
        // meant for any missing parameter.
        let suppress_missing = binding
            .problems
            .iter()
            .any(|&(index, problem)| problem.is_positional() && types[index].is_none());
        if suppress_missing {
            return;
        }
        for (field, slot) in schema.fields.iter().zip(&binding.slots) {
            if field.required && slot.is_none() {
                self.error(format!("missing required {what} '{}'", field.name), range);
            }
        }
    }

    fn check_field(&mut self, field: &Field, ty: &Type, value: &Expression, what: &str) {
        if !field.accepts(ty) {
            self.error(
                format!("{what} '{}' expects {}, got {ty}", field.name, field.expected()),
                value.range(),
            );
        }
    }

    // --- Patterns ---

    fn check_pattern_node(&mut self, node: &PatternNode) {
        match node {
            PatternNode::Step(step) => self.check_step(step),
            PatternNode::Serial(children, _) | PatternNode::Parallel(children, _) => {
                for child in children {
                    self.check_pattern_node(child);
                }
            }
        }
    }

    fn check_step(&mut self, step: &StepLiteral) {
        if let StepSymbol::Note(name) = &step.symbol {
            if midi_number(name).is_none() {
                self.error(format!("note '{name}' is out of range"), step.range);
            }
        }

        if !step.arguments.is_empty() {
            self.check_arguments(&schema::step(), &step.arguments, step.range, "step argument");
        }

        if let Some(length) = &step.length {
            if length.unit.is_some() {
                self.error("step length must be a plain number", length.range);
            } else if length.value <= 0.0 {
                self.error("step length must be positive", length.range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::Lexer;
    use crate::dsl::parser::Parser;
    use crate::dsl::types::Unit;

    fn diagnostics(src: &str) -> Vec<String> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        check(&program, &Registry::standard())
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    fn assert_clean(src: &str) {
        let errors = diagnostics(src);
        assert!(errors.is_empty(), "unexpected diagnostics: {errors:?}");
    }

    const SONG: &str = r#"
kick = sample(url: "k.wav")
snare = sample("s.wav", gain: -3 db)
beat = [x - - x]
track {
  tempo: 140 bpm
  section a for 4 bars {
    kick << beat * 2
    snare << loop([- x])
  }
}
mixer {
  bus drums { gain: -2 db; effect fx.reverb(decay: 1.5 s) }
  bus master { pan: 0 }
  master << drums << kick + snare
}
"#;

    #[test]
    fn accepts_complete_song() {
        assert_clean(SONG);
    }

    #[test]
    fn redefinition_reports_once() {
        assert_eq!(diagnostics("foo = 1; foo = 2"), vec!["'foo' is already defined"]);
    }

    #[test]
    fn forward_reference_is_undefined() {
        assert_eq!(
            diagnostics("a = b; b = 1"),
            vec!["undefined identifier 'b'"]
        );
    }

    #[test]
    fn bus_may_shadow_top_level_name() {
        assert_clean(
            r#"
drums = sample(url: "d.wav")
mixer {
  bus drums { }
  bus out { }
  out << drums
}
"#,
        );
    }

    #[test]
    fn section_may_share_a_top_level_name() {
        assert_clean(
            r#"
intro = sample(url: "d.wav")
track { section intro for 1 bars { intro << [x] } }
"#,
        );
    }

    #[test]
    fn bus_names_are_local_to_the_mixer() {
        assert_eq!(
            diagnostics("mixer { bus a { } }\nb = a"),
            vec!["undefined identifier 'a'"]
        );
    }

    #[test]
    fn routing_may_precede_bus_declaration() {
        assert_clean("mixer { a << b\n bus a { }\n bus b { } }");
    }

    #[test]
    fn duplicate_buses_and_sections() {
        assert_eq!(
            diagnostics("mixer { bus a { } bus a { } }"),
            vec!["bus 'a' is already defined"]
        );
        assert_eq!(
            diagnostics("track { section s for 1 bars { } section s for 2 bars { } }"),
            vec!["section 's' is already defined"]
        );
    }

    #[test]
    fn only_one_track_and_mixer() {
        let errors = diagnostics("track { } track { tempo: 1 }\nmixer { } mixer { }");
        assert_eq!(
            errors,
            vec![
                "only one track block is allowed",
                "property 'tempo' expects number<bpm>, got number",
                "only one mixer block is allowed",
            ]
        );
    }

    #[test]
    fn property_problems() {
        let errors = diagnostics("track { tempo: 120 bpm; tempo: 130 bpm; swing: 2 }");
        assert_eq!(
            errors,
            vec!["duplicate property 'tempo'", "unknown property 'swing'"]
        );
    }

    #[test]
    fn missing_required_property() {
        let registry = Registry::standard();
        let mut checker = Checker::new(&registry);
        let schema = Schema::new(vec![Field::required("level", Type::number(Unit::Decibels))]);
        checker.check_properties(&schema, &[], SourceRange::default());
        assert_eq!(checker.errors.len(), 1);
        assert_eq!(checker.errors[0].message, "missing required property 'level'");
    }

    #[test]
    fn section_length_units() {
        assert_clean("track { section a for 16 steps { } section b for 8 beats { } }");
        assert_eq!(
            diagnostics("track { section a for 4 { } }"),
            vec![concat!(
                "section length expects number<bars> or number<beats> or number<steps>, ",
                "got number"
            )]
        );
    }

    #[test]
    fn routing_types() {
        let errors = diagnostics(
            r#"
k = sample(url: "k.wav")
track { section a for 1 bars { k << 3 } }
mixer { bus b { } k << b }
"#,
        );
        assert_eq!(
            errors,
            vec![
                "routing source expects pattern, got number",
                "routing destination expects bus, got instrument",
            ]
        );
    }

    #[test]
    fn chain_with_undefined_link_reports_once() {
        let errors = diagnostics("mixer { bus a { } bus c { } a << b << c }");
        assert_eq!(errors, vec!["undefined identifier 'b'"]);
    }

    #[test]
    fn call_argument_problems() {
        let errors = diagnostics(r#"k = sample(gain: -1 db, "k.wav", url: "a", tone: 1)"#);
        assert_eq!(
            errors,
            vec![
                "positional argument after named argument",
                "unknown argument 'tone'",
            ]
        );
    }

    #[test]
    fn missing_argument() {
        assert_eq!(
            diagnostics("k = sample(gain: -1 db)"),
            vec!["missing required argument 'url'"]
        );
    }

    #[test]
    fn failed_argument_does_not_also_report_missing() {
        assert_eq!(
            diagnostics("k = sample(gain: 0 db, nowhere)"),
            vec![
                "undefined identifier 'nowhere'",
                "positional argument after named argument",
            ]
        );
        assert_eq!(
            diagnostics("k = sample(url: nowhere)"),
            vec!["undefined identifier 'nowhere'"]
        );
    }

    #[test]
    fn argument_type_mismatch() {
        assert_eq!(
            diagnostics("k = sample(url: 3)"),
            vec!["argument 'url' expects string, got number"]
        );
    }

    #[test]
    fn too_many_arguments() {
        assert_eq!(
            diagnostics(r#"k = sample("a", 1 db, 2)"#),
            vec!["too many arguments"]
        );
    }

    #[test]
    fn non_function_is_not_callable() {
        assert_eq!(diagnostics("a = 1; b = a()"), vec!["number is not callable"]);
    }

    #[test]
    fn module_members() {
        assert_clean("e = fx.lowpass(frequency: 800 hz)");
        assert_eq!(
            diagnostics("e = fx.chorus()"),
            vec!["module 'fx' has no member 'chorus'"]
        );
        assert_eq!(diagnostics("a = 1; e = a.b"), vec!["number has no members"]);
    }

    #[test]
    fn functions_are_values() {
        assert_clean(r#"s = sample; k = s(url: "k.wav")"#);
    }

    #[test]
    fn effect_statements_need_effects() {
        assert_eq!(
            diagnostics("mixer { bus a { effect 3 db } }"),
            vec!["expected effect, got number<db>"]
        );
    }

    #[test]
    fn arithmetic_rules() {
        assert_clean("a = 1 bpm + 2 bpm; b = 3 db - 1 db; c = 2 s * 3; d = 4 hz / 2 * 0");
        assert_clean(r#"s = "a" + "b"; p = [x] + [-]; q = 2 * [x]; r = [x] / 2"#);
        assert_clean("t = 4 steps / 2 steps * 3 bars");
        assert_eq!(
            diagnostics("a = 1 bpm + 2 db"),
            vec!["operator '+' cannot be applied to number<bpm> and number<db>"]
        );
        assert_eq!(
            diagnostics("a = 2 db * 2 db"),
            vec!["operator '*' cannot be applied to number<db> and number<db>"]
        );
        assert_eq!(
            diagnostics("a = [x] - [x]"),
            vec!["operator '-' cannot be applied to pattern and pattern"]
        );
        assert_eq!(
            diagnostics("a = 2 / [x]"),
            vec!["operator '/' cannot be applied to number and pattern"]
        );
        assert_eq!(
            diagnostics(r#"a = -"x""#),
            vec!["operator '-' cannot be applied to string"]
        );
    }

    #[test]
    fn summing_sources_makes_a_group() {
        assert_eq!(
            binary_result(BinaryOperator::Add, &Type::Instrument, &Type::Bus),
            Some(Type::Group)
        );
        assert_eq!(
            binary_result(BinaryOperator::Add, &Type::Group, &Type::Instrument),
            Some(Type::Group)
        );
        assert_eq!(
            binary_result(BinaryOperator::Add, &Type::Instrument, &Type::Pattern),
            None
        );
    }

    #[test]
    fn unit_arithmetic_results() {
        let db = Type::number(Unit::Decibels);
        assert_eq!(
            binary_result(BinaryOperator::Divide, &db, &db),
            Some(Type::UNITLESS)
        );
        assert_eq!(
            binary_result(BinaryOperator::Multiply, &Type::UNITLESS, &db),
            Some(db.clone())
        );
        assert_eq!(binary_result(BinaryOperator::Divide, &Type::UNITLESS, &db), None);
    }

    #[test]
    fn step_problems() {
        let errors = diagnostics("p = [C10 x(2, gate: 1) x:0 x:2 s C2147483647]");
        assert_eq!(
            errors,
            vec![
                "note 'C10' is out of range",
                "duplicate step argument 'gate'",
                "step length must be positive",
                "step length must be a plain number",
                "note 'C2147483647' is out of range",
            ]
        );
    }

    #[test]
    fn step_argument_types() {
        assert_clean("v = 0.5; p = [x(0.5, velocity: v) C4(gate: 0.25)]");
        assert_eq!(
            diagnostics("p = [x(gate: 1 s)]"),
            vec!["step argument 'gate' expects number, got number<s>"]
        );
    }

    #[test]
    fn errors_in_failed_definitions_do_not_cascade() {
        assert_eq!(
            diagnostics("a = nope; b = a + 1; c = a(1)"),
            vec!["undefined identifier 'nope'"]
        );
    }

    #[test]
    fn collects_errors_across_the_whole_program() {
        let errors = diagnostics(
            r#"
a = missing
track { tempo: "fast"; section s for 1 bars { a << [x] } }
mixer { bus b { effect fx.gain() } }
"#,
        );
        assert_eq!(
            errors,
            vec![
                "undefined identifier 'missing'",
                "property 'tempo' expects number<bpm>, got string",
                "missing required argument 'level'",
            ]
        );
    }
}
