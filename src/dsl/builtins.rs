//! Built-in functions and modules.
//!
//! A [`Registry`] is built by the compile entry point and handed to both the
//! checker (which reads the signatures) and the generator (which calls the
//! implementations). Nothing here is global.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::error::InternalError;
use super::ir::{Effect, Instrument, InstrumentId};
use super::types::{Field, Module, ModuleType, Schema, Signature, Type, Unit, Value};

/// Generator state a built-in may touch.
#[derive(Debug, Default)]
pub struct Context {
    instruments: BTreeMap<InstrumentId, Instrument>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instrument with the next free id.
    pub fn add_instrument(&mut self, url: &str, gain: f64) -> Instrument {
        let id = InstrumentId(self.instruments.len() as u32);
        let instrument = Instrument {
            id,
            url: url.to_string(),
            gain,
        };
        log::trace!("instrument {} <- {url}", id.0);
        self.instruments.insert(id, instrument.clone());
        instrument
    }

    pub fn into_instruments(self) -> BTreeMap<InstrumentId, Instrument> {
        self.instruments
    }
}

/// Evaluated arguments, one slot per parameter in signature order.
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
}

impl Arguments {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn required(&self, index: usize, name: &str) -> Result<&Value, InternalError> {
        self.get(index)
            .ok_or_else(|| InternalError::new(format!("missing required argument '{name}'")))
    }

    pub fn number(&self, index: usize, name: &str) -> Result<f64, InternalError> {
        Ok(self.required(index, name)?.as_number()?.value)
    }

    pub fn number_or(&self, index: usize, default: f64) -> Result<f64, InternalError> {
        match self.get(index) {
            Some(value) => Ok(value.as_number()?.value),
            None => Ok(default),
        }
    }
}

pub type Implementation = fn(&mut Context, &Arguments) -> Result<Value, InternalError>;

/// A built-in function.
pub struct Builtin {
    pub name: String,
    pub signature: Rc<Signature>,
    pub implementation: Implementation,
}

impl Builtin {
    pub fn call(
        &self,
        context: &mut Context,
        arguments: &Arguments,
    ) -> Result<Value, InternalError> {
        (self.implementation)(context, arguments)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// The names visible before any user code runs.
#[derive(Debug)]
pub struct Registry {
    globals: Vec<(String, Value)>,
}

impl Registry {
    /// `sample`, `loop`, and the `fx` effects module.
    pub fn standard() -> Self {
        let fx = module(
            "fx",
            vec![
                function(
                    "delay",
                    vec![
                        Field::required("time", Type::number(Unit::Seconds)),
                        Field::optional("feedback", Type::UNITLESS),
                        Field::optional("mix", Type::UNITLESS),
                    ],
                    Type::Effect,
                    delay,
                ),
                function(
                    "reverb",
                    vec![
                        Field::required("decay", Type::number(Unit::Seconds)),
                        Field::optional("mix", Type::UNITLESS),
                    ],
                    Type::Effect,
                    reverb,
                ),
                function(
                    "lowpass",
                    vec![
                        Field::required("frequency", Type::number(Unit::Hertz)),
                        Field::optional("q", Type::UNITLESS),
                    ],
                    Type::Effect,
                    lowpass,
                ),
                function(
                    "highpass",
                    vec![
                        Field::required("frequency", Type::number(Unit::Hertz)),
                        Field::optional("q", Type::UNITLESS),
                    ],
                    Type::Effect,
                    highpass,
                ),
                function(
                    "compressor",
                    vec![
                        Field::required("threshold", Type::number(Unit::Decibels)),
                        Field::optional("ratio", Type::UNITLESS),
                    ],
                    Type::Effect,
                    compressor,
                ),
                function(
                    "gain",
                    vec![Field::required("level", Type::number(Unit::Decibels))],
                    Type::Effect,
                    gain,
                ),
            ],
        );

        let globals = vec![
            function(
                "sample",
                vec![
                    Field::required("url", Type::String),
                    Field::optional("gain", Type::number(Unit::Decibels)),
                ],
                Type::Instrument,
                sample,
            ),
            function(
                "loop",
                vec![
                    Field::required("pattern", Type::Pattern),
                    Field::optional("times", Type::UNITLESS),
                ],
                Type::Pattern,
                loop_pattern,
            ),
            fx,
        ];

        Self { globals }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.globals.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

fn function(
    name: &str,
    parameters: Vec<Field>,
    returns: Type,
    implementation: Implementation,
) -> (String, Value) {
    let builtin = Builtin {
        name: name.to_string(),
        signature: Rc::new(Signature {
            parameters: Schema::new(parameters),
            returns,
        }),
        implementation,
    };
    (name.to_string(), Value::Function(Rc::new(builtin)))
}

fn module(name: &str, members: Vec<(String, Value)>) -> (String, Value) {
    let ty = ModuleType {
        name: name.to_string(),
        members: members.iter().map(|(n, v)| (n.clone(), v.ty())).collect(),
    };
    let value = Module {
        ty: Rc::new(ty),
        members,
    };
    (name.to_string(), Value::Module(Rc::new(value)))
}

fn unit_interval(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn sample(context: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    let url = args.required(0, "url")?.as_string()?;
    let gain = args.number_or(1, 0.0)?;
    Ok(Value::Instrument(context.add_instrument(url, gain)))
}

fn loop_pattern(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    let pattern = args.required(0, "pattern")?.as_pattern()?;
    let times = match args.get(1) {
        Some(value) => Some(value.as_number()?.value),
        None => None,
    };
    Ok(Value::Pattern(pattern.looped(times)))
}

fn delay(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Delay {
        time: args.number(0, "time")?.max(0.0),
        feedback: unit_interval(args.number_or(1, 0.5)?),
        mix: unit_interval(args.number_or(2, 0.5)?),
    }))
}

fn reverb(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Reverb {
        decay: args.number(0, "decay")?.max(0.0),
        mix: unit_interval(args.number_or(1, 0.3)?),
    }))
}

fn lowpass(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Lowpass {
        frequency: args.number(0, "frequency")?.max(0.0),
        q: args.number_or(1, std::f64::consts::FRAC_1_SQRT_2)?,
    }))
}

fn highpass(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Highpass {
        frequency: args.number(0, "frequency")?.max(0.0),
        q: args.number_or(1, std::f64::consts::FRAC_1_SQRT_2)?,
    }))
}

fn compressor(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Compressor {
        threshold: args.number(0, "threshold")?,
        ratio: args.number_or(1, 4.0)?.max(1.0),
    }))
}

fn gain(_: &mut Context, args: &Arguments) -> Result<Value, InternalError> {
    Ok(Value::Effect(Effect::Gain {
        level: args.number(0, "level")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::types::Number;
    use crate::pattern::{Pattern, Step};

    fn global<'r>(registry: &'r Registry, name: &str) -> &'r Value {
        registry.iter().find(|(n, _)| *n == name).unwrap().1
    }

    fn builtin<'r>(registry: &'r Registry, name: &str) -> &'r Rc<Builtin> {
        global(registry, name).as_function().unwrap()
    }

    #[test]
    fn registry_exposes_globals() {
        let registry = Registry::standard();
        let names: Vec<&str> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sample", "loop", "fx"]);
    }

    #[test]
    fn sample_allocates_sequential_ids() {
        let registry = Registry::standard();
        let sample = builtin(&registry, "sample");
        let mut context = Context::new();
        let args = Arguments::new(vec![Some(Value::String("k.wav".to_string())), None]);

        let first = sample.call(&mut context, &args).unwrap();
        let second = sample.call(&mut context, &args).unwrap();
        assert_eq!(first.as_instrument().unwrap().id, InstrumentId(0));
        assert_eq!(second.as_instrument().unwrap().id, InstrumentId(1));
        assert_eq!(context.into_instruments().len(), 2);
    }

    #[test]
    fn loop_without_count_is_infinite() {
        let registry = Registry::standard();
        let lp = builtin(&registry, "loop");
        let pattern = Pattern::new(vec![Step::hit(), Step::Rest]);
        let args = Arguments::new(vec![Some(Value::Pattern(pattern)), None]);
        let value = lp.call(&mut Context::new(), &args).unwrap();
        assert!(!value.as_pattern().unwrap().is_finite());
    }

    #[test]
    fn fx_members_have_effect_return_type() {
        let registry = Registry::standard();
        let fx = global(&registry, "fx").as_module().unwrap();
        for (name, member) in &fx.members {
            let f = member.as_function().unwrap();
            assert_eq!(f.signature.returns, Type::Effect, "{name}");
        }
        assert!(fx.ty.member("reverb").is_some());
        assert!(fx.ty.member("chorus").is_none());
    }

    #[test]
    fn delay_defaults_and_clamps() {
        let registry = Registry::standard();
        let fx = global(&registry, "fx").as_module().unwrap();
        let delay = fx.member("delay").unwrap().as_function().unwrap();
        let args = Arguments::new(vec![
            Some(Value::Number(Number::new(0.25, Some(Unit::Seconds)))),
            Some(Value::Number(Number::unitless(3.0))),
            None,
        ]);
        let value = delay.call(&mut Context::new(), &args).unwrap();
        assert_eq!(
            *value.as_effect().unwrap(),
            Effect::Delay {
                time: 0.25,
                feedback: 1.0,
                mix: 0.5
            }
        );
    }

    #[test]
    fn missing_required_argument_is_internal() {
        let registry = Registry::standard();
        let sample = builtin(&registry, "sample");
        let err = sample
            .call(&mut Context::new(), &Arguments::default())
            .unwrap_err();
        assert_eq!(err.message, "missing required argument 'url'");
    }
}
