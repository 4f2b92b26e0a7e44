//! Pattern algebra — lazy, possibly infinite step sequences.
//!
//! A [`Pattern`] never holds mutable state: [`Pattern::evaluate`] builds a
//! fresh iterator on every call, and infinite patterns are only ever consumed
//! through a bounded reader such as [`Pattern::render`].

pub mod step;

pub use step::{Note, Step, Trigger};

use std::iter;
use std::rc::Rc;

/// A finite or infinite sequence of [`Step`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    finite: bool,
    /// Number of steps; `f64::INFINITY` for infinite patterns. Always whole
    /// for finite patterns, and equal to the steps `evaluate` yields.
    length: f64,
    source: Rc<Source>,
}

#[derive(Debug, PartialEq)]
enum Source {
    Steps(Vec<Step>),
    Concat(Pattern, Pattern),
    /// Cycles the inner pattern forever.
    Cycle(Pattern),
    /// Cycles the inner pattern until the outer pattern's length is reached.
    Repeat(Pattern),
}

/// The lazy step stream of a pattern.
pub struct Steps<'a>(Box<dyn Iterator<Item = Step> + 'a>);

impl Iterator for Steps<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        self.0.next()
    }
}

impl Pattern {
    /// A finite pattern of exactly `steps.len()` steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            finite: true,
            length: steps.len() as f64,
            source: Rc::new(Source::Steps(steps)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_finite(&self) -> bool {
        self.finite
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.finite && self.length <= 0.0
    }

    /// A fresh, restartable iterator over this pattern's steps.
    pub fn evaluate(&self) -> Steps<'_> {
        let steps: Box<dyn Iterator<Item = Step> + '_> = match &*self.source {
            Source::Steps(steps) => Box::new(steps.iter().cloned()),
            Source::Concat(a, b) => Box::new(a.evaluate().chain(b.evaluate())),
            Source::Cycle(inner) if inner.is_empty() => Box::new(iter::empty()),
            Source::Cycle(inner) => Box::new(iter::repeat_with(move || inner.evaluate()).flatten()),
            Source::Repeat(inner) => Box::new(
                iter::repeat_with(move || inner.evaluate())
                    .flatten()
                    .take(self.length as usize),
            ),
        };
        Steps(steps)
    }

    /// `self` followed by `other`.
    ///
    /// An infinite `self` never ends, so it is returned unchanged, as is any
    /// pattern concatenated with an empty one.
    pub fn concat(&self, other: &Pattern) -> Pattern {
        if !self.finite || other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Pattern {
            finite: other.finite,
            length: self.length + other.length,
            source: Rc::new(Source::Concat(self.clone(), other.clone())),
        }
    }

    /// Repeat this pattern, forever when `times` is `None`.
    ///
    /// A negative count is treated as zero; a zero or non-finite count gives
    /// the empty pattern. Fractional counts stop part-way through a cycle, at
    /// `floor(length * times)` steps.
    pub fn looped(&self, times: Option<f64>) -> Pattern {
        if !self.finite {
            return self.clone();
        }
        let Some(times) = times else {
            return Pattern {
                finite: false,
                length: f64::INFINITY,
                source: Rc::new(Source::Cycle(self.clone())),
            };
        };
        let length = (self.length * times.max(0.0)).floor();
        if !length.is_finite() || length <= 0.0 {
            return Pattern::empty();
        }
        Pattern {
            finite: true,
            length,
            source: Rc::new(Source::Repeat(self.clone())),
        }
    }

    /// Stretch this pattern by `factor` repetitions.
    ///
    /// Infinite patterns are unaffected; otherwise this follows the same
    /// clamping rules as [`Pattern::looped`].
    pub fn multiply(&self, factor: f64) -> Pattern {
        if !self.finite {
            return self.clone();
        }
        self.looped(Some(factor))
    }

    /// Materialize exactly `floor(length)` steps, padding with rests.
    ///
    /// Reads lazily and stops as soon as enough steps are produced, so this is
    /// safe on infinite patterns. A zero, negative or non-finite length
    /// renders nothing.
    pub fn render(&self, length: f64) -> Vec<Step> {
        self.rendered(length).collect()
    }

    /// The steps [`Pattern::render`] would produce, without collecting them.
    pub fn rendered(&self, length: f64) -> impl Iterator<Item = Step> + '_ {
        let count = if length.is_finite() && length > 0.0 {
            length.floor() as usize
        } else {
            0
        };
        self.evaluate().chain(iter::repeat(Step::Rest)).take(count)
    }

    /// Rendered steps as their source symbols.
    pub fn render_symbols(&self, length: f64) -> Vec<String> {
        self.rendered(length).map(|step| step.symbol()).collect()
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::empty()
    }
}
