//! Step model — one slot of a pattern.

/// One slot in a pattern: a rest, a hit, a pitched note, or several of
/// those sounding together.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Rest,
    Hit(Trigger),
    Note(Note, Trigger),
    Chord(Vec<Step>),
}

/// Playback parameters attached to a sounding step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// Duration in steps.
    pub length: f64,
    /// Fraction of the duration the note is held, 0.0–1.0.
    pub gate: f64,
    /// Velocity in the range 0.0–1.0.
    pub velocity: f64,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            length: 1.0,
            gate: 1.0,
            velocity: 1.0,
        }
    }
}

/// A pitched note, e.g. `C4` (MIDI 60).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub name: String,
    pub midi: u8,
}

impl Step {
    pub const REST_SYMBOL: &'static str = "-";
    pub const HIT_SYMBOL: &'static str = "x";

    pub fn hit() -> Self {
        Step::Hit(Trigger::default())
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Step::Rest)
    }

    /// The source spelling of this step: `-`, `x`, a note name, or the
    /// layered symbols of a chord in angle brackets.
    pub fn symbol(&self) -> String {
        match self {
            Step::Rest => Self::REST_SYMBOL.to_string(),
            Step::Hit(_) => Self::HIT_SYMBOL.to_string(),
            Step::Note(note, _) => note.name.clone(),
            Step::Chord(steps) => {
                let inner: Vec<String> = steps.iter().map(Step::symbol).collect();
                format!("<{}>", inner.join(" "))
            }
        }
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        match self {
            Step::Hit(t) | Step::Note(_, t) => Some(t),
            Step::Rest | Step::Chord(_) => None,
        }
    }

    /// Combine steps that start on the same slot.
    ///
    /// Rests are dropped and nested chords are flattened; a single survivor is
    /// returned as-is and no survivors yield a rest.
    pub fn layer(steps: impl IntoIterator<Item = Step>) -> Step {
        let mut voices = Vec::new();
        for step in steps {
            match step {
                Step::Rest => {}
                Step::Chord(inner) => voices.extend(inner),
                other => voices.push(other),
            }
        }
        match voices.len() {
            0 => Step::Rest,
            1 => voices.remove(0),
            _ => Step::Chord(voices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str, midi: u8) -> Step {
        Step::Note(
            Note {
                name: name.to_string(),
                midi,
            },
            Trigger::default(),
        )
    }

    #[test]
    fn symbols() {
        assert_eq!(Step::Rest.symbol(), "-");
        assert_eq!(Step::hit().symbol(), "x");
        assert_eq!(note("C4", 60).symbol(), "C4");
    }

    #[test]
    fn layer_drops_rests() {
        assert_eq!(Step::layer([Step::Rest, Step::Rest]), Step::Rest);
        assert_eq!(Step::layer([Step::Rest, Step::hit()]), Step::hit());
    }

    #[test]
    fn layer_flattens_chords() {
        let chord = Step::layer([note("C4", 60), note("E4", 64)]);
        let bigger = Step::layer([chord, Step::Rest, note("G4", 67)]);
        assert_eq!(bigger.symbol(), "<C4 E4 G4>");
    }

    #[test]
    fn default_trigger() {
        let t = *Step::hit().trigger().unwrap();
        assert_eq!(t.length, 1.0);
        assert_eq!(t.gate, 1.0);
        assert_eq!(t.velocity, 1.0);
        assert!(Step::Rest.trigger().is_none());
    }
}
