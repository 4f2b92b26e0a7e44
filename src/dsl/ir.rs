//! Program IR — the validated output handed to renderers.
//!
//! Nothing here refers back to the AST or to generator values; instruments
//! and buses are linked by id only.

use std::collections::BTreeMap;

use super::types::Number;
use crate::pattern::Pattern;

/// Identifies an instrument. Assigned in order of creation, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub u32);

/// Identifies a mixer bus. Assigned in declaration order, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub u32);

/// The compiled program.
#[derive(Debug, Clone)]
pub struct Program {
    pub beats_per_bar: u32,
    pub steps_per_beat: u32,
    pub instruments: BTreeMap<InstrumentId, Instrument>,
    pub track: Track,
    pub mixer: Mixer,
}

impl Program {
    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    pub fn steps_per_bar(&self) -> u32 {
        self.beats_per_bar * self.steps_per_beat
    }
}

/// A sample-backed instrument created by `sample(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: InstrumentId,
    pub url: String,
    /// Gain in decibels.
    pub gain: f64,
}

#[derive(Debug, Clone)]
pub struct Track {
    /// Tempo in bpm, already clamped to the configured range.
    pub tempo: Number,
    pub sections: Vec<Section>,
}

impl Track {
    /// Total length of all sections, in steps.
    pub fn length(&self) -> f64 {
        self.sections.iter().map(|s| s.length).sum()
    }
}

/// A named stretch of the track.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    /// Length in steps.
    pub length: f64,
    pub routings: Vec<SectionRouting>,
}

/// A pattern played by an instrument within a section.
#[derive(Debug, Clone)]
pub struct SectionRouting {
    pub source: Pattern,
    pub destination: InstrumentId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mixer {
    /// Master gain in decibels.
    pub gain: f64,
    pub buses: Vec<Bus>,
    pub routings: Vec<MixerRouting>,
}

impl Mixer {
    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Gain in decibels.
    pub gain: f64,
    /// Stereo position, -1.0 (left) to 1.0 (right).
    pub pan: f64,
    pub effects: Vec<Effect>,
}

/// An effect in a bus chain, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// `time` in seconds.
    Delay { time: f64, feedback: f64, mix: f64 },
    /// `decay` in seconds.
    Reverb { decay: f64, mix: f64 },
    /// `frequency` in hertz.
    Lowpass { frequency: f64, q: f64 },
    /// `frequency` in hertz.
    Highpass { frequency: f64, q: f64 },
    /// `threshold` in decibels.
    Compressor { threshold: f64, ratio: f64 },
    /// `level` in decibels.
    Gain { level: f64 },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Delay { .. } => "delay",
            Effect::Reverb { .. } => "reverb",
            Effect::Lowpass { .. } => "lowpass",
            Effect::Highpass { .. } => "highpass",
            Effect::Compressor { .. } => "compressor",
            Effect::Gain { .. } => "gain",
        }
    }
}

/// Something that can feed a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingSource {
    Instrument(InstrumentId),
    Bus(BusId),
}

/// An edge of the mixer graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerRouting {
    pub source: RoutingSource,
    pub destination: BusId,
}
