//! Compile pipeline integration tests — source → diagnostics or Program IR.
//!
//! These drive the public `Compiler` API only, the way an editor or renderer
//! would.

use assert_approx_eq::assert_approx_eq;

use trackc::config::{CompileOptions, TempoOptions};
use trackc::dsl::ir::{BusId, Effect, InstrumentId, MixerRouting, RoutingSource};
use trackc::dsl::{CompileFailure, Compiler, ErrorKind, Unit};
use trackc::pattern::Step;

/// Helper: compile with default options, failing the test on any error.
fn compile(src: &str) -> trackc::dsl::ir::Program {
    match Compiler::compile(src, &CompileOptions::default()) {
        Ok(program) => program,
        Err(failure) => panic!("compile failed:\n{failure}"),
    }
}

/// Helper: the messages of every diagnostic for `src`.
fn messages(src: &str) -> Vec<String> {
    Compiler::check(src).into_iter().map(|e| e.message).collect()
}

fn song_src() -> &'static str {
    r#"
// A two-section groove.
kick = sample(url: "samples/kick.wav")
snare = sample("samples/snare.wav", gain: -3 db)
hats = sample("samples/hat.wav", gain: -9 db)
bass = sample("samples/bass.wav")

four = [x - - -]
backbeat = [- - x -]
line = [C2 - C2:2 - Eb2(0.5) - G2 -]

track {
  tempo: 124 bpm

  section intro for 1 bars {
    kick << four * 4
    hats << loop([x x x -])
  }

  section groove for 2 bars {
    kick << four * 8
    snare << loop(backbeat)
    hats << loop([x(velocity: 0.6) x])
    bass << line + line
  }
}

mixer {
  gain: -1 db

  bus drums {
    gain: -2 db
    effect fx.compressor(threshold: -12 db, ratio: 3)
  }
  bus music {
    pan: -0.25
    effect fx.lowpass(frequency: 800 hz)
    effect fx.delay(0.375 s, mix: 0.2)
  }
  bus master {
    effect fx.reverb(decay: 2 s, mix: 0.1)
  }

  master << drums << kick + snare + hats
  master << music << bass
}
"#
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn minimal_program() {
    let program = compile(
        concat!(
            "kick = sample(url: \"k.wav\")\n",
            "track { tempo: 140 bpm\n section a for 4 bars { kick << [x - - x] } }",
        ),
    );
    assert_eq!(program.instruments.len(), 1);
    assert_eq!(program.track.tempo.value, 140.0);
    assert_eq!(program.track.tempo.unit, Some(Unit::Bpm));
    assert_eq!(program.track.sections.len(), 1);

    let section = &program.track.sections[0];
    assert_eq!(section.routings.len(), 1);
    assert_eq!(
        section.routings[0].source.render_symbols(4.0),
        vec!["x", "-", "-", "x"]
    );
}

#[test]
fn full_song() {
    let program = compile(song_src());

    assert_eq!(program.instruments.len(), 4);
    assert_eq!(
        program.instrument(InstrumentId(1)).map(|i| i.url.as_str()),
        Some("samples/snare.wav")
    );
    assert_approx_eq!(program.instrument(InstrumentId(2)).unwrap().gain, -9.0);

    let track = &program.track;
    assert_eq!(track.tempo.value, 124.0);
    let names: Vec<&str> = track.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["intro", "groove"]);
    assert_eq!(track.sections[0].length, 16.0);
    assert_eq!(track.sections[1].length, 32.0);
    assert_eq!(track.length(), 48.0);

    let groove = &track.sections[1];
    assert_eq!(groove.routings.len(), 4);
    let bass = &groove.routings[3];
    assert_eq!(bass.destination, InstrumentId(3));
    assert_eq!(bass.source.length(), 16.0);
    assert_eq!(
        bass.source.render_symbols(8.0),
        vec!["C2", "-", "C2", "-", "Eb2", "-", "G2", "-"]
    );

    let mixer = &program.mixer;
    assert_approx_eq!(mixer.gain, -1.0);
    let buses: Vec<&str> = mixer.buses.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(buses, vec!["drums", "music", "master"]);
    assert_eq!(
        mixer.bus(BusId(1)).unwrap().effects[1],
        Effect::Delay {
            time: 0.375,
            feedback: 0.5,
            mix: 0.2
        }
    );
}

#[test]
fn mixer_groups_are_flattened() {
    let program = compile(song_src());
    let expected = vec![
        (RoutingSource::Bus(BusId(0)), BusId(2)),
        (RoutingSource::Instrument(InstrumentId(0)), BusId(0)),
        (RoutingSource::Instrument(InstrumentId(1)), BusId(0)),
        (RoutingSource::Instrument(InstrumentId(2)), BusId(0)),
        (RoutingSource::Bus(BusId(1)), BusId(2)),
        (RoutingSource::Instrument(InstrumentId(3)), BusId(1)),
    ];
    let actual: Vec<(RoutingSource, BusId)> = program
        .mixer
        .routings
        .iter()
        .map(|MixerRouting { source, destination }| (*source, *destination))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn infinite_patterns_render_to_the_section_length() {
    let program = compile(song_src());
    let hats = &program.track.sections[0].routings[1];
    assert!(!hats.source.is_finite());

    let steps = hats.source.render(program.track.sections[0].length);
    assert_eq!(steps.len(), 16);
    let hits = steps.iter().filter(|s| !s.is_rest()).count();
    assert_eq!(hits, 12);
}

#[test]
fn step_triggers_survive_into_the_ir() {
    let program = compile(song_src());
    let hats = &program.track.sections[1].routings[2];
    let steps = hats.source.render(2.0);
    assert_eq!(steps[0].trigger().map(|t| t.velocity), Some(0.6));
    assert_eq!(steps[1].trigger().map(|t| t.velocity), Some(1.0));

    let bass = &program.track.sections[1].routings[3];
    match &bass.source.render(5.0)[4] {
        Step::Note(note, trigger) => {
            assert_eq!(note.name, "Eb2");
            assert_eq!(note.midi, 39);
            assert_eq!(trigger.gate, 0.5);
        }
        other => panic!("expected Eb2, got {other:?}"),
    }
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn tempo_is_clamped() {
    let program = compile("track { tempo: 400 bpm }");
    assert_eq!(program.track.tempo.value, 300.0);
}

#[test]
fn options_shape_the_ir() {
    let options = CompileOptions {
        beats_per_bar: 3,
        steps_per_beat: 2,
        tempo: TempoOptions {
            default: 96.0,
            minimum: 40.0,
            maximum: 200.0,
        },
    };
    let program = Compiler::compile("track { section waltz for 4 bars { } }", &options).unwrap();
    assert_eq!(program.beats_per_bar, 3);
    assert_eq!(program.steps_per_beat, 2);
    assert_eq!(program.track.tempo.value, 96.0);
    assert_eq!(program.track.sections[0].length, 24.0);
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn check_and_compile_agree() {
    assert!(Compiler::check(song_src()).is_empty());

    let bad = "kick = sample(url: 1)\ntrack { section a for 1 bars { nope << [x] } }";
    let checked = Compiler::check(bad);
    let failure = Compiler::compile(bad, &CompileOptions::default()).unwrap_err();
    assert_eq!(failure.diagnostics(), checked.as_slice());
    assert_eq!(checked.len(), 2);
}

#[test]
fn every_problem_is_reported_at_once() {
    let errors = messages(
        r#"
kick = sample(url: "k.wav")
kick = sample(url: "k2.wav")
track {
  tempo: 120
  section a for 4 bars { kick << [x] + 1 }
}
mixer {
  bus out { effect fx.flanger() }
  out << missing
}
"#,
    );
    assert_eq!(
        errors,
        vec![
            "'kick' is already defined",
            "property 'tempo' expects number<bpm>, got number",
            "operator '+' cannot be applied to pattern and number",
            "module 'fx' has no member 'flanger'",
            "undefined identifier 'missing'",
        ]
    );
}

#[test]
fn diagnostics_carry_positions() {
    let errors = Compiler::check("a = 1\nb = c");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::CheckError);
    assert_eq!(errors[0].line(), 2);
    assert_eq!(errors[0].column(), 5);
    assert_eq!(errors[0].to_string(), "[2:5] CheckError: undefined identifier 'c'");
}

#[test]
fn lex_and_parse_errors_stop_early() {
    let lex = Compiler::check("a = 1\nb = @@@");
    assert_eq!(lex.len(), 1);
    assert_eq!(lex[0].kind, ErrorKind::LexError);
    assert_eq!(lex[0].message, "unexpected input \"@@@\"");
    assert_eq!(lex[0].line(), 2);

    let parse = Compiler::check("track { section for 1 bars { } }");
    assert_eq!(parse.len(), 1);
    assert_eq!(parse[0].kind, ErrorKind::ParseError);
}

#[test]
fn failures_produce_no_ir() {
    match Compiler::compile("x = ", &CompileOptions::default()) {
        Err(CompileFailure::Diagnostics(errors)) => assert_eq!(errors.len(), 1),
        other => panic!("expected diagnostics, got {other:?}"),
    }
}
