//! trackc — compile a track file and print its Program IR.
//!
//! Diagnostics are printed as `file:line:col: error: message`. Exit status is
//! 0 on success, 1 for diagnostics or unreadable input, and 2 for an internal
//! compiler error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use trackc::config::CompileOptions;
use trackc::dsl::ir::{Program, RoutingSource};
use trackc::dsl::{CompileError, CompileFailure, Compiler};

/// Steps shown per pattern when `--steps` is not given.
const PREVIEW_STEPS: usize = 64;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Track source file
    file: PathBuf,

    /// Compile options YAML (defaults to ~/.trackc/options.yaml)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Only report diagnostics; don't generate
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Render each pattern for this many steps instead of its section length
    /// (capped at 64 unless given)
    #[arg(long)]
    steps: Option<usize>,
}

fn main() -> ExitCode {
    if cfg!(debug_assertions) {
        colog::default_builder()
            .filter_level(log::LevelFilter::Trace)
            .init();
    } else {
        colog::default_builder().init();
    }

    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("cannot read {}: {e}", args.file.display());
            return ExitCode::from(1);
        }
    };

    let options = match &args.options {
        Some(path) => match CompileOptions::from_path(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(1);
            }
        },
        None => CompileOptions::load().unwrap_or_default(),
    };

    if args.check {
        let errors = Compiler::check(&source);
        if errors.is_empty() {
            println!("{}: ok", args.file.display());
            return ExitCode::SUCCESS;
        }
        report(&args.file, &errors);
        return ExitCode::from(1);
    }

    match Compiler::compile(&source, &options) {
        Ok(program) => {
            print_summary(&program, args.steps);
            ExitCode::SUCCESS
        }
        Err(CompileFailure::Diagnostics(errors)) => {
            report(&args.file, &errors);
            ExitCode::from(1)
        }
        Err(CompileFailure::Internal(err)) => {
            eprintln!("{}: {err}", args.file.display());
            ExitCode::from(2)
        }
    }
}

fn report(file: &Path, errors: &[CompileError]) {
    for err in errors {
        eprintln!(
            "{}:{}:{}: error: {}",
            file.display(),
            err.line(),
            err.column(),
            err.message
        );
    }
    eprintln!("{} error(s)", errors.len());
}

fn print_summary(program: &Program, steps: Option<usize>) {
    println!("tempo: {}", program.track.tempo);
    println!("length: {} steps", program.track.length());
    println!(
        "metre: {} beats per bar, {} steps per beat",
        program.beats_per_bar, program.steps_per_beat
    );

    println!("instruments:");
    for instrument in program.instruments.values() {
        println!(
            "  #{} {} (gain {} db)",
            instrument.id.0, instrument.url, instrument.gain
        );
    }

    println!("sections:");
    for section in &program.track.sections {
        println!("  {} ({} steps)", section.name, section.length);
        let (length, truncated) = preview_length(section.length, steps);
        for routing in &section.routings {
            let mut symbols: Vec<String> = routing
                .source
                .rendered(length as f64)
                .map(|step| step.symbol())
                .collect();
            if truncated {
                symbols.push("...".to_string());
            }
            println!("    #{} << {}", routing.destination.0, symbols.join(" "));
        }
    }

    let mixer = &program.mixer;
    println!("mixer: gain {} db", mixer.gain);
    for bus in &mixer.buses {
        let effects: Vec<&str> = bus.effects.iter().map(|e| e.name()).collect();
        println!(
            "  bus #{} {} (gain {} db, pan {}) [{}]",
            bus.id.0,
            bus.name,
            bus.gain,
            bus.pan,
            effects.join(", ")
        );
    }
    for routing in &mixer.routings {
        let source = match routing.source {
            RoutingSource::Instrument(id) => format!("instrument #{}", id.0),
            RoutingSource::Bus(id) => format!("bus #{}", id.0),
        };
        println!("  {source} -> bus #{}", routing.destination.0);
    }
}

/// How many steps to print for a section, and whether that cuts it short.
fn preview_length(section_length: f64, steps: Option<usize>) -> (usize, bool) {
    if let Some(steps) = steps {
        return (steps, false);
    }
    let whole = if section_length.is_finite() && section_length > 0.0 {
        section_length.floor()
    } else {
        0.0
    };
    if whole > PREVIEW_STEPS as f64 {
        (PREVIEW_STEPS, true)
    } else {
        (whole as usize, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_capped_unless_asked() {
        assert_eq!(preview_length(16.0, None), (16, false));
        assert_eq!(preview_length(1e12, None), (PREVIEW_STEPS, true));
        assert_eq!(preview_length(f64::NAN, None), (0, false));
        assert_eq!(preview_length(1e12, Some(200)), (200, false));
    }
}
