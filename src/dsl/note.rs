//! Note names — `C4`, `Eb3`, `F#5` to MIDI note numbers.

use crate::pattern::Note;

/// MIDI number of a note spelled `<letter><accidental?><octave>`.
///
/// Letters are `A`–`G`, the accidental is `#` or `b`, and `C4` is middle C
/// (MIDI 60). Returns `None` for malformed names and for notes outside the
/// MIDI range 0–127.
pub fn midi_number(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let pitch_class: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = if let Some(octave) = rest.strip_prefix('#') {
        (1, octave)
    } else if let Some(octave) = rest.strip_prefix('b') {
        (-1, octave)
    } else {
        (0, rest)
    };

    if octave.is_empty() || !octave.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave.parse().ok()?;

    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pitch_class + accidental)?;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Resolve a note token into a [`Note`].
pub fn parse_note(name: &str) -> Option<Note> {
    midi_number(name).map(|midi| Note {
        name: name.to_string(),
        midi,
    })
}
