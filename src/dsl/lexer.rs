//! Lexer for the track language.
//!
//! Converts source text into a stream of [`Token`]s. Each position is matched
//! against an ordered list of rules; the longest match wins and the earlier
//! rule wins a tie, so `C4` lexes as a note while `C4x` stays a word.

use super::error::{CompileError, SourceRange};
use super::token::{Token, TokenKind};
use super::types::Unit;

/// Longest stretch of offending input quoted in a lex error.
const SNIPPET_CHARS: usize = 16;

/// A rule returns the byte length it matched and the token to emit, or
/// `None` as the token for input that is discarded.
type Rule = fn(&str) -> Option<(usize, Option<TokenKind>)>;

const RULES: &[Rule] = &[
    whitespace,
    line_comment,
    note,
    word,
    number,
    string,
    punctuation,
];

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let rest = &self.source[self.pos..];

            let mut best: Option<(usize, Option<TokenKind>)> = None;
            for rule in RULES {
                if let Some((len, kind)) = rule(rest) {
                    let longer = best.as_ref().map_or(true, |(best_len, _)| len > *best_len);
                    if len > 0 && longer {
                        best = Some((len, kind));
                    }
                }
            }

            let Some((len, kind)) = best else {
                return Err(self.unexpected_input(rest));
            };

            let text = &rest[..len];
            let range = SourceRange::new(self.pos, len, self.line, self.col);
            self.advance(text);

            if let Some(kind) = kind {
                tokens.push(Token {
                    kind,
                    text: text.to_string(),
                    range,
                });
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            range: SourceRange::new(self.pos, 0, self.line, self.col),
        });

        log::trace!("lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn advance(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos += text.len();
    }

    fn unexpected_input(&self, rest: &str) -> CompileError {
        let snippet: String = rest
            .chars()
            .take_while(|&c| c != '\n')
            .take(SNIPPET_CHARS)
            .collect();
        CompileError::lex(
            format!("unexpected input \"{snippet}\""),
            SourceRange::new(self.pos, snippet.len(), self.line, self.col),
        )
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn count_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(s.len(), |(i, _)| i)
}

fn whitespace(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let len = count_while(s, |c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    (len > 0).then_some((len, None))
}

fn line_comment(s: &str) -> Option<(usize, Option<TokenKind>)> {
    if !s.starts_with("//") {
        return None;
    }
    Some((count_while(s, |c| c != '\n'), None))
}

fn note(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let bytes = s.as_bytes();
    if !matches!(bytes.first(), Some(b'A'..=b'G')) {
        return None;
    }
    let mut len = 1;
    if matches!(bytes.get(1), Some(b'#' | b'b')) {
        len += 1;
    }
    let digits = count_while(&s[len..], |c| c.is_ascii_digit());
    if digits == 0 {
        return None;
    }
    len += digits;
    Some((len, Some(TokenKind::Note(s[..len].to_string()))))
}

fn word(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let first = s.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let len = count_while(s, is_word_char);
    Some((len, Some(TokenKind::Word(s[..len].to_string()))))
}

fn number(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let mut len = count_while(s, |c| c.is_ascii_digit());
    if len == 0 {
        return None;
    }
    let rest = &s[len..];
    if rest.starts_with('.') {
        let fraction = count_while(&rest[1..], |c| c.is_ascii_digit());
        if fraction > 0 {
            len += 1 + fraction;
        }
    }
    let value: f64 = s[..len].parse().ok()?;

    // A unit suffix must sit on the same line as its number.
    let gap = count_while(&s[len..], |c| c == ' ' || c == '\t');
    let suffix_start = len + gap;
    let suffix_len = count_while(&s[suffix_start..], is_word_char);
    let unit = Unit::from_suffix(&s[suffix_start..suffix_start + suffix_len]);
    if unit.is_some() {
        len = suffix_start + suffix_len;
    }

    Some((len, Some(TokenKind::Number { value, unit })))
}

fn string(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let mut chars = s.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }
    let mut value = String::new();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Some((i + 1, Some(TokenKind::Str(value)))),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    '"' => '"',
                    '\\' => '\\',
                    'n' => '\n',
                    't' => '\t',
                    _ => return None,
                });
            }
            '\n' => return None,
            _ => value.push(ch),
        }
    }
    None
}

fn punctuation(s: &str) -> Option<(usize, Option<TokenKind>)> {
    let ch = s.chars().next()?;
    TokenKind::punctuation(ch).map(|kind| (ch.len_utf8(), Some(kind)))
}
