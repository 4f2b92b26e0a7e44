//! Parser for the track language.
//!
//! Recursive descent over the token stream with one function per precedence
//! level. The first malformed construct aborts the parse with an
//! "expected X, got Y" error; there is no recovery.

use super::ast::*;
use super::error::{CompileError, SourceRange};
use super::token::{Token, TokenKind};

/// Words with a fixed meaning that cannot be used as names.
pub const KEYWORDS: [&str; 6] = ["track", "mixer", "section", "for", "bus", "effect"];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let range = tokens.last().map_or(SourceRange::new(0, 0, 1, 1), |t| {
                SourceRange::new(
                    t.range.offset + t.range.length,
                    0,
                    t.range.line,
                    t.range.column + t.text.chars().count(),
                )
            });
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                range,
            });
        }
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let start = self.peek().range;
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            if self.is_at_end() {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            statements,
            range: start.to(self.peek().range),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        if self.check_word("track") {
            return Ok(Statement::Track(self.parse_track()?));
        }
        if self.check_word("mixer") {
            return Ok(Statement::Mixer(self.parse_mixer()?));
        }
        if matches!(self.peek().kind, TokenKind::Word(_)) {
            return Ok(Statement::Assignment(self.parse_assignment()?));
        }
        Err(self.unexpected("statement"))
    }

    fn parse_assignment(&mut self) -> Result<Assignment, CompileError> {
        let name = self.expect_name()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        Ok(Assignment {
            range: name.range.to(value.range()),
            name,
            value,
        })
    }

    fn parse_track(&mut self) -> Result<TrackStatement, CompileError> {
        let start = self.expect_word("track")?;
        self.expect(TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut sections = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            if self.check_word("section") {
                sections.push(self.parse_section()?);
            } else if self.check_property() {
                properties.push(self.parse_property()?);
            } else {
                return Err(self.unexpected("property or section"));
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(TrackStatement {
            properties,
            sections,
            range: self.span_from(start),
        })
    }

    fn parse_section(&mut self) -> Result<SectionStatement, CompileError> {
        let start = self.expect_word("section")?;
        let name = self.expect_name()?;
        self.expect_word("for")?;
        let length = self.parse_expression()?;
        self.expect(TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut routings = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            if self.check_property() {
                properties.push(self.parse_property()?);
            } else {
                routings.extend(self.parse_routing_chain()?);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(SectionStatement {
            name,
            length,
            properties,
            routings,
            range: self.span_from(start),
        })
    }

    fn parse_mixer(&mut self) -> Result<MixerStatement, CompileError> {
        let start = self.expect_word("mixer")?;
        self.expect(TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut buses = Vec::new();
        let mut routings = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            if self.check_word("bus") {
                buses.push(self.parse_bus()?);
            } else if self.check_property() {
                properties.push(self.parse_property()?);
            } else {
                routings.extend(self.parse_routing_chain()?);
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(MixerStatement {
            properties,
            buses,
            routings,
            range: self.span_from(start),
        })
    }

    fn parse_bus(&mut self) -> Result<BusStatement, CompileError> {
        let start = self.expect_word("bus")?;
        let name = self.expect_name()?;
        self.expect(TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut effects = Vec::new();
        loop {
            self.skip_separators();
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            if self.check_word("effect") {
                let effect_start = self.expect_word("effect")?;
                let effect = self.parse_expression()?;
                effects.push(EffectStatement {
                    range: effect_start.to(effect.range()),
                    effect,
                });
            } else if self.check_property() {
                properties.push(self.parse_property()?);
            } else {
                return Err(self.unexpected("property or effect"));
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(BusStatement {
            name,
            properties,
            effects,
            range: self.span_from(start),
        })
    }

    fn parse_property(&mut self) -> Result<Property, CompileError> {
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expression()?;
        Ok(Property {
            range: name.range.to(value.range()),
            name,
            value,
        })
    }

    /// `a << b << c` becomes `a << b` and `b << c`.
    fn parse_routing_chain(&mut self) -> Result<Vec<Routing>, CompileError> {
        let mut destination = self.parse_expression()?;
        let mut routings = Vec::new();

        loop {
            if !self.check_routing_arrow() {
                if routings.is_empty() {
                    return Err(self.unexpected("'<<'"));
                }
                break;
            }
            self.advance();
            self.advance();
            let source = self.parse_expression()?;
            routings.push(Routing {
                range: destination.range().to(source.range()),
                destination,
                source: source.clone(),
            });
            destination = source;
        }

        Ok(routings)
    }

    // --- Expressions ---

    pub fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, CompileError> {
        let operator = match self.peek().kind {
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().range;
        let operand = self.parse_unary()?;
        Ok(Expression::Unary(UnaryExpression {
            operator,
            range: start.to(operand.range()),
            operand: Box::new(operand),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(TokenKind::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call(Call {
                    range: self.span_from(expr.range()),
                    callee: Box::new(expr),
                    arguments,
                });
            } else if self.check(TokenKind::Dot) {
                self.advance();
                let member = self.expect_name()?;
                expr = Expression::Member(MemberExpression {
                    range: expr.range().to(member.range),
                    object: Box::new(expr),
                    member,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number { value, unit } => {
                self.advance();
                Ok(Expression::Number(NumberLiteral {
                    value,
                    unit,
                    range: token.range,
                }))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expression::String(StringLiteral {
                    value,
                    range: token.range,
                }))
            }
            TokenKind::Word(ref word) if !is_keyword(word) => {
                self.advance();
                Ok(Expression::Identifier(Identifier {
                    name: word.clone(),
                    range: token.range,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket | TokenKind::Less => {
                let root = self.parse_pattern_group()?;
                Ok(Expression::Pattern(PatternLiteral {
                    range: self.span_from(token.range),
                    root,
                }))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `( (name:)? expr, ... )`
    fn parse_arguments(&mut self) -> Result<Vec<Argument>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut arguments = Vec::new();

        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let name = if self.check_property() {
                let name = self.expect_name()?;
                self.expect(TokenKind::Colon)?;
                Some(name)
            } else {
                None
            };
            let value = self.parse_expression()?;
            let start = name.as_ref().map_or(value.range(), |n| n.range);
            arguments.push(Argument {
                range: start.to(value.range()),
                name,
                value,
            });
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok(arguments)
    }

    // --- Patterns ---

    fn parse_pattern_group(&mut self) -> Result<PatternNode, CompileError> {
        let start = self.peek().range;
        let (close, parallel) = match self.peek().kind {
            TokenKind::LBracket => (TokenKind::RBracket, false),
            TokenKind::Less => (TokenKind::Greater, true),
            _ => return Err(self.unexpected("'[' or '<'")),
        };
        self.advance();

        let mut children = Vec::new();
        while !self.check(close.clone()) && !self.is_at_end() {
            children.push(self.parse_pattern_node()?);
        }
        self.expect(close)?;

        let range = self.span_from(start);
        Ok(if parallel {
            PatternNode::Parallel(children, range)
        } else {
            PatternNode::Serial(children, range)
        })
    }

    fn parse_pattern_node(&mut self) -> Result<PatternNode, CompileError> {
        if self.check(TokenKind::LBracket) || self.check(TokenKind::Less) {
            return self.parse_pattern_group();
        }
        Ok(PatternNode::Step(self.parse_step()?))
    }

    fn parse_step(&mut self) -> Result<StepLiteral, CompileError> {
        let token = self.peek().clone();
        let symbol = match &token.kind {
            TokenKind::Minus => StepSymbol::Rest,
            TokenKind::Word(w) if w == "x" => StepSymbol::Hit,
            TokenKind::Note(n) => StepSymbol::Note(n.clone()),
            _ => return Err(self.unexpected("step")),
        };
        self.advance();

        let arguments = if self.check(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        let length = if self.check(TokenKind::Colon) {
            self.advance();
            let t = self.peek().clone();
            match t.kind {
                TokenKind::Number { value, unit } => {
                    self.advance();
                    Some(NumberLiteral {
                        value,
                        unit,
                        range: t.range,
                    })
                }
                _ => return Err(self.unexpected("step length")),
            }
        } else {
            None
        };

        Ok(StepLiteral {
            symbol,
            arguments,
            length,
            range: self.span_from(token.range),
        })
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn previous_range(&self) -> SourceRange {
        let idx = self.pos.saturating_sub(1).min(self.tokens.len() - 1);
        self.tokens[idx].range
    }

    /// Range from `start` to the end of the last consumed token.
    fn span_from(&self, start: SourceRange) -> SourceRange {
        start.to(self.previous_range())
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind.same_kind(&kind)
    }

    fn check_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w == word)
    }

    /// A non-keyword word followed by `:` starts a property or named argument.
    fn check_property(&self) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if !is_keyword(w))
            && self.peek_at(1).kind == TokenKind::Colon
    }

    fn check_routing_arrow(&self) -> bool {
        self.peek().kind == TokenKind::Less && self.peek_at(1).kind == TokenKind::Less
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Semicolon | TokenKind::Comma) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let t = self.peek();
        CompileError::parse(format!("expected {expected}, got {}", t.kind), t.range)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, CompileError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<SourceRange, CompileError> {
        if self.check_word(word) {
            Ok(self.advance().range)
        } else {
            Err(self.unexpected(&format!("'{word}'")))
        }
    }

    fn expect_name(&mut self) -> Result<Identifier, CompileError> {
        let t = self.peek();
        match &t.kind {
            TokenKind::Word(w) if !is_keyword(w) => {
                let ident = Identifier {
                    name: w.clone(),
                    range: t.range,
                };
                self.advance();
                Ok(ident)
            }
            _ => Err(self.unexpected("name")),
        }
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        range: left.range().to(right.range()),
        left: Box::new(left),
        right: Box::new(right),
    })
}
