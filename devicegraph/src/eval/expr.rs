//! Boolean rule expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or   := xor ('|' xor)*
//! xor  := and ('^' and)*
//! and  := not ('&' not)*
//! not  := '!' not | atom
//! atom := '(' or ')' | '0' | '1' | 'true' | 'false' | <letter>
//! ```

use thiserror::Error;

use super::{Assignment, RuleResolver};

/// Deepest nesting of `(` and `!` a rule may use.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Empty rule")]
    Empty,
    #[error("Unexpected end of rule")]
    UnexpectedEof,
    #[error("Unexpected character {1:?} at position {0}")]
    UnexpectedChar(usize, char),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Trailing input at position {0}")]
    TrailingInput(usize),
    #[error("Rule nested too deeply at position {0}")]
    TooDeep(usize),
}

/// The built-in resolver for rule expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprResolver;

impl RuleResolver for ExprResolver {
    fn resolve(&self, rule: &str, assignment: &Assignment) -> Result<bool, RuleError> {
        ExprParser::new(rule, assignment).evaluate()
    }
}

struct ExprParser<'a> {
    input: Vec<char>,
    pos: usize,
    depth: usize,
    assignment: &'a Assignment,
}

impl<'a> ExprParser<'a> {
    fn new(rule: &str, assignment: &'a Assignment) -> Self {
        Self {
            input: rule.chars().collect(),
            pos: 0,
            depth: 0,
            assignment,
        }
    }

    fn evaluate(&mut self) -> Result<bool, RuleError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(RuleError::Empty);
        }

        let value = self.parse_or()?;

        self.skip_whitespace();
        if !self.is_eof() {
            return Err(RuleError::TrailingInput(self.pos));
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> Result<bool, RuleError> {
        let mut value = self.parse_xor()?;
        while self.eat('|') {
            let rhs = self.parse_xor()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_xor(&mut self) -> Result<bool, RuleError> {
        let mut value = self.parse_and()?;
        while self.eat('^') {
            let rhs = self.parse_and()?;
            value ^= rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, RuleError> {
        let mut value = self.parse_not()?;
        while self.eat('&') {
            let rhs = self.parse_not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_not(&mut self) -> Result<bool, RuleError> {
        if self.eat('!') {
            self.descend()?;
            let value = self.parse_not();
            self.depth -= 1;
            return Ok(!value?);
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<bool, RuleError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(RuleError::UnexpectedEof);
        }

        let start = self.pos;
        let c = self.peek();

        if c == '(' {
            self.pos += 1;
            self.descend()?;
            let value = self.parse_or();
            self.depth -= 1;
            let value = value?;
            if !self.eat(')') {
                self.skip_whitespace();
                return match self.input.get(self.pos) {
                    Some(&other) => Err(RuleError::UnexpectedChar(self.pos, other)),
                    None => Err(RuleError::UnexpectedEof),
                };
            }
            return Ok(value);
        }

        if !c.is_ascii_alphanumeric() {
            return Err(RuleError::UnexpectedChar(start, c));
        }

        while !self.is_eof() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            self.pos += 1;
        }
        let word: String = self.input[start..self.pos].iter().collect();

        match word.as_str() {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            _ => {
                let mut chars = word.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => self
                        .assignment
                        .get(&letter)
                        .copied()
                        .ok_or(RuleError::UnknownVariable(word)),
                    _ => Err(RuleError::UnknownVariable(word)),
                }
            }
        }
    }

    fn descend(&mut self) -> Result<(), RuleError> {
        if self.depth >= MAX_DEPTH {
            return Err(RuleError::TooDeep(self.pos));
        }
        self.depth += 1;
        Ok(())
    }

    /// Skip whitespace and consume `c` if it is next.
    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if !self.is_eof() && self.peek() == c {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> char {
        self.input[self.pos]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}
