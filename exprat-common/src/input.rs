//! File reader

use std::{
    io::{Error, ErrorKind, Result},
    iter::Peekable,
};

/// A peekable iterator for bytes that records line and column information.
pub struct Input<'a> {
    /// The source of the input data
    source: Peekable<Box<dyn Iterator<Item = u8> + 'a>>,
    /// The current line number
    line: usize,
    /// The current column
    column: usize,
}

impl<'a> Input<'a> {
    /// Create a new `Input` from some source
    pub fn new(source: Box<dyn Iterator<Item = u8> + 'a>) -> Self {
        Input {
            source: source.peekable(),
            line: 1,
            column: 1,
        }
    }
    /// Look at the next byte without consuming it
    pub fn peek(&mut self) -> Option<u8> {
        self.source.peek().cloned()
    }
    /// Create an io::Error with the given message and position information.
    pub fn error(&self, why: &'static str) -> Error {
        Error::new(
            ErrorKind::InvalidData,
            format!("{} at line {} column {}", why, self.line, self.column),
        )
    }
    /// The current position, for warnings.
    pub fn location(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Parse a decimal number.
    ///
    /// Consumes one or more decimal digits, returning the value of the
    /// resulting number on success. Fails if there is no digit, or if the
    /// number does not lie within the range [-i64::MAX, i64::MAX].
    pub fn parse_dec64(&mut self) -> Result<i64> {
        let sign: bool = self.peek() == Some(b'-');
        if sign {
            self.next();
        }
        match self.peek() {
            Some(c) if Self::is_digit(c) => (),
            _ => return Err(self.error(Self::NUMBER)),
        }
        let mut value: i64 = 0;
        while let Some(c) = self.peek() {
            if !Self::is_digit(c) {
                break;
            }
            // Does not unnecessarily overflow because of the order of operations
            value = value
                .checked_mul(10)
                .and_then(|val| val.checked_add(i64::from(c - b'0')))
                .ok_or_else(|| self.error(Self::OVERFLOW))?;
            self.next();
        }
        if sign {
            Ok(-value)
        } else {
            Ok(value)
        }
    }

    /// Like parse_dec64, but returns an i32.
    /// Fails if the parsed number does not lie within the range
    /// [-i32::MAX, i32::MAX].
    pub fn parse_dec32(&mut self) -> Result<i32> {
        let sign: bool = self.peek() == Some(b'-');
        if sign {
            self.next();
        }
        match self.peek() {
            Some(c) if Self::is_digit(c) => (),
            _ => return Err(self.error(Self::NUMBER)),
        }
        let mut value: i32 = 0;
        while let Some(c) = self.peek() {
            if !Self::is_digit(c) {
                break;
            }
            // Does not unnecessarily overflow because of the order of operations
            value = value
                .checked_mul(10)
                .and_then(|val| val.checked_add(i32::from(c - b'0')))
                .ok_or_else(|| self.error(Self::OVERFLOW))?;
            self.next();
        }
        if sign {
            Ok(-value)
        } else {
            Ok(value)
        }
    }

    /// Parse zero or more spaces or linebreaks.
    pub fn skip_any_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !Self::is_space(c) {
                break;
            }
            self.next();
        }
    }

    /// Parse zero or more spaces, tabs or carriage returns, staying on the
    /// current line.
    pub fn skip_blanks(&mut self) {
        while let Some(c) = self.peek() {
            if !Self::is_blank(c) {
                break;
            }
            self.next();
        }
    }

    /// Consume the rest of the current line, including the newline.
    pub fn skip_to_end_of_line(&mut self) {
        while let Some(c) = self.next() {
            if c == b'\n' {
                break;
            }
        }
    }

    // Error messages.
    /// A numeric overflow. This should only happen for user input.
    pub const OVERFLOW: &'static str = "overflow while parsing number";
    /// Parser error (`expected ...`)
    pub const NUMBER: &'static str = "expected number";
    /// Parser error (`expected ...`)
    pub const POSITIVE_NUMBER: &'static str = "expected positive number";
    /// Parser error (`expected ...`)
    pub const P_CNF: &'static str = "expected \"p cnf\"";
    /// Parser error ("unexpected ...")
    pub const DUPLICATE_HEADER: &'static str = "duplicate \"p cnf\" header";
    /// Parser error ("expected ...")
    pub const MISSING_HEADER: &'static str = "expected a \"p cnf\" header";
    /// Parser error (`unexpected ...`)
    pub const UNEXPECTED_CHARACTER: &'static str = "unexpected character";
    /// Parser error (`expected ...`)
    pub const NEWLINE: &'static str = "expected newline";

    /// Check if a character is a decimal digit.
    pub fn is_digit(value: u8) -> bool {
        value >= b'0' && value <= b'9'
    }

    /// Check if a character is a decimal digit or a dash.
    pub fn is_digit_or_dash(value: u8) -> bool {
        Self::is_digit(value) || value == b'-'
    }

    /// Returns true if the character is one of the whitespace characters we allow.
    pub fn is_space(c: u8) -> bool {
        Self::is_blank(c) || c == b'\n'
    }

    /// Like `is_space`, without the newline.
    pub fn is_blank(c: u8) -> bool {
        [b' ', b'\t', b'\r'].iter().any(|&s| s == c)
    }
}

impl Iterator for Input<'_> {
    type Item = u8;
    fn next(&mut self) -> Option<u8> {
        self.source.next().map(|c| {
            if c == b'\n' {
                self.line += 1;
                self.column = 0;
            }
            self.column += 1;
            c
        })
    }
}
