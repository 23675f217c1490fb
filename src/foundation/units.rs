//! Time and gain attribute grammars.
//!
//! Time: `[+|-] <digits>[.<digits>][h|min|s|ms]`, seconds when the unit is omitted.
//! Gain: `[+|-] <digits>[.<digits>] dB`.

use crate::foundation::error::{ThalaError, ThalaResult};

/// Parse a time attribute into seconds.
pub fn parse_time(query: &str) -> ThalaResult<f64> {
    let mut cur = Cursor::new(query);
    cur.skip_ws();
    let value = cur
        .signed_number()
        .ok_or_else(|| ThalaError::parse(format!("invalid time value '{query}'")))?;
    let scale = if cur.eat("h") {
        3600.0
    } else if cur.eat("min") {
        60.0
    } else if cur.eat("ms") {
        1e-3
    } else {
        // bare numbers are seconds
        cur.eat("s");
        1.0
    };
    cur.skip_ws();
    if !cur.is_done() {
        return Err(ThalaError::parse(format!("invalid time value '{query}'")));
    }
    Ok(value * scale)
}

/// Parse a gain attribute into decibels.
pub fn parse_gain(query: &str) -> ThalaResult<f64> {
    let mut cur = Cursor::new(query);
    cur.skip_ws();
    let value = cur
        .signed_number()
        .ok_or_else(|| ThalaError::parse(format!("invalid gain value '{query}'")))?;
    cur.skip_ws();
    if !cur.eat("dB") || !cur.is_done() {
        return Err(ThalaError::parse(format!(
            "invalid gain value '{query}' (expected '<number>dB')"
        )));
    }
    Ok(value)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn digits(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(head)
    }

    fn signed_number(&mut self) -> Option<f64> {
        let negative = if self.eat("-") {
            true
        } else {
            self.eat("+");
            false
        };
        self.skip_ws();
        let int = self.digits()?;
        let mut text = int.to_owned();
        if self.rest.starts_with('.') {
            let save = self.rest;
            self.rest = &self.rest[1..];
            match self.digits() {
                Some(frac) => {
                    text.push('.');
                    text.push_str(frac);
                }
                None => self.rest = save,
            }
        }
        let v: f64 = text.parse().ok()?;
        Some(if negative { -v } else { v })
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/units.rs"]
mod tests;
