//! Grammar parsing and the rewrite engine.
//!
//! A grammar source is plain text:
//!
//! ```text
//! # Koch-style quadratic curve
//! 90          # turning angle in degrees
//! 3           # iterations to precompute (counting the axiom)
//! F           # axiom
//! F F+F-F-F+F # one rule per line: <symbol> <replacement>
//! ```
//!
//! Comments run from `#` to the end of the line. Blank lines are ignored.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A line that survived preprocessing, with its 1-based number in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Strip `#` comments and surrounding whitespace, dropping lines left empty.
pub fn preprocess(text: &str) -> Vec<SourceLine<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let code = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let code = code.trim();
            (!code.is_empty()).then_some(SourceLine { number: i + 1, text: code })
        })
        .collect()
}

/// The fixed header fields of a grammar source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Angle,
    Iterations,
    Axiom,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Angle => write!(f, "angle"),
            Field::Iterations => write!(f, "iteration count"),
            Field::Axiom => write!(f, "axiom"),
        }
    }
}

/// What exactly was wrong with a grammar source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("missing {0} line")]
    MissingField(Field),
    #[error("angle must be a finite number, got {0:?}")]
    InvalidAngle(String),
    #[error("iteration count must be a non-negative integer, got {0:?}")]
    InvalidIterations(String),
    #[error("axiom is empty")]
    EmptyAxiom,
    #[error("symbol string {0:?} contains whitespace")]
    InvalidSymbolString(String),
    #[error("rule symbol must be a single character, got {0:?}")]
    InvalidRuleSymbol(String),
    #[error("rule for {0:?} has no replacement")]
    MissingReplacement(char),
    #[error("duplicate rule for {0:?}")]
    DuplicateRule(char),
}

/// A malformed grammar source.
///
/// `line` is the line number in the text as written (comments included),
/// or `None` when the problem is that the input ended early.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{kind}", line_prefix(.line))]
pub struct ParseError {
    pub line: Option<usize>,
    pub kind: ParseErrorKind,
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!("line {}: ", n),
        None => String::new(),
    }
}

impl ParseError {
    pub fn at(line: usize, kind: ParseErrorKind) -> Self {
        Self { line: Some(line), kind }
    }

    pub fn eof(kind: ParseErrorKind) -> Self {
        Self { line: None, kind }
    }
}

/// Rewrite rules, turning angle, axiom and the iteration target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    angle: f32,
    axiom: String,
    rules: BTreeMap<char, String>,
    target_iterations: u32,
}

impl Grammar {
    /// Start a grammar from an axiom and turning angle (degrees).
    pub fn new(axiom: impl Into<String>, angle: f32) -> Self {
        Self {
            angle,
            axiom: axiom.into(),
            rules: BTreeMap::new(),
            target_iterations: 1,
        }
    }

    /// Add a rule. A later rule for the same symbol replaces the earlier one.
    pub fn with_rule(mut self, symbol: char, replacement: impl Into<String>) -> Self {
        self.rules.insert(symbol, replacement.into());
        self
    }

    pub fn with_iterations(mut self, target: u32) -> Self {
        self.target_iterations = target;
        self
    }

    /// Parse a grammar source, comments and all.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let lines = preprocess(text);
        let mut lines = lines.into_iter();

        let angle_line = lines
            .next()
            .ok_or(ParseError::eof(ParseErrorKind::MissingField(Field::Angle)))?;
        let angle = angle_line
            .text
            .parse::<f32>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| {
                ParseError::at(
                    angle_line.number,
                    ParseErrorKind::InvalidAngle(angle_line.text.to_string()),
                )
            })?;

        let iter_line = lines
            .next()
            .ok_or(ParseError::eof(ParseErrorKind::MissingField(Field::Iterations)))?;
        let target_iterations = iter_line.text.parse::<u32>().map_err(|_| {
            ParseError::at(
                iter_line.number,
                ParseErrorKind::InvalidIterations(iter_line.text.to_string()),
            )
        })?;

        let axiom_line = lines
            .next()
            .ok_or(ParseError::eof(ParseErrorKind::MissingField(Field::Axiom)))?;
        let axiom = symbol_string(axiom_line)?;
        if axiom.is_empty() {
            return Err(ParseError::at(axiom_line.number, ParseErrorKind::EmptyAxiom));
        }

        let mut rules = BTreeMap::new();
        for line in lines {
            let (symbol, replacement) = parse_rule(line)?;
            if rules.insert(symbol, replacement).is_some() {
                return Err(ParseError::at(line.number, ParseErrorKind::DuplicateRule(symbol)));
            }
        }

        Ok(Self {
            angle,
            axiom,
            rules,
            target_iterations,
        })
    }

    /// Turning angle in degrees.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    pub fn rules(&self) -> &BTreeMap<char, String> {
        &self.rules
    }

    pub fn rule(&self, symbol: char) -> Option<&str> {
        self.rules.get(&symbol).map(String::as_str)
    }

    /// Number of iterations (axiom included) to precompute on load.
    pub fn target_iterations(&self) -> u32 {
        self.target_iterations
    }

    /// Apply every rule once, left to right.
    ///
    /// Symbols without a rule are copied through unchanged. Replacements
    /// are spliced in verbatim and never rewritten again within the same call.
    pub fn rewrite(&self, symbols: &str) -> String {
        let mut next = String::with_capacity(self.expansion_len(symbols).unwrap_or(symbols.len()));
        for c in symbols.chars() {
            match self.rules.get(&c) {
                Some(replacement) => next.push_str(replacement),
                None => next.push(c),
            }
        }
        next
    }

    /// Length (in symbols) of `rewrite(symbols)`, without building it.
    ///
    /// `None` if the length doesn't fit in a `usize`.
    pub fn expansion_len(&self, symbols: &str) -> Option<usize> {
        symbols.chars().try_fold(0usize, |len, c| {
            len.checked_add(self.rules.get(&c).map_or(1, |r| r.chars().count()))
        })
    }
}

/// A symbol string is one token: no embedded whitespace.
fn symbol_string(line: SourceLine<'_>) -> Result<String, ParseError> {
    if line.text.chars().any(char::is_whitespace) {
        return Err(ParseError::at(
            line.number,
            ParseErrorKind::InvalidSymbolString(line.text.to_string()),
        ));
    }
    Ok(line.text.to_string())
}

/// `<symbol> <replacement>`
fn parse_rule(line: SourceLine<'_>) -> Result<(char, String), ParseError> {
    let mut chars = line.text.chars();
    // Preprocessing never yields an empty line.
    let Some(symbol) = chars.next() else {
        return Err(ParseError::at(line.number, ParseErrorKind::InvalidRuleSymbol(String::new())));
    };

    let rest = chars.as_str();
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        let token = line.text.split_whitespace().next().unwrap_or(line.text);
        return Err(ParseError::at(
            line.number,
            ParseErrorKind::InvalidRuleSymbol(token.to_string()),
        ));
    }

    let replacement = rest.trim();
    if replacement.is_empty() {
        return Err(ParseError::at(line.number, ParseErrorKind::MissingReplacement(symbol)));
    }

    let replacement = symbol_string(SourceLine { number: line.number, text: replacement })?;
    Ok((symbol, replacement))
}
