//! Random strings from regular expressions.
//!
//! Supports the subset of ECMA/PCRE syntax that shows up in API schemas:
//! - literals and escaped literals (`\.`, `\-`, `\n`, `\t`, `\xHH`, `\uHHHH`)
//! - `.` (any printable ASCII character)
//! - `\d` `\w` `\s` and their negations `\D` `\W` `\S`
//! - `[abc]`, `[a-z]`, `[^a-z]` character classes
//! - `(...)`, `(?:...)` groups with `|` alternation
//! - `*`, `+`, `?`, `{n}`, `{n,}`, `{n,m}` (lazy and possessive suffixes are ignored)
//! - `^`, `$`, `\A`, `\z`, `\Z`, `\b`, `\B` (generate nothing)
//!
//! Backreferences and lookaround are rejected. Generated strings are expected to be
//! checked against the compiled regex by the caller.

use rand::Rng;
use thiserror::Error;

/// How far past the lower bound an open repetition (`*`, `+`, `{n,}`) may run
const OPEN_REPEAT_SPAN: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PatternError(String);

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(char),
    Class { ranges: Vec<(char, char)>, negated: bool },
    AnyChar,
    Group(Vec<Vec<Node>>),
    Repeat { node: Box<Node>, min: u32, max: u32 },
    Empty,
}

/// A parsed pattern that can draw matching strings
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    alternatives: Vec<Vec<Node>>,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut parser = Parser {
            chars: pattern.chars().collect(),
            pos: 0,
        };
        let alternatives = parser.alternatives(false)?;
        Ok(Self { alternatives })
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::new();
        generate_alternatives(&self.alternatives, rng, &mut out);
        out
    }
}

enum ClassItem {
    Char(char),
    Ranges(Vec<(char, char)>),
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: &str) -> PatternError {
        PatternError(format!("{} at position {}", message, self.pos))
    }

    fn alternatives(&mut self, in_group: bool) -> Result<Vec<Vec<Node>>, PatternError> {
        let mut alternatives = vec![Vec::new()];
        loop {
            match self.peek() {
                None if in_group => return Err(self.error("unclosed group")),
                None => break,
                Some(')') if in_group => {
                    self.pos += 1;
                    break;
                }
                Some(')') => return Err(self.error("unbalanced parenthesis")),
                Some('|') => {
                    self.pos += 1;
                    alternatives.push(Vec::new());
                }
                Some(_) => {
                    let atom = self.atom()?;
                    let node = self.quantifier(atom)?;
                    if let Some(current) = alternatives.last_mut() {
                        current.push(node);
                    }
                }
            }
        }
        Ok(alternatives)
    }

    fn atom(&mut self) -> Result<Node, PatternError> {
        let c = self.next().ok_or_else(|| self.error("unexpected end of pattern"))?;
        Ok(match c {
            '(' => {
                if self.peek() == Some('?') {
                    self.pos += 1;
                    if self.next() != Some(':') {
                        return Err(self.error("unsupported group construct"));
                    }
                }
                Node::Group(self.alternatives(true)?)
            }
            '[' => self.class()?,
            '.' => Node::AnyChar,
            '^' | '$' => Node::Empty,
            '\\' => match self.escape()? {
                ClassItem::Char(c) => Node::Literal(c),
                ClassItem::Ranges(ranges) if ranges.is_empty() => Node::Empty,
                ClassItem::Ranges(ranges) => {
                    let negated = ranges.first() == Some(&NEGATED_MARKER);
                    let ranges = if negated { ranges[1..].to_vec() } else { ranges };
                    Node::Class { ranges, negated }
                }
            },
            '*' | '+' | '?' => return Err(self.error("nothing to repeat")),
            c => Node::Literal(c),
        })
    }

    fn escape(&mut self) -> Result<ClassItem, PatternError> {
        let c = self.next().ok_or_else(|| self.error("dangling escape"))?;
        let negate = |mut ranges: Vec<(char, char)>| {
            ranges.insert(0, NEGATED_MARKER);
            ClassItem::Ranges(ranges)
        };
        Ok(match c {
            'd' => ClassItem::Ranges(DIGIT.to_vec()),
            'D' => negate(DIGIT.to_vec()),
            'w' => ClassItem::Ranges(WORD.to_vec()),
            'W' => negate(WORD.to_vec()),
            's' => ClassItem::Ranges(SPACE.to_vec()),
            'S' => negate(SPACE.to_vec()),
            'A' | 'z' | 'Z' | 'b' | 'B' => ClassItem::Ranges(Vec::new()),
            'n' => ClassItem::Char('\n'),
            't' => ClassItem::Char('\t'),
            'r' => ClassItem::Char('\r'),
            'f' => ClassItem::Char('\u{0c}'),
            'v' => ClassItem::Char('\u{0b}'),
            '0' => ClassItem::Char('\0'),
            'x' => ClassItem::Char(self.hex(2)?),
            'u' => ClassItem::Char(self.hex(4)?),
            '1'..='9' => return Err(self.error("backreferences are not supported")),
            other => ClassItem::Char(other),
        })
    }

    fn hex(&mut self, digits: usize) -> Result<char, PatternError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn class(&mut self) -> Result<Node, PatternError> {
        let negated = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut ranges = Vec::new();
        let mut first = true;
        loop {
            let c = self
                .next()
                .ok_or_else(|| self.error("unclosed character class"))?;
            if c == ']' && !first {
                break;
            }
            first = false;
            let start = if c == '\\' {
                match self.escape()? {
                    ClassItem::Char(c) => c,
                    ClassItem::Ranges(items) => {
                        if items.first() == Some(&NEGATED_MARKER) {
                            return Err(self.error("negated escapes inside classes are not supported"));
                        }
                        ranges.extend(items);
                        continue;
                    }
                }
            } else {
                c
            };
            if self.peek() == Some('-') && self.peek_at(1).map_or(false, |n| n != ']') {
                self.pos += 1;
                let end = match self.next() {
                    Some('\\') => match self.escape()? {
                        ClassItem::Char(c) => c,
                        ClassItem::Ranges(_) => return Err(self.error("invalid class range")),
                    },
                    Some(c) => c,
                    None => return Err(self.error("unclosed character class")),
                };
                if end < start {
                    return Err(self.error("invalid class range"));
                }
                ranges.push((start, end));
            } else {
                ranges.push((start, start));
            }
        }
        Ok(Node::Class { ranges, negated })
    }

    fn quantifier(&mut self, atom: Node) -> Result<Node, PatternError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, OPEN_REPEAT_SPAN)
            }
            Some('+') => {
                self.pos += 1;
                (1, 1 + OPEN_REPEAT_SPAN)
            }
            Some('?') => {
                self.pos += 1;
                (0, 1)
            }
            Some('{') => match self.braces()? {
                Some(bounds) => bounds,
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        if matches!(self.peek(), Some('?') | Some('+')) {
            self.pos += 1;
        }
        Ok(Node::Repeat {
            node: Box::new(atom),
            min,
            max,
        })
    }

    /// `{n}`, `{n,}` or `{n,m}`. Anything else leaves `{` as a literal.
    fn braces(&mut self) -> Result<Option<(u32, u32)>, PatternError> {
        let close = match self.chars[self.pos..].iter().position(|c| *c == '}') {
            Some(offset) => self.pos + offset,
            None => return Ok(None),
        };
        let body: String = self.chars[self.pos + 1..close].iter().collect();
        let parse = |s: &str| s.trim().parse::<u32>().ok();
        let bounds = match body.split_once(',') {
            None => parse(&body).map(|n| (n, n)),
            Some((min, "")) => parse(min).map(|n| (n, n + OPEN_REPEAT_SPAN)),
            Some((min, max)) => parse(min).zip(parse(max)),
        };
        match bounds {
            Some((min, max)) if min > max => Err(self.error("invalid repetition bounds")),
            Some(bounds) => {
                self.pos = close + 1;
                Ok(Some(bounds))
            }
            None => Ok(None),
        }
    }
}

/// Sentinel range marking a negated shorthand class
const NEGATED_MARKER: (char, char) = ('\u{0}', '\u{0}');
const DIGIT: [(char, char); 1] = [('0', '9')];
const WORD: [(char, char); 4] = [('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')];
const SPACE: [(char, char); 2] = [(' ', ' '), ('\t', '\t')];

fn generate_alternatives<R: Rng + ?Sized>(alternatives: &[Vec<Node>], rng: &mut R, out: &mut String) {
    if alternatives.is_empty() {
        return;
    }
    let choice = &alternatives[rng.gen_range(0..alternatives.len())];
    for node in choice {
        generate_node(node, rng, out);
    }
}

fn generate_node<R: Rng + ?Sized>(node: &Node, rng: &mut R, out: &mut String) {
    match node {
        Node::Literal(c) => out.push(*c),
        Node::Class { ranges, negated: false } => {
            if let Some(c) = pick_from_ranges(ranges, rng) {
                out.push(c);
            }
        }
        Node::Class { ranges, negated: true } => {
            let candidates: Vec<char> = (0x20u8..=0x7e)
                .map(char::from)
                .filter(|c| !ranges.iter().any(|(lo, hi)| lo <= c && c <= hi))
                .collect();
            if !candidates.is_empty() {
                out.push(candidates[rng.gen_range(0..candidates.len())]);
            }
        }
        Node::AnyChar => out.push(char::from(rng.gen_range(0x20u8..=0x7e))),
        Node::Group(alternatives) => generate_alternatives(alternatives, rng, out),
        Node::Repeat { node, min, max } => {
            let count = rng.gen_range(*min..=*max);
            for _ in 0..count {
                generate_node(node, rng, out);
            }
        }
        Node::Empty => {}
    }
}

fn pick_from_ranges<R: Rng + ?Sized>(ranges: &[(char, char)], rng: &mut R) -> Option<char> {
    let size = |(lo, hi): &(char, char)| (*hi as u32 - *lo as u32) + 1;
    let total: u32 = ranges.iter().map(size).sum();
    if total == 0 {
        return None;
    }
    let mut index = rng.gen_range(0..total);
    for range in ranges {
        let span = size(range);
        if index < span {
            return char::from_u32(range.0 as u32 + index).or(Some(range.0));
        }
        index -= span;
    }
    None
}
