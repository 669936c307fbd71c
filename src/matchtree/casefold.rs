//! Case-insensitive matching against a pre-lowered haystack.
//!
//! Compiling `(?i)` regexes turns every letter into a character class, which
//! defeats literal prefiltering. Instead the pattern is parsed
//! case-insensitively, every class that only pairs an ASCII letter with its
//! uppercase form is collapsed back into a lowercase literal, and the result
//! is run against an ASCII-lowercased copy of the input. Lowering ASCII never
//! changes byte lengths, so match offsets are valid in the original input.
//!
//! Patterns that turn case sensitivity back on with `(?-i)` cannot run on a
//! lowered input. They are compiled as `(?i:pattern)` and run on the input
//! as given.

use regex::bytes::Regex;
use regex_syntax::ParserBuilder;
use regex_syntax::hir::{Class, Hir, HirKind, Repetition};

use crate::error::{Result, SiftError};

/// Reusable buffer for lowered haystacks.
///
/// Owned by the caller and passed through every evaluation. One scratch must
/// not be shared by concurrent evaluations.
#[derive(Debug, Default)]
pub struct Scratch {
    lowered: Vec<u8>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lower<'a>(&'a mut self, haystack: &[u8]) -> &'a [u8] {
        self.lowered.clear();
        self.lowered.extend_from_slice(haystack);
        self.lowered.make_ascii_lowercase();
        &self.lowered
    }
}

/// A compiled regex that is optionally case-insensitive.
#[derive(Debug, Clone)]
pub struct CaseFoldRegex {
    pattern: String,
    ignore_case: bool,
    /// Whether `regex` expects an ASCII-lowercased haystack.
    lowered: bool,
    regex: Regex,
}

impl CaseFoldRegex {
    pub fn new(pattern: &str, ignore_case: bool) -> Result<Self> {
        let (regex, lowered) = if !ignore_case {
            (Regex::new(pattern)?, false)
        } else if let Some(lowered) = lowered_pattern(pattern)? {
            (Regex::new(&lowered)?, true)
        } else {
            log::debug!("pattern '{pattern}' has case-sensitive parts, matching with (?i)");
            (Regex::new(&format!("(?i:{pattern})"))?, false)
        };
        Ok(CaseFoldRegex {
            pattern: pattern.to_string(),
            ignore_case,
            lowered,
            regex,
        })
    }

    /// The pattern as given by the user.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// The regex actually run against the (possibly lowered) haystack.
    pub fn compiled(&self) -> &Regex {
        &self.regex
    }

    /// Whether matching runs against a lowercased copy of the haystack.
    pub fn is_lowered(&self) -> bool {
        self.lowered
    }

    pub fn is_match(&self, haystack: &[u8], scratch: &mut Scratch) -> bool {
        if self.lowered {
            self.regex.is_match(scratch.lower(haystack))
        } else {
            self.regex.is_match(haystack)
        }
    }

    /// Byte spans of all non-overlapping matches, in order.
    pub fn find_spans(&self, haystack: &[u8], scratch: &mut Scratch) -> Vec<(usize, usize)> {
        let haystack = if self.lowered {
            scratch.lower(haystack)
        } else {
            haystack
        };
        self.regex
            .find_iter(haystack)
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

/// Rewrite `pattern` into an equivalent pattern for ASCII-lowercased input.
///
/// Returns `None` when part of the pattern is case-sensitive, since no
/// pattern over lowered input can tell `Foo` from `foo` there.
pub fn lowered_pattern(pattern: &str) -> Result<Option<String>> {
    let hir = ParserBuilder::new()
        .case_insensitive(true)
        .build()
        .parse(pattern)
        .map_err(|e| SiftError::invalid_query(format!("invalid regex '{pattern}': {e}")))?;
    if !is_case_folded(&hir) {
        return Ok(None);
    }
    Ok(Some(lower(hir).to_string()))
}

/// Whether every ASCII letter in `hir` matches in both cases. Parsing
/// case-insensitively turns letters into classes, so a letter in a literal or
/// a class holding only one case of a letter comes from a `(?-i)` scope.
fn is_case_folded(hir: &Hir) -> bool {
    match hir.kind() {
        HirKind::Literal(lit) => !lit.0.iter().any(u8::is_ascii_alphabetic),
        HirKind::Class(class) => (b'a'..=b'z').all(|lower| {
            class_contains(class, lower) == class_contains(class, lower.to_ascii_uppercase())
        }),
        HirKind::Repetition(rep) => is_case_folded(&rep.sub),
        HirKind::Capture(cap) => is_case_folded(&cap.sub),
        HirKind::Concat(subs) | HirKind::Alternation(subs) => subs.iter().all(is_case_folded),
        HirKind::Look(_) | HirKind::Empty => true,
    }
}

fn class_contains(class: &Class, b: u8) -> bool {
    match class {
        Class::Unicode(c) => c
            .ranges()
            .iter()
            .any(|r| r.start() <= char::from(b) && char::from(b) <= r.end()),
        Class::Bytes(c) => c.ranges().iter().any(|r| r.start() <= b && b <= r.end()),
    }
}

fn lower(hir: Hir) -> Hir {
    match hir.into_kind() {
        HirKind::Literal(lit) => Hir::literal(lit.0.to_ascii_lowercase()),
        HirKind::Class(class) => match ascii_letter(&class) {
            Some(b) => Hir::literal([b]),
            None => Hir::class(class),
        },
        HirKind::Repetition(rep) => Hir::repetition(Repetition {
            sub: Box::new(lower(*rep.sub)),
            ..rep
        }),
        HirKind::Capture(mut cap) => {
            cap.sub = Box::new(lower(*cap.sub));
            Hir::capture(cap)
        }
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(lower).collect()),
        HirKind::Alternation(subs) => Hir::alternation(subs.into_iter().map(lower).collect()),
        HirKind::Look(look) => Hir::look(look),
        HirKind::Empty => Hir::empty(),
    }
}

/// The lowercase letter of a class matching exactly one ASCII letter in both
/// cases.
fn ascii_letter(class: &Class) -> Option<u8> {
    let pair: Vec<(u32, u32)> = match class {
        Class::Unicode(c) => c
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
        Class::Bytes(c) => c
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
    };
    match pair.as_slice() {
        [(u0, u1), (l0, l1)] if u0 == u1 && l0 == l1 => {
            let upper = u8::try_from(*u0).ok()?;
            let lower = u8::try_from(*l0).ok()?;
            (upper.is_ascii_uppercase() && upper.to_ascii_lowercase() == lower).then_some(lower)
        }
        _ => None,
    }
}
