// BRE/ERE recursive-descent parser (spec.md §4.C). The BRE pre-pass is
// implemented by threading an `extended: bool` through every parse
// function rather than literally rewriting the byte stream: in BRE mode,
// `+ ? | ( ) { }` are literal unless escaped; in ERE mode they're
// metacharacters unless escaped. Both modes share one grammar
// implementation, which is the same "one parser, context flag" shape
// `defuz-regex`'s upstream sibling (`regex-syntax`) uses for its own
// extended/verbose mode switches.

use crate::error::{Error, Result};
use crate::regex::ast::Ast;
use crate::regex::class::{self, ClassBitmap};

pub struct Parser<'p> {
    pattern: &'p [u8],
    pos: usize,
    extended: bool,
    next_group: u32,
}

impl<'p> Parser<'p> {
    pub fn new(pattern: &'p [u8], extended: bool) -> Parser<'p> {
        Parser { pattern, pos: 0, extended, next_group: 1 }
    }

    pub fn parse(mut self) -> Result<(Ast, u32)> {
        let ast = self.parse_expr()?;
        if !self.at_end() {
            // A stray, unmatched ')' is the only way parse_expr returns
            // before end of input.
            return Err(Error::UnmatchedParen);
        }
        Ok((ast, self.next_group - 1))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    /// Is byte `b` acting as the metacharacter `meta` at the current parse
    /// position, given the active grammar? This is the single place the
    /// BRE/ERE "swap specialness" rule (spec.md §4.C) is applied.
    fn is_meta(&self, b: u8, meta: u8) -> bool {
        if b != meta {
            return false;
        }
        match meta {
            b'+' | b'?' | b'|' | b'(' | b')' | b'{' | b'}' => self.extended,
            _ => true,
        }
    }

    fn is_escaped_meta(&self, b: u8, meta: u8) -> bool {
        if b != meta {
            return false;
        }
        match meta {
            b'+' | b'?' | b'|' | b'(' | b')' | b'{' | b'}' => !self.extended,
            _ => false,
        }
    }

    // expr := term ('|' term)*
    fn parse_expr(&mut self) -> Result<Ast> {
        let mut alts = vec![self.parse_term()?];
        loop {
            if self.peek_is_bar() {
                self.consume_bar();
                alts.push(self.parse_term()?);
            } else {
                break;
            }
        }
        if alts.len() == 1 {
            Ok(alts.pop().unwrap())
        } else {
            Ok(Ast::Alt(alts))
        }
    }

    fn peek_is_bar(&self) -> bool {
        match self.peek() {
            Some(b) if self.is_meta(b, b'|') => true,
            Some(b'\\') => {
                matches!(self.pattern.get(self.pos + 1), Some(&b2) if self.is_escaped_meta(b2, b'|'))
            }
            _ => false,
        }
    }

    fn consume_bar(&mut self) {
        if self.peek() == Some(b'\\') {
            self.pos += 2;
        } else {
            self.pos += 1;
        }
    }

    // term := factor+
    fn parse_term(&mut self) -> Result<Ast> {
        let mut nodes = Vec::new();
        while !self.at_end() && !self.at_alt_or_close() {
            nodes.push(self.parse_factor()?);
        }
        match nodes.len() {
            0 => Ok(Ast::Empty),
            1 => Ok(nodes.pop().unwrap()),
            _ => Ok(Ast::Concat(nodes)),
        }
    }

    fn at_alt_or_close(&self) -> bool {
        if self.peek_is_bar() {
            return true;
        }
        match self.peek() {
            Some(b) if self.is_meta(b, b')') => true,
            Some(b'\\') => {
                matches!(self.pattern.get(self.pos + 1), Some(&b2) if self.is_escaped_meta(b2, b')'))
            }
            _ => false,
        }
    }

    // factor := base quantifier?
    fn parse_factor(&mut self) -> Result<Ast> {
        let base = self.parse_base()?;
        self.parse_quantifier(base)
    }

    fn parse_quantifier(&mut self, base: Ast) -> Result<Ast> {
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(Ast::Star(Box::new(base)))
            }
            Some(b) if self.is_meta(b, b'+') => {
                self.pos += 1;
                Ok(Ast::Plus(Box::new(base)))
            }
            Some(b) if self.is_meta(b, b'?') => {
                self.pos += 1;
                Ok(Ast::Question(Box::new(base)))
            }
            Some(b) if self.is_meta(b, b'{') => self.parse_brace_quantifier(base),
            Some(b'\\') => {
                let next = self.pattern.get(self.pos + 1).copied();
                if matches!(next, Some(b2) if self.is_escaped_meta(b2, b'+')) {
                    self.pos += 2;
                    Ok(Ast::Plus(Box::new(base)))
                } else if matches!(next, Some(b2) if self.is_escaped_meta(b2, b'?')) {
                    self.pos += 2;
                    Ok(Ast::Question(Box::new(base)))
                } else if matches!(next, Some(b2) if self.is_escaped_meta(b2, b'{')) {
                    self.pos += 2;
                    self.parse_brace_body(base)
                } else {
                    Ok(base)
                }
            }
            _ => Ok(base),
        }
    }

    fn parse_brace_quantifier(&mut self, base: Ast) -> Result<Ast> {
        self.pos += 1; // consume '{'
        self.parse_brace_body(base)
    }

    fn parse_brace_body(&mut self, base: Ast) -> Result<Ast> {
        let start = self.pos;
        let min = self.parse_number();
        let (min, max) = if self.peek() == Some(b',') {
            self.pos += 1;
            let max = self.parse_number();
            (min, max)
        } else {
            (min, min)
        };
        let min = match min {
            Some(n) => n,
            None => {
                self.pos = start;
                return Err(Error::InvalidQuantifier);
            }
        };
        // consume closing brace (escaped in BRE, bare in ERE).
        if self.peek() == Some(b'\\') && !self.extended {
            self.pos += 2;
        } else if self.peek() == Some(b'}') && self.extended {
            self.pos += 1;
        } else {
            return Err(Error::InvalidQuantifier);
        }
        if let Some(m) = max {
            if m < min {
                return Err(Error::InvalidQuantifier);
            }
        }
        Ok(Ast::Repeat { node: Box::new(base), min, max })
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.pattern[start..self.pos]).ok()?.parse().ok()
    }

    fn parse_base(&mut self) -> Result<Ast> {
        let b = match self.bump() {
            Some(b) => b,
            None => return Ok(Ast::Empty),
        };
        match b {
            b'.' => Ok(Ast::Dot),
            b'^' if self.pos == 1 || self.after_group_or_alt_open() => Ok(Ast::StartAnchor),
            b'$' if self.at_end_of_term() => Ok(Ast::EndAnchor),
            b'[' => self.parse_class(),
            b'\\' => self.parse_escape(),
            b'(' if self.is_meta(b, b'(') => self.parse_group(),
            b')' if self.is_meta(b, b')') => {
                // Caller (`parse_term`) should have stopped before this;
                // reaching here means an unmatched ')'.
                self.pos -= 1;
                Err(Error::UnmatchedParen)
            }
            other => Ok(Ast::Literal(other)),
        }
    }

    fn after_group_or_alt_open(&self) -> bool {
        // `^` is anchor-like at the start of any term (start of pattern,
        // right after '(' or right after '|'). Since `parse_term` is only
        // ever invoked at such a position, treat every `^` seen as the
        // first base of a term as an anchor (spec.md §4.C: internal
        // `^`/`$` still become assertion states via the same Ast node --
        // only the *compiler* distinguishes top-level placement for the
        // `anchored_start`/`anchored_end` flags).
        true
    }

    fn at_end_of_term(&self) -> bool {
        self.at_end() || self.at_alt_or_close()
    }

    fn parse_group(&mut self) -> Result<Ast> {
        // '(' already consumed by caller via bump() in parse_base; handle
        // the ERE '(' path (BRE's escaped '\(' is routed through
        // parse_escape instead, see below).
        let idx = self.next_group;
        self.next_group += 1;
        let inner = self.parse_expr()?;
        match self.peek() {
            Some(b) if self.is_meta(b, b')') => {
                self.pos += 1;
            }
            Some(b'\\') if self.pattern.get(self.pos + 1) == Some(&b')') && !self.extended => {
                self.pos += 2;
            }
            _ => return Err(Error::UnmatchedParen),
        }
        Ok(Ast::Group { node: Box::new(inner), index: idx })
    }

    fn parse_escape(&mut self) -> Result<Ast> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(Error::InvalidEscape('\\')),
        };
        if !self.extended {
            // BRE: escaped metacharacters.
            match c {
                b'(' => return self.parse_group_bre(),
                b'+' | b'?' | b'|' | b'{' | b'}' => {
                    // These are handled by the quantifier/alt parsers when
                    // they look ahead; reaching here as a *base* means the
                    // escape appeared where a base was expected (e.g. "\+"
                    // at the start of a term), which BRE treats as a
                    // literal occurrence of the character.
                    return Ok(Ast::Literal(c));
                }
                _ => {}
            }
        }
        match c {
            b'd' => Ok(Ast::Class { bitmap: class::digit(), negated: false }),
            b'D' => Ok(Ast::Class { bitmap: class::digit(), negated: true }),
            b'w' => Ok(Ast::Class { bitmap: class::word(), negated: false }),
            b'W' => Ok(Ast::Class { bitmap: class::word(), negated: true }),
            b's' => Ok(Ast::Class { bitmap: class::space(), negated: false }),
            b'S' => Ok(Ast::Class { bitmap: class::space(), negated: true }),
            b'b' => Ok(Ast::WordBoundary),
            b'B' => Ok(Ast::NotWordBoundary),
            b'n' => Ok(Ast::Literal(b'\n')),
            b't' => Ok(Ast::Literal(b'\t')),
            b'r' => Ok(Ast::Literal(b'\r')),
            b'.' | b'*' | b'[' | b']' | b'^' | b'$' | b'\\' => Ok(Ast::Literal(c)),
            b'(' | b')' | b'+' | b'?' | b'|' | b'{' | b'}' => Ok(Ast::Literal(c)),
            _ if c.is_ascii_alphanumeric() => Err(Error::InvalidEscape(c as char)),
            _ => Ok(Ast::Literal(c)),
        }
    }

    fn parse_group_bre(&mut self) -> Result<Ast> {
        let idx = self.next_group;
        self.next_group += 1;
        let inner = self.parse_expr()?;
        if self.peek() == Some(b'\\') && self.pattern.get(self.pos + 1) == Some(&b')') {
            self.pos += 2;
        } else {
            return Err(Error::UnmatchedParen);
        }
        Ok(Ast::Group { node: Box::new(inner), index: idx })
    }

    fn parse_class(&mut self) -> Result<Ast> {
        let negated = if self.peek() == Some(b'^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut bitmap = ClassBitmap::empty();
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(Error::UnmatchedBracket),
                Some(b']') if !first => {
                    self.pos += 1;
                    break;
                }
                Some(b'[') if self.pattern.get(self.pos + 1) == Some(&b':') => {
                    self.parse_posix_class(&mut bitmap)?;
                }
                Some(_) => {
                    self.parse_class_member(&mut bitmap)?;
                }
            }
            first = false;
        }
        Ok(Ast::Class { bitmap, negated })
    }

    fn parse_posix_class(&mut self, bitmap: &mut ClassBitmap) -> Result<()> {
        self.pos += 2; // consume "[:"
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b != b':') {
            self.pos += 1;
        }
        let name = std::str::from_utf8(&self.pattern[start..self.pos])
            .map_err(|_| Error::InvalidPattern("non-utf8 class name".into()))?;
        if self.pattern.get(self.pos) != Some(&b':') || self.pattern.get(self.pos + 1) != Some(&b']') {
            return Err(Error::UnmatchedBracket);
        }
        self.pos += 2; // consume ":]"
        let class = class::posix_class(name).ok_or_else(|| Error::InvalidPattern(format!("[:{}:]", name)))?;
        *bitmap = bitmap.union(&class);
        Ok(())
    }

    fn parse_class_member(&mut self, bitmap: &mut ClassBitmap) -> Result<()> {
        let lo = self.parse_class_byte()?;
        if self.peek() == Some(b'-') && self.pattern.get(self.pos + 1).map_or(false, |&b| b != b']') {
            self.pos += 1;
            let hi = self.parse_class_byte()?;
            if lo > hi {
                return Err(Error::InvalidRange);
            }
            bitmap.set_range(lo, hi);
        } else {
            bitmap.set(lo);
        }
        Ok(())
    }

    fn parse_class_byte(&mut self) -> Result<u8> {
        match self.bump() {
            None => Err(Error::UnmatchedBracket),
            Some(b'\\') => match self.bump() {
                Some(b'n') => Ok(b'\n'),
                Some(b't') => Ok(b'\t'),
                Some(b'r') => Ok(b'\r'),
                Some(c) => Ok(c),
                None => Err(Error::InvalidEscape('\\')),
            },
            Some(b) => Ok(b),
        }
    }
}

/// Parse `pattern` into an AST plus the number of capture groups
/// (not counting the implicit whole-match group), per spec.md §4.C.
pub fn parse(pattern: &[u8], extended: bool) -> Result<(Ast, u32)> {
    Parser::new(pattern, extended).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ere_alternation() {
        let (ast, _) = parse(b"cat|dog", true).unwrap();
        assert!(matches!(ast, Ast::Alt(_)));
    }

    #[test]
    fn ere_plus_quantifier() {
        let (ast, _) = parse(b"ab+c", true).unwrap();
        assert!(matches!(ast, Ast::Concat(_)));
    }

    #[test]
    fn bre_escaped_plus_is_meta() {
        let (ast, _) = parse(b"ab\\+c", false).unwrap();
        assert!(matches!(ast, Ast::Concat(_)));
    }

    #[test]
    fn bre_bare_plus_is_literal() {
        let (ast, _) = parse(b"a+", false).unwrap();
        match ast {
            Ast::Concat(nodes) => {
                assert!(matches!(nodes[1], Ast::Literal(b'+')));
            }
            _ => panic!("expected concat"),
        }
    }

    #[test]
    fn unmatched_paren_errors() {
        assert_eq!(parse(b"(abc", true).unwrap_err(), Error::UnmatchedParen);
    }

    #[test]
    fn unmatched_bracket_errors() {
        assert_eq!(parse(b"[abc", true).unwrap_err(), Error::UnmatchedBracket);
    }

    #[test]
    fn invalid_range_errors() {
        assert_eq!(parse(b"[z-a]", true).unwrap_err(), Error::InvalidRange);
    }

    #[test]
    fn invalid_quantifier_range() {
        assert_eq!(parse(b"a{3,1}", true).unwrap_err(), Error::InvalidQuantifier);
    }

    #[test]
    fn posix_class_parses() {
        let (_, groups) = parse(b"[[:digit:]]+", true).unwrap();
        assert_eq!(groups, 0);
    }
}
