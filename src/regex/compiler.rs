// Thompson-construction NFA compiler (spec.md §4.C "NFA construction").
// Builds fragments with dangling out-edges and backpatches them as larger
// fragments are assembled -- the classic McNaughton-Yamada-Thompson
// technique, expressed over the index-addressed `Arena` from
// design note §9 instead of the teacher's heap-linked `Inst` graph.

use crate::error::{Error, Result};
use crate::options::SearchOptions;
use crate::regex::ast::Ast;
use crate::regex::class::{self, ClassBitmap};
use crate::regex::nfa::{Arena, CompiledRegex, Kind, NO_EDGE};

/// Upper bound on NFA states a single pattern may compile to (spec.md
/// §4.C: "otherwise reject as PatternTooComplex"). The data model commits
/// only to "≥256 NFA states"; 4096 gives real patterns headroom while still
/// bounding `{n,m}` unrolling and GPU buffer sizes.
pub const STATE_CAP: usize = 4096;

#[derive(Clone, Copy)]
enum Slot {
    Out,
    Out2,
}

#[derive(Clone, Copy)]
struct Patch(u32, Slot);

struct Frag {
    start: u32,
    dangling: Vec<Patch>,
}

struct Compiler<'o> {
    arena: Arena,
    options: &'o SearchOptions,
}

impl<'o> Compiler<'o> {
    fn check_cap(&self) -> Result<()> {
        if self.arena.len() > STATE_CAP {
            Err(Error::PatternTooComplex)
        } else {
            Ok(())
        }
    }

    fn push(&mut self, kind: Kind) -> Result<u32> {
        let idx = self.arena.push(kind);
        self.check_cap()?;
        Ok(idx)
    }

    fn patch(&mut self, patches: &[Patch], target: u32) {
        for p in patches {
            match p.1 {
                Slot::Out => self.arena.set_out(p.0, target),
                Slot::Out2 => self.arena.set_out2(p.0, target),
            }
        }
    }

    fn compile(&mut self, ast: &Ast) -> Result<Frag> {
        match ast {
            Ast::Empty => {
                // An empty fragment is represented as a Split whose both
                // arms are dangling; concatenation simply rewires it away.
                // Using a zero-width `WordBoundary`-less no-op keeps the
                // state machine uniform: model it as a single dangling
                // pass-through via a Split with identical dangling outs.
                let idx = self.push(Kind::Split)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out), Patch(idx, Slot::Out2)] })
            }
            Ast::Literal(b) => {
                let idx = self.push(Kind::Literal { byte: *b, case_insensitive: self.options.case_insensitive })?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::Dot => {
                let idx = self.push(Kind::Dot)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::Class { bitmap, negated } => {
                let bm = if self.options.case_insensitive { class::fold(*bitmap) } else { *bitmap };
                let idx = self.push(Kind::CharClass { bitmap: bm, negated: *negated })?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::WordBoundary => {
                let idx = self.push(Kind::WordBoundary)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::NotWordBoundary => {
                let idx = self.push(Kind::NotWordBoundary)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::StartAnchor => {
                let idx = self.push(Kind::LineStart)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::EndAnchor => {
                let idx = self.push(Kind::LineEnd)?;
                Ok(Frag { start: idx, dangling: vec![Patch(idx, Slot::Out)] })
            }
            Ast::Concat(nodes) => {
                let mut iter = nodes.iter();
                let first = match iter.next() {
                    Some(n) => self.compile(n)?,
                    None => return self.compile(&Ast::Empty),
                };
                let start = first.start;
                let mut dangling = first.dangling;
                for node in iter {
                    let frag = self.compile(node)?;
                    self.patch(&dangling, frag.start);
                    dangling = frag.dangling;
                }
                Ok(Frag { start, dangling })
            }
            Ast::Alt(alts) => {
                // Chain of binary Splits, left-associative, preserving the
                // teacher's "goto1 has precedence over goto2" priority
                // convention from `inst.rs`'s `InstSplit`.
                let mut iter = alts.iter();
                let mut acc = self.compile(iter.next().expect("alt has >=1 branch"))?;
                for node in iter {
                    let rhs = self.compile(node)?;
                    let split = self.push(Kind::Split)?;
                    self.arena.set_out(split, acc.start);
                    self.arena.set_out2(split, rhs.start);
                    let mut dangling = acc.dangling;
                    dangling.extend(rhs.dangling);
                    acc = Frag { start: split, dangling };
                }
                Ok(acc)
            }
            Ast::Group { node, index } => {
                let start_idx = self.push(Kind::GroupStart(*index))?;
                let inner = self.compile(node)?;
                self.arena.set_out(start_idx, inner.start);
                let end_idx = self.push(Kind::GroupEnd(*index))?;
                self.patch(&inner.dangling, end_idx);
                Ok(Frag { start: start_idx, dangling: vec![Patch(end_idx, Slot::Out)] })
            }
            Ast::Star(inner) => {
                let split = self.push(Kind::Split)?;
                let body = self.compile(inner)?;
                self.arena.set_out(split, body.start);
                self.patch(&body.dangling, split);
                Ok(Frag { start: split, dangling: vec![Patch(split, Slot::Out2)] })
            }
            Ast::Plus(inner) => {
                let body = self.compile(inner)?;
                let split = self.push(Kind::Split)?;
                self.arena.set_out(split, body.start);
                self.patch(&body.dangling, split);
                Ok(Frag { start: body.start, dangling: vec![Patch(split, Slot::Out2)] })
            }
            Ast::Question(inner) => {
                let split = self.push(Kind::Split)?;
                let body = self.compile(inner)?;
                self.arena.set_out(split, body.start);
                let mut dangling = body.dangling;
                dangling.push(Patch(split, Slot::Out2));
                Ok(Frag { start: split, dangling })
            }
            Ast::Repeat { node, min, max } => self.compile_repeat(node, *min, *max),
        }
    }

    /// `{n,m}` unrolling (spec.md §4.C): duplicate the sub-pattern `n`
    /// times mandatorily, then either `m - n` optional copies or, when `m`
    /// is absent, a trailing `*` over one more copy. Every duplication
    /// re-walks `compile`, so the state cap check in `push` naturally
    /// rejects patterns that would blow the budget.
    fn compile_repeat(&mut self, node: &Ast, min: u32, max: Option<u32>) -> Result<Frag> {
        if min == 0 && max == Some(0) {
            return self.compile(&Ast::Empty);
        }
        let mut parts: Vec<Ast> = Vec::new();
        for _ in 0..min {
            parts.push(node.clone());
        }
        match max {
            Some(m) => {
                for _ in min..m {
                    parts.push(Ast::Question(Box::new(node.clone())));
                }
            }
            None => {
                parts.push(Ast::Star(Box::new(node.clone())));
            }
        }
        if parts.is_empty() {
            return self.compile(&Ast::Empty);
        }
        self.compile(&Ast::Concat(parts))
    }
}

/// Compile a parsed pattern (already produced by `regex::parser::parse`)
/// into the host-form `CompiledRegex` (spec.md §4.C / §3).
pub fn compile(ast: &Ast, num_groups: u32, options: &SearchOptions) -> Result<CompiledRegex> {
    let mut compiler = Compiler { arena: Arena::new(), options };
    let (top_level_start, top_level_end, body) = strip_top_level_anchors(ast);
    let frag = compiler.compile(&body)?;
    let match_idx = compiler.push(Kind::Match)?;
    compiler.patch(&frag.dangling, match_idx);

    let states = compiler.arena.into_states();
    Ok(CompiledRegex {
        states,
        num_groups,
        start_state: frag.start,
        anchored_start: top_level_start,
        anchored_end: top_level_end,
        case_insensitive: options.case_insensitive,
    })
}

/// Detects a top-level leading `^` / trailing `$` (spec.md §4.C
/// "Anchors"): only when the whole pattern is a single concatenation (no
/// top-level alternation) do we set the `anchored_*` flags and elide the
/// assertion states; anything else still compiles `^`/`$` as ordinary
/// `LineStart`/`LineEnd` assertion states.
fn strip_top_level_anchors(ast: &Ast) -> (bool, bool, Ast) {
    match ast {
        Ast::Concat(nodes) => {
            let mut nodes = nodes.clone();
            let mut start = false;
            let mut end = false;
            if matches!(nodes.first(), Some(Ast::StartAnchor)) {
                nodes.remove(0);
                start = true;
            }
            if matches!(nodes.last(), Some(Ast::EndAnchor)) {
                nodes.pop();
                end = true;
            }
            let body = match nodes.len() {
                0 => Ast::Empty,
                1 => nodes.pop().unwrap(),
                _ => Ast::Concat(nodes),
            };
            (start, end, body)
        }
        Ast::StartAnchor => (true, false, Ast::Empty),
        Ast::EndAnchor => (false, true, Ast::Empty),
        other => (false, false, other.clone()),
    }
}

/// Unused today but documents the sentinel shared with the host/GPU form.
#[allow(dead_code)]
const _: u32 = NO_EDGE;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parser;

    fn compiled(pattern: &[u8], options: &SearchOptions) -> CompiledRegex {
        let (ast, groups) = parser::parse(pattern, options.extended).unwrap();
        compile(&ast, groups, options).unwrap()
    }

    #[test]
    fn anchored_flags_set_for_simple_pattern() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let re = compiled(b"^abc$", &opts);
        assert!(re.anchored_start);
        assert!(re.anchored_end);
    }

    #[test]
    fn alternation_does_not_set_anchors() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let re = compiled(b"^a|b$", &opts);
        assert!(!re.anchored_start);
        assert!(!re.anchored_end);
    }

    #[test]
    fn state_cap_rejects_huge_repeat() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let (ast, groups) = parser::parse(b"(abcdefgh){500,600}", true).unwrap();
        let err = compile(&ast, groups, &opts);
        assert!(err.is_err());
    }

    #[test]
    fn group_indices_preserved() {
        let opts = SearchOptions { extended: true, ..Default::default() };
        let re = compiled(b"(a)(b)", &opts);
        assert_eq!(re.num_groups, 2);
    }
}
