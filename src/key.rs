//! Keys are the symbols stored along the edges of a discrimination tree. A term is encoded
//! as the preorder sequence of the keys of its subterms; each key carries the number of
//! children it has, so the sequence can be regrouped into a tree without delimiters.
use crate::expr::FVarId;
use crate::util::{BigUintPtr, NamePtr, StringPtr};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Nat(BigUintPtr),
    Str(StringPtr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A placeholder matching any term. Stars with the same id inside one encoded term
    /// stand for the same metavariable.
    Star(u32),
    /// A term that can't be indexed further, such as a loose bound variable or a `let`
    /// left unreduced. Only matched by stars.
    Opaque,
    /// A constant applied to the given number of arguments.
    Const(NamePtr, u32),
    /// A free variable (not bound in the indexed term) applied to arguments.
    FVar(FVarId, u32),
    /// A variable bound inside the indexed term, by de Bruijn index counted from the
    /// innermost enclosing binder, applied to arguments.
    BVar(u16, u32),
    Lit(Literal),
    Sort,
    /// A lambda; its one child is the body.
    Lam,
    /// A dependent arrow; its children are the domain and then the body.
    Forall,
    /// Projection `idx` out of a structure of type `NamePtr`, applied to arguments. The
    /// structure is the first child, followed by the arguments.
    Proj(NamePtr, usize, u32),
}

impl Hash for Key {
    /// Constants hash by name alone; different arities of the same constant land in the
    /// same bucket and are told apart by equality.
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Star(id) => id.hash(state),
            Key::Const(name, _) => name.hash(state),
            Key::FVar(id, nargs) => {
                id.hash(state);
                nargs.hash(state);
            }
            Key::BVar(idx, nargs) => {
                idx.hash(state);
                nargs.hash(state);
            }
            Key::Lit(l) => l.hash(state),
            Key::Proj(name, idx, nargs) => {
                name.hash(state);
                idx.hash(state);
                nargs.hash(state);
            }
            Key::Opaque | Key::Sort | Key::Lam | Key::Forall => (),
        }
    }
}

impl Key {
    /// The number of child subterms that follow this key in a preorder sequence.
    pub fn arity(self) -> usize {
        match self {
            Key::Const(_, nargs) | Key::FVar(_, nargs) | Key::BVar(_, nargs) => nargs as usize,
            Key::Lam => 1,
            Key::Forall => 2,
            Key::Proj(_, _, nargs) => nargs as usize + 1,
            Key::Star(_) | Key::Opaque | Key::Lit(_) | Key::Sort => 0,
        }
    }

    pub fn is_star(self) -> bool { matches!(self, Key::Star(_)) }

    pub fn star_id(self) -> Option<u32> {
        match self {
            Key::Star(id) => Some(id),
            _ => None,
        }
    }
}

/// The number of keys making up the subterm that starts at `keys[pos]`, or `None` if the
/// sequence ends before that subterm is complete.
pub fn subterm_size(keys: &[Key], pos: usize) -> Option<usize> {
    let mut remaining = 1usize;
    let mut cursor = pos;
    while remaining > 0 {
        let k = keys.get(cursor)?;
        remaining = remaining - 1 + k.arity();
        cursor += 1;
    }
    Some(cursor - pos)
}

/// `subterm_size` for every position at once, or `None` if `keys` isn't exactly one
/// complete term.
pub fn subterm_sizes(keys: &[Key]) -> Option<Vec<usize>> {
    let mut sizes = vec![0usize; keys.len()];
    // Sizes of the complete subterms to the right of the cursor, leftmost on top.
    let mut completed: Vec<usize> = Vec::new();
    for (pos, k) in keys.iter().enumerate().rev() {
        let arity = k.arity();
        if completed.len() < arity {
            return None
        }
        let size = 1 + completed.drain(completed.len() - arity..).sum::<usize>();
        sizes[pos] = size;
        completed.push(size);
    }
    (completed.len() == 1).then_some(sizes)
}

/// A key sequence regrouped into the term shape it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTree {
    pub key: Key,
    pub args: Vec<KeyTree>,
}

impl KeyTree {
    /// `None` if `keys` isn't exactly one complete term.
    pub fn from_keys(keys: &[Key]) -> Option<Self> {
        let mut pos = 0usize;
        let out = Self::parse(keys, &mut pos)?;
        (pos == keys.len()).then_some(out)
    }

    fn parse(keys: &[Key], pos: &mut usize) -> Option<Self> {
        let key = *keys.get(*pos)?;
        *pos += 1;
        let mut args = Vec::with_capacity(key.arity());
        for _ in 0..key.arity() {
            args.push(Self::parse(keys, pos)?);
        }
        Some(KeyTree { key, args })
    }

    pub fn flatten(&self) -> Vec<Key> {
        let mut out = Vec::new();
        let mut todo = vec![self];
        while let Some(t) = todo.pop() {
            out.push(t.key);
            todo.extend(t.args.iter().rev());
        }
        out
    }
}
