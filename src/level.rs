use crate::util::{LevelPtr, NamePtr, TermCtx};

pub(crate) const ZERO_HASH: u64 = 2221;
pub(crate) const SUCC_HASH: u64 = 2237;
pub(crate) const MAX_HASH: u64 = 2239;
pub(crate) const IMAX_HASH: u64 = 2243;
pub(crate) const PARAM_HASH: u64 = 2251;

/// Universe levels. These are carried by `Sort` and `Const` but play no part in the keys
/// of a discrimination tree; they only matter when a definition is unfolded and its
/// universe parameters have to be substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Zero,
    Succ(LevelPtr, u64),
    Max(LevelPtr, LevelPtr, u64),
    IMax(LevelPtr, LevelPtr, u64),
    Param(NamePtr, u64),
}

impl std::hash::Hash for Level {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write_u64(self.get_hash()) }
}

impl Level {
    pub fn get_hash(&self) -> u64 {
        match self {
            Level::Zero => ZERO_HASH,
            Level::Succ(.., hash) | Level::Max(.., hash) | Level::IMax(.., hash) | Level::Param(.., hash) => *hash,
        }
    }
}

impl TermCtx {
    /// Returns the base level and the number of `Succ` constructors wrapping it.
    pub fn level_succs(&self, l: LevelPtr) -> (LevelPtr, usize) {
        let mut cursor = l;
        let mut n = 0usize;
        while let Level::Succ(pred, _) = self.read_level(cursor) {
            cursor = pred;
            n += 1;
        }
        (cursor, n)
    }

    /// Replace every `Param` in `l` that appears in `ks` with the level at the same
    /// position in `vs`. `ks` and `vs` must have the same length.
    pub(crate) fn subst_level(&mut self, l: LevelPtr, ks: &[LevelPtr], vs: &[LevelPtr]) -> LevelPtr {
        debug_assert_eq!(ks.len(), vs.len());
        match self.read_level(l) {
            Level::Zero => l,
            Level::Succ(pred, _) => {
                let pred = self.subst_level(pred, ks, vs);
                self.succ(pred)
            }
            Level::Max(a, b, _) => {
                let a = self.subst_level(a, ks, vs);
                let b = self.subst_level(b, ks, vs);
                self.max(a, b)
            }
            Level::IMax(a, b, _) => {
                let a = self.subst_level(a, ks, vs);
                let b = self.subst_level(b, ks, vs);
                self.imax(a, b)
            }
            Level::Param(..) => match ks.iter().position(|k| *k == l) {
                Some(pos) => vs[pos],
                None => l,
            },
        }
    }
}
