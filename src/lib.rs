//! A lazy refined discrimination tree over Lean 4 style expressions.
//!
//! Terms are indexed by the preorder sequence of keys of their (weak head normalized)
//! subterms. Inserting a term only computes its first key; the rest of the encoding is
//! produced one key at a time as retrievals walk through the nodes holding it.
//! ```ignore
//! let mut ctx = TermCtx::new(Config::default());
//! let mut tree = RefinedDiscrTree::new();
//! tree.insert(&mut ctx, lemma_lhs, lemma_name)?;
//! let candidates = tree.retrieve(&mut ctx, goal)?;
//! ```
#![allow(clippy::too_many_arguments)]

pub mod debug_printer;
pub mod env;
pub mod errors;
pub mod expr;
pub mod key;
pub mod lazy;
pub mod level;
pub mod name;
pub mod reduce;
#[cfg(test)]
mod tests;
pub mod tree;
pub mod trie;
pub mod util;

pub use errors::{DiscrErr, DiscrResult};
pub use key::{Key, Literal};
pub use lazy::{ExprInfo, LazyEntry, StackEntry, Step};
pub use tree::RefinedDiscrTree;
pub use trie::{Trie, TrieIdx};
pub use util::{Config, EnvSnapshot, TermCtx};
