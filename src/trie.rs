use crate::key::Key;
use crate::lazy::LazyEntry;
use crate::util::{new_fx_index_map, FxIndexMap};
use std::collections::VecDeque;

/// Index of a node in a tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrieIdx(pub(crate) u32);

impl TrieIdx {
    pub(crate) fn from(idx: usize) -> Self {
        debug_assert!(idx <= u32::MAX as usize);
        TrieIdx(idx as u32)
    }

    pub fn idx(self) -> usize { self.0 as usize }
}

/// One node of a [`crate::tree::RefinedDiscrTree`].
#[derive(Debug, Clone)]
pub struct Trie<V> {
    /// Values whose key sequence ends at this node, in insertion order.
    pub(crate) values: Vec<V>,
    /// Children reached by a star key, by star id.
    pub(crate) stars: FxIndexMap<u32, TrieIdx>,
    /// Children reached by any other key.
    pub(crate) children: FxIndexMap<Key, TrieIdx>,
    /// Entries that reached this node but haven't produced their next key yet.
    pub(crate) pending: VecDeque<(LazyEntry, V)>,
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self { values: Vec::new(), stars: new_fx_index_map(), children: new_fx_index_map(), pending: VecDeque::new() }
    }

    pub fn insert_pending(&mut self, entry: LazyEntry, value: V) { self.pending.push_back((entry, value)) }

    pub fn values(&self) -> &[V] { self.values.as_slice() }

    pub fn num_pending(&self) -> usize { self.pending.len() }

    pub fn is_forced(&self) -> bool { self.pending.is_empty() }

    pub fn child(&self, key: Key) -> Option<TrieIdx> {
        match key {
            Key::Star(id) => self.stars.get(&id).copied(),
            _ => self.children.get(&key).copied(),
        }
    }

    pub(crate) fn set_child(&mut self, key: Key, idx: TrieIdx) {
        match key {
            Key::Star(id) => self.stars.insert(id, idx),
            _ => self.children.insert(key, idx),
        };
    }

    /// Every outgoing edge, stars included.
    pub fn edges(&self) -> impl Iterator<Item = (Key, TrieIdx)> + '_ {
        let stars = self.stars.iter().map(|(id, idx)| (Key::Star(*id), *idx));
        let children = self.children.iter().map(|(k, idx)| (*k, *idx));
        stars.chain(children)
    }

    pub fn star_edges(&self) -> impl Iterator<Item = TrieIdx> + '_ { self.stars.values().copied() }
}

impl<V> Default for Trie<V> {
    fn default() -> Self { Self::new() }
}
