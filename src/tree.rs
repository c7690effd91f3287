use crate::errors::DiscrResult;
use crate::key::{subterm_sizes, Key};
use crate::lazy::{LazyEntry, Step};
use crate::trie::{Trie, TrieIdx};
use crate::util::{new_fx_hash_set, new_fx_index_map, ExprPtr, FxIndexMap, TermCtx};
use log::{debug, trace};

/// The outcome of forcing one pending entry at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forced {
    /// The entry produced `Key` and moved to the child at `TrieIdx`.
    Advanced(Key, TrieIdx),
    /// The entry was complete; its value now sits in the node's values.
    Deposited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// Stars on both sides are wildcards.
    Unify,
    /// Only stored stars are wildcards.
    Match,
}

/// A partial match: the query keys before `pos` are matched by the path to `node`, and
/// the next `skip` stored keys still belong to subterms matched by a query star.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    node: TrieIdx,
    pos: usize,
    skip: usize,
}

/// A discrimination tree whose entries are encoded lazily: an inserted term is only
/// turned into keys as far as retrievals need to look.
///
/// Nodes live in one arena and refer to each other by index. Nodes are never removed, so
/// indices stay valid for the life of the tree.
#[derive(Debug, Clone)]
pub struct RefinedDiscrTree<V> {
    root: FxIndexMap<Key, TrieIdx>,
    tries: Vec<Trie<V>>,
}

impl<V> Default for RefinedDiscrTree<V> {
    fn default() -> Self { Self::new() }
}

impl<V> RefinedDiscrTree<V> {
    pub fn new() -> Self { Self { root: new_fx_index_map(), tries: Vec::new() } }

    fn push_trie(&mut self) -> TrieIdx {
        let idx = TrieIdx::from(self.tries.len());
        self.tries.push(Trie::new());
        idx
    }

    pub fn trie(&self, idx: TrieIdx) -> &Trie<V> { &self.tries[idx.idx()] }

    pub fn root_child(&self, key: Key) -> Option<TrieIdx> { self.root.get(&key).copied() }

    /// Insert `value` under the term `e`. Only the first key of `e` is computed now; the
    /// rest are computed later against the declarations and assignments of this moment.
    /// If the first key fails, the tree is unchanged.
    pub fn insert(&mut self, ctx: &mut TermCtx, e: ExprPtr, value: V) -> DiscrResult<()> {
        let mut entry = LazyEntry::new(e);
        let key = match entry.step(ctx)? {
            Step::Advance(key) => key,
            Step::Done => unreachable!("every term has at least one key"),
        };
        debug!("inserting {:?} under root key {:?}", ctx.debug_print(e), ctx.debug_print(key));
        let idx = match self.root.get(&key).copied() {
            Some(idx) => idx,
            None => {
                let idx = self.push_trie();
                self.root.insert(key, idx);
                idx
            }
        };
        self.tries[idx.idx()].insert_pending(entry, value);
        Ok(())
    }

    /// Advance the oldest pending entry at `idx` by one key. Returns `None` if nothing
    /// was pending. On error the entry goes back to the front of the queue.
    pub fn force_one(&mut self, idx: TrieIdx, ctx: &mut TermCtx) -> DiscrResult<Option<Forced>> {
        let Some((mut entry, value)) = self.tries[idx.idx()].pending.pop_front() else { return Ok(None) };
        match entry.step(ctx) {
            Err(e) => {
                self.tries[idx.idx()].pending.push_front((entry, value));
                Err(e)
            }
            Ok(Step::Done) => {
                self.tries[idx.idx()].values.push(value);
                trace!("deposited value at node {}", idx.idx());
                Ok(Some(Forced::Deposited))
            }
            Ok(Step::Advance(key)) => {
                let child = match self.tries[idx.idx()].child(key) {
                    Some(child) => child,
                    None => {
                        let child = self.push_trie();
                        self.tries[idx.idx()].set_child(key, child);
                        child
                    }
                };
                trace!("forced {:?} from node {} to node {}", ctx.debug_print(key), idx.idx(), child.idx());
                self.tries[child.idx()].insert_pending(entry, value);
                Ok(Some(Forced::Advanced(key, child)))
            }
        }
    }

    /// Force every pending entry at `idx`. The entries move to children of `idx`, where
    /// they stay pending.
    pub fn force_node(&mut self, idx: TrieIdx, ctx: &mut TermCtx) -> DiscrResult<()> {
        while self.force_one(idx, ctx)?.is_some() {}
        Ok(())
    }

    /// Encode every entry completely.
    pub fn force_all(&mut self, ctx: &mut TermCtx) -> DiscrResult<()> {
        debug!("forcing all {} pending entries", self.num_pending());
        let mut todo = self.root.values().copied().collect::<Vec<_>>();
        while let Some(idx) = todo.pop() {
            self.force_node(idx, ctx)?;
            todo.extend(self.tries[idx.idx()].edges().map(|(_, child)| child));
        }
        Ok(())
    }

    /// Values stored under terms that may unify with `query`, treating unassigned
    /// metavariables on either side as wildcards. May contain false positives, never
    /// misses one.
    pub fn retrieve(&mut self, ctx: &mut TermCtx, query: ExprPtr) -> DiscrResult<Vec<&V>> {
        let keys = LazyEntry::new(query).encode_all(ctx)?;
        debug!("retrieving unifiers of {:?}", ctx.debug_print(keys.as_slice()));
        let nodes = self.matching_nodes(ctx, &keys, MatchMode::Unify)?;
        Ok(self.values_at(&nodes))
    }

    pub fn get_unify(&mut self, ctx: &mut TermCtx, query: ExprPtr) -> DiscrResult<Vec<&V>> { self.retrieve(ctx, query) }

    /// Values stored under terms that are instances-of-patterns for `query`: only stored
    /// stars are wildcards, and a metavariable in the query is only matched by a stored
    /// star.
    pub fn get_match(&mut self, ctx: &mut TermCtx, query: ExprPtr) -> DiscrResult<Vec<&V>> {
        let keys = LazyEntry::new(query).encode_all(ctx)?;
        debug!("retrieving generalizations of {:?}", ctx.debug_print(keys.as_slice()));
        let nodes = self.matching_nodes(ctx, &keys, MatchMode::Match)?;
        Ok(self.values_at(&nodes))
    }

    fn values_at(&self, nodes: &[TrieIdx]) -> Vec<&V> {
        nodes.iter().flat_map(|idx| self.tries[idx.idx()].values.iter()).collect()
    }

    /// The terminal nodes matching `keys`, forcing every node the search visits.
    fn matching_nodes(&mut self, ctx: &mut TermCtx, keys: &[Key], mode: MatchMode) -> DiscrResult<Vec<TrieIdx>> {
        let sizes = match subterm_sizes(keys) {
            Some(sizes) => sizes,
            None => panic!("malformed query key sequence {:?}", keys),
        };
        let mut todo = Vec::new();
        // An entry's first star always gets id 0, so that's the only star the root can hold.
        let root_stars = self.root.get(&Key::Star(0)).copied();
        advance(keys, &sizes, 0, 0, mode, self.root.iter().map(|(k, idx)| (*k, *idx)), |k| self.root.get(&k).copied(), root_stars.into_iter(), &mut todo);

        let mut out = Vec::new();
        let mut seen = new_fx_hash_set();
        while let Some(Candidate { node, pos, skip }) = todo.pop() {
            self.force_node(node, ctx)?;
            if skip == 0 && pos == keys.len() {
                if seen.insert(node) {
                    out.push(node);
                }
                continue
            }
            let trie = &self.tries[node.idx()];
            advance(keys, &sizes, pos, skip, mode, trie.edges(), |k| trie.child(k), trie.star_edges(), &mut todo);
        }
        Ok(out)
    }

    /// Force everything and list every stored value with its full key sequence.
    pub fn entries(&mut self, ctx: &mut TermCtx) -> DiscrResult<Vec<(Vec<Key>, &V)>> {
        self.force_all(ctx)?;
        let mut out = Vec::new();
        let mut todo = self.root.iter().map(|(k, idx)| (*idx, vec![*k])).collect::<Vec<_>>();
        while let Some((idx, path)) = todo.pop() {
            let trie = &self.tries[idx.idx()];
            out.extend(trie.values.iter().map(|v| (path.clone(), v)));
            for (k, child) in trie.edges() {
                let mut path = path.clone();
                path.push(k);
                todo.push((child, path));
            }
        }
        Ok(out)
    }

    pub fn num_nodes(&self) -> usize { self.tries.len() }

    /// Values already placed at a node. Entries still pending somewhere aren't counted.
    pub fn num_values(&self) -> usize { self.tries.iter().map(|t| t.values.len()).sum() }

    pub fn num_pending(&self) -> usize { self.tries.iter().map(|t| t.pending.len()).sum() }

    pub fn is_empty(&self) -> bool { self.root.is_empty() }
}

/// Extend `todo` with the ways the search can continue from a node whose outgoing edges
/// are `edges`. `exact` looks up the child for a non-star key, `stars` lists the children
/// behind star keys.
fn advance(
    keys: &[Key],
    sizes: &[usize],
    pos: usize,
    skip: usize,
    mode: MatchMode,
    edges: impl Iterator<Item = (Key, TrieIdx)>,
    exact: impl FnOnce(Key) -> Option<TrieIdx>,
    stars: impl Iterator<Item = TrieIdx>,
    todo: &mut Vec<Candidate>,
) {
    if skip > 0 {
        todo.extend(edges.map(|(k, node)| Candidate { node, pos, skip: skip - 1 + k.arity() }));
        return
    }
    let query_key = keys[pos];
    if query_key.is_star() && mode == MatchMode::Unify {
        todo.extend(edges.map(|(k, node)| Candidate { node, pos: pos + 1, skip: k.arity() }));
        return
    }
    if !query_key.is_star() {
        if let Some(node) = exact(query_key) {
            todo.push(Candidate { node, pos: pos + 1, skip: 0 });
        }
    }
    let next = pos + sizes[pos];
    todo.extend(stars.map(|node| Candidate { node, pos: next, skip: 0 }));
}
