use crate::env::DeclarMap;
use crate::errors::{DiscrErr, DiscrResult};
use crate::expr::{BinderStyle, Expr, FVarId, MVarId};
use crate::level::Level;
use crate::name::Name;
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigUint;
use rustc_hash::FxHasher;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::hash::BuildHasherDefault;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

pub(crate) const fn default_true() -> bool { true }
pub(crate) const fn default_whnf_fuel() -> usize { 10_000 }

pub(crate) type UniqueIndexSet<A> = IndexSet<A, BuildHasherDefault<UniqueHasher>>;
pub(crate) type FxIndexSet<A> = IndexSet<A, BuildHasherDefault<FxHasher>>;
pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxHashSet<K> = HashSet<K, BuildHasherDefault<FxHasher>>;

pub(crate) fn new_fx_index_map<K, V>() -> FxIndexMap<K, V> { FxIndexMap::with_hasher(Default::default()) }

pub(crate) fn new_fx_hash_map<K, V>() -> FxHashMap<K, V> { FxHashMap::with_hasher(Default::default()) }

pub(crate) fn new_fx_hash_set<K>() -> FxHashSet<K> { FxHashSet::with_hasher(Default::default()) }

pub(crate) fn new_fx_index_set<K>() -> FxIndexSet<K> { FxIndexSet::with_hasher(Default::default()) }

pub(crate) fn new_unique_index_set<K>() -> UniqueIndexSet<K> { UniqueIndexSet::with_hasher(Default::default()) }

/// Convenience macro for creating a 64 bit hash.
#[macro_export]
macro_rules! hash64 {
    ( $( $x:expr ),* ) => {
        {
            use std::hash::{ Hash, Hasher };
            let mut hasher = rustc_hash::FxHasher::default();
            $(
                ($x).hash(&mut hasher);
            )*
            hasher.finish()
        }
    };
}

/// Hasher for dag items that carry their own precomputed hash. Hashing one of those items
/// is a single `write_u64` of the stored digest, so there's nothing left to mix.
#[derive(Default)]
pub(crate) struct UniqueHasher {
    digest: u64,
}

impl std::hash::Hasher for UniqueHasher {
    #[inline]
    fn finish(&self) -> u64 { self.digest }

    #[inline]
    fn write(&mut self, _: &[u8]) {
        panic!("UniqueHasher only accepts precomputed u64 digests")
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        debug_assert_eq!(self.digest, 0);
        self.digest = i;
    }
}

/// An integer pointer to an item in a [`TermCtx`]'s hash-consed dag. Two pointers of the
/// same kind are equal iff the items they point to are structurally equal.
pub struct Ptr<A> {
    /// The index in the appropriate dag set at which this element sits.
    pub(crate) idx: u32,
    pub(crate) ph: PhantomData<fn() -> A>,
}

impl<A> Ptr<A> {
    pub(crate) fn from(idx: usize) -> Self {
        debug_assert!(idx <= u32::MAX as usize);
        Self { idx: idx as u32, ph: PhantomData }
    }

    pub(crate) fn idx(&self) -> usize { self.idx as usize }
}

impl<A> Clone for Ptr<A> {
    fn clone(&self) -> Self { *self }
}

impl<A> Copy for Ptr<A> {}

impl<A> PartialEq for Ptr<A> {
    fn eq(&self, other: &Self) -> bool { self.idx == other.idx }
}

impl<A> Eq for Ptr<A> {}

impl<A> std::hash::Hash for Ptr<A> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write_u64(self.idx as u64) }
}

impl<A> std::fmt::Debug for Ptr<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Ptr({})", self.idx) }
}

pub type Levels = Arc<[LevelPtr]>;
pub type StringPtr = Ptr<String>;
pub type LevelsPtr = Ptr<Levels>;
pub type NamePtr = Ptr<Name>;
pub type LevelPtr = Ptr<Level>;
pub type ExprPtr = Ptr<Expr>;
pub type BigUintPtr = Ptr<BigUint>;

#[derive(Debug)]
pub struct ExprDag {
    pub names: UniqueIndexSet<Name>,
    pub levels: UniqueIndexSet<Level>,
    pub exprs: UniqueIndexSet<Expr>,
    pub strings: FxIndexSet<String>,
    pub uparams: FxIndexSet<Levels>,
    pub bignums: FxIndexSet<BigUint>,
}

impl ExprDag {
    /// `Anon`, `Zero`, and the empty level list always sit at index 0 of their storage.
    pub fn new() -> Self {
        let mut out = Self {
            names: new_unique_index_set(),
            levels: new_unique_index_set(),
            exprs: new_unique_index_set(),
            strings: new_fx_index_set(),
            uparams: new_fx_index_set(),
            bignums: new_fx_index_set(),
        };
        let _ = out.names.insert(Name::Anon);
        let _ = out.levels.insert(Level::Zero);
        let _ = out.uparams.insert(Arc::from(Vec::new()));
        out
    }
}

impl Default for ExprDag {
    fn default() -> Self { Self::new() }
}

pub(crate) struct ExprCache {
    /// Caches (e, offset) |-> output for instantiation. This cache is reset
    /// before every new call to `inst`, so there's no need to cache the sequence
    /// of substitutions.
    pub(crate) inst_cache: FxHashMap<(ExprPtr, u16), ExprPtr>,
    /// Caches (e, ks, vs) |-> output for level substitution.
    pub(crate) subst_cache: FxHashMap<(ExprPtr, LevelsPtr, LevelsPtr), ExprPtr>,
    /// Whnf results, keyed by the generation of the snapshot they were computed against.
    pub(crate) whnf_cache: FxHashMap<(u32, ExprPtr), ExprPtr>,
}

impl ExprCache {
    fn new() -> Self {
        Self { inst_cache: new_fx_hash_map(), subst_cache: new_fx_hash_map(), whnf_cache: new_fx_hash_map() }
    }
}

/// Frequently consulted names, allocated once when the context is created.
#[derive(Debug, Clone, Copy)]
pub struct NameCache {
    pub(crate) of_nat: NamePtr,
    pub(crate) nat_zero: NamePtr,
}

/// The parts of a [`TermCtx`] that normalization reads and callers can change: the
/// declarations and the metavariable assignments. Clones share both maps; mutating the
/// context copies a map only while some snapshot still holds it.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    pub(crate) declars: Arc<DeclarMap>,
    pub(crate) mvar_assignments: Arc<FxHashMap<MVarId, ExprPtr>>,
    /// Changes with every mutation, so two snapshots with the same generation are equal.
    pub(crate) generation: u32,
}

/// The term context: owns the storage for every `Name`, `Level`, and `Expr` built by
/// callers or by normalization, the declarations normalization may unfold, metavariable
/// assignments, and the counters for fresh free variables and metavariables.
pub struct TermCtx {
    pub(crate) dag: ExprDag,
    pub(crate) env: EnvSnapshot,
    pub(crate) generation_counter: u32,
    pub(crate) name_cache: NameCache,
    /// Monotonically increasing counter for unique free variables.
    pub(crate) unique_counter: u32,
    pub(crate) mvar_counter: u32,
    pub(crate) expr_cache: ExprCache,
    pub config: Config,
}

impl TermCtx {
    pub fn new(config: Config) -> Self {
        let mut dag = ExprDag::new();
        let of_nat = intern_name_path(&mut dag, "OfNat.ofNat");
        let nat_zero = intern_name_path(&mut dag, "Nat.zero");
        Self {
            dag,
            env: EnvSnapshot {
                declars: Arc::new(new_fx_index_map()),
                mvar_assignments: Arc::new(new_fx_hash_map()),
                generation: 0u32,
            },
            generation_counter: 0u32,
            name_cache: NameCache { of_nat, nat_zero },
            unique_counter: 0u32,
            mvar_counter: 0u32,
            expr_cache: ExprCache::new(),
            config,
        }
    }

    pub fn read_name(&self, p: NamePtr) -> Name { self.dag.names.get_index(p.idx()).copied().unwrap() }

    pub fn read_level(&self, p: LevelPtr) -> Level { self.dag.levels.get_index(p.idx()).copied().unwrap() }

    pub fn read_expr(&self, p: ExprPtr) -> Expr { self.dag.exprs.get_index(p.idx()).copied().unwrap() }

    pub fn read_string(&self, p: StringPtr) -> &str { self.dag.strings.get_index(p.idx()).unwrap() }

    pub fn read_bignum(&self, p: BigUintPtr) -> &BigUint { self.dag.bignums.get_index(p.idx()).unwrap() }

    pub fn read_levels(&self, p: LevelsPtr) -> Levels { self.dag.uparams.get_index(p.idx()).cloned().unwrap() }

    /// Store a `Name`, getting back a pointer to the allocated item. If the item was
    /// already stored, forego the allocation and return a pointer to the previously inserted
    /// element.
    pub fn alloc_name(&mut self, n: Name) -> NamePtr { Ptr::from(self.dag.names.insert_full(n).0) }

    pub fn alloc_level(&mut self, l: Level) -> LevelPtr { Ptr::from(self.dag.levels.insert_full(l).0) }

    pub fn alloc_expr(&mut self, e: Expr) -> ExprPtr { Ptr::from(self.dag.exprs.insert_full(e).0) }

    pub(crate) fn alloc_string(&mut self, s: &str) -> StringPtr {
        if let Some(idx) = self.dag.strings.get_index_of(s) {
            Ptr::from(idx)
        } else {
            Ptr::from(self.dag.strings.insert_full(s.to_owned()).0)
        }
    }

    /// Used for Nat literals.
    pub(crate) fn alloc_bignum(&mut self, n: BigUint) -> BigUintPtr { Ptr::from(self.dag.bignums.insert_full(n).0) }

    /// Store a sequence of `Level` items, but check whether the sequence has previously been allocated
    /// first, by probing with a slice.
    pub fn alloc_levels_slice(&mut self, ls: &[LevelPtr]) -> LevelsPtr {
        if let Some(idx) = self.dag.uparams.get_index_of(ls) {
            Ptr::from(idx)
        } else {
            Ptr::from(self.dag.uparams.insert_full(Arc::from(ls)).0)
        }
    }

    /// The empty universe level list, for monomorphic constants.
    pub fn no_levels(&self) -> LevelsPtr { Ptr::from(0) }

    pub fn anonymous(&self) -> NamePtr { Ptr::from(0) }

    pub fn str(&mut self, pfx: NamePtr, sfx: StringPtr) -> NamePtr {
        let hash = hash64!(crate::name::STR_HASH, pfx, sfx);
        self.alloc_name(Name::Str(pfx, sfx, hash))
    }

    pub fn str1(&mut self, s: &str) -> NamePtr {
        let anon = self.anonymous();
        let s = self.alloc_string(s);
        self.str(anon, s)
    }

    pub fn num(&mut self, pfx: NamePtr, sfx: u64) -> NamePtr {
        let hash = hash64!(crate::name::NUM_HASH, pfx, sfx);
        self.alloc_name(Name::Num(pfx, sfx, hash))
    }

    /// Build e.g. `HAdd.hAdd` from "HAdd.hAdd". Numeric components become `Num` segments.
    pub fn name_from_str(&mut self, dot_separated_name: &str) -> NamePtr {
        intern_name_path(&mut self.dag, dot_separated_name)
    }

    pub fn zero(&self) -> LevelPtr { Ptr::from(0) }

    pub fn succ(&mut self, l: LevelPtr) -> LevelPtr {
        let hash = hash64!(crate::level::SUCC_HASH, l);
        self.alloc_level(Level::Succ(l, hash))
    }

    pub fn max(&mut self, l: LevelPtr, r: LevelPtr) -> LevelPtr {
        let hash = hash64!(crate::level::MAX_HASH, l, r);
        self.alloc_level(Level::Max(l, r, hash))
    }

    pub fn imax(&mut self, l: LevelPtr, r: LevelPtr) -> LevelPtr {
        let hash = hash64!(crate::level::IMAX_HASH, l, r);
        self.alloc_level(Level::IMax(l, r, hash))
    }

    pub fn param(&mut self, n: NamePtr) -> LevelPtr {
        let hash = hash64!(crate::level::PARAM_HASH, n);
        self.alloc_level(Level::Param(n, hash))
    }

    pub fn mk_var(&mut self, dbj_idx: u16) -> ExprPtr {
        let hash = hash64!(crate::expr::VAR_HASH, dbj_idx);
        self.alloc_expr(Expr::Var { dbj_idx, hash })
    }

    pub fn mk_sort(&mut self, level: LevelPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::SORT_HASH, level);
        self.alloc_expr(Expr::Sort { level, hash })
    }

    pub fn mk_const(&mut self, name: NamePtr, levels: LevelsPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::CONST_HASH, name, levels);
        self.alloc_expr(Expr::Const { name, levels, hash })
    }

    pub fn mk_app(&mut self, fun: ExprPtr, arg: ExprPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::APP_HASH, fun, arg);
        let num_loose_bvars = self.num_loose_bvars(fun).max(self.num_loose_bvars(arg));
        let has_fvars = self.has_fvars(fun) || self.has_fvars(arg);
        self.alloc_expr(Expr::App { fun, arg, num_loose_bvars, has_fvars, hash })
    }

    pub fn mk_lambda(
        &mut self,
        binder_name: NamePtr,
        binder_style: BinderStyle,
        binder_type: ExprPtr,
        body: ExprPtr,
    ) -> ExprPtr {
        let hash = hash64!(crate::expr::LAMBDA_HASH, binder_name, binder_style, binder_type, body);
        let num_loose_bvars = self.num_loose_bvars(binder_type).max(self.num_loose_bvars(body).saturating_sub(1));
        let has_fvars = self.has_fvars(binder_type) || self.has_fvars(body);
        self.alloc_expr(Expr::Lambda { binder_name, binder_style, binder_type, body, num_loose_bvars, has_fvars, hash })
    }

    pub fn mk_pi(
        &mut self,
        binder_name: NamePtr,
        binder_style: BinderStyle,
        binder_type: ExprPtr,
        body: ExprPtr,
    ) -> ExprPtr {
        let hash = hash64!(crate::expr::PI_HASH, binder_name, binder_style, binder_type, body);
        let num_loose_bvars = self.num_loose_bvars(binder_type).max(self.num_loose_bvars(body).saturating_sub(1));
        let has_fvars = self.has_fvars(binder_type) || self.has_fvars(body);
        self.alloc_expr(Expr::Pi { binder_name, binder_style, binder_type, body, num_loose_bvars, has_fvars, hash })
    }

    pub fn mk_let(
        &mut self,
        binder_name: NamePtr,
        binder_type: ExprPtr,
        val: ExprPtr,
        body: ExprPtr,
        nondep: bool,
    ) -> ExprPtr {
        let hash = hash64!(crate::expr::LET_HASH, binder_name, binder_type, val, body, nondep);
        let num_loose_bvars = self
            .num_loose_bvars(binder_type)
            .max(self.num_loose_bvars(val).max(self.num_loose_bvars(body).saturating_sub(1)));
        let has_fvars = self.has_fvars(binder_type) || self.has_fvars(val) || self.has_fvars(body);
        self.alloc_expr(Expr::Let { binder_name, binder_type, val, body, num_loose_bvars, has_fvars, hash, nondep })
    }

    pub fn mk_proj(&mut self, ty_name: NamePtr, idx: usize, structure: ExprPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::PROJ_HASH, ty_name, idx, structure);
        let num_loose_bvars = self.num_loose_bvars(structure);
        let has_fvars = self.has_fvars(structure);
        self.alloc_expr(Expr::Proj { ty_name, idx, structure, num_loose_bvars, has_fvars, hash })
    }

    pub fn mk_string_lit(&mut self, ptr: StringPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::STRING_LIT_HASH, ptr);
        self.alloc_expr(Expr::StringLit { ptr, hash })
    }

    pub fn mk_string_lit_quick(&mut self, s: &str) -> ExprPtr {
        let ptr = self.alloc_string(s);
        self.mk_string_lit(ptr)
    }

    pub fn mk_nat_lit(&mut self, ptr: BigUintPtr) -> ExprPtr {
        let hash = hash64!(crate::expr::NAT_LIT_HASH, ptr);
        self.alloc_expr(Expr::NatLit { ptr, hash })
    }

    /// Shortcut to make an `Expr::NatLit` directly from a `BigUint`, rather than
    /// going `alloc_bignum` and `mk_nat_lit`
    pub fn mk_nat_lit_quick(&mut self, n: impl Into<BigUint>) -> ExprPtr {
        let ptr = self.alloc_bignum(n.into());
        self.mk_nat_lit(ptr)
    }

    /// Construct a free variable with a unique ID, incrementing the monotonic counter
    /// for unique free variable identifiers.
    pub fn mk_unique(&mut self, binder_name: NamePtr, binder_style: BinderStyle, binder_type: ExprPtr) -> ExprPtr {
        let id = FVarId(self.unique_counter);
        self.unique_counter += 1;
        let hash = hash64!(crate::expr::LOCAL_HASH, binder_name, binder_style, binder_type, id);
        self.alloc_expr(Expr::Local { binder_name, binder_style, binder_type, id, hash })
    }

    /// A fresh, unassigned metavariable.
    pub fn mk_mvar(&mut self) -> ExprPtr {
        let id = MVarId(self.mvar_counter);
        self.mvar_counter += 1;
        let hash = hash64!(crate::expr::MVAR_HASH, id);
        self.alloc_expr(Expr::MVar { id, hash })
    }

    /// Entries that already took their snapshot keep seeing `id` as it was.
    pub fn assign_mvar(&mut self, id: MVarId, val: ExprPtr) {
        debug_assert_eq!(self.num_loose_bvars(val), 0);
        Arc::make_mut(&mut self.env.mvar_assignments).insert(id, val);
        self.next_generation();
    }

    pub fn get_mvar_assignment(&self, id: MVarId) -> Option<ExprPtr> { self.env.mvar_assignments.get(&id).copied() }

    pub(crate) fn next_generation(&mut self) {
        self.generation_counter += 1;
        self.env.generation = self.generation_counter;
    }

    /// The current declarations and assignments.
    pub fn snapshot(&self) -> EnvSnapshot { self.env.clone() }

    /// Run `f` with `snapshot` standing in for the current declarations and assignments.
    pub(crate) fn with_snapshot<A>(&mut self, snapshot: &EnvSnapshot, f: impl FnOnce(&mut Self) -> A) -> A {
        let current = std::mem::replace(&mut self.env, snapshot.clone());
        let out = f(self);
        debug_assert_eq!(self.env.generation, snapshot.generation);
        self.env = current;
        out
    }
}

fn intern_name_path(dag: &mut ExprDag, dot_separated_name: &str) -> NamePtr {
    let mut pfx: NamePtr = Ptr::from(0);
    for s in dot_separated_name.split('.') {
        let n = if let Ok(num) = s.parse::<u64>() {
            let hash = hash64!(crate::name::NUM_HASH, pfx, num);
            Name::Num(pfx, num, hash)
        } else {
            let sfx = match dag.strings.get_index_of(s) {
                Some(idx) => Ptr::from(idx),
                None => Ptr::from(dag.strings.insert_full(s.to_owned()).0),
            };
            let hash = hash64!(crate::name::STR_HASH, pfx, sfx);
            Name::Str(pfx, sfx, hash)
        };
        pfx = Ptr::from(dag.names.insert_full(n).0);
    }
    pfx
}

/// Options controlling how expressions are normalized and encoded into keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Delta-unfold definitions marked `Abbrev` (reducible) during whnf.
    #[serde(default = "default_true")]
    pub unfold_reducible: bool,

    /// Reduce `let` expressions during whnf.
    #[serde(default = "default_true")]
    pub zeta: bool,

    /// Eta-reduce `fun x => f x` to `f` before classifying a subterm.
    #[serde(default = "default_true")]
    pub eta_reduce: bool,

    /// Encode instance-implicit arguments of constants as stars instead of indexing them.
    #[serde(default = "default_true")]
    pub ignore_instances: bool,

    /// Treat `OfNat.ofNat _ n _` and `Nat.zero` as the literal `n`/`0`.
    #[serde(default = "default_true")]
    pub numerals: bool,

    /// The maximum number of reduction steps a single whnf call may take.
    #[serde(default = "default_whnf_fuel")]
    pub whnf_fuel: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unfold_reducible: true,
            zeta: true,
            eta_reduce: true,
            ignore_instances: true,
            numerals: true,
            whnf_fuel: default_whnf_fuel(),
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> DiscrResult<Self> { serde_json::from_str::<Config>(s)?.validate() }

    fn validate(self) -> DiscrResult<Self> {
        if self.whnf_fuel == 0 {
            return Err(DiscrErr::ConfigIncompatible("whnf_fuel must be positive"))
        }
        Ok(self)
    }
}

impl TryFrom<&Path> for Config {
    type Error = DiscrErr;
    fn try_from(p: &Path) -> Result<Config, Self::Error> {
        let config_file = OpenOptions::new().read(true).truncate(false).open(p)?;
        serde_json::from_reader::<_, Config>(BufReader::new(config_file))?.validate()
    }
}
