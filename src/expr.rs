use crate::util::{BigUintPtr, ExprPtr, LevelPtr, LevelsPtr, NamePtr, StringPtr, TermCtx};
use Expr::*;

pub(crate) const VAR_HASH: u64 = 281;
pub(crate) const SORT_HASH: u64 = 563;
pub(crate) const CONST_HASH: u64 = 1129;
pub(crate) const APP_HASH: u64 = 2269;
pub(crate) const PI_HASH: u64 = 4547;
pub(crate) const LAMBDA_HASH: u64 = 9109;
pub(crate) const LET_HASH: u64 = 18233;
pub(crate) const LOCAL_HASH: u64 = 36467;
pub(crate) const STRING_LIT_HASH: u64 = 72953;
pub(crate) const NAT_LIT_HASH: u64 = 145931;
pub(crate) const PROJ_HASH: u64 = 291869;
pub(crate) const MVAR_HASH: u64 = 583777;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderStyle {
    Default,
    Implicit,
    StrictImplicit,
    InstImplicit,
}

/// Identifies a free variable created by [`TermCtx::mk_unique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FVarId(pub u32);

/// Identifies a metavariable created by [`TermCtx::mk_mvar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MVarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    Var {
        dbj_idx: u16,
        hash: u64,
    },
    Sort {
        level: LevelPtr,
        hash: u64,
    },
    Const {
        name: NamePtr,
        levels: LevelsPtr,
        hash: u64,
    },
    App {
        fun: ExprPtr,
        arg: ExprPtr,
        num_loose_bvars: u16,
        has_fvars: bool,
        hash: u64,
    },
    Pi {
        binder_name: NamePtr,
        binder_style: BinderStyle,
        binder_type: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u16,
        has_fvars: bool,
        hash: u64,
    },
    Lambda {
        binder_name: NamePtr,
        binder_style: BinderStyle,
        binder_type: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u16,
        has_fvars: bool,
        hash: u64,
    },
    Let {
        binder_name: NamePtr,
        binder_type: ExprPtr,
        val: ExprPtr,
        body: ExprPtr,
        num_loose_bvars: u16,
        has_fvars: bool,
        hash: u64,
        nondep: bool,
    },
    Local {
        binder_name: NamePtr,
        binder_style: BinderStyle,
        binder_type: ExprPtr,
        id: FVarId,
        hash: u64,
    },
    Proj {
        ty_name: NamePtr,
        idx: usize,
        structure: ExprPtr,
        num_loose_bvars: u16,
        has_fvars: bool,
        hash: u64,
    },
    NatLit {
        ptr: BigUintPtr,
        hash: u64,
    },
    StringLit {
        ptr: StringPtr,
        hash: u64,
    },
    /// A metavariable, which may be assigned in the owning [`TermCtx`]. Unassigned
    /// metavariables are placeholders that stand for any term.
    MVar {
        id: MVarId,
        hash: u64,
    },
}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { state.write_u64(self.get_hash()) }
}

impl Expr {
    pub fn get_hash(&self) -> u64 {
        match self {
            Var { hash, .. }
            | Sort { hash, .. }
            | Const { hash, .. }
            | App { hash, .. }
            | Pi { hash, .. }
            | Lambda { hash, .. }
            | Let { hash, .. }
            | Local { hash, .. }
            | Proj { hash, .. }
            | NatLit { hash, .. }
            | StringLit { hash, .. }
            | MVar { hash, .. } => *hash,
        }
    }
}

impl TermCtx {
    pub fn num_loose_bvars(&self, e: ExprPtr) -> u16 {
        match self.read_expr(e) {
            Var { dbj_idx, .. } => dbj_idx + 1,
            App { num_loose_bvars, .. }
            | Pi { num_loose_bvars, .. }
            | Lambda { num_loose_bvars, .. }
            | Let { num_loose_bvars, .. }
            | Proj { num_loose_bvars, .. } => num_loose_bvars,
            Sort { .. } | Const { .. } | Local { .. } | NatLit { .. } | StringLit { .. } | MVar { .. } => 0,
        }
    }

    pub fn has_fvars(&self, e: ExprPtr) -> bool {
        match self.read_expr(e) {
            Local { .. } => true,
            App { has_fvars, .. }
            | Pi { has_fvars, .. }
            | Lambda { has_fvars, .. }
            | Let { has_fvars, .. }
            | Proj { has_fvars, .. } => has_fvars,
            Var { .. } | Sort { .. } | Const { .. } | NatLit { .. } | StringLit { .. } | MVar { .. } => false,
        }
    }

    /// Fold `args` onto `fun` from the left: `foldl_apps(f, [a, b]) == ((f a) b)`.
    pub fn foldl_apps(&mut self, mut fun: ExprPtr, args: impl Iterator<Item = ExprPtr>) -> ExprPtr {
        for arg in args {
            fun = self.mk_app(fun, arg);
        }
        fun
    }

    /// Split an application spine into its head and its arguments, the arguments in
    /// application order.
    pub fn unfold_apps(&self, e: ExprPtr) -> (ExprPtr, Vec<ExprPtr>) {
        let mut args = Vec::new();
        let mut cursor = e;
        while let App { fun, arg, .. } = self.read_expr(cursor) {
            args.push(arg);
            cursor = fun;
        }
        args.reverse();
        (cursor, args)
    }

    pub fn unfold_apps_fun(&self, e: ExprPtr) -> ExprPtr {
        let mut cursor = e;
        while let App { fun, .. } = self.read_expr(cursor) {
            cursor = fun;
        }
        cursor
    }

    /// Instantiate loose bound variables: `Var(i)` becomes `substs[i]`, and variables past
    /// the end of `substs` are lowered by `substs.len()`. The elements of `substs` must be
    /// closed, so nothing needs to be lifted as binders are entered.
    pub fn inst(&mut self, e: ExprPtr, substs: &[ExprPtr]) -> ExprPtr {
        if substs.is_empty() {
            return e
        }
        debug_assert!(substs.iter().all(|s| self.num_loose_bvars(*s) == 0));
        let out = self.inst_aux(e, substs, 0u16);
        self.expr_cache.inst_cache.clear();
        out
    }

    fn inst_aux(&mut self, e: ExprPtr, substs: &[ExprPtr], offset: u16) -> ExprPtr {
        if self.num_loose_bvars(e) <= offset {
            return e
        }
        if let Some(cached) = self.expr_cache.inst_cache.get(&(e, offset)).copied() {
            return cached
        }
        let calcd = match self.read_expr(e) {
            Var { dbj_idx, .. } => match substs.get((dbj_idx - offset) as usize).copied() {
                Some(s) => s,
                None => self.mk_var(dbj_idx - (substs.len() as u16)),
            },
            App { fun, arg, .. } => {
                let fun = self.inst_aux(fun, substs, offset);
                let arg = self.inst_aux(arg, substs, offset);
                self.mk_app(fun, arg)
            }
            Pi { binder_name, binder_style, binder_type, body, .. } => {
                let binder_type = self.inst_aux(binder_type, substs, offset);
                let body = self.inst_aux(body, substs, offset + 1);
                self.mk_pi(binder_name, binder_style, binder_type, body)
            }
            Lambda { binder_name, binder_style, binder_type, body, .. } => {
                let binder_type = self.inst_aux(binder_type, substs, offset);
                let body = self.inst_aux(body, substs, offset + 1);
                self.mk_lambda(binder_name, binder_style, binder_type, body)
            }
            Let { binder_name, binder_type, val, body, nondep, .. } => {
                let binder_type = self.inst_aux(binder_type, substs, offset);
                let val = self.inst_aux(val, substs, offset);
                let body = self.inst_aux(body, substs, offset + 1);
                self.mk_let(binder_name, binder_type, val, body, nondep)
            }
            Proj { ty_name, idx, structure, .. } => {
                let structure = self.inst_aux(structure, substs, offset);
                self.mk_proj(ty_name, idx, structure)
            }
            Sort { .. } | Const { .. } | Local { .. } | NatLit { .. } | StringLit { .. } | MVar { .. } => e,
        };
        self.expr_cache.inst_cache.insert((e, offset), calcd);
        calcd
    }

    /// Substitute universe levels for the universe parameters `ks`, e.g. when unfolding
    /// the value of a universe-polymorphic definition.
    pub fn subst_expr_levels(&mut self, e: ExprPtr, ks: LevelsPtr, vs: LevelsPtr) -> ExprPtr {
        if ks == vs {
            return e
        }
        if let Some(cached) = self.expr_cache.subst_cache.get(&(e, ks, vs)).copied() {
            return cached
        }
        let calcd = match self.read_expr(e) {
            Var { .. } | Local { .. } | NatLit { .. } | StringLit { .. } | MVar { .. } => e,
            Sort { level, .. } => {
                let (ks_, vs_) = (self.read_levels(ks), self.read_levels(vs));
                let level = self.subst_level(level, &ks_, &vs_);
                self.mk_sort(level)
            }
            Const { name, levels, .. } => {
                let (ks_, vs_) = (self.read_levels(ks), self.read_levels(vs));
                let levels = self.read_levels(levels);
                let substd = levels.iter().map(|l| self.subst_level(*l, &ks_, &vs_)).collect::<Vec<_>>();
                let levels = self.alloc_levels_slice(&substd);
                self.mk_const(name, levels)
            }
            App { fun, arg, .. } => {
                let fun = self.subst_expr_levels(fun, ks, vs);
                let arg = self.subst_expr_levels(arg, ks, vs);
                self.mk_app(fun, arg)
            }
            Pi { binder_name, binder_style, binder_type, body, .. } => {
                let binder_type = self.subst_expr_levels(binder_type, ks, vs);
                let body = self.subst_expr_levels(body, ks, vs);
                self.mk_pi(binder_name, binder_style, binder_type, body)
            }
            Lambda { binder_name, binder_style, binder_type, body, .. } => {
                let binder_type = self.subst_expr_levels(binder_type, ks, vs);
                let body = self.subst_expr_levels(body, ks, vs);
                self.mk_lambda(binder_name, binder_style, binder_type, body)
            }
            Let { binder_name, binder_type, val, body, nondep, .. } => {
                let binder_type = self.subst_expr_levels(binder_type, ks, vs);
                let val = self.subst_expr_levels(val, ks, vs);
                let body = self.subst_expr_levels(body, ks, vs);
                self.mk_let(binder_name, binder_type, val, body, nondep)
            }
            Proj { ty_name, idx, structure, .. } => {
                let structure = self.subst_expr_levels(structure, ks, vs);
                self.mk_proj(ty_name, idx, structure)
            }
        };
        self.expr_cache.subst_cache.insert((e, ks, vs), calcd);
        calcd
    }
}
