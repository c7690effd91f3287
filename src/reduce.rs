use crate::env::{Declar, ReducibilityHint};
use crate::errors::{DiscrErr, DiscrResult};
use crate::expr::{BinderStyle, Expr::*, FVarId, MVarId};
use crate::key::Literal;
use crate::util::{ExprPtr, LevelsPtr, NamePtr, TermCtx};
use num_bigint::BigUint;

/// What sits at the head of a (normalized) expression, along with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadShape {
    Const { name: NamePtr, args: Vec<ExprPtr> },
    Local { id: FVarId, args: Vec<ExprPtr> },
    MVar { id: MVarId, args: Vec<ExprPtr> },
    Lit(Literal),
    Sort,
    Lambda { binder_name: NamePtr, binder_style: BinderStyle, binder_type: ExprPtr, body: ExprPtr },
    Pi { binder_name: NamePtr, binder_style: BinderStyle, binder_type: ExprPtr, body: ExprPtr },
    Proj { ty_name: NamePtr, idx: usize, structure: ExprPtr, args: Vec<ExprPtr> },
    /// Loose bound variables, `let` when zeta is disabled, and applications whose head
    /// can't take arguments.
    Other,
}

impl TermCtx {
    /// Reduce `e` to weak head normal form: beta, zeta (if enabled), instantiation of
    /// assigned metavariables at the head, projections of constructor applications, and
    /// unfolding of `Abbrev` definitions (if enabled). Each reduction step costs one unit of
    /// fuel; running out is an error.
    pub fn whnf(&mut self, e: ExprPtr) -> DiscrResult<ExprPtr> {
        let cache_key = (self.env.generation, e);
        if let Some(cached) = self.expr_cache.whnf_cache.get(&cache_key).copied() {
            return Ok(cached)
        }
        let mut fuel = self.config.whnf_fuel;
        let out = self.whnf_aux(e, &mut fuel)?;
        self.expr_cache.whnf_cache.insert(cache_key, out);
        Ok(out)
    }

    fn whnf_aux(&mut self, e: ExprPtr, fuel: &mut usize) -> DiscrResult<ExprPtr> {
        let mut cursor = e;
        loop {
            let (fun, args) = self.unfold_apps(cursor);
            let next = match self.read_expr(fun) {
                Lambda { .. } if !args.is_empty() => Some(self.beta(fun, &args)),
                Let { val, body, .. } if self.config.zeta => {
                    let body = self.inst(body, &[val]);
                    Some(self.foldl_apps(body, args.into_iter()))
                }
                MVar { id, .. } => match self.get_mvar_assignment(id) {
                    Some(val) => Some(self.foldl_apps(val, args.into_iter())),
                    None => None,
                },
                Proj { ty_name, idx, structure, .. } => match self.reduce_proj(ty_name, idx, structure, fuel)? {
                    Some(field) => Some(self.foldl_apps(field, args.into_iter())),
                    None => None,
                },
                Const { name, levels, .. } if self.config.unfold_reducible => match self.unfold_abbrev(name, levels) {
                    Some(val) => Some(self.foldl_apps(val, args.into_iter())),
                    None => None,
                },
                _ => None,
            };
            match next {
                None => return Ok(cursor),
                Some(_) if *fuel == 0 => {
                    log::debug!("whnf ran out of fuel on {:?}", self.debug_print(e));
                    return Err(DiscrErr::WhnfFuelExhausted {
                        fuel: self.config.whnf_fuel,
                        expr: format!("{:?}", self.debug_print(e)),
                    })
                }
                Some(next) => {
                    *fuel -= 1;
                    cursor = next;
                }
            }
        }
    }

    /// Whnf followed by eta reduction (if enabled), repeated until neither makes progress.
    /// An eta-reduced lambda can expose a reducible head, e.g. `fun x => myAbbrev x`.
    pub fn normalize_head(&mut self, e: ExprPtr) -> DiscrResult<ExprPtr> {
        let mut cursor = self.whnf(e)?;
        if !self.config.eta_reduce {
            return Ok(cursor)
        }
        for _ in 0..self.config.whnf_fuel {
            let reduced = self.eta_reduce(cursor);
            if reduced == cursor {
                return Ok(cursor)
            }
            cursor = self.whnf(reduced)?;
        }
        Err(DiscrErr::WhnfFuelExhausted { fuel: self.config.whnf_fuel, expr: format!("{:?}", self.debug_print(e)) })
    }

    /// `(fun x y => b) a1 a2 a3 ~> b[x := a1, y := a2] a3`
    fn beta(&mut self, mut fun: ExprPtr, args: &[ExprPtr]) -> ExprPtr {
        let mut applied = Vec::new();
        while let (Lambda { body, .. }, Some(arg)) = (self.read_expr(fun), args.get(applied.len()).copied()) {
            applied.push(arg);
            fun = body;
        }
        let rest = &args[applied.len()..];
        applied.reverse();
        let body = self.inst(fun, &applied);
        self.foldl_apps(body, rest.iter().copied())
    }

    /// `(C.mk p1 .. pn f1 .. fm).i ~> f(i+1)` when `C.mk` is a registered constructor of
    /// `ty_name` applied to all of its parameters and fields.
    fn reduce_proj(
        &mut self,
        ty_name: NamePtr,
        idx: usize,
        structure: ExprPtr,
        fuel: &mut usize,
    ) -> DiscrResult<Option<ExprPtr>> {
        let structure = self.whnf_aux(structure, fuel)?;
        let (fun, args) = self.unfold_apps(structure);
        let Const { name, .. } = self.read_expr(fun) else { return Ok(None) };
        match self.ctor_info(name) {
            Some((induct_name, num_params, num_fields))
                if induct_name == ty_name
                    && idx < num_fields as usize
                    && args.len() == (num_params + num_fields) as usize =>
                Ok(Some(args[num_params as usize + idx])),
            _ => Ok(None),
        }
    }

    /// Unfold a reducible definition with its universe parameters instantiated. A
    /// universe-argument count mismatch leaves the constant alone.
    fn unfold_abbrev(&mut self, name: NamePtr, levels: LevelsPtr) -> Option<ExprPtr> {
        match self.get_declar(name).copied() {
            Some(Declar::Definition { info, val, hint: ReducibilityHint::Abbrev }) => {
                if self.read_levels(info.uparams).len() != self.read_levels(levels).len() {
                    return None
                }
                Some(self.subst_expr_levels(val, info.uparams, levels))
            }
            _ => None,
        }
    }

    /// `fun x1 .. xk => f x(k-m+1) .. xk ~> fun x1 .. x(k-m) => f` for the largest `m` such
    /// that `f` doesn't mention any of the binders.
    pub fn eta_reduce(&mut self, e: ExprPtr) -> ExprPtr {
        let mut binders = Vec::new();
        let mut cursor = e;
        while let Lambda { binder_name, binder_style, binder_type, body, .. } = self.read_expr(cursor) {
            binders.push((binder_name, binder_style, binder_type));
            cursor = body;
        }
        if binders.is_empty() {
            return e
        }
        let (head, args) = self.unfold_apps(cursor);
        let mut m = 0usize;
        while m < binders.len() && m < args.len() {
            match self.read_expr(args[args.len() - 1 - m]) {
                Var { dbj_idx, .. } if dbj_idx as usize == m => m += 1,
                _ => break,
            }
        }
        while m > 0 {
            let f = self.foldl_apps(head, args[..args.len() - m].iter().copied());
            if self.num_loose_bvars(f) == 0 {
                let mut out = f;
                for (binder_name, binder_style, binder_type) in binders[..binders.len() - m].iter().copied().rev() {
                    out = self.mk_lambda(binder_name, binder_style, binder_type, out);
                }
                return out
            }
            m -= 1;
        }
        e
    }

    /// Classify the head of `e`, which is expected to be in whnf already. With numerals
    /// enabled, `OfNat.ofNat _ n _` and `Nat.zero` are reported as the literal `n`/`0`.
    pub fn head_shape(&mut self, e: ExprPtr) -> HeadShape {
        let (fun, args) = self.unfold_apps(e);
        match self.read_expr(fun) {
            Const { name, .. } => {
                if self.config.numerals {
                    if name == self.name_cache.nat_zero && args.is_empty() {
                        return HeadShape::Lit(Literal::Nat(self.alloc_bignum(BigUint::from(0u8))))
                    }
                    if name == self.name_cache.of_nat && args.len() == 3 {
                        if let NatLit { ptr, .. } = self.read_expr(args[1]) {
                            return HeadShape::Lit(Literal::Nat(ptr))
                        }
                    }
                }
                HeadShape::Const { name, args }
            }
            Local { id, .. } => HeadShape::Local { id, args },
            MVar { id, .. } => HeadShape::MVar { id, args },
            Proj { ty_name, idx, structure, .. } => HeadShape::Proj { ty_name, idx, structure, args },
            _ if !args.is_empty() => HeadShape::Other,
            NatLit { ptr, .. } => HeadShape::Lit(Literal::Nat(ptr)),
            StringLit { ptr, .. } => HeadShape::Lit(Literal::Str(ptr)),
            Sort { .. } => HeadShape::Sort,
            Lambda { binder_name, binder_style, binder_type, body, .. } =>
                HeadShape::Lambda { binder_name, binder_style, binder_type, body },
            Pi { binder_name, binder_style, binder_type, body, .. } =>
                HeadShape::Pi { binder_name, binder_style, binder_type, body },
            Var { .. } | Let { .. } | App { .. } => HeadShape::Other,
        }
    }
}
