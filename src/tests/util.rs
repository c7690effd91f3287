use crate::env::ReducibilityHint;
use crate::errors::DiscrResult;
use crate::expr::{BinderStyle, Expr, MVarId};
use crate::key::Key;
use crate::lazy::LazyEntry;
use crate::util::{Config, ExprPtr, LevelsPtr, TermCtx};
use std::error::Error;
use std::path::Path;

/// Run `f` against a context holding the small test environment, configured from
/// `config_path` or with the default config.
pub(crate) fn test_ctx<A>(
    config_path: Option<&Path>,
    f: impl FnOnce(&mut TermCtx) -> DiscrResult<A>,
) -> Result<A, Box<dyn Error>> {
    let config = match config_path {
        None => Config::default(),
        Some(config_path) => Config::try_from(config_path)?,
    };
    test_ctx_with(config, f)
}

pub(crate) fn test_ctx_with<A>(
    config: Config,
    f: impl FnOnce(&mut TermCtx) -> DiscrResult<A>,
) -> Result<A, Box<dyn Error>> {
    let mut ctx = TermCtx::new(config);
    ctx.add_test_env();
    Ok(f(&mut ctx)?)
}

impl TermCtx {
    /// ```text
    /// Nat : Type, Nat.zero : Nat, a b c : Nat
    /// f : Nat → Nat → Nat, g : Nat → Nat, h : Nat → Nat → Nat → Nat
    /// HAdd.hAdd : (α β γ : Type) → [HAdd α β γ] → α → β → γ, instHAdd instHAdd' : HAdd Nat Nat Nat
    /// OfNat.ofNat : (α : Type) → (n : Nat) → [OfNat α n] → α, instOfNatNat : (n : Nat) → OfNat Nat n
    /// @[reducible] double (x : Nat) : Nat := HAdd.hAdd Nat Nat Nat instHAdd x x
    /// regularDouble (x : Nat) : Nat := HAdd.hAdd Nat Nat Nat instHAdd x x
    /// @[reducible] myId.{u} (α : Sort u) (x : α) : α := x
    /// @[reducible] loop : Nat := loop
    /// structure Pair where (mk ::) (fst snd : Nat)
    /// ```
    #[cfg(test)]
    pub(crate) fn add_test_env(&mut self) {
        let no_levels = self.no_levels();
        let zero = self.zero();
        let one = self.succ(zero);
        let ty = self.mk_sort(one);
        let ty_to_ty = self.arrow(ty, ty);
        let nat = self.c("Nat");
        let nat_to_nat = self.arrow(nat, nat);
        let nat_to_nat_to_nat = self.arrow(nat, nat_to_nat);
        let nat3_to_nat = self.arrow(nat, nat_to_nat_to_nat);

        self.axiom_quick("Nat", ty);
        self.axiom_quick("Nat.zero", nat);
        for s in ["a", "b", "c"] {
            self.axiom_quick(s, nat);
        }
        self.axiom_quick("f", nat_to_nat_to_nat);
        self.axiom_quick("g", nat_to_nat);
        self.axiom_quick("h", nat3_to_nat);

        // HAdd : Type → Type → Type → Type
        let ty3_to_ty = {
            let ty2_to_ty = self.arrow(ty, ty_to_ty);
            self.arrow(ty, ty2_to_ty)
        };
        self.axiom_quick("HAdd", ty3_to_ty);
        let hadd_ty = {
            let (v0, v1, v2, v3) = (self.mk_var(0), self.mk_var(1), self.mk_var(2), self.mk_var(3));
            let inst_ty = self.capp("HAdd", &[v2, v1, v0]);
            let body = self.pi_quick("b", BinderStyle::Default, v3, v3);
            let body = self.pi_quick("a", BinderStyle::Default, v3, body);
            let body = self.pi_quick("self", BinderStyle::InstImplicit, inst_ty, body);
            let body = self.pi_quick("γ", BinderStyle::Default, ty, body);
            let body = self.pi_quick("β", BinderStyle::Default, ty, body);
            self.pi_quick("α", BinderStyle::Default, ty, body)
        };
        self.axiom_quick("HAdd.hAdd", hadd_ty);
        let hadd_nat = self.capp("HAdd", &[nat, nat, nat]);
        self.axiom_quick("instHAdd", hadd_nat);
        self.axiom_quick("instHAdd'", hadd_nat);

        // OfNat : Type → Nat → Type
        let of_nat_ty = {
            let nat_to_ty = self.arrow(nat, ty);
            self.arrow(ty, nat_to_ty)
        };
        self.axiom_quick("OfNat", of_nat_ty);
        let of_nat_of_nat_ty = {
            let (v0, v1, v2) = (self.mk_var(0), self.mk_var(1), self.mk_var(2));
            let inst_ty = self.capp("OfNat", &[v1, v0]);
            let body = self.pi_quick("self", BinderStyle::InstImplicit, inst_ty, v2);
            let body = self.pi_quick("n", BinderStyle::Default, nat, body);
            self.pi_quick("α", BinderStyle::Default, ty, body)
        };
        self.axiom_quick("OfNat.ofNat", of_nat_of_nat_ty);
        let inst_of_nat_nat_ty = {
            let v0 = self.mk_var(0);
            let body = self.capp("OfNat", &[nat, v0]);
            self.pi_quick("n", BinderStyle::Default, nat, body)
        };
        self.axiom_quick("instOfNatNat", inst_of_nat_nat_ty);

        let double_val = {
            let v0 = self.mk_var(0);
            let body = self.add(v0, v0);
            self.lam_quick("x", nat, body)
        };
        self.def_quick("double", no_levels, nat_to_nat, double_val, ReducibilityHint::Abbrev);
        self.def_quick("regularDouble", no_levels, nat_to_nat, double_val, ReducibilityHint::Regular(1));

        let u = self.str1("u");
        let u = self.param(u);
        let uparams = self.alloc_levels_slice(&[u]);
        let sort_u = self.mk_sort(u);
        let (v0, v1) = (self.mk_var(0), self.mk_var(1));
        let my_id_ty = {
            let body = self.pi_quick("x", BinderStyle::Default, v0, v1);
            self.pi_quick("α", BinderStyle::Default, sort_u, body)
        };
        let my_id_val = {
            let body = self.lam_quick("x", v0, v0);
            self.lam_quick("α", sort_u, body)
        };
        self.def_quick("myId", uparams, my_id_ty, my_id_val, ReducibilityHint::Abbrev);

        let loop_ = self.c("loop");
        self.def_quick("loop", no_levels, nat, loop_, ReducibilityHint::Abbrev);

        let pair = self.c("Pair");
        self.axiom_quick("Pair", ty);
        let pair_mk_ty = {
            let nat_to_pair = self.arrow(nat, pair);
            self.arrow(nat, nat_to_pair)
        };
        let (pair_mk, pair_name) = (self.name_from_str("Pair.mk"), self.name_from_str("Pair"));
        self.add_constructor(pair_mk, no_levels, pair_mk_ty, pair_name, 0, 2);
    }

    #[cfg(test)]
    pub(crate) fn c(&mut self, s: &str) -> ExprPtr {
        let name = self.name_from_str(s);
        let levels = self.no_levels();
        self.mk_const(name, levels)
    }

    #[cfg(test)]
    pub(crate) fn capp(&mut self, s: &str, args: &[ExprPtr]) -> ExprPtr {
        let fun = self.c(s);
        self.foldl_apps(fun, args.iter().copied())
    }

    #[cfg(test)]
    pub(crate) fn ckey(&mut self, s: &str, nargs: u32) -> Key { Key::Const(self.name_from_str(s), nargs) }

    #[cfg(test)]
    pub(crate) fn arrow(&mut self, dom: ExprPtr, cod: ExprPtr) -> ExprPtr {
        let anon = self.anonymous();
        self.mk_pi(anon, BinderStyle::Default, dom, cod)
    }

    #[cfg(test)]
    pub(crate) fn pi_quick(&mut self, s: &str, style: BinderStyle, dom: ExprPtr, body: ExprPtr) -> ExprPtr {
        let name = self.str1(s);
        self.mk_pi(name, style, dom, body)
    }

    #[cfg(test)]
    pub(crate) fn lam_quick(&mut self, s: &str, dom: ExprPtr, body: ExprPtr) -> ExprPtr {
        let name = self.str1(s);
        self.mk_lambda(name, BinderStyle::Default, dom, body)
    }

    #[cfg(test)]
    pub(crate) fn axiom_quick(&mut self, s: &str, ty: ExprPtr) {
        let name = self.name_from_str(s);
        let levels = self.no_levels();
        self.add_axiom(name, levels, ty)
    }

    #[cfg(test)]
    pub(crate) fn def_quick(&mut self, s: &str, uparams: LevelsPtr, ty: ExprPtr, val: ExprPtr, hint: ReducibilityHint) {
        let name = self.name_from_str(s);
        self.add_definition(name, uparams, ty, val, hint)
    }

    /// `HAdd.hAdd Nat Nat Nat instHAdd x y`
    #[cfg(test)]
    pub(crate) fn add(&mut self, x: ExprPtr, y: ExprPtr) -> ExprPtr {
        let (nat, inst) = (self.c("Nat"), self.c("instHAdd"));
        self.capp("HAdd.hAdd", &[nat, nat, nat, inst, x, y])
    }

    /// `OfNat.ofNat Nat n (instOfNatNat n)`
    #[cfg(test)]
    pub(crate) fn of_nat(&mut self, n: u64) -> ExprPtr {
        let nat = self.c("Nat");
        let lit = self.mk_nat_lit_quick(n);
        let inst = self.capp("instOfNatNat", &[lit]);
        self.capp("OfNat.ofNat", &[nat, lit, inst])
    }

    #[cfg(test)]
    pub(crate) fn mvar_id(&self, e: ExprPtr) -> MVarId {
        match self.read_expr(e) {
            Expr::MVar { id, .. } => id,
            owise => panic!("expected an MVar, got {:?}", owise),
        }
    }

    #[cfg(test)]
    pub(crate) fn encode(&mut self, e: ExprPtr) -> DiscrResult<Vec<Key>> { LazyEntry::new(e).encode_all(self) }
}

#[test]
fn hash_consing0() -> Result<(), Box<dyn Error>> {
    use crate::hash64;
    test_ctx(None, |ctx| {
        let (a1, a2) = (ctx.c("a"), ctx.c("a"));
        assert_eq!(a1, a2);
        assert_eq!(hash64!(a1), hash64!(a2));
        let (fa1, fa2) = (ctx.capp("f", &[a1, a1]), ctx.capp("f", &[a2, a2]));
        assert_eq!(fa1, fa2);
        let b = ctx.c("b");
        let fab = ctx.capp("f", &[a1, b]);
        assert_ne!(fa1, fab);
        let (s1, s2) = (ctx.mk_string_lit_quick("x"), ctx.mk_string_lit_quick("x"));
        assert_eq!(s1, s2);
        let (n1, n2) = (ctx.mk_nat_lit_quick(7u64), ctx.mk_nat_lit_quick(7u64));
        assert_eq!(n1, n2);
        Ok(())
    })
}

#[test]
fn name_from_str0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let n = ctx.name_from_str("HAdd.hAdd");
        let hadd = ctx.str1("HAdd");
        let hadd_s = ctx.alloc_string("hAdd");
        assert_eq!(n, ctx.str(hadd, hadd_s));
        assert_eq!(ctx.name_prefix(n), hadd);
        assert_eq!(ctx.name_to_string(n), "HAdd.hAdd");
        let private = ctx.name_from_str("_private.0.foo");
        assert_eq!(ctx.name_to_string(private), "_private.0.foo");
        let pfx = ctx.name_prefix(private);
        assert!(matches!(ctx.read_name(pfx), crate::name::Name::Num(_, 0, _)));
        Ok(())
    })
}

#[test]
fn loose_bvars0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let nat = ctx.c("Nat");
        let (v0, v1) = (ctx.mk_var(0), ctx.mk_var(1));
        let app = ctx.capp("f", &[v0, v1]);
        assert_eq!(ctx.num_loose_bvars(app), 2);
        let lam = ctx.lam_quick("x", nat, app);
        assert_eq!(ctx.num_loose_bvars(lam), 1);
        let lam = ctx.lam_quick("y", nat, lam);
        assert_eq!(ctx.num_loose_bvars(lam), 0);
        assert!(!ctx.has_fvars(lam));
        let x = ctx.str1("x");
        let local = ctx.mk_unique(x, BinderStyle::Default, nat);
        let app = ctx.capp("g", &[local]);
        assert!(ctx.has_fvars(app));
        Ok(())
    })
}

#[test]
fn inst0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let nat = ctx.c("Nat");
        let (a, b) = (ctx.c("a"), ctx.c("b"));
        let (v0, v1, v2) = (ctx.mk_var(0), ctx.mk_var(1), ctx.mk_var(2));
        // f #0 #1 [#0 := a, #1 := b] = f a b
        let e = ctx.capp("f", &[v0, v1]);
        let expected = ctx.capp("f", &[a, b]);
        assert_eq!(ctx.inst(e, &[a, b]), expected);
        // fun x => f #0 #1 [#0 := a] = fun x => f #0 a
        let e = ctx.lam_quick("x", nat, e);
        let body = ctx.capp("f", &[v0, a]);
        let expected = ctx.lam_quick("x", nat, body);
        assert_eq!(ctx.inst(e, &[a]), expected);
        // variables past the substitution are lowered
        let e = ctx.capp("f", &[v0, v2]);
        let expected = ctx.capp("f", &[a, v1]);
        assert_eq!(ctx.inst(e, &[a]), expected);
        Ok(())
    })
}
