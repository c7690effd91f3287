use crate::expr::FVarId;
use crate::key::{subterm_size, subterm_sizes, Key, KeyTree, Literal};
use crate::tests::util::test_ctx;
use std::error::Error;

#[test]
fn arity0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let f = ctx.name_from_str("f");
        let pair = ctx.name_from_str("Pair");
        let two = ctx.alloc_bignum(2u64.into());
        assert_eq!(Key::Const(f, 2).arity(), 2);
        assert_eq!(Key::FVar(FVarId(3), 1).arity(), 1);
        assert_eq!(Key::BVar(0, 0).arity(), 0);
        assert_eq!(Key::Lam.arity(), 1);
        assert_eq!(Key::Forall.arity(), 2);
        assert_eq!(Key::Proj(pair, 0, 0).arity(), 1);
        assert_eq!(Key::Proj(pair, 1, 2).arity(), 3);
        for leaf in [Key::Star(0), Key::Opaque, Key::Sort, Key::Lit(Literal::Nat(two))] {
            assert_eq!(leaf.arity(), 0);
        }
        assert!(Key::Star(4).is_star());
        assert_eq!(Key::Star(4).star_id(), Some(4));
        assert!(!Key::Const(f, 0).is_star());
        Ok(())
    })
}

#[test]
fn const_hash_ignores_arity() -> Result<(), Box<dyn Error>> {
    use crate::hash64;
    test_ctx(None, |ctx| {
        let (f, g) = (ctx.name_from_str("f"), ctx.name_from_str("g"));
        assert_eq!(hash64!(Key::Const(f, 1)), hash64!(Key::Const(f, 2)));
        assert_ne!(Key::Const(f, 1), Key::Const(f, 2));
        assert_ne!(hash64!(Key::Const(f, 1)), hash64!(Key::Const(g, 1)));
        assert_ne!(hash64!(Key::BVar(0, 1)), hash64!(Key::BVar(0, 2)));
        Ok(())
    })
}

#[test]
fn subterm_size0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        // f (g a) (λ, #0)
        let keys = vec![ctx.ckey("f", 2), ctx.ckey("g", 1), ctx.ckey("a", 0), Key::Lam, Key::BVar(0, 0)];
        assert_eq!(subterm_size(&keys, 0), Some(5));
        assert_eq!(subterm_size(&keys, 1), Some(2));
        assert_eq!(subterm_size(&keys, 2), Some(1));
        assert_eq!(subterm_size(&keys, 3), Some(2));
        assert_eq!(subterm_sizes(&keys), Some(vec![5, 2, 1, 2, 1]));
        // overrun
        assert_eq!(subterm_size(&keys[..4], 0), None);
        assert_eq!(subterm_sizes(&keys[..4]), None);
        // trailing keys
        let mut trailing = keys.clone();
        trailing.push(ctx.ckey("b", 0));
        assert_eq!(subterm_size(&trailing, 0), Some(5));
        assert_eq!(subterm_sizes(&trailing), None);
        Ok(())
    })
}

#[test]
fn key_tree0() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let keys = vec![ctx.ckey("h", 3), Key::Star(0), ctx.ckey("g", 1), Key::Star(1), Key::Forall, Key::Sort, Key::Opaque];
        let tree = KeyTree::from_keys(&keys).expect("complete term");
        assert_eq!(tree.key, ctx.ckey("h", 3));
        assert_eq!(tree.args.len(), 3);
        assert_eq!(tree.args[1].args, vec![KeyTree { key: Key::Star(1), args: Vec::new() }]);
        assert_eq!(tree.args[2].args.len(), 2);
        assert_eq!(tree.flatten(), keys);
        assert!(KeyTree::from_keys(&keys[..5]).is_none());
        assert!(KeyTree::from_keys(&[]).is_none());
        Ok(())
    })
}

/// Every encoding produced by an entry regroups into exactly one term.
#[test]
fn encodings_are_self_describing() -> Result<(), Box<dyn Error>> {
    test_ctx(None, |ctx| {
        let (a, b, x, y) = (ctx.c("a"), ctx.c("b"), ctx.mk_mvar(), ctx.mk_mvar());
        let nat = ctx.c("Nat");
        let ga = ctx.capp("g", &[a]);
        let v0 = ctx.mk_var(0);
        let body = ctx.capp("f", &[a, v0]);
        let lam = ctx.lam_quick("z", nat, body);
        let pi = ctx.arrow(nat, ga);
        let sum = ctx.add(x, ga);
        let two = ctx.of_nat(2);
        let pair = ctx.name_from_str("Pair");
        let proj = ctx.mk_proj(pair, 1, y);
        let terms = vec![
            ctx.capp("h", &[ga, x, b]),
            ctx.capp("f", &[lam, pi]),
            ctx.capp("f", &[sum, two]),
            ctx.capp("g", &[proj]),
            ctx.capp("double", &[x]),
        ];
        for t in terms {
            let keys = ctx.encode(t)?;
            assert_eq!(subterm_size(&keys, 0), Some(keys.len()));
            let tree = KeyTree::from_keys(&keys).expect("complete term");
            assert_eq!(tree.flatten(), keys);
        }
        Ok(())
    })
}
