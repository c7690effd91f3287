use crate::expr::Expr::*;
use crate::key::{Key, KeyTree, Literal};
use crate::level::Level;
use crate::name::Name;
use crate::util::{BigUintPtr, ExprPtr, LevelPtr, LevelsPtr, NamePtr, StringPtr, TermCtx};
use std::fmt;

pub struct DebugPrinter<'x, A> {
    pub(crate) ctx: &'x TermCtx,
    pub(crate) elem_to_print: A,
}

impl TermCtx {
    pub fn debug_print<A>(&self, elem_to_print: A) -> DebugPrinter<'_, A> { DebugPrinter { ctx: self, elem_to_print } }
}

impl<'x> fmt::Debug for DebugPrinter<'x, NamePtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.read_name(self.elem_to_print) {
            Name::Anon => Ok(()),
            Name::Str(pfx, sfx, _) => {
                let sfx = self.ctx.read_string(sfx);
                match self.ctx.read_name(pfx) {
                    Name::Anon => write!(f, "{}", sfx),
                    _ => write!(f, "{:?}.{}", self.ctx.debug_print(pfx), sfx),
                }
            }
            Name::Num(pfx, sfx, _) => match self.ctx.read_name(pfx) {
                Name::Anon => write!(f, "{}", sfx),
                _ => write!(f, "{:?}.{}", self.ctx.debug_print(pfx), sfx),
            },
        }
    }
}

impl<'x, A, B> fmt::Debug for DebugPrinter<'x, (A, B)>
where
    A: Copy,
    B: Copy,
    DebugPrinter<'x, A>: fmt::Debug,
    DebugPrinter<'x, B>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.ctx.debug_print(self.elem_to_print.0), self.ctx.debug_print(self.elem_to_print.1))
    }
}

impl<'x, A> fmt::Debug for DebugPrinter<'x, Vec<A>>
where
    A: Clone,
    DebugPrinter<'x, A>: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elem_to_print.clone().into_iter().map(|x| self.ctx.debug_print(x))).finish()
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, LevelPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.read_level(self.elem_to_print) {
            Level::Zero => write!(f, "0"),
            Level::Succ(..) => {
                let (val, n) = self.ctx.level_succs(self.elem_to_print);
                if self.ctx.read_level(val) == Level::Zero {
                    write!(f, "{}", n)
                } else {
                    write!(f, "{:?} + {}", self.ctx.debug_print(val), n)
                }
            }
            Level::Max(l, r, _) => write!(f, "max{:?}", self.ctx.debug_print((l, r))),
            Level::IMax(l, r, _) => write!(f, "imax{:?}", self.ctx.debug_print((l, r))),
            Level::Param(name, _) => write!(f, "{:?}", self.ctx.debug_print(name)),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, LevelsPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.ctx.read_levels(self.elem_to_print);
        f.debug_list().entries(levels.iter().map(|l| self.ctx.debug_print(*l))).finish()
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, ExprPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.read_expr(self.elem_to_print) {
            Var { dbj_idx, .. } => write!(f, "${}", dbj_idx),
            Sort { level, .. } => write!(f, "Sort({:?})", self.ctx.debug_print(level)),
            Const { name, levels, .. } =>
                if self.ctx.read_levels(levels).is_empty() {
                    write!(f, "{:?}", self.ctx.debug_print(name))
                } else {
                    write!(f, "{:?}.{:?}", self.ctx.debug_print(name), self.ctx.debug_print(levels))
                },
            App { fun, arg, .. } => write!(f, "({:?} {:?})", self.ctx.debug_print(fun), self.ctx.debug_print(arg)),
            Let { binder_name, val, binder_type, body, .. } => {
                write!(
                    f,
                    "let {:?} : {:?} := {:?} in {:?}",
                    self.ctx.debug_print(binder_name),
                    self.ctx.debug_print(binder_type),
                    self.ctx.debug_print(val),
                    self.ctx.debug_print(body)
                )
            }
            Pi { binder_name, binder_type, body, .. } => {
                write!(
                    f,
                    "Pi ({:?} : {:?}), {:?}",
                    self.ctx.debug_print(binder_name),
                    self.ctx.debug_print(binder_type),
                    self.ctx.debug_print(body)
                )
            }
            Lambda { binder_name, binder_type, body, .. } => {
                write!(
                    f,
                    "fun ({:?} : {:?}) => {:?}",
                    self.ctx.debug_print(binder_name),
                    self.ctx.debug_print(binder_type),
                    self.ctx.debug_print(body)
                )
            }
            Local { binder_name, id, .. } => write!(f, "#({:?}, {})", self.ctx.debug_print(binder_name), id.0),
            Proj { idx, structure, .. } => write!(f, "%({:?}).{}", self.ctx.debug_print(structure), idx),
            NatLit { ptr, .. } => write!(f, "NLit({})", self.ctx.read_bignum(ptr)),
            StringLit { ptr, .. } => write!(f, "SLit({})", self.ctx.read_string(ptr)),
            MVar { id, .. } => write!(f, "?m.{}", id.0),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, StringPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.ctx.read_string(self.elem_to_print)) }
}

impl<'x> fmt::Debug for DebugPrinter<'x, BigUintPtr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.ctx.read_bignum(self.elem_to_print)) }
}

impl<'x> fmt::Debug for DebugPrinter<'x, Literal> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            Literal::Nat(n) => write!(f, "{:?}", self.ctx.debug_print(n)),
            Literal::Str(s) => write!(f, "{:?}", self.ctx.debug_print(s)),
        }
    }
}

/// A single key on its own, without its arguments.
impl<'x> fmt::Debug for DebugPrinter<'x, Key> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_to_print {
            Key::Star(id) => write!(f, "*{}", id),
            Key::Opaque => write!(f, "◾"),
            Key::Const(name, _) => write!(f, "{:?}", self.ctx.debug_print(name)),
            Key::FVar(id, _) => write!(f, "_fvar.{}", id.0),
            Key::BVar(idx, _) => write!(f, "#{}", idx),
            Key::Lit(l) => write!(f, "{:?}", self.ctx.debug_print(l)),
            Key::Sort => write!(f, "Sort"),
            Key::Lam => write!(f, "λ"),
            Key::Forall => write!(f, "∀"),
            Key::Proj(name, idx, _) => write!(f, "{:?}.{}", self.ctx.debug_print(name), idx + 1),
        }
    }
}

/// A complete key sequence, regrouped by arity into the pattern it encodes, e.g.
/// `HAdd.hAdd *0 *1 (f 2)`. Sequences that don't form a single term are printed as a
/// flat list.
impl<'x> fmt::Debug for DebugPrinter<'x, &[Key]> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match KeyTree::from_keys(self.elem_to_print) {
            Some(tree) => write!(f, "{:?}", self.ctx.debug_print(&tree)),
            None => f.debug_list().entries(self.elem_to_print.iter().map(|k| self.ctx.debug_print(*k))).finish(),
        }
    }
}

impl<'x> fmt::Debug for DebugPrinter<'x, &KeyTree> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt_key_tree(self.ctx, self.elem_to_print, false, f) }
}

fn fmt_key_tree(ctx: &TermCtx, tree: &KeyTree, parenthesize: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if tree.args.is_empty() {
        return write!(f, "{:?}", ctx.debug_print(tree.key))
    }
    if parenthesize {
        write!(f, "(")?;
    }
    match tree.key {
        Key::Lam => {
            write!(f, "λ, ")?;
            fmt_key_tree(ctx, &tree.args[0], false, f)?;
        }
        Key::Forall => {
            fmt_key_tree(ctx, &tree.args[0], true, f)?;
            write!(f, " → ")?;
            fmt_key_tree(ctx, &tree.args[1], false, f)?;
        }
        Key::Proj(_, idx, _) => {
            fmt_key_tree(ctx, &tree.args[0], true, f)?;
            write!(f, ".{}", idx + 1)?;
            for arg in tree.args[1..].iter() {
                write!(f, " ")?;
                fmt_key_tree(ctx, arg, true, f)?;
            }
        }
        _ => {
            write!(f, "{:?}", ctx.debug_print(tree.key))?;
            for arg in tree.args.iter() {
                write!(f, " ")?;
                fmt_key_tree(ctx, arg, true, f)?;
            }
        }
    }
    if parenthesize {
        write!(f, ")")?;
    }
    Ok(())
}
