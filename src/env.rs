use crate::expr::{BinderStyle, Expr};
use crate::util::{ExprPtr, FxIndexMap, LevelsPtr, NamePtr, TermCtx};
use std::sync::Arc;

pub type DeclarMap = FxIndexMap<NamePtr, Declar>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReducibilityHint {
    Opaque,
    Abbrev,
    Regular(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarInfo {
    pub name: NamePtr,
    pub uparams: LevelsPtr,
    pub ty: ExprPtr,
}

/// The declarations normalization consults. Only `Abbrev` definitions are ever unfolded;
/// constructors are used to reduce projections, and every declaration's type is used
/// to find its instance-implicit arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declar {
    Axiom { info: DeclarInfo },
    Definition { info: DeclarInfo, val: ExprPtr, hint: ReducibilityHint },
    Constructor { info: DeclarInfo, induct_name: NamePtr, num_params: u16, num_fields: u16 },
}

impl Declar {
    pub fn info(&self) -> &DeclarInfo {
        match self {
            Declar::Axiom { info, .. }
            | Declar::Definition { info, .. }
            | Declar::Constructor { info, .. } => info,
        }
    }

    pub fn name(&self) -> NamePtr { self.info().name }
}

impl TermCtx {
    /// Register `d`. Entries that already took their snapshot don't see it.
    pub fn add_declar(&mut self, d: Declar) {
        log::trace!("adding declaration {:?}", self.debug_print(d.name()));
        Arc::make_mut(&mut self.env.declars).insert(d.name(), d);
        self.next_generation();
    }

    pub fn get_declar(&self, n: NamePtr) -> Option<&Declar> { self.env.declars.get(&n) }

    pub fn add_axiom(&mut self, name: NamePtr, uparams: LevelsPtr, ty: ExprPtr) {
        self.add_declar(Declar::Axiom { info: DeclarInfo { name, uparams, ty } })
    }

    pub fn add_definition(
        &mut self,
        name: NamePtr,
        uparams: LevelsPtr,
        ty: ExprPtr,
        val: ExprPtr,
        hint: ReducibilityHint,
    ) {
        self.add_declar(Declar::Definition { info: DeclarInfo { name, uparams, ty }, val, hint })
    }

    pub fn add_constructor(
        &mut self,
        name: NamePtr,
        uparams: LevelsPtr,
        ty: ExprPtr,
        induct_name: NamePtr,
        num_params: u16,
        num_fields: u16,
    ) {
        self.add_declar(Declar::Constructor { info: DeclarInfo { name, uparams, ty }, induct_name, num_params, num_fields })
    }

    /// The binder styles of the leading `Pi` binders of a declaration's type, i.e. the
    /// style each of its arguments is expected to have. Unknown constants have none.
    pub fn arg_styles(&self, n: NamePtr) -> Vec<BinderStyle> {
        let mut out = Vec::new();
        if let Some(d) = self.get_declar(n) {
            let mut cursor = d.info().ty;
            while let Expr::Pi { binder_style, body, .. } = self.read_expr(cursor) {
                out.push(binder_style);
                cursor = body;
            }
        }
        out
    }

    /// Returns the constructor's inductive type name and its number of parameters and
    /// fields, if `n` names a constructor.
    pub(crate) fn ctor_info(&self, n: NamePtr) -> Option<(NamePtr, u16, u16)> {
        match self.get_declar(n) {
            Some(Declar::Constructor { induct_name, num_params, num_fields, .. }) =>
                Some((*induct_name, *num_params, *num_fields)),
            _ => None,
        }
    }
}
