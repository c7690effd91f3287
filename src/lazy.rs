use crate::errors::DiscrResult;
use crate::expr::{BinderStyle, Expr, FVarId, MVarId};
use crate::key::Key;
use crate::reduce::HeadShape;
use crate::util::{new_fx_hash_map, EnvSnapshot, ExprPtr, FxHashMap, NamePtr, TermCtx};
use log::trace;
use std::sync::Arc;

/// One unit of encoding work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprInfo {
    pub expr: ExprPtr,
    /// The free variables that stand in for binders of the indexed term enclosing `expr`,
    /// innermost first. A reference to `bvars[i]` is encoded as `Key::BVar(i, _)`.
    pub bvars: Vec<FVarId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// Emit a fresh star without looking at the term in this position.
    Star,
    Expr(ExprInfo),
    /// Replay `keys[pos..]`, a previously recorded encoding of `expr`.
    Cache { expr: ExprPtr, keys: Arc<[Key]>, pos: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advance(Key),
    Done,
}

/// A subterm whose key was emitted but whose children aren't finished yet.
#[derive(Debug, Clone, Copy)]
struct OpenSubterm {
    cache_key: (ExprPtr, usize),
    start: usize,
    depth: usize,
    /// `fresh_stars` when the subterm was opened.
    fresh_stars: u32,
}

/// The resumable encoding of one expression into its preorder key sequence. Each call to
/// [`LazyEntry::step`] produces exactly one key; subterms are only normalized when the
/// step that needs their key runs.
///
/// The first step takes a snapshot of the context's declarations and metavariable
/// assignments, and every later step normalizes against it. Assigning a metavariable or
/// adding a declaration afterwards doesn't change the entry's keys.
#[derive(Debug, Clone)]
pub struct LazyEntry {
    env: Option<EnvSnapshot>,
    /// The normalized term whose key was emitted by the last step. Its children are pushed
    /// at the start of the next step.
    previous: Option<ExprInfo>,
    stack: Vec<StackEntry>,
    results: Vec<Key>,
    mvar_stars: FxHashMap<MVarId, u32>,
    next_star: u32,
    /// Stars emitted for ignored positions so far. Subterms containing one aren't cached,
    /// so that each occurrence gets its own ids.
    fresh_stars: u32,
    /// Completed encodings, keyed by the subterm and the number of binders it's under.
    cache: FxHashMap<(ExprPtr, usize), Arc<[Key]>>,
    open: Vec<OpenSubterm>,
}

impl LazyEntry {
    pub fn new(e: ExprPtr) -> Self {
        Self {
            env: None,
            previous: None,
            stack: vec![StackEntry::Expr(ExprInfo { expr: e, bvars: Vec::new() })],
            results: Vec::new(),
            mvar_stars: new_fx_hash_map(),
            next_star: 0u32,
            fresh_stars: 0u32,
            cache: new_fx_hash_map(),
            open: Vec::new(),
        }
    }

    /// The keys emitted so far, in order. Once the entry is done this is the complete
    /// encoding.
    pub fn results(&self) -> &[Key] { self.results.as_slice() }

    pub fn is_done(&self) -> bool { self.previous.is_none() && self.stack.is_empty() }

    /// Step the entry until it's done, returning the complete key sequence.
    pub fn encode_all(mut self, ctx: &mut TermCtx) -> DiscrResult<Vec<Key>> {
        while let Step::Advance(_) = self.step(ctx)? {}
        Ok(self.results)
    }

    /// Produce the next key. If normalization fails, the error is returned and the entry is
    /// left so that stepping it again retries the same subterm.
    pub fn step(&mut self, ctx: &mut TermCtx) -> DiscrResult<Step> {
        let env = self.env.get_or_insert_with(|| ctx.snapshot()).clone();
        ctx.with_snapshot(&env, |ctx| self.step_aux(ctx))
    }

    fn step_aux(&mut self, ctx: &mut TermCtx) -> DiscrResult<Step> {
        if let Some(info) = self.previous.take() {
            self.push_children(ctx, info);
        }
        self.close_finished();
        loop {
            let Some(entry) = self.stack.pop() else { return Ok(Step::Done) };
            match entry {
                StackEntry::Star => {
                    self.fresh_stars += 1;
                    let id = self.fresh_star();
                    return Ok(self.emit(Key::Star(id)))
                }
                StackEntry::Cache { expr, keys, pos } => {
                    let key = keys[pos];
                    if pos + 1 < keys.len() {
                        self.stack.push(StackEntry::Cache { expr, keys, pos: pos + 1 });
                    }
                    return Ok(self.emit(key))
                }
                StackEntry::Expr(info) => {
                    if let Some(keys) = self.cache.get(&(info.expr, info.bvars.len())).cloned() {
                        trace!("replaying {} cached keys for {:?}", keys.len(), ctx.debug_print(info.expr));
                        self.stack.push(StackEntry::Cache { expr: info.expr, keys, pos: 0 });
                        continue
                    }
                    let (key, expand) = match self.classify(ctx, &info) {
                        Ok(classified) => classified,
                        Err(e) => {
                            self.stack.push(StackEntry::Expr(info));
                            return Err(e)
                        }
                    };
                    if key.arity() > 0 {
                        self.open.push(OpenSubterm {
                            cache_key: (info.expr, info.bvars.len()),
                            start: self.results.len(),
                            depth: self.stack.len(),
                            fresh_stars: self.fresh_stars,
                        });
                    }
                    self.previous = expand;
                    return Ok(self.emit(key))
                }
            }
        }
    }

    fn emit(&mut self, key: Key) -> Step {
        self.results.push(key);
        Step::Advance(key)
    }

    fn fresh_star(&mut self) -> u32 {
        let id = self.next_star;
        self.next_star += 1;
        id
    }

    /// The same metavariable gets the same star id everywhere in this entry.
    fn mvar_star(&mut self, id: MVarId) -> u32 {
        let next_star = &mut self.next_star;
        *self.mvar_stars.entry(id).or_insert_with(|| {
            let out = *next_star;
            *next_star += 1;
            out
        })
    }

    /// Normalize the subterm and pick its key. Returns the normalized term as well if its
    /// children still have to be encoded.
    fn classify(&mut self, ctx: &mut TermCtx, info: &ExprInfo) -> DiscrResult<(Key, Option<ExprInfo>)> {
        let e = ctx.normalize_head(info.expr)?;
        let key = match ctx.head_shape(e) {
            HeadShape::Const { name, args } => Key::Const(name, args.len() as u32),
            HeadShape::Local { id, args } => match info.bvars.iter().position(|b| *b == id) {
                Some(idx) => Key::BVar(idx as u16, args.len() as u32),
                None => Key::FVar(id, args.len() as u32),
            },
            HeadShape::MVar { id, .. } => Key::Star(self.mvar_star(id)),
            HeadShape::Lit(l) => Key::Lit(l),
            HeadShape::Sort => Key::Sort,
            HeadShape::Lambda { .. } => Key::Lam,
            HeadShape::Pi { .. } => Key::Forall,
            HeadShape::Proj { ty_name, idx, args, .. } => Key::Proj(ty_name, idx, args.len() as u32),
            HeadShape::Other => Key::Opaque,
        };
        let expand = (key.arity() > 0).then(|| ExprInfo { expr: e, bvars: info.bvars.clone() });
        Ok((key, expand))
    }

    /// Push the children of a term whose key has been emitted, leftmost child on top.
    fn push_children(&mut self, ctx: &mut TermCtx, info: ExprInfo) {
        match ctx.head_shape(info.expr) {
            HeadShape::Const { name, args } => self.push_const_args(ctx, name, args, &info.bvars),
            HeadShape::Local { args, .. } => self.push_args(args, &info.bvars),
            HeadShape::Proj { structure, args, .. } => {
                self.push_args(args, &info.bvars);
                self.stack.push(StackEntry::Expr(ExprInfo { expr: structure, bvars: info.bvars }));
            }
            HeadShape::Lambda { binder_name, binder_style, binder_type, body } => {
                let body = open_binder(ctx, binder_name, binder_style, binder_type, body, &info.bvars);
                self.stack.push(StackEntry::Expr(body));
            }
            HeadShape::Pi { binder_name, binder_style, binder_type, body } => {
                let body = open_binder(ctx, binder_name, binder_style, binder_type, body, &info.bvars);
                self.stack.push(StackEntry::Expr(body));
                self.stack.push(StackEntry::Expr(ExprInfo { expr: binder_type, bvars: info.bvars }));
            }
            HeadShape::MVar { .. } | HeadShape::Lit(_) | HeadShape::Sort | HeadShape::Other => {
                debug_assert!(false, "leaf terms are never carried over to the next step")
            }
        }
    }

    fn push_args(&mut self, args: Vec<ExprPtr>, bvars: &[FVarId]) {
        for arg in args.into_iter().rev() {
            self.stack.push(StackEntry::Expr(ExprInfo { expr: arg, bvars: bvars.to_vec() }));
        }
    }

    /// Like `push_args`, but instance-implicit arguments become fresh stars when
    /// instances are ignored.
    fn push_const_args(&mut self, ctx: &TermCtx, name: NamePtr, args: Vec<ExprPtr>, bvars: &[FVarId]) {
        if !ctx.config.ignore_instances {
            return self.push_args(args, bvars)
        }
        let styles = ctx.arg_styles(name);
        for (i, arg) in args.into_iter().enumerate().rev() {
            if styles.get(i) == Some(&BinderStyle::InstImplicit) {
                self.stack.push(StackEntry::Star);
            } else {
                self.stack.push(StackEntry::Expr(ExprInfo { expr: arg, bvars: bvars.to_vec() }));
            }
        }
    }

    /// Close every open subterm whose children have all been emitted, recording its
    /// encoding for later occurrences of the same subterm unless it holds an ignored
    /// position.
    fn close_finished(&mut self) {
        while self.open.last().map_or(false, |o| self.stack.len() <= o.depth) {
            if let Some(done) = self.open.pop().filter(|o| o.fresh_stars == self.fresh_stars) {
                self.cache.entry(done.cache_key).or_insert_with(|| Arc::from(&self.results[done.start..]));
            }
        }
    }
}

/// Instantiate a binder body with a fresh free variable, which becomes the innermost
/// bound variable for the body's encoding.
fn open_binder(
    ctx: &mut TermCtx,
    binder_name: NamePtr,
    binder_style: BinderStyle,
    binder_type: ExprPtr,
    body: ExprPtr,
    outer: &[FVarId],
) -> ExprInfo {
    let local = ctx.mk_unique(binder_name, binder_style, binder_type);
    let Expr::Local { id, .. } = ctx.read_expr(local) else { unreachable!("mk_unique always makes a Local") };
    let mut bvars = Vec::with_capacity(outer.len() + 1);
    bvars.push(id);
    bvars.extend_from_slice(outer);
    ExprInfo { expr: ctx.inst(body, &[local]), bvars }
}
