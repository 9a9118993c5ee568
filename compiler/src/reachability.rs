use std::collections::BTreeSet;

use tlgen_schema::*;

use crate::classifier::GenContext;
use crate::writer::{Kind, Mode, TlWriter};

/// Names of the types and combinators reachable from the RPC functions.
///
/// Types and constructors share one namespace here: TL type names are
/// capitalized, constructor names are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableSets {
    /// Everything a request (a function and its arguments) can contain.
    pub request_types: BTreeSet<String>,
    /// Everything a function result can contain.
    pub result_types:  BTreeSet<String>,
}

pub fn compute_reachable_sets(ctx: &GenContext, w: &dyn TlWriter) -> ReachableSets {
    let mut sets = ReachableSets::default();
    for f in &ctx.schema.functions {
        dfs_combinator(ctx, w, f, &mut sets.request_types);
        dfs_tree(ctx, w, &f.result, &mut sets.result_types);
    }
    sets
}

impl ReachableSets {
    /// A client parses results, a server parses requests.
    pub fn is_reachable_for_parser(&self, w: &dyn TlWriter, kind: Kind, name: &str) -> bool {
        match w.get_parser_mode(kind) {
            Mode::Client => self.result_types.contains(name),
            Mode::Server => self.request_types.contains(name),
            Mode::All => true,
        }
    }

    /// A client stores requests, a server stores results.
    pub fn is_reachable_for_storer(&self, w: &dyn TlWriter, kind: Kind, name: &str) -> bool {
        match w.get_storer_mode(kind) {
            Mode::Client => self.request_types.contains(name),
            Mode::Server => self.result_types.contains(name),
            Mode::All => true,
        }
    }
}

fn dfs_combinator(ctx: &GenContext, w: &dyn TlWriter, c: &Combinator, found: &mut BTreeSet<String>) {
    if !w.is_combinator_supported(ctx, c) {
        return;
    }
    if !found.insert(c.name.clone()) {
        return;
    }
    for a in &c.args {
        dfs_tree(ctx, w, &a.type_, found);
    }
}

fn dfs_tree(ctx: &GenContext, w: &dyn TlWriter, tree: &Tree, found: &mut BTreeSet<String>) {
    match tree {
        Tree::Array(array) => {
            for a in &array.args {
                dfs_tree(ctx, w, &a.type_, found);
            }
        }
        Tree::Type(t) => {
            dfs_type(ctx, w, t.type_, found);
            for child in &t.children {
                dfs_tree(ctx, w, child, found);
            }
        }
        // generics are not resolved any further
        Tree::VarType { .. } | Tree::NatConst { .. } | Tree::VarNum { .. } => {}
    }
}

fn dfs_type(ctx: &GenContext, w: &dyn TlWriter, r: TypeRef, found: &mut BTreeSet<String>) {
    let t = ctx.ty(r);
    if !found.insert(t.name.clone()) {
        return;
    }
    if t.constructors.is_empty()
        || ctx.is_complex(r)
        || w.is_built_in_simple_type(&t.name)
        || w.is_built_in_complex_type(&t.name)
    {
        return;
    }
    for c in ctx.schema.constructors_of(r) {
        dfs_combinator(ctx, w, c, found);
    }
}
