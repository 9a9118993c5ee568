use std::collections::BTreeSet;

use tlgen_schema::*;

use crate::writer::TlWriter;

/// Where a type stands once the schema has been classified for a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// A primitive the writer maps directly, or a dummy type such as `#`.
    BuiltInSimple,
    /// A generic container the writer handles natively, such as `Vector`.
    BuiltInComplex,
    /// An ordinary type with at least one supported constructor.
    Supported,
    /// A type that cannot be given a static representation; never generated.
    Unsupported,
}

/// Side table produced by [`classify`]: the complex set and the number of
/// supported constructors of every type.
///
/// The schema itself is never touched, so one schema can be classified for
/// several writers at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    complex:             BTreeSet<TypeRef>,
    simple_constructors: Vec<usize>,
}

/// The schema together with its classification, as seen by the writer hooks.
#[derive(Clone, Copy)]
pub struct GenContext<'a> {
    pub schema:         &'a Schema,
    pub classification: &'a Classification,
}

impl<'a> GenContext<'a> {
    pub fn new(schema: &'a Schema, classification: &'a Classification) -> GenContext<'a> {
        GenContext { schema, classification }
    }

    pub fn ty(&self, r: TypeRef) -> &'a TlType {
        self.schema.ty(r)
    }

    pub fn is_complex(&self, r: TypeRef) -> bool {
        self.classification.is_complex(r)
    }

    pub fn simple_constructors(&self, r: TypeRef) -> usize {
        self.classification.simple_constructors(r)
    }
}

/// Decide which types `w` can generate.
///
/// Runs the structural pass once and then [`Classification::refine`] until
/// the complex set stops growing.
pub fn classify(schema: &Schema, w: &dyn TlWriter) -> Classification {
    let mut classification = Classification {
        complex:             BTreeSet::new(),
        simple_constructors: schema.types.iter().map(|t| t.constructors.len()).collect(),
    };

    for r in schema.type_refs() {
        if is_structurally_complex(schema, w, r) {
            classification.complex.insert(r);
        }
    }

    while classification.refine(schema, w) {}
    classification
}

fn is_structurally_complex(schema: &Schema, w: &dyn TlWriter, r: TypeRef) -> bool {
    let t = schema.ty(r);
    if t.constructors.is_empty() {
        // dummy types: `#` stays simple, `Type` can never be a field
        return t.name == "Type";
    }
    if w.is_built_in_complex_type(&t.name) {
        return false;
    }

    for c in schema.constructors_of(r) {
        for a in &c.args {
            if let Tree::Array(array) = &a.type_ {
                let dependent = array.args.iter().any(|b| {
                    matches!(b.type_, Tree::VarType { .. } | Tree::Array(_))
                        || b.bound_var.is_some()
                        || b.conditional_on.is_some()
                });
                if dependent {
                    return true;
                }
            }
        }
    }

    // the decoder guarantees every constructor binds a slot the same way
    match schema.constructors_of(r).next().map(|c| &c.result) {
        Some(Tree::Type(result)) => result.children.iter().any(|child| matches!(child, Tree::VarType { .. })),
        _ => false,
    }
}

impl Classification {
    pub fn is_complex(&self, r: TypeRef) -> bool {
        self.complex.contains(&r)
    }

    pub fn complex_types(&self) -> &BTreeSet<TypeRef> {
        &self.complex
    }

    /// Number of constructors of `r` the writer supports.
    pub fn simple_constructors(&self, r: TypeRef) -> usize {
        self.simple_constructors.get(r.0).copied().unwrap_or(0)
    }

    pub fn type_class(&self, schema: &Schema, w: &dyn TlWriter, r: TypeRef) -> TypeClass {
        let t = schema.ty(r);
        if self.is_complex(r) {
            TypeClass::Unsupported
        } else if w.is_built_in_complex_type(&t.name) {
            TypeClass::BuiltInComplex
        } else if t.constructors.is_empty() || w.is_built_in_simple_type(&t.name) {
            TypeClass::BuiltInSimple
        } else {
            TypeClass::Supported
        }
    }

    /// One step of the fixed point: recount supported constructors of every
    /// ordinary type and mark the ones left with none as complex.
    ///
    /// Returns true if the complex set grew.
    pub fn refine(&mut self, schema: &Schema, w: &dyn TlWriter) -> bool {
        let mut changed = false;
        for r in schema.type_refs() {
            let t = schema.ty(r);
            if t.constructors.is_empty() || w.is_built_in_complex_type(&t.name) || self.is_complex(r) {
                continue;
            }

            let supported = {
                let ctx = GenContext::new(schema, self);
                schema.constructors_of(r).filter(|c| w.is_combinator_supported(&ctx, c)).count()
            };
            self.simple_constructors[r.0] = supported;
            if supported == 0 {
                self.complex.insert(r);
                changed = true;
            }
        }
        changed
    }
}
