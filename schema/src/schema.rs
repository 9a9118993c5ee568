use serde::Serialize;
use std::collections::HashMap;

use crate::FLAG_NOVAR;

/// Index of a type inside [`Schema::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeRef(pub usize);

/// A declared TL type: a tagged union over its constructors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlType {
    pub id:               i32,
    pub name:             String,
    pub arity:            usize,
    pub flags:            i32,
    /// Number of constructors announced by the type header.
    pub constructors_num: usize,
    /// Indexes into [`Schema::constructors`], in declaration order.
    pub constructors:     Vec<usize>,
}

impl TlType {
    pub fn new(id: i32, name: &str, arity: usize, constructors_num: usize) -> TlType {
        TlType {
            id,
            name: name.to_owned(),
            arity,
            flags: 0,
            constructors_num,
            constructors: Vec::new(),
        }
    }
}

/// A bit of a previously bound variable that gates an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub var_num: usize,
    pub bit:     u32,
}

/// One parameter of a constructor, a function or an array element group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name:           String,
    pub flags:          i32,
    /// Variable that receives this argument's value.
    pub bound_var:      Option<usize>,
    /// The field only exists when the condition bit is set.
    pub conditional_on: Option<Condition>,
    #[serde(rename = "type")]
    pub type_:          Tree,
}

impl Arg {
    pub fn is_novar(&self) -> bool {
        self.flags & FLAG_NOVAR != 0
    }
}

/// Application of a type to its parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeType {
    #[serde(rename = "type")]
    pub type_:    TypeRef,
    pub flags:    i32,
    pub children: Vec<Tree>,
}

/// A repeated group of fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeArray {
    pub flags:        i32,
    pub multiplicity: Box<Tree>,
    pub args:         Vec<Arg>,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum Tree {
    Type(TreeType),
    NatConst { value: i32 },
    VarType { flags: i32, var_num: usize },
    VarNum { var_num: usize, offset: i32 },
    Array(TreeArray),
}

impl Tree {
    pub fn flags(&self) -> i32 {
        match self {
            Tree::Type(t) => t.flags,
            Tree::NatConst { .. } => FLAG_NOVAR,
            Tree::VarType { flags, .. } => *flags,
            Tree::VarNum { .. } => 0,
            Tree::Array(a) => a.flags,
        }
    }

    /// True when nothing below this node depends on a free variable.
    pub fn is_novar(&self) -> bool {
        self.flags() & FLAG_NOVAR != 0
    }

    pub fn as_type(&self) -> Option<&TreeType> {
        match self {
            Tree::Type(t) => Some(t),
            _ => None,
        }
    }
}

/// A constructor of a type or an RPC function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combinator {
    pub id:        i32,
    pub name:      String,
    /// Owning type for constructors; the declared result type id for functions.
    pub type_id:   i32,
    pub var_count: usize,
    pub args:      Vec<Arg>,
    pub result:    Tree,
}

/// A whole decoded TL schema.
///
/// Built once, read-only afterwards. Lookups with unknown keys panic: callers
/// only ask for ids and names they found inside the schema itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version:      i32,
    pub types:        Vec<TlType>,
    pub constructors: Vec<Combinator>,
    pub functions:    Vec<Combinator>,

    #[serde(skip)]
    id_to_type:       HashMap<i32, usize>,
    #[serde(skip)]
    name_to_type:     HashMap<String, usize>,
    #[serde(skip)]
    id_to_function:   HashMap<i32, usize>,
    #[serde(skip)]
    name_to_function: HashMap<String, usize>,
}

impl Schema {
    pub fn new(version: i32) -> Schema {
        Schema {
            version,
            types: Vec::new(),
            constructors: Vec::new(),
            functions: Vec::new(),
            id_to_type: HashMap::new(),
            name_to_type: HashMap::new(),
            id_to_function: HashMap::new(),
            name_to_function: HashMap::new(),
        }
    }

    pub fn add_type(&mut self, t: TlType) -> TypeRef {
        let index = self.types.len();
        self.id_to_type.insert(t.id, index);
        self.name_to_type.insert(t.name.clone(), index);
        self.types.push(t);
        TypeRef(index)
    }

    /// Appends a constructor and links it to the type named by `type_id`.
    ///
    /// Returns `None` (leaving the schema untouched) when the owning type is
    /// unknown or already has all of its declared constructors.
    pub fn add_constructor(&mut self, c: Combinator) -> Option<usize> {
        let owner = *self.id_to_type.get(&c.type_id)?;
        let t = &mut self.types[owner];
        if t.constructors.len() >= t.constructors_num {
            return None;
        }
        let index = self.constructors.len();
        t.constructors.push(index);
        self.constructors.push(c);
        Some(index)
    }

    pub fn add_function(&mut self, f: Combinator) -> usize {
        let index = self.functions.len();
        self.id_to_function.insert(f.id, index);
        self.name_to_function.insert(f.name.clone(), index);
        self.functions.push(f);
        index
    }

    pub fn ty(&self, r: TypeRef) -> &TlType {
        &self.types[r.0]
    }

    pub fn find_type_by_id(&self, id: i32) -> Option<TypeRef> {
        self.id_to_type.get(&id).map(|&i| TypeRef(i))
    }

    pub fn find_type_by_name(&self, name: &str) -> Option<TypeRef> {
        self.name_to_type.get(name).map(|&i| TypeRef(i))
    }

    pub fn type_by_id(&self, id: i32) -> TypeRef {
        self.find_type_by_id(id)
            .unwrap_or_else(|| panic!("unknown type id {:#010x}", id))
    }

    pub fn type_by_name(&self, name: &str) -> TypeRef {
        self.find_type_by_name(name)
            .unwrap_or_else(|| panic!("unknown type {}", name))
    }

    pub fn find_function_by_id(&self, id: i32) -> Option<&Combinator> {
        self.id_to_function.get(&id).map(|&i| &self.functions[i])
    }

    pub fn find_function_by_name(&self, name: &str) -> Option<&Combinator> {
        self.name_to_function.get(name).map(|&i| &self.functions[i])
    }

    pub fn function_by_id(&self, id: i32) -> &Combinator {
        self.find_function_by_id(id)
            .unwrap_or_else(|| panic!("unknown function id {:#010x}", id))
    }

    pub fn function_by_name(&self, name: &str) -> &Combinator {
        self.find_function_by_name(name)
            .unwrap_or_else(|| panic!("unknown function {}", name))
    }

    /// The constructors of `t`, in declaration order.
    pub fn constructors_of(&self, t: TypeRef) -> impl Iterator<Item = &Combinator> + '_ {
        self.types[t.0].constructors.iter().map(move |&i| &self.constructors[i])
    }

    /// All type refs in declaration order.
    pub fn type_refs(&self) -> impl Iterator<Item = TypeRef> {
        (0..self.types.len()).map(TypeRef)
    }

    pub fn total_constructors(&self) -> usize {
        self.types.iter().map(|t| t.constructors.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(t: TypeRef) -> Tree {
        Tree::Type(TreeType { type_: t, flags: FLAG_NOVAR, children: vec![] })
    }

    fn sample() -> Schema {
        let mut schema = Schema::new(4);
        let int32 = schema.add_type(TlType::new(1, "Int32", 0, 1));
        let user = schema.add_type(TlType::new(2, "User", 0, 1));
        schema.add_constructor(Combinator {
            id: 10, name: "int32".into(), type_id: 1, var_count: 0, args: vec![], result: leaf(int32),
        }).unwrap();
        schema.add_constructor(Combinator {
            id: 11, name: "user".into(), type_id: 2, var_count: 0,
            args: vec![Arg { name: "id".into(), flags: FLAG_NOVAR, bound_var: None, conditional_on: None, type_: leaf(int32) }],
            result: leaf(user),
        }).unwrap();
        schema.add_function(Combinator {
            id: 20, name: "getUser".into(), type_id: 2, var_count: 0, args: vec![], result: leaf(user),
        });
        schema
    }

    #[test]
    fn test_lookups() {
        let schema = sample();
        assert_eq!(schema.type_by_name("User"), TypeRef(1));
        assert_eq!(schema.type_by_id(1), TypeRef(0));
        assert_eq!(schema.function_by_name("getUser").id, 20);
        assert_eq!(schema.function_by_id(20).name, "getUser");
        assert!(schema.find_type_by_name("Chat").is_none());
        assert!(schema.find_function_by_id(21).is_none());
        assert_eq!(schema.total_constructors(), 2);
        assert_eq!(schema.constructors_of(TypeRef(1)).map(|c| c.name.as_str()).collect::<Vec<_>>(), ["user"]);
    }

    #[test]
    #[should_panic(expected = "unknown type Chat")]
    fn test_unknown_type_panics() {
        sample().type_by_name("Chat");
    }

    #[test]
    #[should_panic(expected = "unknown function id")]
    fn test_unknown_function_panics() {
        sample().function_by_id(99);
    }

    #[test]
    fn test_constructor_limit() {
        let mut schema = sample();
        let extra = Combinator {
            id: 12, name: "userEmpty".into(), type_id: 2, var_count: 0, args: vec![], result: leaf(TypeRef(1)),
        };
        assert_eq!(schema.add_constructor(extra.clone()), None);
        assert_eq!(schema.add_constructor(Combinator { type_id: 77, ..extra }), None);
        assert_eq!(schema.total_constructors(), 2);
    }

    #[test]
    fn test_tree_flags() {
        assert!(Tree::NatConst { value: 3 }.is_novar());
        assert!(!Tree::VarNum { var_num: 0, offset: 0 }.is_novar());
        assert!(!Tree::VarType { flags: 0, var_num: 0 }.is_novar());
        assert!(leaf(TypeRef(0)).is_novar());
    }
}
