#![allow(dead_code)]

use tlgen_compiler::*;
use tlgen_schema::*;

/// Builds schemas the way the decoder would produce them.
pub struct SchemaBuilder {
    schema:  Schema,
    next_id: i32,
}

impl SchemaBuilder {
    /// A schema holding `#`, `Type` and the usual built-in types.
    pub fn new() -> SchemaBuilder {
        let mut b = SchemaBuilder { schema: Schema::new(4), next_id: 0x1000 };
        b.schema.add_type(TlType::new(ID_VAR_NUM, "#", 0, 0));
        b.schema.add_type(TlType::new(ID_VAR_TYPE, "Type", 0, 0));
        for name in ["Bool", "Int32", "Int64", "Double", "String", "Bytes"] {
            b.built_in(name, 0);
        }
        b.built_in("Vector", 1);
        b
    }

    fn fresh_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn built_in(&mut self, name: &str, arity: usize) -> TypeRef {
        let id = self.fresh_id();
        self.schema.add_type(TlType::new(id, name, arity, 0))
    }

    pub fn ty(&mut self, name: &str, constructors_num: usize) -> TypeRef {
        self.generic_ty(name, 0, constructors_num)
    }

    pub fn generic_ty(&mut self, name: &str, arity: usize, constructors_num: usize) -> TypeRef {
        let id = self.fresh_id();
        self.schema.add_type(TlType::new(id, name, arity, constructors_num))
    }

    /// Declares `vector {t:Type} # [t] = Vector t`, which the built-in
    /// `Vector` otherwise lacks.
    pub fn vector_constructor(&mut self) {
        let vector = self.type_ref("Vector");
        self.schema.types[vector.0].constructors_num += 1;
        let items = Tree::Array(TreeArray {
            flags:        0,
            multiplicity: Box::new(Tree::VarNum { var_num: 1, offset: 0 }),
            args:         vec![arg("x", Tree::VarType { flags: 0, var_num: 0 })],
        });
        let args = vec![self.type_param("t", 0), bound_arg("n", self.leaf("#"), 1), arg("items", items)];
        self.generic_constructor("vector", "Vector", args, vec![Tree::VarType { flags: 0, var_num: 0 }]);
    }

    pub fn type_ref(&self, name: &str) -> TypeRef {
        self.schema.type_by_name(name)
    }

    pub fn leaf(&self, name: &str) -> Tree {
        Tree::Type(TreeType { type_: self.type_ref(name), flags: FLAG_NOVAR, children: vec![] })
    }

    pub fn bare(&self, name: &str) -> Tree {
        Tree::Type(TreeType { type_: self.type_ref(name), flags: FLAG_NOVAR | FLAG_BARE, children: vec![] })
    }

    pub fn vector(&self, element: Tree) -> Tree {
        let flags = if element.is_novar() { FLAG_NOVAR } else { 0 };
        Tree::Type(TreeType { type_: self.type_ref("Vector"), flags, children: vec![element] })
    }

    /// `{name:Type}`, the implicit type parameter of a generic function.
    pub fn type_param(&self, name: &str, var_num: usize) -> Arg {
        Arg {
            name:           name.to_owned(),
            flags:          FLAG_OPT_VAR,
            bound_var:      Some(var_num),
            conditional_on: None,
            type_:          self.leaf("Type"),
        }
    }

    pub fn constructor(&mut self, name: &str, type_name: &str, args: Vec<Arg>) -> i32 {
        self.generic_constructor(name, type_name, args, vec![])
    }

    /// A constructor of `type_name` applied to `params`.
    pub fn generic_constructor(&mut self, name: &str, type_name: &str, args: Vec<Arg>, params: Vec<Tree>) -> i32 {
        let id = self.fresh_id();
        let owner = self.type_ref(type_name);
        let flags = if params.iter().all(Tree::is_novar) { FLAG_NOVAR } else { 0 };
        let result = Tree::Type(TreeType { type_: owner, flags, children: params });
        let c = Combinator {
            id,
            name: name.to_owned(),
            type_id: self.schema.ty(owner).id,
            var_count: var_count(&args, &result),
            args,
            result,
        };
        self.schema
            .add_constructor(c)
            .unwrap_or_else(|| panic!("type {} is full", type_name));
        id
    }

    pub fn function(&mut self, name: &str, args: Vec<Arg>, result: Tree) -> i32 {
        let id = self.fresh_id();
        let type_id = match &result {
            Tree::Type(t) => self.schema.ty(t.type_).id,
            _ => 0,
        };
        let f = Combinator {
            id,
            name: name.to_owned(),
            type_id,
            var_count: var_count(&args, &result),
            args,
            result,
        };
        self.schema.add_function(f);
        id
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

pub fn arg(name: &str, type_: Tree) -> Arg {
    let flags = if type_.is_novar() { FLAG_NOVAR } else { 0 };
    Arg { name: name.to_owned(), flags, bound_var: None, conditional_on: None, type_ }
}

pub fn bound_arg(name: &str, type_: Tree, var_num: usize) -> Arg {
    Arg { flags: 0, bound_var: Some(var_num), ..arg(name, type_) }
}

pub fn cond_arg(name: &str, type_: Tree, var_num: usize, bit: u32) -> Arg {
    Arg { flags: 0, conditional_on: Some(Condition { var_num, bit }), ..arg(name, type_) }
}

/// `name:!X`, where `X` is variable `var_num`.
pub fn query_arg(name: &str, var_num: usize) -> Arg {
    Arg {
        name:           name.to_owned(),
        flags:          FLAG_EXCL,
        bound_var:      None,
        conditional_on: None,
        type_:          Tree::VarType { flags: 0, var_num },
    }
}

fn var_count(args: &[Arg], result: &Tree) -> usize {
    fn tree_vars(tree: &Tree, max: &mut usize) {
        match tree {
            Tree::Type(t) => t.children.iter().for_each(|child| tree_vars(child, max)),
            Tree::VarType { var_num, .. } | Tree::VarNum { var_num, .. } => *max = (*max).max(var_num + 1),
            Tree::Array(a) => {
                tree_vars(&a.multiplicity, max);
                a.args.iter().for_each(|b| arg_vars(b, max));
            }
            Tree::NatConst { .. } => {}
        }
    }
    fn arg_vars(a: &Arg, max: &mut usize) {
        if let Some(var_num) = a.bound_var {
            *max = (*max).max(var_num + 1);
        }
        if let Some(cond) = a.conditional_on {
            *max = (*max).max(cond.var_num + 1);
        }
        tree_vars(&a.type_, max);
    }

    let mut max = 0;
    args.iter().for_each(|a| arg_vars(a, &mut max));
    tree_vars(result, &mut max);
    max
}

/// A writer that prints one line per driver step, so tests can follow what
/// the generator decided without reading target-language code.
#[derive(Default)]
pub struct OutlineWriter {
    pub parser_mode:          Mode,
    pub storer_mode:          Mode,
    pub additional_functions: Vec<String>,
}

impl TlWriter for OutlineWriter {
    fn is_built_in_simple_type(&self, name: &str) -> bool {
        ["Bool", "Int32", "Int64", "Double", "String", "Bytes"].contains(&name)
    }

    fn is_built_in_complex_type(&self, name: &str) -> bool {
        name == "Vector"
    }

    fn is_default_constructor_generated(&self, _c: &Combinator, _can_be_parsed: bool, _can_be_stored: bool) -> bool {
        false
    }

    fn get_parsers(&self) -> Vec<String> {
        vec!["parse".to_owned()]
    }

    fn get_storers(&self) -> Vec<String> {
        vec!["store".to_owned()]
    }

    fn get_parser_mode(&self, _kind: Kind) -> Mode {
        self.parser_mode
    }

    fn get_storer_mode(&self, _kind: Kind) -> Mode {
        self.storer_mode
    }

    fn get_additional_functions(&self) -> Vec<String> {
        self.additional_functions.clone()
    }

    fn get_additional_function_type(&self, _function_name: &str) -> u32 {
        2
    }

    fn get_package_suffixes(&self) -> Vec<String> {
        vec![".h".to_owned(), ".cpp".to_owned()]
    }

    fn gen_class_name(&self, name: &str) -> String {
        name.to_owned()
    }

    fn gen_field_name(&self, name: &str) -> String {
        name.to_owned()
    }

    fn gen_type_name(&self, ctx: &GenContext, tree: &TreeType) -> String {
        ctx.ty(tree.type_).name.clone()
    }

    fn gen_output_begin(&self, additional_imports: &str) -> String {
        format!("begin\n{}", additional_imports)
    }

    fn gen_output_end(&self) -> String {
        "end\n".to_owned()
    }

    fn gen_import_declaration(&self, name: &str, _is_system: bool) -> String {
        format!("import {}\n", name)
    }

    fn gen_forward_class_declaration(&self, class_name: &str, is_proxy: bool) -> String {
        format!("forward {}{}\n", class_name, if is_proxy { " (proxy)" } else { "" })
    }

    fn gen_class_begin(&self, class_name: &str, base_class_name: &str, is_proxy: bool) -> String {
        format!("class {}: {}{}\n", class_name, base_class_name, if is_proxy { " (proxy)" } else { "" })
    }

    fn gen_class_end(&self) -> String {
        "end class\n".to_owned()
    }

    fn gen_class_alias(&self, class_name: &str, alias_name: &str) -> String {
        format!("alias {} = {}\n", alias_name, class_name)
    }

    fn gen_field_type(&self, ctx: &GenContext, arg: &Arg) -> String {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return String::new();
        }
        match &arg.type_ {
            Tree::Type(t) => self.gen_type_name(ctx, t),
            Tree::VarType { .. } => "Function".to_owned(),
            Tree::Array(_) => "array".to_owned(),
            Tree::NatConst { .. } | Tree::VarNum { .. } => "#".to_owned(),
        }
    }

    fn gen_field_definition(&self, _class_name: &str, type_name: &str, field_name: &str) -> String {
        format!("  field {}: {}\n", field_name, type_name)
    }

    fn gen_field_fetch(
        &self,
        _ctx: &GenContext,
        _field_num: usize,
        arg: &Arg,
        _vars: &VarTable,
        _flat: bool,
        _kind: Kind,
    ) -> String {
        field_step("fetch", arg)
    }

    fn gen_field_store(&self, _ctx: &GenContext, arg: &Arg, _vars: &VarTable, _flat: bool, _kind: Kind) -> String {
        field_step("store", arg)
    }

    fn gen_type_fetch(
        &self,
        ctx: &GenContext,
        _field_name: &str,
        tree: &TreeType,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        format!("    fetch result {}\n", ctx.ty(tree.type_).name)
    }

    fn gen_var_type_fetch(&self, arg: &Arg) -> String {
        format!("    fetch result of {}\n", arg.name)
    }

    fn gen_get_id(&self, _class_name: &str, id: i32, is_proxy: bool) -> String {
        if is_proxy {
            return String::new();
        }
        format!("  id {:#x}\n", id)
    }

    fn gen_constructor_begin(&self, _field_count: usize, _class_name: &str, _is_default: bool) -> String {
        "  new(".to_owned()
    }

    fn gen_constructor_parameter(
        &self,
        ctx: &GenContext,
        field_num: usize,
        _class_name: &str,
        arg: &Arg,
        _is_default: bool,
    ) -> String {
        if self.gen_field_type(ctx, arg).is_empty() {
            return String::new();
        }
        format!("{}{}", if field_num == 0 { "" } else { ", " }, arg.name)
    }

    fn gen_constructor_end(&self, _c: &Combinator, _field_count: usize, _is_default: bool) -> String {
        ")\n".to_owned()
    }

    fn gen_fetch_function_begin(
        &self,
        parser_name: &str,
        class_name: &str,
        _parent_class_name: &str,
        _arity: usize,
        field_count: Option<usize>,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        let dispatch = if field_count.is_none() { " (dispatch)" } else { "" };
        format!("  {} {}{}\n", parser_name, class_name, dispatch)
    }

    fn gen_fetch_function_result_begin(
        &self,
        _ctx: &GenContext,
        parser_name: &str,
        class_name: &str,
        _result: &Tree,
    ) -> String {
        format!("  {} result of {}\n", parser_name, class_name)
    }

    fn gen_store_function_begin(
        &self,
        storer_name: &str,
        class_name: &str,
        _arity: usize,
        _vars: &VarTable,
        kind: Kind,
    ) -> String {
        let dispatch = if kind.is_none() { " (dispatch)" } else { "" };
        format!("  {} {}{}\n", storer_name, class_name, dispatch)
    }

    fn gen_fetch_switch_case(&self, c: &Combinator, _arity: usize) -> String {
        format!("    case {}\n", c.name)
    }

    fn gen_additional_function(
        &self,
        _ctx: &GenContext,
        function_name: &str,
        c: &Combinator,
        _is_function: bool,
    ) -> String {
        format!("  {} {}\n", function_name, c.name)
    }

    fn gen_additional_proxy_function_begin(
        &self,
        function_name: &str,
        _type_: Option<&TlType>,
        class_name: &str,
        _arity: usize,
        _is_function: bool,
    ) -> String {
        format!("  {} of {}\n", function_name, class_name)
    }

    fn gen_additional_proxy_function_case(
        &self,
        _function_name: &str,
        _type_: Option<&TlType>,
        case: ProxyCase,
        _arity: usize,
    ) -> String {
        match case {
            ProxyCase::Class(class_name) => format!("    case class {}\n", class_name),
            ProxyCase::Combinator { combinator, .. } => format!("    case {}\n", combinator.name),
        }
    }
}

fn field_step(step: &str, arg: &Arg) -> String {
    if arg.flags & FLAG_OPT_VAR != 0 {
        return String::new();
    }
    let mut text = String::new();
    if let Some(cond) = arg.conditional_on {
        text.push_str(&format!("    if var{} bit {}\n", cond.var_num, cond.bit));
    }
    text.push_str(&format!("    {} {}\n", step, arg.name));
    if let Some(var_num) = arg.bound_var {
        text.push_str(&format!("    bind var{}\n", var_num));
    }
    text
}
