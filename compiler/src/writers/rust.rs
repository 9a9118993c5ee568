//! Rust backend.
//!
//! Generated code expects a runtime module, imported with `use <runtime>::*;`,
//! that provides:
//!
//! - `trait TlObject: Debug`, with `get_id`, a sized-only `fetch`, `store` and
//!   `store_to_string`. Every method except `get_id` has a default body, so a
//!   class only overrides the directions it is generated for.
//! - `trait TlName`, with `fn tl_name(&self) -> &'static str`.
//! - `TlParser` (`fetch_int`, `fetch_long`, `fetch_double`, `fetch_bool`,
//!   `fetch_string`, `fetch_bytes`, `fetch_vector`, `fetch_bare_vector`,
//!   `fetch_array`, `fetch_boxed`, `unknown_constructor`) and `ParseResult<T>`.
//! - `TlStorer`, with the matching `store_*` methods and `store_object`.
//! - `TlStorerToString`, with `store_class_begin`, `store_field` and
//!   `store_class_end`.
//!
//! Types with several constructors become traits implemented by one struct
//! per constructor; `impl dyn Trait` holds the fetch dispatch. The trait of
//! type `User` is `AnyUser`, which leaves `User` free for the struct of its
//! constructor `user`. Types with a single constructor become a struct plus a
//! type alias.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tlgen_schema::*;

use crate::classifier::GenContext;
use crate::utils::{escape_rust_keyword, quote, to_pascal_case, to_snake_case};
use crate::vars::VarTable;
use crate::writer::{is_combinator_supported_by, Kind, Mode, ProxyCase, TlWriter};

const SIMPLE_TYPES: &[&str] = &["Bool", "Int32", "Int53", "Int64", "Double", "String", "Bytes"];
const COMPLEX_TYPES: &[&str] = &["Vector"];

const TO_STRING_KIND: usize = 1;
const TL_NAME_FUNCTION: &str = "tl_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RustWriterOptions {
    /// Module path of the runtime the generated code is written against.
    pub runtime:                  String,
    pub parser_mode:              Mode,
    /// Mode of the binary storer; the debug string storer always handles everything.
    pub storer_mode:              Mode,
    pub additional_functions:     Vec<String>,
    pub documentation:            bool,
    /// Skip functions whose result type is chosen by the caller (`!X`).
    pub reject_generic_functions: bool,
}

impl Default for RustWriterOptions {
    fn default() -> Self {
        RustWriterOptions {
            runtime:                  "crate::tl".to_owned(),
            parser_mode:              Mode::All,
            storer_mode:              Mode::All,
            additional_functions:     vec![TL_NAME_FUNCTION.to_owned()],
            documentation:            false,
            reject_generic_functions: false,
        }
    }
}

struct BuiltIn {
    rust_type: &'static str,
    method:    &'static str,
    is_copy:   bool,
}

fn built_in(name: &str) -> Option<BuiltIn> {
    let (rust_type, method, is_copy) = match name {
        "Bool" => ("bool", "bool", true),
        "#" | "Int32" => ("i32", "int", true),
        "Int53" | "Int64" => ("i64", "long", true),
        "Double" => ("f64", "double", true),
        "String" => ("String", "string", false),
        "Bytes" => ("Vec<u8>", "bytes", false),
        _ => return None,
    };
    Some(BuiltIn { rust_type, method, is_copy })
}

fn condition(arg: &Arg) -> Option<String> {
    arg.conditional_on
        .map(|cond| format!("var{} & (1 << {}) != 0", cond.var_num, cond.bit))
}

fn nat_expr(tree: &Tree) -> String {
    match tree {
        Tree::NatConst { value } => value.to_string(),
        Tree::VarNum { var_num, offset: 0 } => format!("var{}", var_num),
        Tree::VarNum { var_num, offset } => format!("var{} + {}", var_num, offset),
        // only numbers can count array elements
        Tree::Type(_) | Tree::VarType { .. } | Tree::Array(_) => "0".to_owned(),
    }
}

/// Value behind `reference`, an expression of type `&T` for a `Copy` type.
fn deref(reference: &str) -> String {
    match reference.strip_prefix('&') {
        Some(place) => place.to_owned(),
        None => format!("*{}", reference),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RustWriter {
    options: RustWriterOptions,
}

impl RustWriter {
    pub fn new(options: RustWriterOptions) -> RustWriter {
        RustWriter { options }
    }

    pub fn options(&self) -> &RustWriterOptions {
        &self.options
    }

    fn is_base_type_class(&self, name: &str) -> bool {
        (0..=self.get_max_arity()).any(|arity| self.gen_base_type_class_name(arity) == name)
    }

    /// Trait name for the proxy class `class_name`. Constructor structs take
    /// the PascalCase spelling of their own name, so type traits get a prefix.
    fn trait_name(&self, class_name: &str) -> String {
        if self.is_base_type_class(class_name) || class_name == self.gen_base_function_class_name() {
            class_name.to_owned()
        } else {
            format!("Any{}", class_name)
        }
    }

    fn is_tl_name_enabled(&self, function_name: &str) -> bool {
        function_name == TL_NAME_FUNCTION
    }

    fn object_class(&self, ctx: &GenContext, r: TypeRef) -> String {
        let class_name = self.gen_class_name(&ctx.ty(r).name);
        if ctx.simple_constructors(r) == 1 {
            class_name
        } else {
            format!("dyn {}", self.trait_name(&class_name))
        }
    }

    fn rust_type(&self, ctx: &GenContext, t: &TreeType) -> String {
        let name = &ctx.ty(t.type_).name;
        if let Some(b) = built_in(name) {
            return b.rust_type.to_owned();
        }
        if self.is_built_in_complex_type(name) {
            let element = t.children.first().map(|child| self.rust_tree_type(ctx, child));
            return format!("Vec<{}>", element.unwrap_or_default());
        }
        format!("Option<Box<{}>>", self.object_class(ctx, t.type_))
    }

    fn rust_tree_type(&self, ctx: &GenContext, tree: &Tree) -> String {
        match tree {
            Tree::Type(t) => self.rust_type(ctx, t),
            Tree::VarType { .. } => format!("Option<Box<dyn {}>>", self.gen_base_function_class_name()),
            Tree::NatConst { .. } | Tree::VarNum { .. } => "i32".to_owned(),
            Tree::Array(a) => format!("Vec<{}>", self.array_element_type(ctx, a)),
        }
    }

    fn array_element_type(&self, ctx: &GenContext, a: &TreeArray) -> String {
        if let [single] = a.args.as_slice() {
            return self.rust_tree_type(ctx, &single.type_);
        }
        let types: Vec<String> = a.args.iter().map(|b| self.rust_tree_type(ctx, &b.type_)).collect();
        format!("({})", types.join(", "))
    }

    /// A conditional field gets an extra `Option` unless its type already is one.
    fn is_wrapped(&self, ctx: &GenContext, arg: &Arg) -> bool {
        arg.conditional_on.is_some() && !self.rust_tree_type(ctx, &arg.type_).starts_with("Option<")
    }

    fn fetch_expr(&self, ctx: &GenContext, tree: &Tree) -> String {
        match tree {
            Tree::Type(t) => self.type_fetch_expr(ctx, t),
            Tree::VarType { .. } => format!("Some(<dyn {}>::fetch(p)?)", self.gen_base_function_class_name()),
            Tree::NatConst { .. } | Tree::VarNum { .. } => nat_expr(tree),
            Tree::Array(a) => {
                let element = match a.args.as_slice() {
                    [single] => self.fetch_expr(ctx, &single.type_),
                    args => {
                        let fields: Vec<String> = args.iter().map(|b| self.fetch_expr(ctx, &b.type_)).collect();
                        format!("({})", fields.join(", "))
                    }
                };
                format!("p.fetch_array({}, |p| Ok({}))?", nat_expr(&a.multiplicity), element)
            }
        }
    }

    fn type_fetch_expr(&self, ctx: &GenContext, t: &TreeType) -> String {
        let name = &ctx.ty(t.type_).name;
        let is_bare = t.flags & FLAG_BARE != 0;
        if let Some(b) = built_in(name) {
            return format!("p.fetch_{}()?", b.method);
        }
        if self.is_built_in_complex_type(name) {
            let element = t.children.first().map(|child| self.fetch_expr(ctx, child));
            let method = if is_bare { "fetch_bare_vector" } else { "fetch_vector" };
            return format!("p.{}(|p| Ok({}))?", method, element.unwrap_or_default());
        }

        let class_name = self.gen_class_name(name);
        if ctx.simple_constructors(t.type_) != 1 {
            format!("Some(<dyn {}>::fetch(p)?)", self.trait_name(&class_name))
        } else if is_bare {
            format!("Some(Box::new({}::fetch(p)?))", class_name)
        } else {
            format!("Some(Box::new(p.fetch_boxed({0}::ID, {0}::fetch)?))", class_name)
        }
    }

    /// Statement storing the value behind `reference`.
    fn store_stmt(&self, ctx: &GenContext, tree: &Tree, reference: &str) -> String {
        match tree {
            Tree::Type(t) => {
                let name = &ctx.ty(t.type_).name;
                let is_bare = t.flags & FLAG_BARE != 0;
                if let Some(b) = built_in(name) {
                    let value = if b.is_copy { deref(reference) } else { reference.to_owned() };
                    return format!("s.store_{}({});", b.method, value);
                }
                if self.is_built_in_complex_type(name) {
                    let element = t.children.first().map(|child| self.store_stmt(ctx, child, "x"));
                    let method = if is_bare { "store_bare_vector" } else { "store_vector" };
                    return format!("s.{}({}, |s, x| {{ {} }});", method, reference, element.unwrap_or_default());
                }
                let is_boxed = !is_bare || ctx.simple_constructors(t.type_) != 1;
                format!("s.store_object({}, {});", reference, is_boxed)
            }
            Tree::VarType { .. } => format!("s.store_object({}, true);", reference),
            Tree::NatConst { .. } | Tree::VarNum { .. } => format!("s.store_int({});", deref(reference)),
            Tree::Array(a) => match a.args.as_slice() {
                [single] => format!("s.store_array({}, |s, x| {{ {} }});", reference, self.store_stmt(ctx, &single.type_, "x")),
                args => {
                    let names: Vec<String> = (0..args.len()).map(|i| format!("x{}", i)).collect();
                    let stores: Vec<String> = args
                        .iter()
                        .zip(&names)
                        .map(|(b, name)| self.store_stmt(ctx, &b.type_, name))
                        .collect();
                    format!("s.store_array({}, |s, ({})| {{ {} }});", reference, names.join(", "), stores.join(" "))
                }
            },
        }
    }
}

impl TlWriter for RustWriter {
    fn is_built_in_simple_type(&self, name: &str) -> bool {
        SIMPLE_TYPES.contains(&name)
    }

    fn is_built_in_complex_type(&self, name: &str) -> bool {
        COMPLEX_TYPES.contains(&name)
    }

    fn is_combinator_supported(&self, ctx: &GenContext, c: &Combinator) -> bool {
        if self.options.reject_generic_functions && c.args.iter().any(|a| matches!(a.type_, Tree::VarType { .. })) {
            return false;
        }
        // numeric type parameters would have to be passed to `fetch`
        if let Tree::Type(result) = &c.result {
            if result.children.iter().any(|child| matches!(child, Tree::VarNum { .. })) {
                return false;
            }
        }
        is_combinator_supported_by(self, ctx, c)
    }

    fn is_default_constructor_generated(&self, _c: &Combinator, _can_be_parsed: bool, _can_be_stored: bool) -> bool {
        // covered by `#[derive(Default)]`
        false
    }

    fn is_full_constructor_generated(&self, _c: &Combinator, _can_be_parsed: bool, can_be_stored: bool) -> bool {
        can_be_stored
    }

    fn is_documentation_generated(&self) -> bool {
        self.options.documentation
    }

    fn get_parsers(&self) -> Vec<String> {
        vec!["TlParser".to_owned()]
    }

    fn get_storers(&self) -> Vec<String> {
        vec!["TlStorer".to_owned(), "TlStorerToString".to_owned()]
    }

    fn get_storer_kind(&self, _c: &Combinator, storer_name: &str) -> Kind {
        if storer_name == "TlStorerToString" {
            Some(TO_STRING_KIND)
        } else {
            Some(0)
        }
    }

    fn get_parser_mode(&self, _kind: Kind) -> Mode {
        self.options.parser_mode
    }

    fn get_storer_mode(&self, kind: Kind) -> Mode {
        match kind {
            Some(TO_STRING_KIND) => Mode::All,
            _ => self.options.storer_mode,
        }
    }

    fn get_additional_functions(&self) -> Vec<String> {
        self.options.additional_functions.clone()
    }

    fn get_additional_function_type(&self, function_name: &str) -> u32 {
        if self.is_tl_name_enabled(function_name) {
            2
        } else {
            0
        }
    }

    fn get_package_suffixes(&self) -> Vec<String> {
        vec![".rs".to_owned()]
    }

    fn gen_class_name(&self, name: &str) -> String {
        to_pascal_case(name)
    }

    fn gen_field_name(&self, name: &str) -> String {
        escape_rust_keyword(&to_snake_case(name))
    }

    fn gen_type_name(&self, ctx: &GenContext, tree: &TreeType) -> String {
        self.rust_type(ctx, tree)
    }

    fn gen_output_begin(&self, additional_imports: &str) -> String {
        let mut text = String::from("// Generated by tlgen from a TL schema. Do not edit.\n\n");
        text.push_str(&format!("use {}::*;\n", self.options.runtime));
        if !additional_imports.is_empty() {
            text.push('\n');
            text.push_str(additional_imports);
        }
        text.push('\n');
        text
    }

    fn gen_output_end(&self) -> String {
        String::new()
    }

    fn gen_import_declaration(&self, name: &str, _is_system: bool) -> String {
        let file_name = Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_owned());
        format!("include!({});\n", quote(&file_name))
    }

    fn gen_class_begin(&self, class_name: &str, base_class_name: &str, is_proxy: bool) -> String {
        let mut text = String::new();
        if is_proxy {
            let trait_name = self.trait_name(class_name);
            if self.options.documentation {
                text.push_str(&format!("/// Any `{}`.\n", class_name));
            }
            text.push_str(&format!("pub trait {}: {} {{}}\n\n", trait_name, base_class_name));
            if base_class_name == self.gen_base_tl_class_name() && self.is_base_type_class(class_name) {
                text.push_str(&format!("impl<T: {}> {} for T {{}}\n\n", base_class_name, class_name));
            }
            text.push_str(&format!("impl dyn {} {{\n", trait_name));
        } else {
            if !self.is_base_type_class(base_class_name) {
                text.push_str(&format!("impl {} for {} {{}}\n\n", self.trait_name(base_class_name), class_name));
            }
            if self.options.documentation {
                text.push_str(&format!("/// TL object `{}`.\n", class_name));
            }
            text.push_str("#[derive(Debug, Default)]\n");
            text.push_str(&format!("pub struct {} {{\n", class_name));
        }
        text
    }

    fn gen_class_end(&self) -> String {
        "}\n\n".to_owned()
    }

    fn gen_class_alias(&self, class_name: &str, alias_name: &str) -> String {
        if class_name == alias_name {
            return String::new();
        }
        format!("pub type {} = {};\n\n", alias_name, class_name)
    }

    fn gen_field_type(&self, ctx: &GenContext, arg: &Arg) -> String {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return String::new();
        }
        let type_name = self.rust_tree_type(ctx, &arg.type_);
        if self.is_wrapped(ctx, arg) {
            format!("Option<{}>", type_name)
        } else {
            type_name
        }
    }

    fn gen_field_definition(&self, _class_name: &str, type_name: &str, field_name: &str) -> String {
        format!("    pub {}: {},\n", field_name, type_name)
    }

    fn gen_flags_definitions(&self, c: &Combinator, can_be_stored: bool) -> String {
        let mut text = format!("}}\n\nimpl {} {{\n", self.gen_class_name(&c.name));
        if !can_be_stored {
            return text;
        }
        for a in &c.args {
            if let Some(cond) = a.conditional_on {
                let mask = self.gen_field_name(&a.name).trim_end_matches('_').to_uppercase();
                text.push_str(&format!("    pub const {}_MASK: i32 = 1 << {};\n", mask, cond.bit));
            }
        }
        text
    }

    fn gen_constructor_id_store(&self, _id: i32, kind: Kind) -> String {
        match kind {
            Some(TO_STRING_KIND) | None => String::new(),
            Some(_) => "        s.store_int(Self::ID);\n".to_owned(),
        }
    }

    fn gen_field_fetch(
        &self,
        ctx: &GenContext,
        _field_num: usize,
        arg: &Arg,
        _vars: &VarTable,
        _flat: bool,
        _kind: Kind,
    ) -> String {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return String::new();
        }
        let field_name = self.gen_field_name(&arg.name);
        let cond = condition(arg);
        let mut value = self.fetch_expr(ctx, &arg.type_);
        let mut text = String::new();

        if let Some(var_num) = arg.bound_var {
            let init = match &cond {
                Some(cond) => format!("if {} {{ {} }} else {{ 0 }}", cond, value),
                None => value,
            };
            text.push_str(&format!("        let var{} = {};\n", var_num, init));
            value = format!("var{}", var_num);
        }
        if self.is_wrapped(ctx, arg) {
            value = format!("Some({})", value);
        }

        match cond {
            Some(cond) => text.push_str(&format!(
                "        if {} {{\n            res.{} = {};\n        }}\n",
                cond, field_name, value
            )),
            None => text.push_str(&format!("        res.{} = {};\n", field_name, value)),
        }
        text
    }

    fn gen_field_store(&self, ctx: &GenContext, arg: &Arg, _vars: &VarTable, _flat: bool, kind: Kind) -> String {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return String::new();
        }
        let field_name = self.gen_field_name(&arg.name);
        if kind == Some(TO_STRING_KIND) {
            return format!("        s.store_field({}, &self.{});\n", quote(&arg.name), field_name);
        }

        let cond = condition(arg);
        let mut text = String::new();
        if let Some(var_num) = arg.bound_var {
            let value = if cond.is_some() {
                format!("self.{}.unwrap_or(0)", field_name)
            } else {
                format!("self.{}", field_name)
            };
            text.push_str(&format!("        let var{} = {};\n", var_num, value));
        }

        let field = format!("&self.{}", field_name);
        match cond {
            Some(cond) if self.is_wrapped(ctx, arg) => text.push_str(&format!(
                "        if {} {{\n            if let Some(value) = {} {{\n                {}\n            }}\n        }}\n",
                cond,
                field,
                self.store_stmt(ctx, &arg.type_, "value")
            )),
            Some(cond) => text.push_str(&format!(
                "        if {} {{\n            {}\n        }}\n",
                cond,
                self.store_stmt(ctx, &arg.type_, &field)
            )),
            None => text.push_str(&format!("        {}\n", self.store_stmt(ctx, &arg.type_, &field))),
        }
        text
    }

    fn gen_type_fetch(
        &self,
        ctx: &GenContext,
        _field_name: &str,
        tree: &TreeType,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        format!("        Ok({})\n", self.type_fetch_expr(ctx, tree))
    }

    fn gen_var_type_fetch(&self, _arg: &Arg) -> String {
        format!("        Ok(Some(<dyn {}>::fetch(p)?))\n", self.gen_base_type_class_name(0))
    }

    fn gen_get_id(&self, class_name: &str, id: i32, is_proxy: bool) -> String {
        if is_proxy {
            return String::new();
        }
        let mut text = String::new();
        if self.options.documentation {
            text.push_str("    /// TL constructor identifier.\n");
        }
        text.push_str(&format!("    pub const ID: i32 = 0x{:08x}_u32 as i32;\n}}\n\n", id));
        text.push_str(&format!("impl {} for {} {{\n", self.gen_base_tl_class_name(), class_name));
        text.push_str("    fn get_id(&self) -> i32 {\n        Self::ID\n    }\n");
        text
    }

    fn gen_constructor_begin(&self, _field_count: usize, _class_name: &str, _is_default: bool) -> String {
        "\n    pub fn new(".to_owned()
    }

    fn gen_constructor_parameter(
        &self,
        ctx: &GenContext,
        field_num: usize,
        _class_name: &str,
        arg: &Arg,
        _is_default: bool,
    ) -> String {
        let type_name = self.gen_field_type(ctx, arg);
        if type_name.is_empty() {
            return String::new();
        }
        let separator = if field_num == 0 { "" } else { ", " };
        format!("{}{}: {}", separator, self.gen_field_name(&arg.name), type_name)
    }

    fn gen_constructor_field_init(&self, field_num: usize, _class_name: &str, arg: &Arg, _is_default: bool) -> String {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return String::new();
        }
        let mut text = String::new();
        if field_num == 0 {
            text.push_str(") -> Self {\n        Self {\n");
        }
        text.push_str(&format!("            {},\n", self.gen_field_name(&arg.name)));
        text
    }

    fn gen_constructor_end(&self, _c: &Combinator, field_count: usize, _is_default: bool) -> String {
        if field_count == 0 {
            ") -> Self {\n        Self::default()\n    }\n".to_owned()
        } else {
            "        }\n    }\n".to_owned()
        }
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
        match field_count {
            None => format!(
                "\n    pub fn fetch(p: &mut {}) -> ParseResult<Box<dyn {}>> {{\n",
                parser_name,
                self.trait_name(class_name)
            ),
            Some(_) => format!(
                "\n    fn fetch(p: &mut {}) -> ParseResult<Self> {{\n        let mut res = Self::default();\n",
                parser_name
            ),
        }
    }

    fn gen_fetch_function_end(
        &self,
        _has_parent: bool,
        field_count: Option<usize>,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        match field_count {
            None => "    }\n".to_owned(),
            Some(_) => "        Ok(res)\n    }\n".to_owned(),
        }
    }

    fn gen_fetch_function_result_begin(
        &self,
        ctx: &GenContext,
        parser_name: &str,
        class_name: &str,
        result: &Tree,
    ) -> String {
        let result_type = match result {
            Tree::Type(t) => self.rust_type(ctx, t),
            _ => format!("Option<Box<dyn {}>>", self.gen_base_type_class_name(0)),
        };
        format!(
            "}}\n\nimpl {} {{\n    pub fn fetch_result(p: &mut {}) -> ParseResult<{}> {{\n",
            class_name, parser_name, result_type
        )
    }

    fn gen_fetch_function_result_end(&self) -> String {
        "    }\n".to_owned()
    }

    fn gen_store_function_begin(
        &self,
        storer_name: &str,
        class_name: &str,
        _arity: usize,
        _vars: &VarTable,
        kind: Kind,
    ) -> String {
        match kind {
            None => String::new(),
            Some(TO_STRING_KIND) => format!(
                "\n    fn store_to_string(&self, s: &mut {}, field_name: &str) {{\n        s.store_class_begin(field_name, {});\n",
                storer_name,
                quote(class_name)
            ),
            Some(_) => format!("\n    fn store(&self, s: &mut {}) {{\n", storer_name),
        }
    }

    fn gen_store_function_end(&self, _vars: &VarTable, kind: Kind) -> String {
        match kind {
            None => String::new(),
            Some(TO_STRING_KIND) => "        s.store_class_end();\n    }\n".to_owned(),
            Some(_) => "    }\n".to_owned(),
        }
    }

    fn gen_fetch_switch_begin(&self) -> String {
        "        let constructor = p.fetch_int()?;\n        match constructor {\n".to_owned()
    }

    fn gen_fetch_switch_case(&self, c: &Combinator, _arity: usize) -> String {
        format!("            {0}::ID => Ok(Box::new({0}::fetch(p)?)),\n", self.gen_class_name(&c.name))
    }

    fn gen_fetch_switch_end(&self) -> String {
        "            _ => Err(p.unknown_constructor(constructor)),\n        }\n".to_owned()
    }

    fn gen_additional_function(
        &self,
        _ctx: &GenContext,
        function_name: &str,
        c: &Combinator,
        _is_function: bool,
    ) -> String {
        if !self.is_tl_name_enabled(function_name) {
            return String::new();
        }
        let class_name = self.gen_class_name(&c.name);
        format!(
            "}}\n\nimpl TlName for {0} {{\n    fn tl_name(&self) -> &'static str {{\n        {1}\n    }}\n}}\n\nimpl {0} {{\n",
            class_name,
            quote(&c.name)
        )
    }

    fn gen_additional_proxy_function_begin(
        &self,
        function_name: &str,
        _type_: Option<&TlType>,
        _class_name: &str,
        _arity: usize,
        _is_function: bool,
    ) -> String {
        if !self.is_tl_name_enabled(function_name) {
            return String::new();
        }
        "\n    pub fn tl_names() -> &'static [&'static str] {\n        &[\n".to_owned()
    }

    fn gen_additional_proxy_function_case(
        &self,
        function_name: &str,
        _type_: Option<&TlType>,
        case: ProxyCase,
        _arity: usize,
    ) -> String {
        if !self.is_tl_name_enabled(function_name) {
            return String::new();
        }
        let name = match case {
            ProxyCase::Class(class_name) => class_name,
            ProxyCase::Combinator { combinator, .. } => combinator.name.as_str(),
        };
        format!("            {},\n", quote(name))
    }

    fn gen_additional_proxy_function_end(
        &self,
        function_name: &str,
        _type_: Option<&TlType>,
        _is_function: bool,
    ) -> String {
        if !self.is_tl_name_enabled(function_name) {
            return String::new();
        }
        "        ]\n    }\n".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options: RustWriterOptions =
            serde_json::from_str(r#"{"runtime": "tl_runtime", "parser_mode": "client"}"#).unwrap();
        assert_eq!(options.runtime, "tl_runtime");
        assert_eq!(options.parser_mode, Mode::Client);
        assert_eq!(options.storer_mode, Mode::All);
        assert_eq!(options.additional_functions, ["tl_name"]);
    }

    #[test]
    fn test_storer_modes() {
        let w = RustWriter::new(RustWriterOptions { storer_mode: Mode::Server, ..Default::default() });
        assert_eq!(w.get_storer_mode(Some(0)), Mode::Server);
        assert_eq!(w.get_storer_mode(None), Mode::Server);
        assert_eq!(w.get_storer_mode(Some(TO_STRING_KIND)), Mode::All);
    }

    #[test]
    fn test_naming() {
        let w = RustWriter::default();
        assert_eq!(w.gen_class_name("auth.sentCode"), "AuthSentCode");
        assert_eq!(w.gen_field_name("phoneCodeHash"), "phone_code_hash");
        assert_eq!(w.gen_field_name("type"), "type_");
        assert_eq!(w.gen_field_name("final"), "final_");
        assert_eq!(w.gen_field_name("box"), "box_");
        assert_eq!(w.gen_import_declaration("out/tl_User.rs", false), "include!(\"tl_User.rs\");\n");
        assert_eq!(w.gen_class_alias("User", "User"), "");
        assert_eq!(w.gen_class_alias("UserFull", "User"), "pub type User = UserFull;\n\n");
        assert_eq!(w.trait_name("User"), "AnyUser");
        assert_eq!(w.trait_name("Object"), "Object");
        assert_eq!(w.trait_name("Function"), "Function");
    }

    #[test]
    fn test_deref_and_nat_expr() {
        assert_eq!(deref("&self.id"), "self.id");
        assert_eq!(deref("x"), "*x");
        assert_eq!(nat_expr(&Tree::NatConst { value: 4 }), "4");
        assert_eq!(nat_expr(&Tree::VarNum { var_num: 1, offset: 0 }), "var1");
        assert_eq!(nat_expr(&Tree::VarNum { var_num: 1, offset: 2 }), "var1 + 2");
    }

    #[test]
    fn test_get_id_opens_object_impl() {
        let w = RustWriter::default();
        let text = w.gen_get_id("User", -1, false);
        assert!(text.starts_with("    pub const ID: i32 = 0xffffffff_u32 as i32;\n}\n\nimpl TlObject for User {\n"));
        assert_eq!(w.gen_get_id("Object", 0, true), "");
    }
}
