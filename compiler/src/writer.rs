use serde::{Deserialize, Serialize};
use tlgen_schema::*;

use crate::classifier::GenContext;
use crate::vars::VarTable;

/// Which direction of traffic a serializer kind has to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    All,
    /// Sends requests and receives results.
    Client,
    /// Receives requests and sends results.
    Server,
}

/// Index of a parser or storer flavour a writer supports. `None` is the kind
/// used by the dispatch methods of proxy and base classes.
pub type Kind = Option<usize>;

/// One case of an additional function on a proxy class.
#[derive(Debug, Clone, Copy)]
pub enum ProxyCase<'a> {
    /// Delegates to another proxy class.
    Class(&'a str),
    /// Delegates to a concrete constructor or function class.
    Combinator { combinator: &'a Combinator, is_function: bool },
}

/// A target-language backend.
///
/// The driver decides what is generated and in which order; the writer turns
/// each step into text. Hooks that a backend does not need return an empty
/// fragment by default.
pub trait TlWriter {
    //
    // Capabilities
    //

    fn get_max_arity(&self) -> usize {
        0
    }

    fn is_built_in_simple_type(&self, name: &str) -> bool;
    fn is_built_in_complex_type(&self, name: &str) -> bool;

    fn is_type_supported(&self, ctx: &GenContext, tree: &TreeType) -> bool {
        is_type_supported_by(self, ctx, tree)
    }

    fn is_combinator_supported(&self, ctx: &GenContext, c: &Combinator) -> bool {
        is_combinator_supported_by(self, ctx, c)
    }

    fn is_default_constructor_generated(&self, _c: &Combinator, _can_be_parsed: bool, _can_be_stored: bool) -> bool {
        true
    }

    fn is_full_constructor_generated(&self, _c: &Combinator, _can_be_parsed: bool, _can_be_stored: bool) -> bool {
        true
    }

    fn is_documentation_generated(&self) -> bool {
        false
    }

    fn get_parsers(&self) -> Vec<String> {
        vec![]
    }

    fn get_storers(&self) -> Vec<String> {
        vec![]
    }

    fn get_parser_kind(&self, _c: &Combinator, _parser_name: &str) -> Kind {
        Some(0)
    }

    fn get_storer_kind(&self, _c: &Combinator, _storer_name: &str) -> Kind {
        Some(0)
    }

    fn get_parser_mode(&self, _kind: Kind) -> Mode {
        Mode::All
    }

    fn get_storer_mode(&self, _kind: Kind) -> Mode {
        Mode::All
    }

    fn get_additional_functions(&self) -> Vec<String> {
        vec![]
    }

    /// Bit 1: one case per proxy type. Bit 2: one case per constructor.
    fn get_additional_function_type(&self, _function_name: &str) -> u32 {
        0
    }

    /// File extensions a generated unit is split into, e.g. a header and a body.
    fn get_package_suffixes(&self) -> Vec<String> {
        vec![]
    }

    //
    // Naming
    //

    fn gen_base_tl_class_name(&self) -> String {
        "TlObject".to_owned()
    }

    fn gen_base_type_class_name(&self, arity: usize) -> String {
        if arity == 0 {
            "Object".to_owned()
        } else {
            format!("Object{}", arity)
        }
    }

    fn gen_base_function_class_name(&self) -> String {
        "Function".to_owned()
    }

    fn gen_class_name(&self, name: &str) -> String;
    fn gen_field_name(&self, name: &str) -> String;

    fn gen_type_name(&self, ctx: &GenContext, tree: &TreeType) -> String;

    //
    // Framing
    //

    fn gen_output_begin(&self, additional_imports: &str) -> String;

    /// Prologue written once per output, not once per unit.
    fn gen_output_begin_once(&self) -> String {
        String::new()
    }

    fn gen_output_end(&self) -> String;

    fn gen_import_declaration(&self, _name: &str, _is_system: bool) -> String {
        String::new()
    }

    fn gen_forward_class_declaration(&self, _class_name: &str, _is_proxy: bool) -> String {
        String::new()
    }

    fn gen_class_begin(&self, class_name: &str, base_class_name: &str, is_proxy: bool) -> String;
    fn gen_class_end(&self) -> String;

    fn gen_class_alias(&self, _class_name: &str, _alias_name: &str) -> String {
        String::new()
    }

    //
    // Fields
    //

    /// Type of the field holding `arg`; an empty string means `arg` is not a field.
    fn gen_field_type(&self, ctx: &GenContext, arg: &Arg) -> String;

    fn gen_field_definition(&self, _class_name: &str, _type_name: &str, _field_name: &str) -> String {
        String::new()
    }

    fn gen_flags_definitions(&self, _c: &Combinator, _can_be_stored: bool) -> String {
        String::new()
    }

    fn gen_vars(&self, _c: &Combinator, _result: Option<&TreeType>, _vars: &VarTable) -> String {
        String::new()
    }

    fn gen_function_vars(&self, _c: &Combinator, _vars: &VarTable) -> String {
        String::new()
    }

    /// Unification of the result type parameters with the caller's.
    fn gen_uni(&self, _result: &TreeType, _vars: &VarTable, _check_distinct: bool) -> String {
        String::new()
    }

    fn gen_constructor_id_store(&self, _id: i32, _kind: Kind) -> String {
        String::new()
    }

    fn gen_field_fetch(
        &self,
        ctx: &GenContext,
        field_num: usize,
        arg: &Arg,
        vars: &VarTable,
        flat: bool,
        kind: Kind,
    ) -> String;

    fn gen_field_store(&self, ctx: &GenContext, arg: &Arg, vars: &VarTable, flat: bool, kind: Kind) -> String;

    fn gen_type_fetch(
        &self,
        _ctx: &GenContext,
        _field_name: &str,
        _tree: &TreeType,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        String::new()
    }

    fn gen_var_type_fetch(&self, _arg: &Arg) -> String {
        String::new()
    }

    //
    // Constructors and identity
    //

    fn gen_get_id(&self, _class_name: &str, _id: i32, _is_proxy: bool) -> String {
        String::new()
    }

    fn gen_function_result_type(&self, _ctx: &GenContext, _result: &Tree) -> String {
        String::new()
    }

    fn gen_constructor_begin(&self, _field_count: usize, _class_name: &str, _is_default: bool) -> String {
        String::new()
    }

    /// Parameter of the full constructor; an empty string means none.
    fn gen_constructor_parameter(
        &self,
        _ctx: &GenContext,
        _field_num: usize,
        _class_name: &str,
        _arg: &Arg,
        _is_default: bool,
    ) -> String {
        String::new()
    }

    fn gen_constructor_field_init(
        &self,
        _field_num: usize,
        _class_name: &str,
        _arg: &Arg,
        _is_default: bool,
    ) -> String {
        String::new()
    }

    fn gen_constructor_end(&self, _c: &Combinator, _field_count: usize, _is_default: bool) -> String {
        String::new()
    }

    //
    // Fetch and store methods
    //

    /// `field_count` is `None` for dispatch methods.
    #[allow(clippy::too_many_arguments)]
    fn gen_fetch_function_begin(
        &self,
        _parser_name: &str,
        _class_name: &str,
        _parent_class_name: &str,
        _arity: usize,
        _field_count: Option<usize>,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        String::new()
    }

    fn gen_fetch_function_end(
        &self,
        _has_parent: bool,
        _field_count: Option<usize>,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        String::new()
    }

    fn gen_fetch_function_result_begin(
        &self,
        _ctx: &GenContext,
        _parser_name: &str,
        _class_name: &str,
        _result: &Tree,
    ) -> String {
        String::new()
    }

    fn gen_fetch_function_result_end(&self) -> String {
        String::new()
    }

    fn gen_fetch_function_result_any_begin(&self, _parser_name: &str, _class_name: &str, _is_proxy: bool) -> String {
        String::new()
    }

    fn gen_fetch_function_result_any_end(&self, _is_proxy: bool) -> String {
        String::new()
    }

    fn gen_store_function_begin(
        &self,
        _storer_name: &str,
        _class_name: &str,
        _arity: usize,
        _vars: &VarTable,
        _kind: Kind,
    ) -> String {
        String::new()
    }

    fn gen_store_function_end(&self, _vars: &VarTable, _kind: Kind) -> String {
        String::new()
    }

    fn gen_fetch_switch_begin(&self) -> String {
        String::new()
    }

    fn gen_fetch_switch_case(&self, _c: &Combinator, _arity: usize) -> String {
        String::new()
    }

    fn gen_fetch_switch_end(&self) -> String {
        String::new()
    }

    //
    // Additional functions
    //

    fn gen_additional_function(
        &self,
        _ctx: &GenContext,
        _function_name: &str,
        _c: &Combinator,
        _is_function: bool,
    ) -> String {
        String::new()
    }

    fn gen_additional_proxy_function_begin(
        &self,
        _function_name: &str,
        _type_: Option<&TlType>,
        _class_name: &str,
        _arity: usize,
        _is_function: bool,
    ) -> String {
        String::new()
    }

    fn gen_additional_proxy_function_case(
        &self,
        _function_name: &str,
        _type_: Option<&TlType>,
        _case: ProxyCase,
        _arity: usize,
    ) -> String {
        String::new()
    }

    fn gen_additional_proxy_function_end(
        &self,
        _function_name: &str,
        _type_: Option<&TlType>,
        _is_function: bool,
    ) -> String {
        String::new()
    }
}

/// Generic type rule: the type is not complex and none of its parameters is a
/// free type variable.
pub fn is_type_supported_by<W: TlWriter + ?Sized>(w: &W, ctx: &GenContext, tree: &TreeType) -> bool {
    if ctx.is_complex(tree.type_) {
        return false;
    }
    tree.children.iter().all(|child| match child {
        Tree::Type(t) => w.is_type_supported(ctx, t),
        Tree::VarType { .. } | Tree::Array(_) => false,
        Tree::NatConst { .. } | Tree::VarNum { .. } => true,
    })
}

/// Generic combinator rule: every free type variable is the witness of exactly
/// one `!X` argument, and every field type is supported by `w`.
pub fn is_combinator_supported_by<W: TlWriter + ?Sized>(w: &W, ctx: &GenContext, c: &Combinator) -> bool {
    let mut is_function_result = vec![false; c.var_count];
    for a in &c.args {
        if let Tree::VarType { var_num, .. } = a.type_ {
            if a.flags & FLAG_EXCL == 0 || var_num >= c.var_count || is_function_result[var_num] {
                return false;
            }
            is_function_result[var_num] = true;
        }
    }

    c.args.iter().all(|a| {
        if let Some(var_num) = a.bound_var {
            let binds_type = a.type_.as_type().map_or(false, |t| ctx.ty(t.type_).id == ID_VAR_TYPE);
            if binds_type {
                // only `{X:Type}` with a matching `!X` argument
                return a.flags & FLAG_OPT_VAR != 0 && is_function_result.get(var_num).copied().unwrap_or(false);
            }
        }
        match &a.type_ {
            Tree::VarType { .. } => true,
            Tree::Type(t) => w.is_type_supported(ctx, t),
            Tree::Array(array) => array.args.iter().all(|b| match &b.type_ {
                Tree::Type(t) => w.is_type_supported(ctx, t),
                _ => false,
            }),
            Tree::NatConst { .. } | Tree::VarNum { .. } => false,
        }
    })
}
