use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tlgen_schema::*;
use tracing::{debug, info};

use crate::classifier::{classify, Classification, GenContext, TypeClass};
use crate::error::TlError;
use crate::file_utils::put_file_contents;
use crate::reachability::{compute_reachable_sets, ReachableSets};
use crate::vars::VarTable;
use crate::writer::{Kind, Mode, ProxyCase, TlWriter};

/// Unit holding the forward declarations of every generated class.
pub const COMMON_UNIT: &str = "common";

/// Generate the whole schema as one output.
pub fn generate(schema: &Schema, w: &dyn TlWriter) -> Result<String, TlError> {
    let classification = classify(schema, w);
    let mut generator = Generator::new(schema, &classification, w, false);
    generator.run()?;

    let mut result = w.gen_output_begin("");
    result.push_str(&w.gen_output_begin_once());
    result.push_str(&generator.out.single);
    result.push_str(&w.gen_output_end());
    Ok(result)
}

/// Name of the file holding `unit` in a split output.
pub fn unit_file_name(prefix: &str, unit: &str, suffix: &str) -> String {
    format!("{}_{}{}", prefix, unit, suffix)
}

/// Generate the schema split into one file per logical unit.
///
/// Returns file names mapped to their contents. Besides the units, the map
/// holds the umbrella file `{prefix}{suffix}`, which only imports the units.
pub fn generate_units(
    schema: &Schema,
    w: &dyn TlWriter,
    prefix: &str,
    suffix: &str,
) -> Result<BTreeMap<String, String>, TlError> {
    let classification = classify(schema, w);
    let mut generator = Generator::new(schema, &classification, w, true);
    generator.run()?;

    let package_suffixes = w.get_package_suffixes();
    let mut files = BTreeMap::new();
    for (unit, body) in &generator.out.units {
        let mut imports = String::new();
        let mut forward = String::new();
        if let Some(children) = generator.out.children.get(unit) {
            for &child in children {
                let child_unit = w.gen_class_name(&schema.ty(child).name);
                if child_unit == *unit {
                    continue;
                }
                for package_suffix in &package_suffixes {
                    if package_suffix != suffix {
                        imports.push_str(&w.gen_import_declaration(
                            &unit_file_name(prefix, &child_unit, package_suffix),
                            false,
                        ));
                    }
                }
                forward.push_str(&generator.forward_declarations(child));
            }
        }

        let mut text = w.gen_output_begin(&imports);
        text.push_str(&forward);
        text.push_str(body);
        text.push_str(&w.gen_output_end());
        files.insert(unit_file_name(prefix, unit, suffix), text);
    }

    let mut all_imports = String::new();
    for unit in generator.out.units.keys() {
        for package_suffix in &package_suffixes {
            if package_suffix == suffix {
                all_imports.push_str(&w.gen_import_declaration(&unit_file_name(prefix, unit, package_suffix), false));
            }
        }
    }
    let mut umbrella = w.gen_output_begin(&all_imports);
    umbrella.push_str(&w.gen_output_begin_once());
    umbrella.push_str(&w.gen_output_end());
    files.insert(format!("{}{}", prefix, suffix), umbrella);

    debug!(files = files.len(), "generated split output");
    Ok(files)
}

/// Generate into `path`, leaving the file alone when nothing changed.
///
/// Returns true if the file was written.
pub fn write_tl_to_file(schema: &Schema, path: &Path, w: &dyn TlWriter) -> Result<bool, TlError> {
    let text = generate(schema, w)?;
    put_file_contents(path, &text, !w.is_documentation_generated())
}

/// Split variant of [`write_tl_to_file`]. Returns the number of files written.
pub fn write_tl_to_multiple_files(
    schema: &Schema,
    prefix: &str,
    suffix: &str,
    w: &dyn TlWriter,
) -> Result<usize, TlError> {
    let mut written = 0;
    for (file_name, text) in generate_units(schema, w, prefix, suffix)? {
        if put_file_contents(Path::new(&file_name), &text, !w.is_documentation_generated())? {
            written += 1;
        }
    }
    Ok(written)
}

#[derive(Default)]
struct Output {
    split:    bool,
    single:   String,
    units:    BTreeMap<String, String>,
    /// Generated types referenced by the fields of each unit.
    children: BTreeMap<String, BTreeSet<TypeRef>>,
}

impl Output {
    fn append(&mut self, unit: &str, text: &str) {
        if self.split {
            self.units.entry(unit.to_owned()).or_default().push_str(text);
        } else {
            self.single.push_str(text);
        }
    }
}

struct Generator<'a> {
    ctx:  GenContext<'a>,
    w:    &'a dyn TlWriter,
    sets: ReachableSets,
    out:  Output,
}

impl<'a> Generator<'a> {
    fn new(schema: &'a Schema, classification: &'a Classification, w: &'a dyn TlWriter, split: bool) -> Generator<'a> {
        let ctx = GenContext::new(schema, classification);
        let sets = compute_reachable_sets(&ctx, w);
        debug!(
            complex = classification.complex_types().len(),
            request_types = sets.request_types.len(),
            result_types = sets.result_types.len(),
            "classified TL schema"
        );
        Generator {
            ctx,
            w,
            sets,
            out: Output { split, ..Output::default() },
        }
    }

    fn schema(&self) -> &'a Schema {
        self.ctx.schema
    }

    fn is_generated_type(&self, r: TypeRef) -> bool {
        self.ctx.classification.type_class(self.schema(), self.w, r) == TypeClass::Supported
    }

    fn is_supported(&self, c: &Combinator) -> bool {
        self.w.is_combinator_supported(&self.ctx, c)
    }

    fn supported_constructors(&self, r: TypeRef) -> impl Iterator<Item = &'a Combinator> + '_ {
        self.schema().constructors_of(r).filter(move |c| self.is_supported(c))
    }

    fn parser_reachable(&self, kind: Kind, name: &str) -> bool {
        self.sets.is_reachable_for_parser(self.w, kind, name)
    }

    fn storer_reachable(&self, kind: Kind, name: &str) -> bool {
        self.sets.is_reachable_for_storer(self.w, kind, name)
    }

    fn run(&mut self) -> Result<(), TlError> {
        let schema = self.schema();

        let mut forward = String::new();
        for r in schema.type_refs() {
            if self.is_generated_type(r) {
                forward.push_str(&self.forward_declarations(r));
            }
        }
        for arity in 0..=self.w.get_max_arity() {
            forward.push_str(&self.w.gen_forward_class_declaration(&self.w.gen_base_type_class_name(arity), true));
        }
        self.out.append(COMMON_UNIT, &forward);

        for arity in 0..=self.w.get_max_arity() {
            self.write_base_object_class(arity);
        }
        self.write_base_function_class();

        for r in schema.type_refs() {
            let t = schema.ty(r);
            match self.ctx.classification.type_class(schema, self.w, r) {
                TypeClass::Supported => self.write_class(r)?,
                TypeClass::Unsupported if !t.constructors.is_empty() => {
                    info!("Can't generate class {}", t.name);
                }
                _ => {}
            }
        }

        for f in &schema.functions {
            if !self.is_supported(f) {
                debug!("Function {} is too hard to store", f.name);
                continue;
            }
            self.write_function(f)?;
        }
        Ok(())
    }

    fn forward_declarations(&self, r: TypeRef) -> String {
        let t = self.ctx.ty(r);
        if self.ctx.simple_constructors(r) != 1 {
            return self.w.gen_forward_class_declaration(&self.w.gen_class_name(&t.name), true);
        }
        self.supported_constructors(r)
            .map(|c| self.w.gen_forward_class_declaration(&self.w.gen_class_name(&c.name), false))
            .collect()
    }

    fn add_children(&mut self, unit: &str, c: &Combinator) {
        if !self.out.split {
            return;
        }
        let mut found = BTreeSet::new();
        for a in &c.args {
            self.collect_types(&a.type_, &mut found);
        }
        self.out.children.entry(unit.to_owned()).or_default().extend(found);
    }

    fn collect_types(&self, tree: &Tree, found: &mut BTreeSet<TypeRef>) {
        match tree {
            Tree::Type(t) => {
                if self.is_generated_type(t.type_) {
                    found.insert(t.type_);
                }
                for child in &t.children {
                    self.collect_types(child, found);
                }
            }
            Tree::Array(array) => {
                for a in &array.args {
                    self.collect_types(&a.type_, found);
                }
            }
            Tree::NatConst { .. } | Tree::VarType { .. } | Tree::VarNum { .. } => {}
        }
    }

    fn write_base_object_class(&mut self, arity: usize) {
        let w = self.w;
        let schema = self.schema();
        let class_name = w.gen_base_type_class_name(arity);
        let empty_vars = VarTable::empty(&class_name);

        let types: Vec<TypeRef> = schema
            .type_refs()
            .filter(|&r| self.is_generated_type(r) && schema.ty(r).arity == arity)
            .collect();

        let mut text = w.gen_class_begin(&class_name, &w.gen_base_tl_class_name(), true);
        text.push_str(&w.gen_get_id(&class_name, 0, true));

        for parser in w.get_parsers() {
            let cases: Vec<&Combinator> = types
                .iter()
                .flat_map(|&r| self.supported_constructors(r))
                .filter(|c| self.parser_reachable(None, &c.name))
                .collect();
            if cases.is_empty() {
                continue;
            }

            text.push_str(&w.gen_fetch_function_begin(&parser, &class_name, &class_name, arity, None, &empty_vars, None));
            text.push_str(&w.gen_fetch_switch_begin());
            for c in cases {
                text.push_str(&w.gen_fetch_switch_case(c, arity));
            }
            text.push_str(&w.gen_fetch_switch_end());
            text.push_str(&w.gen_fetch_function_end(false, None, &empty_vars, None));
        }

        for function_name in w.get_additional_functions() {
            let function_type = w.get_additional_function_type(&function_name);
            text.push_str(&w.gen_additional_proxy_function_begin(&function_name, None, &class_name, arity, false));
            for &r in &types {
                let t = schema.ty(r);
                let simple_constructors = self.ctx.simple_constructors(r);
                if function_type & 1 != 0 && simple_constructors != 1 {
                    let type_class_name = w.gen_class_name(&t.name);
                    text.push_str(&w.gen_additional_proxy_function_case(
                        &function_name,
                        None,
                        ProxyCase::Class(&type_class_name),
                        arity,
                    ));
                }
                if function_type & 2 != 0 || (function_type & 1 != 0 && simple_constructors == 1) {
                    for c in self.supported_constructors(r) {
                        text.push_str(&w.gen_additional_proxy_function_case(
                            &function_name,
                            None,
                            ProxyCase::Combinator { combinator: c, is_function: false },
                            arity,
                        ));
                    }
                }
            }
            text.push_str(&w.gen_additional_proxy_function_end(&function_name, None, false));
        }

        for storer in w.get_storers() {
            text.push_str(&w.gen_store_function_begin(&storer, &class_name, arity, &empty_vars, None));
            text.push_str(&w.gen_store_function_end(&empty_vars, None));
        }

        text.push_str(&w.gen_class_end());
        self.out.append(&class_name, &text);
    }

    fn write_base_function_class(&mut self) {
        let w = self.w;
        let class_name = w.gen_base_function_class_name();
        let empty_vars = VarTable::empty(&class_name);
        let functions: Vec<&Combinator> = self.schema().functions.iter().filter(|f| self.is_supported(f)).collect();

        let mut text = w.gen_class_begin(&class_name, &w.gen_base_tl_class_name(), true);
        text.push_str(&w.gen_get_id(&class_name, 0, true));

        let parsers = w.get_parsers();
        for parser in &parsers {
            if w.get_parser_mode(None) == Mode::Client {
                continue;
            }
            text.push_str(&w.gen_fetch_function_begin(parser, &class_name, &class_name, 0, None, &empty_vars, None));
            text.push_str(&w.gen_fetch_switch_begin());
            for f in &functions {
                text.push_str(&w.gen_fetch_switch_case(f, 0));
            }
            text.push_str(&w.gen_fetch_switch_end());
            text.push_str(&w.gen_fetch_function_end(false, None, &empty_vars, None));
        }

        for storer in w.get_storers() {
            if w.get_storer_mode(None) == Mode::Server {
                continue;
            }
            text.push_str(&w.gen_store_function_begin(&storer, &class_name, 0, &empty_vars, None));
            text.push_str(&w.gen_store_function_end(&empty_vars, None));
        }

        for parser in &parsers {
            if w.get_parser_mode(None) == Mode::Server {
                continue;
            }
            text.push_str(&w.gen_fetch_function_result_any_begin(parser, &class_name, true));
            text.push_str(&w.gen_fetch_function_result_any_end(true));
        }

        for function_name in w.get_additional_functions() {
            text.push_str(&w.gen_additional_proxy_function_begin(&function_name, None, &class_name, 0, true));
            for f in &functions {
                text.push_str(&w.gen_additional_proxy_function_case(
                    &function_name,
                    None,
                    ProxyCase::Combinator { combinator: f, is_function: true },
                    0,
                ));
            }
            text.push_str(&w.gen_additional_proxy_function_end(&function_name, None, true));
        }

        text.push_str(&w.gen_class_end());
        self.out.append(&class_name, &text);
    }

    fn write_class(&mut self, r: TypeRef) -> Result<(), TlError> {
        let w = self.w;
        let schema = self.schema();
        let t = schema.ty(r);
        let base_class = w.gen_base_type_class_name(t.arity);
        let class_name = w.gen_class_name(&t.name);
        let empty_vars = VarTable::empty(&class_name);

        let optimize_one_constructor = self.ctx.simple_constructors(r) == 1;
        if !optimize_one_constructor {
            let mut text = w.gen_class_begin(&class_name, &base_class, true);
            text.push_str(&w.gen_get_id(&class_name, 0, true));

            for parser in w.get_parsers() {
                if !self.parser_reachable(None, &t.name) {
                    continue;
                }
                text.push_str(&w.gen_fetch_function_begin(
                    &parser,
                    &class_name,
                    &class_name,
                    t.arity,
                    None,
                    &empty_vars,
                    None,
                ));
                text.push_str(&w.gen_fetch_switch_begin());
                for c in self.supported_constructors(r) {
                    text.push_str(&w.gen_fetch_switch_case(c, t.arity));
                }
                text.push_str(&w.gen_fetch_switch_end());
                text.push_str(&w.gen_fetch_function_end(false, None, &empty_vars, None));
            }

            for storer in w.get_storers() {
                if !self.storer_reachable(None, &t.name) {
                    continue;
                }
                text.push_str(&w.gen_store_function_begin(&storer, &class_name, t.arity, &empty_vars, None));
                text.push_str(&w.gen_store_function_end(&empty_vars, None));
            }

            for function_name in w.get_additional_functions() {
                text.push_str(&w.gen_additional_proxy_function_begin(
                    &function_name,
                    Some(t),
                    &class_name,
                    t.arity,
                    false,
                ));
                for c in self.supported_constructors(r) {
                    text.push_str(&w.gen_additional_proxy_function_case(
                        &function_name,
                        Some(t),
                        ProxyCase::Combinator { combinator: c, is_function: false },
                        t.arity,
                    ));
                }
                text.push_str(&w.gen_additional_proxy_function_end(&function_name, Some(t), false));
            }

            text.push_str(&w.gen_class_end());
            self.out.append(&class_name, &text);
        }

        for c in schema.constructors_of(r) {
            if !self.is_supported(c) {
                info!("Skip complex constructor {} of {}", c.name, t.name);
                continue;
            }
            if optimize_one_constructor {
                let constructor_class = w.gen_class_name(&c.name);
                self.write_constructor(c, &class_name, &base_class, &constructor_class)?;
                self.out.append(&class_name, &w.gen_class_alias(&constructor_class, &class_name));
            } else {
                self.write_constructor(c, &class_name, &class_name, &class_name)?;
            }
        }
        Ok(())
    }

    fn can_be_parsed(&self, c: &Combinator) -> bool {
        self.w.get_parsers().iter().any(|p| self.parser_reachable(self.w.get_parser_kind(c, p), &c.name))
    }

    fn can_be_stored(&self, c: &Combinator) -> bool {
        self.w.get_storers().iter().any(|s| self.storer_reachable(self.w.get_storer_kind(c, s), &c.name))
    }

    /// Field definitions of `c`; returns the number of arguments that are not
    /// implicit.
    fn gen_field_definitions(&self, c: &Combinator, class_name: &str, text: &mut String) -> usize {
        let mut required_args = 0;
        for a in &c.args {
            if a.flags & FLAG_OPT_VAR == 0 {
                required_args += 1;
            }
            let type_name = self.w.gen_field_type(&self.ctx, a);
            if !type_name.is_empty() {
                text.push_str(&self.w.gen_field_definition(class_name, &type_name, &self.w.gen_field_name(&a.name)));
            }
        }
        required_args
    }

    fn write_class_constructor(&self, c: &Combinator, class_name: &str, is_default: bool, text: &mut String) {
        let w = self.w;
        let mut parameters = Vec::new();
        for a in &c.args {
            let parameter = w.gen_constructor_parameter(&self.ctx, parameters.len(), class_name, a, is_default);
            if !parameter.is_empty() {
                parameters.push(parameter);
            }
        }

        text.push_str(&w.gen_constructor_begin(parameters.len(), class_name, is_default));
        for parameter in &parameters {
            text.push_str(parameter);
        }

        let mut field_num = 0;
        for a in &c.args {
            let field_init = w.gen_constructor_field_init(field_num, class_name, a, is_default);
            if !field_init.is_empty() {
                text.push_str(&field_init);
                field_num += 1;
            }
        }
        text.push_str(&w.gen_constructor_end(c, field_num, is_default));
    }

    fn write_constructor(
        &mut self,
        c: &Combinator,
        unit: &str,
        base_class: &str,
        parent_class: &str,
    ) -> Result<(), TlError> {
        let w = self.w;
        let result_type = c
            .result
            .as_type()
            .ok_or_else(|| TlError::InvalidConstructorResult(c.name.clone()))?;
        let class_name = w.gen_class_name(&c.name);
        let can_be_parsed = self.can_be_parsed(c);
        let can_be_stored = self.can_be_stored(c);

        let mut text = w.gen_class_begin(&class_name, base_class, false);
        let required_args = self.gen_field_definitions(c, &class_name, &mut text);
        text.push_str(&w.gen_flags_definitions(c, can_be_stored));

        if w.is_default_constructor_generated(c, can_be_parsed, can_be_stored) {
            self.write_class_constructor(c, &class_name, true, &mut text);
        }
        if required_args > 0 && w.is_full_constructor_generated(c, can_be_parsed, can_be_stored) {
            self.write_class_constructor(c, &class_name, false, &mut text);
        }
        text.push_str(&w.gen_get_id(&class_name, c.id, false));

        let is_flat = required_args == 1 && self.ctx.simple_constructors(result_type.type_) == 1;
        for parser in w.get_parsers() {
            self.write_constructor_fetch(&parser, c, &class_name, parent_class, result_type, is_flat, &mut text)?;
        }
        for storer in w.get_storers() {
            self.write_constructor_store(&storer, c, &class_name, result_type, is_flat, &mut text)?;
        }

        for function_name in w.get_additional_functions() {
            text.push_str(&w.gen_additional_function(&self.ctx, &function_name, c, false));
        }
        text.push_str(&w.gen_class_end());

        self.out.append(unit, &text);
        self.add_children(unit, c);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_constructor_fetch(
        &self,
        parser: &str,
        c: &Combinator,
        class_name: &str,
        parent_class: &str,
        result_type: &TreeType,
        is_flat: bool,
        text: &mut String,
    ) -> Result<(), TlError> {
        let w = self.w;
        let kind = w.get_parser_kind(c, parser);
        if !self.parser_reachable(kind, &c.name) {
            return Ok(());
        }

        let mut vars = VarTable::new(c);
        vars.bind_result_params(result_type)?;
        text.push_str(&w.gen_fetch_function_begin(
            parser,
            class_name,
            parent_class,
            result_type.children.len(),
            Some(c.args.len()),
            &vars,
            kind,
        ));
        text.push_str(&w.gen_vars(c, Some(result_type), &vars));
        text.push_str(&w.gen_uni(result_type, &vars, true));

        let field_num = self.write_fields_fetch(c, &mut vars, is_flat, kind, text)?;
        text.push_str(&w.gen_fetch_function_end(class_name != parent_class, Some(field_num), &vars, kind));
        vars.finish()
    }

    fn write_constructor_store(
        &self,
        storer: &str,
        c: &Combinator,
        class_name: &str,
        result_type: &TreeType,
        is_flat: bool,
        text: &mut String,
    ) -> Result<(), TlError> {
        let w = self.w;
        let kind = w.get_storer_kind(c, storer);
        if !self.storer_reachable(kind, &c.name) {
            return Ok(());
        }

        let mut vars = VarTable::new(c);
        vars.bind_result_params(result_type)?;
        text.push_str(&w.gen_store_function_begin(storer, class_name, result_type.children.len(), &vars, kind));
        text.push_str(&w.gen_vars(c, Some(result_type), &vars));
        text.push_str(&w.gen_uni(result_type, &vars, false));

        self.write_fields_store(c, &mut vars, is_flat, kind, text)?;
        text.push_str(&w.gen_store_function_end(&vars, kind));
        vars.finish()
    }

    fn write_fields_fetch(
        &self,
        c: &Combinator,
        vars: &mut VarTable,
        is_flat: bool,
        kind: Kind,
        text: &mut String,
    ) -> Result<usize, TlError> {
        let mut field_num = 0;
        for a in &c.args {
            vars.consult_arg(a)?;
            let field_fetch = self.w.gen_field_fetch(&self.ctx, field_num, a, vars, is_flat, kind);
            if !field_fetch.is_empty() {
                text.push_str(&field_fetch);
                field_num += 1;
            }
            vars.bind_arg(a)?;
        }
        Ok(field_num)
    }

    fn write_fields_store(
        &self,
        c: &Combinator,
        vars: &mut VarTable,
        is_flat: bool,
        kind: Kind,
        text: &mut String,
    ) -> Result<(), TlError> {
        for a in &c.args {
            vars.consult_arg(a)?;
            text.push_str(&self.w.gen_field_store(&self.ctx, a, vars, is_flat, kind));
            vars.bind_arg(a)?;
        }
        Ok(())
    }

    fn write_function(&mut self, f: &Combinator) -> Result<(), TlError> {
        let w = self.w;
        let class_name = w.gen_class_name(&f.name);
        let can_be_parsed = self.can_be_parsed(f);
        let can_be_stored = self.can_be_stored(f);

        let mut text = w.gen_class_begin(&class_name, &w.gen_base_function_class_name(), false);
        let required_args = self.gen_field_definitions(f, &class_name, &mut text);
        text.push_str(&w.gen_flags_definitions(f, can_be_stored));

        let mut vars = VarTable::new(f);
        for a in &f.args {
            vars.consult_arg(a)?;
            vars.bind_arg(a)?;
        }
        vars.clone().finish()?;
        text.push_str(&w.gen_function_vars(f, &vars));

        if w.is_default_constructor_generated(f, can_be_parsed, can_be_stored) {
            self.write_class_constructor(f, &class_name, true, &mut text);
        }
        if required_args > 0 && w.is_full_constructor_generated(f, can_be_parsed, can_be_stored) {
            self.write_class_constructor(f, &class_name, false, &mut text);
        }

        text.push_str(&w.gen_get_id(&class_name, f.id, false));
        text.push_str(&w.gen_function_result_type(&self.ctx, &f.result));

        let parsers = w.get_parsers();
        for parser in &parsers {
            self.write_function_fetch(parser, f, &class_name, &mut text)?;
        }
        for storer in w.get_storers() {
            self.write_function_store(&storer, f, &class_name, &mut text)?;
        }
        for parser in &parsers {
            if w.get_parser_mode(None) == Mode::Server {
                continue;
            }
            self.write_function_result_fetch(parser, f, &class_name, &vars, &mut text);
        }

        for function_name in w.get_additional_functions() {
            text.push_str(&w.gen_additional_function(&self.ctx, &function_name, f, true));
        }
        text.push_str(&w.gen_class_end());

        self.out.append(&class_name, &text);
        self.add_children(&class_name, f);
        Ok(())
    }

    fn write_function_fetch(
        &self,
        parser: &str,
        f: &Combinator,
        class_name: &str,
        text: &mut String,
    ) -> Result<(), TlError> {
        let w = self.w;
        let kind = w.get_parser_kind(f, parser);
        if !self.parser_reachable(kind, &f.name) {
            return Ok(());
        }

        let mut vars = VarTable::new(f);
        text.push_str(&w.gen_fetch_function_begin(parser, class_name, class_name, 0, Some(f.args.len()), &vars, kind));
        text.push_str(&w.gen_vars(f, None, &vars));
        let field_num = self.write_fields_fetch(f, &mut vars, false, kind, text)?;
        text.push_str(&w.gen_fetch_function_end(false, Some(field_num), &vars, kind));
        vars.finish()
    }

    fn write_function_store(
        &self,
        storer: &str,
        f: &Combinator,
        class_name: &str,
        text: &mut String,
    ) -> Result<(), TlError> {
        let w = self.w;
        let kind = w.get_storer_kind(f, storer);
        if !self.storer_reachable(kind, &f.name) {
            return Ok(());
        }

        let mut vars = VarTable::new(f);
        text.push_str(&w.gen_store_function_begin(storer, class_name, 0, &vars, kind));
        text.push_str(&w.gen_constructor_id_store(f.id, kind));
        self.write_fields_store(f, &mut vars, false, kind, text)?;
        text.push_str(&w.gen_store_function_end(&vars, kind));
        vars.finish()
    }

    fn write_function_result_fetch(
        &self,
        parser: &str,
        f: &Combinator,
        class_name: &str,
        vars: &VarTable,
        text: &mut String,
    ) {
        let w = self.w;
        let kind = w.get_parser_kind(f, parser);

        text.push_str(&w.gen_fetch_function_result_begin(&self.ctx, parser, class_name, &f.result));
        match &f.result {
            Tree::VarType { var_num, .. } => {
                for a in &f.args {
                    if matches!(a.type_, Tree::VarType { var_num: v, .. } if v == *var_num) {
                        text.push_str(&w.gen_var_type_fetch(a));
                    }
                }
            }
            Tree::Type(result_type) => {
                text.push_str(&w.gen_type_fetch(&self.ctx, "", result_type, vars, kind));
            }
            // rejected by the decoder
            Tree::NatConst { .. } | Tree::VarNum { .. } | Tree::Array(_) => {}
        }
        text.push_str(&w.gen_fetch_function_result_end());

        text.push_str(&w.gen_fetch_function_result_any_begin(parser, class_name, false));
        text.push_str(&w.gen_fetch_function_result_any_end(false));
    }
}
