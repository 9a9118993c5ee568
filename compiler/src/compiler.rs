use std::fs;
use std::path::Path;

use tlgen_schema::*;
use tracing::{debug, warn};

use crate::error::TlError;

/// Read and decode a binary schema file.
pub fn read_schema_from_file(path: &Path) -> Result<Schema, TlError> {
    let data = fs::read(path)?;
    if data.is_empty() {
        return Err(TlError::EmptyInput(path.display().to_string()));
    }
    decode_binary_schema(&data)
}

/// Decode a binary schema buffer into a `Schema`.
///
/// Any grammar violation is fatal: no partially decoded schema is ever
/// returned.
pub fn decode_binary_schema(buffer: &[u8]) -> Result<Schema, TlError> {
    if buffer.len() % 4 != 0 {
        return Err(TlError::UnalignedInput { len: buffer.len() });
    }

    let mut reader = SchemaReader {
        bb:      ByteBuffer::new(buffer),
        version: 0,
    };
    reader.read_schema()
}

struct SchemaReader<'a> {
    bb:      ByteBuffer<'a>,
    version: i32,
}

impl<'a> SchemaReader<'a> {
    fn read_int(&mut self) -> Result<i32, TlError> {
        Ok(self.bb.read_i32()?)
    }

    fn read_string(&mut self) -> Result<String, TlError> {
        Ok(self.bb.read_string()?.to_owned())
    }

    fn expect_magic(&mut self, what: &'static str, magic: i32) -> Result<(), TlError> {
        let offset = self.bb.index();
        let found = self.read_int()?;
        if found != magic {
            return Err(TlError::BadMagic { what, found, offset });
        }
        Ok(())
    }

    fn read_count(&mut self, what: &'static str) -> Result<usize, TlError> {
        let value = self.read_int()?;
        if value < 0 {
            return Err(TlError::NegativeValue { what, value });
        }
        Ok(value as usize)
    }

    fn read_var_num(&mut self, var_count: &mut usize) -> Result<usize, TlError> {
        let var_num = self.read_count("variable index")?;
        *var_count = (*var_count).max(var_num + 1);
        Ok(var_num)
    }

    fn read_schema(&mut self) -> Result<Schema, TlError> {
        let magic = self.read_int()?;
        self.version = schema_version(magic).ok_or(TlError::UnsupportedVersion(magic))?;
        let mut schema = Schema::new(self.version);

        self.read_int()?; // date
        self.read_int()?; // version

        let types_n = self.read_count("type count")?;
        let mut constructors_total = 0;
        for _ in 0..types_n {
            let t = self.read_type_header()?;
            constructors_total += t.constructors_num;
            schema.add_type(t);
        }

        let constructors_n = self.read_count("constructor count")?;
        if constructors_n != constructors_total {
            return Err(TlError::ConstructorCountMismatch {
                declared: constructors_n,
                expected: constructors_total,
            });
        }
        for _ in 0..constructors_n {
            let constructor = self.read_combinator(&schema)?;
            check_constructor(&schema, &constructor)?;
            let type_id = constructor.type_id;
            if schema.add_constructor(constructor).is_none() {
                let owner = schema.type_by_id(type_id);
                return Err(TlError::TooManyConstructors(schema.ty(owner).name.clone()));
            }
        }
        check_type_parameters(&schema)?;

        let functions_n = self.read_count("function count")?;
        for _ in 0..functions_n {
            let function = self.read_combinator(&schema)?;
            check_function(&function)?;
            schema.add_function(function);
        }
        self.bb.read_end()?;

        debug!(
            version = schema.version,
            types = schema.types.len(),
            constructors = schema.constructors.len(),
            functions = schema.functions.len(),
            "decoded TL schema"
        );
        Ok(schema)
    }

    fn read_type_header(&mut self) -> Result<TlType, TlError> {
        self.expect_magic("tls_type", TLS_TYPE)?;

        let id = self.read_int()?;
        let name = self.read_string()?;
        let constructors_num = self.read_count("constructor count")?;
        let flags = self.read_int()? & !KNOWN_TYPE_FLAGS;
        if flags != 0 {
            warn!(type_name = %name, flags, "type has non-zero flags");
        }
        let arity = self.read_count("arity")?;
        self.bb.read_i64()?; // unused

        let mut t = TlType::new(id, &name, arity, constructors_num);
        t.flags = flags;
        Ok(t)
    }

    fn read_combinator(&mut self, schema: &Schema) -> Result<Combinator, TlError> {
        self.expect_magic("tls_combinator", TLS_COMBINATOR)?;

        let id = self.read_int()?;
        let name = self.read_string()?;
        let type_id = self.read_int()?;
        let mut var_count = 0;

        let offset = self.bb.index();
        let args = match self.read_int()? {
            TLS_COMBINATOR_LEFT => self.read_args_list(schema, &mut var_count)?,
            TLS_COMBINATOR_LEFT_BUILTIN => Vec::new(),
            found => {
                return Err(TlError::BadMagic { what: "tls_combinator_left", found, offset });
            }
        };

        self.expect_magic("tls_combinator_right", TLS_COMBINATOR_RIGHT_V2)?;
        let result = self.read_type_expr(schema, &mut var_count)?;

        Ok(Combinator { id, name, type_id, var_count, args, result })
    }

    fn read_args_list(&mut self, schema: &Schema, var_count: &mut usize) -> Result<Vec<Arg>, TlError> {
        let (opt_field, has_vars) = arg_flag_bits(self.version);

        let args_num = self.read_count("argument count")?;
        // a corrupt count must not turn into a huge allocation
        let mut args = Vec::with_capacity(args_num.min(self.bb.remaining() / 4));
        for _ in 0..args_num {
            self.expect_magic("tls_arg", TLS_ARG_V2)?;

            let name = self.read_string()?;
            let mut flags = self.read_int()?;

            let is_optional = flags & opt_field != 0;
            flags &= !opt_field;

            let bound_var = if flags & has_vars != 0 {
                flags &= !has_vars;
                Some(self.read_var_num(var_count)?)
            } else {
                None
            };

            let conditional_on = if is_optional {
                let var_num = self.read_count("condition variable")?;
                let bit = self.read_count("condition bit")? as u32;
                Some(Condition { var_num, bit })
            } else {
                None
            };

            let type_ = self.read_type_expr(schema, var_count)?;
            if type_.is_novar() && bound_var.is_none() && conditional_on.is_none() {
                flags |= FLAG_NOVAR;
            }

            args.push(Arg { name, flags, bound_var, conditional_on, type_ });
        }
        Ok(args)
    }

    fn read_expr(&mut self, schema: &Schema, var_count: &mut usize) -> Result<Tree, TlError> {
        let offset = self.bb.index();
        match self.read_int()? {
            TLS_EXPR_NAT => self.read_nat_expr(var_count),
            TLS_EXPR_TYPE => self.read_type_expr(schema, var_count),
            found => Err(TlError::UnknownTreeTag { what: "expression", found, offset }),
        }
    }

    fn read_nat_expr(&mut self, var_count: &mut usize) -> Result<Tree, TlError> {
        let offset = self.bb.index();
        match self.read_int()? {
            TLS_NAT_CONST_OLD | TLS_NAT_CONST => {
                let value = self.read_int()?;
                Ok(Tree::NatConst { value })
            }
            TLS_NAT_VAR => {
                let offset = self.read_int()?;
                let var_num = self.read_var_num(var_count)?;
                Ok(Tree::VarNum { var_num, offset })
            }
            found => Err(TlError::UnknownTreeTag { what: "nat expression", found, offset }),
        }
    }

    fn read_type_expr(&mut self, schema: &Schema, var_count: &mut usize) -> Result<Tree, TlError> {
        let offset = self.bb.index();
        match self.read_int()? {
            TLS_TYPE_VAR => self.read_type_var(var_count),
            TLS_TYPE_EXPR => self.read_type_tree(schema, var_count),
            TLS_ARRAY => self.read_array(schema, var_count),
            found => Err(TlError::UnknownTreeTag { what: "type expression", found, offset }),
        }
    }

    fn read_type_var(&mut self, var_count: &mut usize) -> Result<Tree, TlError> {
        let var_num = self.read_var_num(var_count)?;
        let flags = self.read_int()?;
        if flags & (FLAG_NOVAR | FLAG_BARE) != 0 {
            return Err(TlError::TypeVarFlags { var_num, flags });
        }
        Ok(Tree::VarType { flags, var_num })
    }

    fn read_array(&mut self, schema: &Schema, var_count: &mut usize) -> Result<Tree, TlError> {
        let multiplicity = self.read_nat_expr(var_count)?;
        let args = self.read_args_list(schema, var_count)?;

        let mut flags = FLAG_NOVAR;
        if !multiplicity.is_novar() || args.iter().any(|a| !a.is_novar()) {
            flags &= !FLAG_NOVAR;
        }
        Ok(Tree::Array(TreeArray { flags, multiplicity: Box::new(multiplicity), args }))
    }

    fn read_type_tree(&mut self, schema: &Schema, var_count: &mut usize) -> Result<Tree, TlError> {
        let type_id = self.read_int()?;
        let type_ = schema.find_type_by_id(type_id).ok_or(TlError::UnknownType(type_id))?;
        let mut flags = self.read_int()? | FLAG_NOVAR;
        let arity = self.read_count("arity")?;

        let t = schema.ty(type_);
        if t.arity != arity {
            return Err(TlError::ArityMismatch {
                type_name: t.name.clone(),
                expected:  t.arity,
                found:     arity,
            });
        }

        let mut children = Vec::with_capacity(arity.min(self.bb.remaining() / 4));
        for _ in 0..arity {
            let child = self.read_expr(schema, var_count)?;
            if !child.is_novar() {
                flags &= !FLAG_NOVAR;
            }
            children.push(child);
        }
        Ok(Tree::Type(TreeType { type_, flags, children }))
    }
}

fn check_bound_args(c: &Combinator) -> Result<(), TlError> {
    for a in &c.args {
        if a.bound_var.is_some() && a.type_.as_type().is_none() {
            return Err(TlError::InvalidBoundArg {
                combinator: c.name.clone(),
                arg:        a.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_constructor(schema: &Schema, c: &Combinator) -> Result<(), TlError> {
    let owner = schema.find_type_by_id(c.type_id).ok_or(TlError::UnknownType(c.type_id))?;
    match &c.result {
        Tree::Type(result) if result.type_ == owner => {}
        _ => return Err(TlError::InvalidConstructorResult(c.name.clone())),
    }
    check_bound_args(c)
}

fn check_function(f: &Combinator) -> Result<(), TlError> {
    match f.result {
        Tree::Type(_) | Tree::VarType { .. } => check_bound_args(f),
        _ => Err(TlError::InvalidFunctionResult(f.name.clone())),
    }
}

/// Every constructor of a type must bind parameter `i` the same way, and only
/// through a variable.
fn check_type_parameters(schema: &Schema) -> Result<(), TlError> {
    for r in schema.type_refs() {
        let t = schema.ty(r);
        for slot in 0..t.arity {
            let mut kinds = schema.constructors_of(r).map(|c| match &c.result {
                Tree::Type(result) => match result.children.get(slot) {
                    Some(Tree::VarType { .. }) => Some(true),
                    Some(Tree::VarNum { .. }) => Some(false),
                    _ => None,
                },
                _ => None,
            });
            let first = match kinds.next() {
                Some(kind) => kind,
                None => continue,
            };
            if first.is_none() || kinds.any(|kind| kind != first) {
                return Err(TlError::InconsistentTypeParameter {
                    type_name: t.name.clone(),
                    slot,
                });
            }
        }
    }
    Ok(())
}

/// Encode a `Schema` into the binary form read by [`decode_binary_schema`].
pub fn encode_binary_schema(schema: &Schema) -> Result<Vec<u8>, TlError> {
    let magic = schema_magic(schema.version).ok_or(TlError::UnknownSchemaVersion(schema.version))?;

    let mut writer = SchemaWriter {
        bb:     ByteBufferMut::new(),
        schema,
    };
    let bb = &mut writer.bb;
    bb.write_i32(magic);
    bb.write_i32(0); // date
    bb.write_i32(0); // version

    bb.write_i32(schema.types.len() as i32);
    for t in &schema.types {
        bb.write_i32(TLS_TYPE);
        bb.write_i32(t.id);
        bb.write_string(&t.name)?;
        bb.write_i32(t.constructors_num as i32);
        bb.write_i32(t.flags);
        bb.write_i32(t.arity as i32);
        bb.write_i64(0);
    }

    writer.bb.write_i32(schema.constructors.len() as i32);
    for c in &schema.constructors {
        writer.write_combinator(c)?;
    }

    writer.bb.write_i32(schema.functions.len() as i32);
    for f in &schema.functions {
        writer.write_combinator(f)?;
    }

    Ok(writer.bb.data())
}

struct SchemaWriter<'a> {
    bb:     ByteBufferMut,
    schema: &'a Schema,
}

impl<'a> SchemaWriter<'a> {
    fn write_combinator(&mut self, c: &Combinator) -> Result<(), TlError> {
        self.bb.write_i32(TLS_COMBINATOR);
        self.bb.write_i32(c.id);
        self.bb.write_string(&c.name)?;
        self.bb.write_i32(c.type_id);
        if c.args.is_empty() {
            self.bb.write_i32(TLS_COMBINATOR_LEFT_BUILTIN);
        } else {
            self.bb.write_i32(TLS_COMBINATOR_LEFT);
            self.write_args(&c.args)?;
        }
        self.bb.write_i32(TLS_COMBINATOR_RIGHT_V2);
        self.write_type_expr(&c.result)
    }

    fn write_args(&mut self, args: &[Arg]) -> Result<(), TlError> {
        let (opt_field, has_vars) = arg_flag_bits(self.schema.version);

        self.bb.write_i32(args.len() as i32);
        for a in args {
            self.bb.write_i32(TLS_ARG_V2);
            self.bb.write_string(&a.name)?;

            let mut flags = a.flags & !FLAG_NOVAR;
            if a.conditional_on.is_some() {
                flags |= opt_field;
            }
            if a.bound_var.is_some() {
                flags |= has_vars;
            }
            self.bb.write_i32(flags);

            if let Some(var_num) = a.bound_var {
                self.bb.write_i32(var_num as i32);
            }
            if let Some(cond) = a.conditional_on {
                self.bb.write_i32(cond.var_num as i32);
                self.bb.write_i32(cond.bit as i32);
            }
            self.write_type_expr(&a.type_)?;
        }
        Ok(())
    }

    fn write_expr(&mut self, tree: &Tree) -> Result<(), TlError> {
        match tree {
            Tree::NatConst { .. } | Tree::VarNum { .. } => {
                self.bb.write_i32(TLS_EXPR_NAT);
                self.write_nat_expr(tree)
            }
            _ => {
                self.bb.write_i32(TLS_EXPR_TYPE);
                self.write_type_expr(tree)
            }
        }
    }

    fn write_nat_expr(&mut self, tree: &Tree) -> Result<(), TlError> {
        match tree {
            Tree::NatConst { value } => {
                self.bb.write_i32(TLS_NAT_CONST);
                self.bb.write_i32(*value);
            }
            Tree::VarNum { var_num, offset } => {
                self.bb.write_i32(TLS_NAT_VAR);
                self.bb.write_i32(*offset);
                self.bb.write_i32(*var_num as i32);
            }
            _ => {
                return Err(TlError::MisplacedExpression { expected: "numeric", found: node_name(tree) });
            }
        }
        Ok(())
    }

    fn write_type_expr(&mut self, tree: &Tree) -> Result<(), TlError> {
        match tree {
            Tree::Type(t) => {
                self.bb.write_i32(TLS_TYPE_EXPR);
                self.bb.write_i32(self.schema.ty(t.type_).id);
                self.bb.write_i32(t.flags & !FLAG_NOVAR);
                self.bb.write_i32(t.children.len() as i32);
                for child in &t.children {
                    self.write_expr(child)?;
                }
            }
            Tree::VarType { flags, var_num } => {
                self.bb.write_i32(TLS_TYPE_VAR);
                self.bb.write_i32(*var_num as i32);
                self.bb.write_i32(*flags);
            }
            Tree::Array(a) => {
                self.bb.write_i32(TLS_ARRAY);
                self.write_nat_expr(&a.multiplicity)?;
                self.write_args(&a.args)?;
            }
            Tree::NatConst { .. } | Tree::VarNum { .. } => {
                return Err(TlError::MisplacedExpression { expected: "type", found: node_name(tree) });
            }
        }
        Ok(())
    }
}

fn node_name(tree: &Tree) -> &'static str {
    match tree {
        Tree::Type(_) => "type",
        Tree::NatConst { .. } => "constant",
        Tree::VarType { .. } => "type variable",
        Tree::VarNum { .. } => "numeric variable",
        Tree::Array(_) => "array",
    }
}
