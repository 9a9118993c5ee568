use tlgen_schema::*;

use crate::error::TlError;

/// What a free variable of a combinator currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarBinding {
    Unbound,
    /// A type passed through a `!X` argument.
    TypeWitness { arg: String },
    /// A number captured from a field or from a numeric type parameter.
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSlot {
    binding:   VarBinding,
    consulted: bool,
}

/// Free variables of the combinator a single method is generated for.
///
/// Every variable must be bound exactly once, before any use, and used at
/// least once by the time [`VarTable::finish`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarTable {
    combinator: String,
    slots:      Vec<VarSlot>,
}

impl VarTable {
    pub fn new(c: &Combinator) -> VarTable {
        VarTable::with_capacity(&c.name, c.var_count)
    }

    /// A table without variables, for dispatch methods of proxy classes.
    pub fn empty(class_name: &str) -> VarTable {
        VarTable::with_capacity(class_name, 0)
    }

    fn with_capacity(name: &str, var_count: usize) -> VarTable {
        let slot = VarSlot { binding: VarBinding::Unbound, consulted: false };
        VarTable {
            combinator: name.to_owned(),
            slots:      vec![slot; var_count],
        }
    }

    fn error(&self, reason: String) -> TlError {
        TlError::VarBinding {
            combinator: self.combinator.clone(),
            reason,
        }
    }

    fn slot_mut(&mut self, var_num: usize) -> Result<&mut VarSlot, TlError> {
        if var_num >= self.slots.len() {
            let reason = format!("variable {} is out of range ({} declared)", var_num, self.slots.len());
            return Err(self.error(reason));
        }
        Ok(&mut self.slots[var_num])
    }

    fn bind(&mut self, var_num: usize, binding: VarBinding) -> Result<(), TlError> {
        let slot = self.slot_mut(var_num)?;
        if slot.binding != VarBinding::Unbound {
            let reason = format!("variable {} is bound twice", var_num);
            return Err(self.error(reason));
        }
        slot.binding = binding;
        Ok(())
    }

    /// Bind `var_num` to the type carried by the `!X` argument `arg`.
    pub fn declare_witness(&mut self, var_num: usize, arg: &str) -> Result<(), TlError> {
        self.bind(var_num, VarBinding::TypeWitness { arg: arg.to_owned() })
    }

    /// Bind `var_num` to a value that generated code has just stored.
    pub fn store(&mut self, var_num: usize) -> Result<(), TlError> {
        self.bind(var_num, VarBinding::Value)
    }

    /// Record a use of `var_num`; it must already be bound.
    pub fn consult(&mut self, var_num: usize) -> Result<(), TlError> {
        let slot = self.slot_mut(var_num)?;
        if slot.binding == VarBinding::Unbound {
            let reason = format!("variable {} is used before it is bound", var_num);
            return Err(self.error(reason));
        }
        slot.consulted = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn binding(&self, var_num: usize) -> Option<&VarBinding> {
        self.slots.get(var_num).map(|s| &s.binding)
    }

    pub fn is_type_witness(&self, var_num: usize) -> bool {
        matches!(self.binding(var_num), Some(VarBinding::TypeWitness { .. }))
    }

    pub fn is_bound(&self, var_num: usize) -> bool {
        !matches!(self.binding(var_num), None | Some(VarBinding::Unbound))
    }

    /// Bind the numeric parameters of the result type, which the caller of a
    /// fetch or store method supplies.
    pub fn bind_result_params(&mut self, result: &TreeType) -> Result<(), TlError> {
        for child in &result.children {
            if let Tree::VarNum { var_num, .. } = child {
                self.store(*var_num)?;
            }
        }
        Ok(())
    }

    /// Record what reading or writing `arg` needs from the table.
    ///
    /// Call before the field is emitted. `OPT_VAR` arguments are not fields and
    /// are skipped.
    pub fn consult_arg(&mut self, arg: &Arg) -> Result<(), TlError> {
        if arg.flags & FLAG_OPT_VAR != 0 {
            return Ok(());
        }
        if let Some(cond) = arg.conditional_on {
            self.consult(cond.var_num)?;
        }
        match &arg.type_ {
            Tree::VarType { var_num, .. } => {
                if arg.flags & FLAG_EXCL == 0 {
                    let reason = format!("argument {} uses type variable {} without `!`", arg.name, var_num);
                    return Err(self.error(reason));
                }
                self.declare_witness(*var_num, &arg.name)?;
                self.consult(*var_num)
            }
            tree => self.consult_tree(tree),
        }
    }

    /// Record the bound variable of `arg`, once its field has been emitted.
    pub fn bind_arg(&mut self, arg: &Arg) -> Result<(), TlError> {
        match arg.bound_var {
            Some(var_num) if arg.flags & FLAG_OPT_VAR == 0 => self.store(var_num),
            _ => Ok(()),
        }
    }

    pub fn consult_tree(&mut self, tree: &Tree) -> Result<(), TlError> {
        match tree {
            Tree::Type(t) => {
                for child in &t.children {
                    self.consult_tree(child)?;
                }
                Ok(())
            }
            Tree::NatConst { .. } => Ok(()),
            Tree::VarType { var_num, .. } | Tree::VarNum { var_num, .. } => self.consult(*var_num),
            Tree::Array(a) => {
                self.consult_tree(&a.multiplicity)?;
                for b in &a.args {
                    self.consult_tree(&b.type_)?;
                }
                Ok(())
            }
        }
    }

    /// Check that every variable was bound and then used.
    pub fn finish(self) -> Result<(), TlError> {
        for (var_num, slot) in self.slots.iter().enumerate() {
            if slot.binding == VarBinding::Unbound {
                return Err(self.error(format!("variable {} is never bound", var_num)));
            }
            if !slot.consulted {
                return Err(self.error(format!("variable {} is bound but never used", var_num)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combinator(var_count: usize) -> Combinator {
        Combinator {
            id: 1,
            name: "test".to_owned(),
            type_id: 2,
            var_count,
            args: vec![],
            result: Tree::NatConst { value: 0 },
        }
    }

    fn reason(e: TlError) -> String {
        match e {
            TlError::VarBinding { reason, .. } => reason,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_store_then_consult() {
        let mut vars = VarTable::new(&combinator(1));
        vars.store(0).unwrap();
        assert!(vars.is_bound(0));
        assert!(!vars.is_type_witness(0));
        vars.consult(0).unwrap();
        vars.finish().unwrap();
    }

    #[test]
    fn test_consult_before_store() {
        let mut vars = VarTable::new(&combinator(1));
        assert_eq!(reason(vars.consult(0).unwrap_err()), "variable 0 is used before it is bound");
    }

    #[test]
    fn test_bound_twice() {
        let mut vars = VarTable::new(&combinator(1));
        vars.store(0).unwrap();
        assert_eq!(reason(vars.declare_witness(0, "query").unwrap_err()), "variable 0 is bound twice");
    }

    #[test]
    fn test_never_consulted() {
        let mut vars = VarTable::new(&combinator(2));
        vars.store(0).unwrap();
        vars.store(1).unwrap();
        vars.consult(1).unwrap();
        assert_eq!(reason(vars.finish().unwrap_err()), "variable 0 is bound but never used");
    }

    #[test]
    fn test_never_bound() {
        let vars = VarTable::new(&combinator(1));
        assert_eq!(reason(vars.finish().unwrap_err()), "variable 0 is never bound");
    }

    #[test]
    fn test_out_of_range() {
        let mut vars = VarTable::empty("Object");
        assert!(vars.is_empty());
        assert_eq!(reason(vars.store(3).unwrap_err()), "variable 3 is out of range (0 declared)");
    }

    #[test]
    fn test_witness_arg() {
        let query = Arg {
            name:           "query".to_owned(),
            flags:          FLAG_EXCL,
            bound_var:      None,
            conditional_on: None,
            type_:          Tree::VarType { flags: 0, var_num: 0 },
        };
        let mut vars = VarTable::new(&combinator(1));
        vars.consult_arg(&query).unwrap();
        assert_eq!(vars.binding(0), Some(&VarBinding::TypeWitness { arg: "query".to_owned() }));
        vars.finish().unwrap();

        let plain = Arg { flags: 0, ..query };
        let mut vars = VarTable::new(&combinator(1));
        assert_eq!(
            reason(vars.consult_arg(&plain).unwrap_err()),
            "argument query uses type variable 0 without `!`"
        );
    }
}
