//! Operator registry
//!
//! Operators are plain function pointers stored per type-signature key:
//!
//! - `(int)`, `(double)`, ...: one arithmetic type
//! - `arithmetic`, `pointer`, `struct`: category defaults
//! - `pointer_normal`, `pointer_array`, `pointer_function`, `function`,
//!   `struct Name`: specific kinds
//!
//! Lookup walks the left operand's [`Type::dispatch_chain`], most specific key
//! first. A compound assignment without its own entry falls back to the binary
//! operator followed by `=`. The registry is filled once at startup (defaults
//! plus library hooks) and never changes during a run.
//!
//! # Modules
//!
//! - [`arithmetic`]: numeric operators with promotion and range checks
//! - [`pointer`]: address-of, dereference, pointer arithmetic and comparison
//! - [`aggregate`]: struct assignment and member-wise copies
//! - [`function`]: call dispatch through the type oracle

pub mod aggregate;
pub mod arithmetic;
pub mod function;
pub mod pointer;

use crate::interpreter::errors::{Result, RuntimeError};
use crate::parser::ast::{BinOp, NodeInfo};
use crate::runtime::config::Config;
use crate::runtime::format::value_string;
use crate::runtime::types::{FunctionType, Type};
use crate::runtime::value::{FunctionRef, Value};
use crate::typedb::{ArgSig, FunctionMatch};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Operator identity used as the registry key within a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Binary(BinOp),
    /// `op=`
    Compound(BinOp),
    Assign,
    Comma,
    /// Unary `-`
    Neg,
    /// Unary `+`
    Plus,
    Deref,
    AddrOf,
    Not,
    BitNot,
    /// `++`; a dummy right operand marks the postfix form
    Inc,
    Dec,
    Index,
}

pub fn bin_op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Binary(op) => write!(f, "{}", bin_op_symbol(*op)),
            Op::Compound(op) => write!(f, "{}=", bin_op_symbol(*op)),
            Op::Assign => write!(f, "="),
            Op::Comma => write!(f, ","),
            Op::Neg => write!(f, "-"),
            Op::Plus => write!(f, "+"),
            Op::Deref => write!(f, "*"),
            Op::AddrOf => write!(f, "&"),
            Op::Not => write!(f, "!"),
            Op::BitNot => write!(f, "~"),
            Op::Inc => write!(f, "++"),
            Op::Dec => write!(f, "--"),
            Op::Index => write!(f, "[]"),
        }
    }
}

/// Answers the questions operators need from the type-signature engine
pub trait TypeOracle {
    /// Resolve a call of `function` with the given argument signatures
    fn resolve_call(
        &self,
        function: &FunctionRef,
        args: &[ArgSig],
        template_args: &[Type],
    ) -> Result<Option<FunctionMatch>>;

    /// Signature of the only overload of `function`
    fn single_function(&self, function: &FunctionRef) -> Result<Option<Rc<FunctionType>>>;

    fn is_convertible(&self, from: &Type, to: &Type) -> bool;
}

/// Everything an operator implementation may consult
pub struct OpContext<'a> {
    pub config: &'a Config,
    pub oracle: &'a dyn TypeOracle,
    pub node: Option<NodeInfo>,
}

impl OpContext<'_> {
    pub fn fault(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::at(message, self.node)
    }

    pub(crate) fn unsupported(&self, op: Op, l: &Value, r: Option<&Value>) -> RuntimeError {
        match r.filter(|r| !r.is_dummy()) {
            Some(r) => self.fault(format!("{} does not support {} on {}", l.ty, op, r.ty)),
            None => self.fault(format!("{} does not support {} on itself", l.ty, op)),
        }
    }

    pub(crate) fn not_lvalue(&self, l: &Value) -> RuntimeError {
        self.fault(format!("{} is not a left value", value_string(l)))
    }

    /// Faults unless `l` is a writable lvalue
    pub(crate) fn check_writable(&self, l: &Value) -> Result<()> {
        if !l.is_lvalue() {
            return Err(self.not_lvalue(l));
        }
        if l.readonly {
            return Err(self.fault(format!(
                "assignment of read-only variable {}",
                value_string(l)
            )));
        }
        Ok(())
    }
}

pub type OperatorFn = fn(&OpContext, &Value, Option<&Value>) -> Result<Value>;

/// Resolved call: the function to invoke (with its receiver) and how to bind
/// each argument
#[derive(Debug, Clone)]
pub struct CallTarget {
    pub function: FunctionRef,
    pub found: FunctionMatch,
}

pub type CallFn = fn(&OpContext, &Value, &[ArgSig], &[Type]) -> Result<CallTarget>;

#[derive(Default, Clone)]
pub struct OperatorTable {
    operators: FxHashMap<Op, OperatorFn>,
    call: Option<CallFn>,
}

#[derive(Default, Clone)]
pub struct OperatorRegistry {
    tables: FxHashMap<String, OperatorTable>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin operator set
    pub fn with_defaults() -> Self {
        let mut registry = OperatorRegistry::new();
        arithmetic::register(&mut registry);
        pointer::register(&mut registry);
        aggregate::register(&mut registry);
        function::register(&mut registry);
        registry
    }

    pub fn register(&mut self, key: &str, op: Op, f: OperatorFn) {
        self.tables
            .entry(key.to_string())
            .or_default()
            .operators
            .insert(op, f);
    }

    pub fn register_call(&mut self, key: &str, f: CallFn) {
        self.tables.entry(key.to_string()).or_default().call = Some(f);
    }

    pub fn lookup(&self, ty: &Type, op: Op) -> Option<OperatorFn> {
        ty.dispatch_chain()
            .iter()
            .find_map(|key| self.tables.get(key)?.operators.get(&op).copied())
    }

    fn lookup_call(&self, ty: &Type) -> Option<CallFn> {
        ty.dispatch_chain()
            .iter()
            .find_map(|key| self.tables.get(key)?.call)
    }

    /// Apply `op` to `l` (and `r` for binary operators)
    pub fn apply(&self, ctx: &OpContext, op: Op, l: &Value, r: Option<&Value>) -> Result<Value> {
        if let Some(f) = self.lookup(&l.ty, op) {
            return f(ctx, l, r);
        }
        if let Op::Compound(bin) = op {
            let value = self.apply(ctx, Op::Binary(bin), l, r)?;
            return self.apply(ctx, Op::Assign, l, Some(&value));
        }
        Err(ctx.unsupported(op, l, r))
    }

    /// Resolve the `()` operator of `callee`
    pub fn call(
        &self,
        ctx: &OpContext,
        callee: &Value,
        args: &[ArgSig],
        template_args: &[Type],
    ) -> Result<CallTarget> {
        match self.lookup_call(&callee.ty) {
            Some(f) => f(ctx, callee, args, template_args),
            None => Err(ctx.fault(format!("{} does not support ()", callee.ty))),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::runtime::config::OverflowPolicy;
    use crate::runtime::types::LimitsTable;
    use crate::typedb::TypeDb;

    /// Oracle backed by a bare type database with no functions
    pub struct PlainOracle(pub TypeDb);

    impl TypeOracle for PlainOracle {
        fn resolve_call(
            &self,
            _function: &FunctionRef,
            _args: &[ArgSig],
            _template_args: &[Type],
        ) -> Result<Option<FunctionMatch>> {
            Ok(None)
        }

        fn single_function(&self, _function: &FunctionRef) -> Result<Option<Rc<FunctionType>>> {
            Ok(None)
        }

        fn is_convertible(&self, from: &Type, to: &Type) -> bool {
            self.0.is_convertible(from, to)
        }
    }

    pub fn with_policy<R>(policy: OverflowPolicy, f: impl FnOnce(&OpContext) -> R) -> R {
        let config = Config::default().with_overflow(policy);
        let oracle = PlainOracle(TypeDb::with_limits(LimitsTable::default()));
        let ctx = OpContext {
            config: &config,
            oracle: &oracle,
            node: None,
        };
        f(&ctx)
    }

    pub fn with_context<R>(f: impl FnOnce(&OpContext) -> R) -> R {
        with_policy(OverflowPolicy::Error, f)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::with_context;
    use super::*;
    use crate::runtime::types::ArithKind;
    use crate::runtime::value::{Place, Slot};

    #[test]
    fn test_dispatch_falls_back_to_category() {
        let registry = OperatorRegistry::with_defaults();
        assert!(registry.lookup(&Type::INT, Op::Binary(BinOp::Add)).is_some());
        assert!(registry.lookup(&Type::pointer_to(Type::INT), Op::Deref).is_some());
        assert!(registry.lookup(&Type::Void, Op::Binary(BinOp::Add)).is_none());
    }

    #[test]
    fn test_specific_entry_overrides_category() {
        fn always_seven(_: &OpContext, _: &Value, _: Option<&Value>) -> Result<Value> {
            Ok(Value::int(ArithKind::Int, 7))
        }
        let mut registry = OperatorRegistry::with_defaults();
        registry.register("(short)", Op::Binary(BinOp::Add), always_seven);
        with_context(|ctx| {
            let short = Value::int(ArithKind::Short, 1);
            let sum = registry
                .apply(ctx, Op::Binary(BinOp::Add), &short, Some(&short))
                .unwrap();
            assert_eq!(sum.as_int(), Some(7));
            let int = Value::int(ArithKind::Int, 1);
            let sum = registry.apply(ctx, Op::Binary(BinOp::Add), &int, Some(&int)).unwrap();
            assert_eq!(sum.as_int(), Some(2));
        });
    }

    #[test]
    fn test_compound_assignment_falls_back_to_op_then_assign() {
        let registry = OperatorRegistry::with_defaults();
        with_context(|ctx| {
            let place = Place::Slot(Slot::new(Value::int(ArithKind::Int, 5)));
            let target = place.load().unwrap();
            let result = registry
                .apply(ctx, Op::Compound(BinOp::Mul), &target, Some(&Value::int(ArithKind::Int, 3)))
                .unwrap();
            assert_eq!(result.as_int(), Some(15));
            assert_eq!(place.load().unwrap().as_int(), Some(15));
        });
    }

    #[test]
    fn test_unsupported_operator_message() {
        let registry = OperatorRegistry::with_defaults();
        with_context(|ctx| {
            let err = registry
                .apply(ctx, Op::Binary(BinOp::Add), &Value::void(), Some(&Value::void()))
                .unwrap_err();
            assert_eq!(err.message, "void does not support + on void");
        });
    }
}
