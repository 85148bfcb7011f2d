//! Function values and calls
//!
//! A function value names an overload set (`name` within `owner`) and may
//! carry a bound receiver. `()` resolves the concrete overload through the
//! [`TypeOracle`](crate::runtime::ops::TypeOracle) using the argument
//! signatures; the evaluator then binds arguments and runs the body.

use crate::interpreter::errors::Result;
use crate::runtime::ops::arithmetic::comma;
use crate::runtime::ops::{CallTarget, Op, OpContext, OperatorRegistry};
use crate::runtime::types::Type;
use crate::runtime::value::{Data, FunctionRef, PointerTarget, Value};
use crate::typedb::ArgSig;

pub fn register(registry: &mut OperatorRegistry) {
    registry.register_call("function", call_function);
    registry.register_call("pointer_function", call_pointer);
    registry.register("function", Op::AddrOf, address_of);
    registry.register("function", Op::Comma, comma);
}

fn resolve(
    ctx: &OpContext,
    function: &FunctionRef,
    args: &[ArgSig],
    template_args: &[Type],
) -> Result<CallTarget> {
    match ctx.oracle.resolve_call(function, args, template_args)? {
        Some(found) => Ok(CallTarget {
            function: function.clone(),
            found,
        }),
        None => {
            let listing: Vec<String> = args.iter().map(|a| a.ty.to_string()).collect();
            Err(ctx.fault(format!(
                "no matching function for call to '{}({})'",
                function.name,
                listing.join(", ")
            )))
        }
    }
}

fn call_function(
    ctx: &OpContext,
    callee: &Value,
    args: &[ArgSig],
    template_args: &[Type],
) -> Result<CallTarget> {
    match &callee.data {
        Data::Function(function) => resolve(ctx, function, args, template_args),
        _ => Err(ctx.fault(format!("{} does not support ()", callee.ty))),
    }
}

fn call_pointer(
    ctx: &OpContext,
    callee: &Value,
    args: &[ArgSig],
    template_args: &[Type],
) -> Result<CallTarget> {
    match &callee.data {
        Data::Pointer(PointerTarget::Function(Some(function))) => {
            resolve(ctx, function, args, template_args)
        }
        Data::Pointer(PointerTarget::Function(None)) => {
            Err(ctx.fault("you cannot call a null function pointer"))
        }
        _ => Err(ctx.fault(format!(
            "pointer target({}) is not a function",
            crate::runtime::format::value_string(callee)
        ))),
    }
}

/// `&f`: pointer to the single overload of `f`
fn address_of(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    if r.is_some() {
        return Err(ctx.fault("you cannot cast bitwise and on function"));
    }
    let Data::Function(function) = &l.data else {
        return Err(ctx.unsupported(Op::AddrOf, l, None));
    };
    match ctx.oracle.single_function(function)? {
        Some(sig) => Ok(Value::new(
            Type::FunctionPointer(sig),
            Data::Pointer(PointerTarget::Function(Some(function.clone()))),
        )),
        None => Err(ctx.fault(format!("undefined identifier {}", function.name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ops::testing::with_context;
    use crate::runtime::types::FunctionType;
    use std::rc::Rc;

    #[test]
    fn test_null_function_pointer_call_faults() {
        with_context(|ctx| {
            let sig = Rc::new(FunctionType::new(Type::INT, vec![]));
            let null = Value::null(Type::FunctionPointer(sig));
            let err = call_pointer(ctx, &null, &[], &[]).unwrap_err();
            assert_eq!(err.message, "you cannot call a null function pointer");
        });
    }

    #[test]
    fn test_unresolved_call_reports_arguments() {
        with_context(|ctx| {
            let f = Value::new(Type::Void, Data::Function(FunctionRef::new("f", "global")));
            let err = call_function(ctx, &f, &[ArgSig::rvalue(Type::INT)], &[]).unwrap_err();
            assert_eq!(err.message, "no matching function for call to 'f(int)'");
        });
    }
}
