//! Range checks and type conversions
//!
//! Every arithmetic result and every arithmetic cast passes through [`fit`],
//! which applies the configured [`OverflowPolicy`]: `Error` faults, `Wrap`
//! normalizes the value modulo the width of the type's range.

use crate::interpreter::errors::Result;
use crate::runtime::config::OverflowPolicy;
use crate::runtime::ops::OpContext;
use crate::runtime::types::{ArithKind, Range, Type};
use crate::runtime::value::{Data, Number, PointerTarget, Value};

/// Normalize `v` into `[min, max]` by modular wrapping
pub fn wrap(v: i128, min: i128, max: i128) -> i128 {
    let width = max - min + 1;
    min + (v - min).rem_euclid(width)
}

/// Whether `v` lies in the range of `kind`
pub fn in_range(ctx: &OpContext, kind: ArithKind, v: i128) -> bool {
    match ctx.config.limits.get(kind).range {
        Range::Integral { min, max } => (min..=max).contains(&v),
        Range::Floating { .. } => true,
    }
}

/// Apply the overflow policy to an integral value of `kind`
pub fn fit_integral(ctx: &OpContext, kind: ArithKind, v: i128, what: &str) -> Result<i128> {
    let Range::Integral { min, max } = ctx.config.limits.get(kind).range else {
        return Ok(v);
    };
    if (min..=max).contains(&v) {
        return Ok(v);
    }
    match ctx.config.overflow {
        OverflowPolicy::Error => Err(ctx.fault(format!("{} {} {}", what, kind.name(), v))),
        OverflowPolicy::Wrap => Ok(wrap(v, min, max)),
    }
}

/// Convert a number into the payload of `kind`, range-checked
pub fn fit(ctx: &OpContext, kind: ArithKind, n: Number) -> Result<Data> {
    if kind == ArithKind::Bool {
        return Ok(Data::Int(i128::from(!n.is_zero())));
    }
    match ctx.config.limits.get(kind).range {
        Range::Integral { .. } => {
            let v = match n {
                Number::Int(v) => v,
                Number::Float(f) if f.is_finite() => f.trunc() as i128,
                Number::Float(f) => {
                    return Err(ctx.fault(format!("overflow of {} {}", kind.name(), f)));
                }
            };
            Ok(Data::Int(fit_integral(ctx, kind, v, "overflow of")?))
        }
        Range::Floating { max } => {
            let f = n.as_f64();
            if f.is_finite() && f.abs() > max && ctx.config.overflow == OverflowPolicy::Error {
                return Err(ctx.fault(format!("overflow of {} {}", kind.name(), f)));
            }
            let f = if kind == ArithKind::Float { f as f32 as f64 } else { f };
            Ok(Data::Float(f))
        }
    }
}

/// Build a range-checked arithmetic value
pub fn number_value(ctx: &OpContext, kind: ArithKind, n: Number) -> Result<Value> {
    Ok(Value::new(Type::Arithmetic(kind), fit(ctx, kind, n)?))
}

/// Convert `value` to `target`.
///
/// Implicit conversions between data pointers must pass the type oracle's
/// compatibility check; explicit conversions reinterpret any pointer.
pub fn cast(ctx: &OpContext, value: &Value, target: &Type, explicit: bool) -> Result<Value> {
    if &value.ty == target {
        return Ok(value.rvalue());
    }
    let fail = || {
        ctx.fault(format!(
            "cannot convert {} to {}",
            crate::runtime::format::value_string(value),
            target
        ))
    };
    match target {
        Type::Void => Ok(Value::void()),
        Type::Arithmetic(kind) => match (&value.data, value.number()) {
            (_, Some(n)) => number_value(ctx, *kind, n),
            (Data::Pointer(p), None) if *kind == ArithKind::Bool => Ok(Value::bool(!p.is_null())),
            (Data::Pointer(p), None) if explicit && p.is_null() => number_value(ctx, *kind, Number::Int(0)),
            _ => Err(fail()),
        },
        Type::Pointer { .. } => match &value.data {
            Data::Pointer(PointerTarget::Function(_)) => Err(fail()),
            Data::Pointer(p) => {
                let compatible = p.is_null()
                    || value.ty.same_shape(target)
                    || ctx.oracle.is_convertible(&value.ty, target);
                if !explicit && !compatible {
                    return Err(fail());
                }
                Ok(Value::new(target.clone(), Data::Pointer(p.clone())))
            }
            Data::Int(0) if value.ty.is_integral() => Ok(Value::null(target.clone())),
            _ => Err(fail()),
        },
        Type::FunctionPointer(_) => match &value.data {
            Data::Function(function) => Ok(Value::new(
                target.clone(),
                Data::Pointer(PointerTarget::Function(Some(function.clone()))),
            )),
            Data::Pointer(PointerTarget::Function(function)) => Ok(Value::new(
                target.clone(),
                Data::Pointer(PointerTarget::Function(function.clone())),
            )),
            Data::Pointer(p) if p.is_null() => Ok(Value::null(target.clone())),
            Data::Int(0) if value.ty.is_integral() => Ok(Value::null(target.clone())),
            _ => Err(fail()),
        },
        Type::Struct(def) => match &value.ty {
            Type::Struct(source) if source.name == def.name => Ok(value.deep_copy()),
            _ => Err(fail()),
        },
        Type::Function(_) => match &value.data {
            Data::Function(_) => Ok(Value::new(target.clone(), value.data.clone())),
            _ => Err(fail()),
        },
        Type::Dummy => Err(fail()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ops::testing::{with_context, with_policy};

    #[test]
    fn test_wrap_normalizes_into_range() {
        assert_eq!(wrap(128, -128, 127), -128);
        assert_eq!(wrap(-129, -128, 127), 127);
        assert_eq!(wrap(256, 0, 255), 0);
        assert_eq!(wrap(-1, 0, 255), 255);
    }

    #[test]
    fn test_fit_respects_policy() {
        with_context(|ctx| {
            let err = fit(ctx, ArithKind::SignedChar, Number::Int(128)).unwrap_err();
            assert!(err.message.starts_with("overflow of signed char"));
            assert!(matches!(fit(ctx, ArithKind::Int, Number::Float(2.9)), Ok(Data::Int(2))));
            assert!(matches!(fit(ctx, ArithKind::Bool, Number::Int(7)), Ok(Data::Int(1))));
        });
        with_policy(OverflowPolicy::Wrap, |ctx| {
            assert!(matches!(
                fit(ctx, ArithKind::UnsignedChar, Number::Int(300)),
                Ok(Data::Int(44))
            ));
        });
    }

    #[test]
    fn test_implicit_pointer_cast_checks_compatibility() {
        with_context(|ctx| {
            let slot = crate::runtime::value::Slot::new(Value::int(ArithKind::Int, 1));
            let ptr = Value::new(
                Type::pointer_to(Type::INT),
                Data::Pointer(PointerTarget::Normal(Some(crate::runtime::value::Place::Slot(slot)))),
            );
            assert!(cast(ctx, &ptr, &Type::pointer_to(Type::DOUBLE), false).is_err());
            let forced = cast(ctx, &ptr, &Type::pointer_to(Type::DOUBLE), true).unwrap();
            assert_eq!(forced.ty, Type::pointer_to(Type::DOUBLE));
            assert!(cast(ctx, &ptr, &Type::pointer_to(Type::Void), false).is_ok());
        });
    }
}
