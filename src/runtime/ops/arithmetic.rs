//! Numeric operators
//!
//! Operands narrower than `int` (and `bool`) are promoted to `int` before
//! arithmetic; the result type is then the higher-ranked operand type.
//! Relational and equality operators yield `bool`. Shifts keep the left
//! operand's type. Integral `/` rounds toward negative infinity.

use crate::interpreter::errors::Result;
use crate::parser::ast::BinOp;
use crate::runtime::cast::{self, fit, fit_integral, number_value};
use crate::runtime::config::OverflowPolicy;
use crate::runtime::format::value_string;
use crate::runtime::ops::{pointer, Op, OpContext, OperatorRegistry};
use crate::runtime::types::{promote, ArithKind, Range, Type};
use crate::runtime::value::{Number, Value};

pub fn register(registry: &mut OperatorRegistry) {
    let key = "arithmetic";
    registry.register(key, Op::Binary(BinOp::Add), |c, l, r| binary(c, BinOp::Add, l, r));
    registry.register(key, Op::Binary(BinOp::Sub), |c, l, r| binary(c, BinOp::Sub, l, r));
    registry.register(key, Op::Binary(BinOp::Mul), |c, l, r| binary(c, BinOp::Mul, l, r));
    registry.register(key, Op::Binary(BinOp::Div), |c, l, r| binary(c, BinOp::Div, l, r));
    registry.register(key, Op::Binary(BinOp::Mod), |c, l, r| binary(c, BinOp::Mod, l, r));
    registry.register(key, Op::Binary(BinOp::BitAnd), |c, l, r| binary(c, BinOp::BitAnd, l, r));
    registry.register(key, Op::Binary(BinOp::BitOr), |c, l, r| binary(c, BinOp::BitOr, l, r));
    registry.register(key, Op::Binary(BinOp::BitXor), |c, l, r| binary(c, BinOp::BitXor, l, r));
    registry.register(key, Op::Binary(BinOp::Shl), |c, l, r| binary(c, BinOp::Shl, l, r));
    registry.register(key, Op::Binary(BinOp::Shr), |c, l, r| binary(c, BinOp::Shr, l, r));
    registry.register(key, Op::Binary(BinOp::Eq), |c, l, r| binary(c, BinOp::Eq, l, r));
    registry.register(key, Op::Binary(BinOp::Ne), |c, l, r| binary(c, BinOp::Ne, l, r));
    registry.register(key, Op::Binary(BinOp::Lt), |c, l, r| binary(c, BinOp::Lt, l, r));
    registry.register(key, Op::Binary(BinOp::Le), |c, l, r| binary(c, BinOp::Le, l, r));
    registry.register(key, Op::Binary(BinOp::Gt), |c, l, r| binary(c, BinOp::Gt, l, r));
    registry.register(key, Op::Binary(BinOp::Ge), |c, l, r| binary(c, BinOp::Ge, l, r));
    registry.register(key, Op::Assign, assign);
    registry.register(key, Op::Comma, comma);
    registry.register(key, Op::Neg, negate);
    registry.register(key, Op::Plus, |_, l, _| Ok(l.rvalue()));
    registry.register(key, Op::Not, not);
    registry.register(key, Op::BitNot, bit_not);
    registry.register(key, Op::Inc, |c, l, r| step(c, l, r, 1));
    registry.register(key, Op::Dec, |c, l, r| step(c, l, r, -1));
    registry.register(key, Op::AddrOf, pointer::address_of);
}

/// Kind used for arithmetic on an operand: narrow integers become `int`
fn promoted(ctx: &OpContext, kind: ArithKind) -> ArithKind {
    let limits = &ctx.config.limits;
    if kind.is_integral() && limits.rank(kind) < limits.rank(ArithKind::Int) {
        ArithKind::Int
    } else {
        kind
    }
}

fn operands(ctx: &OpContext, op: BinOp, l: &Value, r: Option<&Value>) -> Result<(ArithKind, Number, ArithKind, Number)> {
    let unsupported = || ctx.unsupported(Op::Binary(op), l, r);
    let r = r.ok_or_else(unsupported)?;
    match (l.ty.arith(), l.number(), r.ty.arith(), r.number()) {
        (Some(lk), Some(ln), Some(rk), Some(rn)) => Ok((lk, ln, rk, rn)),
        _ => Err(unsupported()),
    }
}

fn integral(ctx: &OpContext, op: BinOp, l: &Value, r: &Value, n: Number) -> Result<i128> {
    match n {
        Number::Int(v) => Ok(v),
        Number::Float(_) => Err(ctx.unsupported(Op::Binary(op), l, Some(r))),
    }
}

pub fn binary(ctx: &OpContext, op: BinOp, l: &Value, r: Option<&Value>) -> Result<Value> {
    // `n + p` is `p + n`
    if let (BinOp::Add, Some(r)) = (op, r) {
        if r.ty.is_pointer() && l.ty.is_integral() {
            return pointer::offset(ctx, r, l, 1);
        }
    }
    if let (BinOp::Eq | BinOp::Ne, Some(r)) = (op, r) {
        if r.ty.is_pointer() {
            return pointer::binary(ctx, op, r, Some(l));
        }
    }
    let (lk, ln, rk, rn) = operands(ctx, op, l, r)?;
    let rv = r.ok_or_else(|| ctx.unsupported(Op::Binary(op), l, r))?;

    if matches!(op, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge) {
        let ordering = match (ln, rn) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        };
        let result = match (op, ordering) {
            (BinOp::Ne, None) => true,
            (_, None) => false,
            (BinOp::Eq, Some(o)) => o.is_eq(),
            (BinOp::Ne, Some(o)) => o.is_ne(),
            (BinOp::Lt, Some(o)) => o.is_lt(),
            (BinOp::Le, Some(o)) => o.is_le(),
            (BinOp::Gt, Some(o)) => o.is_gt(),
            _ => ordering.is_some_and(|o| o.is_ge()),
        };
        return Ok(Value::bool(result));
    }

    if matches!(op, BinOp::Shl | BinOp::Shr) {
        let kind = if lk == ArithKind::Bool { ArithKind::Int } else { lk };
        let a = integral(ctx, op, l, rv, ln)?;
        let b = integral(ctx, op, l, rv, rn)?;
        if !(0..128).contains(&b) {
            return Err(ctx.fault(format!("invalid shift count {}", b)));
        }
        let shifted = if op == BinOp::Shl {
            match a.checked_mul(1i128 << b) {
                Some(v) => v,
                None if ctx.config.overflow == OverflowPolicy::Wrap => a.wrapping_shl(b as u32),
                None => return Err(ctx.fault(format!("overflow of {} {} << {}", kind.name(), a, b))),
            }
        } else {
            a >> b
        };
        return number_value(ctx, kind, Number::Int(shifted));
    }

    let kind = promote(&ctx.config.limits, promoted(ctx, lk), promoted(ctx, rk));
    if kind.is_float() {
        let (a, b) = (ln.as_f64(), rn.as_f64());
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            _ => return Err(ctx.unsupported(Op::Binary(op), l, r)),
        };
        return number_value(ctx, kind, Number::Float(result));
    }

    let a = integral(ctx, op, l, rv, ln)?;
    let b = integral(ctx, op, l, rv, rn)?;
    let overflow = || ctx.fault(format!("overflow of {} {} {} {}", kind.name(), a, crate::runtime::ops::bin_op_symbol(op), b));
    let result = match op {
        BinOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinOp::Mul => match a.checked_mul(b) {
            Some(v) => v,
            None if ctx.config.overflow == OverflowPolicy::Wrap => a.wrapping_mul(b),
            None => return Err(overflow()),
        },
        BinOp::Div => {
            if b == 0 {
                return Err(ctx.fault("division by zero"));
            }
            floor_div(a, b)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(ctx.fault("division by zero"));
            }
            a % b
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        _ => return Err(ctx.unsupported(Op::Binary(op), l, r)),
    };
    number_value(ctx, kind, Number::Int(result))
}

pub fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// `=`: stores `r` converted to the target's type
pub fn assign(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    let r = r.ok_or_else(|| ctx.unsupported(Op::Assign, l, None))?;
    ctx.check_writable(l)?;
    let converted = cast::cast(ctx, r, &l.ty, false)?;
    write(ctx, l, converted)
}

/// Store into the lvalue's place and return the refreshed lvalue
pub(crate) fn write(ctx: &OpContext, l: &Value, value: Value) -> Result<Value> {
    let place = l.place.as_ref().ok_or_else(|| ctx.not_lvalue(l))?;
    if !place.store(value) {
        return Err(ctx.fault("array index out of bounds"));
    }
    place.load().ok_or_else(|| ctx.fault("array index out of bounds"))
}

pub fn comma(_: &OpContext, _: &Value, r: Option<&Value>) -> Result<Value> {
    Ok(r.map_or_else(Value::void, Value::clone))
}

fn negate(ctx: &OpContext, l: &Value, _: Option<&Value>) -> Result<Value> {
    let kind = l.ty.arith().ok_or_else(|| ctx.unsupported(Op::Neg, l, None))?;
    match l.number() {
        Some(Number::Float(v)) => number_value(ctx, kind, Number::Float(-v)),
        Some(Number::Int(v)) => {
            let kind = promoted(ctx, kind);
            let kind = if v > 0 && kind.is_unsigned() {
                kind.signed_counterpart()
            } else {
                kind
            };
            number_value(ctx, kind, Number::Int(-v))
        }
        None => Err(ctx.unsupported(Op::Neg, l, None)),
    }
}

fn not(ctx: &OpContext, l: &Value, _: Option<&Value>) -> Result<Value> {
    match l.number() {
        Some(n) => Ok(Value::bool(n.is_zero())),
        None => Err(ctx.unsupported(Op::Not, l, None)),
    }
}

fn bit_not(ctx: &OpContext, l: &Value, _: Option<&Value>) -> Result<Value> {
    match (l.ty.arith(), l.number()) {
        (Some(kind), Some(Number::Int(v))) => {
            let kind = promote(&ctx.config.limits, promoted(ctx, kind), ArithKind::Int);
            let result = match ctx.config.limits.get(kind).range {
                Range::Integral { min: 0, max } => max - v,
                _ => !v,
            };
            number_value(ctx, kind, Number::Int(result))
        }
        _ => Err(ctx.unsupported(Op::BitNot, l, None)),
    }
}

/// `++`/`--`; a dummy right operand selects the postfix form
fn step(ctx: &OpContext, l: &Value, r: Option<&Value>, delta: i128) -> Result<Value> {
    let postfix = r.is_some_and(Value::is_dummy);
    let (increment, position) = (delta > 0, if postfix { "post" } else { "pre" });
    let what = format!(
        "overflow during {}-{}",
        position,
        if increment { "increment" } else { "decrement" }
    );
    let kind = match (l.ty.arith(), l.number()) {
        (Some(kind), Some(_)) => kind,
        _ => {
            let verb = if increment { "increment" } else { "decrement" };
            return Err(ctx.fault(format!("{} does not support {}", l.ty, verb)));
        }
    };
    ctx.check_writable(l)?;

    let updated = match l.number() {
        Some(Number::Float(v)) => fit(ctx, kind, Number::Float(v + delta as f64))?,
        Some(Number::Int(v)) => {
            let next = v + delta;
            if !cast::in_range(ctx, kind, next) && ctx.config.overflow == OverflowPolicy::Error {
                return Err(ctx.fault(format!("{} {}", what, value_string(l))));
            }
            crate::runtime::value::Data::Int(fit_integral(ctx, kind, next, &what)?)
        }
        None => return Err(ctx.unsupported(if increment { Op::Inc } else { Op::Dec }, l, None)),
    };
    let stored = write(ctx, l, Value::new(Type::Arithmetic(kind), updated))?;
    Ok(if postfix { l.rvalue() } else { stored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ops::testing::{with_context, with_policy};
    use crate::runtime::value::{Place, Slot};

    fn int(v: i128) -> Value {
        Value::int(ArithKind::Int, v)
    }

    fn lvalue(value: Value) -> (Place, Value) {
        let place = Place::Slot(Slot::new(value));
        let loaded = place.load().unwrap();
        (place, loaded)
    }

    #[test]
    fn test_integral_division_floors() {
        with_context(|ctx| {
            let q = binary(ctx, BinOp::Div, &int(-7), Some(&int(2))).unwrap();
            assert_eq!(q.as_int(), Some(-4));
            let q = binary(ctx, BinOp::Div, &int(7), Some(&int(2))).unwrap();
            assert_eq!(q.as_int(), Some(3));
            let err = binary(ctx, BinOp::Mod, &int(1), Some(&int(0))).unwrap_err();
            assert_eq!(err.message, "division by zero");
        });
    }

    #[test]
    fn test_promotion_of_result_type() {
        with_context(|ctx| {
            let sum = binary(ctx, BinOp::Add, &int(1), Some(&Value::float(ArithKind::Double, 0.5))).unwrap();
            assert_eq!(sum.ty, Type::DOUBLE);
            let c = Value::int(ArithKind::Char, 100);
            let sum = binary(ctx, BinOp::Add, &c, Some(&c)).unwrap();
            assert_eq!(sum.ty, Type::INT);
            assert_eq!(sum.as_int(), Some(200));
            let cmp = binary(ctx, BinOp::Lt, &int(1), Some(&int(2))).unwrap();
            assert_eq!(cmp.ty, Type::BOOL);
            let shifted = binary(ctx, BinOp::Shl, &Value::int(ArithKind::Short, 1), Some(&int(3))).unwrap();
            assert_eq!(shifted.ty, Type::Arithmetic(ArithKind::Short));
        });
    }

    #[test]
    fn test_overflow_policy_on_results() {
        with_context(|ctx| {
            let max = int(i32::MAX as i128);
            assert!(binary(ctx, BinOp::Add, &max, Some(&int(1))).is_err());
        });
        with_policy(OverflowPolicy::Wrap, |ctx| {
            let max = int(i32::MAX as i128);
            let wrapped = binary(ctx, BinOp::Add, &max, Some(&int(1))).unwrap();
            assert_eq!(wrapped.as_int(), Some(i32::MIN as i128));
        });
    }

    #[test]
    fn test_unary_minus_and_bit_not() {
        with_context(|ctx| {
            let u = Value::int(ArithKind::Unsigned, 5);
            let negated = negate(ctx, &u, None).unwrap();
            assert_eq!(negated.ty, Type::INT);
            assert_eq!(negated.as_int(), Some(-5));
            let flipped = bit_not(ctx, &Value::int(ArithKind::Char, 0), None).unwrap();
            assert_eq!(flipped.ty, Type::INT);
            assert_eq!(flipped.as_int(), Some(-1));
            assert_eq!(not(ctx, &int(3), None).unwrap().ty, Type::BOOL);
        });
    }

    #[test]
    fn test_increment_overflow_error_and_wrap() {
        let (_, c) = lvalue(Value::int(ArithKind::SignedChar, 127));
        with_context(|ctx| {
            let err = step(ctx, &c, Some(&Value::dummy()), 1).unwrap_err();
            assert!(err.message.starts_with("overflow during post-increment"));
        });
        let (place, c) = lvalue(Value::int(ArithKind::SignedChar, 127));
        with_policy(OverflowPolicy::Wrap, |ctx| {
            let result = step(ctx, &c, None, 1).unwrap();
            assert_eq!(result.as_int(), Some(-128));
        });
        assert_eq!(place.load().unwrap().as_int(), Some(-128));
    }

    #[test]
    fn test_postfix_returns_previous_value() {
        let (place, a) = lvalue(int(5));
        with_context(|ctx| {
            let old = step(ctx, &a, Some(&Value::dummy()), 1).unwrap();
            assert_eq!(old.as_int(), Some(5));
            assert!(!old.is_lvalue());
        });
        assert_eq!(place.load().unwrap().as_int(), Some(6));
    }

    #[test]
    fn test_assign_checks_lvalue_and_readonly() {
        with_context(|ctx| {
            let err = assign(ctx, &int(1), Some(&int(2))).unwrap_err();
            assert_eq!(err.message, "1 is not a left value");
            let (_, constant) = lvalue(int(1).readonly(true));
            let err = assign(ctx, &constant, Some(&int(2))).unwrap_err();
            assert_eq!(err.message, "assignment of read-only variable 1");
            let (place, target) = lvalue(int(1));
            let stored = assign(ctx, &target, Some(&Value::float(ArithKind::Double, 2.7))).unwrap();
            assert_eq!(stored.ty, Type::INT);
            assert_eq!(place.load().unwrap().as_int(), Some(2));
        });
    }
}
