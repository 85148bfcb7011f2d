//! Pointer operators
//!
//! Normal pointers hold a single [`Place`]; array pointers hold the backing
//! [`Store`](crate::runtime::value::Store) plus a position that may run past
//! either end until it is dereferenced. Arithmetic and ordering are only
//! defined within one store.

use crate::interpreter::errors::Result;
use crate::parser::ast::BinOp;
use crate::runtime::cast;
use crate::runtime::format::value_string;
use crate::runtime::ops::arithmetic::{comma, write};
use crate::runtime::ops::{Op, OpContext, OperatorRegistry};
use crate::runtime::types::{ArithKind, Type};
use crate::runtime::value::{Data, Number, Place, PointerTarget, Value};

pub fn register(registry: &mut OperatorRegistry) {
    let key = "pointer";
    registry.register(key, Op::Binary(BinOp::Add), |c, l, r| binary(c, BinOp::Add, l, r));
    registry.register(key, Op::Binary(BinOp::Sub), |c, l, r| binary(c, BinOp::Sub, l, r));
    registry.register(key, Op::Binary(BinOp::Eq), |c, l, r| binary(c, BinOp::Eq, l, r));
    registry.register(key, Op::Binary(BinOp::Ne), |c, l, r| binary(c, BinOp::Ne, l, r));
    registry.register(key, Op::Binary(BinOp::Lt), |c, l, r| binary(c, BinOp::Lt, l, r));
    registry.register(key, Op::Binary(BinOp::Le), |c, l, r| binary(c, BinOp::Le, l, r));
    registry.register(key, Op::Binary(BinOp::Gt), |c, l, r| binary(c, BinOp::Gt, l, r));
    registry.register(key, Op::Binary(BinOp::Ge), |c, l, r| binary(c, BinOp::Ge, l, r));
    registry.register(key, Op::Assign, assign);
    registry.register(key, Op::Comma, comma);
    registry.register(key, Op::AddrOf, address_of);
    registry.register(key, Op::Deref, deref);
    registry.register(key, Op::Index, index);
    registry.register(key, Op::Not, |_, l, _| Ok(Value::bool(!l.truthy())));
    registry.register(key, Op::Inc, |c, l, r| step(c, l, r, 1));
    registry.register(key, Op::Dec, |c, l, r| step(c, l, r, -1));
}

/// `&lvalue`: array pointer for an array element, normal pointer otherwise
pub fn address_of(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    if r.is_some() {
        return Err(ctx.unsupported(Op::AddrOf, l, r));
    }
    let place = l.place.as_ref().ok_or_else(|| ctx.not_lvalue(l))?;
    let ty = if l.readonly {
        Type::const_pointer_to(l.ty.clone())
    } else {
        Type::pointer_to(l.ty.clone())
    };
    let target = match place {
        Place::Element { store, index } => PointerTarget::Array {
            store: Some(store.clone()),
            position: element_position(ctx, *index)?,
        },
        place => PointerTarget::Normal(Some(place.clone())),
    };
    Ok(Value::new(ty, Data::Pointer(target)))
}

fn pointee_type(ctx: &OpContext, l: &Value) -> Result<Type> {
    l.ty.pointee()
        .cloned()
        .ok_or_else(|| ctx.fault(format!("pointer ({}) is not a data pointer", value_string(l))))
}

/// Lvalue of the element an array pointer addresses
fn element(ctx: &OpContext, l: &Value, position: i64) -> Result<Value> {
    let Some((store, _)) = l.array() else {
        return Err(ctx.fault("you cannot dereference an uninitialized pointer"));
    };
    let index = usize::try_from(position)
        .ok()
        .filter(|i| *i < store.len())
        .ok_or_else(|| ctx.fault(format!("array index out of bounds: {} of {}", position, store.len())))?;
    let place = Place::Element {
        store: store.clone(),
        index,
    };
    place
        .load()
        .ok_or_else(|| ctx.fault("array index out of bounds"))
}

pub fn deref(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    if r.is_some() {
        return Err(ctx.fault("you cannot multiply a pointer"));
    }
    match l.pointer() {
        Some(PointerTarget::Normal(Some(place))) => place
            .load()
            .ok_or_else(|| ctx.fault("array index out of bounds")),
        Some(PointerTarget::Array {
            store: Some(_),
            position,
        }) => element(ctx, l, *position),
        Some(PointerTarget::Function(Some(function))) => {
            let Type::FunctionPointer(sig) = &l.ty else {
                return Err(ctx.unsupported(Op::Deref, l, None));
            };
            Ok(Value::new(Type::Function(sig.clone()), Data::Function(function.clone())))
        }
        Some(_) => Err(ctx.fault("you cannot dereference an uninitialized pointer")),
        None => Err(ctx.unsupported(Op::Deref, l, None)),
    }
}

/// `p[i]` is `*(p + i)`
fn index(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    let r = r.ok_or_else(|| ctx.unsupported(Op::Index, l, None))?;
    let moved = offset(ctx, l, r, 1)?;
    deref(ctx, &moved, None)
}

/// `p + sign * n`
pub fn offset(ctx: &OpContext, l: &Value, n: &Value, sign: i64) -> Result<Value> {
    let delta = match n.number() {
        Some(Number::Int(v)) if n.ty.is_integral() => i128::from(sign)
            .checked_mul(v)
            .and_then(|d| i64::try_from(d).ok())
            .ok_or_else(|| ctx.fault(ARITHMETIC_OVERFLOW))?,
        _ => return Err(ctx.fault("cannot add non-numeric to an array pointer")),
    };
    match l.pointer() {
        Some(PointerTarget::Array { store, position }) => {
            let ty = decayed(&l.ty);
            Ok(Value::new(
                ty,
                Data::Pointer(PointerTarget::Array {
                    store: store.clone(),
                    position: moved(ctx, *position, delta)?,
                }),
            ))
        }
        Some(PointerTarget::Normal(Some(Place::Element { store, index }))) => Ok(Value::new(
            l.ty.clone(),
            Data::Pointer(PointerTarget::Array {
                store: Some(store.clone()),
                position: moved(ctx, element_position(ctx, *index)?, delta)?,
            }),
        )),
        Some(PointerTarget::Normal(_)) if delta == 0 => Ok(l.rvalue()),
        _ => Err(ctx.fault(format!("{} is not an array pointer type", l.ty))),
    }
}

const ARITHMETIC_OVERFLOW: &str = "pointer arithmetic overflow";

fn moved(ctx: &OpContext, position: i64, delta: i64) -> Result<i64> {
    position
        .checked_add(delta)
        .ok_or_else(|| ctx.fault(ARITHMETIC_OVERFLOW))
}

fn element_position(ctx: &OpContext, index: usize) -> Result<i64> {
    i64::try_from(index).map_err(|_| ctx.fault(ARITHMETIC_OVERFLOW))
}

/// Arithmetic on an array value yields a pointer to its element type
fn decayed(ty: &Type) -> Type {
    match ty {
        Type::Pointer { target, .. } if ty.is_array() => Type::pointer_to((**target).clone()),
        other => other.clone(),
    }
}

/// Store and position of an array pointer, or of a normal pointer to an element
fn array_position(l: &Value) -> Option<(&crate::runtime::value::Store, i64)> {
    match l.pointer()? {
        PointerTarget::Array {
            store: Some(store),
            position,
        } => Some((store, *position)),
        PointerTarget::Normal(Some(Place::Element { store, index })) => {
            Some((store, i64::try_from(*index).ok()?))
        }
        _ => None,
    }
}

pub fn binary(ctx: &OpContext, op: BinOp, l: &Value, r: Option<&Value>) -> Result<Value> {
    let r = r.ok_or_else(|| ctx.unsupported(Op::Binary(op), l, None))?;
    match op {
        BinOp::Add => offset(ctx, l, r, 1),
        BinOp::Sub if r.ty.is_arithmetic() => offset(ctx, l, r, -1),
        BinOp::Sub => match (array_position(l), array_position(r)) {
            (Some((a, i)), Some((b, j))) if a.ptr_eq(b) => {
                cast::number_value(ctx, ArithKind::Int, Number::Int(i128::from(i) - i128::from(j)))
            }
            (Some(_), Some(_)) => Err(ctx.fault(
                "you cannot perform minus on pointers pointing to different arrays",
            )),
            _ => Err(ctx.fault(format!("{} is not an array pointer type", r.ty))),
        },
        BinOp::Eq => Ok(Value::bool(equal(ctx, l, r)?)),
        BinOp::Ne => Ok(Value::bool(!equal(ctx, l, r)?)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            match (array_position(l), array_position(r)) {
                (Some((a, i)), Some((b, j))) if a.ptr_eq(b) => Ok(Value::bool(match op {
                    BinOp::Lt => i < j,
                    BinOp::Le => i <= j,
                    BinOp::Gt => i > j,
                    _ => i >= j,
                })),
                (Some(_), Some(_)) => Err(ctx.fault(
                    "you cannot perform compare on pointers pointing to different arrays",
                )),
                _ => Err(ctx.fault(format!("{} is not an array pointer type", r.ty))),
            }
        }
        _ => Err(ctx.unsupported(Op::Binary(op), l, Some(r))),
    }
}

fn is_void_pointer(ty: &Type) -> bool {
    ty.pointee().is_some_and(Type::is_void)
}

/// Pointer identity: both null, or both addressing the same cell
fn equal(ctx: &OpContext, l: &Value, r: &Value) -> Result<bool> {
    let (lp, rp) = match (l.pointer(), r.pointer(), r.as_int()) {
        (Some(lp), Some(rp), _) => (lp, rp),
        (Some(lp), None, Some(0)) => return Ok(lp.is_null()),
        _ => return Err(ctx.unsupported(Op::Binary(BinOp::Eq), l, Some(r))),
    };
    let comparable = l.ty.same_shape(&r.ty)
        || is_void_pointer(&l.ty)
        || is_void_pointer(&r.ty)
        || lp.is_null()
        || rp.is_null();
    if !comparable {
        return Ok(false);
    }
    Ok(match (lp, rp) {
        (a, b) if a.is_null() || b.is_null() => a.is_null() && b.is_null(),
        (PointerTarget::Function(Some(a)), PointerTarget::Function(Some(b))) => {
            a.name == b.name && a.owner == b.owner
        }
        (PointerTarget::Normal(Some(a)), PointerTarget::Normal(Some(b))) => a.same(b),
        _ => match (array_position(l), array_position(r)) {
            (Some((a, i)), Some((b, j))) => a.ptr_eq(b) && i == j,
            _ => false,
        },
    })
}

/// `=`: the pointer cell takes the converted pointer
fn assign(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    let r = r.ok_or_else(|| ctx.unsupported(Op::Assign, l, None))?;
    ctx.check_writable(l)?;
    if l.ty.is_array() {
        return Err(ctx.fault(format!("array type {} is not assignable", l.ty)));
    }
    let converted = cast::cast(ctx, r, &l.ty, false)?;
    write(ctx, l, converted)
}

/// `++`/`--` move an array pointer by one element
fn step(ctx: &OpContext, l: &Value, r: Option<&Value>, delta: i64) -> Result<Value> {
    let postfix = r.is_some_and(Value::is_dummy);
    ctx.check_writable(l)?;
    let Some(PointerTarget::Array { store, position }) = l.pointer() else {
        return Err(ctx.fault(format!("{} is not an array pointer type", l.ty)));
    };
    if l.ty.is_array() {
        return Err(ctx.fault(format!("array type {} is not assignable", l.ty)));
    }
    let moved = Value::new(
        l.ty.clone(),
        Data::Pointer(PointerTarget::Array {
            store: store.clone(),
            position: moved(ctx, *position, delta)?,
        }),
    );
    let stored = write(ctx, l, moved)?;
    Ok(if postfix { l.rvalue() } else { stored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ops::testing::with_context;
    use crate::runtime::value::{Slot, Store};

    fn int(v: i128) -> Value {
        Value::int(ArithKind::Int, v)
    }

    fn array(values: &[i128]) -> (Store, Value) {
        let store = Store::new(values.iter().map(|v| int(*v)).collect());
        let value = Value::new(
            Type::array_of(Type::INT, values.len()),
            Data::Pointer(PointerTarget::Array {
                store: Some(store.clone()),
                position: 0,
            }),
        );
        (store, value)
    }

    #[test]
    fn test_address_of_and_deref_alias() {
        with_context(|ctx| {
            let place = Place::Slot(Slot::new(int(3)));
            let x = place.load().unwrap();
            let p = address_of(ctx, &x, None).unwrap();
            assert_eq!(p.ty, Type::pointer_to(Type::INT));
            let target = deref(ctx, &p, None).unwrap();
            assert!(target.is_lvalue());
            crate::runtime::ops::arithmetic::assign(ctx, &target, Some(&int(9))).unwrap();
            assert_eq!(place.load().unwrap().as_int(), Some(9));

            let err = address_of(ctx, &int(1), None).unwrap_err();
            assert_eq!(err.message, "1 is not a left value");
        });
    }

    #[test]
    fn test_null_deref_faults() {
        with_context(|ctx| {
            let err = deref(ctx, &Value::null(Type::pointer_to(Type::INT)), None).unwrap_err();
            assert_eq!(err.message, "you cannot dereference an uninitialized pointer");
        });
    }

    #[test]
    fn test_array_pointer_arithmetic() {
        with_context(|ctx| {
            let (_, arr) = array(&[10, 20, 30]);
            let p = offset(ctx, &arr, &int(2), 1).unwrap();
            assert_eq!(p.ty, Type::pointer_to(Type::INT));
            assert_eq!(deref(ctx, &p, None).unwrap().as_int(), Some(30));
            let diff = binary(ctx, BinOp::Sub, &p, Some(&arr)).unwrap();
            assert_eq!(diff.as_int(), Some(2));
            let lt = binary(ctx, BinOp::Lt, &arr, Some(&p)).unwrap();
            assert_eq!(lt.as_int(), Some(1));
            let past = offset(ctx, &arr, &int(3), 1).unwrap();
            assert!(deref(ctx, &past, None).is_err());
            assert_eq!(index(ctx, &arr, Some(&int(1))).unwrap().as_int(), Some(20));
        });
    }

    #[test]
    fn test_cross_array_operations_fault() {
        with_context(|ctx| {
            let (_, a) = array(&[1, 2]);
            let (_, b) = array(&[1, 2]);
            let err = binary(ctx, BinOp::Sub, &a, Some(&b)).unwrap_err();
            assert_eq!(
                err.message,
                "you cannot perform minus on pointers pointing to different arrays"
            );
            assert!(binary(ctx, BinOp::Lt, &a, Some(&b)).is_err());
        });
    }

    #[test]
    fn test_pointer_identity() {
        with_context(|ctx| {
            let (store, arr) = array(&[1, 2]);
            let second = Place::Element { store, index: 1 }.load().unwrap();
            let via_address = address_of(ctx, &second, None).unwrap();
            let via_offset = offset(ctx, &arr, &int(1), 1).unwrap();
            assert!(equal(ctx, &via_address, &via_offset).unwrap());
            assert!(!equal(ctx, &arr, &via_offset).unwrap());

            let null = Value::null(Type::pointer_to(Type::Void));
            assert!(!equal(ctx, &arr, &null).unwrap());
            assert!(equal(ctx, &Value::null(Type::pointer_to(Type::INT)), &null).unwrap());

            let d = Place::Slot(Slot::new(Value::float(ArithKind::Double, 1.0)));
            let pd = address_of(ctx, &d.load().unwrap(), None).unwrap();
            assert!(!equal(ctx, &via_address, &pd).unwrap());
        });
    }

    #[test]
    fn test_pointer_arithmetic_overflow_faults() {
        with_context(|ctx| {
            let (_, arr) = array(&[1, 2]);
            let far = offset(ctx, &arr, &int(i128::from(i64::MAX)), 1).unwrap();
            let err = offset(ctx, &far, &int(1), 1).unwrap_err();
            assert_eq!(err.message, "pointer arithmetic overflow");

            let huge = Value::int(ArithKind::UnsignedLongLong, i128::from(u64::MAX));
            let err = offset(ctx, &arr, &huge, 1).unwrap_err();
            assert_eq!(err.message, "pointer arithmetic overflow");

            let low = offset(ctx, &arr, &int(i128::from(i64::MIN)), 1).unwrap();
            assert!(offset(ctx, &low, &int(1), -1).is_err());
            let diff = binary(ctx, BinOp::Sub, &far, Some(&low));
            assert!(diff.is_err());
        });
    }
}
