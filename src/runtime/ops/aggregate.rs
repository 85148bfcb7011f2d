//! Struct operators
//!
//! Structs support assignment (member-wise deep copy), address-of and the
//! comma operator. Member access is resolved by the evaluator since it needs
//! the member name rather than a second value.

use crate::interpreter::errors::Result;
use crate::runtime::ops::arithmetic::comma;
use crate::runtime::ops::{pointer, Op, OpContext, OperatorRegistry};
use crate::runtime::types::Type;
use crate::runtime::value::{Place, Value};

pub fn register(registry: &mut OperatorRegistry) {
    registry.register("struct", Op::Assign, assign);
    registry.register("struct", Op::Comma, comma);
    registry.register("struct", Op::AddrOf, pointer::address_of);
    registry.register("void", Op::Comma, comma);
}

fn assign(ctx: &OpContext, l: &Value, r: Option<&Value>) -> Result<Value> {
    let r = r.ok_or_else(|| ctx.unsupported(Op::Assign, l, None))?;
    ctx.check_writable(l)?;
    match (&l.ty, &r.ty) {
        (Type::Struct(a), Type::Struct(b)) if a.name == b.name => {
            let (Some(target), Some(source)) = (l.struct_store(), r.struct_store()) else {
                return Err(ctx.unsupported(Op::Assign, l, Some(r)));
            };
            if target.ptr_eq(source) {
                return Ok(l.clone());
            }
            // copy into the existing store so pointers to members stay valid;
            // members keep their own readonly flags
            for (index, (new, old)) in source.values().iter().zip(target.values()).enumerate() {
                let place = Place::Member {
                    store: target.clone(),
                    index,
                };
                place.init(new.deep_copy().readonly(old.readonly));
            }
            Ok(l.clone())
        }
        _ => Err(ctx.unsupported(Op::Assign, l, Some(r))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ops::testing::with_context;
    use crate::runtime::types::{ArithKind, MemberType, StructType};
    use crate::runtime::value::{Data, Slot, Store};
    use std::rc::Rc;

    fn point(x: i128, y: i128) -> Value {
        let def = Rc::new(StructType {
            name: "Point".to_string(),
            members: vec![
                MemberType {
                    name: "x".to_string(),
                    ty: Type::INT,
                    readonly: false,
                    default: None,
                },
                MemberType {
                    name: "y".to_string(),
                    ty: Type::INT,
                    readonly: false,
                    default: None,
                },
            ],
        });
        Value::new(
            Type::Struct(def),
            Data::Struct(Store::new(vec![
                Value::int(ArithKind::Int, x),
                Value::int(ArithKind::Int, y),
            ])),
        )
    }

    #[test]
    fn test_struct_assignment_copies() {
        with_context(|ctx| {
            let source_place = Place::Slot(Slot::new(point(1, 2)));
            let target_place = Place::Slot(Slot::new(point(0, 0)));
            let source = source_place.load().unwrap();
            assign(ctx, &target_place.load().unwrap(), Some(&source)).unwrap();

            let copied = target_place.load().unwrap();
            let store = copied.struct_store().unwrap();
            assert_eq!(store.get(0).unwrap().as_int(), Some(1));
            assert!(!store.ptr_eq(source.struct_store().unwrap()));
        });
    }
}
