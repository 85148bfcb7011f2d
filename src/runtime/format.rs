//! Human-readable value strings
//!
//! Used in fault messages and by the variable listing. Nested pointers and
//! aggregates are printed to a bounded depth so self-referencing structures
//! terminate.

use crate::runtime::types::{ArithKind, Type};
use crate::runtime::value::{Data, PointerTarget, Value};

const MAX_DEPTH: usize = 3;

pub fn value_string(value: &Value) -> String {
    render(value, MAX_DEPTH)
}

/// Contents of a char array up to its terminator
pub fn char_array_string(value: &Value) -> Option<String> {
    let (store, position) = value.array()?;
    let element = value.ty.pointee()?;
    if !element.arith().is_some_and(ArithKind::is_char) {
        return None;
    }
    let start = usize::try_from(position).ok()?;
    let text = store
        .values()
        .iter()
        .skip(start)
        .map_while(|v| v.as_int().filter(|c| *c != 0))
        .filter_map(|c| u32::try_from(c).ok().and_then(char::from_u32))
        .collect();
    Some(text)
}

fn render(value: &Value, depth: usize) -> String {
    match (&value.ty, &value.data) {
        (Type::Arithmetic(ArithKind::Bool), Data::Int(v)) => (*v != 0).to_string(),
        (Type::Arithmetic(kind), Data::Int(v)) if kind.is_char() => {
            match u32::try_from(*v).ok().and_then(char::from_u32) {
                Some(c) if !c.is_control() => format!("'{}'", c),
                _ => v.to_string(),
            }
        }
        (_, Data::Int(v)) => v.to_string(),
        (_, Data::Float(v)) => format!("{:?}", v),
        (_, Data::Void) => "void".to_string(),
        (_, Data::Function(function)) => function.name.to_string(),
        (ty, Data::Pointer(target)) if ty.is_array() => {
            if let Some(text) = char_array_string(value) {
                return format!("{:?}", text);
            }
            match target {
                PointerTarget::Array { store: Some(store), .. } if depth > 0 => {
                    let items: Vec<String> =
                        store.values().iter().map(|v| render(v, depth - 1)).collect();
                    format!("{{{}}}", items.join(", "))
                }
                _ => "{...}".to_string(),
            }
        }
        (_, Data::Pointer(target)) if target.is_null() => "nullptr".to_string(),
        (_, Data::Pointer(PointerTarget::Function(Some(function)))) => {
            format!("&{}", function.name)
        }
        (_, Data::Pointer(PointerTarget::Normal(Some(place)))) => match place.load() {
            Some(target) if depth > 0 => format!("&{}", render(&target, depth - 1)),
            _ => "&...".to_string(),
        },
        (_, Data::Pointer(PointerTarget::Array { store: Some(store), position })) => {
            format!("&[{}] of {}", position, store.len())
        }
        (_, Data::Pointer(_)) => "nullptr".to_string(),
        (Type::Struct(def), Data::Struct(store)) if depth > 0 => {
            let members: Vec<String> = def
                .members
                .iter()
                .zip(store.values())
                .map(|(member, v)| format!("{}: {}", member.name, render(&v, depth - 1)))
                .collect();
            format!("{} {{{}}}", def.name, members.join(", "))
        }
        (_, Data::Struct(_)) => "{...}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Store;

    fn chars(text: &str) -> Value {
        let mut values: Vec<Value> = text
            .chars()
            .map(|c| Value::int(ArithKind::Char, c as i128))
            .collect();
        values.push(Value::int(ArithKind::Char, 0));
        let size = values.len();
        Value::new(
            Type::array_of(Type::CHAR, size),
            Data::Pointer(PointerTarget::Array {
                store: Some(Store::new(values)),
                position: 0,
            }),
        )
    }

    #[test]
    fn test_scalars() {
        assert_eq!(value_string(&Value::int(ArithKind::Int, -3)), "-3");
        assert_eq!(value_string(&Value::bool(true)), "true");
        assert_eq!(value_string(&Value::int(ArithKind::Char, 'x' as i128)), "'x'");
        assert_eq!(value_string(&Value::float(ArithKind::Double, 1.5)), "1.5");
        assert_eq!(value_string(&Value::null(Type::pointer_to(Type::INT))), "nullptr");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(value_string(&chars("hi")), "\"hi\"");
        assert_eq!(char_array_string(&chars("hey")).as_deref(), Some("hey"));
        let ints = Value::new(
            Type::array_of(Type::INT, 2),
            Data::Pointer(PointerTarget::Array {
                store: Some(Store::new(vec![
                    Value::int(ArithKind::Int, 1),
                    Value::int(ArithKind::Int, 2),
                ])),
                position: 0,
            }),
        );
        assert_eq!(value_string(&ints), "{1, 2}");
    }
}
