//! Default values and brace initialization
//!
//! Arrays are filled slot by slot in declaration order; each initializer is
//! evaluated only when its slot is reached. Slots without an initializer get
//! the element type's default value. An outer list may be shorter than the
//! dimension, a nested list must match its dimension exactly (`{}` is allowed
//! and default-fills).
//!
//! A single `0` or `-1` in a multidimensional brace list default-fills the
//! array and stores the value in the first scalar: `int a[2][2] = {-1};`.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Context, EvalFuture, Evaluator};
use crate::parser::ast::Initializer;
use crate::runtime::format::value_string;
use crate::runtime::types::{StructType, Type};
use crate::runtime::value::{Data, Place, PointerTarget, Store, Value};
use std::rc::Rc;

impl Evaluator {
    /// Value of a variable of type `ty` declared without an initializer
    pub(crate) fn default_value<'a>(&'a self, ty: &'a Type, readonly: bool) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            let value = match ty {
                Type::Arithmetic(kind) if kind.is_float() => Value::float(*kind, 0.0),
                Type::Arithmetic(kind) => Value::int(*kind, 0),
                Type::Pointer { target, .. } if ty.is_array() => {
                    let size = ty.array_size().unwrap_or(0);
                    let mut elements = Vec::with_capacity(size);
                    for _ in 0..size {
                        elements.push(self.default_value(target, readonly).await?);
                    }
                    array_value(ty, elements)
                }
                Type::Pointer { .. } | Type::FunctionPointer(_) => Value::null(ty.clone()),
                Type::Struct(def) => {
                    let def = self.current_struct(def);
                    self.init_struct(def, &[], readonly, &Context::default()).await?
                }
                Type::Void => Value::void(),
                Type::Function(_) | Type::Dummy => {
                    return Err(self.fault(format!("cannot create a variable of type {}", ty)))
                }
            };
            Ok(value.readonly(readonly))
        })
    }

    /// Value of a fresh variable of type `ty` from its initializer
    pub(crate) fn initial_value<'a>(
        &'a self,
        ty: &'a Type,
        init: Option<&'a Initializer>,
        readonly: bool,
        ctx: &'a Context,
    ) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            match init {
                None => self.default_value(ty, readonly).await,
                Some(Initializer::List(items, _)) if ty.is_array() => {
                    self.init_array(ty, items, readonly, ctx, true).await
                }
                Some(Initializer::Expr(expr)) if ty.is_array() => {
                    let value = self.visit_expr(expr, ctx).await?;
                    if !value.ty.is_array() {
                        return Err(self.fault(format!(
                            "cannot initialize an array to {}",
                            value_string(&value)
                        )));
                    }
                    self.array_from_value(ty, &value, readonly).await
                }
                Some(Initializer::List(items, _)) => match ty {
                    Type::Struct(def) => {
                        let def = self.current_struct(def);
                        self.init_struct(def, items, readonly, ctx).await
                    }
                    _ => match items.as_slice() {
                        [] => self.default_value(ty, readonly).await,
                        [item @ Initializer::Expr(_)] => {
                            self.initial_value(ty, Some(item), readonly, ctx).await
                        }
                        [Initializer::List(..)] => {
                            Err(self.fault("dimensions do not agree, too few initializers"))
                        }
                        _ => Err(self.fault(format!("too many initializers for {}", ty))),
                    },
                },
                Some(Initializer::Expr(expr)) => {
                    let hint = match ty {
                        Type::Struct(def) => Some(self.current_struct(def)),
                        _ => None,
                    };
                    let value = self.visit_expr(expr, &ctx.with_struct_type(hint)).await?;
                    Ok(self.copy_value(&value, ty)?.readonly(readonly))
                }
            }
        })
    }

    /// Brace list into an array type
    fn init_array<'a>(
        &'a self,
        ty: &'a Type,
        items: &'a [Initializer],
        readonly: bool,
        ctx: &'a Context,
        outermost: bool,
    ) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            let size = ty.array_size().unwrap_or(0);
            let element = ty
                .pointee()
                .ok_or_else(|| self.fault(format!("{} is not an array", ty)))?;
            let mismatch = items.len() > size || (!outermost && !items.is_empty() && items.len() != size);
            if mismatch {
                return Err(self.fault(format!("dimensions do not agree, {} != {}", size, items.len())));
            }

            if let [Initializer::Expr(expr)] = items {
                if element.is_array() {
                    let value = self.visit_expr(expr, ctx).await?;
                    return self.init_from_single(ty, value, readonly).await;
                }
            }

            let mut elements = Vec::with_capacity(size);
            for i in 0..size {
                let value = match items.get(i) {
                    Some(Initializer::List(sub, _)) if element.is_array() => {
                        self.init_array(element, sub, readonly, ctx, false).await?
                    }
                    Some(Initializer::List(..)) if matches!(element, Type::Struct(_)) => {
                        self.initial_value(element, items.get(i), readonly, ctx).await?
                    }
                    Some(Initializer::List(..)) => {
                        return Err(self.fault("dimensions do not agree, too few initializers"))
                    }
                    Some(item) => self.initial_value(element, Some(item), readonly, ctx).await?,
                    None => self.default_value(element, readonly).await?,
                };
                elements.push(value);
            }
            Ok(array_value(ty, elements).readonly(readonly))
        })
    }

    /// `{v}` where a nested array is expected: the `0`/`-1` fill, or an
    /// array value (a string) copied into the first row
    async fn init_from_single(&self, ty: &Type, value: Value, readonly: bool) -> Result<Value> {
        let element = ty
            .pointee()
            .ok_or_else(|| self.fault(format!("{} is not an array", ty)))?;
        if value.ty.is_array() {
            let first = self.array_from_value(element, &value, readonly).await?;
            let size = ty.array_size().unwrap_or(0);
            let mut elements = vec![first];
            for _ in 1..size {
                elements.push(self.default_value(element, readonly).await?);
            }
            return Ok(array_value(ty, elements).readonly(readonly));
        }

        let sentinel = value.ty.is_integral() && matches!(value.as_int(), Some(0 | -1));
        if !sentinel {
            return Err(self.fault(format!(
                "dimensions do not agree, cannot initialize an array to {}",
                value_string(&value)
            )));
        }
        let filled = self.default_value(ty, readonly).await?;
        let mut current = filled.clone();
        while let Some((store, _)) = current.array() {
            let store = store.clone();
            match store.get(0) {
                Some(inner) if inner.ty.is_array() => current = inner,
                Some(inner) => {
                    let converted = self.cast(&value, &inner.ty, false)?.readonly(readonly);
                    Place::Element { store, index: 0 }.init(converted);
                    break;
                }
                None => break,
            }
        }
        Ok(filled)
    }

    /// Copy the elements of an array value into a new array of type `ty`
    pub(crate) fn array_from_value<'a>(&'a self, ty: &'a Type, value: &'a Value, readonly: bool) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            let size = ty.array_size().unwrap_or(0);
            let element = ty
                .pointee()
                .ok_or_else(|| self.fault(format!("{} is not an array", ty)))?;
            let Some((store, position)) = value.array() else {
                return Err(self.fault(format!(
                    "cannot initialize an array to {}",
                    value_string(value)
                )));
            };
            let source: Vec<Value> = store
                .values()
                .into_iter()
                .skip(position.max(0) as usize)
                .collect();
            if source.len() > size {
                return Err(self.fault(format!("dimensions do not agree, {} != {}", size, source.len())));
            }
            let mut elements = Vec::with_capacity(size);
            for i in 0..size {
                let value = match source.get(i) {
                    Some(item) if element.is_array() => self.array_from_value(element, item, readonly).await?,
                    Some(item) => self.copy_value(item, element)?.readonly(readonly),
                    None => self.default_value(element, readonly).await?,
                };
                elements.push(value);
            }
            Ok(array_value(ty, elements).readonly(readonly))
        })
    }

    /// Struct value from a brace list; missing members use their default
    /// initializer or the default value of their type
    pub(crate) fn init_struct<'a>(
        &'a self,
        def: Rc<StructType>,
        items: &'a [Initializer],
        readonly: bool,
        ctx: &'a Context,
    ) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            if items.len() > def.members.len() {
                return Err(self.fault(format!("too many initializers for {}", def.name)));
            }
            let mut values = Vec::with_capacity(def.members.len());
            for (i, member) in def.members.iter().enumerate() {
                let member_readonly = readonly || member.readonly;
                let init = items.get(i).or(member.default.as_deref());
                let value = self
                    .initial_value(&member.ty, init, member_readonly, ctx)
                    .await?;
                values.push(value);
            }
            Ok(Value::new(Type::Struct(Rc::clone(&def)), Data::Struct(Store::new(values))).readonly(readonly))
        })
    }

    /// Latest definition of a struct named by a type
    pub(crate) fn current_struct(&self, def: &Rc<StructType>) -> Rc<StructType> {
        self.struct_type(&def.name).unwrap_or_else(|| Rc::clone(def))
    }
}

fn array_value(ty: &Type, elements: Vec<Value>) -> Value {
    Value::new(
        ty.clone(),
        Data::Pointer(PointerTarget::Array {
            store: Some(Store::new(elements)),
            position: 0,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::config::Config;
    use crate::runtime::types::ArithKind;
    use crate::runtime::Runtime;
    use std::future::Future;
    use std::task::{Context as TaskContext, Poll, Waker};

    fn block_on<T>(future: EvalFuture<'_, T>) -> Result<T> {
        let mut future = future;
        let mut cx = TaskContext::from_waker(Waker::noop());
        loop {
            if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }

    fn ints(value: &Value) -> Vec<i128> {
        let (store, _) = value.array().unwrap();
        store.values().iter().filter_map(Value::as_int).collect()
    }

    #[test]
    fn test_default_array_is_zeroed() {
        let ev = Evaluator::new(Runtime::new(Config::default()));
        let ty = Type::array_of(Type::INT, 3);
        let value = block_on(ev.default_value(&ty, false)).unwrap();
        assert_eq!(ints(&value), vec![0, 0, 0]);
    }

    #[test]
    fn test_sentinel_fill_sets_first_scalar() {
        let ev = Evaluator::new(Runtime::new(Config::default()));
        let ty = Type::array_of(Type::array_of(Type::INT, 2), 2);
        let value = block_on(Box::pin(ev.init_from_single(
            &ty,
            Value::int(ArithKind::Int, -1),
            false,
        )))
        .unwrap();
        let (rows, _) = value.array().unwrap();
        let rows = rows.values();
        assert_eq!(ints(&rows[0]), vec![-1, 0]);
        assert_eq!(ints(&rows[1]), vec![0, 0]);
    }

    #[test]
    fn test_scalar_into_nested_array_faults() {
        let ev = Evaluator::new(Runtime::new(Config::default()));
        let ty = Type::array_of(Type::array_of(Type::INT, 2), 2);
        let err = block_on(Box::pin(ev.init_from_single(
            &ty,
            Value::int(ArithKind::Int, 5),
            false,
        )))
        .unwrap_err();
        assert_eq!(err.message, "dimensions do not agree, cannot initialize an array to 5");
    }
}
