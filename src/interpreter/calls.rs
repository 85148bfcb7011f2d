//! Function invocation
//!
//! A call resolves its target through the callee's `()` operator, which asks
//! the overload tables for the best match and how to bind each argument:
//!
//! - `Clone`: fresh cell holding a copy converted to the parameter type
//! - `Borrow`: the parameter aliases the argument's cell
//! - `Cast`: fresh cell holding the cast value
//!
//! The body runs in a new frame. A bound method sees its object's members
//! and `this` in the frame scope, and its parameters in a scope above it.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Context, EvalFuture, Evaluator, FunctionBody, FunctionEntry, Signal};
use crate::parser::ast::Stmt;
use crate::runtime::types::Type;
use crate::runtime::value::{Data, FunctionRef, Place, PointerTarget, Slot, Value};
use crate::typedb::{ArgAction, ArgSig, FunctionMatch};
use std::rc::Rc;

impl Evaluator {
    /// Call a function value with evaluated arguments
    pub fn call_value<'a>(&'a self, callee: &'a Value, args: Vec<Value>, template_args: &'a [Type]) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            let sigs: Vec<ArgSig> = args
                .iter()
                .map(|arg| ArgSig {
                    ty: arg.ty.clone(),
                    lvalue: arg.is_lvalue(),
                    readonly: arg.readonly,
                })
                .collect();
            let target = self.registry_call(callee, &sigs, template_args)?;
            self.invoke(target.function, target.found, args).await
        })
    }

    async fn invoke(&self, function: FunctionRef, found: FunctionMatch, args: Vec<Value>) -> Result<Value> {
        let entry = self.function(found.id)?;
        tracing::debug!(function = %entry.name, owner = %entry.owner, args = args.len(), "call");

        let mut bound = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            let action = found.actions.get(i).copied().unwrap_or(ArgAction::Clone);
            let value = match (action, entry.ty.params.get(i)) {
                (ArgAction::Borrow, Some(_)) if arg.is_lvalue() => arg,
                (_, Some(param)) => self.copy_value(&arg, &param.ty)?.readonly(param.readonly),
                (_, None) => arg.rvalue(),
            };
            bound.push(value);
        }

        match &entry.body {
            FunctionBody::Native(native) => native(self, bound).await,
            FunctionBody::Prototype => Err(self.fault(format!(
                "function {} does not seem to be implemented",
                entry.name
            ))),
            FunctionBody::Defined(body) => {
                let depth = self.scope_depth();
                self.push_frame(&format!("function {}", entry.name));
                let result = self.run_body(&entry, &function, Rc::clone(body), bound).await;
                self.truncate_scopes(depth);
                let signal = result?;
                self.return_value(&entry, signal)
            }
        }
    }

    async fn run_body(
        &self,
        entry: &FunctionEntry,
        function: &FunctionRef,
        body: Rc<Stmt>,
        bound: Vec<Value>,
    ) -> Result<Signal> {
        if let Some(this) = &function.this {
            self.bind_receiver(this)?;
            self.push_scope(&format!("function {}", entry.name));
        }

        let count = bound.len();
        for (value, param) in bound.into_iter().zip(&entry.params) {
            let Some(name) = &param.name else {
                continue;
            };
            match value.place.clone() {
                Some(place) => self.declare(name, place)?,
                None => {
                    self.define_variable(name, value)?;
                }
            }
        }

        // Omitted trailing arguments take their defaults, evaluated here
        let ctx = Context::new("function");
        for (param, ty) in entry.params.iter().zip(&entry.ty.params).skip(count) {
            let (Some(name), Some(default)) = (&param.name, &param.default) else {
                return Err(self.fault(format!("too few arguments to function {}", entry.name)));
            };
            let value = self.visit_expr(default, &ctx).await?;
            let value = self.copy_value(&value, &ty.ty)?.readonly(ty.readonly);
            self.define_variable(name, value)?;
        }

        self.visit_stmt(&body, &ctx).await
    }

    /// `this` and the object's members for a bound method
    fn bind_receiver(&self, this: &Value) -> Result<()> {
        let Type::Struct(def) = &this.ty else {
            return Err(self.fault(format!("cannot call a method on {}", this.ty)));
        };
        let def = self.current_struct(def);
        let object = this
            .place
            .clone()
            .unwrap_or_else(|| Place::Slot(Slot::new(this.rvalue())));
        let pointer = Value::new(
            Type::pointer_to(Type::Struct(Rc::clone(&def))),
            Data::Pointer(PointerTarget::Normal(Some(object.clone()))),
        )
        .readonly(true);
        self.define_variable("this", pointer)?;

        let Some(Data::Struct(store)) = object.load().map(|value| value.data) else {
            return Err(self.fault(format!("struct {} has no storage", def.name)));
        };
        for (index, member) in def.members.iter().enumerate() {
            self.declare(
                &member.name,
                Place::Member {
                    store: store.clone(),
                    index,
                },
            )?;
        }
        Ok(())
    }

    fn return_value(&self, entry: &FunctionEntry, signal: Signal) -> Result<Value> {
        let returns_void = entry.ty.ret.is_void();
        match signal {
            Signal::Return(Some(value)) if !returns_void => self.copy_value(&value, &entry.ty.ret),
            _ if returns_void => Ok(Value::void()),
            _ if entry.name == "main" => Ok(Value::int(crate::runtime::types::ArithKind::Int, 0)),
            _ => Err(self.fault(format!(
                "non-void function {} should return a value",
                entry.name
            ))),
        }
    }

    /// Value converted to `ty` with storage of its own
    pub(crate) fn copy_value(&self, value: &Value, ty: &Type) -> Result<Value> {
        let converted = self.cast(value, ty, false)?;
        Ok(match converted.ty {
            Type::Struct(_) => converted.deep_copy(),
            _ => converted,
        })
    }
}
