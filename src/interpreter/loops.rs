//! Loop statement execution (`while`, `do-while`, `for`, range `for`).
//!
//! Each loop runs in one scope of its own; the body's block pushes its own
//! scope per iteration. `break` and `continue` are mapped through
//! [`LoopStep`] so the drivers share one reaction to the body's signal. A
//! `return` unwinds the loop and propagates.
//!
//! The range `for` binds its variable in a fresh scope per element: by value
//! a copy converted to the declared type, by reference an alias of the
//! element cell.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Context, Evaluator, Signal};
use crate::parser::ast::{Declarator, Expr, ExprKind, Stmt, TypeSpec};
use crate::runtime::format::value_string;
use crate::runtime::types::Type;
use crate::runtime::value::{Place, Value};

/// How a loop proceeds after its body
pub(crate) enum LoopStep {
    /// Body completed normally or via `continue`
    Next,
    /// `break`
    Break,
    /// `return`: unwind and hand the signal to the caller
    Exit(Signal),
}

impl From<Signal> for LoopStep {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Normal | Signal::Continue => LoopStep::Next,
            Signal::Break => LoopStep::Break,
            signal @ Signal::Return(_) => LoopStep::Exit(signal),
        }
    }
}

const ITERATOR_METHOD: &str = "__iterator";

impl Evaluator {
    pub(crate) async fn visit_while(&self, condition: &Expr, body: &Stmt, ctx: &Context) -> Result<Signal> {
        self.push_scope("IterationStatement_while");
        let inner = ctx.with_scope("IterationStatement_while");
        loop {
            let value = self.visit_expr(condition, &inner).await?;
            if !self.condition(&value)? {
                break;
            }
            match self.visit_stmt(body, &inner).await?.into() {
                LoopStep::Next => {}
                LoopStep::Break => break,
                LoopStep::Exit(signal) => {
                    self.pop_scope();
                    return Ok(signal);
                }
            }
        }
        self.pop_scope();
        Ok(Signal::Normal)
    }

    pub(crate) async fn visit_do_while(&self, body: &Stmt, condition: &Expr, ctx: &Context) -> Result<Signal> {
        self.push_scope("IterationStatement_do");
        let inner = ctx.with_scope("IterationStatement_do");
        loop {
            match self.visit_stmt(body, &inner).await?.into() {
                LoopStep::Next => {}
                LoopStep::Break => break,
                LoopStep::Exit(signal) => {
                    self.pop_scope();
                    return Ok(signal);
                }
            }
            let value = self.visit_expr(condition, &inner).await?;
            if !self.condition(&value)? {
                break;
            }
        }
        self.pop_scope();
        Ok(Signal::Normal)
    }

    pub(crate) async fn visit_for(
        &self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        ctx: &Context,
    ) -> Result<Signal> {
        self.push_scope("IterationStatement_for");
        let inner = ctx.with_scope("IterationStatement_for");
        if let Some(init) = init {
            self.visit_stmt(init, &inner).await?;
        }
        loop {
            if let Some(condition) = condition {
                let value = self.visit_expr(condition, &inner).await?;
                if !self.condition(&value)? {
                    break;
                }
            }
            match self.visit_stmt(body, &inner).await?.into() {
                LoopStep::Next => {}
                LoopStep::Break => break,
                LoopStep::Exit(signal) => {
                    self.pop_scope();
                    return Ok(signal);
                }
            }
            if let Some(step) = step {
                self.visit_expr(step, &inner).await?;
            }
        }
        self.pop_scope();
        Ok(Signal::Normal)
    }

    pub(crate) async fn visit_range_for(
        &self,
        spec: &TypeSpec,
        declarator: &Declarator,
        range: &Expr,
        body: &Stmt,
        ctx: &Context,
    ) -> Result<Signal> {
        self.push_scope("IterationStatement_foreach");
        let inner = ctx.with_scope("IterationStatement_foreach");
        let iterable = self.visit_expr(range, &inner).await?;
        let iterable = self.iterator_source(iterable, range).await?;
        let (places, text) = self.element_places(&iterable, range)?;

        for place in places {
            let Some(element) = place.load() else {
                break;
            };
            if text && element.as_int() == Some(0) {
                break;
            }
            self.push_scope("IterationStatement_foreach_item");
            self.bind_loop_variable(spec, declarator, element)?;
            let signal = self.visit_stmt(body, &inner).await?;
            self.pop_scope();
            match signal.into() {
                LoopStep::Next => {}
                LoopStep::Break => break,
                LoopStep::Exit(signal) => {
                    self.pop_scope();
                    return Ok(signal);
                }
            }
        }
        self.pop_scope();
        Ok(Signal::Normal)
    }

    /// A struct with an `__iterator` method iterates what the method returns
    async fn iterator_source(&self, iterable: Value, range: &Expr) -> Result<Value> {
        let Type::Struct(def) = &iterable.ty else {
            return Ok(iterable);
        };
        let owner = format!("struct {}", def.name);
        let has_iterator = self
            .typedbs
            .borrow()
            .get(&owner)
            .is_some_and(|db| db.contains(ITERATOR_METHOD));
        if !has_iterator {
            return Err(self.not_iterable(&iterable, range));
        }
        let method = self.member(&iterable, ITERATOR_METHOD)?;
        self.call_value(&method, Vec::new(), &[]).await
    }

    /// Element cells of an array, and whether they hold a char string
    fn element_places(&self, iterable: &Value, range: &Expr) -> Result<(Vec<Place>, bool)> {
        let Some((store, position)) = iterable.array() else {
            return Err(self.not_iterable(iterable, range));
        };
        let text = iterable
            .ty
            .pointee()
            .and_then(Type::arith)
            .is_some_and(|kind| kind.is_char());
        let start = usize::try_from(position).unwrap_or(0);
        let places = (start..store.len())
            .map(|index| Place::Element {
                store: store.clone(),
                index,
            })
            .collect();
        Ok((places, text))
    }

    fn not_iterable(&self, iterable: &Value, range: &Expr) -> crate::interpreter::errors::RuntimeError {
        match &range.kind {
            ExprKind::Identifier(name) => {
                self.fault(format!("Variable '{}' is not an iterator type.", name))
            }
            _ => self.fault(format!("{} is not an iterator type.", value_string(iterable))),
        }
    }

    fn bind_loop_variable(&self, spec: &TypeSpec, declarator: &Declarator, element: Value) -> Result<()> {
        let base = if spec.is_auto() {
            element.ty.clone()
        } else {
            self.base_type(spec)?
        };
        let declared = self.resolve_declarator(spec, base, declarator)?;
        let name = declared
            .name
            .clone()
            .ok_or_else(|| self.fault("missing loop variable name"))?;
        if declared.reference {
            return self.bind_reference(&name, &declared, element);
        }
        let value = self
            .copy_value(&element, &declared.ty)?
            .readonly(declared.readonly)
            .declared(spec.is_auto().then(|| declared.ty.clone()));
        self.define_variable(&name, value)?;
        Ok(())
    }
}
