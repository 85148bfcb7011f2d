//! `switch`, its labels, and `return`
//!
//! A switch walks the statements of its body in order. `case` labels are
//! always visited and evaluated; the first one whose value equals the
//! discriminant (converted to the label's type) turns execution on, as does
//! reaching `default`. From there statements run until a non-normal signal;
//! `break` ends the switch and anything else propagates.

use crate::interpreter::errors::{Result, RuntimeError};
use crate::interpreter::evaluator::{Context, Evaluator, Signal};
use crate::parser::ast::{BinOp, Expr, Stmt, StmtKind};
use crate::runtime::ops::Op;
use crate::runtime::value::Value;

impl Evaluator {
    pub(crate) async fn visit_switch(&self, discriminant: &Expr, body: &Stmt, ctx: &Context) -> Result<Signal> {
        self.push_scope("SelectionStatement_switch");
        let outer = ctx.with_scope("SelectionStatement_switch");
        let value = self.visit_expr(discriminant, &outer).await?;
        let inner = Context {
            switch: Some(value.rvalue()),
            ..outer
        };

        let signal = match &body.kind {
            StmtKind::Compound(stmts) => {
                self.enter(body.info()).await;
                self.push_scope("CompoundStatement");
                let signal = self.switch_body(stmts, &value, &inner).await?;
                self.pop_scope();
                signal
            }
            _ => self.switch_body(std::slice::from_ref(body), &value, &inner).await?,
        };
        self.pop_scope();
        Ok(match signal {
            Signal::Break => Signal::Normal,
            other => other,
        })
    }

    async fn switch_body(&self, stmts: &[Stmt], discriminant: &Value, ctx: &Context) -> Result<Signal> {
        let mut running = false;
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Case(label) => {
                    self.enter(stmt.info()).await;
                    let label = self.visit_expr(label, ctx).await?;
                    if !running && self.case_matches(discriminant, &label)? {
                        running = true;
                    }
                }
                StmtKind::Default => {
                    self.enter(stmt.info()).await;
                    running = true;
                }
                _ if running => {
                    let signal = self.visit_stmt(stmt, ctx).await?;
                    if !signal.is_normal() {
                        return Ok(signal);
                    }
                }
                _ => {}
            }
        }
        Ok(Signal::Normal)
    }

    fn case_matches(&self, discriminant: &Value, label: &Value) -> Result<bool> {
        let converted = self.cast(discriminant, &label.ty, false)?;
        Ok(self
            .apply(Op::Binary(BinOp::Eq), &converted, Some(label))?
            .truthy())
    }

    /// `case`/`default` reached outside the statement list of a switch body
    pub(crate) fn misplaced_label(&self, label: &str, ctx: &Context) -> RuntimeError {
        if ctx.switch.is_some() {
            self.fault(format!("you can only use {} directly in a switch block", label))
        } else {
            self.fault(format!("you cannot use {} outside switch block", label))
        }
    }

    pub(crate) async fn visit_return(&self, expr: Option<&Expr>, ctx: &Context) -> Result<Signal> {
        match expr {
            Some(expr) => {
                let value = self.visit_expr(expr, ctx).await?;
                Ok(Signal::Return(Some(value)))
            }
            None => Ok(Signal::Return(None)),
        }
    }
}
