//! Statement execution
//!
//! This module handles the statements that do not loop or jump:
//!
//! - Translation units: library loading, top-level items, the call to `main`
//! - Declarations, definitions and namespace directives
//! - Blocks, expression statements and `if`
//!
//! # Implementation
//!
//! [`Evaluator::visit_stmt`] is the node boundary for statements: it suspends
//! once, runs the statement and attaches the statement to any fault raised
//! below it that has no node yet. Every construct that pushes a scope pops it
//! before returning normally; calls restore the scope depth on every exit.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Context, EvalFuture, Evaluator, Signal};
use crate::interpreter::scope::GLOBAL;
use crate::parser::ast::{Expr, Program, Stmt, StmtKind};
use crate::runtime::types::Type;
use crate::runtime::value::Value;

impl Evaluator {
    /// Run a translation unit and return `main`'s exit status
    pub async fn run_program(&self, program: &Program) -> Result<i32> {
        tracing::info!(items = program.items.len(), "run started");
        let defaults = self.config().default_libraries.clone();
        for name in defaults.iter().chain(&program.includes) {
            self.load_library(name)?;
        }

        let ctx = Context::new("global");
        for item in &program.items {
            self.visit_stmt(item, &ctx).await?;
        }

        let main = self
            .lookup("main")
            .and_then(|place| place.load())
            .ok_or_else(|| self.fault("undefined identifier main"))?;
        let result = self.call_value(&main, Vec::new(), &[]).await?;
        let status = match result.ty {
            Type::Void => 0,
            _ => self
                .cast(&result, &Type::INT, false)?
                .as_int()
                .unwrap_or(0) as i32,
        };
        tracing::info!(status, "run finished");
        Ok(status)
    }

    /// Visit a statement: one quantum, then execute
    pub(crate) fn visit_stmt<'a>(&'a self, stmt: &'a Stmt, ctx: &'a Context) -> EvalFuture<'a, Signal> {
        Box::pin(async move {
            let node = stmt.info();
            let previous = self.cursor();
            self.enter(node).await;
            let signal = self
                .execute(stmt, ctx)
                .await
                .map_err(|e| e.or_at(Some(node)))?;
            self.set_cursor(previous.or(Some(node)));
            Ok(signal)
        })
    }

    fn execute<'a>(&'a self, stmt: &'a Stmt, ctx: &'a Context) -> EvalFuture<'a, Signal> {
        Box::pin(async move {
            match &stmt.kind {
                StmtKind::Declaration(decl) => {
                    self.visit_declaration(decl, ctx).await?;
                }
                StmtKind::FunctionDef(def) => self.define_function(def, GLOBAL)?,
                StmtKind::StructDef(def) => self.define_struct_def(def)?,
                StmtKind::Typedef(decl) => self.define_typedefs(decl)?,
                StmtKind::UsingDirective(path) => self.using_directive(path)?,
                StmtKind::UsingDeclaration(_) => {
                    return Err(self.unsupported_construct("using declaration"))
                }
                StmtKind::NamespaceDef(_) => {
                    return Err(self.unsupported_construct("namespace definition"))
                }
                StmtKind::NamespaceAlias { alias, target } => self.namespace_alias(alias, target)?,
                StmtKind::Compound(stmts) => return self.visit_block(stmts, ctx).await,
                StmtKind::Expression(Some(expr)) => {
                    self.visit_expr(expr, ctx).await?;
                }
                StmtKind::Expression(None) | StmtKind::Label(_) => {}
                StmtKind::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    return self
                        .visit_if(condition, then_branch, else_branch.as_deref(), ctx)
                        .await
                }
                StmtKind::Switch { discriminant, body } => {
                    return self.visit_switch(discriminant, body, ctx).await
                }
                StmtKind::Case(_) => return Err(self.misplaced_label("case", ctx)),
                StmtKind::Default => return Err(self.misplaced_label("default", ctx)),
                StmtKind::While { condition, body } => return self.visit_while(condition, body, ctx).await,
                StmtKind::DoWhile { body, condition } => {
                    return self.visit_do_while(body, condition, ctx).await
                }
                StmtKind::For {
                    init,
                    condition,
                    step,
                    body,
                } => {
                    return self
                        .visit_for(init.as_deref(), condition.as_ref(), step.as_ref(), body, ctx)
                        .await
                }
                StmtKind::RangeFor {
                    spec,
                    declarator,
                    range,
                    body,
                } => return self.visit_range_for(spec, declarator, range, body, ctx).await,
                StmtKind::Break => return Ok(Signal::Break),
                StmtKind::Continue => return Ok(Signal::Continue),
                StmtKind::Return(expr) => return self.visit_return(expr.as_ref(), ctx).await,
                StmtKind::Goto(_) => return Err(self.unsupported_construct("goto")),
            }
            Ok(Signal::Normal)
        })
    }

    /// `{ ... }` in its own scope; stops at the first non-normal signal
    pub(crate) async fn visit_block(&self, stmts: &[Stmt], ctx: &Context) -> Result<Signal> {
        self.push_scope("CompoundStatement");
        let inner = ctx.with_scope("CompoundStatement");
        for stmt in stmts {
            let signal = self.visit_stmt(stmt, &inner).await?;
            if !signal.is_normal() {
                self.pop_scope();
                return Ok(signal);
            }
        }
        self.pop_scope();
        Ok(Signal::Normal)
    }

    async fn visit_if(
        &self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        ctx: &Context,
    ) -> Result<Signal> {
        self.push_scope("SelectionStatement_if");
        let inner = ctx.with_scope("SelectionStatement_if");
        let value = self.visit_expr(condition, &inner).await?;
        let signal = if self.condition(&value)? {
            self.visit_stmt(then_branch, &inner).await?
        } else if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch, &inner).await?
        } else {
            Signal::Normal
        };
        self.pop_scope();
        Ok(signal)
    }

    /// Truth value of a condition, converted as by a cast to `bool`
    pub(crate) fn condition(&self, value: &Value) -> Result<bool> {
        Ok(self.cast(value, &Type::BOOL, false)?.truthy())
    }
}
