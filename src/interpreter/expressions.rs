//! Expression evaluation
//!
//! This module handles evaluation of every expression kind:
//!
//! - Literals, identifiers and qualified names
//! - Operators, dispatched through the operator registry by the left
//!   operand's type
//! - Short-circuit `&&`, `||` and `?:`
//! - Member access, casts, `sizeof` and brace lists
//!
//! Operands are evaluated left to right, each one a node boundary of its own.
//! Lvalues come back with their cell attached so assignment, `&` and `++`
//! can write through them.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Context, EvalFuture, Evaluator};
use crate::parser::ast::{CharWidth, Expr, ExprKind, Literal, LogicalOp, UnOp};
use crate::runtime::cast::in_range;
use crate::runtime::ops::Op;
use crate::runtime::types::{ArithKind, Type};
use crate::runtime::value::{Data, FunctionRef, Place, PointerTarget, Store, Value};
use std::rc::Rc;

impl Evaluator {
    /// Visit an expression: one quantum, then evaluate
    pub(crate) fn visit_expr<'a>(&'a self, expr: &'a Expr, ctx: &'a Context) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            let node = expr.info();
            let previous = self.cursor();
            self.enter(node).await;
            let value = self
                .evaluate(expr, ctx)
                .await
                .map_err(|e| e.or_at(Some(node)))?;
            self.set_cursor(previous.or(Some(node)));
            Ok(value)
        })
    }

    fn evaluate<'a>(&'a self, expr: &'a Expr, ctx: &'a Context) -> EvalFuture<'a, Value> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::Literal(literal) => self.literal(literal),
                ExprKind::Identifier(name) => self
                    .lookup(name)
                    .and_then(|place| place.load())
                    .ok_or_else(|| self.fault(format!("undefined identifier {}", name))),
                ExprKind::Qualified(path) => self
                    .namespaces
                    .borrow()
                    .lookup(path)
                    .and_then(|place| place.load())
                    .ok_or_else(|| self.fault(format!("undefined identifier {}", path.join("::")))),
                ExprKind::Binary { op, left, right } => {
                    let l = self.visit_expr(left, ctx).await?;
                    let r = self.visit_expr(right, ctx).await?;
                    self.apply(Op::Binary(*op), &l, Some(&r))
                }
                ExprKind::Logical { op, left, right } => {
                    let l = self.visit_expr(left, ctx).await?;
                    let l = self.condition(&l)?;
                    let result = match (op, l) {
                        (LogicalOp::And, false) => false,
                        (LogicalOp::Or, true) => true,
                        _ => {
                            let r = self.visit_expr(right, ctx).await?;
                            self.condition(&r)?
                        }
                    };
                    Ok(Value::bool(result))
                }
                ExprKind::Assign { op, target, value } => {
                    let target = self.visit_expr(target, ctx).await?;
                    let hint = match &target.ty {
                        Type::Struct(def) => Some(self.current_struct(def)),
                        _ => None,
                    };
                    let value = self.visit_expr(value, &ctx.with_struct_type(hint)).await?;
                    let op = op.map_or(Op::Assign, Op::Compound);
                    self.apply(op, &target, Some(&value))
                }
                ExprKind::Comma(left, right) => {
                    let l = self.visit_expr(left, ctx).await?;
                    let r = self.visit_expr(right, ctx).await?;
                    self.apply(Op::Comma, &l, Some(&r))
                }
                ExprKind::Unary { op, operand } => {
                    let v = self.visit_expr(operand, ctx).await?;
                    self.unary(*op, &v)
                }
                ExprKind::Conditional {
                    condition,
                    then_expr,
                    else_expr,
                } => {
                    let c = self.visit_expr(condition, ctx).await?;
                    if self.condition(&c)? {
                        self.visit_expr(then_expr, ctx).await
                    } else {
                        self.visit_expr(else_expr, ctx).await
                    }
                }
                ExprKind::Call {
                    callee,
                    template_args,
                    args,
                } => {
                    let f = self.visit_expr(callee, ctx).await?;
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.visit_expr(arg, ctx).await?);
                    }
                    let template_args = template_args
                        .iter()
                        .map(|name| self.type_name(name))
                        .collect::<Result<Vec<_>>>()?;
                    self.call_value(&f, values, &template_args).await
                }
                ExprKind::Index { base, index } => {
                    let b = self.visit_expr(base, ctx).await?;
                    let i = self.visit_expr(index, ctx).await?;
                    self.apply(Op::Index, &b, Some(&i))
                }
                ExprKind::Member {
                    object,
                    member,
                    through_pointer,
                } => {
                    let mut object = self.visit_expr(object, ctx).await?;
                    if *through_pointer {
                        object = self.apply(Op::Deref, &object, None)?;
                    }
                    self.member(&object, member)
                }
                ExprKind::Cast { target, expr } => {
                    let ty = self.type_name(target)?;
                    let value = self.visit_expr(expr, ctx).await?;
                    self.cast(&value, &ty, true)
                }
                ExprKind::SizeofType(name) => {
                    let ty = self.type_name(name)?;
                    self.size_value(&ty)
                }
                ExprKind::SizeofExpr(operand) => {
                    let value = self.visit_expr(operand, ctx).await?;
                    self.size_value(&value.ty)
                }
                ExprKind::InitList(items) => match &ctx.struct_type {
                    Some(def) => self.init_struct(Rc::clone(def), items, false, ctx).await,
                    None => Err(self.fault("cannot deduce the type of an initializer list")),
                },
            }
        })
    }

    fn unary(&self, op: UnOp, v: &Value) -> Result<Value> {
        let dummy = Value::dummy();
        match op {
            UnOp::Neg => self.apply(Op::Neg, v, None),
            UnOp::Plus => self.apply(Op::Plus, v, None),
            UnOp::Not => self.apply(Op::Not, v, None),
            UnOp::BitNot => self.apply(Op::BitNot, v, None),
            UnOp::PreInc => self.apply(Op::Inc, v, None),
            UnOp::PreDec => self.apply(Op::Dec, v, None),
            UnOp::PostInc => self.apply(Op::Inc, v, Some(&dummy)),
            UnOp::PostDec => self.apply(Op::Dec, v, Some(&dummy)),
            UnOp::Deref => self.apply(Op::Deref, v, None),
            UnOp::AddrOf => self.apply(Op::AddrOf, v, None),
        }
    }

    fn size_value(&self, ty: &Type) -> Result<Value> {
        let bytes = self.byte_size(ty)?;
        Ok(Value::int(ArithKind::Int, bytes))
    }

    /// `object.name`: a data member as an lvalue, or a method bound to the
    /// object
    pub(crate) fn member(&self, object: &Value, name: &str) -> Result<Value> {
        let Type::Struct(def) = &object.ty else {
            return Err(self.fault(format!(
                "request for member {} in a value of type {}",
                name, object.ty
            )));
        };
        let def = self.current_struct(def);
        if let Some(index) = def.member_index(name) {
            let store = object
                .struct_store()
                .ok_or_else(|| self.fault(format!("{} has no storage", def.name)))?;
            let member = Place::Member {
                store: store.clone(),
                index,
            }
            .load()
            .ok_or_else(|| self.fault(format!("struct {} has no member {}", def.name, name)))?;
            let readonly = member.readonly || object.readonly;
            return Ok(member.readonly(readonly));
        }

        let owner = format!("struct {}", def.name);
        let method = self
            .typedbs
            .borrow()
            .get(&owner)
            .and_then(|db| db.overloads(name).first().map(|o| Rc::clone(&o.ty)));
        match method {
            Some(ty) => Ok(Value::new(
                Type::Function(ty),
                Data::Function(FunctionRef::new(name, &owner).bind(object.clone())),
            )),
            None => Err(self.fault(format!("struct {} has no member {}", def.name, name))),
        }
    }

    pub(crate) fn literal(&self, literal: &Literal) -> Result<Value> {
        let ops = self.ops();
        match literal {
            Literal::Int {
                value,
                radix,
                unsigned,
                long,
            } => {
                use ArithKind::*;
                let candidates: &[ArithKind] = match (*radix == 10, *unsigned, *long) {
                    (true, false, false) => &[Int, LongLong],
                    (true, false, true) => &[Long, LongLong],
                    (true, true, false) => &[Unsigned, UnsignedLongLong],
                    (true, true, true) => &[UnsignedLong, UnsignedLongLong],
                    (false, false, _) => &[Int, Unsigned, LongLong, UnsignedLongLong],
                    (false, true, _) => &[Unsigned, UnsignedLongLong],
                };
                let v = i128::try_from(*value)
                    .map_err(|_| self.fault(format!("integer literal {} is too large", value)))?;
                candidates
                    .iter()
                    .find(|kind| in_range(&ops, **kind, v))
                    .map(|kind| Value::int(*kind, v))
                    .ok_or_else(|| self.fault(format!("integer literal {} is too large", value)))
            }
            Literal::Float { value, single } => {
                let kind = if *single { ArithKind::Float } else { ArithKind::Double };
                Ok(Value::float(kind, *value))
            }
            Literal::Char(c, width) => {
                let v = i128::from(*c);
                let kind = match width {
                    CharWidth::Narrow if in_range(&ops, ArithKind::Char, v) => ArithKind::Char,
                    CharWidth::Narrow | CharWidth::Wide => ArithKind::WChar,
                    CharWidth::Utf16 => ArithKind::Char16,
                    CharWidth::Utf32 => ArithKind::Char32,
                };
                Ok(Value::int(kind, v))
            }
            Literal::String(text, width) => {
                let kind = match width {
                    CharWidth::Narrow => ArithKind::Char,
                    CharWidth::Wide => ArithKind::WChar,
                    CharWidth::Utf16 => ArithKind::Char16,
                    CharWidth::Utf32 => ArithKind::Char32,
                };
                let mut chars = Vec::with_capacity(text.len() + 1);
                for c in text.chars() {
                    let v = i128::from(u32::from(c));
                    if !in_range(&ops, kind, v) {
                        return Err(self.fault(format!(
                            "character '{}' in string literal is out of range of {}",
                            c,
                            kind.name()
                        )));
                    }
                    chars.push(Value::int(kind, v).readonly(true));
                }
                chars.push(Value::int(kind, 0).readonly(true));
                Ok(Value::new(
                    Type::array_of(Type::Arithmetic(kind), chars.len()),
                    Data::Pointer(PointerTarget::Array {
                        store: Some(Store::new(chars)),
                        position: 0,
                    }),
                ))
            }
            Literal::Bool(b) => Ok(Value::bool(*b)),
            Literal::Null => Ok(Value::null(Type::pointer_to(Type::Void))),
        }
    }
}
