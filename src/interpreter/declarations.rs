//! Declarations
//!
//! A declaration pairs a [`TypeSpec`] with declarators. Resolution applies
//! the pointer levels first, then the suffixes right to left, then recurses
//! into a parenthesized inner declarator with the type built so far:
//!
//! ```text
//! const int *const p[3]   ->  array of 3 const pointers to const int
//! int (*fp)(int)          ->  pointer to function (int) -> int
//! ```
//!
//! Array dimensions are folded synchronously; they may use literals,
//! arithmetic and the current value of variables.

use crate::interpreter::errors::{Result, RuntimeError};
use crate::interpreter::evaluator::{
    Context, EvalFuture, Evaluator, FunctionBody, FunctionEntry, ParamInfo,
};
use crate::interpreter::scope::GLOBAL;
use crate::parser::ast::{
    BinOp, Declaration, Declarator, DeclaratorBase, DeclaratorSuffix, Expr, ExprKind, FunctionDef,
    Initializer, Literal, ParamList, StructDef, TypeName, TypeSpec, UnOp,
};
use crate::runtime::format::value_string;
use crate::runtime::ops::arithmetic::floor_div;
use crate::runtime::types::{
    ArithKind, FunctionType, MemberType, ParamType, PointerKind, StructType, Type,
};
use crate::runtime::value::Value;
use std::rc::Rc;

const ARRAY_TOO_LARGE: &str = "array size is too large";

/// A resolved declarator
#[derive(Debug, Clone)]
pub(crate) struct Declared {
    pub name: Option<String>,
    pub ty: Type,
    pub readonly: bool,
    pub reference: bool,
    /// First array dimension left empty, to be deduced from the initializer
    pub open_bound: bool,
    /// Parameter names and defaults when `ty` is a function type
    pub params: Vec<ParamInfo>,
}

/// Arrays and functions passed as parameters become pointers
fn decay(ty: Type) -> Type {
    match ty {
        Type::Pointer {
            target,
            kind: PointerKind::Array { .. },
            const_target,
        } => Type::Pointer {
            target,
            kind: PointerKind::Normal,
            const_target,
        },
        Type::Function(sig) => Type::FunctionPointer(sig),
        other => other,
    }
}

impl Evaluator {
    /// Base type named by a specifier's type words
    pub(crate) fn base_type(&self, spec: &TypeSpec) -> Result<Type> {
        if let Some(word) = spec
            .specifiers
            .iter()
            .find(|word| !self.config().is_specifier(word))
        {
            return Err(self.fault(format!("unknown specifier {}", word)));
        }
        if let [word] = spec.words.as_slice() {
            if word == "void" {
                return Ok(Type::Void);
            }
            if let Some(ty) = self.typedefs.borrow().get(word) {
                return Ok(ty.clone());
            }
            if let Some(def) = self.struct_type(word) {
                return Ok(Type::Struct(def));
            }
        }
        ArithKind::from_words(&spec.words)
            .map(Type::Arithmetic)
            .ok_or_else(|| self.fault(format!("unknown type {}", spec.words.join(" "))))
    }

    /// Type of a specifier plus declarator
    pub(crate) fn resolve_declarator(&self, spec: &TypeSpec, base: Type, declarator: &Declarator) -> Result<Declared> {
        self.apply_declarator(base, spec.has_specifier("const"), declarator)
    }

    fn apply_declarator(&self, base: Type, base_const: bool, declarator: &Declarator) -> Result<Declared> {
        let mut ty = base;
        let mut const_target = base_const;
        let mut readonly = base_const;
        for level in &declarator.pointers {
            ty = match ty {
                Type::Function(sig) => Type::FunctionPointer(sig),
                target => Type::Pointer {
                    target: Box::new(target),
                    kind: PointerKind::Normal,
                    const_target,
                },
            };
            const_target = level.is_const;
            readonly = level.is_const;
        }

        let mut open_bound = false;
        let mut params = Vec::new();
        for (i, suffix) in declarator.direct.suffixes.iter().enumerate().rev() {
            match suffix {
                DeclaratorSuffix::Array(Some(size)) => {
                    let size = self.const_eval(size)?;
                    if size < 0 {
                        return Err(self.fault(format!("size of array is negative ({})", size)));
                    }
                    let size = usize::try_from(size).map_err(|_| self.fault(ARRAY_TOO_LARGE))?;
                    ty = Type::array_of(ty, size);
                    self.check_cells(&ty)?;
                }
                DeclaratorSuffix::Array(None) => {
                    if i != 0 {
                        return Err(self.fault(
                            "multidimensional array must have bounds for all dimensions except the first",
                        ));
                    }
                    open_bound = true;
                    ty = Type::array_of(ty, 0);
                }
                DeclaratorSuffix::Params(list) => {
                    let (function, infos) = self.function_type(ty, list)?;
                    ty = Type::Function(Rc::new(function));
                    params = infos;
                }
            }
        }

        match &declarator.direct.base {
            DeclaratorBase::Nested(inner) => {
                let mut declared = self.apply_declarator(ty, false, inner)?;
                declared.reference |= declarator.reference;
                declared.open_bound |= open_bound;
                Ok(declared)
            }
            DeclaratorBase::Name(name) => Ok(Declared {
                name: Some(name.clone()),
                ty,
                readonly,
                reference: declarator.reference,
                open_bound,
                params,
            }),
            DeclaratorBase::Abstract => Ok(Declared {
                name: None,
                ty,
                readonly,
                reference: declarator.reference,
                open_bound,
                params,
            }),
        }
    }

    /// Faults when an object of `ty` would exceed the configured cell limit
    pub(crate) fn check_cells(&self, ty: &Type) -> Result<()> {
        match ty.cell_count() {
            Some(cells) if cells <= self.config().limits.max_cells => Ok(()),
            _ => Err(self.fault(ARRAY_TOO_LARGE)),
        }
    }

    /// `sizeof` in bytes
    pub(crate) fn byte_size(&self, ty: &Type) -> Result<i128> {
        ty.size_of(&self.config().limits)
            .and_then(|bytes| i128::try_from(bytes).ok())
            .ok_or_else(|| self.fault(ARRAY_TOO_LARGE))
    }

    fn function_type(&self, ret: Type, list: &ParamList) -> Result<(FunctionType, Vec<ParamInfo>)> {
        let mut params = Vec::with_capacity(list.params.len());
        let mut infos = Vec::with_capacity(list.params.len());
        let mut seen_default = false;
        for param in &list.params {
            let base = self.base_type(&param.spec)?;
            // `(void)` is an empty list
            if list.params.len() == 1
                && base.is_void()
                && param.declarator.pointers.is_empty()
                && param.declarator.name().is_none()
            {
                break;
            }
            let declared = self.resolve_declarator(&param.spec, base, &param.declarator)?;
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(self.fault("all default arguments must be at the end of arguments list"));
            }
            params.push(ParamType {
                ty: decay(declared.ty),
                reference: declared.reference,
                readonly: declared.readonly || param.spec.has_specifier("static"),
                optional: param.default.is_some(),
            });
            infos.push(ParamInfo {
                name: declared.name,
                default: param.default.as_ref().map(|expr| Rc::new((**expr).clone())),
            });
        }
        Ok((
            FunctionType {
                ret,
                params,
                variadic: list.variadic,
            },
            infos,
        ))
    }

    /// Type written in expression position: casts and `sizeof`
    pub(crate) fn type_name(&self, name: &TypeName) -> Result<Type> {
        let base = self.base_type(&name.spec)?;
        Ok(self.resolve_declarator(&name.spec, base, &name.declarator)?.ty)
    }

    /// Fold a constant integer expression without suspending
    pub(crate) fn const_eval(&self, expr: &Expr) -> Result<i128> {
        let not_constant = || self.fault("array size must be a constant expression");
        match &expr.kind {
            ExprKind::Literal(Literal::Int { value, .. }) => {
                i128::try_from(*value).map_err(|_| self.fault("integer literal is too large"))
            }
            ExprKind::Literal(Literal::Char(c, _)) => Ok(i128::from(*c)),
            ExprKind::Literal(Literal::Bool(b)) => Ok(i128::from(*b)),
            ExprKind::Identifier(name) => self
                .lookup(name)
                .and_then(|place| place.load())
                .and_then(|value| value.as_int())
                .ok_or_else(not_constant),
            ExprKind::Unary { op, operand } => {
                let v = self.const_eval(operand)?;
                match op {
                    UnOp::Neg => v.checked_neg().ok_or_else(|| self.fault(ARRAY_TOO_LARGE)),
                    UnOp::Plus => Ok(v),
                    UnOp::BitNot => Ok(!v),
                    UnOp::Not => Ok(i128::from(v == 0)),
                    _ => Err(not_constant()),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.const_eval(left)?;
                let r = self.const_eval(right)?;
                let zero = || self.fault("division by zero");
                let too_large = || self.fault(ARRAY_TOO_LARGE);
                Ok(match op {
                    BinOp::Add => l.checked_add(r).ok_or_else(too_large)?,
                    BinOp::Sub => l.checked_sub(r).ok_or_else(too_large)?,
                    BinOp::Mul => l.checked_mul(r).ok_or_else(too_large)?,
                    BinOp::Div if r == 0 => return Err(zero()),
                    BinOp::Div if l.checked_div(r).is_none() => return Err(too_large()),
                    BinOp::Div => floor_div(l, r),
                    BinOp::Mod if r == 0 => return Err(zero()),
                    BinOp::Mod => l.checked_rem(r).ok_or_else(too_large)?,
                    BinOp::Shl => l << r.clamp(0, 126),
                    BinOp::Shr => l >> r.clamp(0, 126),
                    BinOp::BitAnd => l & r,
                    BinOp::BitOr => l | r,
                    BinOp::BitXor => l ^ r,
                    BinOp::Eq => i128::from(l == r),
                    BinOp::Ne => i128::from(l != r),
                    BinOp::Lt => i128::from(l < r),
                    BinOp::Le => i128::from(l <= r),
                    BinOp::Gt => i128::from(l > r),
                    BinOp::Ge => i128::from(l >= r),
                })
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.const_eval(condition)? != 0 {
                    self.const_eval(then_expr)
                } else {
                    self.const_eval(else_expr)
                }
            }
            ExprKind::Cast { expr, .. } => self.const_eval(expr),
            ExprKind::SizeofType(name) => self.byte_size(&self.type_name(name)?),
            _ => Err(not_constant()),
        }
    }

    /// `T a = ..., *b, c[3] = {...};`
    pub(crate) fn visit_declaration<'a>(&'a self, decl: &'a Declaration, ctx: &'a Context) -> EvalFuture<'a, ()> {
        Box::pin(async move {
            if decl.declarators.is_empty() {
                // `struct Name;` forward declaration
                if let [name] = decl.spec.words.as_slice() {
                    if self.struct_type(name).is_none() && ArithKind::from_words(&decl.spec.words).is_none() {
                        self.define_struct(StructType {
                            name: name.clone(),
                            members: Vec::new(),
                        });
                    }
                }
                return Ok(());
            }

            for item in &decl.declarators {
                if decl.spec.is_auto() {
                    self.declare_auto(&decl.spec, &item.declarator, item.init.as_ref(), ctx)
                        .await?;
                    continue;
                }
                let base = self.base_type(&decl.spec)?;
                let declared = self.resolve_declarator(&decl.spec, base, &item.declarator)?;
                let name = declared
                    .name
                    .clone()
                    .ok_or_else(|| self.fault("missing declarator name"))?;

                if let Type::Function(ty) = &declared.ty {
                    self.declare_prototype(&name, Rc::clone(ty), declared.params.clone())?;
                    continue;
                }
                if declared.reference {
                    self.declare_reference(&name, &declared, item.init.as_ref(), ctx)
                        .await?;
                    continue;
                }

                let value = if declared.open_bound {
                    self.open_bound_array(&declared, item.init.as_ref(), ctx).await?
                } else {
                    self.initial_value(&declared.ty, item.init.as_ref(), declared.readonly, ctx)
                        .await?
                };
                tracing::trace!(variable = %name, ty = %value.ty, "declare");
                self.define_variable(&name, value)?;
            }
            Ok(())
        })
    }

    /// `auto x = expr;` and the loop variable of a range `for`
    async fn declare_auto(
        &self,
        spec: &TypeSpec,
        declarator: &Declarator,
        init: Option<&Initializer>,
        ctx: &Context,
    ) -> Result<()> {
        let value = match init {
            Some(Initializer::Expr(expr)) => self.visit_expr(expr, ctx).await?,
            Some(Initializer::List(..)) => {
                return Err(self.fault("cannot deduce auto from an initializer list"))
            }
            None => return Err(self.fault("declaration of auto variable requires an initializer")),
        };
        let deduced = if declarator.reference {
            value.ty.clone()
        } else {
            decay(value.ty.clone())
        };
        let declared = self.resolve_declarator(spec, deduced, declarator)?;
        let name = declared
            .name
            .clone()
            .ok_or_else(|| self.fault("missing declarator name"))?;
        if declared.reference {
            return self.bind_reference(&name, &declared, value);
        }
        let value = self
            .copy_value(&value, &declared.ty)?
            .readonly(declared.readonly)
            .declared(Some(declared.ty.clone()));
        self.define_variable(&name, value)?;
        Ok(())
    }

    async fn declare_reference(
        &self,
        name: &str,
        declared: &Declared,
        init: Option<&Initializer>,
        ctx: &Context,
    ) -> Result<()> {
        let Some(Initializer::Expr(expr)) = init else {
            return Err(self.fault(format!("reference {} must be initialized", name)));
        };
        let value = self.visit_expr(expr, ctx).await?;
        self.bind_reference(name, declared, value)
    }

    /// Alias `name` to the cell behind `value`
    pub(crate) fn bind_reference(&self, name: &str, declared: &Declared, value: Value) -> Result<()> {
        match value.place.clone() {
            Some(place) if value.ty.same_shape(&declared.ty) => self.declare(name, place),
            _ if declared.readonly => {
                let value = self.copy_value(&value, &declared.ty)?.readonly(true);
                self.define_variable(name, value).map(|_| ())
            }
            _ => Err(self.fault(format!(
                "cannot bind reference {} to {}",
                name,
                value_string(&value)
            ))),
        }
    }

    /// `T a[] = ...`: the first dimension comes from the initializer
    async fn open_bound_array(
        &self,
        declared: &Declared,
        init: Option<&Initializer>,
        ctx: &Context,
    ) -> Result<Value> {
        let element = declared
            .ty
            .pointee()
            .cloned()
            .ok_or_else(|| self.fault("array has no element type"))?;
        match init {
            Some(Initializer::List(items, _)) => {
                let ty = Type::array_of(element, items.len());
                self.initial_value(&ty, init, declared.readonly, ctx).await
            }
            Some(Initializer::Expr(expr)) => {
                let value = self.visit_expr(expr, ctx).await?;
                let size = match value.array() {
                    Some((store, position)) => store.len().saturating_sub(position.max(0) as usize),
                    None => {
                        return Err(self.fault(format!(
                            "cannot initialize an array to {}",
                            value_string(&value)
                        )))
                    }
                };
                let ty = Type::array_of(element, size);
                self.array_from_value(&ty, &value, declared.readonly).await
            }
            None => Err(self.fault(format!(
                "array size missing in {}",
                declared.name.as_deref().unwrap_or("declaration")
            ))),
        }
    }

    fn declare_prototype(&self, name: &str, ty: Rc<FunctionType>, params: Vec<ParamInfo>) -> Result<()> {
        self.register_function(FunctionEntry {
            name: name.to_string(),
            owner: GLOBAL.to_string(),
            ty: Rc::clone(&ty),
            params,
            body: FunctionBody::Prototype,
        })?;
        self.define_global_function(name, ty);
        Ok(())
    }

    /// Register a function definition in `owner`'s overload table
    pub(crate) fn define_function(&self, def: &FunctionDef, owner: &str) -> Result<()> {
        let base = self.base_type(&def.spec)?;
        let declared = self.resolve_declarator(&def.spec, base, &def.declarator)?;
        let Type::Function(ty) = declared.ty else {
            return Err(self.fault(format!("{} is not a function declarator", def.name())));
        };
        let name = declared
            .name
            .ok_or_else(|| self.fault("missing function name"))?;
        if declared.params.iter().any(|param| param.name.is_none()) {
            return Err(self.fault("missing declarator for argument"));
        }
        tracing::debug!(function = %name, owner, "define function");
        self.register_function(FunctionEntry {
            name: name.clone(),
            owner: owner.to_string(),
            ty: Rc::clone(&ty),
            params: declared.params,
            body: FunctionBody::Defined(Rc::new((*def.body).clone())),
        })?;
        if owner == GLOBAL {
            self.define_global_function(&name, ty);
        }
        Ok(())
    }

    /// `struct S { members; methods };`
    pub(crate) fn define_struct_def(&self, def: &StructDef) -> Result<()> {
        // Members may point at the struct being defined
        self.define_struct(StructType {
            name: def.name.clone(),
            members: Vec::new(),
        });
        let mut members = Vec::with_capacity(def.members.len());
        for member in &def.members {
            let base = self.base_type(&member.spec)?;
            let declared = self.resolve_declarator(&member.spec, base, &member.declarator)?;
            let name = declared
                .name
                .ok_or_else(|| self.fault("missing member name"))?;
            if declared.open_bound {
                return Err(self.fault(format!("member {} has an incomplete array type", name)));
            }
            if members.iter().any(|m: &MemberType| m.name == name) {
                return Err(self.fault(format!("{} is already defined in struct {}", name, def.name)));
            }
            members.push(MemberType {
                name,
                ty: declared.ty,
                readonly: declared.readonly,
                default: member.default.clone().map(Rc::new),
            });
        }
        self.define_struct(StructType {
            name: def.name.clone(),
            members,
        });
        let owner = format!("struct {}", def.name);
        for method in &def.methods {
            self.define_function(method, &owner)?;
        }
        Ok(())
    }

    /// `typedef T name, *pname;`
    pub(crate) fn define_typedefs(&self, decl: &Declaration) -> Result<()> {
        let base = self.base_type(&decl.spec)?;
        for item in &decl.declarators {
            let declared = self.resolve_declarator(&decl.spec, base.clone(), &item.declarator)?;
            let name = declared
                .name
                .ok_or_else(|| self.fault("missing typedef name"))?;
            self.define_typedef(&name, declared.ty);
        }
        Ok(())
    }

    /// `using namespace a::b;`
    pub(crate) fn using_directive(&self, path: &[String]) -> Result<()> {
        self.namespaces
            .borrow_mut()
            .import(path)
            .map_err(|e| e.or_at(self.cursor()))
    }

    /// `namespace alias = a::b;`
    pub(crate) fn namespace_alias(&self, alias: &str, target: &[String]) -> Result<()> {
        self.namespaces
            .borrow_mut()
            .alias(alias, target)
            .map_err(|e| e.or_at(self.cursor()))
    }

    /// Construct accepted by the parser that the evaluator does not run
    pub(crate) fn unsupported_construct(&self, what: &str) -> RuntimeError {
        RuntimeError::not_implemented(what).or_at(self.cursor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::parser::ast::StmtKind;
    use crate::runtime::config::Config;
    use crate::runtime::Runtime;
    use pretty_assertions::assert_eq;

    fn evaluator() -> Evaluator {
        Evaluator::new(Runtime::new(Config::default()))
    }

    fn declaration(source: &str) -> Declaration {
        let program = parse_source(source).unwrap();
        match program.items.into_iter().next().map(|stmt| stmt.kind) {
            Some(StmtKind::Declaration(decl)) => decl,
            other => panic!("expected a declaration, got {:?}", other),
        }
    }

    fn resolve(ev: &Evaluator, source: &str) -> Declared {
        let decl = declaration(source);
        let base = ev.base_type(&decl.spec).unwrap();
        ev.resolve_declarator(&decl.spec, base, &decl.declarators[0].declarator)
            .unwrap()
    }

    #[test]
    fn test_pointer_constness() {
        let ev = evaluator();
        let p = resolve(&ev, "const int *p;");
        assert!(!p.readonly);
        assert_eq!(p.ty, Type::const_pointer_to(Type::INT));

        let q = resolve(&ev, "int *const q = 0;");
        assert!(q.readonly);
        assert_eq!(q.ty, Type::pointer_to(Type::INT));
    }

    #[test]
    fn test_array_suffixes_nest_outer_first() {
        let ev = evaluator();
        let a = resolve(&ev, "int a[2][3];");
        assert_eq!(a.ty.array_size(), Some(2));
        assert_eq!(a.ty.pointee().and_then(Type::array_size), Some(3));
        assert_eq!(a.ty.size_of(&ev.config().limits), Some(24));
    }

    fn resolve_err(ev: &Evaluator, source: &str) -> String {
        let decl = declaration(source);
        let base = ev.base_type(&decl.spec).unwrap();
        ev.resolve_declarator(&decl.spec, base, &decl.declarators[0].declarator)
            .unwrap_err()
            .message
    }

    #[test]
    fn test_constant_bounds_fold_like_runtime_arithmetic() {
        let ev = evaluator();
        let a = resolve(&ev, "int a[-7 % 4 + 5];");
        assert_eq!(a.ty.array_size(), Some(2));
        let b = resolve(&ev, "int b[-7 / 2 + 6];");
        assert_eq!(b.ty.array_size(), Some(2));
    }

    #[test]
    fn test_oversized_array_bounds_fault() {
        let ev = evaluator();
        assert_eq!(
            resolve_err(&ev, "int a[170141183460469231731687303715884105727ULL * 2];"),
            "array size is too large"
        );
        assert_eq!(resolve_err(&ev, "int a[100000000000000];"), "array size is too large");
        assert_eq!(resolve_err(&ev, "int a[100000][100000];"), "array size is too large");
        assert_eq!(resolve_err(&ev, "int a[2 - 3];"), "size of array is negative (-1)");
    }

    #[test]
    fn test_function_pointer_declarator() {
        let ev = evaluator();
        let fp = resolve(&ev, "int (*fp)(int, double);");
        assert_eq!(fp.name.as_deref(), Some("fp"));
        let Type::FunctionPointer(sig) = fp.ty else {
            panic!("expected a function pointer, got {:?}", fp.ty);
        };
        assert_eq!(sig.ret, Type::INT);
        assert_eq!(sig.params.len(), 2);
    }

    #[test]
    fn test_inner_dimension_must_be_sized() {
        let ev = evaluator();
        let decl = declaration("int a[3][] = {};");
        let base = ev.base_type(&decl.spec).unwrap();
        let err = ev
            .resolve_declarator(&decl.spec, base, &decl.declarators[0].declarator)
            .unwrap_err();
        assert_eq!(
            err.message,
            "multidimensional array must have bounds for all dimensions except the first"
        );
    }

    #[test]
    fn test_dimensions_fold_constants() {
        let ev = evaluator();
        let a = resolve(&ev, "char buf[2 * 4 + 1];");
        assert_eq!(a.ty.array_size(), Some(9));
    }

    #[test]
    fn test_default_arguments_must_trail() {
        let ev = evaluator();
        let decl = declaration("int f(int a = 1, int b);");
        let base = ev.base_type(&decl.spec).unwrap();
        let err = ev
            .resolve_declarator(&decl.spec, base, &decl.declarators[0].declarator)
            .unwrap_err();
        assert_eq!(err.message, "all default arguments must be at the end of arguments list");
    }

    #[test]
    fn test_unknown_type_words() {
        let ev = evaluator();
        let spec = TypeSpec {
            specifiers: vec![],
            words: vec!["Widget".into()],
            span: Default::default(),
        };
        assert_eq!(ev.base_type(&spec).unwrap_err().message, "unknown type Widget");
    }
}
