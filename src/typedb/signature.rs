//! Linearized type signatures
//!
//! Types and function signatures are flattened into [`SigToken`] sequences in
//! postfix order, so `const int*` becomes `Const int Ptr` and a function
//! `int f(double, char&)` becomes `FUNCTION int ( double char & )`.
//!
//! Arrays decay to pointers. Registered overloads replace their top-level
//! return type with [`SigToken::Return`], so two overloads differing only in
//! return type collide.

use crate::runtime::types::{FunctionType, Type};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SigToken {
    /// Builtin type name (`int`, `unsigned long`, `void`)
    Name(String),
    Const,
    Ptr,
    LRef,
    Function,
    /// Abstracted return type
    Return,
    Open,
    Close,
    Ellipsis,
    /// Marks the preceding parameter as having a default argument
    Optional,
    /// Template parameter slot
    Template(usize),
    /// Struct type by name
    Class(String),
}

impl fmt::Display for SigToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigToken::Name(name) => write!(f, "{}", name),
            SigToken::Const => write!(f, "const"),
            SigToken::Ptr => write!(f, "*"),
            SigToken::LRef => write!(f, "&"),
            SigToken::Function => write!(f, "FUNCTION"),
            SigToken::Return => write!(f, "Return"),
            SigToken::Open => write!(f, "("),
            SigToken::Close => write!(f, ")"),
            SigToken::Ellipsis => write!(f, "..."),
            SigToken::Optional => write!(f, "?"),
            SigToken::Template(slot) => write!(f, "T{}", slot),
            SigToken::Class(name) => write!(f, "{}", name),
        }
    }
}

/// A token sequence with a stable textual form used as cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub Vec<SigToken>);

impl Signature {
    pub fn of_type(ty: &Type) -> Self {
        let mut tokens = Vec::new();
        push_type(&mut tokens, ty, false);
        Signature(tokens)
    }

    /// Signature of a declared function with the return type abstracted
    pub fn of_function(sig: &FunctionType) -> Self {
        let mut tokens = vec![SigToken::Function, SigToken::Return, SigToken::Open];
        push_params(&mut tokens, sig);
        tokens.push(SigToken::Close);
        Signature(tokens)
    }

    /// Call-site signature: argument types, lvalues marked with `&`
    pub fn of_call(args: &[ArgSig]) -> Self {
        let mut tokens = vec![SigToken::Function, SigToken::Return, SigToken::Open];
        for arg in args {
            push_type(&mut tokens, &arg.ty, arg.readonly);
            if arg.lvalue {
                tokens.push(SigToken::LRef);
            }
        }
        tokens.push(SigToken::Close);
        Signature(tokens)
    }

    pub fn tokens(&self) -> &[SigToken] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Type of one call argument as seen by overload resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSig {
    pub ty: Type,
    pub lvalue: bool,
    pub readonly: bool,
}

impl ArgSig {
    pub fn rvalue(ty: Type) -> Self {
        ArgSig {
            ty,
            lvalue: false,
            readonly: false,
        }
    }

    pub fn lvalue(ty: Type) -> Self {
        ArgSig {
            ty,
            lvalue: true,
            readonly: false,
        }
    }
}

fn push_params(tokens: &mut Vec<SigToken>, sig: &FunctionType) {
    for param in &sig.params {
        push_type(tokens, &param.ty, param.readonly && param.reference);
        if param.reference {
            tokens.push(SigToken::LRef);
        }
        if param.optional {
            tokens.push(SigToken::Optional);
        }
    }
    if sig.variadic {
        tokens.push(SigToken::Ellipsis);
    }
}

fn push_type(tokens: &mut Vec<SigToken>, ty: &Type, readonly: bool) {
    if readonly {
        tokens.push(SigToken::Const);
    }
    match ty {
        Type::Void => tokens.push(SigToken::Name("void".to_string())),
        Type::Dummy => tokens.push(SigToken::Name("dummy".to_string())),
        Type::Arithmetic(kind) => tokens.push(SigToken::Name(kind.name().to_string())),
        Type::Struct(def) => tokens.push(SigToken::Class(def.name.clone())),
        Type::Pointer {
            target,
            const_target,
            ..
        } => {
            push_type(tokens, target, *const_target);
            tokens.push(SigToken::Ptr);
        }
        Type::FunctionPointer(sig) => {
            push_function(tokens, sig);
            tokens.push(SigToken::Ptr);
        }
        Type::Function(sig) => push_function(tokens, sig),
    }
}

fn push_function(tokens: &mut Vec<SigToken>, sig: &FunctionType) {
    tokens.push(SigToken::Function);
    push_type(tokens, &sig.ret, false);
    tokens.push(SigToken::Open);
    push_params(tokens, sig);
    tokens.push(SigToken::Close);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::{ArithKind, ParamType};
    use std::rc::Rc;

    #[test]
    fn test_function_signature_abstracts_return() {
        let mut sig = FunctionType::new(Type::DOUBLE, vec![Type::INT]);
        sig.params.push(ParamType {
            reference: true,
            ..ParamType::new(Type::CHAR)
        });
        assert_eq!(
            Signature::of_function(&sig).to_string(),
            "FUNCTION Return ( int char & )"
        );
    }

    #[test]
    fn test_nested_types_linearize_postfix() {
        let ptr = Type::const_pointer_to(Type::Arithmetic(ArithKind::Int));
        assert_eq!(Signature::of_type(&ptr).to_string(), "const int *");

        let fp = Type::FunctionPointer(Rc::new(FunctionType::new(Type::INT, vec![Type::INT])));
        assert_eq!(Signature::of_type(&fp).to_string(), "FUNCTION int ( int ) *");

        let array = Type::array_of(Type::CHAR, 4);
        assert_eq!(Signature::of_type(&array).to_string(), "char *");
    }

    #[test]
    fn test_call_signature_marks_lvalues() {
        let call = Signature::of_call(&[ArgSig::lvalue(Type::INT), ArgSig::rvalue(Type::DOUBLE)]);
        assert_eq!(call.to_string(), "FUNCTION Return ( int & double )");
    }
}
