//! Structural matching of signature token sequences
//!
//! [`GrammarMatcher`] parses token sequences with a small recursive grammar
//! into [`Shape`] trees, then classifies each argument/parameter pair:
//!
//! ```text
//! type      ::= "const"? base ( "*" )* "&"?
//! base      ::= NAME | CLASS | TEMPLATE | "Return" | function
//! function  ::= "FUNCTION" type "(" params ")"
//! params    ::= ( type "?"? )* "..."?
//! ```
//!
//! # Conversions
//!
//! | argument → parameter                               | action |
//! |----------------------------------------------------|--------|
//! | identical type                                     | CLONE  |
//! | integral ranked below `int` → `int`, `float` → `double`, `bool` → integral | CLONE |
//! | other arithmetic → arithmetic                      | CAST   |
//! | `T*` ↔ `void*`, adding `const` to the pointee      | CAST   |
//! | lvalue `T` → `T&`                                  | BORROW |
//! | function → pointer to identical function           | CLONE  |

use crate::runtime::types::{ArithKind, LimitsTable};
use crate::typedb::signature::{SigToken, Signature};

/// How one argument is bound to its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgAction {
    /// Fresh cell holding a copy (converted losslessly if needed)
    Clone,
    /// Alias the argument's cell
    Borrow,
    /// Fresh cell holding the cast value
    Cast,
}

/// Grammar rule a matcher parses a whole sequence as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonTerminal {
    Type,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Name { name: String, readonly: bool },
    Class { name: String, readonly: bool },
    Template { slot: usize, readonly: bool },
    Return,
    Pointer(Box<Shape>),
    Reference(Box<Shape>),
    Function(FunctionShape),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionShape {
    pub ret: Box<Shape>,
    pub params: Vec<ParamShape>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamShape {
    pub shape: Shape,
    pub optional: bool,
}

impl Shape {
    fn readonly(&self) -> bool {
        match self {
            Shape::Name { readonly, .. }
            | Shape::Class { readonly, .. }
            | Shape::Template { readonly, .. } => *readonly,
            _ => false,
        }
    }

    /// Copy with top-level constness removed
    fn unqualified(&self) -> Shape {
        match self {
            Shape::Name { name, .. } => Shape::Name {
                name: name.clone(),
                readonly: false,
            },
            Shape::Class { name, .. } => Shape::Class {
                name: name.clone(),
                readonly: false,
            },
            Shape::Template { slot, .. } => Shape::Template {
                slot: *slot,
                readonly: false,
            },
            other => other.clone(),
        }
    }

    fn arith(&self) -> Option<ArithKind> {
        match self {
            Shape::Name { name, .. } => ArithKind::ALL.iter().copied().find(|k| k.name() == name),
            _ => None,
        }
    }

    fn is_void(&self) -> bool {
        matches!(self, Shape::Name { name, .. } if name == "void")
    }
}

/// Pluggable structural matcher used by the overload tables
pub trait StructuralMatcher {
    /// Whether a value of type `a` converts implicitly to type `b`
    fn is_subset(&self, a: &Signature, b: &Signature) -> bool;

    /// Per-argument actions binding `call` to `candidate`, or `None`
    fn match_function(
        &self,
        call: &Signature,
        candidate: &Signature,
        template_args: &[Signature],
    ) -> Option<Vec<ArgAction>>;
}

pub struct GrammarMatcher {
    root: NonTerminal,
    limits: LimitsTable,
}

impl GrammarMatcher {
    pub fn new(root: NonTerminal, limits: LimitsTable) -> Self {
        GrammarMatcher { root, limits }
    }

    pub fn parse(&self, rule: NonTerminal, signature: &Signature) -> Option<Shape> {
        let mut parser = ShapeParser {
            tokens: signature.tokens(),
            position: 0,
        };
        let shape = match rule {
            NonTerminal::Type => parser.parse_type()?,
            NonTerminal::Function => {
                parser.expect(&SigToken::Function)?;
                Shape::Function(parser.parse_function()?)
            }
        };
        (parser.position == parser.tokens.len()).then_some(shape)
    }

    fn is_promotion(&self, from: ArithKind, to: ArithKind) -> bool {
        match (from, to) {
            (ArithKind::Float, ArithKind::Double) => true,
            (ArithKind::Bool, to) => to.is_integral(),
            (from, ArithKind::Int) => {
                from.is_integral() && self.limits.rank(from) < self.limits.rank(ArithKind::Int)
            }
            _ => false,
        }
    }

    fn convert(&self, arg: &Shape, param: &Shape, bindings: &[Shape]) -> Option<ArgAction> {
        match (arg, param) {
            (Shape::Reference(a), Shape::Reference(p)) => {
                if a.unqualified() == p.unqualified() && (p.readonly() || !a.readonly()) {
                    Some(ArgAction::Borrow)
                } else if p.readonly() {
                    self.convert_value(a, p, bindings)
                } else {
                    None
                }
            }
            (_, Shape::Reference(p)) if p.readonly() => self.convert_value(arg, p, bindings),
            (_, Shape::Reference(_)) => None,
            (Shape::Reference(a), p) => self.convert_value(a, p, bindings),
            (a, p) => self.convert_value(a, p, bindings),
        }
    }

    fn convert_value(&self, arg: &Shape, param: &Shape, bindings: &[Shape]) -> Option<ArgAction> {
        if let Shape::Template { slot, .. } = param {
            return match bindings.get(*slot) {
                Some(bound) => self.convert_value(arg, bound, bindings),
                None => Some(ArgAction::Clone),
            };
        }
        if arg.unqualified() == param.unqualified() {
            return Some(ArgAction::Clone);
        }
        match (arg, param) {
            (a, p) if a.arith().is_some() && p.arith().is_some() => {
                let (from, to) = (a.arith()?, p.arith()?);
                if self.is_promotion(from, to) {
                    Some(ArgAction::Clone)
                } else {
                    Some(ArgAction::Cast)
                }
            }
            (Shape::Pointer(a), Shape::Pointer(p)) => {
                if a.is_void() || p.is_void() {
                    Some(ArgAction::Cast)
                } else if a.unqualified() == p.unqualified() && p.readonly() {
                    Some(ArgAction::Cast)
                } else {
                    None
                }
            }
            (Shape::Function(a), Shape::Pointer(p)) => match p.as_ref() {
                Shape::Function(p) if a == p => Some(ArgAction::Clone),
                _ => None,
            },
            _ => None,
        }
    }
}

impl StructuralMatcher for GrammarMatcher {
    fn is_subset(&self, a: &Signature, b: &Signature) -> bool {
        match (self.parse(NonTerminal::Type, a), self.parse(NonTerminal::Type, b)) {
            (Some(a), Some(b)) => self.convert_value(&a, &b, &[]).is_some(),
            _ => false,
        }
    }

    fn match_function(
        &self,
        call: &Signature,
        candidate: &Signature,
        template_args: &[Signature],
    ) -> Option<Vec<ArgAction>> {
        let Shape::Function(call) = self.parse(self.root, call)? else {
            return None;
        };
        let Shape::Function(candidate) = self.parse(self.root, candidate)? else {
            return None;
        };
        let bindings = template_args
            .iter()
            .map(|arg| self.parse(NonTerminal::Type, arg))
            .collect::<Option<Vec<_>>>()?;

        let args = &call.params;
        if args.len() > candidate.params.len() && !candidate.variadic {
            return None;
        }
        if candidate.params.iter().skip(args.len()).any(|p| !p.optional) {
            return None;
        }

        args.iter()
            .enumerate()
            .map(|(i, arg)| match candidate.params.get(i) {
                Some(param) => self.convert(&arg.shape, &param.shape, &bindings),
                None => Some(ArgAction::Clone),
            })
            .collect()
    }
}

struct ShapeParser<'a> {
    tokens: &'a [SigToken],
    position: usize,
}

impl ShapeParser<'_> {
    fn peek(&self) -> Option<&SigToken> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&SigToken> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn eat(&mut self, token: &SigToken) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &SigToken) -> Option<()> {
        self.eat(token).then_some(())
    }

    fn parse_type(&mut self) -> Option<Shape> {
        let readonly = self.eat(&SigToken::Const);
        let mut shape = match self.advance()?.clone() {
            SigToken::Name(name) => Shape::Name { name, readonly },
            SigToken::Class(name) => Shape::Class { name, readonly },
            SigToken::Template(slot) => Shape::Template { slot, readonly },
            SigToken::Return => Shape::Return,
            SigToken::Function => Shape::Function(self.parse_function()?),
            _ => return None,
        };
        while self.eat(&SigToken::Ptr) {
            shape = Shape::Pointer(Box::new(shape));
        }
        if self.eat(&SigToken::LRef) {
            shape = Shape::Reference(Box::new(shape));
        }
        Some(shape)
    }

    /// After `FUNCTION`: return type and parameter list
    fn parse_function(&mut self) -> Option<FunctionShape> {
        let ret = Box::new(self.parse_type()?);
        self.expect(&SigToken::Open)?;
        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            match self.peek()? {
                SigToken::Close => break,
                SigToken::Ellipsis => {
                    self.position += 1;
                    variadic = true;
                }
                _ => {
                    let shape = self.parse_type()?;
                    let optional = self.eat(&SigToken::Optional);
                    params.push(ParamShape { shape, optional });
                }
            }
        }
        self.expect(&SigToken::Close)?;
        Some(FunctionShape {
            ret,
            params,
            variadic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::{FunctionType, ParamType, Type};
    use crate::typedb::signature::ArgSig;

    fn matcher() -> GrammarMatcher {
        GrammarMatcher::new(NonTerminal::Function, LimitsTable::default())
    }

    fn actions(args: &[ArgSig], params: FunctionType) -> Option<Vec<ArgAction>> {
        matcher().match_function(
            &Signature::of_call(args),
            &Signature::of_function(&params),
            &[],
        )
    }

    #[test]
    fn test_promotion_is_clone_and_conversion_is_cast() {
        let f_int = FunctionType::new(Type::INT, vec![Type::INT]);
        let f_double = FunctionType::new(Type::INT, vec![Type::DOUBLE]);
        let char_arg = [ArgSig::rvalue(Type::CHAR)];
        assert_eq!(actions(&char_arg, f_int), Some(vec![ArgAction::Clone]));
        assert_eq!(actions(&char_arg, f_double), Some(vec![ArgAction::Cast]));
    }

    #[test]
    fn test_reference_parameters_borrow_lvalues() {
        let mut sig = FunctionType::new(Type::Void, vec![]);
        sig.params.push(ParamType {
            reference: true,
            ..ParamType::new(Type::INT)
        });
        assert_eq!(
            actions(&[ArgSig::lvalue(Type::INT)], sig.clone()),
            Some(vec![ArgAction::Borrow])
        );
        assert_eq!(actions(&[ArgSig::rvalue(Type::INT)], sig), None);
    }

    #[test]
    fn test_arity_optional_and_variadic() {
        let mut sig = FunctionType::new(Type::INT, vec![Type::INT, Type::INT]);
        sig.params[1].optional = true;
        assert!(actions(&[ArgSig::rvalue(Type::INT)], sig.clone()).is_some());
        assert!(actions(&[], sig).is_none());

        let printf = FunctionType::new(Type::INT, vec![Type::pointer_to(Type::CHAR)]).variadic();
        let args = [
            ArgSig::rvalue(Type::pointer_to(Type::CHAR)),
            ArgSig::rvalue(Type::DOUBLE),
        ];
        assert_eq!(actions(&args, printf), Some(vec![ArgAction::Clone, ArgAction::Clone]));
    }

    #[test]
    fn test_pointer_subsets() {
        let m = matcher();
        let int_ptr = Signature::of_type(&Type::pointer_to(Type::INT));
        let void_ptr = Signature::of_type(&Type::pointer_to(Type::Void));
        let const_int_ptr = Signature::of_type(&Type::const_pointer_to(Type::INT));
        let double_ptr = Signature::of_type(&Type::pointer_to(Type::DOUBLE));
        assert!(m.is_subset(&int_ptr, &void_ptr));
        assert!(m.is_subset(&void_ptr, &int_ptr));
        assert!(m.is_subset(&int_ptr, &const_int_ptr));
        assert!(!m.is_subset(&int_ptr, &double_ptr));
    }
}
