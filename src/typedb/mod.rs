//! Type-signature engine and overload resolution
//!
//! - [`signature`]: linearization of types into token sequences
//! - [`matcher`]: structural matching and conversion classification
//! - [`overload`]: per-identifier overload tables and their caches
//!
//! A [`TypeDb`] holds the overload tables of one owner: the global scope, a
//! namespace, or a struct's methods. Resolution keeps the candidates with the
//! fewest casts; more than one left is an ambiguity fault.

pub mod matcher;
pub mod overload;
pub mod signature;

pub use matcher::{ArgAction, GrammarMatcher, NonTerminal, StructuralMatcher};
pub use overload::{FunctionMatch, Overload, OverloadSet};
pub use signature::{ArgSig, SigToken, Signature};

use crate::interpreter::errors::Result;
use crate::runtime::types::{FunctionType, LimitsTable, Type};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Index into the evaluator's function arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

pub struct TypeDb {
    sets: FxHashMap<String, OverloadSet>,
    matcher: Rc<dyn StructuralMatcher>,
}

impl TypeDb {
    pub fn new(matcher: Rc<dyn StructuralMatcher>) -> Self {
        TypeDb {
            sets: FxHashMap::default(),
            matcher,
        }
    }

    pub fn with_limits(limits: LimitsTable) -> Self {
        TypeDb::new(Rc::new(GrammarMatcher::new(NonTerminal::Function, limits)))
    }

    /// Register an overload; an identical signature is a redeclaration fault.
    pub fn add_overload(
        &mut self,
        name: &str,
        ty: Rc<FunctionType>,
        id: FunctionId,
        template_slots: usize,
    ) -> Result<()> {
        let overload = Overload {
            signature: Signature::of_function(&ty),
            id,
            template_slots,
            ty,
        };
        self.sets.entry(name.to_string()).or_default().add(name, overload)
    }

    /// Id of an overload with exactly this signature
    pub fn exact(&self, name: &str, ty: &FunctionType) -> Option<FunctionId> {
        self.sets.get(name)?.exact(&Signature::of_function(ty))
    }

    pub fn resolve(
        &mut self,
        name: &str,
        args: &[ArgSig],
        template_args: &[Type],
    ) -> Result<Option<FunctionMatch>> {
        let Some(set) = self.sets.get_mut(name) else {
            return Ok(None);
        };
        let call = Signature::of_call(args);
        let template_args: Vec<Signature> = template_args.iter().map(Signature::of_type).collect();
        set.resolve(name, self.matcher.as_ref(), &call, &template_args)
    }

    /// The only overload of `name`; `None` when there is none.
    pub fn match_single_function(&self, name: &str) -> Result<Option<(FunctionId, Rc<FunctionType>)>> {
        match self.sets.get(name) {
            Some(set) => Ok(set.single(name)?.map(|o| (o.id, Rc::clone(&o.ty)))),
            None => Ok(None),
        }
    }

    pub fn is_convertible(&self, from: &Type, to: &Type) -> bool {
        self.matcher
            .is_subset(&Signature::of_type(from), &Signature::of_type(to))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn overloads(&self, name: &str) -> &[Overload] {
        self.sets.get(name).map_or(&[][..], OverloadSet::overloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::ArithKind;
    use pretty_assertions::assert_eq;

    fn db() -> TypeDb {
        TypeDb::with_limits(LimitsTable::default())
    }

    fn unary(param: Type) -> Rc<FunctionType> {
        Rc::new(FunctionType::new(Type::Void, vec![param]))
    }

    #[test]
    fn test_promotion_beats_conversion() {
        let mut db = db();
        db.add_overload("f", unary(Type::INT), FunctionId(0), 0).unwrap();
        db.add_overload("f", unary(Type::DOUBLE), FunctionId(1), 0).unwrap();
        let found = db.resolve("f", &[ArgSig::rvalue(Type::CHAR)], &[]).unwrap().unwrap();
        assert_eq!(found.id, FunctionId(0));
        assert_eq!(found.actions, vec![ArgAction::Clone]);
        let found = db.resolve("f", &[ArgSig::rvalue(Type::DOUBLE)], &[]).unwrap().unwrap();
        assert_eq!(found.id, FunctionId(1));
    }

    #[test]
    fn test_ambiguity_lists_candidates() {
        let mut db = db();
        db.add_overload("f", unary(Type::INT), FunctionId(0), 0).unwrap();
        db.add_overload("f", unary(Type::Arithmetic(ArithKind::Long)), FunctionId(1), 0).unwrap();
        let err = db.resolve("f", &[ArgSig::rvalue(Type::DOUBLE)], &[]).unwrap_err();
        assert_eq!(
            err.message,
            "Call of overloaded function 'f' matches more than one candidate:\n\
             1) FUNCTION Return ( int )\n\
             2) FUNCTION Return ( long )"
        );
    }

    #[test]
    fn test_redeclaration_fault() {
        let mut db = db();
        db.add_overload("g", unary(Type::INT), FunctionId(0), 0).unwrap();
        let other_return = Rc::new(FunctionType::new(Type::INT, vec![Type::INT]));
        let err = db.add_overload("g", other_return, FunctionId(1), 0).unwrap_err();
        assert_eq!(err.message, "Redeclaration of a function 'g'");
    }

    #[test]
    fn test_cache_cleared_on_new_overload() {
        let mut db = db();
        db.add_overload("h", unary(Type::DOUBLE), FunctionId(0), 0).unwrap();
        let args = [ArgSig::rvalue(Type::INT)];
        assert_eq!(db.resolve("h", &args, &[]).unwrap().unwrap().id, FunctionId(0));
        db.add_overload("h", unary(Type::INT), FunctionId(1), 0).unwrap();
        assert_eq!(db.resolve("h", &args, &[]).unwrap().unwrap().id, FunctionId(1));
    }

    #[test]
    fn test_no_match_and_single_function() {
        let mut db = db();
        assert!(db.resolve("missing", &[], &[]).unwrap().is_none());
        assert!(db.match_single_function("k").unwrap().is_none());
        db.add_overload("k", unary(Type::INT), FunctionId(3), 0).unwrap();
        assert_eq!(db.match_single_function("k").unwrap().map(|(id, _)| id), Some(FunctionId(3)));
        db.add_overload("k", unary(Type::DOUBLE), FunctionId(4), 0).unwrap();
        let err = db.match_single_function("k").unwrap_err();
        assert_eq!(err.message, "Overloaded function k has multiple candidates");
        let s = Rc::new(FunctionType::new(Type::Void, vec![Type::pointer_to(Type::INT)]));
        assert!(db.resolve("k", &[ArgSig::rvalue(Type::pointer_to(Type::INT))], &[]).unwrap().is_none());
        assert!(db.exact("k", &s).is_none());
    }
}
