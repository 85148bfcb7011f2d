//! Per-identifier overload tables
//!
//! Each [`OverloadSet`] keeps its overloads in declaration order plus two
//! caches:
//!
//! - exact: abstracted signature text → function id (redeclaration check and
//!   prototype/definition pairing)
//! - fuzzy: call-site signature text → best match or none, cleared whenever
//!   an overload is added

use crate::interpreter::errors::{Result, RuntimeError};
use crate::runtime::types::FunctionType;
use crate::typedb::matcher::{ArgAction, StructuralMatcher};
use crate::typedb::signature::Signature;
use crate::typedb::FunctionId;
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Overload {
    pub signature: Signature,
    pub id: FunctionId,
    pub template_slots: usize,
    pub ty: Rc<FunctionType>,
}

/// Successful resolution of a call
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMatch {
    pub id: FunctionId,
    pub ty: Rc<FunctionType>,
    pub actions: Vec<ArgAction>,
}

impl FunctionMatch {
    pub fn casts(&self) -> usize {
        self.actions.iter().filter(|a| **a == ArgAction::Cast).count()
    }
}

#[derive(Debug, Default)]
pub struct OverloadSet {
    overloads: Vec<Overload>,
    exact: FxHashMap<String, FunctionId>,
    fuzzy: FxHashMap<String, Option<FunctionMatch>>,
}

impl OverloadSet {
    pub fn overloads(&self) -> &[Overload] {
        &self.overloads
    }

    pub fn exact(&self, signature: &Signature) -> Option<FunctionId> {
        self.exact.get(&signature.to_string()).copied()
    }

    pub fn add(&mut self, name: &str, overload: Overload) -> Result<()> {
        let key = overload.signature.to_string();
        if self.exact.contains_key(&key) {
            return Err(RuntimeError::new(format!("Redeclaration of a function '{}'", name)));
        }
        tracing::debug!(function = name, signature = %key, "registered overload");
        self.exact.insert(key, overload.id);
        self.overloads.push(overload);
        self.fuzzy.clear();
        Ok(())
    }

    pub fn resolve(
        &mut self,
        name: &str,
        matcher: &dyn StructuralMatcher,
        call: &Signature,
        template_args: &[Signature],
    ) -> Result<Option<FunctionMatch>> {
        let mut key = call.to_string();
        for arg in template_args {
            key.push_str(" <");
            key.push_str(&arg.to_string());
            key.push('>');
        }
        if let Some(cached) = self.fuzzy.get(&key) {
            return Ok(cached.clone());
        }
        tracing::trace!(function = name, call = %key, "overload cache miss");

        let candidates: Vec<(&Overload, FunctionMatch)> = self
            .overloads
            .iter()
            .filter(|o| o.template_slots >= template_args.len())
            .filter_map(|o| {
                let actions = matcher.match_function(call, &o.signature, template_args)?;
                Some((
                    o,
                    FunctionMatch {
                        id: o.id,
                        ty: Rc::clone(&o.ty),
                        actions,
                    },
                ))
            })
            .collect();

        let best = candidates.iter().map(|(_, m)| m.casts()).min();
        let tied: Vec<&(&Overload, FunctionMatch)> = candidates
            .iter()
            .filter(|(_, m)| Some(m.casts()) == best)
            .collect();

        let result = match tied.as_slice() {
            [] => None,
            [(_, single)] => Some(single.clone()),
            several => {
                let listing: Vec<String> = several
                    .iter()
                    .enumerate()
                    .map(|(i, (o, _))| format!("{}) {}", i + 1, o.signature))
                    .collect();
                return Err(RuntimeError::new(format!(
                    "Call of overloaded function '{}' matches more than one candidate:\n{}",
                    name,
                    listing.join("\n")
                )));
            }
        };
        self.fuzzy.insert(key, result.clone());
        Ok(result)
    }

    pub fn single(&self, name: &str) -> Result<Option<&Overload>> {
        match self.overloads.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only)),
            _ => Err(RuntimeError::new(format!(
                "Overloaded function {} has multiple candidates",
                name
            ))),
        }
    }
}
