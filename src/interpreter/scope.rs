//! Scope stack
//!
//! Scopes are pushed on entering a block, loop, switch body or function and
//! popped on leaving it. The bottom scope is the global scope. A function call
//! pushes a *frame* scope; lookups from inside a call walk the scopes of the
//! current frame and then jump straight to the global scope, so a callee never
//! sees its caller's locals.

use crate::interpreter::errors::{Result, RuntimeError};
use crate::runtime::value::Place;
use rustc_hash::FxHashMap;

pub const GLOBAL: &str = "global";

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    /// First scope of a function call
    pub frame: bool,
    vars: FxHashMap<String, Place>,
    /// Declaration order, for listings
    order: Vec<String>,
}

impl Scope {
    fn new(name: &str, frame: bool) -> Self {
        Scope {
            name: name.to_string(),
            frame,
            vars: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Place> {
        self.vars.get(name)
    }

    /// Variables in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Place)> {
        self.order
            .iter()
            .filter_map(|name| self.vars.get(name).map(|place| (name.as_str(), place)))
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        ScopeStack {
            scopes: vec![Scope::new(GLOBAL, true)],
        }
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        tracing::trace!(scope = name, depth = self.scopes.len(), "enter scope");
        self.scopes.push(Scope::new(name, false));
    }

    pub fn push_frame(&mut self, name: &str) {
        tracing::trace!(scope = name, depth = self.scopes.len(), "enter frame");
        self.scopes.push(Scope::new(name, true));
    }

    /// Pop the innermost scope; the global scope is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            if let Some(scope) = self.scopes.pop() {
                tracing::trace!(scope = %scope.name, "exit scope");
            }
        }
    }

    /// Pop scopes until the stack is `depth` deep again
    pub fn truncate(&mut self, depth: usize) {
        while self.scopes.len() > depth.max(1) {
            self.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn global(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Define `name` in the innermost scope.
    pub fn define(&mut self, name: &str, place: Place) -> Result<()> {
        let last = self.scopes.len() - 1;
        let scope = &mut self.scopes[last];
        if scope.vars.contains_key(name) {
            return Err(RuntimeError::new(format!(
                "{} is already defined in scope {}",
                name, scope.name
            )));
        }
        scope.order.push(name.to_string());
        scope.vars.insert(name.to_string(), place);
        Ok(())
    }

    /// Define `name` in the global scope unless it already exists there.
    pub fn define_global(&mut self, name: &str, place: Place) -> bool {
        let global = &mut self.scopes[0];
        if global.vars.contains_key(name) {
            return false;
        }
        global.order.push(name.to_string());
        global.vars.insert(name.to_string(), place);
        true
    }

    /// Scopes visible from the innermost one: the current frame, innermost
    /// first, then the global scope.
    pub fn visible(&self) -> impl Iterator<Item = &Scope> {
        let frame_start = self
            .scopes
            .iter()
            .rposition(|scope| scope.frame)
            .unwrap_or(0);
        let frame = self.scopes[frame_start..].iter().rev();
        let global = (frame_start > 0).then(|| &self.scopes[0]);
        frame.chain(global)
    }

    pub fn lookup(&self, name: &str) -> Option<Place> {
        self.visible().find_map(|scope| scope.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::ArithKind;
    use crate::runtime::value::{Slot, Value};

    fn place(v: i128) -> Place {
        Place::Slot(Slot::new(Value::int(ArithKind::Int, v)))
    }

    fn read(stack: &ScopeStack, name: &str) -> Option<i128> {
        stack.lookup(name)?.load()?.as_int()
    }

    #[test]
    fn test_shadowing_and_pop() {
        let mut stack = ScopeStack::new();
        stack.define("x", place(1)).unwrap();
        stack.push("CompoundStatement");
        stack.define("x", place(2)).unwrap();
        assert_eq!(read(&stack, "x"), Some(2));
        stack.pop();
        assert_eq!(read(&stack, "x"), Some(1));
    }

    #[test]
    fn test_redefinition_in_same_scope_faults() {
        let mut stack = ScopeStack::new();
        stack.push("CompoundStatement");
        stack.define("y", place(1)).unwrap();
        let err = stack.define("y", place(2)).unwrap_err();
        assert_eq!(err.message, "y is already defined in scope CompoundStatement");
    }

    #[test]
    fn test_frames_hide_caller_locals() {
        let mut stack = ScopeStack::new();
        stack.define("g", place(7)).unwrap();
        stack.push_frame("function main");
        stack.define("local", place(1)).unwrap();
        stack.push("CompoundStatement");
        assert_eq!(read(&stack, "local"), Some(1));
        stack.push_frame("function f");
        assert_eq!(read(&stack, "local"), None);
        assert_eq!(read(&stack, "g"), Some(7));
        stack.truncate(3);
        assert_eq!(read(&stack, "local"), Some(1));
    }

    #[test]
    fn test_global_scope_survives_pop() {
        let mut stack = ScopeStack::new();
        stack.pop();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current().name, GLOBAL);
    }
}
