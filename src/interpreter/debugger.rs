//! Stepping and breakpoints on top of [`Interpreter`]
//!
//! A breakpoint is a named predicate over the node left behind and the node
//! about to run. [`Debugger::continue_run`] steps until any enabled predicate
//! returns true. Three are built in:
//!
//! | name               | fires when                         | default  |
//! |--------------------|------------------------------------|----------|
//! | `is_statement`     | the next node is a statement       | disabled |
//! | `position_changed` | the next node starts elsewhere     | disabled |
//! | `line_changed`     | the next node is on another line   | enabled  |

use crate::interpreter::engine::{Interpreter, RunOutcome, StepResult};
use crate::interpreter::errors::Result;
use crate::parser::ast::NodeInfo;
use crate::runtime::format::value_string;
use crate::runtime::types::Type;
use crate::runtime::value::Value;
use rustc_hash::FxHashSet;

pub const IS_STATEMENT: &str = "is_statement";
pub const POSITION_CHANGED: &str = "position_changed";
pub const LINE_CHANGED: &str = "line_changed";

/// Breakpoint predicate: `(previous node, next node)`
pub type BreakCondition = Box<dyn Fn(Option<&NodeInfo>, Option<&NodeInfo>) -> bool>;

struct Condition {
    name: String,
    check: BreakCondition,
    enabled: bool,
}

/// One row of the variable listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub ty: String,
    pub value: String,
}

impl VariableInfo {
    fn new(name: &str, value: &Value) -> Self {
        VariableInfo {
            name: name.to_string(),
            ty: value.ty.to_string(),
            value: value_string(value),
        }
    }
}

fn is_statement(_prev: Option<&NodeInfo>, next: Option<&NodeInfo>) -> bool {
    next.is_some_and(|node| node.kind.is_statement())
}

fn position_changed(prev: Option<&NodeInfo>, next: Option<&NodeInfo>) -> bool {
    prev.map(|node| node.span.start) != next.map(|node| node.span.start)
}

fn line_changed(prev: Option<&NodeInfo>, next: Option<&NodeInfo>) -> bool {
    prev.map(|node| node.span.line) != next.map(|node| node.span.line)
}

pub struct Debugger {
    interpreter: Interpreter,
    conditions: Vec<Condition>,
}

impl Debugger {
    pub fn new(interpreter: Interpreter) -> Self {
        let mut debugger = Debugger {
            interpreter,
            conditions: Vec::new(),
        };
        debugger.set_condition(IS_STATEMENT, Box::new(is_statement));
        debugger.set_condition(POSITION_CHANGED, Box::new(position_changed));
        debugger.set_condition(LINE_CHANGED, Box::new(line_changed));
        debugger.enable_condition(LINE_CHANGED);
        debugger
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Add a predicate, or replace the one with the same name keeping its
    /// enabled flag. New predicates start disabled.
    pub fn set_condition(&mut self, name: &str, check: BreakCondition) {
        match self.conditions.iter_mut().find(|c| c.name == name) {
            Some(condition) => condition.check = check,
            None => self.conditions.push(Condition {
                name: name.to_string(),
                check,
                enabled: false,
            }),
        }
    }

    fn toggle(&mut self, name: &str, enabled: bool) -> bool {
        match self.conditions.iter_mut().find(|c| c.name == name) {
            Some(condition) => {
                condition.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns false when no predicate has that name
    pub fn enable_condition(&mut self, name: &str) -> bool {
        self.toggle(name, true)
    }

    pub fn disable_condition(&mut self, name: &str) -> bool {
        self.toggle(name, false)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.conditions.iter().any(|c| c.name == name && c.enabled)
    }

    /// Advance exactly one quantum
    pub fn step(&mut self) -> Result<StepResult> {
        self.interpreter.step()
    }

    /// Step until an enabled predicate fires (`Paused`), or the program
    /// finishes, waits for input or is cancelled
    pub fn continue_run(&mut self, cancel: &dyn Fn() -> bool) -> Result<RunOutcome> {
        let conditions = &self.conditions;
        step_until(&mut self.interpreter, cancel, |prev, next| {
            conditions
                .iter()
                .any(|c| c.enabled && (c.check)(prev, next))
        })
    }

    /// Next node boundary
    pub fn next_node(&mut self) -> Result<StepResult> {
        self.step()
    }

    /// Run to the first node on a different line
    pub fn next_line(&mut self) -> Result<RunOutcome> {
        step_until(&mut self.interpreter, &|| false, line_changed)
    }

    /// Source text of the current node
    pub fn next_node_text(&self) -> Option<String> {
        let node = self.interpreter.cursor()?;
        let text = self
            .interpreter
            .source()
            .chars()
            .skip(node.span.start)
            .take(node.span.end.saturating_sub(node.span.start))
            .collect();
        Some(text)
    }

    /// Value of a variable visible from the current node
    pub fn variable(&self, name: &str) -> Option<VariableInfo> {
        let value = self.interpreter.evaluator().lookup(name)?.load()?;
        Some(VariableInfo::new(name, &value))
    }

    /// Variables visible from the current node, innermost scope first;
    /// shadowed names and functions are left out
    pub fn variables(&self) -> Vec<VariableInfo> {
        let scopes = self.interpreter.evaluator().scopes.borrow();
        let mut seen = FxHashSet::default();
        let mut listing = Vec::new();
        for scope in scopes.visible() {
            for (name, place) in scope.entries() {
                if !seen.insert(name.to_string()) {
                    continue;
                }
                let Some(value) = place.load() else {
                    continue;
                };
                if matches!(value.ty, Type::Function(_)) {
                    continue;
                }
                listing.push(VariableInfo::new(name, &value));
            }
        }
        listing
    }
}

fn step_until(
    interpreter: &mut Interpreter,
    cancel: &dyn Fn() -> bool,
    fires: impl Fn(Option<&NodeInfo>, Option<&NodeInfo>) -> bool,
) -> Result<RunOutcome> {
    loop {
        if cancel() {
            return Ok(RunOutcome::Cancelled);
        }
        let prev = interpreter.cursor();
        match interpreter.step()? {
            StepResult::Finished(code) => return Ok(RunOutcome::Finished(code)),
            StepResult::AwaitingInput => return Ok(RunOutcome::AwaitingInput),
            StepResult::Running => {
                let next = interpreter.cursor();
                if fires(prev.as_ref(), next.as_ref()) {
                    return Ok(RunOutcome::Paused);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::runtime::config::Config;
    use crate::runtime::Runtime;
    use pretty_assertions::assert_eq;

    fn debugger(source: &str) -> Debugger {
        let program = parse_source(source).unwrap();
        Debugger::new(Interpreter::new(program, source, Runtime::new(Config::default())))
    }

    #[test]
    fn test_default_conditions() {
        let dbg = debugger("int main() { return 0; }");
        assert!(dbg.is_enabled(LINE_CHANGED));
        assert!(!dbg.is_enabled(IS_STATEMENT));
        assert!(!dbg.is_enabled(POSITION_CHANGED));
    }

    #[test]
    fn test_next_line_moves_one_line() {
        let source = "int main() {\n  int a = 1;\n  int b = 2;\n  return a + b;\n}\n";
        let mut dbg = debugger(source);
        let mut lines = Vec::new();
        while let RunOutcome::Paused = dbg.next_line().unwrap() {
            lines.push(dbg.interpreter().cursor().unwrap().span.line);
        }
        assert!(lines.windows(2).all(|w| w[0] != w[1]));
        assert!(lines.contains(&3));
        assert_eq!(dbg.interpreter().exit_code(), Some(3));
    }

    #[test]
    fn test_variables_listing() {
        let source = "int g = 4;\nint main() {\n  int x = 1;\n  {\n    int x = 2;\n    int y = 3;\n    return 0;\n  }\n}\n";
        let mut dbg = debugger(source);
        while dbg.variable("y").is_none() {
            dbg.step().unwrap();
        }
        let vars = dbg.variables();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "g"]);
        assert_eq!(vars[0].value, "2");
        assert_eq!(vars[0].ty, "int");
    }

    #[test]
    fn test_custom_condition() {
        let source = "int main() {\n  int a = 1;\n  a = a + 1;\n  return a;\n}\n";
        let mut dbg = debugger(source);
        dbg.disable_condition(LINE_CHANGED);
        dbg.set_condition(
            "assignment",
            Box::new(|_, next| {
                next.is_some_and(|n| n.kind == crate::parser::ast::NodeKind::AssignmentExpression)
            }),
        );
        assert!(dbg.enable_condition("assignment"));
        assert_eq!(dbg.continue_run(&|| false).unwrap(), RunOutcome::Paused);
        assert_eq!(dbg.next_node_text().as_deref(), Some("a = a + 1"));
        assert_eq!(dbg.continue_run(&|| false).unwrap(), RunOutcome::Finished(2));
    }
}
