//! Evaluator state and the suspension contract
//!
//! The evaluator walks the AST as a tree of boxed futures. Visiting a node
//! first awaits [`Evaluator::enter`], which records the node as the cursor and
//! returns `Pending` exactly once, so every visited node costs one quantum.
//! The host ([`Interpreter`](crate::interpreter::engine::Interpreter)) polls
//! the root future with a no-op waker and inspects the cursor between quanta.
//!
//! Per-run state lives in `RefCell`s that are only borrowed for the duration
//! of a synchronous step; no borrow is held across an `.await`.
//!
//! The visitors are split across modules as `impl Evaluator` blocks:
//! - `declarations`: declarators, declarations, functions, structs
//! - `initializers`: default values and brace initialization
//! - `statements`, `loops`, `jumps`: statements and control flow
//! - `expressions`, `calls`: expressions and function invocation

use crate::interpreter::errors::{Result, RuntimeError};
use crate::interpreter::library::{Library, OpenFiles};
use crate::interpreter::namespace::Namespaces;
use crate::interpreter::scope::{ScopeStack, GLOBAL};
use crate::parser::ast::{Expr, NodeInfo, Stmt};
use crate::runtime::cast;
use crate::runtime::config::{Config, ConsoleRead};
use crate::runtime::ops::{Op, OpContext, TypeOracle};
use crate::runtime::types::{FunctionType, StructType, Type};
use crate::runtime::value::{Data, FunctionRef, Place, Slot, Value};
use crate::runtime::Runtime;
use crate::typedb::{ArgSig, FunctionId, FunctionMatch, TypeDb};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};

pub type EvalFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

/// Library function: receives the evaluator and the converted arguments
pub type NativeFn = for<'a> fn(&'a Evaluator, Vec<Value>) -> EvalFuture<'a, Value>;

/// Why the evaluator last returned `Pending`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// A node boundary
    Quantum,
    /// A library call needs console input that is not buffered yet
    AwaitingInput,
}

/// How a statement completed
#[derive(Debug, Clone)]
pub enum Signal {
    Normal,
    Break,
    Continue,
    Return(Option<Value>),
}

impl Signal {
    pub fn is_normal(&self) -> bool {
        matches!(self, Signal::Normal)
    }
}

/// Parameters threaded through a visit
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Name of the construct whose scope is active
    pub scope: &'static str,
    /// Discriminant of the enclosing `switch`
    pub switch: Option<Value>,
    /// Struct type expected by a brace initializer
    pub struct_type: Option<Rc<StructType>>,
}

impl Context {
    pub fn new(scope: &'static str) -> Self {
        Context {
            scope,
            ..Context::default()
        }
    }

    pub fn with_scope(&self, scope: &'static str) -> Self {
        Context {
            scope,
            ..self.clone()
        }
    }

    pub fn with_struct_type(&self, struct_type: Option<Rc<StructType>>) -> Self {
        Context {
            struct_type,
            ..self.clone()
        }
    }
}

#[derive(Clone)]
pub enum FunctionBody {
    /// Declared by a prototype, body not seen yet
    Prototype,
    Defined(Rc<Stmt>),
    Native(NativeFn),
}

#[derive(Debug, Clone, Default)]
pub struct ParamInfo {
    pub name: Option<String>,
    pub default: Option<Rc<Expr>>,
}

/// One overload in the function arena
#[derive(Clone)]
pub struct FunctionEntry {
    pub name: String,
    /// Overload table holding this function: `global` or `struct Name`
    pub owner: String,
    pub ty: Rc<FunctionType>,
    pub params: Vec<ParamInfo>,
    pub body: FunctionBody,
}

/// Returns `Pending` once, then `Ready`
#[derive(Default)]
struct Yield {
    done: bool,
}

impl Future for Yield {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.done {
            Poll::Ready(())
        } else {
            self.done = true;
            Poll::Pending
        }
    }
}

pub struct Evaluator {
    runtime: Rc<Runtime>,
    pub(crate) scopes: RefCell<ScopeStack>,
    /// Overload tables by owner
    pub(crate) typedbs: RefCell<FxHashMap<String, TypeDb>>,
    pub(crate) functions: RefCell<Vec<FunctionEntry>>,
    pub(crate) structs: RefCell<FxHashMap<String, Rc<StructType>>>,
    pub(crate) typedefs: RefCell<FxHashMap<String, Type>>,
    pub(crate) namespaces: RefCell<Namespaces>,
    pub(crate) files: RefCell<OpenFiles>,
    loaded: RefCell<Vec<Rc<dyn Library>>>,
    cursor: Cell<Option<NodeInfo>>,
    suspension: Cell<Option<Suspension>>,
}

impl Evaluator {
    pub fn new(runtime: Rc<Runtime>) -> Self {
        let mut typedbs = FxHashMap::default();
        typedbs.insert(
            GLOBAL.to_string(),
            TypeDb::with_limits(runtime.config.limits.clone()),
        );
        Evaluator {
            runtime,
            scopes: RefCell::new(ScopeStack::new()),
            typedbs: RefCell::new(typedbs),
            functions: RefCell::new(Vec::new()),
            structs: RefCell::new(FxHashMap::default()),
            typedefs: RefCell::new(FxHashMap::default()),
            namespaces: RefCell::new(Namespaces::new()),
            files: RefCell::new(OpenFiles::default()),
            loaded: RefCell::new(Vec::new()),
            cursor: Cell::new(None),
            suspension: Cell::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.runtime.config
    }

    /// Node most recently entered
    pub fn cursor(&self) -> Option<NodeInfo> {
        self.cursor.get()
    }

    pub(crate) fn set_cursor(&self, node: Option<NodeInfo>) {
        self.cursor.set(node);
    }

    pub fn take_suspension(&self) -> Option<Suspension> {
        self.suspension.take()
    }

    /// Node boundary: record the cursor and suspend for one quantum
    pub(crate) async fn enter(&self, node: NodeInfo) {
        self.cursor.set(Some(node));
        self.suspension.set(Some(Suspension::Quantum));
        Yield::default().await;
    }

    /// Next console character, suspending while no input is buffered.
    /// `None` at end of input.
    pub async fn read_char(&self) -> Option<char> {
        loop {
            match self.config().console.read() {
                ConsoleRead::Ready(c) => return Some(c),
                ConsoleRead::Eof => return None,
                ConsoleRead::Pending => {
                    self.suspension.set(Some(Suspension::AwaitingInput));
                    Yield::default().await;
                }
            }
        }
    }

    pub(crate) fn fault(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::at(message, self.cursor.get())
    }

    pub(crate) fn ops(&self) -> OpContext<'_> {
        OpContext {
            config: &self.runtime.config,
            oracle: self,
            node: self.cursor.get(),
        }
    }

    pub(crate) fn apply(&self, op: Op, l: &Value, r: Option<&Value>) -> Result<Value> {
        self.runtime.registry.apply(&self.ops(), op, l, r)
    }

    pub(crate) fn cast(&self, value: &Value, ty: &Type, explicit: bool) -> Result<Value> {
        cast::cast(&self.ops(), value, ty, explicit)
    }

    pub(crate) fn registry_call(
        &self,
        callee: &Value,
        args: &[ArgSig],
        template_args: &[Type],
    ) -> Result<crate::runtime::ops::CallTarget> {
        self.runtime
            .registry
            .call(&self.ops(), callee, args, template_args)
    }

    // ===== Scopes =====

    pub(crate) fn push_scope(&self, name: &str) {
        self.scopes.borrow_mut().push(name);
    }

    pub(crate) fn push_frame(&self, name: &str) {
        self.scopes.borrow_mut().push_frame(name);
    }

    pub(crate) fn pop_scope(&self) {
        self.scopes.borrow_mut().pop();
    }

    pub(crate) fn scope_depth(&self) -> usize {
        self.scopes.borrow().depth()
    }

    pub(crate) fn truncate_scopes(&self, depth: usize) {
        self.scopes.borrow_mut().truncate(depth);
    }

    /// Bind `name` to an existing cell in the innermost scope
    pub(crate) fn declare(&self, name: &str, place: Place) -> Result<()> {
        self.scopes
            .borrow_mut()
            .define(name, place)
            .map_err(|e| e.or_at(self.cursor.get()))
    }

    /// Define `name` in the innermost scope holding `value`
    pub(crate) fn define_variable(&self, name: &str, value: Value) -> Result<Place> {
        let place = Place::Slot(Slot::new(value));
        self.declare(name, place.clone())?;
        Ok(place)
    }

    /// Bare-name lookup: current frame, global scope, imported namespaces
    pub fn lookup(&self, name: &str) -> Option<Place> {
        if let Some(place) = self.scopes.borrow().lookup(name) {
            return Some(place);
        }
        self.namespaces.borrow().lookup_imported(name)
    }

    // ===== Types =====

    pub fn struct_type(&self, name: &str) -> Option<Rc<StructType>> {
        self.structs.borrow().get(name).cloned()
    }

    pub fn define_struct(&self, def: StructType) -> Rc<StructType> {
        let def = Rc::new(def);
        self.structs
            .borrow_mut()
            .insert(def.name.clone(), Rc::clone(&def));
        def
    }

    pub fn define_typedef(&self, name: &str, ty: Type) {
        self.typedefs.borrow_mut().insert(name.to_string(), ty);
    }

    // ===== Functions =====

    pub(crate) fn function(&self, id: FunctionId) -> Result<FunctionEntry> {
        self.functions
            .borrow()
            .get(id.0)
            .cloned()
            .ok_or_else(|| self.fault(format!("unknown function #{}", id.0)))
    }

    /// Register an overload in its owner's table. A body for an earlier
    /// prototype attaches to the prototype's id.
    pub(crate) fn register_function(&self, entry: FunctionEntry) -> Result<FunctionId> {
        let limits = self.config().limits.clone();
        let mut dbs = self.typedbs.borrow_mut();
        let db = dbs
            .entry(entry.owner.clone())
            .or_insert_with(|| TypeDb::with_limits(limits));

        if let Some(id) = db.exact(&entry.name, &entry.ty) {
            let mut functions = self.functions.borrow_mut();
            let existing = functions
                .get_mut(id.0)
                .ok_or_else(|| self.fault(format!("unknown function #{}", id.0)))?;
            if existing.ty.ret != entry.ty.ret {
                return Err(self.fault(format!("Redeclaration of a function '{}'", entry.name)));
            }
            return match (&existing.body, &entry.body) {
                (_, FunctionBody::Prototype) => Ok(id),
                (FunctionBody::Prototype, _) => {
                    existing.body = entry.body;
                    existing.params = entry.params;
                    Ok(id)
                }
                _ => Err(self.fault(format!("Redeclaration of a function '{}'", entry.name))),
            };
        }

        let mut functions = self.functions.borrow_mut();
        let id = FunctionId(functions.len());
        db.add_overload(&entry.name, Rc::clone(&entry.ty), id, 0)
            .map_err(|e| e.or_at(self.cursor.get()))?;
        functions.push(entry);
        Ok(id)
    }

    /// Function value naming the overload set `name` of `owner`
    pub(crate) fn function_value(name: &str, owner: &str, ty: Rc<FunctionType>) -> Value {
        Value::new(
            Type::Function(ty),
            Data::Function(FunctionRef::new(name, owner)),
        )
        .readonly(true)
    }

    /// Make a global overload set visible by name
    pub(crate) fn define_global_function(&self, name: &str, ty: Rc<FunctionType>) {
        let value = Evaluator::function_value(name, GLOBAL, ty);
        self.scopes
            .borrow_mut()
            .define_global(name, Place::Slot(Slot::new(value)));
    }

    /// Register a library function in the global scope
    pub fn define_native(&self, name: &str, ty: FunctionType, native: NativeFn) -> Result<()> {
        let ty = Rc::new(ty);
        self.register_function(FunctionEntry {
            name: name.to_string(),
            owner: GLOBAL.to_string(),
            ty: Rc::clone(&ty),
            params: vec![ParamInfo::default(); ty.params.len()],
            body: FunctionBody::Native(native),
        })?;
        self.define_global_function(name, ty);
        Ok(())
    }

    /// Make global `name` reachable as `namespace::name`
    pub fn bind_namespace(&self, namespace: &str, name: &str) -> Result<()> {
        let place = self
            .scopes
            .borrow()
            .global()
            .get(name)
            .cloned()
            .ok_or_else(|| self.fault(format!("undefined identifier {}", name)))?;
        self.namespaces.borrow_mut().bind(namespace, name, place);
        Ok(())
    }

    /// Load a library once per run
    pub(crate) fn load_library(&self, name: &str) -> Result<()> {
        let library = self
            .config()
            .library(name)
            .cloned()
            .ok_or_else(|| self.fault(format!("cannot find library {}", name)))?;
        let already = self
            .loaded
            .borrow()
            .iter()
            .any(|loaded| std::ptr::addr_eq(Rc::as_ptr(loaded), Rc::as_ptr(&library)));
        if already {
            return Ok(());
        }
        tracing::info!(library = name, "loading library");
        self.loaded.borrow_mut().push(Rc::clone(&library));
        library.load(self)
    }

    fn typedb_of<R>(&self, owner: &str, f: impl FnOnce(&mut TypeDb) -> Result<R>) -> Result<Option<R>> {
        let mut dbs = self.typedbs.borrow_mut();
        match dbs.get_mut(owner) {
            Some(db) => f(db).map(Some),
            None => Ok(None),
        }
    }
}

impl TypeOracle for Evaluator {
    fn resolve_call(
        &self,
        function: &FunctionRef,
        args: &[ArgSig],
        template_args: &[Type],
    ) -> Result<Option<FunctionMatch>> {
        Ok(self
            .typedb_of(&function.owner, |db| db.resolve(&function.name, args, template_args))?
            .flatten())
    }

    fn single_function(&self, function: &FunctionRef) -> Result<Option<Rc<FunctionType>>> {
        Ok(self
            .typedb_of(&function.owner, |db| db.match_single_function(&function.name))?
            .flatten()
            .map(|(_, ty)| ty))
    }

    fn is_convertible(&self, from: &Type, to: &Type) -> bool {
        self.typedbs
            .borrow()
            .get(GLOBAL)
            .is_some_and(|db| db.is_convertible(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::config::Config;
    use crate::runtime::types::ArithKind;
    use std::task::Waker;

    fn evaluator() -> Evaluator {
        Evaluator::new(Runtime::new(Config::default()))
    }

    #[test]
    fn test_enter_suspends_once() {
        let ev = evaluator();
        let node = NodeInfo {
            kind: crate::parser::ast::NodeKind::Literal,
            span: crate::parser::ast::Span::new(0, 1, 1, 1),
        };
        let mut task = Box::pin(ev.enter(node));
        let mut cx = TaskContext::from_waker(Waker::noop());
        assert!(task.as_mut().poll(&mut cx).is_pending());
        assert_eq!(ev.take_suspension(), Some(Suspension::Quantum));
        assert_eq!(ev.cursor(), Some(node));
        assert!(task.as_mut().poll(&mut cx).is_ready());
    }

    #[test]
    fn test_prototype_then_definition_shares_id() {
        let ev = evaluator();
        let ty = Rc::new(FunctionType::new(Type::INT, vec![Type::INT]));
        let entry = |body| FunctionEntry {
            name: "f".to_string(),
            owner: GLOBAL.to_string(),
            ty: Rc::clone(&ty),
            params: vec![ParamInfo::default()],
            body,
        };
        let proto = ev.register_function(entry(FunctionBody::Prototype)).unwrap();
        let body = Rc::new(Stmt::new(
            crate::parser::ast::StmtKind::Compound(Vec::new()),
            Default::default(),
        ));
        let defined = ev
            .register_function(entry(FunctionBody::Defined(Rc::clone(&body))))
            .unwrap();
        assert_eq!(proto, defined);
        let err = ev
            .register_function(entry(FunctionBody::Defined(body)))
            .unwrap_err();
        assert_eq!(err.message, "Redeclaration of a function 'f'");
    }

    #[test]
    fn test_oracle_resolves_registered_overload() {
        let ev = evaluator();
        let ty = Rc::new(FunctionType::new(Type::Void, vec![Type::DOUBLE]));
        ev.register_function(FunctionEntry {
            name: "g".to_string(),
            owner: GLOBAL.to_string(),
            ty,
            params: vec![ParamInfo::default()],
            body: FunctionBody::Prototype,
        })
        .unwrap();
        let found = ev
            .resolve_call(
                &FunctionRef::new("g", GLOBAL),
                &[ArgSig::rvalue(Type::Arithmetic(ArithKind::Float))],
                &[],
            )
            .unwrap();
        assert!(found.is_some());
        assert!(ev
            .resolve_call(&FunctionRef::new("g", "struct Missing"), &[], &[])
            .unwrap()
            .is_none());
    }
}
