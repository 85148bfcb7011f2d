//! Runtime value representation
//!
//! This module defines [`Value`], the canonical runtime value: a type
//! descriptor, a raw payload ([`Data`]), the lvalue [`Place`] it was read from
//! (if any), a readonly flag and an optional declared-source-type annotation
//! for `auto` declarations.
//!
//! # Storage
//!
//! Storage is reference counted rather than address based:
//!
//! - [`Slot`]: a single variable cell
//! - [`Store`]: the backing store of an array or the members of a struct
//!
//! Pointers hold clones of these handles, so a cell stays reachable for as
//! long as any pointer still refers to it. A pointer whose handle is `None` is
//! null.

use crate::runtime::types::{ArithKind, Type};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A single storage cell
#[derive(Clone)]
pub struct Slot(Rc<RefCell<Value>>);

impl Slot {
    pub fn new(value: Value) -> Self {
        Slot(Rc::new(RefCell::new(value)))
    }

    pub fn ptr_eq(&self, other: &Slot) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:p})", Rc::as_ptr(&self.0))
    }
}

/// Backing store of an array or of a struct's members
#[derive(Clone)]
pub struct Store(Rc<RefCell<Vec<Value>>>);

impl Store {
    pub fn new(values: Vec<Value>) -> Self {
        Store(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Snapshot of all elements
    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Fresh store whose elements are deep copies, keeping their flags
    pub fn deep_copy(&self) -> Store {
        let values = self
            .0
            .borrow()
            .iter()
            .map(|v| v.deep_copy().readonly(v.readonly))
            .collect();
        Store::new(values)
    }

    fn with_mut<R>(&self, index: usize, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        self.0.borrow_mut().get_mut(index).map(f)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store({:p}, len {})", Rc::as_ptr(&self.0), self.len())
    }
}

/// A live storage location: what makes a value an lvalue
#[derive(Debug, Clone)]
pub enum Place {
    Slot(Slot),
    /// Element of an array backing store
    Element { store: Store, index: usize },
    /// Member of a struct
    Member { store: Store, index: usize },
}

impl Place {
    /// Read the stored value; the result is an lvalue bound to this place.
    /// `None` when an element index is outside its store.
    pub fn load(&self) -> Option<Value> {
        let mut value = match self {
            Place::Slot(slot) => slot.0.borrow().clone(),
            Place::Element { store, index } | Place::Member { store, index } => store.get(*index)?,
        };
        value.place = Some(self.clone());
        Some(value)
    }

    /// Overwrite type and payload, keeping the cell's readonly flag and
    /// declared annotation. Returns false for an out-of-range element.
    pub fn store(&self, value: Value) -> bool {
        let write = |cell: &mut Value| {
            cell.ty = value.ty;
            cell.data = value.data;
        };
        match self {
            Place::Slot(slot) => {
                write(&mut slot.0.borrow_mut());
                true
            }
            Place::Element { store, index } | Place::Member { store, index } => {
                store.with_mut(*index, write).is_some()
            }
        }
    }

    /// Initialize the cell completely (type, payload, flags).
    pub fn init(&self, value: Value) -> bool {
        let value = Value {
            place: None,
            ..value
        };
        match self {
            Place::Slot(slot) => {
                *slot.0.borrow_mut() = value;
                true
            }
            Place::Element { store, index } | Place::Member { store, index } => {
                store.with_mut(*index, |cell| *cell = value).is_some()
            }
        }
    }

    pub fn same(&self, other: &Place) -> bool {
        match (self, other) {
            (Place::Slot(a), Place::Slot(b)) => a.ptr_eq(b),
            (Place::Element { store: a, index: i }, Place::Element { store: b, index: j })
            | (Place::Member { store: a, index: i }, Place::Member { store: b, index: j }) => {
                a.ptr_eq(b) && i == j
            }
            _ => false,
        }
    }
}

/// Target of a function value: overload set name, owning type and receiver
#[derive(Debug, Clone)]
pub struct FunctionRef {
    pub name: Rc<str>,
    /// Signature key of the type whose overload table holds `name`
    pub owner: Rc<str>,
    pub this: Option<Box<Value>>,
}

impl FunctionRef {
    pub fn new(name: &str, owner: &str) -> Self {
        FunctionRef {
            name: Rc::from(name),
            owner: Rc::from(owner),
            this: None,
        }
    }

    pub fn bind(mut self, this: Value) -> Self {
        self.this = Some(Box::new(this));
        self
    }
}

#[derive(Debug, Clone)]
pub enum PointerTarget {
    /// Pointer to a single cell
    Normal(Option<Place>),
    /// Pointer into an array backing store at `position`
    Array { store: Option<Store>, position: i64 },
    Function(Option<FunctionRef>),
}

impl PointerTarget {
    pub fn is_null(&self) -> bool {
        match self {
            PointerTarget::Normal(place) => place.is_none(),
            PointerTarget::Array { store, .. } => store.is_none(),
            PointerTarget::Function(function) => function.is_none(),
        }
    }
}

/// Raw payload of a value
#[derive(Debug, Clone)]
pub enum Data {
    Int(i128),
    Float(f64),
    Pointer(PointerTarget),
    Function(FunctionRef),
    Struct(Store),
    Void,
}

/// Numeric view of an arithmetic payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(v) => v == 0,
            Number::Float(v) => v == 0.0,
        }
    }
}

/// Runtime values in the interpreter
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: Type,
    pub data: Data,
    pub place: Option<Place>,
    pub readonly: bool,
    pub declared: Option<Type>,
}

impl Value {
    /// An rvalue of the given type
    pub fn new(ty: Type, data: Data) -> Self {
        Value {
            ty,
            data,
            place: None,
            readonly: false,
            declared: None,
        }
    }

    pub fn int(kind: ArithKind, v: i128) -> Self {
        Value::new(Type::Arithmetic(kind), Data::Int(v))
    }

    pub fn float(kind: ArithKind, v: f64) -> Self {
        Value::new(Type::Arithmetic(kind), Data::Float(v))
    }

    pub fn bool(b: bool) -> Self {
        Value::int(ArithKind::Bool, i128::from(b))
    }

    pub fn void() -> Self {
        Value::new(Type::Void, Data::Void)
    }

    /// Marker passed as the second operand of postfix `++`/`--`
    pub fn dummy() -> Self {
        Value::new(Type::Dummy, Data::Void)
    }

    pub fn null(ty: Type) -> Self {
        let target = match &ty {
            Type::FunctionPointer(_) => PointerTarget::Function(None),
            Type::Pointer { kind, .. } if kind != &crate::runtime::types::PointerKind::Normal => {
                PointerTarget::Array {
                    store: None,
                    position: 0,
                }
            }
            _ => PointerTarget::Normal(None),
        };
        Value::new(ty, Data::Pointer(target))
    }

    pub fn is_lvalue(&self) -> bool {
        self.place.is_some()
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.ty, Type::Dummy)
    }

    /// Copy of the payload detached from its storage
    pub fn rvalue(&self) -> Value {
        Value {
            ty: self.ty.clone(),
            data: self.data.clone(),
            place: None,
            readonly: false,
            declared: self.declared.clone(),
        }
    }

    /// Copy with fresh storage for struct members and owned arrays
    pub fn deep_copy(&self) -> Value {
        let data = match &self.data {
            Data::Struct(store) => Data::Struct(store.deep_copy()),
            Data::Pointer(PointerTarget::Array {
                store: Some(store),
                position,
            }) if self.ty.is_array() => Data::Pointer(PointerTarget::Array {
                store: Some(store.deep_copy()),
                position: *position,
            }),
            other => other.clone(),
        };
        Value {
            ty: self.ty.clone(),
            data,
            place: None,
            readonly: false,
            declared: self.declared.clone(),
        }
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn declared(mut self, declared: Option<Type>) -> Self {
        self.declared = declared;
        self
    }

    pub fn number(&self) -> Option<Number> {
        match self.data {
            Data::Int(v) => Some(Number::Int(v)),
            Data::Float(v) => Some(Number::Float(v)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self.data {
            Data::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn pointer(&self) -> Option<&PointerTarget> {
        match &self.data {
            Data::Pointer(target) => Some(target),
            _ => None,
        }
    }

    pub fn struct_store(&self) -> Option<&Store> {
        match &self.data {
            Data::Struct(store) => Some(store),
            _ => None,
        }
    }

    /// Array backing store and position, for array pointers
    pub fn array(&self) -> Option<(&Store, i64)> {
        match &self.data {
            Data::Pointer(PointerTarget::Array {
                store: Some(store),
                position,
            }) => Some((store, *position)),
            _ => None,
        }
    }

    /// C truthiness: non-zero numbers and non-null pointers
    pub fn truthy(&self) -> bool {
        match &self.data {
            Data::Int(v) => *v != 0,
            Data::Float(v) => *v != 0.0,
            Data::Pointer(target) => !target.is_null(),
            Data::Function(_) | Data::Struct(_) => true,
            Data::Void => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_load_binds_lvalue() {
        let slot = Slot::new(Value::int(ArithKind::Int, 7).readonly(true));
        let place = Place::Slot(slot);
        let value = place.load().unwrap();
        assert!(value.is_lvalue());
        assert!(value.readonly);
        assert_eq!(value.as_int(), Some(7));
    }

    #[test]
    fn test_store_keeps_flags() {
        let store = Store::new(vec![Value::int(ArithKind::Int, 0).readonly(true)]);
        let place = Place::Element {
            store: store.clone(),
            index: 0,
        };
        assert!(place.store(Value::int(ArithKind::Int, 9)));
        let cell = store.get(0).unwrap();
        assert_eq!(cell.as_int(), Some(9));
        assert!(cell.readonly);

        let outside = Place::Element { store, index: 4 };
        assert!(!outside.store(Value::int(ArithKind::Int, 1)));
        assert!(outside.load().is_none());
    }

    #[test]
    fn test_place_identity() {
        let store = Store::new(vec![Value::void(), Value::void()]);
        let a = Place::Element {
            store: store.clone(),
            index: 1,
        };
        let b = Place::Element {
            store: store.clone(),
            index: 1,
        };
        let c = Place::Element { store, index: 0 };
        assert!(a.same(&b));
        assert!(!a.same(&c));
    }

    #[test]
    fn test_deep_copy_detaches_arrays() {
        let store = Store::new(vec![Value::int(ArithKind::Int, 1), Value::int(ArithKind::Int, 2)]);
        let array = Value::new(
            Type::array_of(Type::INT, 2),
            Data::Pointer(PointerTarget::Array {
                store: Some(store.clone()),
                position: 0,
            }),
        );
        let copy = array.deep_copy();
        let (copied, _) = copy.array().unwrap();
        assert!(!copied.ptr_eq(&store));
        Place::Element { store: copied.clone(), index: 0 }.store(Value::int(ArithKind::Int, 9));
        assert_eq!(store.get(0).unwrap().as_int(), Some(1));
    }
}
