//! Library modules
//!
//! A library is loaded by `#include <name>` (or by being listed in
//! [`Config::default_libraries`](crate::runtime::config::Config)). Loading
//! defines native functions, types and namespace bindings in the run's global
//! scope. Libraries may also contribute operator entries once, when the
//! [`Runtime`](crate::runtime::Runtime) is built.

pub mod stdio;

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::Evaluator;
use crate::runtime::ops::OperatorRegistry;
use rustc_hash::FxHashMap;

pub trait Library {
    /// Operator entries for the types this library introduces
    fn register_operators(&self, _registry: &mut OperatorRegistry) {}

    /// Define the library's functions and types in a fresh run
    fn load(&self, evaluator: &Evaluator) -> Result<()>;
}

/// A file opened by a library function
#[derive(Debug, Clone)]
pub struct OpenFile {
    pub name: String,
    /// Read position in characters
    pub position: usize,
}

/// Per-run table of open file handles
#[derive(Debug, Default)]
pub struct OpenFiles {
    next: i128,
    files: FxHashMap<i128, OpenFile>,
}

impl OpenFiles {
    pub fn open(&mut self, name: &str) -> i128 {
        self.next += 1;
        self.files.insert(
            self.next,
            OpenFile {
                name: name.to_string(),
                position: 0,
            },
        );
        self.next
    }

    pub fn get_mut(&mut self, handle: i128) -> Option<&mut OpenFile> {
        self.files.get_mut(&handle)
    }

    pub fn close(&mut self, handle: i128) -> Option<OpenFile> {
        self.files.remove(&handle)
    }
}
