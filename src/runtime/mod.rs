//! Value and operator runtime
//!
//! - [`types`]: type descriptors, the limits table and numeric promotion
//! - [`value`]: runtime values, storage cells and pointers
//! - [`cast`]: range checks under the overflow policy and conversions
//! - [`ops`]: the per-type-signature operator registry
//! - [`format`]: value strings for messages and the variable view
//! - [`config`]: run configuration and host providers
//!
//! This layer has no knowledge of the evaluator. Questions about functions
//! and pointer compatibility go through [`ops::TypeOracle`].

pub mod cast;
pub mod config;
pub mod format;
pub mod ops;
pub mod types;
pub mod value;

use config::Config;
use ops::OperatorRegistry;
use std::rc::Rc;

/// Immutable configuration plus the operator registry, shared between runs
pub struct Runtime {
    pub config: Config,
    pub registry: OperatorRegistry,
}

impl Runtime {
    /// Build the registry from the defaults plus every configured library's
    /// operator hook.
    pub fn new(config: Config) -> Rc<Self> {
        let mut registry = OperatorRegistry::with_defaults();
        for (_, library) in &config.libraries {
            library.register_operators(&mut registry);
        }
        Rc::new(Runtime { config, registry })
    }
}
