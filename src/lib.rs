//! # Introduction
//!
//! cppstep parses and executes a subset of C++ one syntax node at a time. A
//! host can stop between any two nodes, inspect the variables in scope, and
//! resume. A terminal debugger built with [ratatui](https://docs.rs/ratatui)
//! drives the stepping interactively.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Evaluator (one quantum per node) → Host
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST with node spans.
//! 2. [`interpreter`]: walks the AST as a tree of suspendable futures;
//!    [`interpreter::Interpreter`] drives it and [`interpreter::Debugger`]
//!    adds breakpoint predicates and variable listings.
//! 3. [`typedb`]: function signatures, overload tables and resolution.
//! 4. [`runtime`]: types, values, casts, and the operator registry keyed by
//!    type signature.
//! 5. [`ui`]: ratatui-based debugger front end; not part of the stable
//!    library API.
//!
//! ## Supported C++ subset
//!
//! Types: every builtin arithmetic type, `auto`, pointers, references,
//! arrays, function pointers, structs with methods and member defaults,
//! typedefs. Control flow: `if/else`, `while`, `do-while`, `for`, range
//! `for`, `switch/case`, `break`, `continue`, `return`. Functions with
//! overloading and default arguments.
//! Library: `<cstdio>` (`printf`, `puts`, `getchar`, `fopen`, ...).

pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod typedb;
pub mod ui;
