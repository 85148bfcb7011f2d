//! Run configuration and host providers
//!
//! [`Config`] is built once, wrapped in [`Runtime`](crate::runtime::Runtime)
//! and shared by `Rc`; it is never mutated during a run. The console and file
//! system are traits so front ends can supply their own providers.

use crate::interpreter::library::{stdio::Stdio, Library};
use crate::runtime::types::LimitsTable;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::rc::Rc;
use std::time::Duration;

/// What happens when an arithmetic result leaves its type's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    #[default]
    Error,
    Wrap,
}

/// Result of a non-blocking console read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleRead {
    Ready(char),
    /// No input buffered yet; the run suspends until the host feeds some
    Pending,
    Eof,
}

pub trait Console {
    fn write(&self, text: &str);
    fn read(&self) -> ConsoleRead;
}

/// In-memory console: output is captured, input is fed by the host.
#[derive(Debug, Default)]
pub struct BufferedConsole {
    output: RefCell<String>,
    input: RefCell<VecDeque<char>>,
    closed: RefCell<bool>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }

    pub fn feed(&self, text: &str) {
        self.input.borrow_mut().extend(text.chars());
    }

    /// Subsequent reads past the buffered input report end of file
    pub fn close_input(&self) {
        *self.closed.borrow_mut() = true;
    }
}

impl Console for BufferedConsole {
    fn write(&self, text: &str) {
        self.output.borrow_mut().push_str(text);
    }

    fn read(&self) -> ConsoleRead {
        match self.input.borrow_mut().pop_front() {
            Some(c) => ConsoleRead::Ready(c),
            None if *self.closed.borrow() => ConsoleRead::Eof,
            None => ConsoleRead::Pending,
        }
    }
}

/// Process stdin/stdout console used by `cppstep run`
#[derive(Debug, Default)]
pub struct StdConsole {
    pending: RefCell<VecDeque<char>>,
}

impl Console for StdConsole {
    fn write(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn read(&self) -> ConsoleRead {
        let mut pending = self.pending.borrow_mut();
        if pending.is_empty() {
            let mut buf = [0u8; 1024];
            match std::io::stdin().read(&mut buf) {
                Ok(0) | Err(_) => return ConsoleRead::Eof,
                Ok(n) => pending.extend(String::from_utf8_lossy(&buf[..n]).chars()),
            }
        }
        pending
            .pop_front()
            .map_or(ConsoleRead::Eof, ConsoleRead::Ready)
    }
}

/// File contents keyed by file name
pub trait FileSystem {
    /// Open (creating when `create`); false when the file does not exist
    fn open(&self, name: &str, create: bool) -> bool;
    fn read(&self, name: &str) -> Option<String>;
    fn write(&self, name: &str, text: &str);
    fn close(&self, name: &str);
    fn clear(&self, name: &str);
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<FxHashMap<String, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, contents: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(name.to_string(), contents.to_string());
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, name: &str, create: bool) -> bool {
        let mut files = self.files.borrow_mut();
        if create {
            files.entry(name.to_string()).or_default();
            true
        } else {
            files.contains_key(name)
        }
    }

    fn read(&self, name: &str) -> Option<String> {
        self.files.borrow().get(name).cloned()
    }

    fn write(&self, name: &str, text: &str) {
        self.files
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push_str(text);
    }

    fn close(&self, _name: &str) {}

    fn clear(&self, name: &str) {
        self.files.borrow_mut().insert(name.to_string(), String::new());
    }
}

pub const DEFAULT_SPECIFIERS: [&str; 6] = ["const", "inline", "_stdcall", "extern", "static", "register"];

pub const DEFAULT_QUANTA_PER_TICK: usize = 1000;

/// Immutable run configuration
#[derive(Clone)]
pub struct Config {
    pub limits: LimitsTable,
    pub specifiers: Vec<String>,
    /// Library modules by include name
    pub libraries: Vec<(String, Rc<dyn Library>)>,
    /// Libraries loaded even without an `#include`
    pub default_libraries: Vec<String>,
    pub overflow: OverflowPolicy,
    pub timeout: Option<Duration>,
    pub quanta_per_tick: usize,
    pub console: Rc<dyn Console>,
    pub files: Rc<dyn FileSystem>,
}

impl Default for Config {
    fn default() -> Self {
        let stdio: Rc<dyn Library> = Rc::new(Stdio);
        Config {
            limits: LimitsTable::default(),
            specifiers: DEFAULT_SPECIFIERS.iter().map(|s| s.to_string()).collect(),
            libraries: vec![
                ("cstdio".to_string(), Rc::clone(&stdio)),
                ("stdio.h".to_string(), stdio),
            ],
            default_libraries: Vec::new(),
            overflow: OverflowPolicy::Error,
            timeout: None,
            quanta_per_tick: DEFAULT_QUANTA_PER_TICK,
            console: Rc::new(BufferedConsole::new()),
            files: Rc::new(MemoryFileSystem::new()),
        }
    }
}

impl Config {
    pub fn with_limits(mut self, limits: LimitsTable) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_quanta_per_tick(mut self, quanta: usize) -> Self {
        self.quanta_per_tick = quanta.max(1);
        self
    }

    pub fn with_console(mut self, console: Rc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    pub fn with_files(mut self, files: Rc<dyn FileSystem>) -> Self {
        self.files = files;
        self
    }

    pub fn with_library(mut self, name: &str, library: Rc<dyn Library>) -> Self {
        self.libraries.push((name.to_string(), library));
        self
    }

    pub fn with_default_library(mut self, name: &str) -> Self {
        self.default_libraries.push(name.to_string());
        self
    }

    pub fn library(&self, name: &str) -> Option<&Rc<dyn Library>> {
        self.libraries
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, library)| library)
    }

    pub fn is_specifier(&self, word: &str) -> bool {
        self.specifiers.iter().any(|s| s == word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_console_reads() {
        let console = BufferedConsole::new();
        assert_eq!(console.read(), ConsoleRead::Pending);
        console.feed("ab");
        assert_eq!(console.read(), ConsoleRead::Ready('a'));
        assert_eq!(console.read(), ConsoleRead::Ready('b'));
        console.close_input();
        assert_eq!(console.read(), ConsoleRead::Eof);
    }

    #[test]
    fn test_memory_file_system() {
        let fs = MemoryFileSystem::new().with_file("in.txt", "42");
        assert!(fs.open("in.txt", false));
        assert!(!fs.open("missing.txt", false));
        fs.write("out.txt", "hi");
        fs.write("out.txt", "!");
        assert_eq!(fs.read("out.txt").as_deref(), Some("hi!"));
        fs.clear("out.txt");
        assert_eq!(fs.read("out.txt").as_deref(), Some(""));
    }

    #[test]
    fn test_default_libraries_registered() {
        let config = Config::default();
        assert!(config.library("cstdio").is_some());
        assert!(config.library("stdio.h").is_some());
        assert!(config.library("iostream").is_none());
        assert_eq!(config.quanta_per_tick, 1000);
    }
}
