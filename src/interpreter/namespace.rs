//! Namespace bindings
//!
//! Only the aliasing subset is supported: libraries bind names into a
//! namespace (`std::printf`), programs may import a namespace with
//! `using namespace std;` or alias it with `namespace io = std;`.

use crate::interpreter::errors::{Result, RuntimeError};
use crate::runtime::value::Place;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Namespaces {
    tables: FxHashMap<String, FxHashMap<String, Place>>,
    aliases: FxHashMap<String, String>,
    imported: Vec<String>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    fn canonical(&self, path: &[String]) -> String {
        let joined = path.join("::");
        match self.aliases.get(&joined) {
            Some(target) => target.clone(),
            None => joined,
        }
    }

    pub fn bind(&mut self, namespace: &str, name: &str, place: Place) {
        self.tables
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), place);
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.tables.contains_key(namespace)
    }

    /// `namespace alias = target;`
    pub fn alias(&mut self, alias: &str, target: &[String]) -> Result<()> {
        let target = self.canonical(target);
        if !self.contains(&target) {
            return Err(RuntimeError::new(format!("namespace {} is not defined", target)));
        }
        self.aliases.insert(alias.to_string(), target);
        Ok(())
    }

    /// `using namespace path;`
    pub fn import(&mut self, path: &[String]) -> Result<()> {
        let namespace = self.canonical(path);
        if !self.contains(&namespace) {
            return Err(RuntimeError::new(format!(
                "namespace {} is not defined",
                namespace
            )));
        }
        if !self.imported.contains(&namespace) {
            self.imported.push(namespace);
        }
        Ok(())
    }

    /// `a::b::name` given as `["a", "b", "name"]`
    pub fn lookup(&self, qualified: &[String]) -> Option<Place> {
        let (name, path) = qualified.split_last()?;
        self.tables.get(&self.canonical(path))?.get(name).cloned()
    }

    /// A bare name made visible by `using namespace`
    pub fn lookup_imported(&self, name: &str) -> Option<Place> {
        self.imported
            .iter()
            .find_map(|namespace| self.tables.get(namespace)?.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::ArithKind;
    use crate::runtime::value::{Slot, Value};

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_and_import() {
        let mut namespaces = Namespaces::new();
        namespaces.bind("std", "n", Place::Slot(Slot::new(Value::int(ArithKind::Int, 3))));
        assert!(namespaces.lookup_imported("n").is_none());

        namespaces.alias("io", &path(&["std"])).unwrap();
        let found = namespaces.lookup(&path(&["io", "n"])).unwrap();
        assert_eq!(found.load().unwrap().as_int(), Some(3));

        namespaces.import(&path(&["io"])).unwrap();
        assert!(namespaces.lookup_imported("n").is_some());
    }

    #[test]
    fn test_unknown_namespace_faults() {
        let mut namespaces = Namespaces::new();
        let err = namespaces.import(&path(&["boost"])).unwrap_err();
        assert_eq!(err.message, "namespace boost is not defined");
    }
}
