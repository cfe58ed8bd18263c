//! Table builder for the runtime library
//!
//! Library tables (`Math`, `Array`, ...) are ordinary objects whose members
//! are constants and function values; this builder assembles them.

use mscript_types::{Object, Value};
use std::rc::Rc;

pub struct ModuleBuilder {
    name: &'static str,
    members: Vec<(Rc<str>, Value)>,
}

impl ModuleBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Adds a member
    ///
    /// # Panics
    /// Panics if `member` is already registered in this table.
    pub fn register(&mut self, member: &str, value: Value) -> &mut Self {
        if self.members.iter().any(|(k, _)| &**k == member) {
            panic!("Member '{}.{}' already registered", self.name, member);
        }
        self.members.push((member.into(), value));
        self
    }

    pub fn constant(&mut self, member: &str, value: f64) -> &mut Self {
        self.register(member, Value::float(value))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn build(self) -> Value {
        Value::Object(Object::from_pairs(self.members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let mut m = ModuleBuilder::new("Test");
        assert!(m.is_empty());
        m.constant("PI", 3.0).register("name", Value::from("x"));
        assert_eq!(m.len(), 2);
        let table = m.build();
        assert_eq!(table.member("PI"), Value::float(3.0));
        assert_eq!(table.member("name"), Value::from("x"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut m = ModuleBuilder::new("Test");
        m.constant("a", 1.0);
        m.constant("a", 2.0);
    }
}
