//! Variable scopes
//!
//! A scope holds local bindings in an open-addressing table and an optional
//! base value whose members act as fallback bindings. Bindings are write
//! once: assigning a name that is already local fails.

use mscript_types::{Native, Object, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

const PRIMES: &[usize] = &[
    29, 47, 101, 199, 263, 521, 839, 1279, 2207, 3571, 9349, 19937, 60649,
];

fn hash_name(name: &str) -> usize {
    let mut h = DefaultHasher::new();
    name.hash(&mut h);
    h.finish() as usize
}

fn next_capacity(current: usize) -> usize {
    PRIMES
        .iter()
        .copied()
        .find(|p| *p > current)
        .unwrap_or(current * 2)
}

#[derive(Debug, Default)]
pub struct Scope {
    base: Value,
    binds_this: bool,
    slots: Vec<Option<(Rc<str>, Value)>>,
    count: usize,
}

impl Scope {
    pub fn new(base: Value) -> Self {
        Scope {
            base,
            binds_this: false,
            slots: Vec::new(),
            count: 0,
        }
    }

    /// Clears the scope for reuse, keeping the table allocation
    pub fn reset(&mut self, base: Value) {
        self.base = base;
        self.binds_this = false;
        self.slots.iter_mut().for_each(|s| *s = None);
        self.count = 0;
    }

    pub fn base(&self) -> &Value {
        &self.base
    }

    /// Whether `this` resolves to this scope
    pub fn binds_this(&self) -> bool {
        self.binds_this
    }

    pub(crate) fn mark_this(&mut self) {
        self.binds_this = true;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot holding `name`, or the empty slot where it would go
    fn probe(&self, name: &str) -> Option<usize> {
        let cap = self.slots.len();
        if cap == 0 {
            return None;
        }
        let mut i = hash_name(name) % cap;
        loop {
            match &self.slots[i] {
                Some((k, _)) if &**k != name => i = (i + 1) % cap,
                _ => return Some(i),
            }
        }
    }

    fn grow(&mut self) {
        let capacity = next_capacity(self.slots.len());
        let old = std::mem::replace(&mut self.slots, vec![None; capacity]);
        for (name, value) in old.into_iter().flatten() {
            if let Some(i) = self.probe(&name) {
                self.slots[i] = Some((name, value));
            }
        }
    }

    pub fn get_local(&self, name: &str) -> Option<&Value> {
        let i = self.probe(name)?;
        self.slots[i].as_ref().map(|(_, v)| v)
    }

    /// Local binding, falling back to a member of the base
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.get_local(name) {
            return Some(v.clone());
        }
        if self.base.has_member(name) {
            return Some(self.base.member(name));
        }
        None
    }

    /// Binds `name`; false when it is already bound locally
    pub fn set(&mut self, name: Rc<str>, value: Value) -> bool {
        if (self.count + 1) * 3 > self.slots.len() * 2 {
            self.grow();
        }
        match self.probe(&name) {
            Some(i) if self.slots[i].is_none() => {
                self.slots[i] = Some((name, value));
                self.count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn locals(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.slots.iter().flatten().map(|(k, v)| (k, v))
    }

    /// Local bindings only, as an object
    pub fn locals_object(&self) -> Object {
        self.locals().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Base merged with the local bindings. A function base stays a
    /// function whose closure object gains the locals.
    pub fn convert_to_object(&self) -> Value {
        let locals = self.locals_object();
        match self.base.strip_key() {
            Value::Object(base) => Value::Object(base.merge(&locals)),
            Value::Native(native) => Value::Native(Native::with_content(
                native,
                match native.content() {
                    Value::Object(base) => Value::Object(base.merge(&locals)),
                    _ => Value::Object(locals),
                },
            )),
            _ => Value::Object(locals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_write_once() {
        let mut s = Scope::new(Value::Undefined);
        assert!(s.set("a".into(), Value::int(1)));
        assert!(!s.set("a".into(), Value::int(2)));
        assert_eq!(s.get("a"), Some(Value::int(1)));
    }

    #[test]
    fn test_base_fallback() {
        let base = Value::Object(Object::from_pairs([("x".into(), Value::int(5))]));
        let mut s = Scope::new(base);
        assert_eq!(s.get("x"), Some(Value::int(5)));
        assert_eq!(s.get("y"), None);
        // Locals shadow the base
        assert!(s.set("x".into(), Value::int(6)));
        assert_eq!(s.get("x"), Some(Value::int(6)));
        assert_eq!(s.convert_to_object().member("x"), Value::int(6));
    }

    #[test]
    fn test_reset_reuses() {
        let mut s = Scope::new(Value::Undefined);
        s.set("a".into(), Value::Null);
        s.reset(Value::Undefined);
        assert!(s.is_empty());
        assert_eq!(s.get("a"), None);
    }

    proptest! {
        #[test]
        fn prop_all_bindings_survive_growth(names in proptest::collection::hash_set("[a-z]{1,6}", 0..200)) {
            let mut s = Scope::new(Value::Undefined);
            for (i, n) in names.iter().enumerate() {
                prop_assert!(s.set(n.as_str().into(), Value::from(i)));
            }
            prop_assert_eq!(s.len(), names.len());
            for (i, n) in names.iter().enumerate() {
                prop_assert_eq!(s.get(n), Some(Value::from(i)));
            }
            prop_assert_eq!(s.locals_object().len(), names.len());
        }
    }
}
