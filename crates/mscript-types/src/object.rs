//! Immutable objects with keys kept in sorted order

use crate::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Object(Rc<BTreeMap<Rc<str>, Value>>);

impl Object {
    pub fn new() -> Self {
        Object(Rc::new(BTreeMap::new()))
    }

    /// Later pairs override earlier ones with the same key
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Rc<str>, Value)>) -> Self {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k, v.strip_key().clone()))
            .collect();
        Object(Rc::new(map))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn entry_at(&self, index: usize) -> Option<(&Rc<str>, &Value)> {
        self.0.iter().nth(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
        self.0.keys()
    }

    /// Copy with one member replaced; an undefined value removes the member
    pub fn set(&self, key: Rc<str>, value: Value) -> Object {
        let mut map = (*self.0).clone();
        if value.is_defined() {
            map.insert(key, value.strip_key().clone());
        } else {
            map.remove(&key);
        }
        Object(Rc::new(map))
    }

    /// Members of `other` override members of `self`
    pub fn merge(&self, other: &Object) -> Object {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut map = (*self.0).clone();
        for (k, v) in other.iter() {
            if v.is_defined() {
                map.insert(k.clone(), v.clone());
            } else {
                map.remove(k);
            }
        }
        Object(Rc::new(map))
    }

    pub fn without<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Object {
        let mut map = (*self.0).clone();
        for k in keys {
            map.remove(k);
        }
        Object(Rc::new(map))
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl FromIterator<(Rc<str>, Value)> for Object {
    fn from_iter<T: IntoIterator<Item = (Rc<str>, Value)>>(iter: T) -> Self {
        Object::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_and_removes() {
        let a = Object::from_pairs(vec![("x".into(), Value::int(1)), ("y".into(), Value::int(2))]);
        let b = Object::from_pairs(vec![("y".into(), Value::int(5)), ("x".into(), Value::Undefined)]);
        let m = a.merge(&b);
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("y").map(Value::get_int), Some(5));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_keys_sorted() {
        let o = Object::from_pairs(vec![("b".into(), Value::Null), ("a".into(), Value::Null)]);
        let keys: Vec<&str> = o.keys().map(|k| &**k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
