//! Arrays and persistent array builders
//!
//! An `Array` is a shared handle to one of several storage shapes. Flat
//! vectors are the common case; builder nodes and truncate views make
//! `push_back`/`push_front`/`pop_back`/`pop_front` cheap without copying the
//! whole array on every call. Ranges and index maps compute their items on
//! demand.

use crate::value::Value;
use std::rc::Rc;

/// Array is a parameter pack living on the calc stack
pub const PARAM_PACK: u8 = 0x01;
/// Array marks the start of a value list built by `begin_list`
pub const LIST_MARKER: u8 = 0x02;

/// Lazy numeric sequence `begin..end` (inclusive, either direction)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    base: i64,
    dir: i64,
    len: usize,
}

impl Range {
    pub fn new(begin: i64, end: i64) -> Self {
        let dir = if begin > end { -1 } else { 1 };
        let len = begin.abs_diff(end) as usize + 1;
        Range { base: begin, dir, len }
    }

    pub fn begin(&self) -> i64 {
        self.base
    }

    pub fn end(&self) -> i64 {
        self.base + self.dir * (self.len as i64 - 1)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        (index < self.len).then(|| self.base + self.dir * index as i64)
    }
}

#[derive(Debug)]
pub enum ArrayData {
    Flat(Vec<Value>),
    /// Builder node: concatenation of two arrays
    Node { left: Array, right: Array },
    /// Zero-copy window into another array
    Truncate { source: Array, offset: usize, len: usize },
    Range(Range),
    /// Lazy view applying a lookup path to every element of `source`
    IndexMap { source: Array, path: Vec<Value> },
}

#[derive(Debug, Clone)]
pub struct Array {
    data: Rc<ArrayData>,
    len: usize,
    flags: u8,
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        let len = items.len();
        Array {
            data: Rc::new(ArrayData::Flat(items)),
            len,
            flags: 0,
        }
    }

    fn from_data(data: ArrayData) -> Self {
        let len = match &data {
            ArrayData::Flat(v) => v.len(),
            ArrayData::Node { left, right } => left.len() + right.len(),
            ArrayData::Truncate { len, .. } => *len,
            ArrayData::Range(r) => r.len(),
            ArrayData::IndexMap { source, .. } => source.len(),
        };
        Array {
            data: Rc::new(data),
            len,
            flags: 0,
        }
    }

    pub fn range(begin: i64, end: i64) -> Self {
        Self::from_data(ArrayData::Range(Range::new(begin, end)))
    }

    pub fn index_map(source: Array, path: Vec<Value>) -> Self {
        Self::from_data(ArrayData::IndexMap { source, path })
    }

    fn node(left: Array, right: Array) -> Self {
        Self::from_data(ArrayData::Node {
            left: left.with_flags(0),
            right: right.with_flags(0),
        })
    }

    fn one(item: Value) -> Self {
        Self::from_vec(vec![item])
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn with_flags(&self, flags: u8) -> Self {
        Array {
            data: self.data.clone(),
            len: self.len,
            flags,
        }
    }

    pub fn is_param_pack(&self) -> bool {
        self.flags & PARAM_PACK != 0
    }

    pub fn is_marker(&self) -> bool {
        self.flags & LIST_MARKER != 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len {
            return None;
        }
        match &*self.data {
            ArrayData::Flat(v) => v.get(index).cloned(),
            ArrayData::Node { left, right } => {
                if index < left.len() {
                    left.get(index)
                } else {
                    right.get(index - left.len())
                }
            }
            ArrayData::Truncate { source, offset, .. } => source.get(index + offset),
            ArrayData::Range(r) => r.get(index).map(Value::int),
            ArrayData::IndexMap { source, path } => {
                let item = source.get(index)?;
                let key = item.key().map(Rc::from);
                let mapped = path.iter().fold(item, |v, k| v.lookup(k));
                Some(match key {
                    Some(k) => mapped.with_key(k),
                    None => mapped,
                })
            }
        }
    }

    pub fn iter(&self) -> ArrayIter<'_> {
        ArrayIter {
            array: self,
            pos: 0,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        match &*self.data {
            ArrayData::Flat(v) => v.clone(),
            _ => self.iter().collect(),
        }
    }

    /// Depth of the storage tree; flat arrays have depth 1
    pub fn depth(&self) -> usize {
        match &*self.data {
            ArrayData::Node { left, right } => 1 + left.depth().max(right.depth()),
            ArrayData::Truncate { source, .. } | ArrayData::IndexMap { source, .. } => {
                1 + source.depth()
            }
            _ => 1,
        }
    }

    /// Copies all items into a single flat vector
    pub fn collapse(&self) -> Array {
        Array::from_vec(self.to_vec())
    }

    pub fn push_back(&self, item: Value) -> Array {
        match &*self.data {
            ArrayData::Node { left, right } => Self::node_push_back(left, right, item),
            _ if self.is_empty() => Self::one(item),
            _ => Self::node(self.clone(), Self::one(item)),
        }
    }

    fn node_push_back(left: &Array, right: &Array, item: Value) -> Array {
        if left.len() == right.len() {
            let whole = Self::node(left.clone(), right.clone());
            return Self::node(whole.collapse(), Self::one(item));
        }
        let new_right = match &*right.data {
            ArrayData::Node { left: rl, right: rr } if right.len() > 1 => {
                Self::node_push_back(rl, rr, item)
            }
            _ => Self::node(right.clone(), Self::one(item)),
        };
        Self::node(left.clone(), new_right)
    }

    pub fn push_front(&self, item: Value) -> Array {
        match &*self.data {
            ArrayData::Node { left, right } => Self::node_push_front(left, right, item),
            _ if self.is_empty() => Self::one(item),
            _ => Self::node(Self::one(item), self.clone()),
        }
    }

    fn node_push_front(left: &Array, right: &Array, item: Value) -> Array {
        if left.len() == right.len() {
            let whole = Self::node(left.clone(), right.clone());
            return Self::node(Self::one(item), whole.collapse());
        }
        let new_left = match &*left.data {
            ArrayData::Node { left: ll, right: lr } if left.len() > 1 => {
                Self::node_push_front(ll, lr, item)
            }
            _ => Self::node(Self::one(item), left.clone()),
        };
        Self::node(new_left, right.clone())
    }

    pub fn pop_back(&self) -> Array {
        if self.len < 2 {
            return Array::new();
        }
        match &*self.data {
            ArrayData::Truncate { source, offset, len } => {
                if len * 2 < source.len() {
                    self.slice(0, len - 1)
                } else {
                    Self::from_data(ArrayData::Truncate {
                        source: source.clone(),
                        offset: *offset,
                        len: len - 1,
                    })
                }
            }
            _ => Self::from_data(ArrayData::Truncate {
                source: self.with_flags(0),
                offset: 0,
                len: self.len - 1,
            }),
        }
    }

    pub fn pop_front(&self) -> Array {
        if self.len < 2 {
            return Array::new();
        }
        match &*self.data {
            ArrayData::Truncate { source, offset, len } => {
                if len * 2 < source.len() {
                    self.slice(1, *len)
                } else {
                    Self::from_data(ArrayData::Truncate {
                        source: source.clone(),
                        offset: offset + 1,
                        len: len - 1,
                    })
                }
            }
            _ => Self::from_data(ArrayData::Truncate {
                source: self.with_flags(0),
                offset: 1,
                len: self.len - 1,
            }),
        }
    }

    /// Flat copy of the items in `start..end` (clamped)
    pub fn slice(&self, start: usize, end: usize) -> Array {
        let end = end.min(self.len);
        let start = start.min(end);
        Array::from_vec((start..end).filter_map(|i| self.get(i)).collect())
    }

    pub fn concat(&self, other: &Array) -> Array {
        if self.is_empty() {
            return other.with_flags(0);
        }
        if other.is_empty() {
            return self.with_flags(0);
        }
        let mut items = self.to_vec();
        items.extend(other.iter());
        Array::from_vec(items)
    }

    pub fn reversed(&self) -> Array {
        let mut items = self.to_vec();
        items.reverse();
        Array::from_vec(items)
    }
}

pub struct ArrayIter<'a> {
    array: &'a Array,
    pos: usize,
}

impl Iterator for ArrayIter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.array.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.array.len().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ints(a: &Array) -> Vec<i64> {
        a.iter().map(|v| v.get_int()).collect()
    }

    #[test]
    fn test_push_back_builds_in_order() {
        let mut a = Array::new();
        for i in 0..10 {
            a = a.push_back(Value::int(i));
        }
        assert_eq!(ints(&a), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_front_builds_reversed() {
        let mut a = Array::new();
        for i in 0..7 {
            a = a.push_front(Value::int(i));
        }
        assert_eq!(ints(&a), vec![6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_push_does_not_touch_original() {
        let a = Array::from_vec(vec![Value::int(1), Value::int(2)]);
        let b = a.push_back(Value::int(3));
        assert_eq!(ints(&a), vec![1, 2]);
        assert_eq!(ints(&b), vec![1, 2, 3]);
    }

    #[test]
    fn test_pop_views_keep_offset() {
        let a = Array::from_vec((0..8).map(Value::int).collect());
        let b = a.pop_front().pop_back();
        assert_eq!(ints(&b), vec![1, 2, 3, 4, 5, 6]);
        let c = b.pop_front().pop_front().pop_back();
        assert_eq!(ints(&c), vec![3, 4, 5]);
    }

    #[test]
    fn test_small_view_materializes() {
        let a = Array::from_vec((0..8).map(Value::int).collect());
        let mut v = a.clone();
        for _ in 0..5 {
            v = v.pop_back();
        }
        assert_eq!(ints(&v), vec![0, 1, 2]);
        assert!(matches!(v.data(), ArrayData::Truncate { .. }));
        v = v.pop_back();
        assert_eq!(ints(&v), vec![0, 1]);
        assert!(matches!(v.data(), ArrayData::Flat(_)));
    }

    #[test]
    fn test_pop_short_array_is_empty() {
        let a = Array::from_vec(vec![Value::int(1)]);
        assert!(a.pop_back().is_empty());
        assert!(a.pop_front().is_empty());
        assert!(Array::new().pop_back().is_empty());
    }

    #[test]
    fn test_range_both_directions() {
        assert_eq!(ints(&Array::range(1, 4)), vec![1, 2, 3, 4]);
        assert_eq!(ints(&Array::range(3, -1)), vec![3, 2, 1, 0, -1]);
        let r = Range::new(5, 5);
        assert_eq!(r.len(), 1);
        assert_eq!(r.end(), 5);
    }

    #[test]
    fn test_index_map_selects_column() {
        let rows = Array::from_vec(vec![
            Value::from(vec![Value::int(1), Value::int(2)]),
            Value::from(vec![Value::int(3), Value::int(4)]),
        ]);
        let col = Array::index_map(rows, vec![Value::int(1)]);
        assert_eq!(ints(&col), vec![2, 4]);
    }

    fn log2_ceil(n: usize) -> usize {
        (usize::BITS - n.max(1).leading_zeros()) as usize
    }

    proptest! {
        #[test]
        fn prop_builder_depth_is_logarithmic(ops in prop::collection::vec(any::<bool>(), 1..400)) {
            let mut a = Array::new();
            let mut model: Vec<i64> = Vec::new();
            for (i, front) in ops.iter().enumerate() {
                if *front {
                    a = a.push_front(Value::int(i as i64));
                    model.insert(0, i as i64);
                } else {
                    a = a.push_back(Value::int(i as i64));
                    model.push(i as i64);
                }
            }
            prop_assert_eq!(ints(&a), model.clone());
            prop_assert!(a.depth() <= 2 * log2_ceil(model.len()) + 2);
        }

        #[test]
        fn prop_pop_shrinks_by_one(len in 2usize..100, pops in prop::collection::vec(any::<bool>(), 0..50)) {
            let mut a = Array::from_vec((0..len as i64).map(Value::int).collect());
            let mut model: Vec<i64> = (0..len as i64).collect();
            for back in pops {
                if model.len() < 2 {
                    break;
                }
                let before = a.len();
                if back {
                    a = a.pop_back();
                    model.pop();
                } else {
                    a = a.pop_front();
                    model.remove(0);
                }
                prop_assert_eq!(a.len(), before - 1);
                prop_assert_eq!(ints(&a), model.clone());
            }
        }
    }
}
