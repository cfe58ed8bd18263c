//! Higher-order functions over containers
//!
//! `map`, `filter`, `reduce`, `find`, `findIndex` and `sort` call script
//! functions, so each one runs as a task that alternates between calling
//! the callback and inspecting its result on the next step.

use crate::error::VmError;
use crate::function::is_function;
use crate::vm::execution::deref;
use crate::vm::{AbstractTask, VirtualMachine};
use mscript_types::{NativeKind, Object, Value};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    Map,
    Filter,
    Reduce,
    Find,
    FindIndex,
}

impl IterKind {
    fn name(self) -> &'static str {
        match self {
            IterKind::Map => "map",
            IterKind::Filter => "filter",
            IterKind::Reduce => "reduce",
            IterKind::Find => "find",
            IterKind::FindIndex => "findIndex",
        }
    }
}

fn check_container(container: &Value) -> Result<(), VmError> {
    if container.is_container() {
        Ok(())
    } else {
        Err(VmError::Runtime(
            "The first argument of the function must be a container".into(),
        ))
    }
}

fn check_function(fun: &Value) -> Result<(), VmError> {
    if is_function(fun) {
        Ok(())
    } else {
        Err(VmError::Runtime(
            "The second argument of the function must be a function".into(),
        ))
    }
}

fn is_proc_array(container: &Value) -> bool {
    container.is_native(NativeKind::ProcArray)
}

/// Item `index` of `container`. Proc-array items come from a generator
/// call, so for them `None` is returned and the item will be on the calc
/// stack on the next step.
fn fetch_item(
    vm: &mut VirtualMachine,
    container: &Value,
    index: usize,
) -> Result<Option<Value>, VmError> {
    if is_proc_array(container) {
        deref(vm, container, &Value::from(index))?;
        Ok(None)
    } else {
        Ok(Some(container.get_index(index)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterStep {
    Fetch,
    Fetched,
    Called,
}

struct IterTask {
    kind: IterKind,
    container: Value,
    fun: Value,
    len: usize,
    index: usize,
    item: Value,
    /// Running sum of `reduce`; `None` until the first item is seen
    acc: Option<Value>,
    results: Vec<Value>,
    step: IterStep,
}

impl IterTask {
    fn call(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        let index = Value::from(self.index);
        let args = match self.kind {
            IterKind::Reduce => match self.acc.take() {
                Some(sum) => vec![sum, self.item.clone(), index, self.container.clone()],
                None => {
                    // First item of a reduce without init seeds the sum.
                    self.acc = Some(self.item.clone());
                    self.index += 1;
                    self.step = IterStep::Fetch;
                    return Ok(false);
                }
            },
            _ => vec![self.item.clone(), index, self.container.clone()],
        };
        self.step = IterStep::Called;
        vm.call_function(&self.fun, &Value::Undefined, args)?;
        Ok(true)
    }

    /// Consumes the callback result. Returns true when iteration is over.
    fn inspect(&mut self, result: Value) -> bool {
        let item = std::mem::take(&mut self.item);
        match self.kind {
            IterKind::Map => self.results.push(match item.key() {
                Some(key) => result.with_key(key.into()),
                None => result,
            }),
            IterKind::Filter => {
                if result.truthy() {
                    self.results.push(item);
                }
            }
            IterKind::Reduce => self.acc = Some(result),
            IterKind::Find => {
                if result.truthy() {
                    self.results.push(item);
                    return true;
                }
            }
            IterKind::FindIndex => {
                if result.truthy() {
                    self.results.push(Value::from(self.index));
                    return true;
                }
            }
        }
        self.index += 1;
        self.step = IterStep::Fetch;
        false
    }

    fn result(&mut self) -> Value {
        let results = std::mem::take(&mut self.results);
        match self.kind {
            IterKind::Reduce => self.acc.take().unwrap_or_default(),
            IterKind::Find => results.into_iter().next().unwrap_or_default(),
            IterKind::FindIndex => results.into_iter().next().unwrap_or(Value::int(-1)),
            IterKind::Map | IterKind::Filter => {
                if self.container.as_object().is_some() {
                    Value::Object(keyed_object(results))
                } else {
                    Value::from(results)
                }
            }
        }
    }
}

/// Rebuilds an object from values that carry their keys
fn keyed_object(items: Vec<Value>) -> Object {
    items
        .into_iter()
        .filter_map(|v| {
            let key: Rc<str> = v.key()?.into();
            Some((key, v.strip_key().clone()))
        })
        .collect()
}

impl AbstractTask for IterTask {
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        loop {
            match self.step {
                IterStep::Fetch => {
                    if self.index >= self.len {
                        break;
                    }
                    match fetch_item(vm, &self.container, self.index)? {
                        Some(item) => {
                            self.item = item;
                            if self.call(vm)? {
                                return Ok(true);
                            }
                        }
                        None => {
                            self.step = IterStep::Fetched;
                            return Ok(true);
                        }
                    }
                }
                IterStep::Fetched => {
                    self.item = vm.pop_value();
                    if self.call(vm)? {
                        return Ok(true);
                    }
                }
                IterStep::Called => {
                    let result = vm.pop_value();
                    if self.inspect(result) {
                        break;
                    }
                }
            }
        }
        let result = self.result();
        vm.push_value(result)?;
        Ok(false)
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Starts `kind` over `container`. `init` is the starting sum of `reduce`.
pub fn start(
    vm: &mut VirtualMachine,
    kind: IterKind,
    container: Value,
    fun: Value,
    init: Option<Value>,
) -> Result<(), VmError> {
    check_container(&container)?;
    check_function(&fun)?;
    let len = container.size();
    if len == 0 {
        let empty = match kind {
            IterKind::Reduce => init.unwrap_or_default(),
            IterKind::Find => Value::Undefined,
            IterKind::FindIndex => Value::int(-1),
            IterKind::Map | IterKind::Filter => container,
        };
        return vm.push_value(empty);
    }
    vm.push_task(Box::new(IterTask {
        kind,
        container,
        fun,
        len,
        index: 0,
        item: Value::Undefined,
        acc: init,
        results: Vec::new(),
        step: IterStep::Fetch,
    }))
}

/// Free function form: `map(container, fn)`, `reduce(container, fn, [init])`
pub fn call_free(vm: &mut VirtualMachine, kind: IterKind, params: Vec<Value>) -> Result<(), VmError> {
    let mut params = params.into_iter();
    let container = params.next().unwrap_or_default();
    let fun = params.next().unwrap_or_default();
    start(vm, kind, container, fun, params.next())
}

/// Method form: `container.map(fn)`
pub fn call_method(
    vm: &mut VirtualMachine,
    kind: IterKind,
    receiver: Value,
    params: Vec<Value>,
) -> Result<(), VmError> {
    let mut params = params.into_iter();
    let fun = params.next().unwrap_or_default();
    start(vm, kind, receiver, fun, params.next())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortStep {
    Fetch,
    Fetched,
    Merge,
    Compared,
}

/// Bottom-up merge sort with a script comparator
///
/// Runs of `width` items are merged pairwise from `src` into `dst`; each
/// comparison is one callback. A result above zero takes the right item,
/// so equal items keep their order.
struct SortTask {
    container: Value,
    fun: Value,
    len: usize,
    src: Vec<Value>,
    dst: Vec<Value>,
    width: usize,
    lo: usize,
    mid: usize,
    hi: usize,
    i: usize,
    j: usize,
    step: SortStep,
}

impl SortTask {
    fn begin_run(&mut self) {
        let n = self.src.len();
        self.mid = (self.lo + self.width).min(n);
        self.hi = (self.lo + 2 * self.width).min(n);
        self.i = self.lo;
        self.j = self.mid;
    }

    /// Merges until a comparison is needed. Returns false when sorted.
    fn merge(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        loop {
            let n = self.src.len();
            if self.width >= n {
                return Ok(false);
            }
            if self.lo >= n {
                self.src = std::mem::replace(&mut self.dst, Vec::with_capacity(n));
                self.width *= 2;
                self.lo = 0;
                self.begin_run();
                continue;
            }
            if self.i < self.mid && self.j < self.hi {
                let args = vec![self.src[self.i].clone(), self.src[self.j].clone()];
                self.step = SortStep::Compared;
                vm.call_function(&self.fun, &Value::Undefined, args)?;
                return Ok(true);
            }
            self.dst.extend_from_slice(&self.src[self.i..self.mid]);
            self.dst.extend_from_slice(&self.src[self.j..self.hi]);
            self.lo = self.hi;
            self.begin_run();
        }
    }

    fn start_merge(&mut self) {
        self.step = SortStep::Merge;
        self.width = 1;
        self.lo = 0;
        self.dst = Vec::with_capacity(self.src.len());
        self.begin_run();
    }
}

impl AbstractTask for SortTask {
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        loop {
            match self.step {
                SortStep::Fetch => {
                    if self.src.len() >= self.len {
                        if !self.fun.is_defined() {
                            let mut items = std::mem::take(&mut self.src);
                            items.sort_by(|a, b| a.compare(b));
                            vm.push_value(Value::from(items))?;
                            return Ok(false);
                        }
                        self.start_merge();
                        continue;
                    }
                    let index = self.src.len();
                    match fetch_item(vm, &self.container, index)? {
                        Some(item) => self.src.push(item),
                        None => {
                            self.step = SortStep::Fetched;
                            return Ok(true);
                        }
                    }
                }
                SortStep::Fetched => {
                    self.src.push(vm.pop_value());
                    self.step = SortStep::Fetch;
                }
                SortStep::Compared => {
                    let result = vm.pop_value();
                    if result.get_number() > 0.0 {
                        self.dst.push(self.src[self.j].clone());
                        self.j += 1;
                    } else {
                        self.dst.push(self.src[self.i].clone());
                        self.i += 1;
                    }
                    self.step = SortStep::Merge;
                }
                SortStep::Merge => {
                    if self.merge(vm)? {
                        return Ok(true);
                    }
                    let sorted = std::mem::take(&mut self.src);
                    vm.push_value(Value::from(sorted))?;
                    return Ok(false);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "sort"
    }
}

/// `container.sort([comparator])`; without a comparator items are ordered
/// by the standard value comparison
pub fn sort(vm: &mut VirtualMachine, container: Value, params: Vec<Value>) -> Result<(), VmError> {
    check_container(&container)?;
    let fun = params.into_iter().next().unwrap_or_default();
    if fun.is_defined() {
        check_function(&fun)?;
    } else if !is_proc_array(&container) {
        let mut items = container.elements();
        items.sort_by(|a, b| a.compare(b));
        return vm.push_value(Value::from(items));
    }
    let len = container.size();
    vm.push_task(Box::new(SortTask {
        container,
        fun,
        len,
        src: Vec::with_capacity(len),
        dst: Vec::new(),
        width: 1,
        lo: 0,
        mid: 0,
        hi: 0,
        i: 0,
        j: 0,
        step: SortStep::Fetch,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::define_simple_fn;
    use mscript_types::ProcArray;

    fn run(vm: &mut VirtualMachine) -> Value {
        vm.exec().unwrap()
    }

    fn ints(values: &[i64]) -> Value {
        values.iter().map(|i| Value::int(*i)).collect()
    }

    #[test]
    fn test_map_and_filter() {
        let double = define_simple_fn(|args| Ok(Value::int(args[0].get_int() * 2)));
        let mut vm = VirtualMachine::new();
        start(&mut vm, IterKind::Map, ints(&[1, 2, 3]), double, None).unwrap();
        assert_eq!(run(&mut vm), ints(&[2, 4, 6]));

        let odd = define_simple_fn(|args| Ok(Value::from(args[0].get_int() % 2 == 1)));
        start(&mut vm, IterKind::Filter, ints(&[1, 2, 3, 5]), odd, None).unwrap();
        assert_eq!(run(&mut vm), ints(&[1, 3, 5]));
    }

    #[test]
    fn test_filter_keeps_objects() {
        let obj = Value::Object(Object::from_pairs([
            ("a".into(), Value::int(1)),
            ("b".into(), Value::int(2)),
        ]));
        let big = define_simple_fn(|args| Ok(Value::from(args[0].get_int() > 1)));
        let mut vm = VirtualMachine::new();
        start(&mut vm, IterKind::Filter, obj, big, None).unwrap();
        let result = run(&mut vm);
        assert_eq!(result.size(), 1);
        assert_eq!(result.member("b"), Value::int(2));
    }

    #[test]
    fn test_reduce_with_and_without_init() {
        let add = define_simple_fn(|args| Ok(Value::int(args[0].get_int() + args[1].get_int())));
        let mut vm = VirtualMachine::new();
        start(&mut vm, IterKind::Reduce, ints(&[1, 2, 3]), add.clone(), None).unwrap();
        assert_eq!(run(&mut vm), Value::int(6));
        start(&mut vm, IterKind::Reduce, ints(&[1, 2, 3]), add.clone(), Some(Value::int(10)))
            .unwrap();
        assert_eq!(run(&mut vm), Value::int(16));
        start(&mut vm, IterKind::Reduce, ints(&[]), add, Some(Value::int(4))).unwrap();
        assert_eq!(run(&mut vm), Value::int(4));
    }

    #[test]
    fn test_find_index() {
        let is_three = define_simple_fn(|args| Ok(Value::from(args[0].get_int() == 3)));
        let mut vm = VirtualMachine::new();
        start(&mut vm, IterKind::FindIndex, ints(&[5, 3, 3]), is_three.clone(), None).unwrap();
        assert_eq!(run(&mut vm), Value::int(1));
        start(&mut vm, IterKind::FindIndex, ints(&[5]), is_three, None).unwrap();
        assert_eq!(run(&mut vm), Value::int(-1));
    }

    #[test]
    fn test_argument_errors() {
        let mut vm = VirtualMachine::new();
        let err = start(&mut vm, IterKind::Map, Value::int(1), Value::Null, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Runtime error: The first argument of the function must be a container"
        );
        let err = start(&mut vm, IterKind::Map, ints(&[1]), Value::Null, None).unwrap_err();
        assert!(err.to_string().contains("second argument"));
    }

    #[test]
    fn test_sort_with_comparator() {
        let desc = define_simple_fn(|args| Ok(Value::int(args[1].get_int() - args[0].get_int())));
        let mut vm = VirtualMachine::new();
        sort(&mut vm, ints(&[3, 9, 1, 4, 1, 7, 2]), vec![desc]).unwrap();
        assert_eq!(run(&mut vm), ints(&[9, 7, 4, 3, 2, 1, 1]));
    }

    #[test]
    fn test_sort_default_order() {
        let mut vm = VirtualMachine::new();
        sort(&mut vm, ints(&[3, 1, 2]), vec![]).unwrap();
        assert_eq!(run(&mut vm), ints(&[1, 2, 3]));
    }

    #[test]
    fn test_map_over_proc_array() {
        let square = define_simple_fn(|args| Ok(Value::int(args[0].get_int().pow(2))));
        let identity = define_simple_fn(|args| Ok(args[0].clone()));
        let mut vm = VirtualMachine::new();
        start(&mut vm, IterKind::Map, ProcArray::pack(square, 3), identity, None).unwrap();
        assert_eq!(run(&mut vm), ints(&[1, 4, 9]));
    }
}
