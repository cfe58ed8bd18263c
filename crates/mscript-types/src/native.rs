//! Host objects carried inside values
//!
//! The VM crate stores compiled blocks and callable functions here. The
//! payload is type-erased; `kind` tells which concrete type to expect so
//! callers can check before downcasting.

use crate::array::Array;
use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// Compiled block of bytecode
    Block,
    /// Anything callable: user functions and host functions
    Function,
    /// Virtual array whose items come from a generator function
    ProcArray,
}

#[derive(Clone)]
pub struct Native {
    kind: NativeKind,
    payload: Rc<dyn Any>,
    content: Rc<Value>,
}

impl Native {
    pub fn new<T: Any>(kind: NativeKind, payload: T, content: Value) -> Self {
        Native {
            kind,
            payload: Rc::new(payload),
            content: Rc::new(content),
        }
    }

    pub fn kind(&self) -> NativeKind {
        self.kind
    }

    /// Value the native behaves like for member access (a function's
    /// closure object, a proc-array's index range)
    pub fn content(&self) -> &Value {
        &*self.content
    }

    /// Same payload with a different content
    pub fn with_content(&self, content: Value) -> Native {
        Native {
            kind: self.kind,
            payload: self.payload.clone(),
            content: Rc::new(content),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.payload.clone().downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &Native) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
    }

    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.payload) as *const () as usize
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Native({:?} @ {:#x})", self.kind, self.address())
    }
}

/// Payload of a proc-array: item `i` is `generator(i)`
#[derive(Debug, Clone)]
pub struct ProcArray {
    pub generator: Value,
}

impl ProcArray {
    /// Proc-array over indices `1..=size`
    pub fn pack(generator: Value, size: usize) -> Value {
        let content = if size == 0 {
            Value::empty_array()
        } else {
            Value::Array(Array::range(1, size as i64))
        };
        Value::Native(Native::new(NativeKind::ProcArray, ProcArray { generator }, content))
    }
}
