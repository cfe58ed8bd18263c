//! Value model for mscript
//!
//! Every runtime value is immutable and shared through `Rc`. Containers never
//! change in place; operations that "modify" an array return a new array that
//! shares structure with the old one.
//!
//! # Modules
//!
//! - `value`: the `Value` enum, numbers and conversions
//! - `array`: flat arrays, persistent builder nodes, truncate views, ranges
//!   and lazy index maps
//! - `object`: sorted immutable maps
//! - `native`: tagged wrappers around host objects (blocks, functions, proc-arrays)
//! - `compare`: equality and three-way ordering
//! - `format`: stringification and JSON interop

pub mod array;
pub mod compare;
pub mod format;
pub mod native;
pub mod object;
pub mod value;

pub use array::{Array, ArrayData, Range, LIST_MARKER, PARAM_PACK};
pub use native::{Native, NativeKind, ProcArray};
pub use object::Object;
pub use value::{Number, Value};
