//! Type-erased, clonable callable wrapper with inline storage for small targets.
//!
//! [`Function<S>`] holds any `FnMut` closure or function compatible with the declared signature
//! `S`, spelled as a function pointer type. Targets of up to three pointer widths are stored
//! inline, without heap allocation; larger ones are boxed.
//!
//! ## Usage
//!
//! ```
//! use minifunction::{Empty, EmptyCallError, Function};
//!
//! // Captures a single integer, so no allocation is performed.
//! let x = 100;
//! let mut f: Function<fn() -> i32> = Function::new(move || x);
//! assert!(f.is_inline());
//! assert_eq!(f.call(()), Ok(100));
//!
//! // Clones are independent.
//! let mut g = f.clone();
//! drop(f);
//! assert_eq!(g.call(()), Ok(100));
//!
//! // Large targets are boxed.
//! let table = [1u64; 32];
//! let mut sum: Function<fn(usize) -> u64> =
//!     Function::new(move |n: usize| table.iter().take(n).sum::<u64>());
//! assert!(!sum.is_inline());
//! assert_eq!(sum.call((5,)), Ok(5));
//!
//! // Calling an empty function is an error.
//! sum = Empty.into();
//! assert_eq!(sum.call((5,)), Err(EmptyCallError));
//! ```

mod error;
mod function;
mod signature;
mod storage;
mod vtable;

pub use self::{
    error::EmptyCallError,
    function::{Empty, Function},
    signature::{Invoke, Signature},
    storage::{INLINE_ALIGN, INLINE_CAPACITY},
};
