//! # Quire Core
//!
//! The operation algebra behind collaborative plain-text editing.
//!
//! An [`Operation`] describes an edit as a run of retain/insert/delete steps.
//! Operations can be applied, inverted, composed, and transformed against a
//! concurrent operation so that both sides converge:
//!
//! ```text
//! a.compose(b') == b.compose(a')   where (a', b') = transform(a, b)
//! ```
//!
//! [`Selection`]s and arbitrary [`Meta`]data ride the same algebra through
//! [`WrappedOperation`].

pub mod edit;
pub mod error;
pub mod meta;
pub mod operation;
pub mod random;
pub mod selection;
pub mod simple;
pub mod wrapped;

pub use edit::{transform, Edit};
pub use error::{OtError, Result};
pub use meta::{Meta, MetaMap};
pub use operation::{Operation, Primitive};
pub use selection::{Range, Selection};
pub use simple::SimpleOperation;
pub use wrapped::WrappedOperation;
