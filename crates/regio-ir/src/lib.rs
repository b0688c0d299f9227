//! Regio IR: operation records for the region-ownership IR.
//!
//! The IR is produced by an external front end and consumed by the
//! verifier in `regio-ownership`. It consists of:
//!
//! - **Classes**: named, ordered field declarations (see `regio-types`)
//! - **Units**: typed parameters, an ordered operation sequence, and the
//!   values that escape the unit
//! - **Operations**: `copy`, `view`, `field_read`, `field_write`, `tidy`,
//!   `drop`, `new_region`, `new_object`
//!
//! # Example
//!
//! ```
//! use regio_ir::{print_unit, UnitBuilder};
//! use regio_types::Type;
//!
//! let mut b = UnitBuilder::new("main");
//! let n = b.param(Type::primitive("i64"));
//! let r = b.new_region("Cell", &["value"], &[n]);
//! b.drop(r);
//! let unit = b.finish();
//!
//! assert!(print_unit(&unit).contains("new_region @Cell"));
//! ```

mod builder;
pub mod ir;
mod pretty;

pub use builder::UnitBuilder;
pub use ir::{Module, OpId, OpKind, Operation, Param, Unit, ValueId};
pub use pretty::{op_to_string, print_module, print_unit};
