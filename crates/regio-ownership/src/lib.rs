//! Regio Ownership Verifier
//!
//! Static verification of linear ownership and region consistency for
//! Regio IR units.
//!
//! # Model
//!
//! Objects live in regions. Each region has exactly one entrypoint object,
//! reachable from outside through an `Owned` reference. `Unowned`
//! references are aliases with no deallocation rights.
//!
//! The verifier tracks, for every value of a unit:
//!
//! - its type and whether it is still valid or already consumed
//! - the abstract object it refers to, and that object's region
//!
//! and rejects any unit that
//!
//! - uses a consumed value (owned values are linear)
//! - reads or writes fields inconsistently with the class table
//! - stores a region's entrypoint inside that same region
//!
//! `drop` of an owned entrypoint deallocates its region and every region
//! nested under it through owned fields. With [`Strictness::Strict`] every
//! reference into those regions is invalidated as well.
//!
//! # Example
//!
//! ```
//! use regio_ir::UnitBuilder;
//! use regio_ownership::{verify, ErrorKind};
//! use regio_types::{ClassTable, PendingClass, Type};
//!
//! let classes = ClassTable::from_decls([
//!     PendingClass::new("Cell").field("value", Type::primitive("i64")),
//! ])
//! .unwrap();
//!
//! let mut b = UnitBuilder::new("main");
//! let n = b.param(Type::primitive("i64"));
//! let cell = b.new_region("Cell", &["value"], &[n]);
//! b.drop(cell);
//! b.drop(cell);
//!
//! let err = verify(&classes, &b.finish()).unwrap_err();
//! assert!(matches!(err.kind(), ErrorKind::UseAfterConsume { .. }));
//! ```

mod arena;
pub mod error;
mod error_diagnostic;
mod parallel;
mod semantics;
mod state;
mod verifier;

pub use arena::{ObjectId, RegionId};
pub use error::{ConsumeCause, ConsumedAt, ErrorKind, Violation, VerifyError, VerifyResult};
pub use parallel::{verify_module, verify_units};
pub use state::{ValueInfo, ValueState};
pub use verifier::{
    AnnotatedOp, AnnotatedUnit, Strictness, Verifier, VerifierConfig, VerifierState,
};

use regio_ir::Unit;
use regio_types::ClassTable;

/// Verify `unit` with the default configuration.
pub fn verify(classes: &ClassTable, unit: &Unit) -> VerifyResult<AnnotatedUnit> {
    Verifier::new(classes).verify(unit)
}

/// Verify `unit` with `config`.
pub fn verify_with_config(
    classes: &ClassTable,
    unit: &Unit,
    config: VerifierConfig,
) -> VerifyResult<AnnotatedUnit> {
    Verifier::with_config(classes, config).verify(unit)
}
