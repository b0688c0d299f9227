//! Parallel verification of independent units.
//!
//! Each unit gets its own verifier over a shared, sealed class table.

use crate::error::VerifyResult;
use crate::verifier::{AnnotatedUnit, Verifier, VerifierConfig};
use rayon::prelude::*;
use regio_ir::{Module, Unit};
use regio_types::{ClassResult, ClassTable};
use tracing::debug;

/// Verify `units` concurrently. Results are in input order.
pub fn verify_units(
    classes: &ClassTable,
    units: &[Unit],
    config: &VerifierConfig,
) -> Vec<VerifyResult<AnnotatedUnit>> {
    debug!(units = units.len(), "verifying units in parallel");
    units
        .par_iter()
        .map(|unit| Verifier::with_config(classes, config.clone()).verify(unit))
        .collect()
}

/// Seal the module's class table, then verify every unit against it.
pub fn verify_module(
    module: &Module,
    config: &VerifierConfig,
) -> ClassResult<Vec<VerifyResult<AnnotatedUnit>>> {
    let classes = module.class_table()?;
    Ok(verify_units(&classes, &module.units, config))
}
