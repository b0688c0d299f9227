//! Verifier driver.
//!
//! Walks a unit's operations in sequence order, applies the operation
//! semantics and collects violations. Acceptance is all-or-nothing: a unit
//! with any violation is rejected as a whole.

use crate::arena::{Arena, ObjectId, Region, RegionId};
use crate::error::{ErrorKind, Rejection, Violation, VerifyError, VerifyResult};
use crate::semantics::Machine;
use crate::state::{ValueInfo, ValueState, ValueTracker};
use regio_diagnostics::span::SourceSpan;
use regio_ir::{OpId, Operation, Unit, ValueId};
use regio_types::{ClassTable, Type};
use smol_str::SmolStr;
use tracing::{debug, instrument};

// ============================================================================
// Configuration
// ============================================================================

/// How `drop` of an owned entrypoint treats other references into the
/// deallocated regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Every reference into a dropped region, and into regions nested under
    /// it, is invalidated.
    #[default]
    Strict,
    /// Only the dropped reference itself is consumed.
    Permissive,
}

/// Verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub strictness: Strictness,
    /// Violations to collect before stopping. `1` stops at the first one;
    /// `0` collects all of them.
    pub max_diagnostics: usize,
    /// Reject owned values that are still valid at the end of the unit
    /// and are not returned.
    pub deny_leaked_owned: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Strict,
            max_diagnostics: 1,
            deny_leaked_owned: false,
        }
    }
}

impl VerifierConfig {
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = max;
        self
    }

    pub fn with_deny_leaked_owned(mut self, deny: bool) -> Self {
        self.deny_leaked_owned = deny;
        self
    }

    fn is_full(&self, collected: usize) -> bool {
        self.max_diagnostics != 0 && collected >= self.max_diagnostics
    }
}

// ============================================================================
// Annotated output
// ============================================================================

/// An operation together with the type of the value it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedOp {
    pub id: OpId,
    pub op: Operation,
    pub result: Option<(ValueId, Type)>,
}

impl AnnotatedOp {
    pub fn result_type(&self) -> Option<&Type> {
        self.result.as_ref().map(|(_, ty)| ty)
    }
}

/// A verified unit.
#[derive(Debug, Clone)]
pub struct AnnotatedUnit {
    name: SmolStr,
    ops: Vec<AnnotatedOp>,
    returns: Vec<ValueId>,
    values: ValueTracker,
    arena: Arena,
}

impl AnnotatedUnit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ops(&self) -> &[AnnotatedOp] {
        &self.ops
    }

    pub fn op(&self, id: OpId) -> Option<&AnnotatedOp> {
        self.ops.get(id.index())
    }

    /// Statically resolved result type of operation `id`.
    pub fn result_type(&self, id: OpId) -> Option<&Type> {
        self.op(id).and_then(AnnotatedOp::result_type)
    }

    pub fn value(&self, value: ValueId) -> Option<&ValueInfo> {
        self.values.get(value)
    }

    pub fn value_type(&self, value: ValueId) -> Option<&Type> {
        self.value(value).map(|info| &info.ty)
    }

    /// State of `value` at the end of the unit.
    pub fn value_state(&self, value: ValueId) -> Option<ValueState> {
        self.value(value).map(|info| info.state)
    }

    /// Identity of the object `value` refers to. Two values refer to the
    /// same object iff their identities are equal.
    pub fn object_of(&self, value: ValueId) -> Option<ObjectId> {
        self.value(value).and_then(|info| info.object)
    }

    pub fn region_of(&self, value: ValueId) -> Option<RegionId> {
        self.object_of(value).map(|object| self.arena.region_of(object))
    }

    pub fn is_region_live(&self, region: RegionId) -> bool {
        self.arena.get_region(region).is_some_and(Region::is_live)
    }

    /// Whether `region` lies outside the unit, reached only through an
    /// unowned parameter.
    pub fn is_region_external(&self, region: RegionId) -> bool {
        self.arena.get_region(region).is_some_and(|r| r.external)
    }

    /// Entrypoint object of `region`.
    pub fn region_entry(&self, region: RegionId) -> Option<ObjectId> {
        self.arena.get_region(region).map(|r| r.entry)
    }

    pub fn object_class(&self, object: ObjectId) -> Option<&str> {
        self.arena.get_object(object).map(|o| o.class.as_str())
    }

    /// Values that escape the unit.
    pub fn escaping(&self) -> &[ValueId] {
        &self.returns
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Driver state over one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Unvisited,
    Verifying,
    Verified,
    Rejected,
}

/// Verifies units against a sealed class table.
#[derive(Debug)]
pub struct Verifier<'a> {
    classes: &'a ClassTable,
    config: VerifierConfig,
    state: VerifierState,
}

impl<'a> Verifier<'a> {
    pub fn new(classes: &'a ClassTable) -> Self {
        Self::with_config(classes, VerifierConfig::default())
    }

    pub fn with_config(classes: &'a ClassTable, config: VerifierConfig) -> Self {
        Self {
            classes,
            config,
            state: VerifierState::Unvisited,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// State after the most recent `verify` call.
    pub fn state(&self) -> VerifierState {
        self.state
    }

    #[instrument(skip_all, fields(unit = %unit.name, ops = unit.ops.len()))]
    pub fn verify(&mut self, unit: &Unit) -> VerifyResult<AnnotatedUnit> {
        self.state = VerifierState::Verifying;
        let result = UnitRun::new(self.classes, &self.config, unit).run();
        self.state = match &result {
            Ok(_) => VerifierState::Verified,
            Err(_) => VerifierState::Rejected,
        };
        result
    }
}

/// Mutable state of one verification run.
struct UnitRun<'a> {
    config: &'a VerifierConfig,
    unit: &'a Unit,
    machine: Machine<'a>,
    violations: Vec<Violation>,
}

impl<'a> UnitRun<'a> {
    fn new(classes: &'a ClassTable, config: &'a VerifierConfig, unit: &'a Unit) -> Self {
        Self {
            config,
            unit,
            machine: Machine::new(classes, config.strictness, unit.params.len() + unit.ops.len()),
            violations: Vec::new(),
        }
    }

    fn report(&mut self, kind: ErrorKind, op: Option<OpId>, span: Option<SourceSpan>) {
        debug!(code = kind.code(), ?op, "{}", kind);
        self.violations.push(Violation { kind, op, span });
    }

    fn full(&self) -> bool {
        self.config.is_full(self.violations.len())
    }

    fn run(mut self) -> VerifyResult<AnnotatedUnit> {
        let unit = self.unit;
        for param in &unit.params {
            if let Err(kind) = self.machine.bind_param(param) {
                self.report(kind, None, None);
                self.machine.values.poison(param.value, Some(param.ty.clone()));
                if self.full() {
                    return self.reject();
                }
            }
        }

        let mut ops = Vec::with_capacity(unit.ops.len());
        for (id, op) in unit.iter() {
            match self.machine.apply(id, &op.kind) {
                Ok(result) => {
                    debug!(
                        op = %id,
                        kind = op.kind.name(),
                        ty = ?result.as_ref().map(|(_, ty)| ty.to_string()),
                        "verified"
                    );
                    ops.push(AnnotatedOp {
                        id,
                        op: op.clone(),
                        result,
                    });
                }
                Err(rejection) => {
                    if let Rejection::Error(kind) = rejection {
                        self.report(kind, Some(id), op.span.clone());
                    }
                    // A handle bound earlier (`ValueRedefined`) keeps its state.
                    if let Some(result) = op.kind.result() {
                        self.machine.values.poison(result, None);
                    }
                    if self.full() {
                        return self.reject();
                    }
                }
            }
        }

        self.check_exit();
        if !self.violations.is_empty() {
            return self.reject();
        }

        let machine = self.machine;
        Ok(AnnotatedUnit {
            name: unit.name.clone(),
            ops,
            returns: unit.returns.clone(),
            values: machine.values,
            arena: machine.arena,
        })
    }

    /// Returned values must still be valid; with `deny_leaked_owned`,
    /// every other valid owned value is a leak.
    fn check_exit(&mut self) {
        let unit = self.unit;
        for &value in &unit.returns {
            if self.full() {
                return;
            }
            if let Err(Rejection::Error(kind)) = self.machine.values.require_valid(value) {
                self.report(kind, None, None);
            }
        }

        if !self.config.deny_leaked_owned {
            return;
        }
        let leaked: Vec<_> = self
            .machine
            .values
            .iter()
            .filter(|(value, info)| {
                info.ty.is_owned() && info.state.is_valid() && !unit.returns.contains(value)
            })
            .map(|(value, info)| (value, info.ty.clone()))
            .collect();
        for (value, ty) in leaked {
            if self.full() {
                return;
            }
            self.report(ErrorKind::LeakedOwned { value, ty }, None, None);
        }
    }

    fn reject(self) -> VerifyResult<AnnotatedUnit> {
        debug!(violations = self.violations.len(), "unit rejected");
        let mut violations = self.violations.into_iter();
        let first = violations.next().unwrap_or_else(|| Violation {
            kind: ErrorKind::internal("unit rejected without a violation"),
            op: None,
            span: None,
        });
        Err(VerifyError::new(self.unit.name.clone(), first, violations.collect()))
    }
}
