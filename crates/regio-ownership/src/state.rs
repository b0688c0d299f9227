//! Value state tracking.
//!
//! Maps every value of a unit to its type, its verification state and the
//! abstract object it refers to. This is the linear part of the analysis:
//! a value moves from `Valid` to `Consumed` at most once.

use crate::arena::ObjectId;
use crate::error::{ConsumeCause, ConsumedAt, ErrorKind, Rejection};
use regio_ir::{OpId, ValueId};
use regio_types::Type;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Verification state of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    Valid,
    Consumed(ConsumedAt),
    /// Result of an operation that failed verification. Only reachable
    /// when collecting more than one diagnostic.
    Poisoned,
}

impl ValueState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValueState::Valid)
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, ValueState::Consumed(_))
    }
}

/// Everything known about one bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    pub ty: Type,
    pub state: ValueState,
    /// The abstract object a reference points to; `None` for primitives.
    pub object: Option<ObjectId>,
    /// Defining operation; `None` for unit parameters.
    pub defined_at: Option<OpId>,
}

/// Per-unit map from value handles to their state.
///
/// Handles are sparse: a unit may use any `u32`, so values are keyed by
/// handle rather than stored densely.
#[derive(Debug, Clone, Default)]
pub struct ValueTracker {
    values: FxHashMap<ValueId, ValueInfo>,
    /// Values referring to each object, for region deallocation.
    referrers: FxHashMap<ObjectId, Vec<ValueId>>,
}

impl ValueTracker {
    pub fn with_capacity(values: usize) -> Self {
        Self {
            values: FxHashMap::with_capacity_and_hasher(values, Default::default()),
            referrers: FxHashMap::default(),
        }
    }

    pub fn get(&self, value: ValueId) -> Option<&ValueInfo> {
        self.values.get(&value)
    }

    /// Introduce a newly produced value as `Valid`.
    pub fn bind_result(
        &mut self,
        value: ValueId,
        ty: Type,
        object: Option<ObjectId>,
        defined_at: Option<OpId>,
    ) -> Result<(), ErrorKind> {
        if self.values.contains_key(&value) {
            return Err(ErrorKind::ValueRedefined { value });
        }
        if let Some(object) = object {
            self.referrers.entry(object).or_default().push(value);
        }
        self.values.insert(
            value,
            ValueInfo {
                ty,
                state: ValueState::Valid,
                object,
                defined_at,
            },
        );
        Ok(())
    }

    /// Read-before-use check shared by every operation.
    pub(crate) fn require_valid(&self, value: ValueId) -> Result<&ValueInfo, Rejection> {
        let info = self
            .get(value)
            .ok_or(ErrorKind::UndefinedValue { value })?;
        match info.state {
            ValueState::Valid => Ok(info),
            ValueState::Consumed(consumed_at) => {
                Err(ErrorKind::UseAfterConsume { value, consumed_at }.into())
            }
            ValueState::Poisoned => Err(Rejection::Poisoned),
        }
    }

    /// Transition `value` to `Consumed`.
    pub fn mark_consumed(&mut self, value: ValueId, op: OpId) -> Result<(), ErrorKind> {
        let info = self
            .values
            .get_mut(&value)
            .ok_or(ErrorKind::UndefinedValue { value })?;
        if let ValueState::Consumed(consumed_at) = info.state {
            return Err(ErrorKind::UseAfterConsume { value, consumed_at });
        }
        trace!(%value, %op, "consumed");
        info.state = ValueState::Consumed(ConsumedAt {
            op,
            cause: ConsumeCause::Operand,
        });
        Ok(())
    }

    /// Invalidate a still-valid `value` because the region it points into
    /// was deallocated by `op`.
    pub fn mark_dropped(&mut self, value: ValueId, op: OpId) -> bool {
        match self.values.get_mut(&value) {
            Some(info) if info.state.is_valid() => {
                info.state = ValueState::Consumed(ConsumedAt {
                    op,
                    cause: ConsumeCause::RegionDropped,
                });
                true
            }
            _ => false,
        }
    }

    /// Invalidate every valid value that points at one of `objects`.
    /// Returns how many values were invalidated.
    pub fn invalidate_objects(&mut self, objects: &[ObjectId], op: OpId) -> usize {
        let mut count = 0;
        for object in objects {
            let Some(referrers) = self.referrers.remove(object) else {
                continue;
            };
            for value in referrers {
                if self.mark_dropped(value, op) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Mark the result of a failed operation so later uses are not
    /// reported again. A handle that is already bound keeps its state.
    pub fn poison(&mut self, value: ValueId, ty: Option<Type>) {
        self.values.entry(value).or_insert_with(|| ValueInfo {
            ty: ty.unwrap_or_else(|| Type::primitive("?")),
            state: ValueState::Poisoned,
            object: None,
            defined_at: None,
        });
    }

    /// All bound values in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &ValueInfo)> {
        let mut values: Vec<_> = self.values.iter().map(|(&value, info)| (value, info)).collect();
        values.sort_unstable_by_key(|(value, _)| *value);
        values.into_iter()
    }
}
