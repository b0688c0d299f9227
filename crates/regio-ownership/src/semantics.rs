//! Operation semantics.
//!
//! One match arm per operation kind. Each arm validates every operand and
//! shape constraint before touching any state, so a rejected operation
//! leaves the tracker and arena exactly as they were.

use crate::arena::{Arena, ObjectId, RegionId, Slot};
use crate::error::{ConsumeCause, ConsumedAt, ErrorKind, Rejection};
use crate::state::ValueTracker;
use crate::verifier::Strictness;
use regio_ir::{OpId, OpKind, Param, ValueId};
use regio_types::{types_compatible, ClassName, ClassTable, Type};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::trace;

type Step<T> = Result<T, Rejection>;

/// Abstract machine for one unit: value states plus the object arena.
#[derive(Debug)]
pub(crate) struct Machine<'a> {
    classes: &'a ClassTable,
    strictness: Strictness,
    pub(crate) values: ValueTracker,
    pub(crate) arena: Arena,
}

/// A validated operand: its type and the object it refers to.
#[derive(Debug, Clone)]
struct Operand {
    value: ValueId,
    ty: Type,
    object: Option<ObjectId>,
}

impl<'a> Machine<'a> {
    pub(crate) fn new(classes: &'a ClassTable, strictness: Strictness, capacity: usize) -> Self {
        Self {
            classes,
            strictness,
            values: ValueTracker::with_capacity(capacity),
            arena: Arena::new(),
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub(crate) fn bind_param(&mut self, param: &Param) -> Result<(), ErrorKind> {
        if let Some(class) = param.ty.class_name() {
            self.classes.class_id(class)?;
        }
        if self.values.get(param.value).is_some() {
            return Err(ErrorKind::ValueRedefined { value: param.value });
        }
        let object = match &param.ty {
            Type::Owned(class) => Some(self.arena.new_region(class.clone())),
            Type::Unowned(class) => Some(self.arena.new_external(class.clone())),
            Type::Primitive(_) => None,
        };
        self.values.bind_result(param.value, param.ty.clone(), object, None)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Apply `op` and return the value it defines with its resolved type.
    pub(crate) fn apply(&mut self, id: OpId, op: &OpKind) -> Step<Option<(ValueId, Type)>> {
        if let Some(result) = op.result() {
            if self.values.get(result).is_some() {
                return Err(ErrorKind::ValueRedefined { value: result }.into());
            }
        }

        match op {
            OpKind::Copy { input, result } => {
                let input = self.operand(*input)?;
                self.consume(input.value, id)?;
                self.define(*result, input.ty, input.object, id)
            }

            OpKind::View { input, result } => {
                let input = self.reference(*input)?;
                let ty = input.ty.as_unowned();
                self.define(*result, ty, input.object, id)
            }

            OpKind::FieldRead {
                origin,
                field,
                output,
                result,
            } => {
                let origin = self.reference(*origin)?;
                let declared = self.declared_field(&origin, field)?;
                let ty = declared.as_unowned();
                if let Some(output) = output {
                    if !types_compatible(&ty, output) {
                        return Err(ErrorKind::mismatch(&ty, output).into());
                    }
                }
                let object = self.read_slot(&origin, field, &declared);
                if let Some(dropped) = object.and_then(|o| self.arena.dropped_at(o)) {
                    return Err(ErrorKind::UseAfterConsume {
                        value: origin.value,
                        consumed_at: ConsumedAt {
                            op: dropped,
                            cause: ConsumeCause::RegionDropped,
                        },
                    }
                    .into());
                }
                self.define(*result, ty, object, id)
            }

            OpKind::FieldWrite {
                origin,
                field,
                value,
                result,
            } => {
                let origin = self.reference(*origin)?;
                let declared = self.declared_field(&origin, field)?;
                let value = self.operand(*value)?;
                if !types_compatible(&declared, &value.ty) {
                    return Err(ErrorKind::mismatch(&declared, &value.ty).into());
                }
                let origin_obj = self.object_of(&origin)?;
                let value_region = self.owned_region(&value)?;
                if let Some(region) = value_region {
                    if self.arena.encloses(region, self.arena.region_of(origin_obj)) {
                        return Err(ErrorKind::RegionCycle { value: value.value }.into());
                    }
                }

                let previous = self.read_slot(&origin, field, &declared);
                if declared.is_owned() {
                    if let Some(previous) = previous {
                        self.arena.detach(self.arena.region_of(previous));
                    }
                }
                self.consume(value.value, id)?;
                let slot = value.object.map_or(Slot::Primitive, Slot::Object);
                self.arena.set_field(origin_obj, field.clone(), slot);
                if let Some(region) = value_region {
                    self.arena.attach(region, origin_obj);
                }
                let produced = self.define(*result, declared, previous, id)?;
                // Overwriting a slot that points into a dropped region hands
                // back a reference that is already dead.
                if let Some(dropped) = previous.and_then(|o| self.arena.dropped_at(o)) {
                    self.values.mark_dropped(*result, dropped);
                }
                Ok(produced)
            }

            OpKind::Tidy { region } => {
                let region = self.operand(*region)?;
                if !region.ty.is_owned() {
                    return Err(ErrorKind::mismatch("an owned region entrypoint", &region.ty).into());
                }
                Ok(None)
            }

            OpKind::Drop { value } => {
                let value = self.operand(*value)?;
                self.consume(value.value, id)?;
                if let (Type::Owned(_), Some(object), Strictness::Strict) =
                    (&value.ty, value.object, self.strictness)
                {
                    if self.arena.is_entry(object) {
                        let region = self.arena.region_of(object);
                        let dead = self.arena.deallocate(region, id);
                        let invalidated = self.values.invalidate_objects(&dead, id);
                        trace!(%region, objects = dead.len(), invalidated, "region dropped");
                    }
                }
                Ok(None)
            }

            OpKind::NewRegion {
                class,
                fields,
                values,
                result,
            } => {
                let inits = self.check_allocation(id, class, fields, values)?;
                let entry = self.arena.new_region(class.clone());
                self.initialize(id, entry, inits)?;
                self.define(*result, Type::Owned(class.clone()), Some(entry), id)
            }

            OpKind::NewObject {
                region,
                class,
                fields,
                values,
                result,
            } => {
                let target = self.reference(*region)?;
                let target = self.arena.region_of(self.object_of(&target)?);
                let inits = self.check_allocation(id, class, fields, values)?;
                for (_, value) in &inits {
                    if let Some(region) = self.owned_region(value)? {
                        if self.arena.encloses(region, target) {
                            return Err(ErrorKind::RegionCycle { value: value.value }.into());
                        }
                    }
                }
                let object = self.arena.new_object(target, class.clone());
                self.initialize(id, object, inits)?;
                self.define(*result, Type::Unowned(class.clone()), Some(object), id)
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn operand(&self, value: ValueId) -> Step<Operand> {
        let info = self.values.require_valid(value)?;
        Ok(Operand {
            value,
            ty: info.ty.clone(),
            object: info.object,
        })
    }

    /// A valid operand of reference type.
    fn reference(&self, value: ValueId) -> Step<Operand> {
        let operand = self.operand(value)?;
        if !operand.ty.is_reference() {
            return Err(ErrorKind::mismatch("a reference", &operand.ty).into());
        }
        Ok(operand)
    }

    fn object_of(&self, operand: &Operand) -> Step<ObjectId> {
        operand.object.ok_or_else(|| {
            ErrorKind::internal(format!("reference `{}` has no object", operand.value)).into()
        })
    }

    /// The region an owned operand enters, if it is owned.
    fn owned_region(&self, operand: &Operand) -> Step<Option<RegionId>> {
        if !operand.ty.is_owned() {
            return Ok(None);
        }
        let object = self.object_of(operand)?;
        Ok(Some(self.arena.region_of(object)))
    }

    /// Declared type of `field` on the class `origin` refers to. An
    /// undeclared field is a type error on the origin.
    fn declared_field(&self, origin: &Operand, field: &str) -> Step<Type> {
        let class = origin
            .ty
            .class_name()
            .ok_or_else(|| ErrorKind::mismatch("a reference", &origin.ty))?;
        let class_id = self.classes.class_id(class)?;
        self.classes
            .lookup_field(class_id, field)
            .cloned()
            .map_err(|_| {
                ErrorKind::mismatch(format!("a class with field `{}`", field), &origin.ty).into()
            })
    }

    /// Object currently held in `origin.field`, materializing it if the
    /// slot has never been observed.
    fn read_slot(&mut self, origin: &Operand, field: &SmolStr, declared: &Type) -> Option<ObjectId> {
        let origin_obj = origin.object?;
        match self.arena.field(origin_obj, field) {
            Some(Slot::Object(object)) => Some(object),
            Some(Slot::Primitive) => None,
            None => {
                let slot = self.materialize(origin_obj, declared);
                self.arena.set_field(origin_obj, field.clone(), slot);
                match slot {
                    Slot::Object(object) => Some(object),
                    Slot::Primitive => None,
                }
            }
        }
    }

    fn materialize(&mut self, origin: ObjectId, declared: &Type) -> Slot {
        match declared {
            Type::Owned(class) => {
                let entry = self.arena.new_region(class.clone());
                self.arena.attach(self.arena.region_of(entry), origin);
                Slot::Object(entry)
            }
            Type::Unowned(class) => {
                let region = self.arena.region_of(origin);
                Slot::Object(self.arena.new_object(region, class.clone()))
            }
            Type::Primitive(_) => Slot::Primitive,
        }
    }

    /// Shape and operand checks shared by both allocation operations.
    fn check_allocation(
        &self,
        id: OpId,
        class: &ClassName,
        fields: &[SmolStr],
        values: &[ValueId],
    ) -> Step<Vec<(SmolStr, Operand)>> {
        let (class_id, _) = self.classes.lookup_class(class)?;
        if fields.len() != values.len() {
            return Err(ErrorKind::FieldArityMismatch {
                class: class.clone(),
                fields: fields.len(),
                values: values.len(),
            }
            .into());
        }

        let mut seen_fields = FxHashSet::default();
        let mut seen_values = FxHashSet::default();
        let mut inits = Vec::with_capacity(fields.len());
        for (field, value) in fields.iter().zip(values) {
            let declared = self.classes.lookup_field(class_id, field)?;
            if !seen_fields.insert(field) {
                return Err(ErrorKind::DuplicateField {
                    class: class.clone(),
                    field: field.clone(),
                }
                .into());
            }
            let operand = self.operand(*value)?;
            if !seen_values.insert(*value) {
                // The earlier slot in this same operation consumes it.
                return Err(ErrorKind::UseAfterConsume {
                    value: *value,
                    consumed_at: ConsumedAt {
                        op: id,
                        cause: ConsumeCause::Operand,
                    },
                }
                .into());
            }
            if !types_compatible(declared, &operand.ty) {
                return Err(ErrorKind::mismatch(declared, &operand.ty).into());
            }
            inits.push((field.clone(), operand));
        }
        Ok(inits)
    }

    /// Consume the checked field values and store them into `object`.
    fn initialize(&mut self, id: OpId, object: ObjectId, inits: Vec<(SmolStr, Operand)>) -> Step<()> {
        for (field, value) in inits {
            self.consume(value.value, id)?;
            let slot = value.object.map_or(Slot::Primitive, Slot::Object);
            self.arena.set_field(object, field, slot);
            if let Some(region) = self.owned_region(&value)? {
                self.arena.attach(region, object);
            }
        }
        Ok(())
    }

    fn consume(&mut self, value: ValueId, id: OpId) -> Step<()> {
        self.values.mark_consumed(value, id)?;
        Ok(())
    }

    fn define(
        &mut self,
        result: ValueId,
        ty: Type,
        object: Option<ObjectId>,
        id: OpId,
    ) -> Step<Option<(ValueId, Type)>> {
        self.values.bind_result(result, ty.clone(), object, Some(id))?;
        Ok(Some((result, ty)))
    }
}
