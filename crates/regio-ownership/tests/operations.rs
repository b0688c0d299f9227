//! Per-operation verification rules.
//!
//! Covers:
//! 1. Consumption rules of `copy`, `view`, `tidy` and `drop`
//! 2. Field reads and writes against declared class shapes
//! 3. Allocation arity, field and operand checks
//! 4. Structural errors on raw value handles

use pretty_assertions::assert_eq;
use regio_ir::{OpId, OpKind, Unit, UnitBuilder, ValueId};
use regio_ownership::{
    verify, AnnotatedUnit, ConsumeCause, ConsumedAt, ErrorKind, ValueState, VerifyError,
};
use regio_types::{ClassTable, PendingClass, Type};

fn classes() -> ClassTable {
    ClassTable::from_decls([
        PendingClass::new("C")
            .field("f", Type::owned("D"))
            .field("g", Type::unowned("D"))
            .field("n", Type::primitive("i64")),
        PendingClass::new("D").field("x", Type::primitive("i64")),
        PendingClass::new("Pair")
            .field("a", Type::primitive("i64"))
            .field("b", Type::primitive("i64")),
    ])
    .unwrap()
}

fn accept(unit: Unit) -> AnnotatedUnit {
    match verify(&classes(), &unit) {
        Ok(annotated) => annotated,
        Err(err) => panic!("expected `{}` to verify, got: {}", unit.name, err),
    }
}

fn reject(unit: Unit) -> VerifyError {
    match verify(&classes(), &unit) {
        Ok(_) => panic!("expected `{}` to be rejected", unit.name),
        Err(err) => err,
    }
}

fn consumed_by(op: u32) -> ConsumedAt {
    ConsumedAt {
        op: OpId(op),
        cause: ConsumeCause::Operand,
    }
}

// ============================================================================
// copy / view
// ============================================================================

#[test]
fn test_copy_consumes_input() {
    let mut b = UnitBuilder::new("copy");
    let p = b.param(Type::owned("D"));
    b.copy(p);
    b.view(p);

    let err = reject(b.finish());
    assert_eq!(
        err.kind(),
        &ErrorKind::UseAfterConsume {
            value: p,
            consumed_at: consumed_by(0),
        }
    );
    assert_eq!(err.first().op, Some(OpId(1)));
}

#[test]
fn test_copy_transfers_ownership_and_identity() {
    let mut b = UnitBuilder::new("copy");
    let p = b.param(Type::owned("D"));
    let q = b.copy(p);
    b.drop(q);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(q), Some(&Type::owned("D")));
    assert_eq!(unit.object_of(q), unit.object_of(p));
    assert_eq!(unit.value_state(p), Some(ValueState::Consumed(consumed_by(0))));
}

#[test]
fn test_copy_of_unowned_stays_unowned() {
    let mut b = UnitBuilder::new("copy");
    let p = b.param(Type::unowned("D"));
    let q = b.copy(p);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(q), Some(&Type::unowned("D")));
    assert!(unit.value_state(p).is_some_and(|s| s.is_consumed()));
}

#[test]
fn test_view_is_non_consuming() {
    let mut b = UnitBuilder::new("view");
    let p = b.param(Type::owned("D"));
    let v = b.view(p);
    let w = b.view(p);
    b.view(v);
    b.drop(p);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(v), Some(&Type::unowned("D")));
    assert_eq!(unit.object_of(w), unit.object_of(p));
}

#[test]
fn test_view_of_primitive_is_rejected() {
    let mut b = UnitBuilder::new("view");
    let n = b.param(Type::primitive("i64"));
    b.view(n);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::TypeMismatch {
            expected: "a reference".into(),
            found: "i64".into(),
        }
    );
}

// ============================================================================
// field_read / field_write
// ============================================================================

#[test]
fn test_field_read_always_yields_unowned() {
    let mut b = UnitBuilder::new("read");
    let c = b.param(Type::owned("C"));
    let f = b.field_read(c, "f");
    let g = b.field_read(c, "g");
    let n = b.field_read(c, "n");

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(f), Some(&Type::unowned("D")));
    assert_eq!(unit.value_type(g), Some(&Type::unowned("D")));
    assert_eq!(unit.value_type(n), Some(&Type::primitive("i64")));
    assert_eq!(unit.value_state(c), Some(ValueState::Valid));
}

#[test]
fn test_field_read_of_undeclared_field() {
    let mut b = UnitBuilder::new("read");
    let c = b.param(Type::owned("C"));
    b.field_read(c, "nope");

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::TypeMismatch {
            expected: "a class with field `nope`".into(),
            found: "owned @C".into(),
        }
    );
}

#[test]
fn test_field_read_output_must_match_declaration() {
    let mut b = UnitBuilder::new("read");
    let c = b.param(Type::owned("C"));
    b.field_read_as(c, "f", Type::owned("D"));

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::TypeMismatch {
            expected: "unowned @D".into(),
            found: "owned @D".into(),
        }
    );
}

#[test]
fn test_write_then_read_owned_field_round_trips_identity() {
    let mut b = UnitBuilder::new("round_trip");
    let c = b.param(Type::owned("C"));
    let d = b.param(Type::owned("D"));
    let previous = b.field_write(c, "f", d);
    let read = b.field_read(c, "f");
    b.drop(previous);

    let unit = accept(b.finish());
    assert_eq!(unit.object_of(read), unit.object_of(d));
    assert_ne!(unit.object_of(previous), unit.object_of(d));
    assert_eq!(unit.value_type(previous), Some(&Type::owned("D")));
}

#[test]
fn test_write_then_read_unowned_field_round_trips_identity() {
    let mut b = UnitBuilder::new("round_trip");
    let c = b.param(Type::owned("C"));
    let d = b.param(Type::owned("D"));
    let alias = b.view(d);
    let previous = b.field_write(c, "g", alias);
    let read = b.field_read(c, "g");

    let unit = accept(b.finish());
    assert_eq!(unit.object_of(read), unit.object_of(d));
    assert_eq!(unit.value_type(previous), Some(&Type::unowned("D")));
}

#[test]
fn test_field_write_consumes_value_not_origin() {
    let mut b = UnitBuilder::new("write");
    let c = b.param(Type::owned("C"));
    let d = b.param(Type::owned("D"));
    let previous = b.field_write(c, "f", d);
    b.drop(previous);
    b.drop(c);
    b.drop(d);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::UseAfterConsume {
            value: d,
            consumed_at: consumed_by(0),
        }
    );
}

#[test]
fn test_field_write_type_mismatch() {
    let mut b = UnitBuilder::new("write");
    let c = b.param(Type::owned("C"));
    let d = b.param(Type::owned("D"));
    let alias = b.view(d);
    b.field_write(c, "f", alias);

    let err = reject(b.finish());
    assert_eq!(
        err.kind(),
        &ErrorKind::TypeMismatch {
            expected: "owned @D".into(),
            found: "unowned @D".into(),
        }
    );
    assert_eq!(err.first().op, Some(OpId(1)));
}

#[test]
fn test_field_write_of_primitive_field() {
    let mut b = UnitBuilder::new("write");
    let c = b.param(Type::owned("C"));
    let n = b.param(Type::primitive("i64"));
    let previous = b.field_write(c, "n", n);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(previous), Some(&Type::primitive("i64")));
    assert_eq!(unit.object_of(previous), None);
}

// ============================================================================
// tidy / drop
// ============================================================================

#[test]
fn test_tidy_leaves_entrypoint_usable() {
    let mut b = UnitBuilder::new("tidy");
    let n = b.param(Type::primitive("i64"));
    let r = b.new_region("D", &["x"], &[n]);
    let v = b.view(r);
    b.tidy(r);
    b.tidy(r);
    b.view(v);
    b.drop(r);

    let unit = accept(b.finish());
    assert_eq!(unit.result_type(OpId(2)), None);
}

#[test]
fn test_tidy_requires_owned_entrypoint() {
    let mut b = UnitBuilder::new("tidy");
    let d = b.param(Type::owned("D"));
    let v = b.view(d);
    b.tidy(v);

    assert!(matches!(
        reject(b.finish()).kind(),
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_drop_of_unowned_only_invalidates_the_alias() {
    let mut b = UnitBuilder::new("drop");
    let d = b.param(Type::owned("D"));
    let v = b.view(d);
    b.drop(v);
    b.field_read(d, "x");
    b.drop(d);

    let unit = accept(b.finish());
    assert_eq!(unit.value_state(v), Some(ValueState::Consumed(consumed_by(1))));
}

#[test]
fn test_drop_of_dropped_alias_is_rejected() {
    let mut b = UnitBuilder::new("drop");
    let d = b.param(Type::owned("D"));
    let v = b.view(d);
    b.drop(v);
    b.drop(v);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::UseAfterConsume {
            value: v,
            consumed_at: consumed_by(1),
        }
    );
}

// ============================================================================
// new_region / new_object
// ============================================================================

#[test]
fn test_new_region_arity_mismatch() {
    let mut b = UnitBuilder::new("alloc");
    let x = b.param(Type::owned("D"));
    b.new_region("C", &["f", "g"], &[x]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::FieldArityMismatch {
            class: "C".into(),
            fields: 2,
            values: 1,
        }
    );
}

#[test]
fn test_new_region_unknown_class() {
    let mut b = UnitBuilder::new("alloc");
    b.new_region("Nope", &[], &[]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::UnknownClass { name: "Nope".into() }
    );
}

#[test]
fn test_new_region_unknown_field() {
    let mut b = UnitBuilder::new("alloc");
    let n = b.param(Type::primitive("i64"));
    b.new_region("D", &["y"], &[n]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::UnknownField {
            class: "D".into(),
            field: "y".into(),
        }
    );
}

#[test]
fn test_new_region_duplicate_field() {
    let mut b = UnitBuilder::new("alloc");
    let m = b.param(Type::primitive("i64"));
    let n = b.param(Type::primitive("i64"));
    b.new_region("Pair", &["a", "a"], &[m, n]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::DuplicateField {
            class: "Pair".into(),
            field: "a".into(),
        }
    );
}

#[test]
fn test_new_region_value_type_mismatch() {
    let mut b = UnitBuilder::new("alloc");
    let flag = b.param(Type::primitive("bool"));
    b.new_region("D", &["x"], &[flag]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::TypeMismatch {
            expected: "i64".into(),
            found: "bool".into(),
        }
    );
}

#[test]
fn test_new_region_consumes_field_values() {
    let mut b = UnitBuilder::new("alloc");
    let n = b.param(Type::primitive("i64"));
    b.new_region("D", &["x"], &[n]);
    b.new_region("D", &["x"], &[n]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::UseAfterConsume {
            value: n,
            consumed_at: consumed_by(0),
        }
    );
}

#[test]
fn test_same_value_twice_in_one_allocation() {
    let mut b = UnitBuilder::new("alloc");
    let n = b.param(Type::primitive("i64"));
    b.new_region("Pair", &["a", "b"], &[n, n]);

    let err = reject(b.finish());
    assert_eq!(
        err.kind(),
        &ErrorKind::UseAfterConsume {
            value: n,
            consumed_at: consumed_by(0),
        }
    );
    assert_eq!(err.first().op, Some(OpId(0)));
}

#[test]
fn test_new_region_produces_owned_entrypoint() {
    let mut b = UnitBuilder::new("alloc");
    let n = b.param(Type::primitive("i64"));
    let r = b.new_region("D", &["x"], &[n]);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(r), Some(&Type::owned("D")));
    let region = unit.region_of(r).unwrap();
    assert_eq!(unit.region_entry(region), unit.object_of(r));
    assert_eq!(unit.object_class(unit.object_of(r).unwrap()), Some("D"));
}

#[test]
fn test_new_region_with_uninitialized_fields() {
    let mut b = UnitBuilder::new("alloc");
    let c = b.new_region("C", &[], &[]);
    let f = b.field_read(c, "f");
    b.drop(c);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(f), Some(&Type::unowned("D")));
}

#[test]
fn test_new_object_joins_target_region() {
    let mut b = UnitBuilder::new("object");
    let m = b.param(Type::primitive("i64"));
    let n = b.param(Type::primitive("i64"));
    let r = b.new_region("D", &["x"], &[m]);
    let alias = b.view(r);
    let o = b.new_object(alias, "D", &["x"], &[n]);
    b.drop(r);

    let unit = accept(b.finish());
    assert_eq!(unit.value_type(o), Some(&Type::unowned("D")));
    assert_eq!(unit.region_of(o), unit.region_of(r));
    assert_ne!(unit.object_of(o), unit.object_of(r));
}

#[test]
fn test_new_object_checks_fields_like_new_region() {
    let mut b = UnitBuilder::new("object");
    let r = b.new_region("Pair", &[], &[]);
    let n = b.param(Type::primitive("i64"));
    b.new_object(r, "Pair", &["a", "b"], &[n]);

    assert_eq!(
        reject(b.finish()).kind(),
        &ErrorKind::FieldArityMismatch {
            class: "Pair".into(),
            fields: 2,
            values: 1,
        }
    );
}

// ============================================================================
// Structural errors
// ============================================================================

#[test]
fn test_undefined_operand() {
    let mut unit = Unit::new("raw");
    unit.push(OpKind::Drop { value: ValueId(3) });

    assert_eq!(
        reject(unit).kind(),
        &ErrorKind::UndefinedValue { value: ValueId(3) }
    );
}

#[test]
fn test_use_before_definition() {
    let mut unit = Unit::new("raw");
    unit.push(OpKind::Drop { value: ValueId(1) });
    unit.push(OpKind::NewRegion {
        class: "D".into(),
        fields: vec![],
        values: vec![],
        result: ValueId(1),
    });

    let err = reject(unit);
    assert_eq!(err.kind(), &ErrorKind::UndefinedValue { value: ValueId(1) });
    assert_eq!(err.first().op, Some(OpId(0)));
}

#[test]
fn test_result_handle_defined_twice() {
    let mut unit = Unit::new("raw");
    let p = unit.add_param(Type::owned("D"));
    unit.push(OpKind::View {
        input: p,
        result: p,
    });

    assert_eq!(reject(unit).kind(), &ErrorKind::ValueRedefined { value: p });
}
