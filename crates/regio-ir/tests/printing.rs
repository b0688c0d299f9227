//! Printing whole modules.

use pretty_assertions::assert_eq;
use regio_ir::{print_module, Module, OpKind, Unit, UnitBuilder, ValueId};
use regio_types::{PendingClass, Type};

fn linked_list() -> Module {
    let mut b = UnitBuilder::new("push");
    let list = b.param(Type::owned("List"));
    let value = b.param(Type::primitive("i64"));
    let head = b.field_read(list, "head");
    let node = b.new_object(list, "Node", &["value", "next"], &[value, head]);
    let previous = b.field_write(list, "head", node);
    b.drop(previous);
    b.returns(&[list]);

    Module::new()
        .with_class(PendingClass::new("List").field("head", Type::unowned("Node")))
        .with_class(
            PendingClass::new("Node")
                .field("value", Type::primitive("i64"))
                .field("next", Type::unowned("Node")),
        )
        .with_unit(b.finish())
}

#[test]
fn test_print_module() {
    insta::assert_snapshot!(print_module(&linked_list()).trim_end(), @r#"
    class @List {
      head: unowned @Node
    }

    class @Node {
      value: i64
      next: unowned @Node
    }

    unit push(%0: owned @List, %1: i64) {
      #0: %2 = field_read %0["head"]
      #1: %3 = new_object %0, @Node ["value", "next"] (%1, %2)
      #2: %4 = field_write %0["head"], %3
      #3: drop %4
      return %0
    }
    "#);
}

#[test]
fn test_module_class_table() {
    let table = linked_list().class_table().unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.class_id("Node").is_ok());
}

#[test]
fn test_raw_units_print_unallocated_handles() {
    let mut unit = Unit::new("raw");
    unit.push(OpKind::Tidy { region: ValueId(5) });
    let printed = regio_ir::print_unit(&unit);
    assert!(printed.contains("#0: tidy %5"));
}
