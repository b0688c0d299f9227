//! Pretty printing for units and modules.
//!
//! Human-readable output for debugging and diagnostics. This is not a
//! stable encoding and there is no parser for it.

use std::fmt::Write;

use crate::ir::*;
use regio_types::PendingClass;

/// Pretty print a whole module: classes first, then units.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out);
    for class in &module.classes {
        printer.print_class(class);
        printer.out.push('\n');
    }
    for unit in &module.units {
        printer.print_unit(unit);
        printer.out.push('\n');
    }
    out
}

/// Pretty print a single unit.
pub fn print_unit(unit: &Unit) -> String {
    let mut out = String::new();
    PrettyPrinter::new(&mut out).print_unit(unit);
    out
}

/// Render one operation on a single line, without its `#N:` prefix.
pub fn op_to_string(op: &OpKind) -> String {
    let mut out = String::new();
    PrettyPrinter::new(&mut out).print_op(op);
    out
}

fn join_values(values: &[ValueId]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

struct PrettyPrinter<'a> {
    out: &'a mut String,
    indent: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn new(out: &'a mut String) -> Self {
        Self { out, indent: 0 }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn print_class(&mut self, class: &PendingClass) {
        self.writeln(&format!("class @{} {{", class.name));
        self.indent += 2;
        for field in &class.fields {
            self.writeln(&format!("{}: {}", field.name, field.ty));
        }
        self.indent -= 2;
        self.writeln("}");
    }

    fn print_unit(&mut self, unit: &Unit) {
        let params = unit
            .params
            .iter()
            .map(|p| format!("{}: {}", p.value, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        self.writeln(&format!("unit {}({}) {{", unit.name, params));
        self.indent += 2;
        for (id, op) in unit.iter() {
            self.write_indent();
            let _ = write!(self.out, "{}: ", id);
            self.print_op(&op.kind);
            self.out.push('\n');
        }
        if !unit.returns.is_empty() {
            self.writeln(&format!("return {}", join_values(&unit.returns)));
        }
        self.indent -= 2;
        self.writeln("}");
    }

    fn print_op(&mut self, op: &OpKind) {
        if let Some(result) = op.result() {
            let _ = write!(self.out, "{} = ", result);
        }
        let _ = match op {
            OpKind::Copy { input, .. } => write!(self.out, "copy {}", input),
            OpKind::View { input, .. } => write!(self.out, "view {}", input),
            OpKind::FieldRead {
                origin,
                field,
                output,
                ..
            } => match output {
                Some(ty) => write!(self.out, "field_read {}[\"{}\"] : {}", origin, field, ty),
                None => write!(self.out, "field_read {}[\"{}\"]", origin, field),
            },
            OpKind::FieldWrite {
                origin,
                field,
                value,
                ..
            } => write!(self.out, "field_write {}[\"{}\"], {}", origin, field, value),
            OpKind::Tidy { region } => write!(self.out, "tidy {}", region),
            OpKind::Drop { value } => write!(self.out, "drop {}", value),
            OpKind::NewRegion {
                class,
                fields,
                values,
                ..
            } => write!(
                self.out,
                "new_region @{} [{}] ({})",
                class,
                quote_fields(fields),
                join_values(values)
            ),
            OpKind::NewObject {
                region,
                class,
                fields,
                values,
                ..
            } => write!(
                self.out,
                "new_object {}, @{} [{}] ({})",
                region,
                class,
                quote_fields(fields),
                join_values(values)
            ),
        };
    }
}

fn quote_fields(fields: &[smol_str::SmolStr]) -> String {
    fields
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(", ")
}
