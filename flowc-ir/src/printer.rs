//! Renders a flow as a stable, human-readable text report.

use crate::Flow;
use std::io;

/// How long an attribute value may get before it is elided from dumps.
const MAX_ATTR_DISPLAY: usize = 128;

/// Printer for flow graphs.
pub struct Printer;

impl Printer {
    /// Write the full report: a block per variable, operation, function,
    /// and connector.
    pub fn write_flow<W: io::Write>(flow: &Flow, f: &mut W) -> io::Result<()> {
        for var in flow.vars.iter() {
            let v = var.borrow();
            write!(f, "var {} : {}", v.name, v.type_string())?;
            if v.is_input {
                write!(f, " in")?;
            }
            if v.is_output {
                write!(f, " out")?;
            }
            if v.data.is_some() {
                write!(f, ", {} bytes", v.byte_size())?;
            }
            writeln!(f, " {{")?;
            if let Some(p) = &v.producer {
                writeln!(f, "  from {}", p.upgrade().borrow().name)?;
            }
            for c in &v.consumers {
                writeln!(f, "  to {}", c.upgrade().borrow().name)?;
            }
            for alias in &v.aliases {
                if *alias != v.name {
                    writeln!(f, "  aka {}", alias)?;
                }
            }
            writeln!(f, "}}\n")?;
        }

        for op in flow.ops.iter() {
            let o = op.borrow();
            writeln!(f, "op {} : {} {{", o.name, o.kind)?;
            if o.task != 0 {
                writeln!(f, "  task {}", o.task)?;
            }
            for input in &o.inputs {
                let v = input.borrow();
                writeln!(f, "  input {} : {}", v.name, v.type_string())?;
            }
            for output in &o.outputs {
                let v = output.borrow();
                writeln!(f, "  output {} : {}", v.name, v.type_string())?;
            }
            for attr in &o.attributes {
                if attr.value.len() > MAX_ATTR_DISPLAY {
                    writeln!(
                        f,
                        "  {} = <<{} bytes>>",
                        attr.name,
                        attr.value.len()
                    )?;
                } else {
                    writeln!(f, "  {} = {}", attr.name, attr.value)?;
                }
            }
            writeln!(f, "}}\n")?;
        }

        for func in flow.funcs.iter() {
            let func = func.borrow();
            writeln!(f, "func {} {{", func.name)?;
            for op in &func.ops {
                let o = op.borrow();
                writeln!(f, "  {} : {}", o.name, o.kind)?;
            }
            writeln!(f, "}}\n")?;
        }

        for cnx in flow.connectors.iter() {
            let cnx = cnx.borrow();
            writeln!(f, "connector {} {{", cnx.name)?;
            for link in &cnx.links {
                let v = link.borrow();
                writeln!(f, "  {} : {}", v.name, v.type_string())?;
            }
            writeln!(f, "}}\n")?;
        }

        Ok(())
    }

    /// The report as a string.
    pub fn flow_string(flow: &Flow) -> String {
        let mut buf = Vec::new();
        Self::write_flow(flow, &mut buf)
            .expect("writing to an in-memory buffer cannot fail");
        String::from_utf8(buf).expect("report is valid UTF-8")
    }
}
