//! Builds a [`Flow`] from the binary flow file format.
//!
//! The format is little-endian throughout: `i32` and `u64` are fixed
//! width, strings are an `i32` length followed by the bytes with no
//! terminator. Variables come first, then operations (referencing
//! variables by name), then functions and connectors.

use crate::{Flow, Function, Operation, Shape, Type};
use flowc_utils::{Error, FlowResult, Id};
use std::path::Path;
use std::rc::Rc;

/// Spells "flow" in little-endian ASCII.
pub const MAGIC: i32 = 0x776f_6c66;
pub const VERSION: i32 = 3;

/// Cursor over the raw input buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> FlowResult<&'a [u8]> {
        if len > self.buf.len() - self.pos {
            return Err(Error::invalid_file("unexpected end of input"));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn int(&mut self) -> FlowResult<i32> {
        Ok(i32::from_le_bytes(self.bytes(4)?.try_into().unwrap()))
    }

    fn long(&mut self) -> FlowResult<u64> {
        Ok(u64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    /// A count or length field; negative values are malformed.
    fn count(&mut self) -> FlowResult<usize> {
        let n = self.int()?;
        usize::try_from(n).map_err(|_| {
            Error::invalid_file(format!("negative count: {}", n))
        })
    }

    fn string(&mut self) -> FlowResult<String> {
        let len = self.count()?;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::invalid_file("string is not valid UTF-8"))
    }
}

/// Read a flow file from disk. Dimensions recorded as `-1` are replaced
/// with `batch_size`.
pub fn load_file<P: AsRef<Path>>(
    path: P,
    batch_size: i32,
) -> FlowResult<Flow> {
    let data = std::fs::read(path.as_ref()).map_err(|e| {
        Error::invalid_file(format!(
            "cannot read {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    parse_bytes(&data, batch_size)
}

/// Parse an in-memory flow file.
pub fn parse_bytes(data: &[u8], batch_size: i32) -> FlowResult<Flow> {
    let mut r = Reader::new(data);

    let magic = r.int()?;
    if magic != MAGIC {
        return Err(Error::invalid_file("not a flow file"));
    }
    let version = r.int()?;
    if version != VERSION {
        return Err(Error::invalid_file(format!(
            "unsupported flow file version: {}",
            version
        )));
    }

    let mut flow = Flow::new();
    flow.batch_size = batch_size;

    // Variables.
    let num_vars = r.count()?;
    for _ in 0..num_vars {
        let name = r.string()?;

        let num_aliases = r.count()?;
        let mut aliases = Vec::with_capacity(num_aliases);
        for _ in 0..num_aliases {
            aliases.push(r.string()?);
        }

        let mut type_str = r.string()?;
        let mut is_ref = false;
        let dtype = if type_str.is_empty() {
            Type::Invalid
        } else {
            if let Some(stripped) = type_str.strip_prefix('&') {
                is_ref = true;
                type_str = stripped.to_string();
            }
            let t = Type::from_name(&type_str);
            if !t.valid() {
                return Err(Error::invalid_file(format!(
                    "unknown type: {}",
                    type_str
                )));
            }
            t
        };

        let rank = r.count()?;
        let mut shape = Shape::scalar();
        for _ in 0..rank {
            let size = r.int()?;
            shape.add_dim(if size == -1 { flow.batch_size } else { size });
        }

        let var = flow.add_variable(name, dtype, shape);
        let mut v = var.borrow_mut();
        v.is_ref = is_ref;
        for alias in aliases {
            v.add_alias(Id::new(alias));
        }
        let size = r.long()?;
        if size != 0 {
            v.data = Some(Rc::from(r.bytes(size as usize)?));
        }
    }

    // Operations, resolving input and output references by name.
    let num_ops = r.count()?;
    for _ in 0..num_ops {
        let name = r.string()?;
        let kind = r.string()?;
        let op = flow.add_operation(name.as_str(), kind.as_str());

        let num_inputs = r.count()?;
        for _ in 0..num_inputs {
            let input = r.string()?;
            let var = flow.var(input.as_str()).ok_or_else(|| {
                Error::undefined(format!(
                    "unknown input to {}: {}",
                    name, input
                ))
            })?;
            Operation::add_input(&op, &var);
        }

        let num_outputs = r.count()?;
        for _ in 0..num_outputs {
            let output = r.string()?;
            let var = flow.var(output.as_str()).ok_or_else(|| {
                Error::undefined(format!(
                    "unknown {} output: {}",
                    name, output
                ))
            })?;
            Operation::add_output(&op, &var);
            // The operation name doubles as a lookup key for its output.
            var.borrow_mut().add_alias(Id::new(name.as_str()));
        }

        let num_attrs = r.count()?;
        for _ in 0..num_attrs {
            let attr_name = r.string()?;
            let value = r.string()?;
            op.borrow_mut().attributes.set(&attr_name, value);
        }
        let task = op.borrow().attributes.get_int("task", 0);
        op.borrow_mut().task = task;
    }

    // Functions.
    let num_funcs = r.count()?;
    for _ in 0..num_funcs {
        let name = r.string()?;
        let func = flow.add_function(name.as_str());
        let num_ops = r.count()?;
        for _ in 0..num_ops {
            let op_name = r.string()?;
            let op = flow.op(op_name.as_str()).ok_or_else(|| {
                Error::undefined(format!("unknown op: {}", op_name))
            })?;
            Function::add_operation(&func, &op);
        }
    }

    // Connectors.
    let num_cnxs = r.count()?;
    for _ in 0..num_cnxs {
        let name = r.string()?;
        let cnx = flow.add_connector(name.as_str());
        let num_links = r.count()?;
        for _ in 0..num_links {
            let var_name = r.string()?;
            let var = flow.var(var_name.as_str()).ok_or_else(|| {
                Error::undefined(format!(
                    "unknown variable: {}",
                    var_name
                ))
            })?;
            cnx.borrow_mut().add_link(&var);
        }
    }

    Ok(flow)
}
