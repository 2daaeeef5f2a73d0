//! Tests for the binary flow file reader.

use flowc_ir::from_bytes::{MAGIC, VERSION};
use flowc_ir::{parse_bytes, Id, Shape, Type};

/// Little-endian writer producing the on-disk layout.
#[derive(Default)]
struct FlowFile {
    buf: Vec<u8>,
}

impl FlowFile {
    fn new() -> Self {
        let mut w = FlowFile::default();
        w.int(MAGIC);
        w.int(VERSION);
        w
    }

    fn int(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn long(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn string(&mut self, s: &str) {
        self.int(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }
}

#[test]
fn load_substitutes_batch_size() {
    let mut w = FlowFile::new();
    w.int(1); // variables
    w.string("x");
    w.int(0); // aliases
    w.string("float32");
    w.int(1); // rank
    w.int(-1);
    w.long(0); // no constant data
    w.int(0); // operations
    w.int(0); // functions
    w.int(0); // connectors

    let flow = parse_bytes(&w.buf, 8).unwrap();
    assert_eq!(flow.vars.len(), 1);
    let x = flow.var("x").unwrap();
    assert_eq!(x.borrow().dtype, Type::Float32);
    assert_eq!(x.borrow().shape, Shape::new(&[8]));
    assert!(!x.borrow().is_ref);
    assert!(x.borrow().data.is_none());
}

#[test]
fn load_full_flow() {
    let payload: Vec<u8> = 1.5f32
        .to_le_bytes()
        .iter()
        .chain(2.5f32.to_le_bytes().iter())
        .copied()
        .collect();

    let mut w = FlowFile::new();
    w.int(3); // variables

    w.string("x");
    w.int(1); // one alias
    w.string("x:0");
    w.string("float32");
    w.int(2);
    w.int(1);
    w.int(2);
    w.long(0);

    w.string("weights");
    w.int(0);
    w.string("float32");
    w.int(1);
    w.int(2);
    w.long(payload.len() as u64);
    w.bytes(&payload);

    w.string("state");
    w.int(0);
    w.string("&float32");
    w.int(1);
    w.int(2);
    w.long(0);

    w.int(1); // operations
    w.string("scale");
    w.string("Mul");
    w.int(2);
    w.string("x");
    w.string("weights");
    w.int(1);
    w.string("state");
    w.int(2); // attributes
    w.string("task");
    w.string("7");
    w.string("note");
    w.string("elementwise");

    w.int(1); // functions
    w.string("main");
    w.int(1);
    w.string("scale");

    w.int(1); // connectors
    w.string("loop");
    w.int(1);
    w.string("state");

    let flow = parse_bytes(&w.buf, 1).unwrap();

    let x = flow.var("x").unwrap();
    assert_eq!(x.borrow().aliases, vec![Id::from("x:0")]);
    assert_eq!(x.borrow().shape, Shape::new(&[1, 2]));

    let weights = flow.var("weights").unwrap();
    assert_eq!(weights.borrow().byte_size(), 8);
    assert_eq!(
        weights.borrow().data.as_deref(),
        Some(payload.as_slice())
    );

    let state = flow.var("state").unwrap();
    assert!(state.borrow().is_ref);
    assert_eq!(state.borrow().dtype, Type::Float32);

    let op = flow.op("scale").unwrap();
    assert_eq!(op.borrow().kind, "Mul");
    assert_eq!(op.borrow().task, 7);
    assert_eq!(op.borrow().attributes.get("note"), Some("elementwise"));
    assert_eq!(op.borrow().inputs.len(), 2);
    // The op name becomes an alias of its output.
    assert!(std::rc::Rc::ptr_eq(&flow.var("scale").unwrap(), &state));

    let func = flow.func("main").unwrap();
    assert_eq!(func.borrow().ops.len(), 1);

    let cnx = flow.connectors.find("loop").unwrap();
    assert_eq!(cnx.borrow().links.len(), 1);

    assert!(flow.is_consistent());
}

#[test]
fn rejects_bad_magic() {
    let mut w = FlowFile::default();
    w.int(0x12345678);
    w.int(VERSION);
    w.int(0);
    assert!(parse_bytes(&w.buf, 1).is_err());
}

#[test]
fn rejects_unsupported_version() {
    let mut w = FlowFile::default();
    w.int(MAGIC);
    w.int(2);
    w.int(0);
    assert!(parse_bytes(&w.buf, 1).is_err());
}

#[test]
fn rejects_truncated_input() {
    let w = FlowFile::new();
    let mut truncated = w.buf.clone();
    truncated.truncate(6);
    assert!(parse_bytes(&truncated, 1).is_err());

    // Declared variable missing from the buffer.
    let mut w = FlowFile::new();
    w.int(1);
    assert!(parse_bytes(&w.buf, 1).is_err());
}

#[test]
fn rejects_unknown_type() {
    let mut w = FlowFile::new();
    w.int(1);
    w.string("x");
    w.int(0);
    w.string("float99");
    w.int(0);
    w.long(0);
    w.int(0);
    w.int(0);
    w.int(0);
    assert!(parse_bytes(&w.buf, 1).is_err());
}

#[test]
fn rejects_dangling_references() {
    let mut w = FlowFile::new();
    w.int(0); // no variables
    w.int(1); // one operation
    w.string("op");
    w.string("Add");
    w.int(1);
    w.string("missing");
    w.int(0);
    w.int(0);
    w.int(0);
    w.int(0);
    assert!(parse_bytes(&w.buf, 1).is_err());
}

#[test]
fn empty_type_string_stays_invalid() {
    let mut w = FlowFile::new();
    w.int(1);
    w.string("y");
    w.int(0);
    w.string("");
    w.int(0);
    w.long(0);
    w.int(0);
    w.int(0);
    w.int(0);

    let flow = parse_bytes(&w.buf, 1).unwrap();
    let y = flow.var("y").unwrap();
    assert_eq!(y.borrow().dtype, Type::Invalid);
}
