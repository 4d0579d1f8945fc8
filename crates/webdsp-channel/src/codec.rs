//! Envelope codec.
//!
//! An envelope is `[function, ...args]`. In text mode it travels as a JSON
//! array with the function name first. In binary mode it travels as a BSON
//! document keyed `"0"`, `"1"`, ... whose element `"0"` is the djb2 hash of the
//! function name as a signed 32-bit integer.
//!
//! Blobs have no JSON form: text mode sends them base64-encoded and they
//! decode back as strings.

use crate::error::{ChannelError, Result};
use crate::hash::FunctionKey;
use crate::value::Value;
use bson::{Bson, Document};
use serde_json::Value as Json;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Text,
    Binary,
}

impl Protocol {
    /// Wire mode implied by a received frame.
    pub fn probe(frame: &Frame) -> Self {
        match frame {
            Frame::Text(_) => Protocol::Text,
            Frame::Binary(_) => Protocol::Binary,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Text => write!(f, "text"),
            Protocol::Binary => write!(f, "binary"),
        }
    }
}

/// One transport-level message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Target of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionId {
    Name(String),
    Hash(FunctionKey),
}

impl FunctionId {
    pub fn key(&self) -> FunctionKey {
        match self {
            FunctionId::Name(name) => FunctionKey::of(name),
            FunctionId::Hash(key) => *key,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FunctionId::Name(name) => Some(name),
            FunctionId::Hash(_) => None,
        }
    }

    /// Same function, regardless of how it is identified.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FunctionId::Name(own) => own == name,
            FunctionId::Hash(key) => *key == FunctionKey::of(name),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionId::Name(name) => write!(f, "{}", name),
            FunctionId::Hash(key) => write!(f, "{}", key),
        }
    }
}

impl From<&str> for FunctionId {
    fn from(name: &str) -> Self {
        FunctionId::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub function: FunctionId,
    pub args: Vec<Value>,
}

impl Envelope {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: FunctionId::Name(function.into()),
            args,
        }
    }

    /// Split a raw `[function, ...args]` list. The function must be a name
    /// or a numeric hash.
    pub fn from_values(mut values: Vec<Value>) -> Result<Self> {
        if values.is_empty() {
            return Err(ChannelError::Protocol("empty envelope".to_string()));
        }
        let args = values.split_off(1);
        let function = match values.pop() {
            Some(Value::String(name)) => FunctionId::Name(name),
            Some(Value::Number(n)) if n.fract() == 0.0 => {
                FunctionId::Hash(FunctionKey(n as i64 as u32))
            }
            other => {
                return Err(ChannelError::Protocol(format!(
                    "invalid function identifier {:?}",
                    other
                )))
            }
        };
        Ok(Self { function, args })
    }

    /// `[function, ...args]`, with hashes as their wire integer.
    pub fn into_values(self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.args.len() + 1);
        values.push(match self.function {
            FunctionId::Name(name) => Value::String(name),
            FunctionId::Hash(key) => Value::from(key.to_wire()),
        });
        values.extend(self.args);
        values
    }
}

pub fn encode(envelope: &Envelope, protocol: Protocol) -> Result<Frame> {
    match protocol {
        Protocol::Text => encode_text(envelope),
        Protocol::Binary => encode_binary(envelope),
    }
}

pub fn decode(frame: &Frame) -> Result<Envelope> {
    match frame {
        Frame::Text(text) => decode_text(text),
        Frame::Binary(bytes) => decode_binary(bytes),
    }
}

fn encode_text(envelope: &Envelope) -> Result<Frame> {
    let mut array = Vec::with_capacity(envelope.args.len() + 1);
    array.push(match &envelope.function {
        FunctionId::Name(name) => Json::String(name.clone()),
        FunctionId::Hash(key) => Json::from(key.to_wire()),
    });
    array.extend(envelope.args.iter().map(Value::to_json));
    Ok(Frame::Text(serde_json::to_string(&Json::Array(array))?))
}

fn decode_text(text: &str) -> Result<Envelope> {
    match serde_json::from_str::<Json>(text)? {
        Json::Array(items) => Envelope::from_values(items.into_iter().map(Value::from_json).collect()),
        other => Err(ChannelError::Protocol(format!(
            "expected JSON array, got {}",
            other
        ))),
    }
}

fn encode_binary(envelope: &Envelope) -> Result<Frame> {
    let mut doc = Document::new();
    doc.insert("0", Bson::Int32(envelope.function.key().to_wire()));
    for (i, arg) in envelope.args.iter().enumerate() {
        doc.insert((i + 1).to_string(), arg.to_bson());
    }

    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes)?;
    Ok(Frame::Binary(bytes))
}

fn decode_binary(bytes: &[u8]) -> Result<Envelope> {
    let doc = Document::from_reader(&mut &bytes[..])?;

    let mut elements = Vec::with_capacity(doc.len());
    for (key, bson) in doc {
        let position: usize = key
            .parse()
            .map_err(|_| ChannelError::Protocol(format!("non-positional key {:?}", key)))?;
        elements.push((position, bson));
    }
    elements.sort_by_key(|(position, _)| *position);

    let mut values = Vec::with_capacity(elements.len());
    for (expected, (position, bson)) in elements.into_iter().enumerate() {
        if position != expected {
            return Err(ChannelError::Protocol(format!(
                "missing element at position {}",
                expected
            )));
        }
        let kind = bson.element_type();
        let value = Value::from_bson(bson).ok_or_else(|| {
            ChannelError::Protocol(format!(
                "unsupported element type {:?} at position {}",
                kind, position
            ))
        })?;
        values.push(value);
    }

    Envelope::from_values(values)
}
