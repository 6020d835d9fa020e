//! Decoding of Micheline values into plain JSON, guided by the contract's type annotations.
//!
//! Annotated pair trees become objects keyed by field name, numbers become JSON integers, bytes
//! stay as hex strings and maps become objects keyed by their rendered keys. Addresses and key
//! hashes in optimized form are rendered as base58check, e.g. `tz1…` or `KT1…`. Anything the decoder
//! has no rule for is passed through as raw Micheline.

use std::str;

use registry_primitives::RawRecord;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MichelineError {
    #[error("malformed type: {0}")]
    Type(String),

    #[error("expected {expected} value, got {got}")]
    Value { expected: &'static str, got: String },

    #[error("script has no storage section")]
    MissingStorage,

    #[error("storage has no big map")]
    MissingBigMap,

    #[error("big map value is not a record")]
    NotARecord,

    #[error("invalid address bytes {0}")]
    Address(String),
}

fn unexpected(expected: &'static str, got: &Value) -> MichelineError {
    let mut got = got.to_string();
    got.truncate(80);
    MichelineError::Value { expected, got }
}

/// A Michelson type, reduced to what decoding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MichelineType {
    /// `int`, `nat` and `mutez`.
    Int,
    Timestamp,
    Bool,
    Unit,
    /// Every other type whose readable form is a string, e.g. `string`, `key`, `chain_id`.
    Text,
    /// `address` and `contract`.
    Address,
    KeyHash,
    Bytes,
    Option(Box<MichelineType>),
    /// `list` and `set`.
    List(Box<MichelineType>),
    Map(Box<MichelineType>, Box<MichelineType>),
    BigMap(Box<MichelineType>, Box<MichelineType>),
    Pair(Box<Field>, Box<Field>),
    Or(Box<Field>, Box<Field>),
    Other(String),
}

/// A type together with its field annotation, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: MichelineType,
}

impl Field {
    pub fn parse(node: &Value) -> Result<Self, MichelineError> {
        Ok(Self {
            name: field_name(node),
            ty: MichelineType::parse(node)?,
        })
    }

    fn unnamed(ty: MichelineType) -> Self {
        Self { name: None, ty }
    }
}

fn field_name(node: &Value) -> Option<String> {
    node.get("annots")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .find_map(|a| a.strip_prefix('%'))
        .map(str::to_owned)
}

fn prim_args(node: &Value) -> &[Value] {
    node.get("args")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

impl MichelineType {
    pub fn parse(node: &Value) -> Result<Self, MichelineError> {
        let prim = node
            .get("prim")
            .and_then(Value::as_str)
            .ok_or_else(|| MichelineError::Type(node.to_string()))?;
        let args = prim_args(node);

        let arg = |i: usize| -> Result<Box<Self>, MichelineError> {
            let node = args
                .get(i)
                .ok_or_else(|| MichelineError::Type(format!("{prim} is missing argument {i}")))?;
            Ok(Box::new(Self::parse(node)?))
        };

        let ty = match prim {
            "int" | "nat" | "mutez" => Self::Int,
            "timestamp" => Self::Timestamp,
            "bool" => Self::Bool,
            "unit" => Self::Unit,
            "string" | "key" | "signature" | "chain_id" => Self::Text,
            "address" | "contract" => Self::Address,
            "key_hash" => Self::KeyHash,
            "bytes" => Self::Bytes,
            "option" => Self::Option(arg(0)?),
            "list" | "set" => Self::List(arg(0)?),
            "map" => Self::Map(arg(0)?, arg(1)?),
            "big_map" => Self::BigMap(arg(0)?, arg(1)?),
            "pair" => {
                if args.len() < 2 {
                    return Err(MichelineError::Type("pair needs two arguments".into()));
                }
                let fields = args.iter().map(Field::parse).collect::<Result<Vec<_>, _>>()?;
                right_comb(fields)
            }
            "or" => {
                let left = args.first().map(Field::parse).transpose()?;
                let right = args.get(1).map(Field::parse).transpose()?;
                match (left, right) {
                    (Some(l), Some(r)) => Self::Or(Box::new(l), Box::new(r)),
                    _ => return Err(MichelineError::Type("or needs two arguments".into())),
                }
            }
            other => Self::Other(other.to_owned()),
        };
        Ok(ty)
    }

    /// Finds the first big map in the type, depth first.
    pub fn find_big_map(&self) -> Option<(&MichelineType, &MichelineType)> {
        match self {
            Self::BigMap(k, v) => Some((&**k, &**v)),
            Self::Pair(l, r) | Self::Or(l, r) => {
                l.ty.find_big_map().or_else(|| r.ty.find_big_map())
            }
            Self::Option(inner) => inner.find_big_map(),
            _ => None,
        }
    }
}

/// Folds `pair a b c ...` into `pair a (pair b c)`.
fn right_comb(mut fields: Vec<Field>) -> MichelineType {
    let Some(mut acc) = fields.pop() else {
        return MichelineType::Unit;
    };
    while let Some(next) = fields.pop() {
        acc = Field::unnamed(MichelineType::Pair(Box::new(next), Box::new(acc)));
    }
    acc.ty
}

fn split_pair(value: &Value) -> Result<(Value, Value), MichelineError> {
    let args = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) if value.get("prim").and_then(Value::as_str) == Some("Pair") => {
            prim_args(value)
        }
        _ => return Err(unexpected("pair", value)),
    };
    match args {
        [left, right] => Ok((left.clone(), right.clone())),
        [left, rest @ ..] if rest.len() > 1 => {
            Ok((left.clone(), json!({ "prim": "Pair", "args": rest })))
        }
        _ => Err(unexpected("pair", value)),
    }
}

fn collect_leaves(
    left: &Field,
    right: &Field,
    value: &Value,
    out: &mut Vec<(Option<String>, Value)>,
) -> Result<(), MichelineError> {
    let (l, r) = split_pair(value)?;
    for (field, v) in [(left, l), (right, r)] {
        match (&field.name, &field.ty) {
            (None, MichelineType::Pair(a, b)) => collect_leaves(a, b, &v, out)?,
            _ => out.push((field.name.clone(), decode_value(&field.ty, &v)?)),
        }
    }
    Ok(())
}

/// Decodes a value and returns its top-level pair leaves in order, with their field names.
pub fn pair_leaves(
    ty: &MichelineType,
    value: &Value,
) -> Result<Vec<(Option<String>, Value)>, MichelineError> {
    match ty {
        MichelineType::Pair(l, r) => {
            let mut out = Vec::new();
            collect_leaves(l, r, value, &mut out)?;
            Ok(out)
        }
        _ => Ok(vec![(None, decode_value(ty, value)?)]),
    }
}

fn decode_int(value: &Value) -> Result<Value, MichelineError> {
    let text = value
        .get("int")
        .and_then(Value::as_str)
        .ok_or_else(|| unexpected("int", value))?;
    Ok(text
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(text.to_owned())))
}

fn decode_text(value: &Value) -> Result<Value, MichelineError> {
    value
        .get("string")
        .or_else(|| value.get("bytes"))
        .filter(|v| v.is_string())
        .cloned()
        .ok_or_else(|| unexpected("string", value))
}

/// Base58check prefixes of implicit accounts, indexed by curve tag.
const IMPLICIT_PREFIXES: [[u8; 3]; 4] = [
    [6, 161, 159], // tz1
    [6, 161, 161], // tz2
    [6, 161, 164], // tz3
    [6, 161, 166], // tz4
];

const ORIGINATED_PREFIX: [u8; 3] = [2, 90, 121]; // KT1

const HASH_LEN: usize = 20;

fn base58check(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len());
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    bs58::encode(data).with_check().into_string()
}

fn hex_payload(hex_str: &str) -> Result<Vec<u8>, MichelineError> {
    hex::decode(hex_str).map_err(|_| MichelineError::Address(hex_str.to_owned()))
}

/// Encodes a curve tag followed by a public key hash, e.g. `00` + 20 bytes as `tz1…`.
fn encode_key_hash(bytes: &[u8]) -> Option<String> {
    let (tag, hash) = bytes.split_first()?;
    let prefix = IMPLICIT_PREFIXES.get(usize::from(*tag))?;
    (hash.len() == HASH_LEN).then(|| base58check(prefix, hash))
}

/// Encodes an optimized address: an implicit account tagged `00`, or a contract hash tagged `01`
/// followed by a padding byte. Trailing bytes name an entrypoint.
fn encode_address(bytes: &[u8]) -> Option<String> {
    const ADDRESS_LEN: usize = 22;
    if bytes.len() < ADDRESS_LEN {
        return None;
    }
    let (address, entrypoint) = bytes.split_at(ADDRESS_LEN);
    let mut out = match address.split_first()? {
        (0, key_hash) => encode_key_hash(key_hash)?,
        (1, [hash @ .., 0]) => base58check(&ORIGINATED_PREFIX, hash),
        _ => return None,
    };
    if !entrypoint.is_empty() {
        out.push('%');
        out.push_str(str::from_utf8(entrypoint).ok()?);
    }
    Some(out)
}

fn decode_hashed(
    value: &Value,
    encode: fn(&[u8]) -> Option<String>,
) -> Result<Value, MichelineError> {
    if let Some(hex_str) = value.get("bytes").and_then(Value::as_str) {
        let bytes = hex_payload(hex_str)?;
        return encode(&bytes)
            .map(Value::String)
            .ok_or_else(|| MichelineError::Address(hex_str.to_owned()));
    }
    value
        .get("string")
        .filter(|v| v.is_string())
        .cloned()
        .ok_or_else(|| unexpected("address", value))
}

fn map_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn decode_map(k: &MichelineType, v: &MichelineType, value: &Value) -> Result<Value, MichelineError> {
    let items = value.as_array().ok_or_else(|| unexpected("map", value))?;
    let mut out = Map::new();
    for item in items {
        match prim_args(item) {
            [key, val] if item.get("prim").and_then(Value::as_str) == Some("Elt") => {
                out.insert(map_key(decode_value(k, key)?), decode_value(v, val)?);
            }
            _ => return Err(unexpected("Elt", item)),
        }
    }
    Ok(Value::Object(out))
}

/// Decodes a Micheline value of type `ty` into JSON.
pub fn decode_value(ty: &MichelineType, value: &Value) -> Result<Value, MichelineError> {
    let prim = value.get("prim").and_then(Value::as_str);
    match ty {
        MichelineType::Int => decode_int(value),
        MichelineType::Timestamp => {
            if value.get("int").is_some() {
                decode_int(value)
            } else {
                decode_text(value)
            }
        }
        MichelineType::Bool => match prim {
            Some("True") => Ok(Value::Bool(true)),
            Some("False") => Ok(Value::Bool(false)),
            _ => Err(unexpected("bool", value)),
        },
        MichelineType::Unit => Ok(Value::Null),
        MichelineType::Text => decode_text(value),
        MichelineType::Address => decode_hashed(value, encode_address),
        MichelineType::KeyHash => decode_hashed(value, encode_key_hash),
        MichelineType::Bytes => value
            .get("bytes")
            .filter(|v| v.is_string())
            .cloned()
            .ok_or_else(|| unexpected("bytes", value)),
        MichelineType::Option(inner) => match (prim, prim_args(value)) {
            (Some("None"), _) => Ok(Value::Null),
            (Some("Some"), [v]) => decode_value(inner, v),
            _ => Err(unexpected("option", value)),
        },
        MichelineType::List(inner) => value
            .as_array()
            .ok_or_else(|| unexpected("list", value))?
            .iter()
            .map(|v| decode_value(inner, v))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        MichelineType::Map(k, v) => decode_map(k, v, value),
        MichelineType::BigMap(k, v) => {
            if value.get("int").is_some() {
                decode_int(value)
            } else {
                decode_map(k, v, value)
            }
        }
        MichelineType::Pair(_, _) => {
            let leaves = pair_leaves(ty, value)?;
            let object = leaves
                .into_iter()
                .enumerate()
                .map(|(i, (name, v))| (name.unwrap_or_else(|| i.to_string()), v))
                .collect();
            Ok(Value::Object(object))
        }
        MichelineType::Or(l, r) => {
            let (field, default) = match prim {
                Some("Left") => (l, "left"),
                Some("Right") => (r, "right"),
                _ => return Err(unexpected("or", value)),
            };
            match prim_args(value) {
                [inner] => {
                    let name = field.name.clone().unwrap_or_else(|| default.to_owned());
                    let mut out = Map::new();
                    out.insert(name, decode_value(&field.ty, inner)?);
                    Ok(Value::Object(out))
                }
                _ => Err(unexpected("or", value)),
            }
        }
        MichelineType::Other(_) => Ok(value.clone()),
    }
}

/// The parts of the registry contract's type that decoding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySchema {
    storage: MichelineType,
    key: MichelineType,
    value: MichelineType,
}

impl RegistrySchema {
    /// Builds the schema from a storage type. The first big map found is taken as the registry.
    pub fn from_storage_type(storage: MichelineType) -> Result<Self, MichelineError> {
        let (key, value) = storage
            .find_big_map()
            .map(|(k, v)| (k.clone(), v.clone()))
            .ok_or(MichelineError::MissingBigMap)?;
        Ok(Self {
            storage,
            key,
            value,
        })
    }

    /// Builds the schema from a contract script as returned by the node.
    pub fn from_script(script: &Value) -> Result<Self, MichelineError> {
        let storage = script
            .get("code")
            .and_then(Value::as_array)
            .and_then(|code| {
                code.iter()
                    .find(|section| section.get("prim").and_then(Value::as_str) == Some("storage"))
            })
            .and_then(|section| prim_args(section).first())
            .ok_or(MichelineError::MissingStorage)?;
        Self::from_storage_type(MichelineType::parse(storage)?)
    }

    pub fn key_type(&self) -> &MichelineType {
        &self.key
    }

    pub fn value_type(&self) -> &MichelineType {
        &self.value
    }

    /// Renders a big map key as a string, e.g. a baker address.
    pub fn decode_key(&self, key: &Value) -> Result<String, MichelineError> {
        Ok(map_key(decode_value(&self.key, key)?))
    }

    /// Decodes a big map value into a record.
    pub fn decode_record(&self, value: &Value) -> Result<RawRecord, MichelineError> {
        match decode_value(&self.value, value)? {
            Value::Object(record) => Ok(record),
            _ => Err(MichelineError::NotARecord),
        }
    }

    /// Decodes a full storage value into its top-level slots.
    pub fn storage_slots(&self, storage: &Value) -> Result<Vec<Value>, MichelineError> {
        Ok(pair_leaves(&self.storage, storage)?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }
}
