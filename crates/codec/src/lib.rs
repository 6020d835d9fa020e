//! Conversion between registry records as stored on chain and their human-readable form.
//!
//! On chain, text is hex-encoded bytes, the fee is stored as the share paid out to delegators
//! (`split`, scaled by 10000), amounts are scaled by 10000, and the payout policy is a bit mask.
//! The display form has plain text, a `fee` fraction, decimal amounts and a `paymentConfig`
//! object of named flags. Fields the codec does not know about pass through untouched.

mod errors;
pub mod fixed_point;
pub mod payment_config;

pub use errors::CodecError;
use fixed_point::{display_amount, format_scaled, int_value, raw_int, SCALE};
use payment_config::{expand_mask, pack_mask, DEFAULT_PAYMENT_CONFIG_MASK};
use registry_primitives::RawRecord;
use serde_json::{json, Map, Value};

/// A record in its human-readable form.
pub type DisplayRecord = Map<String, Value>;

pub const BAKER_NAME: &str = "bakerName";
const OFFCHAIN_URL: &str = "bakerOffchainRegistryUrl";
const SPLIT: &str = "split";
const FEE: &str = "fee";
const MIN_DELEGATION: &str = "minDelegation";
const MIN_PAYOUT: &str = "minPayout";
const PAYMENT_CONFIG_MASK: &str = "paymentConfigMask";
const PAYMENT_CONFIG: &str = "paymentConfig";

const TEXT_FIELDS: [&str; 2] = [BAKER_NAME, OFFCHAIN_URL];
const AMOUNT_FIELDS: [&str; 2] = [MIN_DELEGATION, MIN_PAYOUT];

/// Decodes hex-encoded utf-8 text. An empty string decodes to an empty string.
pub fn decode_hex_text(field: &str, hex_text: &str) -> Result<String, CodecError> {
    let bytes = hex::decode(hex_text).map_err(|source| CodecError::InvalidHex {
        field: field.to_owned(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8(field.to_owned()))
}

/// Returns the decoded `bakerName` of a raw record, if it has a readable one.
pub fn display_name(raw: &RawRecord) -> Option<String> {
    let name = raw.get(BAKER_NAME)?.as_str()?;
    decode_hex_text(BAKER_NAME, name)
        .ok()
        .filter(|n| !n.is_empty())
}

/// Converts a stored record to its display form.
pub fn decode(raw: &RawRecord) -> Result<DisplayRecord, CodecError> {
    let mut out = DisplayRecord::new();

    for (key, value) in raw {
        let key = key.as_str();
        match key {
            k if TEXT_FIELDS.contains(&k) => {
                let text = value.as_str().ok_or_else(|| CodecError::InvalidField {
                    field: k.to_owned(),
                    expected: "hex string",
                })?;
                out.insert(k.to_owned(), Value::String(decode_hex_text(k, text)?));
            }
            SPLIT => {
                let split = raw_int(SPLIT, value)?;
                out.insert(FEE.to_owned(), Value::String(format_scaled(SCALE - split)));
            }
            k if AMOUNT_FIELDS.contains(&k) => {
                let amount = raw_int(k, value)?;
                out.insert(k.to_owned(), Value::String(format_scaled(amount)));
            }
            PAYMENT_CONFIG_MASK => {
                let mask = raw_int(PAYMENT_CONFIG_MASK, value)?;
                let mask = u64::try_from(mask).map_err(|_| CodecError::InvalidField {
                    field: PAYMENT_CONFIG_MASK.to_owned(),
                    expected: "non-negative integer",
                })?;
                out.insert(PAYMENT_CONFIG.to_owned(), Value::Object(expand_mask(mask)));
            }
            _ => {
                out.insert(key.to_owned(), value.clone());
            }
        }
    }

    Ok(out)
}

fn default_raw() -> RawRecord {
    [
        (BAKER_NAME, json!("")),
        ("openForDelegation", json!(true)),
        (OFFCHAIN_URL, json!("")),
        (SPLIT, int_value(SCALE)),
        ("bakerPaysFromAccounts", json!([])),
        (MIN_DELEGATION, json!(0)),
        ("subtractPayoutsLessThanMin", json!(true)),
        ("payoutDelay", json!(0)),
        ("payoutFrequency", json!(1)),
        (MIN_PAYOUT, json!(0)),
        ("bakerChargesTransactionFee", json!(false)),
        (PAYMENT_CONFIG_MASK, json!(DEFAULT_PAYMENT_CONFIG_MASK)),
        ("overDelegationThreshold", json!(100)),
        ("subtractRewardsFromUninvitedDelegation", json!(true)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

/// Converts a display record to its stored form, filling every missing field with its default.
///
/// An explicit `split` takes precedence over `fee`, and an explicit `paymentConfigMask` over
/// `paymentConfig`.
pub fn encode(display: &DisplayRecord) -> Result<RawRecord, CodecError> {
    let mut out = default_raw();

    for (key, value) in display {
        let key = key.as_str();
        match key {
            k if TEXT_FIELDS.contains(&k) => {
                let text = value.as_str().ok_or_else(|| CodecError::InvalidField {
                    field: k.to_owned(),
                    expected: "string",
                })?;
                out.insert(k.to_owned(), Value::String(hex::encode(text)));
            }
            FEE if !display.contains_key(SPLIT) => {
                let fee = display_amount(FEE, value)?;
                out.insert(SPLIT.to_owned(), int_value(SCALE - fee));
            }
            FEE => {}
            SPLIT => {
                out.insert(SPLIT.to_owned(), int_value(raw_int(SPLIT, value)?));
            }
            k if AMOUNT_FIELDS.contains(&k) => {
                out.insert(k.to_owned(), int_value(display_amount(k, value)?));
            }
            PAYMENT_CONFIG if !display.contains_key(PAYMENT_CONFIG_MASK) => {
                let flags = value.as_object().ok_or_else(|| CodecError::InvalidField {
                    field: PAYMENT_CONFIG.to_owned(),
                    expected: "object",
                })?;
                out.insert(PAYMENT_CONFIG_MASK.to_owned(), Value::from(pack_mask(flags)));
            }
            PAYMENT_CONFIG => {}
            PAYMENT_CONFIG_MASK => {
                let mask = raw_int(PAYMENT_CONFIG_MASK, value)?;
                out.insert(PAYMENT_CONFIG_MASK.to_owned(), int_value(mask));
            }
            _ => {
                out.insert(key.to_owned(), value.clone());
            }
        }
    }

    Ok(out)
}

/// The default record in display form, used as a starting point for new registrations.
pub fn template() -> DisplayRecord {
    // Defaults are all well-formed.
    decode(&default_raw()).unwrap_or_default()
}
