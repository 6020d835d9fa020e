//! The `paymentConfigMask` bit field.

use serde_json::{Map, Value};

/// Mask with every bit set: all payouts enabled, no compensation.
pub const DEFAULT_PAYMENT_CONFIG_MASK: u64 = 16383;

/// One named bit of the mask. An inverted flag reads `true` when its bit is clear.
#[derive(Debug, Clone, Copy)]
struct Flag {
    name: &'static str,
    bit: u64,
    inverted: bool,
}

const fn flag(name: &'static str, bit: u64) -> Flag {
    Flag {
        name,
        bit,
        inverted: false,
    }
}

const fn inverted(name: &'static str, bit: u64) -> Flag {
    Flag {
        name,
        bit,
        inverted: true,
    }
}

const FLAGS: [Flag; 14] = [
    flag("payForOwnBlocks", 1),
    flag("payForEndorsements", 2),
    flag("payGainedFees", 4),
    flag("payForAccusationGains", 8),
    flag("subtractLostDepositsWhenAccused", 16),
    flag("subtractLostRewardsWhenAccused", 32),
    flag("subtractLostFeesWhenAccused", 64),
    flag("payForRevelation", 128),
    flag("subtractLostRewardsWhenMissRevelation", 256),
    flag("subtractLostFeesWhenMissRevelation", 512),
    inverted("compensateMissedBlocks", 1024),
    flag("payForStolenBlocks", 2048),
    inverted("compensateMissedEndorsements", 4096),
    inverted("compensateLowPriorityEndorsementLoss", 8192),
];

/// Expands a mask into the named flag object.
pub fn expand_mask(mask: u64) -> Map<String, Value> {
    FLAGS
        .iter()
        .map(|f| {
            let set = mask & f.bit != 0;
            (f.name.to_owned(), Value::Bool(set != f.inverted))
        })
        .collect()
}

/// Packs a named flag object into a mask.
///
/// Flags missing from `config` count as `false`, which for the inverted flags means their bit is
/// set. Non-boolean values use JSON truthiness.
pub fn pack_mask(config: &Map<String, Value>) -> u64 {
    FLAGS.iter().fold(0, |mask, f| {
        let enabled = config.get(f.name).is_some_and(truthy);
        if enabled != f.inverted {
            mask | f.bit
        } else {
            mask
        }
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
