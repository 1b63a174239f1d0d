//! Structured logging on top of the `log` facade, with sensitive-field
//! redaction so adapters can log liberally without leaking key material.

use std::fmt;

use log::Level;

/// A structured log line: a message plus `key=value` fields, each redacted
/// according to its key before it ever reaches the `log` facade.
pub struct LogEntry {
    level: Level,
    target: &'static str,
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: Level, target: &'static str, message: impl Into<String>) -> Self {
        Self { level, target, message: message.into(), fields: Vec::new() }
    }

    /// Add a field, auto-redacting it if the key name looks sensitive.
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_if_sensitive(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    pub fn address_field(mut self, key: &'static str, address: &str) -> Self {
        self.fields.push((key, redact_address(address)));
        self
    }

    pub fn emit(self) {
        if self.fields.is_empty() {
            log::log!(target: self.target, self.level, "{}", self.message);
        } else {
            let fields = self.fields.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ");
            log::log!(target: self.target, self.level, "{} | {}", self.message, fields);
        }
    }
}

fn redact_if_sensitive(key: &str, value: &str) -> String {
    let key_lower = key.to_lowercase();

    const SECRET_KEYS: &[&str] =
        &["private_key", "privatekey", "secret", "seed", "mnemonic", "password", "passphrase", "signing_key"];
    if SECRET_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_fully(value);
    }

    const ADDRESS_KEYS: &[&str] = &["address", "recipient", "sender", "from", "to"];
    if ADDRESS_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_address(value);
    }

    const HASH_KEYS: &[&str] = &["txid", "tx_hash", "hash"];
    if HASH_KEYS.iter().any(|k| key_lower.contains(k)) {
        return redact_hash(value);
    }

    value.to_string()
}

fn redact_fully(value: &str) -> String {
    if value.is_empty() {
        return "[EMPTY]".to_string();
    }
    format!("[REDACTED:{}chars]", value.len())
}

fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.len() <= 10 {
        return redact_fully(trimmed);
    }
    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    if trimmed.len() <= prefix_len + 4 + 3 {
        return redact_fully(trimmed);
    }
    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - 4..])
}

fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() <= 20 {
        return trimmed.to_string();
    }
    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - 6..])
}

#[macro_export]
macro_rules! wlog {
    ($level:expr, $target:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new($level, $target, $msg)
            $(.field(stringify!($key), &$value))*
            .emit()
    };
}
