//! Validation failures and the set that collects them.
//!
//! A failure is identified by its message alone: raising the same message
//! twice, from any origin, records it once. The first origin raised is the
//! one kept.
//!
//! Failure ids are derived from the message as well:
//! `failureId = "vf1_" || base32hex_lower(SHA256(message))`.

use crate::feature::FeatureId;
use metamodel_introspect::TypeRef;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

/// A detected inconsistency in a built model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    origin: Option<FeatureId>,
    message: String,
}

impl ValidationFailure {
    pub fn new(origin: Option<FeatureId>, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
        }
    }

    pub fn origin(&self) -> Option<&FeatureId> {
        self.origin.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Content-addressed id, derived from the message only.
    pub fn failure_id(&self) -> String {
        let hash = Sha256::digest(self.message.as_bytes());
        format!("vf1_{}", base32hex_lower_no_pad(&hash))
    }

    fn sort_key(&self) -> (Option<&str>, Option<&str>, &str) {
        (
            self.origin.as_ref().map(FeatureId::logical_type),
            self.origin.as_ref().and_then(FeatureId::member_name),
            &self.message,
        )
    }
}

impl PartialEq for ValidationFailure {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for ValidationFailure {}

impl Hash for ValidationFailure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.message.hash(state);
    }
}

impl PartialOrd for ValidationFailure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Origin type, then origin member, then message; a missing origin sorts
/// first. Equal messages are equal regardless of origin.
impl Ord for ValidationFailure {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.message == other.message {
            return Ordering::Equal;
        }
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// RFC 4648 base32hex encoding, lowercase, without padding.
fn base32hex_lower_no_pad(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";

    let mut result = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut bits: u64 = 0;
    let mut num_bits: u32 = 0;

    for &byte in data {
        bits = (bits << 8) | u64::from(byte);
        num_bits += 8;
        while num_bits >= 5 {
            num_bits -= 5;
            result.push(ALPHABET[((bits >> num_bits) & 0x1f) as usize] as char);
        }
    }
    if num_bits > 0 {
        result.push(ALPHABET[((bits << (5 - num_bits)) & 0x1f) as usize] as char);
    }
    result
}

/// Deduplicating, thread-safe accumulator of failures.
///
/// Insertion may happen from any thread; reads are meant for after the
/// pass has completed.
#[derive(Debug, Default)]
pub struct ValidationFailures {
    failures: Mutex<HashMap<String, ValidationFailure>>,
}

impl ValidationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Returns whether the message was new.
    pub fn raise(&self, origin: Option<&FeatureId>, message: impl Into<String>) -> bool {
        let failure = ValidationFailure::new(origin.cloned(), message);
        self.insert(failure)
    }

    /// Record a failure with a message built from `format_args!`.
    pub fn raise_formatted(&self, origin: Option<&FeatureId>, args: fmt::Arguments<'_>) -> bool {
        self.raise(origin, fmt::format(args))
    }

    /// Two members of one type expose the same identifier. Both members are
    /// named in the message, in sorted order.
    pub fn raise_member_id_clash(
        &self,
        origin: &FeatureId,
        member_id: &str,
        first: &str,
        second: &str,
    ) -> bool {
        let (first, second) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        self.raise_formatted(
            Some(origin),
            format_args!(
                "{}: member id '{member_id}' is shared by {first} and {second}",
                origin.logical_type()
            ),
        )
    }

    /// A member's element type is not usable for its feature kind.
    pub fn raise_invalid_element_type(
        &self,
        origin: &FeatureId,
        element_type: &TypeRef,
        reason: &str,
    ) -> bool {
        self.raise_formatted(
            Some(origin),
            format_args!(
                "{origin}: invalid element type {element_type} for {}: {reason}",
                origin.kind()
            ),
        )
    }

    pub(crate) fn insert(&self, failure: ValidationFailure) -> bool {
        let mut failures = self.failures.lock();
        if failures.contains_key(&failure.message) {
            return false;
        }
        failures.insert(failure.message.clone(), failure);
        true
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Failures in their stable order.
    pub fn sorted(&self) -> Vec<ValidationFailure> {
        let mut failures: Vec<ValidationFailure> =
            self.failures.lock().values().cloned().collect();
        failures.sort();
        failures
    }

    /// The raw set.
    pub fn into_set(self) -> HashSet<ValidationFailure> {
        self.failures.into_inner().into_values().collect()
    }

    /// Messages in stable order.
    pub fn messages(&self) -> Vec<String> {
        self.sorted()
            .into_iter()
            .map(|failure| failure.message)
            .collect()
    }

    /// One `"{n}: {message}\n"` line per failure, numbered from 1.
    pub fn numbered(&self) -> String {
        let mut block = String::new();
        for (index, message) in self.messages().iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = writeln!(block, "{}: {message}", index + 1);
        }
        block
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport::from_failures(self.sorted())
    }
}

/// Serializable summary of a validation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// "accepted" or "rejected".
    pub result: String,
    pub failures: Vec<FailureRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub failure_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub message: String,
}

impl ValidationReport {
    fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        let result = if failures.is_empty() {
            "accepted"
        } else {
            "rejected"
        };
        Self {
            result: result.to_string(),
            failures: failures
                .iter()
                .map(|failure| FailureRecord {
                    failure_id: failure.failure_id(),
                    origin: failure.origin().map(ToString::to_string),
                    message: failure.message.clone(),
                })
                .collect(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.result == "accepted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureKind;
    use std::thread;

    fn property(type_name: &str, member: &str) -> FeatureId {
        FeatureId::member(type_name, member, FeatureKind::Property).unwrap()
    }

    #[test]
    fn same_message_from_two_origins_is_one_failure() {
        let failures = ValidationFailures::new();
        assert!(failures.raise(Some(&property("Customer", "name")), "duplicate"));
        assert!(!failures.raise(Some(&property("Order", "total")), "duplicate"));
        assert!(!failures.raise(None, "duplicate"));
        assert_eq!(failures.len(), 1);

        let kept = failures.sorted();
        assert_eq!(kept[0].origin().map(ToString::to_string).as_deref(), Some("Customer#name"));
    }

    #[test]
    fn numbering_is_consecutive_after_duplicates() {
        let failures = ValidationFailures::new();
        failures.raise(Some(&property("Order", "total")), "b");
        failures.raise(Some(&property("Customer", "name")), "a");
        failures.raise(Some(&property("Order", "total")), "b");
        failures.raise(None, "c");
        assert_eq!(failures.numbered(), "1: c\n2: a\n3: b\n");
    }

    #[test]
    fn ordering_is_type_member_message_with_missing_origin_first() {
        let failures = ValidationFailures::new();
        failures.raise(Some(&property("Customer", "name")), "z");
        failures.raise(Some(&FeatureId::object("Customer").unwrap()), "y");
        failures.raise(Some(&property("Customer", "age")), "x");
        failures.raise(None, "w");
        assert_eq!(failures.messages(), vec!["w", "y", "x", "z"]);
    }

    #[test]
    fn equal_messages_compare_equal_regardless_of_origin() {
        let a = ValidationFailure::new(Some(property("A", "x")), "same");
        let b = ValidationFailure::new(None, "same");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.failure_id(), b.failure_id());
    }

    #[test]
    fn formatted_raise_and_helpers() {
        let failures = ValidationFailures::new();
        let origin = FeatureId::object("Customer").unwrap();
        failures.raise_formatted(Some(&origin), format_args!("{} has {} problems", "Customer", 2));
        failures.raise_member_id_clash(&origin, "name", "Customer#name", "Customer#fullName");
        let orders = FeatureId::member("Customer", "orders", FeatureKind::Collection).unwrap();
        failures.raise_invalid_element_type(&orders, &TypeRef::named("String"), "value type");

        assert_eq!(
            failures.messages(),
            vec![
                "Customer has 2 problems",
                "Customer: member id 'name' is shared by Customer#fullName and Customer#name",
                "Customer#orders: invalid element type String for collection: value type",
            ]
        );
    }

    #[test]
    fn failure_id_is_prefixed_base32hex_of_sha256() {
        let failure = ValidationFailure::new(None, "boom");
        let id = failure.failure_id();
        assert!(id.starts_with("vf1_"));
        assert_eq!(id.len(), 4 + 52);
        assert!(id[4..].chars().all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c)));
    }

    #[test]
    fn base32hex_known_vectors() {
        assert_eq!(base32hex_lower_no_pad(b""), "");
        assert_eq!(base32hex_lower_no_pad(b"f"), "co");
        assert_eq!(base32hex_lower_no_pad(b"foobar"), "cpnmuoj1e8");
    }

    #[test]
    fn concurrent_raises_collapse() {
        let failures = ValidationFailures::new();
        thread::scope(|scope| {
            for worker in 0..8 {
                let failures = &failures;
                scope.spawn(move || {
                    for n in 0..50 {
                        failures.raise(None, format!("failure {}", (n + worker) % 25));
                    }
                });
            }
        });
        assert_eq!(failures.len(), 25);
    }

    #[test]
    fn report_records_result_and_ids() {
        let failures = ValidationFailures::new();
        assert!(failures.report().is_accepted());
        failures.raise(Some(&property("Customer", "name")), "broken");
        let report = failures.report();
        assert_eq!(report.result, "rejected");
        assert_eq!(report.failures[0].origin.as_deref(), Some("Customer#name"));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["failures"][0]["failureId"].as_str().unwrap().starts_with("vf1_"));
    }
}
