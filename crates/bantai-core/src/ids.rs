//! ID and timestamp utilities shared across the engine.
//!
//! IDs carry a namespace prefix (`policy:`, `rule:`, `event:`, `eval:`) per §6,
//! so a caller can route on the string alone. Event/eval ids combine a
//! per-process monotonic counter with a random UUID suffix, which is enough to
//! be collision-resistant within one process without coordinating a resource
//! across rules (§9).

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Monotonic counter, starting at 1. Used only to order ids generated in the
/// same process; not exposed on its own.
fn next_counter() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Generate a new `event:<counter>-<uuid>` id.
pub fn new_event_id() -> String {
    format!("event:{}-{}", next_counter(), Uuid::new_v4())
}

/// Generate a new `eval:<counter>-<uuid>` id, one per `evaluate_policy` call.
pub fn new_evaluation_id() -> String {
    format!("eval:{}-{}", next_counter(), Uuid::new_v4())
}

/// Normalize a human-supplied name into the `<slug>` portion of an id:
/// lowercase, with runs of non-alphanumeric characters collapsed to a single
/// dash, and leading/trailing dashes trimmed. Stable across runs (§9).
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Build a `rule:<slug>` id from a rule name.
pub fn rule_id(name: &str) -> String {
    format!("rule:{}", slugify(name))
}

/// Build a `policy:<slug>` id from a policy name.
pub fn policy_id(name: &str) -> String {
    format!("policy:{}", slugify(name))
}
