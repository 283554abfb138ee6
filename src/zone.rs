
use std::collections::HashMap;
use std::sync::Mutex;

use crate::message::{DnsType, Question, Record};

// The authoritative store for records this host publishes. Every name in it
// belongs to this host; questions against it are answered with AA set.
// Records live for the lifetime of the process.
pub(crate) struct Zone {
    entries: Mutex<HashMap<String, Vec<Record>>>,
}

impl Zone {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    // publish appends rr to its owner's bucket. Duplicates are kept as-is.
    //
    // Panics unless the owner name ends in ".local." - publishing outside
    // the link-local domain is a caller bug, not a runtime condition.
    pub(crate) fn publish(&self, rr: Record) {
        assert!(
            rr.name.ends_with(".local."),
            "published domain must end in .local.: {}",
            rr.name
        );

        let mut entries = self.entries.lock().unwrap();
        entries.entry(rr.name.clone()).or_default().push(rr);
    }

    // query returns every record under the question's name matching its
    // qtype (all of them for ANY).
    pub(crate) fn query(&self, q: &Question) -> Vec<Record> {
        let entries = self.entries.lock().unwrap();
        let Some(bucket) = entries.get(&q.name) else {
            return Vec::new();
        };

        bucket
            .iter()
            .filter(|rr| q.qtype == DnsType::Any || q.qtype == rr.rtype())
            .cloned()
            .collect()
    }
}
