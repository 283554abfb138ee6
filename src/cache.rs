
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::message::{DnsType, Record};

struct CacheEntry {
    rr: Record,
    deadline: Instant,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now > self.deadline
    }

    // The cached record with its TTL rewritten to the whole seconds left
    // until the deadline. The stored entry is untouched.
    fn with_remaining_ttl(&self, now: Instant) -> Record {
        let mut rr = self.rr.clone();
        rr.ttl = self.deadline.saturating_duration_since(now).as_secs() as u32;
        rr
    }
}

// Passive store of records heard on the link, keyed name -> rtype code.
// At most one entry per (name, type); expiry is lazy, there is no sweeper.
// A single mutex is plenty at UDP packet rates.
pub(crate) struct Cache {
    entries: Mutex<HashMap<String, HashMap<u16, CacheEntry>>>,
}

impl Cache {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn add(&self, rr: &Record) {
        self.add_at(rr, Instant::now());
    }

    // add_at stores a copy of rr with deadline now + ttl. An existing live
    // entry is only displaced by a later deadline; RFC 6762 recommends
    // keeping the fresher advertisement.
    pub(crate) fn add_at(&self, rr: &Record, now: Instant) {
        // ttl == 0 means no caching.
        if rr.ttl == 0 {
            return;
        }
        let deadline = now + Duration::from_secs(u64::from(rr.ttl));

        let mut entries = self.entries.lock().unwrap();
        let types = entries.entry(rr.name.clone()).or_default();
        match types.get(&rr.type_code()) {
            Some(e) if !e.expired(now) && deadline <= e.deadline => {
                log::trace!("cache: keeping fresher entry for {}", rr.name);
            }
            _ => {
                log::trace!("cache: storing {} for {}s", rr.name, rr.ttl);
                types.insert(
                    rr.type_code(),
                    CacheEntry {
                        rr: rr.clone(),
                        deadline,
                    },
                );
            }
        }
    }

    pub(crate) fn get(&self, name: &str, qtype: DnsType) -> Vec<Record> {
        self.get_at(name, qtype, Instant::now())
    }

    // get_at returns the live records under name matching qtype, with TTLs
    // rewritten to the time remaining. Expired entries are evicted here.
    pub(crate) fn get_at(&self, name: &str, qtype: DnsType, now: Instant) -> Vec<Record> {
        let mut entries = self.entries.lock().unwrap();
        let Some(types) = entries.get_mut(name) else {
            return Vec::new();
        };

        let mut ret = Vec::new();
        if qtype == DnsType::Any {
            types.retain(|_, e| !e.expired(now));
            ret.extend(types.values().map(|e| e.with_remaining_ttl(now)));
        } else {
            let code = qtype as u16;
            if let Some(e) = types.get(&code) {
                if e.expired(now) {
                    types.remove(&code);
                } else {
                    ret.push(e.with_remaining_ttl(now));
                }
            }
        }

        if types.is_empty() {
            entries.remove(name);
        }
        ret
    }
}
