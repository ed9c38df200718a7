//! Lead identity matching and merging.
//!
//! A single search combines several underlying directory sources, and the
//! same business routinely arrives more than once with different backend
//! ids. This module decides when two records are the same business and
//! unions their fields instead of keeping both.
//!
//! The matching rule, evaluated in order with first match winning:
//! 1. equal backend-assigned id
//! 2. equal normalized website host, both non-empty
//! 3. equal normalized name AND (equal normalized phone OR equal normalized
//!    address), both sides non-empty
//!
//! The merge is idempotent: merging a record into itself, or re-merging an
//! already-merged pair, produces no further change.

use once_cell::sync::Lazy;
use prospect_core::{ContactInfo, EnrichmentState, LeadRecord};
use prospect_protocol::{EnrichmentPayload, LeadPayload};
use regex::Regex;
use std::sync::Arc;
use tokio::sync::RwLock;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize a URL down to its host: scheme stripped, `www.` stripped,
/// lowercased, path/query/fragment dropped.
#[must_use]
pub fn normalize_host(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let rest = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Normalize a phone number to bare digits.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a business name: lowercased, punctuation stripped, whitespace
/// collapsed.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    normalize_text(name)
}

/// Normalize an address the same way as a name.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    normalize_text(address)
}

fn normalize_text(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = NON_ALNUM.replace_all(&lowered, "");
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// Whether two records are the same business under the matching rule.
#[must_use]
pub fn identity_matches(a: &LeadRecord, b: &LeadRecord) -> bool {
    if !a.id.is_empty() && a.id == b.id {
        return true;
    }

    if !a.host.is_empty() && a.host == b.host {
        return true;
    }

    let name_a = normalize_name(&a.name);
    let name_b = normalize_name(&b.name);
    if name_a.is_empty() || name_a != name_b {
        return false;
    }

    let phone_matches = match (&a.phone, &b.phone) {
        (Some(pa), Some(pb)) => {
            let pa = normalize_phone(pa);
            !pa.is_empty() && pa == normalize_phone(pb)
        }
        _ => false,
    };
    let address_matches = match (&a.address, &b.address) {
        (Some(aa), Some(ab)) => {
            let aa = normalize_address(aa);
            !aa.is_empty() && aa == normalize_address(ab)
        }
        _ => false,
    };

    phone_matches || address_matches
}

/// Union `incoming` into `existing`.
///
/// Non-empty existing scalars win; sets union with duplicates removed;
/// social maps union with incoming overwriting on key collision; enrichment
/// state takes the more advanced of the two.
pub fn merge_into(existing: &mut LeadRecord, incoming: &LeadRecord) {
    prefer_existing(&mut existing.id, &incoming.id);
    prefer_existing(&mut existing.name, &incoming.name);
    prefer_existing(&mut existing.url, &incoming.url);
    prefer_existing(&mut existing.host, &incoming.host);
    prefer_existing(&mut existing.snippet, &incoming.snippet);

    prefer_existing_opt(&mut existing.email, &incoming.email);
    prefer_existing_opt(&mut existing.phone, &incoming.phone);
    prefer_existing_opt(&mut existing.address, &incoming.address);
    if existing.rating.is_none() {
        existing.rating = incoming.rating;
    }
    if existing.reviews.is_none() {
        existing.reviews = incoming.reviews;
    }

    union_strings(&mut existing.sources, &incoming.sources);

    if let Some(incoming_contact) = &incoming.contact {
        let contact = existing.contact.get_or_insert_with(ContactInfo::default);
        union_strings(&mut contact.emails, &incoming_contact.emails);
        union_strings(&mut contact.phones, &incoming_contact.phones);
        for (platform, profile) in &incoming_contact.social {
            contact.social.insert(platform.clone(), profile.clone());
        }
    }

    existing.advance_enrichment(incoming.enrichment);
}

fn prefer_existing(existing: &mut String, incoming: &str) {
    if existing.is_empty() && !incoming.is_empty() {
        *existing = incoming.to_string();
    }
}

fn prefer_existing_opt(existing: &mut Option<String>, incoming: &Option<String>) {
    let existing_empty = existing.as_deref().map_or(true, str::is_empty);
    if existing_empty {
        if let Some(value) = incoming {
            if !value.is_empty() {
                *existing = Some(value.clone());
            }
        }
    }
}

fn union_strings(existing: &mut Vec<String>, incoming: &[String]) {
    for value in incoming {
        if !existing.contains(value) {
            existing.push(value.clone());
        }
    }
}

/// Build a [`LeadRecord`] from its wire payload.
#[must_use]
pub fn record_from_payload(payload: LeadPayload) -> LeadRecord {
    let url = payload
        .url
        .or(payload.display_link)
        .unwrap_or_default();
    let host = normalize_host(&url);

    LeadRecord {
        id: payload.id,
        name: payload.name.unwrap_or_default(),
        url,
        host,
        snippet: payload.snippet.unwrap_or_default(),
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        rating: payload.rating,
        reviews: payload.reviews,
        sources: payload.sources.unwrap_or_default(),
        contact: None,
        enrichment: EnrichmentState::Pending,
    }
}

/// Markers of placeholder/demo records the backend must never surface as
/// real data. Detection lives in one place so the "zero tolerance for fake
/// data" contract has a single switch.
#[must_use]
pub fn is_placeholder(payload: &LeadPayload) -> bool {
    if payload.id.starts_with("demo-")
        || payload.id.starts_with("sample-")
        || payload.id.starts_with("placeholder-")
    {
        return true;
    }

    if let Some(url) = payload.url.as_deref().or(payload.display_link.as_deref()) {
        let host = normalize_host(url);
        if host == "example.com" || host.ends_with(".example.com") {
            return true;
        }
    }

    false
}

/// Shared store of one search's lead records.
///
/// Records are looked up by their backend id, not by position; a merge that
/// fills an identity field can collapse two records into one, shifting the
/// positions of later records. The enrichment poller mutates records through
/// the same handle the caller holds after the search returns, so enrichment
/// updates are visible on already-returned records.
#[derive(Debug, Clone, Default)]
pub struct LeadArena {
    inner: Arc<RwLock<Vec<LeadRecord>>>,
}

impl LeadArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a wire payload, merging it into an existing record when the
    /// identity rule matches. Returns the record's index and whether a new
    /// record was inserted.
    pub async fn upsert(&self, payload: LeadPayload) -> (usize, bool) {
        let incoming = record_from_payload(payload);
        let mut records = self.inner.write().await;

        if let Some(index) = Self::find_match(&records, &incoming) {
            merge_into(&mut records[index], &incoming);
            let index = Self::collapse(&mut records, index);
            (index, false)
        } else {
            records.push(incoming);
            (records.len() - 1, true)
        }
    }

    /// A merge can fill a previously empty identity field (host, phone,
    /// address), making the merged record match a record it did not match
    /// before. Fold such pairs together until no two records in the set
    /// satisfy the matching rule, keeping the earlier record of each pair.
    fn collapse(records: &mut Vec<LeadRecord>, mut index: usize) -> usize {
        loop {
            let duplicate = (0..records.len())
                .find(|&i| i != index && identity_matches(&records[i], &records[index]));
            let Some(found) = duplicate else {
                return index;
            };
            let (keep, remove) = if found < index {
                (found, index)
            } else {
                (index, found)
            };
            let removed = records.remove(remove);
            merge_into(&mut records[keep], &removed);
            index = keep;
        }
    }

    /// The matching rule's passes run in priority order over the whole set,
    /// so an id match anywhere beats a host match earlier in the list.
    fn find_match(records: &[LeadRecord], incoming: &LeadRecord) -> Option<usize> {
        if !incoming.id.is_empty() {
            if let Some(index) = records.iter().position(|r| r.id == incoming.id) {
                return Some(index);
            }
        }
        if !incoming.host.is_empty() {
            if let Some(index) = records.iter().position(|r| r.host == incoming.host) {
                return Some(index);
            }
        }
        records.iter().position(|r| identity_matches(r, incoming))
    }

    /// Merge enrichment data into the record with the given backend id.
    ///
    /// Records already `Completed` are left alone; a later event must never
    /// rewrite finished enrichment. Returns whether a record changed.
    pub async fn apply_enrichment(&self, lead_id: &str, payload: &EnrichmentPayload) -> bool {
        let mut records = self.inner.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == lead_id) else {
            return false;
        };
        if record.enrichment == EnrichmentState::Completed {
            return false;
        }

        let has_data =
            !payload.emails.is_empty() || !payload.phones.is_empty() || !payload.social.is_empty();
        if has_data {
            let contact = record.contact.get_or_insert_with(ContactInfo::default);
            union_strings(&mut contact.emails, &payload.emails);
            union_strings(&mut contact.phones, &payload.phones);
            for (platform, profile) in &payload.social {
                contact.social.insert(platform.clone(), profile.clone());
            }
        }

        let next_state = payload.status.unwrap_or(if has_data {
            EnrichmentState::Completed
        } else {
            EnrichmentState::Processing
        });
        record.advance_enrichment(next_state);
        true
    }

    /// Clone the current records. A point-in-time copy: enrichment keeps
    /// landing in the arena afterwards.
    pub async fn snapshot(&self) -> Vec<LeadRecord> {
        self.inner.read().await.clone()
    }

    /// A clone of the record at `index`, if present.
    pub async fn get(&self, index: usize) -> Option<LeadRecord> {
        self.inner.read().await.get(index).cloned()
    }

    /// Number of records accumulated so far.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether nothing has been accumulated.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
