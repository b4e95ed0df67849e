//! Turns free-text user input into provider locations.
//!
//! Input is classified by an ordered list of pure predicates (coordinates,
//! then postal code, then plain text) and dispatched to the matching
//! gateway search. Results are memoized per exact input string for a short
//! window to spare the provider's rate limit. The memo can be saved to a file
//! so separate CLI runs share it.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::Path,
    time::{Duration, SystemTime},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    gateway::{GatewayError, WeatherGateway},
    model::Location,
};

/// How long a resolution may be reused for identical input.
pub const MEMO_TTL: Duration = Duration::from_secs(600);
/// Upper bound on remembered inputs.
pub const MEMO_CAPACITY: usize = 64;

/// Which search a piece of input is routed to.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Coordinates { lat: f64, lon: f64 },
    PostalCode(String),
    Text(String),
}

type Classifier = fn(&str) -> Option<QueryKind>;

/// Tried in order; first match wins. Anything left over is a text query.
const CLASSIFIERS: &[Classifier] = &[as_coordinates, as_postal_code];

/// `"47.60,-122.33"` style input.
pub fn as_coordinates(input: &str) -> Option<QueryKind> {
    let (lat, lon) = input.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lon = lon.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(QueryKind::Coordinates { lat, lon })
}

/// Digits only once hyphens and spaces are ignored, e.g. `10001` or `98101-1234`.
pub fn as_postal_code(input: &str) -> Option<QueryKind> {
    let mut digits = input.chars().filter(|c| *c != '-' && *c != ' ').peekable();
    digits.peek()?;
    digits
        .all(|c| c.is_ascii_digit())
        .then(|| QueryKind::PostalCode(input.to_string()))
}

/// Classify trimmed input. Blank input has nothing to search for.
pub fn classify(input: &str) -> Option<QueryKind> {
    let q = input.trim();
    if q.is_empty() {
        return None;
    }

    let kind = CLASSIFIERS
        .iter()
        .find_map(|classifier| classifier(q))
        .unwrap_or_else(|| QueryKind::Text(q.to_string()));
    Some(kind)
}

/// Outcome of resolving one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing matched; ask for a different query.
    NoMatch,
    /// Exactly one place; use it directly.
    Single(Location),
    /// Several places in provider order; the user has to choose.
    Multiple(Vec<Location>),
}

impl Resolution {
    pub fn from_candidates(mut candidates: Vec<Location>) -> Self {
        match candidates.len() {
            0 => Resolution::NoMatch,
            1 => Resolution::Single(candidates.remove(0)),
            _ => Resolution::Multiple(candidates),
        }
    }

    pub fn candidates(&self) -> &[Location] {
        match self {
            Resolution::NoMatch => &[],
            Resolution::Single(loc) => std::slice::from_ref(loc),
            Resolution::Multiple(locs) => locs,
        }
    }

    pub fn needs_choice(&self) -> bool {
        matches!(self, Resolution::Multiple(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemoEntry {
    stored_at: SystemTime,
    candidates: Vec<Location>,
}

#[derive(Debug)]
pub struct LocationResolver {
    ttl: Duration,
    capacity: usize,
    memo: HashMap<String, MemoEntry>,
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new(MEMO_TTL, MEMO_CAPACITY)
    }
}

impl LocationResolver {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            memo: HashMap::new(),
        }
    }

    pub async fn resolve(
        &mut self,
        gateway: &dyn WeatherGateway,
        input: &str,
    ) -> Result<Resolution, GatewayError> {
        self.resolve_at(gateway, input, SystemTime::now()).await
    }

    /// Same as [`resolve`](Self::resolve) with an explicit clock reading.
    pub async fn resolve_at(
        &mut self,
        gateway: &dyn WeatherGateway,
        input: &str,
        now: SystemTime,
    ) -> Result<Resolution, GatewayError> {
        let Some(kind) = classify(input) else {
            return Ok(Resolution::NoMatch);
        };

        if let Some(candidates) = self.lookup(input, now) {
            debug!(input, "Reusing memoized location search");
            return Ok(Resolution::from_candidates(candidates));
        }

        let candidates = search(gateway, &kind).await?;
        debug!(input, matches = candidates.len(), ?kind, "Location search finished");

        self.remember(input, candidates.clone(), now);
        Ok(Resolution::from_candidates(candidates))
    }

    /// Resolver seeded from a file written by [`save`](Self::save). A missing
    /// or unreadable file gives an empty memo.
    pub fn load(path: &Path) -> Self {
        let mut resolver = Self::default();
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(memo) => resolver.memo = memo,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable location memo")
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read location memo")
            }
        }
        resolver
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text =
            serde_json::to_string(&self.memo).context("Failed to serialize location memo")?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write location memo to {}", path.display()))
    }

    fn lookup(&mut self, input: &str, now: SystemTime) -> Option<Vec<Location>> {
        let entry = self.memo.get(input)?;
        if age(entry, now) < self.ttl {
            return Some(entry.candidates.clone());
        }
        self.memo.remove(input);
        None
    }

    fn remember(&mut self, input: &str, candidates: Vec<Location>, now: SystemTime) {
        let ttl = self.ttl;
        self.memo.retain(|_, e| age(e, now) < ttl);

        if self.memo.len() >= self.capacity {
            let oldest = self
                .memo
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                self.memo.remove(&key);
            }
        }

        self.memo.insert(
            input.to_string(),
            MemoEntry {
                stored_at: now,
                candidates,
            },
        );
    }

    pub fn memoized_len(&self) -> usize {
        self.memo.len()
    }
}

/// Entries stamped in the future (clock moved back) count as fresh.
fn age(entry: &MemoEntry, now: SystemTime) -> Duration {
    now.duration_since(entry.stored_at).unwrap_or_default()
}

async fn search(
    gateway: &dyn WeatherGateway,
    kind: &QueryKind,
) -> Result<Vec<Location>, GatewayError> {
    match kind {
        QueryKind::Coordinates { lat, lon } => {
            Ok(gateway.search_by_geo(*lat, *lon).await?.into_iter().collect())
        }
        QueryKind::PostalCode(code) => gateway.search_by_postal(code).await,
        QueryKind::Text(text) => gateway.search_by_text(text).await,
    }
}
