//! Expandable scripture references for learning mode.
//!
//! Expanding a reference shows a loading line immediately and looks the
//! passage up in the background. Whatever comes back (text or the link-only
//! fallback) is cached for the rest of the session, and a reference whose
//! lookup is still in flight is never looked up twice.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ConfigError, LookupError};

pub const DEFAULT_SCRIPTURE_API: &str = "https://bible-api.com";
pub const DEFAULT_TRANSLATION: &str = "web";
const FALLBACK_BASE: &str = "https://www.biblegateway.com/passage/";
const FALLBACK_VERSION: &str = "ESV";

static BRACKETED_VERSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+:\d+\]").expect("valid verse marker pattern"));
static BARE_VERSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+:\d+").expect("valid verse marker pattern"));

/// Strip `[1:1]` and bare `1:1` verse markers plus surrounding whitespace.
pub fn clean_passage(raw: &str) -> String {
    let without_brackets = BRACKETED_VERSE.replace_all(raw, "");
    BARE_VERSE
        .replace_all(&without_brackets, "")
        .trim()
        .to_string()
}

/// Where a passage can be read when the text itself is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackLink {
    pub reference: String,
    pub url: String,
}

impl FallbackLink {
    pub fn for_reference(reference: &str) -> Self {
        let url = Url::parse_with_params(
            FALLBACK_BASE,
            &[("search", reference), ("version", FALLBACK_VERSION)],
        )
        .map(String::from)
        .unwrap_or_else(|_| FALLBACK_BASE.to_string());
        Self {
            reference: reference.to_string(),
            url,
        }
    }

    pub fn label(&self) -> String {
        format!("Read {} ({FALLBACK_VERSION}) on Bible Gateway", self.reference)
    }
}

/// What the expanded region of a reference currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passage {
    Loading,
    Text { text: String, link: FallbackLink },
    LinkOnly(FallbackLink),
}

/// A service that turns a citation into display text.
#[async_trait]
pub trait ScriptureSource: Send + Sync {
    async fn lookup(&self, reference: &str) -> Result<String, LookupError>;
}

#[derive(Debug, Deserialize)]
struct PassageResponse {
    #[serde(default)]
    text: Option<String>,
}

/// bible-api.com style lookups: `GET {base}/{reference}?translation={t}`.
#[derive(Clone, Debug)]
pub struct BibleApi {
    client: Client,
    base_url: Url,
    translation: String,
}

impl BibleApi {
    pub fn new(base_url: &str, translation: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|err| ConfigError::ScriptureUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigError::ScriptureUrl {
                url: base_url.to_string(),
                reason: "not a base url".into(),
            });
        }
        Ok(Self {
            client: Client::new(),
            base_url: parsed,
            translation: translation.to_string(),
        })
    }

    /// Request url with the reference escaped as a single path segment.
    pub fn passage_url(&self, reference: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(reference.trim());
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("translation", &self.translation);
        url
    }
}

#[async_trait]
impl ScriptureSource for BibleApi {
    async fn lookup(&self, reference: &str) -> Result<String, LookupError> {
        let response = self.client.get(self.passage_url(reference)).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::HttpStatus(response.status()));
        }
        let body: PassageResponse = response.json().await?;
        body.text
            .filter(|text| !text.trim().is_empty())
            .ok_or(LookupError::Empty)
    }
}

/// One reference item: the question it belongs to and its position there.
/// The same citation listed twice is two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefSlot {
    pub question: u32,
    pub index: usize,
}

impl RefSlot {
    pub fn new(question: u32, index: usize) -> Self {
        Self { question, index }
    }
}

/// Result of a `toggle` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    /// Expanded using cached (or still loading) content.
    Expanded,
    /// Expanded and a lookup was started.
    Fetching,
}

#[derive(Debug)]
struct LookupOutcome {
    reference: String,
    text: Option<String>,
}

pub struct ReferenceExpander {
    source: Arc<dyn ScriptureSource>,
    runtime: Handle,
    expanded: HashSet<RefSlot>,
    // keyed by citation text, shared by every slot that cites it
    passages: HashMap<String, Passage>,
    tx: UnboundedSender<LookupOutcome>,
    rx: UnboundedReceiver<LookupOutcome>,
}

impl ReferenceExpander {
    pub fn new(source: Arc<dyn ScriptureSource>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            expanded: HashSet::new(),
            passages: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn is_expanded(&self, slot: RefSlot) -> bool {
        self.expanded.contains(&slot)
    }

    pub fn passage(&self, reference: &str) -> Option<&Passage> {
        self.passages.get(reference)
    }

    pub fn toggle(&mut self, slot: RefSlot, reference: &str) -> Toggle {
        if self.expanded.remove(&slot) {
            return Toggle::Collapsed;
        }

        self.expanded.insert(slot);
        if self.passages.contains_key(reference) {
            return Toggle::Expanded;
        }

        self.passages.insert(reference.to_string(), Passage::Loading);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let reference = reference.to_string();
        debug!(%reference, "looking up scripture");
        self.runtime.spawn(async move {
            let text = match source.lookup(&reference).await {
                Ok(raw) => Some(clean_passage(&raw)).filter(|text| !text.is_empty()),
                Err(err) => {
                    warn!(%reference, %err, "scripture lookup failed");
                    None
                }
            };
            let _ = tx.send(LookupOutcome { reference, text });
        });
        Toggle::Fetching
    }

    /// Collapse every reference, keeping cached passages.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Apply lookups that have finished; returns how many landed.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait for the next lookup to finish and apply it.
    pub async fn settle(&mut self) -> bool {
        match self.rx.recv().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, outcome: LookupOutcome) {
        let link = FallbackLink::for_reference(&outcome.reference);
        let passage = match outcome.text {
            Some(text) => Passage::Text { text, link },
            None => Passage::LinkOnly(link),
        };
        self.passages.insert(outcome.reference, passage);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Canned responses keyed by reference; anything else fails.
    #[derive(Default)]
    pub struct FakeSource {
        pub calls: AtomicUsize,
        responses: Mutex<HashMap<String, String>>,
    }

    impl FakeSource {
        pub fn with(reference: &str, text: &str) -> Self {
            let source = Self::default();
            source
                .responses
                .lock()
                .unwrap()
                .insert(reference.to_string(), text.to_string());
            source
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScriptureSource for FakeSource {
        async fn lookup(&self, reference: &str) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(reference)
                .cloned()
                .ok_or(LookupError::HttpStatus(reqwest::StatusCode::NOT_FOUND))
        }
    }
}
