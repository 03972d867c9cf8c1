// ── Server entities ──
//
// Three concrete record shapes share one lifecycle: created on first
// observation, merged on every run that reports the same uid, and removed
// only by the expiry sweep.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::identity::QueryPort;
use super::link::{WebLink, lenient_vec, merge_links};
use super::time;
use super::via::{ViaStatus, merge_via};

/// Behaviour every persisted server record provides to the engine.
pub trait Server: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable identity key, unique within one list file.
    fn uid(&self) -> &str;

    fn last_seen_at(&self) -> DateTime<Utc>;

    fn links(&self) -> &[WebLink];

    /// Mark the server as seen at `at` without any other change.
    fn touch(&mut self, at: DateTime<Utc>);

    /// Upsert links by site.
    fn add_links(&mut self, links: Vec<WebLink>);

    /// Merge a fresh observation of the same server into this record.
    fn update(&mut self, found: Self);

    /// Drop sub-records whose own freshness lapsed. Never touches `self`'s
    /// own timestamps.
    fn trim(&mut self, ttl: TimeDelta, now: DateTime<Utc>);

    fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        time::is_expired(self.last_seen_at(), ttl, now)
    }
}

fn merge_seen(
    first_seen_at: &mut Option<DateTime<Utc>>,
    last_seen_at: &mut DateTime<Utc>,
    found_first: Option<DateTime<Utc>>,
    found_last: DateTime<Utc>,
) {
    if first_seen_at.is_none() {
        *first_seen_at = found_first;
    }
    *last_seen_at = (*last_seen_at).max(found_last);
}

fn trim_links(links: &mut Vec<WebLink>, ttl: TimeDelta, now: DateTime<Utc>) {
    links.retain(|link| !link.is_expired(ttl, now));
}

// ── Classic ─────────────────────────────────────────────────────────

/// A server listed by one or more binary-protocol principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicServer {
    pub guid: String,
    pub ip: String,
    #[serde(default)]
    pub query_port: QueryPort,
    #[serde(
        default,
        serialize_with = "time::serialize_opt",
        deserialize_with = "time::deserialize_opt"
    )]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(
        default = "time::epoch",
        serialize_with = "time::serialize",
        deserialize_with = "time::deserialize_or_epoch"
    )]
    pub last_seen_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub via: Vec<ViaStatus>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub links: Vec<WebLink>,
}

impl ClassicServer {
    pub fn new(
        guid: impl Into<String>,
        ip: impl Into<String>,
        query_port: u16,
        principal: &str,
        links: Vec<WebLink>,
    ) -> Self {
        let now = Utc::now();
        Self {
            guid: guid.into(),
            ip: ip.into(),
            query_port: QueryPort::known(query_port),
            first_seen_at: Some(now),
            last_seen_at: now,
            via: vec![ViaStatus::new(principal)],
            links,
        }
    }
}

impl Server for ClassicServer {
    fn uid(&self) -> &str {
        &self.guid
    }

    fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    fn links(&self) -> &[WebLink] {
        &self.links
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_seen_at = at;
    }

    fn add_links(&mut self, links: Vec<WebLink>) {
        merge_links(&mut self.links, links);
    }

    fn update(&mut self, found: Self) {
        merge_seen(
            &mut self.first_seen_at,
            &mut self.last_seen_at,
            found.first_seen_at,
            found.last_seen_at,
        );
        self.ip = found.ip;
        self.query_port.merge(found.query_port);
        merge_via(&mut self.via, found.via);
        merge_links(&mut self.links, found.links);
    }

    fn trim(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        trim_links(&mut self.links, ttl, now);
        self.via.retain(|via| !via.is_expired(ttl, now));
    }
}

// ── Frostbite ───────────────────────────────────────────────────────

/// A Frostbite-engine server found through an HTTP browse API. The query
/// port is not published and has to be discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrostbiteServer {
    pub guid: String,
    pub name: String,
    pub ip: String,
    pub game_port: u16,
    #[serde(default)]
    pub query_port: QueryPort,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
    #[serde(
        default,
        serialize_with = "time::serialize_opt",
        deserialize_with = "time::deserialize_opt"
    )]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(
        default = "time::epoch",
        serialize_with = "time::serialize",
        deserialize_with = "time::deserialize_or_epoch"
    )]
    pub last_seen_at: DateTime<Utc>,
    #[serde(
        default,
        serialize_with = "time::serialize_opt",
        deserialize_with = "time::deserialize_opt"
    )]
    pub last_queried_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub links: Vec<WebLink>,
}

impl FrostbiteServer {
    pub fn new(
        guid: impl Into<String>,
        name: impl Into<String>,
        ip: impl Into<String>,
        game_port: u16,
        links: Vec<WebLink>,
    ) -> Self {
        let now = Utc::now();
        Self {
            guid: guid.into(),
            name: name.into(),
            ip: ip.into(),
            game_port,
            query_port: QueryPort::UNKNOWN,
            lid: None,
            gid: None,
            first_seen_at: Some(now),
            last_seen_at: now,
            last_queried_at: None,
            links,
        }
    }

    /// Attach the FESL lobby and game ids BFBC2 servers are addressed by.
    pub fn with_fesl_ids(mut self, lid: i64, gid: i64) -> Self {
        self.lid = Some(lid);
        self.gid = Some(gid);
        self
    }
}

impl Server for FrostbiteServer {
    fn uid(&self) -> &str {
        &self.guid
    }

    fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    fn links(&self) -> &[WebLink] {
        &self.links
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_seen_at = at;
    }

    fn add_links(&mut self, links: Vec<WebLink>) {
        merge_links(&mut self.links, links);
    }

    fn update(&mut self, found: Self) {
        merge_seen(
            &mut self.first_seen_at,
            &mut self.last_seen_at,
            found.first_seen_at,
            found.last_seen_at,
        );
        self.name = found.name;
        self.ip = found.ip;
        self.game_port = found.game_port;
        self.query_port.merge(found.query_port);
        if let Some(queried) = found.last_queried_at {
            self.last_queried_at = Some(self.last_queried_at.map_or(queried, |q| q.max(queried)));
        }
        if found.lid.is_some() {
            self.lid = found.lid;
        }
        if found.gid.is_some() {
            self.gid = found.gid;
        }
        merge_links(&mut self.links, found.links);
    }

    fn trim(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        trim_links(&mut self.links, ttl, now);
    }
}

// ── Gametools ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GametoolsServer {
    pub game_id: String,
    pub name: String,
    #[serde(
        default,
        serialize_with = "time::serialize_opt",
        deserialize_with = "time::deserialize_opt"
    )]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(
        default = "time::epoch",
        serialize_with = "time::serialize",
        deserialize_with = "time::deserialize_or_epoch"
    )]
    pub last_seen_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub links: Vec<WebLink>,
}

impl GametoolsServer {
    pub fn new(game_id: impl Into<String>, name: impl Into<String>, links: Vec<WebLink>) -> Self {
        let now = Utc::now();
        Self {
            game_id: game_id.into(),
            name: name.into(),
            first_seen_at: Some(now),
            last_seen_at: now,
            links,
        }
    }
}

impl Server for GametoolsServer {
    fn uid(&self) -> &str {
        &self.game_id
    }

    fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    fn links(&self) -> &[WebLink] {
        &self.links
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_seen_at = at;
    }

    fn add_links(&mut self, links: Vec<WebLink>) {
        merge_links(&mut self.links, links);
    }

    fn update(&mut self, found: Self) {
        merge_seen(
            &mut self.first_seen_at,
            &mut self.last_seen_at,
            found.first_seen_at,
            found.last_seen_at,
        );
        self.name = found.name;
        merge_links(&mut self.links, found.links);
    }

    fn trim(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        trim_links(&mut self.links, ttl, now);
    }
}
