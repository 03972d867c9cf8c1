// ── Web links ──

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::trace;

use super::time;

/// A link to a third-party page about a server, one per site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebLink {
    pub site: String,
    pub url: String,
    pub official: bool,
    #[serde(
        default = "time::epoch",
        serialize_with = "time::serialize",
        deserialize_with = "time::deserialize_or_epoch"
    )]
    pub as_of: DateTime<Utc>,
}

impl WebLink {
    pub fn new(site: impl Into<String>, url: impl Into<String>, official: bool) -> Self {
        Self {
            site: site.into(),
            url: url.into(),
            official,
            as_of: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        time::is_expired(self.as_of, ttl, now)
    }
}

/// Upsert `incoming` into `links` keyed by site.
pub fn merge_links(links: &mut Vec<WebLink>, incoming: impl IntoIterator<Item = WebLink>) {
    for link in incoming {
        match links.iter_mut().find(|l| l.site == link.site) {
            Some(existing) => {
                existing.url = link.url;
                existing.official = link.official;
                existing.as_of = link.as_of;
            }
            None => links.push(link),
        }
    }
}

/// Load a list of sub-records, silently dropping entries that do not parse.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| {
            serde_json::from_value(value)
                .map_err(|e| trace!(error = %e, "dropping malformed entry"))
                .ok()
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merge_updates_in_place() {
        let mut links = vec![WebLink::new("bf2hub.com", "https://old", true)];
        let fresh = WebLink::new("bf2hub.com", "https://new", false);
        merge_links(&mut links, [fresh.clone(), WebLink::new("bf2.tv", "https://tv", false)]);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0], fresh);
        assert_eq!(links[1].site, "bf2.tv");
    }

    #[test]
    fn missing_as_of_loads_as_epoch() {
        let link: WebLink = serde_json::from_value(json!({
            "site": "cod.pm", "url": "https://cod.pm/server/1.2.3.4/28960", "official": false
        }))
        .unwrap();
        assert_eq!(link.as_of, time::EPOCH);
    }

    #[test]
    fn serializes_in_field_order() {
        let mut link = WebLink::new("cod.pm", "https://cod.pm", false);
        link.as_of = time::EPOCH;
        assert_eq!(
            serde_json::to_string(&link).unwrap(),
            r#"{"site":"cod.pm","url":"https://cod.pm","official":false,"asOf":"1970-01-01T00:00:00.000000+00:00"}"#
        );
    }
}
