#![allow(clippy::unwrap_used)]
// Integration tests for the HTTP browse clients using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use serverlist_api::http::{BattlelogClient, FeslClient, GametoolsClient, MohaaServersClient};
use serverlist_api::{Error, HttpClient, Lookup, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpClient, Url) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let http = HttpClient::new(&TransportConfig::default()).unwrap();
    (server, http, base_url)
}

// ── Battlelog ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_battlelog_bf3_uses_auto_browse() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/bf3/servers/getAutoBrowseServers/pc/"))
        .and(query_param("count", "60"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "guid": "a1", "name": "Server A", "ip": "1.2.3.4", "port": 25200, "gameId": 123 },
                { "guid": "b2", "name": "Private", "ip": "", "port": 25200 }
            ]
        })))
        .mount(&server)
        .await;

    let client = BattlelogClient::new(http, base_url);
    let page = client.list_servers("bf3", "pc", 60).await.unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].game_id().as_deref(), Some("123"));
    assert!(page.data[1].ip.is_empty());
    assert_eq!(page.data[1].game_id(), None);
}

#[tokio::test]
async fn test_battlelog_bf4_uses_get_servers() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/bf4/servers/getServers/pc/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = BattlelogClient::new(http, base_url);
    let page = client.list_servers("bf4", "pc", 60).await.unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_battlelog_sends_configured_headers() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default().with_header("X-Requested-With", "XMLHttpRequest");
    let http = HttpClient::new(&transport).unwrap();

    Mock::given(method("GET"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BattlelogClient::new(http, base_url);
    client.list_servers("bfh", "pc", 60).await.unwrap();
}

#[tokio::test]
async fn test_battlelog_show_found_and_gone() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/bf4/servers/show/pc/alive"))
        .and(query_param("json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "SERVER_INFO": { "ip": "1.2.3.4" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bf4/servers/show/pc/gone"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bf4/servers/show/pc/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = BattlelogClient::new(http, base_url);
    assert_eq!(
        client.server_is_public("bf4", "pc", "alive").await.unwrap(),
        Lookup::Found(true)
    );
    assert_eq!(
        client.server_is_public("bf4", "pc", "gone").await.unwrap(),
        Lookup::NotFound
    );

    let result = client.server_is_public("bf4", "pc", "broken").await;
    assert!(
        matches!(result, Err(Error::Status { status: 503, .. })),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_battlelog_malformed_page_keeps_body() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = BattlelogClient::new(http, base_url);
    let result = client.list_servers("bf4", "pc", 60).await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("maintenance")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── gametools ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_gametools_list_and_detail() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/bf1/servers/"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [
                { "gameId": "7001", "prefix": "[ABC] Conquest", "official": false },
                { "gameId": "7002", "prefix": "DICE Official", "official": true }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bf1/detailedserver/"))
        .and(query_param("gameid", "7001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "official": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bf1/detailedserver/"))
        .and(query_param("gameid", "9999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = GametoolsClient::new(http, base_url);
    let page = client.list_servers("bf1", 100).await.unwrap();
    assert_eq!(page.servers.len(), 2);
    assert_eq!(page.servers[0].prefix, "[ABC] Conquest");
    assert!(page.servers[1].official);

    match client.server_detail("bf1", "7001").await.unwrap() {
        Lookup::Found(detail) => assert!(!detail.official),
        Lookup::NotFound => panic!("expected server to be found"),
    }
    assert_eq!(
        client.server_detail("bf1", "9999").await.unwrap(),
        Lookup::NotFound
    );
}

// ── FESL ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fesl_list_accepts_string_numbers() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "I": "1.2.3.4", "P": "19567", "N": "BC2 Rush", "LID": 257, "GID": "112233" }
        ])))
        .mount(&server)
        .await;

    let client = FeslClient::new(http, base_url);
    let servers = client.list_servers().await.unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].port, 19567);
    assert_eq!(servers[0].lid, 257);
    assert_eq!(servers[0].gid, 112_233);
}

#[tokio::test]
async fn test_fesl_server_exists_classifies_status() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/257/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/257/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/257/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = FeslClient::new(http, base_url);
    assert!(client.server_exists(257, 1).await.unwrap());
    assert!(!client.server_exists(257, 2).await.unwrap());

    let err = client.server_exists(257, 3).await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}

// ── mohaaservers ────────────────────────────────────────────────────

#[tokio::test]
async fn test_mohaa_text_list() {
    let (server, http, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/servers_aa.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4:12203\n5.6.7.8:12300\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/servers_sh.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = MohaaServersClient::new(http, base_url);
    let raw = client.list("aa").await.unwrap();
    assert_eq!(raw.lines().count(), 2);

    let err = client.list("sh").await.unwrap_err();
    assert!(err.is_not_found());
}
