//! Request engine tests against a stub transport

use async_trait::async_trait;
use skittles::services::request::{RequestDescriptor, RequestEngine};
use skittles::services::{HttpMethod, HttpRequest, HttpResponse, Transport};
use skittles::{ApiErrorKind, Client, Configuration, Error, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Transport that records requests and replays a canned response
struct StubTransport {
    reply: std::result::Result<HttpResponse, fn() -> TransportError>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    fn responding(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: fn() -> TransportError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request sent")
    }

    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Ok(response) => Ok(response.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

const OK_EMPTY: &str = r#"{"meta":{"code":200},"response":{}}"#;

fn app_config() -> Configuration {
    let mut config = Configuration::default();
    config.client_id = Some("CLIENT".to_string());
    config.client_secret = Some("SECRET".to_string());
    config
}

fn user_config() -> Configuration {
    let mut config = app_config();
    config.access_token = Some("TOKEN".to_string());
    config
}

/// Split a URL's query into (key, value) pairs, in order
fn query_pairs(url: &str) -> Vec<(String, String)> {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_string(), v.to_string())
        })
        .collect()
}

fn key_counts(url: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for (key, _) in query_pairs(url) {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[tokio::test]
async fn test_every_method_sends_each_param_once_with_app_credentials() {
    for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
        let transport = StubTransport::responding(200, OK_EMPTY);
        let engine = RequestEngine::new(app_config(), transport.clone());

        let descriptor = RequestDescriptor::new(method, "venues/search")
            .param("ll", "40.7,-74")
            .param("query", "Pier 1")
            .param("limit", 5);
        engine.execute(descriptor).await.unwrap();

        let request = transport.last();
        assert_eq!(request.method, method);

        let counts = key_counts(&request.url);
        for key in ["ll", "query", "limit", "client_id", "client_secret"] {
            assert_eq!(counts.get(key), Some(&1), "{} for {}", key, method);
        }
        assert!(!counts.contains_key("oauth_token"));
    }
}

#[tokio::test]
async fn test_every_method_sends_oauth_token_when_authenticated() {
    for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
        let transport = StubTransport::responding(200, OK_EMPTY);
        let engine = RequestEngine::new(user_config(), transport.clone());

        engine
            .execute(RequestDescriptor::new(method, "users/self").param("limit", "1"))
            .await
            .unwrap();

        let counts = key_counts(&transport.last().url);
        assert_eq!(counts.get("limit"), Some(&1));
        assert_eq!(counts.get("oauth_token"), Some(&1));
        assert!(!counts.contains_key("client_id"));
        assert!(!counts.contains_key("client_secret"));
    }
}

#[tokio::test]
async fn test_url_layout() {
    let transport = StubTransport::responding(200, OK_EMPTY);
    let engine = RequestEngine::new(user_config(), transport.clone());

    engine
        .execute(
            RequestDescriptor::new(HttpMethod::Get, "venues/search")
                .param("ll", "40.7,-74")
                .param("query", "Pier 1"),
        )
        .await
        .unwrap();

    assert_eq!(
        transport.last().url,
        "https://api.foursquare.com/v2/venues/search?ll=40.7,-74&query=Pier%201&oauth_token=TOKEN"
    );
}

#[tokio::test]
async fn test_duplicate_caller_keys_are_kept_in_order() {
    let transport = StubTransport::responding(200, OK_EMPTY);
    let engine = RequestEngine::new(user_config(), transport.clone());

    engine
        .execute(
            RequestDescriptor::new(HttpMethod::Get, "checkins/recent")
                .param("tag", "a")
                .param("other", "x")
                .param("tag", "b"),
        )
        .await
        .unwrap();

    let pairs = query_pairs(&transport.last().url);
    let tags: Vec<&str> = pairs.iter().filter(|(k, _)| k == "tag").map(|(_, v)| v.as_str()).collect();
    assert_eq!(tags, vec!["a", "b"]);
    assert_eq!(pairs[0].0, "tag");
    assert_eq!(pairs[1].0, "other");
}

#[tokio::test]
async fn test_api_version_param_only_when_configured() {
    let transport = StubTransport::responding(200, OK_EMPTY);
    let engine = RequestEngine::new(user_config(), transport.clone());
    engine.execute(RequestDescriptor::new(HttpMethod::Get, "users/self")).await.unwrap();
    assert!(!key_counts(&transport.last().url).contains_key("v"));

    let mut config = user_config();
    config.api_version = Some("20111010".to_string());
    let engine = RequestEngine::new(config, transport.clone());
    engine.execute(RequestDescriptor::new(HttpMethod::Get, "users/self")).await.unwrap();
    assert!(query_pairs(&transport.last().url).contains(&("v".to_string(), "20111010".to_string())));
}

#[tokio::test]
async fn test_user_agent_header_from_configuration() {
    let transport = StubTransport::responding(200, OK_EMPTY);
    let mut config = user_config();
    config.user_agent = "my-app/1.0".to_string();
    let engine = RequestEngine::new(config, transport.clone());

    engine
        .execute(
            RequestDescriptor::new(HttpMethod::Get, "users/self")
                .header("user-agent", "spoofed")
                .header("Accept-Language", "fr"),
        )
        .await
        .unwrap();

    let request = transport.last();
    assert_eq!(request.header("User-Agent"), Some("my-app/1.0"));
    assert_eq!(request.header("accept-language"), Some("fr"));
    assert_eq!(
        request.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("user-agent")).count(),
        1
    );
}

#[tokio::test]
async fn test_venue_search_scenario() {
    let transport = StubTransport::responding(
        200,
        r#"{"meta":{"code":200},"response":{"venues":[{"name":"Pier 1"}]}}"#,
    );
    let client = Client::with_transport(user_config(), transport.clone());

    let payload = client
        .get("venues/search", [("ll", "40.7,-74"), ("query", "Pier 1")])
        .await
        .unwrap();

    let venues = payload.array_at("venues").expect("venues array");
    assert_eq!(venues.len(), 1);
    assert_eq!(payload["venues"][0]["name"], "Pier 1");
    assert_eq!(payload.str_at("venues.0.name"), Some("Pier 1"));
}

#[tokio::test]
async fn test_unauthorized_scenario() {
    let transport = StubTransport::responding(
        401,
        r#"{"meta":{"code":401,"errorType":"deprecated","errorDetail":"token expired"}}"#,
    );
    let client = Client::with_transport(user_config(), transport.clone());

    let err = client
        .get("venues/search", [("ll", "40.7,-74"), ("query", "Pier 1")])
        .await
        .unwrap_err();

    let api = err.as_api().expect("api error");
    assert_eq!(api.kind, ApiErrorKind::Unauthorized);
    assert_eq!(api.code, 401);
    assert_eq!(api.error_type.as_deref(), Some("deprecated"));
    assert_eq!(api.detail.as_deref(), Some("token expired"));
}

#[tokio::test]
async fn test_transport_raised_response_uses_same_classification() {
    let transport = StubTransport::failing(|| TransportError::WithResponse {
        status: 404,
        body: r#"{"meta":{"code":404,"errorType":"not_found","errorDetail":"Venue not found"}}"#.to_string(),
    });
    let client = Client::with_transport(user_config(), transport.clone());

    let err = client.get("venues/missing", skittles::NO_PARAMS).await.unwrap_err();
    assert_eq!(err.api_kind(), Some(ApiErrorKind::NotFound));
    assert_eq!(err.as_api().and_then(|e| e.detail.as_deref()), Some("Venue not found"));
}

#[tokio::test]
async fn test_network_failure_is_not_an_api_error() {
    let transport = StubTransport::failing(|| TransportError::Other("connection reset".to_string()));
    let client = Client::with_transport(user_config(), transport.clone());

    let err = client.get("users/self", skittles::NO_PARAMS).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Other(_))));
    assert!(err.as_api().is_none());
    assert_eq!(transport.count(), 1, "failed calls are not retried");
}

#[tokio::test]
async fn test_raw_request_returns_body_untouched() {
    let body = r#"{"meta":{"code":200},"response":{"checkin":{"id":"c1"}}}"#;
    let transport = StubTransport::responding(200, body);
    let client = Client::with_transport(user_config(), transport);

    let raw = client.post_raw("checkins/add", [("venueId", "v1")]).await.unwrap();
    assert_eq!(raw, body);
}

#[tokio::test]
async fn test_wrapper_style_member_unwrapping() {
    let transport = StubTransport::responding(
        200,
        r#"{"meta":{"code":200},"response":{"venue":{"id":"4b","name":"Brooklyn Bridge Park"}}}"#,
    );
    let client = Client::with_transport(user_config(), transport.clone());

    let venue = client
        .get("venues/4b", skittles::NO_PARAMS)
        .await
        .and_then(|payload| payload.take("venue"))
        .unwrap();
    assert_eq!(venue.str_at("name"), Some("Brooklyn Bridge Park"));
    assert!(transport.last().url.starts_with("https://api.foursquare.com/v2/venues/4b?"));
}
