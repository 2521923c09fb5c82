//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port (fresh state), then
//! drives the real `Client` over HTTP through `UreqTransport`. This checks
//! URL composition, authentication, pagination and error classification
//! against an actual server rather than canned responses.

use std::time::Duration;

use crm_core::{
    ApiError, Client, ClientConfig, CompanyInput, CompanyProperties, HttpMethod, PageCursor,
    Timeouts,
};
use mock_server::{TEST_API_KEY, TEST_OAUTH_TOKEN};
use serde_json::Value;

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn api_key_client(host: &str) -> Client {
    Client::new(ClientConfig::new(host).with_api_key(TEST_API_KEY))
}

fn company(name: &str) -> CompanyInput {
    CompanyInput {
        properties: CompanyProperties {
            name: Some(name.to_string()),
            ..Default::default()
        },
    }
}

#[test]
fn companies_crud_lifecycle() {
    let host = start_server();
    let client = api_key_client(&host);
    let companies = client.companies();

    // Step 1: list — should be empty.
    let page = companies.list(&PageCursor::First).unwrap();
    assert!(page.results.is_empty(), "expected empty list");
    assert!(page.next_page().is_none());

    // Step 2: create; every field sent comes back.
    let input = CompanyInput {
        properties: CompanyProperties {
            name: Some("Acme".to_string()),
            domain: Some("acme.example".to_string()),
            description: Some("Anvils".to_string()),
            ..Default::default()
        },
    };
    let created = companies.create(&input).unwrap();
    assert_eq!(created.properties.name, input.properties.name);
    assert_eq!(created.properties.domain, input.properties.domain);
    assert_eq!(created.properties.description, input.properties.description);
    assert_eq!(created.properties.hs_object_id.as_deref(), Some(created.id.as_str()));
    let id = created.id.clone();

    // Step 3: get.
    let fetched = companies.get(&id).unwrap();
    assert_eq!(fetched, created);

    // Step 4: partial update.
    let patch = CompanyInput {
        properties: CompanyProperties {
            description: Some("Rockets".to_string()),
            ..Default::default()
        },
    };
    let updated = companies.update(&id, &patch).unwrap();
    assert_eq!(updated.properties.name.as_deref(), Some("Acme"));
    assert_eq!(updated.properties.description.as_deref(), Some("Rockets"));

    // Step 5: delete (204, no body).
    companies.delete(&id).unwrap();

    // Step 6: get after delete — 404 with the service's error body.
    let err = companies.get(&id).unwrap_err();
    assert!(err.is_not_found());
    let body = err.error_response().expect("JSON error body");
    assert_eq!(body.category.as_deref(), Some("OBJECT_NOT_FOUND"));

    // Step 7: delete again — still 404.
    assert!(companies.delete(&id).unwrap_err().is_not_found());
}

#[test]
fn pagination_links_are_followed_on_configured_host() {
    let host = start_server();
    let client = api_key_client(&host);
    let companies = client.companies();
    for i in 0..12 {
        companies.create(&company(&format!("company-{i}"))).unwrap();
    }

    // The service writes its public host into the link; the follow-up
    // request must still reach the mock server.
    let first = companies.list(&PageCursor::First).unwrap();
    assert_eq!(first.results.len(), 10);
    let link = first.next_page().unwrap().link.clone().unwrap();
    assert!(link.starts_with("https://api.hubapi.com/"));

    let second = companies
        .list(&PageCursor::next_from(&first).unwrap())
        .unwrap();
    assert_eq!(second.results.len(), 2);
    assert!(second.next_page().is_none());

    let all = companies.list_all().unwrap();
    assert_eq!(all.len(), 12);
    assert_eq!(all[11].properties.name.as_deref(), Some("company-11"));
}

#[test]
fn fragment_cursor_adds_query() {
    let host = start_server();
    let client = api_key_client(&host);
    let companies = client.companies();
    for i in 0..6 {
        companies.create(&company(&format!("c{i}"))).unwrap();
    }

    let page = companies
        .list(&PageCursor::Fragment("?limit=4&after=1".to_string()))
        .unwrap();
    let ids: Vec<&str> = page.results.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["2", "3", "4", "5"]);
    assert_eq!(page.next_page().unwrap().after, "5");
}

#[test]
fn api_key_takes_precedence_over_token() {
    let host = start_server();
    let client = Client::new(
        ClientConfig::new(&host)
            .with_api_key("key-1")
            .with_oauth_token("token-1"),
    );

    let echo: Value = client.request(HttpMethod::Get, "/__echo?b=2&a=1").unwrap();
    assert_eq!(echo["query"]["hapikey"], "key-1");
    assert_eq!(echo["query"]["a"], "1");
    assert_eq!(echo["query"]["b"], "2");
    assert!(echo["authorization"].is_null());
}

#[test]
fn oauth_token_goes_in_bearer_header() {
    let host = start_server();
    let client = Client::new(ClientConfig::new(&host).with_oauth_token(TEST_OAUTH_TOKEN));

    let echo: Value = client
        .request_with(HttpMethod::Post, "/__echo", &serde_json::json!({"k": 1}))
        .unwrap();
    assert_eq!(echo["authorization"], format!("Bearer {TEST_OAUTH_TOKEN}"));
    assert!(echo["query"].get("hapikey").is_none());
    assert_eq!(echo["contentType"], "application/json");
    assert_eq!(echo["body"], r#"{"k":1}"#);

    // The token is accepted by the authenticated routes too.
    assert!(client.companies().list(&PageCursor::First).is_ok());
}

#[test]
fn oauth_request_never_carries_api_key() {
    let host = start_server();
    let client = Client::new(
        ClientConfig::new(&format!("{host}/?hapikey=from-host")).with_oauth_token(TEST_OAUTH_TOKEN),
    );

    let echo: Value = client
        .request(HttpMethod::Get, "/__echo?after=1&hapikey=from-link")
        .unwrap();
    assert_eq!(echo["authorization"], format!("Bearer {TEST_OAUTH_TOKEN}"));
    assert_eq!(echo["query"], serde_json::json!({"after": "1"}));
}

#[test]
fn missing_credentials_surface_unauthorized() {
    let host = start_server();
    let client = Client::new(ClientConfig::new(&host));

    let err = client.companies().list(&PageCursor::First).unwrap_err();
    assert_eq!(err.status(), Some(401));
    let body = err.error_response().unwrap();
    assert_eq!(body.category.as_deref(), Some("INVALID_AUTHENTICATION"));
}

#[test]
fn non_json_body_is_decode_error() {
    let host = start_server();
    let client = api_key_client(&host);

    let err = client
        .request::<Value>(HttpMethod::Get, "/__not_json")
        .unwrap_err();
    match err {
        ApiError::Decode { body, url, .. } => {
            assert!(body.contains("maintenance"));
            assert!(url.contains("hapikey=REDACTED"));
        }
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[test]
fn unknown_route_is_status_error() {
    let host = start_server();
    let client = api_key_client(&host);

    let err = client
        .request::<Value>(HttpMethod::Get, "/crm/v3/objects/nothing-here")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn total_timeout_is_transport_error() {
    let host = start_server();
    let client = Client::new(ClientConfig::new(&host).with_timeouts(Timeouts {
        total: Duration::from_millis(200),
        connect: Duration::from_millis(200),
        tls: Duration::from_millis(200),
    }));

    let err = client
        .request::<Value>(HttpMethod::Get, "/__delay/2000")
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
}

#[test]
fn refused_connection_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = api_key_client(&format!("http://{addr}"));
    let err = client.companies().get("1").unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
}

#[test]
fn concurrent_calls_share_one_client() {
    let host = start_server();
    let client = api_key_client(&host);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let client = &client;
            scope.spawn(move || {
                client
                    .companies()
                    .create(&company(&format!("parallel-{i}")))
                    .unwrap();
            });
        }
    });

    let all = client.companies().list_all().unwrap();
    assert_eq!(all.len(), 8);
}
