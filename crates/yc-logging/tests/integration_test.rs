// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use chrono::Utc;
use mockito::{Matcher, Server};
use serde_json::json;
use yc_logging::event::{Event, RecordKey};
use yc_logging::{HostStatus, PluginHost, PluginId};

const WRITE_PATH: &str = "/logging/v1/write";

fn plugin_source(endpoint_url: &str) -> HashMap<String, String> {
    let key_path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/test_private.pem");
    [
        ("endpoint_url", endpoint_url),
        ("log_group_id", "test_log_group_id"),
        ("resource_id", "test_resource_id"),
        ("resource_type", "test_resource_type"),
        ("key_id", "test_key_id"),
        ("service_account_id", "test_service_account_id"),
        ("private_key_file_path", key_path),
        ("log_level_key", "log_level"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn events(count: usize) -> Vec<Event> {
    (0..count)
        .map(|n| {
            Event::from_raw(
                Utc::now(),
                vec![
                    (RecordKey::from("log_level"), json!("ERROR")),
                    (RecordKey::from(b"message".to_vec()), json!(format!("event {n}"))),
                    (RecordKey::from("n"), json!(n)),
                    (RecordKey::Int(1), json!("dropped key")),
                ],
                "app.logs",
            )
        })
        .collect()
}

fn jwt_bearer() -> Matcher {
    Matcher::Regex(r"^Bearer [\w-]+\.[\w-]+\.[\w-]+$".to_string())
}

fn buffered(host: &PluginHost, id: PluginId) -> usize {
    host.registry()
        .get(id)
        .map(|plugin| plugin.blocking_lock().len())
        .unwrap_or_default()
}

#[test]
fn host_flush_ships_events_over_http() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", WRITE_PATH)
        .match_header("authorization", jwt_bearer())
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "destination": {"logGroupId": "test_log_group_id"},
                "resource": {"id": "test_resource_id", "type": "test_resource_type"},
            })),
            Matcher::Regex(r#""level":"ERROR","message":"event 2","jsonPayload":\{"n":2\}"#.to_string()),
        ]))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create();

    let host = PluginHost::new().unwrap();
    let (status, id) = host.init(&plugin_source(&server.url()));
    assert_eq!(status, HostStatus::Ok);
    let id = id.unwrap();

    assert_eq!(host.flush(id, events(3)), HostStatus::Ok);

    mock.assert();
    assert_eq!(buffered(&host, id), 0);
    assert_eq!(host.exit(), HostStatus::Ok);
}

#[test]
fn failed_flush_is_retried_with_the_same_events() {
    let mut server = Server::new();
    let failing = server
        .mock("POST", WRITE_PATH)
        .with_status(503)
        .with_body("ingestion unavailable")
        .expect(1)
        .create();

    let host = PluginHost::new().unwrap();
    let (_, id) = host.init(&plugin_source(&server.url()));
    let id = id.unwrap();

    assert_eq!(host.flush(id, events(4)), HostStatus::Retry);
    failing.assert();
    assert_eq!(buffered(&host, id), 4);
    failing.remove();

    let succeeding = server
        .mock("POST", WRITE_PATH)
        .match_body(Matcher::Regex(r#""message":"event 3""#.to_string()))
        .with_status(200)
        .expect(1)
        .create();

    assert_eq!(host.flush(id, Vec::new()), HostStatus::Ok);
    succeeding.assert();
    assert_eq!(buffered(&host, id), 0);
}

#[test]
fn instances_keep_separate_buffers() {
    let mut server = Server::new();
    server.mock("POST", WRITE_PATH).with_status(500).create();

    let host = PluginHost::new().unwrap();
    let (_, first) = host.init(&plugin_source(&server.url()));
    let (_, second) = host.init(&plugin_source(&server.url()));
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_ne!(first, second);

    assert_eq!(host.flush(first, events(2)), HostStatus::Retry);
    assert_eq!(host.flush(second, events(5)), HostStatus::Retry);

    assert_eq!(buffered(&host, first), 2);
    assert_eq!(buffered(&host, second), 5);
}

#[test]
fn iam_exchange_token_is_used_as_bearer() {
    let mut server = Server::new();
    let exchange = server
        .mock("POST", "/iam/v1/tokens")
        .match_body(Matcher::Regex(r#"^\{"jwt":"[\w-]+\.[\w-]+\.[\w-]+"\}$"#.to_string()))
        .with_status(200)
        .with_body(r#"{"iamToken":"t1.exchanged","expiresAt":"2099-01-01T00:00:00Z"}"#)
        .expect(1)
        .create();
    let write = server
        .mock("POST", WRITE_PATH)
        .match_header("authorization", "Bearer t1.exchanged")
        .match_body(Matcher::PartialJson(json!({"destination": {"folderId": "test_folder_id"}})))
        .with_status(200)
        .expect(2)
        .create();

    let mut source = plugin_source(&server.url());
    source.remove("log_group_id");
    source.insert("folder_id".into(), "test_folder_id".into());
    source.insert("iam_token_exchange".into(), "true".into());
    source.insert("iam_endpoint_url".into(), format!("{}/iam/v1/tokens", server.url()));

    let host = PluginHost::new().unwrap();
    let (_, id) = host.init(&source);
    let id = id.unwrap();

    assert_eq!(host.flush(id, events(1)), HostStatus::Ok);
    assert_eq!(host.flush(id, events(1)), HostStatus::Ok);

    exchange.assert();
    write.assert();
}

#[test]
fn invalid_configuration_is_an_error() {
    let mut source = plugin_source("http://127.0.0.1:1");
    source.remove("log_group_id");

    let host = PluginHost::new().unwrap();

    assert_eq!(host.init(&source), (HostStatus::Error, None));
    assert_eq!(host.flush(PluginId(0), events(1)), HostStatus::Error);
}
