//! Tests for CLI parsing and the test-delivery command.

use super::*;
use clap::CommandFactory;
use stock_ledger_core::event::InventoryChangeEvent;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_cli_structure_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_register_parses_name_and_url() {
    let cli = Cli::try_parse_from([
        "stock-ledger",
        "register",
        "--name",
        "Inventory Change",
        "--url",
        "https://example.com/webhooks/shiphero",
    ])
    .unwrap();

    match cli.command {
        Commands::Register { name, url } => {
            assert_eq!(name, "Inventory Change");
            assert_eq!(url, "https://example.com/webhooks/shiphero");
        }
        _ => panic!("expected register command"),
    }
}

#[test]
fn test_global_endpoint_defaults() {
    let cli = Cli::try_parse_from(["stock-ledger", "list"]).unwrap();
    assert_eq!(cli.api_url, "https://public-api.shiphero.com/graphql");
    assert_eq!(
        cli.auth_url,
        "https://public-api.shiphero.com/auth/refresh"
    );
}

#[test]
fn test_send_test_parses_inline_payload() {
    let cli = Cli::try_parse_from([
        "stock-ledger",
        "send-test",
        "--url",
        "http://localhost:8080/webhooks/shiphero",
        "--secret",
        "s3cret",
        "--payload",
        r#"{"webhook_type":"Inventory Change"}"#,
    ])
    .unwrap();

    match cli.command {
        Commands::SendTest { payload, .. } => {
            assert!(payload.unwrap().contains("Inventory Change"));
        }
        _ => panic!("expected send-test command"),
    }
}

#[test]
fn test_missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["stock-ledger"]).is_err());
}

#[tokio::test]
async fn test_api_commands_require_a_token() {
    let cli = Cli {
        refresh_token: None,
        api_url: "https://public-api.shiphero.com/graphql".to_string(),
        auth_url: "https://public-api.shiphero.com/auth/refresh".to_string(),
        command: Commands::List,
    };

    let err = execute(cli).await.unwrap_err();
    assert!(matches!(err, CliError::MissingToken));
}

#[test]
fn test_sample_payload_builds_a_valid_event() {
    let payload: serde_json::Value = serde_json::from_str(&sample_payload()).unwrap();
    let event = InventoryChangeEvent::from_payload(&payload).unwrap();
    assert_eq!(event.sku.as_str(), "TEST-SKU-1");
    assert_eq!(event.delta, Some(1));
}

#[tokio::test]
async fn test_send_test_delivers_a_correctly_signed_body() {
    let server = MockServer::start().await;
    let body = sample_payload();
    Mock::given(method("POST"))
        .and(path("/webhooks/shiphero"))
        .and(header(
            "x-shiphero-hmac-sha256",
            compute_signature("s3cret", body.as_bytes()).as_str(),
        ))
        .and(body_string(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200",
            "Status": "Success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/webhooks/shiphero", server.uri());
    execute_send_test(&url, "s3cret", None).await.unwrap();
}

#[tokio::test]
async fn test_send_test_surfaces_a_rejected_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhooks/shiphero"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "401",
            "Status": "Invalid signature"
        })))
        .mount(&server)
        .await;

    let url = format!("{}/webhooks/shiphero", server.uri());
    let err = execute_send_test(&url, "wrong", None).await.unwrap_err();
    assert!(matches!(err, CliError::DeliveryFailed { .. }));
}

#[tokio::test]
async fn test_send_test_rejects_malformed_payload_before_sending() {
    let err = execute_send_test("http://localhost:1/unreachable", "s", Some("{not json"))
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument { .. }));
}
