//! End-to-end reads of `ibm_is_vpc_address_prefix` against a mocked VPC API

use serde_json::json;
use tfibm::config::Config;
use tfibm::datasource::{read_data_source, Arguments, ReadError};
use tfibm::ibm::client::IbmClient;
use tfibm::lookup::{LookupContext, LookupError};
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATA_SOURCE: &str = "ibm_is_vpc_address_prefix";

fn client_for(server: &MockServer) -> IbmClient {
    let config = Config {
        iam_token: Some("test-token".to_string()),
        vpc_endpoint: Some(server.uri()),
        ..Config::default()
    };
    IbmClient::new(&config).expect("client should build")
}

fn args(pairs: &[(&str, &str)]) -> Arguments {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn prefix_body(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "cidr": "10.240.0.0/18",
        "created_at": "2023-06-01T08:00:00Z",
        "has_subnets": false,
        "href": format!("https://us-south.iaas.cloud.ibm.com/v1/vpcs/r006-main/address_prefixes/{}", id),
        "is_default": true,
        "zone": {
            "href": "https://us-south.iaas.cloud.ibm.com/v1/regions/us-south/zones/us-south-1",
            "name": "us-south-1"
        }
    })
}

/// Mount a two-page VPC listing where `main` only appears on the second page
async fn mount_vpc_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/vpcs"))
        .and(query_param_is_missing("start"))
        .and(query_param("generation", "2"))
        .and(query_param("limit", "50"))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vpcs": [{"id": "r006-other", "name": "other"}],
            "next": {"href": format!("{}/v1/vpcs?limit=50&start=vpc-page-2", server.uri())}
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs"))
        .and(query_param("start", "vpc-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vpcs": [{"id": "r006-main", "name": "main"}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_read_by_names_across_pages() {
    let server = MockServer::start().await;
    mount_vpc_pages(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address_prefixes": [prefix_body("r006-p1", "default-prefix")],
            "next": {"href": format!("{}/v1/vpcs/r006-main/address_prefixes?limit=50&start=ap-2", server.uri())}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes"))
        .and(query_param("start", "ap-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address_prefixes": [prefix_body("r006-p2", "my-prefix")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let attrs = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc_name", "main"), ("address_prefix_name", "my-prefix")]),
    )
    .await
    .expect("read should succeed");

    assert_eq!(attrs["vpc"], "r006-main");
    assert_eq!(attrs["vpc_name"], "main");
    assert_eq!(attrs["address_prefix"], "r006-p2");
    assert_eq!(attrs["address_prefix_name"], "my-prefix");
    assert_eq!(attrs["name"], "my-prefix");
    assert_eq!(attrs["cidr"], "10.240.0.0/18");
    assert_eq!(attrs["created_at"], "2023-06-01T08:00:00Z");
    assert_eq!(attrs["is_default"], true);
    assert_eq!(attrs["has_subnets"], false);
    assert_eq!(attrs["zone"][0]["name"], "us-south-1");
}

#[tokio::test]
async fn test_read_by_ids_skips_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes/r006-p2"))
        .and(query_param("version", tfibm::ibm::client::VPC_API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(prefix_body("r006-p2", "my-prefix")))
        .expect(1)
        .mount(&server)
        .await;

    let attrs = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc", "r006-main"), ("address_prefix", "r006-p2")]),
    )
    .await
    .unwrap();

    assert_eq!(attrs["vpc"], "r006-main");
    assert_eq!(attrs["address_prefix"], "r006-p2");
    assert!(!attrs.contains_key("vpc_name"));
}

#[tokio::test]
async fn test_missing_zone_flattens_to_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes/r006-p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r006-p3",
            "name": "zoneless",
            "cidr": "10.0.0.0/24"
        })))
        .mount(&server)
        .await;

    let attrs = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc", "r006-main"), ("address_prefix", "r006-p3")]),
    )
    .await
    .unwrap();

    assert_eq!(attrs["zone"], json!([]));
    assert!(!attrs.contains_key("created_at"));
    assert!(!attrs.contains_key("is_default"));
}

#[tokio::test]
async fn test_unknown_vpc_name_is_not_found() {
    let server = MockServer::start().await;
    mount_vpc_pages(&server).await;

    let err = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc_name", "missing"), ("address_prefix", "r006-p2")]),
    )
    .await
    .unwrap_err();

    match err {
        ReadError::Lookup(LookupError::NotFound { entity, key }) => {
            assert_eq!(entity, "VPC");
            assert_eq!(key, "missing");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_failure_aborts_without_more_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes"))
        .and(query_param_is_missing("start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "address_prefixes": [prefix_body("r006-p1", "default-prefix")],
            "next": {"href": format!("{}/v1/vpcs/r006-main/address_prefixes?start=ap-2", server.uri())}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes"))
        .and(query_param("start", "ap-2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": [{"code": "internal_error", "message": "Internal error"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc", "r006-main"), ("address_prefix_name", "my-prefix")]),
    )
    .await
    .unwrap_err();

    let ReadError::Lookup(err) = err else {
        panic!("expected a lookup error");
    };
    assert_eq!(err.entity(), "Address Prefix");
    assert_eq!(err.remote().and_then(|r| r.status()), Some(500));
    assert!(err.to_string().contains("list failed"));
}

#[tokio::test]
async fn test_get_404_is_remote_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/vpcs/r006-main/address_prefixes/r006-gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"code": "address_prefix_not_found", "message": "Address prefix not found"}]
        })))
        .mount(&server)
        .await;

    let err = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[("vpc", "r006-main"), ("address_prefix", "r006-gone")]),
    )
    .await
    .unwrap_err();

    let ReadError::Lookup(err) = err else {
        panic!("expected a lookup error");
    };
    assert!(!err.is_not_found());
    assert_eq!(err.remote().and_then(|r| r.status()), Some(404));
    assert!(err.to_string().contains("address_prefix_not_found"));
}

#[tokio::test]
async fn test_both_vpc_arguments_rejected() {
    let server = MockServer::start().await;

    let err = read_data_source(
        DATA_SOURCE,
        &client_for(&server),
        &LookupContext::new(),
        &args(&[
            ("vpc", "r006-main"),
            ("vpc_name", "main"),
            ("address_prefix", "r006-p2"),
        ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ReadError::Schema(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
