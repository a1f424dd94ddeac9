//! Integration tests for `SheetsClient` using wiremock HTTP mocks.

use cmt_core::AllowListProvider;
use cmt_sheets::{SheetsAllowList, SheetsClient, SheetsError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SPREADSHEET: &str = "sheet123";
const METADATA_PATH: &str = "/v4/spreadsheets/sheet123";
const HEADER_PATH: &str = "/v4/spreadsheets/sheet123/values/%27Coupons%27%211%3A1";
const COLUMN_B_PATH: &str = "/v4/spreadsheets/sheet123/values/%27Coupons%27%21B2%3AB";

fn test_client(base_url: &str) -> SheetsClient {
    SheetsClient::with_base_url(SPREADSHEET, "test-key", 30, base_url)
        .expect("client construction should not fail")
        .with_retry(3, 0)
}

fn metadata_body() -> serde_json::Value {
    serde_json::json!({
        "sheets": [
            { "properties": { "sheetId": 0, "title": "Coupons" } },
            { "properties": { "sheetId": 812, "title": "Archive" } }
        ]
    })
}

async fn mount_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .and(query_param("fields", "sheets.properties"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
        .mount(server)
        .await;
}

async fn mount_header(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(HEADER_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "Coupons!A1:Z1",
            "majorDimension": "ROWS",
            "values": [["Product", "Coupon", "Notes"]]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sheet_title_resolves_gid() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let client = test_client(&server.uri());
    assert_eq!(
        client.sheet_title_by_gid(812).await.unwrap().as_deref(),
        Some("Archive")
    );
    assert_eq!(client.sheet_title_by_gid(5).await.unwrap(), None);
}

#[tokio::test]
async fn get_coupons_reads_trimmed_column_values() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;
    mount_header(&server).await;

    Mock::given(method("GET"))
        .and(path(COLUMN_B_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "Coupons!B2:B1000",
            "values": [[" SAVE10 "], [], [""], ["NEW20"], [2024]]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let coupons = client.get_coupons(0, "Coupon").await.expect("should read coupons");

    assert_eq!(coupons, vec!["SAVE10", "NEW20", "2024"]);
}

#[tokio::test]
async fn empty_column_yields_no_coupons() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;
    mount_header(&server).await;

    Mock::given(method("GET"))
        .and(path(COLUMN_B_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "range": "Coupons!B2:B1000" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let coupons = client.get_coupons(0, "Coupon").await.unwrap();
    assert!(coupons.is_empty());
}

#[tokio::test]
async fn unknown_gid_is_sheet_not_found() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let client = test_client(&server.uri());
    let err = client.get_coupons(99, "Coupon").await.unwrap_err();

    assert!(matches!(err, SheetsError::SheetNotFound(99)));
}

#[tokio::test]
async fn missing_header_is_column_not_found() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;
    mount_header(&server).await;

    let client = test_client(&server.uri());
    let err = client.get_coupons(0, "Code").await.unwrap_err();

    match err {
        SheetsError::ColumnNotFound { column, sheet } => {
            assert_eq!(column, "Code");
            assert_eq!(sheet, "Coupons");
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn metadata_is_fetched_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.sheet_title_by_gid(0).await.unwrap();
    client.sheet_title_by_gid(812).await.unwrap();
    client.sheet_title_by_gid(0).await.unwrap();
}

#[tokio::test]
async fn api_error_surfaces_google_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "The caller does not have permission",
                "status": "PERMISSION_DENIED"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.sheet_title_by_gid(0).await.unwrap_err();

    match err {
        SheetsError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "The caller does not have permission");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn retries_server_error_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_metadata(&server).await;

    let client = test_client(&server.uri());
    let title = client.sheet_title_by_gid(0).await.unwrap();
    assert_eq!(title.as_deref(), Some("Coupons"));
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(METADATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.sheet_title_by_gid(0).await.unwrap_err();
    assert!(matches!(err, SheetsError::Deserialize { .. }));
}

#[tokio::test]
async fn allow_list_maps_errors_to_port_error() {
    let server = MockServer::start().await;
    mount_metadata(&server).await;

    let allow_list = SheetsAllowList::new(test_client(&server.uri()), 42, "Coupon");
    let err = allow_list.tracked_coupons().await.unwrap_err();

    assert_eq!(err.context, "google sheets");
    assert!(err.to_string().contains("sheet with gid 42 not found"));
}
