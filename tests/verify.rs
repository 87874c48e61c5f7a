mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Value, json};

use stac_harvester::config::HarvestConfig;
use stac_harvester::error::HarvestError;
use stac_harvester::fetch::HttpRecordFetcher;
use stac_harvester::verify::{CountStatus, CountVerifier};

use common::{catalog_json, item_json, mount_json};

fn write_ndjson(temp: &tempfile::TempDir, lines: &[Value]) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(temp.path().join("Demo.json")).unwrap();
    let content = lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect::<String>();
    std::fs::write(&path, content).unwrap();
    path
}

async fn demo_catalog(server: &wiremock::MockServer) {
    mount_json(
        server,
        "/catalog.json",
        catalog_json("demo", Some("Demo"), &[], &["./A.json", "./B.json", "./C.json"]),
    )
    .await;
}

fn items(server: &wiremock::MockServer, ids: &[&str]) -> Vec<Value> {
    ids.iter()
        .map(|id| {
            item_json(
                id,
                &format!("{}/{id}.json", server.uri()),
                "./catalog.json",
            )
        })
        .collect()
}

#[tokio::test]
async fn matching_counts_report_ok() {
    let server = wiremock::MockServer::start().await;
    demo_catalog(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let file = write_ndjson(&temp, &items(&server, &["A", "B", "C"]));

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let report = CountVerifier::new(&fetcher).verify(&file).await.unwrap();

    assert_eq!(report.status, CountStatus::Ok);
    assert_eq!((report.item_count, report.line_count), (3, 3));
    assert_eq!(report.catalog, format!("{}/catalog.json", server.uri()));
}

#[tokio::test]
async fn short_file_reports_mismatch() {
    let server = wiremock::MockServer::start().await;
    demo_catalog(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let file = write_ndjson(&temp, &items(&server, &["A", "B"]));

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let report = CountVerifier::new(&fetcher).verify(&file).await.unwrap();

    assert_eq!(report.status, CountStatus::Mismatch);
    assert_eq!((report.item_count, report.line_count), (3, 2));
    assert_eq!(report.status.to_string(), "MISMATCH");
}

#[tokio::test]
async fn absolute_parent_link_needs_no_self_link() {
    let server = wiremock::MockServer::start().await;
    demo_catalog(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let mut item = item_json("A", "unused", &format!("{}/catalog.json", server.uri()));
    item["links"] = serde_json::json!([
        {"rel": "parent", "href": format!("{}/catalog.json", server.uri())}
    ]);
    let file = write_ndjson(&temp, &[item]);

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let report = CountVerifier::new(&fetcher).verify(&file).await.unwrap();

    assert_eq!((report.item_count, report.line_count), (3, 1));
}

#[tokio::test]
async fn records_outside_the_item_schema_still_verify() {
    let server = wiremock::MockServer::start().await;
    demo_catalog(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let mut without_bbox = items(&server, &["A"]).remove(0);
    without_bbox.as_object_mut().unwrap().remove("bbox");
    let bare = json!({
        "id": "B",
        "links": [{"rel": "parent", "href": format!("{}/catalog.json", server.uri())}]
    });

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    for first in [without_bbox, bare] {
        let file = write_ndjson(&temp, &[first, json!({"id": "next"})]);
        let report = CountVerifier::new(&fetcher).verify(&file).await.unwrap();
        assert_eq!((report.item_count, report.line_count), (3, 2));
        assert_eq!(report.status, CountStatus::Mismatch);
    }
}

#[tokio::test]
async fn trailing_line_without_newline_is_counted() {
    let server = wiremock::MockServer::start().await;
    demo_catalog(&server).await;
    let temp = tempfile::tempdir().unwrap();
    let file = write_ndjson(&temp, &items(&server, &["A", "B", "C"]));
    let content = std::fs::read_to_string(&file).unwrap();
    std::fs::write(&file, content.trim_end()).unwrap();

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let report = CountVerifier::new(&fetcher).verify(&file).await.unwrap();

    assert_eq!(report.line_count, 3);
    assert_eq!(report.status, CountStatus::Ok);
}

#[tokio::test]
async fn undecodable_first_line_is_a_decode_error() {
    let temp = tempfile::tempdir().unwrap();
    let file = Utf8PathBuf::from_path_buf(temp.path().join("broken.json")).unwrap();
    std::fs::write(&file, "{not json\n").unwrap();

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let err = CountVerifier::new(&fetcher).verify(&file).await.unwrap_err();

    assert_matches!(err, HarvestError::Decode { .. });
}

#[tokio::test]
async fn empty_file_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let file = write_ndjson(&temp, &[]);

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let err = CountVerifier::new(&fetcher).verify(&file).await.unwrap_err();

    assert_matches!(err, HarvestError::EmptyFile(_));
}

#[tokio::test]
async fn item_without_parent_is_unresolvable() {
    let temp = tempfile::tempdir().unwrap();
    let mut item = item_json("A", "https://stac.example.com/A.json", "unused");
    item["links"] = serde_json::json!([]);
    let file = write_ndjson(&temp, &[item]);

    let fetcher = HttpRecordFetcher::new(&HarvestConfig::default()).unwrap();
    let err = CountVerifier::new(&fetcher).verify(&file).await.unwrap_err();

    assert_matches!(err, HarvestError::Resolution(_));
}
