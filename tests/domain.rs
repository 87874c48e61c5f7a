use assert_matches::assert_matches;

use stac_harvester::domain::{CatalogRef, RecordLink};
use stac_harvester::error::HarvestError;

#[test]
fn http_catalog_uri_is_kept_verbatim() {
    let catalog: CatalogRef = "https://stac.example.com/root/catalog.json".parse().unwrap();
    assert_eq!(catalog.as_str(), "https://stac.example.com/root/catalog.json");
    assert_eq!(catalog.as_url().scheme(), "https");
}

#[test]
fn filesystem_path_becomes_absolute_file_url() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("catalog.json");
    let catalog: CatalogRef = path.to_str().unwrap().parse().unwrap();

    assert_eq!(catalog.as_url().scheme(), "file");
    assert_eq!(catalog.as_url().to_file_path().unwrap(), path);
}

#[test]
fn relative_path_is_made_absolute() {
    let catalog: CatalogRef = "data/catalog.json".parse().unwrap();
    let path = catalog.as_url().to_file_path().unwrap();

    assert!(path.is_absolute());
    assert!(path.ends_with("data/catalog.json"));
}

#[test]
fn unsupported_or_blank_locations_are_rejected() {
    assert_matches!(
        "ftp://stac.example.com/catalog.json".parse::<CatalogRef>(),
        Err(HarvestError::InvalidUri(_))
    );
    assert_matches!("".parse::<CatalogRef>(), Err(HarvestError::InvalidUri(_)));
    assert_matches!(
        "mailto:someone@example.com".parse::<RecordLink>(),
        Err(HarvestError::InvalidUri(_))
    );
}

#[test]
fn record_links_display_as_urls() {
    let link: RecordLink = "http://localhost:8080/items/a.json".parse().unwrap();
    assert_eq!(link.to_string(), "http://localhost:8080/items/a.json");
}
