#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn catalog_json(id: &str, title: Option<&str>, children: &[&str], items: &[&str]) -> Value {
    let mut links = vec![json!({"rel": "self", "href": "./catalog.json"})];
    links.extend(
        children
            .iter()
            .map(|href| json!({"rel": "child", "href": href, "type": "application/json"})),
    );
    links.extend(
        items
            .iter()
            .map(|href| json!({"rel": "item", "href": href, "type": "application/geo+json"})),
    );
    let mut catalog = json!({
        "type": "Catalog",
        "stac_version": "1.0.0",
        "id": id,
        "description": "test catalog",
        "links": links,
    });
    if let Some(title) = title {
        catalog["title"] = json!(title);
    }
    catalog
}

pub fn item_json(id: &str, self_href: &str, parent_href: &str) -> Value {
    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "stac_extensions": [],
        "id": id,
        "geometry": {"type": "Point", "coordinates": [10.0, 20.0]},
        "bbox": [10.0, 20.0, 10.0, 20.0],
        "properties": {"datetime": "2021-06-01T12:00:00Z"},
        "links": [
            {"rel": "self", "href": self_href},
            {"rel": "parent", "href": parent_href}
        ],
        "assets": {}
    })
}

pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn read_lines(path: &camino::Utf8Path) -> Vec<String> {
    std::fs::read_to_string(path.as_std_path())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
