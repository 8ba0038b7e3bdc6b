//! Shared fixtures for integration tests

#![allow(dead_code)]

use search_gateway::backend::InMemoryBackend;
use search_gateway::search::IndexSettings;
use serde_json::{json, Value};

/// A few supply/demand listings
pub fn supply_demand_documents() -> Vec<Value> {
    vec![
        json!({
            "id": "sd-1",
            "title": "求购瓦楞纸箱",
            "category": "瓦楞纸箱",
            "quantity": 5000,
            "areaName": "天元区",
            "companyName": "测试有限公司",
            "createdAt": "2025-09-09T07:43:16.910Z"
        }),
        json!({
            "id": "sd-2",
            "title": "供应包装盒",
            "category": "包装盒",
            "quantity": 800,
            "areaName": "芦淞区",
            "companyName": "示例包装厂",
            "createdAt": "2025-09-08T02:00:00.000Z"
        }),
        json!({
            "id": "sd-3",
            "title": "纸箱批发",
            "category": "瓦楞纸箱",
            "quantity": 1200,
            "areaName": "天元区",
            "companyName": "示例包装厂",
            "createdAt": "2025-09-07T12:30:00.000Z"
        }),
    ]
}

/// Settings declared for the supply_demands index
pub fn supply_demand_settings() -> IndexSettings {
    serde_json::from_value(json!({
        "searchableAttributes": ["title", "category", "companyName", "areaName"],
        "filterableAttributes": ["category", "areaName", "companyName", "quantity", "createdAt"],
        "sortableAttributes": ["createdAt", "quantity"],
        "displayedAttributes": ["*"],
        "synonyms": {"纸箱": ["瓦楞纸箱", "包装盒"]}
    }))
    .unwrap()
}

/// In-memory backend holding `supply_demands` and an empty `policies` index
pub fn seeded_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_documents("supply_demands", supply_demand_documents())
        .with_documents("policies", vec![])
}

/// Extract metric lines for a metric name from Prometheus exposition output
pub fn metric_lines<'a>(output: &'a str, name: &str) -> Vec<&'a str> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && line.starts_with(name))
        .collect()
}
