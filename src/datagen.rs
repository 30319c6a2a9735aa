//! Synthetic payload generators.
//!
//! Stateless named templates producing freshly randomized values on every
//! call. Reachable programmatically via [`generate`] and from route files
//! through the `data_template` body type.

use crate::error::{MockError, Result};
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

/// Template names accepted by [`generate`].
pub const TEMPLATE_NAMES: [&str; 5] = ["user", "product", "article", "list", "error"];

const FIRST_NAMES: [&str; 12] = [
    "Alice", "Bruno", "Carmen", "Derek", "Elena", "Felix", "Grace", "Hugo", "Irene", "Jonas",
    "Katya", "Liam",
];

const LAST_NAMES: [&str; 10] = [
    "Meyer", "Novak", "Ortiz", "Park", "Quinn", "Rossi", "Silva", "Tanaka", "Urban", "Vogel",
];

const PRODUCT_ADJECTIVES: [&str; 8] = [
    "Compact", "Deluxe", "Eco", "Foldable", "Heavy-Duty", "Portable", "Smart", "Wireless",
];

const PRODUCT_NOUNS: [&str; 8] = [
    "Lamp", "Speaker", "Backpack", "Kettle", "Monitor", "Keyboard", "Charger", "Tripod",
];

const ARTICLE_TOPICS: [&str; 6] = [
    "Caching Strategies",
    "API Versioning",
    "Error Budgets",
    "Schema Migrations",
    "Feature Flags",
    "Load Testing",
];

const WORDS: [&str; 16] = [
    "system", "request", "service", "latency", "deploy", "client", "payload", "budget", "traffic",
    "release", "rollout", "metric", "contract", "timeout", "gateway", "backend",
];

/// Generate a version-4-shaped UUID string.
pub fn random_uuid() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        rng.gen::<u32>(),
        rng.gen::<u16>(),
        rng.gen::<u16>() & 0x0fff,
        (rng.gen::<u16>() & 0x3fff) | 0x8000,
        rng.gen::<u64>() & 0xffff_ffff_ffff,
    )
}

/// Generate `count` values from the named template.
///
/// `count == 1` yields a single value, larger counts an array of
/// independently generated values.
pub fn generate(name: &str, count: usize) -> Result<Value> {
    let generator = match name {
        "user" => user,
        "product" => product,
        "article" => article,
        "list" => list,
        "error" => error,
        _ => return Err(MockError::TemplateNotFound(name.to_string())),
    };

    if count <= 1 {
        Ok(generator())
    } else {
        Ok(Value::Array((0..count).map(|_| generator()).collect()))
    }
}

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
}

fn sentence() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(6..12);
    let words: Vec<&str> = (0..len).map(|_| pick(&WORDS)).collect();
    let mut s = words.join(" ");
    if let Some(head) = s.get_mut(0..1) {
        head.make_ascii_uppercase();
    }
    s.push('.');
    s
}

fn past_timestamp() -> String {
    let mut rng = rand::thread_rng();
    let offset = Duration::seconds(rng.gen_range(0..365 * 24 * 3600));
    (Utc::now() - offset).to_rfc3339()
}

fn user() -> Value {
    let mut rng = rand::thread_rng();
    let first = pick(&FIRST_NAMES);
    let last = pick(&LAST_NAMES);
    json!({
        "id": random_uuid(),
        "name": format!("{} {}", first, last),
        "email": format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        "age": rng.gen_range(18..75),
        "active": rng.gen_bool(0.8),
        "created_at": past_timestamp(),
    })
}

fn product() -> Value {
    let mut rng = rand::thread_rng();
    let price = rng.gen_range(100..100_000) as f64 / 100.0;
    json!({
        "id": random_uuid(),
        "name": format!("{} {}", pick(&PRODUCT_ADJECTIVES), pick(&PRODUCT_NOUNS)),
        "sku": format!("SKU-{:06}", rng.gen_range(0..1_000_000)),
        "price": price,
        "currency": "USD",
        "stock": rng.gen_range(0..500),
    })
}

fn article() -> Value {
    let mut rng = rand::thread_rng();
    let paragraphs: Vec<String> = (0..rng.gen_range(2..5))
        .map(|_| {
            (0..rng.gen_range(2..5))
                .map(|_| sentence())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    json!({
        "id": random_uuid(),
        "title": format!("Notes on {}", pick(&ARTICLE_TOPICS)),
        "summary": sentence(),
        "paragraphs": paragraphs,
        "author": format!("{} {}", pick(&FIRST_NAMES), pick(&LAST_NAMES)),
        "published_at": past_timestamp(),
    })
}

fn list() -> Value {
    let mut rng = rand::thread_rng();
    let page_size = rng.gen_range(5..20);
    let total = rng.gen_range(page_size..page_size * 10);
    let items: Vec<Value> = (0..page_size)
        .map(|i| {
            json!({
                "id": i + 1,
                "label": format!("{}-{}", pick(&WORDS), rng.gen_range(100..1000)),
                "value": rng.gen_range(0..10_000),
            })
        })
        .collect();
    json!({
        "total": total,
        "page": 1,
        "page_size": page_size,
        "items": items,
    })
}

fn error() -> Value {
    const CODES: [(u16, &str, &str); 5] = [
        (400, "bad_request", "The request could not be understood"),
        (401, "unauthorized", "Authentication required"),
        (404, "not_found", "The requested resource does not exist"),
        (429, "too_many_requests", "Rate limit exceeded"),
        (500, "internal_error", "An unexpected error occurred"),
    ];
    let (code, slug, message) = CODES[rand::thread_rng().gen_range(0..CODES.len())];
    json!({
        "code": code,
        "error": slug,
        "message": message,
        "request_id": random_uuid(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_shape() {
        let id = random_uuid();
        assert_eq!(id.len(), 36);
        let dashes: Vec<usize> = id
            .char_indices()
            .filter(|(_, c)| *c == '-')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(dashes, vec![8, 13, 18, 23]);
        assert_eq!(id.chars().nth(14), Some('4'));
    }

    #[test]
    fn test_user_template_fields() {
        let value = generate("user", 1).unwrap();
        assert!(value["id"].is_string());
        assert!(value["name"].is_string());
        assert!(value["email"].as_str().unwrap().contains('@'));
        assert!(value["age"].is_u64());
    }

    #[test]
    fn test_count_produces_independent_values() {
        let value = generate("user", 5).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 5);
        let first_id = items[0]["id"].as_str().unwrap();
        // Independent generation: at least one other id differs
        assert!(items.iter().skip(1).any(|v| v["id"] != first_id));
    }

    #[test]
    fn test_list_template_is_consistent() {
        let value = generate("list", 1).unwrap();
        let page_size = value["page_size"].as_u64().unwrap();
        assert_eq!(value["items"].as_array().unwrap().len() as u64, page_size);
        assert!(value["total"].as_u64().unwrap() >= page_size);
    }

    #[test]
    fn test_error_template_fields() {
        let value = generate("error", 1).unwrap();
        let code = value["code"].as_u64().unwrap();
        assert!((400..=599).contains(&code));
        assert!(value["message"].is_string());
    }

    #[test]
    fn test_unknown_template_fails() {
        match generate("spaceship", 1) {
            Err(MockError::TemplateNotFound(name)) => assert_eq!(name, "spaceship"),
            other => panic!("Expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_every_listed_template_generates() {
        for name in TEMPLATE_NAMES {
            assert!(generate(name, 2).unwrap().is_array());
        }
    }
}
