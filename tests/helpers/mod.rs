//! Builders shared by the integration tests.
use xtce_content_model::schema::{Schema, SpaceSystem};
use xtce_content_model::{ContainerContentModel, ContentModel, ItemValue, ModelOptions, RawBits};

/// Spacecraft schema loaded from `tests/fixtures/spacecraft.json`.
#[allow(dead_code)]
pub fn spacecraft() -> Schema {
    let json = include_str!("../fixtures/spacecraft.json");
    let root: SpaceSystem = serde_json::from_str(json).expect("fixture must deserialize");
    Schema::new(vec![root])
}

/// Decode `bytes` as `container` with default options.
#[allow(dead_code)]
pub fn decode<'s>(schema: &'s Schema, container: &str, bytes: &[u8]) -> ContainerContentModel<'s> {
    let bits = RawBits::from_bytes(bytes);
    ContainerContentModel::new(schema, container, Vec::new(), Some(&bits), ModelOptions::default())
        .expect("container must resolve")
}

/// Build `container` from user values only.
#[allow(dead_code)]
pub fn compose<'s>(
    schema: &'s Schema,
    container: &str,
    values: &[(&str, &str)],
) -> ContainerContentModel<'s> {
    let values = values
        .iter()
        .map(|(item, value)| ItemValue::calibrated(*item, *value))
        .collect();
    ContainerContentModel::new(schema, container, values, None, ModelOptions::default())
        .expect("container must resolve")
}

/// Calibrated value of the first entry named `path`.
#[allow(dead_code)]
pub fn calibrated<'s, M: ContentModel<'s>>(model: &M, path: &str) -> Option<String> {
    model
        .entry(path)?
        .value()?
        .calibrated()
        .map(str::to_owned)
}

/// `(name, start bit)` of every in-use entry that occupies bits.
#[allow(dead_code)]
pub fn layout<'s, M: ContentModel<'s>>(model: &M) -> Vec<(String, String)> {
    model
        .entries()
        .iter()
        .filter(|e| e.in_use() && e.raw_size().bits().is_some_and(|b| b > 0))
        .map(|e| (e.name().to_owned(), e.start_bit().to_string()))
        .collect()
}
