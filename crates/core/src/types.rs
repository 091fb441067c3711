/// Backend document identifiers are opaque strings (serialized as `_id`).
pub type EntityId = String;

/// Deserialize a possibly-`null` JSON array into an empty `Vec`.
///
/// The backend occasionally sends `null` where a collection is expected;
/// the client treats that exactly like an empty collection.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
