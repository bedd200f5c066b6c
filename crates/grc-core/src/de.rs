//! Serde helpers for hand-written YAML sources.

use serde::{Deserialize, Deserializer};

/// Deserialize a field that may be written as an explicit `null`
/// (`policies_required:` with no value) as the type's default.
///
/// Pair with `#[serde(default)]` so an absent key also yields the default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an optional field so that a key written with no value still
/// counts as present: absent gives `None`, explicit `null` gives
/// `Some(T::default())`.
///
/// Pair with `#[serde(default)]`.
pub fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?.unwrap_or_default()))
}
