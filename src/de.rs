use serde::Deserialize;
use serde::Deserializer;

/// Deserialize an explicit JSON `null` as the type's default value.
///
/// Pairs with `#[serde(default)]`, which only covers absent fields.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
