/// Common types shared across handlers and services
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field of a partial update.
///
/// Distinguishes a key that was not sent (`Missing`) from a key sent as
/// `null` (`Null`) and a key sent with a value. Use together with
/// `#[serde(default)]` so absent keys deserialize to `Missing`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    /// `None` when the key was absent, `Some(None)` for an explicit null.
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Patch::Missing => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Missing => Patch::Missing,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(v),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            Patch::Missing | Patch::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        note: Patch<String>,
        #[serde(default)]
        area: Patch<f64>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let sample: Sample = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(sample.note, Patch::Null);
        assert_eq!(sample.area, Patch::Missing);

        let sample: Sample = serde_json::from_str(r#"{"area": 12.5}"#).unwrap();
        assert_eq!(sample.area, Patch::Value(12.5));
        assert!(sample.note.is_missing());
    }

    #[test]
    fn into_update_maps_each_state() {
        assert_eq!(Patch::<i32>::Missing.into_update(), None);
        assert_eq!(Patch::<i32>::Null.into_update(), Some(None));
        assert_eq!(Patch::Value(3).into_update(), Some(Some(3)));
    }
}
