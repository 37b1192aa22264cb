//! Streaming matcher: walks a JSON response body and records the values
//! of requested paths without ever materializing a document tree.
//!
//! The walker drives `serde_json`'s deserializer through a visitor and
//! maintains a running slash-delimited key (`/Chassis/@odata.id/`):
//! object keys push a segment, every scalar and object end pops one.
//! Arrays push nothing, so scalars inside an array pop into the parent's
//! key; this mirrors the traversal of the management firmware this tool
//! talks to and is pinned by tests. Only the head component of a
//! requested path participates in matching; nested filters are not
//! compared against multi-segment keys.

use crate::path::{Path, PathComponent};
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use std::fmt;
use thiserror::Error;

/// A requested path together with the scalar captured for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedProperty {
    pub path: Path,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("extra data after JSON document")]
    ExtraData,
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct PropertyMatcher {
    entries: Vec<MatchedProperty>,
    current_key: String,
    current_value: String,
}

impl PropertyMatcher {
    pub fn new(paths: Vec<Path>) -> Self {
        Self {
            entries: paths
                .into_iter()
                .map(|path| MatchedProperty { path, value: String::new() })
                .collect(),
            current_key: String::from("/"),
            current_value: String::new(),
        }
    }

    /// Walk one complete JSON document. Trailing bytes are reported as
    /// extra data; entries recorded before a mid-document failure
    /// survive into `release`. Comments are rejected by the parser.
    pub fn write(&mut self, data: &[u8]) -> Result<(), MatchError> {
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        ValueSeed(self).deserialize(&mut deserializer)?;
        deserializer.end().map_err(|_| MatchError::ExtraData)
    }

    pub fn release(self) -> Vec<MatchedProperty> {
        self.entries
    }

    fn on_key(&mut self, key: &str) {
        self.current_key.push_str(key);
        self.current_key.push('/');
    }

    fn on_string(&mut self, chunk: &str) {
        self.current_value.push_str(chunk);
        let value = std::mem::take(&mut self.current_value);
        self.record_matches(&value);
        self.pop_segment();
    }

    fn on_scalar(&mut self, text: &str) {
        self.record_matches(text);
        self.pop_segment();
    }

    fn on_object_end(&mut self) {
        self.pop_segment();
    }

    /// A hit requires the current key, sans its trailing `/`, to end in
    /// `/K/@odata.id` where `K` is the head key of a requested path. A
    /// bare-name head stops the scan on its first hit; a filtered head
    /// records and keeps going.
    fn record_matches(&mut self, value: &str) {
        let key: &str = self
            .current_key
            .strip_suffix('/')
            .unwrap_or(&self.current_key);
        for entry in &mut self.entries {
            match &entry.path.first {
                PathComponent::Name(name) => {
                    if ends_with_odata_id(key, name) {
                        entry.value = value.to_string();
                        break;
                    }
                }
                PathComponent::Filter(filter) => {
                    if ends_with_odata_id(key, &filter.key) {
                        entry.value = value.to_string();
                    }
                }
            }
        }
    }

    // Trim the trailing segment and the `/` before it, keeping the
    // parent's trailing `/`.
    fn pop_segment(&mut self) {
        if let Some(i) = self.current_key.rfind('/') {
            self.current_key.truncate(i);
        }
        let keep = self.current_key.rfind('/').map_or(0, |i| i + 1);
        self.current_key.truncate(keep);
    }
}

fn ends_with_odata_id(current_key: &str, key: &str) -> bool {
    let mut needle = String::with_capacity(key.len() + 11);
    needle.push('/');
    needle.push_str(key);
    needle.push_str("/@odata.id");
    current_key.ends_with(&needle)
}

/// Drives one JSON value through the matcher, recursing into objects
/// and arrays without building any intermediate representation.
struct ValueSeed<'a>(&'a mut PropertyMatcher);

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<(), E> {
        self.0.on_scalar(if v { "true" } else { "false" });
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<(), E> {
        let mut buf = itoa::Buffer::new();
        self.0.on_scalar(buf.format(v));
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<(), E> {
        let mut buf = itoa::Buffer::new();
        self.0.on_scalar(buf.format(v));
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<(), E> {
        self.0.on_scalar(&v.to_string());
        Ok(())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        self.0.on_string(v);
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.0.on_scalar("null");
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            self.0.on_key(&key);
            map.next_value_seed(ValueSeed(&mut *self.0))?;
        }
        self.0.on_object_end();
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while seq.next_element_seed(ValueSeed(&mut *self.0))?.is_some() {}
        Ok(())
    }
}
