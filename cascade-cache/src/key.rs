//! Key canonicalization.
//!
//! Composite keys are flattened into a single string: sequences are joined
//! with `/`, maps become sorted `k=v` pairs joined with `/`.

use std::collections::{BTreeMap, HashMap};

/// Conversion into a canonical cache key.
pub trait ToCacheKey {
    fn to_cache_key(&self) -> String;
}

impl ToCacheKey for str {
    fn to_cache_key(&self) -> String {
        self.to_string()
    }
}

impl ToCacheKey for String {
    fn to_cache_key(&self) -> String {
        self.clone()
    }
}

impl<T: ToCacheKey + ?Sized> ToCacheKey for &T {
    fn to_cache_key(&self) -> String {
        (**self).to_cache_key()
    }
}

macro_rules! display_key {
    ($($t:ty),*) => {
        $(
            impl ToCacheKey for $t {
                fn to_cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char);

impl<T: ToCacheKey> ToCacheKey for [T] {
    fn to_cache_key(&self) -> String {
        self.iter()
            .map(ToCacheKey::to_cache_key)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl<T: ToCacheKey, const N: usize> ToCacheKey for [T; N] {
    fn to_cache_key(&self) -> String {
        self.as_slice().to_cache_key()
    }
}

impl<T: ToCacheKey> ToCacheKey for Vec<T> {
    fn to_cache_key(&self) -> String {
        self.as_slice().to_cache_key()
    }
}

fn pairs_key<'a, K, V>(pairs: impl Iterator<Item = (&'a K, &'a V)>) -> String
where
    K: ToCacheKey + 'a,
    V: ToCacheKey + 'a,
{
    let mut rendered: Vec<(String, String)> = pairs
        .map(|(k, v)| (k.to_cache_key(), v.to_cache_key()))
        .collect();
    rendered.sort();
    rendered
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("/")
}

impl<K: ToCacheKey, V: ToCacheKey> ToCacheKey for BTreeMap<K, V> {
    fn to_cache_key(&self) -> String {
        pairs_key(self.iter())
    }
}

impl<K: ToCacheKey, V: ToCacheKey, S> ToCacheKey for HashMap<K, V, S> {
    fn to_cache_key(&self) -> String {
        pairs_key(self.iter())
    }
}

/// Prefix a canonical key with a namespace.
pub fn namespaced_key(key: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}:{}", ns, key),
        _ => key.to_string(),
    }
}
