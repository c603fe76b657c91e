//! Identifier resolution for entities keyed by one of two JSON fields.
//!
//! Some helpdesk resources are identified by a different key depending on
//! the endpoint: list endpoints may send `brandId` where single-fetch
//! endpoints send `id`. [`IdentityResolver`] reconciles the two with a fixed
//! precedence, and [`EntityId`] plugs it into a `serde` derive through
//! `#[serde(flatten)]`.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

/// Two-slot identifier state with a "primary ever written" flag.
///
/// - A primary write always replaces the resolved value and raises the flag;
///   among several primary writes the last one wins.
/// - A fallback write only lands while the flag is still down.
///
/// The result is therefore the last primary value whenever one was seen,
/// regardless of where the fallback key appeared in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver<T> {
    value: Option<T>,
    primary_written: bool,
}

impl<T> Default for IdentityResolver<T> {
    fn default() -> Self {
        Self {
            value: None,
            primary_written: false,
        }
    }
}

impl<T> IdentityResolver<T> {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value read from the primary key.
    pub fn write_primary(&mut self, value: T) {
        self.value = Some(value);
        self.primary_written = true;
    }

    /// Records a value read from the fallback key.
    pub fn write_fallback(&mut self, value: T) {
        if !self.primary_written {
            self.value = Some(value);
        }
    }

    /// Whether the primary key has been written at least once.
    pub fn primary_written(&self) -> bool {
        self.primary_written
    }

    /// The currently resolved value.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the resolver, returning the resolved value.
    pub fn resolve(self) -> Option<T> {
        self.value
    }
}

/// Names the two wire keys an entity's identifier can arrive under.
pub trait IdentityKeys {
    /// Key whose value always takes precedence.
    const PRIMARY: &'static str;
    /// Key used only when the payload never supplies the primary key.
    const FALLBACK: &'static str;
}

/// An entity identifier resolved from [`IdentityKeys::PRIMARY`] or
/// [`IdentityKeys::FALLBACK`].
///
/// Meant to be embedded with `#[serde(flatten)]`: the containing struct
/// forwards every key it does not declare itself, and this type picks out
/// the two identifier keys in arrival order. A `null` under the primary key
/// still counts as a primary write, so it resolves to `None` rather than
/// falling back.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Brand {
///     #[serde(flatten)]
///     id: EntityId<BrandKeys>,
///     name: Option<String>,
/// }
/// ```
pub struct EntityId<K, T = i64> {
    value: Option<T>,
    keys: PhantomData<fn() -> K>,
}

impl<K, T> EntityId<K, T> {
    /// Wraps an already-resolved identifier.
    pub fn new(value: Option<T>) -> Self {
        Self {
            value,
            keys: PhantomData,
        }
    }

    /// The resolved identifier, if either key was present.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the wrapper, returning the resolved identifier.
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<K> EntityId<K, i64> {
    /// The resolved numeric identifier.
    pub fn get(&self) -> Option<i64> {
        self.value
    }
}

impl<K, T> Default for EntityId<K, T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<K, T: Clone> Clone for EntityId<K, T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<K, T: PartialEq> PartialEq for EntityId<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K, T: Eq> Eq for EntityId<K, T> {}

impl<K: IdentityKeys, T: fmt::Debug> fmt::Debug for EntityId<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityId")
            .field("primary", &K::PRIMARY)
            .field("fallback", &K::FALLBACK)
            .field("value", &self.value)
            .finish()
    }
}

impl<K, T: fmt::Display> fmt::Display for EntityId<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => value.fmt(f),
            None => f.write_str("-"),
        }
    }
}

impl<'de, K, T> Deserialize<'de> for EntityId<K, T>
where
    K: IdentityKeys,
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntityIdVisitor<K, T>(PhantomData<fn() -> (K, T)>);

        impl<'de, K, T> Visitor<'de> for EntityIdVisitor<K, T>
        where
            K: IdentityKeys,
            T: Deserialize<'de>,
        {
            type Value = EntityId<K, T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "an object identified by `{}` or `{}`",
                    K::PRIMARY,
                    K::FALLBACK
                )
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                // Slots hold the raw optional value: an explicit `null` under
                // the primary key still raises the flag.
                let mut resolver = IdentityResolver::<Option<T>>::new();

                while let Some(key) = map.next_key::<String>()? {
                    if key == K::PRIMARY {
                        resolver.write_primary(map.next_value()?);
                    } else if key == K::FALLBACK {
                        resolver.write_fallback(map.next_value()?);
                    } else {
                        map.next_value::<de::IgnoredAny>()?;
                    }
                }

                Ok(EntityId::new(resolver.resolve().flatten()))
            }
        }

        deserializer.deserialize_map(EntityIdVisitor(PhantomData))
    }
}
