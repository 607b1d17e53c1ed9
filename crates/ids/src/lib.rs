//! Typed identifiers for the CLB entity model.
//!
//! Every persistent entity (codelist, phenotype, collection, user, workspace)
//! is addressed by a UUID. To keep identifier handling consistent across the
//! codebase, CLB uses a *canonical* textual representation for identifiers:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - One newtype per entity kind, so a `CodelistId` can never be passed where
//!   a `PhenotypeId` is expected.
//! - Canonical-form parsing for externally supplied identifiers (CLI/API
//!   inputs). Non-canonical values (uppercase, hyphenated, wrong length,
//!   non-hex) are rejected.
//! - Deterministic construction from an integer (`from_u128`) for test
//!   fixtures and well-known sentinel identifiers.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from
//! `Uuid::new_v4().simple().to_string()`.

use std::fmt;
use std::str::FromStr;

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("invalid identifier: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;

/// Returns true if `input` is in CLB's canonical identifier form.
///
/// This is a purely syntactic check: exactly 32 bytes, lowercase hex only.
pub fn is_canonical(input: &str) -> bool {
    input.len() == 32
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random (v4) identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Builds an identifier from a raw integer value.
            ///
            /// Deterministic; used for sentinel identifiers and test
            /// fixtures, never for allocating production identifiers.
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Validates and parses an identifier that must already be in
            /// canonical form.
            ///
            /// This does **not** normalise other common UUID forms (for
            /// example, hyphenated or uppercase). Callers must provide the
            /// canonical representation.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::InvalidInput`] if `input` is not canonical.
            pub fn parse(input: &str) -> IdResult<Self> {
                if !is_canonical(input) {
                    return Err(IdError::InvalidInput(format!(
                        "identifier must be 32 lowercase hex characters without hyphens, got: '{}'",
                        input
                    )));
                }
                match Uuid::parse_str(input) {
                    Ok(uuid) => Ok(Self(uuid)),
                    Err(e) => Err(IdError::InvalidInput(e.to_string())),
                }
            }

            /// Returns the underlying `uuid::Uuid`.
            pub const fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(&self.0.simple())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id! {
    /// Identifier of a codelist.
    CodelistId
}

entity_id! {
    /// Identifier of a phenotype.
    PhenotypeId
}

entity_id! {
    /// Identifier of a collection.
    CollectionId
}

entity_id! {
    /// Identifier of a user.
    UserId
}

entity_id! {
    /// Identifier of a user's workspace.
    WorkspaceId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_canonical() {
        let id = CodelistId::random();
        let s = id.to_string();
        assert!(is_canonical(&s));
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = PhenotypeId::random();
        let parsed = PhenotypeId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_hyphenated() {
        let hyphenated = Uuid::new_v4().to_string();
        assert!(CollectionId::parse(&hyphenated).is_err());
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        let upper = Uuid::new_v4().simple().to_string().to_uppercase();
        assert!(UserId::parse(&upper).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(WorkspaceId::parse("abc123").is_err());
        assert!(WorkspaceId::parse("").is_err());
    }

    #[test]
    fn test_from_u128_is_deterministic() {
        assert_eq!(CodelistId::from_u128(42), CodelistId::from_u128(42));
        assert_ne!(CodelistId::from_u128(42), CodelistId::from_u128(43));
    }

    #[test]
    fn test_distinct_types_with_same_value() {
        // The whole point of the newtypes: same bits, different types.
        let raw = Uuid::new_v4();
        let _cl: CodelistId = raw.into();
        let _ph: PhenotypeId = raw.into();
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = CodelistId::from_u128(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: CodelistId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_serde_rejects_non_canonical() {
        let hyphenated = format!("\"{}\"", Uuid::new_v4());
        assert!(serde_json::from_str::<CodelistId>(&hyphenated).is_err());
    }
}
