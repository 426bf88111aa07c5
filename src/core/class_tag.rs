//! The closed set of entity types.
//!
//! Every record carries one of these tags. Resolving a tag string is a plain
//! `match`, so an unknown tag is an ordinary `None` rather than a lookup
//! failure deep inside a backend.

use crate::error::StorageError;
use std::fmt;
use std::str::FromStr;

/// Entity type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassTag {
    /// Generic base type with no extra attributes.
    BaseModel,
    /// A registered user.
    User,
    /// A state, parent of cities.
    State,
    /// A city belonging to a state.
    City,
    /// An amenity offered by places.
    Amenity,
    /// A rentable place in a city, owned by a user.
    Place,
    /// A user's review of a place.
    Review,
}

impl ClassTag {
    /// Every tag, in registry order.
    pub const ALL: [Self; 7] = [
        Self::BaseModel,
        Self::User,
        Self::State,
        Self::City,
        Self::Amenity,
        Self::Place,
        Self::Review,
    ];

    /// Resolves a tag string. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "BaseModel" => Some(Self::BaseModel),
            "User" => Some(Self::User),
            "State" => Some(Self::State),
            "City" => Some(Self::City),
            "Amenity" => Some(Self::Amenity),
            "Place" => Some(Self::Place),
            "Review" => Some(Self::Review),
            _ => None,
        }
    }

    /// Returns the tag as written in identity keys and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseModel => "BaseModel",
            Self::User => "User",
            Self::State => "State",
            Self::City => "City",
            Self::Amenity => "Amenity",
            Self::Place => "Place",
            Self::Review => "Review",
        }
    }

    /// Returns the relational table backing this type.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::BaseModel => "base_model",
            Self::User => "users",
            Self::State => "states",
            Self::City => "cities",
            Self::Amenity => "amenities",
            Self::Place => "places",
            Self::Review => "reviews",
        }
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassTag {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StorageError::UnknownClass { tag: s.to_string() })
    }
}
