//! [`Room`] definitions.

use common::Money;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bookable room.
///
/// Managed outside the booking engine, which only reads it.
#[derive(Clone, Copy, Debug)]
pub struct Room {
    /// ID of this [`Room`].
    pub id: Id,

    /// [`Capacity`] of this [`Room`].
    pub capacity: Capacity,

    /// Price of this [`Room`] per one day of booking.
    pub price: Money,
}

/// ID of a [`Room`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Maximum number of participants a [`Room`] can host.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Capacity(i32);

impl Capacity {
    /// Creates a new [`Capacity`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `capacity` is positive.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(capacity: i32) -> Self {
        Self(capacity)
    }

    /// Creates a new [`Capacity`] if the given `capacity` is positive.
    #[must_use]
    pub fn new(capacity: i32) -> Option<Self> {
        (capacity > 0).then_some(Self(capacity))
    }
}
