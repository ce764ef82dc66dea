//! [`Reservation`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Period};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{room, user};
#[cfg(doc)]
use crate::domain::Room;

/// Booking of a [`Room`] for a [`Period`] of days.
///
/// Once persisted, it's never mutated by the booking engine.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the booked [`Room`].
    pub room_id: room::Id,

    /// ID of the [`user`] who booked the [`Room`].
    pub user_id: user::Id,

    /// [`Period`] of days the [`Room`] is booked for.
    pub period: Period,

    /// Number of [`Participants`] to host.
    pub participants: Participants,

    /// [`Purpose`] of this [`Reservation`].
    pub purpose: Purpose,

    /// Total price of this [`Reservation`] for the whole [`Period`].
    pub total_price: Money,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,
}

/// [`DateTime`] of a [`Reservation`] creation.
pub type CreationDateTime = DateTimeOf<unit::Creation>;

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
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

/// Number of participants hosted by a [`Reservation`].
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
pub struct Participants(i32);

impl Participants {
    /// Creates a new [`Participants`] number.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `num` is positive.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(num: i32) -> Self {
        Self(num)
    }

    /// Creates a new [`Participants`] number if the given `num` is positive.
    #[must_use]
    pub fn new(num: i32) -> Option<Self> {
        (num > 0).then_some(Self(num))
    }

    /// Indicates whether this number of [`Participants`] fits into the
    /// provided [`room::Capacity`].
    #[must_use]
    pub fn fits(self, capacity: room::Capacity) -> bool {
        self.0 <= i32::from(capacity)
    }
}

/// Purpose of a [`Reservation`], as stated by the booking [`user`].
///
/// Opaque free text, persisted as is.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
#[from(forward)]
pub struct Purpose(String);

define_kind! {
    #[doc = "Status of a [`Reservation`]."]
    enum Status {
        #[doc = "The [`Reservation`] is confirmed and occupies its `Period`."]
        Confirmed = 1,
    }
}
