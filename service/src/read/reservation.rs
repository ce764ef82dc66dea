//! [`Reservation`] read model definitions.

use common::Period;

use crate::domain::room;
#[cfg(doc)]
use crate::domain::Reservation;

/// Selector of [`Reservation`]s of a [`Room`] whose [`Period`]s overlap the
/// provided one.
///
/// Both `[start, end)` ranges are half-open, so a [`Reservation`] ending on
/// the day the provided [`Period`] starts is not selected.
///
/// [`Room`]: crate::domain::Room
#[derive(Clone, Copy, Debug)]
pub struct Overlapping {
    /// ID of the [`Room`] to inspect.
    ///
    /// [`Room`]: crate::domain::Room
    pub room_id: room::Id,

    /// [`Period`] to find overlaps with.
    pub period: Period,
}
