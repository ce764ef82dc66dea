//! [`Command`] definition.

pub mod book_room;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::book_room::BookRoom;
