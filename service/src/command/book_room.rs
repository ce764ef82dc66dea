//! [`Command`] for booking a [`Room`] for a [`Period`] of days.

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Date, DateTime, Period,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{reservation, room, user, Reservation, Room},
    infra::{database, Database},
    read::reservation::Overlapping,
    Service,
};

use super::Command;

/// [`Command`] for booking a [`Room`] for a [`Period`] of days.
#[derive(Clone, Debug)]
pub struct BookRoom {
    /// ID of the [`Room`] to book.
    pub room_id: room::Id,

    /// ID of the [`user`] booking the [`Room`].
    pub user_id: user::Id,

    /// First [`Date`] of the booking.
    pub starts_on: Date,

    /// First [`Date`] after the booking, exclusive.
    pub ends_on: Date,

    /// Number of [`reservation::Participants`] to host.
    pub participants: reservation::Participants,

    /// [`reservation::Purpose`] of the booking.
    pub purpose: reservation::Purpose,
}

impl<Db> Command<BookRoom> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Room>, room::Id>>,
            Ok = Option<Room>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, Overlapping>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Room, room::Id>>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: BookRoom) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let BookRoom {
            room_id,
            user_id,
            starts_on,
            ends_on,
            participants,
            purpose,
        } = cmd;

        let period = Period::new(starts_on, ends_on)
            .ok_or(E::InvalidPeriod { starts_on, ends_on })
            .map_err(tracerr::wrap!())?;

        let mut attempt = 1;
        loop {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Avoid concurrent bookings of the same `Room`.
            tx.execute(Lock(By::new(room_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let room = tx
                .execute(Select(By::<Option<Room>, _>::new(room_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::RoomNotFound(room_id))
                .map_err(tracerr::wrap!())?;

            if !participants.fits(room.capacity) {
                return Err(tracerr::new!(E::CapacityExceeded {
                    room_id,
                    participants,
                    capacity: room.capacity,
                }));
            }

            // Availability is read inside the transaction only, after the
            // `Room` is locked, so it cannot go stale before the insert.
            let conflicts = tx
                .execute(Select(By::<Vec<Reservation>, _>::new(Overlapping {
                    room_id,
                    period,
                })))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if !conflicts.is_empty() {
                return Err(tracerr::new!(E::SlotUnavailable {
                    room_id,
                    period,
                }));
            }

            let reservation = Reservation {
                id: reservation::Id::new(),
                room_id,
                user_id,
                period,
                participants,
                purpose: purpose.clone(),
                total_price: room.price * period.days(),
                status: reservation::Status::Confirmed,
                created_at: DateTime::now().coerce(),
            };
            tx.execute(Insert(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            match tx.execute(Commit).await {
                Ok(()) => return Ok(reservation),
                Err(e)
                    if AsRef::<database::Error>::as_ref(&e)
                        .is_retriable() =>
                {
                    if attempt >= self.config().max_booking_attempts {
                        return Err(tracerr::new!(E::TransactionConflict(
                            room_id
                        )));
                    }
                    log::warn!(
                        "commit of a `Room(id: {room_id})` booking \
                         conflicted with a concurrent transaction \
                         (attempt {attempt}), retrying",
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e)
                        .map_err(tracerr::map_from_and_wrap!(=> E));
                }
            }
        }
    }
}

/// Error of [`BookRoom`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Requested [`Period`] is degenerate or inverted.
    #[display(
        "booking starting on {starts_on} must end strictly after it, \
         not on {ends_on}"
    )]
    InvalidPeriod {
        /// Requested first [`Date`] of the booking.
        starts_on: Date,

        /// Requested end [`Date`] of the booking.
        ends_on: Date,
    },

    /// [`Room`] with the provided ID does not exist.
    #[display("`Room(id: {_0})` does not exist")]
    RoomNotFound(#[error(not(source))] room::Id),

    /// Requested number of participants exceeds the [`Room`]'s capacity.
    #[display(
        "{participants} participants exceed the capacity {capacity} of \
         `Room(id: {room_id})`"
    )]
    CapacityExceeded {
        /// ID of the [`Room`] to book.
        room_id: room::Id,

        /// Requested number of [`reservation::Participants`].
        participants: reservation::Participants,

        /// [`room::Capacity`] of the [`Room`].
        capacity: room::Capacity,
    },

    /// [`Room`] is reserved already for a [`Period`] overlapping the
    /// requested one.
    #[display("`Room(id: {room_id})` is reserved already within {period}")]
    SlotUnavailable {
        /// ID of the [`Room`] to book.
        room_id: room::Id,

        /// Requested [`Period`] of the booking.
        period: Period,
    },

    /// Booking transaction kept conflicting with concurrent transactions.
    #[display(
        "booking of `Room(id: {_0})` kept conflicting with concurrent \
         transactions"
    )]
    TransactionConflict(#[error(not(source))] room::Id),

    /// [`Database`] cannot be reached or failed unexpectedly.
    #[display("`Database` is unavailable: {_0}")]
    #[from]
    StorageUnavailable(database::Error),
}

#[cfg(test)]
mod spec {
    use std::sync::{Arc, Mutex};

    use common::money::Currency;
    use common::Money;
    use futures::future;
    use rust_decimal::Decimal;
    use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
    use uuid::Uuid;

    use crate::Config;

    use super::*;

    /// In-memory [`Database`] driving the engine in tests.
    #[derive(Clone, Debug)]
    struct InMemoryDb(Arc<State>);

    #[derive(Debug)]
    struct State {
        rooms: Vec<Room>,
        reservations: Mutex<Vec<Reservation>>,
        /// Stand-in for the per-`Room` row lock.
        booking_lock: Arc<AsyncMutex<()>>,
        /// Number of upcoming commits to fail with a retriable conflict.
        failing_commits: Mutex<u8>,
    }

    impl InMemoryDb {
        fn new(rooms: Vec<Room>) -> Self {
            Self(Arc::new(State {
                rooms,
                reservations: Mutex::new(Vec::new()),
                booking_lock: Arc::new(AsyncMutex::new(())),
                failing_commits: Mutex::new(0),
            }))
        }

        fn booked(&self) -> Vec<Reservation> {
            self.0.reservations.lock().unwrap().clone()
        }

        fn fail_commits(&self, num: u8) {
            *self.0.failing_commits.lock().unwrap() = num;
        }
    }

    /// Transactional view over an [`InMemoryDb`].
    ///
    /// Inserts are buffered until [`Commit`], and discarded if the
    /// transaction is dropped without committing.
    #[derive(Clone, Debug)]
    struct InMemoryTx {
        state: Arc<State>,
        lock: Arc<Mutex<Option<OwnedMutexGuard<()>>>>,
        pending: Arc<Mutex<Vec<Reservation>>>,
    }

    impl Database<Transact> for InMemoryDb {
        type Ok = InMemoryTx;
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(InMemoryTx {
                state: Arc::clone(&self.0),
                lock: Arc::new(Mutex::new(None)),
                pending: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    impl Database<Lock<By<Room, room::Id>>> for InMemoryTx {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Lock<By<Room, room::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            let guard =
                Arc::clone(&self.state.booking_lock).lock_owned().await;
            *self.lock.lock().unwrap() = Some(guard);
            Ok(())
        }
    }

    impl Database<Select<By<Option<Room>, room::Id>>> for InMemoryTx {
        type Ok = Option<Room>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Room>, room::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            let id = by.into_inner();
            Ok(self.state.rooms.iter().find(|r| r.id == id).copied())
        }
    }

    impl Database<Select<By<Vec<Reservation>, Overlapping>>> for InMemoryTx {
        type Ok = Vec<Reservation>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Vec<Reservation>, Overlapping>>,
        ) -> Result<Self::Ok, Self::Err> {
            let Overlapping { room_id, period } = by.into_inner();
            Ok(self
                .state
                .reservations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.room_id == room_id && r.period.overlaps(&period)
                })
                .cloned()
                .collect())
        }
    }

    impl Database<Insert<Reservation>> for InMemoryTx {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(reservation): Insert<Reservation>,
        ) -> Result<Self::Ok, Self::Err> {
            self.pending.lock().unwrap().push(reservation);
            Ok(())
        }
    }

    impl Database<Commit> for InMemoryTx {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
            {
                let mut failing = self.state.failing_commits.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    drop(failing);
                    self.pending.lock().unwrap().clear();
                    drop(self.lock.lock().unwrap().take());
                    return Err(tracerr::new!(database::Error::Conflict));
                }
            }
            self.state
                .reservations
                .lock()
                .unwrap()
                .append(&mut self.pending.lock().unwrap());
            drop(self.lock.lock().unwrap().take());
            Ok(())
        }
    }

    fn usd(amount: u32) -> Money {
        Money {
            amount: Decimal::from(amount),
            currency: Currency::Usd,
        }
    }

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn room(capacity: i32, price: Money) -> Room {
        Room {
            id: room::Id::new(),
            capacity: room::Capacity::new(capacity).unwrap(),
            price,
        }
    }

    fn service(db: &InMemoryDb) -> Service<InMemoryDb> {
        Service::new(Config::default(), db.clone())
    }

    fn book(room_id: room::Id, start: &str, end: &str, num: i32) -> BookRoom {
        BookRoom {
            room_id,
            user_id: user::Id::from(Uuid::new_v4()),
            starts_on: date(start),
            ends_on: date(end),
            participants: reservation::Participants::new(num).unwrap(),
            purpose: "team offsite".into(),
        }
    }

    #[tokio::test]
    async fn rejects_degenerate_period() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        for (start, end) in
            [("2024-06-01", "2024-06-01"), ("2024-06-02", "2024-06-01")]
        {
            let err =
                svc.execute(book(room_id, start, end, 4)).await.unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::InvalidPeriod { .. }
            ));
        }
        assert!(db.booked().is_empty());
    }

    #[tokio::test]
    async fn fails_on_unknown_room() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let svc = service(&db);

        let err = svc
            .execute(book(room::Id::new(), "2024-06-01", "2024-06-03", 4))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::RoomNotFound(_)));
        assert!(db.booked().is_empty());
    }

    #[tokio::test]
    async fn rejects_participants_over_capacity() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        let err = svc
            .execute(book(room_id, "2024-06-01", "2024-06-03", 11))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CapacityExceeded { .. }
        ));
        assert!(db.booked().is_empty());
    }

    #[tokio::test]
    async fn books_a_free_room() {
        let db = InMemoryDb::new(vec![room(10, usd(100))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        let cmd = book(room_id, "2024-06-01", "2024-06-04", 4);
        let user_id = cmd.user_id;
        let reservation = svc.execute(cmd).await.unwrap();

        assert_eq!(reservation.room_id, room_id);
        assert_eq!(reservation.user_id, user_id);
        assert_eq!(reservation.period.days(), 3);
        assert_eq!(reservation.total_price, usd(300));
        assert_eq!(reservation.status, reservation::Status::Confirmed);

        let booked = db.booked();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].id, reservation.id);
    }

    #[tokio::test]
    async fn prices_single_night_as_one_day() {
        let db = InMemoryDb::new(vec![room(10, usd(100))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        let reservation = svc
            .execute(book(room_id, "2024-06-01", "2024-06-02", 4))
            .await
            .unwrap();

        assert_eq!(reservation.total_price, usd(100));
    }

    #[tokio::test]
    async fn rejects_overlapping_booking_but_allows_back_to_back() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        svc.execute(book(room_id, "2024-06-01", "2024-06-03", 4))
            .await
            .unwrap();

        let err = svc
            .execute(book(room_id, "2024-06-02", "2024-06-04", 4))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SlotUnavailable { .. }
        ));
        assert_eq!(db.booked().len(), 1);

        // Ends exactly when the existing one starts: no overlap.
        let reservation = svc
            .execute(book(room_id, "2024-06-03", "2024-06-05", 4))
            .await
            .unwrap();
        assert_eq!(reservation.total_price, usd(100));
        assert_eq!(db.booked().len(), 2);
    }

    #[tokio::test]
    async fn retries_conflicting_commit() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        db.fail_commits(1);
        let reservation = svc
            .execute(book(room_id, "2024-06-01", "2024-06-03", 4))
            .await
            .unwrap();

        assert_eq!(db.booked().len(), 1);
        assert_eq!(db.booked()[0].id, reservation.id);
    }

    #[tokio::test]
    async fn gives_up_after_repeated_commit_conflicts() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        db.fail_commits(Config::default().max_booking_attempts);
        let err = svc
            .execute(book(room_id, "2024-06-01", "2024-06-03", 4))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TransactionConflict(_)
        ));
        // Nothing is half-applied.
        assert!(db.booked().is_empty());
    }

    #[tokio::test]
    async fn concurrent_bookings_never_double_book() {
        let db = InMemoryDb::new(vec![room(10, usd(50))]);
        let room_id = db.0.rooms[0].id;
        let svc = service(&db);

        let (a, b) = future::join(
            svc.execute(book(room_id, "2024-06-01", "2024-06-03", 2)),
            svc.execute(book(room_id, "2024-06-01", "2024-06-03", 2)),
        )
        .await;

        assert_eq!(
            [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count(),
            1,
        );
        let err = [a, b].into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SlotUnavailable { .. }
                | ExecutionError::TransactionConflict(_)
        ));
        assert_eq!(db.booked().len(), 1);
    }
}
