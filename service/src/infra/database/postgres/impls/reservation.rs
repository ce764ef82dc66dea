//! [`Reservation`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money, Period,
};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::Reservation,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::reservation::Overlapping,
};

impl<C> Database<Select<By<Vec<Reservation>, Overlapping>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Overlapping { room_id, period } = by.into_inner();

        // Half-open `[starts_on, ends_on)` semantics: ranges only touching
        // at a boundary don't match.
        const SQL: &str = "\
            SELECT id, room_id, user_id, \
                   starts_on, ends_on, \
                   participants, purpose, \
                   total_price, total_price_currency, \
                   status, created_at \
            FROM reservations \
            WHERE room_id = $1::UUID \
              AND starts_on < $3::DATE \
              AND $2::DATE < ends_on \
            ORDER BY starts_on";
        Ok(self
            .query(SQL, &[&room_id, &period.start(), &period.end()])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                // Validity is guaranteed by the `reservations` table
                // `CHECK (starts_on < ends_on)` constraint.
                #[expect(unsafe_code, reason = "bypass")]
                let period = unsafe {
                    Period::new_unchecked(
                        row.get("starts_on"),
                        row.get("ends_on"),
                    )
                };
                Reservation {
                    id: row.get("id"),
                    room_id: row.get("room_id"),
                    user_id: row.get("user_id"),
                    period,
                    participants: row.get("participants"),
                    purpose: row.get("purpose"),
                    total_price: Money {
                        amount: row.get::<_, Decimal>("total_price"),
                        currency: row.get("total_price_currency"),
                    },
                    status: row.get("status"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO reservations (\
                id, room_id, user_id, \
                starts_on, ends_on, \
                participants, purpose, \
                total_price, total_price_currency, \
                status, created_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::DATE, $5::DATE, \
                $6::INT4, $7::TEXT, \
                $8::NUMERIC, $9::INT2, \
                $10::INT2, $11::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &reservation.id,
                &reservation.room_id,
                &reservation.user_id,
                &reservation.period.start(),
                &reservation.period.end(),
                &reservation.participants,
                &reservation.purpose,
                &reservation.total_price.amount,
                &reservation.total_price.currency,
                &reservation.status,
                &reservation.created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
