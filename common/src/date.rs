//! Calendar [`Date`] and half-open [`Period`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

/// Calendar date without a time-of-day component.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Date(time::Date);

impl Date {
    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid calendar
    /// date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day)
            .ok()
            .map(Self)
    }

    /// Returns the [`Date`] following this one.
    ///
    /// [`None`] is returned on calendar overflow.
    #[must_use]
    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day) =
            (self.0.year(), u8::from(self.0.month()), self.0.day());
        write!(f, "{year:04}-{month:02}-{day:02}")
    }
}

impl FromStr for Date {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let year = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or("invalid year")?;
        let month = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or("invalid month")?;
        let day = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or("invalid day")?;

        Self::from_ymd(year, month, day).ok_or("invalid calendar date")
    }
}

impl From<Date> for time::Date {
    fn from(date: Date) -> Self {
        date.0
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Date {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Date {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Half-open range of [`Date`]s: the start is included, the end is not.
///
/// Adjacent [`Period`]s (one ending on the [`Date`] the other starts on) do
/// not [`overlap`].
///
/// [`overlap`]: Period::overlaps
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Period {
    /// First [`Date`] of this [`Period`].
    start: Date,

    /// First [`Date`] after this [`Period`].
    end: Date,
}

impl Period {
    /// Creates a new [`Period`] spanning `[start, end)`.
    ///
    /// [`None`] is returned unless `start` is strictly before `end`, so any
    /// created [`Period`] covers at least one whole day.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Creates a new [`Period`] spanning `[start, end)`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `start` is strictly before `end`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Returns the first [`Date`] of this [`Period`].
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Returns the first [`Date`] after this [`Period`].
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// Indicates whether this [`Period`] shares at least one day with the
    /// provided one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the number of whole days this [`Period`] covers.
    ///
    /// Always at least `1`, as empty [`Period`]s cannot be constructed.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn days(&self) -> u32 {
        u32::try_from((time::Date::from(self.end)
            - time::Date::from(self.start))
        .whole_days())
        .expect("`end` is after `start`")
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { start, end } = self;
        write!(f, "[{start}, {end})")
    }
}

#[cfg(test)]
mod spec {
    use super::{Date, Period};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn period(start: &str, end: &str) -> Period {
        Period::new(date(start), date(end)).unwrap()
    }

    #[test]
    fn parses_and_formats() {
        assert_eq!(date("2024-06-01").to_string(), "2024-06-01");
        assert_eq!(date("2024-6-1"), date("2024-06-01"));

        assert!("2024-02-30".parse::<Date>().is_err());
        assert!("2024-13-01".parse::<Date>().is_err());
        assert!("yesterday".parse::<Date>().is_err());
        assert!("2024-06".parse::<Date>().is_err());
    }

    #[test]
    fn orders_chronologically() {
        assert!(date("2024-05-31") < date("2024-06-01"));
        assert!(date("2023-12-31") < date("2024-01-01"));
        assert_eq!(date("2024-06-01").next_day(), Some(date("2024-06-02")));
    }

    #[test]
    fn rejects_degenerate_ranges() {
        assert!(Period::new(date("2024-06-01"), date("2024-06-01")).is_none());
        assert!(Period::new(date("2024-06-02"), date("2024-06-01")).is_none());
        assert!(Period::new(date("2024-06-01"), date("2024-06-02")).is_some());
    }

    #[test]
    fn detects_overlap() {
        let p = period("2024-06-01", "2024-06-03");

        // Identical.
        assert!(p.overlaps(&p));
        // Nested.
        assert!(p.overlaps(&period("2024-06-01", "2024-06-02")));
        assert!(period("2024-05-01", "2024-07-01").overlaps(&p));
        // Staggered, both directions.
        assert!(p.overlaps(&period("2024-06-02", "2024-06-04")));
        assert!(period("2024-05-30", "2024-06-02").overlaps(&p));
        // Single shared day.
        assert!(p.overlaps(&period("2024-06-02", "2024-06-03")));
    }

    #[test]
    fn adjacent_periods_do_not_overlap() {
        let p = period("2024-06-01", "2024-06-03");

        assert!(!p.overlaps(&period("2024-06-03", "2024-06-05")));
        assert!(!period("2024-05-30", "2024-06-01").overlaps(&p));
    }

    #[test]
    fn disjoint_periods_do_not_overlap() {
        let p = period("2024-06-01", "2024-06-03");

        assert!(!p.overlaps(&period("2024-06-10", "2024-06-12")));
        assert!(!period("2024-05-01", "2024-05-10").overlaps(&p));
    }

    #[test]
    fn counts_whole_days() {
        assert_eq!(period("2024-06-01", "2024-06-02").days(), 1);
        assert_eq!(period("2024-06-01", "2024-06-04").days(), 3);
        // Across a month boundary.
        assert_eq!(period("2024-06-30", "2024-07-02").days(), 2);
        // Across a leap day.
        assert_eq!(period("2024-02-28", "2024-03-01").days(), 2);
    }
}
