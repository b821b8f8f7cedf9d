use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use teloxide::types::ChatId;

use crate::parser::Amount;

/// Calendar month a bucket belongs to, written as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month containing the given moment, in the moment's own timezone
    pub fn from_datetime<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Human-readable month, e.g. "March 2024"
    pub fn display_name(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => date.format("%B %Y").to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key `{0}`, expected YYYY-MM")]
pub struct MonthKeyError(String);

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthKeyError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Identifies one bucket: a chat in a calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub month: MonthKey,
    pub chat_id: ChatId,
}

impl LedgerKey {
    pub fn new(month: MonthKey, chat_id: ChatId) -> Self {
        Self { month, chat_id }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.month, self.chat_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("monthly total would exceed {}", Amount::MAX)]
pub struct TotalTooLarge;

/// Entries recorded for one chat in one month, with their running total.
///
/// `total` always equals the sum of `entries` and never exceeds
/// `Amount::MAX`; the fields are private so every change goes through
/// `push`/`pop`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredBucket")]
pub struct LedgerBucket {
    entries: Vec<Amount>,
    total: Amount,
}

/// Bucket as written in the ledger file, before its entries are checked
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredBucket {
    entries: Vec<Amount>,
    total: Amount,
}

impl TryFrom<StoredBucket> for LedgerBucket {
    type Error = TotalTooLarge;

    // The stored total is kept as is; `normalize` repairs it
    fn try_from(stored: StoredBucket) -> Result<Self, Self::Error> {
        Amount::checked_sum(&stored.entries).ok_or(TotalTooLarge)?;
        Ok(LedgerBucket {
            entries: stored.entries,
            total: stored.total,
        })
    }
}

impl TryFrom<Vec<Amount>> for LedgerBucket {
    type Error = TotalTooLarge;

    fn try_from(entries: Vec<Amount>) -> Result<Self, Self::Error> {
        let total = Amount::checked_sum(&entries).ok_or(TotalTooLarge)?;
        Ok(LedgerBucket { entries, total })
    }
}

impl LedgerBucket {
    pub fn entries(&self) -> &[Amount] {
        &self.entries
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    /// Append an amount and return the new total. Nothing changes if the
    /// total would go past `Amount::MAX`.
    pub fn push(&mut self, amount: Amount) -> Result<Amount, TotalTooLarge> {
        let total = self.entries_sum().checked_add(amount).ok_or(TotalTooLarge)?;
        self.entries.push(amount);
        self.total = total;
        Ok(total)
    }

    pub fn pop(&mut self) -> Option<Amount> {
        let removed = self.entries.pop()?;
        self.total = self.entries_sum();
        Some(removed)
    }

    /// Recompute `total` from `entries`. Returns true if it was off.
    pub fn normalize(&mut self) -> bool {
        let stored = self.total;
        self.total = self.entries_sum();
        stored != self.total
    }

    // Every way of building a bucket checks that its entries fit
    fn entries_sum(&self) -> Amount {
        Amount::checked_sum(&self.entries).unwrap_or(Amount::MAX)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn push(bucket: &mut LedgerBucket, s: &str) {
        bucket.push(amount(s)).unwrap();
    }

    #[test]
    fn test_month_key_format_and_parse() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<MonthKey>(), Ok(key));
        assert_eq!(key.display_name(), "March 2024");

        assert!(MonthKey::new(2024, 13).is_none());
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("2024-3".parse::<MonthKey>().is_err());
        assert!("March".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_uses_the_given_timezone() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 31, 22, 30, 0).unwrap();
        assert_eq!(MonthKey::from_datetime(&utc), MonthKey::new(2024, 3).unwrap());

        let plus_three = utc.with_timezone(&FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(
            MonthKey::from_datetime(&plus_three),
            MonthKey::new(2024, 4).unwrap()
        );
    }

    #[test]
    fn test_ledger_key_display() {
        let key = LedgerKey::new(MonthKey::new(2024, 3).unwrap(), ChatId(42));
        assert_eq!(key.to_string(), "2024-03_42");
    }

    #[test]
    fn test_bucket_push_and_pop_keep_total() {
        let mut bucket = LedgerBucket::default();
        assert!(bucket.entries().is_empty());
        assert_eq!(bucket.total(), Amount::ZERO);

        push(&mut bucket, "10");
        push(&mut bucket, "0.1");
        assert_eq!(bucket.push(amount("0.2")), Ok(amount("10.30")));
        assert_eq!(bucket.total(), amount("10.30"));

        assert_eq!(bucket.pop(), Some(amount("0.2")));
        assert_eq!(bucket.total(), amount("10.1"));
        assert_eq!(bucket.entries(), &[amount("10"), amount("0.1")]);
    }

    #[test]
    fn test_pop_on_empty_bucket() {
        let mut bucket = LedgerBucket::default();
        assert_eq!(bucket.pop(), None);
        assert_eq!(bucket, LedgerBucket::default());
    }

    #[test]
    fn test_normalize_repairs_total() {
        let mut bucket: LedgerBucket =
            serde_yaml::from_str("entries: [10.0, 5.5]\ntotal: 99.0\n").unwrap();
        assert!(bucket.normalize());
        assert_eq!(bucket.total(), amount("15.50"));
        assert!(!bucket.normalize());
    }

    #[test]
    fn test_push_past_max_total_is_refused() {
        let mut bucket = LedgerBucket::default();
        push(&mut bucket, "9999999999999.99");
        let before = bucket.clone();

        assert_eq!(bucket.push(amount("0.01")), Err(TotalTooLarge));
        assert_eq!(bucket, before);
        assert_eq!(bucket.total(), Amount::MAX);
    }

    #[test]
    fn test_bucket_from_entries() {
        let bucket = LedgerBucket::try_from(vec![amount("1"), amount("2.5")]).unwrap();
        assert_eq!(bucket.total(), amount("3.5"));

        let huge = amount("6000000000000");
        assert_eq!(LedgerBucket::try_from(vec![huge, huge]), Err(TotalTooLarge));
    }

    #[test]
    fn test_stored_bucket_past_max_total_is_rejected() {
        let yaml = "entries: [6000000000000.0, 6000000000000.0]\ntotal: 0.0\n";
        assert!(serde_yaml::from_str::<LedgerBucket>(yaml).is_err());

        let yaml = "entries: [1.0]\ntotal: 1.0\nnote: hi\n";
        assert!(serde_yaml::from_str::<LedgerBucket>(yaml).is_err());
    }
}
