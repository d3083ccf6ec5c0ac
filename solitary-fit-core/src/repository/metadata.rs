use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::BTreeSet;

/// The set of dates a repository holds records for.
///
/// Answers "is there a record for this date" without loading the record.
/// Repositories seed it when opened and call [`record`](Self::record) only
/// after a write has durably completed.
#[derive(Debug, Default)]
pub struct RecordIndex {
    dates: RwLock<BTreeSet<NaiveDate>>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self {
            dates: RwLock::new(dates.into_iter().collect()),
        }
    }

    pub fn contains_record(&self, date: NaiveDate) -> bool {
        self.dates.read().contains(&date)
    }

    /// Iterates the recorded dates in ascending order.
    ///
    /// Each call starts over from a snapshot, so writes made while iterating
    /// are not seen by that iterator.
    pub fn records(&self) -> Records {
        let snapshot: Vec<NaiveDate> = self.dates.read().iter().copied().collect();
        Records {
            inner: snapshot.into_iter(),
        }
    }

    pub fn first_record(&self) -> Option<NaiveDate> {
        self.dates.read().first().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.read().is_empty()
    }

    /// Marks `date` as recorded. Returns `false` if it already was.
    pub fn record(&self, date: NaiveDate) -> bool {
        self.dates.write().insert(date)
    }
}

/// Iterator over a snapshot of a [`RecordIndex`].
#[derive(Debug, Clone)]
pub struct Records {
    inner: std::vec::IntoIter<NaiveDate>,
}

impl Iterator for Records {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Records {}
