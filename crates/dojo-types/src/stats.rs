use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ProgressRecord;
use crate::record::RecordKind;

/// A 3-month calendar window: Jan–Mar, Apr–Jun, Jul–Sep or Oct–Dec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    /// 1 through 4.
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Quarter {
    pub fn containing(date: NaiveDate) -> Self {
        let year = date.year();
        let index = date.month0() / 3 + 1;
        let start = first_of_month(year, index * 3 - 2);
        let next_start = if index == 4 {
            first_of_month(year + 1, 1)
        } else {
            first_of_month(year, index * 3 + 1)
        };
        let end = next_start.pred_opt().unwrap_or(NaiveDate::MAX);

        Self { year, index, start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Current-quarter totals for one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub attendances: u32,
    pub tournaments: u32,
    pub leadership_hours: i64,
    pub service_hours: i64,
    pub teaching_hours: i64,
    /// Leadership, service and teaching hours together.
    pub total_hours: i64,
    /// Latest practical score inside the quarter.
    pub practical_score: Option<i64>,
}

impl ProfileStats {
    /// Fold records into totals, skipping anything dated outside `quarter`.
    pub fn from_records<'a, I>(records: I, quarter: &Quarter) -> Self
    where
        I: IntoIterator<Item = &'a ProgressRecord>,
    {
        let mut stats = Self::default();
        let mut latest_practical: Option<&ProgressRecord> = None;

        for record in records.into_iter().filter(|r| quarter.contains(r.date)) {
            let amount = record.amount.unwrap_or(0);
            match record.kind {
                RecordKind::Attendance => stats.attendances += 1,
                RecordKind::Tournament => stats.tournaments += 1,
                RecordKind::LeadershipHours => {
                    stats.leadership_hours = stats.leadership_hours.saturating_add(amount)
                }
                RecordKind::ServiceHours => stats.service_hours = stats.service_hours.saturating_add(amount),
                RecordKind::TeachingHours => stats.teaching_hours = stats.teaching_hours.saturating_add(amount),
                RecordKind::PracticalScore => {
                    let newer = latest_practical.is_none_or(|prev| {
                        (record.date, record.created_at) >= (prev.date, prev.created_at)
                    });
                    if newer {
                        latest_practical = Some(record);
                    }
                }
            }
        }

        stats.practical_score = latest_practical.and_then(|r| r.amount);
        stats.total_hours = stats
            .leadership_hours
            .saturating_add(stats.service_hours)
            .saturating_add(stats.teaching_hours);
        stats
    }
}

/// Group records by owner and compute each owner's stats.
pub fn stats_by_user<'a, I>(records: I, quarter: &Quarter) -> HashMap<Uuid, ProfileStats>
where
    I: IntoIterator<Item = &'a ProgressRecord>,
{
    let mut grouped: HashMap<Uuid, Vec<&ProgressRecord>> = HashMap::new();
    for record in records {
        grouped.entry(record.user_id).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(user_id, rows)| (user_id, ProfileStats::from_records(rows, quarter)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(user_id: Uuid, kind: RecordKind, on: NaiveDate, amount: Option<i64>, seq: i64) -> ProgressRecord {
        ProgressRecord {
            id: Uuid::new_v4(),
            user_id,
            kind,
            date: on,
            label: None,
            amount,
            created_at: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
        }
    }

    #[test]
    fn quarter_bounds() {
        let q = Quarter::containing(date(2024, 2, 29));
        assert_eq!((q.year, q.index), (2024, 1));
        assert_eq!(q.start, date(2024, 1, 1));
        assert_eq!(q.end, date(2024, 3, 31));

        let q = Quarter::containing(date(2024, 6, 30));
        assert_eq!(q.index, 2);
        assert_eq!(q.end, date(2024, 6, 30));

        let q = Quarter::containing(date(2023, 10, 1));
        assert_eq!(q.index, 4);
        assert_eq!(q.start, date(2023, 10, 1));
        assert_eq!(q.end, date(2023, 12, 31));
    }

    #[test]
    fn quarter_membership_is_year_scoped() {
        let q = Quarter::containing(date(2024, 8, 15));
        assert!(q.contains(date(2024, 7, 1)));
        assert!(q.contains(date(2024, 9, 30)));
        assert!(!q.contains(date(2024, 10, 1)));
        assert!(!q.contains(date(2023, 8, 15)));
    }

    #[test]
    fn stats_count_only_current_quarter() {
        let user = Uuid::new_v4();
        let q = Quarter::containing(date(2024, 5, 10));
        let records = vec![
            record(user, RecordKind::Attendance, date(2024, 4, 2), None, 0),
            record(user, RecordKind::Attendance, date(2024, 5, 9), None, 1),
            record(user, RecordKind::Attendance, date(2024, 3, 31), None, 2),
            record(user, RecordKind::Tournament, date(2024, 6, 1), None, 3),
            record(user, RecordKind::LeadershipHours, date(2024, 4, 20), Some(3), 4),
            record(user, RecordKind::LeadershipHours, date(2024, 5, 1), Some(2), 5),
            record(user, RecordKind::LeadershipHours, date(2023, 5, 1), Some(10), 6),
            record(user, RecordKind::ServiceHours, date(2024, 6, 30), Some(4), 7),
            record(user, RecordKind::TeachingHours, date(2024, 4, 1), Some(1), 8),
        ];

        let stats = ProfileStats::from_records(&records, &q);
        assert_eq!(stats.attendances, 2);
        assert_eq!(stats.tournaments, 1);
        assert_eq!(stats.leadership_hours, 5);
        assert_eq!(stats.service_hours, 4);
        assert_eq!(stats.teaching_hours, 1);
        assert_eq!(stats.total_hours, 10);
        assert_eq!(stats.practical_score, None);
    }

    #[test]
    fn latest_practical_wins() {
        let user = Uuid::new_v4();
        let q = Quarter::containing(date(2024, 11, 1));
        let records = vec![
            record(user, RecordKind::PracticalScore, date(2024, 12, 1), Some(88), 0),
            record(user, RecordKind::PracticalScore, date(2024, 10, 5), Some(95), 1),
            record(user, RecordKind::PracticalScore, date(2025, 1, 2), Some(70), 2),
        ];
        assert_eq!(ProfileStats::from_records(&records, &q).practical_score, Some(88));

        // same date: the later entry replaces the earlier one
        let records = vec![
            record(user, RecordKind::PracticalScore, date(2024, 12, 1), Some(60), 5),
            record(user, RecordKind::PracticalScore, date(2024, 12, 1), Some(75), 3),
        ];
        assert_eq!(ProfileStats::from_records(&records, &q).practical_score, Some(60));
    }

    #[test]
    fn huge_hours_saturate() {
        let user = Uuid::new_v4();
        let q = Quarter::containing(date(2024, 8, 1));
        let records = vec![
            record(user, RecordKind::LeadershipHours, date(2024, 8, 1), Some(i64::MAX), 0),
            record(user, RecordKind::LeadershipHours, date(2024, 8, 2), Some(i64::MAX), 1),
            record(user, RecordKind::ServiceHours, date(2024, 8, 3), Some(5), 2),
        ];

        let stats = ProfileStats::from_records(&records, &q);
        assert_eq!(stats.leadership_hours, i64::MAX);
        assert_eq!(stats.total_hours, i64::MAX);
    }

    #[test]
    fn grouped_by_user() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let q = Quarter::containing(date(2024, 1, 15));
        let records = vec![
            record(a, RecordKind::Attendance, date(2024, 1, 3), None, 0),
            record(b, RecordKind::Attendance, date(2024, 1, 4), None, 1),
            record(a, RecordKind::Attendance, date(2024, 2, 3), None, 2),
        ];

        let by_user = stats_by_user(&records, &q);
        assert_eq!(by_user[&a].attendances, 2);
        assert_eq!(by_user[&b].attendances, 1);
    }
}
