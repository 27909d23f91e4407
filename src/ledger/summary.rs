//! Pure aggregation of the entry set into monthly totals and balances.

use chrono::Datelike;

use super::MilkEntry;

/// Monetary position of a month once borrowed and sold amounts cancel
/// out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancePosition {
    /// Net balance is positive: this much is owed to the user.
    ToReceive(i64),
    /// Net balance is negative: the user owes this much (magnitude).
    ToPay(i64),
    Settled,
}

/// Derived totals for one calendar month at a given per-litre price.
/// Recomputed on every read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    /// Litres borrowed during the month.
    pub total_borrowed: f64,
    /// Litres sold during the month.
    pub total_sold: f64,
    /// Whole currency units owed by the user, truncated toward zero.
    pub amount_to_pay: i64,
    /// Whole currency units owed to the user, truncated toward zero.
    pub amount_to_receive: i64,
    /// `amount_to_receive - amount_to_pay`.
    pub net_balance: i64,
}

impl MonthlySummary {
    pub fn position(&self) -> BalancePosition {
        if self.net_balance > 0 {
            BalancePosition::ToReceive(self.net_balance)
        } else if self.net_balance < 0 {
            BalancePosition::ToPay(-self.net_balance)
        } else {
            BalancePosition::Settled
        }
    }
}

/// Summarizes the entries falling inside `(year, month)` at
/// `price_per_litre`. Amounts are truncated toward zero, not rounded;
/// the fractional part of `total × price` is discarded.
pub fn summarize(
    entries: &[MilkEntry],
    year: i32,
    month: u32,
    price_per_litre: f64,
) -> MonthlySummary {
    let mut total_borrowed = 0.0;
    let mut total_sold = 0.0;
    for entry in entries
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
    {
        if entry.is_borrowed {
            total_borrowed += entry.quantity;
        } else {
            total_sold += entry.quantity;
        }
    }

    let amount_to_pay = (total_borrowed * price_per_litre).trunc() as i64;
    let amount_to_receive = (total_sold * price_per_litre).trunc() as i64;

    MonthlySummary {
        year,
        month,
        total_borrowed,
        total_sold,
        amount_to_pay,
        amount_to_receive,
        net_balance: amount_to_receive - amount_to_pay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(date: (i32, u32, u32), quantity: f64, is_borrowed: bool) -> MilkEntry {
        MilkEntry::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity,
            is_borrowed,
        )
        .unwrap()
    }

    #[test]
    fn amounts_truncate_toward_zero() {
        let entries = vec![
            entry((2024, 4, 1), 2.0, false),
            entry((2024, 4, 2), 1.5, true),
        ];
        let summary = summarize(&entries, 2024, 4, 35.0);
        assert_eq!(summary.total_sold, 2.0);
        assert_eq!(summary.total_borrowed, 1.5);
        assert_eq!(summary.amount_to_receive, 70);
        assert_eq!(summary.amount_to_pay, 52); // 52.5 truncated
        assert_eq!(summary.net_balance, 18);
        assert_eq!(summary.position(), BalancePosition::ToReceive(18));
    }

    #[test]
    fn entries_outside_the_month_are_ignored() {
        let entries = vec![
            entry((2024, 3, 31), 4.0, false),
            entry((2024, 4, 1), 1.0, false),
            entry((2024, 5, 1), 4.0, false),
            entry((2023, 4, 15), 4.0, false),
        ];
        let summary = summarize(&entries, 2024, 4, 10.0);
        assert_eq!(summary.total_sold, 1.0);
        assert_eq!(summary.amount_to_receive, 10);
    }

    #[test]
    fn empty_month_is_settled() {
        let summary = summarize(&[], 2024, 4, 35.0);
        assert_eq!(summary.net_balance, 0);
        assert_eq!(summary.position(), BalancePosition::Settled);
    }

    #[test]
    fn to_pay_position_reports_magnitude() {
        let entries = vec![entry((2024, 4, 3), 3.0, true)];
        let summary = summarize(&entries, 2024, 4, 35.0);
        assert_eq!(summary.position(), BalancePosition::ToPay(105));
    }

    #[test]
    fn summarize_is_deterministic() {
        let entries = vec![
            entry((2024, 4, 1), 2.25, false),
            entry((2024, 4, 9), 0.75, true),
        ];
        let first = summarize(&entries, 2024, 4, 41.5);
        let second = summarize(&entries, 2024, 4, 41.5);
        assert_eq!(first, second);
    }
}
