use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a stock movement relative to sellable on-hand stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

/// One audited change to a stock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub timestamp: DateTime<Utc>,
    pub direction: MovementDirection,
    pub quantity: i64,
    pub reason: String,
    pub reference: String,
}

impl StockMovement {
    /// Inclusive on both bounds; a missing bound is open.
    pub fn within(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
        from.is_none_or(|f| self.timestamp >= f) && to.is_none_or(|t| self.timestamp <= t)
    }
}

/// A date-bounded view over a movement log.
///
/// Filtering happens while iterating, and `iter()` can be called any number
/// of times; reading never touches the underlying record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementWindow {
    movements: Vec<StockMovement>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl MovementWindow {
    pub fn new(
        movements: Vec<StockMovement>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        Self { movements, from, to }
    }

    pub fn iter(&self) -> WindowIter<'_> {
        WindowIter {
            inner: self.movements.iter(),
            from: self.from,
            to: self.to,
        }
    }
}

impl<'a> IntoIterator for &'a MovementWindow {
    type Item = &'a StockMovement;
    type IntoIter = WindowIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the movements of a [`MovementWindow`].
#[derive(Debug, Clone)]
pub struct WindowIter<'a> {
    inner: core::slice::Iter<'a, StockMovement>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl<'a> Iterator for WindowIter<'a> {
    type Item = &'a StockMovement;

    fn next(&mut self) -> Option<Self::Item> {
        let (from, to) = (self.from, self.to);
        self.inner.by_ref().find(|m| m.within(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn movement_at(ts: DateTime<Utc>, quantity: i64) -> StockMovement {
        StockMovement {
            timestamp: ts,
            direction: MovementDirection::In,
            quantity,
            reason: "add".to_string(),
            reference: "REF".to_string(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive_and_iteration_restarts() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let log = vec![
            movement_at(t0, 1),
            movement_at(t0 + Duration::days(1), 2),
            movement_at(t0 + Duration::days(2), 3),
        ];

        let window = MovementWindow::new(log, Some(t0 + Duration::days(1)), Some(t0 + Duration::days(2)));
        let first: Vec<i64> = window.iter().map(|m| m.quantity).collect();
        let second: Vec<i64> = (&window).into_iter().map(|m| m.quantity).collect();

        assert_eq!(first, vec![2, 3]);
        assert_eq!(first, second);
    }

    #[test]
    fn open_window_yields_everything() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let window = MovementWindow::new(vec![movement_at(t0, 1), movement_at(t0, 2)], None, None);
        assert_eq!(window.iter().count(), 2);
    }
}
