use crate::formats::Row;

/// Bounded buffer of rows flushed together as one insert + commit
#[derive(Debug)]
pub struct Batch {
    rows: Vec<Row>,
    capacity: usize,
}

impl Batch {
    /// Create an empty batch. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a row; returns true once the batch is full and must be flushed
    ///
    /// Callers flush before pushing again, so the batch never holds more than
    /// `capacity` rows.
    pub fn push(&mut self, row: Row) -> bool {
        debug_assert!(self.rows.len() < self.capacity, "batch pushed past capacity");
        self.rows.push(row);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Empty the batch after a flush
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_reports_full() {
        let mut batch = Batch::new(2);

        assert!(!batch.push(vec![None]));
        assert!(batch.push(vec![None]));
        assert_eq!(batch.len(), 2);

        batch.clear();
        assert!(batch.is_empty());
        assert!(!batch.is_full());
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let mut batch = Batch::new(0);

        assert!(batch.push(vec![Some("x".to_string())]));
        assert_eq!(batch.rows().len(), 1);
    }
}
