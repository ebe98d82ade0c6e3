//! Incidence Matrix Row
//!
//! A single 0/1 row of the constraint-variable incidence matrix, bit-packed.
//! Unlike a dense bool vector this keeps even wide models cheap to copy while
//! the ordering engine shuffles rows around.
//!

use derivative::Derivative;

pub type BitUnit = usize;
pub const BIT_UNIT_LENGTH: usize = std::mem::size_of::<BitUnit>() * 8;

#[derive(Clone, Debug, Derivative, PartialEq, Eq)]
#[derivative(Default(new = "true"))]
pub struct BitRow {
    units: Vec<BitUnit>,
}

impl BitRow {
    pub fn new_length(column_count: usize) -> Self {
        Self {
            units: vec![0; column_count.div_ceil(BIT_UNIT_LENGTH)],
        }
    }

    pub fn set(&mut self, column: usize, value: bool) {
        let unit_index = column / BIT_UNIT_LENGTH;
        let bit_index = column % BIT_UNIT_LENGTH;
        if value {
            self.units[unit_index] |= 0x01 << bit_index;
        } else {
            self.units[unit_index] &= !(0x01 << bit_index);
        }
    }

    pub fn get(&self, column: usize) -> bool {
        let unit_index = column / BIT_UNIT_LENGTH;
        let bit_index = column % BIT_UNIT_LENGTH;
        self.units[unit_index] & (0x01 << bit_index) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.units.iter().map(|unit| unit.count_ones() as usize).sum()
    }

    pub fn is_all_zero(&self) -> bool {
        self.units.iter().all(|&unit| unit == 0)
    }

    /// ascending raw column indices of the nonzero entries
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.units.iter().enumerate().flat_map(|(unit_index, &unit)| {
            let mut remaining = unit;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit_index = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(unit_index * BIT_UNIT_LENGTH + bit_index)
            })
        })
    }

    /// only trigger updates when the new `column_count` crosses a unit boundary
    #[inline]
    fn add_one_column_should_append(column_count: usize) -> bool {
        (column_count - 1) % BIT_UNIT_LENGTH == 0
    }

    /// make sure this function is called exactly once when a column is appended
    pub(super) fn add_one_column(rows: &mut [Self], column_count: usize) {
        if Self::add_one_column_should_append(column_count) {
            for row in rows {
                row.units.push(0);
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn matrix_row_simple_case() {
        // cargo test matrix_row_simple_case -- --nocapture
        let mut row = BitRow::new_length(8);
        assert!(row.is_all_zero());
        row.set(0, true);
        row.set(4, true);
        assert!(row.get(0) && row.get(4) && !row.get(1));
        assert_eq!(row.count_ones(), 2);
        assert_eq!(row.iter_ones().collect::<Vec<_>>(), vec![0, 4]);
        row.set(0, false);
        assert_eq!(row.iter_ones().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn matrix_row_crosses_unit_boundary() {
        // cargo test matrix_row_crosses_unit_boundary -- --nocapture
        let mut row = BitRow::new_length(2 * BIT_UNIT_LENGTH + 3);
        row.set(BIT_UNIT_LENGTH - 1, true);
        row.set(BIT_UNIT_LENGTH, true);
        row.set(2 * BIT_UNIT_LENGTH + 2, true);
        assert_eq!(
            row.iter_ones().collect::<Vec<_>>(),
            vec![BIT_UNIT_LENGTH - 1, BIT_UNIT_LENGTH, 2 * BIT_UNIT_LENGTH + 2]
        );
        assert_eq!(row.count_ones(), 3);
    }

    #[test]
    fn matrix_row_random_operations() {
        // cargo test matrix_row_random_operations -- --nocapture
        let mut rng = rand::thread_rng();
        for column_count in 1..200 {
            let mut row = BitRow::new_length(column_count);
            let mut mirror = vec![false; column_count];
            for _ in 0..500 {
                let column = rng.gen::<usize>() % column_count;
                let value = rng.gen();
                row.set(column, value);
                mirror[column] = value;
            }
            for column in 0..column_count {
                assert_eq!(row.get(column), mirror[column]);
            }
            let expected: Vec<usize> = (0..column_count).filter(|&c| mirror[c]).collect();
            assert_eq!(row.iter_ones().collect::<Vec<_>>(), expected);
            assert_eq!(row.count_ones(), expected.len());
        }
    }

    #[test]
    fn matrix_row_add_columns() {
        // cargo test matrix_row_add_columns -- --nocapture
        let mut rows = vec![BitRow::new_length(0)];
        for column_count in 1..=(2 * BIT_UNIT_LENGTH + 5) {
            BitRow::add_one_column(&mut rows, column_count);
            rows[0].set(column_count - 1, true);
        }
        assert_eq!(rows[0].count_ones(), 2 * BIT_UNIT_LENGTH + 5);
    }
}
