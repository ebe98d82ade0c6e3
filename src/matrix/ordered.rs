//! Ordered Matrix View
//!
//! A row order and a column order on top of the fixed incidence layout, plus the
//! first/last-nonzero bookkeeping (`ibegin`/`iend`/`jbegin`/`jend`) that the
//! ordering engine and the blocking policies consume. Orders are permutations of
//! the raw indices; positions are recomputed whenever an order is replaced, there
//! is no incremental pointer surgery.
//!

use super::basic::*;
use super::interface::*;
use super::visualize::*;
use crate::util::*;

/// first/last nonzero positions per row and per column of an ordered view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanInfo {
    /// per row position, the first nonzero column position
    pub ibegin: Vec<usize>,
    /// per row position, the last nonzero column position
    pub iend: Vec<usize>,
    /// per column position, the first row position touching it
    pub jbegin: Vec<usize>,
    /// per column position, the last row position touching it
    pub jend: Vec<usize>,
}

impl SpanInfo {
    /// the band width of the row at this position
    pub fn row_width(&self, row_position: usize) -> usize {
        self.iend[row_position] - self.ibegin[row_position] + 1
    }
}

#[derive(Clone, Debug)]
pub struct Ordered {
    pub matrix: IncidenceMatrix,
    /// position -> raw row
    row_order: Vec<RowIndex>,
    /// raw row -> position
    row_positions: Vec<usize>,
    /// position -> raw column
    column_order: Vec<ColumnIndex>,
    /// raw column -> position
    column_positions: Vec<usize>,
}

impl Ordered {
    pub fn new(matrix: IncidenceMatrix) -> Self {
        let row_order: Vec<RowIndex> = (0..matrix.rows()).collect();
        let column_order: Vec<ColumnIndex> = (0..matrix.columns()).collect();
        Self {
            row_positions: row_order.clone(),
            column_positions: column_order.clone(),
            matrix,
            row_order,
            column_order,
        }
    }

    pub fn row_order(&self) -> &[RowIndex] {
        &self.row_order
    }

    pub fn column_order(&self) -> &[ColumnIndex] {
        &self.column_order
    }

    pub fn row_position(&self, row: RowIndex) -> usize {
        self.row_positions[row]
    }

    pub fn column_position(&self, column: ColumnIndex) -> usize {
        self.column_positions[column]
    }

    pub fn set_row_order(&mut self, row_order: Vec<RowIndex>) {
        self.row_positions = Self::invert_permutation(&row_order, self.matrix.rows());
        self.row_order = row_order;
    }

    pub fn set_column_order(&mut self, column_order: Vec<ColumnIndex>) {
        self.column_positions = Self::invert_permutation(&column_order, self.matrix.columns());
        self.column_order = column_order;
    }

    /// panics unless `order` is a permutation of `0..length`
    fn invert_permutation(order: &[usize], length: usize) -> Vec<usize> {
        assert_eq!(order.len(), length, "order length mismatch");
        let mut positions = vec![usize::MAX; length];
        for (position, &index) in order.iter().enumerate() {
            assert!(index < length && positions[index] == usize::MAX, "not a permutation");
            positions[index] = position;
        }
        positions
    }

    /// recompute the four span arrays for the current orders;
    /// every row and column must have at least one nonzero (the relevance
    /// filtering guarantees this for matrices built from a view)
    pub fn spans(&self) -> SpanInfo {
        let rows = self.matrix.rows();
        let columns = self.matrix.columns();
        let mut ibegin = vec![usize::MAX; rows];
        let mut iend = vec![0; rows];
        let mut jbegin = vec![usize::MAX; columns];
        let mut jend = vec![0; columns];
        for (row_position, &row) in self.row_order.iter().enumerate() {
            let row_columns = self.matrix.columns_of_row(row);
            assert!(!row_columns.is_empty(), "row {} has no nonzero entry", row);
            for &column in row_columns.iter() {
                let column_position = self.column_positions[column];
                ibegin[row_position] = ibegin[row_position].min(column_position);
                iend[row_position] = iend[row_position].max(column_position);
                jbegin[column_position] = jbegin[column_position].min(row_position);
                jend[column_position] = jend[column_position].max(row_position);
            }
        }
        assert!(
            jbegin.iter().all(|&position| position != usize::MAX),
            "column without any nonzero entry"
        );
        SpanInfo {
            ibegin,
            iend,
            jbegin,
            jend,
        }
    }
}

impl std::ops::Deref for Ordered {
    type Target = IncidenceMatrix;
    fn deref(&self) -> &Self::Target {
        &self.matrix
    }
}

impl MatrixBasic for Ordered {
    fn add_variable(&mut self, var_index: VarIndex) -> Option<ColumnIndex> {
        let column = self.matrix.add_variable(var_index)?;
        // new columns go to the back of the view
        self.column_order.push(column);
        self.column_positions.push(self.column_order.len() - 1);
        Some(column)
    }

    fn add_constraint(&mut self, cons_index: ConsIndex, incident_vars: &[VarIndex]) -> Option<RowIndex> {
        for &var_index in incident_vars.iter() {
            self.add_variable(var_index);
        }
        let row = self.matrix.add_constraint(cons_index, incident_vars)?;
        self.row_order.push(row);
        self.row_positions.push(self.row_order.len() - 1);
        Some(row)
    }

    fn get_entry(&self, row: RowIndex, column: ColumnIndex) -> bool {
        self.matrix.get_entry(row, column)
    }

    fn var_to_column(&self, var_index: VarIndex) -> Option<ColumnIndex> {
        self.matrix.var_to_column(var_index)
    }

    fn cons_to_row(&self, cons_index: ConsIndex) -> Option<RowIndex> {
        self.matrix.cons_to_row(cons_index)
    }

    fn column_to_var(&self, column: ColumnIndex) -> VarIndex {
        self.matrix.column_to_var(column)
    }

    fn row_to_cons(&self, row: RowIndex) -> ConsIndex {
        self.matrix.row_to_cons(row)
    }
}

impl MatrixOrder for Ordered {
    fn rows(&self) -> usize {
        self.row_order.len()
    }

    fn columns(&self) -> usize {
        self.column_order.len()
    }

    fn row_at(&self, position: RowIndex) -> RowIndex {
        self.row_order[position]
    }

    fn column_at(&self, position: ColumnIndex) -> ColumnIndex {
        self.column_order[position]
    }
}

impl VizTrait for Ordered {
    fn viz_table(&self) -> VizTable {
        VizTable::from(self as &dyn MatrixOrder)
    }
}
