use super::interface::*;
use super::row::*;
use super::visualize::*;
use crate::incidence::RelevantView;
use crate::util::*;
use derivative::Derivative;
use std::collections::BTreeMap;

/// the constraint-variable incidence matrix in its fixed layout:
/// rows and columns are in insertion order, reordering happens in views
#[derive(Clone, Debug, Derivative, PartialEq, Eq)]
#[derivative(Default(new = "true"))]
pub struct IncidenceMatrix {
    /// raw column index -> variable
    pub variables: Vec<VarIndex>,
    /// raw row index -> constraint
    pub constraints: Vec<ConsIndex>,
    /// variable -> raw column index
    var_columns: BTreeMap<VarIndex, ColumnIndex>,
    /// constraint -> raw row index
    cons_rows: BTreeMap<ConsIndex, RowIndex>,
    /// bit-packed rows
    rows: Vec<BitRow>,
    /// per raw row, the sorted raw columns of its nonzeros
    row_columns: Vec<Vec<ColumnIndex>>,
}

impl IncidenceMatrix {
    /// rows and columns in view order, so raw row r is the constraint at view position r
    pub fn from_view(view: &RelevantView) -> Self {
        let mut matrix = Self::new();
        for &var_index in view.vars.iter() {
            matrix.add_variable(var_index);
        }
        for (cons_position, &cons_index) in view.conss.iter().enumerate() {
            let incident_vars: Vec<VarIndex> = view.cons_incidences[cons_position]
                .iter()
                .map(|&var_position| view.vars[var_position])
                .collect();
            matrix.add_constraint(cons_index, &incident_vars);
        }
        matrix
    }

    /// the sorted raw columns of a row's nonzeros
    pub fn columns_of_row(&self, row: RowIndex) -> &[ColumnIndex] {
        &self.row_columns[row]
    }
}

impl MatrixBasic for IncidenceMatrix {
    fn add_variable(&mut self, var_index: VarIndex) -> Option<ColumnIndex> {
        if self.var_columns.contains_key(&var_index) {
            return None;
        }
        let column = self.variables.len();
        self.var_columns.insert(var_index, column);
        self.variables.push(var_index);
        BitRow::add_one_column(&mut self.rows, self.variables.len());
        Some(column)
    }

    fn add_constraint(&mut self, cons_index: ConsIndex, incident_vars: &[VarIndex]) -> Option<RowIndex> {
        if self.cons_rows.contains_key(&cons_index) {
            // no need to add a repeated constraint
            return None;
        }
        for &var_index in incident_vars.iter() {
            self.add_variable(var_index);
        }
        let row_index = self.rows.len();
        self.cons_rows.insert(cons_index, row_index);
        self.constraints.push(cons_index);
        let mut row = BitRow::new_length(self.variables.len());
        let mut columns: Vec<ColumnIndex> = incident_vars.iter().map(|v| self.var_columns[v]).collect();
        columns.sort_unstable();
        for &column in columns.iter() {
            row.set(column, true);
        }
        self.rows.push(row);
        self.row_columns.push(columns);
        Some(row_index)
    }

    fn get_entry(&self, row: RowIndex, column: ColumnIndex) -> bool {
        self.rows[row].get(column)
    }

    fn var_to_column(&self, var_index: VarIndex) -> Option<ColumnIndex> {
        self.var_columns.get(&var_index).copied()
    }

    fn cons_to_row(&self, cons_index: ConsIndex) -> Option<RowIndex> {
        self.cons_rows.get(&cons_index).copied()
    }

    fn column_to_var(&self, column: ColumnIndex) -> VarIndex {
        self.variables[column]
    }

    fn row_to_cons(&self, row: RowIndex) -> ConsIndex {
        self.constraints[row]
    }
}

impl MatrixOrder for IncidenceMatrix {
    fn rows(&self) -> usize {
        self.constraints.len()
    }

    fn columns(&self) -> usize {
        self.variables.len()
    }

    fn row_at(&self, position: RowIndex) -> RowIndex {
        position
    }

    fn column_at(&self, position: ColumnIndex) -> ColumnIndex {
        position
    }
}

impl VizTrait for IncidenceMatrix {
    fn viz_table(&self) -> VizTable {
        VizTable::from(self as &dyn MatrixOrder)
    }
}
