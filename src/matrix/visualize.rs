//! Incidence Matrix Table
//!
//! Converting a matrix view into a printable table. Variable indices run
//! vertically in the title row so that wide models stay one terminal column per
//! variable; constraint indices label the body rows.
//!

use super::interface::*;
use prettytable::format::TableFormat;
use prettytable::*;

#[derive(Clone)]
pub struct VizTable {
    pub title: Row,
    pub rows: Vec<Row>,
}

impl VizTable {
    pub fn force_single_column(long_str: &str) -> String {
        long_str
            .chars()
            .enumerate()
            .flat_map(|(idx, c)| if idx == 0 { vec![c] } else { vec!['\n', c] })
            .collect()
    }
}

lazy_static! {
    pub static ref DEFAULT_TABLE_FORMAT: TableFormat = {
        let mut format = TableFormat::new();
        format.padding(0, 0);
        format.column_separator('\u{250A}');
        format.borders('\u{250A}');
        use format::LinePosition::*;
        let separators = [
            (Intern, ['\u{2500}', '\u{253C}', '\u{251C}', '\u{2524}']),
            (Top, ['\u{2500}', '\u{252C}', '\u{250C}', '\u{2510}']),
            (Bottom, ['\u{2500}', '\u{2534}', '\u{2514}', '\u{2518}']),
            (Title, ['\u{2550}', '\u{256A}', '\u{255E}', '\u{2561}']),
        ];
        for (position, s) in separators {
            format.separators(&[position], format::LineSeparator::new(s[0], s[1], s[2], s[3]))
        }
        format
    };
}

impl From<&dyn MatrixOrder> for VizTable {
    fn from(matrix: &dyn MatrixOrder) -> VizTable {
        // create title: one (vertical) cell per variable column, in view order
        let mut title = Row::empty();
        title.add_cell(Cell::new(""));
        for column_position in 0..matrix.columns() {
            let var_index = matrix.column_to_var(matrix.column_at(column_position));
            let var_index_str = Self::force_single_column(var_index.to_string().as_str());
            title.add_cell(Cell::new(var_index_str.as_str()).style_spec("brFm"));
        }
        // create body rows, labeled by constraint index, in view order
        let mut rows: Vec<Row> = vec![];
        for row_position in 0..matrix.rows() {
            let cons_index = matrix.row_to_cons(matrix.row_at(row_position));
            let mut table_row = Row::empty();
            table_row.add_cell(Cell::new(cons_index.to_string().as_str()).style_spec("brFb"));
            for column_position in 0..matrix.columns() {
                table_row.add_cell(Cell::new(if matrix.get_view_entry(row_position, column_position) {
                    "1"
                } else {
                    " "
                }));
            }
            rows.push(table_row);
        }
        VizTable { title, rows }
    }
}

impl From<VizTable> for Table {
    fn from(viz_table: VizTable) -> Table {
        let mut table = Table::new();
        table.set_format(*DEFAULT_TABLE_FORMAT);
        table.set_titles(viz_table.title.clone());
        for row in viz_table.rows.iter() {
            table.add_row(row.clone());
        }
        table
    }
}

impl From<VizTable> for serde_json::Value {
    fn from(viz_table: VizTable) -> serde_json::Value {
        let mut table_json = vec![];
        let mut title_json = vec![];
        for cell in viz_table.title.iter() {
            title_json.push(cell.get_content());
        }
        table_json.push(title_json);
        for row in viz_table.rows.iter() {
            let mut row_json = vec![];
            for cell in row {
                row_json.push(cell.get_content());
            }
            table_json.push(row_json);
        }
        json!(table_json)
    }
}

pub trait VizTrait {
    fn viz_table(&self) -> VizTable;
    fn printstd_str(&self) -> String {
        Table::from(self.viz_table()).to_string().replace('\r', "")
    }
    fn printstd(&self) {
        #[cfg(feature = "colorful")]
        Table::from(self.viz_table()).printstd();
        #[cfg(not(feature = "colorful"))]
        println!("{}", Table::from(self.viz_table()));
    }
}

impl VizTrait for VizTable {
    fn viz_table(&self) -> VizTable {
        self.clone()
    }
}
