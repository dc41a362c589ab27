use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{NumberFormat, TableError, Value};

static NULL: Value = Value::Null;

/// A single dictionary-coded column: an ordered list of distinct symbols
/// plus one code per row referencing it (`None` for null cells).
#[derive(Clone, Debug, Default)]
pub struct Column {
    name: String,
    symbols: Vec<Value>,
    lookup: HashMap<Value, u32>,
    codes: Vec<Option<u32>>,
    format: NumberFormat,
    tags: Vec<String>,
}

impl Column {
    fn new(name: String) -> Self {
        Column {
            name,
            ..Column::default()
        }
    }

    /// Assemble a column from already-decoded parts.
    ///
    /// Intended for file readers that hold the symbol list and row codes
    /// separately. Codes must index `symbols`; out-of-range codes read back
    /// as null. Duplicate symbols keep their first code on re-interning.
    pub fn from_parts(
        name: String,
        symbols: Vec<Value>,
        codes: Vec<Option<u32>>,
        format: NumberFormat,
        tags: Vec<String>,
    ) -> Self {
        debug_assert!(
            codes
                .iter()
                .flatten()
                .all(|&c| (c as usize) < symbols.len()),
            "row code out of range for symbol list"
        );
        let mut lookup = HashMap::with_capacity(symbols.len());
        for (code, symbol) in symbols.iter().enumerate() {
            lookup.entry(symbol.clone()).or_insert(code as u32);
        }
        Column {
            name,
            symbols,
            lookup,
            codes,
            format,
            tags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered list of distinct symbols.
    pub fn symbols(&self) -> &[Value] {
        &self.symbols
    }

    /// One entry per row: a code into [`Column::symbols`], or `None`.
    pub fn codes(&self) -> &[Option<u32>] {
        &self.codes
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The value of the given row; null when out of bounds.
    pub fn value(&self, row: usize) -> &Value {
        match self.codes.get(row) {
            Some(Some(code)) => self.symbols.get(*code as usize).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    fn intern(&mut self, value: Value) -> Option<u32> {
        if value.is_null() {
            return None;
        }
        if let Some(&code) = self.lookup.get(&value) {
            return Some(code);
        }
        let code = self.symbols.len() as u32;
        self.lookup.insert(value.clone(), code);
        self.symbols.push(value);
        Some(code)
    }

    fn push(&mut self, value: Value) {
        let code = self.intern(value);
        self.codes.push(code);
    }

    fn replace_values(&mut self, values: Vec<Value>) {
        self.symbols.clear();
        self.lookup.clear();
        self.codes.clear();
        for value in values {
            self.push(value);
        }
    }

    /// Drop symbols no row references, remapping codes. Symbol order is
    /// preserved for the survivors.
    fn compact(&mut self) {
        let mut used = vec![false; self.symbols.len()];
        for code in self.codes.iter().flatten() {
            if let Some(slot) = used.get_mut(*code as usize) {
                *slot = true;
            }
        }
        if used.iter().all(|&u| u) {
            return;
        }

        let mut remap = vec![0u32; self.symbols.len()];
        let mut kept = Vec::new();
        for (old, symbol) in std::mem::take(&mut self.symbols).into_iter().enumerate() {
            if used[old] {
                remap[old] = kept.len() as u32;
                kept.push(symbol);
            }
        }
        self.symbols = kept;
        self.lookup.clear();
        for (code, symbol) in self.symbols.iter().enumerate() {
            self.lookup.entry(symbol.clone()).or_insert(code as u32);
        }
        for code in self.codes.iter_mut().flatten() {
            *code = remap[*code as usize];
        }
    }
}

/// How [`QvdTable::join`] treats unmatched rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

/// An in-memory QVD table: ordered columns over N rows.
///
/// Cells are stored dictionary-coded; every accessor materializes
/// [`Value`]s on demand. Derived operations (`filter_by`, `sort_by`,
/// `concat`, `join`, slices) return new tables and leave the receiver
/// untouched.
#[derive(Clone, Debug, Default)]
pub struct QvdTable {
    columns: Vec<Column>,
    rows: usize,
}

impl QvdTable {
    pub fn new() -> Self {
        QvdTable::default()
    }

    /// Build a table from `(name, values)` pairs. All columns must have the
    /// same length and distinct names.
    pub fn from_columns(
        columns: impl IntoIterator<Item = (String, Vec<Value>)>,
    ) -> Result<Self, TableError> {
        let mut table = QvdTable::new();
        for (name, values) in columns {
            table.add_column(name, values)?;
        }
        Ok(table)
    }

    /// Assemble a table from pre-built columns (file-reader path). Columns
    /// must have one code per row and distinct names.
    pub fn from_parts(columns: Vec<Column>) -> Result<Self, TableError> {
        let rows = columns.first().map_or(0, |c| c.codes.len());
        let mut seen = HashMap::new();
        for column in &columns {
            if column.codes.len() != rows {
                return Err(TableError::ColumnLengthMismatch {
                    expected: rows,
                    actual: column.codes.len(),
                });
            }
            if seen.insert(column.name.clone(), ()).is_some() {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(QvdTable { columns, rows })
    }

    /// Materialize as `(name, values)` pairs in column order.
    pub fn to_columns(&self) -> Vec<(String, Vec<Value>)> {
        self.columns
            .iter()
            .map(|column| {
                let values = (0..self.rows).map(|row| column.value(row).clone()).collect();
                (column.name.clone(), values)
            })
            .collect()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    fn check_row(&self, index: usize) -> Result<(), TableError> {
        if index >= self.rows {
            return Err(TableError::RowIndexOutOfBounds {
                index,
                rows: self.rows,
            });
        }
        Ok(())
    }

    fn check_row_shape(&self, len: usize) -> Result<(), TableError> {
        if len != self.columns.len() {
            return Err(TableError::RowLengthMismatch {
                expected: self.columns.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// The cell at `(row, column)`.
    pub fn get(&self, row: usize, column: &str) -> Result<&Value, TableError> {
        self.check_row(row)?;
        Ok(self.column(column)?.value(row))
    }

    /// Replace the cell at `(row, column)`, interning the value into the
    /// column's symbol list (reused if an equal symbol exists).
    pub fn set(
        &mut self,
        row: usize,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<(), TableError> {
        self.check_row(row)?;
        let index = self.column_index(column)?;
        let column = &mut self.columns[index];
        column.codes[row] = column.intern(value.into());
        Ok(())
    }

    pub fn row(&self, index: usize) -> Result<Vec<Value>, TableError> {
        self.check_row(index)?;
        Ok(self
            .columns
            .iter()
            .map(|column| column.value(index).clone())
            .collect())
    }

    pub fn set_row(&mut self, index: usize, values: Vec<Value>) -> Result<(), TableError> {
        self.check_row(index)?;
        self.check_row_shape(values.len())?;
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.codes[index] = column.intern(value);
        }
        Ok(())
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<Value>, TableError> {
        let column = self.column(name)?;
        Ok((0..self.rows).map(|row| column.value(row).clone()).collect())
    }

    /// Replace an existing column's values wholesale. Its symbol list is
    /// rebuilt; format and tags are kept.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows {
            return Err(TableError::ColumnLengthMismatch {
                expected: self.rows,
                actual: values.len(),
            });
        }
        let index = self.column_index(name)?;
        self.columns[index].replace_values(values);
        Ok(())
    }

    /// Append a new column. On a table with no columns yet this sets the
    /// row count.
    pub fn add_column(&mut self, name: String, values: Vec<Value>) -> Result<(), TableError> {
        if self.columns.iter().any(|c| c.name == name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && values.len() != self.rows {
            return Err(TableError::ColumnLengthMismatch {
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.rows = values.len();
        let mut column = Column::new(name);
        for value in values {
            column.push(value);
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn column_format(&self, name: &str) -> Result<&NumberFormat, TableError> {
        Ok(&self.column(name)?.format)
    }

    pub fn set_column_format(&mut self, name: &str, format: NumberFormat) -> Result<(), TableError> {
        let index = self.column_index(name)?;
        self.columns[index].format = format;
        Ok(())
    }

    pub fn set_column_tags(&mut self, name: &str, tags: Vec<String>) -> Result<(), TableError> {
        let index = self.column_index(name)?;
        self.columns[index].tags = tags;
        Ok(())
    }

    pub fn append_row(&mut self, values: Vec<Value>) -> Result<(), TableError> {
        self.check_row_shape(values.len())?;
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
        self.rows += 1;
        Ok(())
    }

    /// Insert a row before `index`; `index == row_count()` appends.
    pub fn insert_row(&mut self, index: usize, values: Vec<Value>) -> Result<(), TableError> {
        if index > self.rows {
            return Err(TableError::RowIndexOutOfBounds {
                index,
                rows: self.rows,
            });
        }
        self.check_row_shape(values.len())?;
        for (column, value) in self.columns.iter_mut().zip(values) {
            let code = column.intern(value);
            column.codes.insert(index, code);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn drop_row(&mut self, index: usize) -> Result<(), TableError> {
        self.check_row(index)?;
        for column in &mut self.columns {
            column.codes.remove(index);
        }
        self.rows -= 1;
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), TableError> {
        let index = self.column_index(name)?;
        self.columns.remove(index);
        Ok(())
    }

    /// New table with the rows at `indices`, in that order. Symbol lists
    /// are carried over as-is; call [`QvdTable::compact`] to shed unused
    /// symbols.
    pub fn rows_at(&self, indices: &[usize]) -> Result<QvdTable, TableError> {
        for &index in indices {
            self.check_row(index)?;
        }
        Ok(self.take_rows(indices))
    }

    fn take_rows(&self, indices: &[usize]) -> QvdTable {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                symbols: column.symbols.clone(),
                lookup: column.lookup.clone(),
                codes: indices.iter().map(|&i| column.codes[i]).collect(),
                format: column.format.clone(),
                tags: column.tags.clone(),
            })
            .collect();
        QvdTable {
            columns,
            rows: indices.len(),
        }
    }

    /// New table with the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<QvdTable, TableError> {
        let mut columns = Vec::with_capacity(names.len());
        let mut seen = HashMap::new();
        for &name in names {
            if seen.insert(name, ()).is_some() {
                return Err(TableError::DuplicateColumn(name.to_string()));
            }
            let index = self.column_index(name)?;
            columns.push(self.columns[index].clone());
        }
        Ok(QvdTable {
            columns,
            rows: self.rows,
        })
    }

    pub fn head(&self, n: usize) -> QvdTable {
        let indices: Vec<usize> = (0..n.min(self.rows)).collect();
        self.take_rows(&indices)
    }

    pub fn tail(&self, n: usize) -> QvdTable {
        let start = self.rows.saturating_sub(n);
        let indices: Vec<usize> = (start..self.rows).collect();
        self.take_rows(&indices)
    }

    /// Rows where `predicate` holds for the named column, original order
    /// preserved.
    pub fn filter_by(
        &self,
        column: &str,
        predicate: impl Fn(&Value) -> bool,
    ) -> Result<QvdTable, TableError> {
        let col = self.column(column)?;
        let indices: Vec<usize> = (0..self.rows).filter(|&row| predicate(col.value(row))).collect();
        Ok(self.take_rows(&indices))
    }

    /// Stable sort by the named column using [`Value::total_cmp`].
    pub fn sort_by(&self, column: &str, ascending: bool) -> Result<QvdTable, TableError> {
        self.sort_by_with(column, move |a, b| {
            let ordering = a.total_cmp(b);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        })
    }

    /// Stable sort by the named column with a caller-supplied comparator.
    pub fn sort_by_with(
        &self,
        column: &str,
        comparator: impl Fn(&Value, &Value) -> Ordering,
    ) -> Result<QvdTable, TableError> {
        let col = self.column(column)?;
        let mut indices: Vec<usize> = (0..self.rows).collect();
        indices.sort_by(|&a, &b| comparator(col.value(a), col.value(b)));
        Ok(self.take_rows(&indices))
    }

    fn check_concat(&self, other: &QvdTable) -> Result<(), TableError> {
        for column in &self.columns {
            other.column(&column.name).map_err(|_| {
                TableError::ColumnMismatch(format!("column `{}` missing from right table", column.name))
            })?;
        }
        for column in &other.columns {
            self.column(&column.name).map_err(|_| {
                TableError::ColumnMismatch(format!("column `{}` missing from left table", column.name))
            })?;
        }
        Ok(())
    }

    /// Row-wise union with `other`, matching columns by name. Column order
    /// is taken from `self`; the other table's symbols are re-interned, so
    /// codes are remapped as needed.
    pub fn concat(&self, other: &QvdTable) -> Result<QvdTable, TableError> {
        let mut result = self.clone();
        result.concat_inplace(other)?;
        Ok(result)
    }

    /// As [`QvdTable::concat`], mutating the receiver.
    pub fn concat_inplace(&mut self, other: &QvdTable) -> Result<(), TableError> {
        self.check_concat(other)?;
        let sources: Vec<usize> = self
            .columns
            .iter()
            .map(|c| other.column_index(&c.name))
            .collect::<Result<_, _>>()?;
        for (column, &source) in self.columns.iter_mut().zip(&sources) {
            let source = &other.columns[source];
            for row in 0..other.rows {
                column.push(source.value(row).clone());
            }
        }
        self.rows += other.rows;
        Ok(())
    }

    /// Equi-join on the `on` columns.
    ///
    /// Output columns are the left columns followed by the right side's
    /// non-key columns; colliding non-key names get `lsuffix`/`rsuffix`
    /// applied. Matched left rows come first in left order (each paired
    /// with its matches in right order); for `Left`/`Outer`, unmatched
    /// left rows stay interleaved in left order with null-filled right
    /// cells; for `Right`/`Outer`, unmatched right rows follow in right
    /// order with null-filled left cells.
    pub fn join(
        &self,
        other: &QvdTable,
        on: &[&str],
        how: JoinKind,
        lsuffix: &str,
        rsuffix: &str,
    ) -> Result<QvdTable, TableError> {
        if on.is_empty() {
            return Err(TableError::ColumnMismatch("empty join key".to_string()));
        }
        let left_keys: Vec<usize> = on
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<_, _>>()?;
        let right_keys: Vec<usize> = on
            .iter()
            .map(|name| other.column_index(name))
            .collect::<Result<_, _>>()?;

        let right_non_key: Vec<usize> = (0..other.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        // Resolve output names, suffixing collisions between left and
        // right non-key columns.
        let mut names = Vec::new();
        for (i, column) in self.columns.iter().enumerate() {
            let collides = !left_keys.contains(&i)
                && right_non_key
                    .iter()
                    .any(|&j| other.columns[j].name == column.name);
            if collides {
                names.push(format!("{}{}", column.name, lsuffix));
            } else {
                names.push(column.name.clone());
            }
        }
        for &j in &right_non_key {
            let column = &other.columns[j];
            let collides = self.columns.iter().any(|c| c.name == column.name);
            if collides {
                names.push(format!("{}{}", column.name, rsuffix));
            } else {
                names.push(column.name.clone());
            }
        }
        let mut seen = HashMap::new();
        for name in &names {
            if seen.insert(name.clone(), ()).is_some() {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        let mut output: Vec<Column> = Vec::with_capacity(names.len());
        for (name, source) in names.into_iter().zip(
            self.columns
                .iter()
                .chain(right_non_key.iter().map(|&j| &other.columns[j])),
        ) {
            let mut column = Column::new(name);
            column.format = source.format.clone();
            column.tags = source.tags.clone();
            output.push(column);
        }

        let mut right_index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for row in 0..other.rows {
            let key: Vec<Value> = right_keys
                .iter()
                .map(|&j| other.columns[j].value(row).clone())
                .collect();
            right_index.entry(key).or_default().push(row);
        }

        let push_row = |output: &mut Vec<Column>, left: Option<usize>, right: Option<usize>| {
            for (i, column) in output.iter_mut().enumerate() {
                let value = if i < self.columns.len() {
                    match left {
                        Some(row) => self.columns[i].value(row).clone(),
                        // Unmatched right row: key cells come from the
                        // right side, the rest stay null.
                        None => match left_keys.iter().position(|&k| k == i) {
                            Some(key_pos) => match right {
                                Some(row) => {
                                    other.columns[right_keys[key_pos]].value(row).clone()
                                }
                                None => Value::Null,
                            },
                            None => Value::Null,
                        },
                    }
                } else {
                    let j = right_non_key[i - self.columns.len()];
                    match right {
                        Some(row) => other.columns[j].value(row).clone(),
                        None => Value::Null,
                    }
                };
                column.push(value);
            }
        };

        let mut matched_right = vec![false; other.rows];
        let mut rows = 0usize;
        for row in 0..self.rows {
            let key: Vec<Value> = left_keys
                .iter()
                .map(|&k| self.columns[k].value(row).clone())
                .collect();
            match right_index.get(&key) {
                Some(matches) => {
                    for &right_row in matches {
                        matched_right[right_row] = true;
                        push_row(&mut output, Some(row), Some(right_row));
                        rows += 1;
                    }
                }
                None => {
                    if matches!(how, JoinKind::Left | JoinKind::Outer) {
                        push_row(&mut output, Some(row), None);
                        rows += 1;
                    }
                }
            }
        }
        if matches!(how, JoinKind::Right | JoinKind::Outer) {
            for (right_row, matched) in matched_right.iter().enumerate() {
                if !matched {
                    push_row(&mut output, None, Some(right_row));
                    rows += 1;
                }
            }
        }

        Ok(QvdTable {
            columns: output,
            rows,
        })
    }

    /// Drop unused symbols from every column.
    pub fn compact(&mut self) {
        for column in &mut self.columns {
            column.compact();
        }
    }
}

/// Value-wise equality: same column names in the same order and equal
/// cells. Symbol-list order, formats and tags do not participate.
impl PartialEq for QvdTable {
    fn eq(&self, other: &Self) -> bool {
        if self.rows != other.rows || self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns
            .iter()
            .zip(&other.columns)
            .all(|(a, b)| a.name == b.name && (0..self.rows).all(|row| a.value(row) == b.value(row)))
    }
}

impl Eq for QvdTable {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QvdTable {
        QvdTable::from_columns([
            (
                "Key".to_string(),
                vec![Value::Integer(1), Value::Integer(2), Value::Integer(2)],
            ),
            (
                "Name".to_string(),
                vec![
                    Value::String("a".to_string()),
                    Value::String("b".to_string()),
                    Value::String("b".to_string()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn interning_dedupes_symbols() {
        let table = sample();
        assert_eq!(table.column("Key").unwrap().symbols().len(), 2);
        assert_eq!(table.column("Name").unwrap().symbols().len(), 2);
        assert_eq!(table.column("Key").unwrap().codes(), &[Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn set_reuses_existing_symbol() {
        let mut table = sample();
        table.set(0, "Key", Value::Integer(2)).unwrap();
        assert_eq!(table.get(0, "Key").unwrap(), &Value::Integer(2));
        assert_eq!(table.column("Key").unwrap().symbols().len(), 2);
    }

    #[test]
    fn shape_errors_leave_table_unchanged() {
        let mut table = sample();
        let before = table.clone();
        assert_eq!(
            table.append_row(vec![Value::Integer(9)]),
            Err(TableError::RowLengthMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(table, before);
    }

    #[test]
    fn insert_and_drop_rows() {
        let mut table = sample();
        table
            .insert_row(1, vec![Value::Integer(7), Value::Null])
            .unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.get(1, "Key").unwrap(), &Value::Integer(7));
        assert!(table.get(1, "Name").unwrap().is_null());
        table.drop_row(1).unwrap();
        assert_eq!(table, sample());
    }

    #[test]
    fn compact_drops_unused_symbols() {
        let mut table = sample();
        table.set(0, "Key", Value::Integer(2)).unwrap();
        assert_eq!(table.column("Key").unwrap().symbols().len(), 2);
        table.compact();
        assert_eq!(table.column("Key").unwrap().symbols(), &[Value::Integer(2)]);
        assert_eq!(table.get(1, "Key").unwrap(), &Value::Integer(2));
    }

    #[test]
    fn select_reorders_columns() {
        let table = sample();
        let selected = table.select(&["Name", "Key"]).unwrap();
        assert_eq!(selected.column_names(), vec!["Name", "Key"]);
        assert_eq!(selected.get(0, "Key").unwrap(), &Value::Integer(1));
    }

    #[test]
    fn value_equality_ignores_symbol_order() {
        let a = QvdTable::from_columns([(
            "A".to_string(),
            vec![Value::Integer(1), Value::Integer(2)],
        )])
        .unwrap();
        let b = QvdTable::from_parts(vec![Column::from_parts(
            "A".to_string(),
            vec![Value::Integer(2), Value::Integer(1)],
            vec![Some(1), Some(0)],
            NumberFormat::default(),
            Vec::new(),
        )])
        .unwrap();
        assert_eq!(a, b);
    }
}
