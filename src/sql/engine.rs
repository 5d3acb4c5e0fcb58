//! Executes table commands against an in-memory workbook.

use std::cmp::Ordering;

use tracing::debug;

use super::command::{
    Command, DeleteCommand, Expr, InsertCommand, SelectCommand, SelectItem, UpdateCommand,
};
use super::eval::{evaluate, matches, RowScope};
use crate::db::{ColumnInfo, QueryResult, Row, Value};
use crate::error::{Result, SheetQlError};
use crate::workbook::{Sheet, Workbook};

/// Numbering of unnamed computed columns starts here.
const FIRST_EXPR_NUMBER: usize = 1000;

/// Runs one command. SELECT returns rows; the others return the affected
/// row count and leave the change in `workbook`.
pub fn execute(workbook: &mut Workbook, command: &Command) -> Result<QueryResult> {
    match command {
        Command::Select(select) => run_select(lookup(workbook, &select.table)?, select),
        Command::Insert(insert) => {
            run_insert(lookup_mut(workbook, &insert.table)?, insert).map(QueryResult::affected)
        }
        Command::Update(update) => {
            run_update(lookup_mut(workbook, &update.table)?, update).map(QueryResult::affected)
        }
        Command::Delete(delete) => {
            run_delete(lookup_mut(workbook, &delete.table)?, delete).map(QueryResult::affected)
        }
    }
}

fn missing_sheet(workbook: &Workbook, name: &str) -> SheetQlError {
    SheetQlError::query(format!(
        "Sheet '{name}' not found. Available sheets: {}",
        workbook.sheet_names().join(", ")
    ))
}

fn check_table(sheet: &Sheet) -> Result<()> {
    if sheet.is_empty_table() {
        return Err(SheetQlError::query(format!(
            "Sheet '{}' is empty; it has no columns to query",
            sheet.name
        )));
    }
    Ok(())
}

fn lookup<'a>(workbook: &'a Workbook, name: &str) -> Result<&'a Sheet> {
    let sheet = workbook
        .sheet(name)
        .ok_or_else(|| missing_sheet(workbook, name))?;
    check_table(sheet)?;
    Ok(sheet)
}

fn lookup_mut<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Sheet> {
    if workbook.sheet(name).is_none() {
        return Err(missing_sheet(workbook, name));
    }
    let sheet = workbook
        .sheet_mut(name)
        .ok_or_else(|| SheetQlError::internal(format!("sheet '{name}' vanished")))?;
    check_table(sheet)?;
    Ok(sheet)
}

/// Fails on the first column reference the sheet does not have.
fn check_columns<'a>(sheet: &Sheet, exprs: impl IntoIterator<Item = &'a Expr>) -> Result<()> {
    for expr in exprs {
        for name in expr.columns() {
            resolve_column(sheet, name)?;
        }
    }
    Ok(())
}

fn resolve_column(sheet: &Sheet, name: &str) -> Result<usize> {
    sheet.column_index(name).ok_or_else(|| {
        SheetQlError::query(format!(
            "Unknown column '{name}' in sheet '{}'. Columns: {}",
            sheet.name,
            sheet.columns.join(", ")
        ))
    })
}

fn run_select(sheet: &Sheet, select: &SelectCommand) -> Result<QueryResult> {
    let projected = select.projection.iter().filter_map(|item| match item {
        SelectItem::Wildcard => None,
        SelectItem::Expr { expr, .. } => Some(expr),
    });
    check_columns(
        sheet,
        projected
            .chain(select.filter.iter())
            .chain(select.order_by.iter().map(|k| &k.expr)),
    )?;

    let mut selected: Vec<&Row> = Vec::new();
    for row in &sheet.rows {
        if matches(select.filter.as_ref(), RowScope::new(&sheet.columns, row))? {
            selected.push(row);
        }
    }

    if !select.order_by.is_empty() {
        let mut keyed = selected
            .into_iter()
            .map(|row| {
                let scope = RowScope::new(&sheet.columns, row);
                let keys = select
                    .order_by
                    .iter()
                    .map(|key| evaluate(&key.expr, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok::<_, SheetQlError>((keys, row))
            })
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(a, _), (b, _)| {
            for (i, key) in select.order_by.iter().enumerate() {
                let ord = order_values(&a[i], &b[i]);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        selected = keyed.into_iter().map(|(_, row)| row).collect();
    }

    let window = selected
        .into_iter()
        .skip(select.offset)
        .take(select.limit.unwrap_or(usize::MAX));

    let mut rows = Vec::new();
    for row in window {
        let scope = RowScope::new(&sheet.columns, row);
        let mut out = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => out.extend(row.iter().cloned()),
                SelectItem::Expr { expr, .. } => out.push(evaluate(expr, scope)?),
            }
        }
        rows.push(out);
    }

    let columns = result_columns(sheet, &select.projection, &rows);
    debug!(sheet = %sheet.name, rows = rows.len(), "Selected rows");
    Ok(QueryResult::with_data(columns, rows))
}

/// NULLs sort first, then booleans, numbers, dates and text.
fn order_values(a: &Value, b: &Value) -> Ordering {
    a.sort_cmp(b)
}

/// Names and types of the result columns.
///
/// Plain column references keep the sheet's name and type; computed columns
/// without an alias are numbered `Expr1000`, `Expr1001`, ...
fn result_columns(sheet: &Sheet, projection: &[SelectItem], rows: &[Row]) -> Vec<ColumnInfo> {
    let mut columns = Vec::new();
    let mut unnamed = FIRST_EXPR_NUMBER;

    for item in projection {
        match item {
            SelectItem::Wildcard => columns.extend(sheet.column_info()),
            SelectItem::Expr { expr, alias } => {
                let position = columns.len();
                let (name, data_type) = match expr {
                    Expr::Column(reference) => {
                        let index = sheet.column_index(reference).unwrap_or(0);
                        let name = sheet
                            .columns
                            .get(index)
                            .cloned()
                            .unwrap_or_else(|| reference.clone());
                        (name, sheet.column_type(index))
                    }
                    _ => {
                        let name = format!("Expr{unnamed}");
                        unnamed += 1;
                        (name, inferred_type(rows, position))
                    }
                };
                columns.push(ColumnInfo::new(alias.clone().unwrap_or(name), data_type));
            }
        }
    }
    columns
}

fn inferred_type(rows: &[Row], index: usize) -> &'static str {
    let mut seen: Option<&'static str> = None;
    for value in rows.iter().filter_map(|r| r.get(index)) {
        if value.is_null() {
            continue;
        }
        match seen {
            None => seen = Some(value.type_name()),
            Some(t) if t != value.type_name() => return "mixed",
            Some(_) => {}
        }
    }
    seen.unwrap_or("empty")
}

fn run_insert(sheet: &mut Sheet, insert: &InsertCommand) -> Result<usize> {
    let targets: Vec<usize> = if insert.columns.is_empty() {
        (0..sheet.columns.len()).collect()
    } else {
        let mut targets = Vec::with_capacity(insert.columns.len());
        for name in &insert.columns {
            let index = resolve_column(sheet, name)?;
            if targets.contains(&index) {
                return Err(SheetQlError::query(format!(
                    "Column '{name}' is listed more than once"
                )));
            }
            targets.push(index);
        }
        targets
    };

    let types: Vec<&'static str> = (0..sheet.columns.len())
        .map(|i| sheet.column_type(i))
        .collect();

    let mut new_rows = Vec::with_capacity(insert.rows.len());
    for values in &insert.rows {
        if values.len() != targets.len() {
            return Err(SheetQlError::query(format!(
                "Number of values ({}) does not match number of destination columns ({})",
                values.len(),
                targets.len()
            )));
        }
        let mut row = vec![Value::Null; sheet.columns.len()];
        for (expr, &index) in values.iter().zip(&targets) {
            row[index] = evaluate(expr, RowScope::empty())?.coerce_to(types[index]);
        }
        new_rows.push(row);
    }

    let count = new_rows.len();
    sheet.rows.extend(new_rows);
    debug!(sheet = %sheet.name, rows = count, "Inserted rows");
    Ok(count)
}

fn run_update(sheet: &mut Sheet, update: &UpdateCommand) -> Result<usize> {
    check_columns(
        sheet,
        update
            .assignments
            .iter()
            .map(|(_, expr)| expr)
            .chain(update.filter.iter()),
    )?;
    let targets = update
        .assignments
        .iter()
        .map(|(name, _)| resolve_column(sheet, name))
        .collect::<Result<Vec<_>>>()?;
    let types: Vec<&'static str> = targets.iter().map(|&i| sheet.column_type(i)).collect();

    // Compute every change against the unmodified rows before applying any.
    let mut changes = Vec::new();
    for (row_index, row) in sheet.rows.iter().enumerate() {
        let scope = RowScope::new(&sheet.columns, row);
        if !matches(update.filter.as_ref(), scope)? {
            continue;
        }
        let values = update
            .assignments
            .iter()
            .zip(&types)
            .map(|((_, expr), ty)| evaluate(expr, scope).map(|v| v.coerce_to(ty)))
            .collect::<Result<Vec<_>>>()?;
        changes.push((row_index, values));
    }

    let count = changes.len();
    for (row_index, values) in changes {
        for (&column, value) in targets.iter().zip(values) {
            sheet.rows[row_index][column] = value;
        }
    }
    debug!(sheet = %sheet.name, rows = count, "Updated rows");
    Ok(count)
}

fn run_delete(sheet: &mut Sheet, delete: &DeleteCommand) -> Result<usize> {
    check_columns(sheet, delete.filter.iter())?;

    let mut keep = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        keep.push(!matches(
            delete.filter.as_ref(),
            RowScope::new(&sheet.columns, row),
        )?);
    }

    let before = sheet.rows.len();
    let mut flags = keep.into_iter();
    sheet.rows.retain(|_| flags.next().unwrap_or(true));
    let count = before - sheet.rows.len();
    debug!(sheet = %sheet.name, rows = count, "Deleted rows");
    Ok(count)
}
