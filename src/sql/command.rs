//! Table commands and their translation from the sqlparser AST.
//!
//! Only the subset that maps onto a single worksheet is accepted; anything
//! else is rejected with a query error naming the construct.

use sqlparser::ast::{
    self, AssignmentTarget, BinaryOperator, FromTable, ObjectName, SelectItem as SqlSelectItem,
    SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use crate::db::Value;
use crate::error::{Result, SheetQlError};
use crate::safety::StatementType;

/// A statement against one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(SelectCommand),
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
}

impl Command {
    /// Name of the sheet the command targets.
    pub fn table(&self) -> &str {
        match self {
            Self::Select(c) => &c.table,
            Self::Insert(c) => &c.table,
            Self::Update(c) => &c.table,
            Self::Delete(c) => &c.table,
        }
    }

    /// The statement type, as reported by the safety classifier.
    pub fn statement_type(&self) -> StatementType {
        match self {
            Self::Select(_) => StatementType::Select,
            Self::Insert(_) => StatementType::Insert,
            Self::Update(_) => StatementType::Update,
            Self::Delete(_) => StatementType::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    pub table: String,
    pub projection: Vec<SelectItem>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`: every column in header order.
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertCommand {
    pub table: String,
    /// Target columns; empty means every column in header order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteCommand {
    pub table: String,
    pub filter: Option<Expr>,
}

/// Scalar expression over the cells of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Concat,
}

impl Expr {
    /// Column names referenced anywhere in the expression.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Literal(_) => {}
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => expr.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                for item in list {
                    item.collect_columns(out);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::Like { expr, pattern, .. } => {
                expr.collect_columns(out);
                pattern.collect_columns(out);
            }
        }
    }
}

/// One statement of a SQL script with its normalized text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub text: String,
    pub command: Command,
}

/// Parses SQL text into statements, keeping each one's text.
pub fn parse_statements(sql: &str) -> Result<Vec<ParsedStatement>> {
    let statements = Parser::parse_sql(&MsSqlDialect {}, sql)
        .map_err(|e| SheetQlError::query(format!("SQL parse error: {e}")))?;

    if statements.is_empty() {
        return Err(SheetQlError::query("Empty SQL statement"));
    }

    statements
        .iter()
        .map(|statement| {
            Ok(ParsedStatement {
                text: statement.to_string(),
                command: translate_statement(statement)?,
            })
        })
        .collect()
}

/// Parses SQL text into commands, one per statement.
pub fn parse_sql(sql: &str) -> Result<Vec<Command>> {
    Ok(parse_statements(sql)?
        .into_iter()
        .map(|statement| statement.command)
        .collect())
}

fn unsupported(what: impl std::fmt::Display) -> SheetQlError {
    SheetQlError::query(format!("Unsupported SQL: {what}"))
}

fn translate_statement(statement: &Statement) -> Result<Command> {
    match statement {
        Statement::Query(query) => translate_query(query).map(Command::Select),
        Statement::Insert(insert) => translate_insert(insert).map(Command::Insert),
        Statement::Update {
            table,
            assignments,
            from,
            selection,
            ..
        } => {
            if from.is_some() {
                return Err(unsupported("UPDATE ... FROM"));
            }
            let assignments = assignments
                .iter()
                .map(|a| match &a.target {
                    AssignmentTarget::ColumnName(name) => {
                        Ok((last_ident(name)?, translate_expr(&a.value)?))
                    }
                    AssignmentTarget::Tuple(_) => Err(unsupported("tuple assignment")),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Command::Update(UpdateCommand {
                table: translate_table(table)?,
                assignments,
                filter: selection.as_ref().map(translate_expr).transpose()?,
            }))
        }
        Statement::Delete(delete) => {
            if delete.using.is_some() {
                return Err(unsupported("DELETE ... USING"));
            }
            let tables = match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
            };
            let [table] = tables.as_slice() else {
                return Err(unsupported("DELETE from more than one table"));
            };
            Ok(Command::Delete(DeleteCommand {
                table: translate_table(table)?,
                filter: delete.selection.as_ref().map(translate_expr).transpose()?,
            }))
        }
        other => Err(unsupported(format!("statement '{other}'"))),
    }
}

fn translate_query(query: &ast::Query) -> Result<SelectCommand> {
    if query.with.is_some() {
        return Err(unsupported("WITH clause"));
    }

    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(unsupported(format!("query '{}'", query.body)));
    };
    if select.distinct.is_some() {
        return Err(unsupported("DISTINCT"));
    }
    if select.top.is_some() {
        return Err(unsupported("TOP (use LIMIT)"));
    }
    if select.having.is_some() {
        return Err(unsupported("HAVING"));
    }

    let [table] = select.from.as_slice() else {
        return Err(unsupported("SELECT must read exactly one sheet"));
    };

    let projection = select
        .projection
        .iter()
        .map(|item| match item {
            SqlSelectItem::Wildcard(_) | SqlSelectItem::QualifiedWildcard(_, _) => {
                Ok(SelectItem::Wildcard)
            }
            SqlSelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
                expr: translate_expr(expr)?,
                alias: None,
            }),
            SqlSelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
                expr: translate_expr(expr)?,
                alias: Some(alias.value.clone()),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut order_by = Vec::new();
    if let Some(clause) = &query.order_by {
        for key in &clause.exprs {
            order_by.push(OrderKey {
                expr: translate_expr(&key.expr)?,
                descending: key.asc == Some(false),
            });
        }
    }

    Ok(SelectCommand {
        table: translate_table(table)?,
        projection,
        filter: select.selection.as_ref().map(translate_expr).transpose()?,
        order_by,
        limit: query.limit.as_ref().map(constant_count).transpose()?,
        offset: query
            .offset
            .as_ref()
            .map(|o| constant_count(&o.value))
            .transpose()?
            .unwrap_or(0),
    })
}

fn translate_insert(insert: &ast::Insert) -> Result<InsertCommand> {
    let source = insert
        .source
        .as_ref()
        .ok_or_else(|| unsupported("INSERT without VALUES"))?;
    let SetExpr::Values(values) = source.body.as_ref() else {
        return Err(unsupported("INSERT ... SELECT"));
    };

    let rows = values
        .rows
        .iter()
        .map(|row| row.iter().map(translate_expr).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()?;

    Ok(InsertCommand {
        table: sheet_name(&insert.table_name)?,
        columns: insert.columns.iter().map(|c| c.value.clone()).collect(),
        rows,
    })
}

fn translate_table(table: &TableWithJoins) -> Result<String> {
    if !table.joins.is_empty() {
        return Err(unsupported("JOIN"));
    }
    match &table.relation {
        TableFactor::Table { name, .. } => sheet_name(name),
        other => Err(unsupported(format!("table source '{other}'"))),
    }
}

/// Resolves `[Sheet1$]`, `Sheet1$` or `Sheet1` to the worksheet name.
fn sheet_name(name: &ObjectName) -> Result<String> {
    let ident = last_ident(name)?;
    match ident.rsplit_once('$') {
        Some((sheet, "")) if !sheet.is_empty() => Ok(sheet.to_string()),
        Some((_, range)) if !range.is_empty() => Err(unsupported(format!(
            "cell-range table '{ident}' (address the whole sheet)"
        ))),
        _ => Ok(ident),
    }
}

fn last_ident(name: &ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| SheetQlError::query("Empty identifier"))
}

/// Evaluates a LIMIT/OFFSET operand, which must be a non-negative integer literal.
fn constant_count(expr: &ast::Expr) -> Result<usize> {
    match translate_expr(expr)? {
        Expr::Literal(Value::Int(n)) if n >= 0 => Ok(n as usize),
        _ => Err(SheetQlError::query(format!(
            "LIMIT and OFFSET take a non-negative integer, got '{expr}'"
        ))),
    }
}

fn translate_expr(expr: &ast::Expr) -> Result<Expr> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value.clone())),
        ast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| Expr::Column(ident.value.clone()))
            .ok_or_else(|| SheetQlError::query("Empty identifier")),
        ast::Expr::Value(value) => translate_value(value).map(Expr::Literal),
        ast::Expr::Nested(inner) => translate_expr(inner),
        ast::Expr::UnaryOp { op, expr } => {
            let op = match op {
                UnaryOperator::Not => UnaryOp::Not,
                UnaryOperator::Minus => UnaryOp::Neg,
                UnaryOperator::Plus => return translate_expr(expr),
                other => return Err(unsupported(format!("operator '{other}'"))),
            };
            Ok(Expr::Unary {
                op,
                expr: Box::new(translate_expr(expr)?),
            })
        }
        ast::Expr::BinaryOp { left, op, right } => {
            let op = match op {
                BinaryOperator::Eq => BinaryOp::Eq,
                BinaryOperator::NotEq => BinaryOp::NotEq,
                BinaryOperator::Lt => BinaryOp::Lt,
                BinaryOperator::LtEq => BinaryOp::LtEq,
                BinaryOperator::Gt => BinaryOp::Gt,
                BinaryOperator::GtEq => BinaryOp::GtEq,
                BinaryOperator::And => BinaryOp::And,
                BinaryOperator::Or => BinaryOp::Or,
                BinaryOperator::Plus => BinaryOp::Plus,
                BinaryOperator::Minus => BinaryOp::Minus,
                BinaryOperator::Multiply => BinaryOp::Multiply,
                BinaryOperator::Divide => BinaryOp::Divide,
                BinaryOperator::StringConcat => BinaryOp::Concat,
                other => return Err(unsupported(format!("operator '{other}'"))),
            };
            Ok(Expr::Binary {
                left: Box::new(translate_expr(left)?),
                op,
                right: Box::new(translate_expr(right)?),
            })
        }
        ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(translate_expr(inner)?),
            negated: false,
        }),
        ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(translate_expr(inner)?),
            negated: true,
        }),
        ast::Expr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::InList {
            expr: Box::new(translate_expr(expr)?),
            list: list.iter().map(translate_expr).collect::<Result<Vec<_>>>()?,
            negated: *negated,
        }),
        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => Ok(Expr::Between {
            expr: Box::new(translate_expr(expr)?),
            low: Box::new(translate_expr(low)?),
            high: Box::new(translate_expr(high)?),
            negated: *negated,
        }),
        ast::Expr::Like {
            negated,
            expr,
            pattern,
            escape_char,
            ..
        }
        | ast::Expr::ILike {
            negated,
            expr,
            pattern,
            escape_char,
            ..
        } => {
            if escape_char.is_some() {
                return Err(unsupported("LIKE ... ESCAPE"));
            }
            Ok(Expr::Like {
                expr: Box::new(translate_expr(expr)?),
                pattern: Box::new(translate_expr(pattern)?),
                negated: *negated,
            })
        }
        other => Err(unsupported(format!("expression '{other}'"))),
    }
}

fn translate_value(value: &SqlValue) -> Result<Value> {
    match value {
        SqlValue::Number(n, _) => n
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| n.parse::<f64>().map(Value::Float))
            .map_err(|_| SheetQlError::query(format!("Invalid number literal: {n}"))),
        SqlValue::SingleQuotedString(s)
        | SqlValue::DoubleQuotedString(s)
        | SqlValue::NationalStringLiteral(s) => Ok(Value::String(s.clone())),
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(unsupported(format!("literal '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_one(sql: &str) -> Command {
        let mut commands = parse_sql(sql).unwrap();
        assert_eq!(commands.len(), 1, "SQL: {sql}");
        commands.remove(0)
    }

    fn col(name: &str) -> Box<Expr> {
        Box::new(Expr::Column(name.to_string()))
    }

    fn lit(value: impl Into<Value>) -> Box<Expr> {
        Box::new(Expr::Literal(value.into()))
    }

    #[test]
    fn test_select_star_from_bracketed_sheet() {
        let Command::Select(select) = parse_one("SELECT * FROM [Sheet1$]") else {
            panic!("Expected SELECT");
        };
        assert_eq!(select.table, "Sheet1");
        assert_eq!(select.projection, vec![SelectItem::Wildcard]);
        assert!(select.filter.is_none());
        assert_eq!(select.limit, None);
        assert_eq!(select.offset, 0);
    }

    #[test]
    fn test_select_with_where() {
        let Command::Select(select) = parse_one("SELECT * FROM [Sheet1$] WHERE COL1 = 3") else {
            panic!("Expected SELECT");
        };
        assert_eq!(
            select.filter,
            Some(Expr::Binary {
                left: col("COL1"),
                op: BinaryOp::Eq,
                right: lit(3),
            })
        );
    }

    #[test]
    fn test_table_name_forms() {
        for sql in [
            "SELECT * FROM [Sheet1$]",
            "SELECT * FROM Sheet1$",
            "SELECT * FROM Sheet1",
            "SELECT * FROM [Sheet1]",
        ] {
            assert_eq!(parse_one(sql).table(), "Sheet1", "SQL: {sql}");
        }
    }

    #[test]
    fn test_cell_range_table_rejected() {
        let err = parse_sql("SELECT * FROM [Sheet1$A1:C4]").unwrap_err();
        assert!(err.to_string().contains("cell-range"));
    }

    #[test]
    fn test_select_projection_order_limit() {
        let Command::Select(select) = parse_one(
            "SELECT COL2 AS name, COL1 + 1 FROM [Sheet1$] ORDER BY COL1 DESC, COL2 LIMIT 2 OFFSET 1",
        ) else {
            panic!("Expected SELECT");
        };
        assert_eq!(
            select.projection,
            vec![
                SelectItem::Expr {
                    expr: Expr::Column("COL2".to_string()),
                    alias: Some("name".to_string()),
                },
                SelectItem::Expr {
                    expr: Expr::Binary {
                        left: col("COL1"),
                        op: BinaryOp::Plus,
                        right: lit(1),
                    },
                    alias: None,
                },
            ]
        );
        assert_eq!(
            select.order_by,
            vec![
                OrderKey {
                    expr: Expr::Column("COL1".to_string()),
                    descending: true,
                },
                OrderKey {
                    expr: Expr::Column("COL2".to_string()),
                    descending: false,
                },
            ]
        );
        assert_eq!(select.limit, Some(2));
        assert_eq!(select.offset, 1);
    }

    #[test]
    fn test_update() {
        let Command::Update(update) =
            parse_one("UPDATE [Sheet1$] SET COL2 = 'update_by_node' WHERE COL1 = 3")
        else {
            panic!("Expected UPDATE");
        };
        assert_eq!(update.table, "Sheet1");
        assert_eq!(
            update.assignments,
            vec![(
                "COL2".to_string(),
                Expr::Literal(Value::from("update_by_node"))
            )]
        );
        assert!(update.filter.is_some());
    }

    #[test]
    fn test_insert_positional_values() {
        let Command::Insert(insert) = parse_one(
            "INSERT INTO [Sheet1$] VALUES(4, 'insert_by_node', '2024/1/2 3:04:05')",
        ) else {
            panic!("Expected INSERT");
        };
        assert_eq!(insert.table, "Sheet1");
        assert!(insert.columns.is_empty());
        assert_eq!(
            insert.rows,
            vec![vec![
                Expr::Literal(Value::Int(4)),
                Expr::Literal(Value::from("insert_by_node")),
                Expr::Literal(Value::from("2024/1/2 3:04:05")),
            ]]
        );
    }

    #[test]
    fn test_insert_with_columns_and_many_rows() {
        let Command::Insert(insert) =
            parse_one("INSERT INTO [Sheet1$] (COL1, COL2) VALUES (5, 'a'), (6, 'b')")
        else {
            panic!("Expected INSERT");
        };
        assert_eq!(insert.columns, vec!["COL1", "COL2"]);
        assert_eq!(insert.rows.len(), 2);
    }

    #[test]
    fn test_delete() {
        let Command::Delete(delete) = parse_one("DELETE FROM [Sheet1$] WHERE COL1 > 2") else {
            panic!("Expected DELETE");
        };
        assert_eq!(delete.table, "Sheet1");
        assert!(delete.filter.is_some());
    }

    #[test]
    fn test_negative_literal_and_predicates() {
        let Command::Select(select) = parse_one(
            "SELECT * FROM [Sheet1$] WHERE COL1 BETWEEN -1 AND 3 AND COL2 LIKE 'name%' AND COL3 IS NOT NULL AND COL1 NOT IN (1, 2)",
        ) else {
            panic!("Expected SELECT");
        };
        let filter = select.filter.unwrap();
        let mut columns = filter.columns();
        columns.sort_unstable();
        assert_eq!(columns, vec!["COL1", "COL1", "COL2", "COL3"]);
    }

    #[test]
    fn test_multiple_statements() {
        let commands =
            parse_sql("SELECT * FROM [Sheet1$]; UPDATE [Sheet1$] SET COL2 = 'x'").unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].statement_type(), StatementType::Select);
        assert_eq!(commands[1].statement_type(), StatementType::Update);
    }

    #[test]
    fn test_unsupported_constructs() {
        for sql in [
            "SELECT DISTINCT COL1 FROM [Sheet1$]",
            "SELECT * FROM [Sheet1$] a JOIN [Sheet2$] b ON a.COL1 = b.COL1",
            "SELECT * FROM [Sheet1$], [Sheet2$]",
            "INSERT INTO [Sheet1$] SELECT * FROM [Sheet2$]",
            "DROP TABLE [Sheet1$]",
            "SELECT * FROM [Sheet1$] WHERE COL1 = (SELECT 1)",
        ] {
            let err = parse_sql(sql).unwrap_err();
            assert!(
                err.to_string().contains("Unsupported SQL"),
                "SQL: {sql} gave {err}"
            );
        }
    }

    #[test]
    fn test_parse_statements_keeps_text() {
        let statements =
            parse_statements("select * from [Sheet1$] ; delete from [Sheet1$] where COL1 = 1")
                .unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text.starts_with("SELECT * FROM"));
        assert!(statements[1].text.starts_with("DELETE FROM"));
        assert_eq!(
            statements[1].command.statement_type(),
            StatementType::Delete
        );
    }

    #[test]
    fn test_parse_error() {
        let err = parse_sql("SELEC * FROM").unwrap_err();
        assert!(err.to_string().contains("SQL parse error"));
    }

    #[test]
    fn test_empty_sql() {
        assert!(parse_sql("").is_err());
        assert!(parse_sql("   ").is_err());
    }
}
