use super::{Condition, Parameters, ParsedQuery, Statement};
use crate::entity::ID_FIELD;
use crate::error::{Result, StorageError};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{map, opt, recognize, value, verify},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use serde_json::Value;
use std::collections::HashSet;

/// 条件树允许的最大深度，NOT、括号和 AND/OR 链都计入
pub const MAX_NESTING: usize = 128;

const KEYWORDS: &[&str] = &[
    "SELECT", "DELETE", "FROM", "WHERE", "AND", "OR", "NOT", "IS", "NULL", "IN", "TRUE", "FALSE",
];

/// 解析查询语句并绑定命名参数
///
/// 支持的语法：
/// - `SELECT e FROM Kind e [WHERE ...]`
/// - `DELETE FROM Kind [e] [WHERE ...]`
///
/// WHERE 子句支持 AND / OR / NOT、括号、比较运算、`IS [NOT] NULL` 和 `[NOT] IN (...)`。
pub fn parse(query: &str, params: &Parameters) -> Result<ParsedQuery> {
    let (rest, raw) = statement(query).map_err(|e| syntax_error(query, e))?;
    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(StorageError::Query(format!(
            "Unexpected trailing input: {:?}",
            rest
        )));
    }

    if let Some(projection) = &raw.projection {
        if raw.alias.as_deref() != Some(projection.as_str()) {
            return Err(StorageError::Query(format!(
                "Unknown identification variable: {}",
                projection
            )));
        }
    }

    let mut binder = Binder {
        alias: raw.alias.as_deref(),
        params,
        used: HashSet::new(),
    };
    let condition = match raw.filter {
        Some(node) => binder.bind(node.expr)?,
        None => Condition::Empty,
    };

    if let Some(unused) = params.keys().find(|name| !binder.used.contains(*name)) {
        return Err(StorageError::Query(format!(
            "Parameter :{} is not used in query",
            unused
        )));
    }

    Ok(ParsedQuery {
        statement: raw.statement,
        kind: raw.kind,
        condition,
    })
}

fn syntax_error(query: &str, err: nom::Err<nom::error::Error<&str>>) -> StorageError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if e.code == nom::error::ErrorKind::TooLarge {
                return StorageError::Query("Query nesting too deep".to_string());
            }
            let near: String = e.input.trim_start().chars().take(24).collect();
            if near.is_empty() {
                StorageError::Query(format!("Unexpected end of query: {}", query))
            } else {
                StorageError::Query(format!("Malformed query near {:?}", near))
            }
        }
        nom::Err::Incomplete(_) => StorageError::Query(format!("Incomplete query: {}", query)),
    }
}

// 语法树

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(Value),
    Param(String),
}

#[derive(Debug)]
enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        path: Vec<String>,
        op: CompareOp,
        operand: Operand,
    },
    In {
        path: Vec<String>,
        negated: bool,
        operands: Vec<Operand>,
    },
    Null {
        path: Vec<String>,
        negated: bool,
    },
}

/// 子树及其深度
struct Node {
    expr: Expr,
    depth: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }
}

struct RawQuery {
    statement: Statement,
    projection: Option<String>,
    kind: String,
    alias: Option<String>,
    filter: Option<Node>,
}

// 词法辅助

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_keyword(ident: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(ident))
}

fn reject(input: &str, kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// 不区分大小写的关键字，后面不能紧跟标识符字符
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = preceded(multispace0, tag_no_case(word))(input)?;
        if rest.chars().next().is_some_and(is_ident_char) {
            return Err(reject(input, nom::error::ErrorKind::Tag));
        }
        Ok((rest, matched))
    }
}

fn raw_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// 非关键字的标识符
fn identifier(input: &str) -> IResult<&str, String> {
    map(
        preceded(multispace0, verify(raw_ident, |ident: &str| !is_keyword(ident))),
        str::to_string,
    )(input)
}

fn path(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(ws(char('.')), identifier)(input)
}

// 字面量

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;

    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            return Ok((rest, Value::from(n)));
        }
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(|n| (rest, Value::Number(n)))
        .ok_or_else(|| reject(input, nom::error::ErrorKind::Float))
}

/// 单引号字符串，两个连续单引号表示一个单引号
fn string_literal(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            char('\''),
            fold_many0(
                alt((value('\'', tag("''")), none_of("'"))),
                String::new,
                |mut text, c| {
                    text.push(c);
                    text
                },
            ),
            char('\''),
        ),
        Value::String,
    )(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        string_literal,
        number,
        value(Value::Bool(true), keyword("TRUE")),
        value(Value::Bool(false), keyword("FALSE")),
        value(Value::Null, keyword("NULL")),
    ))(input)
}

/// 命名参数，不含冒号
fn parameter(input: &str) -> IResult<&str, String> {
    map(preceded(char(':'), raw_ident), str::to_string)(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
    preceded(
        multispace0,
        alt((map(parameter, Operand::Param), map(literal, Operand::Literal))),
    )(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    ws(alt((
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Ne, tag("<>")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Eq, tag("=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    )))(input)
}

// 谓词

fn null_predicate(input: &str) -> IResult<&str, bool> {
    map(
        tuple((keyword("IS"), opt(keyword("NOT")), keyword("NULL"))),
        |(_, not, _)| not.is_some(),
    )(input)
}

fn in_predicate(input: &str) -> IResult<&str, (bool, Vec<Operand>)> {
    map(
        tuple((
            opt(keyword("NOT")),
            keyword("IN"),
            delimited(
                ws(char('(')),
                separated_list1(ws(char(',')), operand),
                ws(char(')')),
            ),
        )),
        |(not, _, operands)| (not.is_some(), operands),
    )(input)
}

fn predicate(input: &str) -> IResult<&str, Node> {
    let (input, path) = path(input)?;

    if let Ok((rest, negated)) = null_predicate(input) {
        return Ok((rest, Node::leaf(Expr::Null { path, negated })));
    }
    if let Ok((rest, (negated, operands))) = in_predicate(input) {
        return Ok((
            rest,
            Node::leaf(Expr::In {
                path,
                negated,
                operands,
            }),
        ));
    }
    let (rest, (op, operand)) = pair(compare_op, operand)(input)?;
    Ok((rest, Node::leaf(Expr::Compare { path, op, operand })))
}

// 条件表达式，优先级 OR < AND < NOT

fn too_deep(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge))
}

fn combine<'a>(
    input: &'a str,
    left: Node,
    right: Node,
    build: fn(Box<Expr>, Box<Expr>) -> Expr,
) -> std::result::Result<Node, nom::Err<nom::error::Error<&'a str>>> {
    let depth = left.depth.max(right.depth) + 1;
    if depth > MAX_NESTING {
        return Err(too_deep(input));
    }
    Ok(Node {
        expr: build(Box::new(left.expr), Box::new(right.expr)),
        depth,
    })
}

fn or_expr(input: &str, level: usize) -> IResult<&str, Node> {
    let (mut input, mut node) = and_expr(input, level)?;
    while let Ok((rest, _)) = keyword("OR")(input) {
        let (rest, right) = and_expr(rest, level)?;
        node = combine(rest, node, right, Expr::Or)?;
        input = rest;
    }
    Ok((input, node))
}

fn and_expr(input: &str, level: usize) -> IResult<&str, Node> {
    let (mut input, mut node) = unary_expr(input, level)?;
    while let Ok((rest, _)) = keyword("AND")(input) {
        let (rest, right) = unary_expr(rest, level)?;
        node = combine(rest, node, right, Expr::And)?;
        input = rest;
    }
    Ok((input, node))
}

fn unary_expr(input: &str, level: usize) -> IResult<&str, Node> {
    if level >= MAX_NESTING {
        return Err(too_deep(input));
    }

    if let Ok((rest, _)) = keyword("NOT")(input) {
        let (rest, inner) = unary_expr(rest, level + 1)?;
        if inner.depth + 1 > MAX_NESTING {
            return Err(too_deep(rest));
        }
        return Ok((
            rest,
            Node {
                depth: inner.depth + 1,
                expr: Expr::Not(Box::new(inner.expr)),
            },
        ));
    }

    if let Ok((rest, _)) = ws(char('('))(input) {
        let (rest, inner) = or_expr(rest, level + 1)?;
        let (rest, _) = ws(char(')'))(rest)?;
        return Ok((rest, inner));
    }

    predicate(input)
}

fn where_clause(input: &str) -> IResult<&str, Node> {
    let (input, _) = keyword("WHERE")(input)?;
    or_expr(input, 0)
}

// 语句

fn select_statement(input: &str) -> IResult<&str, RawQuery> {
    let (input, (_, projection, _, kind, alias)) = tuple((
        keyword("SELECT"),
        identifier,
        keyword("FROM"),
        identifier,
        identifier,
    ))(input)?;
    let (input, filter) = opt(where_clause)(input)?;
    Ok((
        input,
        RawQuery {
            statement: Statement::Select,
            projection: Some(projection),
            kind,
            alias: Some(alias),
            filter,
        },
    ))
}

fn delete_statement(input: &str) -> IResult<&str, RawQuery> {
    let (input, (_, _, kind, alias)) =
        tuple((keyword("DELETE"), keyword("FROM"), identifier, opt(identifier)))(input)?;
    let (input, filter) = opt(where_clause)(input)?;
    Ok((
        input,
        RawQuery {
            statement: Statement::Delete,
            projection: None,
            kind,
            alias,
            filter,
        },
    ))
}

fn statement(input: &str) -> IResult<&str, RawQuery> {
    alt((select_statement, delete_statement))(input)
}

// 绑定：去掉别名前缀，`id` 映射为 `_id`，代入命名参数

struct Binder<'a> {
    alias: Option<&'a str>,
    params: &'a Parameters,
    used: HashSet<String>,
}

impl Binder<'_> {
    fn bind(&mut self, expr: Expr) -> Result<Condition> {
        Ok(match expr {
            Expr::And(left, right) => self.bind(*left)?.and(self.bind(*right)?),
            Expr::Or(left, right) => self.bind(*left)?.or(self.bind(*right)?),
            Expr::Not(inner) => self.bind(*inner)?.not(),
            Expr::Null { path, negated } => {
                let field = self.field(path)?;
                if negated {
                    Condition::IsNotNull { field }
                } else {
                    Condition::IsNull { field }
                }
            }
            Expr::In {
                path,
                negated,
                operands,
            } => {
                let field = self.field(path)?;
                let values = operands
                    .into_iter()
                    .map(|operand| self.value(operand))
                    .collect::<Result<Vec<_>>>()?;
                if negated {
                    Condition::NotIn { field, values }
                } else {
                    Condition::In { field, values }
                }
            }
            Expr::Compare { path, op, operand } => {
                let field = self.field(path)?;
                let value = self.value(operand)?;
                match op {
                    CompareOp::Eq => Condition::Equal { field, value },
                    CompareOp::Ne => Condition::NotEqual { field, value },
                    CompareOp::Lt | CompareOp::Le => Condition::LessThan {
                        field,
                        bound: value,
                        inclusive: op == CompareOp::Le,
                    },
                    CompareOp::Gt | CompareOp::Ge => Condition::GreaterThan {
                        field,
                        bound: value,
                        inclusive: op == CompareOp::Ge,
                    },
                }
            }
        })
    }

    fn field(&self, mut segments: Vec<String>) -> Result<String> {
        if let Some(alias) = self.alias {
            if segments[0] != alias {
                return Err(StorageError::Query(format!(
                    "Unknown identification variable: {}",
                    segments[0]
                )));
            }
            segments.remove(0);
            if segments.is_empty() {
                return Err(StorageError::Query(format!("Expected a field of {}", alias)));
            }
        }

        if segments[0] == "id" {
            segments[0] = ID_FIELD.to_string();
        }
        Ok(segments.join("."))
    }

    fn value(&mut self, operand: Operand) -> Result<Value> {
        match operand {
            Operand::Literal(value) => Ok(value),
            Operand::Param(name) => {
                let value = self.params.get(&name).cloned().ok_or_else(|| {
                    StorageError::Query(format!("No value bound for parameter :{}", name))
                })?;
                self.used.insert(name);
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::queries;
    use serde_json::json;

    fn no_params() -> Parameters {
        Parameters::new()
    }

    #[test]
    fn test_select_all() {
        let query = parse("SELECT e FROM GenericCase e", &no_params()).unwrap();
        assert_eq!(query.statement, Statement::Select);
        assert_eq!(query.kind, "GenericCase");
        assert_eq!(query.condition, Condition::Empty);
    }

    #[test]
    fn test_delete_all_without_alias() {
        let query = parse("DELETE FROM GenericCase", &no_params()).unwrap();
        assert_eq!(query.statement, Statement::Delete);
        assert_eq!(query.kind, "GenericCase");
        assert_eq!(query.condition, Condition::Empty);
    }

    #[test]
    fn test_delete_with_alias_and_filter() {
        let query = parse("DELETE FROM GenericCase c WHERE c.status = 'CLOSED'", &no_params()).unwrap();
        assert_eq!(query.statement, Statement::Delete);
        assert_eq!(query.condition, queries::equal("status", json!("CLOSED")));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let query = parse("select c from GenericCase c where c.status = 'NEW'", &no_params()).unwrap();
        assert_eq!(query.condition, queries::equal("status", json!("NEW")));
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let query = parse("SELECT e FROM GenericCase e WHERE e.notes IS NULL", &no_params()).unwrap();
        assert_eq!(query.condition, queries::is_null("notes"));
    }

    #[test]
    fn test_literals() {
        let query = parse(
            "SELECT e FROM GenericCase e WHERE e.name = 'O''Brien' AND e.score > -3.5 AND e.open = TRUE AND e.count <> 42",
            &no_params(),
        )
        .unwrap();
        let expected = queries::equal("name", json!("O'Brien"))
            .and(queries::greater_than("score", json!(-3.5), false))
            .and(queries::equal("open", json!(true)))
            .and(queries::not_equal("count", json!(42)));
        assert_eq!(query.condition, expected);
    }

    #[test]
    fn test_named_parameter_binding() {
        let mut params = Parameters::new();
        params.insert("status".to_string(), json!("ONGOING"));
        let query = parse(
            "SELECT e FROM GenericCase e WHERE e.status = :status",
            &params,
        )
        .unwrap();
        assert_eq!(query.condition, queries::equal("status", json!("ONGOING")));
    }

    #[test]
    fn test_id_maps_to_storage_field() {
        let query = parse("SELECT e FROM GenericCase e WHERE e.id = 'CASE-0001'", &no_params()).unwrap();
        assert_eq!(query.condition, queries::equal("_id", json!("CASE-0001")));
    }

    #[test]
    fn test_precedence_and_grouping() {
        let query = parse(
            "SELECT e FROM GenericCase e WHERE e.type = 'A' OR e.type = 'B' AND NOT (e.status = 'CLOSED')",
            &no_params(),
        )
        .unwrap();
        let expected = queries::equal("type", json!("A")).or(
            queries::equal("type", json!("B")).and(queries::equal("status", json!("CLOSED")).not()),
        );
        assert_eq!(query.condition, expected);
    }

    #[test]
    fn test_null_and_in_predicates() {
        let query = parse(
            "SELECT e FROM GenericCase e WHERE e.status IS NOT NULL AND e.type NOT IN ('A', 'B') AND e.priority >= 2",
            &no_params(),
        )
        .unwrap();
        let expected = queries::is_not_null("status")
            .and(queries::not_in("type", vec![json!("A"), json!("B")]))
            .and(queries::greater_than("priority", json!(2), true));
        assert_eq!(query.condition, expected);
    }

    #[test]
    fn test_nested_path() {
        let query = parse(
            "SELECT e FROM GenericCase e WHERE e.attachments.contentType = 'image/jpeg'",
            &no_params(),
        )
        .unwrap();
        assert_eq!(
            query.condition,
            queries::equal("attachments.contentType", json!("image/jpeg"))
        );
    }

    #[test]
    fn test_unbound_parameter() {
        let result = parse("SELECT e FROM GenericCase e WHERE e.status = :status", &no_params());
        assert!(matches!(result, Err(StorageError::Query(_))));
    }

    #[test]
    fn test_unused_parameter() {
        let mut params = Parameters::new();
        params.insert("status".to_string(), json!("NEW"));
        let result = parse("SELECT e FROM GenericCase e", &params);
        assert!(matches!(result, Err(StorageError::Query(_))));
    }

    #[test]
    fn test_unknown_alias() {
        let result = parse("SELECT e FROM GenericCase e WHERE x.status = 'NEW'", &no_params());
        assert!(matches!(result, Err(StorageError::Query(_))));
        let result = parse("SELECT x FROM GenericCase e", &no_params());
        assert!(matches!(result, Err(StorageError::Query(_))));
    }

    #[test]
    fn test_malformed_queries() {
        for query in [
            "",
            "UPDATE GenericCase SET status = 'X'",
            "SELECT e FROM",
            "SELECT e FROM GenericCase",
            "SELECT e FROM GenericCase e WHERE",
            "SELECT e FROM GenericCase e WHERE e.status",
            "SELECT e FROM GenericCase e WHERE e.status = 'NEW",
            "SELECT e FROM GenericCase e WHERE e.status ; DROP",
            "SELECT e FROM GenericCase e WHERE e.status NOT = 'A'",
            "SELECT e FROM GenericCase e WHERE (e.status = 'A'",
            "SELECT e FROM GenericCase e extra tokens",
        ] {
            assert!(
                matches!(parse(query, &no_params()), Err(StorageError::Query(_))),
                "query should fail: {}",
                query
            );
        }
    }

    #[test]
    fn test_moderate_nesting_is_accepted() {
        let query = format!(
            "SELECT e FROM GenericCase e WHERE {}e.status = 'NEW'{}",
            "NOT (".repeat(20),
            ")".repeat(20)
        );
        assert!(parse(&query, &no_params()).is_ok());
    }

    #[test]
    fn test_deeply_nested_not_is_rejected() {
        let query = format!(
            "SELECT e FROM GenericCase e WHERE {}e.status = 'NEW'",
            "NOT ".repeat(200_000)
        );
        let result = parse(&query, &no_params());
        assert!(
            matches!(&result, Err(StorageError::Query(message)) if message == "Query nesting too deep"),
            "{:?}",
            result
        );
    }

    #[test]
    fn test_deeply_nested_parentheses_are_rejected() {
        let query = format!(
            "SELECT e FROM GenericCase e WHERE {}e.status = 'NEW'{}",
            "(".repeat(100_000),
            ")".repeat(100_000)
        );
        assert!(matches!(parse(&query, &no_params()), Err(StorageError::Query(_))));
    }

    #[test]
    fn test_long_conjunction_is_rejected() {
        let clause = vec!["e.status = 'NEW'"; 10_000].join(" AND ");
        let query = format!("SELECT e FROM GenericCase e WHERE {}", clause);
        assert!(matches!(parse(&query, &no_params()), Err(StorageError::Query(_))));
    }
}
