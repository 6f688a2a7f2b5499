use casefile_api::Condition;
use serde_json::Value;
use std::cmp::Ordering;

/// 判断JSON文档是否满足查询条件
///
/// 语义与MongoDB过滤器保持一致：数组字段按包含关系匹配，
/// 缺失字段视为null，数值按大小比较。
pub fn matches(condition: &Condition, document: &Value) -> bool {
    match condition {
        Condition::Empty => true,
        Condition::And { left, right } => matches(left, document) && matches(right, document),
        Condition::Or { left, right } => matches(left, document) || matches(right, document),
        Condition::Not { condition } => !matches(condition, document),
        Condition::Equal { field, value } => field_equals(document, field, value),
        Condition::NotEqual { field, value } => !field_equals(document, field, value),
        Condition::In { field, values } => values.iter().any(|v| field_equals(document, field, v)),
        Condition::NotIn { field, values } => {
            !values.iter().any(|v| field_equals(document, field, v))
        }
        Condition::LessThan {
            field,
            bound,
            inclusive,
        } => candidates(document, field).into_iter().any(|v| match compare(v, bound) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => *inclusive,
            _ => false,
        }),
        Condition::GreaterThan {
            field,
            bound,
            inclusive,
        } => candidates(document, field).into_iter().any(|v| match compare(v, bound) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => *inclusive,
            _ => false,
        }),
        Condition::IsNull { field } => field_equals(document, field, &Value::Null),
        Condition::IsNotNull { field } => !field_equals(document, field, &Value::Null),
    }
}

fn field_equals(document: &Value, field: &str, expected: &Value) -> bool {
    let values = candidates(document, field);
    if values.is_empty() {
        return expected.is_null();
    }
    values.into_iter().any(|v| values_equal(v, expected))
}

/// 按点分路径取值，途经数组时展开，末端数组同时返回数组本身和其元素
fn candidates<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => {
                    next.extend(items.iter().filter_map(|item| item.get(segment)));
                }
                _ => {}
            }
        }
        current = next;
    }

    let mut expanded = Vec::with_capacity(current.len());
    for value in current {
        expanded.push(value);
        if let Value::Array(items) = value {
            expanded.extend(items.iter());
        }
    }
    expanded
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
