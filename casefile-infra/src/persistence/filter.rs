use casefile_api::{Condition, Result, StorageError};
use mongodb::bson::{Bson, Document};
use serde_json::Value;

/// 将查询条件转换为MongoDB过滤文档
///
/// 比较值一律放在运算符之下，对象值按字面量匹配，不会被解释为运算符。
pub fn condition_to_filter(condition: &Condition) -> Result<Document> {
    let mut filter = Document::new();
    match condition {
        Condition::Empty => {}
        Condition::And { left, right } => {
            filter.insert(
                "$and",
                vec![
                    Bson::Document(condition_to_filter(left)?),
                    Bson::Document(condition_to_filter(right)?),
                ],
            );
        }
        Condition::Or { left, right } => {
            filter.insert(
                "$or",
                vec![
                    Bson::Document(condition_to_filter(left)?),
                    Bson::Document(condition_to_filter(right)?),
                ],
            );
        }
        Condition::Not { condition } => {
            filter.insert("$nor", vec![Bson::Document(condition_to_filter(condition)?)]);
        }
        Condition::Equal { field, value } => {
            filter.insert(field.as_str(), operator("$eq", to_bson(value)?));
        }
        Condition::NotEqual { field, value } => {
            filter.insert(field.as_str(), operator("$ne", to_bson(value)?));
        }
        Condition::In { field, values } => {
            filter.insert(field.as_str(), operator("$in", to_bson_array(values)?));
        }
        Condition::NotIn { field, values } => {
            filter.insert(field.as_str(), operator("$nin", to_bson_array(values)?));
        }
        Condition::LessThan {
            field,
            bound,
            inclusive,
        } => {
            let op = if *inclusive { "$lte" } else { "$lt" };
            filter.insert(field.as_str(), operator(op, to_bson(bound)?));
        }
        Condition::GreaterThan {
            field,
            bound,
            inclusive,
        } => {
            let op = if *inclusive { "$gte" } else { "$gt" };
            filter.insert(field.as_str(), operator(op, to_bson(bound)?));
        }
        Condition::IsNull { field } => {
            filter.insert(field.as_str(), operator("$eq", Bson::Null));
        }
        Condition::IsNotNull { field } => {
            filter.insert(field.as_str(), operator("$ne", Bson::Null));
        }
    }
    Ok(filter)
}

fn operator(op: &str, value: Bson) -> Document {
    let mut document = Document::new();
    document.insert(op, value);
    document
}

fn to_bson(value: &Value) -> Result<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn to_bson_array(values: &[Value]) -> Result<Bson> {
    let items = values.iter().map(to_bson).collect::<Result<Vec<_>>>()?;
    Ok(Bson::Array(items))
}
