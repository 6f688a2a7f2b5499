pub mod parser;

use crate::entity::EntityKind;
use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 命名参数绑定，键为不带冒号的参数名
pub type Parameters = HashMap<String, serde_json::Value>;

/// Condition 表示查询条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    /// 空条件（匹配所有）
    Empty,

    And {
        left: Box<Condition>,
        right: Box<Condition>,
    },

    Or {
        left: Box<Condition>,
        right: Box<Condition>,
    },

    Not {
        condition: Box<Condition>,
    },

    Equal {
        field: String,
        value: serde_json::Value,
    },

    NotEqual {
        field: String,
        value: serde_json::Value,
    },

    In {
        field: String,
        values: Vec<serde_json::Value>,
    },

    NotIn {
        field: String,
        values: Vec<serde_json::Value>,
    },

    LessThan {
        field: String,
        bound: serde_json::Value,
        inclusive: bool,
    },

    GreaterThan {
        field: String,
        bound: serde_json::Value,
        inclusive: bool,
    },

    IsNull {
        field: String,
    },

    IsNotNull {
        field: String,
    },
}

impl Condition {
    pub fn and(self, other: Condition) -> Self {
        Self::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        Self::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn not(self) -> Self {
        Self::Not {
            condition: Box::new(self),
        }
    }
}

/// Queries 提供条件构建工具函数
pub mod queries {
    use super::Condition;
    use serde_json::Value;

    pub fn equal(field: impl Into<String>, value: Value) -> Condition {
        Condition::Equal {
            field: field.into(),
            value,
        }
    }

    pub fn not_equal(field: impl Into<String>, value: Value) -> Condition {
        Condition::NotEqual {
            field: field.into(),
            value,
        }
    }

    /// 单个值时退化为等于条件
    pub fn in_condition(field: impl Into<String>, mut values: Vec<Value>) -> Condition {
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return equal(field, value);
            }
        }
        Condition::In {
            field: field.into(),
            values,
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Condition {
        Condition::NotIn {
            field: field.into(),
            values,
        }
    }

    pub fn less_than(field: impl Into<String>, bound: Value, inclusive: bool) -> Condition {
        Condition::LessThan {
            field: field.into(),
            bound,
            inclusive,
        }
    }

    pub fn greater_than(field: impl Into<String>, bound: Value, inclusive: bool) -> Condition {
        Condition::GreaterThan {
            field: field.into(),
            bound,
            inclusive,
        }
    }

    pub fn is_null(field: impl Into<String>) -> Condition {
        Condition::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Condition {
        Condition::IsNotNull {
            field: field.into(),
        }
    }
}

/// 查询语句类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    Select,
    Delete,
}

/// ParsedQuery 是解析并完成参数绑定后的查询
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub statement: Statement,
    /// FROM 子句中的实体类型名
    pub kind: String,
    pub condition: Condition,
}

impl ParsedQuery {
    /// 解析查询语句并绑定命名参数
    pub fn parse(query: &str, params: &Parameters) -> Result<Self> {
        parser::parse(query, params)
    }

    /// 校验查询的实体类型
    pub fn expect_kind(&self, kind: &EntityKind) -> Result<()> {
        if self.kind != kind.name {
            return Err(StorageError::Query(format!(
                "Query targets {} but {} was requested",
                self.kind, kind.name
            )));
        }
        Ok(())
    }

    /// 校验查询语句类型
    pub fn expect_statement(&self, statement: Statement) -> Result<()> {
        if self.statement != statement {
            return Err(StorageError::Query(format!(
                "Expected a {:?} statement, found {:?}",
                statement, self.statement
            )));
        }
        Ok(())
    }
}
