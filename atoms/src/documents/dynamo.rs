use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::model::{Document, ListQuery, StoredDocument};
use super::service::DocumentStore;
use crate::error::StoreError;

/// Single-table layout:
/// PK = "COLLECTION#{collection}"
/// SK = "DOC#{id}"
/// Every top-level document field is stored as its own attribute.
#[derive(Debug, Clone)]
pub struct DynamoDocumentStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoDocumentStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn pk(collection: &str) -> String {
        format!("COLLECTION#{}", collection)
    }

    fn sk(id: &str) -> String {
        format!("DOC#{}", id)
    }

    async fn put(&self, collection: &str, id: &str, doc: Document, must_not_exist: bool) -> Result<(), StoreError> {
        let mut item: HashMap<String, AttributeValue> = doc
            .into_iter()
            .filter(|(k, _)| k != "PK" && k != "SK")
            .map(|(k, v)| (k, json_to_attribute(v)))
            .collect();
        item.insert("PK".to_string(), AttributeValue::S(Self::pk(collection)));
        item.insert("SK".to_string(), AttributeValue::S(Self::sk(id)));

        let mut builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item));

        if must_not_exist {
            builder = builder.condition_expression("attribute_not_exists(PK)");
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError::Write(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        let mut update_expr = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        for (i, (field, value)) in doc.into_iter().enumerate() {
            if field == "PK" || field == "SK" {
                continue;
            }
            let name = format!("#f{}", i);
            let placeholder = format!(":v{}", i);
            update_expr.push(format!("{} = {}", name, placeholder));
            expr_names.insert(name, field);
            expr_values.insert(placeholder, json_to_attribute(value));
        }

        if update_expr.is_empty() {
            return Ok(());
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(Self::pk(collection)))
            .key("SK", AttributeValue::S(Self::sk(id)))
            .update_expression(format!("SET {}", update_expr.join(", ")));

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError::Write(format!("DynamoDB update_item error: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for DynamoDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(Self::pk(collection)))
            .key("SK", AttributeValue::S(Self::sk(id)))
            .send()
            .await
            .map_err(|e| StoreError::Read(format!("DynamoDB get_item error: {}", e)))?;

        Ok(result.item().map(|item| StoredDocument::new(id, item_to_document(item))))
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let mut docs = Vec::new();
        let mut start_key = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(Self::pk(collection)))
                .expression_attribute_values(":sk_prefix", AttributeValue::S("DOC#".to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| StoreError::Read(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                if let Some(id) = item
                    .get("SK")
                    .and_then(|v| v.as_s().ok())
                    .and_then(|sk| sk.strip_prefix("DOC#"))
                {
                    docs.push(StoredDocument::new(id, item_to_document(item)));
                }
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(query.apply(docs))
    }

    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.put(collection, &id, doc, true).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document, merge: bool) -> Result<(), StoreError> {
        if merge {
            self.merge(collection, id, doc).await
        } else {
            self.put(collection, id, doc, false).await
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(Self::pk(collection)))
            .key("SK", AttributeValue::S(Self::sk(id)))
            .send()
            .await
            .map_err(|e| StoreError::Write(format!("DynamoDB delete_item error: {}", e)))?;
        Ok(())
    }
}

fn item_to_document(item: &HashMap<String, AttributeValue>) -> Document {
    item.iter()
        .filter(|(k, _)| k.as_str() != "PK" && k.as_str() != "SK")
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect()
}

pub(crate) fn json_to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.into_iter().map(|(k, v)| (k, json_to_attribute(v))).collect(),
        ),
    }
}

pub(crate) fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), attribute_to_json(v))).collect(),
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| parse_number(n)).collect()),
        _ => Value::Null,
    }
}

fn parse_number(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = n.parse::<u64>() {
        return Value::Number(u.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_survive_attribute_conversion() {
        let value = json!({
            "title": "Opening day",
            "images": [{"url": "https://img/a.jpg", "order": 2}],
            "featured": true,
            "rating": 4.5,
            "note": null
        });
        let back = attribute_to_json(&json_to_attribute(value.clone()));
        assert_eq!(back, value);
    }

    #[test]
    fn unparsable_numbers_become_null() {
        assert_eq!(attribute_to_json(&AttributeValue::N("abc".into())), Value::Null);
        assert_eq!(attribute_to_json(&AttributeValue::N("-7".into())), json!(-7));
    }
}
