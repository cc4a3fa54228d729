use serde_json::Value;
use std::collections::HashMap;

pub trait State: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn all(&self) -> HashMap<String, Value>;
}
