use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Memory元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub run_id: uuid::Uuid,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub access_counts: HashMap<String, u64>,
    pub data_sizes: HashMap<String, usize>,
    pub total_size: usize,
}

impl Default for MemoryMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMetadata {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            last_updated: Utc::now(),
            access_counts: HashMap::new(),
            data_sizes: HashMap::new(),
            total_size: 0,
        }
    }
}

/// 单次流水线运行的内存，运行结束即丢弃
#[derive(Debug)]
pub struct Memory {
    data: HashMap<String, Value>,
    metadata: MemoryMetadata,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            metadata: MemoryMetadata::new(),
        }
    }

    pub fn metadata(&self) -> &MemoryMetadata {
        &self.metadata
    }

    /// 存储数据到指定作用域和键
    pub fn store<T>(&mut self, scope: &str, key: &str, data: T) -> Result<()>
    where
        T: Serialize,
    {
        let full_key = format!("{}:{}", scope, key);
        let serialized = serde_json::to_value(data)?;

        let data_size = serialized.to_string().len();

        if let Some(old_size) = self.metadata.data_sizes.get(&full_key) {
            self.metadata.total_size -= old_size;
        }
        self.metadata.data_sizes.insert(full_key.clone(), data_size);
        self.metadata.total_size += data_size;
        self.metadata.last_updated = Utc::now();

        self.data.insert(full_key, serialized);
        Ok(())
    }

    /// 从指定作用域和键获取数据
    pub fn get<T>(&mut self, scope: &str, key: &str) -> Option<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        let full_key = format!("{}:{}", scope, key);

        *self
            .metadata
            .access_counts
            .entry(full_key.clone())
            .or_insert(0) += 1;

        self.data
            .get(&full_key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// 列出指定作用域的所有键（按键排序）
    pub fn list_keys(&self, scope: &str) -> Vec<String> {
        let prefix = format!("{}:", scope);
        let mut keys: Vec<String> = self
            .data
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .map(|key| key[prefix.len()..].to_string())
            .collect();
        keys.sort();
        keys
    }

    /// 按键顺序读取作用域内所有能反序列化为 `T` 的值
    pub fn list_values<T>(&self, scope: &str, key_prefix: &str) -> Vec<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        self.list_keys(scope)
            .into_iter()
            .filter(|key| key.starts_with(key_prefix))
            .filter_map(|key| self.data.get(&format!("{}:{}", scope, key)))
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
            .collect()
    }

    /// 作用域内下一个顺序键，如 `search-0003`
    pub fn next_sequence_key(&self, scope: &str, key_prefix: &str) -> String {
        let count = self
            .list_keys(scope)
            .iter()
            .filter(|key| key.starts_with(key_prefix))
            .count();
        format!("{}-{:04}", key_prefix, count + 1)
    }

    /// 检查是否存在指定数据
    pub fn has_data(&self, scope: &str, key: &str) -> bool {
        let full_key = format!("{}:{}", scope, key);
        self.data.contains_key(&full_key)
    }

    /// 获取内存使用统计
    pub fn get_usage_stats(&self) -> HashMap<String, usize> {
        let mut stats = HashMap::new();

        for (key, size) in &self.metadata.data_sizes {
            let scope = key.split(':').next().unwrap_or("unknown").to_string();
            *stats.entry(scope).or_insert(0) += size;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get() {
        let mut memory = Memory::new();
        memory.store("reports", "initial", "# Title").unwrap();

        assert!(memory.has_data("reports", "initial"));
        assert_eq!(
            memory.get::<String>("reports", "initial").as_deref(),
            Some("# Title")
        );
        assert_eq!(memory.metadata().access_counts["reports:initial"], 1);
        assert!(memory.get::<String>("reports", "missing").is_none());
    }

    #[test]
    fn test_overwrite_updates_sizes() {
        let mut memory = Memory::new();
        memory.store("s", "k", "aaaa").unwrap();
        let first = memory.metadata().total_size;
        memory.store("s", "k", "a").unwrap();
        assert!(memory.metadata().total_size < first);
        assert_eq!(memory.get_usage_stats()["s"], memory.metadata().total_size);
    }

    #[test]
    fn test_sequence_keys_keep_order() {
        let mut memory = Memory::new();
        for value in ["first", "second", "third"] {
            let key = memory.next_sequence_key("journal", "search");
            memory.store("journal", &key, value).unwrap();
        }
        memory.store("journal", "crawl-0001", 42).unwrap();

        assert_eq!(memory.next_sequence_key("journal", "search"), "search-0004");
        let values: Vec<String> = memory.list_values("journal", "search");
        assert_eq!(values, vec!["first", "second", "third"]);
        assert_eq!(memory.list_keys("journal").len(), 4);
    }
}
