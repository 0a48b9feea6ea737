//! 产品数据模型

use serde::{
    de::{self, IgnoredAny, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
}

/// 创建/更新请求体
///
/// 解码规则与原服务的 JSON 绑定一致：
/// - 字段名不区分大小写，重复字段以最后一个为准；
/// - 缺失字段或 `null` 字段保留零值，整个请求体为 `null` 时得到空产品；
/// - `id` 会做类型检查但被丢弃，其余未知字段忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub price: i64,
}

impl ProductInput {
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
        }
    }
}

impl<'de> Deserialize<'de> for ProductInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(ProductInputVisitor)
    }
}

struct ProductInputVisitor;

impl<'de> Visitor<'de> for ProductInputVisitor {
    type Value = ProductInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a product object")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ProductInput::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ProductInput::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut input = ProductInput::default();

        while let Some(key) = map.next_key::<String>()? {
            if key.eq_ignore_ascii_case("name") {
                if let Some(name) = map.next_value::<Option<String>>()? {
                    input.name = name;
                }
            } else if key.eq_ignore_ascii_case("price") {
                if let Some(price) = map.next_value::<Option<i64>>()? {
                    input.price = price;
                }
            } else if key.eq_ignore_ascii_case("id") {
                map.next_value::<Option<i64>>()?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }

        Ok(input)
    }
}
