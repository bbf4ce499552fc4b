//! 数据消息到 line protocol 的编码。

use domain::DataMessage;
use serde_json::{Map, Value};

/// 编码错误。
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("scalar payload for node {node_id}, expected an object or a list of objects")]
    ScalarPayload { node_id: String },
    #[error("invalid field value for {key}")]
    InvalidField { key: String },
}

/// 单个数据点，measurement 之外的部分。
struct InfluxPoint {
    tags: Vec<(String, String)>,
    fields: Map<String, Value>,
}

/// 逐层展开嵌套结构，直到没有字段值是对象或列表。
///
/// 对象字段 `k → {a, b}` 展开为 `k.a`、`k.b`，列表字段 `k → [v0, v1]`
/// 展开为 `k[0]`、`k[1]`。每一轮严格减少一层嵌套，必然终止。
pub fn flatten(data: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = data.clone();
    while flat.values().any(|v| v.is_object() || v.is_array()) {
        let mut next = Map::new();
        for (key, value) in &flat {
            match value {
                Value::Object(object) => {
                    for (child_key, child_value) in object {
                        next.insert(format!("{key}.{child_key}"), child_value.clone());
                    }
                }
                Value::Array(elements) => {
                    for (index, element) in elements.iter().enumerate() {
                        next.insert(format!("{key}[{index}]"), element.clone());
                    }
                }
                scalar => {
                    next.insert(key.clone(), scalar.clone());
                }
            }
        }
        flat = next;
    }
    flat
}

/// 标量字段值的 line protocol 表示。null 不是合法的字段值。
fn field_value(key: &str, value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        Value::String(text) => Ok(format!("\"{text}\"")),
        Value::Number(number) if number.is_f64() => Ok(number.to_string()),
        Value::Number(number) => Ok(format!("{number}i")),
        _ => Err(EncodeError::InvalidField {
            key: key.to_string(),
        }),
    }
}

/// 把一条数据消息编码为 line protocol 文本。
///
/// measurement 取节点 ID 去掉结构引号。列表负载逐元素生成数据点，
/// 并带上 `<末段>_index` 标签标记元素位置；标签按键名排序输出。
/// 每行末尾留空时间戳槽位，多行以换行连接。
pub fn to_line_protocol(message: &DataMessage) -> Result<String, EncodeError> {
    let measurement = message.node_id.replace('"', "");
    let mut points: Vec<InfluxPoint> = Vec::new();

    match &message.payload {
        Value::Array(elements) => {
            let last_segment = measurement.rsplit('.').next().unwrap_or(&measurement);
            let index_tag = format!("{last_segment}_index");
            for (index, element) in elements.iter().enumerate() {
                let object = element
                    .as_object()
                    .ok_or_else(|| EncodeError::ScalarPayload {
                        node_id: message.node_id.clone(),
                    })?;
                points.push(InfluxPoint {
                    tags: vec![(index_tag.clone(), index.to_string())],
                    fields: flatten(object),
                });
            }
        }
        Value::Object(object) => {
            points.push(InfluxPoint {
                tags: Vec::new(),
                fields: flatten(object),
            });
        }
        _ => {
            return Err(EncodeError::ScalarPayload {
                node_id: message.node_id.clone(),
            });
        }
    }

    let mut lines = Vec::with_capacity(points.len());
    for point in &mut points {
        let mut line = measurement.clone();
        // 标签按键名排序，保证输出稳定
        point.tags.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in &point.tags {
            line.push(',');
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }
        line.push(' ');
        let mut first = true;
        for (key, value) in &point.fields {
            if !first {
                line.push(',');
            }
            first = false;
            line.push_str(key);
            line.push('=');
            line.push_str(&field_value(key, value)?);
        }
        line.push(' ');
        lines.push(line);
    }

    Ok(lines.join("\n"))
}
