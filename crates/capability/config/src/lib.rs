//! 应用运行配置加载。
//!
//! 三组环境变量（CENTRIFUGO_ / INFLUXDB_ / OPC_）对应三个下游组件。
//! 所有校验在进程启动时完成，组件运行期不再出现配置类错误。

use std::env;
use std::fmt;
use std::path::PathBuf;

use url::Url;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("same node ids found in OPC_MONITOR_NODES and OPC_RECORD_NODES")]
    OverlappingNodes,
    #[error("missing one of OPC_CERT_FILE/OPC_PRIVATE_KEY_FILE")]
    CertKeyPair,
}

/// 敏感配置值。Debug 输出固定掩码，避免 --print-config 泄漏。
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("**********")
    }
}

/// Centrifugo 相关配置。
#[derive(Debug, Clone)]
pub struct CentrifugoConfig {
    pub api_key: Secret,
    pub api_url: Url,
    pub proxy_host: String,
    pub proxy_port: u16,
}

/// InfluxDB 相关配置。
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub bucket: String,
    pub token: Secret,
    pub base_url: Url,
}

/// OPC-UA 相关配置。
#[derive(Debug, Clone)]
pub struct OpcConfig {
    pub server_url: Url,
    pub monitor_nodes: Vec<String>,
    pub record_nodes: Vec<String>,
    pub retry_delay_seconds: u64,
    pub record_interval_seconds: u64,
    pub cert_file: Option<PathBuf>,
    pub private_key_file: Option<PathBuf>,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub centrifugo: CentrifugoConfig,
    pub influxdb: InfluxConfig,
    pub opc: OpcConfig,
}

impl AppConfig {
    /// 从环境变量读取配置并完成全部校验。
    pub fn from_env() -> Result<Self, ConfigError> {
        let centrifugo = CentrifugoConfig {
            api_key: Secret::new(read_required("CENTRIFUGO_API_KEY")?),
            api_url: read_http_url_with_default("CENTRIFUGO_API_URL", "http://localhost:8000/api")?,
            proxy_host: env::var("CENTRIFUGO_PROXY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            proxy_port: read_u16_with_default("CENTRIFUGO_PROXY_PORT", 8008)?,
        };

        let influxdb = InfluxConfig {
            bucket: read_required("INFLUXDB_BUCKET")?,
            token: Secret::new(read_required("INFLUXDB_TOKEN")?),
            base_url: read_http_url_with_default("INFLUXDB_BASE_URL", "http://localhost:8086")?,
        };

        let opc = OpcConfig {
            server_url: read_opc_url("OPC_SERVER_URL")?,
            monitor_nodes: read_node_list("OPC_MONITOR_NODES")?,
            record_nodes: read_node_list("OPC_RECORD_NODES")?,
            retry_delay_seconds: read_positive_u64_with_default("OPC_RETRY_DELAY", 5)?,
            record_interval_seconds: read_positive_u64_with_default("OPC_RECORD_INTERVAL", 60)?,
            cert_file: read_optional_file("OPC_CERT_FILE")?,
            private_key_file: read_optional_file("OPC_PRIVATE_KEY_FILE")?,
        };

        let config = Self {
            centrifugo,
            influxdb,
            opc,
        };
        config.validate()?;
        Ok(config)
    }

    /// 跨字段校验：节点集合不相交，证书与私钥成对出现。
    fn validate(&self) -> Result<(), ConfigError> {
        let overlapping = self
            .opc
            .monitor_nodes
            .iter()
            .any(|node| self.opc.record_nodes.contains(node));
        if overlapping {
            return Err(ConfigError::OverlappingNodes);
        }
        if self.opc.cert_file.is_some() != self.opc.private_key_file.is_some() {
            return Err(ConfigError::CertKeyPair);
        }
        Ok(())
    }
}

/// 环境变量帮助表（变量名、说明），供 --help 输出使用。
pub const ENV_HELP: &[(&str, &str)] = &[
    ("CENTRIFUGO_API_KEY", "Centrifugo API key"),
    (
        "CENTRIFUGO_API_URL",
        "URL of Centrifugo HTTP api (default: http://localhost:8000/api)",
    ),
    (
        "CENTRIFUGO_PROXY_HOST",
        "Host for Centrifugo proxy server to listen on (default: 0.0.0.0)",
    ),
    (
        "CENTRIFUGO_PROXY_PORT",
        "Port for Centrifugo proxy server to listen on (default: 8008)",
    ),
    ("INFLUXDB_BUCKET", "InfluxDB bucket"),
    ("INFLUXDB_TOKEN", "InfluxDB auth token with write permission"),
    (
        "INFLUXDB_BASE_URL",
        "Base InfluxDB URL (default: http://localhost:8086)",
    ),
    (
        "OPC_SERVER_URL",
        "URL of the OPC-UA server, including username / password if needed",
    ),
    (
        "OPC_MONITOR_NODES",
        "Array of node IDs to monitor without recording (JSON format)",
    ),
    (
        "OPC_RECORD_NODES",
        "Array of node IDs to monitor and record (JSON format)",
    ),
    (
        "OPC_RETRY_DELAY",
        "Delay in seconds to retry OPC-UA connection (default: 5)",
    ),
    (
        "OPC_RECORD_INTERVAL",
        "Interval in seconds between forced reads of recorded nodes (default: 60)",
    ),
    (
        "OPC_CERT_FILE",
        "Path of the OPC-UA client certificate (default: unset)",
    ),
    (
        "OPC_PRIVATE_KEY_FILE",
        "Path of the OPC-UA client private key (default: unset)",
    ),
];

fn read_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    let parsed = value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value.clone()))?;
    if parsed == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(parsed)
}

fn read_positive_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    let parsed = value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value.clone()))?;
    if parsed == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(parsed)
}

/// 读取 http/https URL，缺省时使用默认值。
fn read_http_url_with_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    let url = Url::parse(&value).map_err(|_| ConfigError::Invalid(key.to_string(), value.clone()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(url)
}

/// 读取 OPC-UA 服务器地址，协议必须是 opc.tcp。
fn read_opc_url(key: &str) -> Result<Url, ConfigError> {
    let value = read_required(key)?;
    let url = Url::parse(&value).map_err(|_| ConfigError::Invalid(key.to_string(), value.clone()))?;
    if url.scheme() != "opc.tcp" {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(url)
}

/// 读取 JSON 数组格式的节点 ID 列表。
fn read_node_list(key: &str) -> Result<Vec<String>, ConfigError> {
    let value = read_required(key)?;
    serde_json::from_str::<Vec<String>>(&value)
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取可选的文件路径，设置时要求文件存在。
fn read_optional_file(key: &str) -> Result<Option<PathBuf>, ConfigError> {
    let value = match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };
    let path = PathBuf::from(&value);
    if !path.is_file() {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(Some(path))
}
