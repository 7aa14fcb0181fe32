use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// 反序列化可选字符串，将空字符串转换为None
///
/// # 参数
/// - `deserializer`: 用于反序列化的serde反序列化器
///
/// # 返回值
/// 反序列化后的可选字符串，如果原字符串为空则返回None
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()))
}

/// 反序列化分隔符：必须是单个ASCII字符，如 "," 或 ";"
pub fn deserialize_delimiter<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_delimiter(&s).map_err(D::Error::custom)
}

/// 解析分隔符字符串，支持 "\t" 和 "tab" 表示制表符
pub fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }
    match s.as_bytes() {
        // 引号和换行符是CSV语法本身的一部分，不能作为分隔符
        [b'"' | b'\n' | b'\r'] => Err(format!("{:?} cannot be used as a delimiter", s)),
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("delimiter must be a single ASCII character, got {:?}", s)),
    }
}
