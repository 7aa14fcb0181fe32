use crate::models::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 默认配置：四种实验输出文件各对应一个任务
pub const DEFAULT_CONFIG: &str = r#"[general]
base_dir = "."

[[jobs]]
name = "configinfo"
pattern = "*.configInfo.csv"
delimiter = ";"
skip_malformed_rows = true
output = "combined_configinfo_traces.csv"

[[jobs]]
name = "metrics"
pattern = "*.metrics.csv"
output = "combined_metrics.csv"
index = "none"

[[jobs]]
name = "summary"
pattern = "*.summary.csv"
output = "combined_summaries.csv"

[[jobs]]
name = "traces"
pattern = "*.traces.csv"
columns = [9, 10, 11, 12, 25, 26, 27]
output = "combined_traces.csv"
"#;

pub fn load_config(config_path: &Path) -> Result<Config> {
    // 检查配置文件是否存在，如果不存在则创建默认配置
    if !config_path.exists() {
        create_default_config(config_path)?;
        log::info!("Created default config file at {}", config_path.display());
    }

    // 读取配置文件内容
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config = parse_config(&config_content, config_path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

    Ok(config)
}

/// 按扩展名选择格式：.yaml/.yml 为YAML，其余按TOML解析
fn parse_config(content: &str, config_path: &Path) -> Result<Config> {
    let is_yaml = config_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    } else {
        toml::from_str(content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }
}

fn create_default_config(config_path: &Path) -> Result<()> {
    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to create default config file: {}", config_path.display()))?;

    Ok(())
}
