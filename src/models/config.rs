use clap::ValueEnum;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::error::CombineError;
use crate::models::utils::{deserialize_delimiter, deserialize_optional_string};

/// 应用程序配置结构
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// 通用配置
#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    /// 任务未指定 directory 时使用的目录
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { base_dir: default_base_dir() }
    }
}

/// 单个合并任务的配置，对应一种文件后缀
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub directory: Option<String>,
    pub pattern: String,
    #[serde(default = "default_delimiter", deserialize_with = "deserialize_delimiter")]
    pub delimiter: u8,
    #[serde(default)]
    pub columns: Option<Vec<ColumnSelector>>,
    #[serde(default = "default_true")]
    pub header_row: bool,
    #[serde(default)]
    pub skip_malformed_rows: bool,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_delimiter", deserialize_with = "deserialize_delimiter")]
    pub output_delimiter: u8,
    #[serde(default)]
    pub index: IndexMode,
    #[serde(default)]
    pub column_alignment: ColumnAlignment,
    #[serde(default)]
    pub empty_input: EmptyInputPolicy,
}

/// 列选择器：按位置（从0开始）或按列名
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

/// 输出文件中的行索引列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum IndexMode {
    /// 每个源文件内的行号，从0开始
    #[default]
    PerFile,
    /// 合并结果中的连续行号
    Continuous,
    None,
}

/// 各文件列集合不一致时的对齐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ColumnAlignment {
    #[default]
    Union,
    Intersection,
}

/// 没有匹配文件时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyInputPolicy {
    #[default]
    Error,
    HeaderOnly,
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_delimiter() -> u8 {
    b','
}

fn default_true() -> bool {
    true
}

fn default_output() -> String {
    "combined.csv".to_string()
}

impl JobConfig {
    /// 以默认选项创建任务（逗号分隔、有表头、按文件编号的索引列）
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: None,
            pattern: pattern.into(),
            delimiter: default_delimiter(),
            columns: None,
            header_row: true,
            skip_malformed_rows: false,
            output: default_output(),
            output_delimiter: default_delimiter(),
            index: IndexMode::default(),
            column_alignment: ColumnAlignment::default(),
            empty_input: EmptyInputPolicy::default(),
        }
    }

    /// 任务实际使用的目录：自身的 directory 优先，否则使用 general.base_dir
    pub fn resolve_directory(&self, general: &GeneralConfig) -> PathBuf {
        PathBuf::from(self.directory.as_deref().unwrap_or(&general.base_dir))
    }

    pub fn validate(&self) -> Result<(), CombineError> {
        if self.name.trim().is_empty() {
            return Err(CombineError::Config("job name must not be empty".to_string()));
        }
        glob::Pattern::new(&self.pattern).map_err(|e| {
            CombineError::Config(format!("job '{}': invalid pattern '{}': {}", self.name, self.pattern, e))
        })?;
        if self.output.trim().is_empty() {
            return Err(CombineError::Config(format!("job '{}': output must not be empty", self.name)));
        }
        if matches!(&self.columns, Some(cols) if cols.is_empty()) {
            return Err(CombineError::Config(format!("job '{}': columns must not be empty", self.name)));
        }
        Ok(())
    }
}

impl Config {
    /// 检查所有任务配置，任务名必须唯一
    pub fn validate(&self) -> Result<(), CombineError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !seen.insert(job.name.as_str()) {
                return Err(CombineError::Config(format!("duplicate job name '{}'", job.name)));
            }
        }
        check_distinct_outputs(self.jobs.iter().map(|job| (job, job.resolve_directory(&self.general))))
    }

    /// 按名称选择任务；名称列表为空时返回全部任务
    pub fn select_jobs(&self, names: &[String]) -> Result<Vec<&JobConfig>, CombineError> {
        if names.is_empty() {
            return Ok(self.jobs.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.jobs
                    .iter()
                    .find(|job| &job.name == name)
                    .ok_or_else(|| CombineError::Config(format!("unknown job '{}'", name)))
            })
            .collect()
    }
}

/// 检查各任务的输出路径互不相同，否则后运行的任务会覆盖前一个任务的结果
pub fn check_distinct_outputs<'a>(
    targets: impl IntoIterator<Item = (&'a JobConfig, PathBuf)>,
) -> Result<(), CombineError> {
    let mut outputs: HashMap<PathBuf, &str> = HashMap::new();
    for (job, directory) in targets {
        let output = directory.join(&job.output);
        if let Some(previous) = outputs.insert(output.clone(), job.name.as_str()) {
            return Err(CombineError::Config(format!(
                "jobs '{}' and '{}' both write {}",
                previous,
                job.name,
                output.display()
            )));
        }
    }
    Ok(())
}

impl FromStr for ColumnSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(i) => ColumnSelector::Index(i),
            Err(_) => ColumnSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Index(i) => write!(f, "#{}", i),
            ColumnSelector::Name(name) => write!(f, "{}", name),
        }
    }
}
