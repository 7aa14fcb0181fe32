use std::path::PathBuf;
use thiserror::Error;

/// 合并流程中的错误类型，任何一种都会终止当前任务
#[derive(Debug, Error)]
pub enum CombineError {
    /// 输入目录不存在、不是目录或无法读取
    #[error("Cannot access directory '{}': {reason}", path.display())]
    Path { path: PathBuf, reason: String },

    /// 某个CSV文件无法按配置的格式解析
    #[error("Failed to parse '{}'{}: {reason}", path.display(), line_suffix(*line))]
    Parse {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    #[error("No files matching '{pattern}' in '{}'", directory.display())]
    EmptyInput { directory: PathBuf, pattern: String },

    #[error("Failed to write '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn line_suffix(line: Option<u64>) -> String {
    line.map(|l| format!(" at line {}", l)).unwrap_or_default()
}

impl CombineError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CombineError::Parse {
            path: path.into(),
            line: None,
            reason: reason.to_string(),
        }
    }

    pub fn parse_at(path: impl Into<PathBuf>, line: u64, reason: impl ToString) -> Self {
        CombineError::Parse {
            path: path.into(),
            line: Some(line),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CombineError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
