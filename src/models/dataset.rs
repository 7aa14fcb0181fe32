use serde::Serialize;
use std::path::PathBuf;

use crate::models::config::ColumnSelector;

/// 一行数据，cells 与 Dataset::columns 一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 该行在源文件数据行中的序号（从0开始），用于按文件编号的索引列
    pub source_row: usize,
    pub cells: Vec<String>,
}

/// 内存中的表格数据：有序的列名和文本行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// 追加一行，source_row 取当前行数；长度不足时用空字符串补齐
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.columns.len(), String::new());
        let source_row = self.rows.len();
        self.rows.push(Row { source_row, cells });
    }
}

/// 将列选择器解析为列位置
pub fn resolve_selectors(columns: &[String], selectors: &[ColumnSelector]) -> Result<Vec<usize>, String> {
    selectors
        .iter()
        .map(|selector| match selector {
            ColumnSelector::Index(i) if *i < columns.len() => Ok(*i),
            ColumnSelector::Index(i) => Err(format!(
                "column index {} out of range ({} columns)",
                i,
                columns.len()
            )),
            ColumnSelector::Name(name) => columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| format!("column '{}' not found", name)),
        })
        .collect()
}

/// 单个输入文件的读取统计
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub rows: usize,
    pub skipped_rows: usize,
}

/// 一次合并任务的结果摘要
#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    pub job: String,
    pub directory: PathBuf,
    pub output: PathBuf,
    pub files: Vec<FileReport>,
    pub total_rows: usize,
    pub columns: usize,
}

impl CombineReport {
    pub fn skipped_rows(&self) -> usize {
        self.files.iter().map(|f| f.skipped_rows).sum()
    }
}
