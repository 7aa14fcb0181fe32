//! 合并结果的原子写出
//!
//! 先写入目标目录中的临时文件，`finish()` 时再重命名为目标文件。
//! 如果在 `finish()` 之前被丢弃，临时文件会被删除，目标文件保持不变。

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use tempfile::NamedTempFile;

use crate::models::{CombineError, Dataset, IndexMode};

/// 输出格式选项
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub delimiter: u8,
    pub index: IndexMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            index: IndexMode::PerFile,
        }
    }
}

/// 原子CSV写入器：调用 `finish()` 之前目标路径不会出现任何内容
pub struct AtomicCsvWriter {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
}

impl AtomicCsvWriter {
    /// 在 `final_path` 同一目录下创建临时文件，保证重命名在同一文件系统内完成
    pub fn new(final_path: impl AsRef<Path>, delimiter: u8) -> Result<Self, CombineError> {
        let final_path = final_path.as_ref().to_path_buf();

        let parent_dir = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp_file = NamedTempFile::new_in(&parent_dir)
            .map_err(|e| CombineError::write(&final_path, format!("failed to create temporary file: {}", e)))?;

        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(BufWriter::new(temp_file));

        Ok(Self { writer, final_path })
    }

    pub fn write_record<I, T>(&mut self, record: I) -> Result<(), CombineError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|e| CombineError::write(&self.final_path, e))
    }

    /// 刷新所有缓冲区，并将临时文件重命名为目标文件
    pub fn finish(self) -> Result<PathBuf, CombineError> {
        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| CombineError::write(&self.final_path, format!("failed to flush CSV writer: {}", e.error())))?;

        let named_temp = buf_writer
            .into_inner()
            .map_err(|e| CombineError::write(&self.final_path, format!("failed to flush buffer: {}", e.error())))?;

        named_temp
            .persist(&self.final_path)
            .map_err(|e| CombineError::write(&self.final_path, e.error))?;

        Ok(self.final_path)
    }
}

/// 写出合并后的数据集：表头 + 数据行，按 index 模式添加前导索引列（表头为空）
pub fn write_dataset(path: &Path, dataset: &Dataset, options: &WriteOptions) -> Result<PathBuf, CombineError> {
    let mut writer = AtomicCsvWriter::new(path, options.delimiter)?;
    let with_index = options.index != IndexMode::None;

    let mut header: Vec<&str> = Vec::with_capacity(dataset.width() + 1);
    if with_index {
        header.push("");
    }
    header.extend(dataset.columns.iter().map(String::as_str));

    // 没有任何数据列时输出空文件
    if !dataset.columns.is_empty() {
        writer.write_record(&header)?;
    }

    for (i, row) in dataset.rows.iter().enumerate() {
        let index = match options.index {
            IndexMode::PerFile => Some(row.source_row.to_string()),
            IndexMode::Continuous => Some(i.to_string()),
            IndexMode::None => None,
        };
        writer.write_record(index.iter().chain(row.cells.iter()))?;
    }

    writer.finish()
}
