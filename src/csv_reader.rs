// src/csv_reader.rs
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use csv::{ReaderBuilder, StringRecord};

use crate::models::{ColumnSelector, CombineError, Dataset, JobConfig};
use crate::models::dataset::resolve_selectors;

/// 单个文件的解析选项
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions<'a> {
    pub delimiter: u8,
    pub header_row: bool,
    pub columns: Option<&'a [ColumnSelector]>,
    pub skip_malformed_rows: bool,
}

impl Default for ReadOptions<'_> {
    fn default() -> Self {
        Self {
            delimiter: b',',
            header_row: true,
            columns: None,
            skip_malformed_rows: false,
        }
    }
}

impl<'a> From<&'a JobConfig> for ReadOptions<'a> {
    fn from(job: &'a JobConfig) -> Self {
        Self {
            delimiter: job.delimiter,
            header_row: job.header_row,
            columns: job.columns.as_deref(),
            skip_malformed_rows: job.skip_malformed_rows,
        }
    }
}

/// 解析结果：数据集以及被跳过的格式错误行数
#[derive(Debug)]
pub struct ParsedFile {
    pub dataset: Dataset,
    pub skipped_rows: usize,
}

/// 打开并解析单个CSV文件
pub fn parse_csv_file(path: &Path, options: &ReadOptions) -> Result<ParsedFile, CombineError> {
    let file = File::open(path).map_err(|e| CombineError::parse(path, e))?;
    parse_csv_reader(file, path, options)
}

/// 从任意输入解析CSV，path 仅用于错误信息和日志
pub fn parse_csv_reader<R: Read>(input: R, path: &Path, options: &ReadOptions) -> Result<ParsedFile, CombineError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true) // 字段数检查由下面自行处理
        .from_reader(input);

    let mut records = reader.records();

    let first = match records.next() {
        Some(record) => record.map_err(|e| csv_error(path, e))?,
        None => return Err(CombineError::parse(path, "no columns to parse from file")),
    };

    // 无表头时列名为位置编号，第一行本身也是数据
    let (header, first_data) = if options.header_row {
        (normalize_header(&first), None)
    } else {
        ((0..first.len()).map(|i| i.to_string()).collect::<Vec<_>>(), Some(first))
    };

    let positions: Vec<usize> = match options.columns {
        Some(selectors) => resolve_selectors(&header, selectors).map_err(|reason| CombineError::parse(path, reason))?,
        None => (0..header.len()).collect(),
    };

    let width = header.len();
    let mut dataset = Dataset::new(positions.iter().map(|&i| header[i].clone()).collect());
    let mut skipped_rows = 0;

    for record in first_data.into_iter().map(Ok).chain(records) {
        let record = record.map_err(|e| csv_error(path, e))?;

        if record.len() > width {
            let line = record_line(&record);
            let reason = format!("expected {} fields, saw {}", width, record.len());
            if options.skip_malformed_rows {
                log::warn!("Skipping line {} of {}: {}", line, path.display(), reason);
                skipped_rows += 1;
                continue;
            }
            return Err(CombineError::parse_at(path, line, reason));
        }

        // 字段不足的行用空值补齐
        let cells = positions
            .iter()
            .map(|&i| record.get(i).unwrap_or_default().to_string())
            .collect();
        dataset.push_row(cells);
    }

    log::debug!(
        "Parsed {}: {} rows, {} columns, {} skipped",
        path.display(),
        dataset.len(),
        dataset.width(),
        skipped_rows
    );

    Ok(ParsedFile { dataset, skipped_rows })
}

/// 规范化表头：空列名改为 "Unnamed: i"，重复列名依次加 ".1"、".2" 后缀
fn normalize_header(record: &StringRecord) -> Vec<String> {
    let raw: Vec<String> = record
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());

    for name in raw {
        let mut candidate = name.clone();
        while seen.contains(&candidate) {
            let count = counts.entry(name.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{}.{}", name, count);
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn csv_error(path: &Path, err: csv::Error) -> CombineError {
    match err.position() {
        Some(pos) => CombineError::parse_at(path, pos.line(), &err),
        None => CombineError::parse(path, &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse_str(content: &str, options: &ReadOptions) -> Result<ParsedFile, CombineError> {
        parse_csv_reader(content.as_bytes(), Path::new("test.csv"), options)
    }

    fn column(dataset: &Dataset, pos: usize) -> Vec<&str> {
        dataset.rows.iter().map(|r| r.cells[pos].as_str()).collect()
    }

    #[test]
    fn test_parse_csv_basic() {
        let parsed = parse_str("step,speed\n0,12.5\n1,13.0\n", &ReadOptions::default()).unwrap();

        assert_eq!(parsed.dataset.columns, vec!["step", "speed"]);
        assert_eq!(parsed.dataset.len(), 2);
        assert_eq!(column(&parsed.dataset, 1), vec!["12.5", "13.0"]);
        assert_eq!(parsed.skipped_rows, 0);
    }

    #[test]
    fn test_parse_csv_semicolon_delimiter() {
        let options = ReadOptions { delimiter: b';', ..Default::default() };
        let parsed = parse_str("name;value\nlanes;3\nlength;\"1,5\"\n", &options).unwrap();

        assert_eq!(parsed.dataset.columns, vec!["name", "value"]);
        assert_eq!(column(&parsed.dataset, 1), vec!["3", "1,5"]);
    }

    #[test]
    fn test_parse_csv_values_kept_verbatim() {
        let parsed = parse_str("id,ratio\n007,1.50\n", &ReadOptions::default()).unwrap();
        assert_eq!(parsed.dataset.rows[0].cells, vec!["007", "1.50"]);
    }

    #[test]
    fn test_malformed_row_aborts_by_default() {
        let result = parse_str("a,b\n1,2\n3,4,5\n6,7\n", &ReadOptions::default());

        match result {
            Err(CombineError::Parse { line, .. }) => assert_eq!(line, Some(3)),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_row_skipped_when_enabled() {
        let options = ReadOptions { skip_malformed_rows: true, ..Default::default() };
        let parsed = parse_str("a,b\n1,2\n3,4,5\n6,7\n", &options).unwrap();

        assert_eq!(parsed.dataset.len(), 2);
        assert_eq!(parsed.skipped_rows, 1);
        assert_eq!(column(&parsed.dataset, 0), vec!["1", "6"]);
        // 跳过的行不占用行号
        assert_eq!(parsed.dataset.rows[1].source_row, 1);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let parsed = parse_str("a,b,c\n1,2\n", &ReadOptions::default()).unwrap();
        assert_eq!(parsed.dataset.rows[0].cells, vec!["1", "2", ""]);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let parsed = parse_str("a,b\n1,2\n\n3,4\n", &ReadOptions::default()).unwrap();
        assert_eq!(parsed.dataset.len(), 2);
    }

    #[test]
    fn test_column_subset_in_configured_order() {
        let header: Vec<String> = (0..30).map(|i| format!("c{}", i)).collect();
        let row: Vec<String> = (0..30).map(|i| format!("v{}", i)).collect();
        let content = format!("{}\n{}\n", header.join(","), row.join(","));

        let selectors: Vec<ColumnSelector> = [27, 9, 10, 11, 12, 25, 26]
            .into_iter()
            .map(ColumnSelector::Index)
            .collect();
        let options = ReadOptions { columns: Some(&selectors), ..Default::default() };
        let parsed = parse_str(&content, &options).unwrap();

        assert_eq!(parsed.dataset.columns, vec!["c27", "c9", "c10", "c11", "c12", "c25", "c26"]);
        assert_eq!(parsed.dataset.rows[0].cells.len(), 7);
        assert_eq!(parsed.dataset.rows[0].cells[0], "v27");
    }

    #[test]
    fn test_column_subset_by_name_and_missing() {
        let selectors = vec![ColumnSelector::Name("b".into())];
        let options = ReadOptions { columns: Some(&selectors), ..Default::default() };
        let parsed = parse_str("a,b\n1,2\n", &options).unwrap();
        assert_eq!(parsed.dataset.columns, vec!["b"]);

        let selectors = vec![ColumnSelector::Index(5)];
        let options = ReadOptions { columns: Some(&selectors), ..Default::default() };
        assert!(matches!(parse_str("a,b\n1,2\n", &options), Err(CombineError::Parse { .. })));
    }

    #[test]
    fn test_no_header_row() {
        let options = ReadOptions { header_row: false, ..Default::default() };
        let parsed = parse_str("1,2\n3,4\n", &options).unwrap();

        assert_eq!(parsed.dataset.columns, vec!["0", "1"]);
        assert_eq!(parsed.dataset.len(), 2);
        assert_eq!(parsed.dataset.rows[0].cells, vec!["1", "2"]);
    }

    #[test]
    fn test_header_normalization() {
        let parsed = parse_str(",x,x,x.1\n0,1,2,3\n", &ReadOptions::default()).unwrap();
        assert_eq!(parsed.dataset.columns, vec!["Unnamed: 0", "x", "x.1", "x.1.1"]);
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        assert!(matches!(parse_str("", &ReadOptions::default()), Err(CombineError::Parse { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let bytes: &[u8] = b"a,b\n1,\xff\xfe\n";
        let options = ReadOptions { skip_malformed_rows: true, ..Default::default() };
        let result = parse_csv_reader(bytes, Path::new("bad.csv"), &options);
        assert!(matches!(result, Err(CombineError::Parse { .. })));
    }

    #[test]
    fn test_parse_csv_file_missing() {
        let temp_dir = tempdir().unwrap();
        let result = parse_csv_file(&temp_dir.path().join("gone.csv"), &ReadOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_csv_file_from_disk() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("run.summary.csv");
        fs::write(&path, "vehicles,delay\n40,1.2\n").unwrap();

        let parsed = parse_csv_file(&path, &ReadOptions::default()).unwrap();
        assert_eq!(parsed.dataset.columns, vec!["vehicles", "delay"]);
        assert_eq!(parsed.dataset.len(), 1);
    }
}
