// src/combine.rs
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::csv_reader::{parse_csv_file, ReadOptions};
use crate::csv_writer::{write_dataset, WriteOptions};
use crate::file_utils::find_matching_files;
use crate::models::{
    ColumnAlignment, ColumnSelector, CombineError, CombineReport, Dataset, EmptyInputPolicy, FileReport, JobConfig, Row,
};

/// 按行堆叠多个数据集，列按名称对齐
///
/// - `Union`：按首次出现的顺序合并所有列，缺失值填空字符串
/// - `Intersection`：只保留所有数据集都有的列，顺序与第一个数据集一致
pub fn stack_datasets(datasets: Vec<Dataset>, alignment: ColumnAlignment) -> Dataset {
    let columns = aligned_columns(&datasets, alignment);
    let total_rows = datasets.iter().map(Dataset::len).sum();
    let mut combined = Dataset {
        columns,
        rows: Vec::with_capacity(total_rows),
    };

    for dataset in datasets {
        let lookup: HashMap<&str, usize> = dataset
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let positions: Vec<Option<usize>> = combined
            .columns
            .iter()
            .map(|name| lookup.get(name.as_str()).copied())
            .collect();

        for mut row in dataset.rows {
            let cells = positions
                .iter()
                .map(|pos| pos.map(|p| std::mem::take(&mut row.cells[p])).unwrap_or_default())
                .collect();
            combined.rows.push(Row {
                source_row: row.source_row,
                cells,
            });
        }
    }

    combined
}

fn aligned_columns(datasets: &[Dataset], alignment: ColumnAlignment) -> Vec<String> {
    match alignment {
        ColumnAlignment::Union => {
            let mut seen = HashSet::new();
            datasets
                .iter()
                .flat_map(|ds| ds.columns.iter())
                .filter(|name| seen.insert(name.as_str()))
                .cloned()
                .collect()
        }
        ColumnAlignment::Intersection => {
            let Some((first, rest)) = datasets.split_first() else {
                return Vec::new();
            };
            first
                .columns
                .iter()
                .filter(|name| rest.iter().all(|ds| ds.columns.contains(*name)))
                .cloned()
                .collect()
        }
    }
}

/// 执行一个合并任务：查找文件、逐个解析、堆叠并写出
///
/// 所有文件都解析成功后才会写输出文件，任何错误都不会留下部分结果
pub fn concatenate(directory: &Path, job: &JobConfig) -> Result<CombineReport, CombineError> {
    job.validate()?;

    let output_path = directory.join(&job.output);
    let files = find_matching_files(directory, &job.pattern, Some(&output_path))?;
    log::info!(
        "[{}] {} files matching '{}' in {}",
        job.name,
        files.len(),
        job.pattern,
        directory.display()
    );

    let write_options = WriteOptions {
        delimiter: job.output_delimiter,
        index: job.index,
    };

    if files.is_empty() {
        match job.empty_input {
            EmptyInputPolicy::Error => {
                return Err(CombineError::EmptyInput {
                    directory: directory.to_path_buf(),
                    pattern: job.pattern.clone(),
                });
            }
            EmptyInputPolicy::HeaderOnly => {
                let dataset = Dataset::new(header_only_columns(job.columns.as_deref()));
                write_dataset(&output_path, &dataset, &write_options)?;
                log::warn!("[{}] No input files, wrote header only to {}", job.name, output_path.display());
                return Ok(CombineReport {
                    job: job.name.clone(),
                    directory: directory.to_path_buf(),
                    output: output_path,
                    files: Vec::new(),
                    total_rows: 0,
                    columns: dataset.width(),
                });
            }
        }
    }

    let read_options = ReadOptions::from(job);
    let mut datasets = Vec::with_capacity(files.len());
    let mut file_reports = Vec::with_capacity(files.len());

    for path in files {
        let parsed = parse_csv_file(&path, &read_options)?;
        file_reports.push(FileReport {
            path,
            rows: parsed.dataset.len(),
            skipped_rows: parsed.skipped_rows,
        });
        datasets.push(parsed.dataset);
    }

    let combined = stack_datasets(datasets, job.column_alignment);
    if combined.width() == 0 && combined.len() > 0 {
        return Err(CombineError::Config(format!(
            "job '{}': input files share no columns, nothing to write for {} rows",
            job.name,
            combined.len()
        )));
    }
    write_dataset(&output_path, &combined, &write_options)?;

    log::info!(
        "[{}] Wrote {} rows x {} columns to {}",
        job.name,
        combined.len(),
        combined.width(),
        output_path.display()
    );

    Ok(CombineReport {
        job: job.name.clone(),
        directory: directory.to_path_buf(),
        output: output_path,
        files: file_reports,
        total_rows: combined.len(),
        columns: combined.width(),
    })
}

/// 没有输入文件时可确定的列名：仅当所有选择器都是列名时才能得到
fn header_only_columns(selectors: Option<&[ColumnSelector]>) -> Vec<String> {
    selectors
        .and_then(|selectors| {
            selectors
                .iter()
                .map(|s| match s {
                    ColumnSelector::Name(name) => Some(name.clone()),
                    ColumnSelector::Index(_) => None,
                })
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or_default()
}
