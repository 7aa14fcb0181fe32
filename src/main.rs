// src/main.rs
mod models;
mod config;
mod file_utils;
mod csv_reader;
mod csv_writer;
mod combine;

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use models::*;
use config::load_config;
use combine::concatenate;
use models::config::check_distinct_outputs;
use models::utils::parse_delimiter;

/// 将实验目录中的同类CSV文件合并为一个CSV文件
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// 配置文件路径（.toml，或 .yaml/.yml），不存在时自动创建
    #[arg(short, long, default_value = "csv_combiner.toml")]
    config: PathBuf,

    /// 只运行指定的任务，可重复
    #[arg(short, long = "job")]
    jobs: Vec<String>,

    /// 覆盖任务目录
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// 不读取配置文件，直接按此文件名模式运行单个任务
    #[arg(short, long, requires = "dir", conflicts_with_all = ["jobs", "list"])]
    pattern: Option<String>,

    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    #[arg(long, value_parser = parse_delimiter)]
    output_delimiter: Option<u8>,

    /// 输出文件名（相对于任务目录）
    #[arg(short, long)]
    output: Option<String>,

    /// 保留的列，逗号分隔的位置或列名，例如 9,10,speed
    #[arg(long, value_delimiter = ',')]
    columns: Vec<ColumnSelector>,

    #[arg(long)]
    no_header: bool,

    /// 跳过字段数过多的行而不是报错
    #[arg(long)]
    skip_malformed: bool,

    #[arg(long, value_enum)]
    index: Option<IndexMode>,

    #[arg(long, value_enum)]
    align: Option<ColumnAlignment>,

    /// 没有匹配文件时只写表头而不是报错
    #[arg(long)]
    allow_empty: bool,

    /// 列出配置中的任务后退出
    #[arg(long)]
    list: bool,

    /// 以JSON格式输出合并报告
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// 把命令行选项覆盖到任务配置上
    fn apply_overrides(&self, job: &mut JobConfig) {
        if let Some(delimiter) = self.delimiter {
            job.delimiter = delimiter;
        }
        if let Some(delimiter) = self.output_delimiter {
            job.output_delimiter = delimiter;
        }
        if let Some(output) = &self.output {
            job.output = output.clone();
        }
        if !self.columns.is_empty() {
            job.columns = Some(self.columns.clone());
        }
        if self.no_header {
            job.header_row = false;
        }
        if self.skip_malformed {
            job.skip_malformed_rows = true;
        }
        if let Some(index) = self.index {
            job.index = index;
        }
        if let Some(align) = self.align {
            job.column_alignment = align;
        }
        if self.allow_empty {
            job.empty_input = EmptyInputPolicy::HeaderOnly;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // 确定要运行的任务及其目录
    let (general, jobs) = match &args.pattern {
        Some(pattern) => (GeneralConfig::default(), vec![JobConfig::new("adhoc", pattern.clone())]),
        None => {
            let config = load_config(&args.config)?;
            log::debug!("Configuration loaded from {}", args.config.display());

            if args.list {
                print_jobs(&config);
                return Ok(());
            }

            let jobs = config
                .select_jobs(&args.jobs)?
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            (config.general, jobs)
        }
    };

    // 命令行覆盖后再确定目录，并检查输出文件不会互相覆盖
    let targets: Vec<(JobConfig, PathBuf)> = jobs
        .into_iter()
        .map(|mut job| {
            args.apply_overrides(&mut job);
            let directory = args.dir.clone().unwrap_or_else(|| job.resolve_directory(&general));
            (job, directory)
        })
        .collect();
    check_distinct_outputs(targets.iter().map(|(job, dir)| (job, dir.clone())))?;

    let mut reports = Vec::with_capacity(targets.len());
    for (job, directory) in &targets {
        let report = concatenate(directory, job).with_context(|| format!("Job '{}' failed", job.name))?;

        if !args.json {
            print_report(&report);
        }
        reports.push(report);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

fn print_jobs(config: &Config) {
    println!("Base directory: {}", config.general.base_dir);
    for job in &config.jobs {
        println!(
            "  {:<12} {:<20} -> {}",
            job.name,
            job.pattern,
            job.resolve_directory(&config.general).join(&job.output).display()
        );
        if let Some(columns) = &job.columns {
            let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
            println!("  {:<12} columns: {}", "", columns.join(", "));
        }
    }
}

fn print_report(report: &CombineReport) {
    println!("[{}] Found {} files in {}", report.job, report.files.len(), report.directory.display());
    for file in &report.files {
        println!("    {} ({} rows)", file.path.display(), file.rows);
    }
    let skipped = report.skipped_rows();
    if skipped > 0 {
        println!("    skipped {} malformed rows", skipped);
    }
    println!(
        "[{}] Wrote {} rows, {} columns to {}",
        report.job,
        report.total_rows,
        report.columns,
        report.output.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adhoc_args() {
        let args = Args::try_parse_from([
            "CsvCombiner",
            "--pattern",
            "*.traces.csv",
            "--dir",
            "experiments_20200418150701",
            "--columns",
            "9,10,speed",
            "--delimiter",
            ";",
            "--index",
            "none",
            "--align",
            "intersection",
            "--skip-malformed",
        ])
        .unwrap();

        let mut job = JobConfig::new("adhoc", args.pattern.clone().unwrap());
        args.apply_overrides(&mut job);

        assert_eq!(
            job.columns,
            Some(vec![
                ColumnSelector::Index(9),
                ColumnSelector::Index(10),
                ColumnSelector::Name("speed".into()),
            ])
        );
        assert_eq!(job.delimiter, b';');
        assert_eq!(job.output_delimiter, b',');
        assert_eq!(job.index, IndexMode::None);
        assert_eq!(job.column_alignment, ColumnAlignment::Intersection);
        assert!(job.skip_malformed_rows);
        assert!(job.header_row);
        assert_eq!(job.empty_input, EmptyInputPolicy::Error);
    }

    #[test]
    fn test_pattern_requires_dir() {
        assert!(Args::try_parse_from(["CsvCombiner", "--pattern", "*.csv"]).is_err());
    }

    #[test]
    fn test_index_value_names() {
        let args = Args::try_parse_from(["CsvCombiner", "--index", "per_file", "-j", "metrics", "-j", "summary"]).unwrap();
        assert_eq!(args.index, Some(IndexMode::PerFile));
        assert_eq!(args.jobs, vec!["metrics", "summary"]);
    }

    #[test]
    fn test_defaults_leave_job_untouched() {
        let args = Args::try_parse_from(["CsvCombiner"]).unwrap();
        let mut job = JobConfig::new("summary", "*.summary.csv");
        args.apply_overrides(&mut job);

        assert_eq!(job.output, "combined.csv");
        assert_eq!(job.columns, None);
        assert_eq!(job.index, IndexMode::PerFile);
        assert_eq!(args.config, PathBuf::from("csv_combiner.toml"));
    }

    #[test]
    fn test_pattern_conflicts_with_config_options() {
        let with_job = Args::try_parse_from(["CsvCombiner", "-p", "*.csv", "-d", ".", "-j", "metrics"]);
        assert!(with_job.is_err());

        let with_list = Args::try_parse_from(["CsvCombiner", "-p", "*.csv", "-d", ".", "--list"]);
        assert!(with_list.is_err());

        assert!(Args::try_parse_from(["CsvCombiner", "-p", "*.csv", "-d", "."]).is_ok());
    }

    #[test]
    fn test_output_override_on_all_jobs_collides() {
        let args = Args::try_parse_from(["CsvCombiner", "--output", "all.csv"]).unwrap();
        let general = GeneralConfig::default();
        let targets: Vec<(JobConfig, PathBuf)> = ["metrics", "summary"]
            .into_iter()
            .map(|name| {
                let mut job = JobConfig::new(name, format!("*.{}.csv", name));
                job.output = format!("combined_{}.csv", name);
                args.apply_overrides(&mut job);
                let directory = job.resolve_directory(&general);
                (job, directory)
            })
            .collect();

        let result = check_distinct_outputs(targets.iter().map(|(job, dir)| (job, dir.clone())));
        assert!(matches!(result, Err(CombineError::Config(_))));
    }
}
