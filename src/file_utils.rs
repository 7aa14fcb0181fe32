use std::fs;
use std::path::{Path, PathBuf};
use glob::{MatchOptions, Pattern};
use walkdir::{DirEntry, WalkDir};

use crate::models::CombineError;

/// 文件名匹配选项：区分大小写，`*` 不匹配以点开头的隐藏文件
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// 列出目录（不递归）中文件名匹配 pattern 的所有文件，按文件名排序
///
/// `exclude` 用于排除输出文件本身，避免重复运行时把上次的结果也合并进来
pub fn find_matching_files(dir: &Path, pattern: &str, exclude: Option<&Path>) -> Result<Vec<PathBuf>, CombineError> {
    let path_error = |reason: String| CombineError::Path { path: dir.to_path_buf(), reason };

    // 检查目录是否存在
    if !dir.exists() {
        return Err(path_error("directory does not exist".to_string()));
    }

    if !dir.is_dir() {
        return Err(path_error("not a directory".to_string()));
    }

    fs::read_dir(dir).map_err(|e| path_error(e.to_string()))?;

    let pattern = Pattern::new(pattern)
        .map_err(|e| CombineError::Config(format!("invalid pattern '{}': {}", pattern, e)))?;

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| is_matching_file(entry, &pattern))
        .map(|entry| entry.into_path())
        .filter(|path| exclude.is_none_or(|excluded| path != excluded))
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}

/// 检查条目是否为普通文件且文件名匹配
fn is_matching_file(entry: &DirEntry, pattern: &Pattern) -> bool {
    entry.file_type().is_file()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.matches_with(name, MATCH_OPTIONS))
}
