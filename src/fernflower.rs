//! Drives the Fernflower console decompiler as an external `java` process.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::engine::{BytecodeProvider, DecompilerEngine, EngineLogger, EngineOptions, ResultSink, Severity};
use crate::error::DecompileError;
use crate::inspect::parse_class_header;

/// Makes the console decompiler append its line table to every produced file.
const UNIT_TEST_MODE: &str = "__unit_test_mode__";
const LINES_MAPPING_HEADER: &str = "Lines mapping:";
const NOT_MAPPED_HEADER: &str = "Not mapped:";

fn java_command(java_bin: &str, args: &[String]) -> std::io::Result<Output> {
    #[cfg(windows)]
    {
        let lower = java_bin.to_ascii_lowercase();
        if lower.ends_with(".cmd") || lower.ends_with(".bat") {
            return Command::new("cmd").arg("/C").arg(java_bin).args(args).output();
        }
    }

    Command::new(java_bin).args(args).output()
}

/// Splits a console log line such as `INFO:  Decompiling class Foo` into severity and message.
pub fn parse_log_line(line: &str) -> (Severity, &str) {
    let trimmed = line.trim_start();
    let prefixes = [
        ("TRACE:", Severity::Trace),
        ("INFO:", Severity::Info),
        ("WARN:", Severity::Warn),
        ("ERROR:", Severity::Error),
    ];
    for (prefix, severity) in prefixes {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (severity, rest.trim());
        }
    }
    (Severity::Info, line.trim())
}

#[derive(Debug, Clone)]
pub struct FernflowerProcess {
    engine_jar: PathBuf,
    java: String,
}

impl FernflowerProcess {
    pub fn new(engine_jar: PathBuf, java: impl Into<String>) -> Self {
        Self {
            engine_jar,
            java: java.into(),
        }
    }

    fn arguments(&self, options: &EngineOptions, inputs: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = vec!["-jar".to_string(), self.engine_jar.to_string_lossy().to_string()];
        args.extend(
            options
                .preferences()
                .into_iter()
                .map(|(key, value)| format!("-{key}={value}")),
        );
        if options.bytecode_source_mapping {
            args.push(format!("-{UNIT_TEST_MODE}=1"));
        }
        args.extend(inputs.iter().map(|p| p.to_string_lossy().to_string()));
        args.push(output.to_string_lossy().to_string());
        args
    }
}

/// Splits the trailing `Lines mapping:` block off a produced source file.
///
/// Returns the source without the block and the flat
/// `[bytecode, source, ...]` table, or `None` when no block was written.
/// Rows under `Not mapped:` have no source line and are dropped.
pub fn split_line_mapping(content: &str) -> (String, Option<Vec<u32>>) {
    let Some(start) = content
        .match_indices(LINES_MAPPING_HEADER)
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || content[..i].ends_with('\n'))
        .last()
    else {
        return (content.to_string(), None);
    };

    let mut table = Vec::new();
    for row in content[start + LINES_MAPPING_HEADER.len()..].lines() {
        let row = row.trim();
        if row == NOT_MAPPED_HEADER {
            break;
        }
        if let Some((bytecode, source)) = row.split_once("<->")
            && let (Ok(bytecode), Ok(source)) = (bytecode.trim().parse::<u32>(), source.trim().parse::<u32>())
        {
            table.extend([bytecode, source]);
        }
    }

    let mut body = content[..start].trim_end().to_string();
    body.push('\n');
    (body, Some(table))
}

impl DecompilerEngine for FernflowerProcess {
    fn decompile_context(
        &self,
        provider: &dyn BytecodeProvider,
        sink: &mut dyn ResultSink,
        options: &EngineOptions,
        logger: &dyn EngineLogger,
        paths: &[String],
    ) -> Result<(), DecompileError> {
        let scratch = tempfile::Builder::new().prefix("classview-").tempdir()?;
        let input_dir = scratch.path().join("in");
        let output_dir = scratch.path().join("out");
        std::fs::create_dir_all(&input_dir)?;
        std::fs::create_dir_all(&output_dir)?;

        // (file stem, internal class name) per unit, primary first.
        let mut classes = Vec::with_capacity(paths.len());
        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let file_name = path.rsplit(['/', '!']).next().unwrap_or(path);
            let internal = path.split_once("!/").map(|(_, entry)| entry);
            let bytes = provider.get_bytecode(path, internal)?;

            let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
            let class_name = parse_class_header(&bytes)
                .map(|h| h.this_class)
                .unwrap_or_else(|_| stem.to_string());
            classes.push((stem.to_string(), class_name));

            let target = input_dir.join(file_name);
            std::fs::write(&target, &bytes)?;
            inputs.push(target);
        }

        if let Some((_, primary)) = classes.first() {
            logger.start_class(primary);
        }
        let args = self.arguments(options, &inputs, &output_dir);
        let output = java_command(&self.java, &args).map_err(|e| {
            logger.write_error(
                "Failed to execute java (ensure a JRE/JDK is installed)",
                e.into(),
            )
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (severity, message) = parse_log_line(line);
            logger.write_message(message, severity);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(logger.write_error(
                &format!("Fernflower exited with {}", output.status),
                DecompileError::engine(stderr.trim()),
            ));
        }
        logger.end_class();

        for source in produced_sources(&output_dir, classes.first().map(|(stem, _)| stem.as_str()))? {
            let content = std::fs::read_to_string(&source)?;
            let entry_name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = entry_name.trim_end_matches(".java");
            let qualified_name = classes
                .iter()
                .find(|(s, _)| s == stem)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| stem.to_string());

            let (body, table) = split_line_mapping(&content);

            logger.start_write_class(&qualified_name);
            sink.save_class_file(
                &source.to_string_lossy(),
                &qualified_name,
                &entry_name,
                &body,
                table.as_deref(),
            );
            logger.end_write_class();
        }

        Ok(())
    }
}

/// `.java` files under `dir`, the primary's file first and the rest by name.
fn produced_sources(dir: &Path, primary_stem: Option<&str>) -> Result<Vec<PathBuf>, DecompileError> {
    let mut sources = Vec::new();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    for entry in walker {
        let entry = entry.map_err(DecompileError::engine)?;
        let path = entry.path();
        if entry.file_type().is_some_and(|t| t.is_file())
            && path.extension().is_some_and(|e| e == "java")
        {
            sources.push(path.to_path_buf());
        }
    }

    if let Some(stem) = primary_stem
        && let Some(pos) = sources
            .iter()
            .position(|p| p.file_stem().is_some_and(|s| s == stem))
    {
        let primary = sources.remove(pos);
        sources.insert(0, primary);
    }
    Ok(sources)
}
