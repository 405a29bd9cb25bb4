//! The narrow surface through which an external decompiler engine is driven.
//!
//! The engine pulls class bytes from a [`BytecodeProvider`], pushes results
//! into a [`ResultSink`] and reports progress to an [`EngineLogger`]. It is
//! configured with an [`EngineOptions`] set.

use crate::error::DecompileError;

pub trait BytecodeProvider {
    /// Returns the unmodified content of `external_path`. `internal_path` names
    /// the archive entry when the unit lives inside a jar.
    fn get_bytecode(
        &self,
        external_path: &str,
        internal_path: Option<&str>,
    ) -> Result<Vec<u8>, DecompileError>;
}

/// Receives decompiled units. The container callbacks mirror an engine that can
/// also write folders and archives; in-memory sinks ignore them.
pub trait ResultSink {
    fn save_class_file(
        &mut self,
        path: &str,
        qualified_name: &str,
        entry_name: &str,
        content: &str,
        mapping: Option<&[u32]>,
    );

    fn save_folder(&mut self, path: &str);

    fn copy_file(&mut self, source: &str, dest_path: &str, dest_file_name: &str);

    fn create_archive(&mut self, path: &str, archive_name: &str);

    fn save_dir_entry(&mut self, path: &str, archive_name: &str, entry_name: &str);

    fn save_class_entry(
        &mut self,
        path: &str,
        archive_name: &str,
        qualified_name: &str,
        entry_name: &str,
        content: &str,
    );

    fn copy_entry(&mut self, source: &str, dest_path: &str, archive_name: &str, entry: &str);

    fn close_archive(&mut self, path: &str, archive_name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Info,
    Warn,
    Error,
}

pub trait EngineLogger: Send + Sync {
    fn write_message(&self, message: &str, severity: Severity);

    /// Turns an engine failure into the error the engine must propagate.
    fn write_error(&self, message: &str, cause: DecompileError) -> DecompileError;

    fn start_class(&self, _class_name: &str) {}

    fn end_class(&self) {}

    fn start_write_class(&self, _class_name: &str) {}

    fn end_write_class(&self) {}

    fn start_method(&self, _method: &str) {}

    fn end_method(&self) {}
}

pub trait DecompilerEngine: Send + Sync {
    /// Decompiles every unit in `paths` in one context, blocking until done.
    fn decompile_context(
        &self,
        provider: &dyn BytecodeProvider,
        sink: &mut dyn ResultSink,
        options: &EngineOptions,
        logger: &dyn EngineLogger,
        paths: &[String],
    ) -> Result<(), DecompileError>;
}

pub const DEFAULT_INDENT_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub hide_default_constructor: bool,
    pub decompile_generic_signatures: bool,
    pub remove_synthetic: bool,
    pub remove_bridge_methods: bool,
    pub literals_as_written: bool,
    pub unix_line_separator: bool,
    pub bytecode_source_mapping: bool,
    pub indent: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::with_indent_size(DEFAULT_INDENT_SIZE)
    }
}

impl EngineOptions {
    pub fn with_indent_size(size: usize) -> Self {
        Self {
            hide_default_constructor: false,
            decompile_generic_signatures: true,
            remove_synthetic: true,
            remove_bridge_methods: true,
            literals_as_written: true,
            unix_line_separator: true,
            bytecode_source_mapping: true,
            indent: " ".repeat(size),
        }
    }

    /// Fernflower preference keys and values, in a stable order.
    pub fn preferences(&self) -> Vec<(&'static str, String)> {
        let flag = |on: bool| if on { "1" } else { "0" }.to_string();
        vec![
            ("hdc", flag(self.hide_default_constructor)),
            ("dgs", flag(self.decompile_generic_signatures)),
            ("rsy", flag(self.remove_synthetic)),
            ("rbr", flag(self.remove_bridge_methods)),
            ("lit", flag(self.literals_as_written)),
            ("nls", flag(self.unix_line_separator)),
            ("bsm", flag(self.bytecode_source_mapping)),
            ("ind", self.indent.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_the_fixed_set() {
        let prefs = EngineOptions::default().preferences();
        let rendered: Vec<String> = prefs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        assert_eq!(
            rendered,
            vec![
                "hdc=0", "dgs=1", "rsy=1", "rbr=1", "lit=1", "nls=1", "bsm=1", "ind=    ",
            ]
        );
    }

    #[test]
    fn indent_follows_requested_size() {
        assert_eq!(EngineOptions::with_indent_size(2).indent, "  ");
        assert_eq!(EngineOptions::with_indent_size(0).indent, "");
    }
}
