use crate::engine::ResultSink;
use crate::mapping::LineMapping;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedUnit {
    pub qualified_name: String,
    pub content: String,
    pub mapping: Option<LineMapping>,
}

/// Request-scoped sink that keeps the first non-empty class body it is given.
///
/// Sibling classes are decompiled only so the engine can resolve references to
/// them; their own output is dropped.
#[derive(Debug, Default)]
pub struct ResultCollector {
    slot: Option<CollectedUnit>,
    ignored: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&CollectedUnit> {
        self.slot.as_ref()
    }

    pub fn into_result(self) -> Option<CollectedUnit> {
        self.slot
    }

    /// Number of reported units that lost to the first one.
    pub fn ignored(&self) -> usize {
        self.ignored
    }
}

impl ResultSink for ResultCollector {
    fn save_class_file(
        &mut self,
        _path: &str,
        qualified_name: &str,
        _entry_name: &str,
        content: &str,
        mapping: Option<&[u32]>,
    ) {
        if self.slot.is_some() || content.is_empty() {
            self.ignored += 1;
            return;
        }
        self.slot = Some(CollectedUnit {
            qualified_name: qualified_name.to_string(),
            content: content.to_string(),
            mapping: mapping.map(LineMapping::from_flat),
        });
    }

    fn save_folder(&mut self, _path: &str) {}

    fn copy_file(&mut self, _source: &str, _dest_path: &str, _dest_file_name: &str) {}

    fn create_archive(&mut self, _path: &str, _archive_name: &str) {}

    fn save_dir_entry(&mut self, _path: &str, _archive_name: &str, _entry_name: &str) {}

    fn save_class_entry(
        &mut self,
        _path: &str,
        _archive_name: &str,
        _qualified_name: &str,
        _entry_name: &str,
        _content: &str,
    ) {
    }

    fn copy_entry(&mut self, _source: &str, _dest_path: &str, _archive_name: &str, _entry: &str) {}

    fn close_archive(&mut self, _path: &str, _archive_name: &str) {}
}
