use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::decompiler::{DecompiledText, TextOrigin};
use crate::mapping::LineMapping;

#[derive(Debug, Clone, Serialize)]
pub struct DecompileReport {
    pub target: String,
    pub origin: TextOrigin,
    pub content_hash: String,
    pub content: String,
    pub mapping: Option<LineMapping>,
}

impl DecompileReport {
    pub fn new(target: impl Into<String>, result: DecompiledText) -> Self {
        Self {
            target: target.into(),
            origin: result.origin,
            content_hash: hash_content(&result.text),
            content: result.text,
            mapping: result.mapping,
        }
    }
}

pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Text rendering of several results: a single result is printed as is,
/// several are each preceded by a `// ==== target ====` separator.
pub fn render_text(reports: &[DecompileReport]) -> String {
    if let [single] = reports {
        return single.content.clone();
    }
    let mut out = String::new();
    for report in reports {
        out.push_str(&format!("// ==== {} ====\n", report.target));
        out.push_str(&report.content);
        if !report.content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
