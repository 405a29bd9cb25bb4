use crate::inspect::{
    ACC_ABSTRACT, ACC_ANNOTATION, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_MODULE, ACC_PUBLIC,
    ACC_SYNTHETIC, ClassHeader, parse_class_header,
};
use crate::source::ClassLocation;

/// Renders a class file that was not decompiled.
pub trait FallbackRenderer: Send + Sync {
    /// `bytes` is empty when the file itself could not be read. Must not return an empty string.
    fn render(&self, location: &ClassLocation, bytes: &[u8]) -> String;
}

/// Declaration-only view built from the class header.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRenderer;

impl FallbackRenderer for StubRenderer {
    fn render(&self, location: &ClassLocation, bytes: &[u8]) -> String {
        match parse_class_header(bytes) {
            Ok(header) => render_stub(&header),
            Err(e) => format!("// {location}: class file could not be read ({e})\n"),
        }
    }
}

pub fn render_stub(header: &ClassHeader) -> String {
    let mut out = String::new();

    match header.java_release() {
        Some(release) => out.push_str(&format!(
            "// class version {}.{} (Java {release})\n",
            header.major_version, header.minor_version
        )),
        None => out.push_str(&format!(
            "// class version {}.{}\n",
            header.major_version, header.minor_version
        )),
    }
    if let Some(source) = header.source_file.as_deref() {
        out.push_str(&format!("// compiled from: {source}\n"));
    }
    out.push('\n');

    if let Some(package) = header.package() {
        out.push_str(&format!("package {package};\n\n"));
    }

    if header.has_flag(ACC_MODULE) {
        out.push_str(&format!("module {} {{\n}}\n", header.simple_name()));
        return out;
    }

    let mut modifiers = Vec::new();
    if header.has_flag(ACC_SYNTHETIC) {
        modifiers.push("/* synthetic */");
    }
    if header.has_flag(ACC_PUBLIC) {
        modifiers.push("public");
    }

    let kind = if header.has_flag(ACC_ANNOTATION) {
        "@interface"
    } else if header.has_flag(ACC_INTERFACE) {
        "interface"
    } else if header.has_flag(ACC_ENUM) {
        "enum"
    } else {
        if header.has_flag(ACC_ABSTRACT) {
            modifiers.push("abstract");
        }
        if header.has_flag(ACC_FINAL) {
            modifiers.push("final");
        }
        "class"
    };

    let mut declaration = modifiers.join(" ");
    if !declaration.is_empty() {
        declaration.push(' ');
    }
    declaration.push_str(kind);
    declaration.push(' ');
    declaration.push_str(&header.simple_name().replace('$', "."));

    let interfaces: Vec<String> = header.interfaces.iter().map(|i| java_name(i)).collect();
    if kind == "class" {
        if let Some(super_class) = header
            .super_class
            .as_deref()
            .filter(|s| *s != "java/lang/Object")
        {
            declaration.push_str(&format!(" extends {}", java_name(super_class)));
        }
        if !interfaces.is_empty() {
            declaration.push_str(&format!(" implements {}", interfaces.join(", ")));
        }
    } else if kind == "interface" && !interfaces.is_empty() {
        declaration.push_str(&format!(" extends {}", interfaces.join(", ")));
    }

    out.push_str(&declaration);
    out.push_str(" {\n    // bytecode not decompiled\n}\n");
    out
}

fn java_name(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}
