//! Target-sources classifier (spec.md §4.6).
//!
//! Sorts a target's filesystem tree into four disjoint buckets — `sources`,
//! `resources`, `headers`, `others` — under tools-version-gated rules for
//! excludes, directory-with-extension bundles and `.lproj` localization.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ResolverError, ResolverResult};

const SOURCE_EXTENSIONS: &[&str] = &["swift", "c", "m", "mm", "cc", "cpp", "cxx"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp"];
/// Directory-with-extension bundles recognized as opaque single-file
/// resources at tv < 5.6 (SwiftPM calls this set "known content types").
const KNOWN_CONTENT_EXTENSIONS: &[&str] =
    &["xcassets", "scnassets", "xcdatamodeld", "docc", "bundle", "framework", "xib", "storyboard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolsVersion {
    pub major: u32,
    pub minor: u32,
}

impl ToolsVersion {
    pub const fn new(major: u32, minor: u32) -> ToolsVersion {
        ToolsVersion { major, minor }
    }
}

impl fmt::Display for ToolsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub const TV_5_3: ToolsVersion = ToolsVersion::new(5, 3);
pub const TV_5_6: ToolsVersion = ToolsVersion::new(5, 6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRule {
    Process,
    Copy,
    EmbedInCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Localization {
    Default,
    Explicit(String),
}

#[derive(Debug, Clone)]
pub struct ResourceDecl {
    pub rule: ResourceRule,
    /// Path relative to the target root.
    pub path: String,
    pub localization: Option<Localization>,
}

#[derive(Debug, Clone)]
pub struct TargetDescription {
    pub name: String,
    pub root: String,
    pub excludes: Vec<String>,
    pub resources: Vec<ResourceDecl>,
    pub public_headers_path: Option<String>,
    pub tools_version: ToolsVersion,
    pub is_remote: bool,
}

/// Read-only view over a target's filesystem tree. `children` must return
/// immediate children as full paths, sorted or not — the classifier sorts
/// its own output.
pub trait FileSystemView {
    fn is_directory(&self, path: &str) -> bool;
    fn children(&self, path: &str) -> Vec<String>;
    fn exists(&self, path: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub sources: Vec<String>,
    pub resources: Vec<String>,
    pub headers: Vec<String>,
    pub others: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warning(String),
    Info(String),
}

/// Produces the flattened content listing used both as the classifier's
/// basis for bucketing and as the directory-with-extension / lproj
/// enumeration contract tested directly (spec.md S5).
pub fn enumerate_contents(
    target: &TargetDescription,
    fs: &dyn FileSystemView,
) -> Vec<String> {
    let excludes = resolve_excludes(target, fs).0;
    let mut out = Vec::new();
    walk_opaque(&target.root, fs, target.tools_version, &excludes, true, &mut out);
    out.sort();
    out
}

fn walk_opaque(
    path: &str,
    fs: &dyn FileSystemView,
    tv: ToolsVersion,
    excludes: &[String],
    is_root: bool,
    out: &mut Vec<String>,
) {
    if excludes.iter().any(|e| e == path) {
        return;
    }
    if !fs.is_directory(path) {
        out.push(path.to_string());
        return;
    }
    let name = basename(path);
    if !is_root && is_lproj(name) {
        if tv >= TV_5_3 {
            for child in fs.children(path) {
                if fs.is_directory(&child) {
                    // Forbidden: caught again in `classify`; enumeration
                    // still reports the file-level entries it can see.
                    continue;
                }
                out.push(child);
            }
        } else {
            for child in fs.children(path) {
                walk_opaque(&child, fs, tv, excludes, false, out);
            }
        }
        return;
    }
    if !is_root && has_extension(name) {
        if tv >= TV_5_3 {
            out.push(path.to_string());
            return;
        }
    }
    for child in fs.children(path) {
        walk_opaque(&child, fs, tv, excludes, false, out);
    }
}

/// Recursively lists every file under `path`, ignoring the opaque-bundle
/// and lproj rules — used to expand an explicit resource declaration to
/// its concrete files regardless of how the bundle would otherwise be
/// enumerated.
fn list_all_files(path: &str, fs: &dyn FileSystemView, out: &mut Vec<String>) {
    if fs.is_directory(path) {
        for child in fs.children(path) {
            list_all_files(&child, fs, out);
        }
    } else {
        out.push(path.to_string());
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(&name[dot + 1..])
}

fn has_extension(name: &str) -> bool {
    extension(name).map_or(false, |e| !e.is_empty())
}

fn is_lproj(name: &str) -> bool {
    name.to_lowercase().ends_with(".lproj")
}

fn lproj_lang(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    lower.strip_suffix(".lproj").map(str::to_string)
}

/// Finds the nearest ancestor `.lproj` directory in `path`'s components,
/// if any, returning its lowercased language tag.
fn enclosing_lproj(path: &str, root: &str) -> Option<String> {
    let rest = path.strip_prefix(root).unwrap_or(path).trim_start_matches('/');
    for component in rest.split('/') {
        if is_lproj(component) {
            return lproj_lang(component);
        }
    }
    None
}

fn resolve_excludes(target: &TargetDescription, fs: &dyn FileSystemView) -> (Vec<String>, Vec<Diagnostic>) {
    let mut resolved = Vec::new();
    let mut diagnostics = Vec::new();
    for exclude in &target.excludes {
        let path = format!("{}/{}", target.root.trim_end_matches('/'), exclude.trim_start_matches('/'));
        let outside_root = !path.starts_with(&target.root);
        if outside_root || !fs.exists(&path) {
            if !target.is_remote {
                diagnostics.push(Diagnostic::Warning(format!(
                    "exclude '{exclude}' in target '{}' does not resolve to a path inside the target",
                    target.name
                )));
            }
            continue;
        }
        resolved.push(path);
    }
    (resolved, diagnostics)
}

/// Classifies a target's filesystem tree into sources/resources/headers/
/// others, returning non-fatal diagnostics alongside a fatal
/// [`ResolverError::ClassifierConflict`] for hard conflicts.
pub fn classify(
    target: &TargetDescription,
    fs: &dyn FileSystemView,
) -> ResolverResult<(Classification, Vec<Diagnostic>)> {
    let (excludes, mut diagnostics) = resolve_excludes(target, fs);

    for decl in &target.resources {
        let path = format!("{}/{}", target.root.trim_end_matches('/'), decl.path.trim_start_matches('/'));
        if basename(&path).eq_ignore_ascii_case("Info.plist") {
            return Err(ResolverError::ClassifierConflict {
                message: format!("'Info.plist' may not appear at the top of a resource tree in target '{}'", target.name),
                paths: vec![path.clone()],
            });
        }
        if let Some(lang) = enclosing_lproj(&path, &target.root) {
            if matches!(decl.localization, Some(Localization::Explicit(_))) {
                return Err(ResolverError::ClassifierConflict {
                    message: format!(
                        "resource '{}' in target '{}' has an explicit localization but lies inside '{lang}.lproj'",
                        decl.path, target.name
                    ),
                    paths: vec![path.clone()],
                });
            }
        }
        if fs.is_directory(&path) {
            for child in fs.children(&path) {
                if is_lproj(basename(&child)) {
                    for grandchild in fs.children(&child) {
                        if fs.is_directory(&grandchild) {
                            return Err(ResolverError::ClassifierConflict {
                                message: format!(
                                    "'{}' contains a subdirectory inside a localization directory, which is forbidden",
                                    child
                                ),
                                paths: vec![grandchild.clone()],
                            });
                        }
                    }
                }
            }
        }
    }

    // (output_basename, lang) -> full paths that produced it.
    let mut by_output: BTreeMap<(String, Option<String>), Vec<String>> = BTreeMap::new();
    let mut resource_files = Vec::new();

    for decl in &target.resources {
        let path = format!("{}/{}", target.root.trim_end_matches('/'), decl.path.trim_start_matches('/'));
        let mut files = Vec::new();
        list_all_files(&path, fs, &mut files);
        for file in files {
            let lang = enclosing_lproj(&file, &target.root).or_else(|| {
                matches!(decl.localization, Some(Localization::Default)).then(|| "default".to_string())
            });
            let output_name = basename(&file).to_string();
            by_output.entry((output_name, lang)).or_default().push(file.clone());
            resource_files.push(file);
        }
    }

    for ((name, _lang), paths) in &by_output {
        if paths.len() > 1 {
            return Err(ResolverError::ClassifierConflict {
                message: format!("multiple resources named '{name}' in target '{}'", target.name),
                paths: paths.clone(),
            });
        }
    }

    let basenames_with_lang: BTreeMap<&str, Vec<&Option<String>>> = {
        let mut m: BTreeMap<&str, Vec<&Option<String>>> = BTreeMap::new();
        for (name, lang) in by_output.keys() {
            m.entry(name.as_str()).or_default().push(lang);
        }
        m
    };
    for (name, langs) in &basenames_with_lang {
        let has_localized = langs.iter().any(|l| l.is_some());
        let has_unlocalized = langs.iter().any(|l| l.is_none());
        if has_localized && has_unlocalized {
            diagnostics.push(Diagnostic::Warning(format!(
                "'{name}' appears both localized and un-localized in target '{}'",
                target.name
            )));
        }
        // A resource under a real `<lang>.lproj` ought to have a sibling
        // supplied by a `localization: .default` declaration; its absence
        // means there is no fallback for languages the target doesn't
        // localize into.
        let has_real_lproj = langs.iter().any(|l| matches!(l, Some(lang) if lang != "default"));
        let has_default = langs.iter().any(|l| matches!(l, Some(lang) if lang == "default"));
        if has_real_lproj && !has_default {
            diagnostics.push(Diagnostic::Warning(format!(
                "'{name}' is localized but has no sibling supplied for the default language in target '{}'",
                target.name
            )));
        }
    }

    let mut headers = Vec::new();
    if let Some(headers_path) = &target.public_headers_path {
        let path = format!("{}/{}", target.root.trim_end_matches('/'), headers_path.trim_start_matches('/'));
        let mut files = Vec::new();
        list_all_files(&path, fs, &mut files);
        for file in files {
            if excludes.contains(&file) || resource_files.contains(&file) {
                continue;
            }
            if extension(basename(&file)).map_or(false, |e| HEADER_EXTENSIONS.contains(&e)) {
                headers.push(file);
            }
        }
    }

    let mut sources = Vec::new();
    let mut others = Vec::new();
    let mut implicit_resources = Vec::new();
    let contents = enumerate_contents(target, fs);
    for entry in contents {
        if resource_files.contains(&entry) || headers.contains(&entry) {
            continue;
        }
        let name = basename(&entry);
        if fs.is_directory(&entry) {
            // An opaque directory-with-extension bundle not claimed as an
            // explicit resource: tv >= 5.6 always treats it as content;
            // below that only recognized content extensions do.
            let known = extension(name).map_or(false, |e| KNOWN_CONTENT_EXTENSIONS.contains(&e));
            if known || target.tools_version >= TV_5_6 {
                implicit_resources.push(entry);
            } else {
                others.push(entry);
            }
            continue;
        }
        match extension(name) {
            Some(ext) if SOURCE_EXTENSIONS.contains(&ext) => sources.push(entry),
            _ => others.push(entry),
        }
    }

    sources.sort();
    let mut resources = resource_files;
    resources.extend(implicit_resources);
    resources.sort();
    resources.dedup();
    headers.sort();
    others.sort();

    Ok((Classification { sources, resources, headers, others }, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    #[derive(Default)]
    struct MemoryFs {
        dirs: Map<String, Vec<String>>,
    }

    impl MemoryFs {
        fn new() -> MemoryFs {
            MemoryFs::default()
        }

        fn add_file(&mut self, path: &str) {
            let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            let mut cur = String::new();
            for part in &parts {
                let parent = if cur.is_empty() { "/".to_string() } else { cur.clone() };
                cur = if cur.is_empty() { format!("/{part}") } else { format!("{cur}/{part}") };
                let entry = self.dirs.entry(parent).or_default();
                if !entry.contains(&cur) {
                    entry.push(cur.clone());
                }
            }
            // The leaf itself must not appear as a directory key, or
            // `is_directory` would misclassify files with no children yet.
            self.dirs.entry(cur.clone()).or_default();
            if self.dirs.get(&cur).map_or(false, Vec::is_empty) {
                self.dirs.remove(&cur);
            }
        }
    }

    impl FileSystemView for MemoryFs {
        fn is_directory(&self, path: &str) -> bool {
            self.dirs.contains_key(path)
        }

        fn children(&self, path: &str) -> Vec<String> {
            self.dirs.get(path).cloned().unwrap_or_default()
        }

        fn exists(&self, path: &str) -> bool {
            self.dirs.contains_key(path) || self.dirs.values().any(|c| c.contains(&path.to_string()))
        }
    }

    fn target(root: &str, tv: ToolsVersion) -> TargetDescription {
        TargetDescription {
            name: "Foo".to_string(),
            root: root.to_string(),
            excludes: Vec::new(),
            resources: Vec::new(),
            public_headers_path: None,
            tools_version: tv,
            is_remote: false,
        }
    }

    #[test]
    fn s5_directory_with_extension_at_tv_5_3() {
        let mut fs = MemoryFs::new();
        fs.add_file("/some/hello.swift");
        fs.add_file("/some.thing/hello.txt");
        let t = target("/", TV_5_3);
        let contents = enumerate_contents(&t, &fs);
        assert_eq!(contents, vec!["/some.thing".to_string(), "/some/hello.swift".to_string()]);
    }

    #[test]
    fn s6_conflicting_resources_report_both_paths() {
        let mut fs = MemoryFs::new();
        fs.add_file("/Resources/foo.txt");
        fs.add_file("/Resources/Sub/foo.txt");
        let mut t = target("/", TV_5_3);
        t.resources.push(ResourceDecl {
            rule: ResourceRule::Process,
            path: "Resources".to_string(),
            localization: None,
        });
        let err = classify(&t, &fs).unwrap_err();
        match err {
            ResolverError::ClassifierConflict { message, paths } => {
                assert_eq!(message, "multiple resources named 'foo.txt' in target 'Foo'");
                assert_eq!(paths.len(), 2);
                assert!(paths.contains(&"/Resources/foo.txt".to_string()));
                assert!(paths.contains(&"/Resources/Sub/foo.txt".to_string()));
            }
            other => panic!("expected ClassifierConflict, got {other:?}"),
        }
    }

    #[test]
    fn invalid_local_exclude_warns() {
        let mut fs = MemoryFs::new();
        fs.add_file("/src/main.swift");
        let mut t = target("/", TV_5_3);
        t.excludes.push("nonexistent".to_string());
        let (_, diagnostics) = classify(&t, &fs).unwrap();
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::Warning(m) if m.contains("nonexistent"))));
    }
}
