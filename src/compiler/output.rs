use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use miette::{Diagnostic, Report};
use thiserror::Error;

use crate::import_export::export::ExportTable;
use crate::import_export::LoadError;

/// Renders a module's exports as the contents of its `.js` file
pub trait JsFormatter {
    fn format(&self, exports: &ExportTable, relative_path: &str) -> String;
}

/// Renders a module's rewritten stylesheet as the contents of its output `.css` file
pub trait CssFormatter {
    fn format(&self, css: &str, relative_path: &str) -> String;
}

/// Maps the relative path of a stylesheet to the relative path of its `.js` file
pub trait OutputPathNamer {
    fn js_path(&self, relative_path: &str) -> String;
}

/// Build lifecycle callbacks.
///
/// Every build calls `on_build_start`, then `on_process_file` once per compiled file, then
/// exactly one of `on_build_success` and `on_build_error`, then `on_build_end`.
pub trait BuildListener {
    fn on_build_start(&self) {}
    /// `path` is the absolute, `/`-separated path of the file
    fn on_process_file(&self, _path: &Utf8Path) {}
    fn on_build_success(&self) {}
    fn on_build_error(&self, _error: &BuildError) {}
    fn on_build_end(&self) {}
}

/// `export default <exports as 2-space indented JSON>;`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJsFormatter;

/// Logs the lifecycle at `info` and `error` level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("{0}")]
    #[diagnostic(code(css_module_linker::load))]
    Load(#[from] LoadError),
    #[error("When {action}: {source}")]
    #[diagnostic(code(css_module_linker::io))]
    Io { action: String, #[source] source: std::io::Error },
    #[error("When traversing {path}: {source}")]
    #[diagnostic(code(css_module_linker::walk))]
    WalkDir { path: Utf8PathBuf, #[source] source: walkdir::Error },
    #[error("Path must be valid UTF-8, sorry: {}", .path.display())]
    #[diagnostic(code(css_module_linker::path))]
    NonUtf8Path { path: PathBuf },
}

impl<F: Fn(&ExportTable, &str) -> String> JsFormatter for F {
    fn format(&self, exports: &ExportTable, relative_path: &str) -> String {
        self(exports, relative_path)
    }
}

impl<F: Fn(&str, &str) -> String> CssFormatter for F {
    fn format(&self, css: &str, relative_path: &str) -> String {
        self(css, relative_path)
    }
}

impl<F: Fn(&str) -> String> OutputPathNamer for F {
    fn js_path(&self, relative_path: &str) -> String {
        self(relative_path)
    }
}

impl JsFormatter for DefaultJsFormatter {
    fn format(&self, exports: &ExportTable, _relative_path: &str) -> String {
        let json = serde_json::to_string_pretty(exports)
            .expect("a map of strings always serializes");
        format!("export default {};", json)
    }
}

impl BuildListener for LogListener {
    fn on_build_start(&self) {
        log::info!("Build started");
    }

    fn on_process_file(&self, path: &Utf8Path) {
        log::debug!("Processing {}", path);
    }

    fn on_build_success(&self) {
        log::info!("Build succeeded");
    }

    fn on_build_error(&self, error: &BuildError) {
        log::error!("Build failed: {}", error);
    }
}

/// `/* styles for <relative path> */` above the css
pub fn default_css(css: &str, relative_path: &str) -> String {
    format!("/* styles for {} */\n{}", relative_path, css)
}

/// `dir/file.<extension>` → `dir/file.js`. Paths without the extension get `.js` appended
pub fn default_js_path(relative_path: &str, extension: &str) -> String {
    let stem = relative_path.strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(relative_path);
    format!("{}.js", stem)
}

impl BuildError {
    pub(crate) fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io { action: action.into(), source }
    }

    /// A report which shows the offending source for parse errors
    pub fn into_report(self) -> Report {
        match self {
            BuildError::Load(LoadError::Parse { path, source }) => {
                Report::new(source).wrap_err(format!("could not parse {}", path))
            }
            other => Report::new(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::import_export::export::ExportTable;
    use super::{default_css, default_js_path, DefaultJsFormatter, JsFormatter};

    #[test]
    fn default_outputs() {
        let exports = ExportTable::from([
            ("abc".to_string(), "_foo__abc".to_string()),
            ("--x".to_string(), "\"quoted\"".to_string()),
        ]);
        assert_eq!(
            DefaultJsFormatter.format(&exports, "foo.css"),
            "export default {\n  \"abc\": \"_foo__abc\",\n  \"--x\": \"\\\"quoted\\\"\"\n};"
        );
        assert_eq!(DefaultJsFormatter.format(&ExportTable::new(), "foo.css"), "export default {};");
        assert_eq!(default_css(".a {}", "dir/foo.css"), "/* styles for dir/foo.css */\n.a {}");
    }

    #[test]
    fn js_paths() {
        assert_eq!(default_js_path("dir/file.css", "css"), "dir/file.js");
        assert_eq!(default_js_path("entry.foo.bar", "foo.bar"), "entry.js");
        assert_eq!(default_js_path("file.scss", "css"), "file.scss.js");
    }
}
