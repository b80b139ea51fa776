use std::fs::{copy, create_dir_all};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use futures::executor::block_on;
use futures::future::join_all;
use walkdir::WalkDir;

use crate::compile::BuildCtx;
use crate::config::Options;
use crate::import_export::module_ref::ModuleRef;
use crate::import_export::LoadedModule;
use crate::misc::{normalize_path, to_posix, IgnoreIoKind};

pub use output::{default_css, default_js_path, BuildError, BuildListener, CssFormatter, DefaultJsFormatter, JsFormatter, LogListener, OutputPathNamer};

mod output;

/// Compiles every stylesheet under an input root into an output root, copying everything else
pub struct Compiler {
    input: Utf8PathBuf,
    output: Utf8PathBuf,
    options: Options,
}

/// What a successful build did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Relative paths of the compiled stylesheets, in walk order
    pub compiled: Vec<String>,
    /// Relative paths of the files copied as-is
    pub copied: Vec<String>,
    /// Distinct modules loaded, including ones only reached through imports
    pub modules_loaded: usize,
}

impl Compiler {
    pub fn new(input: impl Into<Utf8PathBuf>, output: impl Into<Utf8PathBuf>, options: Options) -> Self {
        Self { input: input.into(), output: output.into(), options }
    }

    /// [Compiler::build] on the current thread
    pub fn run(&self) -> Result<BuildOutput, BuildError> {
        block_on(self.build())
    }

    /// Compile everything once. All files run to completion even if one fails, then the first
    /// error in walk order is returned
    pub async fn build(&self) -> Result<BuildOutput, BuildError> {
        let listener = &self.options.listener;
        listener.on_build_start();
        let result = self.build_files().await;
        match &result {
            Ok(_) => listener.on_build_success(),
            Err(error) => listener.on_build_error(error),
        }
        listener.on_build_end();
        result
    }

    async fn build_files(&self) -> Result<BuildOutput, BuildError> {
        let input = absolute(&self.input)?;
        let output_root = absolute(&self.output)?;
        create_dir(&output_root)?;

        // Get paths AND copy other files
        let mut output = BuildOutput::default();
        let mut targets = Vec::new();
        let entries = WalkDir::new(&input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.path() != output_root.as_std_path());
        for entry in entries {
            let entry = entry.map_err(|source| BuildError::WalkDir { path: input.clone(), source })?;
            if entry.file_type().is_dir() {
                continue
            }
            let path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| BuildError::NonUtf8Path { path: entry.path().to_path_buf() })?;
            let relative = to_posix(path.strip_prefix(&input).unwrap_or(path).as_str()).into_owned();
            if is_target(&relative, &self.options.extension) {
                targets.push((normalize_path(path), relative));
            } else {
                copy_file(path, &output_root.join(&relative))?;
                output.copied.push(relative);
            }
        }

        // Compile, sharing one cache between all files
        let ctx = BuildCtx::new(input, self.options.clone());
        let output_root = &output_root;
        let files = targets.iter().map(|(path, relative)| {
            self.options.listener.on_process_file(path);
            let load = ctx.load(ModuleRef::file(path));
            async move {
                let loaded = load.await?;
                self.write_outputs(&loaded, relative, output_root)
            }
        }).collect::<Vec<_>>();
        let results = join_all(files).await;
        output.modules_loaded = ctx.cache.loads_started();
        ctx.cache.clear();
        results.into_iter().collect::<Result<Vec<()>, BuildError>>()?;

        output.compiled = targets.into_iter().map(|(_, relative)| relative).collect();
        Ok(output)
    }

    fn write_outputs(&self, loaded: &LoadedModule, relative: &str, output_root: &Utf8Path) -> Result<(), BuildError> {
        let css = match (&self.options.css_formatter, &self.options.source_maps) {
            (Some(formatter), _) => formatter.format(&loaded.css, relative),
            (None, Some(_)) => loaded.css.clone(),
            (None, None) => default_css(&loaded.css, relative),
        };
        let js = self.options.js_formatter.format(&loaded.exports, relative);
        let js_relative = match &self.options.js_path {
            Some(namer) => namer.js_path(relative),
            None => default_js_path(relative, &self.options.extension),
        };
        let css_path = output_root.join(relative);
        let js_path = output_root.join(js_relative);
        self.write_file(&css_path, &css)?;
        self.write_file(&js_path, &js)?;
        log::info!("Wrote {} and {}", css_path, js_path);
        Ok(())
    }

    fn write_file(&self, path: &Utf8Path, contents: &str) -> Result<(), BuildError> {
        if let Some(dir) = path.parent() {
            create_dir(dir)?;
        }
        std::fs::write(path, self.options.encoding.encode(contents))
            .map_err(|source| BuildError::io(format!("writing {}", path), source))
    }
}

/// Whether the file name ends with `.<extension>`
fn is_target(relative_path: &str, extension: &str) -> bool {
    relative_path.strip_suffix(extension).is_some_and(|rest| rest.ends_with('.'))
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    if path.is_absolute() {
        return Ok(normalize_path(path))
    }
    let cwd = std::env::current_dir()
        .map_err(|source| BuildError::io("getting the current directory", source))?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| BuildError::NonUtf8Path { path })?;
    Ok(normalize_path(&cwd.join(path)))
}

fn create_dir(dir: &Utf8Path) -> Result<(), BuildError> {
    create_dir_all(dir)
        .ignore_kind(io::ErrorKind::AlreadyExists)
        .map_err(|source| BuildError::io(format!("creating output directory ({})", dir), source))
}

fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<(), BuildError> {
    if let Some(dir) = to.parent() {
        create_dir(dir)?;
    }
    copy(from, to).map_err(|source| BuildError::io(format!("copying {} to {}", from, to), source))?;
    log::debug!("Copied {}", to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::rc::Rc;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use camino::{Utf8Path, Utf8PathBuf};
    use tempfile::TempDir;
    use test_log::test;

    use crate::compiler::{BuildError, BuildListener, BuildOutput, Compiler, DefaultJsFormatter, JsFormatter};
    use crate::config::{Encoding, Options};
    use crate::import_export::export::{ExportTable, ImportPath};
    use crate::import_export::import_resolver::{PathResolver, RelativePathResolver};
    use crate::import_export::module_ref::{ModuleRef, OpaqueModule};
    use crate::import_export::LoadError;
    use crate::passes::PassCtx;
    use crate::scoped_name::default_scoped_name;
    use crate::syntax::{Node, Stylesheet};

    struct Fixture {
        _dir: TempDir,
        input: Utf8PathBuf,
        output: Utf8PathBuf,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
            let fixture = Self { input: root.join("in"), output: root.join("out"), _dir: dir };
            fs::create_dir_all(&fixture.input).unwrap();
            for (path, contents) in files {
                fixture.write(path, contents.as_bytes());
            }
            fixture
        }

        fn write(&self, relative: &str, contents: &[u8]) {
            let path = self.input.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        fn build(&self, options: Options) -> Result<BuildOutput, BuildError> {
            Compiler::new(self.input.clone(), self.output.clone(), options).run()
        }

        fn read(&self, relative: &str) -> String {
            fs::read_to_string(self.output.join(relative)).unwrap()
        }
    }

    fn js(exports: &[(&str, &str)]) -> String {
        let exports = exports.iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<ExportTable>();
        DefaultJsFormatter.format(&exports, "")
    }

    fn exports(pairs: &[(&str, &str)]) -> ExportTable {
        pairs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
    }

    /// Records lifecycle callbacks
    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl BuildListener for Recorder {
        fn on_build_start(&self) {
            self.0.borrow_mut().push("start".to_string());
        }

        fn on_process_file(&self, path: &Utf8Path) {
            self.0.borrow_mut().push(format!("process {}", path));
        }

        fn on_build_success(&self) {
            self.0.borrow_mut().push("success".to_string());
        }

        fn on_build_error(&self, _error: &BuildError) {
            self.0.borrow_mut().push("error".to_string());
        }

        fn on_build_end(&self) {
            self.0.borrow_mut().push("end".to_string());
        }
    }

    #[test]
    fn compiles_a_module() {
        let fixture = Fixture::new(&[("foo.css", ".abc {}")]);
        let output = fixture.build(Options::default()).unwrap();
        assert_eq!(output.compiled, vec!["foo.css".to_string()]);
        assert_eq!(fixture.read("foo.css"), "/* styles for foo.css */\n._foo__abc {}");
        assert_eq!(fixture.read("foo.js"), js(&[("abc", "_foo__abc")]));
    }

    #[test]
    fn resolves_virtual_modules() {
        let fixture = Fixture::new(&[("foo.css", "@value --test-color from \"seeds\";\n.abc { color: --test-color; }")]);
        let options = Options::default()
            .with_virtual_module("seeds", exports(&[("--test-color", "orange")]));
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("foo.css"), "/* styles for foo.css */\n._foo__abc { color: orange; }");
        assert_eq!(fixture.read("foo.js"), js(&[("--test-color", "orange"), ("abc", "_foo__abc")]));
    }

    #[test]
    fn lifecycle_on_success() {
        let fixture = Fixture::new(&[("foo.css", ".abc {}"), ("other.txt", "x")]);
        let recorder = Recorder::default();
        fixture.build(Options::default().with_listener(recorder.clone())).unwrap();
        assert_eq!(*recorder.0.borrow(), vec![
            "start".to_string(),
            format!("process {}", fixture.input.join("foo.css")),
            "success".to_string(),
            "end".to_string(),
        ]);
    }

    #[test]
    fn lifecycle_on_error() {
        let fixture = Fixture::new(&[("foo.css", ".abc {")]);
        let recorder = Recorder::default();
        let result = fixture.build(Options::default().with_listener(recorder.clone()));
        assert!(matches!(result, Err(BuildError::Load(LoadError::Parse { .. }))));
        assert_eq!(*recorder.0.borrow(), vec![
            "start".to_string(),
            format!("process {}", fixture.input.join("foo.css")),
            "error".to_string(),
            "end".to_string(),
        ]);
    }

    #[test]
    fn trailing_backslash_is_a_parse_error() {
        let fixture = Fixture::new(&[("foo.css", ".a { color: red }\n.b\\")]);
        let recorder = Recorder::default();
        let result = fixture.build(Options::default().with_listener(recorder.clone()));
        assert!(matches!(result, Err(BuildError::Load(LoadError::Parse { .. }))));
        assert_eq!(*recorder.0.borrow(), vec![
            "start".to_string(),
            format!("process {}", fixture.input.join("foo.css")),
            "error".to_string(),
            "end".to_string(),
        ]);
    }

    #[test]
    fn write_failures_are_fatal() {
        let fixture = Fixture::new(&[("a.css", ".a {}"), ("b.css", ".b {}")]);
        fs::create_dir_all(fixture.output.join("b.css")).unwrap();
        let recorder = Recorder::default();
        let result = fixture.build(Options::default().with_listener(recorder.clone()));
        assert!(matches!(&result, Err(BuildError::Io { action, .. }) if action.contains("b.css")));
        assert_eq!(*recorder.0.borrow(), vec![
            "start".to_string(),
            format!("process {}", fixture.input.join("a.css")),
            format!("process {}", fixture.input.join("b.css")),
            "error".to_string(),
            "end".to_string(),
        ]);
        // Outputs written before the failure stay
        assert_eq!(fixture.read("a.css"), "/* styles for a.css */\n._a__a {}");
        assert_eq!(fixture.read("a.js"), js(&[("a", "_a__a")]));
    }

    #[test]
    fn missing_modules_are_fatal() {
        let fixture = Fixture::new(&[("foo.css", ".abc { composes: def from \"nonexistent\"; }")]);
        let error = fixture.build(Options::default()).unwrap_err();
        assert!(matches!(&error, BuildError::Load(LoadError::CouldNotLoad { path, .. }) if path.ends_with("/nonexistent")));
        assert!(error.to_string().contains("nonexistent"));
    }

    #[test]
    fn missing_modules_go_to_handler() {
        let fixture = Fixture::new(&[("foo.css", ".abc { composes: def from \"nonexistent\"; }")]);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let options = Options::default().with_module_resolution_failure_handler({
            let calls = calls.clone();
            move |failure: &LoadError, path: &str, from: &str| {
                calls.borrow_mut().push((failure.io_kind(), path.to_string(), from.to_string()))
            }
        });
        fixture.build(options).unwrap();
        assert_eq!(*calls.borrow(), vec![(
            Some(std::io::ErrorKind::NotFound),
            "nonexistent".to_string(),
            fixture.input.join("foo.css").to_string()
        )]);
        assert_eq!(fixture.read("foo.css"), "/* styles for foo.css */\n._foo__abc { }");
        assert_eq!(fixture.read("foo.js"), js(&[("abc", "_foo__abc i__imported_def_0")]));
    }

    #[test]
    fn missing_symbols_are_undefined() {
        let fixture = Fixture::new(&[
            ("bar.css", ".foo {}"),
            ("foo.css", ".abc { composes: def from \"bar.css\"; }"),
        ]);
        fixture.build(Options::default()).unwrap();
        assert_eq!(fixture.read("foo.css"), "/* styles for foo.css */\n._foo__abc { }");
        assert_eq!(fixture.read("foo.js"), js(&[("abc", "_foo__abc undefined")]));
        assert_eq!(fixture.read("bar.css"), "/* styles for bar.css */\n._bar__foo {}");
    }

    #[test]
    fn missing_symbols_go_to_handler() {
        let fixture = Fixture::new(&[
            ("bar.css", ".foo {}"),
            ("foo.css", ".abc { composes: def from \"bar.css\"; }"),
        ]);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let options = Options::default().with_symbol_resolution_failure_handler({
            let calls = calls.clone();
            move |symbol: &str, path: &str, from: &str| {
                calls.borrow_mut().push((symbol.to_string(), path.to_string(), from.to_string()))
            }
        });
        fixture.build(options).unwrap();
        assert_eq!(*calls.borrow(), vec![(
            "def".to_string(),
            "bar.css".to_string(),
            fixture.input.join("foo.css").to_string()
        )]);
    }

    #[test]
    fn custom_formatters() {
        let fixture = Fixture::new(&[("foo.css", ".abc {}")]);
        let options = Options::default()
            .with_js_formatter(|exports: &ExportTable, path: &str| {
                assert_eq!(exports, &ExportTable::from([("abc".to_string(), "_foo__abc".to_string())]));
                assert_eq!(path, "foo.css");
                "js content".to_string()
            })
            .with_css_formatter(|css: &str, path: &str| {
                assert_eq!(css, "._foo__abc {}");
                assert_eq!(path, "foo.css");
                "css content".to_string()
            });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("foo.js"), "js content");
        assert_eq!(fixture.read("foo.css"), "css content");
    }

    #[test]
    fn custom_scoped_names() {
        let fixture = Fixture::new(&[("directory/file.css", ".class {}")]);
        let options = Options::default()
            .with_scoped_name(|name: &str, path: &str, rule: &str, _module: &ModuleRef| {
                assert_eq!((name, path, rule), ("class", "directory/file.css", ".class {}"));
                "custom-name".to_string()
            });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("directory/file.css"), "/* styles for directory/file.css */\n.custom-name {}");
        assert_eq!(fixture.read("directory/file.js"), js(&[("class", "custom-name")]));
    }

    #[test]
    fn custom_path_resolver() {
        let fixture = Fixture::new(&[
            ("directoryA/entry.css", "@value test from \"library\";"),
            ("lib/library/index.css", "@value test: blue;"),
        ]);
        let library = fixture.input.join("lib/library/index.css");
        let options = Options::default()
            .with_path_resolver(move |path: &ImportPath, from: &ModuleRef| match path.as_str() {
                "library" => ModuleRef::file(&library),
                _ => RelativePathResolver.resolve(path, from),
            });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("directoryA/entry.css"), "/* styles for directoryA/entry.css */\n");
        assert_eq!(fixture.read("directoryA/entry.js"), js(&[("test", "blue")]));
    }

    #[derive(Debug)]
    struct Handle(Utf8PathBuf);

    impl OpaqueModule for Handle {
        fn key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn opaque_modules_reach_the_generator() {
        let fixture = Fixture::new(&[
            ("foo.css", ".foo { composes: bar from \"bar\"; }"),
            ("lib/bar.module", ".bar {}"),
        ]);
        let bar = fixture.input.join("lib/bar.module");
        let saw_opaque = Rc::new(Cell::new(false));
        let options = Options::default()
            .with_path_resolver(move |_path: &ImportPath, _from: &ModuleRef| ModuleRef::opaque(Handle(bar.clone())))
            .with_scoped_name({
                let saw_opaque = saw_opaque.clone();
                move |name: &str, path: &str, _rule: &str, module: &ModuleRef| {
                    if matches!(module, ModuleRef::Opaque(_)) {
                        saw_opaque.set(true);
                    }
                    default_scoped_name(name, path)
                }
            });
        let output = fixture.build(options).unwrap();
        assert!(saw_opaque.get());
        assert_eq!(output.copied, vec!["lib/bar.module".to_string()]);
        assert_eq!(fixture.read("foo.js"), js(&[("foo", "_foo__foo _lib_bar__bar")]));
    }

    #[test]
    fn nested_rules() {
        let fixture = Fixture::new(&[("entry.css", ".outer { .class { color: blue; } }")]);
        fixture.build(Options::default()).unwrap();
        assert_eq!(fixture.read("entry.css"), "/* styles for entry.css */\n._entry__outer { ._entry__class { color: blue; } }");
        assert_eq!(fixture.read("entry.js"), js(&[("outer", "_entry__outer"), ("class", "_entry__class")]));
    }

    #[test]
    fn custom_extension() {
        let fixture = Fixture::new(&[("entry.foo.bar", ".class {}"), ("plain.css", ".class {}")]);
        let output = fixture.build(Options::default().with_extension("foo.bar")).unwrap();
        assert_eq!(output.compiled, vec!["entry.foo.bar".to_string()]);
        assert_eq!(output.copied, vec!["plain.css".to_string()]);
        assert_eq!(fixture.read("entry.foo.bar"), "/* styles for entry.foo.bar */\n._entry_foo__class {}");
        assert_eq!(fixture.read("entry.js"), js(&[("class", "_entry_foo__class")]));
        assert_eq!(fixture.read("plain.css"), ".class {}");
    }

    #[test]
    fn copies_other_files() {
        let fixture = Fixture::new(&[("other/fileA.txt", "contents")]);
        fixture.write("base", &[0, 159, 146, 150]);
        let output = fixture.build(Options::default()).unwrap();
        assert_eq!(output.copied, vec!["base".to_string(), "other/fileA.txt".to_string()]);
        assert!(output.compiled.is_empty());
        assert_eq!(fs::read(fixture.output.join("base")).unwrap(), vec![0, 159, 146, 150]);
        assert_eq!(fixture.read("other/fileA.txt"), "contents");
    }

    #[test]
    fn after_plugins() {
        let fixture = Fixture::new(&[("entry.css", ".class { color: red; }")]);
        let options = Options::default().with_after_plugin(|sheet: &mut Stylesheet, _ctx: &PassCtx<'_>| {
            assert_eq!(sheet.nodes[0].as_rule().map(|rule| rule.selector.as_str()), Some("._entry__class"));
            sheet.walk_decls_mut(&mut |decl| {
                if decl.prop == "color" {
                    decl.value = "blue".to_string();
                }
            });
            Ok(())
        });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("entry.css"), "/* styles for entry.css */\n._entry__class { color: blue; }");
    }

    #[test]
    fn before_and_after_plugins() {
        let fixture = Fixture::new(&[
            ("constants.css", "@value superbold: 800;"),
            ("entry.css", "@value superbold from \"./constants.css\";\n.class { color: green; font-weight: superbold; }"),
        ]);
        let options = Options::default()
            .with_before_plugin(|sheet: &mut Stylesheet, _ctx: &PassCtx<'_>| {
                sheet.walk_decls_mut(&mut |decl| {
                    if decl.prop == "color" && decl.value == "green" {
                        decl.value = "blue".to_string();
                    }
                });
                Ok(())
            })
            .with_after_plugin(|sheet: &mut Stylesheet, _ctx: &PassCtx<'_>| {
                sheet.walk_decls_mut(&mut |decl| match decl.prop.as_str() {
                    "font-weight" => assert_eq!(decl.value, "800"),
                    "color" if decl.value == "blue" => decl.value = "red".to_string(),
                    _ => {}
                });
                Ok(())
            });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("entry.css"), "/* styles for entry.css */\n._entry__class { color: red; font-weight: 800; }");
        assert_eq!(fixture.read("entry.js"), js(&[("superbold", "800"), ("class", "_entry__class")]));
        assert_eq!(fixture.read("constants.css"), "/* styles for constants.css */\n");
        assert_eq!(fixture.read("constants.js"), js(&[("superbold", "800")]));
    }

    #[test]
    fn plugins_see_relative_paths() {
        let fixture = Fixture::new(&[
            ("dependency.css", "@value file-name: FILE_NAME;"),
            ("entry.css", concat!(
                "@value file-name: FILE_NAME;\n",
                "@value file-name as dependency-file-name from \"./dependency.css\";\n",
                ".class { file-name: file-name; dependency-file-name: dependency-file-name; }"
            )),
        ]);
        let options = Options::default()
            .with_before_plugin(|sheet: &mut Stylesheet, ctx: &PassCtx<'_>| {
                for node in &mut sheet.nodes {
                    if let Node::AtRule(at_rule) = node {
                        at_rule.params = at_rule.params.replace("FILE_NAME", ctx.relative_from);
                    }
                }
                Ok(())
            })
            .with_after_plugin(|sheet: &mut Stylesheet, ctx: &PassCtx<'_>| {
                sheet.append(Node::comment(format!(" {} ", ctx.relative_from)));
                Ok(())
            });
        fixture.build(options).unwrap();
        assert_eq!(fixture.read("dependency.css"), "/* styles for dependency.css */\n\n/* dependency.css */");
        assert_eq!(
            fixture.read("entry.css"),
            "/* styles for entry.css */\n._entry__class { file-name: entry.css; dependency-file-name: dependency.css; }\n/* entry.css */"
        );
        assert_eq!(fixture.read("entry.js"), js(&[
            ("file-name", "entry.css"),
            ("dependency-file-name", "dependency.css"),
            ("class", "_entry__class"),
        ]));
    }

    /// (sources, mappings) of the inline source map
    fn source_map(css: &str) -> (Vec<String>, String) {
        let (_, encoded) = css.split_once("base64,").unwrap();
        let json = STANDARD.decode(encoded.trim_end_matches(" */")).unwrap();
        let map = serde_json::from_slice::<serde_json::Value>(&json).unwrap();
        let sources = map["sources"].as_array().unwrap()
            .iter()
            .map(|source| source.as_str().unwrap().to_string())
            .collect();
        (sources, map["mappings"].as_str().unwrap().to_string())
    }

    #[test]
    fn source_maps() {
        let fixture = Fixture::new(&[("base.css", ".green {}")]);
        fixture.build(Options::default().with_source_maps(None)).unwrap();
        let css = fixture.read("base.css");
        assert!(css.starts_with("._base__green {}\n/*# sourceMappingURL=data:application/json;base64,"));
        assert_eq!(source_map(&css), (vec!["base.css".to_string()], "AAAA,gBAAS".to_string()));
    }

    #[test]
    fn source_maps_relative_to_base_dir() {
        let fixture = Fixture::new(&[("foo/bar/baz/base.css", ".green {}")]);
        fixture.build(Options::default().with_source_maps(Some("foo/bar".into()))).unwrap();
        let css = fixture.read("foo/bar/baz/base.css");
        assert_eq!(source_map(&css), (vec!["baz/base.css".to_string()], "AAAA,4BAAS".to_string()));
    }

    #[test]
    fn custom_js_path() {
        let fixture = Fixture::new(&[("dir/file.css", ".a {}")]);
        fixture.build(Options::default().with_js_path(|path: &str| path.replace(".css", "-module.css.js"))).unwrap();
        assert_eq!(fixture.read("dir/file-module.css.js"), js(&[("a", "_dir_file__a")]));
        assert!(!fixture.output.join("dir/file.js").exists());
    }

    #[test]
    fn composes_across_files() {
        let fixture = Fixture::new(&[
            ("base.css", ".green { color: green; }"),
            ("components/my-component.css", ".comp { composes: green from \"../base.css\"; }"),
        ]);
        let output = fixture.build(Options::default()).unwrap();
        assert_eq!(output.modules_loaded, 2);
        assert_eq!(
            fixture.read("components/my-component.css"),
            "/* styles for components/my-component.css */\n._components_my_component__comp { }"
        );
        assert_eq!(
            fixture.read("components/my-component.js"),
            js(&[("comp", "_components_my_component__comp _base__green")])
        );
    }

    #[test]
    fn values_keep_strings() {
        let fixture = Fixture::new(&[
            ("constants.css", "@value foo: \"Helvetica Neue\", Geneva, Arial, sans-serif;"),
            ("styles.css", "@value foo from \"./constants.css\";\n.class { font-family: foo; }"),
        ]);
        fixture.build(Options::default()).unwrap();
        assert_eq!(fixture.read("constants.js"), js(&[("foo", "\"Helvetica Neue\", Geneva, Arial, sans-serif")]));
        assert_eq!(
            fixture.read("styles.css"),
            "/* styles for styles.css */\n._styles__class { font-family: \"Helvetica Neue\", Geneva, Arial, sans-serif; }"
        );
    }

    #[test]
    fn latin1_sources() {
        let fixture = Fixture::new(&[]);
        fixture.write("foo.css", b".a { content: \"\xE9\"; }");
        let strict = fixture.build(Options::default());
        assert!(matches!(strict, Err(BuildError::Load(LoadError::NotUtf8 { .. }))));
        fixture.build(Options::default().with_encoding(Encoding::Latin1)).unwrap();
        let css = fs::read(fixture.output.join("foo.css")).unwrap();
        assert!(css.ends_with(b"._foo__a { content: \"\xE9\"; }"));
    }

    #[test]
    fn diamond_imports_load_once() {
        let input = Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("test-resources/diamond");
        let output_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(output_dir.path()).unwrap();
        let shared_runs = Rc::new(Cell::new(0));
        let options = Options::default().with_before_plugin({
            let shared_runs = shared_runs.clone();
            move |_sheet: &mut Stylesheet, ctx: &PassCtx<'_>| {
                if ctx.relative_from == "d.css" {
                    shared_runs.set(shared_runs.get() + 1);
                }
                Ok(())
            }
        });
        let result = Compiler::new(input, output.to_path_buf(), options).run().unwrap();
        assert_eq!(shared_runs.get(), 1);
        assert_eq!(result.modules_loaded, 4);
        assert_eq!(result.compiled, vec!["a.css", "b.css", "c.css", "d.css"]);
        let read = |relative: &str| fs::read_to_string(output.join(relative)).unwrap();
        assert_eq!(read("a.js"), js(&[("a", "_a__a _b__b _d__base _c__c")]));
        assert_eq!(read("c.css"), "/* styles for c.css */\n._c__c { color: orange; }\n");
        assert_eq!(read("d.js"), js(&[("accent", "orange"), ("base", "_d__base")]));
    }
}
