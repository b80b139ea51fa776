use std::borrow::Cow;
use std::io;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::compiler::{BuildListener, CssFormatter, DefaultJsFormatter, JsFormatter, LogListener, OutputPathNamer};
use crate::import_export::export::ExportTable;
use crate::import_export::import_resolver::{PathResolver, RelativePathResolver};
use crate::import_export::link::{ModuleResolutionFailureHandler, SymbolResolutionFailureHandler};
use crate::passes::{Pass, Plugins};
use crate::scoped_name::{DefaultScopedName, ScopedNameGenerator};

/// Name of the optional JSON config file looked up in the input root
pub const CONFIG_FILE_NAME: &str = "css-modules.json";

/// Everything configurable about a build
#[derive(Clone)]
pub struct Options {
    /// Files whose name ends with `.<extension>` are compiled, the rest are copied
    pub extension: String,
    pub encoding: Encoding,
    pub plugins: Plugins,
    pub scoped_name: Rc<dyn ScopedNameGenerator>,
    pub path_resolver: Rc<dyn PathResolver>,
    pub js_formatter: Rc<dyn JsFormatter>,
    /// `None` writes a `/* styles for <path> */` banner above the css (or nothing extra when
    /// source maps are enabled)
    pub css_formatter: Option<Rc<dyn CssFormatter>>,
    /// `None` replaces the trailing `.<extension>` with `.js`
    pub js_path: Option<Rc<dyn OutputPathNamer>>,
    pub on_module_resolution_failure: Option<Rc<dyn ModuleResolutionFailureHandler>>,
    pub on_symbol_resolution_failure: Option<Rc<dyn SymbolResolutionFailureHandler>>,
    /// Import path → exports, checked before the path resolver
    pub virtual_modules: IndexMap<String, ExportTable>,
    pub source_maps: Option<SourceMapOptions>,
    pub listener: Rc<dyn BuildListener>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceMapOptions {
    /// Source paths in the map are relative to this directory (itself relative to the input
    /// root) instead of the input root
    pub base_dir: Option<Utf8PathBuf>,
}

/// How module sources are decoded and outputs encoded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin1", alias = "latin-1")]
    #[value(name = "latin1", alias = "latin-1")]
    Latin1,
}

/// The contents of [CONFIG_FILE_NAME]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub extension: Option<String>,
    pub encoding: Option<Encoding>,
    #[serde(default)]
    pub virtual_modules: IndexMap<String, ExportTable>,
    #[serde(default)]
    pub source_maps: bool,
    pub source_map_base_dir: Option<String>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("When reading config {path}: {source}")]
    #[diagnostic(code(css_module_linker::config::io))]
    Io { path: Utf8PathBuf, #[source] source: io::Error },
    #[error("Invalid config {path}: {source}")]
    #[diagnostic(code(css_module_linker::config::json), help("see the README for the accepted keys"))]
    Json { path: Utf8PathBuf, #[source] source: serde_json::Error },
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extension: "css".to_string(),
            encoding: Encoding::default(),
            plugins: Plugins::default(),
            scoped_name: Rc::new(DefaultScopedName),
            path_resolver: Rc::new(RelativePathResolver),
            js_formatter: Rc::new(DefaultJsFormatter),
            css_formatter: None,
            js_path: None,
            on_module_resolution_failure: None,
            on_symbol_resolution_failure: None,
            virtual_modules: IndexMap::new(),
            source_maps: None,
            listener: Rc::new(LogListener),
        }
    }
}

impl Options {
    /// Defaults overridden by the config file at `path`, if it exists
    pub fn from_config_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path);
                return Ok(Self::default())
            }
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        let config = serde_json::from_str::<ConfigFile>(&text)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;
        Ok(Self::default().with_config(config))
    }

    /// Apply the keys set in `config`
    pub fn with_config(mut self, config: ConfigFile) -> Self {
        if let Some(extension) = config.extension {
            self.extension = extension;
        }
        if let Some(encoding) = config.encoding {
            self.encoding = encoding;
        }
        self.virtual_modules.extend(config.virtual_modules);
        if config.source_maps || config.source_map_base_dir.is_some() {
            self.source_maps = Some(SourceMapOptions {
                base_dir: config.source_map_base_dir.map(Utf8PathBuf::from),
            });
        }
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_before_plugin(mut self, plugin: impl Pass + 'static) -> Self {
        self.plugins.before.push(Rc::new(plugin));
        self
    }

    pub fn with_after_plugin(mut self, plugin: impl Pass + 'static) -> Self {
        self.plugins.after.push(Rc::new(plugin));
        self
    }

    pub fn with_scoped_name(mut self, generator: impl ScopedNameGenerator + 'static) -> Self {
        self.scoped_name = Rc::new(generator);
        self
    }

    pub fn with_path_resolver(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.path_resolver = Rc::new(resolver);
        self
    }

    pub fn with_js_formatter(mut self, formatter: impl JsFormatter + 'static) -> Self {
        self.js_formatter = Rc::new(formatter);
        self
    }

    pub fn with_css_formatter(mut self, formatter: impl CssFormatter + 'static) -> Self {
        self.css_formatter = Some(Rc::new(formatter));
        self
    }

    pub fn with_js_path(mut self, namer: impl OutputPathNamer + 'static) -> Self {
        self.js_path = Some(Rc::new(namer));
        self
    }

    pub fn with_module_resolution_failure_handler(mut self, handler: impl ModuleResolutionFailureHandler + 'static) -> Self {
        self.on_module_resolution_failure = Some(Rc::new(handler));
        self
    }

    pub fn with_symbol_resolution_failure_handler(mut self, handler: impl SymbolResolutionFailureHandler + 'static) -> Self {
        self.on_symbol_resolution_failure = Some(Rc::new(handler));
        self
    }

    pub fn with_virtual_module(mut self, name: impl Into<String>, exports: ExportTable) -> Self {
        self.virtual_modules.insert(name.into(), exports);
        self
    }

    pub fn with_source_maps(mut self, base_dir: Option<Utf8PathBuf>) -> Self {
        self.source_maps = Some(SourceMapOptions { base_dir });
        self
    }

    pub fn with_listener(mut self, listener: impl BuildListener + 'static) -> Self {
        self.listener = Rc::new(listener);
        self
    }
}

impl Encoding {
    /// `None` if the bytes aren't valid in this encoding
    pub fn decode(self, bytes: Vec<u8>) -> Option<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes).ok(),
            Encoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
        }
    }

    /// Characters which don't fit become `?`
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Encoding::Utf8 => Cow::Borrowed(text.as_bytes()),
            Encoding::Latin1 => Cow::Owned(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect()),
        }
    }
}
