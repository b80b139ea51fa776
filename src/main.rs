use std::process::exit;

use camino::Utf8PathBuf;
use clap::Parser;

use css_module_linker::config::{ConfigError, CONFIG_FILE_NAME};
use css_module_linker::import_export::LoadError;
use css_module_linker::{Compiler, Encoding, Options};

/// Compile a directory of CSS modules
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the modules
    input: Utf8PathBuf,
    /// Directory to write the compiled stylesheets and symbol tables to
    output: Utf8PathBuf,
    /// Compile files ending in `.<EXTENSION>` [default: css]
    #[arg(long)]
    extension: Option<String>,
    #[arg(long, value_enum)]
    encoding: Option<Encoding>,
    /// Append an inline source map to every stylesheet
    #[arg(long)]
    source_maps: bool,
    /// Make source map paths relative to this directory inside the input (implies --source-maps)
    #[arg(long)]
    source_map_base_dir: Option<Utf8PathBuf>,
    /// JSON config [default: <INPUT>/css-modules.json]
    #[arg(long)]
    config: Option<Utf8PathBuf>,
    /// Warn instead of failing when an imported module can't be loaded
    #[arg(long)]
    allow_missing_modules: bool,
    /// Warn instead of exporting `undefined` when an imported symbol doesn't exist
    #[arg(long)]
    warn_missing_symbols: bool,
}

fn options(args: &Args) -> Result<Options, ConfigError> {
    let config_path = args.config.clone().unwrap_or_else(|| args.input.join(CONFIG_FILE_NAME));
    let mut options = Options::from_config_file(&config_path)?;
    if let Some(extension) = &args.extension {
        options = options.with_extension(extension);
    }
    if let Some(encoding) = args.encoding {
        options = options.with_encoding(encoding);
    }
    if args.source_maps || args.source_map_base_dir.is_some() {
        let base_dir = args.source_map_base_dir.clone()
            .or_else(|| options.source_maps.take().and_then(|source_maps| source_maps.base_dir));
        options = options.with_source_maps(base_dir);
    }
    if args.allow_missing_modules {
        // Already logged as a warning by the linker
        options = options.with_module_resolution_failure_handler(|_: &LoadError, _: &str, _: &str| {});
    }
    if args.warn_missing_symbols {
        options = options.with_symbol_resolution_failure_handler(|_: &str, _: &str, _: &str| {});
    }
    Ok(options)
}

/// Run the program
fn main() {
    env_logger::init();
    let args = Args::parse();
    let options = match options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            exit(2)
        }
    };
    match Compiler::new(args.input, args.output, options).run() {
        Ok(output) => {
            eprintln!("Compiled {} modules, copied {} other files", output.compiled.len(), output.copied.len());
        }
        Err(err) => {
            eprintln!("{:?}", err.into_report());
            exit(1)
        }
    }
}
