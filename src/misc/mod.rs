/// Lexical posix path helpers
mod path;
/// `io::Result<()>::ignore_kind`
mod ignore_io_kind;

pub use path::{normalize_path, relative_to, to_posix};
pub(crate) use ignore_io_kind::IgnoreIoKind;
