use std::io;

/// Treat one kind of I/O error as success, e.g. "already exists" when creating directories
pub trait IgnoreIoKind {
    fn ignore_kind(self, kind: io::ErrorKind) -> Self;
}

impl IgnoreIoKind for io::Result<()> {
    #[inline]
    fn ignore_kind(self, kind: io::ErrorKind) -> Self {
        match self {
            Err(err) if err.kind() == kind => Ok(()),
            other => other
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use test_log::test;

    use super::IgnoreIoKind;

    #[test]
    fn ignores_only_the_given_kind() {
        let exists = || Err::<(), _>(io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(exists().ignore_kind(io::ErrorKind::AlreadyExists).is_ok());
        assert!(exists().ignore_kind(io::ErrorKind::NotFound).is_err());
    }
}
