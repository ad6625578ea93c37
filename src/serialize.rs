use std::{
    io::{ErrorKind, Read, Write},
    path::Path,
};

use crate::{
    error::{Error, Result},
    header::encode_header,
    oracle::SizeOracle,
    snapshot::Snapshot,
    source::Source,
    types::{EntryKind, IntoBytes},
    BuildOptions,
};

const BUFFER_SIZE: usize = 64 * 1024;

/// Counts bytes written and attributes write failures to the output.
struct Output<'a, W: Write> {
    writer:  &'a mut W,
    target:  &'a Path,
    written: u64,
}
impl<W: Write> Output<'_, W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| Error::write(self.target, e))?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

/// Depth first serializer for files and directory trees.
pub struct Serializer<S: Source> {
    oracle: SizeOracle<S>,
}
impl<S: Source> Serializer<S> {
    pub fn new(oracle: SizeOracle<S>) -> Self { Serializer { oracle } }

    pub fn with_options(source: S, options: &BuildOptions) -> Self {
        Serializer::new(SizeOracle::new(
            Snapshot::new(source, options.skip_unsupported),
            options.max_depth,
        ))
    }

    pub fn oracle(&mut self) -> &mut SizeOracle<S> { &mut self.oracle }

    /// Write the serialization of `path` into `writer` and return the number
    /// of bytes written. `target` names the destination in write errors.
    /// `progress_callback` is called once for every emitted file and
    /// directory, after its bytes are written.
    pub fn serialize<W: Write, P: Fn(&Path)>(
        &mut self, path: &Path, writer: &mut W, target: &Path, progress_callback: P,
    ) -> Result<u64> {
        // sizes the whole tree up front so depth and listing errors surface
        // before any output is produced
        let expected = self.oracle.size_of(path)?;
        let kind = self.oracle.snapshot().kind(path)?;
        let mut output = Output {
            writer,
            target,
            written: 0,
        };
        self.emit(path, kind, &mut output, &progress_callback)?;
        if output.written != expected {
            return Err(Error::SizeMismatch {
                path: path.to_owned(),
                expected,
                actual: output.written,
            });
        }
        Ok(output.written)
    }

    /// Serialize `path` into memory.
    pub fn to_vec(&mut self, path: &Path) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.serialize(path, &mut bytes, Path::new("<memory>"), |_| {})?;
        Ok(bytes)
    }

    fn emit<W: Write, P: Fn(&Path)>(
        &mut self, path: &Path, kind: EntryKind, output: &mut Output<W>, progress_callback: &P,
    ) -> Result<()> {
        match kind {
            EntryKind::File => self.emit_file(path, output)?,
            EntryKind::Directory => {
                let header = encode_header(&mut self.oracle, path)?;
                output.write_all(header.as_bytes())?;
                let children = self.oracle.children(path)?;
                for child in children.iter() {
                    self.emit(&child.path, child.kind, output, progress_callback)?;
                }
            }
            EntryKind::Other => {
                return Err(Error::Unsupported {
                    path: path.to_owned(),
                })
            }
        }
        progress_callback(path);
        Ok(())
    }

    /// Copy a file verbatim, failing if its length no longer matches the
    /// length recorded in its parent header.
    fn emit_file<W: Write>(&mut self, path: &Path, output: &mut Output<W>) -> Result<()> {
        let expected = self.oracle.size_of(path)?;
        let mut reader = self.oracle.snapshot().source().open(path)?.take(expected + 1);
        let mut buffer = vec![0; BUFFER_SIZE];
        let mut actual = 0;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::read(path, e)),
            };
            actual += read as u64;
            if actual > expected {
                break;
            }
            output.write_all(&buffer[0..read])?;
        }
        if actual != expected {
            return Err(Error::SizeMismatch {
                path: path.to_owned(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        snapshot::tests::MemorySource,
        types::{DirectoryHeader, FromBytes, HEADER_SIZE},
    };

    fn serializer(source: MemorySource) -> Serializer<MemorySource> {
        Serializer::with_options(source, &BuildOptions::default())
    }

    fn sample() -> MemorySource {
        MemorySource::default()
            .dir("/r")
            .file("/r/a.txt", b"xyz")
            .dir("/r/sub")
            .file("/r/sub/b", b"Z")
    }

    #[test]
    fn file_serializes_to_its_contents() {
        let mut serializer = serializer(sample());
        let bytes = serializer.to_vec(Path::new("/r/a.txt")).unwrap();
        assert_eq!(bytes, b"xyz");
        assert_eq!(
            serializer.oracle().size_of(Path::new("/r/a.txt")).unwrap(),
            3
        );
    }

    #[test]
    fn directory_is_header_then_children() {
        let mut serializer = serializer(sample());
        let bytes = serializer.to_vec(Path::new("/r")).unwrap();
        assert_eq!(bytes.len(), 4260);
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 3], b"xyz");

        let sub = &bytes[HEADER_SIZE + 3..];
        assert_eq!(sub.len(), 2129);
        let (header, rest) = DirectoryHeader::read_from_prefix(sub).unwrap();
        assert_eq!(header.entries[0].name(), b"b");
        assert_eq!(header.entries[0].length(), 1);
        assert!(!header.entries[0].is_dir());
        assert_eq!(rest, b"Z");
    }

    #[test]
    fn every_node_reports_progress_children_first() {
        let visited = RefCell::new(Vec::new());
        serializer(sample())
            .serialize(Path::new("/r"), &mut Vec::new(), Path::new("<test>"), |path| {
                visited.borrow_mut().push(path.to_owned())
            })
            .unwrap();
        assert_eq!(
            visited.into_inner(),
            vec![
                Path::new("/r/a.txt").to_owned(),
                Path::new("/r/sub/b").to_owned(),
                Path::new("/r/sub").to_owned(),
                Path::new("/r").to_owned(),
            ]
        );
    }

    #[test]
    fn output_matches_regardless_of_listing_order() {
        let forward = serializer(sample()).to_vec(Path::new("/r")).unwrap();
        let again = serializer(sample()).to_vec(Path::new("/r")).unwrap();
        assert_eq!(forward, again);
        // MemorySource lists in reverse; the header must still be sorted
        assert_eq!(&forward[0..5], b"a.txt");
    }

    #[test]
    fn errors_in_nested_directories_abort() {
        let source = (0..17).fold(sample().dir("/r/sub/wide"), |source, i| {
            source.file(&format!("/r/sub/wide/{}", i), b"")
        });
        assert!(matches!(
            serializer(source).to_vec(Path::new("/r")),
            Err(Error::TooManyEntries { path, count: 17 }) if path == Path::new("/r/sub/wide")
        ));
    }

    #[test]
    fn shrunken_file_is_a_size_mismatch() {
        let source = sample().resized("/r/a.txt", 5);
        assert!(matches!(
            serializer(source).to_vec(Path::new("/r")),
            Err(Error::SizeMismatch { path, expected: 5, actual: 3 }) if path == Path::new("/r/a.txt")
        ));
    }

    #[test]
    fn grown_file_is_a_size_mismatch() {
        let source = sample().resized("/r/a.txt", 2);
        let mut output = Vec::new();
        let err = serializer(source)
            .serialize(Path::new("/r"), &mut output, Path::new("<test>"), |_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SizeMismatch { path, expected: 2, actual: 3 } if path == Path::new("/r/a.txt")
        ));
        // only the header made it out, none of the extra bytes
        assert_eq!(output.len(), HEADER_SIZE);
    }

    struct FailingWriter;
    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> { Err(ErrorKind::WriteZero.into()) }

        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    #[test]
    fn write_failures_name_the_target() {
        let err = serializer(sample())
            .serialize(Path::new("/r"), &mut FailingWriter, Path::new("/out/rd"), |_| {})
            .unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(err.path(), Path::new("/out/rd"));
    }
}
