use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::Error;
use crate::buffer::Buffer;

pub struct FileIO;

impl FileIO {
    /// ファイルの先頭行だけを読み込む
    ///
    /// 末尾の `\n` / `\r\n` は取り除く。空ファイルなら行数 0 のバッファになる
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Buffer, Error> {
        let path = path.as_ref();
        let file_error = |source| Error::File {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(file_error)?;
        let mut reader = BufReader::new(file);

        // UTF-8 でない行も読めるように、バイト列で読んでから変換する
        let mut line = Vec::new();
        let read = reader.read_until(b'\n', &mut line).map_err(file_error)?;

        let mut buffer = Buffer::new();
        if read > 0 {
            let text = line
                .strip_suffix(b"\n")
                .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                .unwrap_or(&line[..]);
            buffer.insert_row(0, String::from_utf8_lossy(text).into_owned());
        }
        tracing::debug!(path = %path.display(), rows = buffer.len(), "loaded file");

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_only_first_line_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "line1").unwrap();
        writeln!(file, "line2").unwrap();
        file.flush().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.row(0).unwrap().chars(), "line1");
    }

    #[test]
    fn test_crlf_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hello\r\nworld\r\n").unwrap();
        file.flush().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        assert_eq!(buffer.row(0).unwrap().chars(), "hello");
    }

    #[test]
    fn test_single_line_without_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "single line").unwrap();
        file.flush().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.row(0).unwrap().chars(), "single line");
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_file_with_only_newline() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file).unwrap();
        file.flush().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        // 改行だけのファイルは空行 1 行
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.row(0).unwrap().chars(), "");
    }

    #[test]
    fn test_non_utf8_first_line() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9 au lait\r\nnext\n").unwrap();
        file.flush().unwrap();

        let buffer = FileIO::open(file.path()).unwrap();

        // 不正なバイトは置換文字になる
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.row(0).unwrap().chars(), "caf\u{fffd} au lait");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let err = FileIO::open(&path).unwrap_err();

        match err {
            Error::File { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
