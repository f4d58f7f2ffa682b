use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// 端末デバイスへの read / write / ioctl の失敗
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// カーソル位置レポートが `ESC [ rows ; cols R` の形をしていない
    #[error("could not parse cursor position: {0:?}")]
    Parse(String),

    #[error("failed to open {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 終了要求 (Ctrl-Q)
///
/// エラーではなく制御シグナルなので `Error` とは別の型にしている
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quit requested")]
pub struct QuitRequested;

pub type Result<T> = std::result::Result<T, Error>;
