pub mod buffer;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod file_io;
pub mod key;
pub mod logger;
pub mod screen;
pub mod terminal;

pub use error::{Error, QuitRequested, Result};

// ウェルカムメッセージ
pub const PRODUCT_NAME: &str = "Gonk";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Ctrl-Q で終了
pub const QUIT_KEY: u8 = key::ctrl_key(b'q');
