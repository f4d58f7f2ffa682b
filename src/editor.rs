use std::io::{Read, Write};

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::key::{Key, KeyDecoder};
use crate::screen::Screen;
use crate::terminal::Size;
use crate::{QuitRequested, Result};

/// エディタの状態
///
/// main ループが所有し、`process_key` だけが変更する
pub struct Editor {
    buffer: Buffer,
    cursor: Cursor,
    size: Size,
}

impl Editor {
    pub fn new(buffer: Buffer, size: Size) -> Self {
        Self {
            buffer,
            cursor: Cursor::new(),
            size,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// キー入力を 1 つ処理する
    ///
    /// Ctrl-Q のときだけ `QuitRequested` を返す
    pub fn process_key(&mut self, key: Key) -> std::result::Result<(), QuitRequested> {
        let Size { cols, rows } = self.size;

        match key {
            Key::Quit => return Err(QuitRequested),
            // 画面の高さ分だけ上下に移動する
            Key::PageUp => {
                for _ in 0..rows {
                    self.cursor.move_up();
                }
            }
            Key::PageDown => {
                for _ in 0..rows {
                    self.cursor.move_down(rows);
                }
            }
            Key::ArrowUp => self.cursor.move_up(),
            Key::ArrowDown => self.cursor.move_down(rows),
            Key::ArrowLeft => self.cursor.move_left(),
            Key::ArrowRight => self.cursor.move_right(cols),
            Key::Home => self.cursor.move_to_line_start(),
            Key::End => self.cursor.move_to_line_end(cols),
            // 編集コマンドは未実装
            Key::RawByte(_) | Key::Delete | Key::Unknown => {}
        }
        Ok(())
    }

    /// 描画 → キー入力 → 処理 を終了要求まで繰り返す
    pub fn run<R: Read, W: Write>(
        &mut self,
        keys: &mut KeyDecoder<R>,
        out: &mut W,
    ) -> Result<()> {
        loop {
            Screen::refresh(out, self)?;
            let key = keys.read_key()?;

            if self.process_key(key).is_err() {
                tracing::debug!("quit requested");
                Screen::refresh(out, self)?;
                return Ok(());
            }
        }
    }
}
