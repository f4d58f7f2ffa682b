use std::io::{self, Write};

use crate::editor::Editor;
use crate::{PRODUCT_NAME, VERSION};

/// カーソルを左上へ (`Goto(1, 1)` の短縮形)
const CURSOR_HOME: &str = "\x1b[H";

pub struct Screen;

impl Screen {
    pub fn welcome_message() -> String {
        format!("{PRODUCT_NAME} -- {VERSION}")
    }

    /// 左右中央に寄せたウェルカムメッセージ
    ///
    /// 画面幅より長い場合は余白を付けずに幅で切り詰める
    fn draw_welcome(frame: &mut Vec<u8>, cols: usize) -> io::Result<()> {
        let message = Self::welcome_message();
        let len = message.chars().count();
        let padding = cols.saturating_sub(len) / 2;
        let visible: String = message.chars().take(cols).collect();
        write!(frame, "{}{}", " ".repeat(padding), visible)
    }

    fn draw_rows(frame: &mut Vec<u8>, editor: &Editor) -> io::Result<()> {
        let size = editor.size();
        let cols = usize::from(size.cols);
        let buffer = editor.buffer();

        for y in 0..size.rows {
            let file_row = usize::from(y);

            if buffer.is_empty() && y == 0 {
                Self::draw_welcome(frame, cols)?;
            } else if let Some(row) = buffer.row(file_row) {
                // 画面に収まるように切り詰める（文字単位で安全に処理）
                write!(frame, "{}", row.truncated(cols))?;
            } else {
                // ファイルの終端を超えたら ~ を表示
                write!(frame, "~")?;
            }
            // 行末までクリア
            write!(frame, "{}", termion::clear::UntilNewline)?;

            if y + 1 < size.rows {
                write!(frame, "\r\n")?;
            }
        }
        Ok(())
    }

    /// 画面全体を描画するバイト列を作る
    ///
    /// エディタの状態だけから決まるので、同じ状態なら同じバイト列になる
    pub fn draw(editor: &Editor) -> io::Result<Vec<u8>> {
        let mut frame = Vec::new();
        let cursor = editor.cursor();

        // カーソルを隠す
        write!(frame, "{}", termion::cursor::Hide)?;
        // カーソルを左上に移動
        write!(frame, "{CURSOR_HOME}")?;

        Self::draw_rows(&mut frame, editor)?;

        // カーソル位置に移動 (Goto は 1 始まり)
        write!(
            frame,
            "{}",
            termion::cursor::Goto(cursor.x() + 1, cursor.y() + 1)
        )?;
        // カーソル表示
        write!(frame, "{}", termion::cursor::Show)?;
        Ok(frame)
    }

    /// ちらつきを抑えるため 1 回の write で書き出す
    pub fn refresh(stdout: &mut impl Write, editor: &Editor) -> io::Result<()> {
        let frame = Self::draw(editor)?;
        stdout.write_all(&frame)?;
        stdout.flush()
    }
}
