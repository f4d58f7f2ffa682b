use std::io::{self, Read};

use crate::QUIT_KEY;

const ESC: u8 = 0x1b;

/// デコード済みのキー入力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    RawByte(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    Quit,
    /// 認識できないエスケープシーケンス (何もしない)
    Unknown,
}

/// Ctrl 修飾されたキーのコードを返す
pub const fn ctrl_key(c: u8) -> u8 {
    c & 0x1f
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// ESC を読んだ
    Escape,
    /// ESC [
    Csi,
    /// ESC [ <digit> ... `~` が来るまで読み続ける
    Digits(u8),
    /// ESC O
    Ss3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Next(State),
    Emit(Key),
}

fn step(state: State, byte: u8) -> Step {
    match (state, byte) {
        (State::Start, ESC) => Step::Next(State::Escape),
        (State::Start, QUIT_KEY) => Step::Emit(Key::Quit),
        (State::Start, b) => Step::Emit(Key::RawByte(b)),

        (State::Escape, b'[') => Step::Next(State::Csi),
        (State::Escape, b'O') => Step::Next(State::Ss3),
        (State::Escape, _) => Step::Emit(Key::Unknown),

        (State::Csi, d) if d.is_ascii_digit() => Step::Next(State::Digits(d)),
        (State::Csi, b'A') => Step::Emit(Key::ArrowUp),
        (State::Csi, b'B') => Step::Emit(Key::ArrowDown),
        (State::Csi, b'C') => Step::Emit(Key::ArrowRight),
        (State::Csi, b'D') => Step::Emit(Key::ArrowLeft),
        (State::Csi, b'H') => Step::Emit(Key::Home),
        (State::Csi, b'F') => Step::Emit(Key::End),
        (State::Csi, _) => Step::Emit(Key::Unknown),

        // 最初の数字だけでキーを決める
        (State::Digits(first), b'~') => Step::Emit(match first {
            b'1' | b'7' => Key::Home,
            b'3' => Key::Delete,
            b'4' | b'8' => Key::End,
            b'5' => Key::PageUp,
            b'6' => Key::PageDown,
            _ => Key::Unknown,
        }),
        (State::Digits(first), _) => Step::Next(State::Digits(first)),

        (State::Ss3, b'H') => Step::Emit(Key::Home),
        (State::Ss3, b'F') => Step::Emit(Key::End),
        (State::Ss3, _) => Step::Emit(Key::Unknown),
    }
}

/// 入力ストリームから 1 バイトずつ読んでキーにデコードする
///
/// raw mode の端末 (VMIN=1, VTIME=0) では read はバイトが届くまでブロックする。
/// そのため単独の ESC や `~` で終わらない数字列を受け取ると、次の入力が来るまで
/// 戻らない。タイムアウトは設けていない。
pub struct KeyDecoder<R> {
    input: R,
}

impl<R: Read> KeyDecoder<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    pub fn read_key(&mut self) -> io::Result<Key> {
        let mut state = State::Start;
        let mut seq = Vec::new();

        loop {
            let byte = self.read_byte()?;
            seq.push(byte);

            match step(state, byte) {
                Step::Next(next) => state = next,
                Step::Emit(key) => {
                    if seq.len() > 1 {
                        tracing::debug!(?seq, ?key, "decoded escape sequence");
                    }
                    return Ok(key);
                }
            }
        }
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "input closed while reading a key",
                    ));
                }
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
