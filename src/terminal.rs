use std::fmt;
use std::io::{self, Read, Stdout, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{LazyLock, Mutex, Once};

use regex::Regex;

use crate::{Error, Result};

/// 右下へカーソルを飛ばしてから位置レポートを要求する
const SIZE_PROBE: &[u8] = b"\x1b[999C\x1b[999B\x1b[6n";

/// レポートがこの長さを超えたら読むのをやめる
const REPORT_MAX_LEN: usize = 32;

static CURSOR_REPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[(\d+);(\d+)R").expect("cursor report pattern"));

/// 端末の大きさ (文字セル単位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

/// raw mode に入る前の端末設定のスナップショット
#[derive(Clone, Copy)]
pub struct TerminalAttributes(libc::termios);

impl TerminalAttributes {
    pub fn input_flags(&self) -> libc::tcflag_t {
        self.0.c_iflag
    }

    pub fn output_flags(&self) -> libc::tcflag_t {
        self.0.c_oflag
    }

    pub fn control_flags(&self) -> libc::tcflag_t {
        self.0.c_cflag
    }

    pub fn local_flags(&self) -> libc::tcflag_t {
        self.0.c_lflag
    }

    pub fn control_chars(&self) -> &[libc::cc_t] {
        &self.0.c_cc
    }

    fn speeds(&self) -> (libc::speed_t, libc::speed_t) {
        unsafe { (libc::cfgetispeed(&self.0), libc::cfgetospeed(&self.0)) }
    }
}

impl PartialEq for TerminalAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.input_flags() == other.input_flags()
            && self.output_flags() == other.output_flags()
            && self.control_flags() == other.control_flags()
            && self.local_flags() == other.local_flags()
            && self.control_chars() == other.control_chars()
            && self.speeds() == other.speeds()
    }
}

impl Eq for TerminalAttributes {}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalAttributes")
            .field("iflag", &format_args!("{:#x}", self.input_flags()))
            .field("oflag", &format_args!("{:#x}", self.output_flags()))
            .field("cflag", &format_args!("{:#x}", self.control_flags()))
            .field("lflag", &format_args!("{:#x}", self.local_flags()))
            .field("cc", &self.control_chars())
            .finish()
    }
}

/// raw mode 用の設定を作る
///
/// echo・カノニカルモード・シグナル生成・フロー制御・出力の後処理を無効にして、
/// 1 バイト単位でタイムアウト無しに read できるようにする
pub fn raw_attributes(original: &TerminalAttributes) -> TerminalAttributes {
    let mut raw = original.0;
    raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    raw.c_oflag &= !libc::OPOST;
    raw.c_cflag |= libc::CS8;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
    raw.c_cc[libc::VMIN] = 1;
    raw.c_cc[libc::VTIME] = 0;
    TerminalAttributes(raw)
}

pub fn get_attributes(fd: RawFd) -> io::Result<TerminalAttributes> {
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(TerminalAttributes(termios))
}

/// 設定を反映する。未読の入力は捨てる (TCSAFLUSH)
fn set_attributes(fd: RawFd, attrs: &TerminalAttributes) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &attrs.0) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// panic hook からも元の設定に戻せるように控えておく
static ATTRIBUTES_BACKUP: Mutex<Option<(RawFd, TerminalAttributes)>> = Mutex::new(None);
static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            // panic メッセージを読める状態に戻してから出力する
            if let Ok(mut backup) = ATTRIBUTES_BACKUP.lock()
                && let Some((fd, attrs)) = backup.take()
            {
                let _ = set_attributes(fd, &attrs);
            }
            default_hook(info);
        }));
    });
}

fn set_backup(value: Option<(RawFd, TerminalAttributes)>) {
    if let Ok(mut backup) = ATTRIBUTES_BACKUP.lock() {
        *backup = value;
    }
}

/// raw mode のガード
///
/// `enable` で元の設定を保存して raw mode に入る。`disable` を呼ぶか drop されたときに
/// 一度だけ元に戻す。
pub struct RawMode {
    fd: RawFd,
    original: TerminalAttributes,
    active: bool,
}

impl RawMode {
    pub fn enable(fd: RawFd) -> io::Result<Self> {
        let original = get_attributes(fd)?;

        install_panic_hook();
        set_backup(Some((fd, original)));

        if let Err(e) = set_attributes(fd, &raw_attributes(&original)) {
            set_backup(None);
            return Err(e);
        }
        tracing::debug!(fd, ?original, "entered raw mode");

        Ok(Self {
            fd,
            original,
            active: true,
        })
    }

    /// 元の設定に戻す。失敗した場合はエラーを返す
    pub fn disable(mut self) -> io::Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        set_backup(None);
        set_attributes(self.fd, &self.original)?;
        tracing::debug!(fd = self.fd, "left raw mode");
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// `ESC [ rows ; cols R` をパースする
pub fn parse_cursor_report(report: &str) -> Result<Size> {
    let parse_error = || Error::Parse(report.to_string());

    let caps = CURSOR_REPORT.captures(report).ok_or_else(parse_error)?;
    let rows: u16 = caps[1].parse().map_err(|_| parse_error())?;
    let cols: u16 = caps[2].parse().map_err(|_| parse_error())?;

    if rows == 0 || cols == 0 {
        return Err(parse_error());
    }
    Ok(Size { cols, rows })
}

/// カーソルを右下へ移動させ、端末が返す位置レポートから大きさを求める
///
/// 入力は raw mode になっている必要がある
pub fn probe_size<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<Size> {
    output.write_all(SIZE_PROBE)?;
    output.flush()?;

    let mut report = Vec::with_capacity(REPORT_MAX_LEN);
    let mut byte = [0u8; 1];
    while report.len() < REPORT_MAX_LEN {
        if input.read(&mut byte)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before cursor position report",
            )
            .into());
        }
        report.push(byte[0]);
        if byte[0] == b'R' {
            break;
        }
    }

    parse_cursor_report(&String::from_utf8_lossy(&report))
}

/// ioctl(TIOCGWINSZ) で大きさを取得する
pub fn query_size(fd: RawFd) -> io::Result<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

/// 端末の大きさを取得する
///
/// ioctl が失敗するか幅 0 が返ってきた場合は、カーソル位置レポートで代用する
pub fn window_size() -> Result<Size> {
    let stdout = io::stdout();
    match query_size(stdout.as_raw_fd()) {
        Ok(size) if size.cols > 0 && size.rows > 0 => Ok(size),
        other => {
            tracing::debug!(?other, "window size ioctl unusable, probing cursor position");
            probe_size(&mut io::stdin().lock(), &mut stdout.lock())
        }
    }
}

pub struct Terminal {
    stdout: Stdout,
    raw_mode: Option<RawMode>,
    size: Size,
}

impl Terminal {
    /// 標準入力を raw mode にして画面の大きさを測る
    ///
    /// 大きさの取得に失敗した場合もガードの drop で端末は元に戻る
    pub fn new() -> Result<Self> {
        let raw_mode = RawMode::enable(io::stdin().as_raw_fd())?;
        let size = window_size()?;
        tracing::debug!(cols = size.cols, rows = size.rows, "terminal size");

        Ok(Self {
            stdout: io::stdout(),
            raw_mode: Some(raw_mode),
            size,
        })
    }

    pub fn stdout(&mut self) -> &mut Stdout {
        &mut self.stdout
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        write!(
            self.stdout,
            "{}{}",
            termion::clear::All,
            termion::cursor::Goto(1, 1)
        )?;
        self.stdout.flush()
    }

    /// 画面をクリアして raw mode を解除する
    pub fn restore(&mut self) -> io::Result<()> {
        self.clear_screen()?;
        match self.raw_mode.take() {
            Some(raw_mode) => raw_mode.disable(),
            None => Ok(()),
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // restore されずに抜けた場合 (エラー終了など)
        if self.raw_mode.is_some() {
            let _ = self.clear_screen();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor_report() {
        let size = parse_cursor_report("\x1b[24;80R").unwrap();
        assert_eq!(size, Size { cols: 80, rows: 24 });
    }

    #[test]
    fn test_parse_cursor_report_malformed() {
        for report in ["", "24;80R", "\x1b[24R", "\x1b[24;80", "\x1b[a;bR", "\x1b[0;80R"] {
            assert!(
                matches!(parse_cursor_report(report), Err(Error::Parse(_))),
                "{report:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_cursor_report_overflow() {
        assert!(matches!(
            parse_cursor_report("\x1b[99999;80R"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_probe_size() {
        let mut input = &b"\x1b[50;132R"[..];
        let mut output = Vec::new();

        let size = probe_size(&mut input, &mut output).unwrap();

        assert_eq!(size, Size { cols: 132, rows: 50 });
        assert_eq!(output, SIZE_PROBE);
    }

    #[test]
    fn test_probe_size_stops_at_terminator() {
        let mut input = &b"\x1b[24;80Rq"[..];
        let mut output = Vec::new();

        probe_size(&mut input, &mut output).unwrap();

        // レポートより後の入力は残っている
        assert_eq!(input, b"q");
    }

    #[test]
    fn test_probe_size_garbage() {
        let mut input = &[b'x'; 64][..];
        let mut output = Vec::new();

        let err = probe_size(&mut input, &mut output).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_probe_size_eof() {
        let mut input = &b"\x1b[24"[..];
        let mut output = Vec::new();

        let err = probe_size(&mut input, &mut output).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[cfg(target_os = "linux")]
    mod pty {
        use super::super::*;
        use std::ffi::CStr;
        use std::fs::{File, OpenOptions};
        use std::os::fd::{FromRawFd, OwnedFd};
        use std::os::unix::fs::OpenOptionsExt;

        /// 疑似端末を開く。使えない環境では None
        fn open_pty() -> Option<(OwnedFd, File)> {
            unsafe {
                let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
                if master < 0 {
                    return None;
                }
                let master = OwnedFd::from_raw_fd(master);
                if libc::grantpt(master.as_raw_fd()) != 0 || libc::unlockpt(master.as_raw_fd()) != 0
                {
                    return None;
                }
                let mut name = [0 as libc::c_char; 128];
                if libc::ptsname_r(master.as_raw_fd(), name.as_mut_ptr(), name.len()) != 0 {
                    return None;
                }
                let path = CStr::from_ptr(name.as_ptr()).to_str().ok()?.to_owned();
                let slave = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .custom_flags(libc::O_NOCTTY)
                    .open(path)
                    .ok()?;
                Some((master, slave))
            }
        }

        #[test]
        fn test_raw_mode_round_trip() {
            let Some((_master, slave)) = open_pty() else {
                return;
            };
            let fd = slave.as_raw_fd();
            let before = get_attributes(fd).unwrap();

            let raw_mode = RawMode::enable(fd).unwrap();

            let during = get_attributes(fd).unwrap();
            assert_eq!(during.local_flags() & libc::ECHO, 0);
            assert_eq!(during.local_flags() & libc::ICANON, 0);
            assert_eq!(during.local_flags() & libc::ISIG, 0);
            assert_eq!(during.input_flags() & libc::IXON, 0);
            assert_eq!(during.output_flags() & libc::OPOST, 0);
            assert_eq!(during.control_chars()[libc::VMIN], 1);
            assert_eq!(during.control_chars()[libc::VTIME], 0);

            raw_mode.disable().unwrap();
            assert_eq!(get_attributes(fd).unwrap(), before);
        }

        #[test]
        fn test_raw_mode_restored_on_drop() {
            let Some((_master, slave)) = open_pty() else {
                return;
            };
            let fd = slave.as_raw_fd();
            let before = get_attributes(fd).unwrap();

            {
                let _raw_mode = RawMode::enable(fd).unwrap();
                assert_ne!(get_attributes(fd).unwrap(), before);
            }

            assert_eq!(get_attributes(fd).unwrap(), before);
        }

        #[test]
        fn test_raw_mode_restored_on_panic() {
            let Some((_master, slave)) = open_pty() else {
                return;
            };
            let fd = slave.as_raw_fd();
            let before = get_attributes(fd).unwrap();

            let result = std::panic::catch_unwind(|| {
                let _raw_mode = RawMode::enable(fd).unwrap();
                panic!("panic while in raw mode");
            });

            assert!(result.is_err());
            assert_eq!(get_attributes(fd).unwrap(), before);
        }

        #[test]
        fn test_query_size() {
            let Some((master, slave)) = open_pty() else {
                return;
            };
            let ws = libc::winsize {
                ws_row: 24,
                ws_col: 80,
                ws_xpixel: 0,
                ws_ypixel: 0,
            };
            assert_eq!(
                unsafe { libc::ioctl(master.as_raw_fd(), libc::TIOCSWINSZ, &ws) },
                0
            );

            let size = query_size(slave.as_raw_fd()).unwrap();
            assert_eq!(size, Size { cols: 80, rows: 24 });
        }
    }

    #[test]
    fn test_raw_attributes_flags() {
        let original = TerminalAttributes(unsafe {
            let mut t: libc::termios = std::mem::zeroed();
            t.c_iflag = libc::BRKINT | libc::ICRNL | libc::IXON | libc::IGNPAR;
            t.c_oflag = libc::OPOST;
            t.c_lflag = libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG;
            t.c_cc[libc::VMIN] = 0;
            t.c_cc[libc::VTIME] = 5;
            t
        });

        let raw = raw_attributes(&original);

        // 関係ないフラグはそのまま
        assert_eq!(raw.input_flags(), libc::IGNPAR);
        assert_eq!(raw.output_flags(), 0);
        assert_eq!(raw.local_flags(), 0);
        assert_eq!(raw.control_flags() & libc::CS8, libc::CS8);
        assert_eq!(raw.control_chars()[libc::VMIN], 1);
        assert_eq!(raw.control_chars()[libc::VTIME], 0);
    }
}
