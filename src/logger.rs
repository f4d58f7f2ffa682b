use std::io;
use std::path::Path;

/// ファイルへのデバッグログを有効にする
///
/// 画面は raw mode で使っているので stdout / stderr には出さない。
/// debug build でのみ有効で、`path` が無ければ何もしない
pub fn init(path: Option<&Path>) -> io::Result<()> {
    #[cfg(debug_assertions)]
    {
        use std::fs::OpenOptions;
        use std::sync::Mutex;
        use tracing::Level;

        if let Some(path) = path {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            // 既に subscriber が設定されていても無視する
            let _ = tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = path; // unused variable warning を回避
    }
    Ok(())
}
