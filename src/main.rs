use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use gonk::editor::Editor;
use gonk::file_io::FileIO;
use gonk::key::KeyDecoder;
use gonk::logger;
use gonk::terminal::Terminal;

/// A tiny terminal text viewer
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// File to open (only the first line is loaded)
    filename: PathBuf,

    /// Write debug logs to this file (debug builds only)
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.log.as_deref()).context("failed to open log file")?;

    // raw mode に入る前にファイルを読む
    let buffer = FileIO::open(&cli.filename)?;

    // raw mode 切り替え (drop で元に戻る)
    let mut terminal = Terminal::new().context("failed to initialise terminal")?;
    let mut editor = Editor::new(buffer, terminal.size());

    let mut keys = KeyDecoder::new(io::stdin().lock());
    editor.run(&mut keys, terminal.stdout())?;

    // 終了時に画面をクリアして端末を元に戻す
    terminal
        .restore()
        .context("failed to restore terminal mode")?;
    println!("exiting...");

    Ok(())
}
