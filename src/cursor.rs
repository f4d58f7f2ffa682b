/// 画面上のカーソル位置 (0 始まり)
///
/// 移動はビューポートの端でクランプされる
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    x: u16,
    y: u16,
}

impl Cursor {
    pub fn new() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn move_up(&mut self) {
        if self.y > 0 {
            self.y -= 1;
        }
    }

    pub fn move_down(&mut self, max_rows: u16) {
        if self.y + 1 < max_rows {
            self.y += 1;
        }
    }

    pub fn move_left(&mut self) {
        if self.x > 0 {
            self.x -= 1;
        }
    }

    pub fn move_right(&mut self, max_cols: u16) {
        if self.x + 1 < max_cols {
            self.x += 1;
        }
    }

    /// 行頭へ
    pub fn move_to_line_start(&mut self) {
        self.x = 0;
    }

    /// 画面の右端へ
    pub fn move_to_line_end(&mut self, max_cols: u16) {
        self.x = max_cols.saturating_sub(1);
    }
}
