/// テキストの 1 行
#[derive(Debug)]
pub struct Row {
    chars: String,
}

impl Row {
    pub fn new(text: String) -> Self {
        Self { chars: text }
    }

    pub fn chars(&self) -> &str {
        &self.chars
    }

    /// 文字数 (バイト数ではない)
    pub fn len(&self) -> usize {
        self.chars.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// 先頭から最大 `width` 文字を返す
    ///
    /// 文字境界で切るのでマルチバイト文字が分断されることはない
    pub fn truncated(&self, width: usize) -> &str {
        if self.len() <= width {
            return &self.chars;
        }
        match self.chars.char_indices().nth(width) {
            Some((end, _)) => &self.chars[..end],
            None => &self.chars,
        }
    }
}

#[derive(Debug)]
pub struct Buffer {
    rows: Vec<Row>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn insert_row(&mut self, at: usize, text: String) {
        if at <= self.rows.len() {
            self.rows.insert(at, Row::new(text));
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }
}
