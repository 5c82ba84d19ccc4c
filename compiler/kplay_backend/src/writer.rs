//! Line-oriented text output shared by the source-printing backends.

#[derive(Debug)]
pub(crate) struct CodeWriter {
    out: String,
    depth: usize,
    /// One level of indentation.
    unit: &'static str,
}

impl CodeWriter {
    pub(crate) fn new(unit: &'static str) -> Self {
        CodeWriter {
            out: String::new(),
            depth: 0,
            unit,
        }
    }

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(self.unit);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
