// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Line-based writer for generated ObjC text with indentation tracking.

use std::fmt::Display;

const INDENT: &str = "  ";

/// Collects generated text; indentation is applied at the start of every
/// non-empty line.
#[derive(Debug, Default)]
pub struct ObjcWriter {
    out: String,
    indent: usize,
    at_line_start: bool,
}

impl ObjcWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            at_line_start: true,
        }
    }

    /// Write a string, handling indentation at line starts.
    pub fn write(&mut self, s: &str) {
        for (i, part) in s.split('\n').enumerate() {
            if i > 0 {
                self.out.push('\n');
                self.at_line_start = true;
            }
            if part.is_empty() {
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.indent {
                    self.out.push_str(INDENT);
                }
                self.at_line_start = false;
            }
            self.out.push_str(part);
        }
    }

    /// Write a complete line (adds newline at end).
    pub fn line(&mut self, s: &str) {
        self.write(s);
        self.newline();
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    /// Ensure the output ends with an empty line, unless nothing was written
    pub fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            if !self.at_line_start {
                self.newline();
            }
            self.newline();
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write ` {`, the body one level deeper, then `}` on its own line.
    pub fn braced<F: FnOnce(&mut Self)>(&mut self, body: F) {
        self.line(" {");
        self.indent();
        body(self);
        self.dedent();
        self.write("}");
    }

    /// Lets `write!(w, ...)` target the writer.
    pub fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        self.write(&args.to_string());
    }

    /// Write a formatted line (adds newline at end).
    pub fn line_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        self.line(&args.to_string());
    }

    /// Write items separated by a separator string.
    pub fn sep<I, T>(&mut self, separator: &str, items: I)
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        self.sep_with(separator, items, |w, item| w.write(&item.to_string()));
    }

    /// Write items with a separator, using a custom render function for each item.
    pub fn sep_with<I, T, F>(&mut self, separator: &str, items: I, mut render: F)
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&mut Self, T),
    {
        let mut first = true;
        for item in items {
            if !first {
                self.write(separator);
            }
            first = false;
            render(self, item);
        }
    }

    /// Write items each on their own line using a render function.
    pub fn lines_with<I, T, F>(&mut self, items: I, mut render: F)
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&mut Self, T),
    {
        for item in items {
            render(self, item);
            self.newline();
        }
    }

    pub fn into_inner(self) -> String {
        self.out
    }
}

/// Render to a string with a fresh writer.
pub fn render_to_string<F>(f: F) -> String
where
    F: FnOnce(&mut ObjcWriter),
{
    let mut writer = ObjcWriter::new();
    f(&mut writer);
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_non_empty_lines_only() {
        let text = render_to_string(|w| {
            w.write("- (void)run");
            w.braced(|w| {
                w.line("a();");
                w.newline();
                w.line("b();");
            });
            w.newline();
        });
        assert_eq!(text, "- (void)run {\n  a();\n\n  b();\n}\n");
    }

    #[test]
    fn separators_and_blank_lines() {
        let text = render_to_string(|w| {
            w.blank_line();
            w.sep(", ", ["a", "b"]);
            w.blank_line();
            w.blank_line();
            write!(w, "{}", 1);
        });
        assert_eq!(text, "a, b\n\n1");
    }
}
