//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY: one indicatif bar per batch file, counting records.
//! Non-TTY: hidden bars; the log is the only progress output.

use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Per-batch bar: file name, records done / total, failure note
fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<24.dim} {bar:30.green/dim} {pos:>7}/{len:7} {per_sec:>10} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Owns the MultiProgress all batch bars and log lines go through.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Detect TTY on stderr.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    pub fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Bar for one batch of `records` records; hidden when not a TTY.
    pub fn batch_bar(&self, name: &str, records: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(records));
        pb.set_style(batch_style());
        pb.set_prefix(truncate_label(name, 24).to_string());
        pb
    }

    /// Print above managed bars.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For the log bridge
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// Keep the tail of long file names, cut on a char boundary.
pub fn truncate_label(name: &str, max: usize) -> &str {
    let count = name.chars().count();
    if count <= max {
        return name;
    }
    let skip = count - max;
    let start = name
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &name[start..]
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_values() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn truncate_label_keeps_tail() {
        assert_eq!(truncate_label("short.xml", 24), "short.xml");
        assert_eq!(truncate_label("arXiv_oai_dc_2007.xml.gz", 10), "007.xml.gz");
    }

    #[test]
    fn truncate_label_multibyte() {
        assert_eq!(truncate_label("ééééé", 2), "éé");
    }

    #[test]
    fn non_tty_bars_hidden() {
        let ctx = ProgressContext::with_tty(false);
        let pb = ctx.batch_bar("batch.xml", 10);
        assert!(pb.is_hidden());
        assert!(!ctx.is_tty());
    }
}
