use std::io::Write;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::contact::ContactRecord;

pub const NAME_WIDTH: usize = 10;
pub const TITLE_WIDTH: usize = 20;
pub const EMAIL_WIDTH: usize = 80;
pub const RULE_WIDTH: usize = 100;
pub const EMPTY_NOTICE: &str = "No contacts found.";
/// Ideographic space, so columns line up next to CJK text.
pub const DEFAULT_FILL: char = '\u{3000}';

/// Where scrape results and operator notices go.
pub trait Present {
    /// Replace whatever is on screen with `records`.
    fn render(&mut self, records: &[ContactRecord]);
    /// Non-fatal notice, e.g. a duplicate email.
    fn warn(&mut self, notice: &str);
    /// Blocking notice, e.g. the page could not be fetched.
    fn error(&mut self, notice: &str);
    /// A fetch for `url` started. Cleared by the next render or notice.
    fn busy(&mut self, _url: &str) {}
}

/// The text region the contacts table is drawn into.
#[derive(Debug, Default)]
pub struct TextView {
    buf: String,
}

impl TextView {
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn push_line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub fn contents(&self) -> &str {
        &self.buf
    }
}

/// Left-aligns `s` in a column of `width` characters using `fill`.
/// Longer text is left as is.
pub fn pad(s: &str, width: usize, fill: char) -> String {
    let len = s.chars().count();
    let mut out = String::with_capacity(s.len() + width.saturating_sub(len) * fill.len_utf8());
    out.push_str(s);
    out.extend(std::iter::repeat(fill).take(width.saturating_sub(len)));
    out
}

fn row(name: &str, title: &str, email: &str, fill: char) -> String {
    format!(
        "{}{}{}",
        pad(name, NAME_WIDTH, fill),
        pad(title, TITLE_WIDTH, fill),
        pad(email, EMAIL_WIDTH, fill)
    )
}

/// Draws the header, rule and one row per record into `view`.
pub fn draw_table(view: &mut TextView, records: &[ContactRecord], fill: char) {
    view.clear();
    view.push_line(&row("Name", "Title", "E-mail", fill));
    view.push_line(&"-".repeat(RULE_WIDTH));
    if records.is_empty() {
        view.push_line(EMPTY_NOTICE);
        return;
    }
    for r in records {
        view.push_line(&row(&r.name, &r.title, &r.email, fill));
    }
}

/// Terminal rendition of the contacts window: the table goes to `out`,
/// notices go to `notices`.
pub struct TerminalPresenter<W: Write, N: Write> {
    view: TextView,
    out: W,
    notices: N,
    fill: char,
    spinner: Option<ProgressBar>,
}

impl<W: Write, N: Write> TerminalPresenter<W, N> {
    pub fn new(out: W, notices: N, fill: char) -> Self {
        TerminalPresenter {
            view: TextView::default(),
            out,
            notices,
            fill,
            spinner: None,
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> &TextView {
        &self.view
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (W, N) {
        (self.out, self.notices)
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn notice(&mut self, level: &str, notice: &str) {
        self.stop_spinner();
        if let Err(e) = writeln!(self.notices, "{level}: {notice}") {
            warn!("Failed to write notice: {}", e);
        }
    }
}

impl<W: Write, N: Write> Present for TerminalPresenter<W, N> {
    fn render(&mut self, records: &[ContactRecord]) {
        self.stop_spinner();
        draw_table(&mut self.view, records, self.fill);
        let written = self
            .out
            .write_all(self.view.contents().as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            warn!("Failed to write contacts table: {}", e);
        }
    }

    fn warn(&mut self, notice: &str) {
        self.notice("warning", notice);
    }

    fn error(&mut self, notice: &str) {
        self.notice("error", notice);
    }

    fn busy(&mut self, url: &str) {
        self.stop_spinner();
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Fetching {url}"));
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }
}
