//! Minimal PDF 1.4 writer
//!
//! Enough of the format for text-only A4 documents: the two standard
//! Helvetica faces with WinAnsi encoding, word-wrapped lines, automatic page
//! breaks and a footer repeated on every page.

use std::fmt::Write as _;

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 48.0;

/// Lowest baseline body text may use; below is the footer area
const BODY_BOTTOM: f32 = 110.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Gray level of secondary text
const MUTED: f32 = 0.35;

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    font: Font,
    muted: bool,
    text: String,
}

/// A line of the footer block, drawn bottom-up from `y`
#[derive(Debug, Clone)]
pub struct FooterLine {
    pub y: f32,
    pub size: f32,
    pub font: Font,
    pub muted: bool,
    pub text: String,
}

/// Lays text out top to bottom, breaking pages as needed
pub struct PdfWriter {
    pages: Vec<Vec<TextRun>>,
    y: f32,
    footer: Vec<FooterLine>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
            footer: Vec::new(),
        }
    }

    pub fn set_footer(&mut self, footer: Vec<FooterLine>) {
        self.footer = footer;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < BODY_BOTTOM {
            self.new_page();
        }
    }

    /// Draw one line at the cursor and move down by `advance`
    pub fn line(&mut self, x_offset: f32, text: &str, size: f32, font: Font, muted: bool, advance: f32) {
        self.ensure_room(size);
        let run = TextRun {
            x: MARGIN + x_offset,
            y: self.y,
            size,
            font,
            muted,
            text: text.to_string(),
        };
        if let Some(page) = self.pages.last_mut() {
            page.push(run);
        }
        self.y -= advance;
    }

    /// Word-wrapped paragraph
    pub fn paragraph(&mut self, text: &str, size: f32, font: Font, max_chars: usize) {
        for line in wrap_text(text, max_chars) {
            self.line(0.0, &line, size, font, false, size + 3.0);
        }
    }

    /// Bulleted item; continuation lines are indented under the text
    pub fn bullet(&mut self, text: &str, max_chars: usize) {
        let lines = wrap_text(text, max_chars);
        for (i, line) in lines.iter().enumerate() {
            self.ensure_room(11.0);
            if i == 0 {
                if let Some(page) = self.pages.last_mut() {
                    page.push(TextRun {
                        x: MARGIN,
                        y: self.y,
                        size: 11.0,
                        font: Font::Regular,
                        muted: false,
                        text: "•".to_string(),
                    });
                }
            }
            self.line(14.0, line, 11.0, Font::Regular, false, 14.0);
        }
    }

    pub fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    /// Serialize every page with its footer and a page counter
    pub fn finish(self) -> Vec<u8> {
        let total = self.pages.len();
        let mut contents = Vec::with_capacity(total);
        for (index, runs) in self.pages.iter().enumerate() {
            let mut stream = String::new();
            for run in runs {
                push_text(&mut stream, run);
            }
            for line in &self.footer {
                push_text(
                    &mut stream,
                    &TextRun {
                        x: MARGIN,
                        y: line.y,
                        size: line.size,
                        font: line.font,
                        muted: line.muted,
                        text: line.text.clone(),
                    },
                );
            }
            if total > 1 {
                push_text(
                    &mut stream,
                    &TextRun {
                        x: PAGE_WIDTH - MARGIN - 20.0,
                        y: 14.0,
                        size: 8.0,
                        font: Font::Regular,
                        muted: true,
                        text: format!("{}/{}", index + 1, total),
                    },
                );
            }
            contents.push(stream);
        }
        assemble(&contents)
    }
}

fn push_text(stream: &mut String, run: &TextRun) {
    let gray = if run.muted { MUTED } else { 0.0 };
    let _ = writeln!(
        stream,
        "BT /{} {:.1} Tf {:.2} g {:.2} {:.2} Td <{}> Tj ET",
        run.font.resource(),
        run.size,
        gray,
        run.x,
        run.y,
        hex(&encode_win_ansi(&run.text))
    );
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02X}", b);
        out
    })
}

/// Map text onto the WinAnsi code page; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{a0}' | '\u{202f}' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'œ' => 0x9C,
            'Œ' => 0x8C,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap on a character budget
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Write the object graph, cross-reference table and trailer
fn assemble(contents: &[String]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3-4 fonts, then page + content per page
    let page_ids: Vec<usize> = (0..contents.len()).map(|i| 5 + i * 2).collect();
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + contents.len() * 2);

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).into_bytes());
    for base in ["Helvetica", "Helvetica-Bold"] {
        objects.push(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                base
            )
            .into_bytes(),
        );
    }
    for (content, page_id) in contents.iter().zip(&page_ids) {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_id + 1
            )
            .into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content.as_bytes());
        stream.extend_from_slice(b"endstream");
        objects.push(stream);
    }

    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    );
    out.extend_from_slice(xref.as_bytes());
    out
}
