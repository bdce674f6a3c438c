//! # TP formatter
//!
//! Rewrites the `/MN` section of a listing so that block structure shows as indentation,
//! and the branches of a `SELECT` line up.  The header through `/MN`, and everything from
//! `/POS` onward, is copied verbatim.
//!
//! Every instruction is written back as `   1:` followed by the indented instruction and ` ;`.
//! The controller renumbers lines when the listing is loaded, so the number is not preserved.
//! Motion instructions get no extra margin, all other instructions get two spaces, matching
//! the way the controller prints listings.

use lsp_types as lsp;
use regex::Regex;
use crate::lang::settings::Settings;
use crate::lang::workspace::end_of_text;

const RCH: &str = "unreachable was reached";
const LINE_PREFIX: &str = "   1:";

enum BodyLine {
    /// physical line with nothing on it
    Empty,
    /// instruction text without the line number or terminator
    Code(String)
}

#[derive(Default)]
struct SelectBlock {
    max_eq: usize,
    max_comma: usize
}

pub struct Formatter {
    default_tab_size: usize,
    wrapper: Regex,
    line_number: Regex,
    select: Regex,
    case: Regex,
    case_else: Regex,
    bare_else: Regex,
    if_then: Regex,
    for_loop: Regex,
    end_block: Regex,
    motion: Regex
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}

impl Formatter {
    pub fn new() -> Self {
        Self {
            default_tab_size: 2,
            wrapper: Regex::new(r"^\s*\d+:\s*(.*?)\s*;\s*$").expect(RCH),
            line_number: Regex::new(r"^\s*\d+:").expect(RCH),
            select: Regex::new(r"(?i)^SELECT\b").expect(RCH),
            case: Regex::new(r"(?i)^(SELECT\b[^=,]*|)=([^,]*),(.*)$").expect(RCH),
            case_else: Regex::new(r"(?i)^ELSE\s*,\s*(.*)$").expect(RCH),
            bare_else: Regex::new(r"(?i)^ELSE$").expect(RCH),
            if_then: Regex::new(r"(?i)^IF\b.*\bTHEN$").expect(RCH),
            for_loop: Regex::new(r"(?i)^FOR\b").expect(RCH),
            end_block: Regex::new(r"(?i)^END(IF|FOR)\b").expect(RCH),
            motion: Regex::new(r"(?i)^[JLCA]\s").expect(RCH)
        }
    }
    pub fn set_config(&mut self, settings: &Settings) {
        self.default_tab_size = settings.tab_size();
    }
    fn body_line(&self, line: &str) -> BodyLine {
        if line.trim().len() == 0 {
            return BodyLine::Empty;
        }
        match self.wrapper.captures(line) {
            Some(caps) => BodyLine::Code(caps[1].to_string()),
            None => {
                // unterminated, or not numbered at all
                let code = self.line_number.replace(line,"");
                BodyLine::Code(code.trim().trim_end_matches(';').trim_end().to_string())
            }
        }
    }
    /// Find the select blocks, returning the blocks and the block membership of each line
    fn scan_selects(&self, body: &[BodyLine]) -> (Vec<SelectBlock>,Vec<Option<usize>>) {
        let mut blocks: Vec<SelectBlock> = Vec::new();
        let mut membership = vec![None;body.len()];
        let mut curr: Option<usize> = None;
        for (i,line) in body.iter().enumerate() {
            let code = match line {
                BodyLine::Empty => "",
                BodyLine::Code(s) => s.as_str()
            };
            if self.select.is_match(code) {
                blocks.push(SelectBlock::default());
                curr = Some(blocks.len()-1);
            } else if curr.is_some() && code.len() > 0 && !self.case.is_match(code) && !self.case_else.is_match(code) {
                curr = None;
            }
            membership[i] = curr;
            if let (Some(b),Some(caps)) = (curr,self.case.captures(code)) {
                let eq = caps[1].trim_end().chars().count();
                blocks[b].max_eq = usize::max(blocks[b].max_eq,eq);
            }
        }
        // commas can only be placed once the equal signs are settled
        for (i,line) in body.iter().enumerate() {
            if let (Some(b),BodyLine::Code(code)) = (membership[i],line) {
                if let Some(caps) = self.case.captures(code) {
                    let comma = blocks[b].max_eq + 1 + caps[2].trim().chars().count();
                    blocks[b].max_comma = usize::max(blocks[b].max_comma,comma);
                }
            }
        }
        (blocks,membership)
    }
    /// Align a line that belongs to a select block
    fn align(&self, code: &str, block: &SelectBlock) -> String {
        if let Some(caps) = self.case.captures(code) {
            let left = caps[1].trim_end();
            let pad = block.max_eq.saturating_sub(left.chars().count());
            return format!("{}{}={},{}",left,spaces(pad),caps[2].trim(),caps[3].trim_start());
        }
        if let Some(caps) = self.case_else.captures(code) {
            return format!("{}ELSE,{}",spaces(block.max_comma.saturating_sub(4)),&caps[1]);
        }
        code.to_string()
    }
    /// Format the body lines, the indentation level lives only for the duration of this call
    fn format_body(&self, body: &[BodyLine], tab_size: usize) -> Vec<String> {
        let (blocks,membership) = self.scan_selects(body);
        let mut ans = Vec::new();
        let mut indent: usize = 0;
        for (i,line) in body.iter().enumerate() {
            let code = match line {
                BodyLine::Empty => {
                    ans.push(String::new());
                    continue;
                },
                BodyLine::Code(s) => s.as_str()
            };
            if self.end_block.is_match(code) {
                indent = indent.saturating_sub(1);
            }
            let level = match self.bare_else.is_match(code) {
                true => indent.saturating_sub(1),
                false => indent
            };
            let text = match membership[i] {
                Some(b) => self.align(code,&blocks[b]),
                None => code.to_string()
            };
            let extra = match self.motion.is_match(code) {
                true => 0,
                false => 2
            };
            ans.push(format!("{}{}{} ;",LINE_PREFIX,spaces(extra + level*tab_size),text));
            if self.if_then.is_match(code) || self.for_loop.is_match(code) {
                indent += 1;
            }
        }
        ans
    }
    /// Format a complete listing.  Returns `None` if the text lacks either the `/MN` or `/POS` marker,
    /// in which case the document should be left alone.
    pub fn format(&self, content: &str, options: &lsp::FormattingOptions) -> Option<String> {
        let newline = match content.contains("\r\n") {
            true => "\r\n",
            false => "\n"
        };
        let had_final_newline = content.ends_with('\n');
        let normalized = crate::lang::normalize_newlines(content);
        let mut lines: Vec<&str> = normalized.split('\n').collect();
        if had_final_newline {
            lines.pop();
        }
        let is_marker = |line: &str, marker: &str| line.trim_start().to_uppercase().starts_with(marker);
        let mn = lines.iter().position(|l| is_marker(l,"/MN"))?;
        let pos = lines.iter().position(|l| is_marker(l,"/POS"))?;
        if pos < mn {
            return None;
        }
        let tab_size = match options.tab_size {
            0 => self.default_tab_size,
            n => n as usize
        };
        let body: Vec<BodyLine> = lines[mn+1..pos].iter().map(|l| self.body_line(l)).collect();
        let mut out: Vec<String> = Vec::new();
        out.extend(lines[0..=mn].iter().map(|l| l.to_string()));
        out.append(&mut self.format_body(&body,tab_size));
        out.extend(lines[pos..].iter().map(|l| l.to_string()));
        if options.trim_final_newlines == Some(true) {
            while out.len() > 0 && out[out.len()-1].trim().len() == 0 {
                out.pop();
            }
        }
        let mut ans = out.join(newline);
        if had_final_newline || options.insert_final_newline == Some(true) {
            ans += newline;
        }
        Some(ans)
    }
    /// Edits for a formatting request: one edit replacing the whole document,
    /// or nothing if the listing lacks its markers or is already formatted.
    pub fn format_edits(&self, content: &str, options: &lsp::FormattingOptions) -> Vec<lsp::TextEdit> {
        match self.format(content,options) {
            Some(ans) if ans != content => {
                let rng = lsp::Range::new(lsp::Position::new(0,0),end_of_text(content));
                vec![lsp::TextEdit::new(rng,ans)]
            },
            _ => Vec::new()
        }
    }
}
