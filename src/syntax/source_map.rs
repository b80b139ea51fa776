use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::syntax::nodes::Stylesheet;
use crate::syntax::printer::{Marker, Printer};

const BASE64_DIGITS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Version 3 source map, fields in the conventional order
#[derive(Debug, Serialize)]
struct SourceMap<'a> {
    version: u8,
    sources: [&'a str; 1],
    names: [&'a str; 0],
    mappings: String,
    file: &'a str,
    #[serde(rename = "sourcesContent")]
    sources_content: [&'a str; 1],
}

/// Print the stylesheet followed by an inline source map comment pointing back at `source_name`,
/// with the original text embedded
pub fn print_with_map(sheet: &Stylesheet, source_name: &str) -> String {
    let mut printer = Printer::new(true);
    printer.stylesheet(sheet);
    let markers = printer.markers.take().unwrap_or_default();
    let map = SourceMap {
        version: 3,
        sources: [source_name],
        names: [],
        mappings: encode_mappings(&markers, &LineIndex::new(&sheet.input)),
        file: source_name,
        sources_content: [&*sheet.input],
    };
    let json = serde_json::to_string(&map).expect("source map only contains strings and numbers");
    format!(
        "{}\n/*# sourceMappingURL=data:application/json;base64,{} */",
        printer.out,
        STANDARD.encode(json)
    )
}

/// Converts byte offsets to 0-based (line, UTF-16 column)
struct LineIndex<'a> {
    input: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(input: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { input, line_starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let column = self.input[line_start..offset.min(self.input.len())]
            .chars()
            .map(char::len_utf16)
            .sum();
        (line, column)
    }
}

fn encode_mappings(markers: &[Marker], lines: &LineIndex<'_>) -> String {
    let mut out = String::new();
    let mut generated_line = 0;
    let mut previous_generated_column = 0i64;
    let mut previous_original = (0i64, 0i64);
    let mut first_in_line = true;
    for marker in markers {
        while generated_line < marker.generated_line {
            out.push(';');
            generated_line += 1;
            previous_generated_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;
        let (original_line, original_column) = lines.position(marker.original_offset);
        let (original_line, original_column) = (original_line as i64, original_column as i64);
        encode_vlq(&mut out, marker.generated_column as i64 - previous_generated_column);
        // Only one source
        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, original_line - previous_original.0);
        encode_vlq(&mut out, original_column - previous_original.1);
        previous_generated_column = marker.generated_column as i64;
        previous_original = (original_line, original_column);
    }
    out
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if vlq == 0 {
            break
        }
    }
}
