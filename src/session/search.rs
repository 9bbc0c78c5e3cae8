//! Client-side log search.
//!
//! Both functions are total: empty input, an empty term or no match simply
//! yield the input back.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub highlighted: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: false,
        }
    }

    pub fn matched(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: true,
        }
    }
}

fn is_blank(term: &str) -> bool {
    term.trim().is_empty()
}

/// Lines containing `term`, compared case-insensitively, in buffer order.
pub fn filter<'a, I>(lines: I, term: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    if is_blank(term) {
        return lines.into_iter().map(String::as_str).collect();
    }

    let (needle, _) = fold(term);

    lines
        .into_iter()
        .filter(|line| fold(line).0.contains(&needle))
        .map(String::as_str)
        .collect()
}

/// Lowercased copy of `line` plus, for each of its bytes, the offset of the
/// originating character in `line`. Lowercasing is per character, with final
/// sigma folded to `σ`, so terms and lines share one projection.
fn fold(line: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(line.len());
    let mut origin = Vec::with_capacity(line.len());

    for (offset, c) in line.char_indices() {
        for lower in c.to_lowercase() {
            let lower = if lower == 'ς' { 'σ' } else { lower };
            folded.push(lower);
            origin.extend(std::iter::repeat(offset).take(lower.len_utf8()));
        }
    }

    (folded, origin)
}

/// Splits `line` into plain and matched segments. The scan restarts after each
/// match end, so matches never overlap.
pub fn highlight(line: &str, term: &str) -> Vec<Segment> {
    if is_blank(term) || line.is_empty() {
        return vec![Segment::plain(line)];
    }

    let (needle, _) = fold(term);
    let (folded, origin) = fold(line);

    let to_original = |folded_offset: usize| {
        origin
            .get(folded_offset)
            .copied()
            .unwrap_or(line.len())
    };

    let mut segments = Vec::new();
    let mut last = 0;
    let mut cursor = 0;

    while let Some(found) = folded[cursor..].find(&needle) {
        let start = cursor + found;
        let end = start + needle.len();

        let (original_start, original_end) = (to_original(start), to_original(end));

        if last < original_start && original_start < original_end {
            segments.push(Segment::plain(&line[last..original_start]));
        }

        if original_start < original_end && last <= original_start {
            segments.push(Segment::matched(&line[original_start..original_end]));
            last = original_end;
        }

        cursor = end;
    }

    if last < line.len() {
        segments.push(Segment::plain(&line[last..]));
    }

    segments
}
