//! Whitespace normalization shared by every capability.
//!
//! Policy: trailing whitespace is stripped from each line, then leading and
//! trailing blank lines are dropped. Interior blank lines are kept, so line
//! numbers inside the snippet stay stable relative to its first non-blank
//! line.

pub fn normalize(code: &str) -> String {
    let lines: Vec<&str> = code.lines().map(str::trim_end).collect();

    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());

    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

pub fn is_blank(code: &str) -> bool {
    code.trim().is_empty()
}

/// Number of lines of an already-normalized snippet.
pub fn line_count(code: &str) -> u32 {
    if code.is_empty() {
        0
    } else {
        code.lines().count() as u32
    }
}

/// Finds the line (1-based) closing the brace block that opens at or after
/// `start` (1-based). Falls back to the last line when braces never balance,
/// and to `start` when no brace opens at all.
pub fn brace_block_end(lines: &[&str], start: u32) -> u32 {
    let mut depth: i64 = 0;
    let mut opened = false;

    for (offset, line) in lines.iter().enumerate().skip(start.saturating_sub(1) as usize) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return offset as u32 + 1;
        }
    }

    if opened {
        lines.len().max(1) as u32
    } else {
        start
    }
}

/// Splits a raw parameter list such as `a, b = 2, ...rest` into names.
pub fn split_parameters(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| {
            p.split(['=', ':'])
                .next()
                .unwrap_or("")
                .trim()
                .trim_start_matches("...")
                .trim_start_matches('*')
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_blank_lines_and_trailing_space() {
        let code = "\n\n  let a = 1;   \n\n  a++;\t\n\n";
        assert_eq!(normalize(code), "  let a = 1;\n\n  a++;");
    }

    #[test]
    fn blank_input_normalizes_to_empty() {
        assert_eq!(normalize("  \n\t\n"), "");
        assert!(is_blank(" \n "));
        assert_eq!(line_count(""), 0);
    }

    #[test]
    fn brace_block_end_matches_nested_blocks() {
        let lines = vec![
            "function f(n) {",
            "  if (n) {",
            "    return 1;",
            "  }",
            "}",
            "f(2);",
        ];
        assert_eq!(brace_block_end(&lines, 1), 5);
        assert_eq!(brace_block_end(&lines, 2), 4);
        assert_eq!(brace_block_end(&lines, 6), 6);
    }

    #[test]
    fn parameters_drop_defaults_and_types() {
        assert_eq!(
            split_parameters("a, b = 2, c: number, ...rest"),
            vec!["a", "b", "c", "rest"]
        );
        assert_eq!(split_parameters("self, *args, **kwargs"), vec!["self", "args", "kwargs"]);
        assert!(split_parameters("  ").is_empty());
    }
}
