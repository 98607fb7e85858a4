//! CSV report: one row per query

use crate::batch::{Outcome, QueryOutcome};
use std::io::{self, Write};

pub const HEADER: &str = "name,status,primary,primary_votes,secondary,secondary_votes,error";

pub fn write<W: Write>(writer: &mut W, outcomes: &[QueryOutcome]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for o in outcomes {
        let row = match o.outcome {
            Outcome::Guess(ref g) => [
                escape(&o.name),
                "guessed".to_string(),
                escape(&g.primary),
                g.primary_votes.to_string(),
                g.secondary.as_deref().map(escape).unwrap_or_default(),
                g.secondary_votes.map(|v| v.to_string()).unwrap_or_default(),
                String::new(),
            ],
            Outcome::Unknown => [
                escape(&o.name),
                "unknown".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
            Outcome::Failed(ref reason) => [
                escape(&o.name),
                "failed".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                escape(reason),
            ],
        };
        writeln!(writer, "{}", row.join(","))?;
    }

    Ok(())
}

/// Quote a field if it contains a separator, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::*;

    fn render(outcomes: &[QueryOutcome]) -> String {
        let mut buf = Vec::new();
        write(&mut buf, outcomes).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_rows_per_status() {
        let out = render(&[
            guessed("rock.00001.wav", "rock", 10, Some(("pop", 5))),
            unknown("odd.wav"),
            failed("jazz.00054.wav", "no audio track"),
        ]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "rock.00001.wav,guessed,rock,10,pop,5,");
        assert_eq!(lines[2], "odd.wav,unknown,,,,,");
        assert_eq!(lines[3], "jazz.00054.wav,failed,,,,,no audio track");
    }

    #[test]
    fn test_escapes_commas_and_quotes() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a, b"), "\"a, b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_empty_batch_header_only() {
        assert_eq!(render(&[]), format!("{}\n", HEADER));
    }
}
