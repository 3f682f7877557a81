//! Parse model-written quizzes into questions

use super::QuizQuestion;
use once_cell::sync::Lazy;
use regex::Regex;

static OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([A-Za-z])[\)\.:]\s*(.+)$").expect("option pattern is valid")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:question\s*)?\d+\s*[\.:\)]?\s*").expect("number pattern is valid")
});

/// Parse blank-line separated question blocks.
///
/// Each block is a question line, option lines (`A) ...`, `B. ...`, or bare
/// lines), and a `Correct Answer: ...` line naming the option by letter or
/// text. Blocks with fewer than two options or an answer that matches no
/// option are skipped.
pub fn parse_questions(text: &str) -> Vec<QuizQuestion> {
    let normalized = text.replace("\r\n", "\n");
    let mut questions = Vec::new();

    for block in split_blocks(&normalized) {
        let lines: Vec<String> = block
            .iter()
            .map(|l| l.replace("**", "").trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        let Some(answer_pos) = lines.iter().position(|l| is_answer_line(l)) else {
            continue;
        };
        let Some(answer) = lines[answer_pos].split_once(':').map(|(_, a)| a.trim()) else {
            continue;
        };

        let body = &lines[..answer_pos];
        let mut rest = body.iter();
        let mut question = String::new();
        for line in rest.by_ref() {
            let stripped = NUMBER_RE.replace(line, "").trim().to_string();
            if !stripped.is_empty() {
                question = stripped;
                break;
            }
        }
        if question.is_empty() {
            continue;
        }

        let mut labels = Vec::new();
        let mut options = Vec::new();
        for line in rest {
            let line = line.trim_start_matches(['-', '*', '•']).trim();
            match OPTION_RE.captures(line) {
                Some(caps) => {
                    labels.push(caps[1].to_ascii_uppercase());
                    options.push(caps[2].trim().to_string());
                }
                None => {
                    labels.push(String::new());
                    options.push(line.to_string());
                }
            }
        }

        if options.len() < 2 {
            continue;
        }

        if let Some(answer_index) = resolve_answer(answer, &labels, &options) {
            questions.push(QuizQuestion {
                question,
                options,
                answer_index,
            });
        }
    }

    questions
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_answer_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.starts_with("correct answer") || lower.starts_with("answer:")
}

/// Match `B`, `B)`, `(B) Paris` or `Paris` against the options
fn resolve_answer(answer: &str, labels: &[String], options: &[String]) -> Option<usize> {
    let answer = answer.trim();
    let mut chars = answer.trim_start_matches('(').chars();

    if let Some(first) = chars.next().filter(|c| c.is_ascii_alphabetic()) {
        let next = chars.next();
        if next.map_or(true, |c| matches!(c, ')' | '.' | ':' | ' ')) {
            let label = first.to_ascii_uppercase().to_string();
            if let Some(idx) = labels.iter().position(|l| *l == label) {
                return Some(idx);
            }
        }
    }

    let lower = answer.to_lowercase();
    options
        .iter()
        .position(|o| o.to_lowercase() == lower)
        .or_else(|| {
            options
                .iter()
                .position(|o| !o.is_empty() && lower.contains(&o.to_lowercase()))
        })
}
