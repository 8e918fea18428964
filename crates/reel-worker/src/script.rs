//! Narration text fitting.
//!
//! Segment text is sized toward the word budget of its target duration
//! before synthesis so generated audio lands near the intended length.

use reel_models::GenerationTask;

/// Texts shorter than this share of the word budget get a filler sentence.
const SHORT_TEXT_RATIO: f64 = 0.6;

/// A sentence break this far into the budget is preferred over a hard cut.
const SENTENCE_CUT_RATIO: f64 = 0.7;

/// Fit a task's text to its word budget.
pub fn fit_task(mut task: GenerationTask) -> GenerationTask {
    let target = task.target_words();
    task.text = fit_text(&task.text, target, task.segment.filler());
    task
}

/// Truncate `text` to `target_words` ending on terminal punctuation, or pad
/// markedly short text with `filler`.
pub fn fit_text(text: &str, target_words: usize, filler: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || target_words == 0 {
        return words.join(" ");
    }

    if words.len() > target_words {
        return truncate_words(&words, target_words);
    }

    let mut out = words.join(" ");
    if (words.len() as f64) < target_words as f64 * SHORT_TEXT_RATIO {
        close_sentence(&mut out);
        out.push(' ');
        out.push_str(filler);
    }
    out
}

fn truncate_words(words: &[&str], target_words: usize) -> String {
    let kept = &words[..target_words];
    let min_keep = (target_words as f64 * SENTENCE_CUT_RATIO).ceil() as usize;

    // Prefer ending on the last full sentence if it keeps enough of the budget.
    let sentence_end = kept
        .iter()
        .rposition(|w| ends_sentence(w))
        .filter(|idx| idx + 1 >= min_keep);

    let mut out = match sentence_end {
        Some(idx) => kept[..=idx].join(" "),
        None => kept.join(" "),
    };
    close_sentence(&mut out);
    out
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(|c: char| matches!(c, '.' | '!' | '?'))
}

fn close_sentence(text: &mut String) {
    let trimmed_len = text
        .trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '-'))
        .len();
    text.truncate(trimmed_len);
    if !ends_sentence(text) {
        text.push('.');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::SegmentKey;

    fn words(n: usize) -> String {
        (1..=n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_long_text_is_cut_with_punctuation() {
        let out = fit_text(&words(40), 25, "Filler.");
        assert_eq!(out.split_whitespace().count(), 25);
        assert!(out.ends_with("w25."));
    }

    #[test]
    fn test_long_text_prefers_sentence_break() {
        let text = format!("{} end. {}", words(19), words(20));
        let out = fit_text(&text, 25, "Filler.");
        assert!(out.ends_with("end."));
        assert_eq!(out.split_whitespace().count(), 20);
    }

    #[test]
    fn test_trailing_comma_replaced() {
        let text = format!("{}, and more words", words(4));
        assert_eq!(fit_text(&text, 4, "x"), "w1 w2 w3 w4.");
    }

    #[test]
    fn test_short_text_gets_filler() {
        let out = fit_text("Great pick", 25, "It is well worth a look.");
        assert_eq!(out, "Great pick. It is well worth a look.");
    }

    #[test]
    fn test_adequate_text_unchanged() {
        let text = words(20);
        assert_eq!(fit_text(&text, 25, "Filler."), text);
    }

    #[test]
    fn test_fit_task_uses_segment_budget() {
        let task = fit_task(GenerationTask::new(SegmentKey::Intro, words(30)));
        assert_eq!(task.text.split_whitespace().count(), 15);
    }
}
