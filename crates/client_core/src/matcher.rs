//! Answer matching: lowercase, trim, then substring containment.

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// True when the normalized `input` contains at least one normalized accepted answer.
///
/// Blank input never matches, and blank accepted answers are ignored so they
/// cannot match everything.
pub fn is_accepted<S: AsRef<str>>(input: &str, accepted_answers: &[S]) -> bool {
    let input = normalize(input);
    if input.is_empty() {
        return false;
    }

    accepted_answers
        .iter()
        .map(|answer| normalize(answer.as_ref()))
        .filter(|answer| !answer.is_empty())
        .any(|answer| input.contains(&answer))
}
