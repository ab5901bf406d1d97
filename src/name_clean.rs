/// Best-effort cleanup of an athlete name cell.
///
/// Quotes go, whitespace collapses, a stray leading initial in front of a
/// full name is dropped, and the results-site rendering bug that doubles the
/// first letter and glues first and last name together ("TTommyVolinsky")
/// is undone. Missing input yields an empty string.
pub fn clean_athlete_name(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let without_quotes = raw.replace('"', "");
    let mut parts = without_quotes.split_whitespace().collect::<Vec<_>>();
    if parts.len() >= 3 && is_single_letter(parts[0]) {
        parts.remove(0);
    }
    let cleaned = parts.join(" ");

    match split_doubled_initial(&cleaned) {
        Some((first, rest)) => format!("{first} {rest}").trim().to_string(),
        None => cleaned,
    }
}

fn is_single_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_alphabetic())
}

// Recognises `XX` (or `XXX`) + `Xxxx` + `Yyyy...` and returns the two word runs.
fn split_doubled_initial(name: &str) -> Option<(&str, &str)> {
    let bytes = name.as_bytes();
    let initial = *bytes.first()?;
    if !initial.is_ascii_uppercase() || bytes.get(1) != Some(&initial) {
        return None;
    }

    // The first word run starts at the last repeat of the initial.
    let mut start = 1;
    if bytes.get(2) == Some(&initial) {
        start = 2;
    }
    let rest = &name[start..];
    let rest_bytes = rest.as_bytes();

    let first_len = word_run_len(rest_bytes)?;
    let second = &rest[first_len..];
    word_run_len(second.as_bytes())?;
    Some((&rest[..first_len], second))
}

// Length of a leading `[A-Z][a-z]+` run.
fn word_run_len(bytes: &[u8]) -> Option<usize> {
    if !bytes.first()?.is_ascii_uppercase() {
        return None;
    }
    let lower = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_lowercase())
        .count();
    (lower > 0).then_some(1 + lower)
}
