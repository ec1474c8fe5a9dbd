//! Emoji-only message rule.
//!
//! A body is acceptable when, after removing every run of emoji graphemes,
//! nothing but whitespace remains. Runs are built from `Emoji_Presentation`
//! code points, `Emoji` code points forced to emoji rendering by VS16, and the
//! zero-width joiner that glues multi-person and multi-part sequences. A run
//! must contain at least one emoji, so a joiner on its own is never stripped.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ContentRejection;

// Alternation is leftmost-first, so VS16 pairs are tried before bare
// presentation emoji.
const EMOJI: &str = r"\p{Emoji}\x{FE0F}|\p{Emoji_Presentation}";
const ZWJ: &str = r"\x{200D}";

fn emoji_runs() -> &'static Regex {
    static EMOJI_RUN_RE: OnceLock<Regex> = OnceLock::new();
    EMOJI_RUN_RE.get_or_init(|| {
        let pattern = format!("(?:{EMOJI}|{ZWJ})*(?:{EMOJI})(?:{EMOJI}|{ZWJ})*");
        Regex::new(&pattern).expect("valid emoji run regex")
    })
}

pub fn check(body: &str) -> Result<(), ContentRejection> {
    if body.trim().is_empty() {
        return Err(ContentRejection::Empty);
    }

    let residue = emoji_runs().replace_all(body, "");
    if residue.trim().is_empty() {
        Ok(())
    } else {
        Err(ContentRejection::NonEmoji)
    }
}

pub fn is_acceptable(body: &str) -> bool {
    check(body).is_ok()
}
