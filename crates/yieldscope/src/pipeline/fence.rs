//! Removal of incidental markdown code-fence wrapping from otherwise
//! structured upstream replies.

/// Strip one leading/trailing triple-backtick wrapping, if present.
///
/// The opening line may carry a language tag ("```json"). Only wrapping at
/// the very start and end of the text is removed; backtick sequences inside
/// the content are left alone, and unbalanced fences leave the input
/// untouched apart from whitespace trimming. Stripping is idempotent.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the rest of the opening line (language tag or nothing).
    let Some(newline) = after_open.find('\n') else {
        return trimmed;
    };
    let body = after_open[newline + 1..].trim_end();

    let Some(inner) = body.strip_suffix("```") else {
        return trimmed;
    };
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fences() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_fences_with_language_tag() {
        assert_eq!(
            strip_code_fences("```json\n{\"average_rent\": 2600}\n```"),
            "{\"average_rent\": 2600}"
        );
    }

    #[test]
    fn unwrapped_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn stripping_is_idempotent() {
        let wrapped = "```json\n{\"a\":1}\n```";
        let once = strip_code_fences(wrapped);
        assert_eq!(strip_code_fences(once), once);
    }

    #[test]
    fn interior_backticks_are_preserved() {
        let text = "{\"note\": \"use ``` to fence\"}";
        assert_eq!(strip_code_fences(text), text);

        let wrapped = "```\n{\"note\": \"use ``` to fence\"}\n```";
        assert_eq!(strip_code_fences(wrapped), "{\"note\": \"use ``` to fence\"}");
    }

    #[test]
    fn unbalanced_fences_are_left_alone() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "```json\n{\"a\":1}");
        assert_eq!(strip_code_fences("```"), "```");
    }
}
