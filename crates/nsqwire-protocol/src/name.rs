//! Topic and channel name rules.
//!
//! A valid name is 1 to 64 bytes long, drawn from `[.a-zA-Z0-9_-]`, and may
//! end with the literal `#ephemeral` suffix (counted in the length).

/// Maximum length of a topic or channel name, suffix included.
pub const MAX_NAME_LEN: usize = 64;

/// Suffix marking a topic or channel for cleanup once unused.
pub const EPHEMERAL_SUFFIX: &str = "#ephemeral";

/// Returns true if `topic` is a well-formed topic name.
pub fn valid_topic_name(topic: &str) -> bool {
    is_valid_name(topic)
}

/// Returns true if `channel` is a well-formed channel name.
pub fn valid_channel_name(channel: &str) -> bool {
    is_valid_name(channel)
}

fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let base = name.strip_suffix(EPHEMERAL_SUFFIX).unwrap_or(name);
    !base.is_empty() && base.bytes().all(is_name_byte)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["t", "test", "a.b_c-d", "UPPER.lower-123", "..", "-_-"] {
            assert!(valid_topic_name(name), "{name} should be valid");
            assert!(valid_channel_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn accepts_ephemeral_suffix() {
        assert!(valid_topic_name("events#ephemeral"));
        assert!(valid_channel_name("c#ephemeral"));
    }

    #[test]
    fn rejects_empty_and_bare_suffix() {
        assert!(!valid_topic_name(""));
        assert!(!valid_channel_name("#ephemeral"));
    }

    #[test]
    fn rejects_doubled_suffix() {
        assert!(!valid_topic_name("t#ephemeral#ephemeral"));
    }

    #[test]
    fn rejects_misplaced_or_partial_suffix() {
        assert!(!valid_topic_name("t#ephemeralx"));
        assert!(!valid_topic_name("t#ephem"));
        assert!(!valid_topic_name("#ephemeralt"));
    }

    #[test]
    fn rejects_disallowed_characters() {
        for name in ["has space", "slash/name", "colon:name", "tab\tname", "nl\n", "ü"] {
            assert!(!valid_topic_name(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn length_bound_includes_suffix() {
        let max = "a".repeat(MAX_NAME_LEN);
        assert!(valid_topic_name(&max));
        assert!(!valid_topic_name(&format!("{max}a")));

        let base = "b".repeat(MAX_NAME_LEN - EPHEMERAL_SUFFIX.len());
        assert!(valid_channel_name(&format!("{base}{EPHEMERAL_SUFFIX}")));
        assert!(!valid_channel_name(&format!("{base}b{EPHEMERAL_SUFFIX}")));
    }

    proptest! {
        #[test]
        fn prop_charset_names_are_valid(name in "[.a-zA-Z0-9_-]{1,64}") {
            prop_assert!(valid_topic_name(&name));
            prop_assert!(valid_channel_name(&name));
        }

        #[test]
        fn prop_ephemeral_names_are_valid(base in "[.a-zA-Z0-9_-]{1,54}") {
            let name = format!("{base}{EPHEMERAL_SUFFIX}");
            prop_assert!(valid_channel_name(&name));
        }

        #[test]
        fn prop_overlong_names_are_invalid(name in "[.a-zA-Z0-9_-]{65,128}") {
            prop_assert!(!valid_topic_name(&name));
        }

        #[test]
        fn prop_foreign_byte_invalidates(
            prefix in "[.a-zA-Z0-9_-]{0,30}",
            bad in "[ !/:;@$%^&*()+=]",
            suffix in "[.a-zA-Z0-9_-]{0,30}",
        ) {
            let name = format!("{prefix}{bad}{suffix}");
            prop_assert!(!valid_topic_name(&name));
        }
    }
}
