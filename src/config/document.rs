// Shared credentials file document
//
// Line-oriented model of the `[profile]` / `key=value` file. Only section
// boundaries are interpreted; everything else is carried as raw text so that
// untouched sections are written back byte-for-byte.

use super::types::Credentials;

/// One `[name]` section with its raw text, header line included
#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    /// Separator written before an appended section
    lead: String,
    text: String,
}

/// Parsed credentials file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsDocument {
    /// Text before the first section header
    preamble: String,
    sections: Vec<Section>,
    /// File uses `\r\n` line endings
    crlf: bool,
}

impl CredentialsDocument {
    /// Split `content` into sections. Never fails: lines that are not
    /// headers belong to the preceding section or to the preamble.
    pub fn parse(content: &str) -> Self {
        let mut document = Self {
            crlf: content
                .find('\n')
                .map(|end| content[..end].ends_with('\r'))
                .unwrap_or(false),
            ..Self::default()
        };

        for line in content.split_inclusive('\n') {
            if let Some(name) = parse_header(line) {
                document.sections.push(Section {
                    name: name.to_string(),
                    lead: String::new(),
                    text: line.to_string(),
                });
                continue;
            }

            match document.sections.last_mut() {
                Some(section) => section.text.push_str(line),
                None => document.preamble.push_str(line),
            }
        }

        document
    }

    /// Names of all sections in file order
    pub fn profile_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    /// Replace the section called `name` in place, or append a new one.
    ///
    /// Later sections with the same name are dropped so that the profile
    /// appears exactly once.
    pub fn upsert(&mut self, name: &str, credentials: &Credentials) {
        let newline = self.newline();
        let rendered = render_section(name, credentials, newline);

        let Some(index) = self.sections.iter().position(|s| s.name == name) else {
            let lead = separator_after(&self.render(), newline);
            self.sections.push(Section {
                name: name.to_string(),
                lead,
                text: rendered,
            });
            return;
        };

        // Keep the blank lines that separated the old section from the next
        let separator = trailing_blank_lines(&self.sections[index].text).to_string();
        self.sections[index].text = rendered + &separator;

        let mut seen = false;
        self.sections.retain(|s| {
            if s.name != name {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });
    }

    /// Serialize back to file text
    pub fn render(&self) -> String {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            out.push_str(&section.lead);
            out.push_str(&section.text);
        }
        out
    }

    /// Line ending used by the parsed file
    fn newline(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }
}

/// Render a section with exactly the three credential keys
fn render_section(name: &str, credentials: &Credentials, newline: &str) -> String {
    format!(
        "[{name}]{nl}aws_access_key_id={}{nl}aws_secret_access_key={}{nl}aws_session_token={}{nl}",
        credentials.access_key_id,
        credentials.secret_access_key,
        credentials.session_token,
        name = name,
        nl = newline,
    )
}

/// Text needed after `existing` so that a new header starts on its own line
/// after a blank line
fn separator_after(existing: &str, newline: &str) -> String {
    let mut separator = String::new();
    if existing.is_empty() {
        return separator;
    }
    if !existing.ends_with('\n') {
        separator.push_str(newline);
    }
    if existing
        .lines()
        .last()
        .map(|line| !line.trim().is_empty())
        .unwrap_or(false)
    {
        separator.push_str(newline);
    }
    separator
}

/// Section name if `line` is a `[name]` header, surrounding whitespace allowed
fn parse_header(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    if name.is_empty() || name.contains(&['[', ']'][..]) {
        return None;
    }
    Some(name)
}

/// Suffix of `text` made of whitespace-only lines after the last content line
fn trailing_blank_lines(text: &str) -> &str {
    let content_end = text.trim_end().len();
    match text[content_end..].find('\n') {
        Some(newline) => &text[content_end + newline + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(a: &str, s: &str, t: &str) -> Credentials {
        Credentials::new(a, s, t)
    }

    const EXISTING: &str = "[existingProfile]\n\
aws_access_key_id=existingAccessKeyId\n\
aws_secret_access_key=existingSecretAccessKey\n\
aws_session_token=existingSessionToken\n";

    #[test]
    fn test_parse_headers() {
        let doc = CredentialsDocument::parse(
            "# managed by CI\n\n[default]\nkey=1\n\n  [ other ]  \nkey=2\n",
        );
        assert_eq!(doc.profile_names(), vec!["default", "other"]);
        assert!(doc.contains("other"));
        assert!(!doc.contains("missing"));
    }

    #[test]
    fn test_render_without_changes_is_identity() {
        for content in [
            "",
            "\n\n",
            EXISTING,
            "# comment\n[a]\nx=1\n\n\n[b]\ny=2",
            "[a]\r\nx=1\r\n\r\n[b]\r\ny=2\r\n",
        ] {
            assert_eq!(CredentialsDocument::parse(content).render(), content);
        }
    }

    #[test]
    fn test_append_to_empty() {
        let mut doc = CredentialsDocument::parse("");
        doc.upsert("testProfile", &creds("A", "B", "C"));

        assert_eq!(
            doc.render(),
            "[testProfile]\naws_access_key_id=A\naws_secret_access_key=B\naws_session_token=C\n"
        );
    }

    #[test]
    fn test_append_keeps_existing_profile() {
        let mut doc = CredentialsDocument::parse(EXISTING);
        doc.upsert("testProfile", &creds("A", "B", "C"));

        let rendered = doc.render();
        assert!(rendered.starts_with(EXISTING));
        assert_eq!(
            &rendered[EXISTING.len()..],
            "\n[testProfile]\naws_access_key_id=A\naws_secret_access_key=B\naws_session_token=C\n"
        );
    }

    #[test]
    fn test_append_after_unterminated_line() {
        let mut doc = CredentialsDocument::parse("[a]\nx=1");
        doc.upsert("b", &creds("A", "B", "C"));

        assert!(doc.render().starts_with("[a]\nx=1\n\n[b]\n"));
    }

    #[test]
    fn test_replace_in_place() {
        let content = "[first]\nx=1\n\n[target]\naws_access_key_id=OLD\naws_secret_access_key=OLD\naws_session_token=OLD\n\n[last]\ny=2\n";
        let mut doc = CredentialsDocument::parse(content);
        doc.upsert("target", &creds("NEW1", "NEW2", "NEW3"));

        assert_eq!(
            doc.render(),
            "[first]\nx=1\n\n[target]\naws_access_key_id=NEW1\naws_secret_access_key=NEW2\naws_session_token=NEW3\n\n[last]\ny=2\n"
        );
        assert_eq!(doc.profile_names(), vec!["first", "target", "last"]);
    }

    #[test]
    fn test_replace_drops_extra_keys_and_duplicates() {
        let content = "[target]\naws_access_key_id=OLD\nregion=us-east-1\n\n[other]\nz=9\n\n[target]\naws_access_key_id=DUP\n";
        let mut doc = CredentialsDocument::parse(content);
        doc.upsert("target", &creds("A", "B", "C"));

        let rendered = doc.render();
        assert_eq!(rendered.matches("[target]").count(), 1);
        assert!(!rendered.contains("OLD"));
        assert!(!rendered.contains("DUP"));
        assert!(!rendered.contains("region"));
        assert_eq!(doc.profile_names(), vec!["target", "other"]);
    }

    #[test]
    fn test_indented_hand_edited_file() {
        let content = "\n        [existingProfile]\n        aws_access_key_id=existingAccessKeyId\n        aws_secret_access_key=existingSecretAccessKey\n        aws_session_token=existingSessionToken\n      ";
        let mut doc = CredentialsDocument::parse(content);
        assert_eq!(doc.profile_names(), vec!["existingProfile"]);

        doc.upsert("testProfile", &creds("A", "B", "C"));
        let rendered = doc.render();

        assert!(rendered.starts_with(content));
        assert!(rendered.contains("[testProfile]\naws_access_key_id=A\n"));
    }

    #[test]
    fn test_crlf_file_keeps_line_endings() {
        let content = "[a]\r\nx=1\r\n\r\n[target]\r\naws_access_key_id=OLD\r\n";
        let mut doc = CredentialsDocument::parse(content);
        doc.upsert("target", &creds("A", "B", "C"));
        doc.upsert("added", &creds("D", "E", "F"));

        let rendered = doc.render();
        assert_eq!(
            rendered,
            "[a]\r\nx=1\r\n\r\n\
[target]\r\naws_access_key_id=A\r\naws_secret_access_key=B\r\naws_session_token=C\r\n\r\n\
[added]\r\naws_access_key_id=D\r\naws_secret_access_key=E\r\naws_session_token=F\r\n"
        );
        assert_eq!(rendered.matches('\n').count(), rendered.matches("\r\n").count());
    }

    #[test]
    fn test_header_detection() {
        assert_eq!(parse_header("[default]\n"), Some("default"));
        assert_eq!(parse_header("  [profile dev]  \r\n"), Some("profile dev"));
        assert_eq!(parse_header("[]\n"), None);
        assert_eq!(parse_header("[[nested]]\n"), None);
        assert_eq!(parse_header("key=[value]\n"), None);
    }

    #[test]
    fn test_trailing_blank_lines() {
        assert_eq!(trailing_blank_lines("[a]\nx=1\n\n\n"), "\n\n");
        assert_eq!(trailing_blank_lines("[a]\nx=1\n"), "");
        assert_eq!(trailing_blank_lines("[a]\nx=1"), "");
    }
}
