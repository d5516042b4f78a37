//! INI-shaped config reader
//!
//! Shared by the ground model, landuse and wave config loaders.
//!
//! Format:
//! ```text
//! ; comment            # comment            // comment
//! [section name]
//! key with spaces = value
//! key: value
//! ```
//! The first `=`, `:` or tab on a line separates key from value. Repeated
//! section headers append to the earlier section. Lines before the first
//! header belong to the unnamed section `""`.

use crate::error::ConfigError;

/// One `key = value` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    /// 1-based source line
    pub line: usize,
}

/// A named group of entries in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSection {
    pub name: String,
    pub entries: Vec<ConfigEntry>,
}

impl ConfigSection {
    /// Last value declared for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

/// Parsed config stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    sections: Vec<ConfigSection>,
}

const SEPARATORS: &[char] = &['=', ':', '\t'];

impl ConfigFile {
    /// Parse a whole config stream.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut file = ConfigFile::default();
        let mut current = file.section_slot("");

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with("//") {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        text: raw.to_string(),
                    });
                };
                current = file.section_slot(name.trim());
                continue;
            }

            let Some(sep) = line.find(SEPARATORS) else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    text: raw.to_string(),
                });
            };
            let key = line[..sep].trim();
            let value = line[sep + 1..].trim_start_matches(SEPARATORS).trim();
            if key.is_empty() {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    text: raw.to_string(),
                });
            }
            file.sections[current].entries.push(ConfigEntry {
                key: key.to_string(),
                value: value.to_string(),
                line: line_no,
            });
        }

        file.sections.retain(|s| !(s.name.is_empty() && s.entries.is_empty()));
        Ok(file)
    }

    /// All sections in first-declaration order.
    pub fn sections(&self) -> &[ConfigSection] {
        &self.sections
    }

    /// Section by exact name.
    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_slot(&mut self, name: &str) -> usize {
        if let Some(pos) = self.sections.iter().position(|s| s.name == name) {
            return pos;
        }
        self.sections.push(ConfigSection {
            name: name.to_string(),
            entries: Vec::new(),
        });
        self.sections.len() - 1
    }
}

/// Parse a real, reporting the entry on failure.
pub(crate) fn parse_real(section: &str, entry: &ConfigEntry) -> Result<f32, ConfigError> {
    entry.value.parse::<f32>().map_err(|_| invalid(section, entry))
}

/// Parse an integer, reporting the entry on failure.
pub(crate) fn parse_int(section: &str, entry: &ConfigEntry) -> Result<i32, ConfigError> {
    entry.value.parse::<i32>().map_err(|_| invalid(section, entry))
}

/// Parse `r g b [a]` (space or comma separated, 0..1 components).
pub(crate) fn parse_colour(section: &str, entry: &ConfigEntry) -> Result<[f32; 4], ConfigError> {
    let parts: Vec<&str> = entry
        .value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(invalid(section, entry));
    }
    let mut colour = [0.0, 0.0, 0.0, 1.0];
    for (slot, part) in colour.iter_mut().zip(&parts) {
        *slot = part.parse::<f32>().map_err(|_| invalid(section, entry))?;
    }
    Ok(colour)
}

fn invalid(section: &str, entry: &ConfigEntry) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: entry.key.clone(),
        value: entry.value.clone(),
        line: entry.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_keys() {
        let text = "\
; leading comment
[general]
version = 3

[concrete]
adhesion velocity = 5.0
static friction coefficient: 0.8
# another comment
[concrete]
alpha=2.5
";
        let cfg = ConfigFile::parse(text).unwrap();
        assert_eq!(cfg.sections().len(), 2);
        assert_eq!(cfg.section("general").unwrap().get("version"), Some("3"));

        let concrete = cfg.section("concrete").unwrap();
        assert_eq!(concrete.entries.len(), 3);
        assert_eq!(concrete.get("adhesion velocity"), Some("5.0"));
        assert_eq!(concrete.get("static friction coefficient"), Some("0.8"));
        assert_eq!(concrete.get("alpha"), Some("2.5"));
        assert_eq!(concrete.entries[2].line, 10);
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let cfg = ConfigFile::parse("[a]\nurl = http://x:80\n").unwrap();
        assert_eq!(cfg.section("a").unwrap().get("url"), Some("http://x:80"));
    }

    #[test]
    fn test_unterminated_header_is_error() {
        let err = ConfigFile::parse("[broken\nkey = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_line_without_separator_is_error() {
        let err = ConfigFile::parse("[a]\njustaword\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_parse_colour() {
        let entry = ConfigEntry {
            key: "fx_colour".into(),
            value: "0.5 0.25 1".into(),
            line: 1,
        };
        assert_eq!(parse_colour("s", &entry).unwrap(), [0.5, 0.25, 1.0, 1.0]);

        let bad = ConfigEntry {
            key: "fx_colour".into(),
            value: "red".into(),
            line: 4,
        };
        assert!(matches!(
            parse_colour("s", &bad),
            Err(ConfigError::InvalidValue { line: 4, .. })
        ));
    }
}
