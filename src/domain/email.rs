#[derive(Debug, Clone)]
pub struct Email(String);

impl Email {
    /// Accepts anything shaped like `local@domain.tld`: no whitespace, a
    /// single `@`, and a dot somewhere inside the domain. Deliberately
    /// permissive - the provider performs its own validation and rejects
    /// addresses it cannot use.
    pub fn parse(s: String) -> Result<Email, String> {
        if is_plausible_address(&s) {
            Ok(Self(s))
        } else {
            Err(format!("{} is not a valid email address.", s))
        }
    }
}

fn is_plausible_address(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    let clean = |part: &str| {
        !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '@')
    };
    if !clean(local) || !clean(domain) {
        return false;
    }
    // The dot must have at least one character on each side.
    let chars: Vec<char> = domain.chars().collect();
    chars
        .iter()
        .enumerate()
        .any(|(i, &c)| c == '.' && i > 0 && i + 1 < chars.len())
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
