/// Represents ways to locate an element on the rendered page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by ARIA role and accessible name
    Role { role: String, name: Option<String> },
    /// Select by input placeholder text
    Placeholder(String),
    /// Select by visible text content; `exact` requires the whole trimmed
    /// text to match instead of a substring
    Text { text: String, exact: bool },
    /// Select by raw CSS, for controls without an accessible label
    Css(String),
    /// Select the n-th element from the matches
    Nth(usize),
    /// Chain multiple selectors, applied left to right
    Chain(Vec<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    pub fn role(role: &str, name: &str) -> Self {
        Selector::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
        }
    }

    pub fn text(text: &str) -> Self {
        Selector::Text {
            text: text.to_string(),
            exact: false,
        }
    }

    pub fn exact_text(text: &str) -> Self {
        Selector::Text {
            text: text.to_string(),
            exact: true,
        }
    }

    pub fn placeholder(text: &str) -> Self {
        Selector::Placeholder(text.to_string())
    }

    pub fn css(css: &str) -> Self {
        Selector::Css(css.to_string())
    }

    /// Append an nth-match filter, flattening into an existing chain.
    pub fn nth(self, index: usize) -> Self {
        match self {
            Selector::Chain(mut parts) => {
                parts.push(Selector::Nth(index));
                Selector::Chain(parts)
            }
            s => Selector::Chain(vec![s, Selector::Nth(index)]),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Role { role, name: Some(name) } => write!(f, "{role}|{name}"),
            Selector::Role { role, name: None } => write!(f, "role:{role}"),
            Selector::Placeholder(p) => write!(f, "placeholder:{p}"),
            Selector::Text { text, exact: false } => write!(f, "text:{text}"),
            Selector::Text { text, exact: true } => write!(f, "text={text}"),
            Selector::Css(css) => write!(f, "css:{css}"),
            Selector::Nth(i) => write!(f, "nth={i}"),
            Selector::Chain(parts) => {
                let joined = parts
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" >> ");
                write!(f, "{joined}")
            }
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }

        // role|name is the preferred precise format, e.g. "button|Sign In"
        if s.contains('|') {
            let parts: Vec<&str> = s.splitn(2, '|').collect();
            if parts.len() == 2 {
                let role = parts[0].trim().strip_prefix("role:").unwrap_or(parts[0].trim());
                let name = parts[1].trim().strip_prefix("name:").unwrap_or(parts[1].trim());
                return Selector::Role {
                    role: role.to_string(),
                    name: Some(name.to_string()),
                };
            }
        }

        match s {
            _ if s.starts_with("role:") => Selector::Role {
                role: s[5..].to_string(),
                name: None,
            },
            _ if s.to_lowercase().starts_with("placeholder:") => {
                Selector::Placeholder(s["placeholder:".len()..].to_string())
            }
            _ if s.starts_with("text:") => Selector::Text {
                text: s[5..].to_string(),
                exact: false,
            },
            _ if s.starts_with("text=") => Selector::Text {
                text: s[5..].to_string(),
                exact: true,
            },
            _ if s.starts_with("css:") => Selector::Css(s[4..].to_string()),
            _ if s.to_lowercase().starts_with("nth=") || s.to_lowercase().starts_with("nth:") => {
                let index_str = &s["nth=".len()..];
                match index_str.parse::<usize>() {
                    Ok(index) => Selector::Nth(index),
                    Err(_) => {
                        Selector::Invalid(format!("Invalid index for nth selector: '{index_str}'"))
                    }
                }
            }
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'role:', 'placeholder:', 'text:', 'css:', 'nth=', or the 'role|name' form."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
