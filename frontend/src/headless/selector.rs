//! The subset of CSS selectors the page behaviors use: comma-separated
//! compound selectors made of a tag, `#id`, `.class` and attribute tests.

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrTest {
    Present,
    Equals(String),
    Prefix(String),
    Contains(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Attr {
    name: String,
    test: AttrTest,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<Attr>,
}

/// What a selector needs to know about an element.
pub trait Subject {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<String>;
    fn has_class(&self, class: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Compound>,
}

impl Selector {
    /// `None` when the selector uses syntax outside the supported subset.
    pub fn parse(source: &str) -> Option<Self> {
        let groups = split_groups(source)
            .into_iter()
            .map(|group| parse_compound(group.trim()))
            .collect::<Option<Vec<_>>>()?;
        if groups.is_empty() {
            return None;
        }
        Some(Self { groups })
    }

    pub fn matches(&self, subject: &impl Subject) -> bool {
        self.groups.iter().any(|compound| compound.matches(subject))
    }
}

impl Compound {
    fn matches(&self, subject: &impl Subject) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(subject.tag()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if subject.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| subject.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|attr| {
            let Some(value) = subject.attribute(&attr.name) else {
                return false;
            };
            match &attr.test {
                AttrTest::Present => true,
                AttrTest::Equals(expected) => value == *expected,
                AttrTest::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
                AttrTest::Contains(part) => !part.is_empty() && value.contains(part.as_str()),
            }
        })
    }
}

/// Splits on commas outside brackets and quotes.
fn split_groups(source: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&source[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    groups.push(&source[start..]);
    groups
}

fn is_ident(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn take_ident(rest: &str) -> Option<(&str, &str)> {
    let end = rest.find(|ch: char| !is_ident(ch)).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(rest.split_at(end))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parse_attr(body: &str) -> Option<Attr> {
    let (name, test) = if let Some((name, value)) = body.split_once("^=") {
        (name, AttrTest::Prefix(unquote(value).to_string()))
    } else if let Some((name, value)) = body.split_once("*=") {
        (name, AttrTest::Contains(unquote(value).to_string()))
    } else if let Some((name, value)) = body.split_once('=') {
        (name, AttrTest::Equals(unquote(value).to_string()))
    } else {
        (body, AttrTest::Present)
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident) {
        return None;
    }
    Some(Attr {
        name: name.to_ascii_lowercase(),
        test,
    })
}

fn parse_compound(source: &str) -> Option<Compound> {
    if source.is_empty() {
        return None;
    }
    let mut compound = Compound::default();
    let mut rest = source;

    if let Some(after) = rest.strip_prefix('*') {
        compound.tag = Some("*".to_string());
        rest = after;
    } else if let Some((tag, after)) = take_ident(rest) {
        compound.tag = Some(tag.to_ascii_lowercase());
        rest = after;
    }

    while let Some(marker) = rest.chars().next() {
        let after = &rest[marker.len_utf8()..];
        match marker {
            '#' => {
                let (id, after) = take_ident(after)?;
                compound.id = Some(id.to_string());
                rest = after;
            }
            '.' => {
                let (class, after) = take_ident(after)?;
                compound.classes.push(class.to_string());
                rest = after;
            }
            '[' => {
                let close = after.find(']')?;
                compound.attrs.push(parse_attr(&after[..close])?);
                rest = &after[close + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        tag: &'static str,
        attrs: Vec<(&'static str, &'static str)>,
        classes: Vec<&'static str>,
    }

    impl Subject for Fake {
        fn tag(&self) -> &str {
            self.tag
        }

        fn attribute(&self, name: &str) -> Option<String> {
            self.attrs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }

        fn has_class(&self, class: &str) -> bool {
            self.classes.contains(&class)
        }
    }

    fn link(href: &'static str) -> Fake {
        Fake {
            tag: "a",
            attrs: vec![("href", href)],
            classes: vec!["c-nav__link"],
        }
    }

    #[test]
    fn attribute_operators() {
        let hash = Selector::parse("a[href^=\"#\"]").unwrap();
        assert!(hash.matches(&link("#kontakt")));
        assert!(!hash.matches(&link("/index.html#kontakt")));

        let privacy = Selector::parse("a[href*=\"privacy\"], .c-form__link").unwrap();
        assert!(privacy.matches(&link("/privacy.html")));
        assert!(!privacy.matches(&link("/impressum.html")));

        let submit = Selector::parse("[type=\"submit\"]").unwrap();
        let button = Fake {
            tag: "button",
            attrs: vec![("type", "submit")],
            classes: vec![],
        };
        assert!(submit.matches(&button));
    }

    #[test]
    fn groups_tags_and_classes() {
        let fields = Selector::parse("input, textarea, select").unwrap();
        assert!(fields.matches(&Fake {
            tag: "TEXTAREA",
            attrs: vec![],
            classes: vec![],
        }));
        assert!(!fields.matches(&link("#")));

        let nav = Selector::parse("a.c-nav__link").unwrap();
        assert!(nav.matches(&link("#")));
        assert!(!Selector::parse("a.active").unwrap().matches(&link("#")));
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        assert!(Selector::parse("nav a").is_none());
        assert!(Selector::parse("ul > li").is_none());
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("a[href").is_none());
    }
}
