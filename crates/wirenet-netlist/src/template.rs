//! Netlist line templates.
//!
//! A template is plain text with `@name` placeholders, e.g.
//! `X@instName @pinList inverter`. Templates are tokenised once into literal
//! and placeholder elements; rendering walks the tokens and substitutes each
//! placeholder exactly once, so text coming out of a label or attribute is
//! never scanned for further placeholders.
//!
//! Placeholders are looked up in labels, then attributes, then caller supplied
//! properties. `@pinList` expands to the space separated net names of the pin
//! map. A placeholder that resolves to nothing is written back verbatim, and
//! `@@` is a literal `@`.
//!
//! A bare name runs as far as identifier characters go, so `@instName_p` is
//! the placeholder `instName_p`. Braces delimit the name when text follows
//! directly: `@{instName}_p`.

use std::fmt::Write;
use std::str::FromStr;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::binding::PinNetMap;
use crate::{Instance, Symbol, ATTR_NETLIST_LINE};

/// Placeholder expanding to the ordered net list of an instance.
pub const PIN_LIST: &str = "pinList";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Placeholder(String),
    /// A placeholder written as `@{name}`.
    Braced(String),
    PinList,
}

/// A tokenised template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '@' {
                literal.push(c);
                continue;
            }
            match chars.peek() {
                Some('@') => {
                    chars.next();
                    literal.push('@');
                }
                Some(&next) if is_name_start(next) => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if is_name_char(n) {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    if name == PIN_LIST {
                        tokens.push(Token::PinList);
                    } else {
                        tokens.push(Token::Placeholder(name));
                    }
                }
                Some('{') => match braced_name(chars.clone()) {
                    Some(name) => {
                        // `{`, the name and `}` are all single byte characters.
                        for _ in 0..name.len() + 2 {
                            chars.next();
                        }
                        if !literal.is_empty() {
                            tokens.push(Token::Literal(std::mem::take(&mut literal)));
                        }
                        if name == PIN_LIST {
                            tokens.push(Token::PinList);
                        } else {
                            tokens.push(Token::Braced(name));
                        }
                    }
                    None => literal.push('@'),
                },
                _ => literal.push('@'),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Names of all placeholders other than the pin list.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Placeholder(name) | Token::Braced(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn render(&self, subst: &Substitution<'_>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder(name) => match subst.lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        let _ = write!(out, "@{name}");
                    }
                },
                Token::Braced(name) => match subst.lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        let _ = write!(out, "@{{{name}}}");
                    }
                },
                Token::PinList => match subst.pins {
                    Some(pins) => out.push_str(&pins.values().join(" ")),
                    None => {
                        let _ = write!(out, "@{PIN_LIST}");
                    }
                },
            }
        }
        out
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// The name inside `{name}` at the start of `chars`, if it is well formed.
fn braced_name(mut chars: impl Iterator<Item = char>) -> Option<String> {
    if chars.next() != Some('{') {
        return None;
    }
    let mut name = String::new();
    for c in chars {
        match c {
            '}' if name.starts_with(is_name_start) => return Some(name),
            c if is_name_char(c) => name.push(c),
            _ => return None,
        }
    }
    None
}

impl FromStr for Template {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Template::parse(s))
    }
}

/// Values available to a template while rendering.
#[derive(Debug, Default, Clone)]
pub struct Substitution<'a> {
    labels: Option<&'a IndexMap<Symbol, String>>,
    attributes: Option<&'a IndexMap<Symbol, String>>,
    properties: Vec<(&'a str, String)>,
    pins: Option<&'a PinNetMap>,
}

impl<'a> Substitution<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels, attributes and master identity of an instance.
    pub fn for_instance(instance: &'a Instance) -> Self {
        Self::new()
            .labels(&instance.labels)
            .attributes(&instance.attributes)
            .property("libName", instance.master.library.clone())
            .property("cellName", instance.master.cell.clone())
            .property("viewName", instance.master.view.clone())
    }

    pub fn labels(mut self, labels: &'a IndexMap<Symbol, String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn attributes(mut self, attributes: &'a IndexMap<Symbol, String>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn property(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.properties.push((name, value.into()));
        self
    }

    pub fn pins(mut self, pins: &'a PinNetMap) -> Self {
        self.pins = Some(pins);
        self
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.labels
            .and_then(|labels| labels.get(name))
            .or_else(|| self.attributes.and_then(|attrs| attrs.get(name)))
            .map(String::as_str)
            .or_else(|| {
                self.properties
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.as_str())
            })
    }
}

/// Outcome of rendering an instance's netlist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Line(String),
    /// The instance has no template; carries a description of the problem.
    MissingTemplate(String),
}

/// Render the instantiation line of an instance with its bound pins.
pub fn render_instance(instance: &Instance, pins: &PinNetMap) -> Rendered {
    render_instance_with(instance, pins, None)
}

/// Like [`render_instance`], but `template` wins over the instance's own
/// `netlistLine` when given.
pub fn render_instance_with(
    instance: &Instance,
    pins: &PinNetMap,
    template: Option<&str>,
) -> Rendered {
    let Some(source) = template.or_else(|| instance.netlist_line()) else {
        return Rendered::MissingTemplate(format!(
            "instance {} ({}) has no {} attribute",
            instance.name(),
            instance.master,
            ATTR_NETLIST_LINE
        ));
    };
    let subst = Substitution::for_instance(instance).pins(pins);
    Rendered::Line(Template::parse(source).render(&subst))
}
