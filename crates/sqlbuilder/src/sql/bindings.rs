//! Named identifier bindings.
//!
//! A binding maps a placeholder name to one identifier (`${table}`) or to a list
//! of identifiers (`${columns}`, substituted as `a, b, c`). Names are unique for
//! the lifetime of a builder, including every builder merged into it.

use crate::error::{SqlError, SqlResult};
use crate::quote::quote_name;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Matches `${name}` and `:{name}`; the captured name is looked up in the table.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[:$]\{([A-Za-z0-9_]+)\}").expect("invalid built-in placeholder regex")
    })
}

fn is_word(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    /// Every name ever bound, single- or multi-valued.
    names: HashSet<String>,
    single: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
}

impl Bindings {
    pub(crate) fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn check_name(&self, name: &str) -> SqlResult<()> {
        if !is_word(name) {
            return Err(SqlError::InvalidBindingName(name.to_string()));
        }
        if self.names.contains(name) {
            return Err(SqlError::DuplicateBinding(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn bind(&mut self, name: &str, value: String) -> SqlResult<()> {
        self.check_name(name)?;
        self.names.insert(name.to_string());
        self.single.insert(name.to_string(), value);
        Ok(())
    }

    pub(crate) fn bind_list(&mut self, name: &str, values: Vec<String>) -> SqlResult<()> {
        self.check_name(name)?;
        self.names.insert(name.to_string());
        self.multi.insert(name.to_string(), values);
        Ok(())
    }

    /// Bind several single-valued names. Nothing is bound if any name is rejected.
    pub(crate) fn bind_all(&mut self, pairs: Vec<(String, String)>) -> SqlResult<()> {
        let mut seen = HashSet::new();
        for (name, _) in &pairs {
            self.check_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(SqlError::DuplicateBinding(name.clone()));
            }
        }
        for (name, value) in pairs {
            self.names.insert(name.clone());
            self.single.insert(name, value);
        }
        Ok(())
    }

    /// Take over all bindings of `other`. Nothing is merged if any name collides.
    pub(crate) fn merge(&mut self, other: &Bindings) -> SqlResult<()> {
        let mut incoming: Vec<&String> = other.names.iter().collect();
        incoming.sort();
        if let Some(dup) = incoming.into_iter().find(|n| self.names.contains(*n)) {
            return Err(SqlError::DuplicateBinding(dup.clone()));
        }
        self.names.extend(other.names.iter().cloned());
        self.single
            .extend(other.single.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.multi
            .extend(other.multi.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.names.clear();
        self.single.clear();
        self.multi.clear();
    }

    /// Quoted replacement text for every binding.
    ///
    /// All bindings are quoted up front, so an invalid identifier fails the
    /// substitution even if its placeholder does not occur in the text.
    fn quoted(&self) -> SqlResult<HashMap<&str, String>> {
        let mut quoted = HashMap::with_capacity(self.single.len() + self.multi.len());
        for (name, value) in &self.single {
            quoted.insert(name.as_str(), quote_name(value)?);
        }
        for (name, values) in &self.multi {
            let parts = values
                .iter()
                .map(|v| quote_name(v))
                .collect::<SqlResult<Vec<_>>>()?;
            quoted.insert(name.as_str(), parts.join(", "));
        }
        Ok(quoted)
    }

    /// Replace every bound placeholder in `text`. Unbound placeholders stay as they are.
    pub(crate) fn substitute<'a>(&self, text: &'a str) -> SqlResult<Cow<'a, str>> {
        if self.is_empty() {
            return Ok(Cow::Borrowed(text));
        }
        let quoted = self.quoted()?;
        Ok(placeholder_regex().replace_all(text, |caps: &Captures<'_>| {
            match quoted.get(&caps[1]) {
                Some(replacement) => replacement.clone(),
                None => caps[0].to_string(),
            }
        }))
    }
}
