//! Interactive prompt primitive.
//!
//! Used only while resolving targets and confirming a pipeline, never while
//! steps run. The terminal implementation lives in the CLI; tests script it.

/// One selectable option: the value returned and the text shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

pub trait Prompter {
    /// Ask the user to pick one option. `default` is a value from `options`.
    /// Returns `None` when nothing was chosen.
    fn choice(&self, question: &str, options: &[ChoiceOption], default: Option<&str>) -> Option<String>;

    /// Yes/no question.
    fn confirm(&self, question: &str) -> bool;
}

/// Wraps a prompter and answers every confirmation with yes (`--yes`).
pub struct AssumeYes<'a> {
    inner: &'a dyn Prompter,
}

impl<'a> AssumeYes<'a> {
    pub fn new(inner: &'a dyn Prompter) -> Self {
        Self { inner }
    }
}

impl Prompter for AssumeYes<'_> {
    fn choice(&self, question: &str, options: &[ChoiceOption], default: Option<&str>) -> Option<String> {
        self.inner.choice(question, options, default)
    }

    fn confirm(&self, question: &str) -> bool {
        log_status!("confirm", "{} (assumed yes)", question);
        true
    }
}

/// Match free-form input against options: 0-based index as listed, then
/// value or label, case-insensitively.
pub fn match_choice(input: &str, options: &[ChoiceOption]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(index) = input.parse::<usize>() {
        if let Some(option) = options.get(index) {
            return Some(option.value.clone());
        }
    }

    options
        .iter()
        .find(|o| o.value.eq_ignore_ascii_case(input) || o.label.eq_ignore_ascii_case(input))
        .map(|o| o.value.clone())
}
