//! Step contracts: ordered input/output fields and the retry extension.

use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::ContractError;

/// Name of the input that carries accumulated corrections on a retry.
pub const FEEDBACK_FIELD: &str = "feedback";
/// Prefix of the inputs that carry a previous (rejected) output.
pub const PAST_PREFIX: &str = "past_";

const PAST_DESC: &str = "past output with errors";
const FEEDBACK_PREFIX: &str = "Instructions:";
const FEEDBACK_DESC: &str = "Some instructions you must satisfy";

/// Whether a field is consumed or produced by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    Output,
}

/// A single declared field of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub kind: FieldKind,
    /// Label shown before the value when the contract is rendered.
    pub prefix: String,
    pub desc: String,
    /// Free-form hint describing how the value is formatted.
    pub format: Option<String>,
}

impl Field {
    /// Input field with prefix and description inferred from `name`.
    pub fn input(name: &str) -> Self {
        Self::inferred(FieldKind::Input, name)
    }

    /// Output field with prefix and description inferred from `name`.
    pub fn output(name: &str) -> Self {
        Self::inferred(FieldKind::Output, name)
    }

    fn inferred(kind: FieldKind, name: &str) -> Self {
        Self {
            kind,
            prefix: format!("{}:", infer_prefix(name)),
            desc: format!("${{{name}}}"),
            format: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn is_input(&self) -> bool {
        self.kind == FieldKind::Input
    }

    pub fn is_output(&self) -> bool {
        self.kind == FieldKind::Output
    }
}

/// Declared, ordered set of named input and output fields for a step.
///
/// Equality is structural: two steps declaring equal contracts are treated as
/// the same backtrack target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    instructions: String,
    fields: IndexMap<String, Field>,
}

impl Contract {
    pub fn builder(instructions: impl Into<String>) -> ContractBuilder {
        ContractBuilder {
            instructions: instructions.into(),
            fields: Vec::new(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn input_fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields().filter(|(_, field)| field.is_input())
    }

    pub fn output_fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields().filter(|(_, field)| field.is_output())
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.output_fields().map(|(name, _)| name).collect()
    }

    /// Append a new field, rejecting names that are already declared.
    pub fn push(&mut self, name: impl Into<String>, field: Field) -> Result<(), ContractError> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(ContractError::DuplicateField(name));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Declare `field`. A field already named `name` is replaced in place.
    fn put(&mut self, name: String, field: Field) {
        self.fields.insert(name, field);
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<&str> = self.input_fields().map(|(name, _)| name).collect();
        let outputs = self.output_names();
        write!(f, "{} -> {}", inputs.join(", "), outputs.join(", "))
    }
}

/// Collects fields for a [`Contract`], reporting duplicates on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    instructions: String,
    fields: Vec<(String, Field)>,
}

impl ContractBuilder {
    pub fn input(self, name: &str) -> Self {
        self.field(name, Field::input(name))
    }

    pub fn output(self, name: &str) -> Self {
        self.field(name, Field::output(name))
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn build(self) -> Result<Contract, ContractError> {
        let mut contract = Contract {
            instructions: self.instructions,
            fields: IndexMap::with_capacity(self.fields.len()),
        };
        for (name, field) in self.fields {
            contract.push(name, field)?;
        }
        Ok(contract)
    }
}

/// Shared, cheaply clonable identity of a step's declared contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRef(Arc<Contract>);

impl StepRef {
    pub fn new(contract: Contract) -> Self {
        Self(Arc::new(contract))
    }

    pub fn contract(&self) -> &Contract {
        &self.0
    }
}

impl From<Contract> for StepRef {
    fn from(contract: Contract) -> Self {
        Self::new(contract)
    }
}

impl From<&Contract> for StepRef {
    fn from(contract: &Contract) -> Self {
        Self::new(contract.clone())
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the contract a step is re-invoked with after a soft failure.
///
/// Field order: original inputs, one `past_<name>` input per original output,
/// `feedback`, then the original outputs. Rendering follows this order, so the
/// rejected answers and the corrections precede the new outputs.
pub fn build_retry_contract(original: &Contract) -> Contract {
    let mut extended = Contract {
        instructions: original.instructions.clone(),
        fields: IndexMap::with_capacity(original.fields.len() * 2 + 1),
    };
    for (name, field) in original.input_fields() {
        extended.put(name.to_string(), field.clone());
    }
    for (name, field) in original.output_fields() {
        extended.put(
            format!("{PAST_PREFIX}{name}"),
            Field {
                kind: FieldKind::Input,
                prefix: format!("Past {}", field.prefix),
                desc: PAST_DESC.to_string(),
                format: field.format.clone(),
            },
        );
    }
    extended.put(
        FEEDBACK_FIELD.to_string(),
        Field {
            kind: FieldKind::Input,
            prefix: FEEDBACK_PREFIX.to_string(),
            desc: FEEDBACK_DESC.to_string(),
            format: None,
        },
    );
    for (name, field) in original.output_fields() {
        extended.put(name.to_string(), field.clone());
    }
    extended
}

/// Turn a field name into a human-readable label.
///
/// Splits camelCase, snake_case and letter/digit boundaries, then title-cases
/// each word while keeping all-uppercase acronyms (`URLAddress` -> `URL Address`).
pub fn infer_prefix(name: &str) -> String {
    static CAMEL_WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
    static LOWER_UPPER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
    static LETTER_DIGIT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"([a-zA-Z])(\d)").expect("valid regex"));
    static DIGIT_LETTER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\d)([a-zA-Z])").expect("valid regex"));

    let snake = CAMEL_WORD.replace_all(name, "${1}_${2}");
    let snake = LOWER_UPPER.replace_all(&snake, "${1}_${2}");
    let snake = LETTER_DIGIT.replace_all(&snake, "${1}_${2}");
    let snake = DIGIT_LETTER.replace_all(&snake, "${1}_${2}");

    snake
        .split('_')
        .map(|word| {
            if is_acronym(word) {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_acronym(word: &str) -> bool {
    let mut cased = word.chars().filter(|c| c.is_alphabetic()).peekable();
    cased.peek().is_some() && cased.all(char::is_uppercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
