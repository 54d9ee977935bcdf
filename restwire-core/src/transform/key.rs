use std::fmt;

/// The direction a payload travels in when a rule applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformDirection {
    /// Payloads sent to the remote side.
    Input,
    /// Payloads received from the remote side.
    Output,
    /// Registration shorthand for `Input` and `Output`. Never matched at runtime.
    Both,
}

impl TransformDirection {
    pub fn has_input(&self) -> bool {
        matches!(self, TransformDirection::Input | TransformDirection::Both)
    }

    pub fn has_output(&self) -> bool {
        matches!(self, TransformDirection::Output | TransformDirection::Both)
    }

    /// The concrete directions this value stands for.
    pub fn expand(&self) -> impl Iterator<Item = TransformDirection> {
        let input = self.has_input().then_some(TransformDirection::Input);
        let output = self.has_output().then_some(TransformDirection::Output);
        input.into_iter().chain(output)
    }
}

impl fmt::Display for TransformDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformDirection::Input => "Input",
            TransformDirection::Output => "Output",
            TransformDirection::Both => "Both",
        };
        f.write_str(name)
    }
}

/// Identifies a rule: the payload name, the contract version it migrates to and its direction.
///
/// Versions are compared as plain strings (ordinal), so they must sort correctly as text,
/// e.g. ISO dates such as `2024-06-15`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKey {
    pub name: String,
    pub version: String,
    pub direction: TransformDirection,
}

impl TransformKey {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        direction: TransformDirection,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            direction,
        }
    }

    /// A key for the `Input` direction.
    pub fn input(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, TransformDirection::Input)
    }

    /// A key for the `Output` direction.
    pub fn output(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, TransformDirection::Output)
    }

    pub(crate) fn with_direction(&self, direction: TransformDirection) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            direction,
        }
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.version, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_expands_to_input_and_output() {
        let expanded: Vec<_> = TransformDirection::Both.expand().collect();
        assert_eq!(
            expanded,
            vec![TransformDirection::Input, TransformDirection::Output]
        );

        let expanded: Vec<_> = TransformDirection::Output.expand().collect();
        assert_eq!(expanded, vec![TransformDirection::Output]);
    }

    #[test]
    fn keys_compare_structurally() {
        assert_eq!(
            TransformKey::input("order", "2024-01-01"),
            TransformKey::new("order", "2024-01-01", TransformDirection::Input)
        );
        assert_ne!(
            TransformKey::input("order", "2024-01-01"),
            TransformKey::output("order", "2024-01-01")
        );
    }

    #[test]
    fn display_joins_the_components() {
        assert_eq!(
            TransformKey::output("order", "2024-01-01").to_string(),
            "order:2024-01-01:Output"
        );
    }
}
