/// The kind of value a function parameter expects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgKind {
    Number,
    Text,
    Logical,
    Range,
    Any,
}

impl ArgKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Some(Self::Number),
            "text" => Some(Self::Text),
            "logical" => Some(Self::Logical),
            "range" => Some(Self::Range),
            "" | "_" | "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Whether a literal of this parameter kind must coerce to a number.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number)
    }
}
