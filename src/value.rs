/// Free-form attribute value carried by owners, objects and events.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    TextList(Vec<String>),
}

impl AttributeValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }

    pub fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    pub fn text_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::TextList(values.into_iter().map(Into::into).collect())
    }

    /// Returns the text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns a numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::TextList(values)
    }
}

#[cfg(test)]
mod tests {
    use crate::AttributeValue;

    #[test]
    fn helper_constructors() {
        assert_eq!(AttributeValue::int(7), AttributeValue::Int(7));
        assert_eq!(AttributeValue::float(1.25), AttributeValue::Float(1.25));
        assert_eq!(AttributeValue::bool(true), AttributeValue::Bool(true));
        assert_eq!(
            AttributeValue::text("abc"),
            AttributeValue::Text("abc".to_owned())
        );
        assert_eq!(
            AttributeValue::text_list(["a", "b"]),
            AttributeValue::TextList(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn accessors() {
        assert_eq!(AttributeValue::from("x").as_str(), Some("x"));
        assert_eq!(AttributeValue::from(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::from(false).as_f64(), None);
    }
}
