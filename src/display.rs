use std::fmt::{Display, Formatter};

/// Formats a slice as `[a, b, c]`.
pub struct DisplaySlice<'a, D: Display> {
    items: &'a [D],
    separator: &'a str,
}
impl<'a, D: Display> DisplaySlice<'a, D> {
    pub fn with_separator(self, separator: &'a str) -> Self {
        Self { separator, ..self }
    }
}

impl<'a, D: Display> Display for DisplaySlice<'a, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (index, item) in self.items.iter().enumerate() {
            if index != 0 {
                write!(f, "{}", self.separator)?;
            }
            item.fmt(f)?;
        }
        write!(f, "]")
    }
}

impl<'a, D: Display> From<&'a [D]> for DisplaySlice<'a, D> {
    fn from(items: &'a [D]) -> Self {
        DisplaySlice {
            items,
            separator: ", ",
        }
    }
}
