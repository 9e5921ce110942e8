use super::workbook::cell_to_string;
use calamine::Data;
use std::collections::HashMap;

/// Represents a header in the uploaded sheet, for example, `Amount`
#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(super) struct Header(String);

impl AsRef<str> for Header {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<S: Into<String>> From<S> for Header {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Maps header names to column indexes. Header names are matched exactly (case-sensitive, no
/// trimming). When a name repeats, the first column with that name wins.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub(super) struct Columns {
    header_map: HashMap<Header, usize>,
}

impl Columns {
    pub(super) fn new(header_row: &[Data]) -> Self {
        let headers: Vec<Header> = header_row
            .iter()
            .map(|cell| cell_to_string(cell).into())
            .collect();

        let mut header_map = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            header_map.entry(header.clone()).or_insert(idx);
        }

        Self { header_map }
    }

    pub(super) fn index(&self, header: &str) -> Option<usize> {
        self.header_map.get(&Header::from(header)).copied()
    }

    /// Returns the names in `required` that are not present.
    pub(super) fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|name| self.index(name).is_none())
            .copied()
            .collect()
    }
}
