/// Value reported for a string field whose index is 0.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// The NUL-separated strings following a record's formatted area.
///
/// `region` excludes the terminating double NUL, so a record without
/// strings has an empty region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringTable<'a> {
    region: &'a [u8],
}

impl<'a> StringTable<'a> {
    pub fn new(region: &'a [u8]) -> Self {
        StringTable { region }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let region = self.region;
        let segments = if region.is_empty() { None } else { Some(region.split(|&b| b == 0)) };
        segments.into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Resolves a 1-based string index. Index 0 yields [`NOT_SPECIFIED`],
    /// an index past the last string yields an empty string.
    pub fn get(&self, index: u8) -> String {
        if index == 0 {
            return NOT_SPECIFIED.to_owned();
        }
        self.iter()
            .nth(index as usize - 1)
            .map(|s| String::from_utf8_lossy(s).trim().to_owned())
            .unwrap_or_default()
    }
}
