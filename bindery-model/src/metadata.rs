use std::collections::BTreeSet;

/// Book metadata fields a metadata source is allowed to patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MetadataCapability {
    Title,
    TitleSort,
    Summary,
    Number,
    NumberSort,
    ReleaseDate,
    Authors,
    Tags,
    Isbn,
    Links,
    ReadLists,
    Thumbnails,
}

impl MetadataCapability {
    pub fn all() -> BTreeSet<MetadataCapability> {
        [
            MetadataCapability::Title,
            MetadataCapability::TitleSort,
            MetadataCapability::Summary,
            MetadataCapability::Number,
            MetadataCapability::NumberSort,
            MetadataCapability::ReleaseDate,
            MetadataCapability::Authors,
            MetadataCapability::Tags,
            MetadataCapability::Isbn,
            MetadataCapability::Links,
            MetadataCapability::ReadLists,
            MetadataCapability::Thumbnails,
        ]
        .into_iter()
        .collect()
    }
}

impl std::fmt::Display for MetadataCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetadataCapability::Title => "TITLE",
            MetadataCapability::TitleSort => "TITLE_SORT",
            MetadataCapability::Summary => "SUMMARY",
            MetadataCapability::Number => "NUMBER",
            MetadataCapability::NumberSort => "NUMBER_SORT",
            MetadataCapability::ReleaseDate => "RELEASE_DATE",
            MetadataCapability::Authors => "AUTHORS",
            MetadataCapability::Tags => "TAGS",
            MetadataCapability::Isbn => "ISBN",
            MetadataCapability::Links => "LINKS",
            MetadataCapability::ReadLists => "READ_LISTS",
            MetadataCapability::Thumbnails => "THUMBNAILS",
        };
        f.write_str(name)
    }
}
