//! Post data types.

/// A news post as it appears on the school homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Headline, taken from the anchor's `title` attribute.
    pub title: String,
    /// Post URL as published; identifies the post for deduplication.
    pub link: String,
    /// Day of publication, as displayed.
    pub day: String,
    /// Month of publication, as displayed.
    pub month: String,
    /// Year of publication, as displayed.
    pub year: String,
    /// Illustrative image referenced by the post's inline style.
    pub image_url: String,
}

impl Post {
    /// Caption used for the announcement.
    #[must_use]
    pub fn caption(&self) -> String {
        format!("{}: {}", self.title, self.link)
    }

    /// Publication date for log output.
    #[must_use]
    pub fn date_label(&self) -> String {
        format!("{}/{}/{}", self.day, self.month, self.year)
    }
}
