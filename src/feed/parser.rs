use feed_rs::parser::{self, ParseFeedError};

/// One feed item reduced to the text fields links are harvested from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Body blocks: the entry content plus any media descriptions.
    pub content: Vec<String>,
}

impl FeedEntry {
    /// Title, summary and every content block, each terminated by a newline
    /// so the end of one field can never run into the start of the next.
    pub fn combined_text(&self) -> String {
        let mut text = String::new();
        for field in self
            .title
            .iter()
            .chain(self.summary.iter())
            .chain(self.content.iter())
        {
            text.push_str(field);
            text.push('\n');
        }
        text
    }
}

pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let mut content: Vec<String> = entry
                .content
                .and_then(|c| c.body)
                .into_iter()
                .collect();
            content.extend(
                entry
                    .media
                    .into_iter()
                    .filter_map(|m| m.description.map(|d| d.content)),
            );

            FeedEntry {
                title: entry.title.map(|t| t.content),
                summary: entry.summary.map(|s| s.content),
                content,
            }
        })
        .collect();

    Ok(entries)
}
