use serde::{Deserialize, Serialize};

use crate::parser::layout::{TextBlock, TextLine, TextSpan};

/// A parsed document: pages of blocks of lines of spans, in reading order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    pub metadata: DocumentMetadata,
}

/// One page of laid-out text. `number` is 1-based.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<TextBlock>,
}

impl Page {
    /// Lines of every block on the page, in order.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }
}

impl Document {
    /// Every span of the document in page, block, line order.
    pub fn spans(&self) -> impl Iterator<Item = &TextSpan> {
        self.pages
            .iter()
            .flat_map(Page::lines)
            .flat_map(|line| line.spans.iter())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub creator: Option<String>,
}
