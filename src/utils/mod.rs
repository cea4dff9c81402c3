//! Shared utility functions.

mod html;

pub use html::{
    cell_texts, collapse_whitespace, descendant, descendant_attr, element_text, parse_selector,
    row_cells,
};
