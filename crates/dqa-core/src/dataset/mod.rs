//! YOLO dataset adapter: `data.yaml` layout, directory walk and label rows.

pub mod labels;
pub mod layout;
pub mod scan;

pub use labels::{AnnotationRow, LabelState, RowError};
pub use layout::{DatasetLayout, SplitLayout, load_layout};
pub use scan::{DatasetSource, SourceRecord, SplitSource, scan};
