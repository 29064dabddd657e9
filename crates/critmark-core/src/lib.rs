pub mod error;
pub mod types;
pub mod settings;
pub mod xml;
pub mod package;
pub mod util;
pub mod markup;
pub mod extract;
pub mod protect;
pub mod locate;
pub mod placement;
pub mod paragraphs;
pub mod registry;
pub mod reconcile;

pub use error::{CritmarkError, Result};

pub use extract::{extract, extract_bytes, extract_path, ExtractedTable, Extraction};
pub use locate::{locate, Haystack, Located, MatchStrategy, Query};
pub use markup::{translate_converter_markup, AnnotationCounts};
pub use package::OoxmlPackage;
pub use paragraphs::{reconcile_paragraphs, ParagraphReconciliation};
pub use placement::{place_comments, PlacementOutcome, SectionBounds};
pub use protect::{ProtectKind, ProtectedText, Protector};
pub use reconcile::{ImportReport, Reconciler, RunState};
pub use registry::{FigureKind, FigureRegistry};
pub use settings::ReconcileSettings;
pub use types::{
    AnchorRecord, CommentRecord, ParagraphAlignment, PlacedComment, PlacementStrategy, Verdict,
};
