#![allow(non_snake_case)]

use super::xname::XName;

/// WordprocessingML main namespace and the element/attribute names the
/// extractor reads.
pub mod W {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub fn p() -> XName { XName::new(NS, "p") }
    pub fn r() -> XName { XName::new(NS, "r") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn delText() -> XName { XName::new(NS, "delText") }
    pub fn tbl() -> XName { XName::new(NS, "tbl") }
    pub fn tblGrid() -> XName { XName::new(NS, "tblGrid") }
    pub fn gridCol() -> XName { XName::new(NS, "gridCol") }
    pub fn tr() -> XName { XName::new(NS, "tr") }
    pub fn tc() -> XName { XName::new(NS, "tc") }
    pub fn tcPr() -> XName { XName::new(NS, "tcPr") }
    pub fn gridSpan() -> XName { XName::new(NS, "gridSpan") }
    pub fn vMerge() -> XName { XName::new(NS, "vMerge") }
    pub fn comment() -> XName { XName::new(NS, "comment") }
    pub fn commentRangeStart() -> XName { XName::new(NS, "commentRangeStart") }
    pub fn commentRangeEnd() -> XName { XName::new(NS, "commentRangeEnd") }
    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn val() -> XName { XName::new(NS, "val") }
    pub fn author() -> XName { XName::new(NS, "author") }
    pub fn date() -> XName { XName::new(NS, "date") }
}
