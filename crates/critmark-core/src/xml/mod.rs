pub mod arena;
pub mod namespaces;
pub mod node;
pub mod parser;
pub mod xname;

pub use arena::XmlDocument;
pub use namespaces::W;
pub use node::{XmlNode, XmlNodeData};
pub use xname::{XAttribute, XName};
