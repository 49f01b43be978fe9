/*!
 * Title-scoped proper-noun management.
 *
 * - `model`: entity records, the per-title set and its wire format
 * - `store`: the `EntityStore` trait plus in-memory and null stores
 * - `http`: storage API client
 * - `file`: one JSON file per title
 * - `detector`: LLM-backed candidate extraction
 */

pub mod detector;
pub mod file;
pub mod http;
pub mod model;
pub mod store;

pub use self::detector::EntityDetector;
pub use self::file::JsonFileEntityStore;
pub use self::http::HttpEntityStore;
pub use self::model::{Entity, EntitySet};
pub use self::store::{AddReport, EntityStore, InMemoryEntityStore, NullEntityStore};
