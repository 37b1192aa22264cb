pub mod matcher;
pub mod path;
pub mod policy;

pub use matcher::{MatchError, MatchedProperty, PropertyMatcher};
pub use path::{KeyFilter, Path, PathComponent, PathError, parse_path};
pub use policy::ConnectPolicy;
