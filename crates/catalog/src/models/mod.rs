mod package;
mod project;

pub(crate) use self::package::PackageRow;
pub use self::package::{NewPackage, PackageRecord};
pub(crate) use self::project::{PUBLISHED, ProjectRow};
pub use self::project::Project;
